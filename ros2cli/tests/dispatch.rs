//! Dispatcher behavior over hand-built registries.

use clap::Args;
use ros2cli::{
    Error, Result,
    cli::{CliContext, build_command, dispatch},
    extension::{COMMAND_GROUP, EntryPoint, LoadError, Plugin, Registry, Verb, VerbCommand, verb},
};
use std::sync::atomic::{AtomicUsize, Ordering};

static RUNS: AtomicUsize = AtomicUsize::new(0);
static UNLOADABLE_CALLS: AtomicUsize = AtomicUsize::new(0);

fn unloadable() -> std::result::Result<Plugin, LoadError> {
    UNLOADABLE_CALLS.fetch_add(1, Ordering::SeqCst);
    Err(LoadError::Failed("missing library".to_string()))
}

#[derive(Debug, Args)]
struct CountArgs {
    /// How many runs to record
    #[arg(long, default_value_t = 1)]
    times: usize,
}

#[derive(Default)]
struct CountVerb;

impl Verb for CountVerb {
    type Args = CountArgs;

    fn main(&self, _cli: &CliContext, args: CountArgs) -> Result<()> {
        RUNS.fetch_add(args.times, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Args)]
struct NoArgs {}

#[derive(Default)]
struct ExitVerb;

impl Verb for ExitVerb {
    type Args = NoArgs;

    fn main(&self, _cli: &CliContext, _args: NoArgs) -> Result<()> {
        Err(Error::Exit(3))
    }
}

#[derive(Default)]
struct PanicVerb;

impl Verb for PanicVerb {
    type Args = NoArgs;

    fn main(&self, _cli: &CliContext, _args: NoArgs) -> Result<()> {
        panic!("verb exploded")
    }
}

#[derive(Default)]
struct FailVerb;

impl Verb for FailVerb {
    type Args = NoArgs;

    fn main(&self, _cli: &CliContext, _args: NoArgs) -> Result<()> {
        Err(Error::command("nothing to do"))
    }
}

fn registry() -> Registry {
    let mut registry = Registry::new();
    registry.add_extension_point(COMMAND_GROUP, "commands");
    registry.add_extension_point("demo.verb", "demo verbs");
    registry.add(EntryPoint::new(COMMAND_GROUP, "demo", "Demo verbs", || {
        Ok(VerbCommand::plugin("demo", "demo.verb"))
    }));
    registry.add(EntryPoint::new(COMMAND_GROUP, "broken", "Never loads", || {
        Err(LoadError::Failed("missing library".to_string()))
    }));
    registry.add(EntryPoint::new("demo.verb", "count", "Count runs", verb::<CountVerb>));
    registry.add(EntryPoint::new("demo.verb", "exit", "Exit with 3", verb::<ExitVerb>));
    registry.add(EntryPoint::new("demo.verb", "panic", "Panic", verb::<PanicVerb>));
    registry.add(EntryPoint::new("demo.verb", "fail", "Fail", verb::<FailVerb>));
    registry.add(EntryPoint::new("demo.verb", "bad", "Never loads", || {
        Err(LoadError::Failed("bad verb".to_string()))
    }));
    registry
}

#[test]
fn test_verb_runs_with_its_arguments() {
    let before = RUNS.load(Ordering::SeqCst);
    assert_eq!(dispatch(registry(), ["ros2", "demo", "count", "--times", "2"]), 0);
    assert_eq!(RUNS.load(Ordering::SeqCst), before + 2);
}

#[test]
fn test_exit_codes() {
    assert_eq!(dispatch(registry(), ["ros2", "demo", "exit"]), 3);
    assert_eq!(dispatch(registry(), ["ros2", "demo", "fail"]), 1);
    assert_eq!(dispatch(registry(), ["ros2", "demo", "panic"]), 1);
    assert_eq!(dispatch(registry(), ["ros2", "demo", "nope"]), 1);
    assert_eq!(dispatch(registry(), ["ros2", "missing"]), 1);
}

#[test]
fn test_broken_command_is_isolated() {
    assert_eq!(dispatch(registry(), ["ros2", "broken"]), 1);
    // the broken verb is skipped, its siblings still run
    assert_eq!(dispatch(registry(), ["ros2", "demo", "count"]), 0);
}

#[test]
fn test_broken_command_loads_once() {
    let mut registry = registry();
    registry.add(EntryPoint::new(COMMAND_GROUP, "unloadable", "Never loads", unloadable));
    assert_eq!(dispatch(registry, ["ros2", "unloadable", "--flag"]), 1);
    assert_eq!(UNLOADABLE_CALLS.load(Ordering::SeqCst), 1);
}

#[test]
fn test_help_exits_cleanly() {
    assert_eq!(dispatch(registry(), ["ros2", "--help"]), 0);
    assert_eq!(dispatch(registry(), ["ros2", "demo", "--help"]), 0);
}

#[test]
fn test_help_lists_commands_without_loading() {
    let registry = registry();
    let help = build_command(&registry, None).render_help().to_string();
    assert!(help.contains("demo"));
    assert!(help.contains("broken"));
    assert!(help.contains("Never loads"));
}

#[test]
fn test_builtin_commands_registered() {
    let registry = Registry::builtin();
    let names: Vec<&str> = registry
        .entry_points(COMMAND_GROUP)
        .iter()
        .map(|e| e.name.as_str())
        .collect();
    for command in [
        "action",
        "component",
        "doctor",
        "extension-points",
        "extensions",
        "interface",
        "lifecycle",
        "node",
        "param",
        "service",
        "topic",
        "wtf",
    ] {
        assert!(names.contains(&command), "{command} not registered");
    }
    for command in names {
        assert!(
            registry.load_extension(COMMAND_GROUP, command).is_ok(),
            "{command} fails to load"
        );
    }
}

#[test]
fn test_builtin_verb_help() {
    for command in ["node", "topic", "param", "lifecycle", "interface", "doctor"] {
        assert_eq!(
            dispatch(Registry::builtin(), ["ros2", command, "--help"]),
            0,
            "{command} --help"
        );
    }
}

#[cfg(unix)]
#[test]
fn test_external_command() {
    use std::{fs, os::unix::fs::PermissionsExt};

    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("ros2-hello");
    fs::write(&script, "#!/bin/sh\nexit \"$1\"\n").unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    fs::write(dir.path().join("ros2-not-executable"), "").unwrap();

    let mut registry = registry();
    assert_eq!(registry.discover_external(dir.path().as_os_str()), 1);
    let entry = registry.entry_point(COMMAND_GROUP, "hello").unwrap();
    assert_eq!(entry.external_path(), Some(script.as_path()));

    assert_eq!(dispatch(registry, ["ros2", "hello", "5"]), 5);
}

#[test]
fn test_load_returns_loader_errors() {
    let mut registry = registry();
    registry.add(EntryPoint::new(COMMAND_GROUP, "report", "Not a command", || {
        Err(LoadError::Failed("unused".to_string()))
    }));
    assert!(matches!(
        registry.load(COMMAND_GROUP, "report"),
        Err(LoadError::Failed(_))
    ));
    let plugin = registry.load(COMMAND_GROUP, "demo").unwrap();
    assert!(matches!(plugin, Plugin::Command(_)));
}
