//! Extension registry.
//!
//! Every command (`topic`, `param`, ...), every verb of a command and every
//! doctor check or report is an [`EntryPoint`] registered under a group name
//! (its extension point). Entry points carry their description, so listing
//! them never instantiates anything; the extension itself is created on first
//! use through its loader.
//!
//! A loader that fails or panics yields a [`LoadError`]. Callers report it
//! and carry on with the remaining extensions.
//!
//! Executables named `ros2-<name>` on `PATH` are registered as external
//! commands. Built-in commands win on name clashes.

use crate::{
    cli::CliContext,
    commands::doctor::{DoctorCheck, DoctorReport},
    error::{Error, Result},
};
use clap::{Arg, ArgMatches, Command, FromArgMatches, value_parser};
use parking_lot::Mutex;
use std::{
    any::Any,
    collections::{BTreeMap, HashMap},
    ffi::{OsStr, OsString},
    fs,
    panic::{self, AssertUnwindSafe},
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;

/// Extension point of the top-level commands.
pub const COMMAND_GROUP: &str = "ros2cli.command";

/// File name prefix of external commands.
pub const EXTERNAL_PREFIX: &str = "ros2-";

/// Description given to external commands.
pub const EXTERNAL_DESCRIPTION: &str = "external command";

/// Why an extension could not be instantiated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// Nothing registered under that name
    #[error("unknown extension '{name}' in group '{group}'")]
    NotFound {
        /// Extension point
        group: String,
        /// Entry point name
        name: String,
    },

    /// The loader reported a failure
    #[error("{0}")]
    Failed(String),

    /// The loader panicked
    #[error("panicked while loading: {0}")]
    Panicked(String),

    /// The entry point produced another kind of plugin than requested
    #[error("'{name}' is not a {expected}")]
    WrongKind {
        /// Entry point name
        name: String,
        /// Requested kind
        expected: &'static str,
    },
}

/// A command or verb: contributes arguments to the parser and runs when
/// selected.
pub trait Extension: Send + Sync {
    /// Add this extension's arguments (and subcommands) to its parser.
    fn add_arguments(&self, command: Command, _registry: &Registry) -> Command {
        command
    }

    /// Run with the parsed arguments.
    fn main(&self, cli: &CliContext, args: &ArgMatches) -> Result<()>;
}

/// A verb whose arguments are a clap derive struct.
pub trait Verb: Send + Sync + 'static {
    /// Parsed arguments
    type Args: clap::Args;

    /// Run the verb.
    fn main(&self, cli: &CliContext, args: Self::Args) -> Result<()>;
}

struct VerbExtension<V>(V);

impl<V: Verb> Extension for VerbExtension<V> {
    fn add_arguments(&self, command: Command, _registry: &Registry) -> Command {
        <V::Args as clap::Args>::augment_args(command)
    }

    fn main(&self, cli: &CliContext, args: &ArgMatches) -> Result<()> {
        let args = V::Args::from_arg_matches(args)?;
        self.0.main(cli, args)
    }
}

/// Loader for a [`Verb`] type.
pub fn verb<V: Verb + Default>() -> std::result::Result<Plugin, LoadError> {
    Ok(Plugin::Command(Arc::new(VerbExtension(V::default()))))
}

/// What a loader produces.
#[derive(Clone)]
pub enum Plugin {
    /// A command or verb
    Command(Arc<dyn Extension>),
    /// A `ros2doctor.checks` entry
    Check(Arc<dyn DoctorCheck>),
    /// A `ros2doctor.report` entry
    Report(Arc<dyn DoctorReport>),
}

/// Factory of a built-in extension.
pub type Loader = fn() -> std::result::Result<Plugin, LoadError>;

#[derive(Clone)]
enum Source {
    Builtin(Loader),
    External(PathBuf),
}

/// A registered, not yet loaded, extension.
#[derive(Clone)]
pub struct EntryPoint {
    /// Name, unique within its group
    pub name: String,
    /// One-line description
    pub description: String,
    /// Extension point the entry belongs to
    pub group: String,
    source: Source,
}

impl EntryPoint {
    /// A built-in entry point.
    pub fn new(group: &str, name: &str, description: &str, loader: Loader) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            group: group.to_string(),
            source: Source::Builtin(loader),
        }
    }

    /// An external command backed by an executable.
    pub fn external(name: &str, path: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            description: EXTERNAL_DESCRIPTION.to_string(),
            group: COMMAND_GROUP.to_string(),
            source: Source::External(path),
        }
    }

    /// Executable of an external command.
    pub fn external_path(&self) -> Option<&Path> {
        match &self.source {
            Source::External(path) => Some(path),
            Source::Builtin(_) => None,
        }
    }
}

/// Extension points and their entry points.
#[derive(Default)]
pub struct Registry {
    extension_points: BTreeMap<String, String>,
    entry_points: BTreeMap<String, BTreeMap<String, EntryPoint>>,
    loaded: Mutex<HashMap<(String, String), std::result::Result<Plugin, LoadError>>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in command, verb, check and report.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        crate::commands::register_builtins(&mut registry);
        registry
    }

    /// Declare an extension point.
    pub fn add_extension_point(&mut self, group: &str, description: &str) {
        self.extension_points
            .insert(group.to_string(), description.to_string());
    }

    /// Register an entry point. The first registration of a name wins;
    /// returns false when the name was already taken.
    pub fn add(&mut self, entry: EntryPoint) -> bool {
        let group = self.entry_points.entry(entry.group.clone()).or_default();
        if group.contains_key(&entry.name) {
            tracing::debug!(
                group = %entry.group,
                name = %entry.name,
                "duplicate entry point ignored"
            );
            return false;
        }
        group.insert(entry.name.clone(), entry);
        true
    }

    /// Register `ros2-<name>` executables found in a `PATH`-like list.
    /// Returns the number of commands added.
    pub fn discover_external(&mut self, path: &OsStr) -> usize {
        let mut added = 0;
        for dir in std::env::split_paths(path) {
            let Ok(entries) = fs::read_dir(&dir) else {
                continue;
            };
            let mut candidates: Vec<(String, PathBuf)> = entries
                .filter_map(|entry| entry.ok())
                .filter_map(|entry| {
                    let file_name = entry.file_name().into_string().ok()?;
                    let name = file_name.strip_prefix(EXTERNAL_PREFIX)?.to_string();
                    let path = entry.path();
                    (!name.is_empty() && is_executable(&path)).then_some((name, path))
                })
                .collect();
            candidates.sort();
            for (name, path) in candidates {
                if self.add(EntryPoint::external(&name, path)) {
                    added += 1;
                }
            }
        }
        added
    }

    /// Declared extension points and their descriptions, sorted by group.
    pub fn extension_points(&self) -> impl Iterator<Item = (&str, &str)> {
        self.extension_points
            .iter()
            .map(|(group, description)| (group.as_str(), description.as_str()))
    }

    /// Entry points of a group, sorted by name.
    pub fn entry_points(&self, group: &str) -> Vec<&EntryPoint> {
        self.entry_points
            .get(group)
            .map(|entries| entries.values().collect())
            .unwrap_or_default()
    }

    /// Look up one entry point.
    pub fn entry_point(&self, group: &str, name: &str) -> Option<&EntryPoint> {
        self.entry_points.get(group)?.get(name)
    }

    /// Instantiate an extension, once; later calls return the same instance,
    /// or the same error when loading failed.
    pub fn load(&self, group: &str, name: &str) -> std::result::Result<Plugin, LoadError> {
        let key = (group.to_string(), name.to_string());
        if let Some(loaded) = self.loaded.lock().get(&key) {
            return loaded.clone();
        }

        let entry = self
            .entry_point(group, name)
            .ok_or_else(|| LoadError::NotFound {
                group: group.to_string(),
                name: name.to_string(),
            })?;
        let loaded = match &entry.source {
            Source::Builtin(loader) => {
                let loader = *loader;
                panic::catch_unwind(loader).unwrap_or_else(|payload| {
                    Err(LoadError::Panicked(panic_message(payload.as_ref())))
                })
            }
            Source::External(path) => Ok(Plugin::Command(Arc::new(ExternalCommand {
                path: path.clone(),
            }))),
        };
        match &loaded {
            Ok(_) => tracing::debug!(group, name, "extension loaded"),
            Err(err) => tracing::debug!(group, name, %err, "extension failed to load"),
        }

        self.loaded.lock().insert(key, loaded.clone());
        loaded
    }

    /// Load a command or verb.
    pub fn load_extension(
        &self,
        group: &str,
        name: &str,
    ) -> std::result::Result<Arc<dyn Extension>, LoadError> {
        match self.load(group, name)? {
            Plugin::Command(extension) => Ok(extension),
            _ => Err(wrong_kind(name, "command extension")),
        }
    }

    /// Load a doctor check.
    pub fn load_check(
        &self,
        group: &str,
        name: &str,
    ) -> std::result::Result<Arc<dyn DoctorCheck>, LoadError> {
        match self.load(group, name)? {
            Plugin::Check(check) => Ok(check),
            _ => Err(wrong_kind(name, "doctor check")),
        }
    }

    /// Load a doctor report.
    pub fn load_report(
        &self,
        group: &str,
        name: &str,
    ) -> std::result::Result<Arc<dyn DoctorReport>, LoadError> {
        match self.load(group, name)? {
            Plugin::Report(report) => Ok(report),
            _ => Err(wrong_kind(name, "doctor report")),
        }
    }
}

fn wrong_kind(name: &str, expected: &'static str) -> LoadError {
    LoadError::WrongKind {
        name: name.to_string(),
        expected,
    }
}

/// Text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

const EXTERNAL_ARGS: &str = "args";

/// Runs a `ros2-<name>` executable with the rest of the command line.
struct ExternalCommand {
    path: PathBuf,
}

impl Extension for ExternalCommand {
    fn add_arguments(&self, command: Command, _registry: &Registry) -> Command {
        command.disable_help_flag(true).arg(
            Arg::new(EXTERNAL_ARGS)
                .num_args(0..)
                .trailing_var_arg(true)
                .allow_hyphen_values(true)
                .value_parser(value_parser!(OsString)),
        )
    }

    fn main(&self, _cli: &CliContext, args: &ArgMatches) -> Result<()> {
        let args: Vec<&OsString> = args
            .get_many::<OsString>(EXTERNAL_ARGS)
            .map(Iterator::collect)
            .unwrap_or_default();
        tracing::debug!(path = %self.path.display(), ?args, "running external command");
        let status = std::process::Command::new(&self.path).args(args).status()?;
        if status.success() {
            Ok(())
        } else {
            Err(Error::Exit(status.code().unwrap_or(1)))
        }
    }
}

/// A command whose work is done by the verbs registered in its own group.
pub struct VerbCommand {
    name: &'static str,
    verb_group: &'static str,
}

impl VerbCommand {
    /// Loader helper: the command `name` dispatching to `verb_group`.
    pub fn plugin(name: &'static str, verb_group: &'static str) -> Plugin {
        Plugin::Command(Arc::new(Self { name, verb_group }))
    }
}

impl Extension for VerbCommand {
    fn add_arguments(&self, mut command: Command, registry: &Registry) -> Command {
        command = command.subcommand_value_name("VERB");
        for entry in registry.entry_points(self.verb_group) {
            match registry.load_extension(self.verb_group, &entry.name) {
                Ok(verb) => {
                    let sub = Command::new(entry.name.clone()).about(entry.description.clone());
                    command = command.subcommand(verb.add_arguments(sub, registry));
                }
                Err(err) => eprintln!(
                    "WARNING: failed to load verb '{}' of '{}': {err}",
                    entry.name, self.name
                ),
            }
        }
        command
    }

    fn main(&self, cli: &CliContext, args: &ArgMatches) -> Result<()> {
        let Some((name, verb_args)) = args.subcommand() else {
            let mut help = self
                .add_arguments(Command::new(self.name), cli.registry())
                .bin_name(format!("{} {}", crate::cli::PROG, self.name));
            help.print_help()?;
            println!();
            return Err(Error::command(format!(
                "Call `{} {} -h` for more detailed usage.",
                crate::cli::PROG,
                self.name
            )));
        };
        let verb = cli.registry().load_extension(self.verb_group, name)?;
        verb.main(cli, verb_args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl Extension for Noop {
        fn main(&self, _cli: &CliContext, _args: &ArgMatches) -> Result<()> {
            Ok(())
        }
    }

    fn ok_loader() -> std::result::Result<Plugin, LoadError> {
        Ok(Plugin::Command(Arc::new(Noop)))
    }

    fn failing_loader() -> std::result::Result<Plugin, LoadError> {
        Err(LoadError::Failed("missing dependency".to_string()))
    }

    fn panicking_loader() -> std::result::Result<Plugin, LoadError> {
        panic!("boom")
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.add_extension_point(COMMAND_GROUP, "commands");
        registry.add(EntryPoint::new(COMMAND_GROUP, "zeta", "last", ok_loader));
        registry.add(EntryPoint::new(COMMAND_GROUP, "alpha", "first", ok_loader));
        registry.add(EntryPoint::new(COMMAND_GROUP, "broken", "fails", failing_loader));
        registry.add(EntryPoint::new(COMMAND_GROUP, "panics", "panics", panicking_loader));
        registry
    }

    #[test]
    fn test_entry_points_sorted() {
        let registry = registry();
        let names: Vec<&str> = registry
            .entry_points(COMMAND_GROUP)
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, ["alpha", "broken", "panics", "zeta"]);
        assert!(registry.entry_points("nope").is_empty());
    }

    #[test]
    fn test_first_registration_wins() {
        let mut registry = registry();
        assert!(!registry.add(EntryPoint::new(COMMAND_GROUP, "alpha", "again", failing_loader)));
        assert_eq!(
            registry.entry_point(COMMAND_GROUP, "alpha").unwrap().description,
            "first"
        );
    }

    #[test]
    fn test_load_failures_are_isolated() {
        let registry = registry();
        assert!(registry.load_extension(COMMAND_GROUP, "alpha").is_ok());
        assert_eq!(
            registry.load(COMMAND_GROUP, "broken").err(),
            Some(LoadError::Failed("missing dependency".to_string()))
        );
        assert_eq!(
            registry.load(COMMAND_GROUP, "panics").err(),
            Some(LoadError::Panicked("boom".to_string()))
        );
        assert!(matches!(
            registry.load(COMMAND_GROUP, "missing"),
            Err(LoadError::NotFound { .. })
        ));
        // others still load after a failure
        assert!(registry.load_extension(COMMAND_GROUP, "zeta").is_ok());
    }

    #[test]
    fn test_failed_load_runs_loader_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        static CALLS: AtomicUsize = AtomicUsize::new(0);
        fn counted() -> std::result::Result<Plugin, LoadError> {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Err(LoadError::Failed("no library".to_string()))
        }

        let mut registry = registry();
        registry.add(EntryPoint::new(COMMAND_GROUP, "counted", "", counted));
        for _ in 0..3 {
            assert_eq!(
                registry.load_extension(COMMAND_GROUP, "counted").err(),
                Some(LoadError::Failed("no library".to_string()))
            );
        }
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_wrong_kind() {
        let registry = registry();
        assert!(matches!(
            registry.load_check(COMMAND_GROUP, "alpha"),
            Err(LoadError::WrongKind { expected: "doctor check", .. })
        ));
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(42);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
