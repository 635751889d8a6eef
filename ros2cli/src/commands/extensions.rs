//! `ros2 extension-points` and `ros2 extensions`: what the registry holds.

use crate::{
    cli::CliContext,
    error::Result,
    extension::{COMMAND_GROUP, EntryPoint, Registry, Verb, verb},
};
use clap::Args;

pub(crate) fn register(registry: &mut Registry) {
    registry.add(EntryPoint::new(
        COMMAND_GROUP,
        "extension-points",
        "List extension points",
        verb::<ExtensionPointsVerb>,
    ));
    registry.add(EntryPoint::new(
        COMMAND_GROUP,
        "extensions",
        "List extensions",
        verb::<ExtensionsVerb>,
    ));
}

/// One `group: description` line per extension point.
pub(crate) fn extension_point_lines(registry: &Registry) -> Vec<String> {
    registry
        .extension_points()
        .map(|(group, description)| format!("{group}: {description}"))
        .collect()
}

/// Entry points grouped by extension point. With `all`, every extension is
/// loaded and shown with its description, or with why it failed to load.
pub(crate) fn extension_lines(registry: &Registry, all: bool) -> Vec<String> {
    let mut lines = Vec::new();
    for (group, _) in registry.extension_points() {
        let entries = registry.entry_points(group);
        if entries.is_empty() {
            continue;
        }
        lines.push(format!("{group}:"));
        for entry in entries {
            if !all {
                lines.push(format!("  {}", entry.name));
                continue;
            }
            match registry.load(group, &entry.name) {
                Ok(_) if entry.description.is_empty() => lines.push(format!("  {}", entry.name)),
                Ok(_) => lines.push(format!("  {}: {}", entry.name, entry.description)),
                Err(err) => lines.push(format!("- {}: failed to load ({err})", entry.name)),
            }
        }
    }
    lines
}

#[derive(Debug, Args)]
pub(crate) struct ExtensionPointsArgs {}

#[derive(Default)]
pub(crate) struct ExtensionPointsVerb;

impl Verb for ExtensionPointsVerb {
    type Args = ExtensionPointsArgs;

    fn main(&self, cli: &CliContext, _args: ExtensionPointsArgs) -> Result<()> {
        for line in extension_point_lines(cli.registry()) {
            println!("{line}");
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub(crate) struct ExtensionsArgs {
    /// Load every extension and show its description or loading error
    #[arg(short, long)]
    all: bool,
}

#[derive(Default)]
pub(crate) struct ExtensionsVerb;

impl Verb for ExtensionsVerb {
    type Args = ExtensionsArgs;

    fn main(&self, cli: &CliContext, args: ExtensionsArgs) -> Result<()> {
        for line in extension_lines(cli.registry(), args.all) {
            println!("{line}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::LoadError;

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.add_extension_point("demo.verb", "Extension point for 'demo' verb extensions");
        registry.add_extension_point("empty.verb", "Nothing registered here");
        registry.add(EntryPoint::new(
            "demo.verb",
            "good",
            "Works fine",
            verb::<ExtensionsVerb>,
        ));
        registry.add(EntryPoint::new("demo.verb", "bad", "Never loads", || {
            Err(LoadError::Failed("missing library".to_string()))
        }));
        registry
    }

    #[test]
    fn test_extension_point_lines() {
        assert_eq!(
            extension_point_lines(&registry()),
            [
                "demo.verb: Extension point for 'demo' verb extensions",
                "empty.verb: Nothing registered here",
            ]
        );
    }

    #[test]
    fn test_extension_lines() {
        let registry = registry();
        assert_eq!(
            extension_lines(&registry, false),
            ["demo.verb:", "  bad", "  good"]
        );
        assert_eq!(
            extension_lines(&registry, true),
            [
                "demo.verb:",
                "- bad: failed to load (missing library)",
                "  good: Works fine",
            ]
        );
    }

    #[test]
    fn test_builtin_extension_points() {
        let lines = extension_point_lines(&Registry::builtin());
        assert!(lines.iter().any(|l| l.starts_with("ros2cli.command: ")));
        assert!(lines.iter().any(|l| l.starts_with("ros2doctor.checks: ")));
        assert!(lines.iter().any(|l| l.starts_with("ros2topic.verb: ")));
    }
}
