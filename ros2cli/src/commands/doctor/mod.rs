//! `ros2 doctor`: check the ROS setup and report on the system.
//!
//! Checks and reports are extensions of their own groups, so they load and
//! fail the same way commands do: a check that cannot be loaded or that
//! errors out is reported and skipped, the others still run.

mod checks;
mod reports;

pub use checks::{EnvironmentCheck, TopicCheck};
pub use reports::{
    ActionReport, EnvironmentReport, MiddlewareReport, PlatformReport, ServiceReport, TopicReport,
};

use crate::{
    cli::CliContext,
    error::Result,
    extension::{COMMAND_GROUP, EntryPoint, Plugin, Registry, Verb, panic_message, verb},
    table::center,
};
use clap::Args;
use ros2cli_core::GraphCache;
use std::{
    collections::BTreeSet,
    fmt::{self, Write as _},
    panic::{self, AssertUnwindSafe},
    sync::{Arc, OnceLock},
};

/// Extension point of the doctor checks.
pub const CHECKS_GROUP: &str = "ros2doctor.checks";

/// Extension point of the doctor reports.
pub const REPORT_GROUP: &str = "ros2doctor.report";

const BANNER_WIDTH: usize = 80;

pub(crate) fn register(registry: &mut Registry) {
    registry.add_extension_point(CHECKS_GROUP, "Extension point for 'doctor' checks");
    registry.add_extension_point(REPORT_GROUP, "Extension point for 'doctor' report");
    registry.add(EntryPoint::new(
        COMMAND_GROUP,
        "doctor",
        "Check ROS setup and other potential issues",
        verb::<DoctorVerb>,
    ));
    registry.add(EntryPoint::new(
        COMMAND_GROUP,
        "wtf",
        "Use `wtf` as alias to `doctor`",
        verb::<DoctorVerb>,
    ));

    registry.add(EntryPoint::new(CHECKS_GROUP, "EnvironmentCheck", "", || {
        Ok(Plugin::Check(Arc::new(EnvironmentCheck)))
    }));
    registry.add(EntryPoint::new(CHECKS_GROUP, "TopicCheck", "", || {
        Ok(Plugin::Check(Arc::new(TopicCheck)))
    }));

    registry.add(EntryPoint::new(REPORT_GROUP, "ActionReport", "", || {
        Ok(Plugin::Report(Arc::new(ActionReport)))
    }));
    registry.add(EntryPoint::new(REPORT_GROUP, "EnvironmentReport", "", || {
        Ok(Plugin::Report(Arc::new(EnvironmentReport)))
    }));
    registry.add(EntryPoint::new(REPORT_GROUP, "MiddlewareReport", "", || {
        Ok(Plugin::Report(Arc::new(MiddlewareReport)))
    }));
    registry.add(EntryPoint::new(REPORT_GROUP, "PlatformReport", "", || {
        Ok(Plugin::Report(Arc::new(PlatformReport)))
    }));
    registry.add(EntryPoint::new(REPORT_GROUP, "ServiceReport", "", || {
        Ok(Plugin::Report(Arc::new(ServiceReport)))
    }));
    registry.add(EntryPoint::new(REPORT_GROUP, "TopicReport", "", || {
        Ok(Plugin::Report(Arc::new(TopicReport)))
    }));
}

/// What checks and reports get to work with. The graph is read once and
/// shared by all of them.
pub struct DoctorContext<'a> {
    cli: &'a CliContext,
    graph: OnceLock<GraphCache>,
}

impl<'a> DoctorContext<'a> {
    /// Wrap the command's context.
    pub fn new(cli: &'a CliContext) -> Self {
        Self {
            cli,
            graph: OnceLock::new(),
        }
    }

    /// The command's context.
    pub fn cli(&self) -> &CliContext {
        self.cli
    }

    /// Graph snapshot, read on first use.
    pub fn graph(&self) -> Result<&GraphCache> {
        if let Some(graph) = self.graph.get() {
            return Ok(graph);
        }
        let graph = self.cli.graph()?;
        Ok(self.graph.get_or_init(|| graph))
    }
}

/// A check of the ROS setup, registered under [`CHECKS_GROUP`].
pub trait DoctorCheck: Send + Sync {
    /// Category linking the check to the reports to print when it fails.
    fn category(&self) -> &'static str;

    /// Run the check.
    fn check(&self, ctx: &DoctorContext<'_>) -> Result<CheckResult>;
}

/// A report on the system, registered under [`REPORT_GROUP`].
pub trait DoctorReport: Send + Sync {
    /// Category linking the report to checks.
    fn category(&self) -> &'static str;

    /// Gather the report.
    fn report(&self, ctx: &DoctorContext<'_>) -> Result<Report>;
}

/// Named list of report items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Report title
    pub name: String,
    /// Item names and values, in insertion order
    pub items: Vec<(String, String)>,
}

impl Report {
    /// An empty report.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
        }
    }

    /// Append an item.
    pub fn add_to_report(&mut self, item_name: impl Into<String>, item_info: impl ToString) {
        self.items.push((item_name.into(), item_info.to_string()));
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "   {}", self.name)?;
        let padding = self.items.iter().map(|(name, _)| name.len()).max().unwrap_or(0) + 4;
        for (name, info) in &self.items {
            writeln!(f, "{name:<padding$}: {info}")?;
        }
        Ok(())
    }
}

/// Errors and warnings found by one check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckResult {
    /// Number of errors
    pub error: usize,
    /// Number of warnings
    pub warning: usize,
}

impl CheckResult {
    /// Count an error.
    pub fn add_error(&mut self) {
        self.error += 1;
    }

    /// Count a warning.
    pub fn add_warning(&mut self) {
        self.warning += 1;
    }
}

/// Print a problem found by a check or while running one.
pub(crate) fn doctor_warn(message: &str) {
    eprintln!("UserWarning: {message}");
}

/// Print an error found by a check.
pub(crate) fn doctor_error(message: &str) {
    eprintln!("UserWarning: ERROR: {message}");
}

/// Outcome of all checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckSummary {
    /// Categories of the failed checks
    pub failed_categories: BTreeSet<String>,
    /// Number of failed checks
    pub failed: usize,
    /// Number of checks that ran
    pub total: usize,
}

impl fmt::Display for CheckSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failed == 0 {
            return write!(f, "\nAll {} checks passed\n", self.total);
        }
        writeln!(f, "\n{}/{} check(s) failed\n", self.failed, self.total)?;
        let categories: Vec<&str> = self.failed_categories.iter().map(String::as_str).collect();
        write!(f, "Failed modules: {}", categories.join(" "))
    }
}

fn isolated<T>(name: &str, run: impl FnOnce() -> Result<T>) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(run)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(err)) => {
            doctor_warn(&format!("Fail to call {name}: {err}"));
            None
        }
        Err(payload) => {
            doctor_warn(&format!(
                "Fail to call {name}: {}",
                panic_message(payload.as_ref())
            ));
            None
        }
    }
}

/// Run every registered check. Warnings count as failures with
/// `include_warnings`.
pub fn run_checks(ctx: &DoctorContext<'_>, include_warnings: bool) -> CheckSummary {
    let registry = ctx.cli().registry();
    let mut summary = CheckSummary::default();
    for entry in registry.entry_points(CHECKS_GROUP) {
        let check = match registry.load_check(CHECKS_GROUP, &entry.name) {
            Ok(check) => check,
            Err(err) => {
                doctor_warn(&format!(
                    "Check entry point {} fails to load: {err}",
                    entry.name
                ));
                continue;
            }
        };
        let Some(result) = isolated(&entry.name, || check.check(ctx)) else {
            continue;
        };
        if result.error > 0 || (include_warnings && result.warning > 0) {
            summary.failed += 1;
            summary.failed_categories.insert(check.category().to_string());
        }
        summary.total += 1;
    }
    summary
}

/// Gather every registered report, or only those of `categories`.
pub fn generate_reports(
    ctx: &DoctorContext<'_>,
    categories: Option<&BTreeSet<String>>,
) -> Vec<Report> {
    let registry = ctx.cli().registry();
    let mut reports = Vec::new();
    for entry in registry.entry_points(REPORT_GROUP) {
        let report = match registry.load_report(REPORT_GROUP, &entry.name) {
            Ok(report) => report,
            Err(err) => {
                doctor_warn(&format!(
                    "Report entry point {} fails to load: {err}",
                    entry.name
                ));
                continue;
            }
        };
        if categories.is_some_and(|c| !c.contains(report.category())) {
            continue;
        }
        if let Some(report) = isolated(&entry.name, || report.report(ctx)) {
            reports.push(report);
        }
    }
    reports
}

/// Banner printed before reports.
pub fn warning_notice() -> String {
    let rule = "=".repeat(BANNER_WIDTH);
    let mut lines = vec![
        String::new(),
        rule.clone(),
        center("!!! WARNING !!!", BANNER_WIDTH),
        rule.clone(),
    ];
    for line in [
        "The report includes all ROS 2 endpoint information and system platform information.",
        "Please review the report before sharing, as it may contain sensitive or private data.",
    ] {
        lines.push(center(line, BANNER_WIDTH));
    }
    lines.push(rule);
    lines.push(String::new());
    lines.join("\n")
}

/// Check ROS setup and other potential issues.
#[derive(Debug, Args)]
pub(crate) struct DoctorArgs {
    /// Print all reports
    #[arg(short, long)]
    report: bool,

    /// Print reports of failed checks only
    #[arg(long, conflicts_with = "report")]
    report_failed: bool,

    /// Include warnings as failed checks. Warnings are ignored by default
    #[arg(long)]
    include_warnings: bool,
}

#[derive(Default)]
pub(crate) struct DoctorVerb;

/// Everything `ros2 doctor` prints for `args`: the banner when reports are
/// asked for, then either every report or the check summary followed by the
/// reports of the failed categories.
pub(crate) fn doctor_output(ctx: &DoctorContext<'_>, args: &DoctorArgs) -> String {
    let mut out = String::new();
    if args.report || args.report_failed {
        let _ = writeln!(out, "{}", warning_notice());
    }
    if args.report {
        for report in generate_reports(ctx, None) {
            let _ = write!(out, "{report}");
        }
        return out;
    }
    let summary = run_checks(ctx, args.include_warnings);
    let _ = writeln!(out, "{summary}");
    if args.report_failed && summary.failed != 0 {
        for report in generate_reports(ctx, Some(&summary.failed_categories)) {
            let _ = write!(out, "{report}");
        }
    }
    out
}

impl Verb for DoctorVerb {
    type Args = DoctorArgs;

    fn main(&self, cli: &CliContext, args: DoctorArgs) -> Result<()> {
        let ctx = DoctorContext::new(cli);
        print!("{}", doctor_output(&ctx, &args));
        Ok(())
    }
}
