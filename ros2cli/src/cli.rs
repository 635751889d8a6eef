//! Command-line front end: global options, the per-invocation context and
//! the dispatcher.
//!
//! Parsing happens in two passes. The first pass only needs the name of the
//! selected command, so every command is a placeholder built from its entry
//! point metadata. The second pass loads the selected command alone and lets
//! it add its real arguments. `ros2 -h` therefore never loads an extension,
//! and a command that fails to load cannot break the others.

use crate::{
    error::{Error, Result},
    extension::{COMMAND_GROUP, Registry, panic_message},
};
use clap::{Arg, Args, Command, FromArgMatches, error::ErrorKind, value_parser};
use ros2cli_core::GraphCache;
use ros2cli_zenoh::{
    Context, DEFAULT_ROUTER_ENDPOINT, ROS_DOMAIN_ID, SessionConfig, ZENOH_SESSION_CONFIG_URI,
};
use std::{
    ffi::OsString,
    future::Future,
    panic::{self, AssertUnwindSafe},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

/// Program name used in usage and error messages.
pub const PROG: &str = "ros2";

/// Timeout of a single service call.
pub const SERVICE_TIMEOUT: Duration = Duration::from_secs(5);

const PASSTHROUGH: &str = "passthrough";

/// Options accepted by every command.
#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// ROS domain ID
    #[arg(long, env = ROS_DOMAIN_ID, default_value_t = 0, global = true)]
    pub domain_id: u32,

    /// Zenoh session configuration file (overrides --router)
    #[arg(long, env = ZENOH_SESSION_CONFIG_URI, value_name = "FILE", global = true)]
    pub zenoh_config: Option<PathBuf>,

    /// Zenoh router endpoint to connect to
    #[arg(long, default_value = DEFAULT_ROUTER_ENDPOINT, value_name = "ENDPOINT", global = true)]
    pub router: String,

    /// Seconds to wait for graph discovery
    #[arg(long, default_value_t = 0.5, value_name = "SECONDS", global = true)]
    pub spin_time: f64,
}

/// Resolved global configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// ROS domain ID
    pub domain_id: u32,
    /// Zenoh session configuration file
    pub zenoh_config: Option<PathBuf>,
    /// Router endpoint
    pub router: String,
    /// Discovery wait
    pub spin_time: Duration,
}

impl Default for CliConfig {
    fn default() -> Self {
        SessionConfig::default().into()
    }
}

impl From<SessionConfig> for CliConfig {
    fn from(config: SessionConfig) -> Self {
        Self {
            domain_id: config.domain_id,
            zenoh_config: config.config_file,
            router: config.router,
            spin_time: config.spin_time,
        }
    }
}

impl TryFrom<GlobalArgs> for CliConfig {
    type Error = Error;

    fn try_from(args: GlobalArgs) -> Result<Self> {
        let spin_time = Duration::try_from_secs_f64(args.spin_time).map_err(|_| {
            Error::command(format!(
                "--spin-time must be a non-negative number of seconds, got {}",
                args.spin_time
            ))
        })?;
        Ok(Self {
            domain_id: args.domain_id,
            zenoh_config: args.zenoh_config,
            router: args.router,
            spin_time,
        })
    }
}

impl CliConfig {
    /// Session settings for [`Context::open`].
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            domain_id: self.domain_id,
            config_file: self.zenoh_config.clone(),
            router: self.router.clone(),
            spin_time: self.spin_time,
        }
    }
}

/// Everything an extension gets to run: configuration, registry and the
/// async runtime.
pub struct CliContext {
    config: CliConfig,
    registry: Arc<Registry>,
    runtime: tokio::runtime::Runtime,
}

impl CliContext {
    /// Build a context with a multi-threaded runtime.
    pub fn new(config: CliConfig, registry: Arc<Registry>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            config,
            registry,
            runtime,
        })
    }

    /// Global configuration.
    pub fn config(&self) -> &CliConfig {
        &self.config
    }

    /// Registry the command was loaded from.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run a future to completion on the runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Open a Zenoh session.
    pub async fn connect(&self) -> Result<Context> {
        Ok(Context::open(&self.config.session_config()).await?)
    }

    /// Open a session just long enough to read a graph snapshot.
    pub fn graph(&self) -> Result<GraphCache> {
        self.block_on(async {
            let context = self.connect().await?;
            let graph = context.graph().await?;
            context.close().await?;
            Ok(graph)
        })
    }
}

fn placeholder(command: Command) -> Command {
    command.disable_help_flag(true).arg(
        Arg::new(PASSTHROUGH)
            .num_args(0..)
            .trailing_var_arg(true)
            .allow_hyphen_values(true)
            .value_parser(value_parser!(OsString))
            .hide(true),
    )
}

/// Build the `ros2` parser. Only `selected` (when given) is loaded and gets
/// its real arguments; other commands are listed from their metadata.
pub fn build_command(registry: &Registry, selected: Option<&str>) -> Command {
    let mut command = GlobalArgs::augment_args(
        Command::new(PROG)
            .about("ros2 is an extensible command-line tool for ROS 2.")
            .version(env!("CARGO_PKG_VERSION"))
            .subcommand_value_name("COMMAND")
            .arg_required_else_help(true),
    );
    for entry in registry.entry_points(COMMAND_GROUP) {
        let sub = Command::new(entry.name.clone()).about(entry.description.clone());
        let sub = if selected == Some(entry.name.as_str()) {
            match registry.load_extension(COMMAND_GROUP, &entry.name) {
                Ok(extension) => extension.add_arguments(sub, registry),
                Err(err) => {
                    eprintln!("WARNING: failed to load command '{}': {err}", entry.name);
                    placeholder(sub)
                }
            }
        } else {
            placeholder(sub)
        };
        command = command.subcommand(sub);
    }
    command
}

fn clap_exit(err: clap::Error) -> i32 {
    let code = match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    };
    // stdout/stderr gone: nothing left to report to
    let _ = err.print();
    code
}

fn run_isolated(name: &str, run: impl FnOnce() -> Result<()>) -> i32 {
    match panic::catch_unwind(AssertUnwindSafe(run)) {
        Ok(Ok(())) => 0,
        Ok(Err(Error::Exit(code))) => code,
        Ok(Err(err)) => {
            eprintln!("{PROG}: {err}");
            err.exit_code()
        }
        Err(payload) => {
            eprintln!(
                "{PROG}: command '{name}' failed unexpectedly: {}",
                panic_message(payload.as_ref())
            );
            1
        }
    }
}

/// Parse `argv` (program name first) and run the selected command.
/// Returns the process exit code.
pub fn dispatch<I, T>(registry: Registry, argv: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let argv: Vec<OsString> = argv.into_iter().map(Into::into).collect();

    let selected = match build_command(&registry, None).try_get_matches_from(&argv) {
        Ok(matches) => matches.subcommand_name().map(str::to_string),
        Err(err) => return clap_exit(err),
    };
    let matches = match build_command(&registry, selected.as_deref()).try_get_matches_from(&argv)
    {
        Ok(matches) => matches,
        Err(err) => return clap_exit(err),
    };
    let Some((name, args)) = matches.subcommand() else {
        return 1;
    };

    // a failed load was reported while building the parser
    let Ok(extension) = registry.load_extension(COMMAND_GROUP, name) else {
        return 1;
    };
    tracing::debug!(command = name, "dispatching");

    run_isolated(name, || {
        let config = CliConfig::try_from(GlobalArgs::from_arg_matches(&matches)?)?;
        let cli = CliContext::new(config, Arc::new(registry))?;
        extension.main(&cli, args)
    })
}

/// Entry point of the `ros2` binary.
pub fn main() -> i32 {
    ros2cli_core::logger::init_logging(PROG, "warn");
    let mut registry = Registry::builtin();
    if let Some(path) = std::env::var_os("PATH") {
        let added = registry.discover_external(&path);
        tracing::debug!(added, "external commands discovered");
    }
    dispatch(registry, std::env::args_os())
}
