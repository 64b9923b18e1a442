//! Berth CLI - local development environment orchestrator.
//!
//! Reads a `berth.yml` manifest, starts the declared plugins, and keeps
//! them running until Ctrl-C or the first failure. Other commands build
//! and publish images, open shells, proxy the local X server and remove
//! leftover Docker resources.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use berth_config::{RootConfig, default_manifest_path};
use berth_core::ArcUi;
use berth_runtime::RuntimeError;
use berth_telemetry::{FileRotation, LogConfig, LogFormat, TelemetryResult};
use clap::{Args, Parser, Subcommand};
use tracing::debug;

mod commands;
mod console;
mod theme;

use commands::build::BuildAction;
use commands::shell::ShellArgs;
use console::{ConsoleUi, OutputFormat};
use theme::{Theme, print_banner};

/// Berth - local development environments from a manifest
#[derive(Parser)]
#[command(name = "berth")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    log: LogArgs,

    /// Output format: pretty (default) or json
    #[arg(long, global = true, default_value = "pretty")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

/// Logging options, accepted before or after the subcommand.
#[derive(Args, Debug, Clone, Default)]
struct LogArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Write logs to rolling files in this directory instead of stderr
    #[arg(long, global = true, value_name = "DIR")]
    log_file: Option<PathBuf>,

    /// Log file rotation: daily, hourly or never
    #[arg(long, global = true, default_value = "daily")]
    log_rotation: String,

    /// Log line format: pretty, compact, json or full
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// Extra log directives, e.g. berth_proxy=trace
    #[arg(long, global = true, env = "BERTH_LOG", value_delimiter = ',')]
    log_filter: Vec<String>,
}

/// Manifest location shared by every command that loads plugins.
#[derive(Args, Debug, Clone)]
struct ManifestArg {
    /// Path to the manifest (defaults to berth.yml in the current directory)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl ManifestArg {
    fn path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(default_manifest_path)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the environment and keep it running until Ctrl+C
    Run {
        #[command(flatten)]
        manifest: ManifestArg,
    },

    /// Build images with every build plugin
    Build {
        #[command(flatten)]
        manifest: ManifestArg,

        /// Image name (overrides the plugin's configured name)
        #[arg(short, long)]
        image: Option<String>,
    },

    /// Publish images with every build plugin
    Publish {
        #[command(flatten)]
        manifest: ManifestArg,

        /// Image name (overrides the plugin's configured name)
        #[arg(short, long)]
        image: Option<String>,
    },

    /// Open an interactive shell in a running service
    #[command(alias = "interactive")]
    Shell {
        #[command(flatten)]
        manifest: ManifestArg,

        /// Plugin that opens the shell
        #[arg(short, long, default_value = "compose")]
        plugin: String,

        /// Service to enter (default: web)
        #[arg(short, long)]
        service: Option<String>,

        /// User to run as
        #[arg(short, long)]
        user: Option<String>,

        /// Command to run instead of bash
        #[arg(last = true)]
        command: Vec<String>,
    },

    /// Attach to a running service's console
    Attach {
        #[command(flatten)]
        manifest: ManifestArg,

        /// Plugin that attaches
        #[arg(short, long, default_value = "compose")]
        plugin: String,

        /// Service to attach to (default: web)
        #[arg(short, long)]
        service: Option<String>,
    },

    /// Proxy TCP connections to the local X server
    X {
        /// Listener port
        #[arg(long, default_value_t = berth_proxy::DEFAULT_X_PROXY_PORT)]
        port: u16,

        /// X display to forward to
        #[arg(long, env = "DISPLAY")]
        display: Option<String>,
    },

    /// Remove exited containers and dangling images
    Cleanup {
        /// Docker binary (defaults to the one on PATH)
        #[arg(long)]
        docker: Option<PathBuf>,
    },

    /// List available plugins
    Plugins,

    /// Load and validate the manifest
    Validate {
        #[command(flatten)]
        manifest: ManifestArg,
    },
}

impl Commands {
    /// The manifest this command reads, if any.
    fn manifest(&self) -> Option<PathBuf> {
        match self {
            Self::Run { manifest }
            | Self::Build { manifest, .. }
            | Self::Publish { manifest, .. }
            | Self::Shell { manifest, .. }
            | Self::Attach { manifest, .. }
            | Self::Validate { manifest } => Some(manifest.path()),
            Self::X { .. } | Self::Cleanup { .. } | Self::Plugins => None,
        }
    }
}

/// Logging follows the manifest's `loglevel` when it loads and `--verbose`
/// forces debug. Logs go to stderr unless `--log-file` is given, so shells
/// keep stdout.
fn log_config(args: &LogArgs, format: OutputFormat, manifest: Option<&Path>) -> TelemetryResult<LogConfig> {
    let peeked = manifest.and_then(|path| RootConfig::load(path).ok());
    let mut config = match &peeked {
        Some(root) => LogConfig::from(root),
        None => LogConfig::new("info"),
    };

    let log_format = match (&args.log_format, format) {
        (Some(name), _) => name.parse()?,
        (None, OutputFormat::Json) => LogFormat::Json,
        (None, OutputFormat::Pretty) => LogFormat::Compact,
    };
    config = config.with_format(log_format);

    if args.verbose {
        "debug".clone_into(&mut config.level);
        config = config.with_file_info();
    }
    for directive in args.log_filter.iter().filter(|d| !d.trim().is_empty()) {
        config = config.with_directive(directive.trim());
    }

    match &args.log_file {
        Some(directory) => {
            let rotation: FileRotation = args.log_rotation.parse()?;
            Ok(config.with_file_logging(directory, rotation))
        },
        None if !std::io::stderr().is_terminal() => Ok(config.without_ansi()),
        None => Ok(config),
    }
}

async fn dispatch(command: Commands, ui: ArcUi, format: OutputFormat) -> Result<ExitCode> {
    match command {
        Commands::Run { manifest } => {
            if format == OutputFormat::Pretty {
                print_banner();
            }
            return commands::run::run_environment(&manifest.path(), ui).await;
        },
        Commands::Build { manifest, image } => {
            commands::build::run_build(&manifest.path(), image, BuildAction::Build, ui).await?;
        },
        Commands::Publish { manifest, image } => {
            commands::build::run_build(&manifest.path(), image, BuildAction::Publish, ui).await?;
        },
        Commands::Shell {
            manifest,
            plugin,
            service,
            user,
            command,
        } => {
            let args = ShellArgs {
                plugin,
                service,
                user,
                command,
            };
            commands::shell::run_shell(&manifest.path(), &args, ui).await?;
        },
        Commands::Attach {
            manifest,
            plugin,
            service,
        } => {
            let args = ShellArgs {
                plugin,
                service,
                ..ShellArgs::default()
            };
            commands::shell::run_attach(&manifest.path(), &args, ui).await?;
        },
        Commands::X { port, display } => {
            commands::proxy::run_x_proxy(port, display).await?;
        },
        Commands::Cleanup { docker } => {
            commands::cleanup::run_cleanup(docker.as_deref(), ui).await?;
        },
        Commands::Plugins => commands::plugins::list_plugins()?,
        Commands::Validate { manifest } => {
            return commands::validate::run_validate(&manifest.path());
        },
    }
    Ok(ExitCode::SUCCESS)
}

fn report_error(error: &anyhow::Error, manifest: Option<&Path>) {
    eprintln!("{}", Theme::error(&format!("{error:#}")));
    let configuration = error
        .downcast_ref::<RuntimeError>()
        .is_some_and(RuntimeError::is_configuration)
        || error.downcast_ref::<berth_config::ConfigError>().is_some();
    if configuration {
        if let Some(path) = manifest {
            eprintln!("{}", Theme::dimmed(&format!("Check the manifest at {}", path.display())));
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let format = OutputFormat::parse(&cli.format);
    let manifest = cli.command.manifest();

    let logging = log_config(&cli.log, format, manifest.as_deref()).unwrap_or_else(|e| {
        eprintln!("Invalid logging options: {e}");
        LogConfig::default()
    });
    if let Err(e) = berth_telemetry::setup_logging(&logging) {
        eprintln!("Failed to initialize logging: {e}");
    }

    debug!(?format, manifest = ?manifest, "Dispatching command");

    let ui: ArcUi = Arc::new(ConsoleUi::new(format));
    match dispatch(cli.command, ui, format).await {
        Ok(code) => code,
        Err(e) => {
            report_error(&e, manifest.as_deref());
            ExitCode::FAILURE
        },
    }
}
