//! Subscriber construction from a [`LogConfig`].

use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::{Directive, ParseError};
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::error::{TelemetryError, TelemetryResult};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// File name prefix for rolling log files.
pub const LOG_FILE_PREFIX: &str = "berth";

/// How often a log file rolls over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FileRotation {
    /// One file per day.
    #[default]
    Daily,
    /// One file per hour.
    Hourly,
    /// A single file.
    Never,
}

impl FileRotation {
    fn rotation(self) -> Rotation {
        match self {
            Self::Daily => Rotation::DAILY,
            Self::Hourly => Rotation::HOURLY,
            Self::Never => Rotation::NEVER,
        }
    }
}

impl FromStr for FileRotation {
    type Err = TelemetryError;

    fn from_str(value: &str) -> TelemetryResult<Self> {
        match value.to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "hourly" => Ok(Self::Hourly),
            "never" => Ok(Self::Never),
            _ => Err(TelemetryError::ConfigError(format!(
                "unknown log rotation '{value}' (expected daily, hourly or never)"
            ))),
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line with source locations.
    Pretty,
    /// One line per event.
    #[default]
    Compact,
    /// One JSON object per event.
    Json,
    /// The `tracing-subscriber` default layout.
    Full,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(value: &str) -> TelemetryResult<Self> {
        match value.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            "full" => Ok(Self::Full),
            _ => Err(TelemetryError::ConfigError(format!(
                "unknown log format '{value}' (expected pretty, compact, json or full)"
            ))),
        }
    }
}

/// Where log lines go.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LogTarget {
    /// Standard error. Keeps logs apart from plugin output on stdout.
    #[default]
    Stderr,
    /// Rolling files named `{prefix}.{period}.log`.
    File {
        /// Directory holding the files; created if missing.
        directory: PathBuf,
        /// File name prefix.
        prefix: String,
        /// Roll-over period.
        rotation: FileRotation,
    },
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Base filter level (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    /// Line format.
    pub format: LogFormat,
    /// Output target.
    pub target: LogTarget,
    /// ANSI colors.
    pub ansi: bool,
    /// Include source file and line.
    pub file_info: bool,
    /// Per-target overrides such as `berth_proxy=trace`.
    pub directives: Vec<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new("info")
    }
}

impl LogConfig {
    /// Compact lines on stderr at the given base level.
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            format: LogFormat::default(),
            target: LogTarget::default(),
            ansi: true,
            file_info: false,
            directives: Vec::new(),
        }
    }

    /// Set the line format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Write to rolling `berth.*.log` files in `directory`, without colors.
    #[must_use]
    pub fn with_file_logging(mut self, directory: impl Into<PathBuf>, rotation: FileRotation) -> Self {
        self.target = LogTarget::File {
            directory: directory.into(),
            prefix: LOG_FILE_PREFIX.to_string(),
            rotation,
        };
        self.ansi = false;
        self
    }

    /// Add a per-target directive.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Include source file and line.
    #[must_use]
    pub fn with_file_info(mut self) -> Self {
        self.file_info = true;
        self
    }

    /// Disable ANSI colors.
    #[must_use]
    pub fn without_ansi(mut self) -> Self {
        self.ansi = false;
        self
    }

    fn filter(&self) -> TelemetryResult<EnvFilter> {
        let invalid = |e: ParseError| TelemetryError::ConfigError(e.to_string());
        let base = EnvFilter::try_new(&self.level).map_err(invalid)?;
        self.directives.iter().try_fold(base, |filter, directive| {
            let directive: Directive = directive.parse().map_err(invalid)?;
            Ok(filter.add_directive(directive))
        })
    }

    fn layer<W>(&self, writer: W) -> BoxedLayer
    where
        W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        let base = fmt::layer()
            .with_writer(writer)
            .with_ansi(self.ansi)
            .with_file(self.file_info)
            .with_line_number(self.file_info);

        match self.format {
            LogFormat::Pretty => base.pretty().boxed(),
            LogFormat::Compact => base.compact().boxed(),
            LogFormat::Json => base.json().boxed(),
            LogFormat::Full => base.boxed(),
        }
    }
}

#[cfg(feature = "config")]
impl From<&berth_config::RootConfig> for LogConfig {
    /// Use the manifest's ordinal `loglevel` as the base level.
    fn from(config: &berth_config::RootConfig) -> Self {
        Self::new(config.log_filter())
    }
}

fn rolling_appender(
    directory: &Path,
    prefix: &str,
    rotation: FileRotation,
) -> TelemetryResult<RollingFileAppender> {
    std::fs::create_dir_all(directory)?;
    RollingFileAppender::builder()
        .rotation(rotation.rotation())
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(directory)
        .map_err(|e| {
            TelemetryError::InitError(format!("cannot open log file in {}: {e}", directory.display()))
        })
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns an error if the filter is invalid, the log directory cannot be
/// created, or a subscriber is already installed.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let filter = config.filter()?;

    let layer = match &config.target {
        LogTarget::Stderr => config.layer(std::io::stderr),
        LogTarget::File {
            directory,
            prefix,
            rotation,
        } => config.layer(rolling_appender(directory, prefix, *rotation)?),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()
        .map_err(|e| TelemetryError::InitError(e.to_string()))
}
