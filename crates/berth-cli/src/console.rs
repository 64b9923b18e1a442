//! Terminal implementation of the plugin-facing [`Ui`].

use berth_core::Ui;
use dialoguer::Confirm;
use dialoguer::theme::ColorfulTheme;

use crate::theme::Theme;

/// How user-facing messages are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    /// Colored, human-readable lines.
    Pretty,
    /// One JSON object per line on stdout.
    Json,
}

impl OutputFormat {
    pub(crate) fn parse(value: &str) -> Self {
        match value {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Writes plugin and orchestrator messages to the terminal.
///
/// Informational output goes to stdout, warnings and errors to stderr.
/// Prompts are only shown in pretty mode; JSON mode answers `false`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ConsoleUi {
    format: OutputFormat,
}

impl ConsoleUi {
    pub(crate) fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    fn json(level: &str, message: &str) -> String {
        serde_json::json!({ "level": level, "message": message }).to_string()
    }
}

impl Ui for ConsoleUi {
    fn output(&self, message: &str) {
        match self.format {
            OutputFormat::Pretty => println!("{message}"),
            OutputFormat::Json => println!("{}", Self::json("output", message)),
        }
    }

    fn info(&self, message: &str) {
        match self.format {
            OutputFormat::Pretty => println!("{}", Theme::info(message)),
            OutputFormat::Json => println!("{}", Self::json("info", message)),
        }
    }

    fn warn(&self, message: &str) {
        match self.format {
            OutputFormat::Pretty => eprintln!("{}", Theme::warning(message)),
            OutputFormat::Json => println!("{}", Self::json("warn", message)),
        }
    }

    fn error(&self, message: &str) {
        match self.format {
            OutputFormat::Pretty => eprintln!("{}", Theme::error(message)),
            OutputFormat::Json => println!("{}", Self::json("error", message)),
        }
    }

    fn stage(&self, message: &str) {
        match self.format {
            OutputFormat::Pretty => println!("{}", Theme::stage(message)),
            OutputFormat::Json => println!("{}", Self::json("stage", message)),
        }
    }

    fn step(&self, message: &str) {
        match self.format {
            OutputFormat::Pretty => println!("{}", Theme::step(message)),
            OutputFormat::Json => println!("{}", Self::json("step", message)),
        }
    }

    fn confirm(&self, prompt: &str) -> bool {
        if self.format == OutputFormat::Json {
            return false;
        }
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}
