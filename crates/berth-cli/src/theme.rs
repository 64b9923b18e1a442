//! CLI theme and styling.

use colored::Colorize;

/// CLI theme configuration.
pub(crate) struct Theme;

impl Theme {
    /// Format a header.
    pub(crate) fn header(text: &str) -> String {
        format!("{}", text.bold().cyan())
    }

    /// Format a success message.
    pub(crate) fn success(text: &str) -> String {
        format!("{} {}", "✓".green(), text)
    }

    /// Format an error message.
    pub(crate) fn error(text: &str) -> String {
        format!("{} {}", "✗".red(), text.red())
    }

    /// Format a warning message.
    pub(crate) fn warning(text: &str) -> String {
        format!("{} {}", "!".yellow(), text.yellow())
    }

    /// Format an info message.
    pub(crate) fn info(text: &str) -> String {
        format!("{} {}", "i".blue(), text)
    }

    /// Format a dimmed message.
    pub(crate) fn dimmed(text: &str) -> String {
        format!("{}", text.dimmed())
    }

    /// Format a stage heading.
    pub(crate) fn stage(text: &str) -> String {
        format!("{} {}", "==>".cyan().bold(), text.bold())
    }

    /// Format a step within a stage.
    pub(crate) fn step(text: &str) -> String {
        format!("  {} {}", "-->".blue(), text)
    }

    /// Format a key-value pair.
    pub(crate) fn kv(key: &str, value: &str) -> String {
        format!("  {}: {}", key.bold(), value)
    }

    /// Format a separator line.
    pub(crate) fn separator() -> String {
        "━".repeat(50).dimmed().to_string()
    }
}

/// Print a banner for the CLI.
pub(crate) fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        "{}",
        format!(
            r"
  _               _   _
 | |__   ___ _ __| |_| |__
 | '_ \ / _ \ '__| __| '_ \
 | |_) |  __/ |  | |_| | | |
 |_.__/ \___|_|   \__|_| |_|
                       v{version}
"
        )
        .cyan()
    );
    println!("{}", "Local development environments".dimmed());
    println!();
}
