//! Interactive shell configuration.

use serde::{Deserialize, Serialize};

/// Service used when neither the default nor the caller names one.
pub const DEFAULT_SHELL_SERVICE: &str = "web";

/// How to open or attach an interactive session.
///
/// [`ShellConfig::default`] is the process-wide base. Callers pass partial
/// overrides to [`ShellConfig::merged`]; empty fields in the override keep
/// the default's value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Command to run inside the environment.
    pub command: Vec<String>,
    /// User to run the command as. Empty means the image default.
    pub user: String,
    /// Service (container) to target.
    pub service: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            command: vec!["bash".to_string()],
            user: String::new(),
            service: DEFAULT_SHELL_SERVICE.to_string(),
        }
    }
}

impl ShellConfig {
    /// An override that sets nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            command: Vec::new(),
            user: String::new(),
            service: String::new(),
        }
    }

    /// Set the service.
    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    /// Set the user.
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Set the command.
    #[must_use]
    pub fn with_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    /// Overlay `overrides` onto `self`.
    ///
    /// Non-empty override fields replace the base; empty ones keep it.
    #[must_use]
    pub fn overlay(mut self, overrides: Self) -> Self {
        if !overrides.command.is_empty() {
            self.command = overrides.command;
        }
        if !overrides.user.is_empty() {
            self.user = overrides.user;
        }
        if !overrides.service.is_empty() {
            self.service = overrides.service;
        }
        if self.service.is_empty() {
            DEFAULT_SHELL_SERVICE.clone_into(&mut self.service);
        }
        self
    }

    /// Overlay `overrides` onto the process-wide default.
    #[must_use]
    pub fn merged(overrides: Self) -> Self {
        Self::default().overlay(overrides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_override_keeps_other_defaults() {
        let merged = ShellConfig::merged(ShellConfig::empty().with_service("worker"));
        assert_eq!(
            merged,
            ShellConfig {
                command: vec!["bash".to_string()],
                user: String::new(),
                service: "worker".to_string(),
            }
        );
    }

    #[test]
    fn empty_override_yields_default() {
        assert_eq!(
            ShellConfig::merged(ShellConfig::empty()),
            ShellConfig::default()
        );
    }

    #[test]
    fn every_set_field_wins() {
        let merged = ShellConfig::merged(
            ShellConfig::empty()
                .with_service("db")
                .with_user("postgres")
                .with_command(["psql", "-U", "postgres"]),
        );
        assert_eq!(merged.service, "db");
        assert_eq!(merged.user, "postgres");
        assert_eq!(merged.command, vec!["psql", "-U", "postgres"]);
    }

    #[test]
    fn merging_is_idempotent() {
        let once = ShellConfig::merged(ShellConfig::empty().with_user("root"));
        let twice = once.clone().overlay(ShellConfig::empty().with_user("root"));
        assert_eq!(once, twice);
    }

    #[test]
    fn service_never_empty_after_overlay() {
        let base = ShellConfig::empty();
        let merged = base.overlay(ShellConfig::empty());
        assert_eq!(merged.service, DEFAULT_SHELL_SERVICE);
    }
}
