//! Manifest discovery and loading.
//!
//! Loading is a straight pipeline:
//! 1. Stat the file and refuse anything over [`MAX_MANIFEST_FILE_SIZE`]
//! 2. Read it and pick the format from the extension
//! 3. Deserialize into [`RootConfig`]
//! 4. Validate

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::types::{ManifestFormat, RootConfig};
use crate::validate;

/// Maximum manifest size in bytes (1 MiB).
pub const MAX_MANIFEST_FILE_SIZE: u64 = 1024 * 1024;

/// File names tried by [`discover`], in order.
pub const MANIFEST_FILE_NAMES: &[&str] = &["berth.yml", "berth.yaml", "berth.toml", "berth.json"];

/// Find a manifest in `dir`.
///
/// Returns the first of [`MANIFEST_FILE_NAMES`] that exists.
#[must_use]
pub fn discover(dir: &Path) -> Option<PathBuf> {
    MANIFEST_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// The manifest the CLI uses when `--config` is not given: a discovered
/// manifest in the working directory, else `./berth.yml`.
#[must_use]
pub fn default_manifest_path() -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    discover(&cwd).unwrap_or_else(|| cwd.join(MANIFEST_FILE_NAMES[0]))
}

/// Load, parse, and validate a manifest file.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, is too large, fails
/// to parse, or fails validation.
pub fn load_file(path: &Path) -> ConfigResult<RootConfig> {
    // Check file size before reading to prevent OOM.
    let metadata = std::fs::metadata(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    if metadata.len() > MAX_MANIFEST_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "manifest is {} bytes, exceeding the {} byte limit",
                metadata.len(),
                MAX_MANIFEST_FILE_SIZE
            ),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    let format = ManifestFormat::from_path(path);
    debug!(path = %path.display(), %format, "parsing manifest");
    let config = parse_str(&content, format, &path.display().to_string())?;

    info!(
        path = %path.display(),
        project = %config.name,
        plugins = config.entry_count(),
        "loaded manifest"
    );
    Ok(config)
}

/// Parse and validate manifest text.
///
/// `origin` labels the source in error messages.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the text fails to parse or validate.
pub fn parse_str(content: &str, format: ManifestFormat, origin: &str) -> ConfigResult<RootConfig> {
    let parse_err = |message: String| ConfigError::ParseError {
        path: origin.to_owned(),
        format: format.as_str(),
        message,
    };

    let config: RootConfig = match format {
        ManifestFormat::Yaml => serde_yaml::from_str(content).map_err(|e| parse_err(e.to_string()))?,
        ManifestFormat::Toml => toml::from_str(content).map_err(|e| parse_err(e.to_string()))?,
        ManifestFormat::Json => {
            serde_json::from_str(content).map_err(|e| parse_err(e.to_string()))?
        },
    };

    validate::validate(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth_core::Category;

    const YAML: &str = r"
name: My Project
loglevel: 1
sync:
  - name: watch
    config:
      paths: [src]
      command: [rsync, -a, src/, remote:/app/src/]
run:
  - name: compose
    config:
      composefile: docker-compose.yml
build:
  - name: compose
shell:
  - name: compose
";

    #[test]
    fn parses_yaml_manifest() {
        let config = parse_str(YAML, ManifestFormat::Yaml, "<test>").unwrap();
        assert_eq!(config.name, "My Project");
        assert_eq!(config.log_level, 1);
        assert_eq!(config.log_filter(), "debug");
        assert_eq!(config.entries(Category::Sync).len(), 1);
        assert_eq!(config.entries(Category::Run)[0].name, "compose");
        assert_eq!(
            config.entries(Category::Run)[0].config["composefile"],
            "docker-compose.yml"
        );
        assert!(config.entries(Category::Build)[0].config.is_null());
        assert_eq!(config.entry_count(), 4);
    }

    #[test]
    fn parses_toml_manifest_with_parameters_alias() {
        let toml = r#"
name = "api"

[[run]]
name = "compose"
parameters = { composefile = "compose.dev.yml" }
"#;
        let config = parse_str(toml, ManifestFormat::Toml, "<test>").unwrap();
        assert_eq!(config.log_level, 2);
        assert_eq!(config.run[0].config["composefile"], "compose.dev.yml");
    }

    #[test]
    fn parses_json_manifest() {
        let json = r#"{"name": "svc", "shell": [{"name": "compose"}]}"#;
        let config = parse_str(json, ManifestFormat::Json, "<test>").unwrap();
        assert_eq!(config.shell.len(), 1);
    }

    #[test]
    fn parse_error_names_origin_and_format() {
        let err = parse_str("name: [unclosed", ManifestFormat::Yaml, "berth.yml").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("berth.yml"), "{msg}");
        assert!(msg.contains("YAML"), "{msg}");
    }

    #[test]
    fn load_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("berth.yml");
        std::fs::write(&path, YAML).unwrap();

        let config = load_file(&path).unwrap();
        assert_eq!(config.name, "My Project");
    }

    #[test]
    fn load_file_missing_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_file(&dir.path().join("absent.yml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn load_file_rejects_oversized_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("berth.yml");
        let padding = "#".repeat(usize::try_from(MAX_MANIFEST_FILE_SIZE)
            .unwrap()
            .saturating_add(1));
        std::fs::write(&path, format!("name: big\n{padding}")).unwrap();

        let err = load_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn discover_prefers_yaml() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover(dir.path()).is_none());

        std::fs::write(dir.path().join("berth.toml"), "name = \"x\"").unwrap();
        assert_eq!(discover(dir.path()).unwrap(), dir.path().join("berth.toml"));

        std::fs::write(dir.path().join("berth.yml"), "name: x").unwrap();
        assert_eq!(discover(dir.path()).unwrap(), dir.path().join("berth.yml"));
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(ManifestFormat::from_path(Path::new("a.yml")), ManifestFormat::Yaml);
        assert_eq!(ManifestFormat::from_path(Path::new("a.YAML")), ManifestFormat::Yaml);
        assert_eq!(ManifestFormat::from_path(Path::new("a.toml")), ManifestFormat::Toml);
        assert_eq!(ManifestFormat::from_path(Path::new("a.json")), ManifestFormat::Json);
        assert_eq!(ManifestFormat::from_path(Path::new("manifest")), ManifestFormat::Yaml);
    }
}
