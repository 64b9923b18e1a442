//! `berth validate`: check a manifest without starting anything.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use berth_config::RootConfig;
use berth_core::Category;
use berth_plugins::PluginRegistry;

use crate::theme::Theme;

/// Load the manifest and instantiate every entry the way `run` would,
/// without configuring or starting anything.
pub(crate) fn run_validate(manifest: &Path) -> Result<ExitCode> {
    let config = RootConfig::load(manifest)?;
    let registry = super::builtin_registry()?;

    println!("{}", Theme::header(&format!("Manifest: {}", manifest.display())));
    println!("{}", Theme::kv("Project", &config.name));
    if let Some(description) = &config.description {
        println!("{}", Theme::kv("Description", description));
    }
    println!("{}", Theme::kv("Log level", config.log_filter()));
    for category in Category::ALL {
        let names: Vec<&str> = config.entries(category).iter().map(|e| e.name.as_str()).collect();
        if !names.is_empty() {
            println!("{}", Theme::kv(category.as_str(), &names.join(", ")));
        }
    }

    let problems = entry_problems(&config, &registry);
    if problems.is_empty() {
        println!(
            "{}",
            Theme::success(&format!("Manifest is valid ({} plugin entries)", config.entry_count()))
        );
        Ok(ExitCode::SUCCESS)
    } else {
        for problem in &problems {
            eprintln!("{}", Theme::error(problem));
        }
        Ok(ExitCode::FAILURE)
    }
}

/// One message per entry that would stop `run` from loading.
fn entry_problems(config: &RootConfig, registry: &PluginRegistry) -> Vec<String> {
    let mut problems = Vec::new();
    for category in Category::ALL {
        for entry in config.entries(category) {
            match registry.create(entry) {
                Ok(plugin) if !plugin.capabilities().contains(category) => problems.push(format!(
                    "{category}: plugin '{}' does not support {category}",
                    entry.name
                )),
                Ok(_) => {},
                Err(e) => problems.push(format!("{category}: {e}")),
            }
        }
    }
    problems
}

#[cfg(test)]
mod tests {
    use berth_config::ManifestFormat;

    use super::*;

    fn problems(yaml: &str) -> Vec<String> {
        let config = RootConfig::from_str(yaml, ManifestFormat::Yaml).unwrap();
        entry_problems(&config, &crate::commands::builtin_registry().unwrap())
    }

    #[test]
    fn valid_entries_have_no_problems() {
        let found = problems("name: demo\nsync:\n  - name: watch\n    config:\n      command: [\"true\"]\n");
        assert!(found.is_empty(), "{found:?}");
    }

    #[test]
    fn plugin_under_wrong_category_is_reported() {
        let found = problems("name: demo\nrun:\n  - name: watch\n    config:\n      command: [\"true\"]\n");
        assert_eq!(found.len(), 1);
        assert!(found[0].contains("does not support run"), "{found:?}");
    }

    #[test]
    fn factory_rejection_is_reported() {
        let found = problems("name: demo\nsync:\n  - name: watch\n");
        assert_eq!(found.len(), 1);
        assert!(found[0].contains("command"), "{found:?}");
    }

    #[test]
    fn unknown_plugin_is_reported() {
        let found = problems("name: demo\nbuild:\n  - name: kaniko\n");
        assert_eq!(found.len(), 1);
        assert!(found[0].contains("kaniko"), "{found:?}");
    }

    #[test]
    fn exit_code_reflects_problems() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.yml");
        std::fs::write(&good, "name: demo\nsync:\n  - name: watch\n    config:\n      command: [\"true\"]\n").unwrap();
        assert_eq!(format!("{:?}", run_validate(&good).unwrap()), format!("{:?}", ExitCode::SUCCESS));

        let bad = dir.path().join("bad.yml");
        std::fs::write(&bad, "name: demo\nrun:\n  - name: watch\n    config:\n      command: [\"true\"]\n").unwrap();
        assert_eq!(format!("{:?}", run_validate(&bad).unwrap()), format!("{:?}", ExitCode::FAILURE));
    }
}
