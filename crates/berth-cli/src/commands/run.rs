//! `berth run`: start every sync and run plugin and supervise them.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use berth_core::{ArcUi, Category};
use berth_runtime::RunReport;

use crate::theme::Theme;

/// Load the manifest, run until Ctrl-C or the first failure, and report.
pub(crate) async fn run_environment(manifest: &Path, ui: ArcUi) -> Result<ExitCode> {
    let mut orchestrator = super::load_orchestrator(manifest, ui)?;

    if let Some(config) = orchestrator.manifest() {
        println!("{}", Theme::header(&format!("Starting {}", config.name)));
        println!("{}", Theme::kv("Manifest", &manifest.display().to_string()));
        for category in [Category::Sync, Category::Run] {
            let names: Vec<&str> = orchestrator
                .category_plugins(category)
                .iter()
                .map(|p| p.name())
                .collect();
            if !names.is_empty() {
                println!("{}", Theme::kv(category.as_str(), &names.join(", ")));
            }
        }
        println!("{}", Theme::dimmed("Press Ctrl+C to stop"));
        println!("{}", Theme::separator());
    }

    let report = orchestrator.run().await?;
    print_summary(&report);

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_summary(report: &RunReport) {
    println!("{}", Theme::separator());
    for failure in &report.late_failures {
        eprintln!("{}", Theme::warning(&failure.to_string()));
    }
    if report.teardown.is_clean() {
        println!(
            "{}",
            Theme::success(&format!("Stopped {} plugin(s)", report.teardown.total()))
        );
    } else {
        eprintln!(
            "{}",
            Theme::error(&format!(
                "{} of {} plugin(s) did not stop cleanly",
                report.teardown.failures.len(),
                report.teardown.total()
            ))
        );
    }
}
