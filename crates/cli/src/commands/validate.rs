//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{FormatterKind, PipelineBlueprint, TransportConfig};

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    publisher_count: usize,
    file_publishers: usize,
    udp_publishers: usize,
    class_selection: Option<String>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            let file_publishers = blueprint
                .publishers
                .iter()
                .filter(|p| matches!(p.transport, TransportConfig::File { .. }))
                .count();

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    publisher_count: blueprint.publishers.len(),
                    file_publishers,
                    udp_publishers: blueprint.publishers.len() - file_publishers,
                    class_selection: blueprint.classes.selected.clone(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &PipelineBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.publishers.is_empty() {
        warnings.push("No publishers configured - results will be dropped".to_string());
    }

    for publisher in &blueprint.publishers {
        let formatter = &publisher.formatter;
        let selective = matches!(
            formatter.kind,
            FormatterKind::SelectiveJson | FormatterKind::SelectiveBs
        );

        if !formatter.class_mapping.is_empty() && !selective {
            warnings.push(format!(
                "Publisher '{}' has a class mapping but {:?} ignores it",
                publisher.name, formatter.kind
            ));
        }
        if publisher.rate_hz > 100.0 {
            warnings.push(format!(
                "Publisher '{}' runs at {} Hz, faster than most detection loops",
                publisher.name, publisher.rate_hz
            ));
        }
    }

    if blueprint.classes.labels_path.is_some() && blueprint.classes.selected.is_none() {
        warnings.push("classes.labels_path is set without classes.selected - all classes are published".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!(
                "  Publishers: {} ({} file, {} udp)",
                summary.publisher_count, summary.file_publishers, summary.udp_publishers
            );
            println!(
                "  Classes: {}",
                summary.class_selection.as_deref().unwrap_or("(all)")
            );
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
