//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::PipelineBlueprint;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    classes: ClassesInfo,
    publishers: Vec<PublisherInfo>,
}

#[derive(Serialize)]
struct ClassesInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    labels_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    selected: Option<String>,
}

#[derive(Serialize)]
struct PublisherInfo {
    name: String,
    rate_hz: f64,
    formatter: String,
    suppress_empty: bool,
    transport: String,
    target: String,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint);
    }

    Ok(())
}

fn build_config_info(blueprint: &PipelineBlueprint) -> ConfigInfo {
    let publishers = blueprint
        .publishers
        .iter()
        .map(|p| PublisherInfo {
            name: p.name.clone(),
            rate_hz: p.rate_hz,
            formatter: format!("{:?}", p.formatter.kind),
            suppress_empty: p.formatter.suppress_empty,
            transport: p.transport.kind().to_string(),
            target: p.transport.target(),
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        classes: ClassesInfo {
            labels_path: blueprint
                .classes
                .labels_path
                .as_ref()
                .map(|p| p.display().to_string()),
            selected: blueprint.classes.selected.clone(),
        },
        publishers,
    }
}

fn print_config_info(blueprint: &PipelineBlueprint) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Detection Relay Configuration                  ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("🏷️  Classes");
    println!("   ├─ Version: {:?}", blueprint.version);
    match &blueprint.classes.labels_path {
        Some(path) => println!("   ├─ Labels: {}", path.display()),
        None => println!("   ├─ Labels: (none)"),
    }
    println!(
        "   └─ Selected: {}",
        blueprint.classes.selected.as_deref().unwrap_or("(all)")
    );

    println!("\n📤 Publishers ({})", blueprint.publishers.len());
    for (i, publisher) in blueprint.publishers.iter().enumerate() {
        let is_last = i == blueprint.publishers.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!("   {} {} @ {} Hz", prefix, publisher.name, publisher.rate_hz);
        println!(
            "   {}  ├─ Format: {:?}{}",
            child_prefix,
            publisher.formatter.kind,
            if publisher.formatter.suppress_empty {
                " (suppress empty)"
            } else {
                ""
            }
        );
        println!(
            "   {}  └─ Transport: {} {}",
            child_prefix,
            publisher.transport.kind(),
            publisher.transport.target()
        );
    }

    println!();
}
