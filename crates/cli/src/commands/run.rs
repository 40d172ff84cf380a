//! `run` command implementation.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use config_loader::ConfigLoader;
use contracts::PipelineBlueprint;
use ingestion::{MockDetectionConfig, ReplayConfig};

use crate::cli::{RunArgs, SourceKind, DEFAULT_CONFIG_PATH};
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig, SourceConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    let (mut blueprint, config_path) = load_blueprint(args)?;

    // Apply CLI overrides
    if let Some(ref classes) = args.classes {
        info!(classes = %classes, "Overriding class selection from CLI");
        blueprint.classes.selected = Some(classes.clone());
    }
    if let Some(ref labels) = args.labels {
        info!(labels = %labels.display(), "Overriding labels file from CLI");
        blueprint.classes.labels_path = Some(labels.clone());
    }
    if args.suppress_empty {
        blueprint.set_suppress_empty(true);
    }

    ConfigLoader::validate(&blueprint).context("Invalid configuration after CLI overrides")?;

    info!(
        publishers = blueprint.publishers.len(),
        selected = ?blueprint.classes.selected,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint, config_path.as_deref());
        return Ok(());
    }

    let limit = (args.max_results > 0).then_some(args.max_results);
    let source = match args.source {
        SourceKind::Mock => SourceConfig::Mock(MockDetectionConfig {
            fps: args.fps,
            limit,
            seed: args.seed,
            ..Default::default()
        }),
        SourceKind::Replay => SourceConfig::Replay {
            path: args
                .replay
                .clone()
                .context("--replay is required for the replay source")?,
            config: ReplayConfig {
                fps: args.fps,
                looping: args.replay_loop,
                limit,
                ..Default::default()
            },
        },
    };

    let pipeline_config = PipelineConfig {
        blueprint,
        // Relative paths resolve against the config file's directory
        config_dir: config_path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf),
        source,
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        buffer_size: args.buffer_size,
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    };

    let pipeline = Pipeline::new(pipeline_config);
    let coordinator = pipeline.coordinator();

    let signal_task = tokio::spawn(async move {
        setup_shutdown_signal().await;
        warn!("Received shutdown signal, stopping pipeline...");
        coordinator.begin_shutdown();
    });

    info!("Starting pipeline...");
    let result = pipeline.run().await;
    signal_task.abort();

    let stats = result.context("Pipeline execution failed")?;
    info!(
        results = stats.results_dispatched,
        sent = stats.total_sent(),
        duration_secs = stats.duration.as_secs_f64(),
        "Pipeline completed"
    );
    stats.print_summary();

    info!("Detection relay finished");
    Ok(())
}

/// Load the blueprint from `--config`, `relay.toml`, or the built-in wiring
fn load_blueprint(args: &RunArgs) -> Result<(PipelineBlueprint, Option<PathBuf>)> {
    let path = match &args.config {
        Some(path) if !path.exists() => {
            return Err(CliError::config_not_found(path.display().to_string()).into());
        }
        Some(path) => Some(path.clone()),
        None => {
            let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
            fallback.exists().then_some(fallback)
        }
    };

    match path {
        Some(path) => {
            info!(config = %path.display(), "Loading configuration");
            let blueprint = ConfigLoader::load_from_path(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            Ok((blueprint, Some(path)))
        }
        None => {
            info!("No configuration file, using built-in publisher wiring");
            Ok((PipelineBlueprint::default_wiring(), None))
        }
    }
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &PipelineBlueprint, config_path: Option<&Path>) {
    println!("\n=== Configuration Summary ===\n");
    match config_path {
        Some(path) => println!("Source: {}", path.display()),
        None => println!("Source: built-in wiring"),
    }

    println!("\nClasses:");
    println!(
        "  Labels: {}",
        blueprint
            .classes
            .labels_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none)".to_string())
    );
    println!(
        "  Selected: {}",
        blueprint.classes.selected.as_deref().unwrap_or("(all)")
    );

    println!("\nPublishers ({}):", blueprint.publishers.len());
    for publisher in &blueprint.publishers {
        println!(
            "  - {} ({:?} -> {} {}) @ {} Hz{}",
            publisher.name,
            publisher.formatter.kind,
            publisher.transport.kind(),
            publisher.transport.target(),
            publisher.rate_hz,
            if publisher.formatter.suppress_empty {
                ", suppress empty"
            } else {
                ""
            }
        );
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn run_args(extra: &[&str]) -> RunArgs {
        let argv = ["detection-relay", "run"].into_iter().chain(extra.iter().copied());
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Run(args) => args,
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_missing_explicit_config_is_error() {
        let args = run_args(&["--config", "/nonexistent/relay.toml"]);
        let err = load_blueprint(&args).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_explicit_config_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        std::fs::write(
            &path,
            r#"
[[publishers]]
name = "faces"
rate_hz = 2.0
formatter = { kind = "faces_bs" }
transport = { type = "udp", host = "127.0.0.1", port = 5000 }
"#,
        )
        .unwrap();

        let args = run_args(&["--config", path.to_str().unwrap()]);
        let (blueprint, loaded_from) = load_blueprint(&args).unwrap();
        assert_eq!(blueprint.publishers.len(), 1);
        assert_eq!(blueprint.publishers[0].name, "faces");
        assert_eq!(loaded_from.as_deref(), Some(path.as_path()));
    }
}
