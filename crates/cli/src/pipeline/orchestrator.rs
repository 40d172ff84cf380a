//! Pipeline orchestrator - wires the detection source to the dispatcher.
//!
//! The source produces detection sets, the dispatcher turns them into
//! results and fans them out to every publisher. Shutdown goes through the
//! shared [`ShutdownCoordinator`], whether triggered by a signal, the
//! timeout, or the source running dry.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use config_loader::resolve_class_selection;
use contracts::{DetectionSet, PipelineBlueprint};
use dispatcher::ShutdownCoordinator;
use ingestion::{
    IngestionMetrics, MockDetectionConfig, MockDetectionSource, ReplayConfig, ReplaySource,
};
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::PipelineStats;
use crate::error::{CliError, Result};

/// Where detection sets come from
#[derive(Debug, Clone)]
pub enum SourceConfig {
    /// Synthetic detections
    Mock(MockDetectionConfig),
    /// Recorded detection sets from a JSON-lines file
    Replay { path: PathBuf, config: ReplayConfig },
}

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Publisher wiring and class selection
    pub blueprint: PipelineBlueprint,

    /// Base directory for relative paths in the blueprint
    pub config_dir: Option<PathBuf>,

    /// Detection source
    pub source: SourceConfig,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Channel buffer size
    pub buffer_size: usize,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Running detection source
enum ActiveSource {
    Mock(MockDetectionSource),
    Replay(ReplaySource),
}

impl ActiveSource {
    fn stop(&self) {
        match self {
            Self::Mock(source) => source.stop(),
            Self::Replay(source) => source.stop(),
        }
    }
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
    coordinator: Arc<ShutdownCoordinator>,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            coordinator: Arc::new(ShutdownCoordinator::new()),
        }
    }

    /// Coordinator used to request shutdown from outside
    pub fn coordinator(&self) -> Arc<ShutdownCoordinator> {
        Arc::clone(&self.coordinator)
    }

    /// Run the pipeline to completion
    pub async fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let selection =
            resolve_class_selection(&blueprint.classes, self.config.config_dir.as_deref())?;
        info!(
            selected_classes = selection.filter.len(),
            labels = selection.table.is_some(),
            "Class selection resolved"
        );

        let source_metrics = Arc::new(IngestionMetrics::new());
        let (source, input_rx) = self.start_source(Arc::clone(&source_metrics))?;

        if blueprint.publishers.is_empty() {
            warn!("No publishers configured - results will be dropped");
        }

        let dispatcher = match dispatcher::create_dispatcher(
            blueprint.publishers.clone(),
            selection,
            input_rx,
            self.coordinator(),
        )
        .await
        {
            Ok(dispatcher) => dispatcher,
            Err(e) => {
                source.stop();
                return Err(e.into());
            }
        };

        let active_publishers = blueprint.publishers.len();
        let mut dispatcher_handle = dispatcher.spawn();
        info!(active_publishers, "Pipeline running");

        let joined = match self.config.timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut dispatcher_handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(timeout_secs = limit.as_secs(), "Pipeline timed out");
                    self.coordinator.begin_shutdown();
                    dispatcher_handle.await
                }
            },
            None => dispatcher_handle.await,
        };

        info!("Shutting down pipeline...");
        source.stop();

        let report = joined.map_err(|e| CliError::pipeline_execution(e.to_string()))?;
        let stats = PipelineStats::from_report(
            report,
            source_metrics.snapshot(),
            start_time.elapsed(),
        );

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            rate = format!("{:.2}", stats.rate()),
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }

    fn start_source(
        &self,
        metrics: Arc<IngestionMetrics>,
    ) -> Result<(ActiveSource, mpsc::Receiver<DetectionSet>)> {
        let capacity = self.config.buffer_size.max(1);

        match &self.config.source {
            SourceConfig::Mock(config) => {
                info!(fps = config.fps, limit = ?config.limit, "Running with MOCK detection source");
                let source = MockDetectionSource::new(config.clone())?;
                let rx = source.start(capacity, Some(metrics));
                Ok((ActiveSource::Mock(source), rx))
            }
            SourceConfig::Replay { path, config } => {
                info!(path = %path.display(), looping = config.looping, "Running in REPLAY mode");
                let source = ReplaySource::load(path, config.clone())?;
                let rx = source.start(capacity, Some(metrics));
                Ok((ActiveSource::Replay(source), rx))
            }
        }
    }
}
