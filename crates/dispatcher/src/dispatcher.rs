//! Dispatcher - producer fan-out into every publisher's mailbox

use std::collections::HashSet;
use std::sync::Arc;

use contracts::{
    ClassSelection, DetectionSet, InferenceResult, PublisherConfig, Transport, TransportConfig,
    MAX_DETECTIONS,
};
use observability::{ResultStatsAggregator, ResultSummary};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::error::DispatcherError;
use crate::formatter::Formatter;
use crate::lifecycle::{LifecycleHandle, ShutdownCoordinator};
use crate::mailbox::SharedMailbox;
use crate::metrics::MetricsSnapshot;
use crate::publisher::{new_mailbox, Publisher, PublisherHandle};
use crate::transports::{FileTransport, UdpTransport, UdpTransportConfig};

/// Dispatcher configuration
#[derive(Debug, Clone, Default)]
pub struct DispatcherConfig {
    /// Publisher definitions
    pub publishers: Vec<PublisherConfig>,
    /// Class filter and name table attached to every result
    pub selection: ClassSelection,
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    input_rx: mpsc::Receiver<DetectionSet>,
    coordinator: Arc<ShutdownCoordinator>,
}

impl DispatcherBuilder {
    /// Create a new DispatcherBuilder
    pub fn new(
        config: DispatcherConfig,
        input_rx: mpsc::Receiver<DetectionSet>,
        coordinator: Arc<ShutdownCoordinator>,
    ) -> Self {
        Self {
            config,
            input_rx,
            coordinator,
        }
    }

    /// Build transports, spawn publishers and return the dispatcher
    ///
    /// # Errors
    /// Duplicate publisher names, invalid rates, unresolvable UDP targets.
    #[instrument(name = "dispatcher_builder_build", skip(self))]
    pub async fn build(self) -> Result<Dispatcher, DispatcherError> {
        let handles = Self::initialize_handles(&self.config, &self.coordinator).await?;

        Ok(Dispatcher::with_handles(
            handles,
            self.input_rx,
            self.config.selection,
            self.coordinator,
        ))
    }

    #[instrument(
        name = "dispatcher_initialize_handles",
        skip(config, coordinator),
        fields(publisher_count = config.publishers.len())
    )]
    async fn initialize_handles(
        config: &DispatcherConfig,
        coordinator: &ShutdownCoordinator,
    ) -> Result<Vec<PublisherHandle>, DispatcherError> {
        let mut names = HashSet::new();
        for publisher in &config.publishers {
            if !names.insert(publisher.name.as_str()) {
                return Err(DispatcherError::DuplicatePublisher {
                    name: publisher.name.clone(),
                });
            }
        }

        let mut handles = Vec::with_capacity(config.publishers.len());
        for publisher_config in &config.publishers {
            match create_publisher_handle(publisher_config, coordinator).await {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    for handle in handles {
                        handle.shutdown().await;
                    }
                    return Err(e);
                }
            }
        }
        Ok(handles)
    }
}

/// Create a running PublisherHandle from configuration
#[instrument(
    name = "dispatcher_create_publisher_handle",
    skip(config, coordinator),
    fields(
        publisher = %config.name,
        transport = config.transport.kind(),
        target = %config.transport.target()
    )
)]
async fn create_publisher_handle(
    config: &PublisherConfig,
    coordinator: &ShutdownCoordinator,
) -> Result<PublisherHandle, DispatcherError> {
    let formatter = Formatter::from_config(&config.formatter);

    match &config.transport {
        TransportConfig::File { path } => {
            let transport = FileTransport::new(&config.name, path);
            spawn_publisher(config, formatter, transport, coordinator)
        }
        TransportConfig::Udp {
            host,
            port,
            max_datagram_size,
        } => {
            let udp_config = UdpTransportConfig::resolve(host, *port, *max_datagram_size)
                .await
                .map_err(|e| DispatcherError::transport_creation(&config.name, e.to_string()))?;
            let transport = UdpTransport::new(&config.name, udp_config).await;
            spawn_publisher(config, formatter, transport, coordinator)
        }
    }
}

fn spawn_publisher<T: Transport + 'static>(
    config: &PublisherConfig,
    formatter: Formatter,
    transport: T,
    coordinator: &ShutdownCoordinator,
) -> Result<PublisherHandle, DispatcherError> {
    let mailbox: SharedMailbox = new_mailbox();
    let publisher = Publisher::new(
        &config.name,
        formatter,
        transport,
        Arc::clone(&mailbox),
        config.rate_hz,
        coordinator.handle(),
    )?;
    coordinator.register(mailbox);
    Ok(PublisherHandle::spawn(publisher))
}

/// Final report of a dispatcher run
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    /// Results fanned out
    pub results: u64,
    /// Per-result statistics
    pub summary: ResultSummary,
    /// Per-publisher counters
    pub publishers: Vec<(String, MetricsSnapshot)>,
}

/// The producer side: wraps each DetectionSet and fans it out
pub struct Dispatcher {
    handles: Vec<PublisherHandle>,
    input_rx: mpsc::Receiver<DetectionSet>,
    selection: ClassSelection,
    coordinator: Arc<ShutdownCoordinator>,
    lifecycle: LifecycleHandle,
    stats: ResultStatsAggregator,
}

impl Dispatcher {
    /// Create a dispatcher with already running publishers
    ///
    /// The publishers' mailboxes must be registered with `coordinator`.
    pub fn with_handles(
        handles: Vec<PublisherHandle>,
        input_rx: mpsc::Receiver<DetectionSet>,
        selection: ClassSelection,
        coordinator: Arc<ShutdownCoordinator>,
    ) -> Self {
        let lifecycle = coordinator.handle();
        Self {
            handles,
            input_rx,
            selection,
            coordinator,
            lifecycle,
            stats: ResultStatsAggregator::new(),
        }
    }

    /// Get metrics for all publishers
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Run the fan-out loop
    ///
    /// Returns after end of input or shutdown, once every publisher has
    /// drained and the pipeline is Stopped.
    #[instrument(name = "dispatcher_run", skip(self))]
    pub async fn run(mut self) -> DispatchReport {
        info!(publishers = self.handles.len(), "Dispatcher started");

        let lifecycle = self.lifecycle.clone();
        let mut result_count: u64 = 0;

        loop {
            let next = tokio::select! {
                biased;
                _ = lifecycle.stopping() => {
                    info!(results = result_count, "Shutdown requested, stopping fan-out");
                    break;
                }
                next = self.input_rx.recv() => next,
            };

            let Some(set) = next else {
                info!(results = result_count, "Input closed, shutting down");
                break;
            };

            result_count += 1;
            self.dispatch(set);

            if result_count.is_multiple_of(100) {
                debug!(results = result_count, "Dispatcher progress");
            }
        }

        self.coordinator.begin_shutdown();

        let handles = std::mem::take(&mut self.handles);
        let mut publishers = Vec::with_capacity(handles.len());
        for handle in handles {
            let name = handle.name().to_string();
            let metrics = Arc::clone(handle.metrics());
            handle.shutdown().await;
            publishers.push((name, metrics.snapshot()));
        }

        self.coordinator.mark_stopped();
        info!("Dispatcher shutdown complete");

        DispatchReport {
            results: result_count,
            summary: self.stats.summary(),
            publishers,
        }
    }

    /// Spawn the dispatcher as a background task
    pub fn spawn(self) -> JoinHandle<DispatchReport> {
        tokio::spawn(self.run())
    }

    fn dispatch(&mut self, set: DetectionSet) {
        if set.detections.len() > MAX_DETECTIONS {
            warn!(
                detections = set.detections.len(),
                max = MAX_DETECTIONS,
                "Too many detections, truncating"
            );
        }
        let result = InferenceResult::from_detection_set(set, &self.selection);
        observability::record_result_produced(&result);
        self.stats.update(&result);

        let result = Arc::new(result);
        for handle in &self.handles {
            handle.push(Arc::clone(&result));
        }
    }
}

/// Convenience function to create a dispatcher from publisher configs
#[instrument(name = "dispatcher_create", skip_all)]
pub async fn create_dispatcher(
    publishers: Vec<PublisherConfig>,
    selection: ClassSelection,
    input_rx: mpsc::Receiver<DetectionSet>,
    coordinator: Arc<ShutdownCoordinator>,
) -> Result<Dispatcher, DispatcherError> {
    let config = DispatcherConfig {
        publishers,
        selection,
    };
    DispatcherBuilder::new(config, input_rx, coordinator)
        .build()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::PipelineState;
    use contracts::{BoundingBox, ClassFilter, Detection, FormatterConfig, FormatterKind};
    use serde_json::Value;
    use tempfile::tempdir;
    use tokio::net::UdpSocket;
    use tokio::time::{timeout, Duration};

    fn publisher_config(name: &str, kind: FormatterKind, transport: TransportConfig) -> PublisherConfig {
        PublisherConfig {
            name: name.to_string(),
            rate_hz: 100.0,
            formatter: FormatterConfig::new(kind),
            transport,
        }
    }

    fn detection_set() -> DetectionSet {
        DetectionSet::now(vec![
            Detection::new(0, "person", 0.9, BoundingBox::default()),
            Detection::new(0, "person", 0.8, BoundingBox::default()),
            Detection::new(2, "car", 0.7, BoundingBox::default()),
        ])
    }

    #[tokio::test]
    async fn test_dispatcher_fanout_to_every_publisher() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("first.json");
        let second = dir.path().join("second.json");

        let (input_tx, input_rx) = mpsc::channel(10);
        let coordinator = Arc::new(ShutdownCoordinator::new());
        let dispatcher = create_dispatcher(
            vec![
                publisher_config("first", FormatterKind::Json, TransportConfig::file(&first)),
                publisher_config("second", FormatterKind::Json, TransportConfig::file(&second)),
            ],
            ClassSelection::new(ClassFilter::from_ids([0, 2]), None),
            input_rx,
            Arc::clone(&coordinator),
        )
        .await
        .unwrap();

        let handle = dispatcher.spawn();
        input_tx.send(detection_set()).await.unwrap();
        drop(input_tx);

        let report = timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
        assert_eq!(report.results, 1);
        assert_eq!(coordinator.state(), PipelineState::Stopped);

        for path in [&first, &second] {
            let output: Value =
                serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
            assert_eq!(output["person"], 2);
            assert_eq!(output["car"], 1);
        }
        for (_, snapshot) in &report.publishers {
            assert_eq!(snapshot.received_count, 1);
            assert_eq!(snapshot.sent_count, 1);
        }
    }

    #[tokio::test]
    async fn test_dispatcher_udp_publisher() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = receiver.local_addr().unwrap().port();

        let (input_tx, input_rx) = mpsc::channel(10);
        let coordinator = Arc::new(ShutdownCoordinator::new());
        let dispatcher = create_dispatcher(
            vec![publisher_config(
                "udp",
                FormatterKind::SelectiveBs,
                TransportConfig::udp("127.0.0.1", port),
            )],
            ClassSelection::new(ClassFilter::from_ids([0]), None),
            input_rx,
            coordinator,
        )
        .await
        .unwrap();

        let handle = dispatcher.spawn();
        input_tx.send(detection_set()).await.unwrap();

        let mut buf = [0u8; 1024];
        let (len, _) = timeout(Duration::from_secs(2), receiver.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        let message = std::str::from_utf8(&buf[..len]).unwrap();
        assert!(message.starts_with("person:2!!timestamp:"));

        drop(input_tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_rate_is_fatal() {
        let (_input_tx, input_rx) = mpsc::channel(1);
        let mut config = publisher_config("bad", FormatterKind::Json, TransportConfig::file("/tmp/x.json"));
        config.rate_hz = 0.0;

        let result = create_dispatcher(
            vec![config],
            ClassSelection::default(),
            input_rx,
            Arc::new(ShutdownCoordinator::new()),
        )
        .await;
        assert!(matches!(result, Err(DispatcherError::InvalidRate { .. })));
    }

    #[tokio::test]
    async fn test_duplicate_names_rejected() {
        let (_input_tx, input_rx) = mpsc::channel(1);
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.json");

        let result = create_dispatcher(
            vec![
                publisher_config("dup", FormatterKind::Json, TransportConfig::file(&path)),
                publisher_config("dup", FormatterKind::FacesJson, TransportConfig::file(&path)),
            ],
            ClassSelection::default(),
            input_rx,
            Arc::new(ShutdownCoordinator::new()),
        )
        .await;
        assert!(matches!(result, Err(DispatcherError::DuplicatePublisher { .. })));
    }

    #[tokio::test]
    async fn test_external_shutdown_stops_dispatcher() {
        let dir = tempdir().unwrap();
        let (input_tx, input_rx) = mpsc::channel(10);
        let coordinator = Arc::new(ShutdownCoordinator::new());
        let dispatcher = create_dispatcher(
            vec![publisher_config(
                "snapshot",
                FormatterKind::Json,
                TransportConfig::file(dir.path().join("out.json")),
            )],
            ClassSelection::default(),
            input_rx,
            Arc::clone(&coordinator),
        )
        .await
        .unwrap();

        let handle = dispatcher.spawn();
        input_tx.send(detection_set()).await.unwrap();
        coordinator.begin_shutdown();

        timeout(Duration::from_secs(2), handle)
            .await
            .expect("dispatcher stops while input is still open")
            .unwrap();
        assert_eq!(coordinator.state(), PipelineState::Stopped);
    }
}
