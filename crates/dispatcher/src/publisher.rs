//! Publisher - drains one mailbox, formats and sends at a fixed rate

use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{InferenceResult, Transport};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::error::DispatcherError;
use crate::formatter::Formatter;
use crate::lifecycle::LifecycleHandle;
use crate::mailbox::{PushOutcome, ResultMailbox, SharedMailbox};
use crate::metrics::PublisherMetrics;

/// Outcome of one publish cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStatus {
    Sent,
    /// Formatter returned nothing to send
    Suppressed,
    /// Transport not connected, cycle skipped
    Disconnected,
    Failed,
}

impl PublishStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Suppressed => "suppressed",
            Self::Disconnected => "disconnected",
            Self::Failed => "failed",
        }
    }
}

/// One formatter bound to one transport, fed by its own mailbox
pub struct Publisher<T> {
    name: String,
    formatter: Formatter,
    transport: T,
    mailbox: SharedMailbox,
    interval: Duration,
    lifecycle: LifecycleHandle,
    metrics: Arc<PublisherMetrics>,
}

impl<T: Transport> Publisher<T> {
    /// Create a publisher
    ///
    /// # Errors
    /// `rate_hz` is zero, negative or not finite.
    pub fn new(
        name: impl Into<String>,
        formatter: Formatter,
        transport: T,
        mailbox: SharedMailbox,
        rate_hz: f64,
        lifecycle: LifecycleHandle,
    ) -> Result<Self, DispatcherError> {
        let name = name.into();
        if !rate_hz.is_finite() || rate_hz <= 0.0 {
            return Err(DispatcherError::invalid_rate(name, rate_hz));
        }
        let interval = Duration::try_from_secs_f64(1.0 / rate_hz)
            .map_err(|_| DispatcherError::invalid_rate(&name, rate_hz))?;

        Ok(Self {
            name,
            formatter,
            transport,
            mailbox,
            interval,
            lifecycle,
            metrics: Arc::new(PublisherMetrics::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Delay between two publish cycles
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run the publish loop until the mailbox is closed and drained
    #[instrument(
        name = "publisher_run",
        skip(self),
        fields(
            publisher = %self.name,
            formatter = ?self.formatter.kind(),
            transport = %self.transport.name()
        )
    )]
    pub async fn run(mut self) {
        info!(interval_ms = self.interval.as_millis() as u64, "Publisher started");

        while let Some(result) = self.mailbox.pop().await {
            self.metrics.inc_received_count();

            let status = self.publish(&result).await;
            observability::record_message_published(&self.name, status.as_str());

            pace(self.interval, &self.lifecycle, &self.name).await;
        }

        info!(
            received = self.metrics.received_count(),
            sent = self.metrics.sent_count(),
            "Publisher stopped"
        );
    }

    async fn publish(&mut self, result: &InferenceResult) -> PublishStatus {
        if !self.transport.is_connected() {
            self.metrics.inc_disconnected_count();
            warn!(publisher = %self.name, "Transport not connected, skipping message");
            return PublishStatus::Disconnected;
        }

        let message = self.formatter.format(result);
        if message.is_empty() {
            self.metrics.inc_suppressed_count();
            debug!(publisher = %self.name, "Nothing to send, skipping");
            return PublishStatus::Suppressed;
        }

        let started = Instant::now();
        let outcome = self.transport.send(&message).await;
        observability::record_send_latency_ms(
            &self.name,
            started.elapsed().as_secs_f64() * 1000.0,
        );

        match outcome {
            Ok(()) => {
                self.metrics.inc_sent_count();
                PublishStatus::Sent
            }
            Err(e) => {
                self.metrics.inc_failure_count();
                error!(publisher = %self.name, error = %e, "Failed to send message");
                PublishStatus::Failed
            }
        }
    }
}

/// Handle to a running publisher task
pub struct PublisherHandle {
    name: String,
    mailbox: SharedMailbox,
    metrics: Arc<PublisherMetrics>,
    worker_handle: JoinHandle<()>,
}

impl PublisherHandle {
    /// Spawn the publisher loop on its own task
    pub fn spawn<T: Transport + 'static>(publisher: Publisher<T>) -> Self {
        let name = publisher.name.clone();
        let mailbox = Arc::clone(&publisher.mailbox);
        let metrics = Arc::clone(&publisher.metrics);

        let worker_handle = tokio::spawn(publisher.run());

        Self {
            name,
            mailbox,
            metrics,
            worker_handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<PublisherMetrics> {
        &self.metrics
    }

    pub fn mailbox(&self) -> &SharedMailbox {
        &self.mailbox
    }

    /// Hand a result to this publisher (non-blocking)
    ///
    /// Overwrites a result the publisher has not picked up yet.
    pub fn push(&self, result: Arc<InferenceResult>) -> PushOutcome {
        let outcome = self.mailbox.push(result);
        match outcome {
            PushOutcome::Replaced => {
                self.metrics.inc_overwritten_count();
                observability::record_mailbox_overwrite(&self.name);
            }
            PushOutcome::Closed => {
                debug!(publisher = %self.name, "Mailbox closed, result discarded");
            }
            PushOutcome::Stored => {}
        }
        outcome
    }

    /// Close the mailbox and wait for the loop to drain
    #[instrument(name = "publisher_handle_shutdown", skip(self), fields(publisher = %self.name))]
    pub async fn shutdown(self) {
        self.mailbox.close();
        if let Err(e) = self.worker_handle.await {
            error!(publisher = %self.name, error = ?e, "Publisher task panicked");
        }
        debug!(publisher = %self.name, "PublisherHandle shutdown complete");
    }
}

/// Sleep one interval, cut short once the pipeline stops running
async fn pace(interval: Duration, lifecycle: &LifecycleHandle, name: &str) {
    if !lifecycle.is_running() {
        return;
    }
    tokio::select! {
        _ = tokio::time::sleep(interval) => {}
        _ = lifecycle.stopping() => {
            debug!(publisher = %name, "Pacing interrupted by shutdown");
        }
    }
}

/// Fresh mailbox for a new publisher
pub fn new_mailbox() -> SharedMailbox {
    Arc::new(ResultMailbox::new())
}
