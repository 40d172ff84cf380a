//! # Dispatcher
//!
//! Result distribution module.
//!
//! Responsibilities:
//! - Wrap each `DetectionSet` into an `InferenceResult`
//! - Fan out to one mailbox per publisher (latest value wins)
//! - Format and deliver per publisher, at its own rate
//! - Isolate failing transports from the rest of the pipeline

pub mod dispatcher;
pub mod error;
pub mod formatter;
pub mod lifecycle;
pub mod mailbox;
pub mod metrics;
pub mod publisher;
pub mod transports;

pub use contracts::{InferenceResult, Transport};
pub use dispatcher::{
    create_dispatcher, DispatchReport, Dispatcher, DispatcherBuilder, DispatcherConfig,
};
pub use error::DispatcherError;
pub use formatter::{class_counts, Formatter};
pub use lifecycle::{LifecycleHandle, PipelineState, ShutdownCoordinator};
pub use mailbox::{PushOutcome, ResultMailbox, SharedMailbox};
pub use metrics::{MetricsSnapshot, PublisherMetrics};
pub use publisher::{new_mailbox, PublishStatus, Publisher, PublisherHandle};
pub use transports::{FileTransport, UdpTransport, UdpTransportConfig};
