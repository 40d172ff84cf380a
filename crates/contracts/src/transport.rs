//! Transport trait - Publisher output interface
//!
//! Abstracts "send bytes somewhere" so publishers stay transport-agnostic.

use crate::ContractError;

/// Delivery mechanism owned by exactly one publisher
#[trait_variant::make(Transport: Send)]
pub trait LocalTransport {
    /// Transport name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Whether the transport can currently accept data
    ///
    /// A disconnected transport is skipped by the publisher for that cycle.
    fn is_connected(&self) -> bool;

    /// Deliver one formatted payload
    ///
    /// # Errors
    /// Returns a send error; the caller logs it and moves on.
    async fn send(&mut self, data: &str) -> Result<(), ContractError>;
}
