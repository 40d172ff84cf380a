//! UdpTransport - fire-and-forget datagrams

use std::net::SocketAddr;

use contracts::{ContractError, Transport};
use tokio::net::{lookup_host, UdpSocket};
use tracing::{debug, instrument, warn};

/// Configuration for UdpTransport
#[derive(Debug, Clone)]
pub struct UdpTransportConfig {
    /// Target address
    pub addr: SocketAddr,
    /// Payloads above this size are logged as oversized
    pub max_datagram_size: usize,
}

impl UdpTransportConfig {
    /// Resolve `host:port` into a target address
    ///
    /// # Errors
    /// The host cannot be parsed or resolved.
    pub async fn resolve(
        host: &str,
        port: u16,
        max_datagram_size: usize,
    ) -> Result<Self, ContractError> {
        let addr = lookup_host((host, port))
            .await
            .map_err(|e| {
                ContractError::config_validation("transport.host", format!("'{host}': {e}"))
            })?
            .next()
            .ok_or_else(|| {
                ContractError::config_validation(
                    "transport.host",
                    format!("'{host}' resolved to no address"),
                )
            })?;

        Ok(Self {
            addr,
            max_datagram_size,
        })
    }
}

/// Transport that sends each payload as one UDP datagram
pub struct UdpTransport {
    name: String,
    config: UdpTransportConfig,
    socket: Option<UdpSocket>,
}

impl UdpTransport {
    /// Create a new UdpTransport bound to an ephemeral local port
    ///
    /// A bind failure leaves the transport disconnected.
    #[instrument(name = "udp_transport_new", skip(name, config), fields(target = %config.addr))]
    pub async fn new(name: impl Into<String>, config: UdpTransportConfig) -> Self {
        let name = name.into();
        let bind_addr = if config.addr.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };

        let socket = match UdpSocket::bind(bind_addr).await {
            Ok(socket) => {
                debug!(transport = %name, target = %config.addr, "UdpTransport ready");
                Some(socket)
            }
            Err(e) => {
                warn!(transport = %name, error = %e, "UDP socket creation failed");
                None
            }
        };

        Self {
            name,
            config,
            socket,
        }
    }

    /// Target address
    pub fn target(&self) -> SocketAddr {
        self.config.addr
    }
}

impl Transport for UdpTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    #[instrument(
        name = "udp_transport_send",
        skip(self, data),
        fields(transport = %self.name, bytes = data.len())
    )]
    async fn send(&mut self, data: &str) -> Result<(), ContractError> {
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| ContractError::transport_disconnected(&self.name))?;

        if data.is_empty() {
            return Ok(());
        }

        if data.len() > self.config.max_datagram_size {
            warn!(
                transport = %self.name,
                size = data.len(),
                max = self.config.max_datagram_size,
                "Datagram exceeds configured size"
            );
        }

        let sent = socket
            .send_to(data.as_bytes(), self.config.addr)
            .await
            .map_err(|e| ContractError::transport_send(&self.name, e.to_string()))?;

        if sent != data.len() {
            return Err(ContractError::transport_send(
                &self.name,
                format!("partial send: {sent} of {} bytes", data.len()),
            ));
        }

        debug!(transport = %self.name, bytes = sent, "Sent");
        Ok(())
    }
}
