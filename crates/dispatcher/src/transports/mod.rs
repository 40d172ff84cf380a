//! Transport implementations
//!
//! Contains FileTransport and UdpTransport.

mod file;
mod udp;

pub use self::file::FileTransport;
pub use self::udp::{UdpTransport, UdpTransportConfig};
