//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Results carry the frame capture time as UTC wall clock
//! - Wire formats render it as whole unix seconds

mod blueprint;
mod detection;
mod error;
mod result;
mod transport;

pub use blueprint::*;
pub use detection::*;
pub use error::*;
pub use result::*;
pub use transport::*;
