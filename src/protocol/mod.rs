//! Wire protocols for controlled subsystems
//!
//! - [`frame`]: length-prefixed JSON envelopes sent to the experiment controller
//! - [`line`]: line-oriented command dispatch spoken by instrument simulators
//! - [`client`]: the device-control client built on [`frame`]

pub mod client;
pub mod frame;
pub mod line;

pub use client::{ControllerClient, Endpoint};
pub use frame::{CommandEnvelope, FramingError};

use thiserror::Error;

/// Errors from a device-control exchange
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error(transparent)]
    Framing(#[from] FramingError),

    #[error("no response to '{command}'")]
    NoResponse { command: String },

    #[error("unexpected reply to '{command}': expected {expected:?}, got {actual:?}")]
    UnexpectedReply {
        command: String,
        expected: String,
        actual: String,
    },
}
