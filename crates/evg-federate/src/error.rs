//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Federate time-advance loops and models."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use evg_msg::{CodecError, MessagingError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FederateError>;

#[derive(Debug, Error)]
pub enum FederateError {
    /// Malformed numeric payload on an endpoint or subscription.
    #[error("parse error: {0}")]
    Parse(#[from] CodecError),
    /// Call ordering or grant that violates the time-synchronisation contract.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// Declared topology does not match what the federate registered.
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("messaging error: {0}")]
    Messaging(MessagingError),
}

impl From<MessagingError> for FederateError {
    fn from(err: MessagingError) -> Self {
        match err {
            MessagingError::Codec(codec) => FederateError::Parse(codec),
            other => FederateError::Messaging(other),
        }
    }
}

impl FederateError {
    pub fn protocol(message: impl Into<String>) -> Self {
        FederateError::Protocol(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        FederateError::Configuration(message.into())
    }
}
