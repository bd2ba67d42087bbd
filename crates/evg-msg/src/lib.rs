//! ---
//! ems_section: "02-messaging-ipc-data-model"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Message framing and channel contracts for federates."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Messages, payload codec, and the endpoint/value channels a federate
//! exchanges data through. The runtime that owns and arbitrates those
//! channels lives outside this workspace; [`InMemoryEndpoint`] and
//! [`ValueBus`] are local stand-ins for it.

pub mod codec;
pub mod endpoint;
pub mod logging;
pub mod types;
pub mod values;

/// Shared result type for channel operations.
pub type Result<T> = std::result::Result<T, MessagingError>;

/// Malformed payload on an endpoint or subscription.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    /// The payload bytes are not valid UTF-8 text.
    #[error("payload is not valid UTF-8")]
    NotUtf8,
    /// The payload text is not a decimal number.
    #[error("payload {payload:?} is not numeric")]
    NotNumeric {
        /// Offending payload text.
        payload: String,
    },
    /// The payload parsed to NaN or an infinity.
    #[error("payload {payload:?} is not a finite number")]
    NotFinite {
        /// Offending payload text.
        payload: String,
    },
    /// The payload is not one of the recognised charge commands.
    #[error("payload {payload:?} is not a charge command")]
    UnknownCommand {
        /// Offending payload text.
        payload: String,
    },
}

/// Failures raised by endpoint and value channels.
#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    /// A message was addressed to an endpoint nobody registered.
    #[error("unknown endpoint {0}")]
    UnknownEndpoint(String),
    /// A value was published on a key that was never registered.
    #[error("publication {0} is not registered")]
    UnregisteredPublication(String),
    /// A subscription was read without being registered.
    #[error("subscription {0} is not registered")]
    UnregisteredSubscription(String),
    /// The channel was used after the federate finalized.
    #[error("channel closed")]
    Closed,
    /// Payload could not be decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

pub use codec::{format_number, parse_number};
pub use endpoint::{EndpointChannel, InMemoryEndpoint};
pub use logging::{log_message, MessageDirection};
pub use types::{ChargeCommand, Message, SocReport};
pub use values::{PublishedValue, ValueBus, ValueChannel};
