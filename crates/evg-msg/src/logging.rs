//! ---
//! ems_section: "02-messaging-ipc-data-model"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Message framing and channel contracts for federates."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use tracing::debug;

use crate::types::Message;

/// Direction of the message movement, used for consistent logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDirection {
    /// Message sent out through an endpoint.
    Outbound,
    /// Message queued on an endpoint by the runtime.
    Inbound,
}

/// Emit a structured log entry for endpoint activity.
pub fn log_message(direction: MessageDirection, message: &Message) {
    debug!(
        message_id = %message.id,
        time = %message.time,
        source = %message.source,
        destination = %message.destination,
        payload = %message.payload_text(),
        direction = ?direction,
        "endpoint activity"
    );
}
