//! ---
//! ems_section: "02-messaging-ipc-data-model"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Message framing and channel contracts for federates."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::collections::VecDeque;

use evg_common::SimTime;

use crate::logging::{log_message, MessageDirection};
use crate::{Message, MessagingError, Result};

/// Named FIFO endpoint owned by the co-simulation runtime.
///
/// Messages visible to the federate were authored at or before its current
/// granted time and are popped in arrival order.
pub trait EndpointChannel {
    /// Registered endpoint name, used as the source of outgoing messages.
    fn endpoint_name(&self) -> &str;
    /// Whether a message is queued at the current granted time.
    fn has_message(&self) -> bool;
    /// Pop the oldest queued message.
    fn pop_message(&mut self) -> Option<Message>;
    /// Send `payload` to the endpoint named `destination`.
    fn send(&mut self, destination: &str, payload: &[u8]) -> Result<()>;
}

/// In-memory endpoint: an inbox the runtime side fills and an outbox it drains.
#[derive(Debug, Clone)]
pub struct InMemoryEndpoint {
    name: String,
    inbox: VecDeque<Message>,
    outbox: Vec<Message>,
    now: SimTime,
    closed: bool,
}

impl InMemoryEndpoint {
    /// Create an empty endpoint.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inbox: VecDeque::new(),
            outbox: Vec::new(),
            now: SimTime::ZERO,
            closed: false,
        }
    }

    /// Runtime side: queue a message addressed to this endpoint.
    pub fn deliver(&mut self, message: Message) -> Result<()> {
        if message.destination != self.name {
            return Err(MessagingError::UnknownEndpoint(message.destination));
        }
        log_message(MessageDirection::Inbound, &message);
        self.inbox.push_back(message);
        Ok(())
    }

    /// Runtime side: stamp subsequent sends with `now`.
    pub fn advance_to(&mut self, now: SimTime) {
        self.now = now;
    }

    /// Runtime side: stop accepting sends.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Messages sent so far, in send order.
    pub fn sent(&self) -> &[Message] {
        &self.outbox
    }

    /// Number of messages still queued.
    pub fn pending(&self) -> usize {
        self.inbox.len()
    }
}

impl EndpointChannel for InMemoryEndpoint {
    fn endpoint_name(&self) -> &str {
        &self.name
    }

    fn has_message(&self) -> bool {
        !self.inbox.is_empty()
    }

    fn pop_message(&mut self) -> Option<Message> {
        self.inbox.pop_front()
    }

    fn send(&mut self, destination: &str, payload: &[u8]) -> Result<()> {
        if self.closed {
            return Err(MessagingError::Closed);
        }
        let message = Message::new(self.name.clone(), destination, payload, self.now);
        log_message(MessageDirection::Outbound, &message);
        self.outbox.push(message);
        Ok(())
    }
}
