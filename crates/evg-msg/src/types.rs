//! ---
//! ems_section: "02-messaging-ipc-data-model"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Message framing and channel contracts for federates."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use evg_common::SimTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::codec::{parse_number, parse_number_str};
use crate::CodecError;

/// Point-to-point message as delivered by an endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier for tracing a message through logs.
    pub id: Uuid,
    /// Endpoint that originally sent the message.
    pub source: String,
    /// Endpoint the message is addressed to.
    pub destination: String,
    /// Raw payload bytes.
    pub payload: Vec<u8>,
    /// Simulated time the message was authored at.
    pub time: SimTime,
}

impl Message {
    /// Construct a new message.
    pub fn new(
        source: impl Into<String>,
        destination: impl Into<String>,
        payload: impl Into<Vec<u8>>,
        time: SimTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: source.into(),
            destination: destination.into(),
            payload: payload.into(),
            time,
        }
    }

    /// Payload as text, lossy for non UTF-8 bytes. Intended for logs.
    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// State-of-charge report sent by an EV to the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct SocReport {
    /// Endpoint of the reporting EV; commands are sent back here.
    pub source: String,
    /// Reported state of charge.
    pub soc: f64,
}

impl TryFrom<&Message> for SocReport {
    type Error = CodecError;

    fn try_from(message: &Message) -> Result<Self, Self::Error> {
        Ok(Self {
            source: message.source.clone(),
            soc: parse_number(&message.payload)?,
        })
    }
}

/// Instruction the controller sends back to an EV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeCommand {
    /// Keep charging.
    Continue,
    /// Stop charging; the battery is full.
    Stop,
}

impl ChargeCommand {
    /// Wire form: `"1"` to continue, `"0"` to stop.
    pub fn as_payload(&self) -> &'static str {
        match self {
            ChargeCommand::Continue => "1",
            ChargeCommand::Stop => "0",
        }
    }

    /// Decode the wire form. Numeric text equal to 1 or 0 is accepted, so
    /// `"1.0"` decodes like `"1"`.
    pub fn from_payload(payload: &[u8]) -> Result<Self, CodecError> {
        let text = std::str::from_utf8(payload).map_err(|_| CodecError::NotUtf8)?;
        let unknown = || CodecError::UnknownCommand {
            payload: text.to_owned(),
        };
        let value = parse_number_str(text).map_err(|_| unknown())?;
        if value == 1.0 {
            Ok(ChargeCommand::Continue)
        } else if value == 0.0 {
            Ok(ChargeCommand::Stop)
        } else {
            Err(unknown())
        }
    }
}
