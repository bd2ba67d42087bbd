//! ---
//! ems_section: "11-simulation-test-harness"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Scenario loading for local federate replays."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, Trim};
use evg_common::SimTime;
use evg_msg::format_number;
use serde::{Deserialize, Serialize};

/// Payload as written in a scenario file: a bare number or raw text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum RawPayload {
    Number(f64),
    Text(String),
}

impl From<RawPayload> for String {
    fn from(raw: RawPayload) -> Self {
        match raw {
            RawPayload::Number(value) => format_number(value),
            RawPayload::Text(text) => text,
        }
    }
}

/// A message the runtime delivers to the federate's endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledMessage {
    pub time: SimTime,
    pub source: String,
    pub destination: String,
    #[serde(deserialize_with = "raw_payload")]
    pub payload: String,
}

/// A value another federate publishes on one of our subscriptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledValue {
    pub time: SimTime,
    pub key: String,
    #[serde(deserialize_with = "raw_payload")]
    pub value: String,
}

fn raw_payload<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    RawPayload::deserialize(deserializer).map(String::from)
}

/// Timed inbound traffic for one federate, sorted by time. Entries sharing
/// a timestamp keep their file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub messages: Vec<ScheduledMessage>,
    #[serde(default)]
    pub values: Vec<ScheduledValue>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RowKind {
    Message,
    Value,
}

/// One CSV line: `kind,time,source,destination,key,payload`.
#[derive(Debug, Deserialize)]
struct ScenarioRow {
    kind: RowKind,
    time: SimTime,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    destination: Option<String>,
    #[serde(default)]
    key: Option<String>,
    payload: String,
}

impl Scenario {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                let contents = fs::read_to_string(path)
                    .with_context(|| format!("unable to read scenario file {}", path.display()))?;
                Self::from_json_str(&contents)
                    .with_context(|| format!("invalid scenario JSON {}", path.display()))
            }
            Some("csv") => {
                let file = fs::File::open(path)
                    .with_context(|| format!("unable to open scenario csv {}", path.display()))?;
                Self::from_csv_reader(file)
                    .with_context(|| format!("invalid scenario csv {}", path.display()))
            }
            _ => bail!("unsupported scenario format: {}", path.display()),
        }
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        let scenario: Scenario = serde_json::from_str(contents)?;
        Ok(scenario.sorted())
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);
        let mut scenario = Scenario::default();
        for (line, row) in reader.deserialize::<ScenarioRow>().enumerate() {
            // Header is line 1.
            let line = line + 2;
            let row = row.with_context(|| format!("invalid scenario row on line {line}"))?;
            match row.kind {
                RowKind::Message => {
                    let (Some(source), Some(destination)) = (row.source, row.destination) else {
                        bail!("message on line {line} needs a source and a destination");
                    };
                    scenario.messages.push(ScheduledMessage {
                        time: row.time,
                        source,
                        destination,
                        payload: row.payload,
                    });
                }
                RowKind::Value => {
                    let Some(key) = row.key else {
                        bail!("value on line {line} needs a key");
                    };
                    scenario.values.push(ScheduledValue {
                        time: row.time,
                        key,
                        value: row.payload,
                    });
                }
            }
        }
        Ok(scenario.sorted())
    }

    fn sorted(mut self) -> Self {
        self.messages.sort_by_key(|message| message.time);
        self.values.sort_by_key(|value| value.time);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.values.is_empty()
    }
}
