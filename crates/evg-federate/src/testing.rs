//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "test"
//! ems_description: "Scripted federate double for loop unit tests."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::collections::VecDeque;

use evg_common::SimTime;
use evg_msg::{EndpointChannel, InMemoryEndpoint, Message, ValueBus, ValueChannel};

use crate::error::{FederateError, Result};
use crate::time_sync::TimeSyncClient;

/// Scripted answer to the next time request.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Grant {
    /// Grant exactly what was requested.
    Requested,
    /// Grant a fixed time, valid or not.
    At(SimTime),
}

/// Federate double: grants follow a script, messages and values are released
/// once a grant reaches their timestamp.
pub(crate) struct ScriptedFederate {
    script: VecDeque<Grant>,
    arrivals: VecDeque<Message>,
    updates: VecDeque<(SimTime, String, String)>,
    pub endpoint: InMemoryEndpoint,
    pub values: ValueBus,
    pub requests: Vec<SimTime>,
    pub grants: Vec<SimTime>,
    /// Messages still queued on the endpoint when each request was made.
    pub pending_at_request: Vec<usize>,
    pub finalize_calls: usize,
    fail_finalize: bool,
    extra_publications: usize,
}

impl ScriptedFederate {
    pub fn new(endpoint: &str) -> Self {
        Self {
            script: VecDeque::new(),
            arrivals: VecDeque::new(),
            updates: VecDeque::new(),
            endpoint: InMemoryEndpoint::new(endpoint),
            values: ValueBus::new(),
            requests: Vec::new(),
            grants: Vec::new(),
            pending_at_request: Vec::new(),
            finalize_calls: 0,
            fail_finalize: false,
            extra_publications: 0,
        }
    }

    pub fn with_grants(mut self, grants: impl IntoIterator<Item = Grant>) -> Self {
        self.script.extend(grants);
        self
    }

    /// Queue a message for release at its own timestamp. Arrivals must be
    /// added in time order.
    pub fn with_message(mut self, source: &str, payload: &str, at: SimTime) -> Self {
        let destination = self.endpoint.endpoint_name().to_owned();
        self.arrivals
            .push_back(Message::new(source, destination, payload, at));
        self
    }

    pub fn with_value(mut self, key: &str, raw: &str, at: SimTime) -> Self {
        self.updates.push_back((at, key.to_owned(), raw.to_owned()));
        self
    }

    pub fn failing_finalize(mut self) -> Self {
        self.fail_finalize = true;
        self
    }

    /// Report more publications than were registered.
    pub fn with_phantom_publication(mut self) -> Self {
        self.extra_publications = 1;
        self
    }

    fn release_until(&mut self, granted: SimTime) {
        while self.arrivals.front().is_some_and(|m| m.time <= granted) {
            if let Some(message) = self.arrivals.pop_front() {
                self.endpoint.deliver(message).expect("scripted message address");
            }
        }
        while self.updates.front().is_some_and(|(at, _, _)| *at <= granted) {
            if let Some((_, key, raw)) = self.updates.pop_front() {
                self.values.update(&key, raw);
            }
        }
        self.endpoint.advance_to(granted);
        self.values.advance_to(granted);
    }
}

impl TimeSyncClient for ScriptedFederate {
    fn enter_executing_mode(&mut self) -> Result<()> {
        self.release_until(SimTime::ZERO);
        Ok(())
    }

    fn request_time(&mut self, requested: SimTime) -> Result<SimTime> {
        self.requests.push(requested);
        self.pending_at_request.push(self.endpoint.pending());
        let granted = match self.script.pop_front().unwrap_or(Grant::Requested) {
            Grant::Requested => requested,
            Grant::At(time) => time,
        };
        self.grants.push(granted);
        self.release_until(granted);
        Ok(granted)
    }

    fn finalize(&mut self) -> Result<()> {
        self.finalize_calls += 1;
        self.endpoint.close();
        self.values.close();
        if self.fail_finalize {
            return Err(FederateError::protocol("scripted finalize failure"));
        }
        Ok(())
    }
}

impl EndpointChannel for ScriptedFederate {
    fn endpoint_name(&self) -> &str {
        self.endpoint.endpoint_name()
    }

    fn has_message(&self) -> bool {
        self.endpoint.has_message()
    }

    fn pop_message(&mut self) -> Option<Message> {
        self.endpoint.pop_message()
    }

    fn send(&mut self, destination: &str, payload: &[u8]) -> evg_msg::Result<()> {
        self.endpoint.send(destination, payload)
    }
}

impl ValueChannel for ScriptedFederate {
    fn register_publication(&mut self, key: &str) -> evg_msg::Result<()> {
        self.values.register_publication(key)
    }

    fn register_subscription(&mut self, key: &str) -> evg_msg::Result<()> {
        self.values.register_subscription(key)
    }

    fn publication_count(&self) -> usize {
        self.values.publication_count() + self.extra_publications
    }

    fn subscription_count(&self) -> usize {
        self.values.subscription_count()
    }

    fn publish(&mut self, key: &str, value: f64) -> evg_msg::Result<()> {
        self.values.publish(key, value)
    }

    fn read(&self, key: &str) -> evg_msg::Result<Option<String>> {
        self.values.read(key)
    }
}
