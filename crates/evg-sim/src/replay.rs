//! ---
//! ems_section: "11-simulation-test-harness"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Local scenario replay standing in for the co-simulation runtime."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::collections::VecDeque;

use evg_common::SimTime;
use evg_federate::{FederateError, TimeSyncClient};
use evg_msg::{
    EndpointChannel, InMemoryEndpoint, Message, PublishedValue, ValueBus, ValueChannel,
};
use tracing::{debug, info};

use crate::scenario::{Scenario, ScheduledMessage, ScheduledValue};

/// Replays a [`Scenario`] into one federate.
///
/// Requests are granted in full unless a scripted message is due earlier,
/// in which case the federate wakes at that message's time. Value updates
/// are latched when a grant passes them and never interrupt a request.
#[derive(Debug)]
pub struct ReplayFederation {
    endpoint: InMemoryEndpoint,
    values: ValueBus,
    messages: VecDeque<ScheduledMessage>,
    updates: VecDeque<ScheduledValue>,
    grants: Vec<SimTime>,
    executing: bool,
    finalized: bool,
}

impl ReplayFederation {
    pub fn new(endpoint: impl Into<String>, scenario: Scenario) -> Self {
        Self {
            endpoint: InMemoryEndpoint::new(endpoint),
            values: ValueBus::new(),
            messages: scenario.messages.into(),
            updates: scenario.values.into(),
            grants: Vec::new(),
            executing: false,
            finalized: false,
        }
    }

    /// Every grant handed out, in order.
    pub fn grants(&self) -> &[SimTime] {
        &self.grants
    }

    /// Messages the federate sent, stamped with the grant they were sent at.
    pub fn sent(&self) -> &[Message] {
        self.endpoint.sent()
    }

    /// Values the federate published, stamped with the grant they were published at.
    pub fn published(&self) -> &[PublishedValue] {
        self.values.published()
    }

    /// Scripted messages not yet delivered.
    pub fn undelivered(&self) -> usize {
        self.messages.len()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    fn release_until(&mut self, granted: SimTime) -> evg_federate::Result<()> {
        while self.messages.front().is_some_and(|m| m.time <= granted) {
            let Some(scheduled) = self.messages.pop_front() else {
                break;
            };
            self.endpoint.deliver(Message::new(
                scheduled.source,
                scheduled.destination,
                scheduled.payload,
                scheduled.time,
            ))?;
        }
        self.latch_until(granted);
        self.endpoint.advance_to(granted);
        self.values.advance_to(granted);
        Ok(())
    }

    fn latch_until(&mut self, granted: SimTime) {
        while self.updates.front().is_some_and(|u| u.time <= granted) {
            let Some(update) = self.updates.pop_front() else {
                break;
            };
            if !self.values.update(&update.key, update.value) {
                debug!(key = %update.key, "dropping value for unsubscribed key");
            }
        }
    }
}

impl TimeSyncClient for ReplayFederation {
    fn enter_executing_mode(&mut self) -> evg_federate::Result<()> {
        if self.executing || self.finalized {
            return Err(FederateError::protocol(
                "replay federation already left initialisation",
            ));
        }
        self.executing = true;
        info!(endpoint = %self.endpoint.endpoint_name(), "replay entered executing mode");
        // Messages due at zero still wake the first request.
        self.latch_until(SimTime::ZERO);
        Ok(())
    }

    fn request_time(&mut self, requested: SimTime) -> evg_federate::Result<SimTime> {
        if !self.executing || self.finalized {
            return Err(FederateError::protocol(format!(
                "time {requested} requested outside executing mode"
            )));
        }
        let floor = self.grants.last().copied().unwrap_or(SimTime::ZERO);
        let granted = match self.messages.front() {
            Some(next) if next.time < requested => next.time.max(floor),
            _ => requested.max(floor),
        };
        self.release_until(granted)?;
        self.grants.push(granted);
        Ok(granted)
    }

    fn finalize(&mut self) -> evg_federate::Result<()> {
        if !self.finalized {
            self.finalized = true;
            self.endpoint.close();
            self.values.close();
            info!(
                endpoint = %self.endpoint.endpoint_name(),
                grants = self.grants.len(),
                "replay finalized"
            );
        }
        Ok(())
    }
}

impl EndpointChannel for ReplayFederation {
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

impl ValueChannel for ReplayFederation {
    fn register_publication(&mut self, key: &str) -> evg_msg::Result<()> {
        self.values.register_publication(key)
    }

    fn register_subscription(&mut self, key: &str) -> evg_msg::Result<()> {
        self.values.register_subscription(key)
    }

    fn publication_count(&self) -> usize {
        self.values.publication_count()
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
