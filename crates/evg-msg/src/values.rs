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
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use tracing::debug;

use crate::codec::format_number;
use crate::{MessagingError, Result};

/// Named publications and subscriptions owned by the co-simulation runtime.
///
/// A subscription read returns the latest value authored at or before the
/// federate's current granted time, as raw text; decoding is left to the
/// caller so malformed values surface as codec errors.
pub trait ValueChannel {
    /// Register a publication. Registering the same key twice is a no-op.
    fn register_publication(&mut self, key: &str) -> Result<()>;
    /// Register a subscription. Registering the same key twice is a no-op.
    fn register_subscription(&mut self, key: &str) -> Result<()>;
    /// Number of distinct registered publications.
    fn publication_count(&self) -> usize;
    /// Number of distinct registered subscriptions.
    fn subscription_count(&self) -> usize;
    /// Publish `value` on a registered publication.
    fn publish(&mut self, key: &str, value: f64) -> Result<()>;
    /// Latest raw value on a registered subscription, `None` before the first update.
    fn read(&self, key: &str) -> Result<Option<String>>;
}

/// A value published by the federate, stamped with the time it was published at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedValue {
    /// Publication key.
    pub key: String,
    /// Published number.
    pub value: f64,
    /// Granted time at publication.
    pub time: SimTime,
}

/// In-memory value channel with latched subscriptions.
#[derive(Debug, Clone, Default)]
pub struct ValueBus {
    publications: IndexSet<String>,
    subscriptions: IndexMap<String, Option<String>>,
    published: Vec<PublishedValue>,
    now: SimTime,
    closed: bool,
}

impl ValueBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runtime side: latch a new raw value on a subscription.
    ///
    /// Returns `false` when nobody subscribed to `key`; the update is dropped.
    pub fn update(&mut self, key: &str, raw: impl Into<String>) -> bool {
        match self.subscriptions.get_mut(key) {
            Some(slot) => {
                *slot = Some(raw.into());
                true
            }
            None => false,
        }
    }

    /// Runtime side: stamp subsequent publications with `now`.
    pub fn advance_to(&mut self, now: SimTime) {
        self.now = now;
    }

    /// Runtime side: stop accepting publications.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Every value published so far, in publication order.
    pub fn published(&self) -> &[PublishedValue] {
        &self.published
    }

    /// Registered subscription keys in registration order.
    pub fn subscription_keys(&self) -> impl Iterator<Item = &str> {
        self.subscriptions.keys().map(String::as_str)
    }
}

impl ValueChannel for ValueBus {
    fn register_publication(&mut self, key: &str) -> Result<()> {
        if self.publications.insert(key.to_owned()) {
            debug!(publication = key, "registered publication");
        }
        Ok(())
    }

    fn register_subscription(&mut self, key: &str) -> Result<()> {
        if !self.subscriptions.contains_key(key) {
            self.subscriptions.insert(key.to_owned(), None);
            debug!(subscription = key, "registered subscription");
        }
        Ok(())
    }

    fn publication_count(&self) -> usize {
        self.publications.len()
    }

    fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    fn publish(&mut self, key: &str, value: f64) -> Result<()> {
        if self.closed {
            return Err(MessagingError::Closed);
        }
        if !self.publications.contains(key) {
            return Err(MessagingError::UnregisteredPublication(key.to_owned()));
        }
        debug!(publication = key, value = %format_number(value), time = %self.now, "published value");
        self.published.push(PublishedValue {
            key: key.to_owned(),
            value,
            time: self.now,
        });
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Option<String>> {
        self.subscriptions
            .get(key)
            .cloned()
            .ok_or_else(|| MessagingError::UnregisteredSubscription(key.to_owned()))
    }
}
