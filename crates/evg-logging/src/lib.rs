//! ---
//! ems_section: "03-persistence-logging"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Structured logging context for federate loops."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Log context and macros shared by the controller and battery federates.

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod macros;

/// Initialize a baseline tracing subscriber suitable for development and tests.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer().with_test_writer())
        .try_init();
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Federate name as registered with the runtime.
    pub federate: Option<&'a str>,
    /// Federate role (`controller`, `battery`).
    pub role: Option<&'a str>,
    /// Terminal, endpoint, or publication the event concerns.
    pub terminal: Option<&'a str>,
    /// Granted simulated time in seconds.
    pub granted: Option<f64>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a federate name.
    pub fn with_federate(mut self, federate: &'a str) -> Self {
        self.federate = Some(federate);
        self
    }

    /// Attach a federate role.
    pub fn with_role(mut self, role: &'a str) -> Self {
        self.role = Some(role);
        self
    }

    /// Attach a terminal identifier.
    pub fn with_terminal(mut self, terminal: &'a str) -> Self {
        self.terminal = Some(terminal);
        self
    }

    /// Attach the granted time in seconds.
    pub fn with_granted(mut self, granted: f64) -> Self {
        self.granted = Some(granted);
        self
    }
}

/// Outcome attached to lifecycle log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOutcome {
    /// The transition completed.
    Success,
    /// The transition failed or was aborted.
    Fault,
}

impl LifecycleOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            LifecycleOutcome::Success => "success",
            LifecycleOutcome::Fault => "fault",
        }
    }

    fn level(&self) -> Level {
        match self {
            LifecycleOutcome::Success => Level::INFO,
            LifecycleOutcome::Fault => Level::ERROR,
        }
    }
}

/// Emit a federate lifecycle event (`entered_executing`, `finalized`, ...).
pub fn log_lifecycle_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: LifecycleOutcome,
) {
    let ctx = context.cloned().unwrap_or_default();
    let granted = ctx.granted.unwrap_or_default();
    let outcome_str = outcome.as_str();
    let federate = ctx.federate.unwrap_or("");
    let role = ctx.role.unwrap_or("");
    // `tracing::event!` needs a constant level.
    match outcome.level() {
        Level::ERROR => tracing::event!(
            Level::ERROR,
            event,
            outcome = outcome_str,
            federate,
            role,
            granted,
            message = %message
        ),
        _ => tracing::event!(
            Level::INFO,
            event,
            outcome = outcome_str,
            federate,
            role,
            granted,
            message = %message
        ),
    }
}
