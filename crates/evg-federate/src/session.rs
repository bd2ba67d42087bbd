//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Federate time-advance loops and models."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use evg_common::SimTime;
use evg_logging::{evg_debug, log_lifecycle_event, LifecycleOutcome, LogContext};

use crate::error::{FederateError, Result};
use crate::time_sync::TimeSyncClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Created,
    Executing,
    Finalized,
}

/// Lifecycle guard around a federate's runtime handle.
///
/// Enforces call ordering, validates every grant against the
/// [`TimeSyncClient`] contract, and finalizes exactly once: explicitly via
/// [`close`](FederateSession::close) on the success path, or on drop when a
/// loop bails out with an error.
pub struct FederateSession<'a, F: TimeSyncClient> {
    federate: &'a mut F,
    name: String,
    role: &'static str,
    horizon: SimTime,
    phase: Phase,
    granted: Option<SimTime>,
    horizon_grants: usize,
}

impl<'a, F: TimeSyncClient> FederateSession<'a, F> {
    pub fn new(
        federate: &'a mut F,
        name: impl Into<String>,
        role: &'static str,
        horizon: SimTime,
    ) -> Self {
        Self {
            federate,
            name: name.into(),
            role,
            horizon,
            phase: Phase::Created,
            granted: None,
            horizon_grants: 0,
        }
    }

    fn context(&self) -> LogContext<'_> {
        let ctx = LogContext::new()
            .with_federate(&self.name)
            .with_role(self.role);
        match self.granted {
            Some(granted) => ctx.with_granted(granted.as_secs_f64()),
            None => ctx,
        }
    }

    pub fn enter_executing_mode(&mut self) -> Result<()> {
        if self.phase != Phase::Created {
            return Err(FederateError::protocol(format!(
                "{} cannot enter executing mode from {:?}",
                self.name, self.phase
            )));
        }
        self.federate.enter_executing_mode()?;
        self.phase = Phase::Executing;
        log_lifecycle_event(
            Some(&self.context()),
            "entered_executing",
            "federate entered executing mode",
            LifecycleOutcome::Success,
        );
        Ok(())
    }

    /// Request `requested` and return the validated grant.
    pub fn request_time(&mut self, requested: SimTime) -> Result<SimTime> {
        if self.phase != Phase::Executing {
            return Err(FederateError::protocol(format!(
                "{} requested time {} while {:?}",
                self.name, requested, self.phase
            )));
        }
        let previous = self.granted.unwrap_or(SimTime::ZERO);
        if requested < previous {
            return Err(FederateError::protocol(format!(
                "{} requested {} before its granted time {}",
                self.name, requested, previous
            )));
        }
        evg_debug!(context = self.context(), "requesting time {}", requested);
        let granted = self.federate.request_time(requested)?;
        if granted > requested {
            return Err(FederateError::protocol(format!(
                "granted {} beyond requested {}",
                granted, requested
            )));
        }
        if granted < previous {
            return Err(FederateError::protocol(format!(
                "granted {} before previous grant {}",
                granted, previous
            )));
        }
        self.granted = Some(granted);
        if granted >= self.horizon {
            self.horizon_grants += 1;
        }
        evg_debug!(context = self.context(), "granted time {}", granted);
        Ok(granted)
    }

    /// Latest grant, zero before the first one.
    pub fn granted(&self) -> SimTime {
        self.granted.unwrap_or(SimTime::ZERO)
    }

    /// How many grants landed at or beyond the horizon.
    pub fn horizon_grants(&self) -> usize {
        self.horizon_grants
    }

    /// Endpoint and value channels of the wrapped federate.
    pub fn channels(&mut self) -> &mut F {
        self.federate
    }

    /// Finalize on the success path, surfacing teardown failures.
    pub fn close(mut self) -> Result<()> {
        self.finalize_once()
    }

    fn finalize_once(&mut self) -> Result<()> {
        if self.phase == Phase::Finalized {
            return Ok(());
        }
        self.phase = Phase::Finalized;
        let result = self.federate.finalize();
        match &result {
            Ok(()) => log_lifecycle_event(
                Some(&self.context()),
                "finalized",
                "federate finalized",
                LifecycleOutcome::Success,
            ),
            Err(err) => log_lifecycle_event(
                Some(&self.context()),
                "teardown_failed",
                &err.to_string(),
                LifecycleOutcome::Fault,
            ),
        }
        result
    }
}

impl<F: TimeSyncClient> Drop for FederateSession<'_, F> {
    fn drop(&mut self) {
        // Error paths land here; the teardown failure is already logged and
        // must not replace the error that ended the loop.
        let _ = self.finalize_once();
    }
}
