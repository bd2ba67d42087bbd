//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Federate time-advance loops and models."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Controller and battery federates of the EV garage co-simulation, the
//! time-synchronisation contract they run against, and the executor that
//! runs them side by side.

pub mod battery;
pub mod controller;
pub mod error;
pub mod executor;
pub mod physics;
pub mod session;
pub mod time_sync;
pub mod trajectory;

#[cfg(test)]
pub(crate) mod testing;

pub use battery::{BatteryFederate, BatteryReport};
pub use controller::{decide, ControllerFederate, ControllerReport, IssuedCommand, SOC_FULL};
pub use error::{FederateError, Result};
pub use executor::FederateExecutor;
pub use physics::{BatteryModel, CapacityDistribution, ChargingTerminal, ResistanceCurve, StepOutcome};
pub use session::FederateSession;
pub use time_sync::TimeSyncClient;
pub use trajectory::{Trajectory, TrajectorySample};
