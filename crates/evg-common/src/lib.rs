//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives and utilities for the federates."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Shared primitives for the EV garage co-simulation workspace.
//! This crate exposes configuration loading, tracing setup, and the
//! simulated time type every federate agrees on.

pub mod config;
pub mod logging;
pub mod time;

pub use config::{
    AppConfig, BatteryConfig, CapacityOption, ControllerConfig, FederationConfig, LoadedAppConfig,
    LoggingConfig, SocPolicy,
};
pub use logging::{init_tracing, LogFormat};
pub use time::{InvalidSimTime, SimTime};
