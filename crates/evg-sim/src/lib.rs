//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "01-bootstrap"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Scenario replay and trajectory export module exports."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Local stand-in for the co-simulation runtime: replays scripted inbound
//! traffic into a single federate and exports what it produced.

pub mod export;
pub mod replay;
pub mod scenario;

pub use export::{write_run_summary, write_trajectory_csv, RunSummary, TerminalSummary};
pub use replay::ReplayFederation;
pub use scenario::{Scenario, ScheduledMessage, ScheduledValue};
