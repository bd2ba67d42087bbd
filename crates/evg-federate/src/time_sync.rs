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

use crate::error::Result;

/// Contract with the external time-synchronisation runtime.
///
/// Implementations block in [`request_time`](TimeSyncClient::request_time)
/// until no other federate can still produce an event at or before the
/// granted time. A grant never exceeds the requested time and never moves
/// backwards across calls.
pub trait TimeSyncClient {
    /// Leave initialisation; time requests are only valid afterwards.
    fn enter_executing_mode(&mut self) -> Result<()>;

    /// Block until a time `<= requested` can be granted and return it.
    fn request_time(&mut self, requested: SimTime) -> Result<SimTime>;

    /// Leave the federation and release runtime resources. Idempotent.
    fn finalize(&mut self) -> Result<()>;
}
