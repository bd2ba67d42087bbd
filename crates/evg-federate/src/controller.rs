//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Federate time-advance loops and models."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Event-driven charge controller.
//!
//! The controller requests [`SimTime::FAR_FUTURE`] and sleeps until the
//! runtime grants it an earlier time because a state-of-charge report
//! arrived. Every queued report is answered before the next request.

use std::time::Duration;

use evg_common::{ControllerConfig, SimTime};
use evg_logging::{evg_debug, evg_info, LogContext};
use evg_msg::{ChargeCommand, EndpointChannel, SocReport};
use serde::Serialize;

use crate::error::{FederateError, Result};
use crate::session::FederateSession;
use crate::time_sync::TimeSyncClient;
use crate::trajectory::Trajectory;

/// Highest state of charge at which charging continues.
pub const SOC_FULL: f64 = 0.95;

/// Charge decision for a reported state of charge. No hysteresis.
pub fn decide(soc: f64) -> ChargeCommand {
    if soc <= SOC_FULL {
        ChargeCommand::Continue
    } else {
        ChargeCommand::Stop
    }
}

/// A command sent back to a reporting EV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssuedCommand {
    pub time: SimTime,
    pub destination: String,
    pub command: ChargeCommand,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ControllerReport {
    /// `(time, source, soc)` for every report received.
    pub trajectory: Trajectory,
    /// Granted times below the horizon at which a drain cycle ran.
    pub wake_times: Vec<SimTime>,
    pub commands_sent: Vec<IssuedCommand>,
}

#[derive(Debug, Clone)]
pub struct ControllerFederate {
    name: String,
    endpoint: String,
    horizon: SimTime,
}

impl ControllerFederate {
    pub fn new(config: &ControllerConfig, horizon: Duration) -> Self {
        Self {
            name: config.name.clone(),
            endpoint: config.endpoint.clone(),
            // The idle request is granted at most FAR_FUTURE, so that is the
            // latest horizon the loop can ever reach.
            horizon: SimTime::from(horizon).min(SimTime::FAR_FUTURE),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn horizon(&self) -> SimTime {
        self.horizon
    }

    /// Run the controller until a grant reaches the horizon.
    pub fn run<F>(&self, federate: &mut F) -> Result<ControllerReport>
    where
        F: TimeSyncClient + EndpointChannel,
    {
        let mut session = FederateSession::new(federate, &self.name, "controller", self.horizon);
        let registered = session.channels().endpoint_name();
        if registered != self.endpoint {
            return Err(FederateError::configuration(format!(
                "controller expects endpoint {} but the federate registered {}",
                self.endpoint, registered
            )));
        }
        session.enter_executing_mode()?;

        let mut report = ControllerReport::default();
        let mut granted = session.request_time(SimTime::FAR_FUTURE)?;
        while granted < self.horizon {
            self.drain(&mut session, granted, &mut report)?;
            report.wake_times.push(granted);
            granted = session.request_time(SimTime::FAR_FUTURE)?;
        }

        let ctx = LogContext::new()
            .with_federate(&self.name)
            .with_role("controller")
            .with_granted(granted.as_secs_f64());
        evg_info!(
            context = ctx,
            "horizon reached after {} wake-ups and {} commands",
            report.wake_times.len(),
            report.commands_sent.len()
        );
        session.close()?;
        Ok(report)
    }

    fn drain<F>(
        &self,
        session: &mut FederateSession<'_, F>,
        granted: SimTime,
        report: &mut ControllerReport,
    ) -> Result<()>
    where
        F: TimeSyncClient + EndpointChannel,
    {
        let channels = session.channels();
        while channels.has_message() {
            let Some(message) = channels.pop_message() else {
                break;
            };
            if message.time > granted {
                return Err(FederateError::protocol(format!(
                    "message from {} authored at {} visible at granted time {}",
                    message.source, message.time, granted
                )));
            }
            let soc_report = SocReport::try_from(&message)?;
            let command = decide(soc_report.soc);
            channels.send(&soc_report.source, command.as_payload().as_bytes())?;

            let ctx = LogContext::new()
                .with_federate(&self.name)
                .with_role("controller")
                .with_terminal(&soc_report.source)
                .with_granted(granted.as_secs_f64());
            evg_debug!(
                context = ctx,
                "soc {} -> {:?}",
                soc_report.soc,
                command
            );

            report
                .trajectory
                .record(granted, &soc_report.source, soc_report.soc, None);
            report.commands_sent.push(IssuedCommand {
                time: granted,
                destination: soc_report.source,
                command,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Grant, ScriptedFederate};
    use evg_msg::Message;

    fn controller(horizon_secs: u64) -> ControllerFederate {
        ControllerFederate::new(&ControllerConfig::default(), Duration::from_secs(horizon_secs))
    }

    fn sent(federate: &ScriptedFederate) -> Vec<(String, String)> {
        federate
            .endpoint
            .sent()
            .iter()
            .map(|m: &Message| (m.destination.clone(), m.payload_text()))
            .collect()
    }

    #[test]
    fn threshold_is_inclusive() {
        assert_eq!(decide(0.95), ChargeCommand::Continue);
        assert_eq!(decide(0.9500001), ChargeCommand::Stop);
        assert_eq!(decide(0.0), ChargeCommand::Continue);
        assert_eq!(decide(1.2), ChargeCommand::Stop);
    }

    #[test]
    fn full_battery_is_told_to_stop() {
        let mut federate = ScriptedFederate::new("Controller/ep")
            .with_message("EV3", "0.97", SimTime::from_secs(300))
            .with_grants([
                Grant::At(SimTime::from_secs(300)),
                Grant::At(SimTime::from_secs(3600)),
            ]);
        let report = controller(3600).run(&mut federate).unwrap();

        assert_eq!(sent(&federate), [("EV3".to_owned(), "0".to_owned())]);
        assert_eq!(report.wake_times, [SimTime::from_secs(300)]);
        assert_eq!(report.commands_sent[0].command, ChargeCommand::Stop);
        assert_eq!(report.trajectory.samples()[0].soc, 0.97);
        assert_eq!(federate.finalize_calls, 1);
    }

    #[test]
    fn drains_every_queued_message_before_next_request() {
        let at = SimTime::from_secs(60);
        let mut federate = ScriptedFederate::new("Controller/ep")
            .with_message("EV1", "0.10", at)
            .with_message("EV2", "0.96", at)
            .with_message("EV1", "0.20", at)
            .with_grants([Grant::At(at), Grant::At(SimTime::from_secs(120))]);
        let report = controller(120).run(&mut federate).unwrap();

        assert_eq!(
            sent(&federate),
            [
                ("EV1".to_owned(), "1".to_owned()),
                ("EV2".to_owned(), "0".to_owned()),
                ("EV1".to_owned(), "1".to_owned()),
            ]
        );
        assert_eq!(federate.pending_at_request, [0, 0]);
        assert_eq!(report.commands_sent.len(), 3);
    }

    #[test]
    fn always_requests_far_future() {
        let mut federate = ScriptedFederate::new("Controller/ep")
            .with_grants([Grant::At(SimTime::from_secs(10)), Grant::At(SimTime::from_secs(20))]);
        controller(20).run(&mut federate).unwrap();
        assert!(federate.requests.iter().all(|t| *t == SimTime::FAR_FUTURE));
    }

    #[test]
    fn exits_on_first_grant_past_horizon() {
        let mut federate = ScriptedFederate::new("Controller/ep")
            .with_message("EV1", "0.5", SimTime::from_secs(10));
        let report = controller(3600).run(&mut federate).unwrap();

        assert_eq!(federate.grants, [SimTime::FAR_FUTURE]);
        assert!(report.wake_times.is_empty());
        assert!(federate.endpoint.sent().is_empty());
    }

    #[test]
    fn horizon_beyond_far_future_stops_at_idle_grant() {
        let mut federate = ScriptedFederate::new("Controller/ep")
            .with_message("EV1", "0.5", SimTime::from_secs(10))
            .with_grants([Grant::At(SimTime::from_secs(10))]);
        let controller = controller(17_280_000);
        assert_eq!(controller.horizon(), SimTime::FAR_FUTURE);

        let report = controller.run(&mut federate).unwrap();
        assert_eq!(federate.grants, [SimTime::from_secs(10), SimTime::FAR_FUTURE]);
        assert_eq!(report.wake_times, [SimTime::from_secs(10)]);
        assert_eq!(federate.finalize_calls, 1);
    }

    #[test]
    fn malformed_report_is_a_parse_error_and_still_finalizes() {
        let mut federate = ScriptedFederate::new("Controller/ep")
            .with_message("EV4", "full", SimTime::from_secs(60))
            .with_grants([Grant::At(SimTime::from_secs(60))]);
        let err = controller(600).run(&mut federate).unwrap_err();

        assert!(matches!(err, FederateError::Parse(_)));
        assert_eq!(federate.finalize_calls, 1);
    }

    #[test]
    fn mismatched_endpoint_is_a_configuration_error() {
        let mut federate = ScriptedFederate::new("Other/ep");
        let err = controller(600).run(&mut federate).unwrap_err();
        assert!(matches!(err, FederateError::Configuration(_)));
        assert_eq!(federate.finalize_calls, 1);
    }
}
