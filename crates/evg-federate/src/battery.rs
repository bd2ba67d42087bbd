//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Federate time-advance loops and models."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Periodic battery federate.
//!
//! Every period the federate reads the charging voltage applied to each
//! terminal, integrates the battery physics over the elapsed interval and
//! publishes the resulting current.

use evg_common::{BatteryConfig, FederationConfig, SimTime};
use evg_logging::{evg_debug, evg_info, LogContext};
use evg_msg::{parse_number, ValueChannel};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::error::{FederateError, Result};
use crate::physics::{BatteryModel, ChargingTerminal};
use crate::session::FederateSession;
use crate::time_sync::TimeSyncClient;
use crate::trajectory::Trajectory;

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatteryReport {
    /// `(time, terminal, soc, current)` for every terminal at every grant.
    pub trajectory: Trajectory,
    /// Every grant, in order.
    pub grants: Vec<SimTime>,
    pub swaps: usize,
}

#[derive(Debug, Clone)]
pub struct BatteryFederate {
    config: BatteryConfig,
    model: BatteryModel,
    horizon: SimTime,
    seed: u64,
}

impl BatteryFederate {
    pub fn new(config: &BatteryConfig, federation: &FederationConfig) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            model: BatteryModel::from_config(config)?,
            horizon: SimTime::from(federation.horizon),
            seed: federation.random_seed,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn horizon(&self) -> SimTime {
        self.horizon
    }

    /// Register the terminal topology and step it until the horizon.
    pub fn run<F>(&self, federate: &mut F) -> Result<BatteryReport>
    where
        F: TimeSyncClient + ValueChannel,
    {
        let name = self.config.name.as_str();
        let mut session = FederateSession::new(federate, name, "battery", self.horizon);
        self.register(session.channels())?;
        session.enter_executing_mode()?;

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut terminals = self.model.populate(&self.config, &mut rng);
        let period = SimTime::from(self.config.period);

        let mut report = BatteryReport::default();
        let mut granted = SimTime::ZERO;
        while granted < self.horizon {
            let previous = granted;
            granted = session.request_time(granted.saturating_add(period))?;
            report.grants.push(granted);
            let interval_secs = granted.saturating_sub(previous).as_secs_f64();

            for terminal in terminals.iter_mut() {
                self.step_terminal(
                    session.channels(),
                    terminal,
                    granted,
                    interval_secs,
                    &mut rng,
                    &mut report,
                )?;
            }
        }

        let ctx = LogContext::new()
            .with_federate(name)
            .with_role("battery")
            .with_granted(granted.as_secs_f64());
        evg_info!(
            context = ctx,
            "horizon reached after {} steps and {} swaps",
            report.grants.len(),
            report.swaps
        );
        session.close()?;
        Ok(report)
    }

    fn register<F: ValueChannel>(&self, channels: &mut F) -> Result<()> {
        for index in 0..self.config.terminals {
            channels.register_publication(&self.config.publication_key(index))?;
            channels.register_subscription(&self.config.subscription_key(index))?;
        }
        let expected = self.config.terminals;
        let (publications, subscriptions) =
            (channels.publication_count(), channels.subscription_count());
        if publications != expected || subscriptions != expected {
            return Err(FederateError::configuration(format!(
                "battery declares {expected} terminals but registered \
                 {publications} publications and {subscriptions} subscriptions"
            )));
        }
        Ok(())
    }

    fn step_terminal<F: ValueChannel>(
        &self,
        channels: &mut F,
        terminal: &mut ChargingTerminal,
        granted: SimTime,
        interval_secs: f64,
        rng: &mut StdRng,
        report: &mut BatteryReport,
    ) -> Result<()> {
        // An input nobody has written yet reads as the runtime default, 0 V.
        let voltage = match channels.read(&terminal.subscription)? {
            Some(raw) => parse_number(raw.as_bytes())?,
            None => 0.0,
        };
        let resistance = self.model.curve().resistance_at(terminal.soc);
        let outcome = self.model.step(terminal, voltage, interval_secs, rng);
        channels.publish(&terminal.publication, outcome.current)?;

        let ctx = LogContext::new()
            .with_federate(&self.config.name)
            .with_role("battery")
            .with_terminal(&terminal.id)
            .with_granted(granted.as_secs_f64());
        if outcome.swapped {
            report.swaps += 1;
            evg_info!(
                context = ctx,
                "battery swapped: {} kWh at soc {:.2}",
                terminal.capacity_kwh,
                terminal.soc
            );
        } else {
            evg_debug!(
                context = ctx,
                "{:.2} V over {:.2} ohm -> {:.4} A, +{:.5} kWh, soc {:.4}",
                voltage,
                resistance,
                outcome.current,
                outcome.added_energy_kwh,
                terminal.soc
            );
        }

        report
            .trajectory
            .record(granted, &terminal.id, terminal.soc, Some(outcome.current));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Grant, ScriptedFederate};
    use std::time::Duration;

    fn federation(horizon_secs: u64) -> FederationConfig {
        FederationConfig {
            horizon: Duration::from_secs(horizon_secs),
            ..FederationConfig::default()
        }
    }

    fn battery(horizon_secs: u64) -> BatteryFederate {
        BatteryFederate::new(&BatteryConfig::default(), &federation(horizon_secs)).unwrap()
    }

    fn charging(federate: ScriptedFederate, volts: &str) -> ScriptedFederate {
        (1..=5).fold(federate, |f, i| {
            f.with_value(&format!("Charger/EV{i}_voltage"), volts, SimTime::ZERO)
        })
    }

    #[test]
    fn steps_every_terminal_each_period() {
        let mut federate = charging(ScriptedFederate::new("Battery/ep"), "240");
        let report = battery(300).run(&mut federate).unwrap();

        assert_eq!(
            report.grants,
            (1..=5).map(|k| SimTime::from_secs(60 * k)).collect::<Vec<_>>()
        );
        assert_eq!(report.trajectory.len(), 25);
        assert_eq!(federate.values.published().len(), 25);
        assert_eq!(federate.finalize_calls, 1);
        assert_eq!(report.swaps, 0);

        for samples in report.trajectory.per_terminal().values() {
            assert!(samples.windows(2).all(|w| w[1].soc > w[0].soc));
        }
    }

    #[test]
    fn reaches_horizon_exactly_once() {
        let mut federate = charging(ScriptedFederate::new("Battery/ep"), "240");
        let report = battery(150).run(&mut federate).unwrap();

        let horizon = SimTime::from_secs(150);
        assert_eq!(report.grants.iter().filter(|g| **g >= horizon).count(), 1);
        assert!(report.grants.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn unwritten_voltage_swaps_battery() {
        let mut federate = ScriptedFederate::new("Battery/ep");
        let report = battery(60).run(&mut federate).unwrap();

        assert_eq!(report.swaps, 5);
        assert!(federate.values.published().iter().all(|p| p.value == 0.0));
    }

    #[test]
    fn early_grant_integrates_nothing() {
        let mut federate = charging(ScriptedFederate::new("Battery/ep"), "240").with_grants([
            Grant::At(SimTime::from_secs(60)),
            Grant::At(SimTime::from_secs(60)),
            Grant::Requested,
        ]);
        let report = battery(120).run(&mut federate).unwrap();

        let samples = report.trajectory.per_terminal();
        let ev1 = &samples["Battery/EV1_current"];
        assert_eq!(ev1.len(), 3);
        assert_eq!(ev1[0].soc, ev1[1].soc);
        assert!(ev1[2].soc > ev1[1].soc);
    }

    #[test]
    fn malformed_voltage_is_a_parse_error() {
        let mut federate = charging(ScriptedFederate::new("Battery/ep"), "240")
            .with_value("Charger/EV3_voltage", "two-forty", SimTime::from_secs(60));
        let err = battery(600).run(&mut federate).unwrap_err();

        assert!(matches!(err, FederateError::Parse(_)));
        assert_eq!(federate.finalize_calls, 1);
    }

    #[test]
    fn topology_mismatch_is_a_configuration_error() {
        let mut federate = ScriptedFederate::new("Battery/ep").with_phantom_publication();
        let err = battery(600).run(&mut federate).unwrap_err();

        assert!(matches!(err, FederateError::Configuration(_)));
        assert!(federate.requests.is_empty());
        assert_eq!(federate.finalize_calls, 1);
    }
}
