//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Federate time-advance loops and models."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Battery charging physics: SOC-dependent effective resistance, energy
//! integration over one step, and battery swaps.

use evg_common::{BatteryConfig, CapacityOption, SocPolicy};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::error::{FederateError, Result};

const SECONDS_PER_HOUR: f64 = 3600.0;
const WATTS_PER_KILOWATT: f64 = 1000.0;

/// Piecewise-linear effective resistance over SOC, clamped at both ends.
#[derive(Debug, Clone, PartialEq)]
pub struct ResistanceCurve {
    points: Vec<(f64, f64)>,
}

impl ResistanceCurve {
    /// `points` are `[soc, ohms]`, strictly ascending by SOC.
    pub fn new(points: &[[f64; 2]]) -> Result<Self> {
        if points.len() < 2 {
            return Err(FederateError::configuration(
                "resistance curve needs at least two control points",
            ));
        }
        if points.windows(2).any(|pair| pair[1][0] <= pair[0][0]) {
            return Err(FederateError::configuration(
                "resistance curve SOC points must be strictly ascending",
            ));
        }
        if points.iter().any(|p| !(p[1] > 0.0 && p[1].is_finite())) {
            return Err(FederateError::configuration(
                "resistance curve values must be positive",
            ));
        }
        Ok(Self {
            points: points.iter().map(|p| (p[0], p[1])).collect(),
        })
    }

    pub fn resistance_at(&self, soc: f64) -> f64 {
        let (first_soc, first_r) = self.points[0];
        let (last_soc, last_r) = self.points[self.points.len() - 1];
        if soc <= first_soc {
            return first_r;
        }
        if soc >= last_soc {
            return last_r;
        }
        for pair in self.points.windows(2) {
            let (s0, r0) = pair[0];
            let (s1, r1) = pair[1];
            if soc <= s1 {
                return r0 + (r1 - r0) * (soc - s0) / (s1 - s0);
            }
        }
        last_r
    }
}

/// Weighted draw over the fleet's battery sizes.
#[derive(Debug, Clone)]
pub struct CapacityDistribution {
    capacities: Vec<f64>,
    index: WeightedIndex<f64>,
}

impl CapacityDistribution {
    pub fn new(options: &[CapacityOption]) -> Result<Self> {
        let index = WeightedIndex::new(options.iter().map(|o| o.weight)).map_err(|err| {
            FederateError::configuration(format!("invalid capacity weights: {err}"))
        })?;
        if options.iter().any(|o| !(o.kwh > 0.0 && o.kwh.is_finite())) {
            return Err(FederateError::configuration(
                "battery capacities must be positive",
            ));
        }
        Ok(Self {
            capacities: options.iter().map(|o| o.kwh).collect(),
            index,
        })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.capacities[self.index.sample(rng)]
    }
}

/// Battery currently plugged into one charging port.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargingTerminal {
    /// Publication key the current is published on; also names the terminal
    /// in trajectories.
    pub id: String,
    pub publication: String,
    pub subscription: String,
    pub soc: f64,
    pub capacity_kwh: f64,
}

/// Result of one physics step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub current: f64,
    pub added_energy_kwh: f64,
    /// The EV left and a fresh battery took its place.
    pub swapped: bool,
}

#[derive(Debug, Clone)]
pub struct BatteryModel {
    curve: ResistanceCurve,
    capacities: CapacityDistribution,
    initial_soc_ceiling: f64,
    swap_soc_ceiling: f64,
    policy: SocPolicy,
}

impl BatteryModel {
    pub fn from_config(config: &BatteryConfig) -> Result<Self> {
        Ok(Self {
            curve: ResistanceCurve::new(&config.resistance_curve)?,
            capacities: CapacityDistribution::new(&config.capacities)?,
            initial_soc_ceiling: config.initial_soc_ceiling,
            swap_soc_ceiling: config.swap_soc_ceiling,
            policy: config.soc_policy,
        })
    }

    pub fn curve(&self) -> &ResistanceCurve {
        &self.curve
    }

    /// Batteries present at start: every capacity is drawn before any SOC.
    pub fn populate<R: Rng + ?Sized>(
        &self,
        config: &BatteryConfig,
        rng: &mut R,
    ) -> Vec<ChargingTerminal> {
        let capacities: Vec<f64> = (0..config.terminals)
            .map(|_| self.capacities.sample(rng))
            .collect();
        capacities
            .into_iter()
            .enumerate()
            .map(|(index, capacity_kwh)| {
                let publication = config.publication_key(index);
                ChargingTerminal {
                    id: publication.clone(),
                    publication,
                    subscription: config.subscription_key(index),
                    soc: seed_soc(self.initial_soc_ceiling, rng),
                    capacity_kwh,
                }
            })
            .collect()
    }

    /// Advance `terminal` by `interval_secs` under `voltage`.
    ///
    /// Zero volts means the EV departed: a new battery is drawn and no
    /// energy is integrated.
    pub fn step<R: Rng + ?Sized>(
        &self,
        terminal: &mut ChargingTerminal,
        voltage: f64,
        interval_secs: f64,
        rng: &mut R,
    ) -> StepOutcome {
        if voltage == 0.0 {
            terminal.capacity_kwh = self.capacities.sample(rng);
            terminal.soc = seed_soc(self.swap_soc_ceiling, rng);
            return StepOutcome {
                current: 0.0,
                added_energy_kwh: 0.0,
                swapped: true,
            };
        }

        let resistance = self.curve.resistance_at(terminal.soc);
        let current = voltage / resistance;
        let added_energy_kwh =
            (current * voltage * interval_secs / SECONDS_PER_HOUR) / WATTS_PER_KILOWATT;
        let soc = terminal.soc + added_energy_kwh / terminal.capacity_kwh;
        terminal.soc = match self.policy {
            SocPolicy::Unclamped => soc,
            SocPolicy::ClampToUnit => soc.clamp(0.0, 1.0),
        };
        StepOutcome {
            current,
            added_energy_kwh,
            swapped: false,
        }
    }
}

/// Whole-percent SOC drawn uniformly from `[0, ceiling)`.
fn seed_soc<R: Rng + ?Sized>(ceiling: f64, rng: &mut R) -> f64 {
    let upper = ((ceiling * 100.0).round() as u32).max(1);
    f64::from(rng.gen_range(0..upper)) / 100.0
}
