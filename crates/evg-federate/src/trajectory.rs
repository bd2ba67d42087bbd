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
use indexmap::IndexMap;
use serde::Serialize;

/// One observed state of charge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrajectorySample {
    pub time: SimTime,
    pub terminal: String,
    pub soc: f64,
    /// Charging current published alongside the sample, battery side only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<f64>,
}

/// Append-only (time, terminal, soc) record kept for post-run analysis.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Trajectory {
    samples: Vec<TrajectorySample>,
}

impl Trajectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, time: SimTime, terminal: &str, soc: f64, current: Option<f64>) {
        self.samples.push(TrajectorySample {
            time,
            terminal: terminal.to_owned(),
            soc,
            current,
        });
    }

    pub fn samples(&self) -> &[TrajectorySample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrajectorySample> {
        self.samples.iter()
    }

    /// Samples grouped by terminal, terminals in first-seen order.
    pub fn per_terminal(&self) -> IndexMap<&str, Vec<&TrajectorySample>> {
        let mut grouped: IndexMap<&str, Vec<&TrajectorySample>> = IndexMap::new();
        for sample in &self.samples {
            grouped
                .entry(sample.terminal.as_str())
                .or_default()
                .push(sample);
        }
        grouped
    }
}
