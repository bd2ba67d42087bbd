//! ---
//! ems_section: "11-simulation-test-harness"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Trajectory export for post-run analysis."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use evg_common::SimTime;
use evg_federate::Trajectory;
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct TrajectoryRow<'a> {
    time_s: f64,
    terminal: &'a str,
    soc: f64,
    current_a: Option<f64>,
}

/// Per-terminal digest of a trajectory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TerminalSummary {
    pub samples: usize,
    pub first_soc: f64,
    pub final_soc: f64,
    pub min_soc: f64,
    pub max_soc: f64,
}

/// JSON run summary written next to the trajectory CSV.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub role: String,
    pub federate: String,
    pub generated_at: DateTime<Utc>,
    pub horizon_s: f64,
    /// Grants the loop acted on: wake-ups for the controller, steps for the battery.
    pub steps: usize,
    pub samples: usize,
    pub terminals: IndexMap<String, TerminalSummary>,
}

impl RunSummary {
    pub fn new(
        role: impl Into<String>,
        federate: impl Into<String>,
        horizon: SimTime,
        steps: usize,
        trajectory: &Trajectory,
    ) -> Self {
        let terminals = trajectory
            .per_terminal()
            .into_iter()
            .filter_map(|(terminal, samples)| {
                let first = samples.first()?.soc;
                let last = samples.last()?.soc;
                let (min_soc, max_soc) = samples.iter().fold(
                    (f64::INFINITY, f64::NEG_INFINITY),
                    |(lo, hi), sample| (lo.min(sample.soc), hi.max(sample.soc)),
                );
                Some((
                    terminal.to_owned(),
                    TerminalSummary {
                        samples: samples.len(),
                        first_soc: first,
                        final_soc: last,
                        min_soc,
                        max_soc,
                    },
                ))
            })
            .collect();
        Self {
            role: role.into(),
            federate: federate.into(),
            generated_at: Utc::now(),
            horizon_s: horizon.as_secs_f64(),
            steps,
            samples: trajectory.len(),
            terminals,
        }
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("unable to create output directory {}", parent.display()))?;
    }
    Ok(())
}

/// Write `trajectory` as `time_s,terminal,soc,current_a` rows.
pub fn write_trajectory_csv(path: &Path, trajectory: &Trajectory) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("unable to create trajectory csv {}", path.display()))?;
    for sample in trajectory.iter() {
        writer.serialize(TrajectoryRow {
            time_s: sample.time.as_secs_f64(),
            terminal: &sample.terminal,
            soc: sample.soc,
            current_a: sample.current,
        })?;
    }
    writer
        .flush()
        .with_context(|| format!("unable to flush trajectory csv {}", path.display()))?;
    Ok(())
}

pub fn write_run_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    ensure_parent(path)?;
    let file = File::create(path)
        .with_context(|| format!("unable to create run summary {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), summary)
        .with_context(|| format!("unable to write run summary {}", path.display()))?;
    Ok(())
}
