//! ---
//! ems_section: "15-testing-qa-runbook"
//! ems_subsection: "integration-tests"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "End-to-end federate runs against replayed garage scenarios."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use evg_common::{AppConfig, SimTime};
use evg_federate::{BatteryFederate, ControllerFederate, FederateError, FederateExecutor};
use evg_msg::ChargeCommand;
use evg_sim::{
    write_run_summary, write_trajectory_csv, ReplayFederation, RunSummary, Scenario,
};

fn demo(path: &str) -> Scenario {
    let full: PathBuf = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../demos")
        .join(path);
    Scenario::from_path(&full)
        .unwrap_or_else(|err| panic!("failed to load {}: {err:#}", full.display()))
}

fn config(hours: u64) -> AppConfig {
    let mut config = AppConfig::default();
    config.federation.horizon = Duration::from_secs(hours * 3600);
    config
}

#[test]
fn controller_answers_demo_reports() {
    let config = config(2);
    let controller = ControllerFederate::new(&config.controller, config.federation.horizon);
    let mut replay = ReplayFederation::new("Controller/ep", demo("controller_scenario.json"));
    let report = controller.run(&mut replay).expect("controller run");

    let replies: Vec<(&str, String, f64)> = replay
        .sent()
        .iter()
        .map(|m| (m.destination.as_str(), m.payload_text(), m.time.as_secs_f64()))
        .collect();
    assert_eq!(
        replies,
        [
            ("EV1", "1".to_owned(), 0.0),
            ("EV3", "0".to_owned(), 900.0),
            ("EV2", "1".to_owned(), 900.0),
            ("EV5", "1".to_owned(), 1800.0),
            ("EV4", "0".to_owned(), 3600.0),
        ]
    );
    assert_eq!(
        report.wake_times,
        [0, 900, 1800, 3600].map(SimTime::from_secs)
    );
    assert_eq!(
        replay.grants().last().copied(),
        Some(SimTime::FAR_FUTURE),
        "idle controller must park on the far-future request"
    );
    assert!(replay.is_finalized());
    let stops = report
        .commands_sent
        .iter()
        .filter(|c| c.command == ChargeCommand::Stop)
        .count();
    assert_eq!(stops, 2);
}

#[test]
fn battery_swaps_when_demo_charger_drops_out() {
    let config = config(4);
    let battery = BatteryFederate::new(&config.battery, &config.federation).unwrap();
    let mut replay = ReplayFederation::new("Battery/ep", demo("battery_scenario.csv"));
    let report = battery.run(&mut replay).expect("battery run");

    assert_eq!(report.grants.len(), 4 * 60);
    assert_eq!(report.swaps, 1);
    assert_eq!(replay.published().len(), 4 * 60 * 5);

    let swap = report
        .trajectory
        .iter()
        .find(|s| s.terminal == "Battery/EV2_current" && s.time == SimTime::from_secs(7200))
        .expect("EV2 sample at the swap");
    assert_eq!(swap.current, Some(0.0));
    assert!(swap.soc < 0.8);

    let grants = replay.grants();
    assert!(grants.windows(2).all(|w| w[0] < w[1]));
    let horizon = SimTime::from_secs(4 * 3600);
    assert_eq!(grants.iter().filter(|g| **g >= horizon).count(), 1);
}

#[test]
fn same_seed_reproduces_battery_trajectory() {
    let config = config(1);
    let run = || {
        let battery = BatteryFederate::new(&config.battery, &config.federation).unwrap();
        let mut replay = ReplayFederation::new("Battery/ep", demo("battery_scenario.csv"));
        battery.run(&mut replay).unwrap().trajectory
    };
    let first = run();
    let second = run();
    let socs = |t: &evg_federate::Trajectory| t.iter().map(|s| s.soc).collect::<Vec<_>>();
    assert_eq!(socs(&first), socs(&second));
}

#[test]
fn malformed_report_aborts_controller_with_parse_error() {
    let scenario = Scenario::from_json_str(
        r#"{"messages": [{"time": 60, "source": "EV1", "destination": "Controller/ep", "payload": "n/a"}]}"#,
    )
    .unwrap();
    let config = config(1);
    let controller = ControllerFederate::new(&config.controller, config.federation.horizon);
    let mut replay = ReplayFederation::new("Controller/ep", scenario);

    let err = controller.run(&mut replay).unwrap_err();
    assert!(matches!(err, FederateError::Parse(_)));
    assert!(replay.sent().is_empty());
    assert!(replay.is_finalized());
}

#[tokio::test]
async fn both_roles_run_and_export() -> anyhow::Result<()> {
    let config = config(2);
    let controller = ControllerFederate::new(&config.controller, config.federation.horizon);
    let battery = BatteryFederate::new(&config.battery, &config.federation)?;

    let mut executor = FederateExecutor::new();
    executor.spawn("Controller", move || {
        let mut replay = ReplayFederation::new("Controller/ep", demo("controller_scenario.json"));
        controller
            .run(&mut replay)
            .map(|report| ("controller", report.wake_times.len(), report.trajectory))
    });
    executor.spawn("Battery", move || {
        let mut replay = ReplayFederation::new("Battery/ep", demo("battery_scenario.csv"));
        battery
            .run(&mut replay)
            .map(|report| ("battery", report.grants.len(), report.trajectory))
    });

    let out = tempfile::tempdir()?;
    for (name, (role, steps, trajectory)) in executor.join().await? {
        let csv = out.path().join(format!("{role}_trajectory.csv"));
        write_trajectory_csv(&csv, &trajectory)?;
        let summary = RunSummary::new(role, name, SimTime::from_secs(7200), steps, &trajectory);
        let json = out.path().join(format!("{role}_summary.json"));
        write_run_summary(&json, &summary)?;
    }

    let battery_csv = fs::read_to_string(out.path().join("battery_trajectory.csv"))?;
    assert_eq!(battery_csv.lines().count(), 1 + 2 * 60 * 5);
    let controller_csv = fs::read_to_string(out.path().join("controller_trajectory.csv"))?;
    assert!(controller_csv.contains("EV3,0.97,"));

    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.path().join("battery_summary.json"))?)?;
    assert_eq!(summary["steps"], 120);
    assert_eq!(summary["terminals"].as_object().map(|t| t.len()), Some(5));
    Ok(())
}
