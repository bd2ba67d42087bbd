//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Federation configuration model and loading."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;

use crate::logging::LogFormat;
use crate::time::SimTime;

/// Placeholder substituted with the 1-based terminal index in key templates.
pub const INDEX_PLACEHOLDER: &str = "{index}";

fn default_horizon() -> Duration {
    Duration::from_secs(60 * 60 * 24 * 7)
}

fn default_random_seed() -> u64 {
    2622
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_controller_name() -> String {
    "Controller".to_owned()
}

fn default_controller_endpoint() -> String {
    "Controller/ep".to_owned()
}

fn default_battery_name() -> String {
    "Battery".to_owned()
}

fn default_battery_period() -> Duration {
    Duration::from_secs(60)
}

fn default_terminals() -> usize {
    5
}

fn default_publication_template() -> String {
    "Battery/EV{index}_current".to_owned()
}

fn default_subscription_template() -> String {
    "Charger/EV{index}_voltage".to_owned()
}

fn default_initial_soc_ceiling() -> f64 {
    0.6
}

fn default_swap_soc_ceiling() -> f64 {
    0.8
}

fn default_capacities() -> Vec<CapacityOption> {
    vec![
        CapacityOption { kwh: 25.0, weight: 0.2 },
        CapacityOption { kwh: 62.0, weight: 0.2 },
        CapacityOption { kwh: 100.0, weight: 0.6 },
    ]
}

fn default_resistance_curve() -> Vec<[f64; 2]> {
    vec![[0.0, 8.0], [1.0, 150.0]]
}

/// Primary configuration object shared by both federate roles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub federation: FederationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub battery: BatteryConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "EVG_CONFIG";

    /// Load configuration from disk, respecting the `EVG_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: PathBuf) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.federation.validate()?;
        self.controller.validate()?;
        self.battery.validate()?;
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Settings shared by every federate in the run.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederationConfig {
    /// Simulated duration after which every federate shuts down.
    #[serde(default = "default_horizon")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub horizon: Duration,
    #[serde(default = "default_random_seed")]
    pub random_seed: u64,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            horizon: default_horizon(),
            random_seed: default_random_seed(),
        }
    }
}

impl FederationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.horizon.is_zero() {
            return Err(anyhow!("federation horizon must be greater than zero"));
        }
        if SimTime::from(self.horizon) > SimTime::FAR_FUTURE {
            return Err(anyhow!(
                "federation horizon {}s lies beyond the idle request time {}",
                self.horizon.as_secs(),
                SimTime::FAR_FUTURE
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

/// Event-driven charge controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    #[serde(default = "default_controller_name")]
    pub name: String,
    /// The single endpoint SOC reports arrive on and commands leave from.
    #[serde(default = "default_controller_endpoint")]
    pub endpoint: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            name: default_controller_name(),
            endpoint: default_controller_endpoint(),
        }
    }
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(anyhow!("controller name cannot be empty"));
        }
        if self.endpoint.trim().is_empty() {
            return Err(anyhow!("controller endpoint cannot be empty"));
        }
        Ok(())
    }
}

/// What happens to SOC values that integrate past full charge.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SocPolicy {
    /// Keep integrating past 1.0, as observed in the reference runs.
    #[default]
    Unclamped,
    /// Clamp SOC into `[0, 1]` after every step.
    ClampToUnit,
}

/// One entry of the discrete battery capacity distribution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CapacityOption {
    pub kwh: f64,
    pub weight: f64,
}

/// Periodic battery physics federate.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatteryConfig {
    #[serde(default = "default_battery_name")]
    pub name: String,
    #[serde(default = "default_battery_period")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub period: Duration,
    #[serde(default = "default_terminals")]
    pub terminals: usize,
    #[serde(default = "default_publication_template")]
    pub publication_template: String,
    #[serde(default = "default_subscription_template")]
    pub subscription_template: String,
    #[serde(default)]
    pub soc_policy: SocPolicy,
    /// SOC of the batteries present at start is drawn below this ceiling.
    #[serde(default = "default_initial_soc_ceiling")]
    pub initial_soc_ceiling: f64,
    /// SOC of a battery that replaced a departed EV is drawn below this ceiling.
    #[serde(default = "default_swap_soc_ceiling")]
    pub swap_soc_ceiling: f64,
    #[serde(default = "default_capacities")]
    pub capacities: Vec<CapacityOption>,
    /// `[soc, ohms]` control points, ascending by SOC.
    #[serde(default = "default_resistance_curve")]
    pub resistance_curve: Vec<[f64; 2]>,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            name: default_battery_name(),
            period: default_battery_period(),
            terminals: default_terminals(),
            publication_template: default_publication_template(),
            subscription_template: default_subscription_template(),
            soc_policy: SocPolicy::default(),
            initial_soc_ceiling: default_initial_soc_ceiling(),
            swap_soc_ceiling: default_swap_soc_ceiling(),
            capacities: default_capacities(),
            resistance_curve: default_resistance_curve(),
        }
    }
}

impl BatteryConfig {
    /// Publication key for the 0-based terminal `index`.
    pub fn publication_key(&self, index: usize) -> String {
        self.publication_template
            .replace(INDEX_PLACEHOLDER, &(index + 1).to_string())
    }

    /// Subscription key for the 0-based terminal `index`.
    pub fn subscription_key(&self, index: usize) -> String {
        self.subscription_template
            .replace(INDEX_PLACEHOLDER, &(index + 1).to_string())
    }

    /// Endpoint name handed to a scenario replay of the battery.
    ///
    /// The battery exchanges values only and never registers an endpoint, so
    /// this name is a placeholder the replay needs to address scripted
    /// messages; nothing is ever sent to or from it.
    pub fn replay_endpoint(&self) -> String {
        format!("{}/ep", self.name)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(anyhow!("battery name cannot be empty"));
        }
        if self.period.is_zero() {
            return Err(anyhow!("battery period must be greater than zero"));
        }
        if self.terminals == 0 {
            return Err(anyhow!("battery must model at least one terminal"));
        }
        for (field, template) in [
            ("publication_template", &self.publication_template),
            ("subscription_template", &self.subscription_template),
        ] {
            if !template.contains(INDEX_PLACEHOLDER) {
                return Err(anyhow!(
                    "battery {} '{}' must contain {}",
                    field,
                    template,
                    INDEX_PLACEHOLDER
                ));
            }
        }
        for (field, ceiling) in [
            ("initial_soc_ceiling", self.initial_soc_ceiling),
            ("swap_soc_ceiling", self.swap_soc_ceiling),
        ] {
            if !(ceiling > 0.0 && ceiling <= 1.0) {
                return Err(anyhow!("battery {} must lie in (0, 1], got {}", field, ceiling));
            }
        }
        if self.capacities.is_empty() {
            return Err(anyhow!("battery capacity distribution cannot be empty"));
        }
        for option in &self.capacities {
            if !(option.kwh > 0.0 && option.kwh.is_finite()) {
                return Err(anyhow!("battery capacity {} kWh must be positive", option.kwh));
            }
            if !(option.weight > 0.0 && option.weight.is_finite()) {
                return Err(anyhow!(
                    "weight {} for {} kWh must be positive",
                    option.weight,
                    option.kwh
                ));
            }
        }
        if self.resistance_curve.len() < 2 {
            return Err(anyhow!("resistance curve needs at least two control points"));
        }
        for pair in self.resistance_curve.windows(2) {
            if pair[1][0] <= pair[0][0] {
                return Err(anyhow!(
                    "resistance curve SOC points must be strictly ascending ({} then {})",
                    pair[0][0],
                    pair[1][0]
                ));
            }
        }
        if let Some(point) = self
            .resistance_curve
            .iter()
            .find(|point| !(point[1] > 0.0 && point[1].is_finite()))
        {
            return Err(anyhow!(
                "resistance at SOC {} must be positive, got {}",
                point[0],
                point[1]
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_reference_scenario() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.federation.horizon, Duration::from_secs(604_800));
        assert_eq!(config.battery.period, Duration::from_secs(60));
        assert_eq!(config.battery.terminals, 5);
        assert_eq!(config.battery.publication_key(0), "Battery/EV1_current");
        assert_eq!(config.battery.subscription_key(4), "Charger/EV5_voltage");
        assert_eq!(config.controller.endpoint, "Controller/ep");
    }

    #[test]
    fn parses_partial_toml() {
        let config: AppConfig = r#"
            [federation]
            horizon = 3600

            [battery]
            period = 30
            terminals = 2
            soc_policy = "clamp-to-unit"
            resistance_curve = [[0.0, 10.0], [0.5, 20.0], [1.0, 100.0]]
        "#
        .parse()
        .unwrap();
        assert_eq!(config.federation.horizon, Duration::from_secs(3600));
        assert_eq!(config.federation.random_seed, 2622);
        assert_eq!(config.battery.period, Duration::from_secs(30));
        assert_eq!(config.battery.soc_policy, SocPolicy::ClampToUnit);
        assert_eq!(config.battery.resistance_curve.len(), 3);
        assert_eq!(config.battery.capacities.len(), 3);
    }

    #[test]
    fn rejects_horizon_beyond_far_future() {
        let err = "[federation]\nhorizon = 17280000\n"
            .parse::<AppConfig>()
            .unwrap_err();
        assert!(err.to_string().contains("beyond the idle request time"));

        let config: AppConfig = "[federation]\nhorizon = 9223372\n".parse().unwrap();
        assert_eq!(config.federation.horizon, Duration::from_secs(9_223_372));
    }

    #[test]
    fn rejects_descending_curve() {
        let err = r#"
            [battery]
            resistance_curve = [[1.0, 150.0], [0.0, 8.0]]
        "#
        .parse::<AppConfig>()
        .unwrap_err();
        assert!(err.to_string().contains("strictly ascending"));
    }

    #[test]
    fn battery_replay_endpoint_follows_name() {
        let mut config = AppConfig::default();
        assert_eq!(config.battery.replay_endpoint(), "Battery/ep");
        config.battery.name = "Garage".into();
        assert_eq!(config.battery.replay_endpoint(), "Garage/ep");
    }

    #[test]
    fn rejects_template_without_placeholder() {
        let mut config = AppConfig::default();
        config.battery.publication_template = "Battery/current".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_terminals_and_bad_weights() {
        let mut config = AppConfig::default();
        config.battery.terminals = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.battery.capacities[1].weight = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_with_source_picks_first_existing_candidate() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "[controller]\nendpoint = \"Garage/ctrl\"")?;
        file.flush()?;

        let missing = PathBuf::from("definitely/not/here.toml");
        let loaded = AppConfig::load_with_source(&[missing, file.path().to_path_buf()])?;
        assert_eq!(loaded.source, file.path());
        assert_eq!(loaded.config.controller.endpoint, "Garage/ctrl");
        Ok(())
    }

    #[test]
    fn load_reports_inspected_paths() {
        let err = AppConfig::load(&["nowhere-a.toml", "nowhere-b.toml"]).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("nowhere-a.toml") && text.contains("nowhere-b.toml"));
    }
}
