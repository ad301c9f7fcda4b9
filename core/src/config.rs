//! Run configuration types

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dispatcher::DEFAULT_SYSTEM_PROMPT;
use crate::error::{ConfigError, ConfigResult};
use crate::worker::Pacing;

/// Name given to the scenario derived from top-level settings
pub const DEFAULT_SCENARIO: &str = "default";

/// Run configuration
///
/// Written verbatim to `config.json` at the start of every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Chat-completion endpoint URL
    pub endpoint: String,

    /// Model used when a credential has none bound
    pub model: String,

    /// System message sent ahead of every prompt
    pub system_prompt: String,

    /// Maximum conversations running at once (batch size)
    pub concurrency: usize,

    /// Number of credentials drawn from the pool; `None` uses all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,

    /// Exchanges per conversation
    pub exchanges: usize,

    /// Network timeout per exchange, in seconds
    pub timeout_secs: u64,

    /// TCP connect timeout, in seconds; `None` leaves only the exchange timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,

    /// Inter-exchange pacing window
    pub pacing: Pacing,

    /// Verbose per-exchange logging
    pub verbose: bool,

    /// Explicit scenarios; empty means a single default scenario
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scenarios: Vec<Scenario>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            concurrency: 5,
            workers: None,
            exchanges: 3,
            timeout_secs: 60,
            connect_timeout_secs: None,
            pacing: Pacing::default(),
            verbose: false,
            scenarios: Vec::new(),
        }
    }
}

impl RunConfig {
    /// Create a config for the given endpoint
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Set the concurrency limit
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the number of exchanges per conversation
    pub fn with_exchanges(mut self, exchanges: usize) -> Self {
        self.exchanges = exchanges;
        self
    }

    /// Limit the number of credentials used
    pub fn with_workers(mut self, workers: Option<usize>) -> Self {
        self.workers = workers;
        self
    }

    /// Set the default model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the pacing window
    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Add an explicit scenario
    pub fn with_scenario(mut self, scenario: Scenario) -> Self {
        self.scenarios.push(scenario);
        self
    }

    /// Per-exchange timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// TCP connect timeout, if set
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }

    /// Scenarios to execute, in order
    ///
    /// Without explicit scenarios, one named [`DEFAULT_SCENARIO`] is derived
    /// from `workers`, `exchanges` and `concurrency`.
    pub fn effective_scenarios(&self) -> Vec<Scenario> {
        if self.scenarios.is_empty() {
            vec![Scenario {
                name: DEFAULT_SCENARIO.to_string(),
                credentials: self.workers,
                exchanges: self.exchanges,
                concurrency: self.concurrency,
            }]
        } else {
            self.scenarios.clone()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(ConfigError::InvalidEndpoint(format!(
                "{:?} is not an http(s) URL",
                self.endpoint
            )));
        }

        if self.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency(
                "concurrency must be at least 1".into(),
            ));
        }

        if self.exchanges == 0 {
            return Err(ConfigError::InvalidExchangeCount(
                "exchanges must be at least 1".into(),
            ));
        }

        if self.workers == Some(0) {
            return Err(ConfigError::InvalidConcurrency(
                "worker count must be at least 1".into(),
            ));
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout(
                "timeout must be at least 1 second".into(),
            ));
        }

        if self.connect_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidTimeout(
                "connect timeout must be at least 1 second".into(),
            ));
        }

        self.pacing.validate()?;

        let mut names = std::collections::HashSet::new();
        for scenario in &self.scenarios {
            scenario.validate()?;
            if !names.insert(scenario.name.as_str()) {
                return Err(ConfigError::InvalidScenario(format!(
                    "duplicate scenario name {:?}",
                    scenario.name
                )));
            }
        }

        Ok(())
    }
}

/// A named load shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name
    pub name: String,
    /// Credentials drawn from the front of the pool; `None` uses all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<usize>,
    /// Exchanges per conversation
    pub exchanges: usize,
    /// Concurrency limit (batch size)
    pub concurrency: usize,
}

impl Scenario {
    /// Create a scenario using every credential
    pub fn new(name: impl Into<String>, exchanges: usize, concurrency: usize) -> Self {
        Self {
            name: name.into(),
            credentials: None,
            exchanges,
            concurrency,
        }
    }

    /// Limit the number of credentials
    pub fn with_credentials(mut self, credentials: usize) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Validate the scenario
    pub fn validate(&self) -> ConfigResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::InvalidScenario("empty scenario name".into()));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidScenario(format!(
                "{}: concurrency must be at least 1",
                self.name
            )));
        }
        if self.exchanges == 0 {
            return Err(ConfigError::InvalidScenario(format!(
                "{}: exchanges must be at least 1",
                self.name
            )));
        }
        if self.credentials == Some(0) {
            return Err(ConfigError::InvalidScenario(format!(
                "{}: credential count must be at least 1",
                self.name
            )));
        }
        Ok(())
    }
}

impl FromStr for Scenario {
    type Err = ConfigError;

    /// Parse `name:credentials:exchanges:concurrency`, where credentials may
    /// be `all`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(ConfigError::InvalidScenario(format!(
                "expected name:credentials:exchanges:concurrency, got {:?}",
                s
            )));
        }

        let number = |field: &str, value: &str| {
            value.parse::<usize>().map_err(|_| {
                ConfigError::InvalidScenario(format!("invalid {} {:?} in {:?}", field, value, s))
            })
        };

        let credentials = if parts[1].eq_ignore_ascii_case("all") {
            None
        } else {
            Some(number("credential count", parts[1])?)
        };

        let scenario = Scenario {
            name: parts[0].to_string(),
            credentials,
            exchanges: number("exchange count", parts[2])?,
            concurrency: number("concurrency", parts[3])?,
        };
        scenario.validate()?;
        Ok(scenario)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_config_builder_pattern() {
        let config = RunConfig::new("https://api.example.com/v1/chat/completions")
            .with_concurrency(10)
            .with_exchanges(4)
            .with_workers(Some(25))
            .with_model("m1");

        assert_eq!(config.concurrency, 10);
        assert_eq!(config.exchanges, 4);
        assert_eq!(config.workers, Some(25));
        assert_eq!(config.model, "m1");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_zero_concurrency() {
        let config = RunConfig::default().with_concurrency(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConcurrency(_))
        ));
    }

    #[test]
    fn test_config_validation_zero_exchanges() {
        let config = RunConfig::default().with_exchanges(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidExchangeCount(_))
        ));
    }

    #[test]
    fn test_config_validation_zero_connect_timeout() {
        let mut config = RunConfig::default();
        assert_eq!(config.connect_timeout(), None);

        config.connect_timeout_secs = Some(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTimeout(_))
        ));

        config.connect_timeout_secs = Some(5);
        assert!(config.validate().is_ok());
        assert_eq!(config.connect_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_config_validation_bad_endpoint() {
        let config = RunConfig::new("localhost:8000");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_config_validation_duplicate_scenarios() {
        let config = RunConfig::default()
            .with_scenario(Scenario::new("burst", 1, 10))
            .with_scenario(Scenario::new("burst", 3, 2));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidScenario(_))
        ));
    }

    #[test]
    fn test_effective_scenarios_default() {
        let config = RunConfig::default()
            .with_workers(Some(8))
            .with_exchanges(2)
            .with_concurrency(4);
        let scenarios = config.effective_scenarios();

        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].name, DEFAULT_SCENARIO);
        assert_eq!(scenarios[0].credentials, Some(8));
        assert_eq!(scenarios[0].exchanges, 2);
        assert_eq!(scenarios[0].concurrency, 4);
    }

    #[test]
    fn test_effective_scenarios_explicit() {
        let config = RunConfig::default()
            .with_scenario(Scenario::new("single", 5, 1).with_credentials(1))
            .with_scenario(Scenario::new("burst", 1, 20));
        let scenarios = config.effective_scenarios();

        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[0].name, "single");
        assert_eq!(scenarios[1].credentials, None);
    }

    #[test]
    fn test_scenario_parse() {
        let scenario: Scenario = "burst:all:1:20".parse().unwrap();
        assert_eq!(scenario, Scenario::new("burst", 1, 20));

        let scenario: Scenario = "multi-turn:4:5:2".parse().unwrap();
        assert_eq!(scenario.credentials, Some(4));
        assert_eq!(scenario.exchanges, 5);
        assert_eq!(scenario.concurrency, 2);
    }

    #[test]
    fn test_scenario_parse_errors() {
        assert!("burst:all:1".parse::<Scenario>().is_err());
        assert!("burst:x:1:2".parse::<Scenario>().is_err());
        assert!("burst:all:0:2".parse::<Scenario>().is_err());
        assert!("burst:all:1:0".parse::<Scenario>().is_err());
        assert!(":all:1:1".parse::<Scenario>().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = RunConfig::default().with_scenario(Scenario::new("s", 1, 1));
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: RunConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, config);
    }
}
