//! Configuration management with validation and defaults
//!
//! Engine tuning lives in a TOML file; any section may be omitted and falls
//! back to the built-in defaults. `WAGER_*` environment variables override
//! the file.

use crate::errors::{ConfigurationError, EngineResult};
use crate::games::types::BetBounds;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::time::Duration;

/// Complete engine configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub pattern: PatternConfig,
    pub payout: PayoutConfig,
    pub tables: TablesConfig,
    pub crash: CrashConfig,
    pub logging: LoggingConfig,
}

/// Shape of the shuffled win/loss queue and the override draw
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    pub cycle_length: usize,
    pub wins_per_cycle: usize,
    /// Chance of returning the queued outcome instead of the override draw
    pub pattern_follow_probability: f64,
    /// Win chance of the independent override draw
    pub override_win_probability: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            cycle_length: 10,
            wins_per_cycle: 2,
            pattern_follow_probability: 0.9,
            override_win_probability: 0.15,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PayoutConfig {
    /// Weight of candidate `i` is `weight_decay^i`
    pub weight_decay: f64,
}

impl Default for PayoutConfig {
    fn default() -> Self {
        Self { weight_decay: 0.6 }
    }
}

/// Per-game multiplier candidates and stake bounds
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TablesConfig {
    pub multipliers: HashMap<String, Vec<f64>>,
    pub bounds: HashMap<String, BetBounds>,
    pub default_multipliers: Vec<f64>,
    pub default_bounds: BetBounds,
}

impl Default for TablesConfig {
    fn default() -> Self {
        let multipliers = [
            ("dice", vec![1.5, 2.0, 3.0, 5.0, 10.0]),
            ("slots", vec![2.0, 5.0, 10.0, 25.0, 50.0]),
            ("mines", vec![1.2, 1.5, 2.0, 3.0, 5.0]),
            ("aviator", vec![1.2, 1.5, 2.0, 3.0, 5.0, 10.0]),
            ("rollmaster", vec![1.5, 2.0, 4.0, 6.0]),
            ("roulette", vec![2.0, 3.0, 6.0, 12.0, 36.0]),
            ("ludo", vec![1.5, 2.0, 3.0]),
            ("sports", vec![1.5, 2.0, 2.5, 4.0]),
        ]
        .into_iter()
        .map(|(game, table)| (game.to_string(), table))
        .collect();

        let bounds = [
            ("dice", BetBounds::new(1.0, 10_000.0)),
            ("slots", BetBounds::new(5.0, 5_000.0)),
            ("mines", BetBounds::new(1.0, 10_000.0)),
            ("aviator", BetBounds::new(1.0, 10_000.0)),
            ("rollmaster", BetBounds::new(1.0, 10_000.0)),
            ("roulette", BetBounds::new(5.0, 10_000.0)),
            ("ludo", BetBounds::new(10.0, 5_000.0)),
            ("sports", BetBounds::new(10.0, 50_000.0)),
        ]
        .into_iter()
        .map(|(game, b)| (game.to_string(), b))
        .collect();

        Self {
            multipliers,
            bounds,
            default_multipliers: vec![1.5, 2.0, 3.0],
            default_bounds: BetBounds::new(1.0, 10_000.0),
        }
    }
}

/// Timing and distribution of the crash curve
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CrashConfig {
    pub waiting_ms: u64,
    pub tick_ms: u64,
    pub crashed_ms: u64,
    /// Curve is `exp(growth_per_second * t)`
    pub growth_per_second: f64,
    pub house_factor: f64,
    pub max_crash_point: f64,
}

impl Default for CrashConfig {
    fn default() -> Self {
        Self {
            waiting_ms: 5_000,
            tick_ms: 100,
            crashed_ms: 3_000,
            growth_per_second: 0.06,
            house_factor: 0.99,
            max_crash_point: 100.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            json: false,
        }
    }
}

impl EngineConfig {
    /// Fast crash timings for tests and local runs
    pub fn testing() -> Self {
        Self {
            crash: CrashConfig {
                waiting_ms: 5,
                tick_ms: 1,
                crashed_ms: 5,
                growth_per_second: 50.0,
                ..Default::default()
            },
            logging: LoggingConfig {
                level: LogLevel::Debug,
                json: false,
            },
            ..Default::default()
        }
    }

    /// Validate configuration for logical consistency
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let pattern = &self.pattern;
        if pattern.cycle_length == 0 {
            return Err(invalid("pattern.cycle_length", pattern.cycle_length, "must be > 0"));
        }
        if pattern.wins_per_cycle > pattern.cycle_length {
            return Err(invalid(
                "pattern.wins_per_cycle",
                pattern.wins_per_cycle,
                "cannot exceed cycle_length",
            ));
        }
        check_probability("pattern.pattern_follow_probability", pattern.pattern_follow_probability)?;
        check_probability("pattern.override_win_probability", pattern.override_win_probability)?;

        let decay = self.payout.weight_decay;
        if !(decay > 0.0 && decay <= 1.0) {
            return Err(invalid("payout.weight_decay", decay, "must be in (0, 1]"));
        }

        check_multipliers("tables.default_multipliers", &self.tables.default_multipliers)?;
        for (game, table) in &self.tables.multipliers {
            check_multipliers(&format!("tables.multipliers.{}", game), table)?;
        }
        check_bounds("tables.default_bounds", &self.tables.default_bounds)?;
        for (game, bounds) in &self.tables.bounds {
            check_bounds(&format!("tables.bounds.{}", game), bounds)?;
        }

        let crash = &self.crash;
        if crash.waiting_ms == 0 || crash.tick_ms == 0 || crash.crashed_ms == 0 {
            return Err(ConfigurationError::ValidationFailed(
                "crash timings must all be > 0".to_string(),
            ));
        }
        if !(crash.growth_per_second.is_finite() && crash.growth_per_second > 0.0) {
            return Err(invalid("crash.growth_per_second", crash.growth_per_second, "must be > 0"));
        }
        if !(crash.house_factor > 0.0 && crash.house_factor <= 1.0) {
            return Err(invalid("crash.house_factor", crash.house_factor, "must be in (0, 1]"));
        }
        if !(crash.max_crash_point.is_finite() && crash.max_crash_point >= 1.0) {
            return Err(invalid("crash.max_crash_point", crash.max_crash_point, "must be >= 1"));
        }

        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.crash.tick_ms)
    }

    pub fn waiting_duration(&self) -> Duration {
        Duration::from_millis(self.crash.waiting_ms)
    }

    pub fn crashed_duration(&self) -> Duration {
        Duration::from_millis(self.crash.crashed_ms)
    }
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ConfigurationError {
    ConfigurationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn check_probability(field: &str, p: f64) -> Result<(), ConfigurationError> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(invalid(field, p, "must be in [0, 1]"))
    }
}

fn check_multipliers(field: &str, table: &[f64]) -> Result<(), ConfigurationError> {
    if table.is_empty() {
        return Err(invalid(field, "[]", "must not be empty"));
    }
    if let Some(bad) = table.iter().find(|m| !(m.is_finite() && **m > 0.0)) {
        return Err(invalid(field, bad, "multipliers must be finite and positive"));
    }
    if table.windows(2).any(|w| w[0] > w[1]) {
        return Err(invalid(field, format!("{:?}", table), "must be ascending"));
    }
    Ok(())
}

fn check_bounds(field: &str, bounds: &BetBounds) -> Result<(), ConfigurationError> {
    if bounds.min > 0.0 && bounds.min <= bounds.max && bounds.max.is_finite() {
        Ok(())
    } else {
        Err(invalid(
            field,
            format!("{}..{}", bounds.min, bounds.max),
            "require 0 < min <= max",
        ))
    }
}

/// Configuration loader with environment variable support
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> EngineResult<EngineConfig> {
        self.load_with(|key| env::var(key).ok())
    }

    /// Load configuration, resolving `WAGER_*` overrides through `lookup`
    pub fn load_with<F>(&self, lookup: F) -> EngineResult<EngineConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match self.config_path {
            Some(ref path) => Self::load_from_file(path)?,
            None => EngineConfig::default(),
        };

        Self::apply_env_overrides(&mut config, lookup)?;
        config.validate()?;

        tracing::debug!(path = ?self.config_path, "Loaded engine configuration");
        Ok(config)
    }

    fn load_from_file(path: &str) -> Result<EngineConfig, ConfigurationError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)))
    }

    /// Apply `WAGER_*` overrides from `lookup`
    pub(crate) fn apply_env_overrides<F>(
        config: &mut EngineConfig,
        lookup: F,
    ) -> Result<(), ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("WAGER_CYCLE_LENGTH") {
            config.pattern.cycle_length = parse_env("WAGER_CYCLE_LENGTH", v)?;
        }
        if let Some(v) = lookup("WAGER_WINS_PER_CYCLE") {
            config.pattern.wins_per_cycle = parse_env("WAGER_WINS_PER_CYCLE", v)?;
        }
        if let Some(v) = lookup("WAGER_PATTERN_FOLLOW_PROBABILITY") {
            config.pattern.pattern_follow_probability =
                parse_env("WAGER_PATTERN_FOLLOW_PROBABILITY", v)?;
        }
        if let Some(v) = lookup("WAGER_OVERRIDE_WIN_PROBABILITY") {
            config.pattern.override_win_probability =
                parse_env("WAGER_OVERRIDE_WIN_PROBABILITY", v)?;
        }
        if let Some(v) = lookup("WAGER_WEIGHT_DECAY") {
            config.payout.weight_decay = parse_env("WAGER_WEIGHT_DECAY", v)?;
        }
        if let Some(v) = lookup("WAGER_LOG_LEVEL") {
            config.logging.level = parse_env("WAGER_LOG_LEVEL", v)?;
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(field: &str, value: String) -> Result<T, ConfigurationError> {
    value.trim().parse().map_err(|_| ConfigurationError::InvalidValue {
        field: field.to_string(),
        value,
        reason: "could not parse value".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
        assert!(EngineConfig::testing().validate().is_ok());
    }

    #[test]
    fn test_default_tables_contain_documented_bounds() {
        let tables = TablesConfig::default();
        assert_eq!(tables.bounds["slots"].min, 5.0);
        assert!(tables.multipliers["dice"].contains(&2.0));
    }

    #[test]
    fn test_wins_cannot_exceed_cycle() {
        let mut config = EngineConfig::default();
        config.pattern.wins_per_cycle = 11;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_descending_multipliers_rejected() {
        let mut config = EngineConfig::default();
        config.tables.multipliers.insert("dice".to_string(), vec![3.0, 2.0]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let mut config = EngineConfig::default();
        config.tables.bounds.insert("dice".to_string(), BetBounds::new(100.0, 1.0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_probability_out_of_range_rejected() {
        let mut config = EngineConfig::default();
        config.pattern.pattern_follow_probability = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides_applied() {
        let mut config = EngineConfig::default();
        ConfigLoader::apply_env_overrides(&mut config, |key| match key {
            "WAGER_CYCLE_LENGTH" => Some("20".to_string()),
            "WAGER_WINS_PER_CYCLE" => Some("4".to_string()),
            "WAGER_LOG_LEVEL" => Some("TRACE".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.pattern.cycle_length, 20);
        assert_eq!(config.pattern.wins_per_cycle, 4);
        assert_eq!(config.logging.level, LogLevel::Trace);
    }

    #[test]
    fn test_bad_env_override_is_reported() {
        let mut config = EngineConfig::default();
        let err = ConfigLoader::apply_env_overrides(&mut config, |key| {
            (key == "WAGER_WEIGHT_DECAY").then(|| "lots".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidValue { .. }));
    }

    #[test]
    fn test_partial_toml_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[pattern]
cycle_length = 20
wins_per_cycle = 4

[tables.multipliers]
keno = [1.0, 4.0, 8.0]
"#
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.pattern.cycle_length, 20);
        assert_eq!(config.pattern.pattern_follow_probability, 0.9);
        assert_eq!(config.tables.multipliers["keno"], vec![1.0, 4.0, 8.0]);
        assert_eq!(config.payout.weight_decay, 0.6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let err = ConfigLoader::load_from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigurationError::LoadFailed(_)));
    }

    #[test]
    fn test_duration_conversions() {
        let config = EngineConfig::default();
        assert_eq!(config.tick_interval(), Duration::from_millis(100));
        assert_eq!(config.waiting_duration(), Duration::from_secs(5));
    }
}
