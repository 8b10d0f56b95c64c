use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sites::GenerationConfig;
use streaming::CacheConfig;
use tracing::{info, warn};

/// Env var naming an optional JSON config file.
pub const CONFIG_PATH_VAR: &str = "TERRASCAN_CONFIG";

/// Tunables of one explorer run.
///
/// Layered as defaults, then the JSON file, then `TERRASCAN_*` env vars;
/// command-line flags are applied by the caller on top.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    pub cache: CacheConfig,
    pub generation: GenerationConfig,
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, message: String },
    Parse { path: PathBuf, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, message } => {
                write!(f, "cannot read config {}: {message}", path.display())
            }
            ConfigError::Parse { path, message } => {
                write!(f, "invalid config {}: {message}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl ExplorerConfig {
    /// Loads `path` (or the file named by `TERRASCAN_CONFIG`) and applies
    /// the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| env::var_os(CONFIG_PATH_VAR).map(PathBuf::from));
        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        let vars: HashMap<String, String> = env::vars().collect();
        config.apply_env(|key| vars.get(key).cloned());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config = serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        info!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Applies `TERRASCAN_*` overrides read through `lookup`. Unparseable
    /// values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env_u64(&lookup, "TERRASCAN_STALE_TIME_MS") {
            self.cache.stale_time_ms = v;
        }
        if let Some(v) = env_u64(&lookup, "TERRASCAN_REFETCH_INTERVAL_MS") {
            self.cache.refetch_interval_ms = (v > 0).then_some(v);
        }
        if let Some(v) = env_u64(&lookup, "TERRASCAN_RETRIES") {
            self.cache.retries = u32::try_from(v).unwrap_or(u32::MAX);
        }
        if let Some(v) = env_u64(&lookup, "TERRASCAN_FETCH_LATENCY_MS") {
            self.generation.latency_ms = v;
        }
        if let Some(v) = env_f64(&lookup, "TERRASCAN_FAILURE_PROBABILITY") {
            self.generation.failure_probability = v.clamp(0.0, 1.0);
        }
    }
}

fn env_u64(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable override");
            None
        }
    }
}

fn env_f64(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<f64> {
    let raw = lookup(key)?;
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            warn!(key, value = %raw, "ignoring unparseable override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, ExplorerConfig};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_carry_documented_timings() {
        let config = ExplorerConfig::default();
        assert_eq!(config.cache.stale_time_ms, 5_000);
        assert_eq!(config.cache.refetch_interval_ms, Some(30_000));
        assert_eq!(config.generation.latency_ms, 800);
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = ExplorerConfig::default();
        config.apply_env(lookup(&[
            ("TERRASCAN_STALE_TIME_MS", "1000"),
            ("TERRASCAN_REFETCH_INTERVAL_MS", "0"),
            ("TERRASCAN_FETCH_LATENCY_MS", " 50 "),
            ("TERRASCAN_RETRIES", "2"),
        ]));
        assert_eq!(config.cache.stale_time_ms, 1_000);
        assert_eq!(config.cache.refetch_interval_ms, None);
        assert_eq!(config.cache.retries, 2);
        assert_eq!(config.generation.latency_ms, 50);
    }

    #[test]
    fn garbage_env_values_are_ignored() {
        let mut config = ExplorerConfig::default();
        config.apply_env(lookup(&[
            ("TERRASCAN_STALE_TIME_MS", "soon"),
            ("TERRASCAN_FAILURE_PROBABILITY", "NaN"),
        ]));
        assert_eq!(config, ExplorerConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("explorer.json");
        std::fs::write(
            &path,
            r#"{ "cache": { "retries": 3 }, "generation": { "mining": { "min": 5, "max": 10, "density": 1.0 } } }"#,
        )
        .unwrap();

        let config = ExplorerConfig::from_file(&path).unwrap();
        assert_eq!(config.cache.retries, 3);
        assert_eq!(config.cache.stale_time_ms, 5_000);
        assert_eq!(config.generation.mining.max, 10);
        assert_eq!(config.generation.latency_ms, 800);
    }

    #[test]
    fn missing_and_broken_files_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        assert!(matches!(
            ExplorerConfig::from_file(&missing),
            Err(ConfigError::Io { .. })
        ));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{").unwrap();
        let err = ExplorerConfig::from_file(&broken).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("broken.json"));
    }
}
