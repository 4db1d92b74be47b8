//! Loader for dashboard configuration with YAML + environment overlays.
//!
//! Precedence, lowest to highest: built-in defaults, YAML files (in the order
//! added), `RISKDASH__`-prefixed environment variables, explicit overrides
//! (CLI flags). `${VAR}` placeholders in string values are expanded after the
//! sources are merged.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const ENV_PREFIX: &str = "RISKDASH";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DashConfig {
    pub api: ApiConfig,
    pub logging: LoggingConfig,
    pub ui: UiConfig,
}

/// Where the risk-scoring service lives.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub verify_path: String,
    pub health_path: String,
    pub connect_timeout_secs: u64,
    /// `None` waits for the service indefinitely.
    pub request_timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            verify_path: "/api/v1/transactions/verify".into(),
            health_path: "/api/v1/health".into(),
            connect_timeout_secs: 5,
            request_timeout_secs: None,
        }
    }
}

impl ApiConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: Option<String>,
    /// `text` or `json`.
    pub format: String,
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            format: "text".into(),
            filter: "info".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub tick_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { tick_ms: 80 }
    }
}

impl UiConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.clamp(16, 1000))
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder over the `config` crate wiring.
pub struct DashConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    overrides: Vec<(String, String)>,
}

impl Default for DashConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DashConfigLoader {
    /// Start from built-in defaults.
    ///
    /// ```
    /// use riskdash_config::DashConfigLoader;
    ///
    /// let cfg = DashConfigLoader::new().load().expect("defaults load");
    /// assert_eq!(cfg.api.verify_path, "/api/v1/transactions/verify");
    /// assert!(cfg.api.request_timeout().is_none());
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
            overrides: Vec::new(),
        }
    }

    /// Attach a file that must exist; the format is inferred from the suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is skipped when missing.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    ///
    /// ```
    /// use riskdash_config::DashConfigLoader;
    ///
    /// let cfg = DashConfigLoader::new()
    ///     .with_yaml_str("api:\n  base_url: 'http://scoring:9000'\nui:\n  tick_ms: 50")
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.api.base_url, "http://scoring:9000");
    /// assert_eq!(cfg.api.health_path, "/api/v1/health");
    /// assert_eq!(cfg.ui.tick_ms, 50);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Force a dotted key (e.g. `api.base_url`) regardless of other sources.
    pub fn with_override(mut self, key: &str, value: impl Into<String>) -> Self {
        self.overrides.push((key.to_string(), value.into()));
        self
    }

    /// Merge all sources, expand `${VAR}` placeholders and deserialize.
    ///
    /// ```
    /// use riskdash_config::DashConfigLoader;
    ///
    /// unsafe { std::env::set_var("SCORING_HOST", "scoring.internal"); }
    ///
    /// let cfg = DashConfigLoader::new()
    ///     .with_yaml_str("api:\n  base_url: 'http://${SCORING_HOST}:8000'")
    ///     .load()
    ///     .expect("valid configuration");
    /// assert_eq!(cfg.api.base_url, "http://scoring.internal:8000");
    ///
    /// unsafe { std::env::remove_var("SCORING_HOST"); }
    /// ```
    pub fn load(self) -> Result<DashConfig, ConfigError> {
        let mut builder = self.builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );
        for (key, value) in self.overrides {
            builder = builder.set_override(key, value)?;
        }
        let cfg = builder.build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: DashConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;
        validate(&typed)?;
        Ok(typed)
    }
}

fn validate(cfg: &DashConfig) -> Result<(), ConfigError> {
    if cfg.api.base_url.trim().is_empty() {
        return Err(ConfigError::Message("api.base_url must not be empty".into()));
    }
    for (key, path) in [
        ("api.verify_path", &cfg.api.verify_path),
        ("api.health_path", &cfg.api.health_path),
    ] {
        if path.trim().is_empty() {
            return Err(ConfigError::Message(format!("{key} must not be empty")));
        }
    }
    Ok(())
}
