//! Endpoint configuration
//!
//! TOML-based persistent configuration with auto-creation and defaults.
//! Environment variables override file values (highest priority).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Central-system endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CentralSystemConfig {
    /// WebSocket bind host.
    #[serde(default = "default_host")]
    pub host: String,

    /// WebSocket port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Listen path; `{id}` names the charge-point-id segment.
    #[serde(default = "default_path")]
    pub path: String,

    /// Per-call timeout in seconds. 0 disables call timeouts.
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
}

/// Charge-point endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargePointConfig {
    /// Base URL of the central system (the charge-point identity is
    /// appended as the last path segment).
    #[serde(default = "default_central_system_url")]
    pub central_system_url: String,

    /// Charge-point identity announced in the connection URL.
    #[serde(default = "default_identity")]
    pub identity: String,

    /// Per-call timeout in seconds. 0 disables call timeouts.
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
}

// ── Default value helpers ──────────────────────────────────────

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    9000
}
fn default_path() -> String {
    "/ocpp/{id}".into()
}
fn default_call_timeout() -> u64 {
    30
}
fn default_central_system_url() -> String {
    "ws://localhost:9000/ocpp".into()
}
fn default_identity() -> String {
    "CP001".into()
}

impl Default for CentralSystemConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            path: default_path(),
            call_timeout_secs: default_call_timeout(),
        }
    }
}

impl Default for ChargePointConfig {
    fn default() -> Self {
        Self {
            central_system_url: default_central_system_url(),
            identity: default_identity(),
            call_timeout_secs: default_call_timeout(),
        }
    }
}

/// Default configuration directory.
pub fn default_config_dir() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("voltara-ocpp")
}

impl CentralSystemConfig {
    /// Load from a TOML file, creating it with defaults when absent.
    /// Environment variables override file values.
    pub fn load(path: &Path) -> Result<Self, String> {
        let mut config: Self = load_or_create(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Supported variables: `OCPP_WS_HOST`, `OCPP_WS_PORT`, `OCPP_WS_PATH`,
    /// `OCPP_CALL_TIMEOUT`.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("OCPP_WS_HOST") {
            self.host = v;
        }
        if let Ok(v) = std::env::var("OCPP_WS_PORT") {
            if let Ok(port) = v.parse::<u16>() {
                self.port = port;
            }
        }
        if let Ok(v) = std::env::var("OCPP_WS_PATH") {
            self.path = v;
        }
        if let Ok(v) = std::env::var("OCPP_CALL_TIMEOUT") {
            if let Ok(secs) = v.parse::<u64>() {
                self.call_timeout_secs = secs;
            }
        }
    }

    /// Validate the configuration, collecting all problems.
    pub fn validate(&self) -> Result<(), String> {
        let mut errors = Vec::new();

        if self.port == 0 {
            errors.push("WebSocket port must not be 0".to_string());
        }
        if !self.path.contains("{id}") {
            errors.push(format!(
                "Listen path '{}' must contain an {{id}} placeholder",
                self.path
            ));
        }
        if self.call_timeout_secs > 3600 {
            errors.push(format!(
                "Call timeout ({}) must be at most 3600 seconds",
                self.call_timeout_secs
            ));
        }

        collect_errors(errors)
    }

    /// Persist to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        save_toml(self, path)
    }

    /// The per-call timeout, `None` when disabled.
    pub fn call_timeout(&self) -> Option<Duration> {
        (self.call_timeout_secs > 0).then(|| Duration::from_secs(self.call_timeout_secs))
    }
}

impl ChargePointConfig {
    /// Load from a TOML file, creating it with defaults when absent.
    /// Environment variables override file values.
    pub fn load(path: &Path) -> Result<Self, String> {
        let mut config: Self = load_or_create(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Supported variables: `OCPP_CS_URL`, `OCPP_CP_IDENTITY`,
    /// `OCPP_CALL_TIMEOUT`.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("OCPP_CS_URL") {
            self.central_system_url = v;
        }
        if let Ok(v) = std::env::var("OCPP_CP_IDENTITY") {
            self.identity = v;
        }
        if let Ok(v) = std::env::var("OCPP_CALL_TIMEOUT") {
            if let Ok(secs) = v.parse::<u64>() {
                self.call_timeout_secs = secs;
            }
        }
    }

    /// Validate the configuration, collecting all problems.
    pub fn validate(&self) -> Result<(), String> {
        let mut errors = Vec::new();

        if !self.central_system_url.starts_with("ws://")
            && !self.central_system_url.starts_with("wss://")
        {
            errors.push(format!(
                "Central system URL '{}' must use ws:// or wss://",
                self.central_system_url
            ));
        }
        if self.identity.is_empty() || self.identity.len() > 36 {
            errors.push(format!(
                "Charge point identity must be 1..=36 characters (got {})",
                self.identity.len()
            ));
        }
        if self.identity.contains('/') {
            errors.push("Charge point identity must not contain '/'".to_string());
        }
        if self.call_timeout_secs > 3600 {
            errors.push(format!(
                "Call timeout ({}) must be at most 3600 seconds",
                self.call_timeout_secs
            ));
        }

        collect_errors(errors)
    }

    /// Persist to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        save_toml(self, path)
    }

    /// The per-call timeout, `None` when disabled.
    pub fn call_timeout(&self) -> Option<Duration> {
        (self.call_timeout_secs > 0).then(|| Duration::from_secs(self.call_timeout_secs))
    }

    /// The full connection URL including the identity segment.
    pub fn connection_url(&self) -> String {
        format!(
            "{}/{}",
            self.central_system_url.trim_end_matches('/'),
            self.identity
        )
    }
}

// ── File I/O helpers ───────────────────────────────────────────

fn load_or_create<T>(path: &Path) -> Result<T, String>
where
    T: Default + Serialize + for<'de> Deserialize<'de>,
{
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
        toml::from_str(&content).map_err(|e| format!("Invalid TOML in {}: {}", path.display(), e))
    } else {
        let config = T::default();
        save_toml(&config, path)?;
        Ok(config)
    }
}

fn save_toml<T: Serialize>(config: &T, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Cannot create dirs {}: {}", parent.display(), e))?;
    }
    let content =
        toml::to_string_pretty(config).map_err(|e| format!("Serialization error: {}", e))?;
    std::fs::write(path, content).map_err(|e| format!("Cannot write {}: {}", path.display(), e))
}

fn collect_errors(errors: Vec<String>) -> Result<(), String> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(format!(
            "Configuration validation failed:\n  - {}",
            errors.join("\n  - ")
        ))
    }
}

// ── Tests ──────────────────────────────────────────────────────
