//! Settings for the calibration client CLI.
//! Persisted in the platform-specific config directory via `directories::ProjectDirs`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::client::{ClientOptions, ServiceNames, DEFAULT_POLL_INTERVAL_MS};
use crate::transport::{HttpTransportConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};

/// Client settings that can be saved and loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Base URL of the calibration service
    pub base_url: String,
    /// Timeout for a single service call in seconds (0 disables the timeout)
    pub request_timeout_secs: u64,
    /// Wait for the services to come up before the first call
    pub wait_for_services: bool,
    /// Maximum wait for the services in seconds (0 waits indefinitely)
    pub wait_timeout_secs: u64,
    /// Store the calibration on the camera after finalizing
    pub store_calibration: bool,
    /// Namespace prepended to every service name
    pub namespace: String,
    /// Service names. Names missing from the file keep their
    /// [`ServiceNames::full`] value; `null` unwires an optional service.
    #[serde(deserialize_with = "services_over_full")]
    pub services: ServiceNames,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            wait_for_services: false,
            wait_timeout_secs: 0,
            store_calibration: true,
            namespace: String::new(),
            services: ServiceNames::full(),
        }
    }
}

/// Deserialize service names as overrides on top of [`ServiceNames::full`].
fn services_over_full<'de, D>(deserializer: D) -> Result<ServiceNames, D::Error>
where
    D: Deserializer<'de>,
{
    let overrides = Map::<String, Value>::deserialize(deserializer)?;
    let mut merged = match serde_json::to_value(ServiceNames::full()) {
        Ok(Value::Object(names)) => names,
        _ => Map::new(),
    };
    merged.extend(overrides);
    serde_json::from_value(Value::Object(merged)).map_err(serde::de::Error::custom)
}

/// Parse a boolean the way the environment usually spells it.
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl ClientSettings {
    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "moderras", "calibration-client")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the settings file path.
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("settings.json"))
    }

    /// Load settings from the config file, falling back to defaults.
    pub fn load() -> Self {
        Self::settings_path()
            .and_then(|path| fs::read_to_string(&path).ok())
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    /// Save settings to the config file.
    pub fn save(&self) -> Result<PathBuf, String> {
        let dir = Self::config_dir().ok_or("Cannot determine config directory")?;

        // Create config directory if it doesn't exist
        fs::create_dir_all(&dir)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;

        let path = dir.join("settings.json");
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        fs::write(&path, content)
            .map_err(|e| format!("Failed to write settings file: {}", e))?;

        Ok(path)
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, which maps variable names to values.
    ///
    /// Recognized variables: `CALIBRATION_BASE_URL`, `CALIBRATION_TIMEOUT_SECS`,
    /// `CALIBRATION_WAIT_FOR_SERVICES`, `CALIBRATION_WAIT_TIMEOUT_SECS`,
    /// `CALIBRATION_STORE` and `CALIBRATION_NAMESPACE`. Unparseable values are
    /// ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("CALIBRATION_BASE_URL") {
            self.base_url = url;
        }
        if let Some(secs) = lookup("CALIBRATION_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            self.request_timeout_secs = secs;
        }
        if let Some(wait) = lookup("CALIBRATION_WAIT_FOR_SERVICES").and_then(|s| parse_flag(&s)) {
            self.wait_for_services = wait;
        }
        if let Some(secs) = lookup("CALIBRATION_WAIT_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            self.wait_timeout_secs = secs;
        }
        if let Some(store) = lookup("CALIBRATION_STORE").and_then(|s| parse_flag(&s)) {
            self.store_calibration = store;
        }
        if let Some(namespace) = lookup("CALIBRATION_NAMESPACE") {
            self.namespace = namespace;
        }
        self
    }

    /// Transport configuration derived from these settings.
    pub fn http_config(&self) -> HttpTransportConfig {
        HttpTransportConfig::default()
            .with_base_url(&self.base_url)
            .with_timeout(self.request_timeout_secs)
    }

    /// Client options derived from these settings.
    pub fn client_options(&self) -> ClientOptions {
        let mut options = ClientOptions::default()
            .with_wait_for_services(self.wait_for_services)
            .with_store_calibration(self.store_calibration)
            .with_poll_interval(Duration::from_millis(DEFAULT_POLL_INTERVAL_MS));
        if self.wait_timeout_secs > 0 {
            options = options.with_wait_timeout(Duration::from_secs(self.wait_timeout_secs));
        }
        options
    }

    /// Service names with the namespace applied.
    pub fn service_names(&self) -> ServiceNames {
        self.services.clone().in_namespace(&self.namespace)
    }
}
