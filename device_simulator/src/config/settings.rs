use crate::config::endpoint::Endpoint;
use crate::device::structures::SensorRange;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use tokio::time::Duration;

pub const DEFAULT_ENDPOINT_URL: &str = "opc.tcp://0.0.0.0:4840/freeopcua/server/";
pub const DEFAULT_SERVER_NAME: &str = "Dummy OPC UA Server";
pub const DEFAULT_NAMESPACE_URI: &str = "http://forgeio/dummy/";

/// OPC UA endpoint, naming and namespace.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerSettings {
    pub endpoint_url: String, // e.g. "opc.tcp://0.0.0.0:4840/freeopcua/server/"
    pub server_name: String,  // Cosmetic, shown to clients
    pub namespace_uri: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            endpoint_url: DEFAULT_ENDPOINT_URL.to_string(),
            server_name: DEFAULT_SERVER_NAME.to_string(),
            namespace_uri: DEFAULT_NAMESPACE_URI.to_string(),
        }
    }
}

/// Device loop parameters.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SimulationSettings {
    pub tick_interval_ms: u64,
    pub temperature: SensorRange,
    pub pressure: SensorRange,
    pub counter_initial: i32,
}

impl SimulationSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        SimulationSettings {
            tick_interval_ms: 1000,
            temperature: SensorRange::temperature(),
            pressure: SensorRange::pressure(),
            counter_initial: 0,
        }
    }
}

/// Read-only HTTP status API.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ApiSettings {
    pub enabled: bool,
    pub bind_address: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            enabled: false,
            bind_address: "127.0.0.1:3000".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)] // Clone needed for passing around
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub simulation: SimulationSettings,
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            server: ServerSettings::default(),
            simulation: SimulationSettings::default(),
            api: ApiSettings::default(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Defaults, overlaid with the TOML file at `config_path` (if it exists),
    /// overlaid with `SIMULATOR_*` environment variables.
    pub fn load(config_path: &Path) -> Result<Self, ConfigError> {
        let defaults = Config::try_from(&Settings::default())?;
        let s = Config::builder()
            .add_source(defaults)
            .add_source(File::from(config_path).required(false))
            .add_source(
                Environment::with_prefix("SIMULATOR")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = s.try_deserialize()?;
        settings.validate().map_err(ConfigError::Message)?;
        Ok(settings)
    }

    pub fn save(&self, config_path: &Path) -> io::Result<()> {
        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        fs::write(config_path, toml_string)
    }

    pub fn endpoint(&self) -> Result<Endpoint, String> {
        Endpoint::parse(&self.server.endpoint_url)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.endpoint()?;
        if self.server.namespace_uri.trim().is_empty() {
            return Err("Namespace URI must not be empty".to_string());
        }
        if self.simulation.tick_interval_ms == 0 {
            return Err("Tick interval must be greater than zero".to_string());
        }
        self.simulation.temperature.validate("Temperature")?;
        self.simulation.pressure.validate("Pressure")?;
        Ok(())
    }
}
