use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::error::N6700Error;
use crate::n6700::modules::{ModuleSpec, ModuleTable};
use crate::n6700::transport::{ConnectionConfig, DEFAULT_SCPI_PORT};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    pub connection: ConnectionSettings,
    pub logging: LoggingConfig,
    /// Extra module models, merged over the built-in table.
    #[serde(default)]
    pub modules: HashMap<String, ModuleSpec>,
    pub simulation: SimulationConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub write_timeout_ms: u64,
    pub simulate: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SimulationConfig {
    /// Module model assumed in each channel, in channel order.
    pub modules: Vec<String>,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        let timeouts = ConnectionConfig::default();
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_SCPI_PORT,
            connect_timeout_ms: timeouts.connect_timeout.as_millis() as u64,
            read_timeout_ms: timeouts.read_timeout.as_millis() as u64,
            write_timeout_ms: timeouts.write_timeout.as_millis() as u64,
            simulate: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            modules: vec!["N6752A".to_string(); 4],
        }
    }
}

impl AppConfig {
    /// Built-in module table with the configured `[modules]` merged in.
    pub fn module_table(&self) -> ModuleTable {
        let mut table = ModuleTable::builtin();
        table.extend(self.modules.clone());
        table
    }

    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            connect_timeout: Duration::from_millis(self.connection.connect_timeout_ms),
            read_timeout: Duration::from_millis(self.connection.read_timeout_ms),
            write_timeout: Duration::from_millis(self.connection.write_timeout_ms),
        }
    }

    /// Module limits for a simulated mainframe, one entry per channel.
    pub fn simulated_specs(&self, table: &ModuleTable) -> Result<Vec<ModuleSpec>, N6700Error> {
        self.simulation
            .modules
            .iter()
            .enumerate()
            .map(|(channel, model)| table.resolve(channel, model))
            .collect()
    }
}

/// Load configuration from file with layered fallbacks
pub fn load_config(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder().add_source(Config::try_from(&AppConfig::default())?);

    if let Some(path) = config_path {
        if path.exists() {
            builder = builder.add_source(File::from(path));
        } else {
            return Err(ConfigError::Message(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
    } else {
        let possible_paths = ["n6700.toml", "config/n6700.toml"];

        for path in &possible_paths {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
                break;
            }
        }
    }

    // Environment overrides, e.g. N6700__CONNECTION__HOST=10.0.0.5
    builder = builder.add_source(
        Environment::with_prefix("N6700")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize::<AppConfig>()
}

/// Load configuration, falling back to defaults on any error
pub fn load_config_or_default(config_path: Option<&Path>) -> AppConfig {
    match load_config(config_path) {
        Ok(config) => {
            log::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            log::warn!("Failed to load config ({}), using defaults", e);
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("n6700-{}-{name}.toml", std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn defaults_describe_a_local_simulated_mainframe() {
        let config = AppConfig::default();
        assert_eq!(config.connection.port, 5025);
        assert_eq!(config.connection.read_timeout_ms, 10_000);
        assert_eq!(config.simulation.modules.len(), 4);
        let specs = config.simulated_specs(&config.module_table()).unwrap();
        assert!(specs.iter().all(|spec| spec.current_max == 10.2));
    }

    #[test]
    fn file_overrides_defaults() {
        let path = write_temp(
            "override",
            r#"
[connection]
host = "192.168.1.108"
read_timeout_ms = 2500
simulate = true

[logging]
level = "debug"

[modules.N6731B]
voltage_max = 5.1
current_max = 10.2
ovp_max = 7.5
ocp_max = 10.2

[simulation]
modules = ["N6731B", "N6752A"]
"#,
        );
        let config = load_config(Some(&path)).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(config.connection.host, "192.168.1.108");
        assert_eq!(config.connection.port, 5025);
        assert!(config.connection.simulate);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            config.connection_config().read_timeout,
            Duration::from_millis(2500)
        );

        let table = config.module_table();
        assert_eq!(table.get("n6731b").unwrap().voltage_max, 5.1);
        let specs = config.simulated_specs(&table).unwrap();
        assert_eq!(specs[0].ovp_max, 7.5);
        assert_eq!(specs[1].voltage_max, 51.0);
    }

    #[test]
    fn unknown_simulated_model_is_reported() {
        let mut config = AppConfig::default();
        config.simulation.modules = vec!["N6752A".to_string(), "N9999Z".to_string()];
        let err = config.simulated_specs(&config.module_table()).unwrap_err();
        assert!(matches!(err, N6700Error::UnknownModule { channel: 1, .. }));
    }

    #[test]
    fn missing_file_is_an_error_but_fallback_is_not() {
        let path = Path::new("/nonexistent/n6700.toml");
        assert!(load_config(Some(path)).is_err());
        assert_eq!(load_config_or_default(Some(path)).connection.port, 5025);
    }
}
