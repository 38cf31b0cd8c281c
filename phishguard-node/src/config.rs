use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Main configuration for the detector node
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Classifier artifact configuration
    pub model: ModelConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Metrics and monitoring
    pub metrics: MetricsConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the page is served on
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8501".to_string(),
        }
    }
}

/// Classifier artifact configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path of the serialized random forest, relative to the working directory
    pub artifact_path: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            artifact_path: "random_forest_model.json".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, text)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable the Prometheus exporter
    pub enabled: bool,
    /// Metrics server address
    pub listen_addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1:9092".to_string(),
        }
    }
}

impl DetectorConfig {
    /// Load configuration from file, with `PHISHGUARD__SECTION__KEY` overrides
    pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(
                config::Environment::with_prefix("PHISHGUARD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Save configuration to file
    #[allow(dead_code)]
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }

    /// Parsed server listen address
    pub fn listen_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.server.listen_addr.parse()
    }

    /// Parsed metrics listen address
    pub fn metrics_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.metrics.listen_addr.parse()
    }

    pub fn json_logs(&self) -> bool {
        self.logging.format == "json"
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        let listen_addr = self
            .listen_addr()
            .map_err(|e| format!("Invalid server listen address '{}': {}", self.server.listen_addr, e))?;

        if self.model.artifact_path.trim().is_empty() {
            return Err("Model artifact path cannot be empty".to_string());
        }

        match self.logging.format.as_str() {
            "text" | "json" => {}
            other => return Err(format!("Unknown log format '{other}', expected text or json")),
        }

        if self.metrics.enabled {
            let metrics_addr = self.metrics_addr().map_err(|e| {
                format!("Invalid metrics listen address '{}': {}", self.metrics.listen_addr, e)
            })?;
            if metrics_addr == listen_addr {
                return Err("Metrics server cannot share the page server's address".to_string());
            }
        }

        Ok(())
    }
}
