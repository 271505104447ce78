//! Server configuration.
//!
//! Loads configuration from environment variables with sensible defaults.
//! The binary reads a `.env` file first (via `dotenvy`), so either source
//! works.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use ticket_pool_runtime::SupervisorSettings;

/// HTTP server configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Simulation configuration file
    pub config_path: PathBuf,
    /// Activity log file
    pub log_path: PathBuf,
    /// Frontend origin allowed by CORS
    pub cors_origin: String,
    /// Worker tick interval
    pub tick_interval: Duration,
    /// Depletion monitor poll interval
    pub monitor_interval: Duration,
    /// Deadline for draining all workers on stop
    pub shutdown_timeout: Duration,
    /// Expose Prometheus metrics at `/metrics` when set
    pub metrics_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let settings = SupervisorSettings::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            config_path: PathBuf::from("config.json"),
            log_path: PathBuf::from("logs/application.log"),
            cors_origin: "http://localhost:3000".to_string(),
            tick_interval: settings.tick_interval,
            monitor_interval: settings.monitor_interval,
            shutdown_timeout: settings.shutdown_timeout,
            metrics_enabled: true,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable                | Default                |
    /// |-------------------------|------------------------|
    /// | `HOST`                  | `0.0.0.0`              |
    /// | `PORT`                  | `8080`                 |
    /// | `CONFIG_PATH`           | `config.json`          |
    /// | `LOG_PATH`              | `logs/application.log` |
    /// | `CORS_ORIGIN`           | `http://localhost:3000`|
    /// | `TICK_INTERVAL_MS`      | `1000`                 |
    /// | `MONITOR_INTERVAL_MS`   | `1000`                 |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `10`                   |
    /// | `METRICS_ENABLED`       | `true`                 |
    ///
    /// Unparseable values fall back to the default.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|s| s.trim().parse::<u64>().ok());

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.port),
            config_path: lookup("CONFIG_PATH").map_or(defaults.config_path, PathBuf::from),
            log_path: lookup("LOG_PATH").map_or(defaults.log_path, PathBuf::from),
            cors_origin: lookup("CORS_ORIGIN").unwrap_or(defaults.cors_origin),
            tick_interval: parsed("TICK_INTERVAL_MS")
                .map_or(defaults.tick_interval, Duration::from_millis),
            monitor_interval: parsed("MONITOR_INTERVAL_MS")
                .map_or(defaults.monitor_interval, Duration::from_millis),
            shutdown_timeout: parsed("SHUTDOWN_TIMEOUT_SECS")
                .map_or(defaults.shutdown_timeout, Duration::from_secs),
            metrics_enabled: lookup("METRICS_ENABLED")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.metrics_enabled),
        }
    }

    /// Address to bind to.
    ///
    /// # Errors
    ///
    /// Returns an error if `host:port` is not a valid socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    /// Supervisor settings derived from this configuration.
    #[must_use]
    pub fn supervisor_settings(&self) -> SupervisorSettings {
        SupervisorSettings::default()
            .with_tick_interval(self.tick_interval)
            .with_monitor_interval(self.monitor_interval)
            .with_shutdown_timeout(self.shutdown_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = ServerConfig::from_lookup(|_| None);
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.cors_origin, "http://localhost:3000");
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("PORT", "9000"),
            ("TICK_INTERVAL_MS", "250"),
            ("SHUTDOWN_TIMEOUT_SECS", "3"),
            ("CONFIG_PATH", "/tmp/sim.json"),
            ("METRICS_ENABLED", "false"),
        ]));

        assert_eq!(config.port, 9000);
        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(3));
        assert_eq!(config.config_path, PathBuf::from("/tmp/sim.json"));
        assert!(!config.metrics_enabled);

        let settings = config.supervisor_settings();
        assert_eq!(settings.tick_interval, Duration::from_millis(250));
        assert_eq!(settings.depletion_confirmations, 2);
    }

    #[test]
    fn test_unparseable_values_fall_back() {
        let config = ServerConfig::from_lookup(lookup(&[("PORT", "eighty"), ("MONITOR_INTERVAL_MS", "-5")]));
        assert_eq!(config.port, 8080);
        assert_eq!(config.monitor_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_bind_addr() {
        let config = ServerConfig::from_lookup(lookup(&[("HOST", "127.0.0.1"), ("PORT", "3001")]));
        assert_eq!(config.bind_addr().map(|a| a.port()), Ok(3001));
    }
}
