//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for logging and metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Relay role (producer, consumer, relay)
    pub role: String,

    /// Log level filter (trace, debug, info, warn, error)
    pub log_level: String,

    /// Whether to write logs to the console at all
    pub console_output: bool,

    /// Whether to enable JSON formatted logs
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "message-relay".to_string(),
            role: "relay".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `RELAY_SERVICE_NAME`: Service name (default: message-relay)
    /// - `RELAY_ROLE`: Role label (default: relay)
    /// - `RELAY_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `RELAY_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `RELAY_JSON_LOGS`: Enable JSON logs (default: false, true in containers)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let in_container =
            lookup("KUBERNETES_SERVICE_HOST").is_some() || lookup("DOCKER_CONTAINER").is_some();

        Self {
            service_name: lookup("RELAY_SERVICE_NAME").unwrap_or(defaults.service_name),
            role: lookup("RELAY_ROLE").unwrap_or(defaults.role),
            log_level: lookup("RELAY_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_level),
            console_output: lookup("RELAY_CONSOLE_OUTPUT")
                .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "false" | "0"))
                .unwrap_or(defaults.console_output),
            json_logs: lookup("RELAY_JSON_LOGS")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1"))
                .unwrap_or(in_container),
        }
    }

    /// Service name with the role appended, unless the role is the combined relay.
    pub fn full_service_name(&self) -> String {
        if self.role == "relay" {
            self.service_name.clone()
        } else {
            format!("{}-{}", self.service_name, self.role)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        assert_eq!(TelemetryConfig::from_lookup(lookup(&[])), TelemetryConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = TelemetryConfig::from_lookup(lookup(&[
            ("RELAY_ROLE", "consumer"),
            ("RUST_LOG", "debug"),
            ("RELAY_CONSOLE_OUTPUT", "0"),
            ("RELAY_JSON_LOGS", "TRUE"),
        ]));
        assert_eq!(config.role, "consumer");
        assert_eq!(config.log_level, "debug");
        assert!(!config.console_output);
        assert!(config.json_logs);
    }

    #[test]
    fn test_relay_log_level_wins_over_rust_log() {
        let config = TelemetryConfig::from_lookup(lookup(&[
            ("RELAY_LOG_LEVEL", "warn"),
            ("RUST_LOG", "trace"),
        ]));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_json_logs_default_in_container() {
        let config = TelemetryConfig::from_lookup(lookup(&[("KUBERNETES_SERVICE_HOST", "10.0.0.1")]));
        assert!(config.json_logs);
    }

    #[test]
    fn test_full_service_name() {
        let mut config = TelemetryConfig::default();
        assert_eq!(config.full_service_name(), "message-relay");

        config.role = "producer".to_string();
        assert_eq!(config.full_service_name(), "message-relay-producer");
    }
}
