//! # Relay Configuration
//!
//! Everything the runtime needs, with defaults matching a local single-broker
//! setup. Values are fixed at startup and shared read-only afterwards.
//!
//! ## Environment Overrides
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RELAY_BOOTSTRAP_SERVERS` | `localhost:9092` | Broker address list |
//! | `RELAY_TOPIC` | `tweets` | Topic published to and consumed from |
//! | `RELAY_GROUP_ID` | `sample-group` | Consumer group |
//! | `RELAY_CLIENT_ID` | `sample-consumer` | Consumer client id |
//! | `RELAY_DELIMITER` | `01` | Field delimiter as a hex code point |
//! | `RELAY_EMPTINESS_POLICY` | `reject-empty` | `reject-empty` or `allow-empty` |
//! | `RELAY_TRACK` | built-in terms | Comma separated track terms |
//! | `RELAY_SINK_PATH` | unset (in-memory) | JSON lines file for saved records |

use relay_bus::{validate_topic, DEFAULT_CHANNEL_CAPACITY, DEFAULT_MAX_PAYLOAD_BYTES};
use relay_core::{ConfigError, Delimiter, EmptinessPolicy, DEFAULT_TRACK_TERMS};
use std::path::PathBuf;

/// Complete relay configuration.
#[derive(Debug, Clone, Default)]
pub struct RelayConfig {
    pub broker: BrokerConfig,
    pub wire: WireConfig,
    pub validation: ValidationConfig,
    pub source: SourceConfig,
    pub sink: SinkConfig,
}

/// Broker connection and limits.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub bootstrap_servers: String,
    pub topic: String,
    pub group_id: String,
    pub client_id: String,
    /// Messages buffered per topic before slow consumers lag.
    pub channel_capacity: usize,
    pub max_payload_bytes: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            bootstrap_servers: "localhost:9092".to_string(),
            topic: "tweets".to_string(),
            group_id: "sample-group".to_string(),
            client_id: "sample-consumer".to_string(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WireConfig {
    pub delimiter: Delimiter,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationConfig {
    pub policy: EmptinessPolicy,
}

/// Upstream stream settings.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Track terms. Empty forwards every status.
    pub track: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            track: DEFAULT_TRACK_TERMS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Document store settings.
#[derive(Debug, Clone, Default)]
pub struct SinkConfig {
    /// JSON lines file. `None` keeps records in memory.
    pub path: Option<PathBuf>,
}

impl RelayConfig {
    /// Defaults overridden by `RELAY_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `RELAY_*` key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(servers) = lookup("RELAY_BOOTSTRAP_SERVERS") {
            config.broker.bootstrap_servers = servers;
        }
        if let Some(topic) = lookup("RELAY_TOPIC") {
            config.broker.topic = topic;
        }
        if let Some(group) = lookup("RELAY_GROUP_ID") {
            config.broker.group_id = group;
        }
        if let Some(client) = lookup("RELAY_CLIENT_ID") {
            config.broker.client_id = client;
        }
        if let Some(delimiter) = lookup("RELAY_DELIMITER") {
            config.wire.delimiter = Delimiter::from_hex(&delimiter)?;
        }
        if let Some(policy) = lookup("RELAY_EMPTINESS_POLICY") {
            config.validation.policy = policy.parse()?;
        }
        if let Some(track) = lookup("RELAY_TRACK") {
            config.source.track = track
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(path) = lookup("RELAY_SINK_PATH") {
            if !path.trim().is_empty() {
                config.sink.path = Some(PathBuf::from(path));
            }
        }

        Ok(config)
    }

    /// Check values that cannot be caught while parsing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broker.topic.trim().is_empty() {
            return Err(ConfigError::EmptyTopic);
        }
        validate_topic(&self.broker.topic).map_err(|_| ConfigError::InvalidValue {
            key: "topic".to_string(),
            value: self.broker.topic.clone(),
        })?;
        if self.broker.channel_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "channel_capacity".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.broker.bootstrap_servers, "localhost:9092");
        assert_eq!(config.broker.group_id, "sample-group");
        assert_eq!(config.broker.client_id, "sample-consumer");
        assert_eq!(config.broker.max_payload_bytes, 1_048_576);
        assert_eq!(config.wire.delimiter.as_char(), '\u{1}');
        assert_eq!(config.validation.policy, EmptinessPolicy::RejectEmpty);
        assert_eq!(config.source.track.len(), 6);
        assert!(config.sink.path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = RelayConfig::from_lookup(lookup(&[
            ("RELAY_TOPIC", "trades"),
            ("RELAY_DELIMITER", "1f"),
            ("RELAY_EMPTINESS_POLICY", "allow-empty"),
            ("RELAY_TRACK", "#rust, #tokio ,"),
            ("RELAY_SINK_PATH", "/tmp/records.jsonl"),
        ]))
        .unwrap();

        assert_eq!(config.broker.topic, "trades");
        assert_eq!(config.wire.delimiter.as_char(), '\u{1f}');
        assert_eq!(config.validation.policy, EmptinessPolicy::AllowEmpty);
        assert_eq!(config.source.track, vec!["#rust", "#tokio"]);
        assert_eq!(config.sink.path, Some(PathBuf::from("/tmp/records.jsonl")));
    }

    #[test]
    fn test_bad_values_rejected() {
        assert_eq!(
            RelayConfig::from_lookup(lookup(&[("RELAY_DELIMITER", "7c")])).unwrap_err(),
            ConfigError::InvalidDelimiter('|')
        );
        assert!(matches!(
            RelayConfig::from_lookup(lookup(&[("RELAY_EMPTINESS_POLICY", "maybe")])),
            Err(ConfigError::UnknownPolicy(_))
        ));
    }

    #[test]
    fn test_validate_topic() {
        let mut config = RelayConfig::default();
        config.broker.topic = "  ".to_string();
        assert_eq!(config.validate(), Err(ConfigError::EmptyTopic));

        config.broker.topic = "has space".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
