//! Runtime configuration.

use std::{fs::File, io::BufReader, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

/// Configuration for the event runtime.
///
/// `invocation_timeout` bounds one whole invocation, including option-block
/// waits. It is off by default because option timers are routinely hours
/// long; hosts running untrusted programs should set it.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RuntimeConfig {
    #[serde(default, with = "opt_duration_ms")]
    pub invocation_timeout: Option<Duration>,
}

impl RuntimeConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        serde_json::from_reader(reader).map_err(std::io::Error::other)
    }
}

mod opt_duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&(duration.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        let millis: Option<u64> = Option::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_default_has_no_timeout() {
        assert_eq!(RuntimeConfig::default().invocation_timeout, None);
    }

    #[test]
    fn test_round_trip_ms() {
        let config = RuntimeConfig {
            invocation_timeout: Some(Duration::from_millis(2500)),
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(json, r#"{"invocation_timeout":2500}"#);
        let back: RuntimeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_missing_field_defaults() {
        let config: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }
}
