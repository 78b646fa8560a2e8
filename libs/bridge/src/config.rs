//! Connection configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for a [`crate::Connection`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// How long a method call waits for its reply before giving up with
    /// [`crate::CallError::ReplyTimeout`].
    #[serde(with = "duration_ms")]
    pub reply_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            // matches the reference bus default of 25 seconds
            reply_timeout: Duration::from_secs(25),
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        (d.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_reply_timeout_is_25s() {
        assert_eq!(
            ConnectionConfig::default().reply_timeout,
            Duration::from_secs(25)
        );
    }
}
