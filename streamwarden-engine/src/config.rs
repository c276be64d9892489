//! Configuration for the Streamwarden engine

use std::time::Duration;

use crate::error::{EngineError, Result};

/// Environment variable: maximum admitted streams
pub const ENV_MAX_STREAMS: &str = "STREAMWARDEN_MAX_STREAMS";
/// Environment variable: global timeout in seconds
pub const ENV_TIMEOUT_SECS: &str = "STREAMWARDEN_TIMEOUT_SECS";
/// Environment variable: post-capacity grace delay in milliseconds
pub const ENV_GRACE_MS: &str = "STREAMWARDEN_GRACE_MS";
/// Environment variable: drain bound in seconds
pub const ENV_DRAIN_SECS: &str = "STREAMWARDEN_DRAIN_SECS";

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum number of streams admitted over the process lifetime
    pub max_streams: usize,

    /// Global deadline after which shutdown is signalled regardless of load
    pub global_timeout: Duration,

    /// Wait between reaching capacity and signalling shutdown, so the
    /// response for the last admitted stream can still be written
    pub capacity_grace: Duration,

    /// Upper bound on waiting for in-flight stream tasks after shutdown
    pub drain_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_streams: 5,
            global_timeout: Duration::from_secs(30 * 60),
            capacity_grace: Duration::from_millis(100),
            drain_timeout: Duration::from_secs(5),
        }
    }
}

impl EngineConfig {
    /// Create config with defaults and the given stream limit
    pub fn new(max_streams: usize) -> Self {
        Self {
            max_streams,
            ..Self::default()
        }
    }

    /// Defaults overridden by `STREAMWARDEN_*` environment variables
    ///
    /// Unset variables keep their defaults; unparsable ones are an error.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(max) = env_parse::<usize>(ENV_MAX_STREAMS)? {
            cfg.max_streams = max;
        }
        if let Some(secs) = env_parse::<u64>(ENV_TIMEOUT_SECS)? {
            cfg.global_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = env_parse::<u64>(ENV_GRACE_MS)? {
            cfg.capacity_grace = Duration::from_millis(ms);
        }
        if let Some(secs) = env_parse::<u64>(ENV_DRAIN_SECS)? {
            cfg.drain_timeout = Duration::from_secs(secs);
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Override the stream limit
    pub fn with_max_streams(mut self, max_streams: usize) -> Self {
        self.max_streams = max_streams;
        self
    }

    /// Override the global timeout
    pub fn with_global_timeout(mut self, timeout: Duration) -> Self {
        self.global_timeout = timeout;
        self
    }

    /// Override the post-capacity grace delay
    pub fn with_capacity_grace(mut self, grace: Duration) -> Self {
        self.capacity_grace = grace;
        self
    }

    /// Override the drain bound
    pub fn with_drain_timeout(mut self, drain: Duration) -> Self {
        self.drain_timeout = drain;
        self
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_streams == 0 {
            return Err(EngineError::Config(
                "max_streams must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| EngineError::Config(format!("{key}={raw:?}: {e}"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.max_streams, 5);
        assert_eq!(cfg.global_timeout, Duration::from_secs(1800));
        assert_eq!(cfg.capacity_grace, Duration::from_millis(100));
        assert_eq!(cfg.drain_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_builder_pattern() {
        let cfg = EngineConfig::new(10)
            .with_global_timeout(Duration::from_secs(60))
            .with_capacity_grace(Duration::from_millis(5))
            .with_drain_timeout(Duration::from_secs(1));

        assert_eq!(cfg.max_streams, 10);
        assert_eq!(cfg.global_timeout, Duration::from_secs(60));
        assert_eq!(cfg.capacity_grace, Duration::from_millis(5));
        assert_eq!(cfg.drain_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_zero_streams_rejected() {
        let err = EngineConfig::new(0).validate().unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn test_env_parse_missing_key() {
        let v: Option<u64> = env_parse("STREAMWARDEN_TEST_UNSET_KEY_7f3a").unwrap();
        assert!(v.is_none());
    }
}
