use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::Path;

use crate::error::{Error, Result};

/// Default number of concurrent packet workers.
const DEFAULT_WORKERS: usize = 4;

/// Default number of receive buffers allocated at startup.
const DEFAULT_BUFFER_PREWARM: usize = 8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address the server socket binds to.
    pub bind_address: Ipv4Addr,
    /// UDP port the server socket binds to (67 for DHCP).
    pub port: u16,
    /// Number of concurrent packet workers. Must be at least 1.
    pub workers: usize,
    /// Job-queue capacity override. Defaults to twice the worker count,
    /// enough to absorb short bursts without unbounded growth.
    pub queue_capacity: Option<usize>,
    /// Receive buffers allocated at startup.
    pub buffer_prewarm: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: Ipv4Addr::UNSPECIFIED,
            port: 67,
            workers: DEFAULT_WORKERS,
            queue_capacity: None,
            buffer_prewarm: DEFAULT_BUFFER_PREWARM,
        }
    }
}

impl Config {
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save(path)?;
            Ok(config)
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::InvalidConfig(
                "workers must be at least 1".to_string(),
            ));
        }

        if self.queue_capacity == Some(0) {
            return Err(Error::InvalidConfig(
                "queue_capacity must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// The job-queue capacity in effect: the override, or twice the
    /// worker count.
    pub fn effective_queue_capacity(&self) -> usize {
        self.queue_capacity.unwrap_or(self.workers * 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.port, 67);
    }

    #[test]
    fn zero_workers_rejected() {
        let config = Config {
            workers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_queue_capacity_rejected() {
        let config = Config {
            queue_capacity: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn queue_capacity_defaults_to_twice_workers() {
        let config = Config {
            workers: 3,
            ..Default::default()
        };
        assert_eq!(config.effective_queue_capacity(), 6);

        let config = Config {
            workers: 3,
            queue_capacity: Some(100),
            ..Default::default()
        };
        assert_eq!(config.effective_queue_capacity(), 100);
    }

    #[test]
    fn roundtrips_through_json() {
        let config = Config {
            bind_address: Ipv4Addr::new(10, 0, 0, 1),
            port: 6767,
            workers: 2,
            queue_capacity: Some(16),
            buffer_prewarm: 4,
        };

        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.bind_address, config.bind_address);
        assert_eq!(parsed.port, config.port);
        assert_eq!(parsed.workers, config.workers);
        assert_eq!(parsed.queue_capacity, config.queue_capacity);
        assert_eq!(parsed.buffer_prewarm, config.buffer_prewarm);
    }
}
