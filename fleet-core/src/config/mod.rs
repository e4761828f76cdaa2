use crate::error::ConfigError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// A pause in whole seconds: either fixed (`5`) or drawn from `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Pause {
    Fixed(u64),
    Range(u64, u64),
}

impl Default for Pause {
    fn default() -> Self {
        Pause::Fixed(0)
    }
}

impl Pause {
    /// Draws one pause; range bounds are inclusive.
    pub fn sample(&self) -> Duration {
        let secs = match *self {
            Pause::Fixed(secs) => secs,
            Pause::Range(min, max) if min >= max => min,
            Pause::Range(min, max) => rand::thread_rng().gen_range(min..=max),
        };
        Duration::from_secs(secs)
    }

    fn validate(&self, field: &str) -> Result<(), ConfigError> {
        match *self {
            Pause::Range(min, max) if min > max => Err(ConfigError::InvalidValue {
                field: field.to_string(),
                reason: format!("range minimum {} is above maximum {}", min, max),
            }),
            _ => Ok(()),
        }
    }
}

/// Upper bound for any single retry delay: one day.
pub const MAX_RETRY_DELAY_SECS: u64 = 86_400;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Extra attempts after the first one.
    pub retries: u32,
    pub delay_secs: f64,
    pub backoff: f64,
    pub attempt_timeout_secs: u64,
    pub max_delay_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            retries: 3,
            delay_secs: 1.0,
            backoff: 2.0,
            attempt_timeout_secs: 60,
            max_delay_secs: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetConfig {
    #[serde(default = "default_max_parallel_accounts")]
    pub max_parallel_accounts: usize,
    #[serde(default)]
    pub pause_between_wallets: Pause,
    #[serde(default)]
    pub pause_between_modules: Pause,
    #[serde(default)]
    pub shuffle_wallets: bool,
    #[serde(default)]
    pub retry: RetrySettings,
}

fn default_max_parallel_accounts() -> usize {
    1
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            max_parallel_accounts: default_max_parallel_accounts(),
            pause_between_wallets: Pause::default(),
            pause_between_modules: Pause::default(),
            shuffle_wallets: false,
            retry: RetrySettings::default(),
        }
    }
}

impl FleetConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_parallel_accounts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_parallel_accounts".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        self.pause_between_wallets
            .validate("pause_between_wallets")?;
        self.pause_between_modules
            .validate("pause_between_modules")?;

        let retry = &self.retry;
        if !(retry.delay_secs >= 0.0 && retry.delay_secs <= MAX_RETRY_DELAY_SECS as f64) {
            return Err(ConfigError::InvalidValue {
                field: "retry.delay_secs".to_string(),
                reason: format!(
                    "must be between 0 and {}, got {}",
                    MAX_RETRY_DELAY_SECS, retry.delay_secs
                ),
            });
        }
        if !(retry.backoff >= 1.0 && retry.backoff.is_finite()) {
            return Err(ConfigError::InvalidValue {
                field: "retry.backoff".to_string(),
                reason: format!("must be a finite number of at least 1.0, got {}", retry.backoff),
            });
        }
        if retry.max_delay_secs > MAX_RETRY_DELAY_SECS {
            return Err(ConfigError::InvalidValue {
                field: "retry.max_delay_secs".to_string(),
                reason: format!(
                    "must be at most {}, got {}",
                    MAX_RETRY_DELAY_SECS, retry.max_delay_secs
                ),
            });
        }
        if retry.attempt_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry.attempt_timeout_secs".to_string(),
                reason: "every attempt needs an upper bound".to_string(),
            });
        }
        Ok(())
    }
}
