//! Server configuration from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `LOCKGATE_PORT` | `3000` |
//! | `LOCKGATE_TTL_SECS` | `10` (at most one day) |
//! | `LOCKGATE_MAX_ATTEMPTS` | `32` |
//! | `LOCKGATE_BACKOFF` | `fixed` (or `exponential`) |
//! | `LOCKGATE_BACKOFF_MS` | `50` |
//! | `LOCKGATE_BACKOFF_MAX_MS` | `1000` |
//! | `LOCKGATE_ATTEMPT_TIMEOUT_MS` | `1000` |
//! | `LOCKGATE_SWEEP_SECS` | `60` |

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use lockgate_core::{AdapterConfig, Backoff, ConfigError, LeaseOptions};

/// Everything the binary needs to wire the gate and serve it.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub lease: LeaseOptions,
    pub adapter: AdapterConfig,
    pub sweep_interval: Duration,
}

impl ServerConfig {
    /// Reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`, falling back to defaults for unset names.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = setting(&lookup, "LOCKGATE_PORT", 3000u16)?;
        let ttl_secs = setting(&lookup, "LOCKGATE_TTL_SECS", 10u64)?;
        let max_attempts = setting(&lookup, "LOCKGATE_MAX_ATTEMPTS", 32u32)?;
        let backoff_ms = setting(&lookup, "LOCKGATE_BACKOFF_MS", 50u64)?;
        let backoff_max_ms = setting(&lookup, "LOCKGATE_BACKOFF_MAX_MS", 1000u64)?;
        let attempt_timeout_ms = setting(&lookup, "LOCKGATE_ATTEMPT_TIMEOUT_MS", 1000u64)?;
        let sweep_secs = setting(&lookup, "LOCKGATE_SWEEP_SECS", 60u64)?;

        let backoff = match lookup("LOCKGATE_BACKOFF").as_deref().map(str::trim) {
            None | Some("") | Some("fixed") => Backoff::fixed(Duration::from_millis(backoff_ms)),
            Some("exponential") => Backoff::exponential(
                Duration::from_millis(backoff_ms),
                Duration::from_millis(backoff_max_ms),
            ),
            Some(other) => {
                return Err(ConfigError::InvalidSetting {
                    name: "LOCKGATE_BACKOFF".to_string(),
                    reason: format!("expected 'fixed' or 'exponential', got '{other}'"),
                })
            }
        };

        if attempt_timeout_ms == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "LOCKGATE_ATTEMPT_TIMEOUT_MS".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if sweep_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "LOCKGATE_SWEEP_SECS".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(ServerConfig {
            port,
            lease: LeaseOptions::new(Duration::from_secs(ttl_secs), max_attempts)?,
            adapter: AdapterConfig {
                backoff,
                attempt_timeout: Duration::from_millis(attempt_timeout_ms),
            },
            sweep_interval: Duration::from_secs(sweep_secs),
        })
    }
}

fn setting<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|err: T::Err| ConfigError::InvalidSetting {
            name: name.to_string(),
            reason: format!("'{raw}': {err}"),
        }),
    }
}
