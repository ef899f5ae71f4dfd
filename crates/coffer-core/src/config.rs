//! Environment-derived configuration for the walkthroughs.
//!
//! One immutable `Config` is built at startup and passed down explicitly;
//! nothing reads the environment after that.

use std::time::Duration;

use thiserror::Error;

use crate::poll::PollSettings;

/// Placement label for created vaults.
pub const ENV_LOCATION: &str = "COFFER_LOCATION";
/// Group label; cleanup only touches vaults in this group.
pub const ENV_GROUP: &str = "COFFER_GROUP";
/// Simulated visibility lag of the in-memory service, in milliseconds.
pub const ENV_PROPAGATION_LAG_MS: &str = "COFFER_PROPAGATION_LAG_MS";
/// Probe attempts per polling loop.
pub const ENV_POLL_ATTEMPTS: &str = "COFFER_POLL_ATTEMPTS";
/// Delay between probe attempts, in milliseconds.
pub const ENV_POLL_DELAY_MS: &str = "COFFER_POLL_DELAY_MS";

/// Environment variables that were set but unusable, reported together so
/// one run surfaces every mistake.
#[derive(Debug, Error)]
#[error("invalid environment configuration: {}", .variables.join(", "))]
pub struct ConfigError {
    pub variables: Vec<String>,
}

/// Immutable settings shared by the walkthrough flows.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub location: String,
    pub group: String,
    /// How long delete and recover transitions stay invisible to reads.
    pub propagation_lag: Duration,
    /// Budget and delay handed to every polling loop.
    pub poll: PollSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            location: "local".to_string(),
            group: "coffer-samples".to_string(),
            propagation_lag: Duration::from_millis(150),
            poll: PollSettings::default(),
        }
    }
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through a lookup function.
    ///
    /// Unset variables fall back to defaults. Variables that are set but
    /// empty or unparsable are collected and reported in one error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();
        let mut invalid = Vec::new();

        let location = match lookup(ENV_LOCATION) {
            Some(value) if !value.trim().is_empty() => value,
            Some(_) => {
                invalid.push(ENV_LOCATION.to_string());
                defaults.location
            }
            None => defaults.location,
        };

        let group = match lookup(ENV_GROUP) {
            Some(value) if !value.trim().is_empty() => value,
            Some(_) => {
                invalid.push(ENV_GROUP.to_string());
                defaults.group
            }
            None => defaults.group,
        };

        let propagation_lag = parse_millis(
            lookup(ENV_PROPAGATION_LAG_MS),
            ENV_PROPAGATION_LAG_MS,
            defaults.propagation_lag,
            &mut invalid,
        );

        let max_attempts = match lookup(ENV_POLL_ATTEMPTS) {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(value) => value,
                Err(_) => {
                    invalid.push(ENV_POLL_ATTEMPTS.to_string());
                    defaults.poll.max_attempts
                }
            },
            None => defaults.poll.max_attempts,
        };

        let retry_delay = parse_millis(
            lookup(ENV_POLL_DELAY_MS),
            ENV_POLL_DELAY_MS,
            defaults.poll.retry_delay,
            &mut invalid,
        );

        if !invalid.is_empty() {
            return Err(ConfigError { variables: invalid });
        }

        Ok(Config {
            location,
            group,
            propagation_lag,
            poll: PollSettings::new(max_attempts, retry_delay),
        })
    }
}

fn parse_millis(
    raw: Option<String>,
    variable: &str,
    fallback: Duration,
    invalid: &mut Vec<String>,
) -> Duration {
    match raw {
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                invalid.push(variable.to_string());
                fallback
            }
        },
        None => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_empty_environment_yields_defaults() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.location, "local");
        assert_eq!(config.group, "coffer-samples");
        assert_eq!(config.poll.max_attempts, 15);
    }

    #[test]
    fn test_set_variables_override_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            (ENV_LOCATION, "eastus"),
            (ENV_GROUP, "team-vaults"),
            (ENV_PROPAGATION_LAG_MS, "0"),
            (ENV_POLL_ATTEMPTS, "4"),
            (ENV_POLL_DELAY_MS, "250"),
        ]))
        .unwrap();

        assert_eq!(config.location, "eastus");
        assert_eq!(config.group, "team-vaults");
        assert_eq!(config.propagation_lag, Duration::ZERO);
        assert_eq!(config.poll, PollSettings::new(4, Duration::from_millis(250)));
    }

    #[test]
    fn test_every_invalid_variable_is_reported() {
        let err = Config::from_lookup(lookup_from(&[
            (ENV_LOCATION, "  "),
            (ENV_PROPAGATION_LAG_MS, "fast"),
            (ENV_POLL_ATTEMPTS, "-3"),
        ]))
        .unwrap_err();

        assert_eq!(
            err.variables,
            vec![ENV_LOCATION, ENV_PROPAGATION_LAG_MS, ENV_POLL_ATTEMPTS]
        );
        let message = err.to_string();
        assert!(message.contains(ENV_LOCATION));
        assert!(message.contains(ENV_POLL_ATTEMPTS));
    }
}
