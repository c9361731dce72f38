//! Process configuration loaded from environment variables.

use crate::reconcile_helpers::WaitPolicy;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:4566";
pub const DEFAULT_REGION: &str = "us-east-1";

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required variable not set
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    /// Variable set to something unusable
    #[error("Invalid value {value:?} for {name}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Deployer configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub gateway_url: String,
    pub gateway_token: String,
    pub region: String,
    pub wait: WaitPolicy,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from any name -> value lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let gateway_url = lookup("DEPLOYER_GATEWAY_URL").unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string());
        let gateway_token = lookup("DEPLOYER_GATEWAY_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .ok_or(ConfigError::Missing("DEPLOYER_GATEWAY_TOKEN"))?;
        let region = lookup("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string());

        let defaults = WaitPolicy::default();
        let wait = WaitPolicy {
            initial_delay: parse_or(&lookup, "DEPLOYER_WAIT_INITIAL_MS", defaults.initial_delay, Duration::from_millis)?,
            max_delay: parse_or(&lookup, "DEPLOYER_WAIT_MAX_MS", defaults.max_delay, Duration::from_millis)?,
            deadline: parse_or(&lookup, "DEPLOYER_WAIT_DEADLINE_SECS", defaults.deadline, Duration::from_secs)?,
            max_attempts: parse_or(&lookup, "DEPLOYER_WAIT_MAX_ATTEMPTS", defaults.max_attempts, |n: u32| n)?,
        };
        if wait.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                name: "DEPLOYER_WAIT_MAX_ATTEMPTS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            gateway_url,
            gateway_token,
            region,
            wait,
        })
    }
}

fn parse_or<F, N, T>(lookup: &F, name: &'static str, default: T, convert: impl Fn(N) -> T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    N: std::str::FromStr,
    N::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value.trim().parse::<N>().map(convert).map_err(|e| ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value,
        }),
    }
}
