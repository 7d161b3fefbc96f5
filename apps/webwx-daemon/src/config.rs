//! Environment-backed runtime configuration for `webwx-daemon`.

use std::{env, error::Error, fmt, path::PathBuf, time::Duration};

use webwx_client::ClientConfig;

const DEFAULT_SNAPSHOT_PATH: &str = "./.webwx-daemon-store/session.json";
const DEFAULT_COMMAND_BUFFER: usize = 32;
const DEFAULT_EVENT_BUFFER: usize = 256;

/// Runtime configuration used by the daemon.
#[derive(Debug, Clone, PartialEq)]
pub struct DaemonConfig {
    /// Optional login root override, used when fronting the service through
    /// a proxy or a test double.
    pub login_root: Option<String>,
    /// Session snapshot location.
    pub snapshot_path: PathBuf,
    /// Login attempts before giving up.
    pub max_login_attempts: Option<u32>,
    /// Consecutive unhealthy sync cycles tolerated.
    pub max_sync_failures: Option<u32>,
    /// Per-recipient outbound quiet window, seconds.
    pub send_cooldown_secs: Option<u64>,
    /// Inbound command queue depth.
    pub command_buffer: usize,
    /// Event fan-out buffer depth.
    pub event_buffer: usize,
}

impl DaemonConfig {
    /// Parse configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(mut lookup: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let login_root = optional_trimmed_env("WEBWX_LOGIN_ROOT", &mut lookup);
        let snapshot_path = optional_trimmed_env("WEBWX_SNAPSHOT_PATH", &mut lookup)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_PATH));

        let max_login_attempts = parse_optional_u32("WEBWX_MAX_LOGIN_ATTEMPTS", &mut lookup)?;
        let max_sync_failures = parse_optional_u32("WEBWX_MAX_SYNC_FAILURES", &mut lookup)?;
        let send_cooldown_secs = parse_optional_u64("WEBWX_SEND_COOLDOWN_SECS", &mut lookup)?;

        if max_login_attempts == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "WEBWX_MAX_LOGIN_ATTEMPTS",
                value: "0".to_owned(),
                reason: "must be at least 1".to_owned(),
            });
        }
        if max_sync_failures == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "WEBWX_MAX_SYNC_FAILURES",
                value: "0".to_owned(),
                reason: "must be at least 1".to_owned(),
            });
        }

        Ok(Self {
            login_root,
            snapshot_path,
            max_login_attempts,
            max_sync_failures,
            send_cooldown_secs,
            command_buffer: DEFAULT_COMMAND_BUFFER,
            event_buffer: DEFAULT_EVENT_BUFFER,
        })
    }

    /// Assemble the client configuration, defaults filled for anything unset.
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig {
            snapshot_path: self.snapshot_path.clone(),
            ..ClientConfig::default()
        };
        if let Some(root) = &self.login_root {
            config.login_root = root.clone();
        }
        if let Some(attempts) = self.max_login_attempts {
            config.max_login_attempts = attempts;
        }
        if let Some(failures) = self.max_sync_failures {
            config.max_sync_failures = failures;
        }
        if let Some(secs) = self.send_cooldown_secs {
            config.send_cooldown = Duration::from_secs(secs);
        }
        config
    }
}

/// Errors produced while parsing runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue { key, value, reason } => {
                write!(f, "invalid {key}='{value}': {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

fn optional_trimmed_env<F>(key: &'static str, lookup: &mut F) -> Option<String>
where
    F: FnMut(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_optional_u32<F>(key: &'static str, lookup: &mut F) -> Result<Option<u32>, ConfigError>
where
    F: FnMut(&str) -> Option<String>,
{
    let Some(value) = lookup(key) else {
        return Ok(None);
    };
    value
        .parse::<u32>()
        .map(Some)
        .map_err(|err| ConfigError::InvalidValue {
            key,
            value,
            reason: err.to_string(),
        })
}

fn parse_optional_u64<F>(key: &'static str, lookup: &mut F) -> Result<Option<u64>, ConfigError>
where
    F: FnMut(&str) -> Option<String>,
{
    let Some(value) = lookup(key) else {
        return Ok(None);
    };
    value
        .parse::<u64>()
        .map(Some)
        .map_err(|err| ConfigError::InvalidValue {
            key,
            value,
            reason: err.to_string(),
        })
}
