//! Process configuration from environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `PORT` | `8000` |
//! | `GH_APP_IDENTIFIER` | required |
//! | `GH_APP_PRIVATE_KEY` or `GH_APP_PRIVATE_KEY_PATH` | required |
//! | `GH_WEBHOOK_SECRET` | required |
//! | `MERGE_CHANCE_TIME_STATE_DIR` | `./state` |
//! | `MERGE_CHANCE_TIME_UTC_OFFSET_HOURS` | `0` |
//! | `MERGE_CHANCE_TIME_TICK_DEADLINE_SECS` | `300` |
//! | `MERGE_CHANCE_TIME_ADMIN_API` | `false` |

use std::path::PathBuf;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use thiserror::Error;

use crate::server::ServerSettings;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_STATE_DIR: &str = "./state";
pub const DEFAULT_TICK_DEADLINE_SECS: u64 = 300;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("reading private key from {}: {source}", .path.display())]
    PrivateKey {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone)]
pub struct AppConfig {
    pub port: u16,
    pub app_id: u64,
    /// PEM-encoded RSA key of the GitHub App.
    pub private_key: Vec<u8>,
    pub webhook_secret: Vec<u8>,
    pub state_dir: PathBuf,
    pub utc_offset: FixedOffset,
    pub tick_deadline: Duration,
    pub admin_api: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("app_id", &self.app_id)
            .field("state_dir", &self.state_dir)
            .field("utc_offset", &self.utc_offset)
            .field("tick_deadline", &self.tick_deadline)
            .field("admin_api", &self.admin_api)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which returns a variable's
    /// value or `None` when it is unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &'static str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| var(name).ok_or(ConfigError::Missing(name));

        let port = match var("PORT") {
            Some(v) => parse("PORT", &v)?,
            None => DEFAULT_PORT,
        };
        let app_id = parse("GH_APP_IDENTIFIER", &required("GH_APP_IDENTIFIER")?)?;

        let private_key = match (var("GH_APP_PRIVATE_KEY"), var("GH_APP_PRIVATE_KEY_PATH")) {
            (Some(pem), _) => pem.into_bytes(),
            (None, Some(path)) => {
                let path = PathBuf::from(path);
                std::fs::read(&path).map_err(|source| ConfigError::PrivateKey { path, source })?
            }
            (None, None) => return Err(ConfigError::Missing("GH_APP_PRIVATE_KEY")),
        };
        let webhook_secret = required("GH_WEBHOOK_SECRET")?.into_bytes();

        let state_dir = var("MERGE_CHANCE_TIME_STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR));

        let utc_offset = match var("MERGE_CHANCE_TIME_UTC_OFFSET_HOURS") {
            Some(v) => {
                let hours: i32 = parse("MERGE_CHANCE_TIME_UTC_OFFSET_HOURS", &v)?;
                offset_from_hours(hours).ok_or_else(|| ConfigError::Invalid {
                    name: "MERGE_CHANCE_TIME_UTC_OFFSET_HOURS",
                    value: v,
                    reason: "must be within -23..=23".to_string(),
                })?
            }
            None => Utc.fix(),
        };

        let tick_deadline = match var("MERGE_CHANCE_TIME_TICK_DEADLINE_SECS") {
            Some(v) => {
                let secs: u64 = parse("MERGE_CHANCE_TIME_TICK_DEADLINE_SECS", &v)?;
                if secs == 0 {
                    return Err(ConfigError::Invalid {
                        name: "MERGE_CHANCE_TIME_TICK_DEADLINE_SECS",
                        value: v,
                        reason: "must be positive".to_string(),
                    });
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_TICK_DEADLINE_SECS),
        };

        let admin_api = match var("MERGE_CHANCE_TIME_ADMIN_API") {
            Some(v) => parse_flag("MERGE_CHANCE_TIME_ADMIN_API", v)?,
            None => false,
        };

        Ok(AppConfig {
            port,
            app_id,
            private_key,
            webhook_secret,
            state_dir,
            utc_offset,
            tick_deadline,
            admin_api,
        })
    }

    pub fn server_settings(&self) -> ServerSettings {
        ServerSettings {
            utc_offset: self.utc_offset,
            tick_deadline: self.tick_deadline,
            admin_api: self.admin_api,
        }
    }
}

fn parse<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_flag(name: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            value,
            reason: "expected true or false".to_string(),
        }),
    }
}

fn offset_from_hours(hours: i32) -> Option<FixedOffset> {
    if !(-23..=23).contains(&hours) {
        return None;
    }
    FixedOffset::east_opt(hours * 3600)
}
