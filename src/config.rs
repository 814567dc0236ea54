use std::{env, str::FromStr, time::Duration};

use anyhow::{Context, Result, anyhow};

const DEFAULT_PORTAL_NAME: &str = "Mediabot V3";
const DEFAULT_BOT_NICKNAME: &str = "mediabot";
const DEFAULT_COMMAND_CHAR: &str = ".";
const DEFAULT_DIAGNOSTICS_HOST: &str = "localhost";
const DEFAULT_DIAGNOSTICS_PORT: u16 = 1234;
const DEFAULT_DIAGNOSTICS_TIMEOUT_SECS: u64 = 10;
const DEFAULT_HARBOR_SOURCE: &str = "src_4195";
const DEFAULT_ICECAST_STATUS_URL: &str = "http://localhost:8000/status-json.xsl";
const DEFAULT_SESSION_TTL_HOURS: i64 = 12;
const DEFAULT_CHANNEL_LOG_DAYS: i64 = 3;

/// Runtime settings, read once at startup from the environment (`.env` included).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsoleSettings {
    pub portal_name: String,
    pub bot_nickname: String,
    pub command_char: String,
    pub diagnostics: DiagnosticsSettings,
    pub icecast_status_url: String,
    pub session_ttl_hours: i64,
    pub channel_log_days: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiagnosticsSettings {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
    pub harbor_source: String,
}

impl ConsoleSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let session_ttl_hours = parse_or(&lookup, "SESSION_TTL_HOURS", DEFAULT_SESSION_TTL_HOURS)?;
        if session_ttl_hours <= 0 {
            return Err(anyhow!("SESSION_TTL_HOURS must be positive"));
        }
        let channel_log_days = parse_or(&lookup, "CHANNEL_LOG_DAYS", DEFAULT_CHANNEL_LOG_DAYS)?;
        if channel_log_days <= 0 {
            return Err(anyhow!("CHANNEL_LOG_DAYS must be positive"));
        }

        let command_char = text("BOT_COMMAND_CHAR", DEFAULT_COMMAND_CHAR);
        if command_char.chars().count() != 1 {
            return Err(anyhow!("BOT_COMMAND_CHAR must be a single character"));
        }

        Ok(Self {
            portal_name: text("PORTAL_NAME", DEFAULT_PORTAL_NAME),
            bot_nickname: text("BOT_NICKNAME", DEFAULT_BOT_NICKNAME),
            command_char,
            diagnostics: DiagnosticsSettings {
                host: text("DIAGNOSTICS_HOST", DEFAULT_DIAGNOSTICS_HOST),
                port: parse_or(&lookup, "DIAGNOSTICS_PORT", DEFAULT_DIAGNOSTICS_PORT)?,
                timeout: Duration::from_secs(parse_or(
                    &lookup,
                    "DIAGNOSTICS_TIMEOUT_SECS",
                    DEFAULT_DIAGNOSTICS_TIMEOUT_SECS,
                )?),
                harbor_source: text("HARBOR_SOURCE", DEFAULT_HARBOR_SOURCE),
            },
            icecast_status_url: text("ICECAST_STATUS_URL", DEFAULT_ICECAST_STATUS_URL),
            session_ttl_hours,
            channel_log_days,
        })
    }
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            portal_name: DEFAULT_PORTAL_NAME.to_string(),
            bot_nickname: DEFAULT_BOT_NICKNAME.to_string(),
            command_char: DEFAULT_COMMAND_CHAR.to_string(),
            diagnostics: DiagnosticsSettings {
                host: DEFAULT_DIAGNOSTICS_HOST.to_string(),
                port: DEFAULT_DIAGNOSTICS_PORT,
                timeout: Duration::from_secs(DEFAULT_DIAGNOSTICS_TIMEOUT_SECS),
                harbor_source: DEFAULT_HARBOR_SOURCE.to_string(),
            },
            icecast_status_url: DEFAULT_ICECAST_STATUS_URL.to_string(),
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            channel_log_days: DEFAULT_CHANNEL_LOG_DAYS,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key).map(|value| value.trim().to_string()) {
        Some(value) if !value.is_empty() => value
            .parse()
            .with_context(|| format!("invalid value for {key}: {value:?}")),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> Result<ConsoleSettings> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ConsoleSettings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_yields_defaults() {
        assert_eq!(settings(&[]).unwrap(), ConsoleSettings::default());
    }

    #[test]
    fn overrides_are_applied() {
        let parsed = settings(&[
            ("PORTAL_NAME", "Teuk Console"),
            ("BOT_COMMAND_CHAR", "!"),
            ("DIAGNOSTICS_PORT", "4321"),
            ("DIAGNOSTICS_TIMEOUT_SECS", "3"),
            ("HARBOR_SOURCE", "  live_1  "),
        ])
        .unwrap();
        assert_eq!(parsed.portal_name, "Teuk Console");
        assert_eq!(parsed.command_char, "!");
        assert_eq!(parsed.diagnostics.port, 4321);
        assert_eq!(parsed.diagnostics.timeout, Duration::from_secs(3));
        assert_eq!(parsed.diagnostics.harbor_source, "live_1");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(settings(&[("DIAGNOSTICS_PORT", "http")]).is_err());
        assert!(settings(&[("BOT_COMMAND_CHAR", "!!")]).is_err());
        assert!(settings(&[("SESSION_TTL_HOURS", "0")]).is_err());
    }

    #[test]
    fn blank_values_fall_back() {
        let parsed = settings(&[("PORTAL_NAME", "   "), ("DIAGNOSTICS_PORT", "")]).unwrap();
        assert_eq!(parsed.portal_name, DEFAULT_PORTAL_NAME);
        assert_eq!(parsed.diagnostics.port, DEFAULT_DIAGNOSTICS_PORT);
    }
}
