use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;


pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f64 = 1.2;
pub const DEFAULT_MAX_TOKENS: u32 = 150;
pub const DEFAULT_QUIET_PERIOD_SECS: u64 = 5;
pub const DEFAULT_HISTORY_CAP: usize = 10;
pub const DEFAULT_PROMPT_WINDOW: usize = 5;
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_IDLE_TTL_SECS: u64 = 86400;


/// Runtime settings for the relay.
///
/// Credentials default to empty strings when absent. They are never checked at
/// startup, so a missing key shows up as an authentication failure on first use.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub openai_api_key: String,
    pub discord_token: String,
    pub openai_base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub quiet_period: Duration,
    pub history_cap: usize,
    pub prompt_window: usize,
    pub log_dir: PathBuf,
    pub idle_ttl: Duration,
}


impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            discord_token: String::new(),
            openai_base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            quiet_period: Duration::from_secs(DEFAULT_QUIET_PERIOD_SECS),
            history_cap: DEFAULT_HISTORY_CAP,
            prompt_window: DEFAULT_PROMPT_WINDOW,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            idle_ttl: Duration::from_secs(DEFAULT_IDLE_TTL_SECS),
        }
    }
}


impl RelayConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }


    /// Builds a config from an arbitrary key lookup.
    ///
    /// # Arguments
    ///
    /// * `lookup` - Returns the raw value for a variable name, or `None` if unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            openai_api_key: lookup("OPENAI_API_KEY").unwrap_or_default(),
            discord_token: lookup("DISCORD_TOKEN").unwrap_or_default(),
            openai_base_url: lookup("OPENAI_BASE_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.openai_base_url),
            model: lookup("RELAY_MODEL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.model),
            temperature: parse_or(&lookup, "RELAY_TEMPERATURE", defaults.temperature),
            max_tokens: parse_or(&lookup, "RELAY_MAX_TOKENS", defaults.max_tokens),
            quiet_period: Duration::from_secs(parse_or(
                &lookup,
                "RELAY_QUIET_PERIOD_SECS",
                DEFAULT_QUIET_PERIOD_SECS,
            )),
            history_cap: parse_or(&lookup, "RELAY_HISTORY_CAP", defaults.history_cap),
            prompt_window: parse_or(&lookup, "RELAY_PROMPT_WINDOW", defaults.prompt_window),
            log_dir: lookup("RELAY_LOG_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
            idle_ttl: Duration::from_secs(parse_or(
                &lookup,
                "RELAY_IDLE_TTL_SECS",
                DEFAULT_IDLE_TTL_SECS,
            )),
        }
    }
}


fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, value = %raw, "unparseable config value, using default");
                default
            }
        },
        None => default,
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
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_credentials_default_to_empty() {
        let config = RelayConfig::from_lookup(lookup_from(&[]));

        assert_eq!(config.openai_api_key, "");
        assert_eq!(config.discord_token, "");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.quiet_period, Duration::from_secs(5));
        assert_eq!(config.history_cap, 10);
        assert_eq!(config.prompt_window, 5);
        assert_eq!(config.max_tokens, 150);
        assert_eq!(config.log_dir, PathBuf::from("logs"));
    }

    #[test]
    fn overrides_are_applied() {
        let config = RelayConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("DISCORD_TOKEN", "bot-token"),
            ("RELAY_QUIET_PERIOD_SECS", "2"),
            ("RELAY_TEMPERATURE", "0.5"),
            ("RELAY_LOG_DIR", "/tmp/transcripts"),
        ]));

        assert_eq!(config.openai_api_key, "sk-test");
        assert_eq!(config.discord_token, "bot-token");
        assert_eq!(config.quiet_period, Duration::from_secs(2));
        assert_eq!(config.temperature, 0.5);
        assert_eq!(config.log_dir, PathBuf::from("/tmp/transcripts"));
    }

    #[test]
    fn garbage_numbers_fall_back_to_defaults() {
        let config = RelayConfig::from_lookup(lookup_from(&[
            ("RELAY_HISTORY_CAP", "lots"),
            ("RELAY_MAX_TOKENS", "-3"),
        ]));

        assert_eq!(config.history_cap, DEFAULT_HISTORY_CAP);
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
    }
}
