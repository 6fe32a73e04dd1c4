//! Configuration types, read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::interview::delegate::DEFAULT_DELEGATE_TIMEOUT;
use crate::llm::{LlmBackend, LlmConfig};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// HTTP port.
    pub port: u16,
    /// Assistant backend.
    pub llm: LlmConfig,
    /// Upper bound on one assistant call.
    pub delegate_timeout: Duration,
    /// Reply length cap for assistant calls (provider default when unset).
    pub max_tokens: Option<u32>,
    /// Sampling temperature for assistant calls, 0.0 to 2.0.
    pub temperature: Option<f32>,
    /// Most recent turns handed to the assistant (None = all).
    pub history_window: Option<usize>,
    /// Session database path; in-memory sessions when unset.
    pub db_path: Option<PathBuf>,
    /// JSON interview script; the built-in career script when unset.
    pub script_path: Option<PathBuf>,
    /// Directory for daily rolling log files.
    pub log_dir: Option<PathBuf>,
    /// Sessions idle longer than this are pruned.
    pub session_idle_timeout: Duration,
}

impl ServerConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend: LlmBackend = match get("CAREER_ASSIST_BACKEND") {
            Some(raw) => raw.parse().map_err(|message| ConfigError::InvalidValue {
                key: "CAREER_ASSIST_BACKEND".to_string(),
                message,
            })?,
            None => LlmBackend::Gemini,
        };

        let key_var = backend.api_key_var();
        let api_key =
            get(key_var).ok_or_else(|| ConfigError::MissingEnvVar(key_var.to_string()))?;

        let model = get("CAREER_ASSIST_MODEL").unwrap_or_else(|| backend.default_model().to_string());

        let port = parse_or(&get, "CAREER_ASSIST_PORT", 5000u16)?;
        let timeout_secs = parse_or(
            &get,
            "CAREER_ASSIST_DELEGATE_TIMEOUT_SECS",
            DEFAULT_DELEGATE_TIMEOUT.as_secs(),
        )?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "CAREER_ASSIST_DELEGATE_TIMEOUT_SECS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        let history_window = get("CAREER_ASSIST_HISTORY_WINDOW")
            .map(|raw| parse_value::<usize>("CAREER_ASSIST_HISTORY_WINDOW", &raw))
            .transpose()?;
        let max_tokens = get("CAREER_ASSIST_MAX_TOKENS")
            .map(|raw| parse_value::<u32>("CAREER_ASSIST_MAX_TOKENS", &raw))
            .transpose()?;
        let temperature = get("CAREER_ASSIST_TEMPERATURE")
            .map(|raw| parse_value::<f32>("CAREER_ASSIST_TEMPERATURE", &raw))
            .transpose()?;
        if let Some(t) = temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::InvalidValue {
                    key: "CAREER_ASSIST_TEMPERATURE".to_string(),
                    message: format!("{t} is outside 0.0..=2.0"),
                });
            }
        }
        let idle_secs = parse_or(&get, "CAREER_ASSIST_SESSION_IDLE_SECS", 24 * 3600u64)?;

        Ok(Self {
            host: get("CAREER_ASSIST_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            llm: LlmConfig {
                backend,
                api_key: secrecy::SecretString::from(api_key),
                model,
            },
            delegate_timeout: Duration::from_secs(timeout_secs),
            max_tokens,
            temperature,
            history_window,
            db_path: get("CAREER_ASSIST_DB_PATH").map(PathBuf::from),
            script_path: get("CAREER_ASSIST_SCRIPT").map(PathBuf::from),
            log_dir: get("CAREER_ASSIST_LOG_DIR").map(PathBuf::from),
            session_idle_timeout: Duration::from_secs(idle_secs),
        })
    }

    /// `host:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_with_only_gemini_key() {
        let config = ServerConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "g-key")])).unwrap();
        assert_eq!(config.llm.backend, LlmBackend::Gemini);
        assert_eq!(config.llm.model, "gemini-1.5-flash");
        assert_eq!(config.llm.api_key.expose_secret(), "g-key");
        assert_eq!(config.port, 5000);
        assert_eq!(config.bind_addr(), "0.0.0.0:5000");
        assert_eq!(config.delegate_timeout, DEFAULT_DELEGATE_TIMEOUT);
        assert!(config.history_window.is_none());
        assert!(config.max_tokens.is_none());
        assert!(config.temperature.is_none());
        assert!(config.db_path.is_none());
    }

    #[test]
    fn missing_key_for_backend() {
        let err = ServerConfig::from_lookup(lookup(&[
            ("CAREER_ASSIST_BACKEND", "anthropic"),
            ("GEMINI_API_KEY", "g-key"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref v) if v == "ANTHROPIC_API_KEY"));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let err = ServerConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("CAREER_ASSIST_BACKEND", "openai"),
            ("OPENAI_API_KEY", "sk"),
            ("CAREER_ASSIST_MODEL", "gpt-4o"),
            ("CAREER_ASSIST_PORT", "8081"),
            ("CAREER_ASSIST_DELEGATE_TIMEOUT_SECS", "5"),
            ("CAREER_ASSIST_HISTORY_WINDOW", "20"),
            ("CAREER_ASSIST_MAX_TOKENS", "512"),
            ("CAREER_ASSIST_TEMPERATURE", "0.7"),
            ("CAREER_ASSIST_DB_PATH", "./data/sessions.db"),
        ]))
        .unwrap();
        assert_eq!(config.llm.backend, LlmBackend::OpenAi);
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.port, 8081);
        assert_eq!(config.delegate_timeout, Duration::from_secs(5));
        assert_eq!(config.history_window, Some(20));
        assert_eq!(config.max_tokens, Some(512));
        assert_eq!(config.temperature, Some(0.7));
        assert_eq!(config.db_path, Some(PathBuf::from("./data/sessions.db")));
    }

    #[test]
    fn invalid_numbers_are_reported_with_key() {
        let err = ServerConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "k"),
            ("CAREER_ASSIST_PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "CAREER_ASSIST_PORT"));
    }

    #[test]
    fn zero_timeout_rejected() {
        let err = ServerConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "k"),
            ("CAREER_ASSIST_DELEGATE_TIMEOUT_SECS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn unknown_backend_rejected() {
        let err = ServerConfig::from_lookup(lookup(&[("CAREER_ASSIST_BACKEND", "mistral")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "CAREER_ASSIST_BACKEND"));
    }

    #[test]
    fn temperature_out_of_range_rejected() {
        let err = ServerConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "k"),
            ("CAREER_ASSIST_TEMPERATURE", "3.5"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "CAREER_ASSIST_TEMPERATURE"));
    }
}
