//! Director configuration

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use buttonburgh_domain::DispatchMode;

use crate::infrastructure::fixtures::DEFAULT_FIXTURE_PATH;
use crate::infrastructure::gemini::GeminiConfig;
use crate::infrastructure::ports::ConfigurationError;
use crate::infrastructure::rate_limited::RateLimitConfig;

/// Director configuration loaded from environment
#[derive(Debug, Clone)]
pub struct DirectorConfig {
    /// Dispatch mode; the fixture document's default when unset
    pub mode: Option<DispatchMode>,
    /// Fixture document path
    pub fixture_path: PathBuf,
    /// Live client settings
    pub gemini: GeminiConfig,
    /// Admission control shared by both clients
    pub rate_limit: RateLimitConfig,
    /// Simulated latency for sandbox responses
    pub sandbox_latency: Option<Duration>,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            mode: None,
            fixture_path: PathBuf::from(DEFAULT_FIXTURE_PATH),
            gemini: GeminiConfig::default(),
            rate_limit: RateLimitConfig::default(),
            sandbox_latency: None,
        }
    }
}

impl DirectorConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from any variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let rate_limit = RateLimitConfig::from_millis(
            parse(&var, "DIRECTOR_RATE_LIMIT_MAX_REQUESTS")?
                .unwrap_or(defaults.rate_limit.max_requests),
            parse(&var, "DIRECTOR_RATE_LIMIT_INTERVAL_MS")?
                .unwrap_or(defaults.rate_limit.interval.as_millis() as u64),
        );

        let temperature: Option<f32> = parse(&var, "GEMINI_TEMPERATURE")?;
        if let Some(t) = temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigurationError::invalid(
                    "GEMINI_TEMPERATURE",
                    format!("{t} is outside 0.0..=2.0"),
                ));
            }
        }

        let timeout_secs: Option<u64> = parse(&var, "GEMINI_TIMEOUT_SECS")?;
        if timeout_secs == Some(0) {
            return Err(ConfigurationError::invalid(
                "GEMINI_TIMEOUT_SECS",
                "timeout must be at least 1 second",
            ));
        }

        let gemini = GeminiConfig {
            api_key: var("GEMINI_API_KEY"),
            model: var("GEMINI_MODEL").unwrap_or(defaults.gemini.model),
            base_url: var("GEMINI_BASE_URL").unwrap_or(defaults.gemini.base_url),
            request_timeout: timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.gemini.request_timeout),
            temperature,
        };

        Ok(Self {
            mode: parse(&var, "DIRECTOR_MODE")?,
            fixture_path: var("DIRECTOR_FIXTURE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.fixture_path),
            gemini,
            rate_limit,
            sandbox_latency: parse(&var, "DIRECTOR_SANDBOX_LATENCY_MS")?
                .map(Duration::from_millis),
        })
    }

    /// Whether fixtures come from the default location.
    pub fn uses_default_fixtures(&self) -> bool {
        self.fixture_path == PathBuf::from(DEFAULT_FIXTURE_PATH)
    }
}

fn parse<T>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigurationError>
where
    T: FromStr,
    T::Err: Display,
{
    var(name)
        .map(|value| {
            value
                .parse()
                .map_err(|e| ConfigurationError::invalid(name, format!("'{value}': {e}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<DirectorConfig, ConfigurationError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DirectorConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = load(&[]).unwrap();

        assert_eq!(config.mode, None);
        assert!(config.uses_default_fixtures());
        assert_eq!(config.gemini.api_key, None);
        assert_eq!(config.gemini.model, "gemini-1.5-flash");
        assert_eq!(config.rate_limit, RateLimitConfig::default());
        assert_eq!(config.sandbox_latency, None);
    }

    #[test]
    fn reads_every_setting() {
        let config = load(&[
            ("DIRECTOR_MODE", "Live"),
            ("DIRECTOR_FIXTURE_PATH", "/srv/fixtures.json"),
            ("GEMINI_API_KEY", "secret"),
            ("GEMINI_MODEL", "gemini-1.5-pro"),
            ("GEMINI_BASE_URL", "http://localhost:9000"),
            ("GEMINI_TIMEOUT_SECS", "5"),
            ("GEMINI_TEMPERATURE", "0.8"),
            ("DIRECTOR_RATE_LIMIT_MAX_REQUESTS", "3"),
            ("DIRECTOR_RATE_LIMIT_INTERVAL_MS", "1500"),
            ("DIRECTOR_SANDBOX_LATENCY_MS", "200"),
        ])
        .unwrap();

        assert_eq!(config.mode, Some(DispatchMode::Live));
        assert_eq!(config.fixture_path, PathBuf::from("/srv/fixtures.json"));
        assert!(!config.uses_default_fixtures());
        assert_eq!(config.gemini.api_key.as_deref(), Some("secret"));
        assert_eq!(config.gemini.model, "gemini-1.5-pro");
        assert_eq!(config.gemini.base_url, "http://localhost:9000");
        assert_eq!(config.gemini.request_timeout, Duration::from_secs(5));
        assert_eq!(config.gemini.temperature, Some(0.8));
        assert_eq!(
            config.rate_limit,
            RateLimitConfig::new(3, Duration::from_millis(1500))
        );
        assert_eq!(config.sandbox_latency, Some(Duration::from_millis(200)));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = load(&[("GEMINI_API_KEY", "   "), ("DIRECTOR_MODE", "")]).unwrap();
        assert_eq!(config.gemini.api_key, None);
        assert_eq!(config.mode, None);
    }

    #[test]
    fn unparseable_values_name_the_variable() {
        let err = load(&[("DIRECTOR_RATE_LIMIT_MAX_REQUESTS", "lots")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidSetting {
                name: "DIRECTOR_RATE_LIMIT_MAX_REQUESTS",
                ..
            }
        ));

        let err = load(&[("DIRECTOR_MODE", "offline")]).unwrap_err();
        assert!(err.to_string().contains("DIRECTOR_MODE"));
    }

    #[test]
    fn temperature_out_of_range_is_rejected() {
        let err = load(&[("GEMINI_TEMPERATURE", "3.5")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidSetting {
                name: "GEMINI_TEMPERATURE",
                ..
            }
        ));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = load(&[("GEMINI_TIMEOUT_SECS", "0")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidSetting {
                name: "GEMINI_TIMEOUT_SECS",
                ..
            }
        ));
    }

    #[test]
    fn zero_quota_is_raised_to_one() {
        let config = load(&[("DIRECTOR_RATE_LIMIT_MAX_REQUESTS", "0")]).unwrap();
        assert_eq!(config.rate_limit.max_requests, 1);
    }
}
