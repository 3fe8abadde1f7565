//! Optional TOML configuration.
//!
//! Every field has a default, so an empty file (or no file) reproduces the
//! built-in behavior. CLI flags are applied on top by the binary.
//!
//! ```toml
//! [fetch]
//! timeout_secs = 30
//! earnings_attempts = 5
//! screen_attempts = 3
//! backoff_secs = 1.5
//!
//! [polygon]
//! base_url = "https://api.polygon.io"
//! auth = "query"
//!
//! [finnhub]
//! auth = "bearer"
//! ```

use moonshot_core::data::{AuthStyle, HttpSettings, RetryPolicy};
use moonshot_core::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MoonshotConfig {
    pub fetch: FetchConfig,
    pub polygon: ProviderConfig,
    pub finnhub: ProviderConfig,
}

/// HTTP and retry settings shared by both providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    pub timeout_secs: f64,
    pub user_agent: Option<String>,
    pub earnings_attempts: u32,
    pub screen_attempts: u32,
    pub backoff_secs: f64,
    /// Default inter-page delay; `--sleep` overrides it.
    pub page_delay_secs: f64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30.0,
            user_agent: None,
            earnings_attempts: RetryPolicy::EARNINGS.max_attempts(),
            screen_attempts: RetryPolicy::SCREEN.max_attempts(),
            backoff_secs: RetryPolicy::EARNINGS.backoff_base().as_secs_f64(),
            page_delay_secs: RetryPolicy::EARNINGS.page_delay().as_secs_f64(),
        }
    }
}

/// Per-provider endpoint settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    /// Overrides the public API host.
    pub base_url: Option<String>,
    pub auth: AuthStyle,
}

impl MoonshotConfig {
    /// Load from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ConfigFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content).map_err(|e| match e {
            ConfigError::Invalid(reason) => ConfigError::ConfigFile {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make every request fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timeout()?;
        // Surfaces attempt/backoff/delay problems with the policy's own messages.
        self.earnings_policy(None)?;
        self.screen_policy(None)?;
        Ok(())
    }

    fn timeout(&self) -> Result<Duration, ConfigError> {
        let secs = self.fetch.timeout_secs;
        if !secs.is_finite() || secs <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "fetch.timeout_secs must be positive, got {secs}"
            )));
        }
        Duration::try_from_secs_f64(secs)
            .map_err(|e| ConfigError::Invalid(format!("fetch.timeout_secs: {e}")))
    }

    pub fn http_settings(&self) -> Result<HttpSettings, ConfigError> {
        let mut settings = HttpSettings {
            timeout: self.timeout()?,
            ..HttpSettings::default()
        };
        if let Some(agent) = &self.fetch.user_agent {
            settings.user_agent = agent.clone();
        }
        Ok(settings)
    }

    /// Retry policy for the earnings endpoints; `page_delay_secs` is `--sleep`.
    pub fn earnings_policy(&self, page_delay_secs: Option<f64>) -> Result<RetryPolicy, ConfigError> {
        RetryPolicy::new(
            self.fetch.earnings_attempts,
            self.fetch.backoff_secs,
            page_delay_secs.unwrap_or(self.fetch.page_delay_secs),
        )
    }

    /// Retry policy for the grouped-daily screen; `page_delay_secs` is `--sleep`.
    pub fn screen_policy(&self, page_delay_secs: Option<f64>) -> Result<RetryPolicy, ConfigError> {
        RetryPolicy::new(
            self.fetch.screen_attempts,
            self.fetch.backoff_secs,
            page_delay_secs.unwrap_or(self.fetch.page_delay_secs),
        )
    }
}
