//! Client configuration: defaults, builder and JSON loading

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use log::debug;
use crate::error::Error;
use crate::secret::ApiKey;
use crate::{ErrorPolicy, Provider};

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 512;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Rolling window rate limit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig
{   /// Calls permitted per window
    pub calls: u32
  , /// Window length in seconds
    pub period_secs: u64
}

impl Default for RateLimitConfig
{   fn default() -> Self
    {   RateLimitConfig
        {   calls: 50
          , period_secs: 60
        }
    }
}

/// Retry with exponential backoff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig
{   /// Total attempts per call, first one included
    pub max_attempts: u32
  , /// Delay before the first retry in milliseconds
    pub initial_backoff_ms: u64
  , /// Backoff multiplier for retries
    pub backoff_multiplier: f32
  , /// Upper bound on any single delay in milliseconds
    pub max_backoff_ms: u64
}

impl Default for RetryConfig
{   fn default() -> Self
    {   RetryConfig
        {   max_attempts: 3
          , initial_backoff_ms: 1000
          , backoff_multiplier: 2.0
          , max_backoff_ms: 30_000
        }
    }
}

/// Which interaction log sinks are active
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig
{   /// Keep structured entries in memory
    pub memory: bool
  , /// Append one line per event to this file
    pub file: Option<PathBuf>
}

impl Default for LogConfig
{   fn default() -> Self
    {   LogConfig
        {   memory: true
          , file: None
        }
    }
}

/// Immutable client configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientConfig
{   pub api_key: ApiKey
  , pub provider: Provider
  , /// Required for generic REST, optional override otherwise
    pub base_url: Option<String>
  , /// Model identifier, defaults per provider
    pub model: Option<String>
  , pub temperature: f32
  , pub max_tokens: u32
  , pub error_policy: ErrorPolicy
  , /// Transport timeout in seconds
    pub timeout_secs: u64
  , pub rate_limit: RateLimitConfig
  , pub retry: RetryConfig
  , pub log: LogConfig
}

impl ClientConfig
{   pub fn builder(
      api_key: impl Into<ApiKey>
    , provider: Provider
    ) -> ClientConfigBuilder
    {   ClientConfigBuilder::new(api_key.into(), provider)
    }

    /// Parse a JSON config document
    pub fn from_json_str(json: &str) -> Result<Self, Error>
    {   let file: ConfigFile = serde_json::from_str(json)
          .map_err(|e| Error::Configuration(
            format!("invalid config: {}", e)
          ))?;
        file.into_config()
    }

    /// Load a JSON config file from disk
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Error>
    {   let path = path.as_ref();
        debug!("Loading client config from {}", path.display());
        let json = std::fs::read_to_string(path)
          .map_err(|e| Error::Configuration(
            format!("cannot read {}: {}", path.display(), e)
          ))?;
        Self::from_json_str(&json)
    }

    /// Check every field; fields are public, so the client re-checks
    pub fn validate(&self) -> Result<(), Error>
    {   let c = self;

        if c.provider != Provider::GenericRest && c.api_key.is_empty()
        {   return Err(Error::Configuration(
              format!("{} requires an API key", c.provider)
            ));
        }
        if c.provider == Provider::GenericRest
          && c.base_url.as_deref().map_or(true, |u| u.trim().is_empty())
        {   return Err(Error::Configuration(
              "generic-rest requires a base_url".to_string()
            ));
        }
        if !(0.0..=2.0).contains(&c.temperature)
        {   return Err(Error::Configuration(format!(
              "default temperature {} outside 0.0..=2.0", c.temperature
            )));
        }
        if c.max_tokens == 0
        {   return Err(Error::Configuration(
              "default max_tokens must be positive".to_string()
            ));
        }
        if c.rate_limit.calls == 0 || c.rate_limit.period_secs == 0
        {   return Err(Error::Configuration(
              "rate limit needs a positive call count and period".to_string()
            ));
        }
        if c.retry.max_attempts == 0
        {   return Err(Error::Configuration(
              "retry max_attempts must be at least 1".to_string()
            ));
        }
        if !(c.retry.backoff_multiplier >= 1.0)
        {   return Err(Error::Configuration(format!(
              "backoff multiplier {} below 1.0", c.retry.backoff_multiplier
            )));
        }
        Ok(())
    }
}

/// Builder that validates on `build`
#[derive(Debug, Clone)]
pub struct ClientConfigBuilder
{   config: ClientConfig
}

impl ClientConfigBuilder
{   fn new(api_key: ApiKey, provider: Provider) -> Self
    {   ClientConfigBuilder
        {   config: ClientConfig
            {   api_key
              , provider
              , base_url: None
              , model: None
              , temperature: DEFAULT_TEMPERATURE
              , max_tokens: DEFAULT_MAX_TOKENS
              , error_policy: ErrorPolicy::default()
              , timeout_secs: DEFAULT_TIMEOUT_SECS
              , rate_limit: RateLimitConfig::default()
              , retry: RetryConfig::default()
              , log: LogConfig::default()
            }
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self
    {   self.config.base_url = Some(url.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self
    {   self.config.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self
    {   self.config.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self
    {   self.config.max_tokens = max_tokens;
        self
    }

    pub fn error_policy(mut self, policy: ErrorPolicy) -> Self
    {   self.config.error_policy = policy;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self
    {   self.config.timeout_secs = secs;
        self
    }

    pub fn rate_limit(mut self, calls: u32, period_secs: u64) -> Self
    {   self.config.rate_limit = RateLimitConfig { calls, period_secs };
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self
    {   self.config.retry = retry;
        self
    }

    pub fn log(mut self, log: LogConfig) -> Self
    {   self.config.log = log;
        self
    }

    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self
    {   self.config.log.file = Some(path.into());
        self
    }

    pub fn build(self) -> Result<ClientConfig, Error>
    {   self.config.validate()?;
        debug!("Built config for provider {}", self.config.provider);
        Ok(self.config)
    }
}

/// On-disk shape; the key may be inline or named by env var
#[derive(Debug, Deserialize)]
struct ConfigFile
{   provider: String
  , #[serde(default)]
    api_key: Option<ApiKey>
  , #[serde(default)]
    api_key_env: Option<String>
  , #[serde(default)]
    base_url: Option<String>
  , #[serde(default)]
    model: Option<String>
  , #[serde(default)]
    temperature: Option<f32>
  , #[serde(default)]
    max_tokens: Option<u32>
  , #[serde(default)]
    error_policy: Option<ErrorPolicy>
  , #[serde(default)]
    timeout_secs: Option<u64>
  , #[serde(default)]
    rate_limit: Option<RateLimitConfig>
  , #[serde(default)]
    retry: Option<RetryConfig>
  , #[serde(default)]
    log: Option<LogConfig>
}

impl ConfigFile
{   fn into_config(self) -> Result<ClientConfig, Error>
    {   let provider: Provider = self.provider.parse()?;

        let api_key = match (self.api_key, self.api_key_env)
        {   (Some(key), _) => key
          , (None, Some(var)) => {
              let value = std::env::var(&var).map_err(|_| {
                Error::Configuration(
                  format!("Environment variable {} not set", var)
                )
              })?;
              ApiKey::new(value)
            }
          , (None, None) => ApiKey::new("")
        };

        let mut builder = ClientConfig::builder(api_key, provider);
        if let Some(url) = self.base_url
        {   builder = builder.base_url(url);
        }
        if let Some(model) = self.model
        {   builder = builder.model(model);
        }
        if let Some(t) = self.temperature
        {   builder = builder.temperature(t);
        }
        if let Some(n) = self.max_tokens
        {   builder = builder.max_tokens(n);
        }
        if let Some(policy) = self.error_policy
        {   builder = builder.error_policy(policy);
        }
        if let Some(secs) = self.timeout_secs
        {   builder = builder.timeout_secs(secs);
        }
        if let Some(rl) = self.rate_limit
        {   builder = builder.rate_limit(rl.calls, rl.period_secs);
        }
        if let Some(retry) = self.retry
        {   builder = builder.retry(retry);
        }
        if let Some(log) = self.log
        {   builder = builder.log(log);
        }
        builder.build()
    }
}
