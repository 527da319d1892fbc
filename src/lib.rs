pub mod error;
pub mod secret;
pub mod config;
pub mod request;
pub mod journal;
pub mod rate_limit;
pub mod retry;
pub mod transport;
pub mod providers;
pub mod stream;
pub mod client;
use serde::{Deserialize, Serialize};

/*

sllm (Simple LLM): one async client for text-completion APIs, with
sequential batching, streaming, a rolling-window rate limit, retry with
backoff, and a log of every interaction.

sllm/
├── Cargo.toml
├── src/
│   ├── lib.rs          # Re-exports, Provider, ErrorPolicy
│   ├── error.rs        # Error and ErrorKind
│   ├── secret.rs       # Redacted ApiKey
│   ├── config.rs       # ClientConfig, builder, JSON loading
│   ├── request.rs      # GenerationRequest / GenerationResult
│   ├── journal.rs      # In-memory interaction log + file log
│   ├── rate_limit.rs   # Rolling window limiter
│   ├── retry.rs        # Exponential backoff policy
│   ├── transport.rs    # Transport trait + reqwest implementation
│   ├── providers/      # Request shaping / response parsing per provider
│   ├── stream.rs       # TextStream
│   └── client.rs       # LlmClient
└── tests/

*/

pub use client::{LlmClient, TextGenerationProvider};
pub use config::{ClientConfig, ClientConfigBuilder, LogConfig, RateLimitConfig, RetryConfig};
pub use error::{Error, ErrorKind};
pub use journal::LogEntry;
pub use request::{GenerationRequest, GenerationResult};
pub use secret::ApiKey;
pub use stream::TextStream;
pub use transport::{ByteStream, HttpTransport, Transport};

/// Upstream LLM vendor / API variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Provider
{   /// OpenAI completions API
    #[serde(rename = "openai")]
    OpenAi
  , /// xAI (Grok), OpenAI-compatible completions
    #[serde(rename = "xai")]
    Xai
  , /// Any REST service exposing POST {base_url}/generate
    #[serde(rename = "generic-rest", alias = "generic")]
    GenericRest
}

impl Provider
{   pub fn as_str(&self) -> &'static str
    {   match self
        {   Provider::OpenAi => "openai"
          , Provider::Xai => "xai"
          , Provider::GenericRest => "generic-rest"
        }
    }
}

impl std::fmt::Display for Provider
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {   f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Provider
{   type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {   match s.trim().to_lowercase().as_str()
        {   "openai" => Ok(Provider::OpenAi)
          , "xai" => Ok(Provider::Xai)
          , "generic-rest" | "generic" => Ok(Provider::GenericRest)
          , other => Err(Error::Configuration(
              format!("Unsupported provider: {}", other)
            ))
        }
    }
}

/// What `generate_text` does with a failed call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy
{   /// Log the failure and return it as `Err`
    #[default]
    Raise
  , /// Log the failure and return `GenerationResult::Failed`
    ReturnAsResult
}
