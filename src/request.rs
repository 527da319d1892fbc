//! Per-call request and result types

use serde::{Deserialize, Serialize};
use crate::error::{Error, ErrorKind};

/// One generation call, resolved against the client defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest
{   /// The prompt text
    pub prompt: String
  , /// Sampling temperature
    pub temperature: f32
  , /// Max tokens to generate
    pub max_tokens: u32
  , /// Whether to ask the provider for incremental delivery
    pub stream: bool
}

impl GenerationRequest
{   /// Build a request, falling back to the defaults for absent overrides
    pub fn resolve(
      prompt: &str
    , temperature: Option<f32>
    , max_tokens: Option<u32>
    , defaults: &crate::config::ClientConfig
    ) -> Self
    {   GenerationRequest
        {   prompt: prompt.to_string()
          , temperature: temperature.unwrap_or(defaults.temperature)
          , max_tokens: max_tokens.unwrap_or(defaults.max_tokens)
          , stream: false
        }
    }

    pub fn streaming(mut self) -> Self
    {   self.stream = true;
        self
    }

    /// Reject requests that should never reach the transport
    pub fn validate(&self) -> Result<(), Error>
    {   if self.prompt.trim().is_empty()
        {   return Err(Error::InvalidRequest(
              "prompt must not be empty".to_string()
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature)
        {   return Err(Error::InvalidRequest(format!(
              "temperature {} outside 0.0..=2.0", self.temperature
            )));
        }
        if self.max_tokens == 0
        {   return Err(Error::InvalidRequest(
              "max_tokens must be positive".to_string()
            ));
        }
        Ok(())
    }
}

/// Outcome of one generation: trimmed text or a failure descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationResult
{   Text(String)
  , Failed
    {   kind: ErrorKind
      , message: String
    }
}

impl GenerationResult
{   pub fn is_ok(&self) -> bool
    {   matches!(self, GenerationResult::Text(_))
    }

    pub fn text(&self) -> Option<&str>
    {   match self
        {   GenerationResult::Text(text) => Some(text)
          , GenerationResult::Failed { .. } => None
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind>
    {   match self
        {   GenerationResult::Text(_) => None
          , GenerationResult::Failed { kind, .. } => Some(*kind)
        }
    }
}

impl From<&Error> for GenerationResult
{   fn from(e: &Error) -> Self
    {   GenerationResult::Failed
        {   kind: e.kind()
          , message: e.to_string()
        }
    }
}

impl std::fmt::Display for GenerationResult
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {   match self
        {   GenerationResult::Text(text) => f.write_str(text)
          , GenerationResult::Failed { kind, message } => {
              write!(f, "Error ({}): {}", kind, message)
            }
        }
    }
}
