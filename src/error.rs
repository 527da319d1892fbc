use serde::{Deserialize, Serialize};
use std::fmt;

/// Error type for sllm operations
/// Implements Clone so failures can be copied into log entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// Bad client configuration, raised at construction
    Configuration(String)
  , /// Prompt or per-call override rejected before dispatch
    InvalidRequest(String)
  , /// Network or HTTP failure
    Transport
    {   status: Option<u16>
      , message: String
      , retryable: bool
    }
  , /// Response body did not have the expected shape
    MalformedResponse(String)
  , /// Stream dropped by the caller before it finished
    Cancelled
}

/// Fieldless mirror of [`Error`], carried by failed results and log entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind
{   Configuration
  , InvalidRequest
  , Transport
  , MalformedResponse
  , Cancelled
}

impl Error
{   /// Shorthand for a transport error that carries no HTTP status
    pub fn transport(message: impl Into<String>, retryable: bool) -> Self
    {   Error::Transport
        {   status: None
          , message: message.into()
          , retryable
        }
    }

    /// Classify an HTTP status; 429 and 5xx are worth retrying
    pub fn from_status(status: u16, body: impl Into<String>) -> Self
    {   Error::Transport
        {   status: Some(status)
          , message: body.into()
          , retryable: status == 429 || (500..600).contains(&status)
        }
    }

    pub fn kind(&self) -> ErrorKind
    {   match self
        {   Error::Configuration(_) => ErrorKind::Configuration
          , Error::InvalidRequest(_) => ErrorKind::InvalidRequest
          , Error::Transport { .. } => ErrorKind::Transport
          , Error::MalformedResponse(_) => ErrorKind::MalformedResponse
          , Error::Cancelled => ErrorKind::Cancelled
        }
    }

    pub fn is_retryable(&self) -> bool
    {   matches!(self, Error::Transport { retryable: true, .. })
    }
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::Configuration(msg) => {
              write!(f, "Configuration error: {}", msg)
            }
          , Error::InvalidRequest(msg) => {
              write!(f, "Invalid request: {}", msg)
            }
          , Error::Transport { status: Some(status), message, .. } => {
              write!(f, "Transport error (HTTP {}): {}", status, message)
            }
          , Error::Transport { status: None, message, .. } => {
              write!(f, "Transport error: {}", message)
            }
          , Error::MalformedResponse(msg) => {
              write!(f, "Malformed response: {}", msg)
            }
          , Error::Cancelled => {
              write!(f, "Request cancelled")
            }
        }
    }
}

impl fmt::Display for ErrorKind
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   let name = match self
        {   ErrorKind::Configuration => "ConfigurationError"
          , ErrorKind::InvalidRequest => "InvalidRequest"
          , ErrorKind::Transport => "TransportError"
          , ErrorKind::MalformedResponse => "MalformedResponse"
          , ErrorKind::Cancelled => "Cancelled"
        };
        f.write_str(name)
    }
}

impl std::error::Error for Error {}

impl From<reqwest::Error> for Error
{   fn from(e: reqwest::Error) -> Self
    {   if let Some(status) = e.status()
        {   return Error::from_status(status.as_u16(), e.to_string());
        }
        if e.is_decode()
        {   return Error::MalformedResponse(e.to_string());
        }
        let retryable = e.is_timeout() || e.is_connect();
        Error::transport(e.to_string(), retryable)
    }
}

impl From<serde_json::Error> for Error
{   fn from(e: serde_json::Error) -> Self
    {   Error::MalformedResponse(e.to_string())
    }
}
