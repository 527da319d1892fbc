//! API key wrapper that keeps the key out of logs and config dumps

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub const REDACTED: &str = "[REDACTED]";

/// Caller-supplied bearer key. Debug, Display and Serialize are redacted;
/// call `expose` to read it.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey
{   pub fn new(key: impl Into<String>) -> Self
    {   ApiKey(key.into())
    }

    pub fn expose(&self) -> &str
    {   &self.0
    }

    pub fn is_empty(&self) -> bool
    {   self.0.trim().is_empty()
    }
}

impl fmt::Debug for ApiKey
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   write!(f, "ApiKey({:?})", REDACTED)
    }
}

impl fmt::Display for ApiKey
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   f.write_str(REDACTED)
    }
}

impl From<String> for ApiKey
{   fn from(s: String) -> Self
    {   ApiKey(s)
    }
}

impl From<&str> for ApiKey
{   fn from(s: &str) -> Self
    {   ApiKey(s.to_string())
    }
}

impl Serialize for ApiKey
{   fn serialize<S: Serializer>(&self, serializer: S)
      -> Result<S::Ok, S::Error>
    {   serializer.serialize_str(REDACTED)
    }
}

impl<'de> Deserialize<'de> for ApiKey
{   fn deserialize<D: Deserializer<'de>>(deserializer: D)
      -> Result<Self, D::Error>
    {   String::deserialize(deserializer).map(ApiKey)
    }
}
