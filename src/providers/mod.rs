//! Provider strategies: request shaping and response parsing per API
//! variant, selected by the configured provider

pub mod generic;
pub mod openai;

pub use generic::GenericRest;
pub use openai::OpenAiCompletions;

use serde_json::Value;
use crate::config::ClientConfig;
use crate::error::Error;
use crate::request::GenerationRequest;
use crate::Provider;

pub trait Dialect: Send + Sync + std::fmt::Debug
{   /// Full URL requests are POSTed to
    fn endpoint(&self) -> &str;

    /// JSON body for one request
    fn build_body(&self, request: &GenerationRequest) -> Result<Value, Error>;

    /// Completion text from a non-streamed reply, already trimmed
    fn parse_response(&self, body: Value) -> Result<String, Error>;

    /// Whether the API can deliver text incrementally
    fn supports_streaming(&self) -> bool
    {   false
    }

    /// Text carried by one streamed event payload, if any
    fn parse_stream_event(&self, _data: &str) -> Result<Option<String>, Error>
    {   Err(Error::MalformedResponse(
          "provider does not stream".to_string()
        ))
    }
}

/// Pick the strategy for the configured provider
pub fn for_config(config: &ClientConfig) -> Result<Box<dyn Dialect>, Error>
{   let base_url = config.base_url.as_deref();
    let model = config.model.as_deref();
    let dialect: Box<dyn Dialect> = match config.provider
    {   Provider::OpenAi => Box::new(OpenAiCompletions::openai(base_url, model))
      , Provider::Xai => Box::new(OpenAiCompletions::xai(base_url, model))
      , Provider::GenericRest => {
          let url = base_url.ok_or_else(|| Error::Configuration(
            "generic-rest requires a base_url".to_string()
          ))?;
          Box::new(GenericRest::new(url, model))
        }
    };
    Ok(dialect)
}

pub(crate) fn join_url(base: &str, path: &str) -> String
{   format!("{}/{}", base.trim_end_matches('/'), path)
}
