use serde::Serialize;
use serde_json::Value;
use log::{debug, warn};
use crate::error::Error;
use crate::request::GenerationRequest;

/// Returned when a generic endpoint answers without any text
pub const NO_TEXT_PLACEHOLDER: &str = "No text returned";

#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest
{   #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>
  , pub prompt: String
  , pub max_tokens: u32
  , pub temperature: f32
}

/// `POST {base_url}/generate` returning `{"text": ...}`. No incremental
/// delivery; streams fall back to one full-text chunk.
#[derive(Debug, Clone)]
pub struct GenericRest
{   endpoint: String
  , model: Option<String>
}

impl GenericRest
{   pub fn new(base_url: &str, model: Option<&str>) -> Self
    {   let endpoint = super::join_url(base_url, "generate");
        debug!("Generic REST endpoint {}", endpoint);
        GenericRest
        {   endpoint
          , model: model.map(str::to_string)
        }
    }
}

impl super::Dialect for GenericRest
{   fn endpoint(&self) -> &str
    {   &self.endpoint
    }

    fn build_body(&self, request: &GenerationRequest) -> Result<Value, Error>
    {   let body = GenerateRequest
        {   model: self.model.clone()
          , prompt: request.prompt.clone()
          , max_tokens: request.max_tokens
          , temperature: request.temperature
        };
        Ok(serde_json::to_value(body)?)
    }

    fn parse_response(&self, body: Value) -> Result<String, Error>
    {   let object = body.as_object()
          .ok_or_else(|| Error::MalformedResponse(
            format!("expected a JSON object, got {}", body)
          ))?;
        match object.get("text")
        {   Some(Value::String(text)) if !text.trim().is_empty() => {
              Ok(text.trim().to_string())
            }
          , Some(Value::String(_)) | Some(Value::Null) | None => {
              warn!("Response carried no text");
              Ok(NO_TEXT_PLACEHOLDER.to_string())
            }
          , Some(other) => Err(Error::MalformedResponse(
              format!("`text` is not a string: {}", other)
            ))
        }
    }
}
