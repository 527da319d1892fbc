use serde::{Deserialize, Serialize};
use serde_json::Value;
use log::{debug, error};
use crate::error::Error;
use crate::request::GenerationRequest;

pub const OPENAI_API_BASE: &str
  = "https://api.openai.com/v1";
pub const XAI_API_BASE: &str
  = "https://api.x.ai/v1";

pub const OPENAI_DEFAULT_MODEL: &str = "gpt-3.5-turbo-instruct";
pub const XAI_DEFAULT_MODEL: &str = "grok-3";

// ===== Wire Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest
{   pub model: String
  , pub prompt: String
  , pub max_tokens: u32
  , pub temperature: f32
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse
{   pub choices: Vec<Choice>
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice
{   #[serde(default)]
    pub text: Option<String>
}

// ===== Strategy =====

/// OpenAI-style `/completions` API, also spoken by xAI
#[derive(Debug, Clone)]
pub struct OpenAiCompletions
{   endpoint: String
  , model: String
}

impl OpenAiCompletions
{   pub fn new(base_url: &str, model: &str) -> Self
    {   let endpoint = super::join_url(base_url, "completions");
        debug!("OpenAI-style completions at {} with {}", endpoint, model);
        OpenAiCompletions
        {   endpoint
          , model: model.to_string()
        }
    }

    pub fn openai(base_url: Option<&str>, model: Option<&str>) -> Self
    {   Self::new(
          base_url.unwrap_or(OPENAI_API_BASE),
          model.unwrap_or(OPENAI_DEFAULT_MODEL)
        )
    }

    pub fn xai(base_url: Option<&str>, model: Option<&str>) -> Self
    {   Self::new(
          base_url.unwrap_or(XAI_API_BASE),
          model.unwrap_or(XAI_DEFAULT_MODEL)
        )
    }

    pub fn model(&self) -> &str
    {   &self.model
    }
}

impl super::Dialect for OpenAiCompletions
{   fn endpoint(&self) -> &str
    {   &self.endpoint
    }

    fn build_body(&self, request: &GenerationRequest) -> Result<Value, Error>
    {   let body = CompletionRequest
        {   model: self.model.clone()
          , prompt: request.prompt.clone()
          , max_tokens: request.max_tokens
          , temperature: request.temperature
          , stream: request.stream.then_some(true)
        };
        Ok(serde_json::to_value(body)?)
    }

    fn parse_response(&self, body: Value) -> Result<String, Error>
    {   let response: CompletionResponse = serde_json::from_value(body)?;
        let choice = response.choices.first()
          .ok_or_else(|| {
            error!("No choices in response");
            Error::MalformedResponse(
              "API response contained no choices".to_string()
            )
          })?;
        let text = choice.text.as_deref().unwrap_or("").trim();
        if text.is_empty()
        {   return Err(Error::MalformedResponse(
              "first choice has no text".to_string()
            ));
        }
        Ok(text.to_string())
    }

    fn supports_streaming(&self) -> bool
    {   true
    }

    fn parse_stream_event(&self, data: &str) -> Result<Option<String>, Error>
    {   let chunk: CompletionResponse = serde_json::from_str(data)?;
        Ok(chunk.choices
          .into_iter()
          .next()
          .and_then(|c| c.text)
          .filter(|t| !t.is_empty()))
    }
}
