#![allow(dead_code)]

use async_trait::async_trait;
use futures::channel::mpsc;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use sllm::{ApiKey, ByteStream, ClientConfig, Error, LlmClient, Provider, Transport};

type Responder = Box<dyn FnMut(&Value) -> Result<Value, Error> + Send>;

/// Scripted transport: JSON replies come from a closure, stream replies
/// from a queue of prepared byte streams
pub struct MockTransport
{   responder: Mutex<Responder>
  , streams: Mutex<VecDeque<Result<ByteStream, Error>>>
  , pub bodies: Mutex<Vec<Value>>
  , pub urls: Mutex<Vec<String>>
  , pub calls: AtomicUsize
}

impl MockTransport
{   pub fn new(
      responder: impl FnMut(&Value) -> Result<Value, Error> + Send + 'static
    ) -> Arc<Self>
    {   Arc::new(MockTransport
        {   responder: Mutex::new(Box::new(responder))
          , streams: Mutex::new(VecDeque::new())
          , bodies: Mutex::new(Vec::new())
          , urls: Mutex::new(Vec::new())
          , calls: AtomicUsize::new(0)
        })
    }

    /// Echo the prompt back as an OpenAI-style completion
    pub fn echo() -> Arc<Self>
    {   Self::new(|body| Ok(completion(&format!(
          "  echo: {}\n", body["prompt"].as_str().unwrap_or_default()
        ))))
    }

    pub fn push_stream(&self, stream: Result<ByteStream, Error>)
    {   self.streams.lock().unwrap().push_back(stream);
    }

    pub fn calls(&self) -> usize
    {   self.calls.load(Ordering::SeqCst)
    }

    fn note(&self, url: &str, body: &Value)
    {   self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());
        self.bodies.lock().unwrap().push(body.clone());
    }
}

#[async_trait]
impl Transport for MockTransport
{   async fn post_json(
      &self
    , url: &str
    , _api_key: &ApiKey
    , body: &Value
    ) -> Result<Value, Error>
    {   self.note(url, body);
        (self.responder.lock().unwrap())(body)
    }

    async fn post_stream(
      &self
    , url: &str
    , _api_key: &ApiKey
    , body: &Value
    ) -> Result<ByteStream, Error>
    {   self.note(url, body);
        self.streams.lock().unwrap()
          .pop_front()
          .unwrap_or_else(|| Err(Error::transport("no stream scripted", false)))
    }
}

pub fn completion(text: &str) -> Value
{   json!({ "choices": [{ "text": text, "finish_reason": "stop" }] })
}

pub fn sse_chunk(text: &str) -> Vec<u8>
{   format!("data: {}\n\n", json!({ "choices": [{ "text": text }] })).into_bytes()
}

pub fn sse_done() -> Vec<u8>
{   b"data: [DONE]\n\n".to_vec()
}

/// Byte stream fed by the test through the returned sender
pub fn channel_stream()
  -> (mpsc::UnboundedSender<Result<Vec<u8>, Error>>, ByteStream)
{   let (tx, rx) = mpsc::unbounded();
    (tx, Box::pin(rx))
}

pub fn iter_stream(items: Vec<Result<Vec<u8>, Error>>) -> ByteStream
{   Box::pin(futures::stream::iter(items))
}

pub fn openai_client(
  transport: Arc<MockTransport>
, tweak: impl FnOnce(sllm::ClientConfigBuilder) -> sllm::ClientConfigBuilder
) -> LlmClient
{   init_logging();
    let builder = ClientConfig::builder("sk-test-key", Provider::OpenAi);
    let config = tweak(builder).build().unwrap();
    LlmClient::with_transport(config, transport).unwrap()
}

pub fn generic_client(transport: Arc<MockTransport>) -> LlmClient
{   init_logging();
    let config = ClientConfig::builder("", Provider::GenericRest)
      .base_url("http://localhost:8080")
      .build()
      .unwrap();
    LlmClient::with_transport(config, transport).unwrap()
}

pub fn init_logging()
{   let _ = env_logger::builder().is_test(true).try_init();
}
