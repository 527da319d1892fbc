use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use log::{debug, Level};
use crate::config::ClientConfig;
use crate::error::Error;
use crate::journal::{preview, CallRecord, Journal, LogEntry};
use crate::providers::Dialect;
use crate::rate_limit::RateLimiter;
use crate::request::{GenerationRequest, GenerationResult};
use crate::retry::RetryPolicy;
use crate::stream::TextStream;
use crate::transport::{ByteStream, HttpTransport, Transport};
use crate::{ErrorPolicy, Provider};

/// Capability shared by every text-generation backend
#[async_trait]
pub trait TextGenerationProvider: Send + Sync
{   async fn generate(
      &self
    , prompt: &str
    , temperature: Option<f32>
    , max_tokens: Option<u32>
    ) -> Result<GenerationResult, Error>;

    async fn generate_batch(
      &self
    , prompts: &[String]
    , temperature: Option<f32>
    , max_tokens: Option<u32>
    ) -> Vec<GenerationResult>;

    fn stream_generate(
      &self
    , prompt: &str
    , temperature: Option<f32>
    , max_tokens: Option<u32>
    ) -> TextStream;
}

/// State shared between the client and the streams it hands out
pub(crate) struct ClientInner
{   pub(crate) config: ClientConfig
  , pub(crate) dialect: Box<dyn Dialect>
  , pub(crate) journal: Journal
  , transport: Arc<dyn Transport>
  , limiter: RateLimiter
  , retry: RetryPolicy
  , call_count: AtomicU64
}

impl ClientInner
{   fn next_id(&self) -> u64
    {   self.call_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn begin(&self, request: GenerationRequest) -> CallRecord
    {   CallRecord::new(self.journal.clone(), self.next_id(), request)
    }

    async fn permit(&self, id: u64)
    {   let waited = self.limiter.acquire().await;
        if waited > Duration::ZERO
        {   self.journal.event(
              Level::Info,
              &format!("Rate limit reached, request {} waited {:?}", id, waited)
            );
        }
    }

    fn retry_notice(&self, id: u64, attempt: u32, e: &Error, delay: Duration)
    {   self.journal.event(
          Level::Warn,
          &format!(
            "Retrying request {} after attempt {}/{} failed ({}), backing off {:?}",
            id, attempt, self.retry.max_attempts, e, delay
          )
        );
    }

    /// One non-streamed completion: rate limit and retry around the
    /// transport call, then response parsing
    pub(crate) async fn complete(&self, record: &mut CallRecord)
      -> Result<String, Error>
    {   let id = record.id();
        match self.dispatch(record).await
        {   Ok(text) => {
              self.journal.event(
                Level::Info,
                &format!("Received response for request {}", id)
              );
              Ok(text)
            }
          , Err(e) => {
              self.journal.event(
                Level::Error,
                &format!("Error in request {}: {}", id, e)
              );
              Err(e)
            }
        }
    }

    async fn dispatch(&self, record: &mut CallRecord)
      -> Result<String, Error>
    {   let id = record.id();
        self.journal.event(
          Level::Info,
          &format!("Sending request {}: {}", id, preview(&record.request().prompt))
        );
        record.request().validate()?;
        let body = self.dialect.build_body(record.request())?;

        let endpoint = self.dialect.endpoint();
        let api_key = &self.config.api_key;
        let body = &body;
        let retried = self.retry
          .run(
            |_| async move {
              self.permit(id).await;
              self.transport.post_json(endpoint, api_key, body).await
            },
            |attempt, e, delay| self.retry_notice(id, attempt, e, delay)
          )
          .await;
        record.add_delays(&retried.delays);
        self.dialect.parse_response(retried.result?)
    }

    /// Open an incremental response; retries only cover getting the
    /// first byte, never a stream that has started delivering
    pub(crate) async fn open_stream(&self, record: &mut CallRecord)
      -> Result<ByteStream, Error>
    {   let id = record.id();
        self.journal.event(
          Level::Info,
          &format!("Streaming request {}: {}", id, preview(&record.request().prompt))
        );
        record.request().validate()?;
        let body = self.dialect.build_body(record.request())?;

        let endpoint = self.dialect.endpoint();
        let api_key = &self.config.api_key;
        let body = &body;
        let retried = self.retry
          .run(
            |_| async move {
              self.permit(id).await;
              self.transport.post_stream(endpoint, api_key, body).await
            },
            |attempt, e, delay| self.retry_notice(id, attempt, e, delay)
          )
          .await;
        record.add_delays(&retried.delays);
        retried.result
    }
}

/// LLM client: one per provider configuration, owning its own counter,
/// log and rate-limit window
pub struct LlmClient
{   inner: Arc<ClientInner>
}

impl LlmClient
{   /// Create a client that talks HTTP
    pub fn new(config: ClientConfig) -> Result<Self, Error>
    {   let transport = HttpTransport::new(
          Duration::from_secs(config.timeout_secs)
        )?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a client over any transport
    pub fn with_transport(
      config: ClientConfig
    , transport: Arc<dyn Transport>
    ) -> Result<Self, Error>
    {   config.validate()?;
        let dialect = crate::providers::for_config(&config)?;
        let journal = Journal::from_config(&config.log)?;
        let limiter = RateLimiter::from_config(&config.rate_limit);
        let retry = RetryPolicy::from_config(&config.retry);

        journal.event(
          Level::Info,
          &format!("Initialized LlmClient for {}", config.provider)
        );
        debug!("LlmClient endpoint: {}", dialect.endpoint());

        Ok(LlmClient
        {   inner: Arc::new(ClientInner
            {   config
              , dialect
              , journal
              , transport
              , limiter
              , retry
              , call_count: AtomicU64::new(0)
            })
        })
    }

    /// Load a JSON config file and create an HTTP client from it
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Error>
    {   Self::new(ClientConfig::from_json_file(path)?)
    }

    pub fn config(&self) -> &ClientConfig
    {   &self.inner.config
    }

    pub fn provider(&self) -> Provider
    {   self.inner.config.provider
    }

    /// Top-level calls made so far; not reset by `clear_log`
    pub fn call_count(&self) -> u64
    {   self.inner.call_count.load(Ordering::SeqCst)
    }

    /// Snapshot of the in-memory interaction log
    pub fn log_entries(&self) -> Vec<LogEntry>
    {   self.inner.journal.entries()
    }

    pub fn clear_log(&self)
    {   debug!("Clearing {} log entries", self.inner.journal.len());
        self.inner.journal.clear();
    }

    pub fn log_file(&self) -> Option<&Path>
    {   self.inner.journal.file_path()
    }

    /// Generate text for one prompt. `None` overrides fall back to the
    /// configured defaults. Failures are logged, then returned as `Err`
    /// or as `GenerationResult::Failed` depending on the error policy.
    pub async fn generate_text(
      &self
    , prompt: &str
    , temperature: Option<f32>
    , max_tokens: Option<u32>
    ) -> Result<GenerationResult, Error>
    {   let request = GenerationRequest::resolve(
          prompt, temperature, max_tokens, &self.inner.config
        );
        let mut record = self.inner.begin(request);
        let outcome = self.inner.complete(&mut record).await;

        match outcome
        {   Ok(text) => {
              record.finish(Ok(&text));
              Ok(GenerationResult::Text(text))
            }
          , Err(e) => {
              record.finish(Err(&e));
              match self.inner.config.error_policy
              {   ErrorPolicy::Raise => Err(e)
                , ErrorPolicy::ReturnAsResult => Ok(GenerationResult::from(&e))
              }
            }
        }
    }

    /// Generate for each prompt in order, one at a time. Never fails as a
    /// whole: an item's error becomes a `Failed` result at its index.
    pub async fn batch_generate<S: AsRef<str>>(
      &self
    , prompts: &[S]
    , temperature: Option<f32>
    , max_tokens: Option<u32>
    ) -> Vec<GenerationResult>
    {   let total = prompts.len();
        let journal = &self.inner.journal;
        journal.event(
          Level::Info,
          &format!("Starting batch processing for {} prompts", total)
        );

        let mut results = Vec::with_capacity(total);
        for (i, prompt) in prompts.iter().enumerate()
        {   let result = match self
              .generate_text(prompt.as_ref(), temperature, max_tokens)
              .await
            {   Ok(result) => result
              , Err(e) => GenerationResult::from(&e)
            };
            match &result
            {   GenerationResult::Text(_) => journal.event(
                  Level::Info,
                  &format!("Completed prompt {}/{}", i + 1, total)
                )
              , GenerationResult::Failed { message, .. } => journal.event(
                  Level::Error,
                  &format!("Failed prompt {}: {}", i + 1, message)
                )
            }
            results.push(result);
        }

        journal.event(
          Level::Info,
          &format!("Finished batch processing: {} results", results.len())
        );
        results
    }

    /// Lazily stream generated text. Nothing is sent until the stream is
    /// first polled; dropping it cancels the request.
    pub fn stream_text(
      &self
    , prompt: &str
    , temperature: Option<f32>
    , max_tokens: Option<u32>
    ) -> TextStream
    {   let mut request = GenerationRequest::resolve(
          prompt, temperature, max_tokens, &self.inner.config
        );
        if self.inner.dialect.supports_streaming()
        {   request = request.streaming();
        }
        let record = self.inner.begin(request);
        TextStream::start(self.inner.clone(), record)
    }

    /// Flush the file log and drop the client
    pub fn shutdown(self)
    {   self.inner.journal.event(
          Level::Info,
          &format!("Shutting down LlmClient after {} calls", self.call_count())
        );
        self.inner.journal.flush();
    }
}

impl std::fmt::Debug for LlmClient
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {   f.debug_struct("LlmClient")
          .field("provider", &self.inner.config.provider)
          .field("endpoint", &self.inner.dialect.endpoint())
          .field("calls", &self.call_count())
          .finish()
    }
}

#[async_trait]
impl TextGenerationProvider for LlmClient
{   async fn generate(
      &self
    , prompt: &str
    , temperature: Option<f32>
    , max_tokens: Option<u32>
    ) -> Result<GenerationResult, Error>
    {   self.generate_text(prompt, temperature, max_tokens).await
    }

    async fn generate_batch(
      &self
    , prompts: &[String]
    , temperature: Option<f32>
    , max_tokens: Option<u32>
    ) -> Vec<GenerationResult>
    {   self.batch_generate(prompts, temperature, max_tokens).await
    }

    fn stream_generate(
      &self
    , prompt: &str
    , temperature: Option<f32>
    , max_tokens: Option<u32>
    ) -> TextStream
    {   self.stream_text(prompt, temperature, max_tokens)
    }
}
