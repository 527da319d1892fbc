//! HTTP boundary. The client only talks to a [`Transport`], so tests can
//! swap in scripted responses.

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use log::{debug, error, trace};
use serde_json::Value;
use std::pin::Pin;
use std::time::Duration;
use crate::error::Error;
use crate::secret::ApiKey;

/// Raw response body chunks, in delivery order
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, Error>> + Send>>;

#[async_trait]
pub trait Transport: Send + Sync
{   /// POST a JSON body and decode the JSON reply
    async fn post_json(
      &self
    , url: &str
    , api_key: &ApiKey
    , body: &Value
    ) -> Result<Value, Error>;

    /// POST a JSON body and hand back the reply body as it arrives
    async fn post_stream(
      &self
    , url: &str
    , api_key: &ApiKey
    , body: &Value
    ) -> Result<ByteStream, Error>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport
{   http_client: reqwest::Client
  , stream_client: reqwest::Client
  , timeout: Duration
}

impl HttpTransport
{   /// `timeout` bounds a whole non-streaming request, and the gap
    /// between two chunks of a streaming one
    pub fn new(timeout: Duration) -> Result<Self, Error>
    {   debug!("Creating HttpTransport, timeout {:?}", timeout);
        let http_client = reqwest::Client::builder()
          .timeout(timeout)
          .build()
          .map_err(|e| Error::Configuration(e.to_string()))?;
        let stream_client = reqwest::Client::builder()
          .connect_timeout(timeout)
          .build()
          .map_err(|e| Error::Configuration(e.to_string()))?;
        Ok(HttpTransport
        {   http_client
          , stream_client
          , timeout
        })
    }

    async fn send(
      &self
    , client: &reqwest::Client
    , url: &str
    , api_key: &ApiKey
    , body: &Value
    ) -> Result<reqwest::Response, Error>
    {   trace!("POST {} body: {}", url, body);

        let mut request = client
          .post(url)
          .header("Content-Type", "application/json")
          .json(body);
        if !api_key.is_empty()
        {   request = request.header(
              "Authorization",
              format!("Bearer {}", api_key.expose())
            );
        }

        let response = request
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error: {}", e);
            Error::from(e)
          })?;

        let status = response.status();
        trace!("Response status: {}", status);

        if !status.is_success()
        {   let error_text = response.text().await
              .unwrap_or_else(|_|
                "Unknown error".to_string()
              );
            error!("API error {}: {}", status, error_text);
            return Err(Error::from_status(status.as_u16(), error_text));
        }
        Ok(response)
    }
}

#[async_trait]
impl Transport for HttpTransport
{   async fn post_json(
      &self
    , url: &str
    , api_key: &ApiKey
    , body: &Value
    ) -> Result<Value, Error>
    {   let response = self
          .send(&self.http_client, url, api_key, body)
          .await?;
        response.json::<Value>().await.map_err(|e| {
          error!("Parse error: {}", e);
          if e.is_timeout()
          {   Error::from(e)
          } else
          {   Error::MalformedResponse(e.to_string())
          }
        })
    }

    async fn post_stream(
      &self
    , url: &str
    , api_key: &ApiKey
    , body: &Value
    ) -> Result<ByteStream, Error>
    {   let response = self
          .send(&self.stream_client, url, api_key, body)
          .await?;
        let idle = self.timeout;
        let body = Box::pin(response.bytes_stream());

        let chunks = futures::stream::unfold(
          Some(body),
          move |state| async move {
            let mut body = state?;
            match tokio::time::timeout(idle, body.next()).await
            {   Ok(Some(Ok(bytes))) => Some((Ok(bytes.to_vec()), Some(body)))
              , Ok(Some(Err(e))) => {
                  error!("Stream read error: {}", e);
                  Some((Err(Error::from(e)), None))
                }
              , Ok(None) => None
              , Err(_) => {
                  error!("No stream data for {:?}", idle);
                  Some((
                    Err(Error::transport(
                      format!("no data received for {:?}", idle),
                      true
                    )),
                    None
                  ))
                }
            }
          }
        );
        Ok(Box::pin(chunks))
    }
}
