//! Lazy, non-restartable stream of generated text

use eventsource_stream::{EventStream, EventStreamError, Eventsource};
use futures::{Stream, StreamExt};
use log::Level;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use crate::client::ClientInner;
use crate::error::Error;
use crate::journal::CallRecord;
use crate::transport::ByteStream;

/// OpenAI-style end-of-stream marker
const DONE_MARKER: &str = "[DONE]";

/// Text fragments in delivery order. Fragment boundaries carry no meaning.
/// A transport failure yields one `Err` and ends the stream; dropping the
/// stream cancels the request.
pub struct TextStream
{   inner: Pin<Box<dyn Stream<Item = Result<String, Error>> + Send>>
}

impl TextStream
{   pub(crate) fn start(client: Arc<ClientInner>, record: CallRecord) -> Self
    {   let state = StreamState
        {   client
          , record
          , phase: Phase::Pending
        };
        TextStream
        {   inner: Box::pin(futures::stream::unfold(state, next_chunk).fuse())
        }
    }

    /// Drain the stream into one string, stopping at the first error
    pub async fn collect_text(mut self) -> Result<String, Error>
    {   let mut text = String::new();
        while let Some(chunk) = self.next().await
        {   text.push_str(&chunk?);
        }
        Ok(text)
    }
}

impl Stream for TextStream
{   type Item = Result<String, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>)
      -> Poll<Option<Self::Item>>
    {   self.inner.as_mut().poll_next(cx)
    }
}

impl std::fmt::Debug for TextStream
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {   f.debug_struct("TextStream").finish_non_exhaustive()
    }
}

struct StreamState
{   client: Arc<ClientInner>
  , record: CallRecord
  , phase: Phase
}

enum Phase
{   /// Nothing sent yet
    Pending
  , Open(EventStream<ByteStream>)
  , Done
}

fn event_error(e: EventStreamError<Error>) -> Error
{   match e
    {   EventStreamError::Transport(e) => e
      , other => Error::MalformedResponse(other.to_string())
    }
}

impl StreamState
{   fn fail(&mut self, e: Error) -> Result<String, Error>
    {   self.client.journal.event(
          Level::Error,
          &format!("Error in streaming request {}: {}", self.record.id(), e)
        );
        self.record.finish(Err(&e));
        Err(e)
    }

    /// Body ended or `[DONE]` seen
    fn finish(&mut self)
    {   self.record.finish_collected();
        self.client.journal.event(
          Level::Info,
          &format!("Finished streaming request {}", self.record.id())
        );
    }
}

async fn next_chunk(mut state: StreamState)
  -> Option<(Result<String, Error>, StreamState)>
{   let client = state.client.clone();
    let id = state.record.id();

    loop
    { match std::mem::replace(&mut state.phase, Phase::Done)
      {   Phase::Done => return None
        , Phase::Pending if !client.dialect.supports_streaming() => {
            // one element holding the full text
            let item = match client.complete(&mut state.record).await
            {   Ok(text) => {
                  client.journal.event(
                    Level::Info,
                    &format!("Non-streaming fallback for request {}", id)
                  );
                  state.record.finish(Ok(&text));
                  Ok(text)
                }
              , Err(e) => state.fail(e)
            };
            return Some((item, state));
          }
        , Phase::Pending => {
            match client.open_stream(&mut state.record).await
            {   Ok(body) => {
                  state.phase = Phase::Open(body.eventsource());
                }
              , Err(e) => {
                  let item = state.fail(e);
                  return Some((item, state));
                }
            }
          }
        , Phase::Open(mut events) => {
            let event = match events.next().await
            {   Some(Ok(event)) => event
              , Some(Err(e)) => {
                  let item = state.fail(event_error(e));
                  return Some((item, state));
                }
              , None => {
                  state.finish();
                  return None;
                }
            };

            if event.data.trim() == DONE_MARKER
            {   state.finish();
                return None;
            }
            if event.data.is_empty()
            {   state.phase = Phase::Open(events);
                continue;
            }
            match client.dialect.parse_stream_event(&event.data)
            {   Ok(Some(chunk)) => {
                  state.record.append(&chunk);
                  client.journal.event(
                    Level::Debug,
                    &format!("Received stream chunk for request {}", id)
                  );
                  state.phase = Phase::Open(events);
                  return Some((Ok(chunk), state));
                }
              , Ok(None) => state.phase = Phase::Open(events)
              , Err(e) => {
                  let item = state.fail(e);
                  return Some((item, state));
                }
            }
          }
      }
    }
}
