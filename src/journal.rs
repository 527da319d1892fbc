//! Interaction log sinks: structured in-memory entries and an
//! append-only text file, owned per client

use chrono::{DateTime, SecondsFormat, Utc};
use log::{log, warn, Level};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use crate::error::{Error, ErrorKind};

/// Characters of the prompt shown in file log lines
pub const PREVIEW_CHARS: usize = 50;

/// One record per top-level call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry
{   /// Call counter value, for correlation with file log lines
    pub id: u64
  , pub timestamp: DateTime<Utc>
  , pub prompt: String
  , /// Generated text, or the error message on failure
    pub response: String
  , pub max_tokens: u32
  , pub temperature: f32
  , pub success: bool
  , pub kind: Option<ErrorKind>
  , /// Backoff delays slept before retries, in milliseconds
    #[serde(default)]
    pub retry_delays_ms: Vec<u64>
}

impl LogEntry
{   pub fn new(
      id: u64
    , request: &crate::request::GenerationRequest
    , outcome: Result<&str, &Error>
    ) -> Self
    {   let (response, success, kind) = match outcome
        {   Ok(text) => (text.to_string(), true, None)
          , Err(e) => (e.to_string(), false, Some(e.kind()))
        };
        LogEntry
        {   id
          , timestamp: Utc::now()
          , prompt: request.prompt.clone()
          , response
          , max_tokens: request.max_tokens
          , temperature: request.temperature
          , success
          , kind
          , retry_delays_ms: Vec::new()
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T>
{   m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Caller-readable list of entries, never pruned automatically
#[derive(Debug, Clone, Default)]
pub struct InteractionLog
{   entries: Arc<Mutex<Vec<LogEntry>>>
}

impl InteractionLog
{   pub fn new() -> Self
    {   Self::default()
    }

    pub fn push(&self, entry: LogEntry)
    {   lock(&self.entries).push(entry);
    }

    /// Snapshot of all entries in call order
    pub fn entries(&self) -> Vec<LogEntry>
    {   lock(&self.entries).clone()
    }

    pub fn len(&self) -> usize
    {   lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool
    {   self.len() == 0
    }

    pub fn clear(&self)
    {   lock(&self.entries).clear();
    }
}

/// Append-only text log, one `<timestamp> - <LEVEL> - <message>` line per event
#[derive(Debug, Clone)]
pub struct FileLog
{   path: PathBuf
  , writer: Arc<Mutex<BufWriter<File>>>
}

impl FileLog
{   pub fn open(path: impl AsRef<Path>) -> Result<Self, Error>
    {   let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
          .create(true)
          .append(true)
          .open(&path)
          .map_err(|e| Error::Configuration(
            format!("cannot open log file {}: {}", path.display(), e)
          ))?;
        Ok(FileLog
        {   path
          , writer: Arc::new(Mutex::new(BufWriter::new(file)))
        })
    }

    pub fn path(&self) -> &Path
    {   &self.path
    }

    pub fn write(&self, level: Level, message: &str)
    {   let line = format!(
          "{} - {} - {}\n",
          Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
          level,
          message
        );
        let mut writer = lock(&self.writer);
        if let Err(e) = writer.write_all(line.as_bytes())
          .and_then(|_| writer.flush())
        {   warn!("Failed to write {}: {}", self.path.display(), e);
        }
    }

    pub fn flush(&self)
    {   if let Err(e) = lock(&self.writer).flush()
        {   warn!("Failed to flush {}: {}", self.path.display(), e);
        }
    }
}

/// Both sinks behind one handle; the client and its streams share it
#[derive(Debug, Clone)]
pub struct Journal
{   memory: Option<InteractionLog>
  , file: Option<FileLog>
}

impl Journal
{   pub fn from_config(config: &crate::config::LogConfig) -> Result<Self, Error>
    {   let file = match &config.file
        {   Some(path) => Some(FileLog::open(path)?)
          , None => None
        };
        Ok(Journal
        {   memory: config.memory.then(InteractionLog::new)
          , file
        })
    }

    /// Free-text event: goes to the file sink and the `log` facade
    pub fn event(&self, level: Level, message: &str)
    {   log!(target: "sllm", level, "{}", message);
        if let Some(file) = &self.file
        {   file.write(level, message);
        }
    }

    pub fn record(&self, entry: LogEntry)
    {   if let Some(memory) = &self.memory
        {   memory.push(entry);
        }
    }

    pub fn entries(&self) -> Vec<LogEntry>
    {   self.memory.as_ref().map(|m| m.entries()).unwrap_or_default()
    }

    pub fn len(&self) -> usize
    {   self.memory.as_ref().map_or(0, |m| m.len())
    }

    pub fn clear(&self)
    {   if let Some(memory) = &self.memory
        {   memory.clear();
        }
    }

    pub fn file_path(&self) -> Option<&Path>
    {   self.file.as_ref().map(|f| f.path())
    }

    pub fn flush(&self)
    {   if let Some(file) = &self.file
        {   file.flush();
        }
    }
}

/// Pending entry for one call. Exactly one entry is recorded: by `finish`,
/// or as `Cancelled` when the call is dropped before finishing.
#[derive(Debug)]
pub struct CallRecord
{   journal: Journal
  , id: u64
  , request: crate::request::GenerationRequest
  , collected: String
  , delays: Vec<Duration>
  , finished: bool
}

impl CallRecord
{   pub fn new(
      journal: Journal
    , id: u64
    , request: crate::request::GenerationRequest
    ) -> Self
    {   CallRecord
        {   journal
          , id
          , request
          , collected: String::new()
          , delays: Vec::new()
          , finished: false
        }
    }

    pub fn id(&self) -> u64
    {   self.id
    }

    pub fn request(&self) -> &crate::request::GenerationRequest
    {   &self.request
    }

    pub fn add_delays(&mut self, delays: &[Duration])
    {   self.delays.extend_from_slice(delays);
    }

    /// Accumulate streamed text for the final entry
    pub fn append(&mut self, chunk: &str)
    {   self.collected.push_str(chunk);
    }

    pub fn finish(&mut self, outcome: Result<&str, &Error>)
    {   if self.finished
        {   return;
        }
        self.finished = true;
        let mut entry = LogEntry::new(self.id, &self.request, outcome);
        entry.retry_delays_ms = self.delays.iter()
          .map(|d| d.as_millis() as u64)
          .collect();
        self.journal.record(entry);
    }

    pub fn finish_collected(&mut self)
    {   let text = std::mem::take(&mut self.collected);
        self.finish(Ok(&text));
        self.collected = text;
    }
}

impl Drop for CallRecord
{   fn drop(&mut self)
    {   if !self.finished
        {   self.journal.event(
              Level::Warn,
              &format!("Request {} cancelled", self.id)
            );
            self.finish(Err(&Error::Cancelled));
        }
    }
}

/// First `PREVIEW_CHARS` characters of a prompt, for log lines
pub fn preview(prompt: &str) -> String
{   let cut: String = prompt.chars().take(PREVIEW_CHARS).collect();
    format!("{}...", cut)
}
