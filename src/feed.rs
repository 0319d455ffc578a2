//! Comment feed and reply sink seams.
//!
//! The bot only sees `CommentEvent`s pulled from a `CommentFeed` and hands
//! replies to a `ReplySink`. The bundled adapters speak JSON lines so a
//! feed can be piped in from any forum client:
//!
//! ```text
//! in:  {"id": "t1_abc", "author": "someone", "body": "!whois example.com"}
//! out: {"parent": "t1_abc", "body": "WHOIS for example.com ..."}
//! ```

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::sync::Mutex;
use tracing::error;

use crate::errors::{BotError, IoResultExt, Result};
use crate::formatter::FormattedMessage;

/// Opaque capability to answer one comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyHandle(String);

impl ReplyHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One incoming comment.
#[derive(Debug, Clone)]
pub struct CommentEvent {
    pub author: String,
    pub body: String,
    pub reply_to: ReplyHandle,
}

#[derive(Debug, Deserialize)]
struct WireComment {
    id: String,
    #[serde(default)]
    author: String,
    body: String,
}

impl From<WireComment> for CommentEvent {
    fn from(w: WireComment) -> Self {
        CommentEvent {
            author: w.author,
            body: w.body,
            reply_to: ReplyHandle::new(w.id),
        }
    }
}

#[derive(Debug, Serialize)]
struct WireReply<'a> {
    parent: &'a str,
    body: &'a str,
}

/// Source of comment events.
///
/// `None` means the feed is exhausted; an `Err` item is a single bad event
/// and does not end the feed.
#[async_trait]
pub trait CommentFeed: Send {
    async fn next_event(&mut self) -> Option<Result<CommentEvent>>;
}

/// Destination for replies.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn reply(&self, to: &ReplyHandle, message: &FormattedMessage) -> Result<()>;
}

/// Reads one JSON comment per line, skipping blank lines.
///
/// A line that is not a valid comment is reported and skipped. A read
/// failure ends the feed.
pub struct JsonLinesFeed<R> {
    lines: Lines<R>,
    line_no: usize,
    closed: bool,
}

impl<R: AsyncBufRead + Unpin + Send> JsonLinesFeed<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            closed: false,
        }
    }
}

impl JsonLinesFeed<BufReader<tokio::fs::File>> {
    pub async fn open(path: &Path) -> Result<Self> {
        let file = tokio::fs::File::open(path)
            .await
            .with_path(path.display().to_string(), "open feed")?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl JsonLinesFeed<BufReader<tokio::io::Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> CommentFeed for JsonLinesFeed<R> {
    async fn next_event(&mut self) -> Option<Result<CommentEvent>> {
        if self.closed {
            return None;
        }
        loop {
            let line = match self.lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) => {
                    error!(line = self.line_no + 1, "feed read failed, closing feed: {e}");
                    self.closed = true;
                    return None;
                }
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            return Some(
                serde_json::from_str::<WireComment>(&line)
                    .map(CommentEvent::from)
                    .map_err(|e| BotError::feed(self.line_no, e.to_string())),
            );
        }
    }
}

/// Writes one JSON reply per line and flushes after each.
pub struct JsonLinesSink<W> {
    out: Mutex<W>,
}

impl<W: AsyncWrite + Unpin + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            out: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl JsonLinesSink<tokio::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> ReplySink for JsonLinesSink<W> {
    async fn reply(&self, to: &ReplyHandle, message: &FormattedMessage) -> Result<()> {
        let mut line = serde_json::to_string(&WireReply {
            parent: to.as_str(),
            body: message.as_str(),
        })
        .map_err(|e| BotError::reply(to.as_str(), e))?;
        line.push('\n');

        let mut out = self.out.lock().await;
        out.write_all(line.as_bytes())
            .await
            .map_err(|e| BotError::reply(to.as_str(), e))?;
        out.flush().await.map_err(|e| BotError::reply(to.as_str(), e))
    }
}
