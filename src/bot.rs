//! Event loop tying the pipeline stages together.
//!
//! Each comment runs to completion before the next one is pulled:
//!   1. Filter (trigger present, author not excluded)
//!   2. Domain extraction
//!   3. Lookup with primary deadline and secondary fallback
//!   4. Formatting
//!   5. Reply
//!
//! Lookup failures end the current comment without a reply. Nothing a
//! single comment does stops the loop.

use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::config::Config;
use crate::domain_utils::{extract_domain, tokenize};
use crate::errors::Result;
use crate::feed::{CommentEvent, CommentFeed, ReplySink};
use crate::formatter::RecordFormatter;
use crate::lookup::{LookupOrchestrator, Provenance};

/// Why a comment was not considered at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NoTrigger,
    ExcludedAuthor,
}

/// What happened to one comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Replied {
        domain: String,
        provenance: Provenance,
    },
    Ignored(IgnoreReason),
}

/// Counters reported when the feed ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub seen: u64,
    pub replied: u64,
    pub ignored: u64,
    pub dropped: u64,
    pub malformed: u64,
}

pub struct WhoisBot<S> {
    config: Config,
    orchestrator: LookupOrchestrator,
    formatter: RecordFormatter,
    sink: S,
}

impl<S: ReplySink> WhoisBot<S> {
    pub fn new(
        config: Config,
        orchestrator: LookupOrchestrator,
        formatter: RecordFormatter,
        sink: S,
    ) -> Self {
        Self {
            config,
            orchestrator,
            formatter,
            sink,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Cheap pre-filter run before any parsing.
    pub fn screen(&self, event: &CommentEvent) -> Option<IgnoreReason> {
        let trigger = self.config.bot.trigger.to_ascii_lowercase();
        if !event.body.to_ascii_lowercase().contains(&trigger) {
            return Some(IgnoreReason::NoTrigger);
        }
        if self.config.is_excluded_author(&event.author) {
            return Some(IgnoreReason::ExcludedAuthor);
        }
        None
    }

    /// Run the whole pipeline for one comment.
    pub async fn handle(&self, event: CommentEvent) -> Result<Outcome> {
        if let Some(reason) = self.screen(&event) {
            return Ok(Outcome::Ignored(reason));
        }

        let tokens = tokenize(&event.body);
        let domain = extract_domain(&tokens, &self.config.bot.trigger)?;
        debug!(%domain, "extracted domain");

        let result = self.orchestrator.resolve(&domain).await?;
        let message = self.formatter.format(&result)?;
        self.sink.reply(&event.reply_to, &message).await?;

        info!(%domain, provenance = %result.provenance, "replied");
        Ok(Outcome::Replied {
            domain: domain.as_str().to_string(),
            provenance: result.provenance,
        })
    }

    /// Drain the feed, one comment at a time.
    pub async fn run<F: CommentFeed>(&self, feed: &mut F) -> RunStats {
        let mut stats = RunStats::default();

        while let Some(item) = feed.next_event().await {
            let event = match item {
                Ok(event) => event,
                Err(e) => {
                    warn!(category = %e.category(), "skipping feed entry: {e}");
                    stats.malformed += 1;
                    continue;
                }
            };
            stats.seen += 1;

            let span = info_span!("comment", parent = %event.reply_to.as_str());
            match self.handle(event).instrument(span).await {
                Ok(Outcome::Replied { .. }) => stats.replied += 1,
                Ok(Outcome::Ignored(_)) => stats.ignored += 1,
                Err(e) if e.is_silent() => {
                    debug!(category = %e.category(), "no reply: {e}");
                    stats.dropped += 1;
                }
                Err(e) => {
                    error!(category = %e.category(), "comment dropped: {e}");
                    stats.dropped += 1;
                }
            }
        }

        stats
    }
}
