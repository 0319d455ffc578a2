//! Reply rendering.
//!
//! A `LookupResult` becomes a fixed template: title, absolute creation
//! date, relative age, and two footer lines. Rendering is pure given the
//! clock instant, so the same result always renders to the same bytes.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::config::OutputConfig;
use crate::errors::{BotError, Result};
use crate::lookup::LookupResult;

const DAYS_PER_YEAR: i64 = 365;
const DAYS_PER_MONTH: i64 = 30;

/// Reply text, built once and posted unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedMessage(String);

impl FormattedMessage {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[cfg(test)]
    pub(crate) fn from_text(text: impl Into<String>) -> Self {
        Self(text.into())
    }
}

impl fmt::Display for FormattedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of "now" for relative ages.
#[derive(Debug, Clone, Copy)]
pub enum Clock {
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(at) => *at,
        }
    }
}

/// Human-readable age for an elapsed number of whole days.
pub fn relative_age(days: i64) -> String {
    let days = days.max(0);
    if (DAYS_PER_YEAR..2 * DAYS_PER_YEAR).contains(&days) {
        "1 year ago".to_string()
    } else if days >= 2 * DAYS_PER_YEAR {
        format!("{} years ago", days / DAYS_PER_YEAR)
    } else if (DAYS_PER_MONTH..2 * DAYS_PER_MONTH).contains(&days) {
        "1 month ago".to_string()
    } else if days >= 2 * DAYS_PER_MONTH {
        format!("{} months ago", days / DAYS_PER_MONTH)
    } else {
        format!("{days} days ago")
    }
}

/// Renders lookup results into reply messages.
#[derive(Debug, Clone)]
pub struct RecordFormatter {
    issue_tracker_url: String,
    clock: Clock,
}

impl RecordFormatter {
    pub fn new(issue_tracker_url: impl Into<String>, clock: Clock) -> Self {
        Self {
            issue_tracker_url: issue_tracker_url.into(),
            clock,
        }
    }

    pub fn from_config(config: &OutputConfig) -> Self {
        let clock = config.fixed_now.map(Clock::Fixed).unwrap_or(Clock::System);
        Self::new(config.issue_tracker_url.clone(), clock)
    }

    /// Render `result` against the formatter's clock.
    pub fn format(&self, result: &LookupResult) -> Result<FormattedMessage> {
        self.format_at(result, self.clock.now())
    }

    /// Render `result` as of `now`.
    ///
    /// A result without creation date breaks the orchestrator's contract and
    /// is reported as an internal error.
    pub fn format_at(&self, result: &LookupResult, now: DateTime<Utc>) -> Result<FormattedMessage> {
        let created = result.record.creation_date.first().ok_or_else(|| {
            BotError::internal(format!(
                "{} result for {} reached the formatter without a creation date",
                result.provenance, result.domain
            ))
        })?;

        let days = (now - created).num_days();
        let domain = &result.domain;
        let message = format!(
            "WHOIS for {domain}\n\n\
             {domain} has been created on {date}.\n\n\
             It means that the domain was created around {age}.\n\n\
             ^^^I'm a bot, this action was done automatically.\n\n\
             ^^^If you spot bugs or ways to improve, please share them on [the issue tracker]({url})",
            date = created.format("%Y/%m/%d"),
            age = relative_age(days),
            url = self.issue_tracker_url,
        );
        Ok(FormattedMessage(message))
    }
}
