//! Unified error handling for the bot pipeline.
//!
//! `BotError` is a `thiserror`-based enum with:
//!   * One variant per lookup failure the pipeline can produce
//!   * A categorization layer (`ErrorCategory`) used as a log field
//!   * Helper constructors
//!   * `From` conversions for common lower-level errors
//!
//! Lookup failures never reach the comment thread. The event loop asks
//! `is_silent()` to decide whether a failure is an expected drop (logged at
//! debug level) or something an operator should look at.

use std::io;

use thiserror::Error;

/// High-level classification for log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Network,
    Parse,
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCategory::Input => "input",
            ErrorCategory::Network => "network",
            ErrorCategory::Parse => "parse",
            ErrorCategory::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Primary application error type.
#[derive(Error, Debug)]
pub enum BotError {
    // ------------------------ Input / Validation ----------------------------
    #[error("No domain follows the trigger token")]
    NoDomainProvided,

    #[error("Invalid domain '{candidate}': {reason}")]
    InvalidDomain { candidate: String, reason: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    // ----------------------------- Lookup -----------------------------------
    #[error("Domain '{domain}' is in a zone the secondary provider does not serve")]
    UnsupportedDomain { domain: String },

    #[error("{provider} lookup for '{domain}' timed out after {millis}ms")]
    LookupTimedOut {
        provider: String,
        domain: String,
        millis: u64,
    },

    #[error("{provider} lookup for '{domain}' failed: {source}")]
    ProviderError {
        provider: String,
        domain: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    // ----------------------------- Feed / Sink ------------------------------
    #[error("Malformed feed event at line {line}: {reason}")]
    Feed { line: usize, reason: String },

    #[error("Failed to post reply to {parent}: {source}")]
    Reply {
        parent: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    // ----------------------------- I/O / FS ---------------------------------
    #[error("I/O error during {operation} on {path}: {source}")]
    Io {
        path: String,
        operation: String,
        #[source]
        source: io::Error,
    },

    // ---------------------------- Internal ----------------------------------
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl BotError {
    /// Categorize the error for structured logging.
    pub fn category(&self) -> ErrorCategory {
        use BotError::*;
        match self {
            NoDomainProvided
            | InvalidDomain { .. }
            | UnsupportedDomain { .. }
            | Configuration { .. } => ErrorCategory::Input,

            LookupTimedOut { .. } | ProviderError { .. } | Reply { .. } => ErrorCategory::Network,

            Feed { .. } => ErrorCategory::Parse,

            Io { .. } | Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Whether the failure is an ordinary "no reply for this comment" outcome.
    pub fn is_silent(&self) -> bool {
        matches!(
            self,
            BotError::NoDomainProvided
                | BotError::InvalidDomain { .. }
                | BotError::UnsupportedDomain { .. }
                | BotError::LookupTimedOut { .. }
                | BotError::ProviderError { .. }
        )
    }

    // ---------------------------- Constructors -----------------------------

    pub fn invalid_domain(candidate: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDomain {
            candidate: candidate.into(),
            reason: reason.into(),
        }
    }

    pub fn unsupported(domain: impl Into<String>) -> Self {
        Self::UnsupportedDomain {
            domain: domain.into(),
        }
    }

    pub fn timed_out(provider: impl Into<String>, domain: impl Into<String>, millis: u64) -> Self {
        Self::LookupTimedOut {
            provider: provider.into(),
            domain: domain.into(),
            millis,
        }
    }

    pub fn provider(
        provider: impl Into<String>,
        domain: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::ProviderError {
            provider: provider.into(),
            domain: domain.into(),
            source: source.into(),
        }
    }

    pub fn feed(line: usize, reason: impl Into<String>) -> Self {
        Self::Feed {
            line,
            reason: reason.into(),
        }
    }

    pub fn reply(
        parent: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Reply {
            parent: parent.into(),
            source: source.into(),
        }
    }

    pub fn io(path: impl Into<String>, operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }
}

/// Public result alias.
pub type Result<T> = std::result::Result<T, BotError>;

/// Map standard IO errors into `Io` variant (generic context).
impl From<io::Error> for BotError {
    fn from(e: io::Error) -> Self {
        BotError::Io {
            path: "<unknown>".into(),
            operation: "unspecified".into(),
            source: e,
        }
    }
}

/// Extension trait for enriching IO results with path + operation context.
pub trait IoResultExt<T> {
    fn with_path(self, path: impl Into<String>, operation: impl Into<String>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::result::Result<T, io::Error> {
    fn with_path(self, path: impl Into<String>, operation: impl Into<String>) -> Result<T> {
        self.map_err(|e| BotError::io(path.into(), operation.into(), e))
    }
}
