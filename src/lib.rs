//! whoisbot Library
//!
//! Watches a comment feed for `!whois <domain>` requests and answers each
//! with the domain's registration date. This library provides:
//!
//! - Trigger detection and domain extraction/normalization
//! - A deadline-bounded WHOIS lookup with RDAP fallback
//! - Reply rendering with a relative age ("4 years ago")
//! - JSON-lines adapters for the comment feed and the reply sink
//!
//! # Example
//!
//! ```rust
//! use whoisbot::domain_utils::{extract_domain, tokenize};
//!
//! let tokens = tokenize("what is !whois https://www.example.co.uk/about");
//! let domain = extract_domain(&tokens, "!whois")?;
//! assert_eq!(domain.as_str(), "example.co.uk");
//! # Ok::<(), whoisbot::BotError>(())
//! ```

pub mod bot;
pub mod cli;
pub mod config;
pub mod deadline;
pub mod domain_utils;
pub mod errors;
pub mod feed;
pub mod formatter;
pub mod logging;
pub mod lookup;
pub mod rdap;
pub mod whois;

pub use bot::{IgnoreReason, Outcome, RunStats, WhoisBot};
pub use config::Config;
pub use domain_utils::NormalizedDomain;
pub use errors::{BotError, Result};
pub use feed::{CommentEvent, CommentFeed, JsonLinesFeed, JsonLinesSink, ReplyHandle, ReplySink};
pub use formatter::{Clock, FormattedMessage, RecordFormatter};
pub use lookup::{
    CreationDate, LookupOrchestrator, LookupProvider, LookupResult, Provenance, ProviderRecord,
};
pub use rdap::RdapProvider;
pub use whois::WhoisProvider;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
