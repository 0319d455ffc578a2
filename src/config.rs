//! Configuration management for whoisbot.
//!
//! Settings come from defaults, then `WHOISBOT_*` environment variables,
//! then command-line flags. The trigger token, the excluded authors and the
//! provider timings all live here.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Main configuration structure for whoisbot.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Comment filtering
    pub bot: BotConfig,

    /// Provider endpoints and timings
    pub lookup: LookupConfig,

    /// Reply rendering
    pub output: OutputConfig,
}

/// Which comments the bot reacts to.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Token that marks a comment as a lookup request
    pub trigger: String,

    /// Authors never answered (compared case-sensitively)
    pub excluded_authors: Vec<String>,
}

/// Lookup provider settings.
#[derive(Debug, Clone)]
pub struct LookupConfig {
    /// Hard bound on the primary (WHOIS) lookup before falling back
    pub primary_deadline: Duration,

    /// Pause after every successful secondary (RDAP) response
    pub settle_delay: Duration,

    /// Per-operation I/O timeout for port-43 WHOIS connections
    pub whois_timeout: Duration,

    /// Server asked for the TLD referral
    pub iana_server: String,

    /// RDAP bootstrap service base URL
    pub rdap_base_url: String,

    /// Total timeout for one RDAP HTTP request
    pub rdap_timeout: Duration,

    /// User agent sent to RDAP servers
    pub user_agent: String,
}

/// Reply rendering settings.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Issue tracker linked from the reply footer
    pub issue_tracker_url: String,

    /// Pin "now" for relative ages (replaying recorded feeds)
    pub fixed_now: Option<DateTime<Utc>>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            trigger: "!whois".to_string(),
            excluded_authors: vec!["AutoModerator".to_string()],
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            primary_deadline: Duration::from_secs(3),
            settle_delay: Duration::from_secs(1),
            whois_timeout: Duration::from_secs(10),
            iana_server: "whois.iana.org".to_string(),
            rdap_base_url: "https://rdap.org".to_string(),
            rdap_timeout: Duration::from_secs(10),
            user_agent: format!("{}/{}", crate::NAME, crate::VERSION),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            issue_tracker_url: "https://github.com/Stig124/whois_bot/issues".to_string(),
            fixed_now: None,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(trigger) = std::env::var("WHOISBOT_TRIGGER")
            && !trigger.trim().is_empty()
        {
            config.bot.trigger = trigger.trim().to_string();
        }

        if let Ok(authors) = std::env::var("WHOISBOT_EXCLUDED_AUTHORS") {
            config.bot.excluded_authors = split_list(&authors);
        }

        // Timings
        if let Ok(ms) = std::env::var("WHOISBOT_PRIMARY_DEADLINE_MS")
            && let Ok(ms) = ms.parse::<u64>()
        {
            config.lookup.primary_deadline = Duration::from_millis(ms);
        }

        if let Ok(ms) = std::env::var("WHOISBOT_SETTLE_DELAY_MS")
            && let Ok(ms) = ms.parse::<u64>()
        {
            config.lookup.settle_delay = Duration::from_millis(ms);
        }

        if let Ok(secs) = std::env::var("WHOISBOT_WHOIS_TIMEOUT_SECS")
            && let Ok(secs) = secs.parse::<u64>()
        {
            config.lookup.whois_timeout = Duration::from_secs(secs);
        }

        // Endpoints
        if let Ok(server) = std::env::var("WHOISBOT_IANA_SERVER") {
            config.lookup.iana_server = server;
        }

        if let Ok(url) = std::env::var("WHOISBOT_RDAP_URL") {
            config.lookup.rdap_base_url = url;
        }

        if let Ok(url) = std::env::var("WHOISBOT_ISSUE_TRACKER") {
            config.output.issue_tracker_url = url;
        }

        config
    }

    /// Merge with CLI arguments, giving CLI precedence
    pub fn merge_with_cli(&mut self, cli: &crate::cli::Cli) -> Result<(), ConfigError> {
        if let Some(ref trigger) = cli.trigger {
            self.bot.trigger = trigger.clone();
        }

        if !cli.exclude_author.is_empty() {
            self.bot.excluded_authors = cli.exclude_author.clone();
        }

        if let Some(ms) = cli.primary_deadline_ms {
            self.lookup.primary_deadline = Duration::from_millis(ms);
        }

        if let Some(ms) = cli.settle_delay_ms {
            self.lookup.settle_delay = Duration::from_millis(ms);
        }

        if let Some(ref server) = cli.iana_server {
            self.lookup.iana_server = server.clone();
        }

        if let Some(ref url) = cli.rdap_url {
            self.lookup.rdap_base_url = url.clone();
        }

        if let Some(ref now) = cli.now {
            let parsed = DateTime::parse_from_rfc3339(now).map_err(|e| ConfigError::InvalidValue {
                field: "output.fixed_now".to_string(),
                value: now.clone(),
                reason: e.to_string(),
            })?;
            self.output.fixed_now = Some(parsed.with_timezone(&Utc));
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.trigger.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "bot.trigger".to_string(),
            });
        }

        if self.bot.trigger.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidValue {
                field: "bot.trigger".to_string(),
                value: self.bot.trigger.clone(),
                reason: "Trigger must be a single token".to_string(),
            });
        }

        if self.lookup.primary_deadline.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "lookup.primary_deadline".to_string(),
                value: "0".to_string(),
                reason: "Deadline must be greater than 0".to_string(),
            });
        }

        if self.lookup.iana_server.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "lookup.iana_server".to_string(),
            });
        }

        if !self.lookup.rdap_base_url.starts_with("http://")
            && !self.lookup.rdap_base_url.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue {
                field: "lookup.rdap_base_url".to_string(),
                value: self.lookup.rdap_base_url.clone(),
                reason: "RDAP URL must be http(s)".to_string(),
            });
        }

        Ok(())
    }

    /// Whether comments by `author` are never answered
    pub fn is_excluded_author(&self, author: &str) -> bool {
        self.bot.excluded_authors.iter().any(|a| a == author)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
    /// Invalid configuration value
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Missing required configuration
    MissingRequired { field: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue {
                field,
                value,
                reason,
            } => {
                write!(f, "Invalid value '{}' for '{}': {}", value, field, reason)
            }
            ConfigError::MissingRequired { field } => {
                write!(f, "Missing required configuration field: {}", field)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for crate::errors::BotError {
    fn from(e: ConfigError) -> Self {
        crate::errors::BotError::Configuration {
            message: e.to_string(),
        }
    }
}
