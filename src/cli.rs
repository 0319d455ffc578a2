use std::path::PathBuf;

use clap::Parser;

/// Command-line interface definition.
///
/// Comment events are read as JSON lines (`{"id", "author", "body"}`) from
/// `--input` or stdin; replies are written as JSON lines to stdout.
///
/// Verbosity levels:
/// 0 - silent
/// 1 - errors (default)
/// 2 - warnings + errors
/// 3 - info
/// 4 - debug
/// 5 - trace
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Answer '!whois <domain>' comments with the domain's registration date"
)]
pub struct Cli {
    /// JSON-lines comment feed; stdin when omitted
    #[arg(long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Trigger token (default: !whois)
    #[arg(long)]
    pub trigger: Option<String>,

    /// Author whose comments are ignored; repeatable (default: AutoModerator)
    #[arg(long = "exclude-author", value_name = "NAME")]
    pub exclude_author: Vec<String>,

    /// Verbosity level (0 silent, 1 errors, 2 warnings, 3 info, 4 debug, 5 trace)
    #[arg(long, default_value_t = 1)]
    pub verbose: u8,

    /// Primary WHOIS deadline in milliseconds
    #[arg(long = "primary-deadline-ms")]
    pub primary_deadline_ms: Option<u64>,

    /// Pause after a successful RDAP response in milliseconds
    #[arg(long = "settle-delay-ms")]
    pub settle_delay_ms: Option<u64>,

    /// WHOIS server used for TLD referrals
    #[arg(long = "iana-server")]
    pub iana_server: Option<String>,

    /// RDAP bootstrap base URL
    #[arg(long = "rdap-url")]
    pub rdap_url: Option<String>,

    /// Pin the current time (RFC 3339) when replaying a recorded feed
    #[arg(long, hide = true)]
    pub now: Option<String>,
}

impl Cli {
    /// Parse CLI arguments from process args.
    pub fn from_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::default_directive;
    use clap::CommandFactory;

    #[test]
    fn verbose_help_lists_every_level() {
        let cmd = Cli::command();
        let help = cmd
            .get_arguments()
            .find(|a| a.get_id() == "verbose")
            .and_then(|a| a.get_help())
            .map(|h| h.to_string())
            .unwrap();
        for (level, name) in [(3, "info"), (4, "debug"), (5, "trace")] {
            assert!(help.contains(&format!("{level} {name}")), "{help}");
            assert_eq!(default_directive(level), name);
        }
    }
}
