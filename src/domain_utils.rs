//! Domain extraction with Public Suffix List integration.
//!
//! Turns the token following the trigger in a comment into a registrable
//! domain:
//! - `example.com` -> `example.com` (two labels are taken as-is)
//! - `https://sub.example.co.uk/path` -> `example.co.uk`
//! - `mysite.github.io` -> `mysite.github.io` (github.io is a public suffix)

use std::fmt;

use psl::domain_str;

use crate::errors::{BotError, Result};

/// A domain believed to be registrable, ready to hand to a lookup provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedDomain(String);

impl NormalizedDomain {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Split a comment body into whitespace-delimited tokens.
pub fn tokenize(body: &str) -> Vec<&str> {
    body.split_whitespace().collect()
}

/// Whether `token` contains the trigger (ASCII case-insensitive).
pub fn contains_trigger(token: &str, trigger: &str) -> bool {
    token
        .to_ascii_lowercase()
        .contains(&trigger.to_ascii_lowercase())
}

/// Token following the last trigger occurrence that has a follower.
///
/// The scan runs over the whole sequence, so `!whois a.com !whois b.com`
/// yields `b.com`.
pub fn find_candidate<'a>(tokens: &[&'a str], trigger: &str) -> Option<&'a str> {
    tokens
        .windows(2)
        .filter(|pair| contains_trigger(pair[0], trigger))
        .map(|pair| pair[1])
        .last()
}

/// Locate the candidate after the trigger and normalize it.
pub fn extract_domain(tokens: &[&str], trigger: &str) -> Result<NormalizedDomain> {
    let candidate = find_candidate(tokens, trigger).ok_or(BotError::NoDomainProvided)?;
    normalize_candidate(candidate)
}

/// Whether the candidate already carries an http(s) scheme.
pub fn has_scheme(candidate: &str) -> bool {
    let lower = candidate.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Reduce a candidate token to its registrable domain.
///
/// Hosts with two or fewer labels are returned without consulting the
/// public suffix list.
pub fn normalize_candidate(candidate: &str) -> Result<NormalizedDomain> {
    let host = host_of(candidate, has_scheme(candidate))?;
    if is_ip_literal(host) {
        return Err(BotError::invalid_domain(candidate, "IP address, not a domain"));
    }

    if host.split('.').count() <= 2 {
        return Ok(NormalizedDomain(host.to_string()));
    }

    validate_labels(candidate, host)?;
    let lower = host.to_ascii_lowercase();
    let registrable = domain_str(&lower).ok_or_else(|| {
        BotError::invalid_domain(candidate, "no registrable domain under the public suffix list")
    })?;
    Ok(NormalizedDomain(registrable.to_string()))
}

/// Extract the host part of a candidate, removing scheme, credentials, port
/// and path.
///
/// A scheme-less candidate is read as if `https://` had been prepended;
/// any other explicit scheme is rejected.
fn host_of(candidate: &str, scheme_present: bool) -> Result<&str> {
    let trimmed = candidate.trim();
    let rest = if scheme_present {
        trimmed
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(trimmed)
    } else if trimmed.contains("://") {
        return Err(BotError::invalid_domain(candidate, "unsupported scheme"));
    } else {
        trimmed
    };

    let authority = rest.split(['/', '?', '#']).next().unwrap_or("");
    let authority = authority.rsplit('@').next().unwrap_or(authority);
    let host = authority
        .split(':')
        .next()
        .unwrap_or("")
        .trim_end_matches('.');

    if host.is_empty() {
        return Err(BotError::invalid_domain(candidate, "no host"));
    }
    Ok(host)
}

/// Dotted all-numeric hosts (`192.168.0.1`) and bracketed IPv6 hosts.
fn is_ip_literal(host: &str) -> bool {
    host.starts_with('[')
        || host
            .split('.')
            .all(|label| !label.is_empty() && label.bytes().all(|b| b.is_ascii_digit()))
}

fn validate_labels(candidate: &str, host: &str) -> Result<()> {
    for label in host.split('.') {
        if label.is_empty() {
            return Err(BotError::invalid_domain(candidate, "empty label"));
        }
        if label.len() > 63 {
            return Err(BotError::invalid_domain(candidate, "label longer than 63 bytes"));
        }
        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(BotError::invalid_domain(candidate, format!("bad label '{label}'")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(body: &str) -> Result<NormalizedDomain> {
        extract_domain(&tokenize(body), "!whois")
    }

    #[test]
    fn test_no_token_after_trigger() {
        assert!(matches!(extract("!whois"), Err(BotError::NoDomainProvided)));
        assert!(matches!(
            extract("please run !whois"),
            Err(BotError::NoDomainProvided)
        ));
        assert!(matches!(extract(""), Err(BotError::NoDomainProvided)));
    }

    #[test]
    fn test_two_labels_unchanged() {
        for candidate in ["example.com", "Example.COM", "localhost", "co.uk", "a.zz"] {
            let body = format!("!whois {candidate}");
            assert_eq!(extract(&body).unwrap().as_str(), candidate);
        }
    }

    #[test]
    fn test_complex_tld() {
        assert_eq!(
            extract("!whois sub.example.co.uk").unwrap().as_str(),
            "example.co.uk"
        );
        assert_eq!(
            extract("!whois a.b.c.example.co.uk").unwrap().as_str(),
            "example.co.uk"
        );
        assert_eq!(
            extract("!whois www.example.com").unwrap().as_str(),
            "example.com"
        );
    }

    #[test]
    fn test_special_public_suffix() {
        assert_eq!(
            extract("!whois mysite.github.io").unwrap().as_str(),
            "mysite.github.io"
        );
    }

    #[test]
    fn test_scheme_and_path_are_stripped() {
        assert!(has_scheme("https://www.example.co.uk/path"));
        assert!(has_scheme("HTTP://example.com"));
        assert!(!has_scheme("httpbin.org"));
        assert_eq!(
            extract("!whois https://www.example.co.uk/path?q=1")
                .unwrap()
                .as_str(),
            "example.co.uk"
        );
        // Labels are counted on the host, so a two-label URL loses its scheme.
        assert_eq!(
            extract("!whois http://example.com/").unwrap().as_str(),
            "example.com"
        );
        assert_eq!(
            extract("!whois HTTPS://Example.COM:443").unwrap().as_str(),
            "Example.COM"
        );
        assert_eq!(
            extract("!whois shop.example.com:8080/cart").unwrap().as_str(),
            "example.com"
        );
    }

    #[test]
    fn test_last_trigger_wins() {
        assert_eq!(
            extract("!whois first.com and !whois second.com").unwrap().as_str(),
            "second.com"
        );
        // A trailing trigger without follower does not discard earlier matches.
        assert_eq!(
            extract("!whois first.com !whois").unwrap().as_str(),
            "first.com"
        );
    }

    #[test]
    fn test_trigger_matched_as_substring_ignoring_case() {
        assert_eq!(
            extract("(!WHOIS example.org").unwrap().as_str(),
            "example.org"
        );
    }

    #[test]
    fn test_invalid_domains() {
        assert!(matches!(
            extract("!whois sub..example.com"),
            Err(BotError::InvalidDomain { .. })
        ));
        assert!(matches!(
            extract("!whois ftp://files.example.com"),
            Err(BotError::InvalidDomain { .. })
        ));
        assert!(matches!(
            extract("!whois https://"),
            Err(BotError::InvalidDomain { .. })
        ));
        assert!(matches!(
            extract("!whois bad!label.example.com"),
            Err(BotError::InvalidDomain { .. })
        ));
    }

    #[test]
    fn test_ip_literals_rejected() {
        for candidate in [
            "192.168.0.1",
            "http://10.0.0.1:8080/x",
            "127.1",
            "[::1]",
            "https://[2001:db8::1]/",
        ] {
            let body = format!("!whois {candidate}");
            assert!(
                matches!(extract(&body), Err(BotError::InvalidDomain { .. })),
                "{candidate} should be rejected"
            );
        }
        // Numeric labels inside a real domain are fine.
        assert_eq!(extract("!whois www.123.com").unwrap().as_str(), "123.com");
    }

    #[test]
    fn test_display_matches_str() {
        let d = extract("!whois news.example.co.uk").unwrap();
        assert_eq!(d.to_string(), d.as_str());
        assert_eq!(d.to_string(), "example.co.uk");
    }
}
