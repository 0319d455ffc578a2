//! Primary lookup provider: plain WHOIS over TCP port 43.
//!
//! The TLD's registry server is found through the IANA referral
//! (`refer:` line), the domain is queried there, and one registrar-level
//! referral (`Registrar WHOIS Server:`) is followed when the registry
//! answer carries no creation date.

use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::config::LookupConfig;
use crate::errors::BotError;
use crate::lookup::{CreationDate, LookupProvider, ProviderRecord};

/// WHOIS TCP port.
const WHOIS_PORT: u16 = 43;

static RE_REFER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^\s*(?:refer|whois):\s*([A-Z0-9._\-]+)\s*$").unwrap());

static RE_REGISTRAR_SERVER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^\s*Registrar WHOIS Server:\s*(?:whois://)?([A-Z0-9._\-]+)\s*$").unwrap()
});

const REGISTRAR_KEYS: &[&str] = &[
    "registrar",
    "registrar name",
    "sponsoring registrar",
    "registrar-name",
];

const CREATION_KEYS: &[&str] = &[
    "creation date",
    "created",
    "created on",
    "created date",
    "registered",
    "registered on",
    "registration time",
    "registration date",
    "domain registration date",
    "domain create date",
    "record created",
];

/// Perform a basic WHOIS query (over TCP) with a timeout per operation.
///
/// Returns the raw textual response.
pub async fn simple_whois(server: &str, port: u16, query: &str, to: Duration) -> Result<String> {
    // Connect with timeout
    let mut stream = match timeout(to, TcpStream::connect((server, port))).await {
        Ok(Ok(s)) => s,
        Ok(Err(e)) => return Err(anyhow!("connect error to {server}: {e}")),
        Err(_) => return Err(anyhow!("connect timeout to {server}")),
    };

    // Send query (canonical WHOIS: "<query>\r\n")
    let line = format!("{query}\r\n");
    timeout(to, stream.write_all(line.as_bytes()))
        .await
        .map_err(|_| anyhow!("write timeout to {server}"))??;

    // Read whole response
    let mut buf = Vec::new();
    timeout(to, stream.read_to_end(&mut buf))
        .await
        .map_err(|_| anyhow!("read timeout from {server}"))??;

    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Registry server named in an IANA answer.
pub fn referral_server(resp: &str) -> Option<String> {
    RE_REFER
        .captures(resp)
        .and_then(|c| c.get(1).map(|m| m.as_str().to_ascii_lowercase()))
}

/// Registrar-level server named in a thin registry answer.
pub fn registrar_server(resp: &str) -> Option<String> {
    RE_REGISTRAR_SERVER
        .captures(resp)
        .and_then(|c| c.get(1).map(|m| m.as_str().to_ascii_lowercase()))
}

/// Extract registrar and every creation-date line from a WHOIS answer.
///
/// Dates are kept in response order. A `Registrar:` key with an empty value
/// takes the next indented line (Nominet layout).
pub fn parse_whois_record(resp: &str) -> ProviderRecord {
    let mut registrar: Option<String> = None;
    let mut created = Vec::new();
    let mut lines = resp.lines().peekable();

    while let Some(line) = lines.next() {
        let line = line.trim();
        if line.starts_with('%') || line.starts_with('#') || line.starts_with(">>>") {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();

        if registrar.is_none() && REGISTRAR_KEYS.contains(&key.as_str()) {
            let value = if value.is_empty() {
                lines
                    .peek()
                    .map(|next| next.trim())
                    .filter(|next| !next.is_empty() && !next.contains(':'))
                    .unwrap_or("")
            } else {
                value
            };
            if !value.is_empty() {
                registrar = Some(value.to_string());
            }
        } else if CREATION_KEYS.contains(&key.as_str()) {
            match parse_whois_date(value) {
                Some(dt) => created.push(dt),
                None => trace!(value, "unparsed creation date"),
            }
        }
    }

    ProviderRecord {
        registrar,
        creation_date: CreationDate::from_vec(created),
    }
}

/// Parse the date layouts commonly seen in WHOIS answers.
pub fn parse_whois_date(raw: &str) -> Option<DateTime<Utc>> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y.%m.%d %H:%M:%S",
        "%d.%m.%Y %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
    ];
    const DATE_FORMATS: &[&str] = &[
        "%Y-%m-%d", "%d-%b-%Y", "%Y.%m.%d", "%d.%m.%Y", "%Y/%m/%d", "%d/%m/%Y", "%Y%m%d",
    ];

    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|n| Utc.from_utc_datetime(&n));
        }
    }

    // "2001-05-02 00:00:00 UTC", "12-Jan-2001 (registry time)" ...
    let first = raw.split_whitespace().next()?;
    if first != raw {
        return parse_whois_date(first);
    }
    None
}

/// Port-43 WHOIS provider.
pub struct WhoisProvider {
    iana_server: String,
    port: u16,
    io_timeout: Duration,
}

impl WhoisProvider {
    pub fn new(iana_server: impl Into<String>, io_timeout: Duration) -> Self {
        Self {
            iana_server: iana_server.into(),
            port: WHOIS_PORT,
            io_timeout,
        }
    }

    pub fn from_config(config: &LookupConfig) -> Self {
        Self::new(config.iana_server.clone(), config.whois_timeout)
    }

    /// Use a non-standard port for every server (local test servers).
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    async fn query(&self, domain: &str) -> Result<ProviderRecord> {
        let tld = domain.rsplit('.').next().unwrap_or(domain);

        let iana = simple_whois(&self.iana_server, self.port, tld, self.io_timeout).await?;
        let server =
            referral_server(&iana).ok_or_else(|| anyhow!("no WHOIS server known for .{tld}"))?;
        debug!(domain, %server, "WHOIS referral");

        let resp = simple_whois(&server, self.port, domain, self.io_timeout).await?;
        let record = parse_whois_record(&resp);
        if record.creation_date.first().is_some() {
            return Ok(record);
        }

        match registrar_server(&resp) {
            Some(next) if next != server => {
                debug!(domain, server = %next, "following registrar referral");
                let resp = simple_whois(&next, self.port, domain, self.io_timeout).await?;
                let detailed = parse_whois_record(&resp);
                Ok(ProviderRecord {
                    registrar: detailed.registrar.or(record.registrar),
                    creation_date: detailed.creation_date,
                })
            }
            _ => Ok(record),
        }
    }
}

#[async_trait]
impl LookupProvider for WhoisProvider {
    fn name(&self) -> &'static str {
        "whois"
    }

    async fn lookup(&self, domain: &str) -> crate::errors::Result<ProviderRecord> {
        self.query(domain)
            .await
            .map_err(|e| BotError::provider(self.name(), domain, e))
    }
}
