//! Secondary lookup provider: RDAP over HTTPS.
//!
//! Queries go through an RDAP bootstrap service (`<base>/domain/<name>`),
//! which redirects to the authoritative registry. A 404 is a valid answer
//! meaning the zone is not served; it yields a record without registrar.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::LookupConfig;
use crate::errors::{BotError, Result};
use crate::lookup::{CreationDate, LookupProvider, ProviderRecord};

#[derive(Debug, Deserialize)]
struct RdapDomain {
    #[serde(default)]
    events: Vec<RdapEvent>,
    #[serde(default)]
    entities: Vec<RdapEntity>,
}

#[derive(Debug, Deserialize)]
struct RdapEvent {
    #[serde(rename = "eventAction")]
    action: String,
    #[serde(rename = "eventDate")]
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RdapEntity {
    #[serde(default)]
    roles: Vec<String>,
    handle: Option<String>,
    #[serde(rename = "vcardArray")]
    vcard: Option<Value>,
    #[serde(default)]
    entities: Vec<RdapEntity>,
}

impl RdapEntity {
    fn is_registrar(&self) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case("registrar"))
    }

    /// Formatted name (`fn`) from the jCard, falling back to the handle.
    fn display_name(&self) -> Option<String> {
        let from_vcard = self
            .vcard
            .as_ref()
            .and_then(|v| v.get(1))
            .and_then(Value::as_array)
            .and_then(|props| {
                props.iter().find_map(|prop| {
                    let prop = prop.as_array()?;
                    if prop.first()?.as_str()? == "fn" {
                        prop.get(3)?.as_str().map(str::to_string)
                    } else {
                        None
                    }
                })
            });
        from_vcard
            .or_else(|| self.handle.clone())
            .filter(|name| !name.trim().is_empty())
    }
}

fn find_registrar(entities: &[RdapEntity]) -> Option<String> {
    entities.iter().find_map(|e| {
        if e.is_registrar() {
            e.display_name()
        } else {
            find_registrar(&e.entities)
        }
    })
}

/// Turn an RDAP domain object into a provider record.
pub fn parse_rdap(body: &str) -> std::result::Result<ProviderRecord, serde_json::Error> {
    let domain: RdapDomain = serde_json::from_str(body)?;

    let created = domain
        .events
        .iter()
        .filter(|e| e.action.eq_ignore_ascii_case("registration"))
        .filter_map(|e| e.date.as_deref())
        .filter_map(|d| DateTime::parse_from_rfc3339(d).ok())
        .map(|d| d.with_timezone(&Utc))
        .collect::<Vec<_>>();

    Ok(ProviderRecord {
        registrar: find_registrar(&domain.entities),
        creation_date: CreationDate::from_vec(created),
    })
}

/// RDAP provider backed by a shared `reqwest` client.
pub struct RdapProvider {
    client: reqwest::Client,
    base_url: String,
}

impl RdapProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| BotError::Configuration {
                message: format!("cannot build RDAP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &LookupConfig) -> Result<Self> {
        Self::new(
            config.rdap_base_url.clone(),
            config.rdap_timeout,
            &config.user_agent,
        )
    }

    fn url_for(&self, domain: &str) -> String {
        format!("{}/domain/{}", self.base_url, domain)
    }
}

#[async_trait]
impl LookupProvider for RdapProvider {
    fn name(&self) -> &'static str {
        "rdap"
    }

    async fn lookup(&self, domain: &str) -> Result<ProviderRecord> {
        let url = self.url_for(domain);
        debug!(domain, %url, "RDAP request");

        let resp = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/rdap+json")
            .send()
            .await
            .map_err(|e| BotError::provider(self.name(), domain, e))?;

        match resp.status() {
            StatusCode::NOT_FOUND => {
                debug!(domain, "RDAP has no data for this zone");
                Ok(ProviderRecord {
                    registrar: None,
                    creation_date: CreationDate::Absent,
                })
            }
            status if status.is_success() => {
                let body = resp
                    .text()
                    .await
                    .map_err(|e| BotError::provider(self.name(), domain, e))?;
                parse_rdap(&body).map_err(|e| BotError::provider(self.name(), domain, e))
            }
            status => Err(BotError::provider(
                self.name(),
                domain,
                format!("unexpected HTTP status {status}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const RDAP_SAMPLE: &str = r#"{
      "objectClassName": "domain",
      "ldhName": "EXAMPLE.ORG",
      "events": [
        {"eventAction": "last changed", "eventDate": "2023-08-14T07:01:38Z"},
        {"eventAction": "registration", "eventDate": "1995-08-31T04:00:00Z"},
        {"eventAction": "expiration", "eventDate": "2024-08-30T04:00:00Z"}
      ],
      "entities": [
        {
          "objectClassName": "entity",
          "handle": "376",
          "roles": ["registrar"],
          "vcardArray": ["vcard", [
            ["version", {}, "text", "4.0"],
            ["fn", {}, "text", "Internet Assigned Numbers Authority"]
          ]]
        }
      ]
    }"#;

    #[test]
    fn test_parse_registrar_and_registration() {
        let record = parse_rdap(RDAP_SAMPLE).unwrap();
        assert_eq!(
            record.registrar.as_deref(),
            Some("Internet Assigned Numbers Authority")
        );
        assert_eq!(
            record.creation_date,
            CreationDate::Single(Utc.with_ymd_and_hms(1995, 8, 31, 4, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_handle_fallback_and_nested_entities() {
        let body = r#"{
          "events": [],
          "entities": [
            {"roles": ["registrant"], "entities": [
              {"roles": ["Registrar"], "handle": "9999"}
            ]}
          ]
        }"#;
        let record = parse_rdap(body).unwrap();
        assert_eq!(record.registrar.as_deref(), Some("9999"));
        assert_eq!(record.creation_date, CreationDate::Absent);
    }

    #[test]
    fn test_no_registrar() {
        let record = parse_rdap(r#"{"events": [{"eventAction": "registration", "eventDate": "2001-01-01T00:00:00Z"}]}"#)
            .unwrap();
        assert!(!record.has_registrar());
        assert!(record.creation_date.first().is_some());
    }

    #[test]
    fn test_malformed_body() {
        assert!(parse_rdap("<html>rate limited</html>").is_err());
    }

    #[test]
    fn test_url_building() {
        let provider =
            RdapProvider::new("https://rdap.org/", Duration::from_secs(1), "whoisbot-test").unwrap();
        assert_eq!(
            provider.url_for("example.com"),
            "https://rdap.org/domain/example.com"
        );
    }
}
