//! Cloudflare API v4 wire types and their mapping to [`Record`]
//!
//! Cloudflare stores one DNS record per value, while a [`Record`] may carry
//! several targets. Listing therefore yields one single-target record per
//! Cloudflare record, and desired records are split the same way before
//! they are planned (see `CloudflareProvider::adjust_records`).

use dnssync_core::{Error, Record, RecordType, Result};
use serde::{Deserialize, Serialize};

/// Provider-specific property holding the proxy flag
pub const PROXIED_PROPERTY: &str = "cloudflare/proxied";

/// Prefix of the record comment that carries the owner label
pub const OWNER_COMMENT_PREFIX: &str = "dnssync-owner=";

/// Cloudflare's "automatic" TTL
const AUTOMATIC_TTL: u32 = 1;

/// Envelope shared by every Cloudflare API response
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ApiMessage>,
    pub result: Option<T>,
    pub result_info: Option<ResultInfo>,
}

impl<T> Envelope<T> {
    /// Unwrap the result, turning `success: false` into a provider error
    pub fn into_result(self) -> Result<T> {
        if !self.success {
            let messages: Vec<String> = self
                .errors
                .iter()
                .map(|e| format!("{} ({})", e.message, e.code))
                .collect();
            return Err(Error::provider("cloudflare", messages.join("; ")));
        }
        self.result
            .ok_or_else(|| Error::provider("cloudflare", "Invalid response format: missing result"))
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ResultInfo {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
}

#[derive(Debug, Deserialize)]
pub struct Zone {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// SRV payload, which Cloudflare keeps apart from `content`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrvData {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    pub target: String,
}

/// One record as listed or created through the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnsRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub ttl: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<SrvData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Whether Cloudflare can proxy records of this type
pub fn is_proxiable(record_type: &RecordType) -> bool {
    matches!(
        record_type,
        RecordType::A | RecordType::Aaaa | RecordType::Cname
    )
}

impl DnsRecord {
    /// Convert a listed record into a single-target [`Record`]
    pub fn to_record(&self) -> Record {
        let record_type = RecordType::from(self.record_type.as_str());
        let content = self.content.clone().unwrap_or_default();

        let target = match (&record_type, &self.data) {
            (RecordType::Srv, Some(data)) => format!(
                "{} {} {} {}",
                data.priority, data.weight, data.port, data.target
            ),
            (RecordType::Mx, _) | (RecordType::Srv, None) => match self.priority {
                Some(priority) => format!("{priority} {content}"),
                None => content,
            },
            _ => content,
        };

        let mut record = Record::new(self.name.to_ascii_lowercase(), record_type.clone(), [target]);
        if self.ttl != AUTOMATIC_TTL {
            record.ttl = Some(self.ttl);
        }
        if is_proxiable(&record_type) {
            let proxied = self.proxied.unwrap_or(false);
            record = record.with_property(PROXIED_PROPERTY, proxied.to_string());
        }
        record.owner = self
            .comment
            .as_deref()
            .and_then(|c| c.trim().strip_prefix(OWNER_COMMENT_PREFIX))
            .map(str::to_string);
        record
    }

    /// Build the creation payload for one target of a [`Record`]
    pub fn from_target(record: &Record, target: &str) -> Result<Self> {
        let mut payload = DnsRecord {
            id: None,
            record_type: record.record_type.to_string(),
            name: record.normalized_name().trim_end_matches('.').to_string(),
            content: Some(target.to_string()),
            ttl: record.ttl.unwrap_or(AUTOMATIC_TTL),
            proxied: None,
            priority: None,
            data: None,
            comment: record
                .owner
                .as_ref()
                .map(|owner| format!("{OWNER_COMMENT_PREFIX}{owner}")),
        };

        match record.record_type {
            RecordType::Mx => {
                let (priority, exchange) = split_priority(target)?;
                payload.priority = Some(priority);
                payload.content = Some(exchange.to_string());
            }
            RecordType::Srv => {
                let fields: Vec<&str> = target.split_whitespace().collect();
                let [priority, weight, port, srv_target] = fields.as_slice() else {
                    return Err(Error::invalid_input(format!(
                        "SRV target must be 'priority weight port target': {target}"
                    )));
                };
                payload.content = None;
                payload.data = Some(SrvData {
                    priority: parse_u16(priority, target)?,
                    weight: parse_u16(weight, target)?,
                    port: parse_u16(port, target)?,
                    target: srv_target.to_string(),
                });
            }
            _ => {}
        }

        if is_proxiable(&record.record_type) {
            payload.proxied = record
                .provider_specific
                .get(PROXIED_PROPERTY)
                .map(|v| v == "true");
        }

        Ok(payload)
    }
}

fn split_priority(target: &str) -> Result<(u16, &str)> {
    let (priority, rest) = target
        .trim()
        .split_once(char::is_whitespace)
        .ok_or_else(|| {
            Error::invalid_input(format!("MX target must be 'priority exchange': {target}"))
        })?;
    Ok((parse_u16(priority, target)?, rest.trim()))
}

fn parse_u16(field: &str, target: &str) -> Result<u16> {
    field
        .parse()
        .map_err(|_| Error::invalid_input(format!("invalid number '{field}' in target: {target}")))
}
