// # Cloudflare DNS Provider
//
// This crate provides a Cloudflare backend for dnssync. It can serve both as
// a source and as a target of a zone.
//
// ## Behavior
//
// - Records are listed page by page (`per_page=100`) until `total_pages`
// - The zone id is either configured or discovered by zone name
// - Every target value is its own Cloudflare record
// - MX and SRV priorities are folded into the target text
//   (`"10 mail.example.com"`, `"10 5 5060 sip.example.com"`)
// - TTL 1 ("automatic") is reported as an unconfigured TTL
// - The proxy flag is exposed as the `cloudflare/proxied` property
// - The owner label lives in the record comment (`dnssync-owner=<id>`)
// - Applying removes `delete`/`update_old` by id, then creates
//   `update_new`/`create`
//
// ## Trust Level: Untrusted (DNS Provider)
//
// - No retries, no backoff, no caching (the synchronizer's next pass is the retry)
// - No background tasks
// - The API token never appears in logs or Debug output
//
// ## API Reference
//
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?page=..&per_page=100`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Delete DNS Record: DELETE `/zones/:zone_id/dns_records/:record_id`

pub mod api;

use api::{DnsRecord, Envelope, PROXIED_PROPERTY, Zone, is_proxiable};
use async_trait::async_trait;
use dnssync_core::config::ProviderConfig;
use dnssync_core::traits::{DnsProvider, DnsProviderFactory};
use dnssync_core::{ChangeSet, Error, Record, Result};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Records requested per listing page
const PAGE_SIZE: u32 = 100;

/// Cloudflare DNS provider
///
/// # Security
///
/// The Debug implementation does NOT expose the API token.
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// NEVER log this value
    api_token: String,

    /// Zone ID (optional, discovered from the zone name otherwise)
    zone_id: Option<String>,

    /// Proxy flag applied to desired A/AAAA/CNAME records that carry none
    proxied: bool,

    base_url: String,

    request_timeout: Duration,

    client: reqwest::Client,
}

impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("proxied", &self.proxied)
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:DNS:Edit permissions
    /// - `zone_id`: Optional zone ID (discovered by zone name when absent)
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the token is empty and `Error::Http` if the
    /// HTTP client cannot be built.
    pub fn new(api_token: impl Into<String>, zone_id: Option<String>) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        Ok(Self {
            api_token,
            zone_id,
            proxied: false,
            base_url: CLOUDFLARE_API_BASE.to_string(),
            request_timeout: DEFAULT_HTTP_TIMEOUT,
            client: build_client(DEFAULT_HTTP_TIMEOUT)?,
        })
    }

    /// Replace the HTTP timeout of every API request
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for a zero timeout and `Error::Http` if the
    /// HTTP client cannot be rebuilt.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(Error::config("Cloudflare request timeout must be > 0"));
        }
        self.client = build_client(timeout)?;
        self.request_timeout = timeout;
        Ok(self)
    }

    /// Default proxy flag for desired records
    pub fn with_proxied(mut self, proxied: bool) -> Self {
        self.proxied = proxied;
        self
    }

    /// Point the provider at another API endpoint (tests, API gateways)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Resolve the zone id, either configured or by name
    ///
    /// ```http
    /// GET /zones?name=example.com
    /// ```
    async fn zone_id(&self, zone: &str) -> Result<String> {
        if let Some(ref zone_id) = self.zone_id {
            tracing::debug!("Using pre-configured zone ID");
            return Ok(zone_id.clone());
        }

        let zone_name = zone.trim().trim_end_matches('.');
        tracing::debug!("Looking up zone ID for zone: {}", zone_name);

        let request = self
            .client
            .get(format!("{}/zones", self.base_url))
            .query(&[("name", zone_name)]);
        let zones: Vec<Zone> = self.fetch(request, "zone lookup").await?.into_result()?;

        let zone = zones
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found(format!("Zone not found: {zone_name}")))?;

        tracing::debug!("Found zone ID: {}", zone.id);
        Ok(zone.id)
    }

    /// List every record of a zone, following pagination
    async fn list(&self, zone_id: &str) -> Result<Vec<DnsRecord>> {
        let url = format!("{}/zones/{}/dns_records", self.base_url, zone_id);
        let mut records = Vec::new();
        let mut page: u32 = 1;

        loop {
            let request = self
                .client
                .get(&url)
                .query(&[("page", page), ("per_page", PAGE_SIZE)]);
            let envelope: Envelope<Vec<DnsRecord>> = self.fetch(request, "record listing").await?;
            let total_pages = envelope
                .result_info
                .as_ref()
                .map(|info| info.total_pages)
                .unwrap_or(1);

            let batch = envelope.into_result()?;
            let empty = batch.is_empty();
            records.extend(batch);

            if empty || page >= total_pages {
                break;
            }
            page += 1;
        }

        tracing::debug!("Listed {} Cloudflare records", records.len());
        Ok(records)
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<()> {
        let request = self.client.delete(format!(
            "{}/zones/{}/dns_records/{}",
            self.base_url, zone_id, record_id
        ));
        let envelope: Envelope<serde_json::Value> = self.fetch(request, "record deletion").await?;
        envelope.into_result().map(|_| ())
    }

    async fn create_record(&self, zone_id: &str, payload: &DnsRecord) -> Result<()> {
        let request = self
            .client
            .post(format!("{}/zones/{}/dns_records", self.base_url, zone_id))
            .json(payload);
        let envelope: Envelope<serde_json::Value> = self.fetch(request, "record creation").await?;
        envelope.into_result().map(|_| ())
    }

    /// Send an authenticated request and decode the response envelope
    async fn fetch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        context: &str,
    ) -> Result<Envelope<T>> {
        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| Error::http(format!("{context}: HTTP request failed: {e}")))?;

        let response = check_status(response, context).await?;

        response.json().await.map_err(|e| {
            Error::provider("cloudflare", format!("{context}: Failed to parse response: {e}"))
        })
    }
}

/// Map non-success HTTP status codes to error variants
async fn check_status(response: Response, context: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());
    Err(status_error(status, context, &body))
}

fn status_error(status: StatusCode, context: &str, body: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "{context}: Invalid API token or insufficient permissions. Status: {status}"
        )),
        404 => Error::not_found(format!("{context}: {status} - {body}")),
        409 => Error::provider(
            "cloudflare",
            format!("{context}: Conflict with an existing record. Status: {status} - {body}"),
        ),
        429 => Error::rate_limited(format!(
            "{context}: Rate limit exceeded. Status: {status}"
        )),
        500..=599 => Error::provider(
            "cloudflare",
            format!("{context}: Cloudflare server error (transient): {status} - {body}"),
        ),
        _ => Error::provider("cloudflare", format!("{context}: {status} - {body}")),
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    async fn records(&self, zone: &str) -> Result<Vec<Record>> {
        let zone_id = self.zone_id(zone).await?;
        let listed = self.list(&zone_id).await?;
        Ok(listed.iter().map(DnsRecord::to_record).collect())
    }

    /// Apply a change set
    ///
    /// Deletions resolve record ids from a fresh listing by name, type and
    /// target; a record that is already gone is skipped with a warning. Deletions run before
    /// creations so that a CNAME can replace another type at the same name.
    async fn apply_changes(&self, zone: &str, changes: &ChangeSet) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let zone_id = self.zone_id(zone).await?;
        let removals: Vec<&Record> = changes.delete.iter().chain(&changes.update_old).collect();

        if !removals.is_empty() {
            let mut existing = self.list(&zone_id).await?;

            for record in removals {
                for target in &record.targets {
                    let wanted = identity(&single_target(record, target));
                    let position = existing
                        .iter()
                        .position(|listed| identity(&listed.to_record()) == wanted);

                    match position.map(|i| existing.swap_remove(i)) {
                        Some(DnsRecord { id: Some(id), .. }) => {
                            tracing::info!("Deleting {} {} {}", record.dns_name, record.record_type, target);
                            self.delete_record(&zone_id, &id).await?;
                        }
                        _ => {
                            tracing::warn!(
                                "Record {} {} {} not found in Cloudflare, skipping delete",
                                record.dns_name,
                                record.record_type,
                                target
                            );
                        }
                    }
                }
            }
        }

        for record in changes.update_new.iter().chain(&changes.create) {
            for target in &record.targets {
                let payload = DnsRecord::from_target(record, target)?;
                tracing::info!("Creating {} {} {}", record.dns_name, record.record_type, target);
                self.create_record(&zone_id, &payload).await?;
            }
        }

        Ok(())
    }

    /// Split multi-target records and default the proxy flag
    fn adjust_records(&self, records: Vec<Record>) -> Result<Vec<Record>> {
        let mut adjusted = Vec::with_capacity(records.len());

        for record in records {
            for target in &record.targets {
                let mut single = single_target(&record, target);
                if is_proxiable(&single.record_type) {
                    single
                        .provider_specific
                        .entry(PROXIED_PROPERTY.to_string())
                        .or_insert_with(|| self.proxied.to_string());
                }
                adjusted.push(single);
            }
        }

        Ok(adjusted)
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::http(format!("Failed to build HTTP client: {e}")))
}

/// What identifies one Cloudflare record; TTL and proxy flag may be overridden upstream
fn identity(record: &Record) -> (String, String, Vec<String>) {
    (
        record.normalized_name(),
        record.record_type.to_string(),
        record.targets.clone(),
    )
}

fn single_target(record: &Record, target: &str) -> Record {
    Record {
        targets: vec![target.to_string()],
        ..record.clone()
    }
}

/// Factory for creating Cloudflare providers
pub struct CloudflareFactory;

impl DnsProviderFactory for CloudflareFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        match config {
            ProviderConfig::Cloudflare {
                api_token,
                zone_id,
                proxied,
                base_url,
                request_timeout_secs,
            } => {
                let mut provider =
                    CloudflareProvider::new(api_token.clone(), zone_id.clone())?.with_proxied(*proxied);
                if let Some(base_url) = base_url {
                    provider = provider.with_base_url(base_url.clone());
                }
                if let Some(secs) = request_timeout_secs {
                    provider = provider.with_request_timeout(Duration::from_secs(*secs))?;
                }
                Ok(Box::new(provider))
            }
            _ => Err(Error::config("Invalid config for Cloudflare provider")),
        }
    }
}

/// Register the Cloudflare provider with a registry
///
/// # Example
///
/// ```rust
/// use dnssync_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::with_builtin();
/// dnssync_provider_cloudflare::register(&registry);
/// assert!(registry.has_provider("cloudflare"));
/// ```
pub fn register(registry: &dnssync_core::ProviderRegistry) {
    registry.register_provider("cloudflare", Box::new(CloudflareFactory));
}
