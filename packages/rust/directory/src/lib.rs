//! Read-only client for the organization directory (GitHub REST API shape).
//!
//! Every public call is fail-soft: transport failures, non-success statuses
//! and unexpected payloads are logged and collapsed into an empty list or
//! `None`. Callers keep rendering with zero members instead of failing.

use std::time::Duration;

use manybodylab_shared::{DirectoryConfig, ManyBodyLabError, MembershipEntry, Result, UserDetail};
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Media type the directory expects for JSON responses.
const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// REST API version pinned on every request.
const GITHUB_API_VERSION: &str = "2022-11-28";

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 3;

/// User-Agent string for directory requests (GitHub rejects requests without one).
const USER_AGENT: &str = concat!("ManyBodyLab/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// DirectoryClient
// ---------------------------------------------------------------------------

/// HTTP client for the membership and user-detail endpoints.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    client: Client,
    base_url: Url,
    per_page: u32,
}

impl DirectoryClient {
    /// Create a client from runtime directory configuration.
    ///
    /// Fails only on unusable configuration (bad base URL, zero timeout, bad
    /// token characters).
    pub fn new(config: &DirectoryConfig) -> Result<Self> {
        let base_url = parse_base_url(&config.base_url)?;
        if config.timeout_secs == 0 {
            return Err(ManyBodyLabError::config(
                "directory timeout_secs must be at least 1",
            ));
        }
        let client = build_client(config)?;

        Ok(Self {
            client,
            base_url,
            per_page: config.per_page,
        })
    }

    /// The directory base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// List the members of `organization`.
    ///
    /// Returns an empty list (and logs why) on any failure.
    #[instrument(skip(self))]
    pub async fn list_members(&self, organization: &str) -> Vec<MembershipEntry> {
        match self.try_list_members(organization).await {
            Ok(members) => {
                info!(count = members.len(), "membership listing fetched");
                members
            }
            Err(e) => {
                warn!(error = %e, "membership listing failed, continuing with no members");
                Vec::new()
            }
        }
    }

    /// Fetch the detail record for `login`.
    ///
    /// Returns `None` (and logs why) on any failure.
    #[instrument(skip(self))]
    pub async fn get_user_detail(&self, login: &str) -> Option<UserDetail> {
        match self.try_get_user_detail(login).await {
            Ok(detail) => {
                debug!("user detail fetched");
                Some(detail)
            }
            Err(e) => {
                warn!(error = %e, "user detail fetch failed");
                None
            }
        }
    }

    async fn try_list_members(&self, organization: &str) -> Result<Vec<MembershipEntry>> {
        let organization = organization.trim();
        if organization.is_empty() {
            return Err(ManyBodyLabError::validation("organization identifier is empty"));
        }

        let mut url = self.endpoint(&["orgs", organization, "members"])?;
        if self.per_page > 0 {
            url.query_pairs_mut()
                .append_pair("per_page", &self.per_page.to_string());
        }

        let items = match self.fetch_json(url).await? {
            Value::Array(items) => items,
            other => {
                return Err(ManyBodyLabError::decode(format!(
                    "expected a JSON array of members, got {}",
                    json_kind(&other)
                )));
            }
        };

        let mut members = Vec::with_capacity(items.len());
        for item in items {
            match serde_json::from_value::<MembershipEntry>(item) {
                Ok(entry) if !entry.login.trim().is_empty() => members.push(entry),
                Ok(_) => warn!("skipping member entry with an empty login"),
                Err(e) => warn!(error = %e, "skipping malformed member entry"),
            }
        }

        Ok(members)
    }

    async fn try_get_user_detail(&self, login: &str) -> Result<UserDetail> {
        if login.trim().is_empty() {
            return Err(ManyBodyLabError::validation("login identifier is empty"));
        }

        let url = self.endpoint(&["users", login])?;
        let payload = self.fetch_json(url).await?;
        if !payload.is_object() {
            return Err(ManyBodyLabError::decode(format!(
                "expected a JSON object for user detail, got {}",
                json_kind(&payload)
            )));
        }

        serde_json::from_value(payload)
            .map_err(|e| ManyBodyLabError::decode(format!("user detail for {login}: {e}")))
    }

    /// Append path segments (percent-encoded) to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ManyBodyLabError::config(format!("base URL cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET a URL and decode the body as JSON. Non-2xx is an error.
    async fn fetch_json(&self, url: Url) -> Result<Value> {
        debug!(%url, "requesting directory resource");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ManyBodyLabError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ManyBodyLabError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ManyBodyLabError::decode(format!("{url}: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse and check the configured base URL.
fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ManyBodyLabError::config(format!("invalid directory base URL '{raw}': {e}")))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ManyBodyLabError::config(format!(
                "directory base URL must be http or https, got '{other}'"
            )));
        }
    }

    if url.cannot_be_a_base() {
        return Err(ManyBodyLabError::config(format!(
            "directory base URL cannot be a base: {raw}"
        )));
    }

    Ok(url)
}

/// Build a reqwest client with the directory's default headers.
fn build_client(config: &DirectoryConfig) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
    headers.insert(
        HeaderName::from_static("x-github-api-version"),
        HeaderValue::from_static(GITHUB_API_VERSION),
    );

    if let Some(token) = &config.token {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| ManyBodyLabError::config(format!("invalid directory token: {e}")))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| ManyBodyLabError::Network(format!("failed to build HTTP client: {e}")))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
