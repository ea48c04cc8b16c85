//! Member enrichment orchestrator.
//!
//! Lists an organization's members, fetches every member's detail record
//! concurrently, and merges the two into [`EnrichedProfile`]s. A member whose
//! detail fetch fails is dropped; nothing here ever returns an error.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use manybodylab_directory::DirectoryClient;
use manybodylab_shared::{
    DirectoryConfig, EnrichedProfile, MembershipEntry, Result, UserDetail, fallback_bio,
};

use crate::handle::extract_linkedin_handle;

// ---------------------------------------------------------------------------
// Enricher
// ---------------------------------------------------------------------------

/// Builds enriched member lists from the directory.
#[derive(Debug, Clone)]
pub struct Enricher {
    client: DirectoryClient,
    /// Maximum detail requests in flight at once.
    concurrency: usize,
}

impl Enricher {
    /// Create an enricher with its own directory client.
    pub fn new(config: &DirectoryConfig) -> Result<Self> {
        let client = DirectoryClient::new(config)?;
        Ok(Self::with_client(client, config.concurrency as usize))
    }

    /// Create an enricher around an existing client.
    pub fn with_client(client: DirectoryClient, concurrency: usize) -> Self {
        Self {
            client,
            concurrency: concurrency.max(1),
        }
    }

    /// Fetch and enrich the members of `organization`.
    ///
    /// 1. List members; an empty listing (no members, or directory
    ///    unreachable) returns immediately.
    /// 2. Fetch every member's detail concurrently.
    /// 3. Merge each successful detail with its membership entry.
    ///
    /// The result is in completion order, which is not stable across runs.
    #[instrument(skip(self))]
    pub async fn fetch_members(&self, organization: &str) -> Vec<EnrichedProfile> {
        let members = self.client.list_members(organization).await;
        if members.is_empty() {
            info!("no members listed, nothing to enrich");
            return Vec::new();
        }

        let members = dedupe_by_login(members);
        let total = members.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for member in members {
            let client = self.client.clone();
            let sem = semaphore.clone();

            tasks.spawn(async move {
                // The semaphore is never closed, so this always holds a permit.
                let _permit = sem.acquire_owned().await.ok();
                let detail = client.get_user_detail(&member.login).await;
                (member, detail)
            });
        }

        let organization = organization.trim();
        let mut profiles = Vec::with_capacity(total);
        let mut dropped = 0usize;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((member, Some(detail))) => {
                    profiles.push(enrich_profile(organization, member, &detail));
                }
                Ok((member, None)) => {
                    debug!(login = %member.login, "dropping member without detail");
                    dropped += 1;
                }
                Err(e) => {
                    warn!(error = %e, "detail task failed, dropping member");
                    dropped += 1;
                }
            }
        }

        info!(
            directory = %self.client.base_url(),
            members = total,
            profiles = profiles.len(),
            dropped,
            "member enrichment complete"
        );

        profiles
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Merge a membership entry with its detail record.
///
/// Identity fields come from the membership entry; missing or blank detail
/// fields fall back per field.
pub fn enrich_profile(
    organization: &str,
    member: MembershipEntry,
    detail: &UserDetail,
) -> EnrichedProfile {
    let name = non_blank(detail.name.as_deref())
        .map(str::to_string)
        .unwrap_or_else(|| member.login.clone());

    let bio = non_blank(detail.bio.as_deref())
        .map(str::to_string)
        .unwrap_or_else(|| fallback_bio(organization));

    let linkedin = detail.blog.as_deref().and_then(extract_linkedin_handle);

    EnrichedProfile {
        name,
        bio,
        login: member.login,
        linkedin,
        avatar_url: member.avatar_url,
        html_url: member.html_url,
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Keep the first entry for each login.
fn dedupe_by_login(members: Vec<MembershipEntry>) -> Vec<MembershipEntry> {
    let mut seen = HashSet::new();
    members
        .into_iter()
        .filter(|m| {
            let fresh = seen.insert(m.login.clone());
            if !fresh {
                warn!(login = %m.login, "duplicate member in listing, ignoring repeat");
            }
            fresh
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::time::{Duration, Instant};
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ORG: &str = "ManyBodyLab";

    fn member(login: &str) -> MembershipEntry {
        MembershipEntry {
            login: login.into(),
            avatar_url: format!("https://avatars.example.com/{login}.png"),
            html_url: format!("https://github.com/{login}"),
        }
    }

    fn enricher_for(server: &MockServer, concurrency: u32) -> Enricher {
        let config = DirectoryConfig {
            base_url: server.uri(),
            timeout_secs: 5,
            concurrency,
            ..DirectoryConfig::default()
        };
        Enricher::new(&config).unwrap()
    }

    async fn mount_members(server: &MockServer, logins: &[&str]) {
        let body: Vec<MembershipEntry> = logins.iter().map(|l| member(l)).collect();
        Mock::given(method("GET"))
            .and(path(format!("/orgs/{ORG}/members")))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    async fn mount_detail(server: &MockServer, login: &str, detail: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(format!("/users/{login}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(detail))
            .mount(server)
            .await;
    }

    async fn mount_slow_detail(server: &MockServer, login: &str, delay: Duration) {
        Mock::given(method("GET"))
            .and(path(format!("/users/{login}")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{}")
                    .set_delay(delay),
            )
            .mount(server)
            .await;
    }

    fn logins(profiles: &[EnrichedProfile]) -> BTreeSet<String> {
        profiles.iter().map(|p| p.login.clone()).collect()
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    // -----------------------------------------------------------------------
    // Assembly
    // -----------------------------------------------------------------------

    #[test]
    fn sparse_detail_falls_back_per_field() {
        let detail = UserDetail {
            name: None,
            bio: None,
            blog: Some("https://linkedin.com/in/jdoe123/extra".into()),
            twitter_username: None,
        };
        let profile = enrich_profile(ORG, member("jdoe"), &detail);

        assert_eq!(profile.name, "jdoe");
        assert_eq!(profile.bio, "Member of ManyBodyLab organization");
        assert_eq!(profile.linkedin.as_deref(), Some("jdoe123"));
        assert_eq!(profile.login, "jdoe");
        assert_eq!(profile.avatar_url, "https://avatars.example.com/jdoe.png");
    }

    #[test]
    fn non_linkedin_blog_has_no_handle() {
        let detail = UserDetail {
            blog: Some("https://example.com/notlinkedin".into()),
            ..UserDetail::default()
        };
        let profile = enrich_profile(ORG, member("jdoe"), &detail);
        assert!(profile.linkedin.is_none());
    }

    #[test]
    fn blank_fields_count_as_missing() {
        let detail = UserDetail {
            name: Some("   ".into()),
            bio: Some(String::new()),
            blog: Some(String::new()),
            twitter_username: Some("jdoe".into()),
        };
        let profile = enrich_profile(ORG, member("jdoe"), &detail);
        assert_eq!(profile.name, "jdoe");
        assert_eq!(profile.bio, "Member of ManyBodyLab organization");
        assert!(profile.linkedin.is_none());
    }

    #[test]
    fn full_detail_is_used_and_identity_is_kept() {
        let detail = UserDetail {
            name: Some("Jane Doe".into()),
            bio: Some("Monte Carlo methods.".into()),
            blog: None,
            twitter_username: None,
        };
        let profile = enrich_profile(ORG, member("jdoe"), &detail);
        assert_eq!(profile.name, "Jane Doe");
        assert_eq!(profile.bio, "Monte Carlo methods.");
        assert_eq!(profile.html_url, "https://github.com/jdoe");
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let mut repeat = member("alice");
        repeat.avatar_url = "https://elsewhere/alice.png".into();
        let deduped = dedupe_by_login(vec![member("alice"), member("bob"), repeat]);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].avatar_url, "https://avatars.example.com/alice.png");
    }

    // -----------------------------------------------------------------------
    // Pipeline against a mock directory
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn all_members_enriched() {
        let server = MockServer::start().await;
        let all = ["alice", "bob", "carol", "dave"];
        mount_members(&server, &all).await;
        for login in all {
            mount_detail(
                &server,
                login,
                serde_json::json!({"name": format!("{login} name"), "bio": "physicist"}),
            )
            .await;
        }

        let profiles = enricher_for(&server, 8).fetch_members(ORG).await;

        assert_eq!(profiles.len(), all.len());
        assert_eq!(logins(&profiles), set(&all));
        for p in &profiles {
            assert_eq!(p.name, format!("{} name", p.login));
            assert_eq!(p.bio, "physicist");
        }
    }

    #[tokio::test]
    async fn failed_listing_short_circuits() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("/orgs/{ORG}/members")))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path_regex("^/users/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(0)
            .mount(&server)
            .await;

        let profiles = enricher_for(&server, 8).fetch_members(ORG).await;
        assert!(profiles.is_empty());
    }

    #[tokio::test]
    async fn non_array_listing_is_empty() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("/orgs/{ORG}/members")))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"login": "alice"})),
            )
            .mount(&server)
            .await;

        assert!(enricher_for(&server, 8).fetch_members(ORG).await.is_empty());
    }

    #[tokio::test]
    async fn one_failed_detail_drops_only_that_member() {
        let server = MockServer::start().await;
        mount_members(&server, &["alice", "bob", "carol"]).await;
        mount_detail(&server, "alice", serde_json::json!({"name": "Alice"})).await;
        mount_detail(
            &server,
            "carol",
            serde_json::json!({"blog": "https://linkedin.com/in/carol-q"}),
        )
        .await;

        Mock::given(method("GET"))
            .and(path("/users/bob"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let profiles = enricher_for(&server, 8).fetch_members(ORG).await;

        assert_eq!(profiles.len(), 2);
        assert_eq!(logins(&profiles), set(&["alice", "carol"]));

        let alice = profiles.iter().find(|p| p.login == "alice").unwrap();
        assert_eq!(alice.name, "Alice");
        let carol = profiles.iter().find(|p| p.login == "carol").unwrap();
        assert_eq!(carol.name, "carol");
        assert_eq!(carol.linkedin.as_deref(), Some("carol-q"));
    }

    #[tokio::test]
    async fn repeated_runs_agree_as_sets() {
        let server = MockServer::start().await;
        let all = ["alice", "bob", "carol"];
        mount_members(&server, &all).await;
        for login in all {
            mount_detail(
                &server,
                login,
                serde_json::json!({"blog": format!("https://linkedin.com/in/{login}-li")}),
            )
            .await;
        }

        let enricher = enricher_for(&server, 2);
        let first: HashSet<EnrichedProfile> =
            enricher.fetch_members(ORG).await.into_iter().collect();
        let second: HashSet<EnrichedProfile> =
            enricher.fetch_members(ORG).await.into_iter().collect();

        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn duplicate_logins_are_fetched_once() {
        let server = MockServer::start().await;
        mount_members(&server, &["alice", "alice", "bob"]).await;

        Mock::given(method("GET"))
            .and(path("/users/alice"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;
        mount_detail(&server, "bob", serde_json::json!({})).await;

        let profiles = enricher_for(&server, 8).fetch_members(ORG).await;
        assert_eq!(profiles.len(), 2);
        assert_eq!(logins(&profiles).len(), 2);
    }

    #[tokio::test]
    async fn serial_concurrency_still_completes() {
        let server = MockServer::start().await;
        let all = ["a1", "a2", "a3", "a4", "a5"];
        mount_members(&server, &all).await;
        for login in all {
            mount_detail(&server, login, serde_json::json!({"bio": null})).await;
        }

        let profiles = enricher_for(&server, 0).fetch_members(ORG).await;
        assert_eq!(profiles.len(), all.len());
        assert!(profiles.iter().all(|p| p.bio == "Member of ManyBodyLab organization"));
    }

    #[tokio::test]
    async fn hung_detail_is_dropped_after_timeout() {
        let server = MockServer::start().await;
        mount_members(&server, &["alice", "slow"]).await;
        mount_detail(&server, "alice", serde_json::json!({"name": "Alice"})).await;
        mount_slow_detail(&server, "slow", Duration::from_secs(5)).await;

        let config = DirectoryConfig {
            base_url: server.uri(),
            timeout_secs: 1,
            ..DirectoryConfig::default()
        };
        let enricher = Enricher::new(&config).unwrap();

        let started = Instant::now();
        let profiles = enricher.fetch_members(ORG).await;
        let elapsed = started.elapsed();

        assert_eq!(logins(&profiles), set(&["alice"]));
        assert_eq!(profiles[0].name, "Alice");
        assert!(elapsed >= Duration::from_secs(1), "returned before the timeout: {elapsed:?}");
        assert!(elapsed < Duration::from_secs(3), "waited on the hung call: {elapsed:?}");
    }

    #[tokio::test]
    async fn concurrency_bounds_requests_in_flight() {
        let delay = Duration::from_millis(300);
        let server = MockServer::start().await;
        let all = ["a1", "a2", "a3", "a4"];
        mount_members(&server, &all).await;
        for login in all {
            mount_slow_detail(&server, login, delay).await;
        }

        // One at a time: four sequential delays.
        let started = Instant::now();
        let profiles = enricher_for(&server, 1).fetch_members(ORG).await;
        let serial = started.elapsed();
        assert_eq!(profiles.len(), all.len());
        assert!(serial >= delay * 4, "more than one request in flight: {serial:?}");

        // Two at a time: two waves.
        let started = Instant::now();
        let profiles = enricher_for(&server, 2).fetch_members(ORG).await;
        let paired = started.elapsed();
        assert_eq!(profiles.len(), all.len());
        assert!(paired >= delay * 2, "more than two requests in flight: {paired:?}");
        assert!(paired < delay * 4, "requests were not overlapped: {paired:?}");

        // Bound at least the member count: a single wave.
        let started = Instant::now();
        let profiles = enricher_for(&server, 8).fetch_members(ORG).await;
        let unbounded = started.elapsed();
        assert_eq!(profiles.len(), all.len());
        assert!(unbounded >= delay);
        assert!(unbounded < delay * 3, "requests were not overlapped: {unbounded:?}");
    }
}
