//! Core domain types for the member directory pipeline.

use serde::{Deserialize, Serialize};
use url::Url;

/// Hint for HTTP-layer caching of directory responses. The pipeline itself
/// never caches; renderers may revalidate on this interval.
pub const DIRECTORY_REVALIDATE_SECS: u64 = 3600;

/// Generated-initials avatar service used when an avatar image fails to load.
const FALLBACK_AVATAR_BASE: &str = "https://ui-avatars.com/api/";

// ---------------------------------------------------------------------------
// Directory records
// ---------------------------------------------------------------------------

/// One entry of the organization membership listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipEntry {
    /// Login identifier, the identity key.
    pub login: String,
    /// Avatar image URL.
    pub avatar_url: String,
    /// Profile page URL.
    pub html_url: String,
}

/// Per-user detail record. Every field may be missing or `null` upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetail {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    /// Free-text "website" field; may hold any URL or be empty.
    #[serde(default)]
    pub blog: Option<String>,
    #[serde(default)]
    pub twitter_username: Option<String>,
}

// ---------------------------------------------------------------------------
// EnrichedProfile
// ---------------------------------------------------------------------------

/// A member record merged from the membership entry and its user detail.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnrichedProfile {
    /// Display name (detail name, else the login).
    pub name: String,
    /// Biography (detail bio, else the organization fallback line).
    pub bio: String,
    /// Membership login.
    pub login: String,
    /// LinkedIn handle extracted from the detail's website field.
    pub linkedin: Option<String>,
    /// Membership avatar URL.
    pub avatar_url: String,
    /// Membership profile URL.
    pub html_url: String,
}

impl EnrichedProfile {
    /// Profile page on the directory, falling back to the canonical GitHub URL.
    pub fn github_url(&self) -> String {
        if self.html_url.is_empty() {
            format!("https://github.com/{}", self.login)
        } else {
            self.html_url.clone()
        }
    }

    /// LinkedIn profile URL, when a handle was extracted.
    pub fn linkedin_url(&self) -> Option<String> {
        self.linkedin
            .as_deref()
            .map(|handle| format!("https://linkedin.com/in/{handle}"))
    }

    /// Initials avatar shown when `avatar_url` cannot be loaded.
    pub fn fallback_avatar_url(&self) -> String {
        Url::parse_with_params(
            FALLBACK_AVATAR_BASE,
            &[
                ("name", self.name.as_str()),
                ("size", "96"),
                ("background", "random"),
            ],
        )
        .map(String::from)
        .unwrap_or_else(|_| FALLBACK_AVATAR_BASE.to_string())
    }
}

/// The biography used when a member has none.
pub fn fallback_bio(organization: &str) -> String {
    format!("Member of {organization} organization")
}
