//! Secondary-profile handle extraction.
//!
//! Members often put a LinkedIn profile URL in their directory "website"
//! field. The handle is the first path segment after `linkedin.com/in/`.

use regex::Regex;
use std::sync::LazyLock;

/// Matches `linkedin.com/in/<segment>`; the host is case-insensitive, the
/// `/in/` marker is not. The host must start the string or follow `/`, `.`
/// or `@`, so look-alike domains such as `notlinkedin.com` do not match.
/// The segment stops at the next `/` or `?`.
static LINKEDIN_PROFILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[/.@])(?i:linkedin\.com)/in/([^/?]+)").expect("linkedin profile regex")
});

/// Extract the LinkedIn handle from a free-text link, if it has one.
///
/// Total over arbitrary input: anything that does not match yields `None`.
pub fn extract_linkedin_handle(link: &str) -> Option<String> {
    LINKEDIN_PROFILE_RE
        .captures(link.trim())
        .map(|caps| caps[1].to_string())
}
