//! Remote-URL normalization.
//!
//! The remote is configured as a bare `host/org/repo` (scheme optional) plus
//! an access token; the store needs a full https URL with the token embedded
//! as userinfo and percent-encoded.

use url::form_urlencoded;

pub fn normalize(raw_url: &str, token: &str) -> String {
    let clean = raw_url
        .strip_prefix("https://")
        .or_else(|| raw_url.strip_prefix("http://"))
        .unwrap_or(raw_url);
    let clean = if clean.ends_with(".git") {
        clean.to_string()
    } else {
        format!("{clean}.git")
    };

    if token.is_empty() {
        return format!("https://{clean}");
    }
    let encoded: String = form_urlencoded::byte_serialize(token.as_bytes()).collect();
    format!("https://{encoded}@{clean}")
}
