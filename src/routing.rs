//! Paths for posts and profiles, and parsing of shared post URLs.

use regex::Regex;

static HANDLE: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
    Regex::new(r"^([a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?$")
        .unwrap()
});

static DID: std::sync::LazyLock<Regex> =
    std::sync::LazyLock::new(|| Regex::new(r"^did:[a-z]+:[a-zA-Z0-9._:%-]+$").unwrap());

static RKEY: std::sync::LazyLock<Regex> =
    std::sync::LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._:~-]{1,512}$").unwrap());

// Shared post links, e.g. https://bsky.app/profile/alice.bsky.social/post/3abc
static POST_URL: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
    Regex::new(r"^https?://bsky\.(app|social)/profile/([^/]+)/post/([a-zA-Z0-9]+)").unwrap()
});

/// Record key of an AT URI: its last path segment.
#[must_use]
pub fn rkey(uri: &str) -> &str {
    uri.rsplit('/').next().unwrap_or(uri)
}

/// Repository (DID or handle) of an AT URI.
#[must_use]
pub fn repo(uri: &str) -> Option<&str> {
    uri.strip_prefix("at://")?.split('/').next()
}

/// Build the AT URI of a post.
#[must_use]
pub fn post_uri(repo: &str, rkey: &str) -> String {
    format!("at://{repo}/{}/{rkey}", crate::constants::POST_COLLECTION)
}

/// Reader path of a profile.
#[must_use]
pub fn profile_path(actor: &str) -> String {
    format!("/{}", urlencoding::encode(actor))
}

/// Reader path of a post by `actor`.
#[must_use]
pub fn post_path(actor: &str, uri: &str) -> String {
    format!(
        "/{}/{}",
        urlencoding::encode(actor),
        urlencoding::encode(rkey(uri))
    )
}

/// Whether `actor` is a syntactically valid handle or DID.
#[must_use]
pub fn is_valid_actor(actor: &str) -> bool {
    actor.len() <= 253 && (HANDLE.is_match(actor) || DID.is_match(actor))
}

#[must_use]
pub fn is_valid_rkey(rkey: &str) -> bool {
    RKEY.is_match(rkey) && rkey != "." && rkey != ".."
}

/// Parse a shared bsky.app post URL into `(actor, rkey)`.
#[must_use]
pub fn parse_post_url(url: &str) -> Option<(String, String)> {
    let caps = POST_URL.captures(url)?;
    Some((caps.get(2)?.as_str().to_string(), caps.get(3)?.as_str().to_string()))
}
