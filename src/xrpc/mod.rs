//! HTTP client for the hosted XRPC service.
//!
//! Every authenticated call reads the access token from the shared
//! [`SessionHandle`] at request time, so a login or logout is visible to all
//! clones of the client immediately.

mod fetch;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::Config;
use crate::constants::{POST_COLLECTION, USER_AGENT};
use crate::error::FeedError;
use crate::feed::model::{lenient, FeedItem, FeedViewPost, Page, Profile, Thread};
use crate::notification::Notification;
use crate::session::{Session, SessionHandle};

/// Error codes the service uses for credential problems.
const AUTH_ERROR_CODES: &[&str] = &["AuthenticationRequired", "AuthMissing", "InvalidToken"];

/// Error code for an access token past its lifetime, recoverable by a refresh.
const EXPIRED_TOKEN_CODE: &str = "ExpiredToken";

#[derive(Debug, Deserialize)]
struct DidResponse {
    did: String,
}

#[derive(Debug, Deserialize)]
struct PostThreadResponse {
    #[serde(default, deserialize_with = "lenient")]
    thread: Thread,
}

#[derive(Debug, Deserialize)]
struct XrpcErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// Reference to a created record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecordRef {
    pub uri: String,
    pub cid: String,
}

/// Which token, if any, to send with a request.
#[derive(Clone, Copy)]
enum Bearer<'a> {
    None,
    Access,
    Token(&'a str),
}

#[derive(Clone)]
pub struct XrpcClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionHandle,
}

impl XrpcClient {
    /// Build a client for the configured service.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &Config, session: SessionHandle) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: config.service_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    #[must_use]
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    fn endpoint(&self, nsid: &str) -> String {
        format!("{}/xrpc/{nsid}", self.base_url)
    }

    fn authorize(
        &self,
        request: reqwest::RequestBuilder,
        bearer: Bearer<'_>,
    ) -> Result<reqwest::RequestBuilder, FeedError> {
        match bearer {
            Bearer::None => Ok(request),
            Bearer::Token(token) => Ok(request.bearer_auth(token)),
            Bearer::Access => {
                let session = self
                    .session
                    .current()
                    .ok_or_else(|| FeedError::Auth("no active session".to_string()))?;
                Ok(request.bearer_auth(session.access_jwt))
            }
        }
    }

    async fn query(
        &self,
        nsid: &str,
        params: &[(&str, &str)],
        bearer: Bearer<'_>,
    ) -> Result<Value, FeedError> {
        let request = self.http.get(self.endpoint(nsid)).query(params);
        let request = self.authorize(request, bearer)?;
        debug!(nsid, "XRPC query");
        Self::send(nsid, request).await
    }

    async fn procedure(
        &self,
        nsid: &str,
        body: Option<&Value>,
        bearer: Bearer<'_>,
    ) -> Result<Value, FeedError> {
        let mut request = self.http.post(self.endpoint(nsid));
        if let Some(body) = body {
            request = request.json(body);
        }
        let request = self.authorize(request, bearer)?;
        debug!(nsid, "XRPC procedure");
        Self::send(nsid, request).await
    }

    async fn send(nsid: &str, request: reqwest::RequestBuilder) -> Result<Value, FeedError> {
        let response = request.send().await.map_err(|e| FeedError::Upstream {
            endpoint: nsid.to_string(),
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        })?;

        let status = response.status();
        if status.is_success() {
            let body = response.bytes().await.map_err(|e| FeedError::Upstream {
                endpoint: nsid.to_string(),
                status: Some(status.as_u16()),
                message: format!("failed to read body: {e}"),
            })?;
            if body.is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_slice(&body).map_err(|e| FeedError::InvalidResponse {
                endpoint: nsid.to_string(),
                message: e.to_string(),
            });
        }

        let body: Option<XrpcErrorBody> = response.json().await.ok();
        let code = body.as_ref().and_then(|b| b.error.clone());
        let message = body
            .and_then(|b| b.message)
            .or_else(|| code.clone())
            .unwrap_or_else(|| status.to_string());

        if code.as_deref() == Some(EXPIRED_TOKEN_CODE) {
            debug!(nsid, %status, "Access token expired");
            return Err(FeedError::ExpiredToken(message));
        }
        if status == reqwest::StatusCode::UNAUTHORIZED
            || code
                .as_deref()
                .is_some_and(|c| AUTH_ERROR_CODES.contains(&c))
        {
            warn!(nsid, %status, "Upstream rejected credentials");
            return Err(FeedError::Auth(message));
        }

        Err(FeedError::Upstream {
            endpoint: nsid.to_string(),
            status: Some(status.as_u16()),
            message,
        })
    }

    // ---- Session lifecycle ----

    /// Log in with a handle (or email) and app password.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Auth`] on bad credentials.
    pub async fn create_session(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<Session, FeedError> {
        let body = json!({ "identifier": identifier, "password": password });
        let value = self
            .procedure("com.atproto.server.createSession", Some(&body), Bearer::None)
            .await?;
        decode("com.atproto.server.createSession", value)
    }

    /// Check the current access token; returns the session's DID.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Auth`] when the token is missing or expired.
    pub async fn get_session(&self) -> Result<String, FeedError> {
        let value = self
            .query("com.atproto.server.getSession", &[], Bearer::Access)
            .await?;
        decode::<DidResponse>("com.atproto.server.getSession", value).map(|r| r.did)
    }

    /// Exchange a refresh token for a new session.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Auth`] when the refresh token is no longer valid.
    pub async fn refresh_session(&self, refresh_jwt: &str) -> Result<Session, FeedError> {
        let value = self
            .procedure(
                "com.atproto.server.refreshSession",
                None,
                Bearer::Token(refresh_jwt),
            )
            .await?;
        decode("com.atproto.server.refreshSession", value)
    }

    /// Revoke a session on the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete_session(&self, refresh_jwt: &str) -> Result<(), FeedError> {
        self.procedure(
            "com.atproto.server.deleteSession",
            None,
            Bearer::Token(refresh_jwt),
        )
        .await
        .map(|_| ())
    }

    // ---- Reads ----

    /// Resolve a handle to a DID. DIDs are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle cannot be resolved.
    pub async fn resolve_handle(&self, actor: &str) -> Result<String, FeedError> {
        if actor.starts_with("did:") {
            return Ok(actor.to_string());
        }
        let value = self
            .query(
                "com.atproto.identity.resolveHandle",
                &[("handle", actor)],
                Bearer::Access,
            )
            .await?;
        decode::<DidResponse>("com.atproto.identity.resolveHandle", value).map(|r| r.did)
    }

    /// Fetch an account's detailed profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the profile is malformed.
    pub async fn get_profile(&self, actor: &str) -> Result<Profile, FeedError> {
        let value = self
            .query("app.bsky.actor.getProfile", &[("actor", actor)], Bearer::Access)
            .await?;
        decode("app.bsky.actor.getProfile", value)
    }

    /// Fetch a post with its parent and direct replies.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get_post_thread(&self, uri: &str) -> Result<Thread, FeedError> {
        let value = self
            .query(
                "app.bsky.feed.getPostThread",
                &[("uri", uri), ("depth", "1"), ("parentHeight", "1")],
                Bearer::Access,
            )
            .await?;
        decode::<PostThreadResponse>("app.bsky.feed.getPostThread", value).map(|r| r.thread)
    }

    /// One page of a feed generator.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get_feed(
        &self,
        feed_uri: &str,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<Page<FeedItem>, FeedError> {
        let limit = limit.to_string();
        let mut params = vec![("feed", feed_uri), ("limit", limit.as_str())];
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor));
        }
        let value = self
            .query("app.bsky.feed.getFeed", &params, Bearer::Access)
            .await?;
        Ok(decode_page::<FeedViewPost, _>(&value, "feed"))
    }

    /// One page of posts authored by `actor`.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle cannot be resolved or the request fails.
    pub async fn get_author_feed(
        &self,
        actor: &str,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<Page<FeedItem>, FeedError> {
        let did = self.resolve_handle(actor).await?;
        let limit = limit.to_string();
        let mut params = vec![("actor", did.as_str()), ("limit", limit.as_str())];
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor));
        }
        let value = self
            .query("app.bsky.feed.getAuthorFeed", &params, Bearer::Access)
            .await?;
        Ok(decode_page::<FeedViewPost, _>(&value, "feed"))
    }

    /// One page of the viewer's notifications.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_notifications(
        &self,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<Page<Notification>, FeedError> {
        let limit = limit.to_string();
        let mut params = vec![("limit", limit.as_str())];
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor));
        }
        let value = self
            .query(
                "app.bsky.notification.listNotifications",
                &params,
                Bearer::Access,
            )
            .await?;
        Ok(decode_page::<Notification, _>(&value, "notifications"))
    }

    // ---- Writes ----

    /// Publish a plain-text post as the logged-in account.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Auth`] without a session, or an upstream error.
    pub async fn create_post(&self, text: &str) -> Result<RecordRef, FeedError> {
        let session = self
            .session
            .current()
            .ok_or_else(|| FeedError::Auth("no active session".to_string()))?;
        let body = json!({
            "repo": session.did,
            "collection": POST_COLLECTION,
            "record": {
                "$type": POST_COLLECTION,
                "text": text,
                "createdAt": Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            }
        });
        let value = self
            .procedure("com.atproto.repo.createRecord", Some(&body), Bearer::Access)
            .await?;
        decode("com.atproto.repo.createRecord", value)
    }
}

fn decode<T: DeserializeOwned>(nsid: &str, value: Value) -> Result<T, FeedError> {
    serde_json::from_value(value).map_err(|e| FeedError::InvalidResponse {
        endpoint: nsid.to_string(),
        message: e.to_string(),
    })
}

/// Decode a paginated list entry by entry as `W`, skipping entries that do
/// not decode.
fn decode_page<W, T>(value: &Value, key: &str) -> Page<T>
where
    W: DeserializeOwned,
    T: From<W>,
{
    let raw = value.get(key).and_then(Value::as_array);
    let total = raw.map_or(0, Vec::len);
    let items: Vec<T> = raw
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| W::deserialize(entry).ok())
                .map(T::from)
                .collect()
        })
        .unwrap_or_default();
    if items.len() < total {
        warn!(
            list = key,
            skipped = total - items.len(),
            "Skipped malformed entries"
        );
    }
    let cursor = value
        .get("cursor")
        .and_then(Value::as_str)
        .filter(|c| !c.is_empty())
        .map(ToString::to_string);
    Page::new(items, cursor)
}
