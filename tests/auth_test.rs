//! Login, logout and session resume against a mock service.

use serde_json::json;
use skyreader::config::Config;
use skyreader::error::FeedError;
use skyreader::feed::{FeedItem, FeedSource, PageFetcher};
use skyreader::session::{Authenticator, ResumeOutcome, Session, SessionHandle, SessionStore};
use skyreader::xrpc::XrpcClient;
use tempfile::TempDir;
use wiremock::matchers::{bearer_token, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn stored_session() -> Session {
    Session {
        did: "did:plc:viewer".to_string(),
        handle: "viewer.test".to_string(),
        access_jwt: "old-access".to_string(),
        refresh_jwt: "old-refresh".to_string(),
        email: None,
    }
}

fn session_json(access: &str, refresh: &str) -> serde_json::Value {
    json!({
        "did": "did:plc:viewer",
        "handle": "viewer.test",
        "accessJwt": access,
        "refreshJwt": refresh
    })
}

fn authenticator(server: &MockServer, dir: &TempDir) -> Authenticator {
    let mut config = Config::for_testing();
    config.service_url = server.uri();
    let client = XrpcClient::new(&config, SessionHandle::new()).unwrap();
    Authenticator::new(client, SessionStore::new(dir.path()))
}

#[tokio::test]
async fn test_resume_without_stored_session() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let auth = authenticator(&server, &dir);

    assert_eq!(auth.resume().await.unwrap(), ResumeOutcome::NoSession);
    assert!(!auth.session().is_authenticated());
}

#[tokio::test]
async fn test_resume_valid_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/xrpc/com.atproto.server.getSession"))
        .and(header("authorization", "Bearer old-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "did": "did:plc:viewer",
            "handle": "viewer.test"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    SessionStore::new(dir.path())
        .save(&stored_session())
        .await
        .unwrap();
    let auth = authenticator(&server, &dir);

    assert_eq!(
        auth.resume().await.unwrap(),
        ResumeOutcome::Resumed(stored_session())
    );
    assert_eq!(auth.session().current(), Some(stored_session()));
}

#[tokio::test]
async fn test_resume_refreshes_expired_access_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/xrpc/com.atproto.server.getSession"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "ExpiredToken",
            "message": "Token has expired"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.server.refreshSession"))
        .and(header("authorization", "Bearer old-refresh"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(session_json("new-access", "new-refresh")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path());
    store.save(&stored_session()).await.unwrap();
    let auth = authenticator(&server, &dir);

    let ResumeOutcome::Refreshed(session) = auth.resume().await.unwrap() else {
        panic!("expected a refreshed session");
    };
    assert_eq!(session.access_jwt, "new-access");
    assert_eq!(auth.session().current(), Some(session.clone()));
    // The refreshed session replaces the stored one.
    assert_eq!(store.load().await.unwrap(), Some(session));
}

#[tokio::test]
async fn test_resume_discards_rejected_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/xrpc/com.atproto.server.getSession"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.server.refreshSession"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "ExpiredToken",
            "message": "Refresh token has expired"
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path());
    store.save(&stored_session()).await.unwrap();
    let auth = authenticator(&server, &dir);

    assert_eq!(auth.resume().await.unwrap(), ResumeOutcome::Expired);
    assert!(!auth.session().is_authenticated());
    assert_eq!(store.load().await.unwrap(), None);
}

#[tokio::test]
async fn test_resume_keeps_session_when_service_unreachable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/xrpc/com.atproto.server.getSession"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    SessionStore::new(dir.path())
        .save(&stored_session())
        .await
        .unwrap();
    let auth = authenticator(&server, &dir);

    assert_eq!(
        auth.resume().await.unwrap(),
        ResumeOutcome::Unverified(stored_session())
    );
    assert!(auth.session().is_authenticated());
}

#[tokio::test]
async fn test_resume_discards_corrupt_file() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path());
    tokio::fs::write(store.path(), b"not json").await.unwrap();
    let auth = authenticator(&server, &dir);

    assert_eq!(auth.resume().await.unwrap(), ResumeOutcome::NoSession);
    assert!(!store.path().exists());
}

#[tokio::test]
async fn test_login_then_logout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.server.createSession"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_json("a1", "r1")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.server.deleteSession"))
        .and(header("authorization", "Bearer r1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path());
    let auth = authenticator(&server, &dir);

    let session = auth.login("  viewer.test ", "app-pass").await.unwrap();
    assert_eq!(session.handle, "viewer.test");
    assert!(auth.session().is_authenticated());
    assert_eq!(store.load().await.unwrap(), Some(session));

    auth.logout().await.unwrap();
    assert!(!auth.session().is_authenticated());
    assert_eq!(store.load().await.unwrap(), None);
}

#[tokio::test]
async fn test_login_with_bad_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.server.createSession"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "AuthenticationRequired",
            "message": "Invalid identifier or password"
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let auth = authenticator(&server, &dir);

    let err = auth.login("viewer.test", "wrong").await.unwrap_err();
    assert!(err
        .downcast_ref::<FeedError>()
        .is_some_and(FeedError::is_auth));
    assert!(!auth.session().is_authenticated());
    assert!(!SessionStore::new(dir.path()).path().exists());
}

fn expired_token() -> ResponseTemplate {
    ResponseTemplate::new(400).set_body_json(json!({
        "error": "ExpiredToken",
        "message": "Token has expired"
    }))
}

fn home_source() -> FeedSource {
    FeedSource::HomeFeed {
        feed_uri: "at://did:plc:feeds/app.bsky.feed.generator/everything".to_string(),
    }
}

#[tokio::test]
async fn test_fetch_refreshes_expired_token_and_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.feed.getFeed"))
        .and(bearer_token("old-access"))
        .respond_with(expired_token())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.server.refreshSession"))
        .and(bearer_token("old-refresh"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(session_json("new-access", "new-refresh")),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.feed.getFeed"))
        .and(bearer_token("new-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "feed": [],
            "cursor": "c1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path());
    let auth = authenticator(&server, &dir);
    auth.session().set(stored_session());

    let page = PageFetcher::<FeedItem>::fetch(&auth, &home_source(), 25, None)
        .await
        .unwrap();
    assert_eq!(page.cursor.as_deref(), Some("c1"));

    let session = auth.session().current().unwrap();
    assert_eq!(session.access_jwt, "new-access");
    assert_eq!(session.refresh_jwt, "new-refresh");
    assert_eq!(store.load().await.unwrap(), Some(session));
}

#[tokio::test]
async fn test_concurrent_expiries_refresh_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.feed.getFeed"))
        .and(bearer_token("old-access"))
        .respond_with(expired_token())
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.server.refreshSession"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(session_json("new-access", "new-refresh")),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.feed.getFeed"))
        .and(bearer_token("new-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"feed": []})))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let auth = authenticator(&server, &dir);
    auth.session().set(stored_session());
    let source = home_source();

    let (first, second) = futures_util::join!(
        PageFetcher::<FeedItem>::fetch(&auth, &source, 25, None),
        PageFetcher::<FeedItem>::fetch(&auth, &source, 25, None),
    );
    assert!(first.is_ok());
    assert!(second.is_ok());
}

#[tokio::test]
async fn test_rejected_refresh_is_an_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.actor.getProfile"))
        .respond_with(expired_token())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.server.refreshSession"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "ExpiredToken",
            "message": "Refresh token has expired"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let auth = authenticator(&server, &dir);
    auth.session().set(stored_session());

    let err = auth
        .call(|client| async move { client.get_profile("alice.test").await })
        .await
        .unwrap_err();
    assert!(err.is_auth());
    // The caller decides to log out; the session is left as it was.
    assert_eq!(auth.session().current(), Some(stored_session()));
}

#[tokio::test]
async fn test_other_auth_errors_are_not_refreshed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.actor.getProfile"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "InvalidToken",
            "message": "Bad token"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.server.refreshSession"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let auth = authenticator(&server, &dir);
    auth.session().set(stored_session());

    let err = auth
        .call(|client| async move { client.get_profile("alice.test").await })
        .await
        .unwrap_err();
    assert!(matches!(err, FeedError::Auth(_)));
}
