//! Integration tests for web routes.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::json;
use skyreader::config::Config;
use skyreader::session::{Authenticator, Session, SessionHandle, SessionStore};
use skyreader::web::{create_app, AppState};
use skyreader::xrpc::XrpcClient;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{bearer_token, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn viewer() -> Session {
    Session {
        did: "did:plc:viewer".to_string(),
        handle: "viewer.test".to_string(),
        access_jwt: "access-token".to_string(),
        refresh_jwt: "refresh-token".to_string(),
        email: None,
    }
}

fn post_uri(rkey: &str) -> String {
    format!("at://did:plc:alice/app.bsky.feed.post/{rkey}")
}

fn feed_entry(rkey: &str, text: &str) -> serde_json::Value {
    json!({
        "post": {
            "uri": post_uri(rkey),
            "cid": format!("cid-{rkey}"),
            "author": {"did": "did:plc:alice", "handle": "alice.test", "displayName": "Alice"},
            "record": {"text": text, "createdAt": "2024-11-20T10:00:00.000Z"}
        }
    })
}

/// Create a test app talking to `server`, optionally already logged in.
fn create_test_app(server: &MockServer, dir: &TempDir, logged_in: bool) -> (Router, AppState) {
    create_test_app_with(server, dir, logged_in, |_| {})
}

fn create_test_app_with(
    server: &MockServer,
    dir: &TempDir,
    logged_in: bool,
    configure: impl FnOnce(&mut Config),
) -> (Router, AppState) {
    let mut config = Config::for_testing();
    config.service_url = server.uri();
    config.session_dir = dir.path().to_path_buf();
    configure(&mut config);

    let handle = SessionHandle::new();
    if logged_in {
        handle.set(viewer());
    }
    let client = XrpcClient::new(&config, handle).unwrap();
    let auth = Authenticator::new(client, SessionStore::new(dir.path()));
    let state = AppState::new(config, auth);
    (create_app(state.clone()), state)
}

async fn mount_posts_feed(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.feed.getFeed"))
        .and(query_param_is_missing("cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "feed": [feed_entry("1", "first post"), feed_entry("2", "second post")],
            "cursor": "c1"
        })))
        .mount(server)
        .await;
}

async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

fn visible_body(view: &str, sentinel: &str, ratio: f64) -> String {
    format!(
        "view={}&sentinel={}&ratio={ratio}",
        urlencoding::encode(view),
        urlencoding::encode(sentinel)
    )
}

#[tokio::test]
async fn test_healthz() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let (app, _) = create_test_app(&server, &dir, false);

    let response = app.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "OK");
}

#[tokio::test]
async fn test_home_requires_login() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let (app, _) = create_test_app(&server, &dir, false);

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_login_page_renders() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let (app, _) = create_test_app(&server, &dir, false);

    let response = app.oneshot(get("/login?expired=1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Your session has expired"));
    assert!(body.contains("class=\"info\""));
    assert!(body.contains("name=\"password\""));
}

#[tokio::test]
async fn test_home_renders_first_page() {
    let server = MockServer::start().await;
    mount_posts_feed(&server).await;
    let dir = TempDir::new().unwrap();
    let (app, _) = create_test_app(&server, &dir, true);

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("first post"));
    assert!(body.contains("second post"));
    assert!(body.contains("data-view=\"home:posts\""));
    assert!(body.contains(&format!("data-sentinel=\"{}\"", post_uri("2"))));
    assert!(body.contains("data-more=\"true\""));
}

#[tokio::test]
async fn test_visibility_report_appends_next_page_once() {
    let server = MockServer::start().await;
    mount_posts_feed(&server).await;
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.feed.getFeed"))
        .and(query_param("cursor", "c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "feed": [feed_entry("3", "third post")],
            "cursor": "c2"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let (app, _) = create_test_app(&server, &dir, true);

    let response = app.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Below the threshold nothing is fetched.
    let response = app
        .clone()
        .oneshot(post_form(
            "/feed/visible",
            &visible_body("home:posts", &post_uri("2"), 0.1),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(post_form(
            "/feed/visible",
            &visible_body("home:posts", &post_uri("2"), 0.9),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("first post"));
    assert!(body.contains("third post"));
    assert!(body.contains(&format!("data-sentinel=\"{}\"", post_uri("3"))));

    // The old sentinel is stale now.
    let response = app
        .oneshot(post_form(
            "/feed/visible",
            &visible_body("home:posts", &post_uri("2"), 1.0),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_visibility_report_validation() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let (app, _) = create_test_app(&server, &dir, false);
    let response = app
        .oneshot(post_form("/feed/visible", &visible_body("home:posts", "x", 1.0)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (app, _) = create_test_app(&server, &dir, true);
    let response = app
        .clone()
        .oneshot(post_form("/feed/visible", &visible_body("bogus", "x", 1.0)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // A view that was never rendered has nothing to load.
    let response = app
        .oneshot(post_form("/feed/visible", &visible_body("notifications", "x", 1.0)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_load_more_redirects_back() {
    let server = MockServer::start().await;
    mount_posts_feed(&server).await;
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.feed.getFeed"))
        .and(query_param("cursor", "c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"feed": []})))
        .expect(1)
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let (app, state) = create_test_app(&server, &dir, true);

    app.clone().oneshot(get("/")).await.unwrap();
    let response = app
        .oneshot(post_form("/feed/more", "view=home%3Aposts"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/?feed=posts");

    let view = state.views.home(skyreader::web::HomeTab::Posts);
    assert!(!view.controller().has_next_page());
    assert_eq!(view.controller().items().len(), 2);
}

#[tokio::test]
async fn test_rejected_session_sends_to_login() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.feed.getFeed"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "ExpiredToken",
            "message": "Token has expired"
        })))
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
    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.server.deleteSession"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let (app, state) = create_test_app(&server, &dir, true);

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login?expired=1");
    assert!(!state.auth.session().is_authenticated());
}

#[tokio::test]
async fn test_expired_access_token_is_refreshed_in_place() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.feed.getFeed"))
        .and(bearer_token("access-token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "ExpiredToken",
            "message": "Token has expired"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.server.refreshSession"))
        .and(bearer_token("refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "did": "did:plc:viewer",
            "handle": "viewer.test",
            "accessJwt": "access-2",
            "refreshJwt": "refresh-2"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.feed.getFeed"))
        .and(bearer_token("access-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "feed": [feed_entry("1", "first post")],
            "cursor": "c1"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.server.deleteSession"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let (app, state) = create_test_app(&server, &dir, true);

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("first post"));

    let session = state.auth.session().current().unwrap();
    assert_eq!(session.access_jwt, "access-2");
    assert_eq!(
        SessionStore::new(dir.path()).load().await.unwrap(),
        Some(session)
    );
}

#[tokio::test]
async fn test_stale_home_is_refetched_on_visit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.feed.getFeed"))
        .and(query_param_is_missing("cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "feed": [feed_entry("1", "first post")],
            "cursor": "c1"
        })))
        .expect(2)
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let (app, state) = create_test_app_with(&server, &dir, true, |config| {
        config.feed_stale_after = std::time::Duration::ZERO;
    });

    app.clone().oneshot(get("/")).await.unwrap();
    let view = state.views.home(skyreader::web::HomeTab::Posts);
    let generation = view.controller().snapshot().generation;

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let snapshot = view.controller().snapshot();
    assert_eq!(snapshot.generation, generation + 1);
    assert_eq!(snapshot.total, 1);
}

#[tokio::test]
async fn test_login_flow() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.server.createSession"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "did": "did:plc:viewer",
            "handle": "viewer.test",
            "accessJwt": "access-token",
            "refreshJwt": "refresh-token"
        })))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let (app, state) = create_test_app(&server, &dir, false);

    let response = app
        .clone()
        .oneshot(post_form("/login", "identifier=&password=secret"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .oneshot(post_form("/login", "identifier=viewer.test&password=app-pass"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    assert_eq!(state.auth.session().current(), Some(viewer()));
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
    let (app, _) = create_test_app(&server, &dir, false);

    let response = app
        .oneshot(post_form("/login", "identifier=viewer.test&password=nope"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_string(response).await;
    assert!(body.contains("Invalid handle or app password."));
    assert!(body.contains("value=\"viewer.test\""));
}

#[tokio::test]
async fn test_compose_publishes_and_resets_home() {
    let server = MockServer::start().await;
    mount_posts_feed(&server).await;
    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.repo.createRecord"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uri": "at://did:plc:viewer/app.bsky.feed.post/new",
            "cid": "bafynew"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let (app, state) = create_test_app(&server, &dir, true);

    app.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(
        state
            .views
            .home(skyreader::web::HomeTab::Posts)
            .controller()
            .items()
            .len(),
        2
    );

    let response = app
        .oneshot(post_form("/compose", "text=hello+world"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/?posted=1");
    assert!(state
        .views
        .home(skyreader::web::HomeTab::Posts)
        .controller()
        .items()
        .is_empty());
}

#[tokio::test]
async fn test_compose_rejects_empty_text() {
    let server = MockServer::start().await;
    mount_posts_feed(&server).await;
    let dir = TempDir::new().unwrap();
    let (app, _) = create_test_app(&server, &dir, true);

    let response = app
        .oneshot(post_form("/compose", "text=+++"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_string(response).await;
    assert!(body.contains("Post text cannot be empty."));
}

#[tokio::test]
async fn test_unknown_profile_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.actor.getProfile"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "InvalidRequest",
            "message": "Profile not found"
        })))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let (app, _) = create_test_app(&server, &dir, true);

    let response = app.oneshot(get("/nobody.test")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_profile_media_tab() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.actor.getProfile"))
        .and(query_param("actor", "alice.test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "did": "did:plc:alice",
            "handle": "alice.test",
            "displayName": "Alice",
            "postsCount": 3
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/xrpc/com.atproto.identity.resolveHandle"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"did": "did:plc:alice"})))
        .mount(&server)
        .await;
    let mut with_image = feed_entry("2", "with picture");
    with_image["post"]["embed"] = json!({
        "$type": "app.bsky.embed.images#view",
        "images": [{"thumb": "https://cdn/t.jpg", "fullsize": "https://cdn/f.jpg", "alt": "cat"}]
    });
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.feed.getAuthorFeed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "feed": [feed_entry("1", "plain words"), with_image]
        })))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let (app, _) = create_test_app(&server, &dir, true);

    let response = app
        .oneshot(get("/alice.test?filter=media"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("with picture"));
    assert!(!body.contains("plain words"));
}
