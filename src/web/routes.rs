use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use super::pages;
use super::views::{AnyView, HomeTab, ViewKey};
use super::AppState;
use crate::components::Alert;
use crate::constants::MAX_POST_LENGTH;
use crate::error::FeedError;
use crate::feed::{ClassificationFilter, FeedEntry, FeedView, LoadOutcome, Observation};
use crate::routing::{is_valid_actor, is_valid_rkey, post_uri};
use crate::session::Session;

/// Create the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/healthz", get(health))
        .route("/login", get(login_page).post(login_post))
        .route("/logout", post(logout))
        .route("/compose", post(compose))
        .route("/notifications", get(notifications))
        .route("/feed/visible", post(feed_visible))
        .route("/feed/more", post(feed_more))
        .route("/:actor", get(profile))
        .route("/:actor/:rkey", get(thread))
}

fn current_session(state: &AppState) -> Result<Session, Response> {
    state
        .auth
        .session()
        .current()
        .ok_or_else(|| Redirect::to("/login").into_response())
}

/// Drop a session the service no longer accepts and send the viewer to log in.
async fn expire_session(state: &AppState, err: &FeedError) -> Response {
    warn!("Session rejected by upstream: {err}");
    if let Err(e) = state.auth.logout().await {
        error!("Failed to clear rejected session: {e:#}");
    }
    state.views.clear();
    Redirect::to("/login?expired=1").into_response()
}

/// Load the first page of a view, starting over when its pages are older
/// than `stale_after`. Returns a response only when the session was rejected;
/// other failures are kept in the view and rendered with it.
async fn load_first<T: FeedEntry>(
    state: &AppState,
    view: &FeedView<T>,
    stale_after: Duration,
) -> Option<Response> {
    if view.reset_if_stale(stale_after) {
        debug!(source = %view.controller().source(), "Refreshing stale view");
    }
    match view.controller().ensure_loaded().await {
        Some(LoadOutcome::Failed(e)) if e.is_auth() => Some(expire_session(state, &e).await),
        _ => None,
    }
}

fn upstream_error(err: &FeedError) -> Response {
    error!("Upstream request failed: {err}");
    (StatusCode::BAD_GATEWAY, "Upstream service error").into_response()
}

// ========== HTML Routes ==========

#[derive(Debug, Deserialize)]
pub struct HomeParams {
    feed: Option<String>,
    posted: Option<u8>,
}

async fn home(State(state): State<AppState>, Query(params): Query<HomeParams>) -> Response {
    let session = match current_session(&state) {
        Ok(s) => s,
        Err(redirect) => return redirect,
    };
    let tab: HomeTab = params
        .feed
        .as_deref()
        .and_then(|f| f.parse().ok())
        .unwrap_or_default();

    let view = state.views.home(tab);
    if let Some(response) = load_first(&state, &view, state.config.feed_stale_after).await {
        return response;
    }

    let snapshot = view.render_snapshot();
    let html = pages::render_home_page(&pages::HomePageParams {
        session: &session,
        tab,
        snapshot: &snapshot,
        threshold: state.views.threshold(),
        notice: params.posted.map(|_| "Your post was published."),
        compose_error: None,
    });
    Html(html.into_string()).into_response()
}

async fn notifications(State(state): State<AppState>) -> Response {
    let session = match current_session(&state) {
        Ok(s) => s,
        Err(redirect) => return redirect,
    };

    let view = state.views.notifications();
    let stale_after = state.config.notifications_stale_after;
    if let Some(response) = load_first(&state, &view, stale_after).await {
        return response;
    }

    let snapshot = view.render_snapshot();
    let html = pages::render_notifications_page(&session, &snapshot, state.views.threshold());
    Html(html.into_string()).into_response()
}

#[derive(Debug, Deserialize)]
pub struct ProfileParams {
    filter: Option<String>,
}

async fn profile(
    State(state): State<AppState>,
    Path(actor): Path<String>,
    Query(params): Query<ProfileParams>,
) -> Response {
    let session = match current_session(&state) {
        Ok(s) => s,
        Err(redirect) => return redirect,
    };
    if !is_valid_actor(&actor) {
        return (StatusCode::NOT_FOUND, "Profile not found").into_response();
    }
    let filter = params
        .filter
        .as_deref()
        .and_then(|f| f.parse::<ClassificationFilter>().ok())
        .filter(|f| *f != ClassificationFilter::All);

    let result = {
        let actor = actor.as_str();
        state
            .auth
            .call(|client| async move { client.get_profile(actor).await })
            .await
    };
    let profile = match result {
        Ok(p) => p,
        Err(e) if e.is_auth() => return expire_session(&state, &e).await,
        Err(FeedError::Upstream {
            status: Some(400 | 404),
            ..
        }) => {
            return (StatusCode::NOT_FOUND, "Profile not found").into_response();
        }
        Err(e) => return upstream_error(&e),
    };

    let view = state.views.profile(&actor, filter);
    if let Some(response) = load_first(&state, &view, state.config.feed_stale_after).await {
        return response;
    }

    let snapshot = view.render_snapshot();
    let html = pages::render_profile_page(&pages::ProfilePageParams {
        session: &session,
        actor: &actor,
        profile: &profile,
        snapshot: &snapshot,
        threshold: state.views.threshold(),
    });
    Html(html.into_string()).into_response()
}

async fn thread(
    State(state): State<AppState>,
    Path((actor, rkey)): Path<(String, String)>,
) -> Response {
    let session = match current_session(&state) {
        Ok(s) => s,
        Err(redirect) => return redirect,
    };
    if !is_valid_actor(&actor) || !is_valid_rkey(&rkey) {
        return (StatusCode::NOT_FOUND, "Post not found").into_response();
    }

    let (actor, rkey) = (actor.as_str(), rkey.as_str());
    let result = state
        .auth
        .call(|client| async move {
            let did = client.resolve_handle(actor).await?;
            client.get_post_thread(&post_uri(&did, rkey)).await
        })
        .await;
    let thread = match result {
        Ok(t) => t,
        Err(e) if e.is_auth() => return expire_session(&state, &e).await,
        Err(FeedError::Upstream {
            status: Some(400 | 404),
            ..
        }) => {
            return (StatusCode::NOT_FOUND, "Post not found").into_response();
        }
        Err(e) => return upstream_error(&e),
    };

    let status = if thread.post.is_some() {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    };
    let html = pages::render_thread_page(&session, &thread);
    (status, Html(html.into_string())).into_response()
}

async fn health() -> &'static str {
    "OK"
}

// ========== Feed Routes ==========

#[derive(Debug, Deserialize)]
pub struct VisibleForm {
    view: String,
    sentinel: String,
    ratio: f64,
}

/// Visibility report from the browser. Answers with the re-rendered list when
/// the report loaded a page and with 204 when it did not fire.
async fn feed_visible(State(state): State<AppState>, Form(form): Form<VisibleForm>) -> Response {
    if !state.auth.session().is_authenticated() {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let Ok(key) = form.view.parse::<ViewKey>() else {
        return (StatusCode::BAD_REQUEST, "Unknown view").into_response();
    };
    let Some(view) = state.views.get(&key) else {
        debug!(view = %key, "Visibility report for an unknown view");
        return StatusCode::NO_CONTENT.into_response();
    };
    let observation = Observation {
        sentinel: form.sentinel,
        ratio: form.ratio,
    };
    let threshold = state.views.threshold();

    match view {
        AnyView::Posts(view) => match view.on_visible(&observation).await {
            None => StatusCode::NO_CONTENT.into_response(),
            Some(LoadOutcome::Failed(e)) if e.is_auth() => expire_fragment(&state, &e).await,
            Some(_) => {
                let snapshot = view.render_snapshot();
                let html = pages::render_post_list(&key, &snapshot, threshold, Utc::now());
                Html(html.into_string()).into_response()
            }
        },
        AnyView::Notifications(view) => match view.on_visible(&observation).await {
            None => StatusCode::NO_CONTENT.into_response(),
            Some(LoadOutcome::Failed(e)) if e.is_auth() => expire_fragment(&state, &e).await,
            Some(_) => {
                let snapshot = view.render_snapshot();
                let html = pages::render_notification_list(&snapshot, threshold, Utc::now());
                Html(html.into_string()).into_response()
            }
        },
    }
}

async fn expire_fragment(state: &AppState, err: &FeedError) -> Response {
    let _ = expire_session(state, err).await;
    StatusCode::UNAUTHORIZED.into_response()
}

#[derive(Debug, Deserialize)]
pub struct MoreForm {
    view: String,
}

/// Explicit "Load more" or "Retry" without script.
async fn feed_more(State(state): State<AppState>, Form(form): Form<MoreForm>) -> Response {
    if !state.auth.session().is_authenticated() {
        return Redirect::to("/login").into_response();
    }
    let Ok(key) = form.view.parse::<ViewKey>() else {
        return (StatusCode::BAD_REQUEST, "Unknown view").into_response();
    };
    let outcome = match state.views.get(&key) {
        Some(AnyView::Posts(view)) => Some(view.controller().load_more().await),
        Some(AnyView::Notifications(view)) => Some(view.controller().load_more().await),
        None => None,
    };
    if let Some(LoadOutcome::Failed(e)) = &outcome {
        if e.is_auth() {
            return expire_session(&state, e).await;
        }
    }
    Redirect::to(&key.path()).into_response()
}

// ========== Session Routes ==========

#[derive(Debug, Deserialize)]
pub struct LoginParams {
    expired: Option<u8>,
}

async fn login_page(State(state): State<AppState>, Query(params): Query<LoginParams>) -> Response {
    if state.auth.session().is_authenticated() {
        return Redirect::to("/").into_response();
    }
    let notice = params
        .expired
        .map(|_| Alert::info("Your session has expired. Please log in again."));
    Html(pages::render_login_page(notice, None).into_string()).into_response()
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    identifier: String,
    password: String,
}

async fn login_post(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    let identifier = form.identifier.trim();
    if identifier.is_empty() || form.password.is_empty() {
        let html = pages::render_login_page(
            Some(Alert::error("Handle and app password are required.")),
            Some(identifier),
        );
        return (StatusCode::UNPROCESSABLE_ENTITY, Html(html.into_string())).into_response();
    }

    match state.auth.login(identifier, &form.password).await {
        Ok(session) => {
            state.views.clear();
            info!(handle = %session.handle, "Login from web UI");
            Redirect::to("/").into_response()
        }
        Err(e) => {
            warn!(identifier, "Login failed: {e:#}");
            let (status, message) = match e.downcast_ref::<FeedError>() {
                Some(fe) if fe.is_auth() => (
                    StatusCode::UNAUTHORIZED,
                    "Invalid handle or app password.",
                ),
                _ => (
                    StatusCode::BAD_GATEWAY,
                    "Could not reach the service. Please try again.",
                ),
            };
            let html = pages::render_login_page(Some(Alert::error(message)), Some(identifier));
            (status, Html(html.into_string())).into_response()
        }
    }
}

async fn logout(State(state): State<AppState>) -> Response {
    if let Err(e) = state.auth.logout().await {
        error!("Failed to log out: {e:#}");
        return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to log out").into_response();
    }
    state.views.clear();
    Redirect::to("/login").into_response()
}

// ========== Compose ==========

#[derive(Debug, Deserialize)]
pub struct ComposeForm {
    text: String,
}

/// Trim a draft and check it can be published.
fn validate_post_text(text: &str) -> Result<&str, &'static str> {
    let text = text.trim();
    if text.is_empty() {
        return Err("Post text cannot be empty.");
    }
    if text.chars().count() > MAX_POST_LENGTH {
        return Err("Post text is longer than 300 characters.");
    }
    Ok(text)
}

async fn compose(State(state): State<AppState>, Form(form): Form<ComposeForm>) -> Response {
    let session = match current_session(&state) {
        Ok(s) => s,
        Err(redirect) => return redirect,
    };

    let error = match validate_post_text(&form.text) {
        Ok(text) => match state
            .auth
            .call(|client| async move { client.create_post(text).await })
            .await
        {
            Ok(record) => {
                info!(uri = %record.uri, "Published post");
                state.views.reset_home();
                return Redirect::to("/?posted=1").into_response();
            }
            Err(e) if e.is_auth() => return expire_session(&state, &e).await,
            Err(e) => {
                error!("Failed to publish post: {e}");
                "Could not publish the post. Please try again."
            }
        },
        Err(reason) => reason,
    };

    let view = state.views.home(HomeTab::Posts);
    if let Some(response) = load_first(&state, &view, state.config.feed_stale_after).await {
        return response;
    }
    let snapshot = view.render_snapshot();
    let html = pages::render_home_page(&pages::HomePageParams {
        session: &session,
        tab: HomeTab::Posts,
        snapshot: &snapshot,
        threshold: state.views.threshold(),
        notice: None,
        compose_error: Some((error, form.text.as_str())),
    });
    (StatusCode::UNPROCESSABLE_ENTITY, Html(html.into_string())).into_response()
}
