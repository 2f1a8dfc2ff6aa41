//! Authenticated HTTP API backing the dashboard.
//!
//! Read access to users, reminders (joined with their owner), and sessions,
//! plus create/delete of reminders keyed by the owner's Telegram id. Guarded
//! by HTTP Basic auth from `DASHBOARD_USERNAME`/`DASHBOARD_PASSWORD`; when
//! those are unset every guarded route answers 500 rather than crashing.

use std::env;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{delete, get};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::BotError;
use crate::store::Store;
use crate::types::Prayer;

#[derive(Clone)]
pub struct ApiState {
    store: Store,
    credentials: Option<(String, String)>,
}

impl ApiState {
    pub fn new(store: Store, credentials: Option<(String, String)>) -> Self {
        ApiState { store, credentials }
    }

    pub fn from_env(store: Store) -> Self {
        let credentials = match (env::var("DASHBOARD_USERNAME"), env::var("DASHBOARD_PASSWORD")) {
            (Ok(username), Ok(password)) => Some((username, password)),
            _ => None,
        };
        ApiState::new(store, credentials)
    }
}

#[derive(Serialize)]
struct Envelope<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

type ApiError = (StatusCode, Json<Envelope<()>>);

fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope { success: true, data: Some(data), error: None })
}

fn fail(status: StatusCode, message: &str) -> ApiError {
    (status, Json(Envelope { success: false, data: None, error: Some(message.to_string()) }))
}

fn internal(error: BotError) -> ApiError {
    log::error!("api error: {}", error);
    fail(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

/// Basic-auth guard. Missing server credentials are a configuration error,
/// not an auth failure.
fn authorize(state: &ApiState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some((expected_user, expected_pass)) = &state.credentials else {
        log::error!("DASHBOARD_USERNAME and/or DASHBOARD_PASSWORD are not set");
        return Err(fail(StatusCode::INTERNAL_SERVER_ERROR, "Server configuration error"));
    };

    let unauthorized = || fail(StatusCode::UNAUTHORIZED, "Authentication required");

    let encoded = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Basic "))
        .ok_or_else(unauthorized)?;
    let decoded = BASE64
        .decode(encoded)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(unauthorized)?;
    let (username, password) = decoded.split_once(':').ok_or_else(unauthorized)?;

    if username == expected_user && password == expected_pass {
        Ok(())
    } else {
        Err(fail(StatusCode::UNAUTHORIZED, "Invalid credentials"))
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/users", get(list_users))
        .route("/api/reminders", get(list_reminders).post(create_reminder))
        .route("/api/reminders/:telegram_id/:prayer", delete(delete_reminder))
        .route("/api/sessions", get(list_sessions))
        .with_state(state)
}

pub async fn serve(state: ApiState, port: u16) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    log::info!("Dashboard API listening on port {}", port);
    axum::serve(listener, router(state)).await
}

async fn health(State(state): State<ApiState>) -> Result<&'static str, (StatusCode, &'static str)> {
    match state.store.ping().await {
        Ok(()) => Ok("OK"),
        Err(error) => {
            log::error!("health check failed: {}", error);
            Err((StatusCode::INTERNAL_SERVER_ERROR, "DB Error"))
        }
    }
}

async fn list_users(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Json<Envelope<Vec<crate::types::User>>>, ApiError> {
    authorize(&state, &headers)?;
    let users = state.store.list_users().await.map_err(internal)?;
    Ok(ok(users))
}

async fn list_reminders(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Json<Envelope<Vec<crate::store::ReminderWithOwner>>>, ApiError> {
    authorize(&state, &headers)?;
    let reminders = state.store.list_reminders_with_owner().await.map_err(internal)?;
    Ok(ok(reminders))
}

async fn list_sessions(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Json<Envelope<Vec<crate::store::SessionRow>>>, ApiError> {
    authorize(&state, &headers)?;
    let sessions = state.store.list_sessions().await.map_err(internal)?;
    Ok(ok(sessions))
}

#[derive(Deserialize)]
struct CreateReminder {
    telegram_id: i64,
    prayer: Prayer,
    offset_minutes: i64,
}

async fn create_reminder(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<CreateReminder>,
) -> Result<Json<Envelope<()>>, ApiError> {
    authorize(&state, &headers)?;

    let user = state
        .store
        .user_by_telegram_id(body.telegram_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Unknown user"))?;

    state
        .store
        .replace_reminder(user.id, body.prayer, body.offset_minutes)
        .await
        .map_err(internal)?;
    Ok(ok(()))
}

async fn delete_reminder(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path((telegram_id, prayer)): Path<(i64, String)>,
) -> Result<Json<Envelope<()>>, ApiError> {
    authorize(&state, &headers)?;

    let prayer = Prayer::parse(&prayer)
        .ok_or_else(|| fail(StatusCode::BAD_REQUEST, "Unknown prayer"))?;
    let user = state
        .store
        .user_by_telegram_id(telegram_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Unknown user"))?;

    state.store.delete_reminder(user.id, prayer).await.map_err(internal)?;
    Ok(ok(()))
}
