use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Redirect},
};
use forum_db::DbError;
use forum_types::api::{AuthResponse, LoginRequest, MeResponse, RegisterRequest};
use forum_types::models::User;
use tracing::info;

use crate::blocking;
use crate::cookie::session_token;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::state::AppState;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim().to_string();
    let email = req.email.trim().to_string();

    let mut errors = Vec::new();
    if username.is_empty() {
        errors.push("Username is required");
    }
    if email.is_empty() {
        errors.push("Email is required");
    }
    if req.password.is_empty() {
        errors.push("Password is required");
    }
    if req.password != req.confirm_password {
        errors.push("Passwords do not match");
    }
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    let password = req.password;
    let worker = state.clone();
    let (user, token) = blocking(move || {
        let digest = worker.passwords.hash(&password)?;
        let user_id = worker.db.create_user(&username, &email, &digest)?;
        let token = worker.sessions.create(user_id)?;
        let row = worker
            .db
            .get_user_by_id(user_id)?
            .ok_or(DbError::NotFound("user"))?;
        Ok((User::from(row), token))
    })
    .await?;

    info!(user_id = user.id, username = %user.username, "User registered");

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, state.cookie.issue(&token))],
        Json(AuthResponse { user }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_string();
    if email.is_empty() || req.password.is_empty() {
        return Err(ApiError::validation(["Email and password are required"]));
    }

    let password = req.password;
    let worker = state.clone();
    let (user, token) = blocking(move || {
        let Some(row) = worker.db.get_user_by_email(&email)? else {
            worker.passwords.verify(&password, &worker.dummy_digest);
            return Err(ApiError::InvalidCredentials);
        };
        if !worker.passwords.verify(&password, &row.password) {
            return Err(ApiError::InvalidCredentials);
        }
        let token = worker.sessions.create(row.id)?;
        Ok((User::from(row), token))
    })
    .await?;

    info!(user_id = user.id, "User logged in");

    Ok((
        [(header::SET_COOKIE, state.cookie.issue(&token))],
        Json(AuthResponse { user }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = session_token(&headers) {
        let sessions = state.sessions.clone();
        blocking(move || Ok(sessions.delete(&token)?)).await?;
    }

    Ok((
        [(header::SET_COOKIE, state.cookie.clear())],
        Redirect::to("/"),
    ))
}

pub async fn me(Extension(current): Extension<CurrentUser>) -> Json<MeResponse> {
    Json(MeResponse { user: current.0 })
}
