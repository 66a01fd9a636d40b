//! Registration and login
//!
//! Both endpoints take a username and password and answer with the user and
//! a signed token the access gate will accept for it.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};

use crate::{AppState, HttpError};
use numtree_core::User;

#[derive(Debug, Deserialize)]
pub struct CredentialsInput {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub id: String,
    pub username: String,
    pub token: String,
}

impl AuthResponse {
    fn new(state: &AppState, user: User) -> Result<Self, HttpError> {
        Ok(Self {
            token: state.gate.issue_token(&user)?,
            id: user.id,
            username: user.username,
        })
    }
}

async fn register(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsInput>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), HttpError> {
    let Json(input) = payload?;
    let user = state.users.register(&input.username, &input.password).await?;

    Ok((StatusCode::CREATED, Json(AuthResponse::new(&state, user)?)))
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsInput>, JsonRejection>,
) -> Result<Json<AuthResponse>, HttpError> {
    let Json(input) = payload?;
    let user = state
        .users
        .verify_credentials(&input.username, &input.password)
        .await?;

    tracing::debug!("🔑 Login: {}", user.username);
    Ok(Json(AuthResponse::new(&state, user)?))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .with_state(state)
}
