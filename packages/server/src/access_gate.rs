//! Access Gate
//!
//! Write endpoints need to know which user is acting. The gate turns request
//! headers into a [`User`]; handlers receive it through the [`AuthUser`]
//! extractor and pass its id to the core as the author.
//!
//! [`JwtGate`] hands out HS256 tokens from `/api/auth/register` and
//! `/api/auth/login` and accepts them back as `Authorization: Bearer <jwt>`.
//! The token's subject is the user id, so a user id alone (which every node
//! exposes as `authorId`) is never a credential.

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use numtree_core::{NodeServiceError, User, UserService};
use serde::{Deserialize, Serialize};

use crate::{AppState, HttpError};

/// How long an issued token stays valid
pub const TOKEN_TTL_DAYS: i64 = 30;

/// Resolves the acting user of a request
#[async_trait]
pub trait AccessGate: Send + Sync {
    /// Authenticate from request headers; failures are `401 UNAUTHORIZED`
    async fn authenticate(&self, headers: &HeaderMap) -> Result<User, HttpError>;

    /// Token a client sends back to be recognised as `user`
    fn issue_token(&self, user: &User) -> Result<String, HttpError>;
}

/// Registered claims carried by every token
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signed bearer tokens checked against the user directory
pub struct JwtGate {
    users: UserService,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtGate {
    pub fn new(users: UserService, secret: &[u8]) -> Self {
        Self {
            users,
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
            ttl: Duration::days(TOKEN_TTL_DAYS),
        }
    }

    fn claims_for(&self, user: &User) -> Claims {
        let now = Utc::now();
        Claims {
            sub: user.id.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        }
    }
}

/// Token part of an `Authorization: Bearer ...` header
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[async_trait]
impl AccessGate for JwtGate {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<User, HttpError> {
        let token = bearer_token(headers)
            .ok_or_else(|| HttpError::unauthorized("Missing bearer token"))?;

        let claims = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| {
                tracing::warn!("rejected token: {}", e);
                HttpError::unauthorized("Invalid token")
            })?
            .claims;

        match self.users.get(&claims.sub).await {
            Ok(user) => Ok(user),
            Err(NodeServiceError::UserNotFound(_)) => {
                tracing::warn!("rejected token for unknown user");
                Err(HttpError::unauthorized("Invalid token"))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn issue_token(&self, user: &User) -> Result<String, HttpError> {
        encode(&Header::new(Algorithm::HS256), &self.claims_for(user), &self.encoding).map_err(
            |e| {
                tracing::error!("❌ Failed to sign token: {}", e);
                HttpError::new("Failed to issue token", "INTERNAL_ERROR")
            },
        )
    }
}

/// Extractor for the authenticated user of a request
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        state.gate.authenticate(&parts.headers).await.map(AuthUser)
    }
}
