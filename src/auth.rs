//! # Auth
//!
//! Stateless bearer-token gate. A login issues a signed HS256 token
//! carrying the identity id and role; protected handlers pull an
//! [`AuthUser`] out of the request and check the role themselves. No
//! session store anywhere, the token is self-contained.

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};
use bcrypt::DEFAULT_COST;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, state::AppState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "college")]
    College,
    #[serde(rename = "test-center")]
    TestCenter,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Identity-record id (authority or manager), not the profile id.
    pub sub: String,
    pub role: Role,
    pub exp: usize,
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    Ok(bcrypt::hash(password, DEFAULT_COST)?)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    Ok(bcrypt::verify(password, hash)?)
}

pub fn issue_token(
    identity_id: &str,
    role: Role,
    secret: &str,
    ttl_minutes: i64,
) -> Result<String, AppError> {
    let claims = Claims {
        sub: identity_id.to_string(),
        role,
        exp: (Utc::now() + Duration::minutes(ttl_minutes)).timestamp() as usize,
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(data.claims)
}

/// Verified caller identity attached to protected routes.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub role: Role,
}

impl AuthUser {
    /// Role gate, run before any data access so a mismatched caller
    /// never learns whether the underlying records exist.
    pub fn require(&self, role: Role) -> Result<(), AppError> {
        if self.role == role {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        let token = header.strip_prefix("Bearer ").ok_or(AppError::Unauthorized)?;

        let claims = verify_token(token, &state.config.jwt_secret).map_err(|e| {
            tracing::warn!("Token verification failed: {e}");
            AppError::Forbidden
        })?;

        Ok(AuthUser {
            id: claims.sub,
            role: claims.role,
        })
    }
}
