use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::FromRow;

use crate::{db::DbPool, error::AppError, models::session::Session, state::AppState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: String,
    pub name: String,
}

/// Identity of the caller, if any. Upstream layers may inject an
/// [`AuthenticatedUser`] extension; otherwise a bearer token is resolved
/// against the session table.
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<AuthenticatedUser>);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(Self(Some(user.clone())));
        }

        let Some(auth) = parts.headers.typed_get::<Authorization<Bearer>>() else {
            return Ok(Self(None));
        };

        let user = resolve_session(&state.db, auth.token()).await?;
        if user.is_none() {
            tracing::debug!("bearer token did not match a live session");
        }
        Ok(Self(user))
    }
}

impl CurrentUser {
    pub fn require_user(&self) -> Result<&AuthenticatedUser, AppError> {
        self.0.as_ref().ok_or(AppError::Unauthorized)
    }
}

pub fn hash_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

#[derive(FromRow)]
struct SessionWithName {
    #[sqlx(flatten)]
    session: Session,
    name: String,
}

pub async fn resolve_session(
    db: &DbPool,
    token: &str,
) -> Result<Option<AuthenticatedUser>, AppError> {
    let row: Option<SessionWithName> = sqlx::query_as(
        "SELECT s.token_hash, s.user_id, s.created_at, s.expires_at, u.name
        FROM sessions s JOIN users u ON u.id = s.user_id
        WHERE s.token_hash = ?",
    )
    .bind(hash_token(token))
    .fetch_optional(db)
    .await?;

    Ok(row
        .filter(|row| !row.session.is_expired(Utc::now()))
        .map(|row| AuthenticatedUser {
            id: row.session.user_id,
            name: row.name,
        }))
}

/// Records a session issued elsewhere; only the token digest is kept.
pub async fn store_session(
    db: &DbPool,
    user_id: &str,
    token: &str,
    expires_at: Option<DateTime<Utc>>,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
    )
    .bind(hash_token(token))
    .bind(user_id)
    .bind(Utc::now())
    .bind(expires_at)
    .execute(db)
    .await?;
    Ok(())
}
