//! Cookie-backed session resolution.
//!
//! Sessions are minted anonymously by the login redirect and bound to a
//! user email once the identity provider callback completes. Handlers that
//! need a principal call [`require_user`]; everything else about identity
//! lives with the external provider.

use axum::http::{HeaderMap, header};
use sqlx::SqlitePool;

use crate::db::repository;
use crate::error::AppError;

pub const SESSION_COOKIE: &str = "courseboard.sid";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRecord {
    pub id: String,
    pub user_email: Option<String>,
    pub redirect: Option<String>,
    pub created_at: String,
}

/// Value for the Set-Cookie header establishing a session.
pub fn set_cookie_value(id: &str) -> String {
    format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax")
}

/// Extract the session id from a request's Cookie header.
pub fn session_id(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

pub async fn resolve_session(
    db: &SqlitePool,
    headers: &HeaderMap,
) -> Result<Option<SessionRecord>, AppError> {
    let Some(id) = session_id(headers) else {
        return Ok(None);
    };
    Ok(repository::fetch_session(db, &id).await?)
}

/// The authenticated principal for a request, or the uniform 401.
pub async fn require_user(db: &SqlitePool, headers: &HeaderMap) -> Result<String, AppError> {
    match resolve_session(db, headers).await? {
        Some(SessionRecord {
            user_email: Some(email),
            ..
        }) => Ok(email),
        _ => Err(AppError::NotAuthorized),
    }
}
