use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::repository;
use crate::error::AppError;
use crate::models::profile::{ProfileMutation, ProfileUpdateRequest, UserProfile};
use crate::models::review::{CourseReviews, CourseRollup};
use crate::session;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/self", get(get_self).post(post_self))
        .route("/login", get(login))
        .route("/authenticate", get(authenticate))
        .route("/meta/ratings", get(meta_ratings))
        .route("/meta/counts", get(meta_counts))
        .route("/courses/{id}", get(course_reviews))
        .with_state(state)
}

#[derive(Serialize)]
struct WelcomeResponse {
    message: &'static str,
}

async fn root() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Welcome to the courseboard API!",
    })
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn get_self(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserProfile>, AppError> {
    let email = session::require_user(&state.db, &headers).await?;
    let profile = repository::fetch_profile(&state.db, &email)
        .await?
        .ok_or(AppError::NotAuthorized)?;
    Ok(Json(profile))
}

#[derive(Serialize)]
struct UpdateResponse {
    success: bool,
}

async fn post_self(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ProfileUpdateRequest>,
) -> Result<Json<UpdateResponse>, AppError> {
    let email = session::require_user(&state.db, &headers).await?;
    let mutation = ProfileMutation::from_request(req)?;
    repository::apply_profile_mutation(&state.db, &email, &mutation).await?;
    Ok(Json(UpdateResponse { success: true }))
}

#[derive(Deserialize)]
struct LoginParams {
    redirect: Option<String>,
}

async fn login(
    State(state): State<AppState>,
    Query(params): Query<LoginParams>,
) -> Result<Response, AppError> {
    let sid = Uuid::new_v4().to_string();
    repository::insert_session(&state.db, &sid, params.redirect.as_deref()).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        header_value(&session::set_cookie_value(&sid))?,
    );
    headers.insert(header::LOCATION, header_value(&state.sso.authorization_url())?);
    Ok((StatusCode::FOUND, headers).into_response())
}

#[derive(Deserialize)]
struct AuthenticateParams {
    code: String,
}

async fn authenticate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<AuthenticateParams>,
) -> Result<Response, AppError> {
    let session = session::resolve_session(&state.db, &headers)
        .await?
        .ok_or(AppError::NotAuthorized)?;

    let identity = state.sso.exchange_code(&params.code).await?;
    repository::upsert_login(&state.db, &identity.email).await?;
    repository::bind_session_user(&state.db, &session.id, &identity.email).await?;

    let redirect = session.redirect.unwrap_or_else(|| "/".to_string());
    repository::clear_session_redirect(&state.db, &session.id).await?;

    let mut out = HeaderMap::new();
    out.insert(header::LOCATION, header_value(&redirect)?);
    Ok((StatusCode::FOUND, out).into_response())
}

#[derive(Deserialize)]
struct SecretParams {
    secret: Option<String>,
}

fn check_secret(state: &AppState, params: &SecretParams) -> Result<(), AppError> {
    if params.secret.as_deref() == Some(state.config.meta_secret.as_str()) {
        Ok(())
    } else {
        Err(AppError::NotAuthorized)
    }
}

async fn meta_ratings(
    State(state): State<AppState>,
    Query(params): Query<SecretParams>,
) -> Result<Json<BTreeMap<String, CourseRollup>>, AppError> {
    check_secret(&state, &params)?;
    let rollups = repository::fetch_rollups(&state.db).await?;
    Ok(Json(rollups))
}

async fn meta_counts(
    State(state): State<AppState>,
    Query(params): Query<SecretParams>,
) -> Result<Json<BTreeMap<String, i64>>, AppError> {
    check_secret(&state, &params)?;
    let counts = repository::fetch_review_counts(&state.db).await?;
    Ok(Json(counts.into_iter().collect()))
}

async fn course_reviews(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<CourseReviews>, AppError> {
    session::require_user(&state.db, &headers).await?;
    let reviews = repository::fetch_course_reviews(&state.db, &id).await?;
    Ok(Json(reviews))
}

fn header_value(value: &str) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(value).map_err(|_| AppError::Internal)
}
