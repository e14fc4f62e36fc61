use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::Value;
use sqlx::SqlitePool;
use tower::util::ServiceExt;

use courseboard::config::AppConfig;
use courseboard::routes::router;
use courseboard::services::RollupService;
use courseboard::sso::StaticSsoClient;
use courseboard::state::AppState;

const TEST_SECRET: &str = "testing-secret";

async fn setup_db() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create database");

    sqlx::query(
        r#"
        CREATE TABLE reviews (
            id TEXT PRIMARY KEY,
            course_id TEXT NOT NULL,
            term TEXT NOT NULL,
            instructor TEXT,
            quality REAL,
            learned REAL,
            review TEXT,
            hours REAL
        )
        "#,
    )
    .execute(&pool)
    .await
    .expect("Failed to create reviews table");

    sqlx::query(
        r#"
        CREATE TABLE course_rollups (
            course_id TEXT PRIMARY KEY,
            current_score REAL NOT NULL,
            current_score_count INTEGER NOT NULL,
            current_score_normalized REAL NOT NULL,
            scores TEXT NOT NULL,
            computed_at TEXT NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await
    .expect("Failed to create course_rollups table");

    sqlx::query(
        r#"
        CREATE TABLE sessions (
            id TEXT PRIMARY KEY,
            user_email TEXT,
            redirect TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await
    .expect("Failed to create sessions table");

    pool
}

fn setup_app(db: SqlitePool) -> Router {
    router(AppState {
        db,
        sso: Arc::new(StaticSsoClient {
            email: "jo@example.edu".to_string(),
        }),
        config: AppConfig {
            meta_secret: TEST_SECRET.to_string(),
        },
    })
}

#[allow(clippy::too_many_arguments)]
async fn seed_review(
    db: &SqlitePool,
    id: &str,
    course_id: &str,
    term: &str,
    instructor: &str,
    quality: Option<f64>,
    learned: Option<f64>,
    review: Option<&str>,
    hours: Option<f64>,
) {
    sqlx::query(
        "INSERT INTO reviews (id, course_id, term, instructor, quality, learned, review, hours)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(course_id)
    .bind(term)
    .bind(instructor)
    .bind(quality)
    .bind(learned)
    .bind(review)
    .bind(hours)
    .execute(db)
    .await
    .expect("Failed to insert review");
}

fn get_request(uri: &str, sid: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(sid) = sid {
        builder = builder.header(header::COOKIE, format!("courseboard.sid={sid}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Failed to parse body")
}

#[tokio::test]
async fn single_course_rollup_matches_the_identity_case() {
    let db = setup_db().await;
    let term = "2019-2020 Autumn";
    seed_review(&db, "r1", "X", term, "Doe, Jane", Some(4.0), Some(4.0), None, None).await;
    seed_review(&db, "r2", "X", term, "Doe, Jane", Some(5.0), Some(4.0), None, None).await;
    seed_review(&db, "r3", "X", term, "Doe, Jane", Some(5.0), Some(4.0), None, None).await;

    let stats = RollupService::new(db.clone())
        .run_once()
        .await
        .expect("Rollup should succeed");
    assert_eq!(stats.groups, 1);
    assert_eq!(stats.courses, 1);

    let app = setup_app(db);
    let response = app
        .oneshot(get_request(&format!("/meta/ratings?secret={TEST_SECRET}"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response.into_body()).await;

    // Per-record ratings 4, 4.5, 4.5 average to 4.33; with one course the
    // shrinkage blend degenerates to the score itself.
    let expected = (4.0 + 4.5 + 4.5) / 3.0;
    let x = &body["X"];
    assert!((x["current_score"].as_f64().unwrap() - expected).abs() < 1e-9);
    assert_eq!(x["current_score_count"], 3);
    assert!((x["current_score_normalized"].as_f64().unwrap() - expected).abs() < 1e-9);
    assert_eq!(x["scores"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn records_missing_either_rating_are_ignored() {
    let db = setup_db().await;
    let term = "2019-2020 Autumn";
    seed_review(&db, "r1", "X", term, "Doe, Jane", Some(4.0), Some(4.0), None, None).await;
    seed_review(&db, "r2", "X", term, "Doe, Jane", Some(1.0), None, None, None).await;
    seed_review(&db, "r3", "X", term, "Doe, Jane", None, Some(1.0), None, None).await;

    RollupService::new(db.clone()).run_once().await.unwrap();

    let app = setup_app(db);
    let response = app
        .oneshot(get_request(&format!("/meta/ratings?secret={TEST_SECRET}"), None))
        .await
        .unwrap();
    let body = body_json(response.into_body()).await;

    assert_eq!(body["X"]["current_score_count"], 1);
    assert!((body["X"]["current_score"].as_f64().unwrap() - 4.0).abs() < 1e-9);
}

#[tokio::test]
async fn current_score_tracks_the_most_recent_term_only() {
    let db = setup_db().await;
    seed_review(&db, "r1", "X", "2018-2019 Spring", "Doe, Jane", Some(2.0), Some(2.0), None, None)
        .await;
    seed_review(&db, "r2", "X", "2019-2020 Winter", "Roe, Rick", Some(5.0), Some(5.0), None, None)
        .await;

    RollupService::new(db.clone()).run_once().await.unwrap();

    let app = setup_app(db);
    let response = app
        .oneshot(get_request(&format!("/meta/ratings?secret={TEST_SECRET}"), None))
        .await
        .unwrap();
    let body = body_json(response.into_body()).await;

    let x = &body["X"];
    assert!((x["current_score"].as_f64().unwrap() - 5.0).abs() < 1e-9);
    assert_eq!(x["current_score_count"], 1);
    // History keeps both terms, most recent first.
    let scores = x["scores"].as_array().unwrap();
    assert_eq!(scores.len(), 2);
    assert_eq!(scores[0]["term"], "2019-2020 Winter");
}

#[tokio::test]
async fn normalization_pulls_small_samples_toward_the_global_mean() {
    let db = setup_db().await;
    let term = "2019-2020 Autumn";
    for i in 0..8 {
        seed_review(
            &db,
            &format!("low-{i}"),
            "LOW",
            term,
            "Doe, Jane",
            Some(3.0),
            Some(3.0),
            None,
            None,
        )
        .await;
    }
    seed_review(&db, "high-1", "HIGH", term, "Roe, Rick", Some(5.0), Some(5.0), None, None).await;

    RollupService::new(db.clone()).run_once().await.unwrap();

    let app = setup_app(db);
    let response = app
        .oneshot(get_request(&format!("/meta/ratings?secret={TEST_SECRET}"), None))
        .await
        .unwrap();
    let body = body_json(response.into_body()).await;

    let global = (3.0 + 5.0) / 2.0;
    let high = body["HIGH"]["current_score_normalized"].as_f64().unwrap();
    assert!(high > global);
    assert!(high < 5.0);
    // A single five-star review barely moves the needle off the mean.
    assert!(high < global + 0.1);

    let low = body["LOW"]["current_score_normalized"].as_f64().unwrap();
    assert!(low < global);
    assert!(low > 3.0);
}

#[tokio::test]
async fn ratings_and_counts_require_the_shared_secret() {
    let db = setup_db().await;
    let app = setup_app(db);

    for uri in ["/meta/ratings", "/meta/ratings?secret=wrong", "/meta/counts"] {
        let response = app.clone().oneshot(get_request(uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response.into_body()).await;
        assert_eq!(body["error"]["message"], "Not authorized");
    }
}

#[tokio::test]
async fn counts_cover_only_records_with_review_text() {
    let db = setup_db().await;
    let term = "2019-2020 Autumn";
    seed_review(&db, "r1", "X", term, "Doe, Jane", None, None, Some("Take it!"), Some(6.0)).await;
    seed_review(&db, "r2", "X", term, "Doe, Jane", Some(4.0), Some(4.0), None, None).await;
    seed_review(&db, "r3", "Y", term, "Roe, Rick", None, None, Some("Skip it."), Some(12.0)).await;

    let app = setup_app(db);
    let response = app
        .oneshot(get_request(&format!("/meta/counts?secret={TEST_SECRET}"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response.into_body()).await;

    assert_eq!(body["X"], 1);
    assert_eq!(body["Y"], 1);
}

#[tokio::test]
async fn course_detail_returns_reviews_and_hours() {
    let db = setup_db().await;
    seed_review(
        &db,
        "r1",
        "X",
        "2018-2019 Spring",
        "Doe, Jane",
        None,
        None,
        Some("Old but good."),
        Some(4.0),
    )
    .await;
    seed_review(
        &db,
        "r2",
        "X",
        "2019-2020 Autumn",
        "Doe, Jane",
        None,
        None,
        Some("Still good."),
        Some(8.0),
    )
    .await;
    // No review text: excluded from both lists.
    seed_review(&db, "r3", "X", "2019-2020 Autumn", "Doe, Jane", Some(4.0), Some(4.0), None, Some(99.0))
        .await;

    sqlx::query("INSERT INTO sessions (id, user_email, redirect, created_at) VALUES ('sid-1', 'jo@example.edu', NULL, '2024-01-01T00:00:00Z')")
        .execute(&db)
        .await
        .unwrap();

    let app = setup_app(db);
    let response = app
        .oneshot(get_request("/courses/X", Some("sid-1")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response.into_body()).await;

    assert_eq!(body["id"], "X");
    let reviews = body["reviews"].as_array().unwrap();
    assert_eq!(reviews.len(), 2);
    assert_eq!(reviews[0]["review"], "Still good.");
    assert_eq!(reviews[1]["review"], "Old but good.");
    assert_eq!(body["hours"].as_array().unwrap().len(), 2);
}
