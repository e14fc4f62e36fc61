use std::collections::BTreeMap;

use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::AppError;
use crate::models::profile::{
    DEFAULT_PLANNER_START_YEAR, PlannerSettings, PlannerSettingsPatch, ProfileMutation,
    UserProfile,
};
use crate::models::review::{
    CourseReviews, CourseRollup, RatingGroup, ReviewEntry, ReviewRecord, TermScore,
};
use crate::session::SessionRecord;
use crate::terms;

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    email: String,
    last_login: Option<String>,
    first_login: Option<String>,
    classes: String,
    planner_start_year: Option<i64>,
    planner_settings: String,
    planner: String,
}

impl ProfileRow {
    fn into_profile(self) -> UserProfile {
        let name = self.email.split('@').next().unwrap_or_default().to_string();
        let settings: PlannerSettingsPatch =
            serde_json::from_str(&self.planner_settings).unwrap_or_default();
        UserProfile {
            name,
            email: self.email,
            last_login: self.last_login,
            first_login: self.first_login,
            classes: serde_json::from_str(&self.classes).unwrap_or_default(),
            planner_start_year: self.planner_start_year.unwrap_or(DEFAULT_PLANNER_START_YEAR),
            planner_settings: PlannerSettings::default().merged(settings),
            planner: serde_json::from_str(&self.planner).unwrap_or_default(),
        }
    }
}

pub async fn fetch_profile(
    db: &SqlitePool,
    email: &str,
) -> Result<Option<UserProfile>, sqlx::Error> {
    let row = sqlx::query_as::<_, ProfileRow>(
        "SELECT email, last_login, first_login, classes, planner_start_year, planner_settings, planner
         FROM users WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(db)
    .await?;

    Ok(row.map(ProfileRow::into_profile))
}

/// Record a login: always refresh `last_login`, stamp `first_login` and an
/// empty starred set only when the profile is created.
pub async fn upsert_login(db: &SqlitePool, email: &str) -> Result<(), sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO users (email, last_login, first_login, classes)
         VALUES (?, ?, ?, '[]')
         ON CONFLICT(email) DO UPDATE SET last_login = excluded.last_login",
    )
    .bind(email)
    .bind(&now)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(())
}

/// Apply one permitted mutation to the stored profile. Each mutation
/// rewrites only its own field, so concurrent edits resolve per field with
/// last write wins. A missing profile makes every mutation a no-op, which
/// matches the update-by-key contract.
pub async fn apply_profile_mutation(
    db: &SqlitePool,
    email: &str,
    mutation: &ProfileMutation,
) -> Result<(), AppError> {
    match mutation {
        ProfileMutation::SetClasses(classes) => {
            write_classes(db, email, classes).await?;
        }
        ProfileMutation::AddClass(class) => {
            if let Some(mut classes) = read_classes(db, email).await? {
                if !classes.contains(class) {
                    classes.push(class.clone());
                    write_classes(db, email, &classes).await?;
                }
            }
        }
        ProfileMutation::RemoveClass(class) => {
            if let Some(mut classes) = read_classes(db, email).await? {
                let before = classes.len();
                classes.retain(|c| c != class);
                if classes.len() != before {
                    write_classes(db, email, &classes).await?;
                }
            }
        }
        ProfileMutation::SetPlannerStartYear(year) => {
            sqlx::query("UPDATE users SET planner_start_year = ? WHERE email = ?")
                .bind(*year)
                .bind(email)
                .execute(db)
                .await?;
        }
        ProfileMutation::SetPlannerSettings(patch) => {
            let stored = sqlx::query_scalar::<_, String>(
                "SELECT planner_settings FROM users WHERE email = ?",
            )
            .bind(email)
            .fetch_optional(db)
            .await?;
            if let Some(stored) = stored {
                let current: PlannerSettingsPatch =
                    serde_json::from_str(&stored).unwrap_or_default();
                let merged = encode(&current.merged(*patch))?;
                sqlx::query("UPDATE users SET planner_settings = ? WHERE email = ?")
                    .bind(merged)
                    .bind(email)
                    .execute(db)
                    .await?;
            }
        }
        ProfileMutation::SetPlannerBucket { bucket, courses } => {
            let stored =
                sqlx::query_scalar::<_, String>("SELECT planner FROM users WHERE email = ?")
                    .bind(email)
                    .fetch_optional(db)
                    .await?;
            if let Some(stored) = stored {
                let mut planner: BTreeMap<String, Vec<String>> =
                    serde_json::from_str(&stored).unwrap_or_default();
                planner.insert(bucket.clone(), courses.clone());
                sqlx::query("UPDATE users SET planner = ? WHERE email = ?")
                    .bind(encode(&planner)?)
                    .bind(email)
                    .execute(db)
                    .await?;
            }
        }
    }

    Ok(())
}

async fn read_classes(db: &SqlitePool, email: &str) -> Result<Option<Vec<String>>, sqlx::Error> {
    let stored = sqlx::query_scalar::<_, String>("SELECT classes FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(db)
        .await?;
    Ok(stored.map(|s| serde_json::from_str(&s).unwrap_or_default()))
}

async fn write_classes(
    db: &SqlitePool,
    email: &str,
    classes: &[String],
) -> Result<(), AppError> {
    sqlx::query("UPDATE users SET classes = ? WHERE email = ?")
        .bind(encode(&classes)?)
        .bind(email)
        .execute(db)
        .await?;
    Ok(())
}

fn encode<T: serde::Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string(value).map_err(|_| AppError::Internal)
}

// Sessions

pub async fn insert_session(
    db: &SqlitePool,
    id: &str,
    redirect: Option<&str>,
) -> Result<(), sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    sqlx::query("INSERT INTO sessions (id, user_email, redirect, created_at) VALUES (?, NULL, ?, ?)")
        .bind(id)
        .bind(redirect)
        .bind(&now)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn fetch_session(
    db: &SqlitePool,
    id: &str,
) -> Result<Option<SessionRecord>, sqlx::Error> {
    sqlx::query_as::<_, SessionRecord>(
        "SELECT id, user_email, redirect, created_at FROM sessions WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn bind_session_user(
    db: &SqlitePool,
    id: &str,
    email: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE sessions SET user_email = ? WHERE id = ?")
        .bind(email)
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn clear_session_redirect(db: &SqlitePool, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE sessions SET redirect = NULL WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

// Reviews

pub async fn upsert_review(db: &SqlitePool, record: &ReviewRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT OR REPLACE INTO reviews (id, course_id, term, instructor, quality, learned, review, hours)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&record.id)
    .bind(&record.course_id)
    .bind(&record.term)
    .bind(&record.instructor)
    .bind(record.quality)
    .bind(record.learned)
    .bind(&record.review)
    .bind(record.hours)
    .execute(db)
    .await?;
    Ok(())
}

#[derive(Debug, sqlx::FromRow)]
struct ReviewDetailRow {
    id: String,
    term: String,
    review: Option<String>,
    hours: Option<f64>,
}

/// Free-text reviews (most recent term first) and the raw weekly-hours
/// values for one course. Only records carrying review text are considered,
/// mirroring the review-detail contract.
pub async fn fetch_course_reviews(
    db: &SqlitePool,
    course_id: &str,
) -> Result<CourseReviews, sqlx::Error> {
    let mut rows = sqlx::query_as::<_, ReviewDetailRow>(
        "SELECT id, term, review, hours FROM reviews
         WHERE course_id = ? AND review IS NOT NULL",
    )
    .bind(course_id)
    .fetch_all(db)
    .await?;

    rows.sort_by(|a, b| terms::term_ordinal(&b.term).cmp(&terms::term_ordinal(&a.term)));

    let hours = rows.iter().filter_map(|r| r.hours).collect();
    let reviews = rows
        .into_iter()
        .filter_map(|r| {
            r.review.map(|review| ReviewEntry {
                id: r.id,
                term: r.term,
                review,
            })
        })
        .collect();

    Ok(CourseReviews {
        id: course_id.to_string(),
        reviews,
        hours,
    })
}

/// The (course, term, instructor) rating groups feeding the rollup: records
/// carrying both ratings, averaged per record and then per group.
pub async fn fetch_rating_groups(db: &SqlitePool) -> Result<Vec<RatingGroup>, sqlx::Error> {
    sqlx::query_as::<_, RatingGroup>(
        r#"
        SELECT
            course_id,
            term,
            instructor,
            AVG((quality + learned) / 2.0) AS score,
            COUNT(*) AS "count"
        FROM reviews
        WHERE quality IS NOT NULL AND learned IS NOT NULL
        GROUP BY course_id, term, instructor
        "#,
    )
    .fetch_all(db)
    .await
}

pub async fn fetch_review_counts(db: &SqlitePool) -> Result<Vec<(String, i64)>, sqlx::Error> {
    sqlx::query_as::<_, (String, i64)>(
        "SELECT course_id, COUNT(*) FROM reviews WHERE review IS NOT NULL GROUP BY course_id",
    )
    .fetch_all(db)
    .await
}

// Rollups

#[derive(Debug, sqlx::FromRow)]
struct RollupRow {
    course_id: String,
    current_score: f64,
    current_score_count: i64,
    current_score_normalized: f64,
    scores: String,
}

/// Swap in a freshly computed rollup set. Runs in one transaction so a
/// failed batch leaves the previous rollup in place.
pub async fn replace_rollups(
    db: &SqlitePool,
    rollups: &BTreeMap<String, CourseRollup>,
) -> Result<(), AppError> {
    let now = Utc::now().to_rfc3339();
    let mut tx = db.begin().await.map_err(AppError::Database)?;

    sqlx::query("DELETE FROM course_rollups")
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;

    for (course_id, rollup) in rollups {
        sqlx::query(
            "INSERT INTO course_rollups
                 (course_id, current_score, current_score_count, current_score_normalized, scores, computed_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(course_id)
        .bind(rollup.current_score)
        .bind(rollup.current_score_count)
        .bind(rollup.current_score_normalized)
        .bind(encode(&rollup.scores)?)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;
    }

    tx.commit().await.map_err(AppError::Database)?;
    Ok(())
}

pub async fn fetch_rollups(
    db: &SqlitePool,
) -> Result<BTreeMap<String, CourseRollup>, sqlx::Error> {
    let rows = sqlx::query_as::<_, RollupRow>(
        "SELECT course_id, current_score, current_score_count, current_score_normalized, scores
         FROM course_rollups",
    )
    .fetch_all(db)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let scores: Vec<TermScore> = serde_json::from_str(&row.scores).unwrap_or_default();
            (
                row.course_id,
                CourseRollup {
                    current_score: row.current_score,
                    current_score_count: row.current_score_count,
                    current_score_normalized: row.current_score_normalized,
                    scores,
                },
            )
        })
        .collect())
}
