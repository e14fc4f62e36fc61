use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Raw review submission, read-only once ingested. `quality` and `learned`
/// are the two numeric ratings; a record only contributes to score rollups
/// when it carries both.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReviewRecord {
    pub id: String,
    pub course_id: String,
    pub term: String,
    pub instructor: Option<String>,
    pub quality: Option<f64>,
    pub learned: Option<f64>,
    pub review: Option<String>,
    pub hours: Option<f64>,
}

/// One (course, term, instructor) rating group out of the SQL aggregation:
/// mean per-record rating and submission count.
#[derive(Debug, Clone, FromRow)]
pub struct RatingGroup {
    pub course_id: String,
    pub term: String,
    pub instructor: Option<String>,
    pub score: f64,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TermScore {
    pub term: String,
    pub instructor: Option<String>,
    pub score: f64,
    pub count: i64,
}

/// Per-course display scores. `scores` is the full per-term history sorted
/// most recent first; the current score covers only the most recent term.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRollup {
    pub current_score: f64,
    pub current_score_count: i64,
    pub current_score_normalized: f64,
    pub scores: Vec<TermScore>,
}

/// Response body of the review-detail endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CourseReviews {
    pub id: String,
    pub reviews: Vec<ReviewEntry>,
    pub hours: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewEntry {
    pub id: String,
    pub term: String,
    pub review: String,
}
