use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::db::repository;
use crate::error::AppError;
use crate::models::review::{CourseRollup, RatingGroup, TermScore};
use crate::terms;

/// Pseudo-count prior pulling thinly-reviewed courses toward the global mean.
const PRIOR_STRENGTH: f64 = 20.0;

#[derive(Debug, Serialize)]
pub struct RollupStats {
    pub groups: usize,
    pub courses: usize,
}

/// Batch recompute of every course's score rollup from the raw review
/// records. Runs off the request path; the read endpoints only ever see the
/// last completed batch.
pub struct RollupService {
    db: SqlitePool,
}

impl RollupService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn run_once(&self) -> Result<RollupStats, AppError> {
        let groups = repository::fetch_rating_groups(&self.db).await?;
        let stats = RollupStats {
            groups: groups.len(),
            courses: 0,
        };

        let rollups = build_rollups(groups);
        let stats = RollupStats {
            courses: rollups.len(),
            ..stats
        };

        repository::replace_rollups(&self.db, &rollups).await?;
        info!(
            "Recomputed rollups: {} rating groups over {} courses",
            stats.groups, stats.courses
        );
        Ok(stats)
    }
}

/// Blend an observed score with the global average, weighted by submission
/// count: more submissions trust the observed score more.
pub fn normalize_score(score: f64, count: i64, global_average: f64) -> f64 {
    let n = count as f64;
    (n / (n + PRIOR_STRENGTH)) * score + (PRIOR_STRENGTH / (n + PRIOR_STRENGTH)) * global_average
}

/// Fold rating groups into per-course rollups: per-term history sorted most
/// recent first, count-weighted current score over the single most recent
/// term, and the shrinkage-normalized score against the global average of
/// all current scores.
pub fn build_rollups(groups: Vec<RatingGroup>) -> BTreeMap<String, CourseRollup> {
    let mut by_course: BTreeMap<String, Vec<TermScore>> = BTreeMap::new();
    for group in groups {
        by_course.entry(group.course_id).or_default().push(TermScore {
            term: group.term,
            instructor: group.instructor,
            score: group.score,
            count: group.count,
        });
    }

    let mut rollups = BTreeMap::new();
    for (course_id, mut scores) in by_course {
        scores.sort_by(|a, b| terms::term_ordinal(&b.term).cmp(&terms::term_ordinal(&a.term)));
        let Some(latest) = scores.first().map(|s| s.term.clone()) else {
            continue;
        };

        let recent: Vec<&TermScore> = scores.iter().filter(|s| s.term == latest).collect();
        let count: i64 = recent.iter().map(|s| s.count).sum();
        let total: f64 = recent.iter().map(|s| s.score * s.count as f64).sum();

        rollups.insert(
            course_id,
            CourseRollup {
                current_score: total / count as f64,
                current_score_count: count,
                current_score_normalized: 0.0,
                scores,
            },
        );
    }

    if rollups.is_empty() {
        return rollups;
    }

    let global_average =
        rollups.values().map(|r| r.current_score).sum::<f64>() / rollups.len() as f64;
    for rollup in rollups.values_mut() {
        rollup.current_score_normalized = normalize_score(
            rollup.current_score,
            rollup.current_score_count,
            global_average,
        );
    }

    rollups
}
