use std::time::Duration;

use sqlx::SqlitePool;
use tracing::info;

use crate::services::rollup::RollupService;

/// Periodic rollup recompute.
/// A failed run is logged and skipped; the previous rollup keeps serving.
pub struct RollupScheduler {
    db: SqlitePool,
    interval: Duration,
}

impl RollupScheduler {
    pub fn new(db: SqlitePool, interval_secs: u64) -> Self {
        Self {
            db,
            interval: Duration::from_secs(interval_secs),
        }
    }

    pub async fn start(self) {
        info!("Starting rollup scheduler (interval: {:?})", self.interval);

        loop {
            tokio::time::sleep(self.interval).await;

            let service = RollupService::new(self.db.clone());
            match service.run_once().await {
                Ok(stats) => {
                    info!(
                        "Scheduled rollup completed - {} rating groups over {} courses",
                        stats.groups, stats.courses
                    );
                }
                Err(e) => {
                    tracing::warn!("Scheduled rollup failed: {:?}", e);
                }
            }
        }
    }
}
