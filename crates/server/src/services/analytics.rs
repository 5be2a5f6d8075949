//! Admin analytics with a short-lived cache.

use std::sync::Arc;
use std::time::Duration;

use chrono::{FixedOffset, Utc};
use moka::future::Cache;
use sqlx::PgPool;
use tracing::instrument;

use linkbrain_core::analytics::{AnalyticsReport, aggregate};

use crate::db::{ClipRepository, RepositoryError, UserRepository};

const REPORT_TTL: Duration = Duration::from_secs(60);

/// Computes the dashboard report and keeps it for a minute.
#[derive(Clone)]
pub struct AnalyticsService {
    cache: Cache<(), Arc<AnalyticsReport>>,
    offset: FixedOffset,
}

impl AnalyticsService {
    #[must_use]
    pub fn new(offset: FixedOffset) -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(REPORT_TTL)
            .build();
        Self { cache, offset }
    }

    /// The current report.
    ///
    /// If the snapshot cannot be read the zeroed report is returned and
    /// nothing is cached, so the next request tries again.
    #[instrument(skip(self, pool))]
    pub async fn report(&self, pool: &PgPool) -> Arc<AnalyticsReport> {
        let offset = self.offset;
        match self.cache.try_get_with((), load(pool, offset)).await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(error = %e, "Analytics snapshot unavailable, serving empty report");
                Arc::new(AnalyticsReport::default())
            }
        }
    }

    /// Drop the cached report.
    pub async fn invalidate(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

async fn load(pool: &PgPool, offset: FixedOffset) -> Result<Arc<AnalyticsReport>, RepositoryError> {
    let users: Vec<_> = UserRepository::new(pool)
        .list_all()
        .await?
        .iter()
        .map(crate::models::User::snapshot)
        .collect();
    let clips = ClipRepository::new(pool).list_snapshots().await?;

    tracing::debug!(users = users.len(), clips = clips.len(), "Aggregating analytics");
    Ok(Arc::new(aggregate(&users, &clips, Utc::now(), offset)))
}
