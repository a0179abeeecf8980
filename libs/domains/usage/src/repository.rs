use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{error::UsageResult, models::UsageInterval};

#[async_trait]
pub trait UsageIntervalRepository: Send + Sync {
    /// Opens a new interval. The partial unique index on
    /// `(environment_id) WHERE period_end IS NULL` is the real guard for
    /// the one-open-interval-per-environment invariant; a violation
    /// here means a caller opened twice without closing, a bug upstream
    /// rather than an expected race.
    async fn open(&self, environment_id: Uuid, hourly_rate: f64, at: DateTime<Utc>) -> UsageResult<UsageInterval>;

    /// Closes the environment's open interval at `at`, if one exists.
    async fn close(&self, environment_id: Uuid, at: DateTime<Utc>) -> UsageResult<Option<UsageInterval>>;

    async fn list_for_environment(&self, environment_id: Uuid) -> UsageResult<Vec<UsageInterval>>;

    /// Open intervals whose `period_start` is older than `threshold`,
    /// candidates for hourly-boundary reconciliation.
    async fn list_open_older_than(&self, threshold: DateTime<Utc>) -> UsageResult<Vec<UsageInterval>>;

    /// Atomically closes `interval_id` at `boundary` and opens a fresh
    /// interval for the same environment and rate starting at `boundary`.
    /// Returns (closed, reopened).
    async fn close_and_reopen_at_boundary(
        &self,
        interval_id: Uuid,
        boundary: DateTime<Utc>,
    ) -> UsageResult<(UsageInterval, UsageInterval)>;
}
