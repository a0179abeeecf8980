use async_trait::async_trait;
use chrono::Utc;
use domain_environments::{effects::UsageAccrual, EffectError, EffectResult};
use uuid::Uuid;

use crate::{
    error::UsageError,
    models::{UsageInterval, RECONCILIATION_WINDOW_SECONDS},
    repository::UsageIntervalRepository,
};

impl From<UsageError> for EffectError {
    fn from(e: UsageError) -> Self {
        EffectError::Internal(e.to_string())
    }
}

pub struct UsageAccrualService<R: UsageIntervalRepository> {
    repository: R,
}

impl<R: UsageIntervalRepository> UsageAccrualService<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    pub async fn history(&self, environment_id: Uuid) -> Result<Vec<UsageInterval>, UsageError> {
        self.repository.list_for_environment(environment_id).await
    }

    /// One reconciliation pass: every open interval older than the
    /// configured window is closed at its hour boundary and immediately
    /// reopened, so an Environment that stays RUNNING for days still gets
    /// an hourly-granular, crash-bounded usage ledger. Returns the cost
    /// each closed interval accrued, keyed by environment, so the caller
    /// can feed the environments' running-cost accumulators.
    pub async fn reconcile_once(&self) -> Result<Vec<(Uuid, f64)>, UsageError> {
        let threshold = Utc::now() - chrono::Duration::seconds(RECONCILIATION_WINDOW_SECONDS);
        let stale = self.repository.list_open_older_than(threshold).await?;

        let mut closed_costs = Vec::new();
        for interval in &stale {
            let boundary = interval.period_start + chrono::Duration::seconds(RECONCILIATION_WINDOW_SECONDS);
            let (closed, _reopened) = self.repository.close_and_reopen_at_boundary(interval.id, boundary).await?;
            closed_costs.push((closed.environment_id, closed.computed_cost.unwrap_or(0.0)));
        }

        if closed_costs.is_empty() {
            tracing::debug!("Usage reconciliation found nothing to close");
        } else {
            tracing::info!(reconciled = closed_costs.len(), "Usage reconciliation closed stale intervals at hour boundary");
        }

        Ok(closed_costs)
    }
}

#[async_trait]
impl<R: UsageIntervalRepository> UsageAccrual for UsageAccrualService<R> {
    async fn open_interval(&self, environment_id: Uuid, hourly_rate: f64) -> EffectResult<()> {
        self.repository.open(environment_id, hourly_rate, Utc::now()).await?;
        Ok(())
    }

    async fn close_interval(&self, environment_id: Uuid) -> EffectResult<Option<f64>> {
        let closed = self.repository.close(environment_id, Utc::now()).await?;
        Ok(closed.and_then(|interval| interval.computed_cost))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryUsageIntervals {
        rows: Mutex<Vec<UsageInterval>>,
    }

    #[async_trait]
    impl UsageIntervalRepository for InMemoryUsageIntervals {
        async fn open(
            &self,
            environment_id: Uuid,
            hourly_rate: f64,
            at: chrono::DateTime<Utc>,
        ) -> Result<UsageInterval, UsageError> {
            let interval = UsageInterval::open(environment_id, hourly_rate, at);
            self.rows.lock().unwrap().push(interval.clone());
            Ok(interval)
        }

        async fn close(
            &self,
            environment_id: Uuid,
            at: chrono::DateTime<Utc>,
        ) -> Result<Option<UsageInterval>, UsageError> {
            let mut rows = self.rows.lock().unwrap();
            let interval = rows.iter_mut().find(|i| i.environment_id == environment_id && i.is_open());
            match interval {
                Some(interval) => {
                    interval.close(at);
                    Ok(Some(interval.clone()))
                }
                None => Ok(None),
            }
        }

        async fn list_for_environment(&self, environment_id: Uuid) -> Result<Vec<UsageInterval>, UsageError> {
            Ok(self.rows.lock().unwrap().iter().filter(|i| i.environment_id == environment_id).cloned().collect())
        }

        async fn list_open_older_than(&self, threshold: chrono::DateTime<Utc>) -> Result<Vec<UsageInterval>, UsageError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|i| i.is_open() && i.period_start <= threshold)
                .cloned()
                .collect())
        }

        async fn close_and_reopen_at_boundary(
            &self,
            interval_id: Uuid,
            boundary: chrono::DateTime<Utc>,
        ) -> Result<(UsageInterval, UsageInterval), UsageError> {
            let mut rows = self.rows.lock().unwrap();
            let interval = rows.iter_mut().find(|i| i.id == interval_id).ok_or(UsageError::NotFound(interval_id))?;
            interval.close(boundary);
            let closed = interval.clone();
            let reopened = UsageInterval::open(closed.environment_id, closed.hourly_rate, boundary);
            rows.push(reopened.clone());
            Ok((closed, reopened))
        }
    }

    #[tokio::test]
    async fn open_then_close_computes_cost() {
        let service = UsageAccrualService::new(InMemoryUsageIntervals::default());
        let environment_id = Uuid::now_v7();

        service.open_interval(environment_id, 0.05).await.unwrap();
        service.close_interval(environment_id).await.unwrap();

        let history = service.history(environment_id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(!history[0].is_open());
        assert!(history[0].computed_cost.unwrap() >= 0.0);
    }

    #[tokio::test]
    async fn reconciliation_closes_and_reopens_stale_intervals() {
        let service = UsageAccrualService::new(InMemoryUsageIntervals::default());
        let environment_id = Uuid::now_v7();

        let stale_start = Utc::now() - chrono::Duration::hours(2);
        service
            .repository
            .open(environment_id, 0.10, stale_start)
            .await
            .unwrap();

        let reconciled = service.reconcile_once().await.unwrap();
        assert_eq!(reconciled.len(), 1);
        assert_eq!(reconciled[0].0, environment_id);
        // closed at the one-hour boundary of a 0.10/h interval
        assert!((reconciled[0].1 - 0.10).abs() < 1e-9);

        let history = service.history(environment_id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().any(|i| i.is_open()));
        assert!(history.iter().any(|i| !i.is_open()));
    }
}
