use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// The period after which an open interval is force-closed and reopened
/// at the boundary, decoupling billing granularity from how long an
/// Environment stays RUNNING.
pub const RECONCILIATION_WINDOW_SECONDS: i64 = 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UsageInterval {
    pub id: Uuid,
    pub environment_id: Uuid,
    pub period_start: DateTime<Utc>,
    pub period_end: Option<DateTime<Utc>>,
    pub hourly_rate: f64,
    pub computed_cost: Option<f64>,
    pub billed: bool,
}

impl UsageInterval {
    pub fn open(environment_id: Uuid, hourly_rate: f64, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            environment_id,
            period_start: at,
            period_end: None,
            hourly_rate,
            computed_cost: None,
            billed: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.period_end.is_none()
    }

    /// Cost accrued if this interval were closed at `at`: hours elapsed
    /// since `period_start`, times the fixed hourly rate.
    pub fn cost_at(&self, at: DateTime<Utc>) -> f64 {
        let hours = (at - self.period_start).num_milliseconds() as f64 / 3_600_000.0;
        (hours.max(0.0)) * self.hourly_rate
    }

    pub fn close(&mut self, at: DateTime<Utc>) {
        self.computed_cost = Some(self.cost_at(at));
        self.period_end = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_is_hours_times_rate() {
        let start = Utc::now();
        let interval = UsageInterval::open(Uuid::now_v7(), 0.10, start);
        let end = start + chrono::Duration::hours(2);
        assert!((interval.cost_at(end) - 0.20).abs() < 1e-9);
    }
}
