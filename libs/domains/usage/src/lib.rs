//! Metering & Billing Accrual
//!
//! Opens a `UsageInterval` whenever an Environment reaches RUNNING, closes
//! it on every transition away, and reconciles long-running intervals at
//! the hour boundary so billing granularity never depends on how long an
//! Environment happens to stay up. Implements
//! `domain_environments::effects::UsageAccrual`.

pub mod entity;
pub mod error;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

pub use entity::Entity as UsageIntervalEntity;
pub use error::{UsageError, UsageResult};
pub use models::{UsageInterval, RECONCILIATION_WINDOW_SECONDS};
pub use postgres::PgUsageIntervalRepository;
pub use repository::UsageIntervalRepository;
pub use service::UsageAccrualService;
