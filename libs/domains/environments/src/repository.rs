use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::EnvironmentResult,
    models::{Environment, EnvironmentFilter},
};

/// Persistence for the `environments` row itself. State-transition
/// serialization (a row-level lock per environment) is the Postgres
/// implementation's concern; callers just see `transition`.
#[async_trait]
pub trait EnvironmentRepository: Send + Sync {
    async fn create(&self, environment: Environment) -> EnvironmentResult<Environment>;

    async fn get_by_id(&self, id: Uuid) -> EnvironmentResult<Option<Environment>>;

    async fn find_by_hostname(&self, hostname: &str) -> EnvironmentResult<Option<Environment>>;

    async fn list(&self, filter: EnvironmentFilter) -> EnvironmentResult<Vec<Environment>>;

    async fn list_owned_by(&self, owner_id: Uuid, filter: EnvironmentFilter) -> EnvironmentResult<Vec<Environment>>;

    /// Loads the row under a row-level lock, applies `mutate`, persists the
    /// result, and returns it, all within a single transaction. Two
    /// concurrent calls on the same id serialize; the loser sees the
    /// winner's committed state rather than a torn write.
    async fn transition(
        &self,
        id: Uuid,
        mutate: Box<dyn for<'r> FnOnce(&'r mut Environment) -> EnvironmentResult<()> + Send>,
    ) -> EnvironmentResult<Environment>;

    /// Every RUNNING environment; the auto-shutdown loop applies each row's
    /// own `auto_shutdown_seconds` window against `last_activity_at`.
    async fn list_running(&self) -> EnvironmentResult<Vec<Environment>>;

    /// Environments whose `auto_delete_at` has passed and that are not yet
    /// destroyed, for the purge loop.
    async fn list_expired(&self, now: DateTime<Utc>) -> EnvironmentResult<Vec<Environment>>;
}

#[async_trait]
impl<T: EnvironmentRepository + ?Sized> EnvironmentRepository for Arc<T> {
    async fn create(&self, environment: Environment) -> EnvironmentResult<Environment> {
        (**self).create(environment).await
    }

    async fn get_by_id(&self, id: Uuid) -> EnvironmentResult<Option<Environment>> {
        (**self).get_by_id(id).await
    }

    async fn find_by_hostname(&self, hostname: &str) -> EnvironmentResult<Option<Environment>> {
        (**self).find_by_hostname(hostname).await
    }

    async fn list(&self, filter: EnvironmentFilter) -> EnvironmentResult<Vec<Environment>> {
        (**self).list(filter).await
    }

    async fn list_owned_by(&self, owner_id: Uuid, filter: EnvironmentFilter) -> EnvironmentResult<Vec<Environment>> {
        (**self).list_owned_by(owner_id, filter).await
    }

    async fn transition(
        &self,
        id: Uuid,
        mutate: Box<dyn for<'r> FnOnce(&'r mut Environment) -> EnvironmentResult<()> + Send>,
    ) -> EnvironmentResult<Environment> {
        (**self).transition(id, mutate).await
    }

    async fn list_running(&self) -> EnvironmentResult<Vec<Environment>> {
        (**self).list_running().await
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> EnvironmentResult<Vec<Environment>> {
        (**self).list_expired(now).await
    }
}
