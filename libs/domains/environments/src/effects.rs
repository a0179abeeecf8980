//! Ports the Lifecycle Manager calls out through. Kept as narrow traits
//! rather than a dependency on `domain_service_instances`/`domain_usage`
//! directly, the same way `domain_ports`'s `PortRepository` is a trait
//! the Postgres implementation satisfies from the outside — this crate
//! never writes anything except the `environments` row itself.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as Json;
use uuid::Uuid;

use crate::models::ServiceRequest;

#[derive(Debug, thiserror::Error)]
pub enum EffectError {
    #[error("provisioning failed: {0}")]
    ProvisioningFailure(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type EffectResult<T> = Result<T, EffectError>;

/// Result of successfully provisioning every declared service for an
/// environment: the masked, caller-facing endpoint map and the summed
/// hourly rate used to open the UsageInterval.
#[derive(Debug, Clone)]
pub struct ProvisionOutcome {
    pub endpoints: Json,
    pub hourly_rate: f64,
}

/// The Service Provisioner, as seen by the Lifecycle Manager.
#[async_trait]
pub trait ServiceProvisioner: Send + Sync {
    /// Container-backed and managed-backed flows for every declared
    /// service. On failure of service *i* the implementation is
    /// responsible for destroying services 1..i-1 in reverse order before
    /// returning the error.
    async fn provision(
        &self,
        environment_id: Uuid,
        requests: &[ServiceRequest],
    ) -> EffectResult<ProvisionOutcome>;

    /// Stops every running container for the environment; managed-backed
    /// services have nothing to stop.
    async fn stop(&self, environment_id: Uuid) -> EffectResult<()>;

    /// Restarts containers without recreation: same ports, same
    /// credentials, same namespaces.
    async fn start(&self, environment_id: Uuid) -> EffectResult<()>;

    /// Tears down every ServiceInstance: containers, namespaces, and their
    /// leased ports.
    async fn destroy(&self, environment_id: Uuid) -> EffectResult<()>;

    /// The masked, caller-facing endpoint map for the environment's
    /// current ServiceInstances.
    async fn endpoints(&self, environment_id: Uuid) -> EffectResult<Json>;
}

/// The Metering & Billing Accrual loop, as seen by the Lifecycle
/// Manager.
#[async_trait]
pub trait UsageAccrual: Send + Sync {
    async fn open_interval(&self, environment_id: Uuid, hourly_rate: f64) -> EffectResult<()>;

    /// Closes the environment's open interval, returning the cost it
    /// accrued so the Lifecycle Manager can add it to the environment's
    /// running-cost accumulator. `None` when no interval was open.
    async fn close_interval(&self, environment_id: Uuid) -> EffectResult<Option<f64>>;
}

/// Pre-creation policy check: tier quotas and account standing. The
/// implementation lives with whoever can see both the user record and
/// the environment counts; a missing gate means creation is ungated.
#[async_trait]
pub trait CreationGate: Send + Sync {
    /// Ok(()) to allow; `Forbidden` for a disabled account,
    /// `QuotaExceeded` once the caller's tier cap is reached.
    async fn authorize_creation(&self, owner_id: Uuid) -> EffectResult<()>;
}

/// Per-environment resource cleanup on destruction. DNS records and
/// emulated cloud resources both hang off an Environment whose row is
/// never deleted (DESTROYED is a status, not row absence), so each owning
/// crate registers one of these instead of relying on a cascade that
/// never fires.
#[async_trait]
pub trait ResourceCleanup: Send + Sync {
    async fn purge(&self, environment_id: Uuid) -> EffectResult<()>;
}

#[async_trait]
impl<T: ServiceProvisioner + ?Sized> ServiceProvisioner for Arc<T> {
    async fn provision(
        &self,
        environment_id: Uuid,
        requests: &[ServiceRequest],
    ) -> EffectResult<ProvisionOutcome> {
        (**self).provision(environment_id, requests).await
    }

    async fn stop(&self, environment_id: Uuid) -> EffectResult<()> {
        (**self).stop(environment_id).await
    }

    async fn start(&self, environment_id: Uuid) -> EffectResult<()> {
        (**self).start(environment_id).await
    }

    async fn destroy(&self, environment_id: Uuid) -> EffectResult<()> {
        (**self).destroy(environment_id).await
    }

    async fn endpoints(&self, environment_id: Uuid) -> EffectResult<Json> {
        (**self).endpoints(environment_id).await
    }
}

#[async_trait]
impl<T: UsageAccrual + ?Sized> UsageAccrual for Arc<T> {
    async fn open_interval(&self, environment_id: Uuid, hourly_rate: f64) -> EffectResult<()> {
        (**self).open_interval(environment_id, hourly_rate).await
    }

    async fn close_interval(&self, environment_id: Uuid) -> EffectResult<Option<f64>> {
        (**self).close_interval(environment_id).await
    }
}

#[async_trait]
impl<T: ResourceCleanup + ?Sized> ResourceCleanup for Arc<T> {
    async fn purge(&self, environment_id: Uuid) -> EffectResult<()> {
        (**self).purge(environment_id).await
    }
}

#[async_trait]
impl<T: CreationGate + ?Sized> CreationGate for Arc<T> {
    async fn authorize_creation(&self, owner_id: Uuid) -> EffectResult<()> {
        (**self).authorize_creation(owner_id).await
    }
}
