//! Service Provisioner
//!
//! Container-backed and managed-backed provisioning flows for a single
//! ServiceInstance, plus the per-kind static capability table (image,
//! readiness probe, credential shape, hourly rate). Implements the
//! `domain_environments::ServiceProvisioner` port so the Lifecycle
//! Manager never depends on this crate's concrete types.

pub mod entity;
pub mod error;
pub mod models;
pub mod postgres;
pub mod provisioner;
pub mod repository;

pub use entity::Entity as ServiceInstanceEntity;
pub use error::{ServiceInstanceError, ServiceInstanceResult};
pub use models::{
    container_name_for, namespace_for, Credentials, ReadinessProbe, ServiceBackend, ServiceCapability, ServiceInstance,
    ServiceInstanceStatus, ServiceKind, MASK,
};
pub use postgres::PgServiceInstanceRepository;
pub use provisioner::ServiceInstanceProvisioner;
pub use repository::ServiceInstanceRepository;
