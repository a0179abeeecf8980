//! Environment Lifecycle Manager
//!
//! Owns the `environments` table and the state machine
//! CREATED -> PROVISIONING -> RUNNING <-> STOPPED -> DESTROYING -> DESTROYED
//! (plus transient ERROR). Every transition that reaches outside this
//! crate's own table does so through the `effects` ports, under a
//! row-level lock that records intent before attempting the effect.

pub mod effects;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

pub use effects::{
    CreationGate, EffectError, EffectResult, ProvisionOutcome, ResourceCleanup, ServiceProvisioner, UsageAccrual,
};
pub use error::{EnvironmentError, EnvironmentResult};
pub use models::{
    validate_hostname, CreateEnvironment, Environment, EnvironmentDetails, EnvironmentFilter, EnvironmentStatus,
    ProvisionedEnvironment, ServiceRequest, UpdateHostname, DEFAULT_AUTO_SHUTDOWN_SECONDS,
};
pub use postgres::PgEnvironmentRepository;
pub use repository::EnvironmentRepository;
pub use service::EnvironmentService;
