//! Cloud-API Emulation Router
//!
//! Accepts AWS/GCP/Azure-shaped requests scoped to an environment and
//! translates them onto the relational store, the object-store adapter,
//! or the container runtime. One module per cloud-service family; each
//! documents the operation subset it supports and answers anything else
//! with that family's not-implemented error shape.
//!
//! Requests are dispatched by path prefix, `/{environment_id}/{cloud}/
//! {service}/...`, the path-routed equivalent of the subdomain form
//! `{service}.{environment_id}.{base-domain}`. Every request is
//! authorized against the environment's owner, bumps the environment's
//! last-activity timestamp, and records a metering event.

pub mod blob;
pub mod cleanup;
pub mod dynamodb;
pub mod ec2;
pub mod entity;
pub mod error;
pub mod gcs;
pub mod handlers;
pub mod iam;
pub mod lambda;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod route53;
pub mod s3;
pub mod sqs;
pub mod state;
mod wire;

pub use cleanup::EmulationCleanup;
pub use entity::Entity as EmulatedResourceEntity;
pub use error::{EmulationError, EmulationResult};
pub use models::{EmulatedResource, ResourceFamily};
pub use postgres::PgEmulatedResourceRepository;
pub use repository::EmulatedResourceRepository;
pub use state::{EmulationConfig, EmulationState};

#[cfg(test)]
pub(crate) mod testing;
