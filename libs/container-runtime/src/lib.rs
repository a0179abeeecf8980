//! Container Runtime Adapter
//!
//! A capability-restricted wrapper over the Docker Engine API. Containers
//! it creates carry no volume mounts, cannot join a swarm, and exec is
//! scoped to the target container's own namespace. Every error surfaces
//! as a raw `RuntimeError`; retry policy belongs to the caller.

pub mod bollard_runtime;
pub mod error;
pub mod models;
pub mod runtime;

pub use bollard_runtime::BollardContainerRuntime;
pub use error::{RuntimeError, RuntimeResult};
pub use models::{ContainerInspection, ContainerSpec, ContainerState, ExecOutput};
pub use runtime::ContainerRuntime;
