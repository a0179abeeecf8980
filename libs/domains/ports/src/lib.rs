//! Port Allocator
//!
//! Leases TCP ports in [30000, 40000] to container-backed ServiceInstances
//! and tracks their release. The uniqueness invariant lives in Postgres
//! (a partial unique index on `port WHERE active`), not in application
//! locking, so concurrent allocators across replicas never share a port.

pub mod entity;
pub mod error;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

pub use error::{PortError, PortResult};
pub use models::{PortAllocation, PORT_RANGE_END, PORT_RANGE_START};
pub use postgres::PgPortRepository;
pub use repository::PortRepository;
pub use service::PortAllocator;
