//! Object-Store Adapter
//!
//! Namespace-scoped object storage backing S3/GCS/Blob emulation and the
//! managed-backed provisioning flow. One namespace per ServiceInstance,
//! named by the caller (`mockfactory-<env-id>-<service-kind>`).

pub mod error;
pub mod s3_store;
pub mod store;

pub use error::{ObjectStoreError, ObjectStoreResult};
pub use s3_store::S3ObjectStore;
pub use store::{ObjectMeta, ObjectStore};
