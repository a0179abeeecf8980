use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ObjectStoreResult;

#[derive(Debug, Clone)]
pub struct ObjectMeta {
    pub key: String,
    pub size: i64,
}

/// Namespace-scoped object storage. One namespace per ServiceInstance
/// backing S3/GCS/Blob emulation, named `mockfactory-<env-id>-<service-kind>`
/// by the caller so it stays unique across environments.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn create_namespace(&self, namespace: &str) -> ObjectStoreResult<()>;

    async fn delete_namespace(&self, namespace: &str) -> ObjectStoreResult<()>;

    async fn namespace_exists(&self, namespace: &str) -> ObjectStoreResult<bool>;

    async fn put_object(
        &self,
        namespace: &str,
        key: &str,
        body: Vec<u8>,
    ) -> ObjectStoreResult<()>;

    async fn get_object(&self, namespace: &str, key: &str) -> ObjectStoreResult<Vec<u8>>;

    async fn list_objects(&self, namespace: &str, prefix: &str) -> ObjectStoreResult<Vec<ObjectMeta>>;

    async fn delete_object(&self, namespace: &str, key: &str) -> ObjectStoreResult<()>;
}

#[async_trait]
impl<T: ObjectStore + ?Sized> ObjectStore for Arc<T> {
    async fn create_namespace(&self, namespace: &str) -> ObjectStoreResult<()> {
        (**self).create_namespace(namespace).await
    }

    async fn delete_namespace(&self, namespace: &str) -> ObjectStoreResult<()> {
        (**self).delete_namespace(namespace).await
    }

    async fn namespace_exists(&self, namespace: &str) -> ObjectStoreResult<bool> {
        (**self).namespace_exists(namespace).await
    }

    async fn put_object(&self, namespace: &str, key: &str, body: Vec<u8>) -> ObjectStoreResult<()> {
        (**self).put_object(namespace, key, body).await
    }

    async fn get_object(&self, namespace: &str, key: &str) -> ObjectStoreResult<Vec<u8>> {
        (**self).get_object(namespace, key).await
    }

    async fn list_objects(&self, namespace: &str, prefix: &str) -> ObjectStoreResult<Vec<ObjectMeta>> {
        (**self).list_objects(namespace, prefix).await
    }

    async fn delete_object(&self, namespace: &str, key: &str) -> ObjectStoreResult<()> {
        (**self).delete_object(namespace, key).await
    }
}
