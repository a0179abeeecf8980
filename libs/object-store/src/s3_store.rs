use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use crate::{
    error::{ObjectStoreError, ObjectStoreResult},
    store::{ObjectMeta, ObjectStore},
};

/// S3-compatible backend. Pointed at a configurable endpoint so the same
/// adapter drives a real bucket in production and a local emulator
/// (e.g. MinIO) under test.
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client against `endpoint_url` (e.g. `http://localhost:9000`
    /// for a local emulator) with path-style addressing, required by most
    /// non-AWS S3-compatible servers.
    pub async fn connect(endpoint_url: Option<String>, region: String) -> Self {
        let shared_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(region))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config).force_path_style(true);
        if let Some(endpoint) = endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }

        Self {
            client: Client::from_conf(builder.build()),
        }
    }
}

#[async_trait::async_trait]
impl ObjectStore for S3ObjectStore {
    async fn create_namespace(&self, namespace: &str) -> ObjectStoreResult<()> {
        self.client
            .create_bucket()
            .bucket(namespace)
            .send()
            .await
            .map_err(|e| ObjectStoreError::CreateNamespaceFailed(e.to_string()))?;
        Ok(())
    }

    async fn delete_namespace(&self, namespace: &str) -> ObjectStoreResult<()> {
        let objects = self.list_objects(namespace, "").await?;
        for object in objects {
            self.delete_object(namespace, &object.key).await?;
        }

        self.client
            .delete_bucket()
            .bucket(namespace)
            .send()
            .await
            .map_err(|e| ObjectStoreError::DeleteNamespaceFailed(e.to_string()))?;
        Ok(())
    }

    async fn namespace_exists(&self, namespace: &str) -> ObjectStoreResult<bool> {
        match self.client.head_bucket().bucket(namespace).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.as_service_error().is_some_and(|se| se.is_not_found()) {
                    Ok(false)
                } else {
                    Err(ObjectStoreError::CreateNamespaceFailed(e.to_string()))
                }
            }
        }
    }

    async fn put_object(
        &self,
        namespace: &str,
        key: &str,
        body: Vec<u8>,
    ) -> ObjectStoreResult<()> {
        self.client
            .put_object()
            .bucket(namespace)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| ObjectStoreError::PutFailed(e.to_string()))?;
        Ok(())
    }

    async fn get_object(&self, namespace: &str, key: &str) -> ObjectStoreResult<Vec<u8>> {
        let output = self
            .client
            .get_object()
            .bucket(namespace)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    ObjectStoreError::ObjectNotFound(namespace.to_string(), key.to_string())
                } else {
                    ObjectStoreError::GetFailed(e.to_string())
                }
            })?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| ObjectStoreError::GetFailed(e.to_string()))?
            .into_bytes();

        Ok(bytes.to_vec())
    }

    async fn list_objects(&self, namespace: &str, prefix: &str) -> ObjectStoreResult<Vec<ObjectMeta>> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(namespace)
            .prefix(prefix)
            .send()
            .await
            .map_err(|e| ObjectStoreError::ListFailed(e.to_string()))?;

        Ok(output
            .contents
            .unwrap_or_default()
            .into_iter()
            .filter_map(|obj| {
                Some(ObjectMeta {
                    key: obj.key?,
                    size: obj.size.unwrap_or_default(),
                })
            })
            .collect())
    }

    async fn delete_object(&self, namespace: &str, key: &str) -> ObjectStoreResult<()> {
        self.client
            .delete_object()
            .bucket(namespace)
            .key(key)
            .send()
            .await
            .map_err(|e| ObjectStoreError::DeleteFailed(e.to_string()))?;
        Ok(())
    }
}
