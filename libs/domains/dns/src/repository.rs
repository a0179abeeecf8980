use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::DnsResult,
    models::{DnsRecord, DnsRecordFilter, RecordType},
};

#[async_trait]
pub trait DnsRecordRepository: Send + Sync {
    async fn create(&self, record: DnsRecord) -> DnsResult<DnsRecord>;

    async fn get_by_id(&self, id: Uuid) -> DnsResult<Option<DnsRecord>>;

    async fn list_for_environment(
        &self,
        environment_id: Uuid,
        filter: DnsRecordFilter,
    ) -> DnsResult<Vec<DnsRecord>>;

    async fn delete(&self, id: Uuid) -> DnsResult<()>;

    /// Invoked by the Lifecycle Manager's DNS cleanup port on environment
    /// destroy. Environment rows are never deleted (DESTROYED is terminal,
    /// not absent), so the `ON DELETE CASCADE` foreign key never fires —
    /// this method is the actual cleanup path.
    async fn delete_for_environment(&self, environment_id: Uuid) -> DnsResult<()>;

    /// Multi-tenant, read-only lookup for the UDP responder: the oldest
    /// matching `(name, type)` record across every environment, or `None`
    /// for NXDOMAIN.
    async fn find_oldest_match(&self, name: &str, record_type: RecordType) -> DnsResult<Option<DnsRecord>>;
}

#[async_trait]
impl<T: DnsRecordRepository + ?Sized> DnsRecordRepository for Arc<T> {
    async fn create(&self, record: DnsRecord) -> DnsResult<DnsRecord> {
        (**self).create(record).await
    }

    async fn get_by_id(&self, id: Uuid) -> DnsResult<Option<DnsRecord>> {
        (**self).get_by_id(id).await
    }

    async fn list_for_environment(
        &self,
        environment_id: Uuid,
        filter: DnsRecordFilter,
    ) -> DnsResult<Vec<DnsRecord>> {
        (**self).list_for_environment(environment_id, filter).await
    }

    async fn delete(&self, id: Uuid) -> DnsResult<()> {
        (**self).delete(id).await
    }

    async fn delete_for_environment(&self, environment_id: Uuid) -> DnsResult<()> {
        (**self).delete_for_environment(environment_id).await
    }

    async fn find_oldest_match(&self, name: &str, record_type: RecordType) -> DnsResult<Option<DnsRecord>> {
        (**self).find_oldest_match(name, record_type).await
    }
}
