use async_trait::async_trait;
use domain_environments::{effects::ResourceCleanup, repository::EnvironmentRepository, EffectError, EffectResult};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{DnsError, DnsResult},
    models::{validate_shape, BulkCreateDnsRecords, BulkInsertFailure, BulkInsertOutcome, CreateDnsRecord, DnsRecord, DnsRecordFilter, MAX_BULK_RECORDS},
    repository::DnsRecordRepository,
};

impl From<DnsError> for EffectError {
    fn from(e: DnsError) -> Self {
        EffectError::Internal(e.to_string())
    }
}

pub struct DnsRecordService<R: DnsRecordRepository, E: EnvironmentRepository> {
    repository: R,
    environments: E,
}

impl<R: DnsRecordRepository, E: EnvironmentRepository> DnsRecordService<R, E> {
    pub fn new(repository: R, environments: E) -> Self {
        Self { repository, environments }
    }

    async fn check_ownership(&self, caller: Uuid, environment_id: Uuid) -> DnsResult<()> {
        let environment = self
            .environments
            .get_by_id(environment_id)
            .await
            .map_err(|e| DnsError::Internal(e.to_string()))?
            .ok_or(DnsError::Forbidden(environment_id))?;

        if !environment.is_owned_by(caller) {
            return Err(DnsError::Forbidden(environment_id));
        }
        Ok(())
    }

    pub async fn create(&self, caller: Uuid, environment_id: Uuid, input: CreateDnsRecord) -> DnsResult<DnsRecord> {
        self.check_ownership(caller, environment_id).await?;
        input.validate().map_err(|e| DnsError::InvalidRequest(e.to_string()))?;
        validate_shape(&input).map_err(DnsError::InvalidRequest)?;

        let record = DnsRecord::new(environment_id, &input);
        let created = self.repository.create(record).await?;
        tracing::info!(record_id = %created.id, environment_id = %environment_id, "Created DNS record");
        Ok(created)
    }

    /// Bulk insert of up to `MAX_BULK_RECORDS` records. Each record is
    /// validated and inserted independently; a failure on one does not
    /// abort the rest.
    pub async fn bulk_create(
        &self,
        caller: Uuid,
        environment_id: Uuid,
        input: BulkCreateDnsRecords,
    ) -> DnsResult<BulkInsertOutcome> {
        self.check_ownership(caller, environment_id).await?;

        if input.records.len() > MAX_BULK_RECORDS {
            return Err(DnsError::InvalidRequest(format!(
                "bulk insert accepts at most {MAX_BULK_RECORDS} records, got {}",
                input.records.len()
            )));
        }

        let mut succeeded = Vec::new();
        let mut failed = Vec::new();

        for (index, candidate) in input.records.into_iter().enumerate() {
            let outcome = async {
                candidate.validate().map_err(|e| e.to_string())?;
                validate_shape(&candidate)?;
                let record = DnsRecord::new(environment_id, &candidate);
                self.repository
                    .create(record)
                    .await
                    .map_err(|e| e.to_string())
            }
            .await;

            match outcome {
                Ok(record) => succeeded.push(record),
                Err(message) => failed.push(BulkInsertFailure { index, message }),
            }
        }

        Ok(BulkInsertOutcome { succeeded, failed })
    }

    pub async fn get(&self, caller: Uuid, environment_id: Uuid, id: Uuid) -> DnsResult<DnsRecord> {
        self.check_ownership(caller, environment_id).await?;
        let record = self.repository.get_by_id(id).await?.ok_or(DnsError::NotFound(id))?;
        if record.environment_id != environment_id {
            return Err(DnsError::NotFound(id));
        }
        Ok(record)
    }

    pub async fn list(&self, caller: Uuid, environment_id: Uuid, filter: DnsRecordFilter) -> DnsResult<Vec<DnsRecord>> {
        self.check_ownership(caller, environment_id).await?;
        self.repository.list_for_environment(environment_id, filter).await
    }

    pub async fn delete(&self, caller: Uuid, environment_id: Uuid, id: Uuid) -> DnsResult<()> {
        self.check_ownership(caller, environment_id).await?;
        let record = self.repository.get_by_id(id).await?.ok_or(DnsError::NotFound(id))?;
        if record.environment_id != environment_id {
            return Err(DnsError::NotFound(id));
        }
        self.repository.delete(id).await
    }
}

#[async_trait]
impl<R: DnsRecordRepository, E: EnvironmentRepository> ResourceCleanup for DnsRecordService<R, E> {
    async fn purge(&self, environment_id: Uuid) -> EffectResult<()> {
        self.repository.delete_for_environment(environment_id).await?;
        Ok(())
    }
}
