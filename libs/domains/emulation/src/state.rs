use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use container_runtime::ContainerRuntime;
use domain_environments::{Environment, EnvironmentRepository, EnvironmentStatus};
use domain_service_instances::{ServiceInstanceRepository, ServiceInstanceStatus, ServiceKind};
use object_store_adapter::ObjectStore;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::{
    error::{EmulationError, EmulationResult},
    models::ResourceFamily,
    repository::EmulatedResourceRepository,
};

#[derive(Clone, Debug)]
pub struct EmulationConfig {
    pub base_domain: String,
    /// Concurrent invocations per Lambda function before TooManyRequests.
    pub lambda_concurrency: usize,
}

impl Default for EmulationConfig {
    fn default() -> Self {
        Self {
            base_domain: "mockfactory.dev".to_string(),
            lambda_concurrency: 10,
        }
    }
}

/// Shared state behind every translator route. Trait objects rather than
/// generics: nine handler modules over five collaborator traits would
/// otherwise thread five type parameters through every route signature.
#[derive(Clone)]
pub struct EmulationState {
    pub resources: Arc<dyn EmulatedResourceRepository>,
    pub environments: Arc<dyn EnvironmentRepository>,
    pub instances: Arc<dyn ServiceInstanceRepository>,
    pub object_store: Arc<dyn ObjectStore>,
    pub runtime: Arc<dyn ContainerRuntime>,
    pub dns: Arc<dyn domain_dns::DnsRecordRepository>,
    pub config: EmulationConfig,
    lambda_limits: Arc<Mutex<HashMap<String, Arc<Semaphore>>>>,
}

impl EmulationState {
    pub fn new(
        resources: Arc<dyn EmulatedResourceRepository>,
        environments: Arc<dyn EnvironmentRepository>,
        instances: Arc<dyn ServiceInstanceRepository>,
        object_store: Arc<dyn ObjectStore>,
        runtime: Arc<dyn ContainerRuntime>,
        dns: Arc<dyn domain_dns::DnsRecordRepository>,
        config: EmulationConfig,
    ) -> Self {
        Self {
            resources,
            environments,
            instances,
            object_store,
            runtime,
            dns,
            config,
            lambda_limits: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Resolves the environment, enforces ownership, refuses destroyed
    /// environments, bumps last-activity, and records the metering event.
    /// Every translator route calls this before doing anything else.
    pub async fn authorize(
        &self,
        caller: Uuid,
        environment_id: Uuid,
        family: ResourceFamily,
        operation: &str,
    ) -> EmulationResult<Environment> {
        let environment = self
            .environments
            .get_by_id(environment_id)
            .await?
            .ok_or_else(|| EmulationError::NotFound(format!("environment {environment_id}")))?;

        if !environment.is_owned_by(caller) {
            return Err(EmulationError::Forbidden(environment_id));
        }

        if matches!(
            environment.status,
            EnvironmentStatus::Destroyed | EnvironmentStatus::Destroying
        ) {
            return Err(EmulationError::Conflict(format!(
                "environment {environment_id} is destroyed"
            )));
        }

        self.environments
            .transition(
                environment_id,
                Box::new(|env| {
                    env.touch_activity();
                    Ok(())
                }),
            )
            .await?;

        metrics::counter!(
            "mockfactory_emulation_calls_total",
            "family" => family.to_string(),
            "operation" => operation.to_string(),
        )
        .increment(1);
        tracing::debug!(environment_id = %environment_id, %family, operation, "emulated cloud API call");

        Ok(environment)
    }

    /// The object-store namespace backing a storage-family request,
    /// resolved through the environment's provisioned ServiceInstance.
    pub async fn storage_namespace(
        &self,
        environment_id: Uuid,
        kind: ServiceKind,
    ) -> EmulationResult<String> {
        let instances = self.instances.list_for_environment(environment_id).await?;

        instances
            .into_iter()
            .find(|i| i.service_kind == kind && i.status != ServiceInstanceStatus::Destroyed)
            .and_then(|i| i.object_store_namespace)
            .ok_or_else(|| {
                EmulationError::InvalidRequest(format!(
                    "environment {environment_id} does not declare a {kind} service"
                ))
            })
    }

    /// Per-function concurrency gate for Lambda Invoke.
    pub fn lambda_semaphore(&self, function_external_id: &str) -> Arc<Semaphore> {
        let mut limits = self.lambda_limits.lock().expect("lambda limiter poisoned");
        limits
            .entry(function_external_id.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.config.lambda_concurrency)))
            .clone()
    }
}
