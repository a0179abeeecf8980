//! In-memory collaborators for translator tests, mirroring the fakes the
//! sibling domain crates use in their own unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use container_runtime::{ContainerInspection, ContainerRuntime, ContainerSpec, ContainerState, ExecOutput};
use domain_dns::{DnsRecord, DnsRecordFilter, DnsRecordRepository, DnsResult, RecordType};
use domain_environments::{
    CreateEnvironment, Environment, EnvironmentError, EnvironmentFilter, EnvironmentRepository, EnvironmentResult,
};
use domain_service_instances::{ServiceInstance, ServiceInstanceRepository, ServiceInstanceResult, ServiceKind};
use object_store_adapter::{ObjectMeta, ObjectStore, ObjectStoreError, ObjectStoreResult};
use uuid::Uuid;

use crate::{
    error::{EmulationError, EmulationResult},
    models::{EmulatedResource, ResourceFamily},
    repository::EmulatedResourceRepository,
    state::{EmulationConfig, EmulationState},
};

#[derive(Default)]
pub struct InMemoryResources {
    pub rows: Mutex<Vec<EmulatedResource>>,
}

#[async_trait]
impl EmulatedResourceRepository for InMemoryResources {
    async fn create(&self, resource: EmulatedResource) -> EmulationResult<EmulatedResource> {
        let mut rows = self.rows.lock().unwrap();
        if rows
            .iter()
            .any(|r| r.family == resource.family && r.external_id == resource.external_id)
        {
            return Err(EmulationError::Conflict(format!(
                "{} {} already exists",
                resource.family, resource.external_id
            )));
        }
        rows.push(resource.clone());
        Ok(resource)
    }

    async fn update(&self, resource: EmulatedResource) -> EmulationResult<EmulatedResource> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|r| r.id == resource.id) {
            Some(existing) => {
                *existing = resource.clone();
                Ok(resource)
            }
            None => Err(EmulationError::NotFound(format!("resource {}", resource.id))),
        }
    }

    async fn get(&self, family: ResourceFamily, external_id: &str) -> EmulationResult<Option<EmulatedResource>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.family == family && r.external_id == external_id)
            .cloned())
    }

    async fn list(
        &self,
        environment_id: Uuid,
        family: ResourceFamily,
        kind: &str,
    ) -> EmulationResult<Vec<EmulatedResource>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.environment_id == environment_id && r.family == family && r.kind == kind)
            .cloned()
            .collect())
    }

    async fn list_for_environment(&self, environment_id: Uuid) -> EmulationResult<Vec<EmulatedResource>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.environment_id == environment_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: Uuid) -> EmulationResult<()> {
        self.rows.lock().unwrap().retain(|r| r.id != id);
        Ok(())
    }

    async fn delete_for_environment(&self, environment_id: Uuid) -> EmulationResult<()> {
        self.rows.lock().unwrap().retain(|r| r.environment_id != environment_id);
        Ok(())
    }

    async fn claim_queue_messages(
        &self,
        environment_id: Uuid,
        queue_url: &str,
        max: usize,
        visibility: Duration,
    ) -> EmulationResult<Vec<EmulatedResource>> {
        let mut rows = self.rows.lock().unwrap();
        let now = Utc::now();
        let mut claimed = Vec::new();

        for row in rows.iter_mut().filter(|r| {
            r.environment_id == environment_id && r.family == ResourceFamily::Sqs && r.kind == "message"
        }) {
            if claimed.len() >= max {
                break;
            }
            if row.attr_str("queue_url") != Some(queue_url) {
                continue;
            }
            let visible_at = row
                .attr_str("visible_at")
                .and_then(|s| s.parse::<DateTime<Utc>>().ok())
                .unwrap_or(now);
            if visible_at > now {
                continue;
            }
            crate::sqs::stamp_received(row, now + visibility);
            claimed.push(row.clone());
        }

        Ok(claimed)
    }
}

#[derive(Default)]
pub struct InMemoryEnvironments {
    pub rows: Mutex<Vec<Environment>>,
}

#[async_trait]
impl EnvironmentRepository for InMemoryEnvironments {
    async fn create(&self, environment: Environment) -> EnvironmentResult<Environment> {
        self.rows.lock().unwrap().push(environment.clone());
        Ok(environment)
    }

    async fn get_by_id(&self, id: Uuid) -> EnvironmentResult<Option<Environment>> {
        Ok(self.rows.lock().unwrap().iter().find(|e| e.id == id).cloned())
    }

    async fn find_by_hostname(&self, hostname: &str) -> EnvironmentResult<Option<Environment>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.custom_hostname.as_deref() == Some(hostname))
            .cloned())
    }

    async fn list(&self, _filter: EnvironmentFilter) -> EnvironmentResult<Vec<Environment>> {
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn list_owned_by(&self, owner_id: Uuid, _filter: EnvironmentFilter) -> EnvironmentResult<Vec<Environment>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn transition(
        &self,
        id: Uuid,
        mutate: Box<dyn FnOnce(&mut Environment) -> EnvironmentResult<()> + Send>,
    ) -> EnvironmentResult<Environment> {
        let mut rows = self.rows.lock().unwrap();
        let environment = rows.iter_mut().find(|e| e.id == id).ok_or(EnvironmentError::NotFound(id))?;
        mutate(environment)?;
        Ok(environment.clone())
    }

    async fn list_running(&self) -> EnvironmentResult<Vec<Environment>> {
        Ok(Vec::new())
    }

    async fn list_expired(&self, _now: DateTime<Utc>) -> EnvironmentResult<Vec<Environment>> {
        Ok(Vec::new())
    }
}

#[derive(Default)]
pub struct InMemoryInstances {
    pub rows: Mutex<Vec<ServiceInstance>>,
}

#[async_trait]
impl ServiceInstanceRepository for InMemoryInstances {
    async fn create(&self, instance: ServiceInstance) -> ServiceInstanceResult<ServiceInstance> {
        self.rows.lock().unwrap().push(instance.clone());
        Ok(instance)
    }

    async fn get_by_id(&self, id: Uuid) -> ServiceInstanceResult<Option<ServiceInstance>> {
        Ok(self.rows.lock().unwrap().iter().find(|i| i.id == id).cloned())
    }

    async fn list_for_environment(&self, environment_id: Uuid) -> ServiceInstanceResult<Vec<ServiceInstance>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.environment_id == environment_id)
            .cloned()
            .collect())
    }

    async fn update(&self, instance: ServiceInstance) -> ServiceInstanceResult<ServiceInstance> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(existing) = rows.iter_mut().find(|i| i.id == instance.id) {
            *existing = instance.clone();
        }
        Ok(instance)
    }

    async fn list_active(&self) -> ServiceInstanceResult<Vec<ServiceInstance>> {
        Ok(self.rows.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub struct MemoryObjectStore {
    namespaces: Mutex<HashMap<String, HashMap<String, Vec<u8>>>>,
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn create_namespace(&self, namespace: &str) -> ObjectStoreResult<()> {
        self.namespaces.lock().unwrap().entry(namespace.to_string()).or_default();
        Ok(())
    }

    async fn delete_namespace(&self, namespace: &str) -> ObjectStoreResult<()> {
        self.namespaces.lock().unwrap().remove(namespace);
        Ok(())
    }

    async fn namespace_exists(&self, namespace: &str) -> ObjectStoreResult<bool> {
        Ok(self.namespaces.lock().unwrap().contains_key(namespace))
    }

    async fn put_object(&self, namespace: &str, key: &str, body: Vec<u8>) -> ObjectStoreResult<()> {
        self.namespaces
            .lock()
            .unwrap()
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), body);
        Ok(())
    }

    async fn get_object(&self, namespace: &str, key: &str) -> ObjectStoreResult<Vec<u8>> {
        self.namespaces
            .lock()
            .unwrap()
            .get(namespace)
            .and_then(|objects| objects.get(key))
            .cloned()
            .ok_or_else(|| ObjectStoreError::ObjectNotFound(namespace.to_string(), key.to_string()))
    }

    async fn list_objects(&self, namespace: &str, prefix: &str) -> ObjectStoreResult<Vec<ObjectMeta>> {
        Ok(self
            .namespaces
            .lock()
            .unwrap()
            .get(namespace)
            .map(|objects| {
                objects
                    .iter()
                    .filter(|(key, _)| key.starts_with(prefix))
                    .map(|(key, body)| ObjectMeta {
                        key: key.clone(),
                        size: body.len() as i64,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete_object(&self, namespace: &str, key: &str) -> ObjectStoreResult<()> {
        if let Some(objects) = self.namespaces.lock().unwrap().get_mut(namespace) {
            objects.remove(key);
        }
        Ok(())
    }
}

/// Runtime whose exec returns a canned stdout, for Lambda invoke tests.
pub struct ScriptedRuntime {
    pub stdout: String,
    pub exec_delay: std::time::Duration,
}

impl Default for ScriptedRuntime {
    fn default() -> Self {
        Self {
            stdout: "{\"ok\":true}".to_string(),
            exec_delay: std::time::Duration::ZERO,
        }
    }
}

#[async_trait]
impl ContainerRuntime for ScriptedRuntime {
    async fn create(&self, spec: &ContainerSpec) -> container_runtime::RuntimeResult<String> {
        Ok(format!("container-{}", spec.name))
    }

    async fn start(&self, _id: &str) -> container_runtime::RuntimeResult<()> {
        Ok(())
    }

    async fn stop(&self, _id: &str, _grace: std::time::Duration) -> container_runtime::RuntimeResult<()> {
        Ok(())
    }

    async fn remove(&self, _id: &str, _force: bool) -> container_runtime::RuntimeResult<()> {
        Ok(())
    }

    async fn inspect(&self, _id: &str) -> container_runtime::RuntimeResult<ContainerInspection> {
        Ok(ContainerInspection {
            state: ContainerState::Running,
            started_at: None,
            exit_code: None,
        })
    }

    async fn exec(&self, _id: &str, _argv: &[String]) -> container_runtime::RuntimeResult<ExecOutput> {
        if !self.exec_delay.is_zero() {
            tokio::time::sleep(self.exec_delay).await;
        }
        Ok(ExecOutput {
            stdout: self.stdout.clone(),
            stderr: String::new(),
            exit_code: 0,
        })
    }
}

#[derive(Default)]
pub struct InMemoryDnsRecords {
    pub rows: Mutex<Vec<DnsRecord>>,
}

#[async_trait]
impl DnsRecordRepository for InMemoryDnsRecords {
    async fn create(&self, record: DnsRecord) -> DnsResult<DnsRecord> {
        self.rows.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn get_by_id(&self, id: Uuid) -> DnsResult<Option<DnsRecord>> {
        Ok(self.rows.lock().unwrap().iter().find(|r| r.id == id).cloned())
    }

    async fn list_for_environment(&self, environment_id: Uuid, filter: DnsRecordFilter) -> DnsResult<Vec<DnsRecord>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.environment_id == environment_id)
            .filter(|r| filter.record_type.is_none_or(|t| t == r.record_type))
            .cloned()
            .collect())
    }

    async fn delete(&self, id: Uuid) -> DnsResult<()> {
        self.rows.lock().unwrap().retain(|r| r.id != id);
        Ok(())
    }

    async fn delete_for_environment(&self, environment_id: Uuid) -> DnsResult<()> {
        self.rows.lock().unwrap().retain(|r| r.environment_id != environment_id);
        Ok(())
    }

    async fn find_oldest_match(&self, name: &str, record_type: RecordType) -> DnsResult<Option<DnsRecord>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.name == name && r.record_type == record_type)
            .min_by_key(|r| r.created_at)
            .cloned())
    }
}

pub struct TestHarness {
    pub state: EmulationState,
    pub owner: Uuid,
    pub environment_id: Uuid,
    pub resources: Arc<InMemoryResources>,
    pub environments: Arc<InMemoryEnvironments>,
    pub instances: Arc<InMemoryInstances>,
    pub object_store: Arc<MemoryObjectStore>,
    pub dns: Arc<InMemoryDnsRecords>,
}

/// State wired entirely to in-memory fakes, with one RUNNING environment
/// owned by `owner` that declares an `aws-s3` service.
pub async fn harness() -> TestHarness {
    harness_with_runtime(Arc::new(ScriptedRuntime::default())).await
}

pub async fn harness_with_runtime(runtime: Arc<dyn ContainerRuntime>) -> TestHarness {
    let owner = Uuid::now_v7();
    let environments = Arc::new(InMemoryEnvironments::default());
    let mut environment = Environment::new(
        owner,
        &CreateEnvironment {
            name: "emulation-test".to_string(),
            services: vec![],
            auto_shutdown_hours: None,
            auto_delete_hours: None,
        },
    );
    environment.mark_running();
    let environment_id = environment.id;
    environments.rows.lock().unwrap().push(environment);

    let instances = Arc::new(InMemoryInstances::default());
    let namespace = domain_service_instances::namespace_for(environment_id, ServiceKind::AwsS3);
    let mut instance = ServiceInstance::new(environment_id, ServiceKind::AwsS3);
    instance.object_store_namespace = Some(namespace.clone());
    instance.mark_running();
    instances.rows.lock().unwrap().push(instance);

    let object_store = Arc::new(MemoryObjectStore::default());
    object_store.create_namespace(&namespace).await.unwrap();

    let resources = Arc::new(InMemoryResources::default());
    let dns = Arc::new(InMemoryDnsRecords::default());

    let state = EmulationState::new(
        resources.clone(),
        environments.clone(),
        instances.clone(),
        object_store.clone(),
        runtime,
        dns.clone(),
        EmulationConfig {
            base_domain: "mockfactory.test".to_string(),
            lambda_concurrency: 2,
        },
    );

    TestHarness {
        state,
        owner,
        environment_id,
        resources,
        environments,
        instances,
        object_store,
        dns,
    }
}
