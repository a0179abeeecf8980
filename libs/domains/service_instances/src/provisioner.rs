use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use container_runtime::{ContainerRuntime, ContainerSpec};
use domain_environments::{EffectError, EffectResult, ProvisionOutcome, ServiceProvisioner};
use domain_ports::PortAllocator;
use object_store_adapter::ObjectStore;
use rand::Rng;
use uuid::Uuid;

use crate::{
    error::{ServiceInstanceError, ServiceInstanceResult},
    models::{
        container_name_for, namespace_for, Credentials, ReadinessProbe, ServiceBackend, ServiceCapability,
        ServiceInstance, ServiceInstanceStatus, ServiceKind,
    },
    repository::ServiceInstanceRepository,
};

impl From<ServiceInstanceError> for EffectError {
    fn from(e: ServiceInstanceError) -> Self {
        match e {
            ServiceInstanceError::ProvisioningFailure(msg) => EffectError::ProvisioningFailure(msg),
            ServiceInstanceError::PortsExhausted => EffectError::ProvisioningFailure("ports exhausted".into()),
            ServiceInstanceError::NotFound(id) => EffectError::Internal(format!("service instance {id} not found")),
            ServiceInstanceError::Internal(msg) => EffectError::Internal(msg),
        }
    }
}

impl From<container_runtime::RuntimeError> for EffectError {
    fn from(e: container_runtime::RuntimeError) -> Self {
        EffectError::ProvisioningFailure(e.to_string())
    }
}

/// Service Provisioner: the container-backed and managed-backed
/// provisioning flows, seen by the Lifecycle Manager through the
/// `ServiceProvisioner` port it defines. Every flow records intent in the
/// `service_instances` row before the external effect, so a crash
/// mid-provision leaves a reconcilable record rather than an orphaned
/// container.
pub struct ServiceInstanceProvisioner<R, PR, CR, OS>
where
    R: ServiceInstanceRepository,
    PR: domain_ports::PortRepository,
    CR: ContainerRuntime,
    OS: ObjectStore,
{
    repository: R,
    ports: PortAllocator<PR>,
    runtime: CR,
    object_store: OS,
    base_domain: String,
    readiness_timeout: Duration,
    provisioning_deadline: Duration,
}

impl<R, PR, CR, OS> ServiceInstanceProvisioner<R, PR, CR, OS>
where
    R: ServiceInstanceRepository,
    PR: domain_ports::PortRepository,
    CR: ContainerRuntime,
    OS: ObjectStore,
{
    pub fn new(
        repository: R,
        ports: PortAllocator<PR>,
        runtime: CR,
        object_store: OS,
        base_domain: String,
        readiness_timeout: Duration,
        provisioning_deadline: Duration,
    ) -> Self {
        Self {
            repository,
            ports,
            runtime,
            object_store,
            base_domain,
            readiness_timeout,
            provisioning_deadline,
        }
    }

    async fn wait_ready(&self, host_port: u16, probe: ReadinessProbe) -> ServiceInstanceResult<()> {
        if matches!(probe, ReadinessProbe::None) {
            return Ok(());
        }

        let deadline = tokio::time::Instant::now() + self.readiness_timeout;
        let mut delay = Duration::from_millis(250);

        loop {
            if tokio::net::TcpStream::connect(("127.0.0.1", host_port)).await.is_ok() {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(ServiceInstanceError::ProvisioningFailure(format!(
                    "readiness probe on port {host_port} timed out"
                )));
            }
            tokio::time::sleep(delay).await;
            delay += Duration::from_millis(250); // linear backoff
        }
    }

    fn generate_password(&self) -> String {
        rand::rng()
            .sample_iter(&rand::distr::Alphanumeric)
            .take(24)
            .map(char::from)
            .collect()
    }

    async fn provision_container(
        &self,
        instance: &mut ServiceInstance,
        kind: ServiceKind,
        capability: &ServiceCapability,
    ) -> ServiceInstanceResult<()> {
        let allocation = self.ports.allocate(instance.id).await?;

        // redis takes a password but no user; elasticmq is unauthenticated
        let (username, password) = match kind {
            ServiceKind::Redis => (None, Some(self.generate_password())),
            ServiceKind::Elasticmq => (None, None),
            ServiceKind::Mysql => (Some("root"), Some(self.generate_password())),
            _ => (Some("mockfactory"), Some(self.generate_password())),
        };

        let (env, command) = kind.container_materials(
            username.unwrap_or("mockfactory"),
            password.as_deref().unwrap_or_default(),
        );

        let mut labels = HashMap::new();
        labels.insert("environment".to_string(), instance.environment_id.to_string());
        labels.insert("service-kind".to_string(), kind.to_string());

        let container_port = capability
            .container_port
            .expect("container-backed capability always declares a port");

        let spec = ContainerSpec {
            name: container_name_for(instance.id),
            image: capability
                .image
                .expect("container-backed capability always declares an image")
                .to_string(),
            env,
            command,
            exposed_port: container_port,
            host_port: allocation.port,
            labels,
        };

        let container_id = self.runtime.create(&spec).await?;

        let credentials = Credentials {
            scheme: capability.scheme.map(Into::into),
            host: "127.0.0.1".to_string(),
            port: Some(allocation.port),
            username: username.map(Into::into),
            password,
            namespace: None,
            endpoint_url: None,
        };

        instance.container_id = Some(container_id.clone());
        instance.credentials =
            serde_json::to_value(&credentials).map_err(|e| ServiceInstanceError::Internal(e.to_string()))?;
        *instance = self.repository.update(instance.clone()).await?;

        self.runtime.start(&container_id).await?;
        self.wait_ready(allocation.port, capability.readiness_probe).await
    }

    async fn provision_namespace(
        &self,
        instance: &mut ServiceInstance,
        kind: ServiceKind,
        capability: &ServiceCapability,
    ) -> ServiceInstanceResult<()> {
        let namespace = namespace_for(instance.environment_id, kind);

        instance.object_store_namespace = Some(namespace.clone());
        *instance = self.repository.update(instance.clone()).await?;

        self.object_store.create_namespace(&namespace).await?;

        let credentials = Credentials {
            scheme: capability.scheme.map(Into::into),
            host: format!("{kind}.{}.{}", instance.environment_id, self.base_domain),
            port: None,
            username: None,
            password: None,
            namespace: Some(namespace),
            endpoint_url: Some(format!("https://{kind}.{}.{}", instance.environment_id, self.base_domain)),
        };
        instance.credentials =
            serde_json::to_value(&credentials).map_err(|e| ServiceInstanceError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn provision_one(
        &self,
        environment_id: Uuid,
        kind: ServiceKind,
    ) -> ServiceInstanceResult<ServiceInstance> {
        // Intent first: the row exists in PROVISIONING before any external
        // effect.
        let mut instance = self.repository.create(ServiceInstance::new(environment_id, kind)).await?;
        let capability = kind.capability();

        let outcome = match capability.backend {
            ServiceBackend::Container => self.provision_container(&mut instance, kind, &capability).await,
            ServiceBackend::ObjectStore => self.provision_namespace(&mut instance, kind, &capability).await,
            ServiceBackend::Synthesized => Ok(()),
        };

        match outcome {
            Ok(()) => {
                instance.mark_running();
                self.repository.update(instance).await
            }
            Err(e) => {
                // Tear down this instance's own partial artifacts before
                // surfacing the failure; rollback errors are logged and
                // suppressed.
                if let Err(rollback) = self.destroy_one(&instance).await {
                    tracing::warn!(
                        service_instance_id = %instance.id,
                        error = %rollback,
                        "rollback of partially provisioned service failed"
                    );
                }
                Err(e)
            }
        }
    }

    /// Looks up a ServiceInstance of a given kind for an environment. Used
    /// by the Cloud-API Emulation Router to resolve which object-store
    /// namespace backs a request.
    pub async fn find_for_environment(
        &self,
        environment_id: Uuid,
        kind: ServiceKind,
    ) -> ServiceInstanceResult<Option<ServiceInstance>> {
        let instances = self.repository.list_for_environment(environment_id).await?;
        Ok(instances.into_iter().find(|i| i.service_kind == kind))
    }

    async fn destroy_one(&self, instance: &ServiceInstance) -> ServiceInstanceResult<()> {
        if instance.status == ServiceInstanceStatus::Destroyed {
            return Ok(());
        }

        if let Some(container_id) = &instance.container_id {
            // Best-effort: a container that's already gone shouldn't block
            // teardown of the rest of the environment.
            let _ = self.runtime.stop(container_id, Duration::from_secs(10)).await;
            let _ = self.runtime.remove(container_id, true).await;
        }

        if let Some(namespace) = &instance.object_store_namespace {
            let _ = self.object_store.delete_namespace(namespace).await;
        }

        self.ports.release_for_service_instance(instance.id).await.ok();

        let mut updated = instance.clone();
        updated.mark_destroyed();
        self.repository.update(updated).await?;
        Ok(())
    }

    async fn provision_all(
        &self,
        environment_id: Uuid,
        requests: &[domain_environments::ServiceRequest],
    ) -> EffectResult<ProvisionOutcome> {
        let mut endpoints = serde_json::Map::new();
        let mut hourly_rate = 0.0;

        for request in requests {
            let kind = request.kind.parse::<ServiceKind>().map_err(|_| {
                EffectError::ProvisioningFailure(format!("unknown service kind: {}", request.kind))
            })?;

            let instance = self.provision_one(environment_id, kind).await?;
            endpoints.insert(kind.to_string(), instance.masked_credentials());
            hourly_rate += kind.capability().hourly_rate;
        }

        Ok(ProvisionOutcome {
            endpoints: serde_json::Value::Object(endpoints),
            hourly_rate,
        })
    }

    /// Tears down every non-destroyed ServiceInstance of the environment,
    /// newest first. Because every flow records its row before any
    /// external effect, this sweep also reaches a service whose
    /// provisioning future was cancelled mid-flight by the deadline.
    async fn rollback_environment(&self, environment_id: Uuid) {
        let instances = match self.repository.list_for_environment(environment_id).await {
            Ok(instances) => instances,
            Err(e) => {
                tracing::warn!(environment_id = %environment_id, error = %e, "rollback sweep could not list instances");
                return;
            }
        };

        for instance in instances.iter().rev() {
            if let Err(e) = self.destroy_one(instance).await {
                tracing::warn!(service_instance_id = %instance.id, error = %e, "rollback failed");
            }
        }
    }

    /// Port GC loop body: flips every active allocation whose
    /// ServiceInstance is destroyed, gone, or whose container no longer
    /// exists. Returns how many allocations were released.
    pub async fn reconcile_ports(&self) -> ServiceInstanceResult<usize> {
        let mut released = 0;

        for allocation in self.ports.list_active().await.map_err(ServiceInstanceError::from)? {
            let instance = self.repository.get_by_id(allocation.service_instance_id).await?;

            let orphaned = match &instance {
                None => true,
                Some(i) if i.status == ServiceInstanceStatus::Destroyed => true,
                Some(i) => match &i.container_id {
                    Some(container_id) => self.runtime.inspect(container_id).await.is_err(),
                    None => false,
                },
            };

            if orphaned {
                self.ports
                    .release_for_service_instance(allocation.service_instance_id)
                    .await
                    .ok();
                released += 1;
                tracing::info!(
                    port = allocation.port,
                    service_instance_id = %allocation.service_instance_id,
                    "port GC released orphaned allocation"
                );
            }
        }

        Ok(released)
    }
}

#[async_trait]
impl<R, PR, CR, OS> ServiceProvisioner for ServiceInstanceProvisioner<R, PR, CR, OS>
where
    R: ServiceInstanceRepository,
    PR: domain_ports::PortRepository,
    CR: ContainerRuntime,
    OS: ObjectStore,
{
    async fn provision(
        &self,
        environment_id: Uuid,
        requests: &[domain_environments::ServiceRequest],
    ) -> EffectResult<ProvisionOutcome> {
        let outcome = tokio::time::timeout(
            self.provisioning_deadline,
            self.provision_all(environment_id, requests),
        )
        .await;

        match outcome {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => {
                self.rollback_environment(environment_id).await;
                Err(e)
            }
            Err(_) => {
                self.rollback_environment(environment_id).await;
                Err(EffectError::ProvisioningFailure(format!(
                    "provisioning deadline of {}s exceeded",
                    self.provisioning_deadline.as_secs()
                )))
            }
        }
    }

    async fn stop(&self, environment_id: Uuid) -> EffectResult<()> {
        let instances = self.repository.list_for_environment(environment_id).await?;
        for mut instance in instances {
            if instance.status != ServiceInstanceStatus::Running {
                continue;
            }
            if let Some(container_id) = &instance.container_id {
                self.runtime.stop(container_id, Duration::from_secs(10)).await?;
            }
            instance.mark_stopped();
            self.repository.update(instance).await?;
        }
        Ok(())
    }

    async fn start(&self, environment_id: Uuid) -> EffectResult<()> {
        let instances = self.repository.list_for_environment(environment_id).await?;
        for mut instance in instances {
            if instance.status != ServiceInstanceStatus::Stopped {
                continue;
            }
            let capability = instance.service_kind.capability();
            if let Some(container_id) = instance.container_id.clone() {
                self.runtime.start(&container_id).await?;
                if let Some(port) = instance
                    .credentials
                    .get("port")
                    .and_then(|p| p.as_u64())
                    .map(|p| p as u16)
                {
                    self.wait_ready(port, capability.readiness_probe).await?;
                }
            }
            instance.mark_running();
            self.repository.update(instance).await?;
        }
        Ok(())
    }

    async fn destroy(&self, environment_id: Uuid) -> EffectResult<()> {
        let instances = self.repository.list_for_environment(environment_id).await?;
        for instance in instances.iter().rev() {
            self.destroy_one(instance).await?;
        }
        Ok(())
    }

    async fn endpoints(&self, environment_id: Uuid) -> EffectResult<serde_json::Value> {
        let instances = self.repository.list_for_environment(environment_id).await?;
        let mut endpoints = serde_json::Map::new();
        for instance in instances
            .iter()
            .filter(|i| i.status != ServiceInstanceStatus::Destroyed)
        {
            endpoints.insert(instance.service_kind.to_string(), instance.masked_credentials());
        }
        Ok(serde_json::Value::Object(endpoints))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_environments::ServiceRequest;
    use domain_ports::{PortAllocation, PortError, PortRepository, PortResult};
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryServiceInstances {
        rows: Mutex<Vec<ServiceInstance>>,
    }

    #[async_trait]
    impl ServiceInstanceRepository for InMemoryServiceInstances {
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
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|i| i.status != ServiceInstanceStatus::Destroyed)
                .cloned()
                .collect())
        }
    }

    struct FakePortRepository {
        next_port: u16,
        allocations: Mutex<Vec<PortAllocation>>,
    }

    impl FakePortRepository {
        fn starting_at(port: u16) -> Self {
            Self {
                next_port: port,
                allocations: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PortRepository for FakePortRepository {
        async fn allocate(&self, service_instance_id: Uuid) -> PortResult<PortAllocation> {
            let mut allocations = self.allocations.lock().unwrap();
            let port = self.next_port + allocations.len() as u16;
            let allocation = PortAllocation::new(service_instance_id, port);
            allocations.push(allocation.clone());
            Ok(allocation)
        }

        async fn get_by_id(&self, id: Uuid) -> PortResult<Option<PortAllocation>> {
            Ok(self.allocations.lock().unwrap().iter().find(|a| a.id == id).cloned())
        }

        async fn get_active_for_service_instance(
            &self,
            service_instance_id: Uuid,
        ) -> PortResult<Option<PortAllocation>> {
            Ok(self
                .allocations
                .lock()
                .unwrap()
                .iter()
                .find(|a| a.service_instance_id == service_instance_id && a.active)
                .cloned())
        }

        async fn release(&self, id: Uuid) -> PortResult<PortAllocation> {
            let mut allocations = self.allocations.lock().unwrap();
            let allocation = allocations.iter_mut().find(|a| a.id == id).ok_or(PortError::NotFound(id))?;
            allocation.release();
            Ok(allocation.clone())
        }

        async fn release_for_service_instance(&self, service_instance_id: Uuid) -> PortResult<()> {
            let mut allocations = self.allocations.lock().unwrap();
            for allocation in allocations.iter_mut().filter(|a| a.service_instance_id == service_instance_id) {
                allocation.release();
            }
            Ok(())
        }

        async fn list_active(&self) -> PortResult<Vec<PortAllocation>> {
            Ok(self.allocations.lock().unwrap().iter().filter(|a| a.active).cloned().collect())
        }
    }

    /// Runtime whose containers always "exist"; `inspect` can be told to
    /// fail to simulate a vanished container.
    struct StubRuntime {
        inspect_fails: bool,
    }

    #[async_trait]
    impl ContainerRuntime for StubRuntime {
        async fn create(&self, _spec: &ContainerSpec) -> container_runtime::RuntimeResult<String> {
            Ok("container-fake".to_string())
        }
        async fn start(&self, _id: &str) -> container_runtime::RuntimeResult<()> {
            Ok(())
        }
        async fn stop(&self, _id: &str, _grace: Duration) -> container_runtime::RuntimeResult<()> {
            Ok(())
        }
        async fn remove(&self, _id: &str, _force: bool) -> container_runtime::RuntimeResult<()> {
            Ok(())
        }
        async fn inspect(&self, _id: &str) -> container_runtime::RuntimeResult<container_runtime::ContainerInspection> {
            if self.inspect_fails {
                return Err(container_runtime::RuntimeError::InspectFailed("no such container".into()));
            }
            Ok(container_runtime::ContainerInspection {
                state: container_runtime::ContainerState::Running,
                started_at: None,
                exit_code: None,
            })
        }
        async fn exec(&self, _id: &str, _argv: &[String]) -> container_runtime::RuntimeResult<container_runtime::ExecOutput> {
            Ok(container_runtime::ExecOutput { stdout: String::new(), stderr: String::new(), exit_code: 0 })
        }
    }

    struct NoopObjectStore;

    #[async_trait]
    impl ObjectStore for NoopObjectStore {
        async fn create_namespace(&self, _namespace: &str) -> object_store_adapter::ObjectStoreResult<()> {
            Ok(())
        }
        async fn delete_namespace(&self, _namespace: &str) -> object_store_adapter::ObjectStoreResult<()> {
            Ok(())
        }
        async fn namespace_exists(&self, _namespace: &str) -> object_store_adapter::ObjectStoreResult<bool> {
            Ok(true)
        }
        async fn put_object(&self, _namespace: &str, _key: &str, _body: Vec<u8>) -> object_store_adapter::ObjectStoreResult<()> {
            Ok(())
        }
        async fn get_object(&self, _namespace: &str, _key: &str) -> object_store_adapter::ObjectStoreResult<Vec<u8>> {
            Ok(Vec::new())
        }
        async fn list_objects(&self, _namespace: &str, _prefix: &str) -> object_store_adapter::ObjectStoreResult<Vec<object_store_adapter::ObjectMeta>> {
            Ok(Vec::new())
        }
        async fn delete_object(&self, _namespace: &str, _key: &str) -> object_store_adapter::ObjectStoreResult<()> {
            Ok(())
        }
    }

    type TestProvisioner =
        ServiceInstanceProvisioner<InMemoryServiceInstances, FakePortRepository, StubRuntime, NoopObjectStore>;

    fn build(first_port: u16, inspect_fails: bool) -> TestProvisioner {
        ServiceInstanceProvisioner::new(
            InMemoryServiceInstances::default(),
            PortAllocator::new(FakePortRepository::starting_at(first_port)),
            StubRuntime { inspect_fails },
            NoopObjectStore,
            "mockfactory.test".to_string(),
            Duration::from_millis(100),
            Duration::from_secs(5),
        )
    }

    fn request(kind: &str) -> ServiceRequest {
        ServiceRequest {
            kind: kind.into(),
            version: None,
            config: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn managed_backed_service_skips_readiness_and_ports() {
        let provisioner = build(30000, false);
        let environment_id = Uuid::now_v7();

        let outcome = provisioner
            .provision(environment_id, &[request("aws-s3")])
            .await
            .unwrap();

        assert_eq!(outcome.hourly_rate, 0.005);
        assert!(outcome.endpoints.get("aws-s3").is_some());
    }

    #[tokio::test]
    async fn unknown_kind_fails_provisioning() {
        let provisioner = build(30000, false);
        let environment_id = Uuid::now_v7();

        let result = provisioner
            .provision(environment_id, &[request("not-a-real-service")])
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn masked_credentials_never_contain_the_password() {
        // a live listener stands in for the container's service port so the
        // readiness probe succeeds
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let provisioner = build(port, false);
        let environment_id = Uuid::now_v7();

        let outcome = provisioner
            .provision(environment_id, &[request("redis")])
            .await
            .unwrap();

        let endpoint = outcome.endpoints.get("redis").unwrap();
        assert_eq!(endpoint.get("password").unwrap(), crate::models::MASK);
        let url = endpoint.get("url").unwrap().as_str().unwrap();
        assert_eq!(url, format!("redis://:*****@127.0.0.1:{port}"));

        // the stored row keeps the real credential
        let stored = &provisioner.repository.rows.lock().unwrap()[0];
        let stored_password = stored.credentials.get("password").unwrap().as_str().unwrap();
        assert_ne!(stored_password, crate::models::MASK);
        assert!(!url.contains(stored_password));
    }

    #[tokio::test]
    async fn readiness_timeout_rolls_back_the_failed_service_and_earlier_ones() {
        // port 1 on localhost: reserved, nothing listens, so the probe
        // times out and redis provisioning fails after aws-s3 succeeded
        let provisioner = build(1, false);
        let environment_id = Uuid::now_v7();

        let result = provisioner
            .provision(environment_id, &[request("aws-s3"), request("redis")])
            .await;
        assert!(result.is_err());

        let rows = provisioner.repository.rows.lock().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|i| i.status == ServiceInstanceStatus::Destroyed));
        drop(rows);

        let active = provisioner.ports.list_active().await.unwrap();
        assert!(active.is_empty());
    }

    #[tokio::test]
    async fn deadline_expiry_rolls_back_and_reports_provisioning_failure() {
        // readiness would wait 10s per probe, but the overall deadline is
        // 100ms, so the environment-level timeout fires first
        let provisioner = ServiceInstanceProvisioner::new(
            InMemoryServiceInstances::default(),
            PortAllocator::new(FakePortRepository::starting_at(1)),
            StubRuntime { inspect_fails: false },
            NoopObjectStore,
            "mockfactory.test".to_string(),
            Duration::from_secs(10),
            Duration::from_millis(100),
        );
        let environment_id = Uuid::now_v7();

        let result = provisioner.provision(environment_id, &[request("redis")]).await;

        let error = result.unwrap_err();
        assert!(error.to_string().contains("deadline"));
        assert!(provisioner.ports.list_active().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn endpoints_reports_only_live_instances_masked() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let provisioner = build(port, false);
        let environment_id = Uuid::now_v7();
        provisioner
            .provision(environment_id, &[request("redis"), request("aws-s3")])
            .await
            .unwrap();

        let endpoints = provisioner.endpoints(environment_id).await.unwrap();
        assert!(endpoints.get("redis").is_some());
        assert!(endpoints.get("aws-s3").is_some());
        assert_eq!(endpoints["redis"]["password"], crate::models::MASK);

        provisioner.destroy(environment_id).await.unwrap();
        let endpoints = provisioner.endpoints(environment_id).await.unwrap();
        assert!(endpoints.as_object().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stop_then_start_reuses_container_and_port() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let provisioner = build(port, false);
        let environment_id = Uuid::now_v7();

        provisioner.provision(environment_id, &[request("redis")]).await.unwrap();
        let before = provisioner.repository.rows.lock().unwrap()[0].clone();

        provisioner.stop(environment_id).await.unwrap();
        provisioner.start(environment_id).await.unwrap();

        let after = provisioner.repository.rows.lock().unwrap()[0].clone();
        assert_eq!(after.status, ServiceInstanceStatus::Running);
        assert_eq!(after.container_id, before.container_id);
        assert_eq!(after.credentials, before.credentials);
    }

    #[tokio::test]
    async fn port_gc_releases_allocations_for_vanished_containers() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let provisioner = build(port, false);
        let environment_id = Uuid::now_v7();
        provisioner.provision(environment_id, &[request("redis")]).await.unwrap();

        // containers all report healthy: nothing to release
        assert_eq!(provisioner.reconcile_ports().await.unwrap(), 0);

        // swap in a runtime whose inspect reports the container gone
        let provisioner = ServiceInstanceProvisioner {
            runtime: StubRuntime { inspect_fails: true },
            ..provisioner
        };
        assert_eq!(provisioner.reconcile_ports().await.unwrap(), 1);
        assert!(provisioner.ports.list_active().await.unwrap().is_empty());
    }
}
