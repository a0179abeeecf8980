use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    effects::{CreationGate, EffectError, ResourceCleanup, ServiceProvisioner, UsageAccrual},
    error::{EnvironmentError, EnvironmentResult},
    models::{
        validate_hostname, CreateEnvironment, Environment, EnvironmentDetails, EnvironmentFilter, EnvironmentStatus,
        ProvisionedEnvironment,
    },
    repository::EnvironmentRepository,
};

/// Environment Lifecycle Manager. Writes nothing outside its own
/// `environments` row directly; every external mutation goes through the
/// injected ports, and every transition that touches them records intent
/// (the transitional status) before attempting the effect.
pub struct EnvironmentService<R, P, U>
where
    R: EnvironmentRepository,
    P: ServiceProvisioner,
    U: UsageAccrual,
{
    repository: R,
    provisioner: P,
    usage: U,
    cleanups: Vec<Arc<dyn ResourceCleanup>>,
    gate: Option<Arc<dyn CreationGate>>,
}

impl<R, P, U> EnvironmentService<R, P, U>
where
    R: EnvironmentRepository,
    P: ServiceProvisioner,
    U: UsageAccrual,
{
    pub fn new(repository: R, provisioner: P, usage: U, cleanups: Vec<Arc<dyn ResourceCleanup>>) -> Self {
        Self {
            repository,
            provisioner,
            usage,
            cleanups,
            gate: None,
        }
    }

    /// Installs the tier-quota/account-standing check consulted before
    /// every creation.
    pub fn with_creation_gate(mut self, gate: Arc<dyn CreationGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Creates the row, immediately provisions every declared service, and
    /// returns the masked endpoint map. Partial success is not reachable
    /// by a caller: failure leaves the environment in ERROR and returns
    /// ProvisioningFailure.
    pub async fn create(
        &self,
        owner_id: Uuid,
        input: CreateEnvironment,
    ) -> EnvironmentResult<ProvisionedEnvironment> {
        input
            .validate()
            .map_err(|e| EnvironmentError::InvalidRequest(e.to_string()))?;

        if let Some(gate) = &self.gate {
            gate.authorize_creation(owner_id).await.map_err(|e| match e {
                EffectError::Forbidden(msg) => EnvironmentError::Forbidden(msg),
                EffectError::QuotaExceeded(msg) => EnvironmentError::TooManyRequests(msg),
                other => EnvironmentError::Internal(other.to_string()),
            })?;
        }

        let environment = Environment::new(owner_id, &input);
        let environment = self.repository.create(environment).await?;

        self.repository
            .transition(
                environment.id,
                Box::new(|env| {
                    env.begin_provisioning();
                    Ok(())
                }),
            )
            .await?;

        match self.provisioner.provision(environment.id, &input.services).await {
            Ok(outcome) => {
                let hourly_rate = outcome.hourly_rate;
                self.repository
                    .transition(
                        environment.id,
                        Box::new(move |env| {
                            env.set_hourly_rate(hourly_rate);
                            env.mark_running();
                            Ok(())
                        }),
                    )
                    .await?;

                self.usage
                    .open_interval(environment.id, outcome.hourly_rate)
                    .await
                    .map_err(|e| EnvironmentError::Internal(e.to_string()))?;

                Ok(ProvisionedEnvironment {
                    id: environment.id,
                    state: EnvironmentStatus::Running,
                    endpoints: outcome.endpoints,
                    hourly_rate: outcome.hourly_rate,
                })
            }
            Err(e) => {
                let message = e.to_string();
                self.repository
                    .transition(
                        environment.id,
                        Box::new(move |env| {
                            env.mark_error(message);
                            Ok(())
                        }),
                    )
                    .await?;
                Err(EnvironmentError::ProvisioningFailure(e.to_string()))
            }
        }
    }

    pub async fn get(&self, caller: Uuid, id: Uuid) -> EnvironmentResult<Environment> {
        let environment = self
            .repository
            .get_by_id(id)
            .await?
            .ok_or(EnvironmentError::NotFound(id))?;

        // Another user's environment reads as absent, not as forbidden,
        // so ids cannot be probed for existence.
        if !environment.is_owned_by(caller) {
            return Err(EnvironmentError::NotFound(id));
        }

        Ok(environment)
    }

    pub async fn list(&self, caller: Uuid, filter: EnvironmentFilter) -> EnvironmentResult<Vec<Environment>> {
        self.repository.list_owned_by(caller, filter).await
    }

    /// Full record: the row plus the masked endpoint map of its live
    /// ServiceInstances.
    pub async fn describe(&self, caller: Uuid, id: Uuid) -> EnvironmentResult<EnvironmentDetails> {
        let environment = self.get(caller, id).await?;
        let endpoints = self
            .provisioner
            .endpoints(id)
            .await
            .map_err(|e| EnvironmentError::Internal(e.to_string()))?;
        Ok(EnvironmentDetails { environment, endpoints })
    }

    /// Sets the globally unique custom hostname. A hostname already held by
    /// a different environment is a Conflict.
    pub async fn set_hostname(&self, caller: Uuid, id: Uuid, hostname: String) -> EnvironmentResult<Environment> {
        self.get(caller, id).await?;
        validate_hostname(&hostname).map_err(EnvironmentError::InvalidRequest)?;

        if let Some(existing) = self.repository.find_by_hostname(&hostname).await? {
            if existing.id != id {
                return Err(EnvironmentError::Conflict(format!(
                    "hostname {hostname} is already in use"
                )));
            }
        }

        self.repository
            .transition(
                id,
                Box::new(move |env| {
                    env.set_hostname(hostname);
                    Ok(())
                }),
            )
            .await
    }

    pub async fn stop(&self, caller: Uuid, id: Uuid) -> EnvironmentResult<Environment> {
        let current = self.get(caller, id).await?;
        if current.status != EnvironmentStatus::Running {
            return Err(EnvironmentError::Conflict(format!(
                "cannot stop environment in state {:?}",
                current.status
            )));
        }

        self.provisioner
            .stop(id)
            .await
            .map_err(|e| EnvironmentError::ProvisioningFailure(e.to_string()))?;

        let cost = self
            .usage
            .close_interval(id)
            .await
            .map_err(|e| EnvironmentError::Internal(e.to_string()))?;

        self.repository
            .transition(
                id,
                Box::new(move |env| {
                    if let Some(cost) = cost {
                        env.accrue(cost);
                    }
                    env.mark_stopped();
                    Ok(())
                }),
            )
            .await
    }

    pub async fn start(&self, caller: Uuid, id: Uuid) -> EnvironmentResult<Environment> {
        let current = self.get(caller, id).await?;
        if current.status != EnvironmentStatus::Stopped {
            return Err(EnvironmentError::Conflict(format!(
                "cannot start environment in state {:?}",
                current.status
            )));
        }

        self.repository
            .transition(
                id,
                Box::new(|env| {
                    env.begin_provisioning();
                    Ok(())
                }),
            )
            .await?;

        match self.provisioner.start(id).await {
            Ok(()) => {
                self.usage
                    .open_interval(id, current.hourly_rate)
                    .await
                    .map_err(|e| EnvironmentError::Internal(e.to_string()))?;

                self.repository
                    .transition(
                        id,
                        Box::new(|env| {
                            env.mark_running();
                            Ok(())
                        }),
                    )
                    .await
            }
            Err(e) => {
                let message = e.to_string();
                self.repository
                    .transition(
                        id,
                        Box::new(move |env| {
                            env.mark_error(message);
                            Ok(())
                        }),
                    )
                    .await?;
                Err(EnvironmentError::ProvisioningFailure(e.to_string()))
            }
        }
    }

    /// Idempotent: a second `destroy()` on an already-DESTROYED environment
    /// is a no-op success, matching concurrent-callers-serialize semantics.
    pub async fn destroy(&self, caller: Uuid, id: Uuid) -> EnvironmentResult<Environment> {
        let current = self.get(caller, id).await?;
        if current.status == EnvironmentStatus::Destroyed {
            return Ok(current);
        }
        if current.status == EnvironmentStatus::Destroying {
            return self.repository.get_by_id(id).await?.ok_or(EnvironmentError::NotFound(id));
        }

        let was_running = current.status == EnvironmentStatus::Running;

        self.repository
            .transition(
                id,
                Box::new(|env| {
                    env.begin_destroying();
                    Ok(())
                }),
            )
            .await?;

        // Close-interval errors are logged and suppressed; destruction must
        // not get stuck behind billing bookkeeping.
        let cost = if was_running {
            self.usage.close_interval(id).await.unwrap_or_else(|e| {
                tracing::warn!(environment_id = %id, error = %e, "failed to close usage interval during destroy");
                None
            })
        } else {
            None
        };

        self.provisioner
            .destroy(id)
            .await
            .map_err(|e| EnvironmentError::ProvisioningFailure(e.to_string()))?;

        for cleanup in &self.cleanups {
            if let Err(e) = cleanup.purge(id).await {
                tracing::warn!(environment_id = %id, error = %e, "resource cleanup failed during destroy");
            }
        }

        self.repository
            .transition(
                id,
                Box::new(move |env| {
                    if let Some(cost) = cost {
                        env.accrue(cost);
                    }
                    env.mark_destroyed();
                    Ok(())
                }),
            )
            .await
    }

    /// Adds an already-computed cost to the environment's running-cost
    /// accumulator. Used by the hourly reconciliation job for intervals it
    /// closes at the hour boundary.
    pub async fn accrue_cost(&self, id: Uuid, cost: f64) -> EnvironmentResult<Environment> {
        self.repository
            .transition(
                id,
                Box::new(move |env| {
                    env.accrue(cost);
                    Ok(())
                }),
            )
            .await
    }

    /// Auto-shutdown loop body: stops every RUNNING environment idle past
    /// its own `auto_shutdown_seconds`. Errors on one environment are
    /// logged and do not abort the sweep.
    pub async fn auto_shutdown_idle(&self) -> Vec<(Uuid, EnvironmentError)> {
        let mut failures = Vec::new();
        let running = match self.repository.list_running().await {
            Ok(envs) => envs,
            Err(e) => return vec![(Uuid::nil(), e)],
        };

        let now = Utc::now();
        for env in running.into_iter().filter(|env| env.is_idle_at(now)) {
            if let Err(e) = self.stop(env.owner_id, env.id).await {
                tracing::warn!(environment_id = %env.id, error = %e, "auto-shutdown failed");
                failures.push((env.id, e));
            } else {
                tracing::info!(environment_id = %env.id, "auto-shutdown stopped idle environment");
            }
        }

        failures
    }

    /// Expired-environment purge loop body: destroys every environment
    /// whose `auto_delete_at` has passed.
    pub async fn purge_expired(&self) -> Vec<(Uuid, EnvironmentError)> {
        let mut failures = Vec::new();
        let expired = match self.repository.list_expired(Utc::now()).await {
            Ok(envs) => envs,
            Err(e) => return vec![(Uuid::nil(), e)],
        };

        for env in expired {
            if let Err(e) = self.destroy(env.owner_id, env.id).await {
                tracing::warn!(environment_id = %env.id, error = %e, "expired-environment purge failed");
                failures.push((env.id, e));
            } else {
                tracing::info!(environment_id = %env.id, "purged expired environment");
            }
        }

        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{EffectError, EffectResult, ProvisionOutcome};
    use async_trait::async_trait;
    use chrono::{DateTime, Duration};
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryEnvironmentRepository {
        rows: Mutex<Vec<Environment>>,
    }

    #[async_trait]
    impl EnvironmentRepository for InMemoryEnvironmentRepository {
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

        async fn list_owned_by(
            &self,
            owner_id: Uuid,
            _filter: EnvironmentFilter,
        ) -> EnvironmentResult<Vec<Environment>> {
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
            mutate: Box<dyn for<'r> FnOnce(&'r mut Environment) -> EnvironmentResult<()> + Send>,
        ) -> EnvironmentResult<Environment> {
            let mut rows = self.rows.lock().unwrap();
            let env = rows.iter_mut().find(|e| e.id == id).ok_or(EnvironmentError::NotFound(id))?;
            mutate(env)?;
            Ok(env.clone())
        }

        async fn list_running(&self) -> EnvironmentResult<Vec<Environment>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.status == EnvironmentStatus::Running)
                .cloned()
                .collect())
        }

        async fn list_expired(&self, now: DateTime<Utc>) -> EnvironmentResult<Vec<Environment>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|e| {
                    e.auto_delete_at.is_some_and(|at| at <= now)
                        && e.status != EnvironmentStatus::Destroyed
                        && e.status != EnvironmentStatus::Destroying
                })
                .cloned()
                .collect())
        }
    }

    struct StubProvisioner {
        fail: bool,
    }

    #[async_trait]
    impl ServiceProvisioner for StubProvisioner {
        async fn provision(
            &self,
            _environment_id: Uuid,
            _requests: &[crate::models::ServiceRequest],
        ) -> EffectResult<ProvisionOutcome> {
            if self.fail {
                return Err(EffectError::ProvisioningFailure("image pull failed".into()));
            }
            Ok(ProvisionOutcome {
                endpoints: serde_json::json!({ "redis": { "host": "localhost", "port": 30001 } }),
                hourly_rate: 0.02,
            })
        }

        async fn stop(&self, _environment_id: Uuid) -> EffectResult<()> {
            Ok(())
        }

        async fn start(&self, _environment_id: Uuid) -> EffectResult<()> {
            Ok(())
        }

        async fn destroy(&self, _environment_id: Uuid) -> EffectResult<()> {
            Ok(())
        }

        async fn endpoints(&self, _environment_id: Uuid) -> EffectResult<serde_json::Value> {
            Ok(serde_json::json!({ "redis": { "password": "*****" } }))
        }
    }

    struct StubUsage;

    #[async_trait]
    impl UsageAccrual for StubUsage {
        async fn open_interval(&self, _environment_id: Uuid, _hourly_rate: f64) -> EffectResult<()> {
            Ok(())
        }

        async fn close_interval(&self, _environment_id: Uuid) -> EffectResult<Option<f64>> {
            Ok(Some(0.01))
        }
    }

    #[derive(Default)]
    struct RecordingCleanup {
        purged: Mutex<Vec<Uuid>>,
    }

    #[async_trait]
    impl ResourceCleanup for RecordingCleanup {
        async fn purge(&self, environment_id: Uuid) -> EffectResult<()> {
            self.purged.lock().unwrap().push(environment_id);
            Ok(())
        }
    }

    fn build(fail: bool) -> (
        EnvironmentService<InMemoryEnvironmentRepository, StubProvisioner, StubUsage>,
        Arc<RecordingCleanup>,
    ) {
        let cleanup = Arc::new(RecordingCleanup::default());
        let service = EnvironmentService::new(
            InMemoryEnvironmentRepository::default(),
            StubProvisioner { fail },
            StubUsage,
            vec![cleanup.clone()],
        );
        (service, cleanup)
    }

    fn create_input() -> CreateEnvironment {
        CreateEnvironment {
            name: "scratch".into(),
            services: vec![crate::models::ServiceRequest {
                kind: "redis".into(),
                version: None,
                config: serde_json::Value::Null,
            }],
            auto_shutdown_hours: None,
            auto_delete_hours: None,
        }
    }

    #[tokio::test]
    async fn create_succeeds_and_reaches_running() {
        let (service, _) = build(false);
        let owner = Uuid::now_v7();

        let provisioned = service.create(owner, create_input()).await.unwrap();

        assert_eq!(provisioned.state, EnvironmentStatus::Running);
        assert_eq!(provisioned.hourly_rate, 0.02);

        let env = service.get(owner, provisioned.id).await.unwrap();
        assert_eq!(env.status, EnvironmentStatus::Running);
        assert_eq!(env.hourly_rate, 0.02);
        assert!(env.last_activity_at.is_some());
        assert!(env.started_at.is_some());
    }

    #[tokio::test]
    async fn create_failure_leaves_environment_in_error() {
        let (service, _) = build(true);
        let owner = Uuid::now_v7();

        let result = service.create(owner, create_input()).await;
        assert!(matches!(result, Err(EnvironmentError::ProvisioningFailure(_))));
    }

    #[tokio::test]
    async fn other_owner_sees_not_found() {
        let (service, _) = build(false);
        let owner = Uuid::now_v7();
        let stranger = Uuid::now_v7();

        let provisioned = service.create(owner, create_input()).await.unwrap();
        let result = service.get(stranger, provisioned.id).await;

        assert!(matches!(result, Err(EnvironmentError::NotFound(_))));
    }

    #[tokio::test]
    async fn destroy_is_idempotent_and_purges_resources() {
        let (service, cleanup) = build(false);
        let owner = Uuid::now_v7();

        let provisioned = service.create(owner, create_input()).await.unwrap();
        let first = service.destroy(owner, provisioned.id).await.unwrap();
        let second = service.destroy(owner, provisioned.id).await.unwrap();

        assert_eq!(first.status, EnvironmentStatus::Destroyed);
        assert_eq!(second.status, EnvironmentStatus::Destroyed);
        // the second call performed no further cleanup
        assert_eq!(cleanup.purged.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stop_accrues_cost_and_sets_stopped_at() {
        let (service, _) = build(false);
        let owner = Uuid::now_v7();

        let provisioned = service.create(owner, create_input()).await.unwrap();
        let stopped = service.stop(owner, provisioned.id).await.unwrap();

        assert_eq!(stopped.status, EnvironmentStatus::Stopped);
        assert!(stopped.stopped_at.is_some());
        assert!(stopped.accrued_cost > 0.0);

        let result = service.stop(owner, provisioned.id).await;
        assert!(matches!(result, Err(EnvironmentError::Conflict(_))));
    }

    #[tokio::test]
    async fn start_reopens_interval_at_original_rate() {
        let (service, _) = build(false);
        let owner = Uuid::now_v7();

        let provisioned = service.create(owner, create_input()).await.unwrap();
        service.stop(owner, provisioned.id).await.unwrap();
        let restarted = service.start(owner, provisioned.id).await.unwrap();

        assert_eq!(restarted.status, EnvironmentStatus::Running);
        assert_eq!(restarted.hourly_rate, 0.02);
    }

    #[tokio::test]
    async fn hostname_conflict_is_rejected() {
        let (service, _) = build(false);
        let owner = Uuid::now_v7();

        let first = service.create(owner, create_input()).await.unwrap();
        let second = service.create(owner, create_input()).await.unwrap();

        service
            .set_hostname(owner, first.id, "shared.mockfactory.dev".into())
            .await
            .unwrap();
        let result = service
            .set_hostname(owner, second.id, "shared.mockfactory.dev".into())
            .await;

        assert!(matches!(result, Err(EnvironmentError::Conflict(_))));
    }

    #[tokio::test]
    async fn invalid_hostname_is_rejected() {
        let (service, _) = build(false);
        let owner = Uuid::now_v7();
        let provisioned = service.create(owner, create_input()).await.unwrap();

        let result = service.set_hostname(owner, provisioned.id, "Not_Valid!".into()).await;
        assert!(matches!(result, Err(EnvironmentError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn purge_expired_destroys_due_environments() {
        let (service, _) = build(false);
        let owner = Uuid::now_v7();

        let mut input = create_input();
        input.auto_delete_hours = Some(0.0);
        let provisioned = service.create(owner, input).await.unwrap();

        let failures = service.purge_expired().await;
        assert!(failures.is_empty());

        let env = service.get(owner, provisioned.id).await.unwrap();
        assert_eq!(env.status, EnvironmentStatus::Destroyed);
    }

    struct ClosedGate;

    #[async_trait]
    impl CreationGate for ClosedGate {
        async fn authorize_creation(&self, _owner_id: Uuid) -> EffectResult<()> {
            Err(EffectError::QuotaExceeded("tier allows 1 running environment".into()))
        }
    }

    #[tokio::test]
    async fn creation_gate_quota_surfaces_as_too_many_requests() {
        let (service, _) = build(false);
        let service = service.with_creation_gate(Arc::new(ClosedGate));
        let owner = Uuid::now_v7();

        let result = service.create(owner, create_input()).await;
        assert!(matches!(result, Err(EnvironmentError::TooManyRequests(_))));
    }

    #[tokio::test]
    async fn auto_shutdown_skips_recently_active_environments() {
        let (service, _) = build(false);
        let owner = Uuid::now_v7();

        let provisioned = service.create(owner, create_input()).await.unwrap();
        let failures = service.auto_shutdown_idle().await;
        assert!(failures.is_empty());

        // created moments ago with the 4 h default window, so still RUNNING
        let env = service.get(owner, provisioned.id).await.unwrap();
        assert_eq!(env.status, EnvironmentStatus::Running);

        // age the activity timestamp past the window and sweep again
        service
            .repository
            .transition(
                provisioned.id,
                Box::new(|env| {
                    env.last_activity_at = Some(Utc::now() - Duration::hours(5));
                    Ok(())
                }),
            )
            .await
            .unwrap();

        service.auto_shutdown_idle().await;
        let env = service.get(owner, provisioned.id).await.unwrap();
        assert_eq!(env.status, EnvironmentStatus::Stopped);
    }
}
