use async_trait::async_trait;
use chrono::Utc;
use domain_environments::{
    CreationGate, EffectError, EffectResult, EnvironmentFilter, EnvironmentRepository, EnvironmentStatus,
};
use domain_users::UserRepository;
use uuid::Uuid;

/// Tier-based creation gate: refuses environment creation for disabled
/// accounts and for callers past their tier's concurrent-running or
/// created-today caps. Lives here rather than in a domain crate because
/// it is the one policy that needs both the user record and the caller's
/// environment counts.
pub struct TierQuotaGate<U: UserRepository, E: EnvironmentRepository> {
    users: U,
    environments: E,
}

impl<U: UserRepository, E: EnvironmentRepository> TierQuotaGate<U, E> {
    pub fn new(users: U, environments: E) -> Self {
        Self { users, environments }
    }
}

const DAILY_SCAN_LIMIT: usize = 10_000;

#[async_trait]
impl<U: UserRepository, E: EnvironmentRepository> CreationGate for TierQuotaGate<U, E> {
    async fn authorize_creation(&self, owner_id: Uuid) -> EffectResult<()> {
        let user = self
            .users
            .get_by_id(owner_id)
            .await
            .map_err(|e| EffectError::Internal(e.to_string()))?
            .ok_or_else(|| EffectError::Forbidden(format!("unknown user {owner_id}")))?;

        if !user.is_active {
            return Err(EffectError::Forbidden("account is disabled".into()));
        }

        let quota = user.tier.quota();

        let running = self
            .environments
            .list_owned_by(
                owner_id,
                EnvironmentFilter {
                    status: Some(EnvironmentStatus::Running),
                    limit: DAILY_SCAN_LIMIT,
                    offset: 0,
                },
            )
            .await
            .map_err(|e| EffectError::Internal(e.to_string()))?;
        if running.len() >= quota.max_concurrent_running as usize {
            return Err(EffectError::QuotaExceeded(format!(
                "tier {} allows {} concurrent running environments",
                user.tier, quota.max_concurrent_running
            )));
        }

        let recent = self
            .environments
            .list_owned_by(
                owner_id,
                EnvironmentFilter {
                    status: None,
                    limit: DAILY_SCAN_LIMIT,
                    offset: 0,
                },
            )
            .await
            .map_err(|e| EffectError::Internal(e.to_string()))?;
        let today = Utc::now().date_naive();
        let created_today = recent.iter().filter(|e| e.created_at.date_naive() == today).count();
        if created_today >= quota.max_daily_environments as usize {
            return Err(EffectError::QuotaExceeded(format!(
                "tier {} allows {} environments per day",
                user.tier, quota.max_daily_environments
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_environments::{CreateEnvironment, Environment, EnvironmentResult};
    use domain_users::{CreateUser, Tier, User, UserFilter, UserResult};
    use std::sync::Mutex;

    struct OneUser {
        user: User,
    }

    #[async_trait]
    impl UserRepository for OneUser {
        async fn create(&self, user: User) -> UserResult<User> {
            Ok(user)
        }
        async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>> {
            Ok((self.user.id == id).then(|| self.user.clone()))
        }
        async fn get_by_email(&self, _email: &str) -> UserResult<Option<User>> {
            Ok(None)
        }
        async fn list(&self, _filter: UserFilter) -> UserResult<Vec<User>> {
            Ok(vec![self.user.clone()])
        }
        async fn update(&self, user: User) -> UserResult<User> {
            Ok(user)
        }
        async fn delete(&self, _id: Uuid) -> UserResult<bool> {
            Ok(true)
        }
        async fn email_exists(&self, _email: &str) -> UserResult<bool> {
            Ok(false)
        }
    }

    #[derive(Default)]
    struct Envs {
        rows: Mutex<Vec<Environment>>,
    }

    #[async_trait]
    impl EnvironmentRepository for Envs {
        async fn create(&self, environment: Environment) -> EnvironmentResult<Environment> {
            self.rows.lock().unwrap().push(environment.clone());
            Ok(environment)
        }
        async fn get_by_id(&self, id: Uuid) -> EnvironmentResult<Option<Environment>> {
            Ok(self.rows.lock().unwrap().iter().find(|e| e.id == id).cloned())
        }
        async fn find_by_hostname(&self, _hostname: &str) -> EnvironmentResult<Option<Environment>> {
            Ok(None)
        }
        async fn list(&self, _filter: EnvironmentFilter) -> EnvironmentResult<Vec<Environment>> {
            Ok(self.rows.lock().unwrap().clone())
        }
        async fn list_owned_by(
            &self,
            owner_id: Uuid,
            filter: EnvironmentFilter,
        ) -> EnvironmentResult<Vec<Environment>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.owner_id == owner_id)
                .filter(|e| filter.status.is_none_or(|s| s == e.status))
                .cloned()
                .collect())
        }
        async fn transition(
            &self,
            id: Uuid,
            mutate: Box<dyn FnOnce(&mut Environment) -> EnvironmentResult<()> + Send>,
        ) -> EnvironmentResult<Environment> {
            let mut rows = self.rows.lock().unwrap();
            let env = rows
                .iter_mut()
                .find(|e| e.id == id)
                .ok_or(domain_environments::EnvironmentError::NotFound(id))?;
            mutate(env)?;
            Ok(env.clone())
        }
        async fn list_running(&self) -> EnvironmentResult<Vec<Environment>> {
            Ok(Vec::new())
        }
        async fn list_expired(
            &self,
            _now: chrono::DateTime<Utc>,
        ) -> EnvironmentResult<Vec<Environment>> {
            Ok(Vec::new())
        }
    }

    fn free_user() -> User {
        User::new(CreateUser {
            email: "dev@example.com".into(),
            tier: Tier::Free,
        })
    }

    fn running_environment(owner: Uuid) -> Environment {
        let mut env = Environment::new(
            owner,
            &CreateEnvironment {
                name: "busy".into(),
                services: vec![],
                auto_shutdown_hours: None,
                auto_delete_hours: None,
            },
        );
        env.mark_running();
        env
    }

    #[tokio::test]
    async fn free_tier_caps_at_one_running_environment() {
        let user = free_user();
        let owner = user.id;
        let environments = Envs::default();
        environments.rows.lock().unwrap().push(running_environment(owner));

        let gate = TierQuotaGate::new(OneUser { user }, environments);
        let result = gate.authorize_creation(owner).await;

        assert!(matches!(result, Err(EffectError::QuotaExceeded(_))));
    }

    #[tokio::test]
    async fn disabled_account_is_forbidden() {
        let mut user = free_user();
        user.is_active = false;
        let owner = user.id;

        let gate = TierQuotaGate::new(OneUser { user }, Envs::default());
        let result = gate.authorize_creation(owner).await;

        assert!(matches!(result, Err(EffectError::Forbidden(_))));
    }

    #[tokio::test]
    async fn active_user_under_quota_is_allowed() {
        let user = free_user();
        let owner = user.id;

        let gate = TierQuotaGate::new(OneUser { user }, Envs::default());
        assert!(gate.authorize_creation(owner).await.is_ok());
    }
}
