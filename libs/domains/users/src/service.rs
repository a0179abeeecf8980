use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{UserError, UserResult},
    models::{CreateUser, UpdateUser, User, UserFilter},
    repository::UserRepository,
};

/// User Service - no credential handling, just account + tier bookkeeping.
pub struct UserService<R: UserRepository> {
    repository: R,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    pub async fn create_user(&self, input: CreateUser) -> UserResult<User> {
        input
            .validate()
            .map_err(|e| UserError::Validation(e.to_string()))?;

        if self.repository.email_exists(&input.email).await? {
            return Err(UserError::DuplicateEmail(input.email));
        }

        let user = User::new(input);
        let user = self.repository.create(user).await?;

        tracing::info!(user_id = %user.id, "created user");
        Ok(user)
    }

    pub async fn get_user(&self, id: Uuid) -> UserResult<User> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))
    }

    pub async fn list_users(&self, filter: UserFilter) -> UserResult<Vec<User>> {
        self.repository.list(filter).await
    }

    pub async fn update_user(&self, id: Uuid, input: UpdateUser) -> UserResult<User> {
        let mut user = self.get_user(id).await?;
        user.apply_update(input);
        let user = self.repository.update(user).await?;

        tracing::info!(user_id = %id, "updated user");
        Ok(user)
    }

    pub async fn delete_user(&self, id: Uuid) -> UserResult<()> {
        if !self.repository.delete(id).await? {
            return Err(UserError::NotFound(id));
        }
        tracing::info!(user_id = %id, "deleted user");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Tier;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryUserRepository {
        users: Mutex<Vec<User>>,
    }

    #[async_trait]
    impl UserRepository for InMemoryUserRepository {
        async fn create(&self, user: User) -> UserResult<User> {
            self.users.lock().unwrap().push(user.clone());
            Ok(user)
        }

        async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>> {
            Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
        }

        async fn get_by_email(&self, email: &str) -> UserResult<Option<User>> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .iter()
                .find(|u| u.email == email)
                .cloned())
        }

        async fn list(&self, _filter: UserFilter) -> UserResult<Vec<User>> {
            Ok(self.users.lock().unwrap().clone())
        }

        async fn update(&self, user: User) -> UserResult<User> {
            let mut users = self.users.lock().unwrap();
            let slot = users
                .iter_mut()
                .find(|u| u.id == user.id)
                .ok_or(UserError::NotFound(user.id))?;
            *slot = user.clone();
            Ok(user)
        }

        async fn delete(&self, id: Uuid) -> UserResult<bool> {
            let mut users = self.users.lock().unwrap();
            let len_before = users.len();
            users.retain(|u| u.id != id);
            Ok(users.len() != len_before)
        }

        async fn email_exists(&self, email: &str) -> UserResult<bool> {
            Ok(self.get_by_email(email).await?.is_some())
        }
    }

    #[tokio::test]
    async fn create_user_rejects_duplicate_email() {
        let service = UserService::new(InMemoryUserRepository::default());

        service
            .create_user(CreateUser {
                email: "a@example.com".into(),
                tier: Tier::Free,
            })
            .await
            .unwrap();

        let result = service
            .create_user(CreateUser {
                email: "a@example.com".into(),
                tier: Tier::Pro,
            })
            .await;

        assert!(matches!(result, Err(UserError::DuplicateEmail(_))));
    }

    #[tokio::test]
    async fn update_user_changes_tier() {
        let service = UserService::new(InMemoryUserRepository::default());
        let user = service
            .create_user(CreateUser {
                email: "b@example.com".into(),
                tier: Tier::Free,
            })
            .await
            .unwrap();

        let updated = service
            .update_user(
                user.id,
                UpdateUser {
                    tier: Some(Tier::Team),
                    is_active: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.tier, Tier::Team);
    }
}
