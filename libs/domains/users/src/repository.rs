use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::UserResult,
    models::{User, UserFilter},
};

/// Repository trait for User persistence
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> UserResult<User>;
    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>>;
    async fn get_by_email(&self, email: &str) -> UserResult<Option<User>>;
    async fn list(&self, filter: UserFilter) -> UserResult<Vec<User>>;
    async fn update(&self, user: User) -> UserResult<User>;
    async fn delete(&self, id: Uuid) -> UserResult<bool>;
    async fn email_exists(&self, email: &str) -> UserResult<bool>;
}
