use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Subscription tier. Each tier caps how many Environments a user may hold.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Pro,
    Team,
    Enterprise,
}

/// A tier's environment quota.
pub struct TierQuota {
    pub max_daily_environments: u32,
    pub max_concurrent_running: u32,
}

impl Tier {
    pub fn quota(self) -> TierQuota {
        match self {
            Tier::Free => TierQuota {
                max_daily_environments: 5,
                max_concurrent_running: 1,
            },
            Tier::Pro => TierQuota {
                max_daily_environments: 50,
                max_concurrent_running: 5,
            },
            Tier::Team => TierQuota {
                max_daily_environments: 200,
                max_concurrent_running: 20,
            },
            Tier::Enterprise => TierQuota {
                max_daily_environments: u32::MAX,
                max_concurrent_running: u32::MAX,
            },
        }
    }
}

/// A MockFactory account. Ownership anchor for every Environment.
///
/// This crate does not issue or validate credentials — the transport layer
/// authenticates the caller and hands the core a `CallerContext` carrying
/// this user's id. See `axum_helpers::CallerContext`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub tier: Tier,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// DTO for creating a new user
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(email, length(max = 255))]
    pub email: String,
    #[serde(default)]
    pub tier: Tier,
}

/// DTO for updating an existing user
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    pub tier: Option<Tier>,
    pub is_active: Option<bool>,
}

/// Query filters for listing users
#[derive(Debug, Clone, Default, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct UserFilter {
    pub email: Option<String>,
    pub tier: Option<Tier>,
    pub is_active: Option<bool>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

impl User {
    pub fn new(input: CreateUser) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            email: input.email,
            tier: input.tier,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_update(&mut self, update: UpdateUser) {
        if let Some(tier) = update.tier {
            self.tier = tier;
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        self.updated_at = Utc::now();
    }
}
