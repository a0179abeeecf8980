use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub const DEFAULT_AUTO_SHUTDOWN_SECONDS: i64 = 4 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EnvironmentStatus {
    #[default]
    Created,
    Provisioning,
    Running,
    Stopped,
    Destroying,
    Destroyed,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Environment {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    /// Globally unique when set; DNS-label shape enforced on write.
    pub custom_hostname: Option<String>,
    pub status: EnvironmentStatus,
    pub auto_shutdown_seconds: i64,
    /// Sum of the declared services' static rates, fixed at provision time.
    pub hourly_rate: f64,
    /// Running-cost accumulator, fed by every closed UsageInterval.
    pub accrued_cost: f64,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub destroyed_at: Option<DateTime<Utc>>,
    pub auto_delete_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One entry of the `services` array in a create request.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ServiceRequest {
    pub kind: String,
    pub version: Option<String>,
    #[serde(default)]
    pub config: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateEnvironment {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1))]
    pub services: Vec<ServiceRequest>,
    pub auto_shutdown_hours: Option<f64>,
    /// When set, the purge loop destroys the environment this many hours
    /// after creation.
    pub auto_delete_hours: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateHostname {
    pub hostname: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct EnvironmentFilter {
    pub status: Option<EnvironmentStatus>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

/// What the caller of `POST /environments` gets back: the new record plus
/// the provisioning outcome (masked endpoints, computed hourly rate).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProvisionedEnvironment {
    pub id: Uuid,
    pub state: EnvironmentStatus,
    pub endpoints: serde_json::Value,
    pub hourly_rate: f64,
}

/// Full record for `GET /environments/{id}`: the row plus the masked
/// connection descriptors of its live services.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EnvironmentDetails {
    pub environment: Environment,
    #[schema(value_type = Object)]
    pub endpoints: serde_json::Value,
}

/// RFC-1035 label sequence: ≤253 chars total, each label 1..=63 of
/// `[a-z0-9-]`, no leading/trailing hyphen.
pub fn validate_hostname(hostname: &str) -> Result<(), String> {
    if hostname.is_empty() || hostname.len() > 253 {
        return Err(format!("hostname must be 1..=253 characters, got {}", hostname.len()));
    }
    for label in hostname.split('.') {
        if label.is_empty() || label.len() > 63 {
            return Err(format!("hostname label '{label}' must be 1..=63 characters"));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(format!("hostname label '{label}' must not start or end with a hyphen"));
        }
        if !label.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
            return Err(format!("hostname label '{label}' contains characters outside [a-z0-9-]"));
        }
    }
    Ok(())
}

impl Environment {
    pub fn new(owner_id: Uuid, input: &CreateEnvironment) -> Self {
        let now = Utc::now();
        let auto_shutdown_seconds = input
            .auto_shutdown_hours
            .map(|hours| (hours * 3600.0) as i64)
            .unwrap_or(DEFAULT_AUTO_SHUTDOWN_SECONDS);
        let auto_delete_at = input
            .auto_delete_hours
            .map(|hours| now + Duration::seconds((hours * 3600.0) as i64));

        Self {
            id: Uuid::now_v7(),
            owner_id,
            name: input.name.clone(),
            custom_hostname: None,
            status: EnvironmentStatus::Created,
            auto_shutdown_seconds,
            hourly_rate: 0.0,
            accrued_cost: 0.0,
            last_activity_at: None,
            error_message: None,
            started_at: None,
            stopped_at: None,
            destroyed_at: None,
            auto_delete_at,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }

    /// Whether the auto-shutdown loop should stop this environment at `now`.
    pub fn is_idle_at(&self, now: DateTime<Utc>) -> bool {
        self.status == EnvironmentStatus::Running
            && self
                .last_activity_at
                .is_some_and(|at| now - at >= Duration::seconds(self.auto_shutdown_seconds))
    }

    pub fn touch_activity(&mut self) {
        self.last_activity_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    fn set_status(&mut self, status: EnvironmentStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub fn begin_provisioning(&mut self) {
        self.set_status(EnvironmentStatus::Provisioning);
    }

    pub fn mark_running(&mut self) {
        self.set_status(EnvironmentStatus::Running);
        self.error_message = None;
        self.started_at = Some(Utc::now());
        self.stopped_at = None;
        self.touch_activity();
    }

    pub fn mark_error(&mut self, message: String) {
        self.error_message = Some(message);
        self.set_status(EnvironmentStatus::Error);
    }

    pub fn mark_stopped(&mut self) {
        self.set_status(EnvironmentStatus::Stopped);
        self.stopped_at = Some(Utc::now());
    }

    pub fn begin_destroying(&mut self) {
        self.set_status(EnvironmentStatus::Destroying);
    }

    pub fn mark_destroyed(&mut self) {
        self.set_status(EnvironmentStatus::Destroyed);
        self.destroyed_at = Some(Utc::now());
    }

    pub fn set_hourly_rate(&mut self, rate: f64) {
        self.hourly_rate = rate;
        self.updated_at = Utc::now();
    }

    pub fn accrue(&mut self, cost: f64) {
        self.accrued_cost += cost;
        self.updated_at = Utc::now();
    }

    pub fn set_hostname(&mut self, hostname: String) {
        self.custom_hostname = Some(hostname);
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hostname_validation_accepts_labels() {
        assert!(validate_hostname("api.my-env.example").is_ok());
        assert!(validate_hostname("a").is_ok());
    }

    #[test]
    fn hostname_validation_rejects_bad_shapes() {
        assert!(validate_hostname("").is_err());
        assert!(validate_hostname("-leading.example").is_err());
        assert!(validate_hostname("trailing-.example").is_err());
        assert!(validate_hostname("UPPER.example").is_err());
        assert!(validate_hostname(&"a".repeat(254)).is_err());
        assert!(validate_hostname(&format!("{}.example", "a".repeat(64))).is_err());
    }

    #[test]
    fn idle_check_honours_per_environment_window() {
        let mut env = Environment::new(
            Uuid::now_v7(),
            &CreateEnvironment {
                name: "idle-check".into(),
                services: vec![],
                auto_shutdown_hours: Some(1.0),
                auto_delete_hours: None,
            },
        );
        env.mark_running();
        assert!(!env.is_idle_at(Utc::now()));
        assert!(env.is_idle_at(Utc::now() + Duration::hours(2)));
    }
}
