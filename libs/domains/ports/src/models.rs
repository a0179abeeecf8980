use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub const PORT_RANGE_START: u16 = 30000;
pub const PORT_RANGE_END: u16 = 40000;

/// A leased TCP port in [30000, 40000] bound to a ServiceInstance.
///
/// Invariant: at most one active allocation exists per port value at
/// any instant, enforced by a Postgres partial unique index on `port`
/// filtered to `active`, not by application-level locking alone.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PortAllocation {
    pub id: Uuid,
    pub service_instance_id: Uuid,
    pub port: u16,
    pub active: bool,
    pub allocated_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
}

impl PortAllocation {
    pub fn new(service_instance_id: Uuid, port: u16) -> Self {
        Self {
            id: Uuid::now_v7(),
            service_instance_id,
            port,
            active: true,
            allocated_at: Utc::now(),
            released_at: None,
        }
    }

    pub fn release(&mut self) {
        self.active = false;
        self.released_at = Some(Utc::now());
    }
}
