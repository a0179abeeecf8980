use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// Everything needed to create a container for a single ServiceInstance.
/// Deliberately narrow: no volume mounts, no network mode override, no
/// privileged flags. The capability table in the Service Provisioner is the
/// only place an image/entrypoint/port combination is decided.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    /// Derived from the ServiceInstance id, e.g. `mockfactory-svc-<uuid>`.
    pub name: String,
    pub image: String,
    pub env: HashMap<String, String>,
    pub command: Option<Vec<String>>,
    /// Container-side port to publish on the leased host port.
    pub exposed_port: u16,
    pub host_port: u16,
    /// Attached for GC: `environment` and `service-kind`.
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Created,
    Running,
    Paused,
    Exited,
    Dead,
    Unknown,
}

impl ContainerState {
    pub fn from_docker_state(state: &str) -> Self {
        match state {
            "created" => Self::Created,
            "running" => Self::Running,
            "paused" => Self::Paused,
            "exited" => Self::Exited,
            "dead" => Self::Dead,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContainerInspection {
    pub state: ContainerState,
    pub started_at: Option<DateTime<Utc>>,
    pub exit_code: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_docker_states() {
        assert_eq!(ContainerState::from_docker_state("running"), ContainerState::Running);
        assert_eq!(ContainerState::from_docker_state("exited"), ContainerState::Exited);
        assert_eq!(ContainerState::from_docker_state("whatever"), ContainerState::Unknown);
    }
}
