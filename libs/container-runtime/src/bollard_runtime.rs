use bollard::container::{
    Config, CreateContainerOptions, RemoveContainerOptions, StartContainerOptions,
    StopContainerOptions,
};
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::models::{HostConfig, PortBinding, RestartPolicy, RestartPolicyNameEnum};
use bollard::Docker;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::collections::HashMap;

use crate::{
    error::{RuntimeError, RuntimeResult},
    models::{ContainerInspection, ContainerSpec, ContainerState, ExecOutput},
    runtime::ContainerRuntime,
};

/// Docker Engine API adapter. Every container it creates runs with no
/// volume mounts, bridge networking only, and a `no` restart policy so
/// crash-looping services surface as provisioning failures rather than
/// silently coming back.
pub struct BollardContainerRuntime {
    docker: Docker,
}

impl BollardContainerRuntime {
    pub fn connect() -> RuntimeResult<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| RuntimeError::CreateFailed(format!("docker connect: {e}")))?;
        Ok(Self { docker })
    }

    pub fn from_client(docker: Docker) -> Self {
        Self { docker }
    }
}

#[async_trait::async_trait]
impl ContainerRuntime for BollardContainerRuntime {
    async fn create(&self, spec: &ContainerSpec) -> RuntimeResult<String> {
        let container_port = format!("{}/tcp", spec.exposed_port);
        let mut port_bindings = HashMap::new();
        port_bindings.insert(
            container_port.clone(),
            Some(vec![PortBinding {
                host_ip: None,
                host_port: Some(spec.host_port.to_string()),
            }]),
        );

        let mut exposed_ports = HashMap::new();
        exposed_ports.insert(container_port, HashMap::new());

        let host_config = HostConfig {
            port_bindings: Some(port_bindings),
            restart_policy: Some(RestartPolicy {
                name: Some(RestartPolicyNameEnum::NO),
                maximum_retry_count: None,
            }),
            // Never mount host paths into an emulated service container.
            binds: None,
            ..Default::default()
        };

        let env: Vec<String> = spec
            .env
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();

        let config = Config {
            image: Some(spec.image.clone()),
            env: Some(env),
            cmd: spec.command.clone(),
            exposed_ports: Some(exposed_ports),
            host_config: Some(host_config),
            labels: Some(spec.labels.clone()),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: spec.name.clone(),
            platform: None,
        };

        let response = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(|e| RuntimeError::CreateFailed(e.to_string()))?;

        Ok(response.id)
    }

    async fn start(&self, container_id: &str) -> RuntimeResult<()> {
        self.docker
            .start_container(container_id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| RuntimeError::StartFailed(e.to_string()))
    }

    async fn stop(&self, container_id: &str, grace: std::time::Duration) -> RuntimeResult<()> {
        let options = StopContainerOptions {
            t: grace.as_secs() as i64,
        };
        self.docker
            .stop_container(container_id, Some(options))
            .await
            .map_err(|e| RuntimeError::StopFailed(e.to_string()))
    }

    async fn remove(&self, container_id: &str, force: bool) -> RuntimeResult<()> {
        let options = RemoveContainerOptions {
            force,
            v: true,
            link: false,
        };
        self.docker
            .remove_container(container_id, Some(options))
            .await
            .map_err(|e| RuntimeError::RemoveFailed(e.to_string()))
    }

    async fn inspect(&self, container_id: &str) -> RuntimeResult<ContainerInspection> {
        let response = self
            .docker
            .inspect_container(container_id, None)
            .await
            .map_err(|e| RuntimeError::InspectFailed(e.to_string()))?;

        let state = response.state.unwrap_or_default();
        let docker_status = state
            .status
            .map(|s| s.to_string().to_lowercase())
            .unwrap_or_default();

        let started_at = state
            .started_at
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Ok(ContainerInspection {
            state: ContainerState::from_docker_state(&docker_status),
            started_at,
            exit_code: state.exit_code,
        })
    }

    async fn exec(&self, container_id: &str, argv: &[String]) -> RuntimeResult<ExecOutput> {
        let exec = self
            .docker
            .create_exec(
                container_id,
                CreateExecOptions {
                    cmd: Some(argv.to_vec()),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| RuntimeError::ExecFailed(e.to_string()))?;

        let mut stdout = String::new();
        let mut stderr = String::new();

        match self
            .docker
            .start_exec(&exec.id, None)
            .await
            .map_err(|e| RuntimeError::ExecFailed(e.to_string()))?
        {
            StartExecResults::Attached { mut output, .. } => {
                while let Some(chunk) = output.next().await {
                    match chunk.map_err(|e| RuntimeError::ExecFailed(e.to_string()))? {
                        bollard::container::LogOutput::StdOut { message } => {
                            stdout.push_str(&String::from_utf8_lossy(&message))
                        }
                        bollard::container::LogOutput::StdErr { message } => {
                            stderr.push_str(&String::from_utf8_lossy(&message))
                        }
                        _ => {}
                    }
                }
            }
            StartExecResults::Detached => {}
        }

        let inspect = self
            .docker
            .inspect_exec(&exec.id)
            .await
            .map_err(|e| RuntimeError::ExecFailed(e.to_string()))?;

        Ok(ExecOutput {
            stdout,
            stderr,
            exit_code: inspect.exit_code.unwrap_or(-1),
        })
    }
}
