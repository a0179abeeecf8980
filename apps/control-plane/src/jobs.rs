use std::sync::Arc;

use container_runtime::ContainerRuntime;
use core_config::provisioning::SchedulerConfig;
use domain_environments::{EnvironmentRepository, EnvironmentService, ServiceProvisioner, UsageAccrual};
use domain_ports::PortRepository;
use domain_service_instances::{ServiceInstanceProvisioner, ServiceInstanceRepository};
use domain_usage::{UsageAccrualService, UsageIntervalRepository};
use object_store_adapter::ObjectStore;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info, warn};

/// Registers the background loops (auto-shutdown sweep, port GC,
/// expired-environment purge, hourly usage reconciliation) on one
/// scheduler and starts it. Each job logs a heartbeat and swallows its
/// own errors so a bad tick never kills the loop.
pub async fn start<R, P, U, IR, PR, CR, OS, UR>(
    config: &SchedulerConfig,
    lifecycle: Arc<EnvironmentService<R, P, U>>,
    provisioner: Arc<ServiceInstanceProvisioner<IR, PR, CR, OS>>,
    usage: Arc<UsageAccrualService<UR>>,
) -> eyre::Result<JobScheduler>
where
    R: EnvironmentRepository + 'static,
    P: ServiceProvisioner + 'static,
    U: UsageAccrual + 'static,
    IR: ServiceInstanceRepository + 'static,
    PR: PortRepository + 'static,
    CR: ContainerRuntime + 'static,
    OS: ObjectStore + 'static,
    UR: UsageIntervalRepository + 'static,
{
    let scheduler = JobScheduler::new().await?;

    let sweep = lifecycle.clone();
    scheduler
        .add(Job::new_async(config.auto_shutdown_cron.as_str(), move |_id, _l| {
            let sweep = sweep.clone();
            Box::pin(async move {
                debug!("auto-shutdown sweep tick");
                let failures = sweep.auto_shutdown_idle().await;
                if !failures.is_empty() {
                    warn!(failures = failures.len(), "auto-shutdown sweep finished with failures");
                }
            })
        })?)
        .await?;

    let gc = provisioner.clone();
    scheduler
        .add(Job::new_async(config.port_gc_cron.as_str(), move |_id, _l| {
            let gc = gc.clone();
            Box::pin(async move {
                debug!("port GC tick");
                match gc.reconcile_ports().await {
                    Ok(0) => {}
                    Ok(released) => info!(released, "port GC released orphaned allocations"),
                    Err(e) => error!(error = %e, "port GC failed"),
                }
            })
        })?)
        .await?;

    let purge = lifecycle.clone();
    scheduler
        .add(Job::new_async(config.expiry_purge_cron.as_str(), move |_id, _l| {
            let purge = purge.clone();
            Box::pin(async move {
                debug!("expired-environment purge tick");
                let failures = purge.purge_expired().await;
                if !failures.is_empty() {
                    warn!(failures = failures.len(), "expired-environment purge finished with failures");
                }
            })
        })?)
        .await?;

    let reconcile_usage = usage.clone();
    let accrue = lifecycle.clone();
    scheduler
        .add(Job::new_async(config.usage_reconciliation_cron.as_str(), move |_id, _l| {
            let reconcile_usage = reconcile_usage.clone();
            let accrue = accrue.clone();
            Box::pin(async move {
                debug!("usage reconciliation tick");
                match reconcile_usage.reconcile_once().await {
                    Ok(closed) => {
                        for (environment_id, cost) in closed {
                            if let Err(e) = accrue.accrue_cost(environment_id, cost).await {
                                warn!(environment_id = %environment_id, error = %e, "failed to accrue reconciled cost");
                            }
                        }
                    }
                    Err(e) => error!(error = %e, "usage reconciliation failed"),
                }
            })
        })?)
        .await?;

    scheduler.start().await?;
    info!("background schedulers started");
    Ok(scheduler)
}
