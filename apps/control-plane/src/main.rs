//! MockFactory control plane.
//!
//! Wires every domain router under `/api`, mounts health/ready/metrics,
//! runs the background loops, and optionally serves DNS over UDP.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, middleware, response::IntoResponse, routing::get, Router};
use axum_helpers::health::{run_health_checks, HealthCheckFuture};
use axum_helpers::server::create_production_app;
use container_runtime::BollardContainerRuntime;
use core_config::tracing::{init_tracing, install_color_eyre};
use database::postgres::DatabaseConnection;
use domain_dns::{DnsRecordService, PgDnsRecordRepository, UdpResponder};
use domain_emulation::{EmulationCleanup, EmulationConfig, EmulationState, PgEmulatedResourceRepository};
use domain_environments::{EnvironmentService, PgEnvironmentRepository, ResourceCleanup};
use domain_ports::{PgPortRepository, PortAllocator};
use domain_service_instances::{PgServiceInstanceRepository, ServiceInstanceProvisioner};
use domain_usage::{PgUsageIntervalRepository, UsageAccrualService};
use domain_users::{PgUserRepository, UserService};
use object_store_adapter::S3ObjectStore;
use tracing::{error, info};

mod config;
mod jobs;
mod openapi;
mod quota;

use config::Config;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    observability::init_metrics();
    info!("Prometheus metrics initialized");

    let db = database::postgres::connect_from_config_with_retry(config.database.clone(), None)
        .await
        .map_err(|e| eyre::eyre!("PostgreSQL connection failed: {e}"))?;
    database::postgres::run_migrations::<migration::Migrator>(&db, "control-plane")
        .await
        .map_err(|e| eyre::eyre!("migrations failed: {e}"))?;

    // Adapters (container runtime and object store), shared between the
    // provisioner and the emulation router.
    let runtime = Arc::new(
        BollardContainerRuntime::connect().map_err(|e| eyre::eyre!("container runtime connect failed: {e}"))?,
    );
    let object_store = Arc::new(
        S3ObjectStore::connect(config.object_store_endpoint.clone(), config.object_store_region.clone()).await,
    );

    let environments_repo = Arc::new(PgEnvironmentRepository::new(db.clone()));
    let instances_repo = Arc::new(PgServiceInstanceRepository::new(db.clone()));
    let dns_repo = Arc::new(PgDnsRecordRepository::new(db.clone()));
    let resources_repo = Arc::new(PgEmulatedResourceRepository::new(db.clone()));

    let provisioner = Arc::new(ServiceInstanceProvisioner::new(
        instances_repo.clone(),
        PortAllocator::new(PgPortRepository::new(db.clone())),
        runtime.clone(),
        object_store.clone(),
        config.base_domain.clone(),
        Duration::from_secs(config.provisioning.readiness_timeout_secs),
        Duration::from_secs(config.provisioning.provisioning_deadline_secs),
    ));

    let usage = Arc::new(UsageAccrualService::new(PgUsageIntervalRepository::new(db.clone())));
    let dns_service = Arc::new(DnsRecordService::new(dns_repo.clone(), environments_repo.clone()));
    let user_service = UserService::new(PgUserRepository::new(db.clone()));

    // Lifecycle Manager: resource cleanups run on destroy, the tier-quota
    // gate on create.
    let cleanups: Vec<Arc<dyn ResourceCleanup>> = vec![
        dns_service.clone(),
        Arc::new(EmulationCleanup::new(resources_repo.clone(), runtime.clone())),
    ];
    let lifecycle = Arc::new(
        EnvironmentService::new(environments_repo.clone(), provisioner.clone(), usage.clone(), cleanups)
            .with_creation_gate(Arc::new(quota::TierQuotaGate::new(
                PgUserRepository::new(db.clone()),
                environments_repo.clone(),
            ))),
    );

    let emulation_state = EmulationState::new(
        resources_repo,
        environments_repo,
        instances_repo,
        object_store,
        runtime,
        dns_repo.clone(),
        EmulationConfig {
            base_domain: config.base_domain.clone(),
            lambda_concurrency: config.provisioning.lambda_concurrency as usize,
        },
    );

    let mut scheduler = jobs::start(&config.scheduler, lifecycle.clone(), provisioner, usage).await?;

    // Optional UDP name server; port 0 disables it.
    if config.scheduler.dns_udp_port != 0 {
        let responder = UdpResponder::new(dns_repo);
        let bind_addr = SocketAddr::from(([0, 0, 0, 0], config.scheduler.dns_udp_port));
        tokio::spawn(async move {
            if let Err(e) = responder.serve(bind_addr).await {
                error!(error = %e, "DNS UDP responder exited");
            }
        });
    }

    let api_routes = Router::new()
        .nest("/users", domain_users::handlers::router(user_service))
        .nest("/environments", domain_environments::handlers::router(lifecycle))
        .nest("/environments/{environment_id}/dns", domain_dns::handlers::router(dns_service))
        .nest("/emulation", domain_emulation::handlers::router(emulation_state));

    let router = axum_helpers::create_router::<openapi::ApiDoc>(api_routes).await?;
    let metrics_router = Router::new().route("/metrics", get(observability::metrics_handler));

    let app = router
        .layer(middleware::from_fn(observability::middleware::metrics_middleware))
        .merge(ready_router(db.clone()))
        .merge(metrics_router);

    info!("Starting MockFactory control plane on {}", config.server.address());

    create_production_app(app, &config.server, Duration::from_secs(30), async move {
        info!("Shutting down: stopping schedulers and closing connections");
        if let Err(e) = scheduler.shutdown().await {
            error!(error = %e, "scheduler shutdown failed");
        }
        match db.close().await {
            Ok(()) => info!("PostgreSQL connection closed"),
            Err(e) => error!(error = %e, "error closing PostgreSQL"),
        }
    })
    .await
    .map_err(|e| eyre::eyre!("server error: {e}"))?;

    info!("Control plane shutdown complete");
    Ok(())
}

fn ready_router(db: DatabaseConnection) -> Router {
    Router::new().route("/ready", get(ready_handler)).with_state(db)
}

/// Readiness: the process is up and Postgres answers `SELECT 1`.
async fn ready_handler(State(db): State<DatabaseConnection>) -> impl IntoResponse {
    let checks: Vec<(&str, HealthCheckFuture<'_>)> = vec![(
        "database",
        Box::pin(async { database::postgres::check_health(&db).await.map_err(|e| e.to_string()) }),
    )];

    match run_health_checks(checks).await {
        Ok(ready) => ready.into_response(),
        Err(not_ready) => not_ready.into_response(),
    }
}
