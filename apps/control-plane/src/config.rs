use core_config::provisioning::{ProvisioningConfig, SchedulerConfig};
use core_config::server::ServerConfig;
use core_config::{env_or_default, ConfigError, Environment, FromEnv};
use database::postgres::PostgresConfig;

/// Aggregated control-plane configuration, entirely environment-driven.
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: PostgresConfig,
    pub provisioning: ProvisioningConfig,
    pub scheduler: SchedulerConfig,
    /// Suffix for managed-service virtual hostnames
    /// (`{service}.{environment-id}.{base_domain}`).
    pub base_domain: String,
    /// Endpoint override for the object-store adapter; unset means real
    /// AWS, set means an S3-compatible server (e.g. MinIO).
    pub object_store_endpoint: Option<String>,
    pub object_store_region: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            environment: Environment::from_env(),
            server: ServerConfig::from_env()?,
            database: PostgresConfig::from_env()?,
            provisioning: ProvisioningConfig::from_env()?,
            scheduler: SchedulerConfig::from_env()?,
            base_domain: env_or_default("BASE_DOMAIN", "mockfactory.dev"),
            object_store_endpoint: std::env::var("OBJECT_STORE_ENDPOINT").ok(),
            object_store_region: env_or_default("OBJECT_STORE_REGION", "us-east-1"),
        })
    }
}
