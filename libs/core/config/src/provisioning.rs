use crate::{env_or_default, ConfigError, FromEnv};

/// Tunables governing environment/service provisioning (port range
/// bounds, readiness-probe timeout, per-environment provisioning deadline,
/// auto-shutdown default).
#[derive(Clone, Debug)]
pub struct ProvisioningConfig {
    pub port_range_start: u16,
    pub port_range_end: u16,
    pub readiness_timeout_secs: u64,
    pub provisioning_deadline_secs: u64,
    pub default_auto_shutdown_secs: u64,
    pub lambda_concurrency_cap: u32,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            port_range_start: 30000,
            port_range_end: 40000,
            readiness_timeout_secs: 30,
            provisioning_deadline_secs: 120,
            default_auto_shutdown_secs: 3600,
            lambda_concurrency_cap: 10,
        }
    }
}

impl FromEnv for ProvisioningConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let parse = |key: &str, default: u64| -> Result<u64, ConfigError> {
            env_or_default(key, &default.to_string())
                .parse()
                .map_err(|e| ConfigError::ParseError {
                    key: key.to_string(),
                    details: format!("{e}"),
                })
        };

        let port_range_start = parse("PORT_RANGE_START", defaults.port_range_start as u64)? as u16;
        let port_range_end = parse("PORT_RANGE_END", defaults.port_range_end as u64)? as u16;

        Ok(Self {
            port_range_start,
            port_range_end,
            readiness_timeout_secs: parse("READINESS_TIMEOUT_SECS", defaults.readiness_timeout_secs)?,
            provisioning_deadline_secs: parse(
                "PROVISIONING_DEADLINE_SECS",
                defaults.provisioning_deadline_secs,
            )?,
            default_auto_shutdown_secs: parse(
                "DEFAULT_AUTO_SHUTDOWN_SECS",
                defaults.default_auto_shutdown_secs,
            )?,
            lambda_concurrency_cap: parse(
                "LAMBDA_CONCURRENCY_CAP",
                defaults.lambda_concurrency_cap as u64,
            )? as u32,
        })
    }
}

/// Tunables for the background loops (auto-shutdown sweep, port GC,
/// expired-environment purge, hourly usage reconciliation) and the
/// optional DNS UDP responder. Cron expressions are six-field
/// (seconds first); a UDP port of 0 disables the responder.
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    pub auto_shutdown_cron: String,
    pub port_gc_cron: String,
    pub expiry_purge_cron: String,
    pub usage_reconciliation_cron: String,
    pub dns_udp_port: u16,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            auto_shutdown_cron: "0 */15 * * * *".to_string(),
            port_gc_cron: "0 */10 * * * *".to_string(),
            expiry_purge_cron: "0 0 * * * *".to_string(),
            usage_reconciliation_cron: "0 5 * * * *".to_string(),
            dns_udp_port: 15353,
        }
    }
}

impl FromEnv for SchedulerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let dns_udp_port = env_or_default("DNS_UDP_PORT", &defaults.dns_udp_port.to_string())
            .parse()
            .map_err(|e| ConfigError::ParseError {
                key: "DNS_UDP_PORT".to_string(),
                details: format!("{e}"),
            })?;

        Ok(Self {
            auto_shutdown_cron: env_or_default("AUTO_SHUTDOWN_CRON", &defaults.auto_shutdown_cron),
            port_gc_cron: env_or_default("PORT_GC_CRON", &defaults.port_gc_cron),
            expiry_purge_cron: env_or_default("EXPIRY_PURGE_CRON", &defaults.expiry_purge_cron),
            usage_reconciliation_cron: env_or_default(
                "USAGE_RECONCILIATION_CRON",
                &defaults.usage_reconciliation_cron,
            ),
            dns_udp_port,
        })
    }
}
