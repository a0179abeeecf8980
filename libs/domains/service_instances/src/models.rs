use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceKind {
    #[strum(serialize = "redis")]
    #[serde(rename = "redis")]
    Redis,
    #[strum(serialize = "postgresql")]
    #[serde(rename = "postgresql")]
    Postgresql,
    #[strum(serialize = "postgresql-supabase")]
    #[serde(rename = "postgresql-supabase")]
    PostgresqlSupabase,
    #[strum(serialize = "postgresql-pgvector")]
    #[serde(rename = "postgresql-pgvector")]
    PostgresqlPgvector,
    #[strum(serialize = "postgresql-postgis")]
    #[serde(rename = "postgresql-postgis")]
    PostgresqlPostgis,
    #[strum(serialize = "mongodb")]
    #[serde(rename = "mongodb")]
    Mongodb,
    #[strum(serialize = "mysql")]
    #[serde(rename = "mysql")]
    Mysql,
    #[strum(serialize = "elasticmq")]
    #[serde(rename = "elasticmq")]
    Elasticmq,
    #[strum(serialize = "aws-s3")]
    #[serde(rename = "aws-s3")]
    AwsS3,
    #[strum(serialize = "gcp-storage")]
    #[serde(rename = "gcp-storage")]
    GcpStorage,
    #[strum(serialize = "azure-blob")]
    #[serde(rename = "azure-blob")]
    AzureBlob,
    #[strum(serialize = "aws-ecr")]
    #[serde(rename = "aws-ecr")]
    AwsEcr,
    #[strum(serialize = "aws-iam")]
    #[serde(rename = "aws-iam")]
    AwsIam,
    #[strum(serialize = "aws-route53")]
    #[serde(rename = "aws-route53")]
    AwsRoute53,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceBackend {
    /// Backed by a real container, leases a port.
    Container,
    /// Backed by an object-store namespace, no port.
    ObjectStore,
    /// No backing resource at provision time; the emulation router
    /// synthesizes responses.
    Synthesized,
}

/// Static per-kind entry: image/entrypoint/readiness-probe/credential
/// shape, or the object-store/synthesized equivalent.
#[derive(Debug, Clone)]
pub struct ServiceCapability {
    pub backend: ServiceBackend,
    pub image: Option<&'static str>,
    pub container_port: Option<u16>,
    /// URL scheme for the connection descriptor (`redis://...`).
    pub scheme: Option<&'static str>,
    pub readiness_probe: ReadinessProbe,
    pub hourly_rate: f64,
}

#[derive(Debug, Clone, Copy)]
pub enum ReadinessProbe {
    TcpConnect,
    RedisPing,
    PgIsReady,
    None,
}

impl ServiceKind {
    pub fn capability(self) -> ServiceCapability {
        use ServiceBackend::*;
        match self {
            Self::Redis => ServiceCapability {
                backend: Container,
                image: Some("redis:7-alpine"),
                container_port: Some(6379),
                scheme: Some("redis"),
                readiness_probe: ReadinessProbe::RedisPing,
                hourly_rate: 0.01,
            },
            Self::Postgresql => ServiceCapability {
                backend: Container,
                image: Some("postgres:16-alpine"),
                container_port: Some(5432),
                scheme: Some("postgresql"),
                readiness_probe: ReadinessProbe::PgIsReady,
                hourly_rate: 0.02,
            },
            Self::PostgresqlSupabase => ServiceCapability {
                backend: Container,
                image: Some("supabase/postgres:15.1.0.117"),
                container_port: Some(5432),
                scheme: Some("postgresql"),
                readiness_probe: ReadinessProbe::PgIsReady,
                hourly_rate: 0.03,
            },
            Self::PostgresqlPgvector => ServiceCapability {
                backend: Container,
                image: Some("pgvector/pgvector:pg16"),
                container_port: Some(5432),
                scheme: Some("postgresql"),
                readiness_probe: ReadinessProbe::PgIsReady,
                hourly_rate: 0.025,
            },
            Self::PostgresqlPostgis => ServiceCapability {
                backend: Container,
                image: Some("postgis/postgis:16-3.4-alpine"),
                container_port: Some(5432),
                scheme: Some("postgresql"),
                readiness_probe: ReadinessProbe::PgIsReady,
                hourly_rate: 0.025,
            },
            Self::Mongodb => ServiceCapability {
                backend: Container,
                image: Some("mongo:7"),
                container_port: Some(27017),
                scheme: Some("mongodb"),
                readiness_probe: ReadinessProbe::TcpConnect,
                hourly_rate: 0.02,
            },
            Self::Mysql => ServiceCapability {
                backend: Container,
                image: Some("mysql:8"),
                container_port: Some(3306),
                scheme: Some("mysql"),
                readiness_probe: ReadinessProbe::TcpConnect,
                hourly_rate: 0.02,
            },
            Self::Elasticmq => ServiceCapability {
                backend: Container,
                image: Some("softwaremill/elasticmq-native:1.5.7"),
                container_port: Some(9324),
                scheme: Some("http"),
                readiness_probe: ReadinessProbe::TcpConnect,
                hourly_rate: 0.015,
            },
            Self::AwsS3 | Self::GcpStorage | Self::AzureBlob => ServiceCapability {
                backend: ObjectStore,
                image: None,
                container_port: None,
                scheme: Some("https"),
                readiness_probe: ReadinessProbe::None,
                hourly_rate: 0.005,
            },
            Self::AwsEcr | Self::AwsIam | Self::AwsRoute53 => ServiceCapability {
                backend: Synthesized,
                image: None,
                container_port: None,
                scheme: None,
                readiness_probe: ReadinessProbe::None,
                hourly_rate: 0.0,
            },
        }
    }

    /// Environment variables and command override needed to boot the
    /// container with the generated credential. The official images differ
    /// in how they take a password, so this lives in the capability layer
    /// rather than the provisioning loop.
    pub fn container_materials(
        self,
        username: &str,
        password: &str,
    ) -> (std::collections::HashMap<String, String>, Option<Vec<String>>) {
        let mut env = std::collections::HashMap::new();
        let mut command = None;

        match self {
            Self::Redis => {
                command = Some(vec![
                    "redis-server".to_string(),
                    "--requirepass".to_string(),
                    password.to_string(),
                ]);
            }
            Self::Postgresql | Self::PostgresqlSupabase | Self::PostgresqlPgvector | Self::PostgresqlPostgis => {
                env.insert("POSTGRES_USER".to_string(), username.to_string());
                env.insert("POSTGRES_PASSWORD".to_string(), password.to_string());
                env.insert("POSTGRES_DB".to_string(), username.to_string());
            }
            Self::Mongodb => {
                env.insert("MONGO_INITDB_ROOT_USERNAME".to_string(), username.to_string());
                env.insert("MONGO_INITDB_ROOT_PASSWORD".to_string(), password.to_string());
            }
            Self::Mysql => {
                env.insert("MYSQL_ROOT_PASSWORD".to_string(), password.to_string());
                env.insert("MYSQL_DATABASE".to_string(), username.to_string());
            }
            Self::Elasticmq => {}
            _ => {}
        }

        (env, command)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ServiceInstanceStatus {
    #[default]
    Provisioning,
    Running,
    Stopped,
    Destroyed,
}

/// The real connection descriptor, credential unmasked. Never leaves this
/// crate's persistence layer or container env-vars.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub scheme: Option<String>,
    pub host: String,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub namespace: Option<String>,
    pub endpoint_url: Option<String>,
}

pub const MASK: &str = "*****";

impl Credentials {
    /// Connection URL with the password replaced by the placeholder,
    /// e.g. `redis://:*****@127.0.0.1:30001`. None when the descriptor has
    /// no scheme (synthesized services).
    pub fn masked_url(&self) -> Option<String> {
        let scheme = self.scheme.as_deref()?;
        let port = self.port.map(|p| format!(":{p}")).unwrap_or_default();
        let userinfo = match (&self.username, &self.password) {
            (Some(user), Some(_)) => format!("{user}:{MASK}@"),
            (None, Some(_)) => format!(":{MASK}@"),
            _ => String::new(),
        };
        Some(format!("{scheme}://{userinfo}{}{port}", self.host))
    }

    /// API-facing view: the credential masking rule (MUST).
    pub fn masked(&self) -> serde_json::Value {
        serde_json::json!({
            "url": self.masked_url(),
            "host": self.host,
            "port": self.port,
            "username": self.username,
            "password": self.password.as_ref().map(|_| MASK),
            "namespace": self.namespace,
            "endpoint_url": self.endpoint_url,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInstance {
    pub id: Uuid,
    pub environment_id: Uuid,
    pub service_kind: ServiceKind,
    pub status: ServiceInstanceStatus,
    pub container_id: Option<String>,
    pub object_store_namespace: Option<String>,
    #[schema(value_type = Object)]
    pub credentials: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub destroyed_at: Option<DateTime<Utc>>,
}

impl ServiceInstance {
    pub fn new(environment_id: Uuid, service_kind: ServiceKind) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            environment_id,
            service_kind,
            status: ServiceInstanceStatus::Provisioning,
            container_id: None,
            object_store_namespace: None,
            credentials: serde_json::Value::Null,
            created_at: now,
            updated_at: now,
            destroyed_at: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.status = ServiceInstanceStatus::Running;
        self.updated_at = Utc::now();
    }

    pub fn mark_stopped(&mut self) {
        self.status = ServiceInstanceStatus::Stopped;
        self.updated_at = Utc::now();
    }

    pub fn mark_destroyed(&mut self) {
        self.status = ServiceInstanceStatus::Destroyed;
        self.destroyed_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    /// API-facing descriptor. The stored JSON keeps the real credential;
    /// every response path goes through here instead.
    pub fn masked_credentials(&self) -> serde_json::Value {
        match serde_json::from_value::<Credentials>(self.credentials.clone()) {
            Ok(credentials) => credentials.masked(),
            Err(_) => serde_json::Value::Null,
        }
    }
}

/// Namespace convention for managed-backed services: unique across
/// environments because the environment id is embedded.
pub fn namespace_for(environment_id: Uuid, kind: ServiceKind) -> String {
    format!("mockfactory-{environment_id}-{kind}")
}

/// Container name convention: derived from the ServiceInstance id so GC
/// can recover ownership without a side table.
pub fn container_name_for(service_instance_id: Uuid) -> String {
    format!("mockfactory-svc-{service_instance_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masked_url_never_contains_the_password() {
        let credentials = Credentials {
            scheme: Some("redis".into()),
            host: "127.0.0.1".into(),
            port: Some(30001),
            username: None,
            password: Some("hunter2hunter2".into()),
            namespace: None,
            endpoint_url: None,
        };

        let url = credentials.masked_url().unwrap();
        assert_eq!(url, "redis://:*****@127.0.0.1:30001");
        assert!(!serde_json::to_string(&credentials.masked()).unwrap().contains("hunter2"));
    }

    #[test]
    fn postgres_materials_set_official_image_env() {
        let (env, command) = ServiceKind::Postgresql.container_materials("mockfactory", "pw");
        assert_eq!(env.get("POSTGRES_PASSWORD").map(String::as_str), Some("pw"));
        assert!(command.is_none());
    }

    #[test]
    fn redis_materials_pass_the_password_on_the_command_line() {
        let (env, command) = ServiceKind::Redis.container_materials("mockfactory", "pw");
        assert!(env.is_empty());
        assert_eq!(
            command.unwrap(),
            vec!["redis-server".to_string(), "--requirepass".to_string(), "pw".to_string()]
        );
    }

    #[test]
    fn every_container_backed_kind_declares_image_port_and_scheme() {
        use strum::IntoEnumIterator;
        for kind in ServiceKind::iter() {
            let capability = kind.capability();
            if capability.backend == ServiceBackend::Container {
                assert!(capability.image.is_some(), "{kind} has no image");
                assert!(capability.container_port.is_some(), "{kind} has no port");
                assert!(capability.scheme.is_some(), "{kind} has no scheme");
            }
        }
    }
}
