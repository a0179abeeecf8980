use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Cloud-service family a row belongs to. One relational table covers all
/// families; the per-family shape lives in `attributes` and the translator
/// module owning that family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ResourceFamily {
    S3,
    Gcs,
    Blob,
    Ec2,
    Lambda,
    Dynamodb,
    Sqs,
    Route53,
    Iam,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmulatedResource {
    pub id: Uuid,
    pub environment_id: Uuid,
    pub family: ResourceFamily,
    /// Row discriminator within a family: "bucket"/"object"/"instance"/
    /// "function"/"table"/"item"/"queue"/"message".
    pub kind: String,
    /// The id the cloud API addresses the resource by. Unique per family;
    /// environment-scoped families embed the environment id.
    pub external_id: String,
    pub object_store_namespace: Option<String>,
    pub container_id: Option<String>,
    pub attributes: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EmulatedResource {
    pub fn new(
        environment_id: Uuid,
        family: ResourceFamily,
        kind: impl Into<String>,
        external_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            environment_id,
            family,
            kind: kind.into(),
            external_id: external_id.into(),
            object_store_namespace: None,
            container_id: None,
            attributes: serde_json::json!({}),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_attributes(mut self, attributes: serde_json::Value) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(|v| v.as_str())
    }

    pub fn attr_i64(&self, key: &str) -> Option<i64> {
        self.attributes.get(key).and_then(|v| v.as_i64())
    }

    pub fn set_attr(&mut self, key: &str, value: serde_json::Value) {
        if let Some(object) = self.attributes.as_object_mut() {
            object.insert(key.to_string(), value);
        }
        self.updated_at = Utc::now();
    }
}
