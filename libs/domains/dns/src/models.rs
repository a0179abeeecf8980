use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub const MIN_TTL: i32 = 60;
pub const MAX_TTL: i32 = 86400;
pub const MAX_NAME_LEN: usize = 253;
pub const MAX_BULK_RECORDS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
pub enum RecordType {
    A,
    AAAA,
    CNAME,
    MX,
    TXT,
    NS,
    SRV,
    PTR,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DnsRecord {
    pub id: Uuid,
    pub environment_id: Uuid,
    pub name: String,
    pub record_type: RecordType,
    pub value: String,
    pub ttl: i32,
    pub priority: Option<i16>,
    pub weight: Option<i16>,
    pub port: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateDnsRecord {
    #[validate(length(min = 1, max = 253))]
    pub name: String,
    pub record_type: RecordType,
    #[validate(length(min = 1))]
    pub value: String,
    pub ttl: Option<i32>,
    pub priority: Option<i16>,
    pub weight: Option<i16>,
    pub port: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BulkCreateDnsRecords {
    pub records: Vec<CreateDnsRecord>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BulkInsertFailure {
    pub index: usize,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BulkInsertOutcome {
    pub succeeded: Vec<DnsRecord>,
    pub failed: Vec<BulkInsertFailure>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct DnsRecordFilter {
    pub record_type: Option<RecordType>,
}

impl DnsRecord {
    pub fn new(environment_id: Uuid, input: &CreateDnsRecord) -> Self {
        Self {
            id: Uuid::now_v7(),
            environment_id,
            name: input.name.clone(),
            record_type: input.record_type,
            value: input.value.clone(),
            ttl: clamp_ttl(input.ttl.unwrap_or(300)),
            priority: input.priority,
            weight: input.weight,
            port: input.port,
            created_at: Utc::now(),
        }
    }
}

pub fn clamp_ttl(ttl: i32) -> i32 {
    ttl.clamp(MIN_TTL, MAX_TTL)
}

/// Whether `s` is a sequence of valid DNS labels (1-63 chars each,
/// alphanumeric and hyphen, never leading/trailing hyphen) joined by dots,
/// with an overall length within `MAX_NAME_LEN`.
pub fn is_dns_label_sequence(s: &str) -> bool {
    if s.is_empty() || s.len() > MAX_NAME_LEN {
        return false;
    }
    s.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

/// Per-type shape validation from the DNS record store contract: A/AAAA
/// values are literal IPs of the matching family, CNAME/NS/PTR/MX/SRV
/// values are DNS-label sequences, MX needs a priority, SRV needs
/// priority+weight+port, TXT accepts any non-empty value.
pub fn validate_shape(input: &CreateDnsRecord) -> Result<(), String> {
    if !is_dns_label_sequence(&input.name) {
        return Err(format!("'{}' is not a valid DNS name", input.name));
    }

    match input.record_type {
        RecordType::A => {
            input
                .value
                .parse::<std::net::Ipv4Addr>()
                .map_err(|_| format!("'{}' is not a valid IPv4 address", input.value))?;
        }
        RecordType::AAAA => {
            input
                .value
                .parse::<std::net::Ipv6Addr>()
                .map_err(|_| format!("'{}' is not a valid IPv6 address", input.value))?;
        }
        RecordType::CNAME | RecordType::NS | RecordType::PTR => {
            if !is_dns_label_sequence(&input.value) {
                return Err(format!("'{}' is not a valid DNS name", input.value));
            }
        }
        RecordType::MX => {
            if input.priority.is_none() {
                return Err("MX records require a priority".to_string());
            }
            if !is_dns_label_sequence(&input.value) {
                return Err(format!("'{}' is not a valid DNS name", input.value));
            }
        }
        RecordType::SRV => {
            if input.priority.is_none() || input.weight.is_none() || input.port.is_none() {
                return Err("SRV records require priority, weight, and port".to_string());
            }
            if !is_dns_label_sequence(&input.value) {
                return Err(format!("'{}' is not a valid DNS name", input.value));
            }
        }
        RecordType::TXT => {
            // Arbitrary bytes; chunked into 255-char character-strings when
            // encoded onto the wire, not restricted here.
        }
    }

    Ok(())
}
