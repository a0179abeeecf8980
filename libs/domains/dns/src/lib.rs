//! DNS Record Store and optional UDP responder
//!
//! CRUD on DNSRecord rows scoped to an Environment, plus an optional
//! non-authoritative UDP responder answering `(name, type)` lookups across
//! every environment (oldest match wins). Implements
//! `domain_environments::effects::ResourceCleanup` so the Lifecycle Manager
//! can purge records on destroy without depending on this crate's types.

pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod responder;
pub mod service;

pub use entity::Entity as DnsRecordEntity;
pub use error::{DnsError, DnsResult};
pub use models::{
    BulkCreateDnsRecords, BulkInsertFailure, BulkInsertOutcome, CreateDnsRecord, DnsRecord, DnsRecordFilter,
    RecordType, MAX_BULK_RECORDS, MAX_NAME_LEN, MAX_TTL, MIN_TTL,
};
pub use postgres::PgDnsRecordRepository;
pub use repository::DnsRecordRepository;
pub use responder::UdpResponder;
pub use service::DnsRecordService;
