//! Users Domain
//!
//! Minimal account records: email, tier, and an activity flag. Credential
//! issuance and verification are handled by the transport layer; this crate
//! only persists the account a `CallerContext` resolves to.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Service   │  ← validation, duplicate-email checks
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │ Repository  │  ← Data access (trait + Postgres impl)
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Models    │  ← User, Tier, DTOs
//! └─────────────┘
//! ```

pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

pub use error::{UserError, UserResult};
pub use models::{CreateUser, Tier, TierQuota, UpdateUser, User, UserFilter};
pub use postgres::PgUserRepository;
pub use repository::UserRepository;
pub use service::UserService;
