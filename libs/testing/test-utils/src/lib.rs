//! Shared test infrastructure for the domain crates.
//!
//! - `TestDatabase`: a migrated PostgreSQL container per test (feature:
//!   "postgres")
//! - `TestDataBuilder`: deterministic identifiers, so two runs of the
//!   same test provision identically-named environments
//! - `assertions`: small helpers with readable failure messages
//!
//! # Usage
//!
//! ```rust,no_run
//! use test_utils::{TestDatabase, TestDataBuilder};
//!
//! #[tokio::test]
//! async fn environment_round_trip() {
//!     let db = TestDatabase::new().await;
//!     let builder = TestDataBuilder::from_test_name("environment_round_trip");
//!
//!     let owner_id = builder.user_id();
//!     let environment_name = builder.name("environment", "main");
//! }
//! ```

use uuid::Uuid;

#[cfg(feature = "postgres")]
mod postgres;

#[cfg(feature = "postgres")]
pub use postgres::TestDatabase;

/// Deterministic test data, seeded from the test's own name. Rerunning a
/// failing test reproduces the same owner ids and environment names, and
/// two tests sharing a database container never collide on either.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Seeds from the test name, the recommended entry point.
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("provisions_redis");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// A stable owner id for the seeded test.
    pub fn user_id(&self) -> Uuid {
        let bytes = self.seed.to_le_bytes();
        let mut uuid_bytes = [0u8; 16];
        uuid_bytes[..8].copy_from_slice(&bytes);
        uuid_bytes[8..16].copy_from_slice(&bytes);
        Uuid::from_bytes(uuid_bytes)
    }

    /// A stable, test-scoped resource name.
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("hostname_conflict");
    /// let name = builder.name("environment", "first");
    /// // "test-environment-<seed>-first"
    /// ```
    pub fn name(&self, prefix: &str, suffix: &str) -> String {
        format!("test-{}-{}-{}", prefix, self.seed, suffix)
    }
}

/// Assertion helpers with contextual failure messages.
pub mod assertions {
    use uuid::Uuid;

    pub fn assert_uuid_eq(actual: Uuid, expected: Uuid, context: &str) {
        assert_eq!(
            actual, expected,
            "{}: expected UUID {}, got {}",
            context, expected, actual
        );
    }

    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_reproduces_ids_and_names() {
        let first = TestDataBuilder::new(42);
        let second = TestDataBuilder::new(42);

        assert_eq!(first.user_id(), second.user_id());
        assert_eq!(
            first.name("environment", "main"),
            second.name("environment", "main")
        );
    }

    #[test]
    fn same_test_name_reproduces_the_seed() {
        let first = TestDataBuilder::from_test_name("provisions_redis");
        let second = TestDataBuilder::from_test_name("provisions_redis");

        assert_eq!(first.user_id(), second.user_id());
    }

    #[test]
    fn different_tests_never_share_an_owner() {
        let first = TestDataBuilder::from_test_name("hostname_conflict");
        let second = TestDataBuilder::from_test_name("port_race");

        assert_ne!(first.user_id(), second.user_id());
    }
}
