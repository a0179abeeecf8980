// Re-export proc macros when their features are enabled
#[cfg(feature = "sea_orm_resource")]
pub use sea_orm_resource::SeaOrmResource;

/// Trait for REST API resource metadata.
///
/// This trait provides constants for resource URLs, database collection names,
/// and API documentation tags. It is typically derived using the `SeaOrmResource`
/// macro on a SeaORM entity model.
///
/// # Examples
///
/// ```ignore
/// use core_proc_macros::SeaOrmResource;
///
/// #[derive(SeaOrmResource)]
/// #[sea_orm(table_name = "users")]
/// pub struct Model {
///     id: Uuid,
///     email: String,
/// }
///
/// assert_eq!(Model::URL, "/users");
/// assert_eq!(Model::COLLECTION, "users");
/// ```
pub trait ApiResource {
    /// The base URL path for this resource (e.g., "/user")
    const URL: &'static str;
    /// `URL` under the `/api` mount (e.g., "/api/user")
    const API_URL: &'static str;
    /// The database collection or table name (e.g., "users")
    const COLLECTION: &'static str;
    /// The API documentation tag (e.g., "Users")
    const TAG: &'static str;
}
