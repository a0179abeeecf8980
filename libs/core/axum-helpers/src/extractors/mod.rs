//! Request extractors shared by the domain routers.

pub mod validated_json;

pub use validated_json::ValidatedJson;
