//! Cloud Storage (GCS JSON API) translator.
//!
//! Supported operations: buckets insert/list/delete, objects
//! insert (media upload)/get/list/delete. Shares the S3 translator's
//! backing model: bucket rows and object metadata in the relational
//! store, bytes in the environment's object-store namespace under
//! `{bucket}/{object}`. Everything else returns a GCS-shaped 501.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use axum_helpers::CallerContext;
use domain_service_instances::ServiceKind;
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    error::{EmulationError, EmulationResult},
    models::{EmulatedResource, ResourceFamily},
    s3::etag_of,
    state::EmulationState,
};

pub fn router() -> Router<EmulationState> {
    Router::new()
        .route("/b", get(list_buckets).post(create_bucket))
        .route("/b/{bucket}", delete(delete_bucket))
        .route("/b/{bucket}/o", get(list_objects))
        .route("/b/{bucket}/o/{*object}", get(get_object).delete(delete_object))
        .route("/upload/b/{bucket}/o", post(upload_object))
        .fallback(not_implemented)
}

async fn not_implemented() -> Response {
    error_response(&EmulationError::NotImplemented(
        "operation not supported by this emulator".into(),
    ))
}

pub fn error_response(error: &EmulationError) -> Response {
    let status = error.status_code();
    (
        status,
        Json(json!({
            "error": { "code": status.as_u16(), "message": error.to_string() }
        })),
    )
        .into_response()
}

async fn bucket_row(
    state: &EmulationState,
    bucket: &str,
    environment_id: Uuid,
) -> EmulationResult<EmulatedResource> {
    let row = state
        .resources
        .get(ResourceFamily::Gcs, bucket)
        .await?
        .ok_or_else(|| EmulationError::NotFound(format!("bucket {bucket}")))?;
    if row.environment_id != environment_id {
        return Err(EmulationError::NotFound(format!("bucket {bucket}")));
    }
    Ok(row)
}

fn bucket_json(row: &EmulatedResource) -> serde_json::Value {
    json!({
        "kind": "storage#bucket",
        "name": row.external_id,
        "timeCreated": row.created_at.to_rfc3339(),
    })
}

fn object_json(row: &EmulatedResource) -> serde_json::Value {
    json!({
        "kind": "storage#object",
        "name": row.attr_str("object"),
        "bucket": row.attr_str("bucket"),
        "size": row.attr_i64("size").unwrap_or(0).to_string(),
        "etag": row.attr_str("etag"),
        "updated": row.updated_at.to_rfc3339(),
    })
}

async fn list_buckets(
    State(state): State<EmulationState>,
    caller: CallerContext,
    Path(environment_id): Path<Uuid>,
) -> Response {
    let result = async {
        state
            .authorize(caller.user_id, environment_id, ResourceFamily::Gcs, "buckets.list")
            .await?;
        state.resources.list(environment_id, ResourceFamily::Gcs, "bucket").await
    }
    .await;

    match result {
        Ok(buckets) => Json(json!({
            "kind": "storage#buckets",
            "items": buckets.iter().map(bucket_json).collect::<Vec<_>>(),
        }))
        .into_response(),
        Err(e) => error_response(&e),
    }
}

async fn create_bucket(
    State(state): State<EmulationState>,
    caller: CallerContext,
    Path(environment_id): Path<Uuid>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let result = async {
        state
            .authorize(caller.user_id, environment_id, ResourceFamily::Gcs, "buckets.insert")
            .await?;

        let name = body
            .get("name")
            .and_then(|n| n.as_str())
            .ok_or_else(|| EmulationError::InvalidRequest("bucket name is required".into()))?
            .to_string();

        let namespace = state
            .storage_namespace(environment_id, ServiceKind::GcpStorage)
            .await?;

        if let Some(existing) = state.resources.get(ResourceFamily::Gcs, &name).await? {
            if existing.environment_id == environment_id {
                return Ok(existing);
            }
            return Err(EmulationError::Conflict(format!("bucket {name} already exists")));
        }

        let mut row = EmulatedResource::new(environment_id, ResourceFamily::Gcs, "bucket", &name);
        row.object_store_namespace = Some(namespace);
        state.resources.create(row).await
    }
    .await;

    match result {
        Ok(row) => Json(bucket_json(&row)).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn delete_bucket(
    State(state): State<EmulationState>,
    caller: CallerContext,
    Path((environment_id, bucket)): Path<(Uuid, String)>,
) -> Response {
    let result = async {
        state
            .authorize(caller.user_id, environment_id, ResourceFamily::Gcs, "buckets.delete")
            .await?;
        let row = bucket_row(&state, &bucket, environment_id).await?;

        let objects = state.resources.list(environment_id, ResourceFamily::Gcs, "object").await?;
        if objects.iter().any(|o| o.attr_str("bucket") == Some(bucket.as_str())) {
            return Err(EmulationError::Conflict(format!("bucket {bucket} is not empty")));
        }

        state.resources.delete(row.id).await
    }
    .await;

    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e),
    }
}

async fn upload_object(
    State(state): State<EmulationState>,
    caller: CallerContext,
    Path((environment_id, bucket)): Path<(Uuid, String)>,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let result = async {
        state
            .authorize(caller.user_id, environment_id, ResourceFamily::Gcs, "objects.insert")
            .await?;

        let object = params
            .get("name")
            .cloned()
            .ok_or_else(|| EmulationError::InvalidRequest("object name query parameter is required".into()))?;

        let bucket_row = bucket_row(&state, &bucket, environment_id).await?;
        let namespace = bucket_row
            .object_store_namespace
            .clone()
            .ok_or_else(|| EmulationError::Internal("bucket row has no namespace".into()))?;

        state
            .object_store
            .put_object(&namespace, &format!("{bucket}/{object}"), body.to_vec())
            .await?;

        let external_id = format!("{bucket}/{object}");
        let attributes = json!({
            "bucket": bucket,
            "object": object,
            "size": body.len(),
            "etag": etag_of(&body),
        });

        match state.resources.get(ResourceFamily::Gcs, &external_id).await? {
            Some(mut existing) => {
                existing.attributes = attributes;
                state.resources.update(existing).await
            }
            None => {
                let mut row = EmulatedResource::new(environment_id, ResourceFamily::Gcs, "object", external_id);
                row.object_store_namespace = Some(namespace);
                row = row.with_attributes(attributes);
                state.resources.create(row).await
            }
        }
    }
    .await;

    match result {
        Ok(row) => Json(object_json(&row)).into_response(),
        Err(e) => error_response(&e),
    }
}

enum GetOutcome {
    Metadata(EmulatedResource),
    Media(Vec<u8>),
}

async fn get_object(
    State(state): State<EmulationState>,
    caller: CallerContext,
    Path((environment_id, bucket, object)): Path<(Uuid, String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let result = async {
        state
            .authorize(caller.user_id, environment_id, ResourceFamily::Gcs, "objects.get")
            .await?;

        let bucket_row = bucket_row(&state, &bucket, environment_id).await?;
        let namespace = bucket_row
            .object_store_namespace
            .clone()
            .ok_or_else(|| EmulationError::Internal("bucket row has no namespace".into()))?;

        let row = state
            .resources
            .get(ResourceFamily::Gcs, &format!("{bucket}/{object}"))
            .await?
            .ok_or_else(|| EmulationError::NotFound(format!("object {object}")))?;

        if params.get("alt").map(String::as_str) == Some("media") {
            let body = state.object_store.get_object(&namespace, &format!("{bucket}/{object}")).await?;
            Ok(GetOutcome::Media(body))
        } else {
            Ok(GetOutcome::Metadata(row))
        }
    }
    .await;

    match result {
        Ok(GetOutcome::Metadata(row)) => Json(object_json(&row)).into_response(),
        Ok(GetOutcome::Media(body)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/octet-stream")],
            body,
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

async fn list_objects(
    State(state): State<EmulationState>,
    caller: CallerContext,
    Path((environment_id, bucket)): Path<(Uuid, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let result = async {
        state
            .authorize(caller.user_id, environment_id, ResourceFamily::Gcs, "objects.list")
            .await?;
        bucket_row(&state, &bucket, environment_id).await?;

        let prefix = params.get("prefix").cloned().unwrap_or_default();
        let mut objects: Vec<EmulatedResource> = state
            .resources
            .list(environment_id, ResourceFamily::Gcs, "object")
            .await?
            .into_iter()
            .filter(|o| o.attr_str("bucket") == Some(bucket.as_str()))
            .filter(|o| o.attr_str("object").is_some_and(|k| k.starts_with(prefix.as_str())))
            .collect();
        objects.sort_by(|a, b| a.attr_str("object").cmp(&b.attr_str("object")));
        Ok(objects)
    }
    .await;

    match result {
        Ok(objects) => Json(json!({
            "kind": "storage#objects",
            "items": objects.iter().map(object_json).collect::<Vec<_>>(),
        }))
        .into_response(),
        Err(e) => error_response(&e),
    }
}
