//! S3 translator.
//!
//! Supported operations: CreateBucket, DeleteBucket, ListBuckets,
//! PutObject, GetObject, DeleteObject, ListObjectsV2 (and the V1 listing
//! for older clients). Anything else answers with S3's `NotImplemented`
//! error shape. Object bytes live in the environment's object-store
//! namespace under `{bucket}/{key}`; bucket rows and per-object metadata
//! (size, ETag) live in the relational store.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use axum_helpers::CallerContext;
use domain_service_instances::ServiceKind;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    error::{EmulationError, EmulationResult},
    models::{EmulatedResource, ResourceFamily},
    state::EmulationState,
    wire::xml_escape,
};

/// State is supplied by the parent router at nest time.
pub fn router() -> Router<EmulationState> {
    Router::new()
        .route("/", get(list_buckets))
        .route("/{bucket}", get(list_objects).put(create_bucket).delete(delete_bucket))
        .route(
            "/{bucket}/{*key}",
            get(get_object).put(put_object).delete(delete_object),
        )
        .fallback(not_implemented)
}

async fn not_implemented() -> Response {
    error_response(&EmulationError::NotImplemented("operation not supported by this emulator".into()))
}

fn xml_response(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, "application/xml")], body).into_response()
}

/// S3's `<Error>` envelope with the family's conventional codes.
pub fn error_response(error: &EmulationError) -> Response {
    let code = match error {
        EmulationError::NotFound(what) if what.starts_with("bucket") => "NoSuchBucket",
        EmulationError::NotFound(what) if what.starts_with("object") => "NoSuchKey",
        EmulationError::NotFound(_) => "NoSuchBucket",
        EmulationError::Forbidden(_) => "AccessDenied",
        EmulationError::Conflict(msg) if msg.contains("not empty") => "BucketNotEmpty",
        EmulationError::Conflict(_) => "BucketAlreadyExists",
        EmulationError::InvalidRequest(_) => "InvalidRequest",
        EmulationError::NotImplemented(_) => "NotImplemented",
        EmulationError::TooManyRequests(_) => "SlowDown",
        EmulationError::Timeout(_) => "RequestTimeout",
        EmulationError::Internal(_) => "InternalError",
    };

    xml_response(
        error.status_code(),
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Error><Code>{code}</Code><Message>{}</Message></Error>",
            xml_escape(&error.to_string())
        ),
    )
}

fn is_valid_bucket_name(name: &str) -> bool {
    (3..=63).contains(&name.len())
        && !name.starts_with('-')
        && !name.ends_with('-')
        && name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
}

pub fn etag_of(body: &[u8]) -> String {
    // Content hash, not MD5: good enough for an emulator's change detection.
    format!("{:x}", Sha256::digest(body))
}

async fn bucket_row(state: &EmulationState, bucket: &str, environment_id: Uuid) -> EmulationResult<EmulatedResource> {
    let row = state
        .resources
        .get(ResourceFamily::S3, bucket)
        .await?
        .ok_or_else(|| EmulationError::NotFound(format!("bucket {bucket}")))?;
    if row.environment_id != environment_id {
        // bucket names are global; another tenant's bucket reads as absent
        return Err(EmulationError::NotFound(format!("bucket {bucket}")));
    }
    Ok(row)
}

async fn list_buckets(
    State(state): State<EmulationState>,
    caller: CallerContext,
    Path(environment_id): Path<Uuid>,
) -> Response {
    let result = async {
        state
            .authorize(caller.user_id, environment_id, ResourceFamily::S3, "ListBuckets")
            .await?;
        state.resources.list(environment_id, ResourceFamily::S3, "bucket").await
    }
    .await;

    match result {
        Ok(buckets) => {
            let entries: String = buckets
                .iter()
                .map(|b| {
                    format!(
                        "<Bucket><Name>{}</Name><CreationDate>{}</CreationDate></Bucket>",
                        xml_escape(&b.external_id),
                        b.created_at.to_rfc3339()
                    )
                })
                .collect();
            xml_response(
                StatusCode::OK,
                format!(
                    "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<ListAllMyBucketsResult><Buckets>{entries}</Buckets></ListAllMyBucketsResult>"
                ),
            )
        }
        Err(e) => error_response(&e),
    }
}

async fn create_bucket(
    State(state): State<EmulationState>,
    caller: CallerContext,
    Path((environment_id, bucket)): Path<(Uuid, String)>,
) -> Response {
    let result = async {
        state
            .authorize(caller.user_id, environment_id, ResourceFamily::S3, "CreateBucket")
            .await?;

        if !is_valid_bucket_name(&bucket) {
            return Err(EmulationError::InvalidRequest(format!(
                "'{bucket}' is not a valid bucket name"
            )));
        }

        let namespace = state.storage_namespace(environment_id, ServiceKind::AwsS3).await?;

        if let Some(existing) = state.resources.get(ResourceFamily::S3, &bucket).await? {
            if existing.environment_id == environment_id {
                return Ok(()); // recreating your own bucket is a no-op
            }
            return Err(EmulationError::Conflict(format!("bucket {bucket} already exists")));
        }

        let mut row = EmulatedResource::new(environment_id, ResourceFamily::S3, "bucket", &bucket);
        row.object_store_namespace = Some(namespace);
        state.resources.create(row).await?;
        Ok(())
    }
    .await;

    match result {
        Ok(()) => StatusCode::OK.into_response(),
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
            .authorize(caller.user_id, environment_id, ResourceFamily::S3, "DeleteBucket")
            .await?;

        let row = bucket_row(&state, &bucket, environment_id).await?;

        let objects = state.resources.list(environment_id, ResourceFamily::S3, "object").await?;
        if objects.iter().any(|o| o.attr_str("bucket") == Some(bucket.as_str())) {
            return Err(EmulationError::Conflict(format!("bucket {bucket} is not empty")));
        }

        state.resources.delete(row.id).await?;
        Ok(())
    }
    .await;

    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e),
    }
}

async fn put_object(
    State(state): State<EmulationState>,
    caller: CallerContext,
    Path((environment_id, bucket, key)): Path<(Uuid, String, String)>,
    body: Bytes,
) -> Response {
    let result = async {
        state
            .authorize(caller.user_id, environment_id, ResourceFamily::S3, "PutObject")
            .await?;

        let bucket_row = bucket_row(&state, &bucket, environment_id).await?;
        let namespace = bucket_row
            .object_store_namespace
            .clone()
            .ok_or_else(|| EmulationError::Internal("bucket row has no namespace".into()))?;

        state
            .object_store
            .put_object(&namespace, &format!("{bucket}/{key}"), body.to_vec())
            .await?;

        let etag = etag_of(&body);
        let external_id = format!("{bucket}/{key}");
        let attributes = serde_json::json!({
            "bucket": bucket,
            "key": key,
            "size": body.len(),
            "etag": etag,
        });

        match state.resources.get(ResourceFamily::S3, &external_id).await? {
            Some(mut existing) => {
                existing.attributes = attributes;
                state.resources.update(existing).await?;
            }
            None => {
                let mut row = EmulatedResource::new(environment_id, ResourceFamily::S3, "object", external_id);
                row.object_store_namespace = Some(namespace);
                row = row.with_attributes(attributes);
                state.resources.create(row).await?;
            }
        }

        Ok(etag)
    }
    .await;

    match result {
        Ok(etag) => (StatusCode::OK, [(header::ETAG, format!("\"{etag}\""))]).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn get_object(
    State(state): State<EmulationState>,
    caller: CallerContext,
    Path((environment_id, bucket, key)): Path<(Uuid, String, String)>,
) -> Response {
    let result = async {
        state
            .authorize(caller.user_id, environment_id, ResourceFamily::S3, "GetObject")
            .await?;

        let bucket_row = bucket_row(&state, &bucket, environment_id).await?;
        let namespace = bucket_row
            .object_store_namespace
            .clone()
            .ok_or_else(|| EmulationError::Internal("bucket row has no namespace".into()))?;

        let row = state
            .resources
            .get(ResourceFamily::S3, &format!("{bucket}/{key}"))
            .await?
            .ok_or_else(|| EmulationError::NotFound(format!("object {key}")))?;

        let body = state.object_store.get_object(&namespace, &format!("{bucket}/{key}")).await?;
        let etag = row.attr_str("etag").unwrap_or_default().to_string();
        Ok((body, etag))
    }
    .await;

    match result {
        Ok((body, etag)) => (
            StatusCode::OK,
            [
                (header::ETAG, format!("\"{etag}\"")),
                (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            ],
            body,
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

async fn delete_object(
    State(state): State<EmulationState>,
    caller: CallerContext,
    Path((environment_id, bucket, key)): Path<(Uuid, String, String)>,
) -> Response {
    let result = async {
        state
            .authorize(caller.user_id, environment_id, ResourceFamily::S3, "DeleteObject")
            .await?;

        let bucket_row = bucket_row(&state, &bucket, environment_id).await?;
        let namespace = bucket_row
            .object_store_namespace
            .clone()
            .ok_or_else(|| EmulationError::Internal("bucket row has no namespace".into()))?;

        // DeleteObject is idempotent: deleting an absent key succeeds.
        if let Some(row) = state.resources.get(ResourceFamily::S3, &format!("{bucket}/{key}")).await? {
            state.resources.delete(row.id).await?;
        }
        state.object_store.delete_object(&namespace, &format!("{bucket}/{key}")).await?;
        Ok(())
    }
    .await;

    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
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
            .authorize(caller.user_id, environment_id, ResourceFamily::S3, "ListObjects")
            .await?;

        bucket_row(&state, &bucket, environment_id).await?;

        let prefix = params.get("prefix").cloned().unwrap_or_default();
        let v2 = params.get("list-type").map(String::as_str) == Some("2");

        let mut objects: Vec<EmulatedResource> = state
            .resources
            .list(environment_id, ResourceFamily::S3, "object")
            .await?
            .into_iter()
            .filter(|o| o.attr_str("bucket") == Some(bucket.as_str()))
            .filter(|o| o.attr_str("key").is_some_and(|k| k.starts_with(prefix.as_str())))
            .collect();
        objects.sort_by(|a, b| a.attr_str("key").cmp(&b.attr_str("key")));

        let contents: String = objects
            .iter()
            .map(|o| {
                format!(
                    "<Contents><Key>{}</Key><Size>{}</Size><ETag>&quot;{}&quot;</ETag><LastModified>{}</LastModified></Contents>",
                    xml_escape(o.attr_str("key").unwrap_or_default()),
                    o.attr_i64("size").unwrap_or(0),
                    o.attr_str("etag").unwrap_or_default(),
                    o.updated_at.to_rfc3339()
                )
            })
            .collect();

        let key_count = if v2 {
            format!("<KeyCount>{}</KeyCount>", objects.len())
        } else {
            String::new()
        };

        Ok(format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<ListBucketResult><Name>{}</Name><Prefix>{}</Prefix>{key_count}<IsTruncated>false</IsTruncated>{contents}</ListBucketResult>",
            xml_escape(&bucket),
            xml_escape(&prefix)
        ))
    }
    .await;

    match result {
        Ok(body) => xml_response(StatusCode::OK, body),
        Err(e) => error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::harness;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app(state: EmulationState) -> Router {
        Router::new().nest("/{environment_id}/aws/s3", super::router()).with_state(state)
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn request(owner: Uuid, method: &str, uri: &str, body: &[u8]) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("x-mockfactory-user-id", owner.to_string())
            .body(Body::from(body.to_vec()))
            .unwrap()
    }

    #[tokio::test]
    async fn put_get_list_round_trip() {
        let h = harness().await;
        let app = app(h.state.clone());
        let base = format!("/{}/aws/s3", h.environment_id);

        let response = app
            .clone()
            .oneshot(request(h.owner, "PUT", &format!("{base}/demo-bucket"), b""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(request(h.owner, "PUT", &format!("{base}/demo-bucket/greeting.txt"), b"hello"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(request(h.owner, "GET", &format!("{base}/demo-bucket/greeting.txt"), b""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "hello");

        let response = app
            .clone()
            .oneshot(request(h.owner, "GET", &format!("{base}/demo-bucket?list-type=2"), b""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let listing = body_string(response).await;
        assert!(listing.contains("<Key>greeting.txt</Key>"));
        assert!(listing.contains("<Size>5</Size>"));
        assert!(listing.contains("<KeyCount>1</KeyCount>"));
    }

    #[tokio::test]
    async fn get_after_delete_is_no_such_key() {
        let h = harness().await;
        let app = app(h.state.clone());
        let base = format!("/{}/aws/s3", h.environment_id);

        app.clone()
            .oneshot(request(h.owner, "PUT", &format!("{base}/demo-bucket"), b""))
            .await
            .unwrap();
        app.clone()
            .oneshot(request(h.owner, "PUT", &format!("{base}/demo-bucket/k"), b"v"))
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(request(h.owner, "DELETE", &format!("{base}/demo-bucket/k"), b""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .clone()
            .oneshot(request(h.owner, "GET", &format!("{base}/demo-bucket/k"), b""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_string(response).await.contains("<Code>NoSuchKey</Code>"));
    }

    #[tokio::test]
    async fn missing_bucket_is_no_such_bucket() {
        let h = harness().await;
        let app = app(h.state.clone());

        let response = app
            .oneshot(request(
                h.owner,
                "GET",
                &format!("/{}/aws/s3/nope/k", h.environment_id),
                b"",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_string(response).await.contains("<Code>NoSuchBucket</Code>"));
    }

    #[tokio::test]
    async fn cross_user_access_is_denied() {
        let h = harness().await;
        let app = app(h.state.clone());
        let stranger = Uuid::now_v7();

        let response = app
            .oneshot(request(
                stranger,
                "GET",
                &format!("/{}/aws/s3", h.environment_id),
                b"",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(body_string(response).await.contains("<Code>AccessDenied</Code>"));
    }

    #[tokio::test]
    async fn bucket_names_are_global_across_environments() {
        let h = harness().await;
        let app = app(h.state.clone());

        // same bucket name claimed by a second environment owned by someone else
        let other_owner = Uuid::now_v7();
        let other_env = {
            let mut env = domain_environments::Environment::new(
                other_owner,
                &domain_environments::CreateEnvironment {
                    name: "other".into(),
                    services: vec![],
                    auto_shutdown_hours: None,
                    auto_delete_hours: None,
                },
            );
            env.mark_running();
            let id = env.id;
            h.environments.rows.lock().unwrap().push(env);
            id
        };
        let namespace = domain_service_instances::namespace_for(other_env, ServiceKind::AwsS3);
        let mut instance = domain_service_instances::ServiceInstance::new(other_env, ServiceKind::AwsS3);
        instance.object_store_namespace = Some(namespace);
        instance.mark_running();
        h.instances.rows.lock().unwrap().push(instance);

        app.clone()
            .oneshot(request(h.owner, "PUT", &format!("/{}/aws/s3/taken", h.environment_id), b""))
            .await
            .unwrap();

        let response = app
            .oneshot(request(other_owner, "PUT", &format!("/{other_env}/aws/s3/taken"), b""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert!(body_string(response).await.contains("<Code>BucketAlreadyExists</Code>"));
    }

    #[tokio::test]
    async fn emulated_call_bumps_last_activity() {
        let h = harness().await;
        let app = app(h.state.clone());

        let before = h.environments.rows.lock().unwrap()[0].last_activity_at;
        app.oneshot(request(h.owner, "GET", &format!("/{}/aws/s3", h.environment_id), b""))
            .await
            .unwrap();
        let after = h.environments.rows.lock().unwrap()[0].last_activity_at;
        assert!(after >= before);
        assert!(after.is_some());
    }
}
