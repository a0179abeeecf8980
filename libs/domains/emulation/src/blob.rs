//! Azure Blob Storage translator.
//!
//! Supported operations: Create Container, Delete Container, List
//! Containers, Put Blob, Get Blob, Delete Blob, List Blobs. Azure's
//! container/blob verbs are distinguished by query parameters
//! (`restype=container`, `comp=list`) rather than the path shape, so the
//! container routes inspect them explicitly. Backing model shared with
//! the S3/GCS translators.

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
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    error::{EmulationError, EmulationResult},
    models::{EmulatedResource, ResourceFamily},
    s3::etag_of,
    state::EmulationState,
    wire::xml_escape,
};

pub fn router() -> Router<EmulationState> {
    Router::new()
        .route("/", get(list_containers))
        .route(
            "/{container}",
            get(list_blobs).put(create_container).delete(delete_container),
        )
        .route(
            "/{container}/{*blob}",
            get(get_blob).put(put_blob).delete(delete_blob),
        )
        .fallback(not_implemented)
}

async fn not_implemented() -> Response {
    error_response(&EmulationError::NotImplemented(
        "operation not supported by this emulator".into(),
    ))
}

fn xml_response(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, "application/xml")], body).into_response()
}

pub fn error_response(error: &EmulationError) -> Response {
    let code = match error {
        EmulationError::NotFound(what) if what.starts_with("container") => "ContainerNotFound",
        EmulationError::NotFound(_) => "BlobNotFound",
        EmulationError::Forbidden(_) => "AuthorizationFailure",
        EmulationError::Conflict(_) => "ContainerAlreadyExists",
        EmulationError::InvalidRequest(_) => "InvalidQueryParameterValue",
        EmulationError::NotImplemented(_) => "UnsupportedHttpVerb",
        EmulationError::TooManyRequests(_) => "ServerBusy",
        EmulationError::Timeout(_) => "OperationTimedOut",
        EmulationError::Internal(_) => "InternalError",
    };

    xml_response(
        error.status_code(),
        format!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<Error><Code>{code}</Code><Message>{}</Message></Error>",
            xml_escape(&error.to_string())
        ),
    )
}

async fn container_row(
    state: &EmulationState,
    container: &str,
    environment_id: Uuid,
) -> EmulationResult<EmulatedResource> {
    let row = state
        .resources
        .get(ResourceFamily::Blob, container)
        .await?
        .ok_or_else(|| EmulationError::NotFound(format!("container {container}")))?;
    if row.environment_id != environment_id {
        return Err(EmulationError::NotFound(format!("container {container}")));
    }
    Ok(row)
}

async fn list_containers(
    State(state): State<EmulationState>,
    caller: CallerContext,
    Path(environment_id): Path<Uuid>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if params.get("comp").map(String::as_str) != Some("list") {
        return not_implemented().await;
    }

    let result = async {
        state
            .authorize(caller.user_id, environment_id, ResourceFamily::Blob, "ListContainers")
            .await?;
        state.resources.list(environment_id, ResourceFamily::Blob, "container").await
    }
    .await;

    match result {
        Ok(containers) => {
            let entries: String = containers
                .iter()
                .map(|c| format!("<Container><Name>{}</Name></Container>", xml_escape(&c.external_id)))
                .collect();
            xml_response(
                StatusCode::OK,
                format!(
                    "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<EnumerationResults><Containers>{entries}</Containers></EnumerationResults>"
                ),
            )
        }
        Err(e) => error_response(&e),
    }
}

async fn create_container(
    State(state): State<EmulationState>,
    caller: CallerContext,
    Path((environment_id, container)): Path<(Uuid, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if params.get("restype").map(String::as_str) != Some("container") {
        return not_implemented().await;
    }

    let result = async {
        state
            .authorize(caller.user_id, environment_id, ResourceFamily::Blob, "CreateContainer")
            .await?;

        let namespace = state.storage_namespace(environment_id, ServiceKind::AzureBlob).await?;

        if state.resources.get(ResourceFamily::Blob, &container).await?.is_some() {
            return Err(EmulationError::Conflict(format!(
                "container {container} already exists"
            )));
        }

        let mut row = EmulatedResource::new(environment_id, ResourceFamily::Blob, "container", &container);
        row.object_store_namespace = Some(namespace);
        state.resources.create(row).await?;
        Ok(())
    }
    .await;

    match result {
        Ok(()) => StatusCode::CREATED.into_response(),
        Err(e) => error_response(&e),
    }
}

async fn delete_container(
    State(state): State<EmulationState>,
    caller: CallerContext,
    Path((environment_id, container)): Path<(Uuid, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if params.get("restype").map(String::as_str) != Some("container") {
        return not_implemented().await;
    }

    let result = async {
        state
            .authorize(caller.user_id, environment_id, ResourceFamily::Blob, "DeleteContainer")
            .await?;
        let row = container_row(&state, &container, environment_id).await?;

        // Azure deletes non-empty containers; drop the blob rows with it.
        let blobs = state.resources.list(environment_id, ResourceFamily::Blob, "blob").await?;
        for blob in blobs.iter().filter(|b| b.attr_str("container") == Some(container.as_str())) {
            if let Some(namespace) = &row.object_store_namespace {
                let key = format!("{container}/{}", blob.attr_str("blob").unwrap_or_default());
                let _ = state.object_store.delete_object(namespace, &key).await;
            }
            state.resources.delete(blob.id).await?;
        }

        state.resources.delete(row.id).await
    }
    .await;

    match result {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => error_response(&e),
    }
}

async fn put_blob(
    State(state): State<EmulationState>,
    caller: CallerContext,
    Path((environment_id, container, blob)): Path<(Uuid, String, String)>,
    body: Bytes,
) -> Response {
    let result = async {
        state
            .authorize(caller.user_id, environment_id, ResourceFamily::Blob, "PutBlob")
            .await?;

        let container_row = container_row(&state, &container, environment_id).await?;
        let namespace = container_row
            .object_store_namespace
            .clone()
            .ok_or_else(|| EmulationError::Internal("container row has no namespace".into()))?;

        state
            .object_store
            .put_object(&namespace, &format!("{container}/{blob}"), body.to_vec())
            .await?;

        let external_id = format!("{container}/{blob}");
        let attributes = serde_json::json!({
            "container": container,
            "blob": blob,
            "size": body.len(),
            "etag": etag_of(&body),
        });

        match state.resources.get(ResourceFamily::Blob, &external_id).await? {
            Some(mut existing) => {
                existing.attributes = attributes;
                state.resources.update(existing).await?;
            }
            None => {
                let mut row = EmulatedResource::new(environment_id, ResourceFamily::Blob, "blob", external_id);
                row.object_store_namespace = Some(namespace);
                row = row.with_attributes(attributes);
                state.resources.create(row).await?;
            }
        }
        Ok(())
    }
    .await;

    match result {
        Ok(()) => StatusCode::CREATED.into_response(),
        Err(e) => error_response(&e),
    }
}

async fn get_blob(
    State(state): State<EmulationState>,
    caller: CallerContext,
    Path((environment_id, container, blob)): Path<(Uuid, String, String)>,
) -> Response {
    let result = async {
        state
            .authorize(caller.user_id, environment_id, ResourceFamily::Blob, "GetBlob")
            .await?;

        let container_row = container_row(&state, &container, environment_id).await?;
        let namespace = container_row
            .object_store_namespace
            .clone()
            .ok_or_else(|| EmulationError::Internal("container row has no namespace".into()))?;

        state
            .resources
            .get(ResourceFamily::Blob, &format!("{container}/{blob}"))
            .await?
            .ok_or_else(|| EmulationError::NotFound(format!("blob {blob}")))?;

        Ok(state.object_store.get_object(&namespace, &format!("{container}/{blob}")).await?)
    }
    .await;

    match result {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/octet-stream")],
            body,
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

async fn delete_blob(
    State(state): State<EmulationState>,
    caller: CallerContext,
    Path((environment_id, container, blob)): Path<(Uuid, String, String)>,
) -> Response {
    let result = async {
        state
            .authorize(caller.user_id, environment_id, ResourceFamily::Blob, "DeleteBlob")
            .await?;

        let container_row = container_row(&state, &container, environment_id).await?;
        let namespace = container_row
            .object_store_namespace
            .clone()
            .ok_or_else(|| EmulationError::Internal("container row has no namespace".into()))?;

        if let Some(row) = state
            .resources
            .get(ResourceFamily::Blob, &format!("{container}/{blob}"))
            .await?
        {
            state.resources.delete(row.id).await?;
        }
        state
            .object_store
            .delete_object(&namespace, &format!("{container}/{blob}"))
            .await?;
        Ok(())
    }
    .await;

    match result {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => error_response(&e),
    }
}

async fn list_blobs(
    State(state): State<EmulationState>,
    caller: CallerContext,
    Path((environment_id, container)): Path<(Uuid, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if params.get("restype").map(String::as_str) != Some("container")
        || params.get("comp").map(String::as_str) != Some("list")
    {
        return not_implemented().await;
    }

    let result = async {
        state
            .authorize(caller.user_id, environment_id, ResourceFamily::Blob, "ListBlobs")
            .await?;
        container_row(&state, &container, environment_id).await?;

        let mut blobs: Vec<EmulatedResource> = state
            .resources
            .list(environment_id, ResourceFamily::Blob, "blob")
            .await?
            .into_iter()
            .filter(|b| b.attr_str("container") == Some(container.as_str()))
            .collect();
        blobs.sort_by(|a, b| a.attr_str("blob").cmp(&b.attr_str("blob")));
        Ok(blobs)
    }
    .await;

    match result {
        Ok(blobs) => {
            let entries: String = blobs
                .iter()
                .map(|b| {
                    format!(
                        "<Blob><Name>{}</Name><Properties><Content-Length>{}</Content-Length></Properties></Blob>",
                        xml_escape(b.attr_str("blob").unwrap_or_default()),
                        b.attr_i64("size").unwrap_or(0)
                    )
                })
                .collect();
            xml_response(
                StatusCode::OK,
                format!(
                    "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<EnumerationResults><Blobs>{entries}</Blobs></EnumerationResults>"
                ),
            )
        }
        Err(e) => error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::harness;
    use axum::body::Body;
    use axum::http::Request;
    use domain_service_instances::ServiceInstance;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app(state: EmulationState) -> Router {
        Router::new()
            .nest("/{environment_id}/azure/blob", super::router())
            .with_state(state)
    }

    async fn seed_blob_instance(h: &crate::testing::TestHarness) {
        let namespace = domain_service_instances::namespace_for(h.environment_id, ServiceKind::AzureBlob);
        h.object_store.create_namespace(&namespace).await.unwrap();
        let mut instance = ServiceInstance::new(h.environment_id, ServiceKind::AzureBlob);
        instance.object_store_namespace = Some(namespace);
        instance.mark_running();
        h.instances.rows.lock().unwrap().push(instance);
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
    async fn container_and_blob_round_trip() {
        let h = harness().await;
        seed_blob_instance(&h).await;
        let app = app(h.state.clone());
        let base = format!("/{}/azure/blob", h.environment_id);

        let response = app
            .clone()
            .oneshot(request(h.owner, "PUT", &format!("{base}/logs?restype=container"), b""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .clone()
            .oneshot(request(h.owner, "PUT", &format!("{base}/logs/2026/app.log"), b"line"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .clone()
            .oneshot(request(h.owner, "GET", &format!("{base}/logs/2026/app.log"), b""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"line");

        let response = app
            .clone()
            .oneshot(request(
                h.owner,
                "GET",
                &format!("{base}/logs?restype=container&comp=list"),
                b"",
            ))
            .await
            .unwrap();
        let listing = String::from_utf8(response.into_body().collect().await.unwrap().to_bytes().to_vec()).unwrap();
        assert!(listing.contains("<Name>2026/app.log</Name>"));
    }

    #[tokio::test]
    async fn missing_container_is_container_not_found() {
        let h = harness().await;
        seed_blob_instance(&h).await;
        let app = app(h.state.clone());

        let response = app
            .oneshot(request(
                h.owner,
                "GET",
                &format!("/{}/azure/blob/ghost/b", h.environment_id),
                b"",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = String::from_utf8(response.into_body().collect().await.unwrap().to_bytes().to_vec()).unwrap();
        assert!(body.contains("<Code>ContainerNotFound</Code>"));
    }
}
