//! SQS translator (AWS query protocol).
//!
//! Supported actions: CreateQueue, GetQueueUrl, ListQueues, DeleteQueue,
//! SendMessage, ReceiveMessage, DeleteMessage, ChangeMessageVisibility.
//! Messages are rows with a `visible_at` timestamp; ReceiveMessage
//! atomically claims a batch (pushing `visible_at` forward and minting a
//! fresh receipt handle), so delivery is at-least-once with redelivery
//! when a handle expires undeleted. Standard and FIFO queues share the
//! implementation; FIFO only pins delivery to insertion order, which the
//! single-node store provides anyway.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use axum_helpers::CallerContext;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    error::{EmulationError, EmulationResult},
    models::{EmulatedResource, ResourceFamily},
    state::EmulationState,
    wire::{parse_form, xml_escape},
};

pub const DEFAULT_VISIBILITY_SECONDS: i64 = 30;
const MAX_RECEIVE_BATCH: usize = 10;

pub fn router() -> Router<EmulationState> {
    Router::new().route("/", post(dispatch))
}

/// Claims a message for one receiver: pushes visibility forward, mints a
/// fresh receipt handle, bumps the delivery counter. Shared with the
/// repository implementations so the claim is identical everywhere.
pub fn stamp_received(message: &mut EmulatedResource, visible_until: DateTime<Utc>) {
    message.set_attr("visible_at", serde_json::json!(visible_until.to_rfc3339()));
    message.set_attr(
        "receipt_handle",
        serde_json::json!(Uuid::now_v7().simple().to_string()),
    );
    let count = message.attr_i64("receive_count").unwrap_or(0) + 1;
    message.set_attr("receive_count", serde_json::json!(count));
}

fn xml_response(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, "application/xml")], body).into_response()
}

pub fn error_response(error: &EmulationError) -> Response {
    let code = match error {
        EmulationError::NotFound(what) if what.starts_with("queue") => "AWS.SimpleQueueService.NonExistentQueue",
        EmulationError::NotFound(_) => "ReceiptHandleIsInvalid",
        EmulationError::Forbidden(_) => "AccessDenied",
        EmulationError::Conflict(_) => "QueueAlreadyExists",
        EmulationError::InvalidRequest(_) => "InvalidParameterValue",
        EmulationError::NotImplemented(_) => "InvalidAction",
        EmulationError::TooManyRequests(_) => "RequestThrottled",
        EmulationError::Timeout(_) => "RequestExpired",
        EmulationError::Internal(_) => "InternalError",
    };

    xml_response(
        error.status_code(),
        format!(
            "<?xml version=\"1.0\"?>\n<ErrorResponse><Error><Code>{code}</Code><Message>{}</Message></Error></ErrorResponse>",
            xml_escape(&error.to_string())
        ),
    )
}

fn queue_url(state: &EmulationState, environment_id: Uuid, name: &str) -> String {
    format!("https://sqs.{}/{environment_id}/{name}", state.config.base_domain)
}

async fn queue_row(state: &EmulationState, environment_id: Uuid, url: &str) -> EmulationResult<EmulatedResource> {
    state
        .resources
        .get(ResourceFamily::Sqs, url)
        .await?
        .filter(|row| row.environment_id == environment_id)
        .ok_or_else(|| EmulationError::NotFound(format!("queue {url}")))
}

async fn dispatch(
    State(state): State<EmulationState>,
    caller: CallerContext,
    Path(environment_id): Path<Uuid>,
    body: String,
) -> Response {
    let form = parse_form(&body);
    let action = form.get("Action").cloned().unwrap_or_default();

    let result = async {
        state
            .authorize(caller.user_id, environment_id, ResourceFamily::Sqs, &action)
            .await?;

        match action.as_str() {
            "CreateQueue" => create_queue(&state, environment_id, &form).await,
            "GetQueueUrl" => get_queue_url(&state, environment_id, &form).await,
            "ListQueues" => list_queues(&state, environment_id).await,
            "DeleteQueue" => delete_queue(&state, environment_id, &form).await,
            "SendMessage" => send_message(&state, environment_id, &form).await,
            "ReceiveMessage" => receive_message(&state, environment_id, &form).await,
            "DeleteMessage" => delete_message(&state, environment_id, &form).await,
            "ChangeMessageVisibility" => change_visibility(&state, environment_id, &form).await,
            other => Err(EmulationError::NotImplemented(format!("action {other}"))),
        }
    }
    .await;

    match result {
        Ok(body) => xml_response(StatusCode::OK, body),
        Err(e) => error_response(&e),
    }
}

fn required<'a>(form: &'a HashMap<String, String>, field: &str) -> EmulationResult<&'a str> {
    form.get(field)
        .map(String::as_str)
        .ok_or_else(|| EmulationError::InvalidRequest(format!("{field} is required")))
}

/// `Attribute.N.Name`/`Attribute.N.Value` pairs of the query protocol.
fn attribute(form: &HashMap<String, String>, name: &str) -> Option<String> {
    for index in 1.. {
        match form.get(&format!("Attribute.{index}.Name")) {
            Some(key) if key == name => return form.get(&format!("Attribute.{index}.Value")).cloned(),
            Some(_) => continue,
            None => return None,
        }
    }
    None
}

async fn create_queue(
    state: &EmulationState,
    environment_id: Uuid,
    form: &HashMap<String, String>,
) -> EmulationResult<String> {
    let name = required(form, "QueueName")?;
    let url = queue_url(state, environment_id, name);

    if state.resources.get(ResourceFamily::Sqs, &url).await?.is_none() {
        let fifo = name.ends_with(".fifo")
            || attribute(form, "FifoQueue").as_deref() == Some("true");
        let visibility = attribute(form, "VisibilityTimeout")
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(DEFAULT_VISIBILITY_SECONDS);

        let row = EmulatedResource::new(environment_id, ResourceFamily::Sqs, "queue", &url).with_attributes(
            serde_json::json!({
                "name": name,
                "fifo": fifo,
                "visibility_timeout": visibility,
            }),
        );
        state.resources.create(row).await?;
    }

    Ok(format!(
        "<?xml version=\"1.0\"?>\n<CreateQueueResponse><CreateQueueResult><QueueUrl>{}</QueueUrl></CreateQueueResult></CreateQueueResponse>",
        xml_escape(&url)
    ))
}

async fn get_queue_url(
    state: &EmulationState,
    environment_id: Uuid,
    form: &HashMap<String, String>,
) -> EmulationResult<String> {
    let name = required(form, "QueueName")?;
    let url = queue_url(state, environment_id, name);
    queue_row(state, environment_id, &url).await?;

    Ok(format!(
        "<?xml version=\"1.0\"?>\n<GetQueueUrlResponse><GetQueueUrlResult><QueueUrl>{}</QueueUrl></GetQueueUrlResult></GetQueueUrlResponse>",
        xml_escape(&url)
    ))
}

async fn list_queues(state: &EmulationState, environment_id: Uuid) -> EmulationResult<String> {
    let queues = state.resources.list(environment_id, ResourceFamily::Sqs, "queue").await?;
    let urls: String = queues
        .iter()
        .map(|q| format!("<QueueUrl>{}</QueueUrl>", xml_escape(&q.external_id)))
        .collect();

    Ok(format!(
        "<?xml version=\"1.0\"?>\n<ListQueuesResponse><ListQueuesResult>{urls}</ListQueuesResult></ListQueuesResponse>"
    ))
}

async fn delete_queue(
    state: &EmulationState,
    environment_id: Uuid,
    form: &HashMap<String, String>,
) -> EmulationResult<String> {
    let url = required(form, "QueueUrl")?;
    let row = queue_row(state, environment_id, url).await?;

    let messages = state.resources.list(environment_id, ResourceFamily::Sqs, "message").await?;
    for message in messages.iter().filter(|m| m.attr_str("queue_url") == Some(url)) {
        state.resources.delete(message.id).await?;
    }
    state.resources.delete(row.id).await?;

    Ok("<?xml version=\"1.0\"?>\n<DeleteQueueResponse/>".to_string())
}

async fn send_message(
    state: &EmulationState,
    environment_id: Uuid,
    form: &HashMap<String, String>,
) -> EmulationResult<String> {
    let url = required(form, "QueueUrl")?;
    let body = required(form, "MessageBody")?;
    queue_row(state, environment_id, url).await?;

    let message_id = Uuid::now_v7().to_string();
    let row = EmulatedResource::new(environment_id, ResourceFamily::Sqs, "message", &message_id).with_attributes(
        serde_json::json!({
            "queue_url": url,
            "body": body,
            "visible_at": Utc::now().to_rfc3339(),
            "receive_count": 0,
        }),
    );
    state.resources.create(row).await?;

    Ok(format!(
        "<?xml version=\"1.0\"?>\n<SendMessageResponse><SendMessageResult><MessageId>{message_id}</MessageId></SendMessageResult></SendMessageResponse>"
    ))
}

async fn receive_message(
    state: &EmulationState,
    environment_id: Uuid,
    form: &HashMap<String, String>,
) -> EmulationResult<String> {
    let url = required(form, "QueueUrl")?;
    let queue = queue_row(state, environment_id, url).await?;

    let max = form
        .get("MaxNumberOfMessages")
        .and_then(|m| m.parse::<usize>().ok())
        .unwrap_or(1)
        .min(MAX_RECEIVE_BATCH);
    let visibility = form
        .get("VisibilityTimeout")
        .and_then(|v| v.parse::<i64>().ok())
        .or(queue.attr_i64("visibility_timeout"))
        .unwrap_or(DEFAULT_VISIBILITY_SECONDS);

    let claimed = state
        .resources
        .claim_queue_messages(environment_id, url, max, Duration::seconds(visibility))
        .await?;

    let messages: String = claimed
        .iter()
        .map(|m| {
            format!(
                "<Message><MessageId>{}</MessageId><ReceiptHandle>{}</ReceiptHandle><Body>{}</Body></Message>",
                xml_escape(&m.external_id),
                xml_escape(m.attr_str("receipt_handle").unwrap_or_default()),
                xml_escape(m.attr_str("body").unwrap_or_default()),
            )
        })
        .collect();

    Ok(format!(
        "<?xml version=\"1.0\"?>\n<ReceiveMessageResponse><ReceiveMessageResult>{messages}</ReceiveMessageResult></ReceiveMessageResponse>"
    ))
}

async fn find_by_receipt(
    state: &EmulationState,
    environment_id: Uuid,
    queue_url: &str,
    receipt_handle: &str,
) -> EmulationResult<Option<EmulatedResource>> {
    let messages = state.resources.list(environment_id, ResourceFamily::Sqs, "message").await?;
    Ok(messages.into_iter().find(|m| {
        m.attr_str("queue_url") == Some(queue_url) && m.attr_str("receipt_handle") == Some(receipt_handle)
    }))
}

async fn delete_message(
    state: &EmulationState,
    environment_id: Uuid,
    form: &HashMap<String, String>,
) -> EmulationResult<String> {
    let url = required(form, "QueueUrl")?;
    let handle = required(form, "ReceiptHandle")?;
    queue_row(state, environment_id, url).await?;

    // Deleting with a stale or unknown handle succeeds: the message is
    // gone either way, which is all at-least-once promises.
    if let Some(message) = find_by_receipt(state, environment_id, url, handle).await? {
        state.resources.delete(message.id).await?;
    }

    Ok("<?xml version=\"1.0\"?>\n<DeleteMessageResponse/>".to_string())
}

async fn change_visibility(
    state: &EmulationState,
    environment_id: Uuid,
    form: &HashMap<String, String>,
) -> EmulationResult<String> {
    let url = required(form, "QueueUrl")?;
    let handle = required(form, "ReceiptHandle")?;
    let timeout: i64 = required(form, "VisibilityTimeout")?
        .parse()
        .map_err(|_| EmulationError::InvalidRequest("VisibilityTimeout must be an integer".into()))?;
    queue_row(state, environment_id, url).await?;

    let mut message = find_by_receipt(state, environment_id, url, handle)
        .await?
        .ok_or_else(|| EmulationError::NotFound(format!("receipt handle {handle}")))?;

    message.set_attr(
        "visible_at",
        serde_json::json!((Utc::now() + Duration::seconds(timeout)).to_rfc3339()),
    );
    state.resources.update(message).await?;

    Ok("<?xml version=\"1.0\"?>\n<ChangeMessageVisibilityResponse/>".to_string())
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
        Router::new().nest("/{environment_id}/aws/sqs", super::router()).with_state(state)
    }

    async fn call(app: &Router, owner: Uuid, environment_id: Uuid, form: &str) -> (StatusCode, String) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/{environment_id}/aws/sqs/"))
                    .header("x-mockfactory-user-id", owner.to_string())
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from(form.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = String::from_utf8(response.into_body().collect().await.unwrap().to_bytes().to_vec()).unwrap();
        (status, body)
    }

    async fn create_queue(app: &Router, owner: Uuid, environment_id: Uuid) -> String {
        let (status, body) = call(app, owner, environment_id, "Action=CreateQueue&QueueName=jobs").await;
        assert_eq!(status, StatusCode::OK);
        crate::wire::xml_text(&body, "QueueUrl").unwrap().to_string()
    }

    #[tokio::test]
    async fn send_receive_delete_round_trip() {
        let h = harness().await;
        let app = app(h.state.clone());
        let url = create_queue(&app, h.owner, h.environment_id).await;
        let encoded = urlencoding::encode(&url).into_owned();

        let (status, body) = call(
            &app,
            h.owner,
            h.environment_id,
            &format!("Action=SendMessage&QueueUrl={encoded}&MessageBody=job-1"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<MessageId>"));

        let (_, body) = call(
            &app,
            h.owner,
            h.environment_id,
            &format!("Action=ReceiveMessage&QueueUrl={encoded}"),
        )
        .await;
        assert!(body.contains("<Body>job-1</Body>"));
        let handle = crate::wire::xml_text(&body, "ReceiptHandle").unwrap().to_string();

        // in flight: a second receive within the visibility window sees nothing
        let (_, body) = call(
            &app,
            h.owner,
            h.environment_id,
            &format!("Action=ReceiveMessage&QueueUrl={encoded}"),
        )
        .await;
        assert!(!body.contains("<Message>"));

        let (status, _) = call(
            &app,
            h.owner,
            h.environment_id,
            &format!("Action=DeleteMessage&QueueUrl={encoded}&ReceiptHandle={handle}"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        // deleting again with the same handle still succeeds
        let (status, _) = call(
            &app,
            h.owner,
            h.environment_id,
            &format!("Action=DeleteMessage&QueueUrl={encoded}&ReceiptHandle={handle}"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = call(
            &app,
            h.owner,
            h.environment_id,
            &format!("Action=ReceiveMessage&QueueUrl={encoded}"),
        )
        .await;
        assert!(!body.contains("<Message>"));
    }

    #[tokio::test]
    async fn shrinking_visibility_makes_message_receivable_again() {
        let h = harness().await;
        let app = app(h.state.clone());
        let url = create_queue(&app, h.owner, h.environment_id).await;
        let encoded = urlencoding::encode(&url).into_owned();

        call(
            &app,
            h.owner,
            h.environment_id,
            &format!("Action=SendMessage&QueueUrl={encoded}&MessageBody=m"),
        )
        .await;

        let (_, body) = call(
            &app,
            h.owner,
            h.environment_id,
            &format!("Action=ReceiveMessage&QueueUrl={encoded}&VisibilityTimeout=300"),
        )
        .await;
        let handle = crate::wire::xml_text(&body, "ReceiptHandle").unwrap().to_string();

        let (status, _) = call(
            &app,
            h.owner,
            h.environment_id,
            &format!("Action=ChangeMessageVisibility&QueueUrl={encoded}&ReceiptHandle={handle}&VisibilityTimeout=0"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = call(
            &app,
            h.owner,
            h.environment_id,
            &format!("Action=ReceiveMessage&QueueUrl={encoded}"),
        )
        .await;
        assert!(body.contains("<Body>m</Body>"));
    }

    #[tokio::test]
    async fn missing_queue_is_non_existent_queue() {
        let h = harness().await;
        let app = app(h.state.clone());

        let (status, body) = call(
            &app,
            h.owner,
            h.environment_id,
            "Action=SendMessage&QueueUrl=https%3A%2F%2Fsqs.mockfactory.test%2Fnope&MessageBody=x",
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("NonExistentQueue"));
    }
}
