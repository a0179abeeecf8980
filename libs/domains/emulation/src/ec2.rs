//! EC2-like compute translator (AWS query protocol).
//!
//! Supported actions: RunInstances, DescribeInstances, StartInstances,
//! StopInstances, TerminateInstances. Instances are synthesized rows:
//! an `i-…` id, a private IPv4 in 10.0.0.0/16, and the state machine
//! pending → running → stopping → stopped / terminated. No VM or
//! container is launched. Transitional states settle on the next read,
//! which is how a poll-the-API client observes them settle in real EC2.
//! Any other action answers with EC2's `InvalidAction` envelope.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use axum_helpers::CallerContext;
use chrono::Utc;
use rand::Rng;
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    error::{EmulationError, EmulationResult},
    models::{EmulatedResource, ResourceFamily},
    state::EmulationState,
    wire::{form_list, parse_form, xml_escape},
};

pub fn router() -> Router<EmulationState> {
    Router::new().route("/", post(dispatch))
}

fn xml_response(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, "application/xml")], body).into_response()
}

pub fn error_response(error: &EmulationError) -> Response {
    let code = match error {
        EmulationError::NotFound(_) => "InvalidInstanceID.NotFound",
        EmulationError::Forbidden(_) => "UnauthorizedOperation",
        EmulationError::Conflict(_) => "IncorrectInstanceState",
        EmulationError::InvalidRequest(_) => "InvalidParameterValue",
        EmulationError::NotImplemented(_) => "InvalidAction",
        EmulationError::TooManyRequests(_) => "RequestLimitExceeded",
        EmulationError::Timeout(_) => "RequestExpired",
        EmulationError::Internal(_) => "InternalError",
    };

    xml_response(
        error.status_code(),
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Response><Errors><Error><Code>{code}</Code><Message>{}</Message></Error></Errors></Response>",
            xml_escape(&error.to_string())
        ),
    )
}

fn new_instance_id() -> String {
    format!("i-{}", &Uuid::now_v7().simple().to_string()[..17])
}

fn private_ip() -> String {
    let mut rng = rand::rng();
    format!("10.0.{}.{}", rng.random_range(0..=255u8), rng.random_range(1..=254u8))
}

/// pending and stopping are observed once, then settle.
fn settle_state(state: &str) -> Option<&'static str> {
    match state {
        "pending" => Some("running"),
        "stopping" => Some("stopped"),
        _ => None,
    }
}

fn instance_xml(row: &EmulatedResource) -> String {
    let public_ip = row
        .attr_str("public_ip")
        .map(|ip| format!("<ipAddress>{ip}</ipAddress>"))
        .unwrap_or_default();
    format!(
        "<item><instanceId>{}</instanceId><instanceType>{}</instanceType><imageId>{}</imageId><privateIpAddress>{}</privateIpAddress>{public_ip}<instanceState><name>{}</name></instanceState><launchTime>{}</launchTime></item>",
        xml_escape(&row.external_id),
        xml_escape(row.attr_str("instance_type").unwrap_or("t2.micro")),
        xml_escape(row.attr_str("image_id").unwrap_or_default()),
        row.attr_str("private_ip").unwrap_or_default(),
        row.attr_str("state").unwrap_or("pending"),
        row.attr_str("launch_time").unwrap_or_default(),
    )
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
            .authorize(caller.user_id, environment_id, ResourceFamily::Ec2, &action)
            .await?;

        match action.as_str() {
            "RunInstances" => run_instances(&state, environment_id, &form).await,
            "DescribeInstances" => describe_instances(&state, environment_id, &form).await,
            "StartInstances" => change_state(&state, environment_id, &form, "StartInstances").await,
            "StopInstances" => change_state(&state, environment_id, &form, "StopInstances").await,
            "TerminateInstances" => change_state(&state, environment_id, &form, "TerminateInstances").await,
            other => Err(EmulationError::NotImplemented(format!("action {other}"))),
        }
    }
    .await;

    match result {
        Ok(body) => xml_response(StatusCode::OK, body),
        Err(e) => error_response(&e),
    }
}

async fn run_instances(
    state: &EmulationState,
    environment_id: Uuid,
    form: &HashMap<String, String>,
) -> EmulationResult<String> {
    let image_id = form.get("ImageId").cloned().unwrap_or_else(|| "ami-mockfactory".into());
    let instance_type = form.get("InstanceType").cloned().unwrap_or_else(|| "t2.micro".into());
    let count: usize = form
        .get("MinCount")
        .and_then(|c| c.parse().ok())
        .filter(|c| (1..=16).contains(c))
        .unwrap_or(1);

    let mut items = String::new();
    for _ in 0..count {
        let row = EmulatedResource::new(environment_id, ResourceFamily::Ec2, "instance", new_instance_id())
            .with_attributes(serde_json::json!({
                "state": "pending",
                "image_id": image_id,
                "instance_type": instance_type,
                "private_ip": private_ip(),
                "launch_time": Utc::now().to_rfc3339(),
            }));
        let row = state.resources.create(row).await?;
        items.push_str(&instance_xml(&row));
    }

    Ok(format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<RunInstancesResponse><instancesSet>{items}</instancesSet></RunInstancesResponse>"
    ))
}

async fn describe_instances(
    state: &EmulationState,
    environment_id: Uuid,
    form: &HashMap<String, String>,
) -> EmulationResult<String> {
    let filter_ids = form_list(form, "InstanceId");
    let rows = state.resources.list(environment_id, ResourceFamily::Ec2, "instance").await?;

    let mut items = String::new();
    for mut row in rows {
        if !filter_ids.is_empty() && !filter_ids.contains(&row.external_id) {
            continue;
        }
        if let Some(settled) = row.attr_str("state").and_then(settle_state) {
            row.set_attr("state", serde_json::json!(settled));
            row = state.resources.update(row).await?;
        }
        items.push_str(&instance_xml(&row));
    }

    Ok(format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<DescribeInstancesResponse><reservationSet><item><instancesSet>{items}</instancesSet></item></reservationSet></DescribeInstancesResponse>"
    ))
}

async fn change_state(
    state: &EmulationState,
    environment_id: Uuid,
    form: &HashMap<String, String>,
    action: &str,
) -> EmulationResult<String> {
    let ids = form_list(form, "InstanceId");
    if ids.is_empty() {
        return Err(EmulationError::InvalidRequest("InstanceId.1 is required".into()));
    }

    let mut items = String::new();
    for id in ids {
        let mut row = state
            .resources
            .get(ResourceFamily::Ec2, &id)
            .await?
            .filter(|r| r.environment_id == environment_id)
            .ok_or_else(|| EmulationError::NotFound(format!("instance {id}")))?;

        let previous = row.attr_str("state").unwrap_or("pending").to_string();
        let next = match (action, previous.as_str()) {
            (_, "terminated") => "terminated",
            ("TerminateInstances", _) => "terminated",
            ("StopInstances", "running" | "pending") => "stopping",
            ("StopInstances", other) => other,
            ("StartInstances", "stopped" | "stopping") => "pending",
            ("StartInstances", other) => other,
            (_, other) => other,
        }
        .to_string();

        row.set_attr("state", serde_json::json!(next));
        let row = state.resources.update(row).await?;

        items.push_str(&format!(
            "<item><instanceId>{}</instanceId><previousState><name>{previous}</name></previousState><currentState><name>{next}</name></currentState></item>",
            xml_escape(&row.external_id)
        ));
    }

    let tag = match action {
        "StopInstances" => "StopInstancesResponse",
        "StartInstances" => "StartInstancesResponse",
        _ => "TerminateInstancesResponse",
    };
    Ok(format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<{tag}><instancesSet>{items}</instancesSet></{tag}>"
    ))
}
