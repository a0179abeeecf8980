//! IAM translator (AWS query protocol).
//!
//! Supported actions: CreateUser, GetUser, ListUsers, DeleteUser,
//! CreateRole, ListRoles, DeleteRole, CreatePolicy, ListPolicies. The
//! records are synthesized and carry no authorization effect anywhere in
//! the control plane; they are persisted alongside the other emulated
//! resources only so environment destruction sweeps them with the rest.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use axum_helpers::CallerContext;
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    error::{EmulationError, EmulationResult},
    models::{EmulatedResource, ResourceFamily},
    state::EmulationState,
    wire::{parse_form, xml_escape},
};

pub fn router() -> Router<EmulationState> {
    Router::new().route("/", post(dispatch))
}

fn xml_response(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, "application/xml")], body).into_response()
}

pub fn error_response(error: &EmulationError) -> Response {
    let code = match error {
        EmulationError::NotFound(_) => "NoSuchEntity",
        EmulationError::Forbidden(_) => "AccessDenied",
        EmulationError::Conflict(_) => "EntityAlreadyExists",
        EmulationError::InvalidRequest(_) => "InvalidInput",
        EmulationError::NotImplemented(_) => "InvalidAction",
        EmulationError::TooManyRequests(_) => "Throttling",
        EmulationError::Timeout(_) => "RequestExpired",
        EmulationError::Internal(_) => "ServiceFailure",
    };

    xml_response(
        error.status_code(),
        format!(
            "<?xml version=\"1.0\"?>\n<ErrorResponse><Error><Type>Sender</Type><Code>{code}</Code><Message>{}</Message></Error></ErrorResponse>",
            xml_escape(&error.to_string())
        ),
    )
}

fn external_id(environment_id: Uuid, kind: &str, name: &str) -> String {
    format!("{environment_id}/{kind}/{name}")
}

fn arn(environment_id: Uuid, kind: &str, name: &str) -> String {
    format!("arn:aws:iam::{environment_id}:{kind}/{name}")
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
            .authorize(caller.user_id, environment_id, ResourceFamily::Iam, &action)
            .await?;

        match action.as_str() {
            "CreateUser" => create_principal(&state, environment_id, &form, "user", "UserName").await,
            "GetUser" => get_principal(&state, environment_id, &form, "user", "UserName").await,
            "ListUsers" => list_principals(&state, environment_id, "user").await,
            "DeleteUser" => delete_principal(&state, environment_id, &form, "user", "UserName").await,
            "CreateRole" => create_principal(&state, environment_id, &form, "role", "RoleName").await,
            "ListRoles" => list_principals(&state, environment_id, "role").await,
            "DeleteRole" => delete_principal(&state, environment_id, &form, "role", "RoleName").await,
            "CreatePolicy" => create_principal(&state, environment_id, &form, "policy", "PolicyName").await,
            "ListPolicies" => list_principals(&state, environment_id, "policy").await,
            other => Err(EmulationError::NotImplemented(format!("action {other}"))),
        }
    }
    .await;

    match result {
        Ok(body) => xml_response(StatusCode::OK, body),
        Err(e) => error_response(&e),
    }
}

fn principal_xml(environment_id: Uuid, kind: &str, row: &EmulatedResource) -> String {
    let name = row.attr_str("name").unwrap_or_default();
    let (open, name_tag, id_tag) = match kind {
        "user" => ("User", "UserName", "UserId"),
        "role" => ("Role", "RoleName", "RoleId"),
        _ => ("Policy", "PolicyName", "PolicyId"),
    };
    format!(
        "<{open}><{name_tag}>{}</{name_tag}><{id_tag}>{}</{id_tag}><Arn>{}</Arn><CreateDate>{}</CreateDate></{open}>",
        xml_escape(name),
        row.id.simple(),
        xml_escape(&arn(environment_id, kind, name)),
        row.created_at.to_rfc3339(),
    )
}

async fn create_principal(
    state: &EmulationState,
    environment_id: Uuid,
    form: &HashMap<String, String>,
    kind: &str,
    name_field: &str,
) -> EmulationResult<String> {
    let name = form
        .get(name_field)
        .ok_or_else(|| EmulationError::InvalidRequest(format!("{name_field} is required")))?;

    let id = external_id(environment_id, kind, name);
    if state.resources.get(ResourceFamily::Iam, &id).await?.is_some() {
        return Err(EmulationError::Conflict(format!("{kind} {name} already exists")));
    }

    let mut attributes = serde_json::json!({ "name": name });
    if let Some(document) = form.get("PolicyDocument") {
        attributes["policy_document"] = serde_json::json!(document);
    }

    let row = EmulatedResource::new(environment_id, ResourceFamily::Iam, kind, id).with_attributes(attributes);
    let row = state.resources.create(row).await?;

    let action = match kind {
        "user" => "CreateUser",
        "role" => "CreateRole",
        _ => "CreatePolicy",
    };
    Ok(format!(
        "<?xml version=\"1.0\"?>\n<{action}Response><{action}Result>{}</{action}Result></{action}Response>",
        principal_xml(environment_id, kind, &row)
    ))
}

async fn get_principal(
    state: &EmulationState,
    environment_id: Uuid,
    form: &HashMap<String, String>,
    kind: &str,
    name_field: &str,
) -> EmulationResult<String> {
    let name = form
        .get(name_field)
        .ok_or_else(|| EmulationError::InvalidRequest(format!("{name_field} is required")))?;

    let row = state
        .resources
        .get(ResourceFamily::Iam, &external_id(environment_id, kind, name))
        .await?
        .ok_or_else(|| EmulationError::NotFound(format!("{kind} {name}")))?;

    Ok(format!(
        "<?xml version=\"1.0\"?>\n<GetUserResponse><GetUserResult>{}</GetUserResult></GetUserResponse>",
        principal_xml(environment_id, kind, &row)
    ))
}

async fn list_principals(state: &EmulationState, environment_id: Uuid, kind: &str) -> EmulationResult<String> {
    let rows = state.resources.list(environment_id, ResourceFamily::Iam, kind).await?;
    let entries: String = rows.iter().map(|r| principal_xml(environment_id, kind, r)).collect();

    let (action, member_tag) = match kind {
        "user" => ("ListUsers", "Users"),
        "role" => ("ListRoles", "Roles"),
        _ => ("ListPolicies", "Policies"),
    };
    Ok(format!(
        "<?xml version=\"1.0\"?>\n<{action}Response><{action}Result><{member_tag}>{entries}</{member_tag}><IsTruncated>false</IsTruncated></{action}Result></{action}Response>"
    ))
}

async fn delete_principal(
    state: &EmulationState,
    environment_id: Uuid,
    form: &HashMap<String, String>,
    kind: &str,
    name_field: &str,
) -> EmulationResult<String> {
    let name = form
        .get(name_field)
        .ok_or_else(|| EmulationError::InvalidRequest(format!("{name_field} is required")))?;

    let row = state
        .resources
        .get(ResourceFamily::Iam, &external_id(environment_id, kind, name))
        .await?
        .ok_or_else(|| EmulationError::NotFound(format!("{kind} {name}")))?;
    state.resources.delete(row.id).await?;

    let action = if kind == "user" { "DeleteUser" } else { "DeleteRole" };
    Ok(format!("<?xml version=\"1.0\"?>\n<{action}Response/>"))
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
        Router::new().nest("/{environment_id}/aws/iam", super::router()).with_state(state)
    }

    async fn call(app: &Router, owner: Uuid, environment_id: Uuid, form: &str) -> (StatusCode, String) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/{environment_id}/aws/iam/"))
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

    #[tokio::test]
    async fn create_list_delete_user() {
        let h = harness().await;
        let app = app(h.state.clone());

        let (status, body) = call(&app, h.owner, h.environment_id, "Action=CreateUser&UserName=ci-bot").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<UserName>ci-bot</UserName>"));

        let (_, body) = call(&app, h.owner, h.environment_id, "Action=ListUsers").await;
        assert!(body.contains("<UserName>ci-bot</UserName>"));

        let (status, _) = call(&app, h.owner, h.environment_id, "Action=DeleteUser&UserName=ci-bot").await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = call(&app, h.owner, h.environment_id, "Action=ListUsers").await;
        assert!(!body.contains("ci-bot"));
    }

    #[tokio::test]
    async fn duplicate_user_is_entity_already_exists() {
        let h = harness().await;
        let app = app(h.state.clone());

        call(&app, h.owner, h.environment_id, "Action=CreateUser&UserName=dup").await;
        let (status, body) = call(&app, h.owner, h.environment_id, "Action=CreateUser&UserName=dup").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body.contains("<Code>EntityAlreadyExists</Code>"));
    }
}
