//! DynamoDB translator (JSON 1.0 protocol, `X-Amz-Target` dispatch).
//!
//! Supported operations: CreateTable, DeleteTable, DescribeTable,
//! ListTables, PutItem, GetItem, DeleteItem, Scan. Items are rows keyed
//! by `(table, hash, range)`; reads are strongly consistent because the
//! store is a single relational node. Condition expressions cover
//! attribute_exists / attribute_not_exists and `=`, `<>`, `<`, `<=`,
//! `>`, `>=` on top-level attributes, joined by AND. Any other target
//! answers `UnknownOperationException`.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use axum_helpers::CallerContext;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::{
    error::{EmulationError, EmulationResult},
    models::{EmulatedResource, ResourceFamily},
    state::EmulationState,
};

pub fn router() -> Router<EmulationState> {
    Router::new().route("/", post(dispatch))
}

pub fn error_response(error: &EmulationError) -> Response {
    let type_name = match error {
        EmulationError::NotFound(_) => "ResourceNotFoundException",
        EmulationError::Forbidden(_) => "AccessDeniedException",
        EmulationError::Conflict(msg) if msg.contains("condition") => "ConditionalCheckFailedException",
        EmulationError::Conflict(_) => "ResourceInUseException",
        EmulationError::InvalidRequest(_) => "ValidationException",
        EmulationError::NotImplemented(_) => "UnknownOperationException",
        EmulationError::TooManyRequests(_) => "ProvisionedThroughputExceededException",
        EmulationError::Timeout(_) => "RequestTimeout",
        EmulationError::Internal(_) => "InternalServerError",
    };
    let status = match error {
        // DynamoDB encodes most failures as 400 with a typed payload
        EmulationError::Forbidden(_) => StatusCode::FORBIDDEN,
        EmulationError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
        EmulationError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };
    (
        status,
        Json(json!({
            "__type": format!("com.amazonaws.dynamodb.v20120810#{type_name}"),
            "message": error.to_string(),
        })),
    )
        .into_response()
}

fn table_external_id(environment_id: Uuid, table: &str) -> String {
    format!("{environment_id}/{table}")
}

/// Scalar key component of an AttributeValue (`{"S": "a"}` → `a`).
fn key_component(value: &Value) -> Option<String> {
    let object = value.as_object()?;
    let (type_tag, scalar) = object.iter().next()?;
    match type_tag.as_str() {
        "S" | "N" | "B" => scalar.as_str().map(|s| format!("{type_tag}:{s}")),
        _ => None,
    }
}

fn item_external_id(environment_id: Uuid, table: &str, key_schema: &[Value], item: &Map<String, Value>) -> EmulationResult<String> {
    let mut components = Vec::new();
    for key in key_schema {
        let attribute = key
            .get("AttributeName")
            .and_then(|a| a.as_str())
            .ok_or_else(|| EmulationError::Internal("malformed key schema".into()))?;
        let value = item
            .get(attribute)
            .and_then(key_component)
            .ok_or_else(|| EmulationError::InvalidRequest(format!("missing key attribute {attribute}")))?;
        components.push(value);
    }
    Ok(format!("{environment_id}/{table}/{}", components.join("|")))
}

/// Evaluates a condition expression against the current item (`None` when
/// the item does not exist yet).
pub fn evaluate_condition(
    expression: &str,
    values: &Map<String, Value>,
    item: Option<&Map<String, Value>>,
) -> EmulationResult<bool> {
    for clause in expression.split(" AND ") {
        let clause = clause.trim();

        if let Some(attribute) = clause
            .strip_prefix("attribute_exists(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            if item.is_none_or(|i| !i.contains_key(attribute.trim())) {
                return Ok(false);
            }
            continue;
        }

        if let Some(attribute) = clause
            .strip_prefix("attribute_not_exists(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            if item.is_some_and(|i| i.contains_key(attribute.trim())) {
                return Ok(false);
            }
            continue;
        }

        let mut parts = clause.split_whitespace();
        let (Some(attribute), Some(operator), Some(placeholder)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(EmulationError::InvalidRequest(format!(
                "unsupported condition clause: {clause}"
            )));
        };

        let expected = values
            .get(placeholder)
            .ok_or_else(|| EmulationError::InvalidRequest(format!("missing expression value {placeholder}")))?;
        let Some(actual) = item.and_then(|i| i.get(attribute)) else {
            return Ok(false);
        };

        let ordering = compare_attribute_values(actual, expected)?;
        let holds = match operator {
            "=" => ordering == std::cmp::Ordering::Equal,
            "<>" => ordering != std::cmp::Ordering::Equal,
            "<" => ordering == std::cmp::Ordering::Less,
            "<=" => ordering != std::cmp::Ordering::Greater,
            ">" => ordering == std::cmp::Ordering::Greater,
            ">=" => ordering != std::cmp::Ordering::Less,
            other => {
                return Err(EmulationError::InvalidRequest(format!(
                    "unsupported condition operator: {other}"
                )))
            }
        };
        if !holds {
            return Ok(false);
        }
    }

    Ok(true)
}

fn compare_attribute_values(left: &Value, right: &Value) -> EmulationResult<std::cmp::Ordering> {
    let pair = |value: &Value| -> Option<(String, String)> {
        let object = value.as_object()?;
        let (tag, scalar) = object.iter().next()?;
        Some((tag.clone(), scalar.as_str()?.to_string()))
    };

    let (left_tag, left_value) = pair(left)
        .ok_or_else(|| EmulationError::InvalidRequest("malformed attribute value".into()))?;
    let (right_tag, right_value) = pair(right)
        .ok_or_else(|| EmulationError::InvalidRequest("malformed attribute value".into()))?;

    if left_tag != right_tag {
        return Ok(std::cmp::Ordering::Greater); // different types never match
    }

    if left_tag == "N" {
        let left: f64 = left_value.parse().map_err(|_| EmulationError::InvalidRequest("non-numeric N value".into()))?;
        let right: f64 = right_value.parse().map_err(|_| EmulationError::InvalidRequest("non-numeric N value".into()))?;
        return Ok(left.partial_cmp(&right).unwrap_or(std::cmp::Ordering::Equal));
    }

    Ok(left_value.cmp(&right_value))
}

async fn table_row(state: &EmulationState, environment_id: Uuid, table: &str) -> EmulationResult<EmulatedResource> {
    state
        .resources
        .get(ResourceFamily::Dynamodb, &table_external_id(environment_id, table))
        .await?
        .ok_or_else(|| EmulationError::NotFound(format!("table {table}")))
}

async fn dispatch(
    State(state): State<EmulationState>,
    caller: CallerContext,
    Path(environment_id): Path<Uuid>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let target = headers
        .get("x-amz-target")
        .and_then(|t| t.to_str().ok())
        .and_then(|t| t.split('.').next_back())
        .unwrap_or_default()
        .to_string();

    // DynamoDB's content type is `application/x-amz-json-1.0`, so the body
    // is parsed by hand rather than through the Json extractor.
    let body: Value = match serde_json::from_str(&body) {
        Ok(body) => body,
        Err(e) => {
            return error_response(&EmulationError::InvalidRequest(format!("malformed request body: {e}")));
        }
    };

    let result = async {
        state
            .authorize(caller.user_id, environment_id, ResourceFamily::Dynamodb, &target)
            .await?;

        match target.as_str() {
            "CreateTable" => create_table(&state, environment_id, &body).await,
            "DeleteTable" => delete_table(&state, environment_id, &body).await,
            "DescribeTable" => describe_table(&state, environment_id, &body).await,
            "ListTables" => list_tables(&state, environment_id).await,
            "PutItem" => put_item(&state, environment_id, &body).await,
            "GetItem" => get_item(&state, environment_id, &body).await,
            "DeleteItem" => delete_item(&state, environment_id, &body).await,
            "Scan" => scan(&state, environment_id, &body).await,
            other => Err(EmulationError::NotImplemented(format!("target {other}"))),
        }
    }
    .await;

    match result {
        Ok(body) => Json(body).into_response(),
        Err(e) => error_response(&e),
    }
}

fn required_str<'a>(body: &'a Value, field: &str) -> EmulationResult<&'a str> {
    body.get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| EmulationError::InvalidRequest(format!("{field} is required")))
}

fn table_json(row: &EmulatedResource) -> Value {
    json!({
        "TableName": row.attr_str("name"),
        "TableStatus": "ACTIVE",
        "KeySchema": row.attributes.get("key_schema").cloned().unwrap_or(json!([])),
        "ItemCount": 0,
        "CreationDateTime": row.created_at.timestamp(),
    })
}

async fn create_table(state: &EmulationState, environment_id: Uuid, body: &Value) -> EmulationResult<Value> {
    let table = required_str(body, "TableName")?;
    let key_schema = body
        .get("KeySchema")
        .and_then(|k| k.as_array())
        .filter(|k| !k.is_empty())
        .ok_or_else(|| EmulationError::InvalidRequest("KeySchema is required".into()))?;

    let external_id = table_external_id(environment_id, table);
    if state.resources.get(ResourceFamily::Dynamodb, &external_id).await?.is_some() {
        return Err(EmulationError::Conflict(format!("table {table} already exists")));
    }

    let row = EmulatedResource::new(environment_id, ResourceFamily::Dynamodb, "table", external_id)
        .with_attributes(json!({ "name": table, "key_schema": key_schema }));
    let row = state.resources.create(row).await?;

    Ok(json!({ "TableDescription": table_json(&row) }))
}

async fn delete_table(state: &EmulationState, environment_id: Uuid, body: &Value) -> EmulationResult<Value> {
    let table = required_str(body, "TableName")?;
    let row = table_row(state, environment_id, table).await?;

    let items = state.resources.list(environment_id, ResourceFamily::Dynamodb, "item").await?;
    for item in items.iter().filter(|i| i.attr_str("table") == Some(table)) {
        state.resources.delete(item.id).await?;
    }
    state.resources.delete(row.id).await?;

    Ok(json!({ "TableDescription": table_json(&row) }))
}

async fn describe_table(state: &EmulationState, environment_id: Uuid, body: &Value) -> EmulationResult<Value> {
    let table = required_str(body, "TableName")?;
    let row = table_row(state, environment_id, table).await?;
    Ok(json!({ "Table": table_json(&row) }))
}

async fn list_tables(state: &EmulationState, environment_id: Uuid) -> EmulationResult<Value> {
    let rows = state.resources.list(environment_id, ResourceFamily::Dynamodb, "table").await?;
    let names: Vec<&str> = rows.iter().filter_map(|r| r.attr_str("name")).collect();
    Ok(json!({ "TableNames": names }))
}

async fn put_item(state: &EmulationState, environment_id: Uuid, body: &Value) -> EmulationResult<Value> {
    let table = required_str(body, "TableName")?;
    let table_row = table_row(state, environment_id, table).await?;
    let key_schema = table_row
        .attributes
        .get("key_schema")
        .and_then(|k| k.as_array())
        .cloned()
        .unwrap_or_default();

    let item = body
        .get("Item")
        .and_then(|i| i.as_object())
        .ok_or_else(|| EmulationError::InvalidRequest("Item is required".into()))?;

    let external_id = item_external_id(environment_id, table, &key_schema, item)?;
    let existing = state.resources.get(ResourceFamily::Dynamodb, &external_id).await?;

    if let Some(expression) = body.get("ConditionExpression").and_then(|c| c.as_str()) {
        let values = body
            .get("ExpressionAttributeValues")
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default();
        let current = existing
            .as_ref()
            .and_then(|row| row.attributes.get("item"))
            .and_then(|i| i.as_object());
        if !evaluate_condition(expression, &values, current)? {
            return Err(EmulationError::Conflict("the condition expression failed".into()));
        }
    }

    match existing {
        Some(mut row) => {
            row.set_attr("item", Value::Object(item.clone()));
            state.resources.update(row).await?;
        }
        None => {
            let row = EmulatedResource::new(environment_id, ResourceFamily::Dynamodb, "item", external_id)
                .with_attributes(json!({ "table": table, "item": item }));
            state.resources.create(row).await?;
        }
    }

    Ok(json!({}))
}

async fn get_item(state: &EmulationState, environment_id: Uuid, body: &Value) -> EmulationResult<Value> {
    let table = required_str(body, "TableName")?;
    let table_row = table_row(state, environment_id, table).await?;
    let key_schema = table_row
        .attributes
        .get("key_schema")
        .and_then(|k| k.as_array())
        .cloned()
        .unwrap_or_default();

    let key = body
        .get("Key")
        .and_then(|k| k.as_object())
        .ok_or_else(|| EmulationError::InvalidRequest("Key is required".into()))?;

    let external_id = item_external_id(environment_id, table, &key_schema, key)?;
    match state.resources.get(ResourceFamily::Dynamodb, &external_id).await? {
        Some(row) => Ok(json!({ "Item": row.attributes.get("item").cloned().unwrap_or(json!({})) })),
        None => Ok(json!({})),
    }
}

async fn delete_item(state: &EmulationState, environment_id: Uuid, body: &Value) -> EmulationResult<Value> {
    let table = required_str(body, "TableName")?;
    let table_row = table_row(state, environment_id, table).await?;
    let key_schema = table_row
        .attributes
        .get("key_schema")
        .and_then(|k| k.as_array())
        .cloned()
        .unwrap_or_default();

    let key = body
        .get("Key")
        .and_then(|k| k.as_object())
        .ok_or_else(|| EmulationError::InvalidRequest("Key is required".into()))?;

    let external_id = item_external_id(environment_id, table, &key_schema, key)?;
    let existing = state.resources.get(ResourceFamily::Dynamodb, &external_id).await?;

    if let Some(expression) = body.get("ConditionExpression").and_then(|c| c.as_str()) {
        let values = body
            .get("ExpressionAttributeValues")
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default();
        let current = existing
            .as_ref()
            .and_then(|row| row.attributes.get("item"))
            .and_then(|i| i.as_object());
        if !evaluate_condition(expression, &values, current)? {
            return Err(EmulationError::Conflict("the condition expression failed".into()));
        }
    }

    if let Some(row) = existing {
        state.resources.delete(row.id).await?;
    }
    Ok(json!({}))
}

async fn scan(state: &EmulationState, environment_id: Uuid, body: &Value) -> EmulationResult<Value> {
    let table = required_str(body, "TableName")?;
    table_row(state, environment_id, table).await?;

    let items: Vec<Value> = state
        .resources
        .list(environment_id, ResourceFamily::Dynamodb, "item")
        .await?
        .into_iter()
        .filter(|i| i.attr_str("table") == Some(table))
        .filter_map(|i| i.attributes.get("item").cloned())
        .collect();

    Ok(json!({ "Items": items, "Count": items.len(), "ScannedCount": items.len() }))
}
