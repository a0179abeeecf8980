//! Route53 translator.
//!
//! Supported operations: ListHostedZones, ListResourceRecordSets,
//! ChangeResourceRecordSets (CREATE and DELETE changes, one resource
//! record per change). Each environment is exposed as a single synthetic
//! hosted zone whose id is the environment id; record sets read and
//! write the same DNS record store the `/environments/{id}/dns` API and
//! the UDP responder use. MX and SRV record sets carry their
//! priority/weight/port prefix inside the Route53 value string and are
//! split into the store's explicit fields.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use axum_helpers::CallerContext;
use domain_dns::{CreateDnsRecord, DnsRecord, DnsRecordFilter, RecordType};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{EmulationError, EmulationResult},
    models::ResourceFamily,
    state::EmulationState,
    wire::{xml_blocks, xml_escape, xml_text},
};

pub fn router() -> Router<EmulationState> {
    Router::new()
        .route("/2013-04-01/hostedzone", get(list_hosted_zones))
        .route(
            "/2013-04-01/hostedzone/{zone_id}/rrset",
            get(list_record_sets).post(change_record_sets),
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
        EmulationError::NotFound(what) if what.starts_with("zone") => "NoSuchHostedZone",
        EmulationError::NotFound(_) => "InvalidChangeBatch",
        EmulationError::Forbidden(_) => "AccessDenied",
        EmulationError::Conflict(_) => "InvalidChangeBatch",
        EmulationError::InvalidRequest(_) => "InvalidInput",
        EmulationError::NotImplemented(_) => "InvalidAction",
        EmulationError::TooManyRequests(_) => "Throttling",
        EmulationError::Timeout(_) => "RequestExpired",
        EmulationError::Internal(_) => "InternalError",
    };

    xml_response(
        error.status_code(),
        format!(
            "<?xml version=\"1.0\"?>\n<ErrorResponse><Error><Type>Sender</Type><Code>{code}</Code><Message>{}</Message></Error></ErrorResponse>",
            xml_escape(&error.to_string())
        ),
    )
}

fn check_zone(environment_id: Uuid, zone_id: &str) -> EmulationResult<()> {
    let zone: Uuid = zone_id
        .parse()
        .map_err(|_| EmulationError::NotFound(format!("zone {zone_id}")))?;
    if zone != environment_id {
        return Err(EmulationError::NotFound(format!("zone {zone_id}")));
    }
    Ok(())
}

/// Route53 folds MX/SRV parameters into the value string; the record
/// store keeps them as explicit columns.
fn split_value(record_type: RecordType, raw: &str) -> EmulationResult<(String, Option<i16>, Option<i16>, Option<i32>)> {
    let mut parts = raw.split_whitespace();
    match record_type {
        RecordType::MX => {
            let priority: i16 = parts
                .next()
                .and_then(|p| p.parse().ok())
                .ok_or_else(|| EmulationError::InvalidRequest(format!("'{raw}' is not a valid MX value")))?;
            let target = parts
                .next()
                .ok_or_else(|| EmulationError::InvalidRequest(format!("'{raw}' is not a valid MX value")))?;
            Ok((target.to_string(), Some(priority), None, None))
        }
        RecordType::SRV => {
            let mut next_num = || parts.next().and_then(|p| p.parse::<i32>().ok());
            let (Some(priority), Some(weight), Some(port)) = (next_num(), next_num(), next_num()) else {
                return Err(EmulationError::InvalidRequest(format!("'{raw}' is not a valid SRV value")));
            };
            let target = parts
                .next()
                .ok_or_else(|| EmulationError::InvalidRequest(format!("'{raw}' is not a valid SRV value")))?;
            Ok((target.to_string(), Some(priority as i16), Some(weight as i16), Some(port)))
        }
        _ => Ok((raw.to_string(), None, None, None)),
    }
}

fn joined_value(record: &DnsRecord) -> String {
    match record.record_type {
        RecordType::MX => format!("{} {}", record.priority.unwrap_or(0), record.value),
        RecordType::SRV => format!(
            "{} {} {} {}",
            record.priority.unwrap_or(0),
            record.weight.unwrap_or(0),
            record.port.unwrap_or(0),
            record.value
        ),
        _ => record.value.clone(),
    }
}

async fn list_hosted_zones(
    State(state): State<EmulationState>,
    caller: CallerContext,
    Path(environment_id): Path<Uuid>,
) -> Response {
    let result = state
        .authorize(caller.user_id, environment_id, ResourceFamily::Route53, "ListHostedZones")
        .await;

    match result {
        Ok(environment) => xml_response(
            StatusCode::OK,
            format!(
                "<?xml version=\"1.0\"?>\n<ListHostedZonesResponse><HostedZones><HostedZone><Id>/hostedzone/{environment_id}</Id><Name>{}.</Name></HostedZone></HostedZones><IsTruncated>false</IsTruncated></ListHostedZonesResponse>",
                xml_escape(environment.custom_hostname.as_deref().unwrap_or(&environment.name))
            ),
        ),
        Err(e) => error_response(&e),
    }
}

async fn list_record_sets(
    State(state): State<EmulationState>,
    caller: CallerContext,
    Path((environment_id, zone_id)): Path<(Uuid, String)>,
) -> Response {
    let result = async {
        state
            .authorize(caller.user_id, environment_id, ResourceFamily::Route53, "ListResourceRecordSets")
            .await?;
        check_zone(environment_id, &zone_id)?;

        state
            .dns
            .list_for_environment(environment_id, DnsRecordFilter::default())
            .await
            .map_err(|e| EmulationError::Internal(e.to_string()))
    }
    .await;

    match result {
        Ok(records) => {
            let sets: String = records
                .iter()
                .map(|r| {
                    format!(
                        "<ResourceRecordSet><Name>{}.</Name><Type>{}</Type><TTL>{}</TTL><ResourceRecords><ResourceRecord><Value>{}</Value></ResourceRecord></ResourceRecords></ResourceRecordSet>",
                        xml_escape(&r.name),
                        r.record_type,
                        r.ttl,
                        xml_escape(&joined_value(r))
                    )
                })
                .collect();
            xml_response(
                StatusCode::OK,
                format!(
                    "<?xml version=\"1.0\"?>\n<ListResourceRecordSetsResponse><ResourceRecordSets>{sets}</ResourceRecordSets><IsTruncated>false</IsTruncated></ListResourceRecordSetsResponse>"
                ),
            )
        }
        Err(e) => error_response(&e),
    }
}

async fn change_record_sets(
    State(state): State<EmulationState>,
    caller: CallerContext,
    Path((environment_id, zone_id)): Path<(Uuid, String)>,
    body: String,
) -> Response {
    let result = async {
        state
            .authorize(caller.user_id, environment_id, ResourceFamily::Route53, "ChangeResourceRecordSets")
            .await?;
        check_zone(environment_id, &zone_id)?;

        let changes = xml_blocks(&body, "Change");
        if changes.is_empty() {
            return Err(EmulationError::InvalidRequest("change batch contains no changes".into()));
        }

        for change in changes {
            let action = xml_text(change, "Action")
                .ok_or_else(|| EmulationError::InvalidRequest("change is missing an Action".into()))?;
            let name = xml_text(change, "Name")
                .ok_or_else(|| EmulationError::InvalidRequest("change is missing a Name".into()))?
                .trim_end_matches('.')
                .to_string();
            let record_type: RecordType = xml_text(change, "Type")
                .and_then(|t| t.parse().ok())
                .ok_or_else(|| EmulationError::InvalidRequest("change has an unsupported Type".into()))?;
            let raw_value = xml_text(change, "Value")
                .ok_or_else(|| EmulationError::InvalidRequest("change is missing a Value".into()))?;
            let ttl = xml_text(change, "TTL").and_then(|t| t.parse::<i32>().ok());

            let (value, priority, weight, port) = split_value(record_type, raw_value)?;

            match action {
                "CREATE" | "UPSERT" => {
                    let input = CreateDnsRecord {
                        name,
                        record_type,
                        value,
                        ttl,
                        priority,
                        weight,
                        port,
                    };
                    input
                        .validate()
                        .map_err(|e| EmulationError::InvalidRequest(e.to_string()))?;
                    domain_dns::models::validate_shape(&input).map_err(EmulationError::InvalidRequest)?;

                    let record = DnsRecord::new(environment_id, &input);
                    state
                        .dns
                        .create(record)
                        .await
                        .map_err(|e| EmulationError::Internal(e.to_string()))?;
                }
                "DELETE" => {
                    let records = state
                        .dns
                        .list_for_environment(environment_id, DnsRecordFilter::default())
                        .await
                        .map_err(|e| EmulationError::Internal(e.to_string()))?;
                    for record in records
                        .iter()
                        .filter(|r| r.name == name && r.record_type == record_type && r.value == value)
                    {
                        state
                            .dns
                            .delete(record.id)
                            .await
                            .map_err(|e| EmulationError::Internal(e.to_string()))?;
                    }
                }
                other => {
                    return Err(EmulationError::InvalidRequest(format!(
                        "unsupported change action {other}"
                    )))
                }
            }
        }

        Ok(())
    }
    .await;

    match result {
        Ok(()) => xml_response(
            StatusCode::OK,
            format!(
                "<?xml version=\"1.0\"?>\n<ChangeResourceRecordSetsResponse><ChangeInfo><Id>/change/{}</Id><Status>INSYNC</Status></ChangeInfo></ChangeResourceRecordSetsResponse>",
                Uuid::now_v7().simple()
            ),
        ),
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
        Router::new()
            .nest("/{environment_id}/aws/route53", super::router())
            .with_state(state)
    }

    async fn call(app: &Router, owner: Uuid, method: &str, uri: &str, body: &str) -> (StatusCode, String) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header("x-mockfactory-user-id", owner.to_string())
                    .header("content-type", "application/xml")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = String::from_utf8(response.into_body().collect().await.unwrap().to_bytes().to_vec()).unwrap();
        (status, body)
    }

    #[tokio::test]
    async fn create_change_lands_in_the_record_store() {
        let h = harness().await;
        let app = app(h.state.clone());
        let uri = format!("/{0}/aws/route53/2013-04-01/hostedzone/{0}/rrset", h.environment_id);

        let change = "<ChangeResourceRecordSetsRequest><ChangeBatch><Changes><Change>\
            <Action>CREATE</Action>\
            <ResourceRecordSet><Name>api.example.test.</Name><Type>A</Type><TTL>120</TTL>\
            <ResourceRecords><ResourceRecord><Value>10.0.0.9</Value></ResourceRecord></ResourceRecords>\
            </ResourceRecordSet></Change></Changes></ChangeBatch></ChangeResourceRecordSetsRequest>";

        let (status, body) = call(&app, h.owner, "POST", &uri, change).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<Status>INSYNC</Status>"));

        let rows = h.dns.rows.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "api.example.test");
        assert_eq!(rows[0].value, "10.0.0.9");
        assert_eq!(rows[0].ttl, 120);
    }

    #[tokio::test]
    async fn mx_value_prefix_becomes_priority() {
        let h = harness().await;
        let app = app(h.state.clone());
        let uri = format!("/{0}/aws/route53/2013-04-01/hostedzone/{0}/rrset", h.environment_id);

        let change = "<Changes><Change><Action>CREATE</Action>\
            <Name>example.test.</Name><Type>MX</Type><TTL>300</TTL>\
            <Value>10 mail.example.test</Value></Change></Changes>";

        let (status, _) = call(&app, h.owner, "POST", &uri, change).await;
        assert_eq!(status, StatusCode::OK);

        let rows = h.dns.rows.lock().unwrap();
        assert_eq!(rows[0].priority, Some(10));
        assert_eq!(rows[0].value, "mail.example.test");
    }

    #[tokio::test]
    async fn delete_change_removes_matching_records() {
        let h = harness().await;
        let app = app(h.state.clone());
        let uri = format!("/{0}/aws/route53/2013-04-01/hostedzone/{0}/rrset", h.environment_id);

        let create = "<Changes><Change><Action>CREATE</Action>\
            <Name>tmp.example.test.</Name><Type>A</Type><TTL>60</TTL><Value>10.1.1.1</Value></Change></Changes>";
        call(&app, h.owner, "POST", &uri, create).await;

        let delete = "<Changes><Change><Action>DELETE</Action>\
            <Name>tmp.example.test.</Name><Type>A</Type><Value>10.1.1.1</Value></Change></Changes>";
        let (status, _) = call(&app, h.owner, "POST", &uri, delete).await;
        assert_eq!(status, StatusCode::OK);

        assert!(h.dns.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn listing_reads_back_created_sets() {
        let h = harness().await;
        let app = app(h.state.clone());
        let uri = format!("/{0}/aws/route53/2013-04-01/hostedzone/{0}/rrset", h.environment_id);

        let change = "<Changes><Change><Action>CREATE</Action>\
            <Name>web.example.test.</Name><Type>A</Type><TTL>60</TTL><Value>10.2.2.2</Value></Change></Changes>";
        call(&app, h.owner, "POST", &uri, change).await;

        let (status, body) = call(&app, h.owner, "GET", &uri, "").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<Name>web.example.test.</Name>"));
        assert!(body.contains("<Value>10.2.2.2</Value>"));
    }

    #[tokio::test]
    async fn wrong_zone_is_no_such_hosted_zone() {
        let h = harness().await;
        let app = app(h.state.clone());
        let uri = format!(
            "/{}/aws/route53/2013-04-01/hostedzone/{}/rrset",
            h.environment_id,
            Uuid::now_v7()
        );

        let (status, body) = call(&app, h.owner, "GET", &uri, "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("NoSuchHostedZone"));
    }
}
