//! Route assembly for the emulation surface. Mounted by the control
//! plane under `/api/emulation`; every family hangs off the environment
//! id so the path form mirrors the subdomain form
//! `{service}.{environment-id}.{base-domain}`.

use axum::Router;

use crate::{blob, dynamodb, ec2, gcs, iam, lambda, route53, s3, sqs, state::EmulationState};

pub fn router(state: EmulationState) -> Router {
    Router::new()
        .nest("/{environment_id}/aws/s3", s3::router())
        .nest("/{environment_id}/aws/ec2", ec2::router())
        .nest("/{environment_id}/aws/lambda", lambda::router())
        .nest("/{environment_id}/aws/dynamodb", dynamodb::router())
        .nest("/{environment_id}/aws/sqs", sqs::router())
        .nest("/{environment_id}/aws/route53", route53::router())
        .nest("/{environment_id}/aws/iam", iam::router())
        .nest("/{environment_id}/gcp/storage", gcs::router())
        .nest("/{environment_id}/azure/blob", blob::router())
        .with_state(state)
}
