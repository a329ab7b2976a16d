use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde_json::json;

use super::domain::{FormField, FormValues};
use super::notify::{ConversionTracker, NotificationSink, SubmissionContext};
use super::service::{LeadIntakeService, SubmissionOutcome};
use super::store::ApplicationStore;

/// Router builder exposing the form submission and on-change validation endpoints.
pub fn application_router<S, N, C>(service: Arc<LeadIntakeService<S, N, C>>) -> Router
where
    S: ApplicationStore + 'static,
    N: NotificationSink + 'static,
    C: ConversionTracker + 'static,
{
    Router::new()
        .route("/api/v1/applications", post(submit_handler::<S, N, C>))
        .route(
            "/api/v1/applications/fields/:field/validate",
            post(validate_field_handler::<S, N, C>),
        )
        .with_state(service)
}

pub(crate) async fn submit_handler<S, N, C>(
    State(service): State<Arc<LeadIntakeService<S, N, C>>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    axum::Json(values): axum::Json<FormValues>,
) -> Response
where
    S: ApplicationStore + 'static,
    N: NotificationSink + 'static,
    C: ConversionTracker + 'static,
{
    let context = submission_context(&headers, connect_info.map(|ConnectInfo(addr)| addr.ip()));

    match service.submit(&values, &context).await {
        Ok(SubmissionOutcome::Accepted {
            application,
            delivery,
        }) => {
            let payload = json!({
                "status": "accepted",
                "application_id": application.id,
                "delivery": delivery,
                "message": delivery.message(),
                "form": FormValues::default(),
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Ok(SubmissionOutcome::Rejected(errors)) => {
            let payload = json!({
                "status": "rejected",
                "errors": errors,
                "form": values,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn validate_field_handler<S, N, C>(
    State(service): State<Arc<LeadIntakeService<S, N, C>>>,
    Path(field): Path<FormField>,
    axum::Json(values): axum::Json<FormValues>,
) -> Response
where
    S: ApplicationStore + 'static,
    N: NotificationSink + 'static,
    C: ConversionTracker + 'static,
{
    let errors = service.validate_field(field, &values);
    let payload = json!({
        "field": field,
        "valid": errors.is_empty(),
        "errors": errors,
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

/// Proxy headers win over the socket address since the form is served behind a CDN.
fn submission_context(headers: &HeaderMap, peer_ip: Option<IpAddr>) -> SubmissionContext {
    let header_text = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    let forwarded_ip = header_text("x-forwarded-for")
        .and_then(|value| value.split(',').next())
        .or_else(|| header_text("x-real-ip"))
        .and_then(|value| value.trim().parse::<IpAddr>().ok());

    SubmissionContext {
        client_ip: forwarded_ip.or(peer_ip),
        user_agent: header_text(header::USER_AGENT.as_str()).map(str::to_string),
        source_url: header_text(header::REFERER.as_str()).map(str::to_string),
    }
}
