//! Admission middleware for heavy endpoints

use super::types::ErrorResponse;
use super::AppState;
use crate::gate::Admission;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::time::Duration;

/// Admit, shed, or pass through a request before any handler work.
///
/// An admitted request carries its [`AdmissionTicket`](crate::gate::AdmissionTicket)
/// in the request extensions so streaming handlers can keep the slot until
/// the stream ends.
pub async fn admission_control(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match state.admission.admit(request.uri().path()) {
        Admission::Bypass => next.run(request).await,
        Admission::Admitted(ticket) => {
            request.extensions_mut().insert(ticket.clone());
            let response = next.run(request).await;
            drop(ticket);
            response
        }
        Admission::Rejected { retry_after } => busy(retry_after),
    }
}

fn busy(retry_after: Duration) -> Response {
    let secs = retry_after.as_secs().max(1);
    let body = ErrorResponse {
        error: format!("Server busy, retry in {secs} seconds"),
        retry_after_secs: Some(secs),
    };

    let mut response = (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(secs));
    response
}
