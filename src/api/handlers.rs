//! Message and operational handlers

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};

use super::extract::BasicCredentials;
use super::AppState;
use crate::error::{GatewayError, GatewayResult};
use crate::message::{Message, SubmitRequest};
use crate::metrics;

/// `POST /message`
///
/// An unreadable body is only reported once the caller has authenticated.
pub async fn submit_message(
    State(state): State<AppState>,
    BasicCredentials(credentials): BasicCredentials,
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> GatewayResult<Json<Message>> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            state.dispatcher.authenticate(credentials.as_ref()).await?;
            metrics::record_submission("invalid");
            return Err(GatewayError::Validation(rejection.body_text()));
        }
    };

    let message = state
        .dispatcher
        .submit(credentials.as_ref(), request)
        .await?;
    Ok(Json(message))
}

/// `GET /message/{id}`
pub async fn get_message(
    State(state): State<AppState>,
    BasicCredentials(credentials): BasicCredentials,
    Path(id): Path<String>,
) -> GatewayResult<Json<Message>> {
    let message = state.dispatcher.retrieve(credentials.as_ref(), &id).await?;
    Ok(Json(message))
}

pub async fn health_handler() -> &'static str {
    "OK"
}

/// Prometheus text exposition
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.directory.list().await {
        Ok(applications) => metrics::set_applications_registered(applications.len()),
        Err(e) => warn!("Failed to count registered applications: {}", e),
    }

    match metrics::gather_metrics() {
        Ok(metrics_text) => (StatusCode::OK, metrics_text).into_response(),
        Err(e) => {
            error!("Failed to gather metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error gathering metrics: {}", e),
            )
                .into_response()
        }
    }
}
