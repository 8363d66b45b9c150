//! Admin handlers
//!
//! Application registration and quota management. Every route here sits
//! behind [`require_admin`].

use axum::{
    extract::{rejection::JsonRejection, Path, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
    Extension, Json,
};
use serde::Deserialize;

use super::extract::BasicCredentials;
use super::AppState;
use crate::credentials::AdminUser;
use crate::directory::{Application, ApplicationName};
use crate::error::{GatewayError, GatewayResult};

/// Authenticate the admin user and make it available to the handler
pub async fn require_admin(
    State(state): State<AppState>,
    BasicCredentials(credentials): BasicCredentials,
    mut request: Request,
    next: Next,
) -> GatewayResult<Response> {
    let user = state.admins.verify(credentials.as_ref()).await?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateApplicationRequest {
    pub name: Option<String>,
    pub secret: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SetLimitRequest {
    pub limit: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChangePasswordRequest {
    pub new_password: Option<String>,
}

/// A non-negative integer, also when written as an integral float (`20000.0`)
fn parse_limit(value: &serde_json::Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
            .map(|f| f as u64)
    })
}

fn read_body<T>(payload: Result<Json<T>, JsonRejection>) -> GatewayResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| GatewayError::Validation(rejection.body_text()))
}

/// `GET /admin/application`
pub async fn list_applications(
    State(state): State<AppState>,
) -> GatewayResult<Json<Vec<Application>>> {
    Ok(Json(state.directory.list().await?))
}

/// `POST /admin/application`
pub async fn create_application(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    payload: Result<Json<CreateApplicationRequest>, JsonRejection>,
) -> GatewayResult<(StatusCode, Json<Application>)> {
    let body = read_body(payload)?;

    let name = body.name.filter(|name| !name.trim().is_empty());
    let secret = body.secret.filter(|secret| !secret.is_empty());

    let mut problems = Vec::new();
    if name.is_none() {
        problems.push("name is required");
    }
    if secret.is_none() {
        problems.push("secret is required");
    }

    let (Some(name), Some(secret)) = (name, secret) else {
        return Err(GatewayError::Validation(problems.join(", ")));
    };

    let name = ApplicationName::parse(&name)?;
    let application = state
        .directory
        .create(Application::new(name, secret, state.default_limit))
        .await?;

    tracing::info!(
        admin = %admin.username,
        application = %application.name,
        "Application registered via admin API"
    );

    Ok((StatusCode::CREATED, Json(application)))
}

async fn lookup(state: &AppState, raw: &str) -> GatewayResult<Application> {
    let name = ApplicationName::parse(raw)?;
    state
        .directory
        .find(&name)
        .await?
        .ok_or_else(|| GatewayError::NotFound(crate::directory::unknown_application(&name)))
}

/// `GET /admin/application/{name}`
pub async fn get_application(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> GatewayResult<Json<Application>> {
    Ok(Json(lookup(&state, &name).await?))
}

async fn set_active(state: &AppState, raw: &str, active: bool) -> GatewayResult<Application> {
    let name = ApplicationName::parse(raw)?;
    state.directory.set_active(&name, active).await
}

/// `POST /admin/application/{name}/enable`
pub async fn enable_application(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> GatewayResult<Json<Application>> {
    Ok(Json(set_active(&state, &name, true).await?))
}

/// `POST /admin/application/{name}/disable`
pub async fn disable_application(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> GatewayResult<Json<Application>> {
    Ok(Json(set_active(&state, &name, false).await?))
}

/// `POST /admin/application/{name}/limit`
pub async fn set_limit(
    State(state): State<AppState>,
    Path(name): Path<String>,
    payload: Result<Json<SetLimitRequest>, JsonRejection>,
) -> GatewayResult<Json<Application>> {
    let invalid = || GatewayError::Validation("Limit should be a non-negative integer".to_string());

    let limit = read_body(payload)
        .map_err(|_| invalid())?
        .limit
        .as_ref()
        .and_then(parse_limit)
        .ok_or_else(invalid)?;

    let name = ApplicationName::parse(&name)?;
    Ok(Json(state.directory.set_limit(&name, limit).await?))
}

/// `POST /admin/password`
pub async fn change_password(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> GatewayResult<String> {
    let body = read_body(payload)?;
    let new_password = body.new_password.unwrap_or_default();

    state
        .admins
        .change_password(&admin.username, &new_password)
        .await?;

    Ok(format!(
        "Password changed successfully for user '{}'",
        admin.username
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_limit() {
        assert_eq!(parse_limit(&json!(0)), Some(0));
        assert_eq!(parse_limit(&json!(3)), Some(3));
        assert_eq!(parse_limit(&json!(20000.0)), Some(20000));

        assert_eq!(parse_limit(&json!(-1)), None);
        assert_eq!(parse_limit(&json!(-2.0)), None);
        assert_eq!(parse_limit(&json!(1.5)), None);
        assert_eq!(parse_limit(&json!("10")), None);
        assert_eq!(parse_limit(&json!(null)), None);
    }
}
