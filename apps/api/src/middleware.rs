use axum::Extension;
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use auditra_application::ThrottleRule;
use auditra_core::{AppError, UserIdentity};

use crate::error::ApiResult;
use crate::state::AppState;

const SUBJECT_HEADER: &str = "x-auditra-subject";
const NAME_HEADER: &str = "x-auditra-name";
const EMAIL_HEADER: &str = "x-auditra-email";

/// Resolves the caller identity from gateway-supplied headers.
///
/// The API sits behind an authenticating gateway that forwards verified
/// claims as headers; requests without a subject claim are rejected.
pub async fn require_identity(mut request: Request, next: Next) -> ApiResult<Response> {
    let identity = identity_from_headers(request.headers())?;
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Applies the route's throttle rule to the resolved identity.
pub async fn throttle(
    State(state): State<AppState>,
    Extension(rule): Extension<ThrottleRule>,
    Extension(identity): Extension<UserIdentity>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    state
        .throttle_service
        .check_attempt(&rule, identity.subject())
        .await?;

    Ok(next.run(request).await)
}

fn identity_from_headers(headers: &HeaderMap) -> Result<UserIdentity, AppError> {
    let subject = header_value(headers, SUBJECT_HEADER)?
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;

    let display_name = header_value(headers, NAME_HEADER)?.unwrap_or_else(|| subject.clone());
    let email = header_value(headers, EMAIL_HEADER)?;

    Ok(UserIdentity::new(subject, display_name, email))
}

fn header_value(headers: &HeaderMap, name: &str) -> Result<Option<String>, AppError> {
    headers
        .get(name)
        .map(|value| {
            value
                .to_str()
                .map(str::to_owned)
                .map_err(|_| AppError::Validation(format!("{name} must be valid UTF-8")))
        })
        .transpose()
        .map(|value| value.filter(|value| !value.trim().is_empty()))
}
