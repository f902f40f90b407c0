use axum::Json;
use axum::extract::{Extension, State};
use axum::http::StatusCode;

use auditra_application::RecordEventRequest;
use auditra_core::{AppError, NonEmptyString, UserIdentity};
use auditra_domain::EventDetails;

use crate::dto::{RecordAuditEventRequest, RecordedEventResponse};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn record_audit_event_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(request): Json<RecordAuditEventRequest>,
) -> ApiResult<(StatusCode, Json<RecordedEventResponse>)> {
    let details = match request.details {
        None => EventDetails::empty(),
        Some(serde_json::Value::Object(values)) => EventDetails::from(values),
        Some(_) => {
            return Err(
                AppError::Validation("details must be a JSON object".to_owned()).into(),
            );
        }
    };

    let event_id = state
        .audit_trail_service
        .record_event(
            &user,
            RecordEventRequest {
                action: NonEmptyString::new(request.action)?,
                target_id: request.target_id,
                details,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(RecordedEventResponse { event_id })))
}
