use axum::Json;
use axum::extract::{Extension, State};

use auditra_core::UserIdentity;

use crate::dto::ManualCleanupResponse;
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn run_manual_cleanup_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<ManualCleanupResponse>> {
    let outcome = state.retention_service.run_manual_cleanup(&user).await?;

    Ok(Json(ManualCleanupResponse::from(outcome)))
}
