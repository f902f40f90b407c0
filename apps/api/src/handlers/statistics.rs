use std::str::FromStr;

use axum::Json;
use axum::extract::{Extension, Query, State};

use auditra_application::{AnalyticsQuery, AnalyticsRange};
use auditra_core::UserIdentity;

use crate::dto::{AuditAnalyticsResponse, RetentionStatsResponse};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn retention_stats_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<RetentionStatsResponse>> {
    let stats = state.statistics_service.retention_stats(&user).await?;

    Ok(Json(RetentionStatsResponse::from(stats)))
}

#[derive(Debug, serde::Deserialize)]
pub struct AnalyticsParams {
    pub range: Option<String>,
    pub action: Option<String>,
    pub actor_id: Option<String>,
}

pub async fn audit_analytics_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Query(params): Query<AnalyticsParams>,
) -> ApiResult<Json<AuditAnalyticsResponse>> {
    let range = params
        .range
        .as_deref()
        .map(AnalyticsRange::from_str)
        .transpose()?
        .unwrap_or_default();

    let analytics = state
        .statistics_service
        .audit_analytics(
            &user,
            AnalyticsQuery {
                range,
                action: params.action,
                actor_id: params.actor_id,
            },
        )
        .await?;

    Ok(Json(AuditAnalyticsResponse::from(analytics)))
}
