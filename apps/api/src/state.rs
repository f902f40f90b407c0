use auditra_application::{
    AuditTrailService, RetentionService, StatisticsService, ThrottleService,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub audit_trail_service: AuditTrailService,
    pub retention_service: RetentionService,
    pub statistics_service: StatisticsService,
    pub throttle_service: ThrottleService,
}
