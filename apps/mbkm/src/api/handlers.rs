//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.
//!
//! Reads take the dashboard's read lock; mutations take the write lock,
//! log a structured `event`, and release the lock before any stored file
//! is removed.

use super::{
    AppState,
    types::{
        ApiError, ApiResponse, ApproveRequest, BulkRequest, BulkResponse, DashboardParams,
        ExportRequest, ExportResponse, HealthResponse, LogbookParams, ReasonRequest,
        RegistrantParams, SearchParams,
    },
};
use crate::uploads;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::NaiveDateTime;
use mbkm_core::{
    ActivityTypeSummary, DashboardSummary, DeletedRegistrant, FilterOptions, GlobalLogbookStats,
    LogbookId, MbkmError, NewLogbookEntry, NewRegistration, Page, RegistrationId,
    RegistrationStatus, RegistrationUpdate, ReportChange, ReportUpload, StatusBreakdown,
    view::{
        DashboardData, LogbookDetail, LogbookOverview, LogbookRow, RegistrantDetail,
        RegistrantPage, RegistrantRow, ReportView, SearchHit, StudentLogbooks,
    },
};

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

/// Remove stored files under the configured uploads directory, if any.
/// The response is sent after the files are gone.
async fn cleanup(state: &AppState, files: &[String]) {
    if files.is_empty() {
        return;
    }
    match &state.uploads_dir {
        Some(dir) => {
            uploads::remove_files(dir, files).await;
        }
        None => tracing::debug!("No uploads directory configured, {} file(s) left", files.len()),
    }
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// DASHBOARD HANDLERS
// =============================================================================

/// Main dashboard table with statistics and filter options.
pub async fn dashboard_handler(
    State(state): State<AppState>,
    Query(params): Query<DashboardParams>,
) -> ApiResult<DashboardData> {
    let query = params.to_query()?;
    let dashboard = state.dashboard.read().await;
    ok(dashboard.dashboard_data(&query)?)
}

pub async fn dashboard_summary_handler(
    State(state): State<AppState>,
) -> ApiResult<DashboardSummary> {
    let dashboard = state.dashboard.read().await;
    ok(dashboard.dashboard_summary()?)
}

/// Registrants carrying one lifecycle status.
pub async fn students_by_status_handler(
    State(state): State<AppState>,
    Path(status): Path<String>,
) -> ApiResult<Vec<RegistrantRow>> {
    let status: RegistrationStatus = status.parse()?;
    let dashboard = state.dashboard.read().await;
    ok(dashboard.students_by_status(status)?)
}

pub async fn activity_summary_handler(
    State(state): State<AppState>,
) -> ApiResult<Vec<ActivityTypeSummary>> {
    let dashboard = state.dashboard.read().await;
    ok(dashboard.activity_types_summary()?)
}

/// Drop every cached read model.
pub async fn clear_cache_handler(State(state): State<AppState>) -> ApiResult<()> {
    let dashboard = state.dashboard.read().await;
    let before = dashboard.cache_stats();
    dashboard.invalidate_caches();
    tracing::info!(
        event = "cache_cleared",
        entries = before.entries,
        hits = before.hits,
        misses = before.misses,
        "Dashboard caches cleared"
    );
    Ok(Json(ApiResponse::with_message((), "Cache cleared")))
}

// =============================================================================
// REGISTRANT READ HANDLERS
// =============================================================================

pub async fn list_registrants_handler(
    State(state): State<AppState>,
    Query(params): Query<RegistrantParams>,
) -> ApiResult<Page<RegistrantRow>> {
    let query = params.to_query()?;
    let dashboard = state.dashboard.read().await;
    ok(dashboard.registrants(&query)?)
}

/// Quick search, at most ten hits.
pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Vec<SearchHit>> {
    let dashboard = state.dashboard.read().await;
    ok(dashboard.search(&params.q)?)
}

pub async fn registrant_statistics_handler(
    State(state): State<AppState>,
) -> ApiResult<StatusBreakdown> {
    let dashboard = state.dashboard.read().await;
    ok(dashboard.registrant_statistics()?)
}

pub async fn filter_options_handler(State(state): State<AppState>) -> ApiResult<FilterOptions> {
    let dashboard = state.dashboard.read().await;
    ok(dashboard.filter_options()?)
}

pub async fn show_registrant_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<RegistrantPage> {
    let dashboard = state.dashboard.read().await;
    ok(dashboard.registrant_detail(RegistrationId(id))?)
}

pub async fn report_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<ReportView> {
    let dashboard = state.dashboard.read().await;
    ok(dashboard.report(RegistrationId(id))?)
}

// =============================================================================
// REGISTRANT MUTATION HANDLERS
// =============================================================================

pub async fn create_registrant_handler(
    State(state): State<AppState>,
    Json(request): Json<NewRegistration>,
) -> Result<(StatusCode, Json<ApiResponse<RegistrantDetail>>), ApiError> {
    let mut dashboard = state.dashboard.write().await;
    let detail = dashboard.create_registrant(request, now())?;
    tracing::info!(
        event = "registrant_created",
        id = detail.row.id.0,
        nim = %detail.row.nim,
        "Registration created"
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(detail, "Registration created")),
    ))
}

/// Patch a registration. Unset fields keep their stored value.
pub async fn update_registrant_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(update): Json<RegistrationUpdate>,
) -> ApiResult<RegistrantDetail> {
    let mut dashboard = state.dashboard.write().await;
    let detail = dashboard.update_registrant(RegistrationId(id), update, now())?;
    tracing::info!(event = "registrant_updated", id, "Registration updated");
    Ok(Json(ApiResponse::with_message(detail, "Registration updated")))
}

pub async fn delete_registrant_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<DeletedRegistrant> {
    let deleted = {
        let mut dashboard = state.dashboard.write().await;
        dashboard.delete_registrant(RegistrationId(id))?
    };
    tracing::info!(
        event = "registrant_deleted",
        id,
        logbooks_removed = deleted.logbooks_removed,
        "Registration deleted"
    );
    cleanup(&state, &deleted.files).await;
    Ok(Json(ApiResponse::with_message(deleted, "Registration deleted")))
}

pub async fn approve_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<ApproveRequest>,
) -> ApiResult<RegistrantDetail> {
    let mut dashboard = state.dashboard.write().await;
    let detail = dashboard.approve(RegistrationId(id), request.grade.as_deref(), now())?;
    tracing::info!(
        event = "registrant_approved",
        id,
        grade = detail.row.score.as_deref().unwrap_or_default(),
        "Registration approved"
    );
    Ok(Json(ApiResponse::with_message(detail, "Registration approved")))
}

pub async fn reject_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<ReasonRequest>,
) -> ApiResult<RegistrantDetail> {
    let mut dashboard = state.dashboard.write().await;
    let detail = dashboard.reject(RegistrationId(id), &request.reason, now())?;
    tracing::info!(event = "registrant_rejected", id, "Registration rejected");
    Ok(Json(ApiResponse::with_message(detail, "Registration rejected")))
}

pub async fn verify_payment_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<RegistrantDetail> {
    let mut dashboard = state.dashboard.write().await;
    let detail = dashboard.verify_payment(RegistrationId(id), now())?;
    tracing::info!(event = "payment_verified", id, "Payment verified");
    Ok(Json(ApiResponse::with_message(detail, "Payment verified")))
}

pub async fn reject_payment_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<ReasonRequest>,
) -> ApiResult<RegistrantDetail> {
    let mut dashboard = state.dashboard.write().await;
    let detail = dashboard.reject_payment(RegistrationId(id), &request.reason, now())?;
    tracing::info!(event = "payment_rejected", id, "Payment rejected");
    Ok(Json(ApiResponse::with_message(detail, "Payment rejected")))
}

/// Attach a report and/or video link. A replaced document is removed.
pub async fn upload_report_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(upload): Json<ReportUpload>,
) -> ApiResult<ReportChange> {
    let change = {
        let mut dashboard = state.dashboard.write().await;
        dashboard.upload_report(RegistrationId(id), upload, now())?
    };
    tracing::info!(
        event = "report_uploaded",
        id,
        replaced = change.replaced.is_some(),
        "Report uploaded"
    );
    if let Some(old) = &change.replaced {
        cleanup(&state, std::slice::from_ref(old)).await;
    }
    Ok(Json(ApiResponse::with_message(change, "Report uploaded")))
}

pub async fn delete_report_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<ReportView> {
    let id = RegistrationId(id);
    let (removed, report) = {
        let mut dashboard = state.dashboard.write().await;
        let removed = dashboard.delete_report(id, now())?;
        (removed, dashboard.report(id)?)
    };
    let Some(removed) = removed else {
        return Ok(Json(ApiResponse::with_message(report, "No report to delete")));
    };
    tracing::info!(event = "report_deleted", id = id.0, "Report deleted");
    cleanup(&state, &[removed]).await;
    Ok(Json(ApiResponse::with_message(report, "Report deleted")))
}

// =============================================================================
// BULK HANDLERS
// =============================================================================

pub async fn bulk_approve_handler(
    State(state): State<AppState>,
    Json(request): Json<BulkRequest>,
) -> Result<Json<BulkResponse>, ApiError> {
    let mut dashboard = state.dashboard.write().await;
    let approved = dashboard.bulk_approve(&request.ids, now())?;
    tracing::info!(
        event = "bulk_approved",
        requested = request.ids.len(),
        approved,
        "Bulk approval"
    );
    Ok(Json(BulkResponse::new(
        approved,
        format!("{} registrations approved", approved),
    )))
}

pub async fn bulk_reject_handler(
    State(state): State<AppState>,
    Json(request): Json<BulkRequest>,
) -> Result<Json<BulkResponse>, ApiError> {
    let reason = request.reason.as_deref().unwrap_or_default();
    let mut dashboard = state.dashboard.write().await;
    let rejected = dashboard.bulk_reject(&request.ids, reason, now())?;
    tracing::info!(
        event = "bulk_rejected",
        requested = request.ids.len(),
        rejected,
        "Bulk rejection"
    );
    Ok(Json(BulkResponse::new(
        rejected,
        format!("{} registrations rejected", rejected),
    )))
}

pub async fn bulk_delete_handler(
    State(state): State<AppState>,
    Json(request): Json<BulkRequest>,
) -> Result<Json<BulkResponse>, ApiError> {
    let outcome = {
        let mut dashboard = state.dashboard.write().await;
        dashboard.bulk_delete(&request.ids)?
    };
    tracing::info!(
        event = "bulk_deleted",
        requested = request.ids.len(),
        deleted = outcome.deleted,
        logbooks_removed = outcome.logbooks_removed,
        "Bulk deletion"
    );
    cleanup(&state, &outcome.files).await;
    Ok(Json(BulkResponse::new(
        outcome.deleted,
        format!("{} registrations deleted", outcome.deleted),
    )))
}

// =============================================================================
// EXPORT HANDLERS
// =============================================================================

fn export_response(result: Result<mbkm_core::CsvExport, MbkmError>) -> impl IntoResponse {
    match result {
        Ok(export) => {
            tracing::info!(
                event = "export_generated",
                filename = %export.filename,
                rows = export.rows,
                "Export generated"
            );
            (StatusCode::OK, Json(ExportResponse::success(&export)))
        }
        Err(e) => (
            super::types::status_for(&e),
            Json(ExportResponse::error(format!("Export failed: {}", e))),
        ),
    }
}

/// Registrant CSV, optionally restricted to a selection of ids.
pub async fn export_registrants_handler(
    State(state): State<AppState>,
    Json(request): Json<ExportRequest>,
) -> impl IntoResponse {
    let dashboard = state.dashboard.read().await;
    export_response(dashboard.export_registrants(request.ids.as_deref(), now()))
}

/// Registrant CSV of the dashboard table under its filters, every page.
pub async fn export_dashboard_handler(
    State(state): State<AppState>,
    Query(params): Query<DashboardParams>,
) -> impl IntoResponse {
    let dashboard = state.dashboard.read().await;
    export_response(
        params
            .to_query()
            .and_then(|query| dashboard.export_dashboard(&query, now())),
    )
}

/// Logbook CSV of the registrations matching the filters.
pub async fn export_logbooks_handler(
    State(state): State<AppState>,
    Query(params): Query<LogbookParams>,
) -> impl IntoResponse {
    let dashboard = state.dashboard.read().await;
    export_response(
        params
            .to_query()
            .and_then(|query| dashboard.export_logbooks(&query, now())),
    )
}

// =============================================================================
// LOGBOOK HANDLERS
// =============================================================================

pub async fn logbook_overview_handler(
    State(state): State<AppState>,
    Query(params): Query<LogbookParams>,
) -> ApiResult<LogbookOverview> {
    let query = params.to_query()?;
    let dashboard = state.dashboard.read().await;
    ok(dashboard.logbook_overview(&query)?)
}

pub async fn student_logbooks_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<StudentLogbooks> {
    let dashboard = state.dashboard.read().await;
    ok(dashboard.student_logbooks(RegistrationId(id))?)
}

pub async fn logbook_detail_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<LogbookDetail> {
    let dashboard = state.dashboard.read().await;
    ok(dashboard.logbook_detail(LogbookId(id))?)
}

pub async fn logbook_statistics_handler(
    State(state): State<AppState>,
) -> ApiResult<GlobalLogbookStats> {
    let dashboard = state.dashboard.read().await;
    ok(dashboard.logbook_statistics()?)
}

/// Add a logbook entry. An unset week is derived from the activity date.
pub async fn create_logbook_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(entry): Json<NewLogbookEntry>,
) -> Result<(StatusCode, Json<ApiResponse<LogbookRow>>), ApiError> {
    let mut dashboard = state.dashboard.write().await;
    let row = dashboard.create_logbook(RegistrationId(id), entry, now())?;
    tracing::info!(
        event = "logbook_created",
        registration_id = id,
        logbook_id = row.id.0,
        week = row.week,
        "Logbook entry created"
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(row, "Logbook entry created")),
    ))
}
