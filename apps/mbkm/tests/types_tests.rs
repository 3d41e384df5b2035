//! Unit tests for API types serialization/deserialization.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::StatusCode;
use mbkm::api::{
    ApiResponse, ApproveRequest, BulkRequest, BulkResponse, DashboardParams, ExportRequest,
    ExportResponse, HealthResponse, LogbookParams, ReasonRequest, RegistrantParams, status_for,
};
use mbkm_core::{MbkmError, RegistrationId, RegistrationStatus, Semester};

// =============================================================================
// HEALTH RESPONSE TESTS
// =============================================================================

#[test]
fn test_health_response_default() {
    let health = HealthResponse::default();
    assert_eq!(health.status, "ok");
    assert!(!health.version.is_empty());
}

#[test]
fn test_health_response_deserialization() {
    let json = r#"{"status":"healthy","version":"1.0.0"}"#;
    let health: HealthResponse = serde_json::from_str(json).unwrap();

    assert_eq!(health.status, "healthy");
    assert_eq!(health.version, "1.0.0");
}

// =============================================================================
// ENVELOPE TESTS
// =============================================================================

#[test]
fn test_success_envelope_omits_message() {
    let response = ApiResponse::success(vec![1, 2]);

    let json = serde_json::to_string(&response).unwrap();
    assert_eq!(json, r#"{"success":true,"data":[1,2],"error":null}"#);
}

#[test]
fn test_envelope_with_message() {
    let response = ApiResponse::with_message(7, "Registration approved");

    let json = serde_json::to_string(&response).unwrap();
    assert!(json.contains("\"message\":\"Registration approved\""));
    assert!(json.contains("\"data\":7"));
}

#[test]
fn test_error_envelope() {
    let response = ApiResponse::<()>::error("registration 9 not found");

    let json = serde_json::to_string(&response).unwrap();
    assert!(json.contains("\"success\":false"));
    assert!(json.contains("\"data\":null"));
    assert!(json.contains("\"error\":\"registration 9 not found\""));
}

#[test]
fn test_envelope_deserialization_without_message() {
    let json = r#"{"success":true,"data":"x","error":null}"#;
    let response: ApiResponse<String> = serde_json::from_str(json).unwrap();

    assert!(response.success);
    assert_eq!(response.message, None);
    assert_eq!(response.data.as_deref(), Some("x"));
}

// =============================================================================
// ERROR MAPPING TESTS
// =============================================================================

#[test]
fn test_status_for_errors() {
    assert_eq!(
        status_for(&MbkmError::RegistrationNotFound(RegistrationId(1))),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        status_for(&MbkmError::InvalidInput("reason is required".into())),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        status_for(&MbkmError::InvalidFilter("unknown status".into())),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        status_for(&MbkmError::InvalidState("no payment proof".into())),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        status_for(&MbkmError::IoError("disk full".into())),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

// =============================================================================
// QUERY PARAMETER TESTS
// =============================================================================

#[test]
fn test_registrant_params_all_means_no_filter() {
    let params = RegistrantParams {
        status: Some("all".to_string()),
        activity_type: Some(String::new()),
        semester: Some("ALL".to_string()),
        ..RegistrantParams::default()
    };

    let query = params.to_query().unwrap();
    assert_eq!(query.status, None);
    assert_eq!(query.activity_type, None);
    assert_eq!(query.semester, None);
    assert_eq!(query.page.page, 1);
}

#[test]
fn test_registrant_params_conversion() {
    let params = RegistrantParams {
        search: Some("  Budi ".to_string()),
        status: Some("Awaiting Assessment".to_string()),
        semester: Some("genap".to_string()),
        prodi: Some("3".to_string()),
        page: Some(0),
        per_page: Some(1000),
        ..RegistrantParams::default()
    };

    let query = params.to_query().unwrap();
    assert_eq!(query.search.as_deref(), Some("budi"));
    assert_eq!(query.status, Some(RegistrationStatus::AwaitingAssessment));
    assert_eq!(query.semester, Some(Semester::Genap));
    assert_eq!(query.prodi, Some(3));
    assert_eq!(query.page.page, 1);
    assert_eq!(query.page.per_page, 100);
}

#[test]
fn test_registrant_params_rejects_unknown_values() {
    let params = RegistrantParams {
        prodi: Some("physics".to_string()),
        ..RegistrantParams::default()
    };
    assert!(matches!(
        params.to_query(),
        Err(MbkmError::InvalidFilter(_))
    ));

    let params = RegistrantParams {
        search: Some("x".repeat(101)),
        ..RegistrantParams::default()
    };
    assert!(matches!(
        params.to_query(),
        Err(MbkmError::InvalidFilter(_))
    ));
}

#[test]
fn test_dashboard_params_from_query_string() {
    let params: DashboardParams =
        serde_json::from_str(r#"{"academic_year":"2024/2025","semester":"Ganjil"}"#).unwrap();

    let query = params.to_query().unwrap();
    assert_eq!(query.academic_year.as_deref(), Some("2024/2025"));
    assert_eq!(query.semester, Some(Semester::Ganjil));
    assert_eq!(query.placement, None);
    assert_eq!(query.page.per_page, 15);
}

#[test]
fn test_dashboard_params_prodi_filter() {
    let params = DashboardParams {
        prodi: Some("2".to_string()),
        placement: Some("all".to_string()),
        ..DashboardParams::default()
    };

    let query = params.to_query().unwrap();
    assert_eq!(query.prodi, Some(2));
    assert_eq!(query.placement, None);
    assert!(query.is_filtered());
}

#[test]
fn test_logbook_params_conversion() {
    let params = LogbookParams {
        prodi: Some("all".to_string()),
        academic_year: Some("2023/2024".to_string()),
        ..LogbookParams::default()
    };

    let query = params.to_query().unwrap();
    assert_eq!(query.prodi, None);
    assert_eq!(query.academic_year.as_deref(), Some("2023/2024"));
}

// =============================================================================
// REQUEST BODY TESTS
// =============================================================================

#[test]
fn test_approve_request_empty_body() {
    let request: ApproveRequest = serde_json::from_str("{}").unwrap();
    assert_eq!(request.grade, None);
}

#[test]
fn test_reason_request_missing_reason_is_empty() {
    let request: ReasonRequest = serde_json::from_str("{}").unwrap();
    assert!(request.reason.is_empty());
}

#[test]
fn test_bulk_request_deserialization() {
    let request: BulkRequest =
        serde_json::from_str(r#"{"ids":[3,1,2],"reason":"Late"}"#).unwrap();

    assert_eq!(
        request.ids,
        vec![RegistrationId(3), RegistrationId(1), RegistrationId(2)]
    );
    assert_eq!(request.reason.as_deref(), Some("Late"));
}

#[test]
fn test_bulk_response_serialization() {
    let response = BulkResponse::new(2, "2 registrations approved");

    let json = serde_json::to_string(&response).unwrap();
    assert!(json.contains("\"success\":true"));
    assert!(json.contains("\"affected\":2"));
}

#[test]
fn test_export_request_defaults_to_everything() {
    let request: ExportRequest = serde_json::from_str("{}").unwrap();
    assert_eq!(request.ids, None);
}

// =============================================================================
// EXPORT RESPONSE TESTS
// =============================================================================

#[test]
fn test_export_response_error() {
    let response = ExportResponse::error("Export failed: unknown status");

    assert!(!response.success);
    assert_eq!(response.data, None);
    assert_eq!(response.content(), None);
}

#[test]
fn test_export_response_decodes_payload() {
    // "NIM\n" in base64
    let json = r#"{"success":true,"filename":"a.csv","rows":0,"checksum":null,"data":"TklNCg==","error":null}"#;
    let response: ExportResponse = serde_json::from_str(json).unwrap();

    assert_eq!(response.content().as_deref(), Some("NIM\n"));
}

#[test]
fn test_export_response_carries_filters() {
    let json = r#"{"success":true,"filename":"a.csv","rows":0,"checksum":null,"filters":["Semester: Genap"],"data":"TklNCg==","error":null}"#;
    let response: ExportResponse = serde_json::from_str(json).unwrap();
    assert_eq!(response.filters, vec!["Semester: Genap".to_string()]);

    let unfiltered = serde_json::to_string(&ExportResponse::error("x")).unwrap();
    assert!(!unfiltered.contains("filters"));
}
