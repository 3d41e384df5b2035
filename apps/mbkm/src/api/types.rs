//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.
//!
//! Every response body is an envelope carrying `success` and, on failure,
//! `error`. Query-string parameters arrive as raw strings and are converted
//! into the core query types here, so `"all"` and `""` mean "no filter"
//! everywhere.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use base64::Engine;
use mbkm_core::{
    CsvExport, DashboardQuery, LogbookQuery, MbkmError, PageRequest, RegistrantQuery,
    RegistrationId,
    filter::{normalize_search, parse_choice},
};
use serde::{Deserialize, Serialize};

// =============================================================================
// RESPONSE ENVELOPE
// =============================================================================

/// Response envelope shared by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            error: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            data: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// ERROR MAPPING
// =============================================================================

/// HTTP status of a core error.
pub fn status_for(error: &MbkmError) -> StatusCode {
    match error {
        MbkmError::RegistrationNotFound(_) | MbkmError::LogbookNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        MbkmError::InvalidInput(_) | MbkmError::InvalidFilter(_) | MbkmError::InvalidState(_) => {
            StatusCode::BAD_REQUEST
        }
        MbkmError::SerializationError(_) | MbkmError::IoError(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// A core error on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub MbkmError);

impl From<MbkmError> for ApiError {
    fn from(error: MbkmError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(event = "request_failed", error = %self.0, "Request failed");
        }
        (status, Json(ApiResponse::<()>::error(self.0.to_string()))).into_response()
    }
}

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// QUERY PARAMETERS
// =============================================================================

fn page(page: Option<usize>, per_page: Option<usize>) -> PageRequest {
    PageRequest::new(page, per_page)
}

/// Query string of `GET /dashboard` and `GET /dashboard/export`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardParams {
    pub academic_year: Option<String>,
    pub placement: Option<String>,
    pub semester: Option<String>,
    pub prodi: Option<String>,
    pub search: Option<String>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

impl DashboardParams {
    pub fn to_query(&self) -> Result<DashboardQuery, MbkmError> {
        Ok(DashboardQuery {
            academic_year: parse_choice(self.academic_year.as_deref())?,
            placement: parse_choice(self.placement.as_deref())?,
            semester: parse_choice(self.semester.as_deref())?,
            prodi: parse_choice(self.prodi.as_deref())?,
            search: normalize_search(self.search.as_deref())?,
            page: page(self.page, self.per_page),
        })
    }
}

/// Query string of `GET /registrants`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrantParams {
    pub search: Option<String>,
    pub status: Option<String>,
    pub activity_type: Option<String>,
    pub academic_year: Option<String>,
    pub semester: Option<String>,
    pub prodi: Option<String>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

impl RegistrantParams {
    pub fn to_query(&self) -> Result<RegistrantQuery, MbkmError> {
        Ok(RegistrantQuery {
            search: normalize_search(self.search.as_deref())?,
            status: parse_choice(self.status.as_deref())?,
            activity_type: parse_choice(self.activity_type.as_deref())?,
            academic_year: parse_choice(self.academic_year.as_deref())?,
            semester: parse_choice(self.semester.as_deref())?,
            prodi: parse_choice(self.prodi.as_deref())?,
            page: page(self.page, self.per_page),
        })
    }
}

/// Query string of `GET /logbooks` and `GET /logbooks/export`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogbookParams {
    pub search: Option<String>,
    pub academic_year: Option<String>,
    pub prodi: Option<String>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

impl LogbookParams {
    pub fn to_query(&self) -> Result<LogbookQuery, MbkmError> {
        Ok(LogbookQuery {
            search: normalize_search(self.search.as_deref())?,
            academic_year: parse_choice(self.academic_year.as_deref())?,
            prodi: parse_choice(self.prodi.as_deref())?,
            page: page(self.page, self.per_page),
        })
    }
}

/// Query string of `GET /registrants/search`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    pub q: String,
}

// =============================================================================
// ACTION REQUESTS
// =============================================================================

/// Body of `POST /registrants/{id}/approve`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApproveRequest {
    /// Grade to record; defaults to `A`.
    pub grade: Option<String>,
}

/// Body of the reject endpoints. A missing reason is a validation error,
/// not a malformed body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasonRequest {
    pub reason: String,
}

/// Body of the bulk endpoints. `reason` is only read by bulk reject.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkRequest {
    pub ids: Vec<RegistrationId>,
    pub reason: Option<String>,
}

/// Outcome of a bulk action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkResponse {
    pub success: bool,
    pub affected: usize,
    pub message: String,
}

impl BulkResponse {
    pub fn new(affected: usize, message: impl Into<String>) -> Self {
        Self {
            success: true,
            affected,
            message: message.into(),
        }
    }
}

/// Body of `POST /registrants/export`. No ids means every registrant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportRequest {
    pub ids: Option<Vec<RegistrationId>>,
}

// =============================================================================
// EXPORT RESPONSE
// =============================================================================

/// Export response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResponse {
    pub success: bool,
    pub filename: Option<String>,
    pub rows: Option<usize>,
    /// BLAKE3 hex digest of the CSV content.
    pub checksum: Option<String>,
    /// Active filters, e.g. `Penempatan: Dinas Pendidikan`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<String>,
    pub data: Option<String>, // Base64 encoded
    pub error: Option<String>,
}

impl ExportResponse {
    pub fn success(export: &CsvExport) -> Self {
        Self {
            success: true,
            filename: Some(export.filename.clone()),
            rows: Some(export.rows),
            checksum: Some(export.checksum.clone()),
            filters: export.filters.clone(),
            data: Some(base64::engine::general_purpose::STANDARD.encode(export.content.as_bytes())),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            filename: None,
            rows: None,
            checksum: None,
            filters: Vec::new(),
            data: None,
            error: Some(msg.into()),
        }
    }

    /// Decode the CSV payload.
    pub fn content(&self) -> Option<String> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(self.data.as_deref()?)
            .ok()?;
        String::from_utf8(bytes).ok()
    }
}
