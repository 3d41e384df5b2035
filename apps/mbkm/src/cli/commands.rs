//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api::{self, AppState, DashboardParams, LogbookParams, RegistrantParams};
use crate::config::{BackendKind, Config};
use chrono::NaiveDateTime;
use mbkm_core::{
    CsvExport, Dashboard, MbkmError, RegistrationId, Seed, view::RegistrantDetail,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum file size for seed imports (100 MB).
const MAX_IMPORT_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), MbkmError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| MbkmError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(MbkmError::InvalidInput(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Canonicalize an input path and make sure it is a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, MbkmError> {
    let canonical = path.canonicalize().map_err(|e| {
        MbkmError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(MbkmError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Canonicalize the parent directory of an output path.
fn validate_output_path(path: &Path) -> Result<PathBuf, MbkmError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        MbkmError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(MbkmError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| MbkmError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

fn print_json<T: Serialize>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

/// Open the configured dashboard. Mutations on the memory backend are lost
/// when the command exits.
fn open_for_write(config: &Config) -> Result<Dashboard, MbkmError> {
    if config.storage.backend == BackendKind::Memory {
        tracing::warn!("memory backend: changes are not persisted");
    }
    config.open_dashboard()
}

fn print_registrant(detail: &RegistrantDetail) {
    let row = &detail.row;
    println!("Registration #{}", row.id);
    println!("  NIM:           {}", row.nim);
    println!("  Name:          {}", row.name);
    println!("  Study Program: {}", row.study_program);
    println!(
        "  Academic Year: {} {}",
        row.academic_year.as_deref().unwrap_or("-"),
        row.semester.map(|s| s.as_str()).unwrap_or_default()
    );
    println!(
        "  Activity:      {}",
        if row.activity_type_name.is_empty() {
            "-"
        } else {
            row.activity_type_name.as_str()
        }
    );
    println!(
        "  Placement:     {} ({})",
        row.placement.as_deref().unwrap_or("-"),
        row.location
    );
    println!("  Status:        {}", row.status_label);
    println!("  Payment:       {}", row.payment_status.label());
    println!("  Report:        {}", row.report_status.label());
    println!("  Score:         {}", row.score.as_deref().unwrap_or("-"));
    if let Some(reason) = &detail.rejection_reason {
        println!("  Rejected:      {}", reason);
    }
    if let Some(reason) = &detail.payment_rejection_reason {
        println!("  Payment note:  {}", reason);
    }
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(
    config: &Config,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), MbkmError> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let dashboard = config.open_dashboard()?;

    println!("MBKM Dashboard Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", host);
    println!("  Port:     {}", port);
    println!("  Backend:  {}", config.storage.backend.as_str());
    println!("  Database: {:?}", config.storage.database);
    println!("  Cache:    {}s", config.cache.ttl_secs);
    if let Some(dir) = &config.storage.uploads_dir {
        println!("  Uploads:  {:?}", dir);
    }
    println!();
    println!("Endpoints:");
    println!("  GET  /dashboard   - Registrant table with statistics");
    println!("  GET  /registrants - Registrant management");
    println!("  GET  /logbooks    - Logbook overview");
    println!("  GET  /health      - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let mut state = AppState::new(dashboard);
    if let Some(dir) = &config.storage.uploads_dir {
        state = state.with_uploads_dir(dir.clone());
    }

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, state).await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show database status and headline counts.
pub fn cmd_status(config: &Config, json_mode: bool) -> Result<(), MbkmError> {
    let dashboard = config.open_dashboard()?;
    let summary = dashboard.dashboard_summary()?;
    let logbooks = dashboard.logbook_count()?;

    if json_mode {
        let output = serde_json::json!({
            "database": config.storage.database.to_string_lossy(),
            "backend": config.storage.backend.as_str(),
            "registrations": summary.total,
            "active": summary.active,
            "completed": summary.completed,
            "awaiting_payment": summary.awaiting_payment,
            "completion_rate": summary.completion_rate,
            "logbooks": logbooks
        });
        print_json(&output);
        return Ok(());
    }

    println!("MBKM Dashboard Status");
    println!("=====================");
    println!("Database: {:?}", config.storage.database);
    println!("Backend:  {}", config.storage.backend.as_str());
    println!();
    println!("Registrations:    {}", summary.total);
    println!("Active:           {}", summary.active);
    println!("Completed:        {}", summary.completed);
    println!("Awaiting Payment: {}", summary.awaiting_payment);
    println!("Completion Rate:  {}%", summary.completion_rate);
    println!("Logbook Entries:  {}", logbooks);

    Ok(())
}

// =============================================================================
// STATS COMMAND
// =============================================================================

/// Show registrant statistics, or global logbook statistics.
pub fn cmd_stats(config: &Config, json_mode: bool, logbooks: bool) -> Result<(), MbkmError> {
    let dashboard = config.open_dashboard()?;

    if logbooks {
        let stats = dashboard.logbook_statistics()?;
        if json_mode {
            print_json(&stats);
            return Ok(());
        }
        println!("Logbook Statistics");
        println!("==================");
        println!("Entries:              {}", stats.total_logbooks);
        println!("Students:             {}", stats.total_students);
        println!("Entries per Student:  {}", stats.average_entries_per_student);
        println!("Complete Entries:     {}", stats.completed_logbooks);
        println!("Completion Rate:      {}%", stats.completion_rate);
        println!("Weeks Covered:        {}", stats.total_weeks_covered);
        println!(
            "Latest Entry:         {}",
            stats
                .latest_entry_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string())
        );
        return Ok(());
    }

    let stats = dashboard.registrant_statistics()?;
    let activities = dashboard.activity_types_summary()?;
    if json_mode {
        let output = serde_json::json!({
            "statuses": stats,
            "activity_types": activities
        });
        print_json(&output);
        return Ok(());
    }

    println!("Registrant Statistics");
    println!("=====================");
    println!("Total:               {}", stats.total);
    println!("Awaiting Payment:    {}", stats.awaiting_payment);
    println!("Active:              {}", stats.active);
    println!("Awaiting Assessment: {}", stats.awaiting_assessment);
    println!("Completed:           {}", stats.completed);
    println!("Completion Rate:     {}%", stats.completion_rate);
    println!("Payment Rate:        {}%", stats.payment_rate);

    if !activities.is_empty() {
        println!();
        println!("By Activity Type:");
        for activity in &activities {
            let name = dashboard
                .catalog()
                .activity_type_name(Some(activity.code.as_str()));
            println!(
                "  {:<32} total {:>4}  paid {:>4}  completed {:>4}",
                if name.is_empty() { "(none)".to_string() } else { name },
                activity.total,
                activity.paid,
                activity.completed
            );
        }
    }

    Ok(())
}

// =============================================================================
// LIST / SHOW / SEARCH COMMANDS
// =============================================================================

/// List registrants matching the filters.
pub fn cmd_list(
    config: &Config,
    json_mode: bool,
    params: &RegistrantParams,
) -> Result<(), MbkmError> {
    let query = params.to_query()?;
    let dashboard = config.open_dashboard()?;
    let page = dashboard.registrants(&query)?;

    if json_mode {
        print_json(&page);
        return Ok(());
    }

    println!(
        "{:>6}  {:<12}  {:<28}  {:<20}  Placement",
        "ID", "NIM", "Name", "Status"
    );
    for row in &page.data {
        println!(
            "{:>6}  {:<12}  {:<28}  {:<20}  {}",
            row.id.0,
            row.nim,
            row.name,
            row.status_label,
            row.placement.as_deref().unwrap_or("-")
        );
    }
    let p = &page.pagination;
    println!();
    println!(
        "Page {} of {} ({} registrants)",
        p.current_page, p.last_page, p.total
    );

    Ok(())
}

/// Show one registrant. Verbose output includes every logbook entry.
pub fn cmd_show(config: &Config, json_mode: bool, verbose: bool, id: u64) -> Result<(), MbkmError> {
    let dashboard = config.open_dashboard()?;
    let page = dashboard.registrant_detail(RegistrationId(id))?;

    if json_mode {
        print_json(&page);
        return Ok(());
    }

    print_registrant(&page.registrant);
    println!();
    println!(
        "Logbook: {} entries, {} complete, average completion {}%",
        page.statistics.total, page.statistics.completed, page.statistics.average_completion
    );

    if verbose {
        for row in &page.logbooks {
            println!(
                "  {:<10} {:<12} {:>3}%  {}",
                row.week_name,
                row.activity_date_formatted.as_deref().unwrap_or("-"),
                row.completion_percentage,
                row.activity_summary
            );
        }
    }

    Ok(())
}

/// Quick search by NIM, name or placement.
pub fn cmd_search(config: &Config, json_mode: bool, term: &str) -> Result<(), MbkmError> {
    let dashboard = config.open_dashboard()?;
    let hits = dashboard.search(term)?;

    if json_mode {
        print_json(&hits);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No registrants match '{}'", term);
        return Ok(());
    }
    for hit in &hits {
        println!(
            "{:>6}  {:<12}  {:<28}  {}",
            hit.id.0, hit.nim, hit.name, hit.status_label
        );
    }

    Ok(())
}

// =============================================================================
// REVIEW COMMANDS
// =============================================================================

fn report_change(json_mode: bool, detail: &RegistrantDetail, message: &str) {
    if json_mode {
        print_json(detail);
    } else {
        println!("{}", message);
        println!();
        print_registrant(detail);
    }
}

/// Approve a registration.
pub fn cmd_approve(
    config: &Config,
    json_mode: bool,
    id: u64,
    grade: Option<&str>,
) -> Result<(), MbkmError> {
    let mut dashboard = open_for_write(config)?;
    let detail = dashboard.approve(RegistrationId(id), grade, now())?;
    tracing::info!(event = "registrant_approved", id, "Registration approved");
    report_change(json_mode, &detail, "Registration approved");
    Ok(())
}

/// Record a rejection.
pub fn cmd_reject(config: &Config, json_mode: bool, id: u64, reason: &str) -> Result<(), MbkmError> {
    let mut dashboard = open_for_write(config)?;
    let detail = dashboard.reject(RegistrationId(id), reason, now())?;
    tracing::info!(event = "registrant_rejected", id, "Registration rejected");
    report_change(json_mode, &detail, "Registration rejected");
    Ok(())
}

/// Mark a payment proof as verified.
pub fn cmd_verify_payment(config: &Config, json_mode: bool, id: u64) -> Result<(), MbkmError> {
    let mut dashboard = open_for_write(config)?;
    let detail = dashboard.verify_payment(RegistrationId(id), now())?;
    tracing::info!(event = "payment_verified", id, "Payment verified");
    report_change(json_mode, &detail, "Payment verified");
    Ok(())
}

/// Reject a payment proof.
pub fn cmd_reject_payment(
    config: &Config,
    json_mode: bool,
    id: u64,
    reason: &str,
) -> Result<(), MbkmError> {
    let mut dashboard = open_for_write(config)?;
    let detail = dashboard.reject_payment(RegistrationId(id), reason, now())?;
    tracing::info!(event = "payment_rejected", id, "Payment rejected");
    report_change(json_mode, &detail, "Payment rejected");
    Ok(())
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Row filters of `mbkm export`.
#[derive(Debug, Clone, Default)]
pub struct ExportFilters {
    pub academic_year: Option<String>,
    pub prodi: Option<String>,
    /// Registrant exports only.
    pub placement: Option<String>,
    /// Registrant exports only.
    pub semester: Option<String>,
    pub search: Option<String>,
}

/// Write a registrant or logbook CSV.
///
/// Registrant exports select rows the way the dashboard table does.
pub fn cmd_export(
    config: &Config,
    output: &Path,
    kind: &str,
    filters: ExportFilters,
) -> Result<(), MbkmError> {
    let validated_output = validate_output_path(output)?;
    let dashboard = config.open_dashboard()?;

    let export: CsvExport = match kind {
        "registrants" => {
            let params = DashboardParams {
                academic_year: filters.academic_year,
                placement: filters.placement,
                semester: filters.semester,
                prodi: filters.prodi,
                search: filters.search,
                ..DashboardParams::default()
            };
            dashboard.export_dashboard(&params.to_query()?, now())?
        }
        "logbooks" => {
            if filters.placement.is_some() || filters.semester.is_some() {
                return Err(MbkmError::InvalidInput(
                    "--placement and --semester apply to registrant exports only".to_string(),
                ));
            }
            let params = LogbookParams {
                academic_year: filters.academic_year,
                prodi: filters.prodi,
                search: filters.search,
                ..LogbookParams::default()
            };
            dashboard.export_logbooks(&params.to_query()?, now())?
        }
        _ => {
            return Err(MbkmError::InvalidInput(format!(
                "Unknown export kind: {}. Use: registrants, logbooks",
                kind
            )));
        }
    };

    std::fs::write(&validated_output, export.content.as_bytes())
        .map_err(|e| MbkmError::IoError(format!("Write file: {}", e)))?;

    tracing::info!(event = "export_written", rows = export.rows, "Export written");
    println!("Exported {} rows to {:?}", export.rows, validated_output);
    for filter in &export.filters {
        println!("  {}", filter);
    }
    println!("Checksum: {}", export.checksum);

    Ok(())
}

// =============================================================================
// IMPORT COMMAND
// =============================================================================

/// Import a JSON seed file of students, registrations and logbooks.
pub fn cmd_import(config: &Config, json_mode: bool, input: &Path) -> Result<(), MbkmError> {
    let validated_path = validate_file_path(input)?;
    validate_file_size(&validated_path, MAX_IMPORT_FILE_SIZE)?;

    let data = std::fs::read(&validated_path)
        .map_err(|e| MbkmError::IoError(format!("Read file: {}", e)))?;
    let seed: Seed = serde_json::from_slice(&data)
        .map_err(|e| MbkmError::SerializationError(format!("Invalid seed file: {}", e)))?;

    let mut dashboard = open_for_write(config)?;
    let summary = dashboard.import(seed)?;
    tracing::info!(
        event = "seed_imported",
        students = summary.students,
        registrations = summary.registrations,
        logbooks = summary.logbooks,
        "Seed imported"
    );

    if json_mode {
        print_json(&summary);
        return Ok(());
    }

    println!(
        "Imported {} students, {} registrations, {} logbook entries",
        summary.students, summary.registrations, summary.logbooks
    );

    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new database.
pub fn cmd_init(config: &Config, force: bool) -> Result<(), MbkmError> {
    if config.storage.backend != BackendKind::Redb {
        return Err(MbkmError::InvalidInput(
            "init requires the redb backend".to_string(),
        ));
    }

    let db_path = &config.storage.database;
    if db_path.exists() {
        if !force {
            return Err(MbkmError::InvalidInput(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(db_path)
            .map_err(|e| MbkmError::IoError(format!("Remove database: {}", e)))?;
    }

    let _dashboard = Dashboard::with_redb(db_path)?;
    println!("Initialized new redb database at {:?}", db_path);

    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
