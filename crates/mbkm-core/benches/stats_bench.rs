//! # Statistics Benchmarks
//!
//! Performance benchmarks for the aggregate folds.
//!
//! Run with: `cargo bench -p mbkm-core`

use chrono::NaiveDate;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use mbkm_core::{
    GlobalLogbookStats, LogbookEntry, LogbookId, LogbookStats, Registrant, Registration,
    RegistrationId, RegistrationStats, Student,
};
use std::hint::black_box;

/// Registrants cycling through the four lifecycle states and both genders.
fn create_registrants(size: usize) -> Vec<Registrant> {
    let created = NaiveDate::from_ymd_opt(2024, 8, 1)
        .and_then(|d| d.and_hms_opt(8, 0, 0))
        .expect("valid datetime");

    (0..size)
        .map(|i| {
            let nim = format!("E1E12{i:05}");
            let mut reg = Registration::new(RegistrationId(i as u64), nim.clone(), created);
            reg.placement = Some(format!("Partner {}", i % 50));
            if i % 4 >= 1 {
                reg.payment_proof = Some("proof.png".to_string());
            }
            if i % 4 >= 2 {
                reg.report = Some("report.pdf".to_string());
            }
            if i % 4 == 3 {
                reg.score = Some("A".to_string());
            }
            let mut student = Student::new(nim);
            student.gender_code = Some(if i % 2 == 0 { "L" } else { "P" }.to_string());
            Registrant::new(reg, Some(student))
        })
        .collect()
}

/// Entries spread over 100 registrations with 0 to 4 filled fields.
fn create_entries(size: usize) -> Vec<LogbookEntry> {
    (0..size)
        .map(|i| {
            let mut entry =
                LogbookEntry::new(LogbookId(i as u64), RegistrationId((i % 100) as u64));
            let fields = [
                &mut entry.activity_name,
                &mut entry.objective,
                &mut entry.notes,
                &mut entry.conclusion,
            ];
            for field in fields.into_iter().take(i % 5) {
                *field = Some("Kegiatan".to_string());
            }
            entry.week = Some((i % 16) as u32 + 1);
            entry
        })
        .collect()
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_registration_fold(c: &mut Criterion) {
    let mut group = c.benchmark_group("registration_fold");

    for size in [100, 1000, 10000].iter() {
        let registrants = create_registrants(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &registrants, |b, r| {
            b.iter(|| black_box(RegistrationStats::fold(r)));
        });
    }

    group.finish();
}

fn bench_logbook_fold(c: &mut Criterion) {
    let mut group = c.benchmark_group("logbook_fold");

    for size in [100, 1000, 10000].iter() {
        let entries = create_entries(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &entries, |b, e| {
            b.iter(|| black_box(LogbookStats::fold(e)));
        });
    }

    group.finish();
}

fn bench_global_logbook_fold(c: &mut Criterion) {
    let entries = create_entries(10000);
    c.bench_function("global_logbook_fold_10000", |b| {
        b.iter(|| black_box(GlobalLogbookStats::fold(&entries)));
    });
}

criterion_group!(
    benches,
    bench_registration_fold,
    bench_logbook_fold,
    bench_global_logbook_fold
);
criterion_main!(benches);
