//! Subcommand implementations. Each returns the text to print on stdout.

use std::path::Path;

use chrono::{DateTime, Utc};
use exam_registry_allocator::{EnrollmentRequest, SectionReconciliation};
use exam_registry_storage::CounterStore;
use exam_registry_types::error::{InvalidArgumentSnafu, SerializationSnafu};
use exam_registry_types::{InstitutionId, Result, SectionKey, StudentRecord};
use serde::Deserialize;

use crate::bootstrap::Registry;

/// `init`: reconcile every section and print the report table.
pub fn init(registry: &Registry) -> Result<String> {
    let report = registry.initializer().initialize()?;
    Ok(report.to_string())
}

/// `reconcile [--section S]`.
pub fn reconcile(registry: &Registry, section: Option<&str>) -> Result<String> {
    let reconciler = registry.reconciler();
    let reports = match section {
        Some(section) => vec![reconciler.reconcile(&SectionKey::new(section))?],
        None => reconciler.reconcile_all()?,
    };

    Ok(reports.iter().map(render_reconciliation).collect())
}

fn render_reconciliation(report: &SectionReconciliation) -> String {
    let prior = report.prior.map_or_else(|| "none".to_string(), |v| v.to_string());
    let next = report.next_preview.map_or_else(|| "exhausted".to_string(), |n| n.to_string());
    format!(
        "{}: {} -> {} (floor {}, scanned {}, skipped {}) next {}\n",
        report.section, prior, report.resulting, report.floor, report.scanned, report.skipped, next
    )
}

/// `status`: counters, enrollment counts, and remaining capacity per section.
pub fn status(registry: &Registry) -> Result<String> {
    let counters = registry.counters();
    let students = registry.students();
    let allocator = registry.allocator();

    let mut out = format!(
        "{:<24} {:<6} {:>8} {:>8} {:>9}  NEXT\n",
        "SECTION", "PREFIX", "COUNTER", "STUDENTS", "REMAINING"
    );
    for entry in registry.policy().sections() {
        let section = entry.section();
        let counter = counters.read(section)?;
        let enrolled = students.count_section(section)?;
        let issued = counter.unwrap_or(0).min(entry.capacity());
        let next = allocator
            .preview(section)?
            .map_or_else(|| "exhausted".to_string(), |n| n.to_string());
        out.push_str(&format!(
            "{:<24} {:<6} {:>8} {:>8} {:>9}  {}\n",
            section.as_str(),
            entry.prefix(),
            counter.map_or_else(|| "-".to_string(), |v| v.to_string()),
            enrolled,
            entry.capacity() - issued,
            next
        ));
    }
    Ok(out)
}

/// `allocate --section S`.
pub fn allocate(registry: &Registry, section: &str) -> Result<String> {
    let number = registry.allocator().next(&SectionKey::new(section))?;
    Ok(format!("{number}\n"))
}

/// `enroll`: prints the registration number and the stored name.
pub fn enroll(registry: &Registry, request: EnrollmentRequest) -> Result<String> {
    let record = registry.enrollment().enroll(request)?;
    Ok(format!("{}\t{}\t{}\n", record.registration_number, record.name, record.section))
}

/// One element of an import file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportRecord {
    registration_number: String,
    section: String,
    name: String,
    place: String,
    institution_id: i64,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

/// `import <file>`: store every record in one transaction.
///
/// Records are stored as given, including registration numbers that do not
/// parse. Sections must be configured. Any duplicate aborts the whole import.
pub fn import(registry: &Registry, path: &Path) -> Result<String> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        InvalidArgumentSnafu { message: format!("cannot read {}: {e}", path.display()) }.build()
    })?;
    let parsed: Vec<ImportRecord> = serde_json::from_str(&text).map_err(|e| {
        SerializationSnafu { message: format!("{}: {e}", path.display()) }.build()
    })?;

    let now = Utc::now();
    let mut records = Vec::with_capacity(parsed.len());
    for item in parsed {
        let section = SectionKey::new(item.section);
        registry.policy().policy_for(&section)?;
        records.push(StudentRecord {
            registration_number: item.registration_number,
            section,
            name: item.name,
            place: item.place,
            institution_id: InstitutionId::new(item.institution_id),
            created_at: item.created_at.unwrap_or(now),
        });
    }

    let count = registry.students().import(&records)?;
    tracing::info!(count, file = %path.display(), "Imported student records");
    Ok(format!(
        "imported {count} records; run `exam-registry init` to align counters\n"
    ))
}
