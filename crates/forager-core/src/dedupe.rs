//! Fingerprint-based record deduplication.

use std::collections::HashSet;

use crate::models::JobRecord;

/// Drop records whose `lowercase(title)|lowercase(company)` fingerprint has
/// already been seen. Single pass, first-seen order preserved, idempotent.
/// The fingerprint set lives only for this call.
pub fn dedupe(records: Vec<JobRecord>) -> Vec<JobRecord> {
    let mut seen: HashSet<String> = HashSet::with_capacity(records.len());
    let before = records.len();
    let unique: Vec<JobRecord> = records
        .into_iter()
        .filter(|record| seen.insert(record.fingerprint()))
        .collect();
    if unique.len() < before {
        tracing::info!(
            total = before,
            unique = unique.len(),
            "deduplicated records"
        );
    }
    unique
}
