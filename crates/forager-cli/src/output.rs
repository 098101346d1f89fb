//! Record serialization at the output boundary.
//!
//! The crawl core hands over deduplicated records and knows nothing about
//! formats; everything file-shaped lives here.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

use forager_core::models::JobRecord;

/// `<dir>/jobs_YYYYmmdd_HHMMSS.<ext>`, one name per run.
pub fn timestamped_path(dir: &Path, ext: &str) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    dir.join(format!("jobs_{stamp}.{ext}"))
}

/// Pretty-printed JSON array of records.
pub fn write_json(records: &[JobRecord], path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(records).context("failed to serialize records")?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write JSON output: {}", path.display()))?;
    tracing::info!(count = records.len(), path = %path.display(), "wrote JSON output");
    Ok(())
}

/// Flat CSV with skills joined by `", "`.
pub fn write_csv(records: &[JobRecord], path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to open CSV output: {}", path.display()))?;
    writer.write_record([
        "job_id",
        "title",
        "company",
        "location",
        "description",
        "source",
        "posted_date",
        "skills",
        "scraped_at",
    ])?;
    for record in records {
        let skills = record.skills.join(", ");
        writer.write_record([
            record.job_id.as_str(),
            record.title.as_str(),
            record.company.as_str(),
            record.location.as_str(),
            record.description.as_str(),
            record.source.as_str(),
            record.posted_date.as_deref().unwrap_or(""),
            skills.as_str(),
            record.scraped_at.as_str(),
        ])?;
    }
    writer.flush().context("failed to flush CSV output")?;
    tracing::info!(count = records.len(), path = %path.display(), "wrote CSV output");
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory: {}", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str) -> JobRecord {
        JobRecord {
            title: title.to_string(),
            company: "Acme".to_string(),
            location: "Remote".to_string(),
            description: "Ship things, with \"quotes\" and, commas".to_string(),
            source: "https://x.com/jobs/1".to_string(),
            scraped_at: "2025-06-01 12:00:00".to_string(),
            posted_date: None,
            skills: vec!["rust".to_string(), "sql".to_string()],
            job_id: "deadbeefdeadbeef".to_string(),
        }
    }

    #[test]
    fn json_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/jobs.json");
        let records = vec![record("Engineer"), record("Analyst")];

        write_json(&records, &path).unwrap();
        let back: Vec<JobRecord> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, records);
    }

    #[test]
    fn csv_has_header_and_one_row_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.csv");
        write_csv(&[record("Engineer")], &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("job_id,title,company"));
        assert!(lines[1].contains("Engineer"));
        assert!(lines[1].contains("rust, sql"));
    }

    #[test]
    fn timestamped_paths_land_in_the_given_directory() {
        let path = timestamped_path(Path::new("/tmp/out"), "json");
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("jobs_"));
        assert!(name.ends_with(".json"));
        assert_eq!(path.parent(), Some(Path::new("/tmp/out")));
    }
}
