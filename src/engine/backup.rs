//! Timestamped local backups of the database file and plan documents.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

/// Copy the SQLite file and the plans directory into `<data_dir>/backup`,
/// suffixed with a timestamp. Returns the timestamp used.
pub fn run_backup(data_dir: &Path) -> Result<String> {
    let backup_dir = data_dir.join("backup");
    fs::create_dir_all(&backup_dir)
        .with_context(|| format!("Failed to create {}", backup_dir.display()))?;

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();

    let db_path = data_dir.join("chantrack.db");
    if db_path.exists() {
        let target = backup_dir.join(format!("chantrack_{timestamp}.db"));
        fs::copy(&db_path, &target)
            .with_context(|| format!("Failed to copy database to {}", target.display()))?;
        info!("Database backed up to {}", target.display());
    }

    let plans_dir = data_dir.join("plans");
    if plans_dir.is_dir() {
        let target_dir = backup_dir.join(format!("plans_{timestamp}"));
        fs::create_dir_all(&target_dir)?;
        for entry in fs::read_dir(&plans_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                fs::copy(entry.path(), target_dir.join(entry.file_name()))?;
            }
        }
        info!("Plan documents backed up to {}", target_dir.display());
    }

    Ok(timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_database_and_plans() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("chantrack.db"), b"db-bytes").unwrap();
        fs::create_dir_all(tmp.path().join("plans")).unwrap();
        fs::write(tmp.path().join("plans/site_1_plan.pdf"), b"%PDF-").unwrap();

        let timestamp = run_backup(tmp.path()).unwrap();

        let backup_dir = tmp.path().join("backup");
        assert!(backup_dir
            .join(format!("chantrack_{timestamp}.db"))
            .exists());
        assert!(backup_dir
            .join(format!("plans_{timestamp}/site_1_plan.pdf"))
            .exists());
    }

    #[test]
    fn tolerates_missing_database() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(run_backup(tmp.path()).is_ok());
    }
}
