//! Blob store for the per-site plan document.
//!
//! One PDF per site, keyed as `site_<id>_plan.pdf` and overwritten on
//! re-upload. Anything beyond that single attachment is out of scope.

use std::fs;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PlanStoreError {
    #[error("not a PDF document")]
    NotPdf,
    #[error("invalid plan path")]
    InvalidPath,
    #[error("plan document not found")]
    NotFound,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct PlanStore {
    root: PathBuf,
}

impl PlanStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Store the plan for a site, replacing any previous one. Returns the
    /// stored file name, which is what gets persisted on the site row.
    pub fn save(&self, site_id: i64, bytes: &[u8]) -> Result<String, PlanStoreError> {
        if !bytes.starts_with(b"%PDF") {
            return Err(PlanStoreError::NotPdf);
        }
        fs::create_dir_all(&self.root)?;
        let name = format!("site_{site_id}_plan.pdf");
        fs::write(self.root.join(&name), bytes)?;
        Ok(name)
    }

    /// Read a stored plan back. The name must be a bare file name as
    /// produced by [`save`](Self::save); path components are rejected.
    pub fn load(&self, name: &str) -> Result<Vec<u8>, PlanStoreError> {
        if name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(PlanStoreError::InvalidPath);
        }
        let path = self.root.join(name);
        if !path.is_file() {
            return Err(PlanStoreError::NotFound);
        }
        Ok(fs::read(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_overwrites_previous_plan() {
        let tmp = tempfile::tempdir().unwrap();
        let store = PlanStore::new(tmp.path().to_path_buf());

        let name = store.save(7, b"%PDF-1.4 first").unwrap();
        assert_eq!(name, "site_7_plan.pdf");
        store.save(7, b"%PDF-1.4 second").unwrap();

        let bytes = store.load(&name).unwrap();
        assert_eq!(bytes, b"%PDF-1.4 second");
    }

    #[test]
    fn rejects_non_pdf_payloads() {
        let tmp = tempfile::tempdir().unwrap();
        let store = PlanStore::new(tmp.path().to_path_buf());
        assert!(matches!(
            store.save(1, b"<html>"),
            Err(PlanStoreError::NotPdf)
        ));
    }

    #[test]
    fn rejects_path_traversal() {
        let tmp = tempfile::tempdir().unwrap();
        let store = PlanStore::new(tmp.path().to_path_buf());
        assert!(matches!(
            store.load("../etc/passwd"),
            Err(PlanStoreError::InvalidPath)
        ));
    }
}
