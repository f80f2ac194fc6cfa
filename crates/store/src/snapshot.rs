//! JSON snapshot persistence for the job registry.
//!
//! The snapshot is a plain `Vec<Job>` serialized to one file at the uploads
//! root. Saves write to a sibling temp file first and rename into place, so
//! a crash mid-write leaves the previous snapshot intact.

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

use crate::job::Job;

/// File name of the snapshot within the uploads root.
pub const SNAPSHOT_FILE: &str = "jobs_snapshot.json";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("snapshot is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Load all jobs from a snapshot file.
///
/// A missing file is not an error; it simply yields an empty list. A file
/// that exists but fails to parse is reported so the caller can log it and
/// start fresh.
pub fn load(path: &Path) -> Result<Vec<Job>, SnapshotError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };
    let jobs = serde_json::from_slice(&bytes)?;
    Ok(jobs)
}

/// Write all jobs to the snapshot file, replacing any previous contents.
pub fn save(path: &Path, jobs: &[Job]) -> Result<(), SnapshotError> {
    let tmp = path.with_extension("json.tmp");
    let bytes = serde_json::to_vec_pretty(jobs)?;
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use vaani_core::status::JobStatus;
    use vaani_core::types::JobId;

    use super::*;

    fn sample_job() -> Job {
        let now = chrono::Utc::now();
        Job {
            id: JobId::new(),
            source_path: PathBuf::from("uploads/originals/1700000000000.mp4"),
            from_lang: "en".to_string(),
            to_lang: "hi".to_string(),
            status: JobStatus::Queued,
            current_stage: None,
            stage_history: Vec::new(),
            cancel_requested: false,
            error: None,
            output_path: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let jobs = load(&dir.path().join(SNAPSHOT_FILE)).unwrap();
        assert!(jobs.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SNAPSHOT_FILE);
        let job = sample_job();

        save(&path, std::slice::from_ref(&job)).unwrap();
        let loaded = load(&path).unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, job.id);
        assert_eq!(loaded[0].from_lang, "en");
        assert_eq!(loaded[0].status, JobStatus::Queued);
    }

    #[test]
    fn corrupt_file_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SNAPSHOT_FILE);
        fs::write(&path, b"{not json").unwrap();

        assert!(matches!(load(&path), Err(SnapshotError::Corrupt(_))));
    }

    #[test]
    fn save_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SNAPSHOT_FILE);
        save(&path, &[sample_job()]).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from(SNAPSHOT_FILE)]);
    }
}
