//! JSON file holding exported vault records.

use anyhow::{Context, Result};
use getrandom::fill;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::record::VaultRecord;

/// A file of vault records, stored as a JSON array.
///
/// Password attributes are written exactly as the records hold them;
/// this layer never encrypts or decrypts.
#[derive(Clone, Debug)]
pub struct RecordFile {
    path: PathBuf,
}

impl RecordFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads all records.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a JSON array
    /// of records.
    pub fn load(&self) -> Result<Vec<VaultRecord>> {
        let data = fs::read(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let records: Vec<VaultRecord> =
            serde_json::from_slice(&data).context("records file is not valid JSON")?;
        debug!(count = records.len(), "records loaded");
        Ok(records)
    }

    /// Replaces the file contents with `records`.
    ///
    /// Writes to a fresh temporary file next to the target, syncs it, then
    /// renames it over the target and syncs the directory, so a crash
    /// leaves either the old or the new file. Parent directories are
    /// created as needed.
    pub fn save(&self, records: &[VaultRecord]) -> Result<()> {
        let data = serde_json::to_vec_pretty(records)?;

        if let Some(parent) = self.parent_dir() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.random_tmp_path()?;

        let mut tmp_file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
            .context("failed to create temporary file")?;

        tmp_file.write_all(&data)?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        if let Err(e) = self.atomic_replace(&tmp_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        if let Some(parent) = self.parent_dir() {
            let dir = File::open(parent)?;
            dir.sync_all()?;
        }

        debug!(count = records.len(), "records saved");
        Ok(())
    }

    fn parent_dir(&self) -> Option<&Path> {
        self.path.parent().filter(|p| !p.as_os_str().is_empty())
    }

    /// `records.json.tmp.<16 hex chars>` in the same directory.
    fn random_tmp_path(&self) -> Result<PathBuf> {
        let mut buf = [0u8; 8];
        fill(&mut buf).map_err(|_| anyhow::anyhow!("OS random generator unavailable"))?;

        let suffix: String = buf.iter().map(|b| format!("{b:02x}")).collect();
        let file_name = self
            .path
            .file_name()
            .context("records path has no file name")?
            .to_string_lossy();

        Ok(self.path.with_file_name(format!("{file_name}.tmp.{suffix}")))
    }

    #[cfg(target_os = "windows")]
    fn atomic_replace(&self, tmp_path: &Path) -> Result<()> {
        use std::ffi::OsStr;
        use std::os::windows::ffi::OsStrExt;
        use windows_sys::Win32::Storage::FileSystem::{
            MOVEFILE_REPLACE_EXISTING, MOVEFILE_WRITE_THROUGH, MoveFileExW,
        };

        fn to_wide(s: &OsStr) -> Vec<u16> {
            s.encode_wide().chain(std::iter::once(0)).collect()
        }

        let target_w = to_wide(self.path.as_os_str());
        let tmp_w = to_wide(tmp_path.as_os_str());

        // SAFETY: both buffers are NUL-terminated UTF-16 and outlive the call.
        let result = unsafe {
            MoveFileExW(
                tmp_w.as_ptr(),
                target_w.as_ptr(),
                MOVEFILE_REPLACE_EXISTING | MOVEFILE_WRITE_THROUGH,
            )
        };

        if result == 0 {
            let err = std::io::Error::last_os_error();
            return Err(err).context("atomic replace failed");
        }

        Ok(())
    }

    /// `rename()` is atomic within one filesystem.
    #[cfg(not(target_os = "windows"))]
    fn atomic_replace(&self, tmp_path: &Path) -> Result<()> {
        fs::rename(tmp_path, &self.path).context("atomic replace failed")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Vec<VaultRecord> {
        vec![
            VaultRecord::new("1", "example.com", "alice", "hunter2"),
            VaultRecord::new("2", "example.org", "bob", "swordfish"),
        ]
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let file = RecordFile::new(dir.path().join("records.json"));

        let records = sample();
        file.save(&records).unwrap();
        assert_eq!(file.load().unwrap(), records);
    }

    #[test]
    fn load_fails_if_file_does_not_exist() {
        let dir = tempdir().unwrap();
        let file = RecordFile::new(dir.path().join("missing.json"));
        assert!(!file.exists());
        assert!(file.load().is_err());
    }

    #[test]
    fn load_fails_on_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.json");
        fs::write(&path, b"not json").unwrap();
        assert!(RecordFile::new(path).load().is_err());
    }

    #[test]
    fn save_replaces_existing_file() {
        let dir = tempdir().unwrap();
        let file = RecordFile::new(dir.path().join("records.json"));

        file.save(&sample()).unwrap();
        file.save(&sample()[..1]).unwrap();

        assert_eq!(file.load().unwrap().len(), 1);
    }

    #[test]
    fn tmp_file_is_removed_after_success() {
        let dir = tempdir().unwrap();
        let file = RecordFile::new(dir.path().join("records.json"));
        file.save(&sample()).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0], "records.json");
    }

    #[test]
    fn tmp_names_are_unique_siblings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.json");
        let file = RecordFile::new(path.clone());

        let a = file.random_tmp_path().unwrap();
        let b = file.random_tmp_path().unwrap();

        assert_ne!(a, b);
        assert_ne!(a, path);
        assert_eq!(a.parent(), path.parent());
    }

    #[test]
    fn parent_directory_is_created() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("records.json");

        RecordFile::new(nested.clone()).save(&sample()).unwrap();
        assert!(nested.exists());
    }
}
