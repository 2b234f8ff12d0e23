use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Handle to an uploaded document on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub path: PathBuf,
    /// Name of the file inside the upload directory.
    pub stored_name: String,
}

/// Writes uploaded documents into a single upload directory.
///
/// Files are keyed by job id (`<job_id>.pdf`), so two uploads with the same
/// original name never collide.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    upload_directory: PathBuf,
}

impl DocumentStore {
    pub fn new<P: AsRef<Path>>(upload_directory: P) -> Self {
        Self {
            upload_directory: upload_directory.as_ref().to_path_buf(),
        }
    }

    pub fn upload_directory(&self) -> &Path {
        &self.upload_directory
    }

    /// Saves `content` as `<job_id>.pdf`. Blocking; call from a blocking context.
    pub fn save(&self, job_id: &str, content: &[u8]) -> Result<StoredDocument, StorageError> {
        if job_id.is_empty()
            || !job_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(StorageError::InvalidFilename(job_id.to_string()));
        }

        self.ensure_directory()?;

        let stored_name = format!("{}.pdf", job_id);
        let path = self.upload_directory.join(&stored_name);

        // create_new makes the existence check and the creation one atomic step.
        let mut file = match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StorageError::FileExists(path));
            }
            Err(e) => return Err(StorageError::WriteFile { path, source: e }),
        };

        if let Err(e) = file.write_all(content).and_then(|_| file.sync_all()) {
            drop(file);
            let _ = std::fs::remove_file(&path);
            return Err(StorageError::WriteFile { path, source: e });
        }

        Ok(StoredDocument { path, stored_name })
    }

    fn ensure_directory(&self) -> Result<(), StorageError> {
        if !self.upload_directory.exists() {
            std::fs::create_dir_all(&self.upload_directory).map_err(|e| {
                StorageError::CreateDirectory {
                    path: self.upload_directory.clone(),
                    source: e,
                }
            })?;
        }
        Ok(())
    }
}
