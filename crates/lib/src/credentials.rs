//! Credential persistence: the opaque auth blob from the session, stored as `<authDir>/creds.json`.

use std::path::{Path, PathBuf};

const CREDS_FILE: &str = "creds.json";

#[derive(Debug, thiserror::Error)]
#[error("credential file {path}: {source}")]
pub struct CredentialError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(CREDS_FILE)
    }

    /// Last saved blob, or `None` if nothing was saved yet.
    pub fn load(&self) -> Result<Option<Vec<u8>>, CredentialError> {
        let path = self.path();
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(CredentialError { path, source }),
        }
    }

    /// Write the blob synchronously. Writes a temp file and renames it so a crash never leaves a torn file.
    pub fn save(&self, blob: &[u8]) -> Result<(), CredentialError> {
        let path = self.path();
        let tmp = self.dir.join(format!("{}.tmp", CREDS_FILE));
        let io = |source| CredentialError {
            path: path.clone(),
            source,
        };
        std::fs::create_dir_all(&self.dir).map_err(io)?;
        std::fs::write(&tmp, blob).map_err(io)?;
        std::fs::rename(&tmp, &path).map_err(io)?;
        log::debug!("credentials saved to {}", path.display());
        Ok(())
    }
}
