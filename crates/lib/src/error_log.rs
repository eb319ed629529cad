//! Per-error log files: `<dir>/<DD-MM-YYYY-HH-mm-ss>.log`, timestamped in the configured zone.
//!
//! Two errors in the same second append to the same file.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::fmt::Display;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

const FILE_NAME_FORMAT: &str = "%d-%m-%Y-%H-%M-%S";

#[derive(Debug, Clone)]
pub struct ErrorLog {
    dir: PathBuf,
    timezone: Tz,
}

impl ErrorLog {
    pub fn new(dir: impl Into<PathBuf>, timezone: Tz) -> Self {
        Self {
            dir: dir.into(),
            timezone,
        }
    }

    /// File name for an error recorded at `now`.
    pub fn file_name(&self, now: DateTime<Utc>) -> String {
        format!(
            "{}.log",
            now.with_timezone(&self.timezone).format(FILE_NAME_FORMAT)
        )
    }

    /// Append `error` to the current second's file. Failures are logged, never returned.
    pub async fn record<E: Display + ?Sized>(&self, error: &E) {
        if let Err(e) = self.record_at(error, Utc::now()).await {
            log::error!("error log: writing to {} failed: {}", self.dir.display(), e);
        }
    }

    /// Append `error` plus a newline to the file for `now`; creates the directory if absent.
    pub async fn record_at<E: Display + ?Sized>(
        &self,
        error: &E,
        now: DateTime<Utc>,
    ) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(self.file_name(now));
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        let line = format!("{}\n", error);
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(path)
    }
}
