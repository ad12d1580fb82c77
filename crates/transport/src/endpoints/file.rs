//! FileEndpoint - appends records to a local file

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};
use url::Url;

use contracts::{MetricsEndpoint, SinkError};

/// Endpoint that appends each record to a file, unframed
pub struct FileEndpoint {
    name: String,
    path: PathBuf,
    file: Option<File>,
}

impl FileEndpoint {
    /// Open `path` for appending, creating it if needed
    #[instrument(
        name = "file_endpoint_open",
        skip(name, path),
        fields(path = %path.as_ref().display())
    )]
    pub async fn open(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        let name = name.into();
        debug!(endpoint = %name, "FileEndpoint opened");
        Ok(Self {
            name,
            path,
            file: Some(file),
        })
    }

    /// Open the file named by a `file://` URL
    ///
    /// `file://logs/metrics.log` resolves relative to the working directory,
    /// `file:///var/log/metrics.log` is absolute.
    pub async fn from_url(name: impl Into<String>, url: &Url) -> Result<Self, SinkError> {
        Self::open(name, file_path(url)).await
    }

    /// Target path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file(&mut self) -> Result<&mut File, SinkError> {
        self.file
            .as_mut()
            .ok_or_else(|| SinkError::closed(self.name.as_str()))
    }
}

/// Host followed by path, so relative and absolute forms both work
pub(crate) fn file_path(url: &Url) -> PathBuf {
    match url.host_str() {
        Some(host) if !host.is_empty() => PathBuf::from(format!("{host}{}", url.path())),
        _ => PathBuf::from(url.path()),
    }
}

impl MetricsEndpoint for FileEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&mut self, record: &[u8]) -> Result<usize, SinkError> {
        self.file()?.write_all(record).await?;
        Ok(record.len())
    }

    async fn read(&mut self, _buf: &mut [u8]) -> Result<usize, SinkError> {
        Ok(0)
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        self.file()?.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
            debug!(endpoint = %self.name, "FileEndpoint closed");
        }
        Ok(())
    }
}
