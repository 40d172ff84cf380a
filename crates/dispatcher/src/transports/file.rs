//! FileTransport - atomically replaced snapshot file

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use contracts::{ContractError, Transport};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, instrument, warn};

/// Transport that replaces a file on every send
///
/// Readers of the target path see either the previous or the new content,
/// never a partial write.
pub struct FileTransport {
    name: String,
    path: PathBuf,
    tmp_path: PathBuf,
    enabled: bool,
}

impl FileTransport {
    /// Create a new FileTransport
    ///
    /// Creates the parent directory. If that fails the transport is
    /// permanently disabled rather than returning an error.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let name = name.into();
        let path = path.into();

        let enabled = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => match std::fs::create_dir_all(dir) {
                Ok(()) => true,
                Err(e) => {
                    warn!(
                        transport = %name,
                        dir = %dir.display(),
                        error = %e,
                        "Failed to create output directory, transport disabled"
                    );
                    false
                }
            },
            _ => true,
        };

        Self {
            name,
            tmp_path: tmp_path_for(&path),
            path,
            enabled,
        }
    }

    /// Target file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_atomic(&self, data: &str) -> std::io::Result<()> {
        let mut file = File::create(&self.tmp_path).await?;
        file.write_all(data.as_bytes()).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&self.tmp_path, &self.path).await
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = OsString::from(path.as_os_str());
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

impl Transport for FileTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_connected(&self) -> bool {
        self.enabled
    }

    #[instrument(
        name = "file_transport_send",
        skip(self, data),
        fields(transport = %self.name, bytes = data.len())
    )]
    async fn send(&mut self, data: &str) -> Result<(), ContractError> {
        if !self.enabled {
            return Err(ContractError::transport_disconnected(&self.name));
        }
        if data.is_empty() {
            return Ok(());
        }

        if let Err(e) = self.write_atomic(data).await {
            error!(
                transport = %self.name,
                path = %self.path.display(),
                error = %e,
                "Write failed"
            );
            let _ = fs::remove_file(&self.tmp_path).await;
            return Err(ContractError::transport_send(&self.name, e.to_string()));
        }

        debug!(transport = %self.name, path = %self.path.display(), "Snapshot replaced");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_file_transport_write() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("nested").join("results.json");

        let mut transport = FileTransport::new("test_file", &target);
        assert!(transport.is_connected());

        transport.send(r#"{"person":1}"#).await.unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), r#"{"person":1}"#);

        transport.send(r#"{"person":2}"#).await.unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), r#"{"person":2}"#);

        assert!(!tmp_path_for(&target).exists());
    }

    #[tokio::test]
    async fn test_empty_data_is_not_written() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("results.json");

        let mut transport = FileTransport::new("test_file", &target);
        transport.send("").await.unwrap();
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_uncreatable_directory_disables_transport() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let mut transport = FileTransport::new("disabled", blocker.join("out").join("results.json"));
        assert!(!transport.is_connected());

        let result = transport.send("data").await;
        assert!(matches!(
            result,
            Err(ContractError::TransportDisconnected { .. })
        ));
    }

    #[tokio::test]
    async fn test_rename_failure_removes_tmp() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("occupied");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep"), "x").unwrap();

        let mut transport = FileTransport::new("test_file", &target);
        let result = transport.send("data").await;

        assert!(matches!(result, Err(ContractError::TransportSend { .. })));
        assert!(!tmp_path_for(&target).exists());
    }
}
