//! Disk I/O helpers: load a document file and write one atomically.
//!
//! Writes go to a sibling temp file which is fsynced and then renamed over the
//! target, so a reader never sees a half-written document. The rename is close
//! to atomic on most platforms; on FAT32 or network shares there are no hard
//! guarantees.

use crate::error::{Error, Result};
use crate::serializer::Serializer;
use crate::Document;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::AsyncWriteExt;

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Reads and deserializes the file at `path`. A missing file is
/// [`Error::NotFound`].
pub fn read<S: Serializer>(path: &Path, serializer: &S) -> Result<Document> {
    let bytes = std::fs::read(path).map_err(|e| map_read_err(path, e))?;
    serializer.deserialize(&bytes)
}

/// Async twin of [`read`].
pub async fn read_async<S: Serializer>(path: &Path, serializer: &S) -> Result<Document> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| map_read_err(path, e))?;
    serializer.deserialize(&bytes)
}

/// Write `bytes` to a temp file next to `path`, fsync, then rename over
/// `path`. Missing parent directories are created.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    let written = (|| -> std::io::Result<()> {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        std::fs::rename(&tmp, path)
    })();
    if let Err(e) = written {
        let _ = std::fs::remove_file(&tmp);
        return Err(Error::Io(e.to_string()));
    }
    Ok(())
}

/// Async twin of [`atomic_write`]. Returns once the rename is done.
pub async fn atomic_write_async(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = tmp_path(path);
    let written = async {
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        tokio::fs::rename(&tmp, path).await
    }
    .await;
    if let Err(e) = written {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(Error::Io(e.to_string()));
    }
    Ok(())
}

// Blocking and async writers may target the same file at once, so each write
// gets its own temp name.
fn tmp_path(path: &Path) -> PathBuf {
    let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let file = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{file}.{}.{seq}.tmp", std::process::id()))
}

fn map_read_err(path: &Path, err: std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::NotFound {
        Error::NotFound(path.display().to_string())
    } else {
        Error::Io(err.to_string())
    }
}
