//! Filesystem helpers shared by the cache store and the organiser.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::AsyncWriteExt as _;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Sibling temporary path for `path`, unique within this process.
fn temp_path_for(path: &Path) -> PathBuf {
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let file_name = path
        .file_name()
        .map_or_else(|| "store".into(), |n| n.to_string_lossy());
    path.with_file_name(format!(".{file_name}.{}.{n}.tmp", std::process::id()))
}

/// Replace the contents of `path` with `contents` atomically.
///
/// The data is written and synced to a temporary file in the same directory, which is then
/// renamed over `path`. Readers observe either the old file or the complete new one. Missing
/// parent directories are created.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = temp_path_for(path);
    let result = async {
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp, path).await
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(&tmp).await;
    }
    result
}

/// Copy `from` to `to`, creating `to`'s parent directories, then remove `from`.
///
/// `rename` is not used because the archive usually lives on a different volume than the
/// downloads folder.
pub async fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if let Some(parent) = to.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::copy(from, to).await?;
    tokio::fs::remove_file(from).await
}
