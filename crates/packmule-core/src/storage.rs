//! Download-directory maintenance: sizing, oldest-file cleanup, age purge.
//!
//! All walks are iterative (explicit directory stack) and failure-tolerant:
//! an unreadable entry is logged and skipped, never propagated. Nothing here
//! ever removes the managed root itself.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

/// Outcome of an [`autoclean`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub deleted: usize,
    pub bytes_freed: u64,
}

#[derive(Debug)]
struct FileInfo {
    path: PathBuf,
    modified: SystemTime,
    size: u64,
}

/// Total size in bytes of all files under `root`. A missing directory
/// counts as zero.
pub async fn dir_size(root: &Path) -> u64 {
    collect_files(root).await.iter().map(|f| f.size).sum()
}

/// Delete the single oldest file (by modification time) under `root`, then
/// prune empty directories. Returns the deleted path, or `None` when the
/// tree holds no files.
pub async fn delete_oldest_file(root: &Path) -> io::Result<Option<PathBuf>> {
    let mut files = collect_files(root).await;
    files.sort_by_key(|f| f.modified);
    let Some(oldest) = files.into_iter().next() else {
        return Ok(None);
    };
    tokio::fs::remove_file(&oldest.path).await?;
    debug!(path = %oldest.path.display(), "deleted oldest file");
    prune_empty_dirs(root).await;
    Ok(Some(oldest.path))
}

/// Delete every file under `root` whose modification time is older than
/// `max_age`, prune empty directories, and report what was freed.
/// Per-file failures are logged and skipped.
pub async fn autoclean(root: &Path, max_age: Duration) -> CleanReport {
    let cutoff = SystemTime::now()
        .checked_sub(max_age)
        .unwrap_or(SystemTime::UNIX_EPOCH);
    let mut report = CleanReport::default();

    for file in collect_files(root).await {
        if file.modified >= cutoff {
            continue;
        }
        match tokio::fs::remove_file(&file.path).await {
            Ok(()) => {
                report.deleted += 1;
                report.bytes_freed += file.size;
                debug!(path = %file.path.display(), "auto-deleted file");
            }
            Err(err) => {
                warn!(path = %file.path.display(), error = %err, "failed to delete file");
            }
        }
    }

    if report.deleted > 0 {
        prune_empty_dirs(root).await;
    }
    report
}

/// Remove empty directories under `root`, deepest first. The root itself is
/// always kept.
pub async fn prune_empty_dirs(root: &Path) {
    let mut dirs = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(dir = %dir.display(), error = %err, "failed to read directory");
                continue;
            }
        };
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                        stack.push(entry.path());
                        dirs.push(entry.path());
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    warn!(dir = %dir.display(), error = %err, "failed to read entry");
                    break;
                }
            }
        }
    }

    // Deepest directories first so nested empties collapse in one pass.
    dirs.sort_by_key(|d| std::cmp::Reverse(d.components().count()));
    for dir in dirs {
        if let Ok(mut entries) = tokio::fs::read_dir(&dir).await {
            if matches!(entries.next_entry().await, Ok(None)) {
                match tokio::fs::remove_dir(&dir).await {
                    Ok(()) => debug!(dir = %dir.display(), "removed empty directory"),
                    Err(err) => {
                        warn!(dir = %dir.display(), error = %err, "failed to remove directory")
                    }
                }
            }
        }
    }
}

/// Walk `root` and return every regular file with its mtime and size.
async fn collect_files(root: &Path) -> Vec<FileInfo> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
            Err(err) => {
                warn!(dir = %dir.display(), error = %err, "failed to read directory");
                continue;
            }
        };
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(err) => {
                    warn!(dir = %dir.display(), error = %err, "failed to read entry");
                    break;
                }
            };
            let path = entry.path();
            let meta = match entry.metadata().await {
                Ok(meta) => meta,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to stat entry");
                    continue;
                }
            };
            if meta.is_dir() {
                stack.push(path);
            } else if meta.is_file() {
                let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                files.push(FileInfo {
                    path,
                    modified,
                    size: meta.len(),
                });
            }
        }
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn write_file(path: &Path, contents: &[u8]) {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.unwrap();
        }
        tokio::fs::write(path, contents).await.unwrap();
    }

    #[tokio::test]
    async fn test_dir_size_sums_nested_files() {
        let root = tempfile::tempdir().unwrap();
        write_file(&root.path().join("a.bin"), &[0u8; 100]).await;
        write_file(&root.path().join("sub/b.bin"), &[0u8; 50]).await;
        assert_eq!(dir_size(root.path()).await, 150);
    }

    #[tokio::test]
    async fn test_dir_size_missing_root_is_zero() {
        let root = tempfile::tempdir().unwrap();
        let gone = root.path().join("nope");
        assert_eq!(dir_size(&gone).await, 0);
    }

    #[tokio::test]
    async fn test_delete_oldest_file() {
        let root = tempfile::tempdir().unwrap();
        let old = root.path().join("sub/old.bin");
        write_file(&old, b"old").await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        let newer = root.path().join("new.bin");
        write_file(&newer, b"new").await;

        let deleted = delete_oldest_file(root.path()).await.unwrap();
        assert_eq!(deleted, Some(old.clone()));
        assert!(!old.exists());
        assert!(newer.exists());
        // The now-empty subdirectory is pruned, the root kept.
        assert!(!root.path().join("sub").exists());
        assert!(root.path().exists());
    }

    #[tokio::test]
    async fn test_delete_oldest_file_empty_tree() {
        let root = tempfile::tempdir().unwrap();
        assert_eq!(delete_oldest_file(root.path()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_autoclean_deletes_only_old_files() {
        let root = tempfile::tempdir().unwrap();
        write_file(&root.path().join("sub/stale.bin"), &[0u8; 64]).await;
        tokio::time::sleep(Duration::from_millis(80)).await;
        write_file(&root.path().join("fresh.bin"), &[0u8; 32]).await;

        let report = autoclean(root.path(), Duration::from_millis(40)).await;
        assert_eq!(report.deleted, 1);
        assert_eq!(report.bytes_freed, 64);
        assert!(!root.path().join("sub").exists());
        assert!(root.path().join("fresh.bin").exists());
    }

    #[tokio::test]
    async fn test_autoclean_nothing_old() {
        let root = tempfile::tempdir().unwrap();
        write_file(&root.path().join("fresh.bin"), &[0u8; 32]).await;
        let report = autoclean(root.path(), Duration::from_secs(3600)).await;
        assert_eq!(report, CleanReport::default());
        assert!(root.path().join("fresh.bin").exists());
    }

    #[tokio::test]
    async fn test_prune_keeps_root() {
        let root = tempfile::tempdir().unwrap();
        tokio::fs::create_dir_all(root.path().join("a/b/c"))
            .await
            .unwrap();
        prune_empty_dirs(root.path()).await;
        assert!(!root.path().join("a").exists());
        assert!(root.path().exists());
    }
}
