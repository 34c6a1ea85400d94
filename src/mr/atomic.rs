//! The atomic output writer.
//!
//! Writes a file under a unique temporary name in the same directory as the
//! final path, then renames over the final path once the payload is fully
//! written. A failure at any step removes the temporary and leaves the final
//! path untouched — the only way `final_path` comes to exist is via a
//! successful rename of a fully-written temporary.
//!
//! Two workers racing the same task (coordinator reaped a stall but the
//! original worker is still alive) each write a distinct temporary; whichever
//! renames second wins, and neither ever leaves a partial file visible.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::AsyncWriteExt;

use crate::mr::error::{Error, Result};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

fn temp_path_for(final_path: &Path) -> PathBuf {
    let dir = final_path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = final_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let nonce = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    dir.join(format!(".{file_name}.tmp-{}-{}", std::process::id(), nonce))
}

/// Streams `contents` to a fresh temporary file, then renames it over
/// `final_path`. On any failure the temporary is removed and `final_path` is
/// left exactly as it was found.
pub async fn write_atomic(final_path: &Path, contents: &[u8]) -> Result<()> {
    let tmp_path = temp_path_for(final_path);
    let path_str = final_path.to_string_lossy().into_owned();

    let result = async {
        let mut file = tokio::fs::File::create(&tmp_path)
            .await
            .map_err(|e| Error::io(tmp_path.to_string_lossy(), e))?;
        file.write_all(contents)
            .await
            .map_err(|e| Error::io(tmp_path.to_string_lossy(), e))?;
        file.flush()
            .await
            .map_err(|e| Error::io(tmp_path.to_string_lossy(), e))?;
        drop(file);
        tokio::fs::rename(&tmp_path, final_path)
            .await
            .map_err(|e| Error::io(path_str.clone(), e))?;
        Ok(())
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(&tmp_path).await;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_full_contents() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("out.txt");
        write_atomic(&final_path, b"hello world").await.unwrap();
        let got = tokio::fs::read(&final_path).await.unwrap();
        assert_eq!(got, b"hello world");
    }

    #[tokio::test]
    async fn leaves_no_temp_file_behind_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("out.txt");
        write_atomic(&final_path, b"data").await.unwrap();
        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("out.txt")]);
    }

    #[tokio::test]
    async fn second_writer_overwrites_first_without_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("mr-out-0");
        write_atomic(&final_path, b"first").await.unwrap();
        write_atomic(&final_path, b"second").await.unwrap();
        let got = tokio::fs::read(&final_path).await.unwrap();
        assert_eq!(got, b"second");
    }

    #[tokio::test]
    async fn failed_write_does_not_touch_existing_final_file() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("out.txt");
        write_atomic(&final_path, b"original").await.unwrap();

        // Point the "final path" at a directory to force the rename to fail,
        // while keeping the original file's sibling untouched.
        let bogus_final = dir.path().join("does-not-exist-dir").join("out.txt");
        let result = write_atomic(&bogus_final, b"new").await;
        assert!(result.is_err());
        assert!(!bogus_final.exists());

        let got = tokio::fs::read(&final_path).await.unwrap();
        assert_eq!(got, b"original");
    }
}
