//! Atomic tile writes.

use crate::layout::partial_sibling;
use std::io;
use std::path::Path;
use tokio::fs;

/// Writes a tile so that readers never observe a partial file.
///
/// Parent directories are created first; `create_dir_all` succeeds when a
/// sibling worker created them a moment earlier. Data goes to a `.partial`
/// sibling which is then renamed over the destination.
pub async fn write_tile(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let partial = partial_sibling(path);
    fs::write(&partial, bytes).await?;

    if let Err(e) = fs::rename(&partial, path).await {
        let _ = fs::remove_file(&partial).await;
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_parents() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("region/3/4/5.jpg");

        write_tile(&path, b"tile").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"tile");
        assert!(!partial_sibling(&path).exists());
    }

    #[tokio::test]
    async fn test_concurrent_sibling_writes() {
        let temp = TempDir::new().unwrap();
        let mut handles = Vec::new();
        for y in 0..16u32 {
            let path = temp.path().join(format!("r/7/9/{}.jpg", y));
            handles.push(tokio::spawn(async move { write_tile(&path, b"x").await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(std::fs::read_dir(temp.path().join("r/7/9")).unwrap().count(), 16);
    }

    #[tokio::test]
    async fn test_overwrite_existing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("t.jpg");
        write_tile(&path, b"old").await.unwrap();
        write_tile(&path, b"new").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_parent_is_a_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("blocker"), b"").unwrap();
        let path = temp.path().join("blocker/1/0/0.jpg");
        assert!(write_tile(&path, b"x").await.is_err());
    }
}
