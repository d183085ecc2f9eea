pub mod normalize;

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

use ybf_types::models::Bucket;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid object key '{0}'")]
    InvalidKey(String),
    #[error("object {bucket}/{key} already exists")]
    AlreadyExists { bucket: Bucket, key: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub bucket: Bucket,
    pub key: String,
    pub size: u64,
    pub sha256: String,
}

/// Named buckets on local disk.
///
/// Each object lives at `{root}/{bucket}/{key}`; keys may contain `/` to form
/// prefixes (`blog/...`). Objects are served publicly under
/// `{public_base}/storage/{bucket}/{key}`.
pub struct ObjectStore {
    root: PathBuf,
    public_base: String,
}

impl ObjectStore {
    pub async fn new(root: PathBuf, public_base: impl Into<String>) -> Result<Self> {
        for bucket in Bucket::ALL {
            fs::create_dir_all(root.join(bucket.as_str())).await?;
        }
        info!("Object storage directory: {}", root.display());
        Ok(Self {
            root,
            public_base: public_base.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn public_url(&self, bucket: Bucket, key: &str) -> String {
        format!("{}/storage/{}/{}", self.public_base, bucket, key)
    }

    fn object_path(&self, bucket: Bucket, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(bucket.as_str()).join(key))
    }

    /// Write a new object. An existing key is an error; a failed write
    /// leaves nothing behind.
    pub async fn put(&self, bucket: Bucket, key: &str, data: &[u8]) -> Result<StoredObject> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    StorageError::AlreadyExists {
                        bucket,
                        key: key.to_string(),
                    }
                } else {
                    e.into()
                }
            })?;
        write_or_remove(file, &path, data).await?;

        Ok(StoredObject {
            bucket,
            key: key.to_string(),
            size: data.len() as u64,
            sha256: hex::encode(Sha256::digest(data)),
        })
    }

    /// Read an object, `None` if absent.
    pub async fn get(&self, bucket: Bucket, key: &str) -> Result<Option<Bytes>> {
        let path = self.object_path(bucket, key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete an object. Deleting a missing object is not an error.
    pub async fn delete(&self, bucket: Bucket, key: &str) -> Result<()> {
        let path = self.object_path(bucket, key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted object {}/{}", bucket, key);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Object {}/{} already gone", bucket, key);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// All keys in a bucket, with nested prefixes flattened to `a/b` form.
    /// Not used by request handling; for operator tooling and tests.
    pub async fn list(&self, bucket: Bucket) -> Result<Vec<String>> {
        let base = self.root.join(bucket.as_str());
        let mut keys = Vec::new();
        let mut pending = vec![base.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if let Some(key) = relative_key(&base, &path) {
                    keys.push(key);
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}

async fn write_or_remove<W>(mut file: W, path: &Path, data: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let written = async {
        file.write_all(data).await?;
        file.flush().await
    }
    .await;

    if let Err(e) = written {
        drop(file);
        if let Err(cleanup) = fs::remove_file(path).await {
            warn!("Failed to remove partial object {}: {}", path.display(), cleanup);
        }
        return Err(e.into());
    }
    Ok(())
}

/// Bucket and key named by an object URL, whatever host or base path it was
/// issued under: the part of the URL path after its first `/storage/`.
pub fn object_ref(url: &str) -> Option<(Bucket, String)> {
    let path = match url.split_once("://") {
        Some((_, rest)) => &rest[rest.find('/')?..],
        None => url,
    };
    let (_, rest) = path.split_once("/storage/")?;
    let (bucket, key) = rest.split_once('/')?;
    validate_key(key).ok()?;
    Some((bucket.parse().ok()?, key.to_string()))
}

fn relative_key(base: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(base).ok()?;
    let parts: Vec<&str> = rel.components().map(|c| c.as_os_str().to_str()).collect::<Option<_>>()?;
    Some(parts.join("/"))
}

/// Keys are relative, `/`-separated, without empty, `.` or `..` segments.
pub fn validate_key(key: &str) -> Result<()> {
    let invalid = || StorageError::InvalidKey(key.to_string());
    if key.is_empty() || key.starts_with('/') || key.contains('\\') || key.contains('\0') {
        return Err(invalid());
    }
    if key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
        return Err(invalid());
    }
    if Path::new(key)
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(invalid());
    }
    Ok(())
}

/// Reduce a client file name to a key-safe stem: the extension is dropped and
/// anything outside `[A-Za-z0-9_-]` becomes `-`.
pub fn sanitize_stem(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let stem = match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => base,
    };
    let cleaned: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();
    let trimmed = cleaned.trim_matches('-');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Lowercased extension of a client file name, if it has a usable one.
pub fn extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    (!ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .then_some(ext)
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use super::*;

    async fn store() -> (tempfile::TempDir, ObjectStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::new(dir.path().to_path_buf(), "http://localhost:3000/")
            .await
            .unwrap();
        (dir, store)
    }

    #[test]
    fn rejects_traversal_keys() {
        for key in ["", "/abs.jpg", "../x.jpg", "a/../b.jpg", "a//b.jpg", "a\\b.jpg", "./x"] {
            assert!(validate_key(key).is_err(), "{key:?} should be rejected");
        }
        assert!(validate_key("blog/1700000000000-sunrise.jpg").is_ok());
    }

    #[test]
    fn sanitizes_file_names() {
        assert_eq!(sanitize_stem("Youth Camp (2024).png"), "Youth-Camp--2024");
        assert_eq!(sanitize_stem("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_stem(".png"), "png");
        assert_eq!(sanitize_stem("???.jpg"), "file");
        assert_eq!(extension("Cover.JPG").as_deref(), Some("jpg"));
        assert_eq!(extension("noext"), None);
    }

    #[tokio::test]
    async fn put_get_delete() {
        let (_dir, store) = store().await;

        let stored = store
            .put(Bucket::Gallery, "blog/1-a.jpg", b"jpeg")
            .await
            .unwrap();
        assert_eq!(stored.size, 4);
        assert_eq!(stored.sha256.len(), 64);

        let data = store.get(Bucket::Gallery, "blog/1-a.jpg").await.unwrap();
        assert_eq!(data.as_deref(), Some(&b"jpeg"[..]));
        assert_eq!(store.list(Bucket::Gallery).await.unwrap(), vec!["blog/1-a.jpg"]);

        store.delete(Bucket::Gallery, "blog/1-a.jpg").await.unwrap();
        assert!(store.get(Bucket::Gallery, "blog/1-a.jpg").await.unwrap().is_none());
        // second delete is a no-op
        store.delete(Bucket::Gallery, "blog/1-a.jpg").await.unwrap();
    }

    #[tokio::test]
    async fn put_refuses_existing_key() {
        let (_dir, store) = store().await;
        store.put(Bucket::Messages, "a.mp3", b"1").await.unwrap();

        let err = store.put(Bucket::Messages, "a.mp3", b"2").await.unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists { .. }));
        let data = store.get(Bucket::Messages, "a.mp3").await.unwrap().unwrap();
        assert_eq!(&data[..], b"1");
    }

    struct BrokenDisk;

    impl AsyncWrite for BrokenDisk {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            Poll::Ready(Err(std::io::Error::other("disk full")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn failed_write_removes_the_partial_object() {
        let (_dir, store) = store().await;
        let path = store.object_path(Bucket::Messages, "partial.mp3").unwrap();
        fs::write(&path, b"").await.unwrap();

        let err = write_or_remove(BrokenDisk, &path, b"audio").await.unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
        assert!(!path.exists());

        // the key is free again
        store.put(Bucket::Messages, "partial.mp3", b"audio").await.unwrap();
    }

    #[tokio::test]
    async fn public_urls_name_their_object() {
        let (_dir, store) = store().await;
        let url = store.public_url(Bucket::BookCovers, "abc.png");
        assert_eq!(url, "http://localhost:3000/storage/book-covers/abc.png");
        assert_eq!(object_ref(&url), Some((Bucket::BookCovers, "abc.png".to_string())));
    }

    #[test]
    fn object_refs_ignore_the_issuing_host() {
        for url in [
            "http://localhost:3000/storage/book-covers/abc.png",
            "https://new.example/storage/book-covers/abc.png",
            "https://cdn.example/api/storage/book-covers/abc.png",
        ] {
            assert_eq!(object_ref(url), Some((Bucket::BookCovers, "abc.png".to_string())), "{url}");
        }
        assert_eq!(
            object_ref("http://x/storage/gallery/blog/1-a.jpg"),
            Some((Bucket::Gallery, "blog/1-a.jpg".to_string()))
        );
        assert_eq!(object_ref("https://elsewhere/x.png"), None);
        assert_eq!(object_ref("http://x/storage/unknown/a.png"), None);
        assert_eq!(object_ref("http://x/storage/gallery/../secret"), None);
    }
}
