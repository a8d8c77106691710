//! Process-wide file content cache.
//!
//! Keyed by path; every read validates the cached identity (mtime + size)
//! against the filesystem and re-reads on mismatch, so editors that write
//! files behind the service's back never see stale content. `flush` evicts
//! entries that have not been used recently.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant, SystemTime};

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Identity {
    mtime: SystemTime,
    len: u64,
}

#[derive(Debug, Clone)]
struct CachedFile {
    content: Arc<str>,
    identity: Identity,
    last_used: Instant,
}

#[derive(Debug, Default)]
pub struct FileCache {
    entries: Mutex<HashMap<PathBuf, CachedFile>>,
}

impl FileCache {
    pub fn new() -> FileCache {
        FileCache::default()
    }

    /// The process-wide instance.
    pub fn global() -> &'static FileCache {
        static GLOBAL: OnceLock<FileCache> = OnceLock::new();
        GLOBAL.get_or_init(FileCache::new)
    }

    /// Reads `path`, serving from the cache when the file identity is
    /// unchanged.
    pub fn read(&self, path: &Path) -> io::Result<Arc<str>> {
        let metadata = std::fs::metadata(path)?;
        let identity = Identity {
            mtime: metadata.modified()?,
            len: metadata.len(),
        };

        let mut entries = self.entries.lock();
        if let Some(cached) = entries.get_mut(path) {
            if cached.identity == identity {
                cached.last_used = Instant::now();
                return Ok(cached.content.clone());
            }
        }
        drop(entries);

        let content: Arc<str> = Arc::from(std::fs::read_to_string(path)?);
        self.entries.lock().insert(
            path.to_path_buf(),
            CachedFile {
                content: content.clone(),
                identity,
                last_used: Instant::now(),
            },
        );
        Ok(content)
    }

    /// Evicts entries not used within `older_than`.
    pub fn flush(&self, older_than: Duration) {
        let now = Instant::now();
        self.entries
            .lock()
            .retain(|_, cached| now.duration_since(cached.last_used) <= older_than);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(name: &str, content: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("kestrel-cache-test-{}-{name}", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn serves_cached_content_for_unchanged_files() {
        let path = temp_file("stable", "let u = ()\n");
        let cache = FileCache::new();
        let first = cache.read(&path).unwrap();
        let second = cache.read(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn rereads_when_identity_changes() {
        let path = temp_file("changing", "let a = 1\n");
        let cache = FileCache::new();
        let first = cache.read(&path).unwrap();

        // Different length guarantees a different identity even when the
        // mtime granularity is coarse.
        std::fs::write(&path, "let a = 1000\n").unwrap();
        let second = cache.read(&path).unwrap();
        assert_ne!(&*first, &*second);
        assert_eq!(&*second, "let a = 1000\n");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let cache = FileCache::new();
        let err = cache
            .read(Path::new("/nonexistent/kestrel/file"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn flush_evicts_stale_entries() {
        let path = temp_file("flushed", "let z = 3\n");
        let cache = FileCache::new();
        cache.read(&path).unwrap();
        assert_eq!(cache.len(), 1);

        cache.flush(Duration::from_secs(3600));
        assert_eq!(cache.len(), 1);
        cache.flush(Duration::ZERO);
        assert!(cache.is_empty());
        std::fs::remove_file(&path).ok();
    }
}
