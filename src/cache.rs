//! Fingerprinted on-disk cache of built bundles.
//!
//! Every group is keyed by a [`Hash32`] over its ordered `(handle, version)`
//! pairs. The artifact lives at `<cache_dir>/<fingerprint>.<ext>` and is
//! served from `<cache_url><fingerprint>.<ext>`. Artifacts are never mutated;
//! a changed version simply produces a new fingerprint and a new file.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::core::{AssetKind, Blake3Hasher, Hash32};
use crate::error::CacheError;
use crate::io::write_atomic;
use crate::queue::GroupQueue;
use crate::transform::{Transform, TransformRequest};

/// Fingerprint of a group, stable across renders and processes.
pub fn fingerprint(queue: &GroupQueue) -> Hash32 {
    let mut hasher = Blake3Hasher::default();

    for entry in queue.entries() {
        hasher
            .field(entry.handle.as_bytes())
            .optional(entry.version.as_deref().map(str::as_bytes));
    }

    hasher.into()
}

/// How a bundle URL was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// The artifact already existed.
    Hit,
    /// The transform ran and its output was written.
    Stored,
    /// Nothing was cached; the URL points at the on-the-fly endpoint.
    Uncached,
}

/// A resolved bundle source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundled {
    pub url: String,
    pub fingerprint: Hash32,
    pub status: CacheStatus,
}

/// The cache directory together with the URLs it is served under.
#[derive(Debug, Clone)]
pub struct Store {
    dir: Utf8PathBuf,
    url: String,
    endpoint: String,
}

impl Store {
    /// # Arguments
    ///
    /// * `dir` - Directory holding the artifacts, created on first write.
    /// * `url` - Public URL prefix mirroring `dir`.
    /// * `endpoint` - Public URL of the on-the-fly transform.
    pub fn new(dir: impl Into<Utf8PathBuf>, url: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            url: url.into(),
            endpoint: endpoint.into(),
        }
    }

    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    pub fn filename(fingerprint: Hash32, kind: AssetKind) -> String {
        format!("{}.{}", fingerprint.to_hex(), kind.extension())
    }

    pub fn path(&self, filename: &str) -> Utf8PathBuf {
        self.dir.join(filename)
    }

    pub fn url(&self, filename: &str) -> String {
        format!("{}/{}", self.url.trim_end_matches('/'), filename)
    }

    pub fn endpoint_url(&self, request: &TransformRequest) -> String {
        request.url(&self.endpoint)
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.path(filename).is_file()
    }

    /// Persist an artifact, creating the cache directory if needed.
    ///
    /// The file is the endpoint URL it was built from, as a comment on the
    /// first line, followed by the transform output.
    pub fn save(&self, filename: &str, origin: &str, data: &[u8]) -> Result<Utf8PathBuf, CacheError> {
        if !self.dir.is_dir() {
            fs::create_dir_all(&self.dir).map_err(|e| CacheError::CreateDir(self.dir.clone(), e))?;
        }

        let mut buffer = format!("/* {origin} */\n").into_bytes();
        buffer.extend_from_slice(data);

        let path = self.path(filename);
        write_atomic(&path, &buffer).map_err(|e| CacheError::Write(path.clone(), e))?;

        Ok(path)
    }

    /// Return the URL serving `queue`, building and caching the artifact on a
    /// miss.
    ///
    /// `sources` is only consulted on a miss. A failed or empty transform
    /// never surfaces as an error: the on-the-fly URL is returned instead, so
    /// the page still gets its assets.
    pub fn get_or_build<T, F>(
        &self,
        kind: AssetKind,
        queue: &GroupQueue,
        sources: F,
        transform: &T,
        enabled: bool,
    ) -> Bundled
    where
        T: Transform + ?Sized,
        F: FnOnce() -> Vec<String>,
    {
        let fingerprint = fingerprint(queue);
        let filename = Self::filename(fingerprint, kind);

        if self.contains(&filename) {
            tracing::debug!(file = %filename, "cache hit");
            return Bundled {
                url: self.url(&filename),
                fingerprint,
                status: CacheStatus::Hit,
            };
        }

        let request = TransformRequest {
            kind,
            sources: sources(),
        };
        let endpoint = self.endpoint_url(&request);

        let uncached = |url: String| Bundled {
            url,
            fingerprint,
            status: CacheStatus::Uncached,
        };

        if !enabled {
            return uncached(endpoint);
        }

        let data = match transform.fetch(&request) {
            Ok(data) if !data.is_empty() => data,
            Ok(_) => {
                tracing::warn!(url = %endpoint, "transform returned no data, serving uncached");
                return uncached(endpoint);
            }
            Err(e) => {
                tracing::warn!(url = %endpoint, "transform failed, serving uncached: {e}");
                return uncached(endpoint);
            }
        };

        match self.save(&filename, &endpoint, &data) {
            Ok(path) => {
                tracing::info!(path = %path, "cached bundle");
                Bundled {
                    url: self.url(&filename),
                    fingerprint,
                    status: CacheStatus::Stored,
                }
            }
            Err(e) => {
                tracing::warn!("{e}");
                uncached(endpoint)
            }
        }
    }

    /// Every fingerprinted artifact currently in the cache directory.
    ///
    /// Files that do not look like `<64 hex>.css` or `<64 hex>.js` are not
    /// ours and are left out.
    pub fn artifacts(&self) -> Result<Vec<Utf8PathBuf>, CacheError> {
        let mut found = Vec::new();

        if !self.dir.is_dir() {
            return Ok(found);
        }

        let base = glob::Pattern::escape(self.dir.as_str());

        for kind in [AssetKind::Style, AssetKind::Script] {
            let pattern = format!("{base}/*.{}", kind.extension());

            for entry in glob::glob(&pattern)? {
                let Ok(path) = Utf8PathBuf::from_path_buf(entry?) else {
                    continue;
                };

                if path.file_stem().is_some_and(Hash32::is_hex) {
                    found.push(path);
                }
            }
        }

        Ok(found)
    }

    /// Delete every fingerprinted artifact. Returns the number removed.
    ///
    /// Call this when registrations change in ways versions don't capture,
    /// e.g. after editing a source file in place.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let artifacts = self.artifacts()?;

        for path in &artifacts {
            fs::remove_file(path)?;
        }

        tracing::info!(dir = %self.dir, count = artifacts.len(), "cleared bundle cache");

        Ok(artifacts.len())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::error::TransformError;
    use crate::graph::{Asset, Dependencies};
    use crate::queue::build_queue;

    fn queue_of(pairs: &[(&str, Option<&str>)]) -> GroupQueue {
        let mut graph = Dependencies::scripts();
        for (handle, ver) in pairs {
            let mut asset = Asset::new(*handle);
            asset.ver = ver.map(str::to_string);
            graph.register(asset);
            graph.enqueue(*handle);
        }
        let (queue, _) = build_queue(&graph, &Default::default(), &[]);
        queue.groups().next().map(|(_, q)| q.clone()).unwrap_or_default()
    }

    fn store(dir: &tempfile::TempDir) -> Store {
        let root = Utf8Path::from_path(dir.path()).unwrap();
        Store::new(root.join("cache"), "/cache/", "/min/")
    }

    struct Counting<'a> {
        calls: &'a Cell<usize>,
        output: &'static [u8],
    }

    impl Transform for Counting<'_> {
        fn fetch(&self, _: &TransformRequest) -> Result<Vec<u8>, TransformError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.output.to_vec())
        }
    }

    #[test]
    fn test_fingerprint_determinism() {
        let a = queue_of(&[("A", Some("1")), ("B", Some("2"))]);
        let b = queue_of(&[("A", Some("1")), ("B", Some("2"))]);
        assert_eq!(fingerprint(&a), fingerprint(&b));

        let bumped = queue_of(&[("A", Some("1")), ("B", Some("3"))]);
        assert_ne!(fingerprint(&a), fingerprint(&bumped));

        let reordered = queue_of(&[("B", Some("2")), ("A", Some("1"))]);
        assert_ne!(fingerprint(&a), fingerprint(&reordered));

        let unversioned = queue_of(&[("A", Some("1")), ("B", None)]);
        assert_ne!(fingerprint(&a), fingerprint(&unversioned));
    }

    #[test]
    fn test_miss_then_hit() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let queue = queue_of(&[("A", Some("1")), ("B", Some("2"))]);
        let calls = Cell::new(0);
        let transform = Counting { calls: &calls, output: b"min();" };

        let sources = || vec!["/a.js".to_string(), "/b.js".to_string()];

        let first = store.get_or_build(AssetKind::Script, &queue, sources, &transform, true);
        assert_eq!(first.status, CacheStatus::Stored);
        assert_eq!(calls.get(), 1);

        let filename = Store::filename(first.fingerprint, AssetKind::Script);
        assert_eq!(first.url, format!("/cache/{filename}"));
        let written = fs::read_to_string(store.path(&filename)).unwrap();
        assert_eq!(written, "/* /min/?f=/a.js,/b.js */\nmin();");

        let second = store.get_or_build(AssetKind::Script, &queue, sources, &transform, true);
        assert_eq!(second.status, CacheStatus::Hit);
        assert_eq!(second.url, first.url);
        assert_eq!(calls.get(), 1);
        assert_eq!(store.artifacts().unwrap().len(), 1);
    }

    #[test]
    fn test_empty_output_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let queue = queue_of(&[("A", Some("1"))]);
        let calls = Cell::new(0);
        let transform = Counting { calls: &calls, output: b"" };

        let res = store.get_or_build(
            AssetKind::Style,
            &queue,
            || vec!["/a.css".into()],
            &transform,
            true,
        );
        assert_eq!(res.status, CacheStatus::Uncached);
        assert_eq!(res.url, "/min/?f=/a.css");
        assert!(store.artifacts().unwrap().is_empty());
    }

    #[test]
    fn test_failed_transform_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let queue = queue_of(&[("A", Some("1"))]);
        let failing = |_: &TransformRequest| -> Result<Vec<u8>, TransformError> {
            Err(TransformError::Pipe)
        };

        let res = store.get_or_build(AssetKind::Script, &queue, || vec!["/a.js".into()], &failing, true);
        assert_eq!(res.status, CacheStatus::Uncached);
        assert_eq!(res.url, "/min/?f=/a.js");
    }

    #[test]
    fn test_disabled_never_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let queue = queue_of(&[("A", Some("1"))]);
        let calls = Cell::new(0);
        let transform = Counting { calls: &calls, output: b"x" };

        let res = store.get_or_build(AssetKind::Script, &queue, || vec!["/a.js".into()], &transform, false);
        assert_eq!(res.status, CacheStatus::Uncached);
        assert_eq!(calls.get(), 0);
        assert!(!store.dir().exists());
    }

    #[test]
    fn test_clear_only_removes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let calls = Cell::new(0);
        let transform = Counting { calls: &calls, output: b"x" };

        for ver in ["1", "2"] {
            let queue = queue_of(&[("A", Some(ver))]);
            store.get_or_build(AssetKind::Script, &queue, Vec::new, &transform, true);
        }
        let queue = queue_of(&[("S", Some("1"))]);
        store.get_or_build(AssetKind::Style, &queue, Vec::new, &transform, true);

        fs::write(store.path("README.txt"), "keep").unwrap();
        fs::write(store.path("main.js"), "keep").unwrap();

        assert_eq!(store.artifacts().unwrap().len(), 3);
        assert_eq!(store.clear().unwrap(), 3);
        assert!(store.artifacts().unwrap().is_empty());
        assert!(store.path("README.txt").exists());
        assert!(store.path("main.js").exists());
    }

    #[test]
    fn test_clear_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(store(&dir).clear().unwrap(), 0);
    }
}
