use std::collections::HashSet;
use std::fs;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

use crate::error::ConfigError;

const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Recognized options for a [`crate::Minifier`].
///
/// Every field has a default, so a partial JSON document such as
/// `{"ignore": ["jquery"]}` is a valid options file.
///
/// # Example
///
/// ```rust
/// use bundlecache::Options;
///
/// let options = Options::new()
///     .home_url("https://example.com")
///     .ignore("admin-bar")
///     .force("site-main");
/// assert!(options.cache);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Handles that are never bundled.
    pub ignore: HashSet<String>,
    /// Handles that are always bundled, requested or not. Order is kept.
    pub force: Vec<String>,
    /// If false, bundles are always served from the on-the-fly endpoint.
    pub cache: bool,
    /// First segment of every bundle handle.
    pub prefix: String,
    /// Site origin; only sources below it are bundled.
    pub home_url: String,
    /// Where artifacts are stored on disk.
    pub cache_dir: Utf8PathBuf,
    /// Public URL prefix mirroring `cache_dir`.
    pub cache_url: String,
    /// Public URL of the on-the-fly transform endpoint.
    pub minify_url: String,
    /// Upper bound on a single transform fetch, in milliseconds. Zero falls
    /// back to the default.
    pub timeout_ms: u64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            ignore: HashSet::new(),
            force: Vec::new(),
            cache: true,
            prefix: "minify".into(),
            home_url: String::new(),
            cache_dir: Utf8PathBuf::from(".cache/minify"),
            cache_url: "/cache/minify/".into(),
            minify_url: "/min/".into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a JSON file.
    pub fn from_file(path: impl AsRef<Utf8Path>) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path.as_ref())?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(data)?)
    }

    pub fn ignore(mut self, handle: impl Into<String>) -> Self {
        self.ignore.insert(handle.into());
        self
    }

    pub fn force(mut self, handle: impl Into<String>) -> Self {
        let handle = handle.into();
        if !self.force.contains(&handle) {
            self.force.push(handle);
        }
        self
    }

    pub fn cache(mut self, enabled: bool) -> Self {
        self.cache = enabled;
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn home_url(mut self, url: impl Into<String>) -> Self {
        self.home_url = url.into();
        self
    }

    pub fn cache_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn cache_url(mut self, url: impl Into<String>) -> Self {
        self.cache_url = url.into();
        self
    }

    pub fn minify_url(mut self, url: impl Into<String>) -> Self {
        self.minify_url = url.into();
        self
    }

    /// Bound a single transform fetch. Sub-millisecond values round up.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        let ms = timeout.as_nanos().div_ceil(1_000_000);
        self.timeout_ms = u64::try_from(ms).unwrap_or(u64::MAX).max(1);
        self
    }

    pub fn timeout_duration(&self) -> Duration {
        match self.timeout_ms {
            0 => Duration::from_millis(DEFAULT_TIMEOUT_MS),
            ms => Duration::from_millis(ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert!(options.cache);
        assert_eq!(options.prefix, "minify");
        assert_eq!(options.cache_dir, Utf8Path::new(".cache/minify"));
        assert_eq!(options.timeout_duration(), Duration::from_secs(10));
    }

    #[test]
    fn test_partial_json() {
        let options =
            Options::from_json(r#"{"ignore": ["jquery"], "force": ["a", "b"], "cache": false}"#)
                .unwrap();
        assert!(options.ignore.contains("jquery"));
        assert_eq!(options.force, vec!["a", "b"]);
        assert!(!options.cache);
        assert_eq!(options.minify_url, "/min/");
    }

    #[test]
    fn test_bad_json() {
        let err = Options::from_json("{ignore").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("minify.json")).unwrap();
        fs::write(&path, r#"{"home_url": "https://example.com", "timeout_ms": 3000}"#).unwrap();

        let options = Options::from_file(&path).unwrap();
        assert_eq!(options.home_url, "https://example.com");
        assert_eq!(options.timeout_duration(), Duration::from_secs(3));
    }

    #[test]
    fn test_force_dedup() {
        let options = Options::new().force("a").force("a").force("b");
        assert_eq!(options.force, vec!["a", "b"]);
    }

    #[test]
    fn test_sub_second_timeout() {
        let options = Options::new().timeout(Duration::from_millis(500));
        assert_eq!(options.timeout_ms, 500);
        assert_eq!(options.timeout_duration(), Duration::from_millis(500));

        let options = Options::new().timeout(Duration::from_micros(10));
        assert_eq!(options.timeout_duration(), Duration::from_millis(1));
    }

    #[test]
    fn test_zero_timeout_uses_default() {
        let options = Options::from_json(r#"{"timeout_ms": 0}"#).unwrap();
        assert_eq!(options.timeout_duration(), Duration::from_secs(10));
        assert_eq!(Options::new().timeout(Duration::ZERO).timeout_duration(), Duration::from_millis(1));
    }
}
