//! The host's dependency graph.
//!
//! A [`Dependencies`] value holds every registered [`Asset`] of one family
//! (scripts or styles), the handles explicitly requested for the current page,
//! and the list of handles already satisfied. The host fills it in, hands it to
//! [`crate::Minifier::minify`] as a mutable borrow, and reads it back to emit
//! the final tags.
//!
//! Registration order is preserved; it is the order in which the rewriter
//! visits assets, so rewrites are reproducible.

use std::collections::{HashMap, HashSet};

use crate::core::{AssetKind, Group};
use crate::error::BundleError;

/// A single registered script or style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Unique identifier.
    pub handle: String,
    /// URL or site path. `None` for alias assets that only pull in deps.
    pub src: Option<String>,
    /// Handles this asset must be emitted after.
    pub deps: Vec<String>,
    /// Opaque version token, part of the fingerprint.
    pub ver: Option<String>,
    /// Inline script source emitted ahead of the asset (e.g. localization).
    pub data: Option<String>,
    /// Render position.
    pub group: Group,
}

impl Asset {
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            src: None,
            deps: Vec::new(),
            ver: None,
            data: None,
            group: Group::HEADER,
        }
    }

    pub fn src(mut self, src: impl Into<String>) -> Self {
        self.src = Some(src.into());
        self
    }

    pub fn deps<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deps = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn ver(mut self, ver: impl Into<String>) -> Self {
        self.ver = Some(ver.into());
        self
    }

    pub fn data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn group(mut self, group: Group) -> Self {
        self.group = group;
        self
    }

    pub fn in_footer(self) -> Self {
        self.group(Group::FOOTER)
    }
}

/// Dependency graph for one asset family.
#[derive(Debug, Clone)]
pub struct Dependencies {
    kind: AssetKind,
    /// Prepended to relative sources.
    pub base_url: String,
    /// Sources starting with this URL are already absolute.
    pub content_url: String,
    registered: Vec<Asset>,
    index: HashMap<String, usize>,
    /// Handles explicitly requested for this page, in request order.
    pub queue: Vec<String>,
    done: Vec<String>,
    done_set: HashSet<String>,
}

impl Dependencies {
    pub fn new(kind: AssetKind) -> Self {
        Self {
            kind,
            base_url: String::new(),
            content_url: String::new(),
            registered: Vec::new(),
            index: HashMap::new(),
            queue: Vec::new(),
            done: Vec::new(),
            done_set: HashSet::new(),
        }
    }

    /// Set up a graph from a family name such as `"scripts"` or
    /// `"WP_Styles"`. Any other name is a configuration error.
    pub fn for_family(name: &str) -> Result<Self, BundleError> {
        Ok(Self::new(name.parse()?))
    }

    pub fn scripts() -> Self {
        Self::new(AssetKind::Script)
    }

    pub fn styles() -> Self {
        Self::new(AssetKind::Style)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_content_url(mut self, url: impl Into<String>) -> Self {
        self.content_url = url.into();
        self
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    /// Register an asset. Returns `false` and leaves the graph untouched if
    /// the handle is already taken.
    pub fn register(&mut self, asset: Asset) -> bool {
        if self.index.contains_key(&asset.handle) {
            return false;
        }

        self.index.insert(asset.handle.clone(), self.registered.len());
        self.registered.push(asset);
        true
    }

    /// Request a handle for the current page. Requesting twice is a no-op.
    pub fn enqueue(&mut self, handle: impl Into<String>) {
        let handle = handle.into();
        if !self.queue.contains(&handle) {
            self.queue.push(handle);
        }
    }

    pub fn get(&self, handle: &str) -> Option<&Asset> {
        self.index.get(handle).map(|&i| &self.registered[i])
    }

    pub fn get_mut(&mut self, handle: &str) -> Option<&mut Asset> {
        self.index.get(handle).map(|&i| &mut self.registered[i])
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.index.contains_key(handle)
    }

    /// Group of a registered handle; unregistered handles sit in the header.
    pub fn group(&self, handle: &str) -> Group {
        self.get(handle).map(|asset| asset.group).unwrap_or_default()
    }

    /// Every registered asset, in registration order.
    pub fn registered(&self) -> impl Iterator<Item = &Asset> {
        self.registered.iter()
    }

    pub(crate) fn registered_mut(&mut self) -> impl Iterator<Item = &mut Asset> {
        self.registered.iter_mut()
    }

    /// Mark a handle as satisfied so the host will not emit it on its own.
    pub fn mark_done(&mut self, handle: &str) {
        if self.done_set.insert(handle.to_string()) {
            self.done.push(handle.to_string());
        }
    }

    pub fn is_done(&self, handle: &str) -> bool {
        self.done_set.contains(handle)
    }

    /// Satisfied handles, in the order they were marked.
    pub fn done(&self) -> &[String] {
        &self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_family() {
        assert_eq!(Dependencies::for_family("WP_Scripts").unwrap().kind(), AssetKind::Script);
        assert_eq!(Dependencies::for_family("styles").unwrap().kind(), AssetKind::Style);

        let err = Dependencies::for_family("WP_Widgets").unwrap_err();
        assert_eq!(err.to_string(), "'WP_Widgets' is not a script or style dependency graph");
    }

    #[test]
    fn test_register_once() {
        let mut graph = Dependencies::scripts();
        assert!(graph.register(Asset::new("a").ver("1")));
        assert!(!graph.register(Asset::new("a").ver("2")));
        assert_eq!(graph.get("a").unwrap().ver.as_deref(), Some("1"));
    }

    #[test]
    fn test_registration_order() {
        let mut graph = Dependencies::styles();
        graph.register(Asset::new("b"));
        graph.register(Asset::new("a"));
        graph.register(Asset::new("c"));

        let handles: Vec<_> = graph.registered().map(|a| a.handle.as_str()).collect();
        assert_eq!(handles, ["b", "a", "c"]);
    }

    #[test]
    fn test_group_default() {
        let mut graph = Dependencies::scripts();
        graph.register(Asset::new("f").in_footer());
        assert_eq!(graph.group("f"), Group::FOOTER);
        assert_eq!(graph.group("missing"), Group::HEADER);
    }

    #[test]
    fn test_done_and_queue_dedup() {
        let mut graph = Dependencies::scripts();
        graph.enqueue("a");
        graph.enqueue("a");
        graph.mark_done("a");
        graph.mark_done("a");
        assert_eq!(graph.queue, ["a"]);
        assert_eq!(graph.done(), ["a"]);
        assert!(graph.is_done("a"));
    }
}
