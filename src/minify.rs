use std::time::Instant;

use camino::Utf8Path;

use crate::cache::{Bundled, CacheStatus, Store};
use crate::config::Options;
use crate::core::Group;
use crate::error::CacheError;
use crate::graph::Dependencies;
use crate::inline::{self, Head};
use crate::io::as_overhead;
use crate::queue::{AssetQueue, InlineData, build_queue};
use crate::rewrite::{bundle_handle, rewrite};
use crate::source::site_path;
use crate::transform::{CommandTransform, Transform};

/// The outcome of bundling one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupBundle {
    pub group: Group,
    /// Handle of the registered bundle asset.
    pub handle: String,
    /// Handles folded into the bundle, in emission order.
    pub members: Vec<String>,
    pub bundled: Bundled,
}

/// Everything a single [`Minifier::minify`] run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub bundles: Vec<GroupBundle>,
    /// Number of inline payloads hooked into the head.
    pub inline: usize,
}

impl Summary {
    pub fn count(&self, status: CacheStatus) -> usize {
        self.bundles
            .iter()
            .filter(|bundle| bundle.bundled.status == status)
            .count()
    }
}

/// Where a requested handle ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Bundled(Group),
    NotBundled,
}

/// Read-only view of what bundling would do to the current request queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub entries: Vec<(String, Placement)>,
}

/// Bundles the requested assets of a dependency graph.
///
/// A `Minifier` holds the options, the cache [`Store`] and the [`Transform`]
/// used on a cache miss. It keeps no per-page state, so one instance serves
/// any number of renders; each render passes its own graph and head.
///
/// # Example
///
/// ```rust,no_run
/// use bundlecache::{Asset, Dependencies, Head, Minifier, Options};
///
/// let options = Options::new().home_url("https://example.com");
/// let minifier = Minifier::with_command(options, "public");
///
/// let mut scripts = Dependencies::scripts().with_base_url("https://example.com");
/// scripts.register(Asset::new("jquery").src("/js/jquery.js").ver("3.7"));
/// scripts.register(Asset::new("app").src("/js/app.js").ver("1").deps(["jquery"]));
/// scripts.enqueue("app");
///
/// let mut head = Head::new();
/// let summary = minifier.minify(&mut scripts, &mut head);
/// assert_eq!(summary.bundles.len(), 1);
/// ```
pub struct Minifier<T: Transform = CommandTransform> {
    options: Options,
    store: Store,
    transform: T,
}

impl Minifier<CommandTransform> {
    /// Set up a minifier that pipes sources found under `root` through
    /// `esbuild`.
    pub fn with_command(options: Options, root: impl AsRef<Utf8Path>) -> Self {
        let transform =
            CommandTransform::new(root.as_ref()).timeout(options.timeout_duration());
        Self::new(options, transform)
    }

    /// Load options from a JSON file and set up an `esbuild` minifier.
    pub fn from_file(path: impl AsRef<Utf8Path>, root: impl AsRef<Utf8Path>) -> anyhow::Result<Self> {
        let options = Options::from_file(path)?;
        Ok(Self::with_command(options, root))
    }
}

impl<T: Transform> Minifier<T> {
    pub fn new(options: Options, transform: T) -> Self {
        let store = Store::new(
            options.cache_dir.clone(),
            options.cache_url.clone(),
            options.minify_url.clone(),
        );

        Self {
            options,
            store,
            transform,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Resolve the requested and forced handles into per-group queues.
    ///
    /// Bundles registered by an earlier run are never folded into a new one.
    /// Does not touch the graph, so it is safe to call for diagnostics.
    pub fn asset_queue(&self, graph: &Dependencies) -> (AssetQueue, InlineData) {
        let own = self.bundle_prefix(graph);
        let mut ignore = self.options.ignore.clone();
        ignore.extend(
            graph
                .registered()
                .filter(|asset| asset.handle.starts_with(&own))
                .map(|asset| asset.handle.clone()),
        );

        build_queue(graph, &ignore, &self.options.force)
    }

    /// Common start of every bundle handle this minifier registers in `graph`.
    fn bundle_prefix(&self, graph: &Dependencies) -> String {
        format!("{}-{}-", self.options.prefix, graph.kind())
    }

    /// Run the whole pipeline on `graph`.
    ///
    /// Each group is replaced by one bundle asset pointing at a cached file or
    /// at the on-the-fly endpoint, the graph is rewired to depend on the
    /// bundles, and the inline payloads are hooked into `head`. Nothing here
    /// fails the render: problems degrade to uncached bundles.
    pub fn minify(&self, graph: &mut Dependencies, head: &mut Head) -> Summary {
        let s = Instant::now();
        let span = tracing::info_span!("minify", kind = %graph.kind());
        let _enter = span.enter();

        let (queue, inline) = self.asset_queue(graph);
        let mut summary = Summary::default();

        for (group, members) in queue.groups() {
            if members.is_empty() {
                continue;
            }

            let handle = bundle_handle(&self.options.prefix, graph, group);

            let bundled = {
                let graph = &*graph;
                let sources = || -> Vec<String> {
                    members
                        .handles()
                        .filter_map(|member| site_path(graph, member, &self.options.home_url))
                        .collect()
                };

                self.store.get_or_build(
                    graph.kind(),
                    members,
                    sources,
                    &self.transform,
                    self.options.cache,
                )
            };

            rewrite(graph, group, members, &handle, bundled.url.clone());

            summary.bundles.push(GroupBundle {
                group,
                handle,
                members: members.handles().map(str::to_string).collect(),
                bundled,
            });
        }

        summary.inline = inline.len();
        inline::register(head, inline);

        tracing::info!(
            "Bundled {} groups ({} cached, {} built, {} uncached) {}",
            summary.bundles.len(),
            summary.count(CacheStatus::Hit),
            summary.count(CacheStatus::Stored),
            summary.count(CacheStatus::Uncached),
            as_overhead(s)
        );

        summary
    }

    /// Classify every requested handle without changing the graph.
    ///
    /// Bundle handles from an earlier run are left out.
    pub fn report(&self, graph: &Dependencies) -> Report {
        let (queue, _) = self.asset_queue(graph);
        let own = self.bundle_prefix(graph);

        let entries = graph
            .queue
            .iter()
            .filter(|handle| !handle.starts_with(&own))
            .map(|handle| {
                let placement = match queue.group_of(handle) {
                    Some(group) => Placement::Bundled(group),
                    None => Placement::NotBundled,
                };
                (handle.clone(), placement)
            })
            .collect();

        Report { entries }
    }

    /// Delete every cached bundle. Returns the number of files removed.
    pub fn clear_cache(&self) -> Result<usize, CacheError> {
        self.store.clear()
    }
}
