#![forbid(unsafe_code)]
//! Dependency-ordered bundling of scripts and styles with a fingerprinted
//! on-disk cache.
//!
//! The host registers its assets in a [`Dependencies`] graph, requests the
//! ones a page needs, and hands the graph to [`Minifier::minify`] before
//! emitting any tags. The minifier:
//!
//! 1. resolves the requested and forced handles in dependency order,
//! 2. splits them into render groups (header, footer), skipping ignored ones,
//! 3. fingerprints each group by its `(handle, version)` pairs,
//! 4. serves a cached bundle for that fingerprint, or builds one through a
//!    [`Transform`] and stores it,
//! 5. replaces the group members with one bundle asset in the graph,
//! 6. hooks the members' inline payloads into the page [`Head`].
//!
//! Rendering never fails because of bundling. A broken transform or an
//! unwritable cache only means the page gets the on-the-fly URL.

mod cache;
mod config;
mod core;
mod error;
mod graph;
mod inline;
mod io;
mod minify;
mod queue;
mod resolve;
mod rewrite;
mod source;
mod transform;
mod utils;

pub use crate::cache::{Bundled, CacheStatus, Store, fingerprint};
pub use crate::config::Options;
pub use crate::core::{AssetKind, Group, Hash32};
pub use crate::error::*;
pub use crate::graph::{Asset, Dependencies};
pub use crate::inline::{Head, INLINE_HOOK, INLINE_PRIORITY, render_inline};
pub use crate::minify::{GroupBundle, Minifier, Placement, Report, Summary};
pub use crate::queue::{AssetQueue, GroupQueue, InlineData, QueueEntry, build_queue};
pub use crate::resolve::{resolve, resolve_grouped};
pub use crate::rewrite::{bundle_handle, rewrite};
pub use crate::source::site_path;
pub use crate::transform::{CommandTransform, Transform, TransformRequest};
#[cfg(feature = "logging")]
pub use crate::utils::init_logging;
