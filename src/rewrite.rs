use crate::core::Group;
use crate::graph::{Asset, Dependencies};
use crate::queue::GroupQueue;

/// Handle of the synthetic bundle asset of a group.
pub fn bundle_handle(prefix: &str, graph: &Dependencies, group: Group) -> String {
    format!("{prefix}-{}-{group}", graph.kind())
}

/// Replace the members of one group with its bundle.
///
/// 1. Members are marked done, so the host never emits them on its own.
/// 2. Every other asset depending on a member gains a dependency on the
///    bundle, so it still waits for that code.
/// 3. The bundle is registered with `src`, no version, and enqueued.
///
/// Only `members` is considered; running this per group keeps a footer
/// bundle from being wired to header-only dependents.
pub fn rewrite(graph: &mut Dependencies, group: Group, members: &GroupQueue, handle: &str, src: String) {
    for member in members.handles() {
        graph.mark_done(member);
    }

    for asset in graph.registered_mut() {
        if asset.handle == handle || members.contains(&asset.handle) {
            continue;
        }

        let depends = asset.deps.iter().any(|dep| members.contains(dep));
        if depends && !asset.deps.iter().any(|dep| dep == handle) {
            tracing::debug!(asset = %asset.handle, bundle = handle, "rewired dependency");
            asset.deps.push(handle.to_string());
        }
    }

    match graph.get_mut(handle) {
        Some(bundle) => {
            bundle.src = Some(src);
            bundle.group = group;
        }
        None => {
            graph.register(Asset::new(handle).src(src).group(group));
        }
    }

    graph.enqueue(handle);
}
