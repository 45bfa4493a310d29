use std::collections::{HashMap, HashSet};

use petgraph::Direction;
use petgraph::graphmap::DiGraphMap;

use crate::core::Group;
use crate::graph::Dependencies;

/// Walk the graph from `roots` and return every required handle, each one
/// after all of its dependencies.
///
/// The walk is depth-first: roots in the given order, dependencies in declared
/// order. Independent assets therefore keep the order the host declared them
/// in, which keeps fingerprints reproducible between renders.
///
/// Handles missing from the registry are skipped, as are edges that would
/// close a cycle.
pub fn resolve<'a, I>(graph: &Dependencies, roots: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    resolve_grouped(graph, roots)
        .into_iter()
        .map(|(handle, _)| handle)
        .collect()
}

/// Like [`resolve`], paired with the group each handle is emitted in.
///
/// A dependency is pulled forward into the earliest group of anything that
/// needs it, so a header asset never waits on code that only arrives with the
/// footer.
pub fn resolve_grouped<'a, I>(graph: &Dependencies, roots: I) -> Vec<(String, Group)>
where
    I: IntoIterator<Item = &'a str>,
{
    let walk = Walk::run(graph, roots);
    if walk.ignored > 0 {
        tracing::debug!(edges = walk.ignored, "resolved around dependency cycles");
    }

    let mut groups: HashMap<&str, Group> = walk
        .order
        .iter()
        .map(|&handle| (handle, graph.group(handle)))
        .collect();

    // Dependents come after their dependencies, so walking backwards settles
    // each handle before it is pushed down to what it needs.
    for &handle in walk.order.iter().rev() {
        let Some(&group) = groups.get(handle) else {
            continue;
        };

        for dep in walk.edges.neighbors_directed(handle, Direction::Incoming) {
            if let Some(current) = groups.get_mut(dep) {
                *current = (*current).min(group);
            }
        }
    }

    walk.order
        .iter()
        .map(|&handle| (handle.to_string(), groups[handle]))
        .collect()
}

struct Walk<'a> {
    graph: &'a Dependencies,
    visiting: HashSet<&'a str>,
    seen: HashSet<&'a str>,
    /// Followed edges, dependency to dependent.
    edges: DiGraphMap<&'a str, ()>,
    order: Vec<&'a str>,
    /// Edges dropped because they would close a cycle.
    ignored: usize,
}

impl<'a> Walk<'a> {
    fn run<'r, I>(graph: &'a Dependencies, roots: I) -> Self
    where
        I: IntoIterator<Item = &'r str>,
    {
        let mut walk = Walk {
            graph,
            visiting: HashSet::new(),
            seen: HashSet::new(),
            edges: DiGraphMap::new(),
            order: Vec::new(),
            ignored: 0,
        };

        for root in roots {
            walk.visit(root, None);
        }

        walk
    }

    fn visit(&mut self, handle: &str, dependent: Option<&'a str>) {
        let graph = self.graph;
        let Some(asset) = graph.get(handle) else {
            tracing::debug!(handle, "skipping unregistered asset");
            return;
        };

        let handle = asset.handle.as_str();
        if self.visiting.contains(handle) {
            self.ignored += 1;
            tracing::warn!(handle, dependent, "dependency cycle detected, the closing edge is ignored");
            return;
        }

        if self.seen.insert(handle) {
            self.visiting.insert(handle);
            for dep in &asset.deps {
                self.visit(dep, Some(handle));
            }
            self.visiting.remove(handle);
            self.order.push(handle);
        }

        if let Some(dependent) = dependent {
            self.edges.add_edge(handle, dependent, ());
        }
    }
}
