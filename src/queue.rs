//! Partitioning of the resolved traversal into per-group queues.

use std::collections::HashSet;

use crate::core::Group;
use crate::graph::Dependencies;
use crate::resolve::resolve_grouped;

/// A queued asset: the pair that feeds the fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub handle: String,
    pub version: Option<String>,
}

/// Ordered, duplicate-free queue of one group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupQueue {
    entries: Vec<QueueEntry>,
}

impl GroupQueue {
    fn push(&mut self, entry: QueueEntry) {
        if !self.contains(&entry.handle) {
            self.entries.push(entry);
        }
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn handles(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.handle.as_str())
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.entries.iter().any(|entry| entry.handle == handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolved queue of a whole graph, groups in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetQueue {
    groups: Vec<(Group, GroupQueue)>,
}

impl AssetQueue {
    fn group_mut(&mut self, group: Group) -> &mut GroupQueue {
        let index = match self.groups.iter().position(|(g, _)| *g == group) {
            Some(index) => index,
            None => {
                self.groups.push((group, GroupQueue::default()));
                self.groups.len() - 1
            }
        };

        &mut self.groups[index].1
    }

    pub fn get(&self, group: Group) -> Option<&GroupQueue> {
        self.groups
            .iter()
            .find(|(g, _)| *g == group)
            .map(|(_, queue)| queue)
    }

    pub fn groups(&self) -> impl Iterator<Item = (Group, &GroupQueue)> {
        self.groups.iter().map(|(group, queue)| (*group, queue))
    }

    /// The group a handle was queued in, if any.
    pub fn group_of(&self, handle: &str) -> Option<Group> {
        self.groups()
            .find(|(_, queue)| queue.contains(handle))
            .map(|(group, _)| group)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|(_, queue)| queue.is_empty())
    }
}

/// Inline payloads of queued assets, keyed by handle in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineData {
    entries: Vec<(String, String)>,
}

impl InlineData {
    fn insert(&mut self, handle: &str, data: &str) {
        if !self.entries.iter().any(|(h, _)| h == handle) {
            self.entries.push((handle.to_string(), data.to_string()));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(h, d)| (h.as_str(), d.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolve the requested and forced handles and split them into groups.
///
/// Ignored handles are dropped, along with their payloads. Dependencies of an
/// ignored asset are still queued if something reaches them. Handles the host
/// already marked done are left out too.
///
/// Each handle lands in the earliest group of anything depending on it, not
/// necessarily the group it was registered in.
///
/// This only reads the graph, so it can be called as often as needed.
pub fn build_queue(
    graph: &Dependencies,
    ignore: &HashSet<String>,
    force: &[String],
) -> (AssetQueue, InlineData) {
    let roots = graph
        .queue
        .iter()
        .chain(force.iter())
        .map(String::as_str);

    let mut queue = AssetQueue::default();
    let mut inline = InlineData::default();

    for (handle, group) in resolve_grouped(graph, roots) {
        if ignore.contains(&handle) {
            tracing::debug!(handle = %handle, "ignored");
            continue;
        }

        if graph.is_done(&handle) {
            continue;
        }

        let Some(asset) = graph.get(&handle) else {
            continue;
        };

        queue.group_mut(group).push(QueueEntry {
            handle: asset.handle.clone(),
            version: asset.ver.clone(),
        });

        if let Some(data) = asset.data.as_deref().filter(|data| !data.is_empty()) {
            inline.insert(&asset.handle, data);
        }
    }

    (queue, inline)
}
