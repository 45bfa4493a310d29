//! Emission of inline payloads into the page head.
//!
//! The host renders `<head>` by calling [`Head::render`], which runs every
//! registered hook in priority order. Bundling registers one hook at
//! [`INLINE_PRIORITY`] that prints the collected payloads, so they are
//! defined before the bundled code that reads them.

use std::fmt::Write;

use crate::queue::InlineData;

/// Priority of the inline-data hook. Lower runs earlier.
pub const INLINE_PRIORITY: i32 = 2;

/// Identifier of the inline-data hook.
pub const INLINE_HOOK: &str = "inline-data";

type HookFn = Box<dyn FnMut(&mut String) + Send>;

struct Hook {
    id: String,
    priority: i32,
    callback: HookFn,
}

/// Callbacks run while the page head is rendered.
#[derive(Default)]
pub struct Head {
    hooks: Vec<Hook>,
}

impl std::fmt::Debug for Head {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.hooks.iter().map(|hook| (&hook.id, hook.priority)))
            .finish()
    }
}

impl Head {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook under `id`. Returns `false` without replacing
    /// anything if `id` is already taken.
    pub fn add<F>(&mut self, id: impl Into<String>, priority: i32, callback: F) -> bool
    where
        F: FnMut(&mut String) + Send + 'static,
    {
        let id = id.into();
        if self.contains(&id) {
            return false;
        }

        self.hooks.push(Hook {
            id,
            priority,
            callback: Box::new(callback),
        });
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.hooks.iter().any(|hook| hook.id == id)
    }

    /// Run every hook, lowest priority first, ties in registration order.
    pub fn render(&mut self) -> String {
        self.hooks.sort_by_key(|hook| hook.priority);

        let mut out = String::new();
        for hook in &mut self.hooks {
            (hook.callback)(&mut out);
        }
        out
    }
}

/// One `<script>` block per payload, in insertion order, verbatim.
pub fn render_inline(data: &InlineData) -> String {
    let mut out = String::new();
    for (_, payload) in data.iter() {
        let _ = write!(out, "<script>{payload}</script>");
    }
    out
}

/// Hook the payloads into `head`.
///
/// Nothing is registered for an empty table, and a second registration is
/// ignored. The hook prints on its first run only.
pub fn register(head: &mut Head, data: InlineData) -> bool {
    if data.is_empty() || head.contains(INLINE_HOOK) {
        return false;
    }

    let mut pending = Some(data);
    head.add(INLINE_HOOK, INLINE_PRIORITY, move |out| {
        if let Some(data) = pending.take() {
            out.push_str(&render_inline(&data));
        }
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::graph::{Asset, Dependencies};
    use crate::queue::build_queue;

    fn data() -> InlineData {
        let mut graph = Dependencies::scripts();
        graph.register(Asset::new("h1").data("var one = 1;"));
        graph.register(Asset::new("h2").data(r#"var two = "</b>";"#).in_footer());
        graph.enqueue("h1");
        graph.enqueue("h2");
        build_queue(&graph, &HashSet::new(), &[]).1
    }

    #[test]
    fn test_render_verbatim_in_order() {
        assert_eq!(
            render_inline(&data()),
            r#"<script>var one = 1;</script><script>var two = "</b>";</script>"#
        );
    }

    #[test]
    fn test_exactly_once() {
        let mut head = Head::new();
        assert!(register(&mut head, data()));
        assert!(!register(&mut head, data()));

        let first = head.render();
        assert_eq!(first.matches("<script>").count(), 2);
        assert!(first.find("one").unwrap() < first.find("two").unwrap());

        assert_eq!(head.render(), "");
    }

    #[test]
    fn test_empty_not_registered() {
        let mut head = Head::new();
        assert!(!register(&mut head, InlineData::default()));
        assert!(!head.contains(INLINE_HOOK));
    }

    #[test]
    fn test_priority_order() {
        let mut head = Head::new();
        head.add("late", 10, |out| out.push_str("<meta name=late>"));
        register(&mut head, data());
        head.add("first", 1, |out| out.push_str("<meta charset=utf-8>"));

        let html = head.render();
        let charset = html.find("charset").unwrap();
        let inline = html.find("<script>").unwrap();
        let late = html.find("late").unwrap();
        assert!(charset < inline && inline < late);
    }
}
