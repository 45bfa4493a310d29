use crate::graph::Dependencies;

fn is_remote(src: &str) -> bool {
    src.starts_with("http://") || src.starts_with("https://") || src.starts_with("//")
}

/// Path of a registered asset relative to the site root.
///
/// Relative sources are made absolute with the graph's `base_url` first,
/// unless they already start with its `content_url`. Anything that does not
/// live below `home_url` afterwards is remote and yields `None`; remote
/// assets are never fetched.
pub fn site_path(graph: &Dependencies, handle: &str, home_url: &str) -> Option<String> {
    let src = graph.get(handle)?.src.as_deref()?;

    let under_content = !graph.content_url.is_empty() && src.starts_with(&graph.content_url);
    let full = if is_remote(src) || under_content {
        src.to_string()
    } else {
        format!("{}{}", graph.base_url, src)
    };

    let path = full.strip_prefix(home_url)?;

    if path.is_empty() || is_remote(path) {
        return None;
    }

    Some(path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Asset;

    const HOME: &str = "https://example.com";

    fn graph() -> Dependencies {
        let mut graph = Dependencies::scripts()
            .with_base_url(HOME)
            .with_content_url("https://example.com/wp-content");
        graph.register(Asset::new("core").src("/wp-includes/js/core.js"));
        graph.register(Asset::new("theme").src("https://example.com/wp-content/themes/t/app.js"));
        graph.register(Asset::new("cdn").src("https://cdn.example.net/lib.js"));
        graph.register(Asset::new("proto").src("//cdn.example.net/lib.js"));
        graph.register(Asset::new("alias"));
        graph
    }

    #[test]
    fn test_relative_source() {
        assert_eq!(
            site_path(&graph(), "core", HOME).as_deref(),
            Some("/wp-includes/js/core.js")
        );
    }

    #[test]
    fn test_content_source() {
        assert_eq!(
            site_path(&graph(), "theme", HOME).as_deref(),
            Some("/wp-content/themes/t/app.js")
        );
    }

    #[test]
    fn test_remote_sources() {
        let graph = graph();
        assert_eq!(site_path(&graph, "cdn", HOME), None);
        assert_eq!(site_path(&graph, "proto", HOME), None);
        assert_eq!(site_path(&graph, "proto", ""), None);
    }

    #[test]
    fn test_no_source_or_missing() {
        let graph = graph();
        assert_eq!(site_path(&graph, "alias", HOME), None);
        assert_eq!(site_path(&graph, "ghost", HOME), None);
    }
}
