use regex::Regex;

use crate::asset_paths::rewrite::{AssetPathRewriter, RewrittenSource};
use crate::models::BasePath;

/// Re-prefixes root-relative `href` and `src` attributes of an HTML document.
///
/// Build tools emit the entry document with references such as `src="/assets/index-1a2b.js"`
/// when no base is configured; once the output is served from a sub-path those have to point
/// below it. Protocol-relative and absolute URLs are left alone.
#[derive(Debug, Clone)]
pub struct AttributeRewriter {
    patterns: Vec<Regex>,
}

impl AttributeRewriter {
    /// Build a rewriter for double and single quoted attribute values.
    pub fn new() -> Self {
        let patterns = ['"', '\'']
            .iter()
            .map(|quote| {
                Regex::new(&format!(
                    r"\s(?:href|src)\s*=\s*{quote}(/[^{quote}\r\n]+){quote}"
                ))
                .expect("invalid attribute regex")
            })
            .collect();
        Self { patterns }
    }
}

impl Default for AttributeRewriter {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetPathRewriter for AttributeRewriter {
    fn rewrite(&self, source: &str, base_path: &BasePath) -> RewrittenSource {
        let prefix = base_path.without_trailing_slash();
        let mut text = source.to_string();
        let mut replacements = 0;
        if prefix.is_empty() {
            return RewrittenSource { text, replacements };
        }

        for pattern in &self.patterns {
            let mut output = String::with_capacity(text.len());
            let mut copied_up_to = 0;
            for caps in pattern.captures_iter(&text) {
                let Some(value) = caps.get(1) else {
                    continue;
                };
                let url = value.as_str();
                let external = url.starts_with("//") || url.contains("://");
                if external || url.starts_with(base_path.as_str()) {
                    continue;
                }
                output.push_str(&text[copied_up_to..value.start()]);
                output.push_str(prefix);
                copied_up_to = value.start();
                replacements += 1;
            }
            output.push_str(&text[copied_up_to..]);
            text = output;
        }
        RewrittenSource { text, replacements }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(raw: &str) -> BasePath {
        BasePath::normalize(raw)
    }

    const DOCUMENT: &str = r#"<!doctype html>
<html>
  <head>
    <link rel="icon" href="/favicon.svg">
    <link rel="stylesheet" href='/assets/index-9f8e.css'>
    <link rel="preconnect" href="https://fonts.example">
    <script src="//cdn.example/three.js"></script>
    <script type="module" crossorigin src="/assets/index-1a2b.js"></script>
  </head>
  <body><a href="/">home</a><div id="app"></div></body>
</html>
"#;

    #[test]
    fn prefixes_root_relative_attributes() {
        let result = AttributeRewriter::new().rewrite(DOCUMENT, &base("photo-lab"));

        assert_eq!(result.replacements, 3);
        assert!(result.text.contains(r#"href="/photo-lab/favicon.svg""#));
        assert!(result.text.contains(r#"href='/photo-lab/assets/index-9f8e.css'"#));
        assert!(result.text.contains(r#"src="/photo-lab/assets/index-1a2b.js""#));
        assert!(result.text.contains(r#"href="https://fonts.example""#));
        assert!(result.text.contains(r#"src="//cdn.example/three.js""#));
        assert!(result.text.contains(r#"<a href="/">"#));
    }

    #[test]
    fn second_pass_changes_nothing() {
        let rewriter = AttributeRewriter::new();
        let once = rewriter.rewrite(DOCUMENT, &base("/course/lesson/"));
        let twice = rewriter.rewrite(&once.text, &base("/course/lesson/"));
        assert_eq!(twice.text, once.text);
        assert_eq!(twice.replacements, 0);
    }

    #[test]
    fn ignores_other_attributes_and_root_base() {
        let source = r#"<img data-src="/images/a.png" alt="/images/a.png">"#;
        let result = AttributeRewriter::new().rewrite(source, &base("lab"));
        assert_eq!(result.text, source);

        let result = AttributeRewriter::new().rewrite(DOCUMENT, &base("/"));
        assert_eq!(result.text, DOCUMENT);
    }
}
