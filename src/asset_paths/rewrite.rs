use regex::Regex;

use crate::asset_paths::filters::{is_external_context, preceding_context};
use crate::models::BasePath;

/// Quoting styles recognised around asset literals.
const QUOTES: [char; 3] = ['\'', '"', '`'];

/// Result of rewriting one script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenSource {
    /// Script text after rewriting.
    pub text: String,
    /// Number of literals that received the base path.
    pub replacements: usize,
}

/// Rewrites root-relative asset references so they resolve below a base path.
pub trait AssetPathRewriter {
    /// Rewrite the asset references in `source` for a project served from `base_path`.
    fn rewrite(&self, source: &str, base_path: &BasePath) -> RewrittenSource;
}

/// Textual rewriter matching quoted `/<folder>/...` literals for a whitelist of folders.
#[derive(Debug, Clone)]
pub struct LiteralRewriter {
    patterns: Vec<Regex>,
}

impl LiteralRewriter {
    /// Build a rewriter for the given asset folder names.
    pub fn new<S: AsRef<str>>(asset_folders: &[S]) -> Self {
        let folders: Vec<String> = asset_folders
            .iter()
            .map(|folder| folder.as_ref().trim_matches('/'))
            .filter(|folder| !folder.is_empty())
            .map(regex::escape)
            .collect();

        if folders.is_empty() {
            return Self {
                patterns: Vec::new(),
            };
        }

        let alternation = folders.join("|");
        let patterns = QUOTES
            .iter()
            .map(|quote| {
                Regex::new(&format!(
                    r"{quote}(/(?:{alternation})/[^{quote}\r\n]*){quote}"
                ))
                .expect("invalid asset literal regex")
            })
            .collect();

        Self { patterns }
    }
}

impl AssetPathRewriter for LiteralRewriter {
    fn rewrite(&self, source: &str, base_path: &BasePath) -> RewrittenSource {
        let prefix = base_path.without_trailing_slash();
        if prefix.is_empty() {
            return RewrittenSource {
                text: source.to_string(),
                replacements: 0,
            };
        }

        let mut text = source.to_string();
        let mut replacements = 0;
        for pattern in &self.patterns {
            let (next, count) = prefix_literals(pattern, &text, base_path.as_str(), prefix);
            text = next;
            replacements += count;
        }

        RewrittenSource { text, replacements }
    }
}

fn prefix_literals(pattern: &Regex, text: &str, base: &str, prefix: &str) -> (String, usize) {
    let mut output = String::with_capacity(text.len());
    let mut copied_up_to = 0;
    let mut count = 0;

    for caps in pattern.captures_iter(text) {
        let (Some(whole), Some(literal)) = (caps.get(0), caps.get(1)) else {
            continue;
        };

        let line_start = text[..whole.start()].rfind('\n').map_or(0, |index| index + 1);
        let context = preceding_context(&text[line_start..whole.start()]);
        if is_external_context(context) || literal.as_str().starts_with(base) {
            continue;
        }

        output.push_str(&text[copied_up_to..literal.start()]);
        output.push_str(prefix);
        copied_up_to = literal.start();
        count += 1;
    }

    output.push_str(&text[copied_up_to..]);
    (output, count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewriter() -> LiteralRewriter {
        LiteralRewriter::new(&["textures", "models", "static"])
    }

    fn base(raw: &str) -> BasePath {
        BasePath::normalize(raw)
    }

    #[test]
    fn prefixes_literals_in_every_quote_style() {
        let source = "a.load('/textures/wood.jpg');b.load(\"/models/duck.glb\");c=`/static/x.png`;";
        let result = rewriter().rewrite(source, &base("photo-lab"));

        assert_eq!(
            result.text,
            "a.load('/photo-lab/textures/wood.jpg');b.load(\"/photo-lab/models/duck.glb\");c=`/photo-lab/static/x.png`;"
        );
        assert_eq!(result.replacements, 3);
    }

    #[test]
    fn leaves_external_urls_byte_identical() {
        let source = concat!(
            "a.load('https://cdn.example/textures/x.jpg');\n",
            "b.load('//cdn.example/textures/x.jpg');\n",
            "c.load(\"https://cdn.example\"+\"/textures/x.jpg\");\n",
            "d.load('//cdn.example'+'/textures/x.jpg');\n",
            "// fallback: '/textures/x.jpg'\n",
        );
        let result = rewriter().rewrite(source, &base("photo-lab"));

        assert_eq!(result.text, source);
        assert_eq!(result.replacements, 0);
    }

    #[test]
    fn rewriting_is_idempotent() {
        let source = "x('/textures/a.jpg');y(\"/models/b.glb\");z('/other/c.txt');";
        let once = rewriter().rewrite(source, &base("/course/lesson/"));
        let twice = rewriter().rewrite(&once.text, &base("/course/lesson/"));

        assert_eq!(once.replacements, 2);
        assert_eq!(twice.text, once.text);
        assert_eq!(twice.replacements, 0);
    }

    #[test]
    fn base_path_named_like_an_asset_folder_is_not_prefixed_twice() {
        let source = "x('/models/a.glb');y('/textures/b.jpg');";
        let once = rewriter().rewrite(source, &base("/static/"));
        assert_eq!(once.text, "x('/static/models/a.glb');y('/static/textures/b.jpg');");

        let twice = rewriter().rewrite(&once.text, &base("/static/"));
        assert_eq!(twice.text, once.text);
        assert_eq!(twice.replacements, 0);
    }

    #[test]
    fn ignores_folders_outside_the_whitelist_and_partial_names() {
        let source = "a('/texturesX/a.jpg');b('/assets/index.js');c('textures/a.jpg');";
        let result = rewriter().rewrite(source, &base("lab"));
        assert_eq!(result.text, source);
    }

    #[test]
    fn root_base_path_is_a_no_op() {
        let source = "a('/textures/a.jpg');";
        let result = rewriter().rewrite(source, &base("/"));
        assert_eq!(result.text, source);
        assert_eq!(result.replacements, 0);
    }

    #[test]
    fn empty_whitelist_matches_nothing() {
        let empty: [&str; 0] = [];
        let result = LiteralRewriter::new(&empty).rewrite("a('/textures/a.jpg')", &base("lab"));
        assert_eq!(result.replacements, 0);
    }
}
