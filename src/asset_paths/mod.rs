//! Re-prefix root-relative asset references baked into compiled scripts.
//!
//! The detection is textual. Script literals are bounded by a whitelist of asset folder names
//! and the entry document's `href`/`src` attributes are rewritten separately. Filtering of
//! external references, the rewriters and the build output walk live in separate
//! submodules so a structural rewriter can replace the textual one behind
//! [`AssetPathRewriter`] without touching the walk.

mod filters;
mod html;
mod rewrite;
mod walk;

pub use filters::{is_external_context, preceding_context};
pub use html::AttributeRewriter;
pub use rewrite::{AssetPathRewriter, LiteralRewriter, RewrittenSource};
pub use walk::{RewriteSummary, rewrite_build_output, rewrite_document};
