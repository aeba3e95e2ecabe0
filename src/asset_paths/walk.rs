use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::asset_paths::rewrite::AssetPathRewriter;
use crate::error::RewriteError;
use crate::models::BasePath;
use crate::project::WorkspaceLayout;

/// Totals collected while rewriting a build output directory.
#[derive(Debug, Default)]
pub struct RewriteSummary {
    /// Script files inspected.
    pub files_scanned: usize,
    /// Script files written back with at least one replacement.
    pub files_changed: usize,
    /// Literals that received the base path.
    pub replacements: usize,
    /// Files that could not be read or written; they were left untouched.
    pub failures: Vec<RewriteError>,
}

/// Rewrite every compiled script below `output_dir` for a project served from `base_path`.
///
/// The pass is best-effort: unreadable directories and files are logged and skipped. A file is
/// only written when at least one literal changed.
pub fn rewrite_build_output<R: AssetPathRewriter + ?Sized>(
    rewriter: &R,
    output_dir: &Path,
    base_path: &BasePath,
    layout: &WorkspaceLayout,
) -> RewriteSummary {
    let mut summary = RewriteSummary::default();
    if base_path.is_root() {
        return summary;
    }
    rewrite_dir(rewriter, output_dir, base_path, layout, &mut summary);
    summary
}

/// Rewrite a single document, such as the entry `index.html` of a build output.
///
/// A missing document is not an error and leaves the summary empty.
pub fn rewrite_document<R: AssetPathRewriter + ?Sized>(
    rewriter: &R,
    path: &Path,
    base_path: &BasePath,
) -> RewriteSummary {
    let mut summary = RewriteSummary::default();
    if base_path.is_root() || !path.is_file() {
        return summary;
    }

    summary.files_scanned = 1;
    match rewrite_file(rewriter, path, base_path) {
        Ok(0) => {}
        Ok(count) => {
            summary.files_changed = 1;
            summary.replacements = count;
        }
        Err(err) => {
            warn!("{}", err);
            summary.failures.push(err);
        }
    }
    summary
}

fn rewrite_dir<R: AssetPathRewriter + ?Sized>(
    rewriter: &R,
    dir: &Path,
    base_path: &BasePath,
    layout: &WorkspaceLayout,
    summary: &mut RewriteSummary,
) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("failed to list {}: {}", dir.display(), err);
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            rewrite_dir(rewriter, &path, base_path, layout, summary);
        } else if file_type.is_file() && layout.is_script_file(&path) {
            summary.files_scanned += 1;
            match rewrite_file(rewriter, &path, base_path) {
                Ok(0) => {}
                Ok(count) => {
                    debug!("rewrote {} asset path(s) in {}", count, path.display());
                    summary.files_changed += 1;
                    summary.replacements += count;
                }
                Err(err) => {
                    warn!("{}", err);
                    summary.failures.push(err);
                }
            }
        }
    }
}

fn rewrite_file<R: AssetPathRewriter + ?Sized>(
    rewriter: &R,
    path: &Path,
    base_path: &BasePath,
) -> Result<usize, RewriteError> {
    let source = fs::read_to_string(path).map_err(|source| RewriteError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let rewritten = rewriter.rewrite(&source, base_path);
    if rewritten.replacements == 0 {
        return Ok(0);
    }

    fs::write(path, rewritten.text).map_err(|source| RewriteError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(rewritten.replacements)
}
