//! Workspace scanning producing the ordered, immutable project list.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::discovery::descriptor::read_project;
use crate::error::BundleError;
use crate::models::{BasePath, Project};
use crate::project::WorkspaceLayout;
use crate::selection::ProjectInclusion;

/// Leading digits of a project name, e.g. `12` for `12-lights`.
pub fn numeric_prefix(name: &str) -> Option<&str> {
    let end = name
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(name.len());
    (end > 0).then(|| &name[..end])
}

/// Compare digit strings by value without parsing, so prefixes of any length are ordered.
fn compare_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn compare_names(a: &str, b: &str) -> Ordering {
    match (numeric_prefix(a), numeric_prefix(b)) {
        (Some(left), Some(right)) => compare_digits(left, right).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Scan the immediate child directories of `root` for buildable projects.
///
/// Projects are ordered by numeric name prefix, then by name; unnumbered names follow the
/// numbered ones. When two projects claim the same base path the first one in that order keeps
/// it and the other is skipped.
pub fn discover_projects<S: ProjectInclusion>(
    root: &Path,
    layout: &WorkspaceLayout,
    selection: &S,
) -> Result<Vec<Project>, BundleError> {
    let entries = fs::read_dir(root).map_err(|source| BundleError::WorkspaceRead {
        root: root.to_path_buf(),
        source,
    })?;

    let mut projects = Vec::new();
    for entry in entries.flatten() {
        if !entry.file_type().is_ok_and(|ft| ft.is_dir()) {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        if layout.is_ignored_dir(&name) {
            continue;
        }
        if !selection.is_included(&name) {
            debug!("{} excluded by selection", name);
            continue;
        }

        if let Some(project) = read_project(&entry.path(), layout) {
            projects.push(project);
        }
    }

    projects.sort_by(|a, b| compare_names(&a.name, &b.name));

    let mut claimed: BTreeMap<BasePath, String> = BTreeMap::new();
    projects.retain(|project| match claimed.get(&project.base_path) {
        Some(owner) => {
            warn!(
                "skipping {}: base path {} is already used by {}",
                project.name, project.base_path, owner
            );
            false
        }
        None => {
            claimed.insert(project.base_path.clone(), project.name.clone());
            true
        }
    });

    if projects.is_empty() {
        return Err(BundleError::DiscoveryEmpty {
            root: root.to_path_buf(),
        });
    }

    Ok(projects)
}
