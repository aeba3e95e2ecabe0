//! Recognise a sub-project directory and read the base path it declares.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::error::{BasePathError, DescriptorError};
use crate::models::{BasePath, Project};
use crate::project::WorkspaceLayout;

fn base_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"\bbase\s*:\s*['"`]([^'"`\r\n]+)['"`]"#).expect("invalid base key regex")
    })
}

/// Extract the raw `base` value declared in build tool configuration text.
///
/// This is a textual match, not a parse: the value has to be a quoted literal on one line.
pub fn extract_base_path(config_text: &str) -> Option<&str> {
    base_key_pattern()
        .captures(config_text)
        .and_then(|caps| caps.get(1))
        .map(|value| value.as_str().trim())
        .filter(|value| !value.is_empty())
}

/// Locate the first recognised build tool configuration file in `dir`.
pub fn find_build_config(dir: &Path, layout: &WorkspaceLayout) -> Option<PathBuf> {
    layout
        .build_config_files
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Read the project descriptor of `dir`.
///
/// Returns `Ok(None)` when the directory lacks either the build configuration or the dependency
/// manifest.
pub fn load_descriptor(
    dir: &Path,
    layout: &WorkspaceLayout,
) -> Result<Option<Project>, DescriptorError> {
    let Some(name) = dir.file_name().map(|name| name.to_string_lossy().to_string()) else {
        return Ok(None);
    };

    let Some(config_path) = find_build_config(dir, layout) else {
        return Ok(None);
    };
    if !dir.join(&layout.dependency_manifest).is_file() {
        debug!("{} has a build config but no {}", name, layout.dependency_manifest);
        return Ok(None);
    }

    let config_text = fs::read_to_string(&config_path).map_err(|source| DescriptorError::Read {
        path: config_path.clone(),
        source,
    })?;

    let base_path = match extract_base_path(&config_text).map(BasePath::parse) {
        None => BasePath::for_name(&name),
        Some(Ok(base_path)) => base_path,
        Some(Err(BasePathError::NotAbsolute { value })) => {
            debug!("{}: relative base `{}`, serving from its directory name", name, value);
            BasePath::for_name(&name)
        }
        Some(Err(source)) => {
            return Err(DescriptorError::InvalidBase {
                path: config_path,
                source,
            });
        }
    };

    Ok(Some(Project {
        name,
        source_dir: dir.to_path_buf(),
        base_path,
    }))
}

/// Read the project descriptor of `dir`, treating unreadable descriptors as "not a project".
pub fn read_project(dir: &Path, layout: &WorkspaceLayout) -> Option<Project> {
    match load_descriptor(dir, layout) {
        Ok(project) => project,
        Err(err) => {
            warn!("skipping {}: {}", dir.display(), err);
            None
        }
    }
}
