//! Narrowing the discovered projects to the ones a developer wants to build locally.
//!
//! `projects.local.json` holds two lists of directory name patterns:
//!
//! ```json
//! { "include": ["0*", "photo-lab"], "exclude": ["05-*"] }
//! ```
//!
//! A pattern ending in `*` matches every name starting with the rest, any other pattern matches
//! one name exactly. An empty `include` list admits everything; `exclude` always wins.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Decides whether a discovered project directory takes part in the build.
pub trait ProjectInclusion {
  /// Returns `true` when the project directory should be built.
  fn is_included(&self, project_name: &str) -> bool;
}

/// Selection that accepts every project.
#[derive(Debug, Clone, Copy, Default)]
pub struct IncludeAll;

impl ProjectInclusion for IncludeAll {
  fn is_included(&self, _project_name: &str) -> bool {
    true
  }
}

/// One entry of an include or exclude list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum NamePattern {
  /// Matches exactly this directory name.
  Exact(String),
  /// Matches every directory name starting with this text.
  Prefix(String),
}

impl NamePattern {
  /// Returns `true` when `name` is matched by the pattern.
  pub fn matches(&self, name: &str) -> bool {
    match self {
      Self::Exact(exact) => name == exact,
      Self::Prefix(prefix) => name.starts_with(prefix.as_str()),
    }
  }
}

impl From<String> for NamePattern {
  fn from(raw: String) -> Self {
    // `/photo-lab/` and `photo-lab` name the same directory.
    let name = raw.trim().trim_matches('/');
    match name.strip_suffix('*') {
      Some(prefix) => Self::Prefix(prefix.to_string()),
      None => Self::Exact(name.to_string()),
    }
  }
}

/// Include/exclude patterns read from the workspace selection file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectSelection {
  include: Vec<NamePattern>,
  exclude: Vec<NamePattern>,
}

/// The selection file exists but cannot be used.
#[derive(Debug, Error)]
pub enum ProjectSelectionError {
  /// The file could not be read.
  #[error("failed to read {}: {source}", path.display())]
  Io {
    /// Selection file.
    path: PathBuf,
    /// Source I/O error.
    source: std::io::Error,
  },
  /// The file is not a valid selection document.
  #[error("failed to parse {}: {source}", path.display())]
  Parse {
    /// Selection file.
    path: PathBuf,
    /// Source parse error.
    source: serde_json::Error,
  },
}

impl ProjectSelection {
  /// Build a selection from explicit pattern lists.
  pub fn new(include: Vec<NamePattern>, exclude: Vec<NamePattern>) -> Self {
    let keep = |pattern: &NamePattern| *pattern != NamePattern::Exact(String::new());
    Self {
      include: include.into_iter().filter(keep).collect(),
      exclude: exclude.into_iter().filter(keep).collect(),
    }
  }

  /// Read the selection file; a missing file selects every project.
  pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ProjectSelectionError> {
    let path = path.as_ref();
    let contents = match fs::read_to_string(path) {
      Ok(contents) => contents,
      Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Self::default()),
      Err(source) => {
        return Err(ProjectSelectionError::Io {
          path: path.to_path_buf(),
          source,
        });
      }
    };

    let parsed: Self =
      serde_json::from_str(&contents).map_err(|source| ProjectSelectionError::Parse {
        path: path.to_path_buf(),
        source,
      })?;
    Ok(Self::new(parsed.include, parsed.exclude))
  }

  /// Returns `true` when the selection admits every project.
  pub fn is_unfiltered(&self) -> bool {
    self.include.is_empty() && self.exclude.is_empty()
  }
}

impl ProjectInclusion for ProjectSelection {
  fn is_included(&self, project_name: &str) -> bool {
    !any_matches(&self.exclude, project_name)
      && (self.include.is_empty() || any_matches(&self.include, project_name))
  }
}

fn any_matches(patterns: &[NamePattern], name: &str) -> bool {
  patterns.iter().any(|pattern| pattern.matches(name))
}
