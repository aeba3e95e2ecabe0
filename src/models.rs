//! Data structures produced while discovering, building and merging sub-projects.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::BasePathError;

/// URL prefix owned by a sub-project.
///
/// The wrapped value always starts and ends with exactly one `/` and holds only plain segments,
/// never `.`, `..` or empty ones, so it always maps onto a subtree of the output directory. The
/// site root is represented as a single `/`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct BasePath(String);

impl BasePath {
  /// Normalise a base path value.
  ///
  /// Missing leading or trailing slashes are added. Empty, `.` and `..` segments are dropped,
  /// so normalising an already normalised value returns it unchanged. Use [`BasePath::parse`]
  /// for values declared in project configuration, which rejects such segments instead.
  pub fn normalize(raw: &str) -> Self {
    let segments: Vec<&str> = raw
      .trim()
      .split(['/', '\\'])
      .filter(|segment| is_plain_segment(segment))
      .collect();
    Self::from_segments(&segments)
  }

  /// Parse a base path declared in a build tool configuration.
  ///
  /// Relative values (`./`, `.`, full URLs) do not name a prefix and yield
  /// [`BasePathError::NotAbsolute`]; values with `.`, `..` or empty inner segments yield
  /// [`BasePathError::InvalidSegment`].
  pub fn parse(raw: &str) -> Result<Self, BasePathError> {
    let value = raw.trim();
    let not_absolute = || BasePathError::NotAbsolute {
      value: value.to_string(),
    };
    if value.contains("://") {
      return Err(not_absolute());
    }

    let inner = value.trim_matches('/');
    let segments: Vec<&str> = if inner.is_empty() {
      Vec::new()
    } else {
      inner.split('/').collect()
    };
    let invalid = |segment: &str| BasePathError::InvalidSegment {
      value: value.to_string(),
      segment: segment.to_string(),
    };
    if segments.contains(&"..") {
      return Err(invalid(".."));
    }
    if value.is_empty() || value.starts_with('.') {
      return Err(not_absolute());
    }
    if let Some(segment) = segments
      .iter()
      .find(|segment| !is_plain_segment(segment) || segment.contains('\\'))
    {
      return Err(invalid(segment));
    }
    Ok(Self::from_segments(&segments))
  }

  fn from_segments(segments: &[&str]) -> Self {
    if segments.is_empty() {
      Self("/".to_string())
    } else {
      Self(format!("/{}/", segments.join("/")))
    }
  }

  /// Default base path derived from a project directory name.
  pub fn for_name(name: &str) -> Self {
    Self::normalize(name)
  }

  /// The normalised path, including both slashes.
  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// The path with its trailing slash removed; empty for the site root.
  pub fn without_trailing_slash(&self) -> &str {
    self.0.trim_end_matches('/')
  }

  /// Non-empty path segments in order.
  pub fn segments(&self) -> impl Iterator<Item = &str> {
    self.0.split('/').filter(|segment| !segment.is_empty())
  }

  /// Number of path segments, used to order more specific prefixes first.
  pub fn depth(&self) -> usize {
    self.segments().count()
  }

  /// Returns `true` when the base path is the site root.
  pub fn is_root(&self) -> bool {
    self.0 == "/"
  }

  /// Destination of this base path inside a shared output tree.
  pub fn subtree_of(&self, root: &Path) -> PathBuf {
    let mut path = root.to_path_buf();
    for segment in self.segments() {
      path.push(segment);
    }
    path
  }
}

fn is_plain_segment(segment: &str) -> bool {
  !matches!(segment, "" | "." | "..")
}

impl fmt::Display for BasePath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// A buildable sub-project discovered inside the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
  /// Directory name, unique within the workspace.
  pub name: String,
  /// Absolute path of the project directory.
  pub source_dir: PathBuf,
  /// URL prefix the project is served from.
  pub base_path: BasePath,
}

impl Project {
  /// Build output directory of the project for the given output directory name.
  pub fn build_output_dir(&self, project_output_dir: &str) -> PathBuf {
    self.source_dir.join(project_output_dir)
  }
}

/// Result of running a single project through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
  /// The dependency installation step failed.
  InstallFailed(String),
  /// Dependencies are present but the build step failed.
  BuildFailed(String),
  /// The build reported success without producing an output directory.
  MissingOutput,
  /// The output could not be moved into the shared tree.
  MergeFailed(String),
  /// The project was built and merged into the shared output tree.
  Merged {
    /// Number of asset literals rewritten in the compiled scripts.
    replacements: usize,
  },
}

impl BuildOutcome {
  /// Returns `true` when the project reached the shared output tree.
  pub fn is_merged(&self) -> bool {
    matches!(self, Self::Merged { .. })
  }

  /// Short human readable description used in the run summary.
  pub fn describe(&self) -> String {
    match self {
      Self::InstallFailed(reason) => format!("dependency install failed: {reason}"),
      Self::BuildFailed(reason) => format!("build failed: {reason}"),
      Self::MissingOutput => "build produced no output directory".to_string(),
      Self::MergeFailed(reason) => format!("merge failed: {reason}"),
      Self::Merged { replacements } => {
        format!("built and merged ({replacements} asset path(s) rewritten)")
      }
    }
  }
}

/// Pairing of a project with its outcome.
#[derive(Debug, Clone)]
pub struct ProjectReport {
  /// The project that was processed.
  pub project: Project,
  /// What happened to it.
  pub outcome: BuildOutcome,
}

/// Aggregated result of a full run, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
  /// One report per discovered project.
  pub projects: Vec<ProjectReport>,
}

impl BuildReport {
  /// Projects that made it into the shared output tree, in discovery order.
  pub fn merged_projects(&self) -> Vec<Project> {
    self
      .projects
      .iter()
      .filter(|report| report.outcome.is_merged())
      .map(|report| report.project.clone())
      .collect()
  }

  /// Names of projects that failed at any stage.
  pub fn failed_names(&self) -> Vec<&str> {
    self
      .projects
      .iter()
      .filter(|report| !report.outcome.is_merged())
      .map(|report| report.project.name.as_str())
      .collect()
  }

  /// Number of merged projects.
  pub fn succeeded(&self) -> usize {
    self
      .projects
      .iter()
      .filter(|report| report.outcome.is_merged())
      .count()
  }

  /// Number of discovered projects.
  pub fn total(&self) -> usize {
    self.projects.len()
  }
}

/// Entry of the project list consumed by the landing page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectListEntry {
  /// Project directory name.
  pub id: String,
  /// Human readable title.
  pub display_name: String,
  /// URL the project is served from.
  pub route: String,
}

impl From<&Project> for ProjectListEntry {
  fn from(project: &Project) -> Self {
    Self {
      id: project.name.clone(),
      display_name: display_name_for(&project.name),
      route: project.base_path.to_string(),
    }
  }
}

/// Derive a display title from a project identifier.
///
/// A leading `<digits>-` prefix is dropped, dashes become spaces and every word starts with an
/// upper case letter.
pub fn display_name_for(id: &str) -> String {
  let digits = id.chars().take_while(|c| c.is_ascii_digit()).count();
  let stripped = if digits > 0 && id[digits..].starts_with('-') {
    &id[digits + 1..]
  } else {
    id
  };

  let mut title = String::with_capacity(stripped.len());
  let mut previous_is_word = false;
  for c in stripped.replace('-', " ").chars() {
    let is_word = c.is_alphanumeric() || c == '_';
    if is_word && !previous_is_word {
      title.extend(c.to_uppercase());
    } else {
      title.push(c);
    }
    previous_is_word = is_word;
  }
  title
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalizes_missing_slashes() {
    assert_eq!(BasePath::normalize("lesson").as_str(), "/lesson/");
    assert_eq!(BasePath::normalize("/lesson").as_str(), "/lesson/");
    assert_eq!(BasePath::normalize("lesson/").as_str(), "/lesson/");
    assert_eq!(BasePath::normalize("/lesson/").as_str(), "/lesson/");
    assert_eq!(BasePath::normalize("a/b").as_str(), "/a/b/");
  }

  #[test]
  fn normalization_is_a_fixed_point() {
    for raw in ["x", "/x", "x/", "//x//", "/a/b/", "", "/"] {
      let once = BasePath::normalize(raw);
      let twice = BasePath::normalize(once.as_str());
      assert_eq!(once, twice);
      assert!(once.as_str().starts_with('/'));
      assert!(once.as_str().ends_with('/'));
      assert!(!once.as_str().starts_with("//"));
      assert!(!once.as_str().ends_with("//"));
    }
  }

  #[test]
  fn normalization_never_leaves_the_subtree() {
    assert_eq!(BasePath::normalize("../victim").as_str(), "/victim/");
    assert_eq!(BasePath::normalize("./").as_str(), "/");
    assert_eq!(BasePath::normalize("a/./b//..\\c").as_str(), "/a/b/c/");
    let root = Path::new("out");
    for raw in ["../victim", "/../../etc/", "..\\..\\up"] {
      let subtree = BasePath::normalize(raw).subtree_of(root);
      assert!(subtree.starts_with(root));
      assert!(subtree.components().all(|c| matches!(c, std::path::Component::Normal(_))));
    }
  }

  #[test]
  fn parses_declared_base_paths() {
    assert_eq!(BasePath::parse("/01-basics/").unwrap().as_str(), "/01-basics/");
    assert_eq!(BasePath::parse("course/lesson").unwrap().as_str(), "/course/lesson/");
    assert_eq!(BasePath::parse("/").unwrap().as_str(), "/");

    for relative in ["./", ".", "./sub/", "https://cdn.example/app/"] {
      assert!(matches!(
        BasePath::parse(relative),
        Err(BasePathError::NotAbsolute { .. })
      ));
    }
    for invalid in ["../victim", "/a/../b/", "/a//b/", "/a/./b/"] {
      assert!(matches!(
        BasePath::parse(invalid),
        Err(BasePathError::InvalidSegment { .. })
      ));
    }
  }

  #[test]
  fn maps_base_path_onto_nested_subtree() {
    let base = BasePath::normalize("/course/lesson-3/");
    assert_eq!(
      base.subtree_of(Path::new("dist")),
      PathBuf::from("dist").join("course").join("lesson-3")
    );
    assert_eq!(base.depth(), 2);
    assert_eq!(base.without_trailing_slash(), "/course/lesson-3");
    assert!(BasePath::normalize("/").is_root());
  }

  #[test]
  fn derives_display_names() {
    assert_eq!(display_name_for("01-basics"), "Basics");
    assert_eq!(display_name_for("photo-lab"), "Photo Lab");
    assert_eq!(display_name_for("12-haunted-house"), "Haunted House");
    assert_eq!(display_name_for("3d-text"), "3d Text");
  }

  #[test]
  fn tallies_report() {
    let project = |name: &str| Project {
      name: name.to_string(),
      source_dir: PathBuf::from(name),
      base_path: BasePath::for_name(name),
    };
    let report = BuildReport {
      projects: vec![
        ProjectReport {
          project: project("a"),
          outcome: BuildOutcome::Merged { replacements: 0 },
        },
        ProjectReport {
          project: project("b"),
          outcome: BuildOutcome::BuildFailed("exit status 1".into()),
        },
      ],
    };

    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.total(), 2);
    assert_eq!(report.failed_names(), vec!["b"]);
    assert_eq!(report.merged_projects()[0].name, "a");
  }
}
