//! Filesystem layout shared by every stage of a workspace build.

use std::path::{Component, Path, PathBuf};

/// Owned description of file names, folders and commands used while building a workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceLayout {
  /// Shared output tree, relative to the workspace root.
  pub output_dir: String,
  /// Build output directory inside each sub-project.
  pub project_output_dir: String,
  /// Dependency cache directory whose presence skips the install step.
  pub dependency_cache_dir: String,
  /// Build tool configuration file names recognised in a sub-project.
  pub build_config_files: Vec<String>,
  /// Dependency manifest that must sit next to the build configuration.
  pub dependency_manifest: String,
  /// Entry document of every single-page app and of the landing page.
  pub entry_document: String,
  /// Root-level asset folders whose literals are re-prefixed in compiled scripts.
  pub asset_folders: Vec<String>,
  /// File extensions treated as compiled scripts.
  pub script_extensions: Vec<String>,
  /// File extensions served literally by the host.
  pub static_extensions: Vec<String>,
  /// Directory names that are never treated as sub-projects.
  pub ignored_dirs: Vec<String>,
  /// Command line of the dependency installation step.
  pub install_command: Vec<String>,
  /// Command line of the build step.
  pub build_command: Vec<String>,
  /// Routing descriptor written at the workspace root.
  pub route_descriptor_file: String,
  /// Project list written into the output tree.
  pub project_list_file: String,
  /// Optional project selection file at the workspace root.
  pub selection_file: String,
  /// Title of the generated landing page.
  pub site_title: String,
  /// Optional copy of the finished output tree for hosts that expect `public/`.
  pub public_mirror_dir: Option<String>,
}

impl WorkspaceLayout {
  /// Returns `true` when `name` must never be considered a sub-project.
  pub fn is_ignored_dir(&self, name: &str) -> bool {
    name.starts_with('.')
      || name == self.output_dir
      || self.public_mirror_dir.as_deref() == Some(name)
      || self.ignored_dirs.iter().any(|ignored| ignored == name)
  }

  /// Returns `true` when the path has one of the compiled script extensions.
  pub fn is_script_file(&self, path: &Path) -> bool {
    path
      .extension()
      .and_then(|ext| ext.to_str())
      .is_some_and(|ext| {
        self
          .script_extensions
          .iter()
          .any(|known| known.eq_ignore_ascii_case(ext))
      })
  }
}

/// Returns `true` when `dir` names a directory strictly below the directory it is joined to.
///
/// Empty values, `.`, absolute paths and anything containing `..` are rejected, since the
/// output tree is deleted and recreated on every run.
pub fn is_strict_subdir(dir: &str) -> bool {
  let mut named = false;
  for component in Path::new(dir).components() {
    match component {
      Component::Normal(_) => named = true,
      Component::CurDir => {}
      _ => return false,
    }
  }
  named
}

/// Resolved locations for one build of a workspace.
#[derive(Debug, Clone)]
pub struct BuildContext {
  /// Directory containing the sub-projects.
  pub workspace_root: PathBuf,
  /// Layout shared by every stage.
  pub layout: WorkspaceLayout,
}

impl BuildContext {
  /// Create a context for the given workspace root.
  pub fn new(workspace_root: impl Into<PathBuf>, layout: WorkspaceLayout) -> Self {
    Self {
      workspace_root: workspace_root.into(),
      layout,
    }
  }

  /// Absolute path of the shared output tree.
  pub fn output_root(&self) -> PathBuf {
    self.workspace_root.join(&self.layout.output_dir)
  }

  /// Absolute path of the routing descriptor.
  pub fn route_descriptor_path(&self) -> PathBuf {
    self.workspace_root.join(&self.layout.route_descriptor_file)
  }

  /// Absolute path of the project selection file.
  pub fn selection_path(&self) -> PathBuf {
    self.workspace_root.join(&self.layout.selection_file)
  }

  /// Absolute path of the optional public mirror.
  pub fn public_mirror_path(&self) -> Option<PathBuf> {
    self
      .layout
      .public_mirror_dir
      .as_ref()
      .map(|dir| self.workspace_root.join(dir))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::ProjectConfig;

  #[test]
  fn ignores_hidden_output_and_listed_dirs() {
    let layout = ProjectConfig::default().into_layout();
    assert!(layout.is_ignored_dir(".git"));
    assert!(layout.is_ignored_dir("node_modules"));
    assert!(layout.is_ignored_dir("dist"));
    assert!(!layout.is_ignored_dir("01-basics"));
  }

  #[test]
  fn accepts_only_directories_below_the_root() {
    for dir in ["dist", "./dist", "build/site"] {
      assert!(is_strict_subdir(dir), "{dir}");
    }
    for dir in ["", ".", "./", "..", "../dist", "dist/../..", "site/..", "/tmp/dist"] {
      assert!(!is_strict_subdir(dir), "{dir}");
    }
  }

  #[test]
  fn recognises_script_extensions() {
    let layout = ProjectConfig::default().into_layout();
    assert!(layout.is_script_file(Path::new("assets/index-abc.js")));
    assert!(layout.is_script_file(Path::new("chunk.MJS")));
    assert!(!layout.is_script_file(Path::new("style.css")));
    assert!(!layout.is_script_file(Path::new("README")));
  }
}
