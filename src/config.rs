//! Workspace configuration loader describing the multi-project layout.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::project::WorkspaceLayout;

/// Configuration file looked up at the workspace root.
pub const DEFAULT_CONFIG_FILE: &str = "bundler.config.json";

/// Discoverable workspace configuration describing filesystem layout and external commands.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
  /// Shared output tree written by the merge step.
  pub output_dir: String,
  /// Build output directory produced inside every sub-project.
  pub project_output_dir: String,
  /// Dependency cache directory; the install step is skipped when present.
  pub dependency_cache_dir: String,
  /// Build tool configuration file names that mark a sub-project.
  pub build_config_files: Vec<String>,
  /// Dependency manifest file name.
  pub dependency_manifest: String,
  /// Entry document of each single-page app.
  pub entry_document: String,
  /// Asset folders referenced from the site root in compiled scripts.
  pub asset_folders: Vec<String>,
  /// Extensions of compiled script files.
  pub script_extensions: Vec<String>,
  /// Extensions served literally with long-lived caching.
  pub static_extensions: Vec<String>,
  /// Directory names never treated as sub-projects.
  pub ignored_dirs: Vec<String>,
  /// Dependency installation command.
  pub install_command: Vec<String>,
  /// Build command.
  pub build_command: Vec<String>,
  /// Routing descriptor file name.
  pub route_descriptor_file: String,
  /// Project list file name inside the output tree.
  pub project_list_file: String,
  /// Project selection file name.
  pub selection_file: String,
  /// Landing page title.
  pub site_title: String,
  /// Optional directory receiving a copy of the output tree.
  pub public_mirror_dir: Option<String>,
}

fn strings(values: &[&str]) -> Vec<String> {
  values.iter().map(|value| value.to_string()).collect()
}

impl Default for ProjectConfig {
  fn default() -> Self {
    Self {
      output_dir: "dist".into(),
      project_output_dir: "dist".into(),
      dependency_cache_dir: "node_modules".into(),
      build_config_files: strings(&[
        "vite.config.js",
        "vite.config.ts",
        "vite.config.mjs",
        "vite.config.mts",
      ]),
      dependency_manifest: "package.json".into(),
      entry_document: "index.html".into(),
      asset_folders: strings(&[
        "textures",
        "models",
        "images",
        "img",
        "static",
        "fonts",
        "sounds",
        "audio",
        "media",
        "draco",
        "environmentMaps",
      ]),
      script_extensions: strings(&["js", "mjs", "cjs"]),
      static_extensions: strings(&[
        "js", "mjs", "cjs", "css", "map", "json", "xml", "csv", "txt", "wasm", "png", "jpg",
        "jpeg", "gif", "svg", "webp", "avif", "ico", "bmp", "woff", "woff2", "ttf", "otf", "eot",
        "mp3", "wav", "ogg", "mp4", "webm", "glb", "gltf", "bin", "hdr", "exr", "ktx2",
      ]),
      ignored_dirs: strings(&[
        "node_modules",
        "dist",
        "public",
        "src",
        "scripts",
        "static",
        "assets",
      ]),
      install_command: strings(&["npm", "install"]),
      build_command: strings(&["npm", "run", "build"]),
      route_descriptor_file: "vercel.json".into(),
      project_list_file: "projects.json".into(),
      selection_file: "projects.local.json".into(),
      site_title: "Projects".into(),
      public_mirror_dir: None,
    }
  }
}

impl ProjectConfig {
  /// Attempt to load configuration from the workspace root.
  ///
  /// A missing file yields the defaults silently; an unreadable or malformed one is reported
  /// and also falls back to the defaults.
  pub fn discover(workspace_root: &Path) -> Self {
    let candidate = workspace_root.join(DEFAULT_CONFIG_FILE);
    if !candidate.exists() {
      debug!("no {} found, using defaults", DEFAULT_CONFIG_FILE);
      return Self::default();
    }
    Self::from_path(&candidate).unwrap_or_default()
  }

  /// Read configuration from a specific JSON file.
  pub fn from_path(path: &Path) -> Option<Self> {
    let content = match fs::read_to_string(path) {
      Ok(content) => content,
      Err(err) => {
        warn!("failed to read {}: {}", path.display(), err);
        return None;
      }
    };
    match serde_json::from_str(&content) {
      Ok(config) => Some(config),
      Err(err) => {
        warn!("failed to parse {}: {}", path.display(), err);
        None
      }
    }
  }

  /// Convert the configuration into an owned layout description.
  pub fn into_layout(self) -> WorkspaceLayout {
    WorkspaceLayout {
      output_dir: self.output_dir,
      project_output_dir: self.project_output_dir,
      dependency_cache_dir: self.dependency_cache_dir,
      build_config_files: self.build_config_files,
      dependency_manifest: self.dependency_manifest,
      entry_document: self.entry_document,
      asset_folders: self.asset_folders,
      script_extensions: self.script_extensions,
      static_extensions: self.static_extensions,
      ignored_dirs: self.ignored_dirs,
      install_command: self.install_command,
      build_command: self.build_command,
      route_descriptor_file: self.route_descriptor_file,
      project_list_file: self.project_list_file,
      selection_file: self.selection_file,
      site_title: self.site_title,
      public_mirror_dir: self.public_mirror_dir,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[test]
  fn falls_back_to_defaults_without_file() {
    let dir = tempdir().unwrap();
    let config = ProjectConfig::discover(dir.path());
    assert_eq!(config.output_dir, "dist");
    assert_eq!(config.install_command, vec!["npm", "install"]);
  }

  #[test]
  fn overrides_only_listed_fields() {
    let dir = tempdir().unwrap();
    fs::write(
      dir.path().join(DEFAULT_CONFIG_FILE),
      r#"{"output_dir": "site", "asset_folders": ["textures"], "public_mirror_dir": "public"}"#,
    )
    .unwrap();

    let layout = ProjectConfig::discover(dir.path()).into_layout();
    assert_eq!(layout.output_dir, "site");
    assert_eq!(layout.asset_folders, vec!["textures"]);
    assert_eq!(layout.public_mirror_dir.as_deref(), Some("public"));
    assert_eq!(layout.dependency_manifest, "package.json");
  }

  #[test]
  fn malformed_file_yields_defaults() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "{ not json").unwrap();
    let config = ProjectConfig::discover(dir.path());
    assert_eq!(config.route_descriptor_file, "vercel.json");
  }
}
