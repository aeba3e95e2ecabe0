//! Error taxonomy for workspace builds.
//!
//! [`BundleError`] aborts a run. The remaining errors describe failures of a single project or
//! file and are recovered where they occur.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors that abort the whole run.
#[derive(Debug, Error)]
pub enum BundleError {
  /// No sub-project was recognised in the workspace.
  #[error("no buildable projects found in {}", root.display())]
  DiscoveryEmpty {
    /// Workspace root that was scanned.
    root: PathBuf,
  },
  /// The workspace root itself could not be listed.
  #[error("failed to read workspace {}: {source}", root.display())]
  WorkspaceRead {
    /// Workspace root that was scanned.
    root: PathBuf,
    /// Source I/O error.
    source: std::io::Error,
  },
  /// The configured output directory is not strictly inside the workspace root.
  #[error("refusing to use {} as output directory: it must be a sub-directory of the workspace", path.display())]
  UnsafeOutputDir {
    /// Configured output directory.
    path: PathBuf,
  },
  /// The shared output tree could not be reset.
  #[error("failed to prepare output directory {}: {source}", path.display())]
  OutputPrepare {
    /// Output directory.
    path: PathBuf,
    /// Source I/O error.
    source: std::io::Error,
  },
  /// The routing descriptor, landing page or project list could not be written.
  #[error("failed to write {}: {source}", path.display())]
  ConfigWrite {
    /// File that could not be written.
    path: PathBuf,
    /// Source I/O error.
    source: std::io::Error,
  },
}

/// Failure of an external install or build step.
#[derive(Debug, Error)]
pub enum StepError {
  /// The command line is empty.
  #[error("no command configured")]
  EmptyCommand,
  /// The process could not be started.
  #[error("failed to spawn `{command}`: {source}")]
  Spawn {
    /// Rendered command line.
    command: String,
    /// Source I/O error.
    source: std::io::Error,
  },
  /// The process exited unsuccessfully.
  #[error("`{command}` exited with {status}")]
  Failed {
    /// Rendered command line.
    command: String,
    /// Exit status description.
    status: String,
  },
}

/// Failure while moving a project's output into the shared tree.
#[derive(Debug, Error)]
pub enum MergeError {
  /// The project has no build output directory.
  #[error("build output {} does not exist", path.display())]
  MissingOutput {
    /// Expected build output directory.
    path: PathBuf,
  },
  /// The project is configured to own the site root.
  #[error("base path `/` would overwrite the shared output root")]
  RootBasePath,
  /// The build output already is the merge destination.
  #[error("build output {} is the merge destination", path.display())]
  SameDirectory {
    /// Offending directory.
    path: PathBuf,
  },
  /// The destination would resolve outside the shared output tree.
  #[error("base path {base} does not map into {}", output_root.display())]
  OutsideOutput {
    /// Offending base path.
    base: String,
    /// Shared output tree.
    output_root: PathBuf,
  },
  /// Copying, removing or renaming failed.
  #[error("{action} {}: {source}", path.display())]
  Io {
    /// What was attempted.
    action: &'static str,
    /// Path involved.
    path: PathBuf,
    /// Source I/O error.
    source: std::io::Error,
  },
}

/// Per-file failure of the asset path rewrite; the file is left untouched.
#[derive(Debug, Error)]
pub enum RewriteError {
  /// The script could not be read.
  #[error("failed to read {}: {source}", path.display())]
  Read {
    /// Script path.
    path: PathBuf,
    /// Source I/O error.
    source: std::io::Error,
  },
  /// The rewritten script could not be written back.
  #[error("failed to write {}: {source}", path.display())]
  Write {
    /// Script path.
    path: PathBuf,
    /// Source I/O error.
    source: std::io::Error,
  },
}

/// A candidate directory looked like a project but its descriptor could not be read.
#[derive(Debug, Error)]
pub enum DescriptorError {
  /// The build tool configuration could not be read.
  #[error("failed to read {}: {source}", path.display())]
  Read {
    /// Configuration file path.
    path: PathBuf,
    /// Source I/O error.
    source: std::io::Error,
  },
  /// The declared base path could escape the shared output tree.
  #[error("invalid base path in {}: {source}", path.display())]
  InvalidBase {
    /// Configuration file path.
    path: PathBuf,
    /// Why the value was rejected.
    source: BasePathError,
  },
}

/// A declared base path that cannot be used as a URL prefix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BasePathError {
  /// The value is relative or a full URL and does not name a prefix of this site.
  #[error("`{value}` is not an absolute path")]
  NotAbsolute {
    /// Declared value.
    value: String,
  },
  /// The value contains a `.`, `..` or empty segment.
  #[error("`{value}` contains the segment `{segment}`")]
  InvalidSegment {
    /// Declared value.
    value: String,
    /// Offending segment.
    segment: String,
  },
}
