//! Move a project's build output into the shared output tree.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use same_file::is_same_file;
use tracing::{debug, warn};

use crate::error::MergeError;
use crate::models::BasePath;

/// Merge `build_output` into `output_root` below `base_path`.
///
/// The output is copied into a staging directory next to the destination, then swapped in by
/// rename, so the destination is either the old tree or the complete new one and never a mix.
/// `nested` lists base paths of other projects that live inside this one's subtree; their
/// directories are carried over from the previous destination.
pub fn merge_build_output(
  build_output: &Path,
  output_root: &Path,
  base_path: &BasePath,
  nested: &[&BasePath],
) -> Result<PathBuf, MergeError> {
  if base_path.is_root() {
    return Err(MergeError::RootBasePath);
  }
  if !build_output.is_dir() {
    return Err(MergeError::MissingOutput {
      path: build_output.to_path_buf(),
    });
  }

  let destination = base_path.subtree_of(output_root);
  let contained = destination
    .strip_prefix(output_root)
    .is_ok_and(|relative| relative.components().all(|c| matches!(c, Component::Normal(_))));
  if !contained {
    return Err(MergeError::OutsideOutput {
      base: base_path.to_string(),
      output_root: output_root.to_path_buf(),
    });
  }
  if destination.starts_with(build_output)
    || (destination.exists() && is_same_file(build_output, &destination).unwrap_or(false))
  {
    return Err(MergeError::SameDirectory {
      path: build_output.to_path_buf(),
    });
  }

  let (staging, stale) = sibling_paths(&destination);
  if let Some(parent) = destination.parent() {
    fs::create_dir_all(parent).map_err(io_error("failed to create", parent))?;
  }
  remove_if_exists(&staging)?;
  remove_if_exists(&stale)?;

  if let Err(err) = copy_tree(build_output, &staging) {
    let _ = fs::remove_dir_all(&staging);
    return Err(err);
  }

  let mut carried = Vec::new();
  if let Err(err) = swap_into_place(&destination, &staging, &stale, base_path, nested, &mut carried)
  {
    for (previous, target) in carried.iter().rev() {
      if let Err(restore) = fs::rename(target, previous) {
        warn!("failed to restore {}: {}", previous.display(), restore);
      }
    }
    let _ = fs::remove_dir_all(&staging);
    return Err(err);
  }
  remove_if_exists(&stale)?;

  debug!("merged {} into {}", build_output.display(), destination.display());
  Ok(destination)
}

/// Move the staged tree into place, carrying nested project subtrees along.
///
/// Every carried subtree is recorded in `carried` as `(previous, target)` so the caller can
/// move them back when a later step fails. A failed final rename puts the old tree back.
fn swap_into_place(
  destination: &Path,
  staging: &Path,
  stale: &Path,
  base_path: &BasePath,
  nested: &[&BasePath],
  carried: &mut Vec<(PathBuf, PathBuf)>,
) -> Result<(), MergeError> {
  let moved_aside = destination.exists();
  if moved_aside {
    carry_over_nested(destination, staging, base_path, nested, carried)?;
    fs::rename(destination, stale).map_err(io_error("failed to move aside", destination))?;
  }

  if let Err(err) = fs::rename(staging, destination) {
    if moved_aside {
      let _ = fs::rename(stale, destination);
    }
    return Err(io_error("failed to move into place", staging)(err));
  }
  Ok(())
}

/// Replace `destination` with a full copy of `source`.
pub fn replace_tree(source: &Path, destination: &Path) -> Result<(), MergeError> {
  remove_if_exists(destination)?;
  copy_tree(source, destination)
}

fn sibling_paths(destination: &Path) -> (PathBuf, PathBuf) {
  let leaf = destination
    .file_name()
    .map(|name| name.to_string_lossy().to_string())
    .unwrap_or_default();
  (
    destination.with_file_name(format!(".{leaf}.incoming")),
    destination.with_file_name(format!(".{leaf}.stale")),
  )
}

fn carry_over_nested(
  destination: &Path,
  staging: &Path,
  base_path: &BasePath,
  nested: &[&BasePath],
  carried: &mut Vec<(PathBuf, PathBuf)>,
) -> Result<(), MergeError> {
  for other in nested {
    let Some(relative) = other.as_str().strip_prefix(base_path.as_str()) else {
      continue;
    };
    let relative = relative.trim_matches('/');
    if relative.is_empty() {
      continue;
    }

    let previous = destination.join(relative);
    if !previous.is_dir() {
      continue;
    }
    let target = staging.join(relative);
    remove_if_exists(&target)?;
    if let Some(parent) = target.parent() {
      fs::create_dir_all(parent).map_err(io_error("failed to create", parent))?;
    }
    fs::rename(&previous, &target).map_err(io_error("failed to carry over", &previous))?;
    carried.push((previous, target));
  }
  Ok(())
}

fn copy_tree(source: &Path, destination: &Path) -> Result<(), MergeError> {
  fs::create_dir_all(destination).map_err(io_error("failed to create", destination))?;

  for entry in fs::read_dir(source).map_err(io_error("failed to read", source))? {
    let entry = entry.map_err(io_error("failed to read", source))?;
    let path = entry.path();
    let target = destination.join(entry.file_name());
    let metadata = fs::metadata(&path).map_err(io_error("failed to inspect", &path))?;

    if metadata.is_dir() {
      copy_tree(&path, &target)?;
    } else {
      fs::copy(&path, &target).map_err(io_error("failed to copy", &path))?;
    }
  }

  Ok(())
}

fn remove_if_exists(path: &Path) -> Result<(), MergeError> {
  let result = match fs::symlink_metadata(path) {
    Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(path),
    Ok(_) => fs::remove_file(path),
    Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
    Err(err) => Err(err),
  };
  result.map_err(io_error("failed to remove", path))
}

fn io_error<'a>(
  action: &'static str,
  path: &'a Path,
) -> impl FnOnce(std::io::Error) -> MergeError + 'a {
  move |source| MergeError::Io {
    action,
    path: path.to_path_buf(),
    source,
  }
}
