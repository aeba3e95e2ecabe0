//! Workspace build orchestrator: discover, build, rewrite and merge every sub-project, then
//! write the landing page and host routing metadata.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info, warn};

use crate::asset_paths::{
  AssetPathRewriter, AttributeRewriter, LiteralRewriter, rewrite_build_output, rewrite_document,
};
use crate::bundle::landing::{write_landing_page, write_project_list};
use crate::bundle::merge::{merge_build_output, replace_tree};
use crate::bundle::routes::{RouteDescriptor, RouteTable};
use crate::discovery::discover_projects;
use crate::error::{BundleError, StepError};
use crate::models::{BasePath, BuildOutcome, BuildReport, Project, ProjectReport};
use crate::project::{BuildContext, is_strict_subdir};
use crate::selection::ProjectInclusion;

/// External steps run for every project.
pub trait BuildSteps {
  /// Install the project's dependencies.
  fn install(&self, project: &Project) -> Result<(), StepError>;
  /// Build the project into its output directory.
  fn build(&self, project: &Project) -> Result<(), StepError>;
}

/// [`BuildSteps`] running configured commands inside the project directory.
///
/// Standard output and error are inherited; success is read from the exit status.
#[derive(Debug, Clone)]
pub struct CommandSteps {
  install_command: Vec<String>,
  build_command: Vec<String>,
}

impl CommandSteps {
  /// Create steps from explicit command lines.
  pub fn new(install_command: Vec<String>, build_command: Vec<String>) -> Self {
    Self {
      install_command,
      build_command,
    }
  }

  /// Create steps from the commands of a build context.
  pub fn from_context(context: &BuildContext) -> Self {
    Self::new(
      context.layout.install_command.clone(),
      context.layout.build_command.clone(),
    )
  }
}

impl BuildSteps for CommandSteps {
  fn install(&self, project: &Project) -> Result<(), StepError> {
    run_command(&self.install_command, &project.source_dir)
  }

  fn build(&self, project: &Project) -> Result<(), StepError> {
    run_command(&self.build_command, &project.source_dir)
  }
}

fn run_command(argv: &[String], cwd: &Path) -> Result<(), StepError> {
  let (program, args) = argv.split_first().ok_or(StepError::EmptyCommand)?;
  let rendered = argv.join(" ");
  debug!("running `{}` in {}", rendered, cwd.display());

  let status = Command::new(program)
    .args(args)
    .current_dir(cwd)
    .stdin(Stdio::null())
    .status()
    .map_err(|source| StepError::Spawn {
      command: rendered.clone(),
      source,
    })?;

  if status.success() {
    Ok(())
  } else {
    Err(StepError::Failed {
      command: rendered,
      status: status.to_string(),
    })
  }
}

/// High-level helper driving a complete workspace build.
pub struct SiteBuilder<R: AssetPathRewriter = LiteralRewriter> {
  context: BuildContext,
  rewriter: R,
  documents: AttributeRewriter,
  skip_install: bool,
}

impl SiteBuilder<LiteralRewriter> {
  /// Create a builder using the textual asset path rewriter.
  pub fn new(context: BuildContext) -> Self {
    let rewriter = LiteralRewriter::new(&context.layout.asset_folders);
    Self::with_rewriter(context, rewriter)
  }
}

impl<R: AssetPathRewriter> SiteBuilder<R> {
  /// Create a builder using a custom asset path rewriter.
  pub fn with_rewriter(context: BuildContext, rewriter: R) -> Self {
    Self {
      context,
      rewriter,
      documents: AttributeRewriter::new(),
      skip_install: false,
    }
  }

  /// Never run the install step, even when the dependency cache is missing.
  pub fn skip_install(mut self, skip: bool) -> Self {
    self.skip_install = skip;
    self
  }

  /// The context this builder operates on.
  pub fn context(&self) -> &BuildContext {
    &self.context
  }

  /// Run the whole pipeline.
  ///
  /// Fails only when no project is found or the output tree and its metadata cannot be
  /// written; individual project failures are recorded in the returned report.
  pub fn run<S: ProjectInclusion, B: BuildSteps>(
    &self,
    selection: &S,
    steps: &B,
  ) -> Result<BuildReport, BundleError> {
    if !is_strict_subdir(&self.context.layout.output_dir) {
      return Err(BundleError::UnsafeOutputDir {
        path: self.context.output_root(),
      });
    }

    let projects = discover_projects(&self.context.workspace_root, &self.context.layout, selection)?;
    info!("found {} project(s)", projects.len());
    for project in &projects {
      info!("  {} ({})", project.name, project.base_path);
    }

    self.prepare_output()?;
    let report = self.build_projects(&projects, steps);
    self.write_site_metadata(&report.merged_projects())?;
    self.mirror_output();

    Ok(report)
  }

  /// Build every project in order, never stopping at a failure.
  pub fn build_projects<B: BuildSteps>(&self, projects: &[Project], steps: &B) -> BuildReport {
    let mut report = BuildReport::default();
    for (index, project) in projects.iter().enumerate() {
      info!("[{}/{}] processing {}", index + 1, projects.len(), project.name);
      let outcome = self.build_project(project, projects, steps);
      match &outcome {
        BuildOutcome::Merged { .. } => info!("{}: {}", project.name, outcome.describe()),
        _ => warn!("{}: {}, moving on", project.name, outcome.describe()),
      }
      report.projects.push(ProjectReport {
        project: project.clone(),
        outcome,
      });
    }
    report
  }

  fn build_project<B: BuildSteps>(
    &self,
    project: &Project,
    projects: &[Project],
    steps: &B,
  ) -> BuildOutcome {
    let layout = &self.context.layout;

    let cache = project.source_dir.join(&layout.dependency_cache_dir);
    if !self.skip_install && !cache.exists() {
      info!("installing dependencies for {}", project.name);
      if let Err(err) = steps.install(project) {
        return BuildOutcome::InstallFailed(err.to_string());
      }
    }

    info!("building {}", project.name);
    if let Err(err) = steps.build(project) {
      return BuildOutcome::BuildFailed(err.to_string());
    }

    let build_output = project.build_output_dir(&layout.project_output_dir);
    if !build_output.is_dir() {
      return BuildOutcome::MissingOutput;
    }

    let scripts = rewrite_build_output(&self.rewriter, &build_output, &project.base_path, layout);
    let entry = rewrite_document(
      &self.documents,
      &build_output.join(&layout.entry_document),
      &project.base_path,
    );
    let replacements = scripts.replacements + entry.replacements;
    if replacements > 0 {
      info!(
        "rewrote {} asset path(s) in {} file(s) of {}",
        replacements,
        scripts.files_changed + entry.files_changed,
        project.name
      );
    }

    let nested: Vec<&BasePath> = projects
      .iter()
      .map(|other| &other.base_path)
      .filter(|other| {
        *other != &project.base_path && other.as_str().starts_with(project.base_path.as_str())
      })
      .collect();

    match merge_build_output(
      &build_output,
      &self.context.output_root(),
      &project.base_path,
      &nested,
    ) {
      Ok(destination) => {
        debug!("{} merged into {}", project.name, destination.display());
        BuildOutcome::Merged { replacements }
      }
      Err(err) => BuildOutcome::MergeFailed(err.to_string()),
    }
  }

  fn prepare_output(&self) -> Result<(), BundleError> {
    let output_root = self.context.output_root();
    let prepare = |result: std::io::Result<()>| {
      result.map_err(|source| BundleError::OutputPrepare {
        path: output_root.clone(),
        source,
      })
    };

    match fs::remove_dir_all(&output_root) {
      Ok(()) => debug!("cleaned {}", output_root.display()),
      Err(err) if err.kind() == ErrorKind::NotFound => {}
      Err(err) => prepare(Err(err))?,
    }
    prepare(fs::create_dir_all(&output_root))
  }

  /// Write the landing page, the project list and the routing descriptor for `merged`.
  pub fn write_site_metadata(&self, merged: &[Project]) -> Result<(), BundleError> {
    let layout = &self.context.layout;
    let output_root = self.context.output_root();

    let landing_path = output_root.join(&layout.entry_document);
    write_landing_page(&landing_path, &layout.site_title, merged)
      .map_err(config_write(landing_path))?;

    let list_path = output_root.join(&layout.project_list_file);
    write_project_list(&list_path, merged).map_err(config_write(list_path))?;

    let table = RouteTable::for_projects(merged, layout);
    debug_assert!(table.is_well_ordered());
    let rule_count = table.rules().len();
    let descriptor_path = self.context.route_descriptor_path();
    RouteDescriptor::new(table, layout)
      .write(&descriptor_path)
      .map_err(config_write(descriptor_path.clone()))?;
    info!("wrote {} with {} route(s)", descriptor_path.display(), rule_count);

    Ok(())
  }

  fn mirror_output(&self) {
    let Some(mirror) = self.context.public_mirror_path() else {
      return;
    };
    let within_root = self
      .context
      .layout
      .public_mirror_dir
      .as_deref()
      .is_some_and(is_strict_subdir);
    if !within_root || mirror == self.context.output_root() {
      warn!("not mirroring output into {}: not a separate sub-directory", mirror.display());
      return;
    }
    match replace_tree(&self.context.output_root(), &mirror) {
      Ok(()) => info!("mirrored output into {}", mirror.display()),
      Err(err) => warn!("failed to mirror output into {}: {}", mirror.display(), err),
    }
  }
}

fn config_write(path: PathBuf) -> impl FnOnce(std::io::Error) -> BundleError {
  move |source| BundleError::ConfigWrite { path, source }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::ProjectConfig;
  use crate::selection::IncludeAll;
  use std::cell::RefCell;
  use tempfile::tempdir;

  #[derive(Default)]
  struct RecordingSteps {
    calls: RefCell<Vec<String>>,
    fail_install: bool,
    without_output: Vec<&'static str>,
  }

  impl BuildSteps for RecordingSteps {
    fn install(&self, project: &Project) -> Result<(), StepError> {
      self.calls.borrow_mut().push(format!("install {}", project.name));
      if self.fail_install {
        return Err(StepError::Failed {
          command: "npm install".into(),
          status: "exit status: 1".into(),
        });
      }
      Ok(())
    }

    fn build(&self, project: &Project) -> Result<(), StepError> {
      self.calls.borrow_mut().push(format!("build {}", project.name));
      if self.without_output.contains(&project.name.as_str()) {
        return Ok(());
      }
      let dist = project.source_dir.join("dist");
      fs::create_dir_all(&dist).unwrap();
      fs::write(dist.join("index.html"), &project.name).unwrap();
      Ok(())
    }
  }

  fn project_in(root: &Path, name: &str) -> Project {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    Project {
      name: name.into(),
      source_dir: dir,
      base_path: BasePath::for_name(name),
    }
  }

  fn builder(root: &Path) -> SiteBuilder {
    SiteBuilder::new(BuildContext::new(
      root,
      ProjectConfig::default().into_layout(),
    ))
  }

  #[test]
  fn installs_only_without_dependency_cache() {
    let dir = tempdir().unwrap();
    let fresh = project_in(dir.path(), "fresh");
    let cached = project_in(dir.path(), "cached");
    fs::create_dir_all(cached.source_dir.join("node_modules")).unwrap();

    let steps = RecordingSteps::default();
    let report = builder(dir.path()).build_projects(&[fresh, cached], &steps);

    assert_eq!(steps.calls.borrow().as_slice(), [
      "install fresh",
      "build fresh",
      "build cached"
    ]);
    assert_eq!(report.succeeded(), 2);
  }

  #[test]
  fn install_failure_skips_the_build() {
    let dir = tempdir().unwrap();
    let project = project_in(dir.path(), "app");
    let steps = RecordingSteps {
      fail_install: true,
      ..Default::default()
    };

    let report = builder(dir.path()).build_projects(&[project], &steps);
    assert_eq!(steps.calls.borrow().as_slice(), ["install app"]);
    assert!(matches!(
      report.projects[0].outcome,
      BuildOutcome::InstallFailed(_)
    ));
  }

  #[test]
  fn skip_install_never_installs() {
    let dir = tempdir().unwrap();
    let project = project_in(dir.path(), "app");
    let steps = RecordingSteps::default();

    let report = builder(dir.path())
      .skip_install(true)
      .build_projects(&[project], &steps);
    assert_eq!(steps.calls.borrow().as_slice(), ["build app"]);
    assert_eq!(report.succeeded(), 1);
  }

  fn merged_names(report: &BuildReport) -> Vec<String> {
    report
      .merged_projects()
      .into_iter()
      .map(|project| project.name)
      .collect()
  }

  #[test]
  fn build_without_output_is_skipped_and_the_batch_continues() {
    let dir = tempdir().unwrap();
    let empty = project_in(dir.path(), "01-empty");
    let app = project_in(dir.path(), "02-app");
    let steps = RecordingSteps {
      without_output: vec!["01-empty"],
      ..Default::default()
    };

    let report = builder(dir.path())
      .skip_install(true)
      .build_projects(&[empty, app], &steps);

    assert_eq!(report.projects[0].outcome, BuildOutcome::MissingOutput);
    assert!(report.projects[1].outcome.is_merged());
    assert_eq!(merged_names(&report), vec!["02-app"]);
    assert!(!dir.path().join("dist/01-empty").exists());
    assert!(dir.path().join("dist/02-app/index.html").exists());
  }

  #[test]
  fn merge_failure_is_recorded_and_the_batch_continues() {
    let dir = tempdir().unwrap();
    let mut root_owner = project_in(dir.path(), "01-root");
    root_owner.base_path = BasePath::normalize("/");
    let app = project_in(dir.path(), "02-app");

    let report = builder(dir.path())
      .skip_install(true)
      .build_projects(&[root_owner, app], &RecordingSteps::default());

    assert!(matches!(
      report.projects[0].outcome,
      BuildOutcome::MergeFailed(_)
    ));
    assert!(report.projects[1].outcome.is_merged());
    assert_eq!(merged_names(&report), vec!["02-app"]);
    assert_eq!(report.failed_names(), vec!["01-root"]);
  }

  #[test]
  fn refuses_an_output_dir_that_is_the_workspace() {
    let dir = tempdir().unwrap();
    let project = project_in(dir.path(), "app");
    fs::write(project.source_dir.join("package.json"), "{}").unwrap();
    fs::write(project.source_dir.join("vite.config.js"), "export default {}").unwrap();

    for output_dir in [".", "", "..", "../elsewhere"] {
      let mut config = ProjectConfig::default();
      config.output_dir = output_dir.to_string();
      let builder = SiteBuilder::new(BuildContext::new(dir.path(), config.into_layout()));

      let err = builder
        .run(&IncludeAll, &RecordingSteps::default())
        .unwrap_err();
      assert!(matches!(err, BundleError::UnsafeOutputDir { .. }));
      assert!(project.source_dir.join("vite.config.js").exists());
    }
  }

  #[test]
  fn empty_command_is_an_error() {
    let err = run_command(&[], Path::new(".")).unwrap_err();
    assert!(matches!(err, StepError::EmptyCommand));
  }

  #[cfg(unix)]
  #[test]
  fn command_exit_status_decides_success() {
    let dir = tempdir().unwrap();
    assert!(run_command(&["true".to_string()], dir.path()).is_ok());
    let err = run_command(&["false".to_string()], dir.path()).unwrap_err();
    assert!(matches!(err, StepError::Failed { .. }));
    let err = run_command(&["definitely-not-a-real-binary".to_string()], dir.path()).unwrap_err();
    assert!(matches!(err, StepError::Spawn { .. }));
  }
}
