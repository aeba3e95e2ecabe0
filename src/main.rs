use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use subpath_bundler::{BuildContext, CommandSteps, ProjectConfig, ProjectSelection, SiteBuilder};

/// Build every sub-project of a workspace and merge them into one static site.
#[derive(Debug, Parser)]
#[command(name = "subpath-bundler", version, about)]
struct Args {
  /// Workspace root containing the sub-projects.
  #[arg(long, default_value = ".")]
  root: PathBuf,

  /// Configuration file; defaults to `bundler.config.json` in the workspace root.
  #[arg(long)]
  config: Option<PathBuf>,

  /// Never run the dependency installation step.
  #[arg(long)]
  skip_install: bool,

  /// Log level (trace, debug, info, warn, error).
  #[arg(long)]
  log_level: Option<String>,

  /// Shorthand for `--log-level debug`.
  #[arg(short, long, conflicts_with = "quiet")]
  verbose: bool,

  /// Only report errors.
  #[arg(short, long)]
  quiet: bool,
}

fn main() -> ExitCode {
  let args = Args::parse();
  init_logging(&args);
  debug!("arguments: {:?}", args);

  match run(&args) {
    Ok(code) => code,
    Err(err) => {
      error!("{:#}", err);
      ExitCode::FAILURE
    }
  }
}

fn run(args: &Args) -> Result<ExitCode> {
  let root = args
    .root
    .canonicalize()
    .with_context(|| format!("workspace root {} not found", args.root.display()))?;

  let config = match &args.config {
    Some(path) => ProjectConfig::from_path(path)
      .with_context(|| format!("failed to load configuration {}", path.display()))?,
    None => ProjectConfig::discover(&root),
  };
  let context = BuildContext::new(root, config.into_layout());
  let selection = ProjectSelection::load_from_path(context.selection_path())?;
  let steps = CommandSteps::from_context(&context);

  let builder = SiteBuilder::new(context).skip_install(args.skip_install);
  let report = builder.run(&selection, &steps)?;

  for project in &report.projects {
    let status = if project.outcome.is_merged() { "ok" } else { "FAILED" };
    info!("{:<6} {} ({})", status, project.project.name, project.outcome.describe());
  }
  info!("{}/{} project(s) built successfully", report.succeeded(), report.total());

  let failed = report.failed_names();
  if !failed.is_empty() {
    warn!("{} project(s) could not be built: {}", failed.len(), failed.join(", "));
  }

  Ok(if report.succeeded() > 0 {
    ExitCode::SUCCESS
  } else {
    ExitCode::FAILURE
  })
}

fn init_logging(args: &Args) {
  let level = if let Some(level) = &args.log_level {
    parse_level(level)
  } else if args.verbose {
    Level::DEBUG
  } else if args.quiet {
    Level::ERROR
  } else {
    let level = env::var("SUBPATH_BUNDLER_LOG").unwrap_or_else(|_| "info".to_string());
    parse_level(&level)
  };

  let filter = if env::var("RUST_LOG").is_ok() {
    EnvFilter::from_default_env()
  } else {
    EnvFilter::new(format!("subpath_bundler={level}"))
  };

  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
    .init();
}

fn parse_level(value: &str) -> Level {
  match value.to_lowercase().as_str() {
    "trace" => Level::TRACE,
    "debug" => Level::DEBUG,
    "info" => Level::INFO,
    "warn" => Level::WARN,
    "error" => Level::ERROR,
    _ => {
      eprintln!("Invalid log level '{value}', defaulting to INFO");
      Level::INFO
    }
  }
}
