#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod asset_paths;
pub mod builder;
pub mod bundle;
pub mod config;
pub mod discovery;
pub mod error;
pub mod models;
pub mod project;
pub mod selection;

pub use builder::{BuildSteps, CommandSteps, SiteBuilder};
pub use config::ProjectConfig;
pub use error::BundleError;
pub use models::{BasePath, BuildOutcome, BuildReport, Project};
pub use project::{BuildContext, WorkspaceLayout};
pub use selection::{IncludeAll, ProjectInclusion, ProjectSelection};
