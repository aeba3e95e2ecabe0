//! Sub-project discovery, split into descriptor reading and workspace scanning.

mod descriptor;
mod scanning;

pub use descriptor::{extract_base_path, find_build_config, load_descriptor, read_project};
pub use scanning::{discover_projects, numeric_prefix};
