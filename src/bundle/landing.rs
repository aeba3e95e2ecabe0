//! Landing page and project list written at the root of the shared output tree.

use std::fs;
use std::io;
use std::path::Path;

use crate::models::{Project, ProjectListEntry};

/// Build the project list consumed by client-side rendering of the landing page.
pub fn project_list(projects: &[Project]) -> Vec<ProjectListEntry> {
  projects.iter().map(ProjectListEntry::from).collect()
}

/// Write the project list as prettified JSON.
pub fn write_project_list(path: &Path, projects: &[Project]) -> io::Result<()> {
  let json = serde_json::to_string_pretty(&project_list(projects))?;
  fs::write(path, json + "\n")
}

/// Render the landing page linking every merged project.
pub fn render_landing_page(title: &str, projects: &[Project]) -> String {
  let cards = if projects.is_empty() {
    "      <p class=\"empty\">No projects were built.</p>".to_string()
  } else {
    project_list(projects)
      .iter()
      .map(|entry| {
        format!(
          r#"      <a class="project-card" href="{route}" data-project-id="{id}">
        <h2>{name}</h2>
        <span class="project-id">{id}</span>
      </a>"#,
          route = escape_html(&entry.route),
          id = escape_html(&entry.id),
          name = escape_html(&entry.display_name),
        )
      })
      .collect::<Vec<_>>()
      .join("\n")
  };

  format!(
    r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
      body {{ font-family: system-ui, sans-serif; margin: 0; padding: 2rem; background: #101418; color: #e8eaed; }}
      h1 {{ text-align: center; margin-bottom: 2rem; }}
      .projects-grid {{ display: grid; grid-template-columns: repeat(auto-fill, minmax(260px, 1fr)); gap: 1rem; max-width: 1100px; margin: 0 auto; }}
      .project-card {{ display: block; padding: 1.25rem; border-radius: 10px; background: #1c232b; color: inherit; text-decoration: none; }}
      .project-card:hover {{ background: #26303a; }}
      .project-id {{ color: #9aa4ae; font-size: 0.85rem; }}
    </style>
  </head>
  <body>
    <h1>{title}</h1>
    <div class="projects-grid" id="projects-grid">
{cards}
    </div>
  </body>
</html>
"#,
    title = escape_html(title),
    cards = cards,
  )
}

/// Write the landing page to `path`.
pub fn write_landing_page(path: &Path, title: &str, projects: &[Project]) -> io::Result<()> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent)?;
  }
  fs::write(path, render_landing_page(title, projects))
}

fn escape_html(value: &str) -> String {
  let mut escaped = String::with_capacity(value.len());
  for c in value.chars() {
    match c {
      '&' => escaped.push_str("&amp;"),
      '<' => escaped.push_str("&lt;"),
      '>' => escaped.push_str("&gt;"),
      '"' => escaped.push_str("&quot;"),
      '\'' => escaped.push_str("&#39;"),
      _ => escaped.push(c),
    }
  }
  escaped
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::BasePath;
  use std::path::PathBuf;
  use tempfile::tempdir;

  fn project(name: &str, base: &str) -> Project {
    Project {
      name: name.into(),
      source_dir: PathBuf::from(name),
      base_path: BasePath::normalize(base),
    }
  }

  #[test]
  fn renders_one_card_per_project_in_order() {
    let html = render_landing_page("Journey", &[
      project("01-basics", "/01-basics/"),
      project("photo-lab", "photo-lab"),
    ]);

    let basics = html.find("href=\"/01-basics/\"").unwrap();
    let lab = html.find("href=\"/photo-lab/\"").unwrap();
    assert!(basics < lab);
    assert!(html.contains("<h2>Basics</h2>"));
    assert!(html.contains("<h2>Photo Lab</h2>"));
    assert!(html.contains("<title>Journey</title>"));
  }

  #[test]
  fn escapes_titles_and_handles_empty_lists() {
    let html = render_landing_page("A <b> & C", &[]);
    assert!(html.contains("A &lt;b&gt; &amp; C"));
    assert!(html.contains("No projects were built."));
  }

  #[test]
  fn writes_project_list_json() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("projects.json");
    write_project_list(&path, &[project("02-lights", "/02-lights/")]).unwrap();

    let entries: Vec<ProjectListEntry> =
      serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(entries, vec![ProjectListEntry {
      id: "02-lights".into(),
      display_name: "Lights".into(),
      route: "/02-lights/".into(),
    }]);

    let raw = fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\"displayName\""));
  }
}
