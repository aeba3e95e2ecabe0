//! Routing descriptor synthesis for the static host.
//!
//! The host evaluates rules in declaration order and stops at the first match. Every rule
//! that serves a literal file therefore has to precede every rule that rewrites a prefix to
//! an entry document, and the latter only apply to requests that accept HTML. [`RouteTable`]
//! keeps both classes apart and [`RouteTable::is_well_ordered`] checks the ordering.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;

use crate::models::Project;
use crate::project::WorkspaceLayout;

/// Cache directive attached to literal asset responses.
pub const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Header value pattern identifying HTML navigation requests.
pub const HTML_ACCEPT_PATTERN: &str = ".*text/html.*";

/// Evaluation class of a rule. Static asset rules are emitted before fallback rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RulePriority {
  /// Serve the requested file as is.
  StaticAsset,
  /// Rewrite a navigation request to a single-page entry document.
  Fallback,
}

/// Request condition attached to a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteCondition {
  /// Condition kind understood by the host, always `header` here.
  #[serde(rename = "type")]
  pub kind: String,
  /// Header name.
  pub key: String,
  /// Pattern the header value has to match.
  pub value: String,
}

impl RouteCondition {
  /// Condition matching requests that declare an HTML accept type.
  pub fn accepts_html() -> Self {
    Self {
      kind: "header".into(),
      key: "accept".into(),
      value: HTML_ACCEPT_PATTERN.into(),
    }
  }
}

/// A single routing rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteRule {
  /// Anchored request path pattern.
  pub src: String,
  /// Destination path, may reference capture groups.
  pub dest: String,
  /// Response headers added when the rule matches.
  #[serde(skip_serializing_if = "BTreeMap::is_empty")]
  pub headers: BTreeMap<String, String>,
  /// Conditions the request has to satisfy.
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub has: Vec<RouteCondition>,
  /// Evaluation class; not part of the serialised rule.
  #[serde(skip)]
  pub priority: RulePriority,
}

impl RouteRule {
  fn static_asset(src: String, dest: String) -> Self {
    let mut headers = BTreeMap::new();
    headers.insert("cache-control".to_string(), IMMUTABLE_CACHE_CONTROL.to_string());
    Self {
      src,
      dest,
      headers,
      has: Vec::new(),
      priority: RulePriority::StaticAsset,
    }
  }

  fn fallback(src: String, dest: String) -> Self {
    Self {
      src,
      dest,
      headers: BTreeMap::new(),
      has: vec![RouteCondition::accepts_html()],
      priority: RulePriority::Fallback,
    }
  }

  /// Returns `true` when the rule only applies to HTML navigation requests.
  pub fn requires_html(&self) -> bool {
    self.has.contains(&RouteCondition::accepts_html())
  }
}

/// Ordered list of routing rules for a set of merged projects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
  rules: Vec<RouteRule>,
}

impl RouteTable {
  /// Build the rules for `projects`, given in discovery order.
  ///
  /// Static asset rules come first, in project order. Fallback rules follow with deeper base
  /// paths before shallower ones so a nested project is not swallowed by its parent, and the
  /// root rule for the landing page comes last.
  pub fn for_projects(projects: &[Project], layout: &WorkspaceLayout) -> Self {
    let served: Vec<&Project> = projects
      .iter()
      .filter(|project| !project.base_path.is_root())
      .collect();

    let mut static_rules = Vec::new();
    let extensions = alternation(&layout.static_extensions);
    let folders = alternation(&layout.asset_folders);
    for project in &served {
      let base = project.base_path.as_str();
      let escaped = regex::escape(base);
      if let Some(extensions) = &extensions {
        static_rules.push(RouteRule::static_asset(
          format!(r"^{escaped}(.*\.(?:{extensions}))$"),
          format!("{base}$1"),
        ));
      }
      if let Some(folders) = &folders {
        static_rules.push(RouteRule::static_asset(
          format!(r"^{escaped}((?:{folders})/.*)$"),
          format!("{base}$1"),
        ));
      }
    }

    let mut by_depth = served.clone();
    by_depth.sort_by_key(|project| std::cmp::Reverse(project.base_path.depth()));

    let mut fallback_rules: Vec<RouteRule> = by_depth
      .iter()
      .map(|project| {
        let base = &project.base_path;
        RouteRule::fallback(
          format!(r"^{}(?:/.*)?$", regex::escape(base.without_trailing_slash())),
          format!("{}{}", base.as_str(), layout.entry_document),
        )
      })
      .collect();
    fallback_rules.push(RouteRule::fallback(
      "^/$".to_string(),
      format!("/{}", layout.entry_document),
    ));

    let mut rules = static_rules;
    rules.extend(fallback_rules);
    Self { rules }
  }

  /// Rules in evaluation order.
  pub fn rules(&self) -> &[RouteRule] {
    &self.rules
  }

  /// Check that no static asset rule follows a fallback rule and that every fallback rule is
  /// conditioned on an HTML request.
  pub fn is_well_ordered(&self) -> bool {
    let ordered = self
      .rules
      .windows(2)
      .all(|pair| pair[0].priority <= pair[1].priority);
    let guarded = self
      .rules
      .iter()
      .filter(|rule| rule.priority == RulePriority::Fallback)
      .all(RouteRule::requires_html);
    ordered && guarded
  }

  /// Consume the table into its rules.
  pub fn into_rules(self) -> Vec<RouteRule> {
    self.rules
  }
}

fn alternation(values: &[String]) -> Option<String> {
  let escaped: Vec<String> = values
    .iter()
    .map(|value| value.trim_matches(|c| c == '.' || c == '/'))
    .filter(|value| !value.is_empty())
    .map(regex::escape)
    .collect();
  (!escaped.is_empty()).then(|| escaped.join("|"))
}

/// Static build entry telling the host how the output tree is produced.
#[derive(Debug, Clone, Serialize)]
pub struct BuildEntry {
  /// File that triggers the build.
  pub src: String,
  /// Builder used by the host.
  #[serde(rename = "use")]
  pub builder: String,
  /// Builder configuration.
  pub config: BuildEntryConfig,
}

/// Configuration of a [`BuildEntry`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildEntryConfig {
  /// Directory served after the build.
  pub dist_dir: String,
}

/// Routing descriptor written for the host.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDescriptor {
  /// Descriptor schema version.
  pub version: u8,
  /// Directory holding the static output.
  pub output_directory: String,
  /// How the host produces the output directory.
  pub builds: Vec<BuildEntry>,
  /// Rules in evaluation order.
  pub routes: Vec<RouteRule>,
}

impl RouteDescriptor {
  /// Wrap a route table with the static output metadata of `layout`.
  pub fn new(table: RouteTable, layout: &WorkspaceLayout) -> Self {
    Self {
      version: 2,
      output_directory: layout.output_dir.clone(),
      builds: vec![BuildEntry {
        src: layout.dependency_manifest.clone(),
        builder: "@vercel/static-build".into(),
        config: BuildEntryConfig {
          dist_dir: layout.output_dir.clone(),
        },
      }],
      routes: table.into_rules(),
    }
  }

  /// Serialise the descriptor as prettified JSON.
  pub fn to_json(&self) -> serde_json::Result<String> {
    serde_json::to_string_pretty(self)
  }

  /// Write the descriptor to `path`.
  pub fn write(&self, path: &Path) -> io::Result<()> {
    let json = self.to_json()?;
    fs::write(path, json + "\n")
  }
}
