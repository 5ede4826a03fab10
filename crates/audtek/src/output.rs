//! Output formatting: tree text, key/value detail, JSON.
//!
//! Renders data in the format selected by `--output`. Text uses box-drawing
//! connectors and optional color; structured formats use serde.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::Value;

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Applies the palette when color is enabled, passes text through otherwise.
#[derive(Debug, Clone, Copy)]
pub struct Painter {
    enabled: bool,
}

impl Painter {
    pub fn new(mode: ColorMode) -> Self {
        Self {
            enabled: should_color(mode),
        }
    }

    #[cfg(test)]
    pub fn plain() -> Self {
        Self { enabled: false }
    }

    pub fn name(self, text: &str) -> String {
        if self.enabled {
            text.bold().to_string()
        } else {
            text.to_owned()
        }
    }

    pub fn label(self, text: &str) -> String {
        if self.enabled {
            text.cyan().to_string()
        } else {
            text.to_owned()
        }
    }

    pub fn muted(self, text: &str) -> String {
        if self.enabled {
            text.dimmed().to_string()
        } else {
            text.to_owned()
        }
    }
}

// ── Tree view ────────────────────────────────────────────────────────

/// One rendered position of the catalog tree.
#[derive(Debug, Clone, Serialize)]
pub struct TreeEntry {
    pub path: String,
    pub name: String,
    pub kind: String,
    /// `None` when the node was not expanded (depth limit or leaf).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeEntry>>,
}

/// Render a tree in the chosen format.
pub fn render_tree(format: OutputFormat, root: &TreeEntry, painter: Painter) -> String {
    match format {
        OutputFormat::Text => render_tree_text(root, painter),
        OutputFormat::Json => render_json_pretty(root),
        OutputFormat::JsonCompact => render_json_compact(root),
    }
}

fn render_tree_text(root: &TreeEntry, painter: Painter) -> String {
    let mut out = format!("{}  {}", painter.name(&root.path), painter.label(&root.kind));
    if let Some(children) = &root.children {
        if children.is_empty() {
            out.push('\n');
            out.push_str(&painter.muted("(empty)"));
        }
        render_children(&mut out, children, "", painter);
    }
    out
}

fn render_children(out: &mut String, children: &[TreeEntry], prefix: &str, painter: Painter) {
    for (idx, child) in children.iter().enumerate() {
        let last = idx + 1 == children.len();
        let (branch, indent) = if last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        let segment = child.path.rsplit('/').next().unwrap_or_default();
        out.push('\n');
        out.push_str(prefix);
        out.push_str(&painter.muted(branch));
        out.push_str(&painter.name(&child.name));
        out.push_str("  ");
        out.push_str(&painter.label(&child.kind));
        if segment != child.name {
            out.push(' ');
            out.push_str(&painter.muted(&format!("({segment})")));
        }
        if let Some(grandchildren) = &child.children {
            render_children(out, grandchildren, &format!("{prefix}{indent}"), painter);
        }
    }
}

// ── Detail view ──────────────────────────────────────────────────────

/// Header fields plus the full record behind one node.
#[derive(Debug, Clone, Serialize)]
pub struct NodeDetail {
    pub path: String,
    pub name: String,
    pub kind: String,
    pub record: Value,
}

/// Render a node detail in the chosen format.
pub fn render_detail(format: OutputFormat, detail: &NodeDetail, painter: Painter) -> String {
    match format {
        OutputFormat::Text => render_detail_text(detail, painter),
        OutputFormat::Json => render_json_pretty(detail),
        OutputFormat::JsonCompact => render_json_compact(detail),
    }
}

fn render_detail_text(detail: &NodeDetail, painter: Painter) -> String {
    let mut lines = vec![
        format!("{}  {}", painter.name(&detail.name), painter.label(&detail.kind)),
        painter.muted(&detail.path),
    ];
    if let Value::Object(map) = &detail.record {
        // HAL plumbing (`_links`, `_embedded`) and nulls are not shown.
        let mut fields: Vec<(&String, String)> = map
            .iter()
            .filter(|(key, _)| !key.starts_with('_'))
            .filter_map(|(key, value)| match value {
                Value::Null => None,
                Value::String(s) => Some((key, s.clone())),
                other => Some((key, other.to_string())),
            })
            .collect();
        fields.sort_by_key(|(key, _)| *key);
        let width = fields.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
        for (key, value) in fields {
            lines.push(format!("{}  {value}", painter.label(&format!("{key:<width$}"))));
        }
    }
    lines.join("\n")
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

/// Pretty-printed JSON.
pub(crate) fn render_json_pretty<T: Serialize + ?Sized>(data: &T) -> String {
    serde_json::to_string_pretty(data).expect("serialization should not fail")
}

/// Compact single-line JSON.
pub(crate) fn render_json_compact<T: Serialize + ?Sized>(data: &T) -> String {
    serde_json::to_string(data).expect("serialization should not fail")
}
