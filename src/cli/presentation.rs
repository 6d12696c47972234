//! CLI presentation: text and json formatters per command.

use crate::compare::{DiffResult, DiffStatus, EntrySummary, MatchReport};
use crate::error::ApiError;
use crate::store::TreeDocument;
use crate::tree::builder::Tree;
use crate::tree::node::Node;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value).map_err(|e| ApiError::Io(e.into()))
}

fn display_path(path: &Path) -> String {
    if path.as_os_str().is_empty() {
        ".".to_string()
    } else {
        path.display().to_string()
    }
}

fn format_section_heading(title: &str, color: bool) -> String {
    if color {
        format!("{}", title.bold().underline())
    } else {
        title.to_string()
    }
}

fn status_label(status: DiffStatus, color: bool) -> String {
    let label = status.to_string();
    if !color {
        return label;
    }
    match status {
        DiffStatus::Match => label.green().to_string(),
        DiffStatus::Differ => label.yellow().to_string(),
        DiffStatus::RemovedFromA => label.red().to_string(),
        DiffStatus::AddedInB => label.cyan().to_string(),
        DiffStatus::Unknown => label.magenta().to_string(),
    }
}

fn summary_cell(summary: Option<&EntrySummary>) -> String {
    match summary {
        None => "-".to_string(),
        Some(EntrySummary {
            error: Some(kind), ..
        }) => format!("error ({})", kind),
        Some(EntrySummary {
            kind,
            digest: Some(digest),
            ..
        }) => format!("{} {}", kind, digest.short()),
        Some(summary) => summary.kind.to_string(),
    }
}

/// Whole tree as the persisted JSON document.
pub fn format_tree_json(tree: &Tree) -> Result<String, ApiError> {
    to_json(&TreeDocument::from_tree(tree))
}

pub fn format_generate_summary(tree: &Tree, saved_to: Option<&Path>) -> String {
    let mut out = String::new();
    out.push_str(&format!("Root: {}\n", tree.root_path.display()));
    match tree.root_digest() {
        Some(digest) => out.push_str(&format!("Digest: {}\n", digest)),
        None => out.push_str("Digest: -\n"),
    }
    out.push_str(&format!("Nodes: {}\n", tree.node_count()));
    let errors = tree.errors().len();
    if errors > 0 {
        out.push_str(&format!(
            "Unreadable entries: {} (see `dmerk errors`)\n",
            errors
        ));
    }
    if let Some(path) = saved_to {
        out.push_str(&format!("Saved: {}\n", path.display()));
    }
    out
}

pub fn format_diff_text(result: &DiffResult, color: bool) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n\n",
        format_section_heading(
            &format!(
                "Comparing {} with {}",
                display_path(&result.left),
                display_path(&result.right)
            ),
            color
        )
    ));
    if result.entries.is_empty() {
        out.push_str("Both directories are empty\n");
        return out;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Name", "Status", "Left", "Right"]);
    for entry in &result.entries {
        table.add_row(vec![
            entry.name.clone(),
            status_label(entry.status, color),
            summary_cell(entry.left.as_ref()),
            summary_cell(entry.right.as_ref()),
        ]);
    }
    out.push_str(&format!("{}\n\n", table));

    let counts = result.counts();
    out.push_str(&format!(
        "{} match, {} differ, {} removed, {} added, {} unknown\n",
        counts.matched, counts.differ, counts.removed, counts.added, counts.unknown
    ));
    out
}

pub fn format_diff_json(result: &DiffResult) -> Result<String, ApiError> {
    #[derive(Serialize)]
    struct Document<'a> {
        #[serde(flatten)]
        result: &'a DiffResult,
        counts: crate::compare::DiffCounts,
        identical: bool,
    }
    to_json(&Document {
        result,
        counts: result.counts(),
        identical: result.is_identical(),
    })
}

/// Direct comparison of two non-directory nodes.
pub fn format_outcome_text(left: &Path, right: &Path, outcome: DiffStatus, color: bool) -> String {
    format!(
        "{} <-> {}: {}\n",
        display_path(left),
        display_path(right),
        status_label(outcome, color)
    )
}

pub fn format_outcome_json(left: &Path, right: &Path, outcome: DiffStatus) -> Result<String, ApiError> {
    to_json(&serde_json::json!({
        "left": left,
        "right": right,
        "status": outcome,
    }))
}

fn push_path_list(out: &mut String, title: &str, paths: &[PathBuf], color: bool) {
    if paths.is_empty() {
        return;
    }
    out.push_str(&format!("{}\n", format_section_heading(title, color)));
    for path in paths {
        out.push_str(&format!("  {}\n", display_path(path)));
    }
    out.push('\n');
}

pub fn format_match_text(report: &MatchReport, color: bool) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Matched content", color)));
    if report.matches.is_empty() {
        out.push_str("  (none)\n\n");
    } else {
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_header(vec!["Digest", "Kind", "Left", "Right"]);
        for group in &report.matches {
            let join = |paths: &[PathBuf]| {
                paths
                    .iter()
                    .map(|p| display_path(p))
                    .collect::<Vec<_>>()
                    .join("\n")
            };
            table.add_row(vec![
                group.digest.short(),
                if group.is_dir { "directory" } else { "file" }.to_string(),
                join(&group.left),
                join(&group.right),
            ]);
        }
        out.push_str(&format!("{}\n\n", table));
    }
    push_path_list(&mut out, "Only in left", &report.only_left, color);
    push_path_list(&mut out, "Only in right", &report.only_right, color);
    push_path_list(&mut out, "Unreadable in left", &report.unknown_left, color);
    push_path_list(&mut out, "Unreadable in right", &report.unknown_right, color);
    out
}

pub fn format_match_json(report: &MatchReport) -> Result<String, ApiError> {
    to_json(report)
}

pub fn format_node_listing_text(tree: &Tree, subpath: &Path, node: &Node, color: bool) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n\n",
        format_section_heading(&tree.root_path.join(subpath).display().to_string(), color)
    ));
    out.push_str(&format!("  Generated: {}\n", tree.generated_at.to_rfc3339()));
    out.push_str(&format!("  Algorithm version: {}\n", tree.algorithm_version));
    out.push_str(&format!("  Kind: {}\n", node.kind_label()));
    if let Some(digest) = node.digest() {
        out.push_str(&format!("  Digest: {}\n", digest));
    }
    if let Some(size) = node.size() {
        out.push_str(&format!("  Size: {}\n", size));
    }
    if let Some(detail) = node.error_detail() {
        out.push_str(&format!("  Error: {}\n", detail));
    }

    if let Some(children) = node.children() {
        out.push('\n');
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_header(vec!["Name", "Kind", "Size", "Digest"]);
        for child in children.values() {
            let digest = match (child.digest(), child.error_detail()) {
                (Some(digest), _) => digest.short(),
                (None, Some(detail)) if color => detail.kind.to_string().red().to_string(),
                (None, Some(detail)) => detail.kind.to_string(),
                (None, None) => "-".to_string(),
            };
            table.add_row(vec![
                child.name.clone(),
                child.kind_label().to_string(),
                child.size().map_or_else(|| "-".to_string(), |s| s.to_string()),
                digest,
            ]);
        }
        out.push_str(&format!("{}\n", table));
    }
    out
}

pub fn format_node_listing_json(node: &Node) -> Result<String, ApiError> {
    #[derive(Serialize)]
    struct Listing<'a> {
        name: &'a str,
        #[serde(flatten)]
        summary: EntrySummary,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        children: Vec<ChildSummary<'a>>,
    }
    #[derive(Serialize)]
    struct ChildSummary<'a> {
        name: &'a str,
        #[serde(flatten)]
        summary: EntrySummary,
    }

    let children = node
        .children()
        .map(|children| {
            children
                .values()
                .map(|child| ChildSummary {
                    name: &child.name,
                    summary: EntrySummary::of(child),
                })
                .collect()
        })
        .unwrap_or_default();
    to_json(&Listing {
        name: &node.name,
        summary: EntrySummary::of(node),
        children,
    })
}

pub fn format_errors_text(tree: &Tree) -> String {
    let errors = tree.errors();
    if errors.is_empty() {
        return format!("No unreadable entries under {}\n", tree.root_path.display());
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Path", "Kind", "Message"]);
    for (path, error) in &errors {
        table.add_row(vec![
            display_path(path),
            error.kind.to_string(),
            error.message.clone(),
        ]);
    }
    format!("{}\n{} unreadable entries\n", table, errors.len())
}

pub fn format_errors_json(tree: &Tree) -> Result<String, ApiError> {
    let rows: Vec<serde_json::Value> = tree
        .errors()
        .into_iter()
        .map(|(path, error)| {
            serde_json::json!({
                "path": path,
                "kind": error.kind,
                "message": error.message,
            })
        })
        .collect();
    to_json(&rows)
}
