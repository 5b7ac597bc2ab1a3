//! Dash-indented markdown outline parsing and rendering.
//!
//! # Invariants
//! - Two leading spaces form one indentation level.
//! - Lines that are not dash items are skipped, never rejected.
//! - Rendering expands a tray at most once per root-to-leaf path, so cyclic
//!   graphs terminate.

use crate::model::tray::{Tray, TrayId};
use crate::repo::tray_store::TrayStore;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

static OUTLINE_ITEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-+\s*(.*)$").expect("valid outline item regex"));

const INDENT_WIDTH: usize = 2;

/// Parses an outline into fresh trays in document order.
///
/// Each item's parent is the nearest preceding item at a shallower level.
/// Top-level items have no parents; callers attach them where they paste.
pub fn parse_markdown_outline(text: &str) -> Vec<Tray> {
    let mut trays: Vec<Tray> = Vec::new();
    // Positions in `trays` of the open item at each depth.
    let mut open: Vec<usize> = Vec::new();

    for raw in text.lines().map(str::trim_end) {
        if raw.trim().is_empty() {
            continue;
        }
        let level = raw.chars().take_while(|ch| *ch == ' ').count() / INDENT_WIDTH;
        let Some(captures) = OUTLINE_ITEM_RE.captures(raw.trim()) else {
            continue;
        };
        let name = captures.get(1).map_or("", |m| m.as_str()).trim();

        open.truncate(level);
        let mut tray = Tray::new(name);
        if level > 0 {
            if let Some(&parent_position) = open.last() {
                let parent = &mut trays[parent_position];
                parent.push_child(&tray.id);
                tray.add_parent(&parent.id);
            }
        }
        open.push(trays.len());
        trays.push(tray);
    }

    debug!(
        "event=outline_parse module=outline status=ok count={}",
        trays.len()
    );
    trays
}

/// Ids of parentless items, in document order.
pub fn outline_roots(trays: &[Tray]) -> Vec<TrayId> {
    trays
        .iter()
        .filter(|tray| tray.parents.is_empty())
        .map(|tray| tray.id.clone())
        .collect()
}

/// Renders the subtree under `root_id` as a dash-indented outline.
///
/// Explicit children are followed in display order; missing trays are
/// skipped. An unknown root renders as an empty string.
pub async fn render_markdown_outline<S: TrayStore + ?Sized>(store: &S, root_id: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut path: Vec<TrayId> = Vec::new();
    let mut stack: Vec<(TrayId, usize)> = vec![(root_id.to_string(), 0)];

    while let Some((id, depth)) = stack.pop() {
        path.truncate(depth);
        if path.contains(&id) {
            continue;
        }
        let tray = match store.load_tray(&id).await {
            Ok(Some(tray)) => tray,
            Ok(None) => continue,
            Err(err) => {
                warn!("event=outline_render module=outline status=skip error={err}");
                continue;
            }
        };

        lines.push(format!(
            "{}- {}",
            " ".repeat(depth * INDENT_WIDTH),
            single_line(&tray.name)
        ));
        for child in tray.children.iter().rev() {
            stack.push((child.clone(), depth + 1));
        }
        path.push(tray.id);
    }

    lines.join("\n")
}

fn single_line(name: &str) -> String {
    name.replace(['\n', '\r'], " ")
}
