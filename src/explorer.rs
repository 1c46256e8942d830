//! Explorer view - a collapsible outline of the normalized tree.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::normalizer::{Edge, NodeId, NodeKind, RefTarget, SchemaTree};
use crate::pointer;

/// One visible line of the explorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExplorerRow {
    pub depth: usize,
    /// Property name, combinator slot, etc. The root uses its title.
    pub label: String,
    pub type_label: String,
    pub kind: NodeKind,
    pub pointer: String,
    pub has_children: bool,
    pub expanded: bool,
    /// Listed in the parent's `required`.
    pub required: bool,
    /// Where a `$ref` row leads, formatted for display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Flatten the tree into visible rows, depth-first, descending only into
/// nodes whose pointer is in `expanded`.
///
/// References are shown as a pointer to their target and never descended
/// through, so cyclic schemas render finitely.
pub fn rows(tree: &SchemaTree, expanded: &BTreeSet<String>) -> Vec<ExplorerRow> {
    let root = tree.root_node();
    let root_label = root.title.clone().unwrap_or_else(|| "root".to_string());

    let mut out = Vec::new();
    let mut stack: Vec<(NodeId, String, usize, bool)> = vec![(tree.root(), root_label, 0, false)];

    while let Some((id, label, depth, required)) = stack.pop() {
        let node = tree.node(id);
        let children = tree.children(id);
        let is_expanded = !children.is_empty() && expanded.contains(&node.pointer);

        out.push(ExplorerRow {
            depth,
            label,
            type_label: node.type_label(),
            kind: node.kind,
            pointer: node.pointer.clone(),
            has_children: !children.is_empty(),
            expanded: is_expanded,
            required,
            reference: node
                .reference
                .as_ref()
                .map(|r| describe_target(tree, &r.target)),
            description: node.description.clone(),
        });

        if is_expanded {
            for (edge, child) in children.into_iter().rev() {
                let required = matches!(&edge, Edge::Property(name) if node.is_required(name));
                stack.push((child, edge.label(), depth + 1, required));
            }
        }
    }
    out
}

fn describe_target(tree: &SchemaTree, target: &RefTarget) -> String {
    match target {
        RefTarget::Resolved(id) => format!("-> {}", pointer::display(&tree.node(*id).pointer)),
        RefTarget::BackReference(id) => {
            format!("-> {} (cycle)", pointer::display(&tree.node(*id).pointer))
        }
        RefTarget::External(uri) => format!("-> {} (external)", uri),
        RefTarget::Missing(target) => format!("-> {} (missing)", target),
    }
}

/// Render rows as an indented outline.
pub fn render_text(rows: &[ExplorerRow]) -> String {
    let mut out = String::new();
    for row in rows {
        let marker = match (row.has_children, row.expanded) {
            (true, true) => "▾",
            (true, false) => "▸",
            (false, _) => "•",
        };
        out.push_str(&"  ".repeat(row.depth));
        out.push_str(marker);
        out.push(' ');
        out.push_str(&row.label);
        if row.required {
            out.push('*');
        }
        out.push_str(": ");
        out.push_str(&row.type_label);
        if let Some(reference) = &row.reference {
            out.push(' ');
            out.push_str(reference);
        }
        out.push('\n');
    }
    out
}
