//! Graph view - nodes and labelled edges derived from the normalized tree.
//!
//! Structural edges (properties, items, combinators, ...) and `$ref` edges are
//! kept apart so a renderer can draw references differently. Back-references
//! close cycles and never affect layering.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt::Write as _;

use serde::Serialize;

use crate::normalizer::{Edge, NodeId, NodeKind, RefTarget, SchemaTree};
use crate::pointer;

/// Relation an edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeKind {
    Property,
    PatternProperty,
    AdditionalProperties,
    Items,
    PrefixItem,
    Combinator,
    Applicator,
    DependentSchema,
    Definition,
    Reference,
    BackReference,
}

impl EdgeKind {
    fn of(edge: &Edge) -> Self {
        match edge {
            Edge::Property(_) => EdgeKind::Property,
            Edge::PatternProperty(_) => EdgeKind::PatternProperty,
            Edge::AdditionalProperties => EdgeKind::AdditionalProperties,
            Edge::Items => EdgeKind::Items,
            Edge::PrefixItem(_) => EdgeKind::PrefixItem,
            Edge::Combinator(..) => EdgeKind::Combinator,
            Edge::Applicator(_) => EdgeKind::Applicator,
            Edge::DependentSchema(_) => EdgeKind::DependentSchema,
            Edge::Definition(_) => EdgeKind::Definition,
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, EdgeKind::Reference | EdgeKind::BackReference)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub pointer: String,
    pub label: String,
    pub type_label: String,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub label: String,
    pub kind: EdgeKind,
}

/// Layer (distance from the root) and slot within the layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub layer: usize,
    pub order: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Layout {
    pub positions: BTreeMap<NodeId, Position>,
    pub layers: Vec<Vec<NodeId>>,
}

/// Node-link model of a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaGraph {
    pub root: NodeId,
    /// In breadth-first order from the root.
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl SchemaGraph {
    /// Build the graph of every node reachable from the root.
    pub fn from_tree(tree: &SchemaTree) -> Self {
        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        let mut seen = HashSet::from([tree.root()]);
        let mut queue = VecDeque::from([tree.root()]);

        while let Some(id) = queue.pop_front() {
            let node = tree.node(id);
            nodes.push(GraphNode {
                id,
                pointer: node.pointer.clone(),
                label: node_label(tree, id),
                type_label: node.type_label(),
                kind: node.kind,
            });

            let mut outgoing: Vec<(NodeId, String, EdgeKind)> = tree
                .children(id)
                .into_iter()
                .map(|(edge, child)| (child, edge.label(), EdgeKind::of(&edge)))
                .collect();
            if let Some(reference) = &node.reference {
                match reference.target {
                    RefTarget::Resolved(to) => {
                        outgoing.push((to, "$ref".to_string(), EdgeKind::Reference));
                    }
                    RefTarget::BackReference(to) => {
                        outgoing.push((to, "$ref".to_string(), EdgeKind::BackReference));
                    }
                    RefTarget::External(_) | RefTarget::Missing(_) => {}
                }
            }

            for (to, label, kind) in outgoing {
                edges.push(GraphEdge {
                    from: id,
                    to,
                    label,
                    kind,
                });
                if seen.insert(to) {
                    queue.push_back(to);
                }
            }
        }

        Self {
            root: tree.root(),
            nodes,
            edges,
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edges_from(&self, id: NodeId) -> impl Iterator<Item = &GraphEdge> {
        self.edges.iter().filter(move |e| e.from == id)
    }

    /// Layered layout: breadth-first distance from the root, ignoring
    /// back-references; order within a layer follows discovery order.
    pub fn layout(&self) -> Layout {
        let mut layout = Layout::default();
        let mut queue = VecDeque::from([(self.root, 0usize)]);
        let mut seen = HashSet::from([self.root]);

        while let Some((id, layer)) = queue.pop_front() {
            if layout.layers.len() <= layer {
                layout.layers.push(Vec::new());
            }
            let order = layout.layers[layer].len();
            layout.layers[layer].push(id);
            layout.positions.insert(id, Position { layer, order });

            for edge in self.edges_from(id) {
                if edge.kind != EdgeKind::BackReference && seen.insert(edge.to) {
                    queue.push_back((edge.to, layer + 1));
                }
            }
        }
        layout
    }

    /// Graphviz DOT rendering, ranks grouped by layout layer.
    pub fn to_dot(&self) -> String {
        let layout = self.layout();
        let mut out = String::new();
        out.push_str("digraph schema {\n");
        out.push_str("  rankdir=LR;\n");
        out.push_str("  node [shape=box, fontname=\"Helvetica\"];\n");

        for node in &self.nodes {
            let _ = writeln!(
                out,
                "  n{} [label=\"{}\\n{}\"];",
                node.id.index(),
                escape(&node.label),
                escape(&node.type_label)
            );
        }
        for layer in &layout.layers {
            let ids: Vec<String> = layer.iter().map(|id| format!("n{}", id.index())).collect();
            let _ = writeln!(out, "  {{ rank=same; {}; }}", ids.join("; "));
        }
        for edge in &self.edges {
            let style = match edge.kind {
                EdgeKind::Reference => ", style=dashed",
                EdgeKind::BackReference => ", style=dotted, constraint=false",
                _ => "",
            };
            let _ = writeln!(
                out,
                "  n{} -> n{} [label=\"{}\"{}];",
                edge.from.index(),
                edge.to.index(),
                escape(&edge.label),
                style
            );
        }
        out.push_str("}\n");
        out
    }
}

fn node_label(tree: &SchemaTree, id: NodeId) -> String {
    let node = tree.node(id);
    if let Some(title) = &node.title {
        return title.clone();
    }
    pointer::last_token(&node.pointer).unwrap_or_else(|| "root".to_string())
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
