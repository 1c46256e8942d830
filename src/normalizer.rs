//! Schema normalization - turns a raw schema document into an arena of nodes.
//!
//! Every schema location in the document is normalized at most once and
//! addressed by its JSON Pointer. `$ref` values become plain [`NodeId`] edges,
//! so the referenced node is never copied or mutated. A `$ref` into a node that
//! is still being built on the current resolution chain is recorded as a
//! back-reference instead of being followed again.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ParseError;
use crate::pointer::{self, RefLocation};
use crate::types::{json_type_name, NormalizeOptions};

/// Index of a node in a [`SchemaTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Semantic shape of a normalized node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Object,
    Array,
    Primitive,
    Combinator,
    Reference,
    /// `true` / `false` schema.
    Boolean,
    /// Object schema with no structural keywords (`{}`).
    Any,
    /// Root document that is an array of schemas.
    List,
}

/// Schema composition keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Combinator {
    AllOf,
    AnyOf,
    OneOf,
    Not,
}

impl Combinator {
    pub fn parse(keyword: &str) -> Option<Self> {
        match keyword {
            "allOf" => Some(Combinator::AllOf),
            "anyOf" => Some(Combinator::AnyOf),
            "oneOf" => Some(Combinator::OneOf),
            "not" => Some(Combinator::Not),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Combinator::AllOf => "allOf",
            Combinator::AnyOf => "anyOf",
            Combinator::OneOf => "oneOf",
            Combinator::Not => "not",
        }
    }
}

/// Keyword holding a single subschema that is neither structural nor a
/// combinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Applicator {
    If,
    Then,
    Else,
    Contains,
    PropertyNames,
    AdditionalItems,
    UnevaluatedItems,
    UnevaluatedProperties,
    ContentSchema,
}

impl Applicator {
    pub fn parse(keyword: &str) -> Option<Self> {
        match keyword {
            "if" => Some(Applicator::If),
            "then" => Some(Applicator::Then),
            "else" => Some(Applicator::Else),
            "contains" => Some(Applicator::Contains),
            "propertyNames" => Some(Applicator::PropertyNames),
            "additionalItems" => Some(Applicator::AdditionalItems),
            "unevaluatedItems" => Some(Applicator::UnevaluatedItems),
            "unevaluatedProperties" => Some(Applicator::UnevaluatedProperties),
            "contentSchema" => Some(Applicator::ContentSchema),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Applicator::If => "if",
            Applicator::Then => "then",
            Applicator::Else => "else",
            Applicator::Contains => "contains",
            Applicator::PropertyNames => "propertyNames",
            Applicator::AdditionalItems => "additionalItems",
            Applicator::UnevaluatedItems => "unevaluatedItems",
            Applicator::UnevaluatedProperties => "unevaluatedProperties",
            Applicator::ContentSchema => "contentSchema",
        }
    }

    fn applies_to_objects(&self) -> bool {
        matches!(
            self,
            Applicator::PropertyNames | Applicator::UnevaluatedProperties
        )
    }

    fn applies_to_arrays(&self) -> bool {
        matches!(
            self,
            Applicator::Contains | Applicator::AdditionalItems | Applicator::UnevaluatedItems
        )
    }
}

/// An authored combinator with its member schemas, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinatorGroup {
    pub combinator: Combinator,
    pub children: Vec<NodeId>,
}

/// Where a `$ref` ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefTarget {
    /// Local target, fully normalized.
    Resolved(NodeId),
    /// Local target that is an ancestor on the resolution chain (cycle).
    BackReference(NodeId),
    /// Another document; not fetched.
    External(String),
    /// Local pointer or anchor with no schema behind it.
    Missing(String),
}

impl RefTarget {
    /// The local node this reference points at, if any.
    pub fn node(&self) -> Option<NodeId> {
        match self {
            RefTarget::Resolved(id) | RefTarget::BackReference(id) => Some(*id),
            RefTarget::External(_) | RefTarget::Missing(_) => None,
        }
    }
}

/// A `$ref` keyword and its resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// The `$ref` value as authored.
    pub raw: String,
    pub target: RefTarget,
}

/// Label of a structural edge from a node to one of its children.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Edge {
    Property(String),
    PatternProperty(String),
    AdditionalProperties,
    Items,
    PrefixItem(usize),
    Combinator(Combinator, usize),
    Applicator(Applicator),
    /// `dependentSchemas` entry, or the schema form of draft-07 `dependencies`.
    DependentSchema(String),
    Definition(String),
}

impl Edge {
    /// Short display label.
    pub fn label(&self) -> String {
        match self {
            Edge::Property(name) => name.clone(),
            Edge::PatternProperty(pattern) => format!("/{}/", pattern),
            Edge::AdditionalProperties => "additionalProperties".to_string(),
            Edge::Items => "items".to_string(),
            Edge::PrefixItem(i) => format!("[{}]", i),
            Edge::Combinator(Combinator::Not, _) => "not".to_string(),
            Edge::Combinator(c, i) => format!("{}[{}]", c.keyword(), i),
            Edge::Applicator(a) => a.keyword().to_string(),
            Edge::DependentSchema(name) => format!("dependentSchemas/{}", name),
            Edge::Definition(name) => format!("$defs/{}", name),
        }
    }
}

/// One normalized schema location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaNode {
    /// JSON Pointer of the source location.
    pub pointer: String,
    pub kind: NodeKind,
    /// The `type` keyword, string and array forms alike.
    pub types: Vec<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub properties: Vec<(String, NodeId)>,
    pub pattern_properties: Vec<(String, NodeId)>,
    pub additional_properties: Option<NodeId>,
    pub required: Vec<String>,
    pub items: Option<NodeId>,
    pub prefix_items: Vec<NodeId>,
    pub combinators: Vec<CombinatorGroup>,
    /// `if`/`then`/`else`, `contains`, `propertyNames` and friends, in source order.
    pub applicators: Vec<(Applicator, NodeId)>,
    /// Keyed by the property whose presence triggers the schema.
    pub dependent_schemas: Vec<(String, NodeId)>,
    pub definitions: Vec<(String, NodeId)>,
    pub reference: Option<Reference>,
    /// Value of a boolean schema.
    pub boolean: Option<bool>,
    /// Keywords not handled structurally, verbatim and in source order.
    pub annotations: Map<String, Value>,
}

impl SchemaNode {
    fn empty(pointer: String, kind: NodeKind) -> Self {
        Self {
            pointer,
            kind,
            types: Vec::new(),
            title: None,
            description: None,
            properties: Vec::new(),
            pattern_properties: Vec::new(),
            additional_properties: None,
            required: Vec::new(),
            items: None,
            prefix_items: Vec::new(),
            combinators: Vec::new(),
            applicators: Vec::new(),
            dependent_schemas: Vec::new(),
            definitions: Vec::new(),
            reference: None,
            boolean: None,
            annotations: Map::new(),
        }
    }

    /// Look up a passthrough keyword.
    pub fn annotation(&self, keyword: &str) -> Option<&Value> {
        self.annotations.get(keyword)
    }

    pub fn is_required(&self, property: &str) -> bool {
        self.required.iter().any(|r| r == property)
    }

    /// Short description of the node's type for display.
    pub fn type_label(&self) -> String {
        match self.kind {
            NodeKind::Reference => match &self.reference {
                Some(reference) => format!("$ref {}", reference.raw),
                None => "$ref".to_string(),
            },
            NodeKind::Boolean => self.boolean.unwrap_or(true).to_string(),
            NodeKind::List => "list".to_string(),
            _ if !self.types.is_empty() => self.types.join(" | "),
            NodeKind::Object => "object".to_string(),
            NodeKind::Array => "array".to_string(),
            NodeKind::Combinator => self
                .combinators
                .first()
                .map(|g| g.combinator.keyword().to_string())
                .unwrap_or_else(|| "any".to_string()),
            NodeKind::Primitive | NodeKind::Any => "any".to_string(),
        }
    }
}

/// Arena of normalized nodes for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaTree {
    nodes: Vec<SchemaNode>,
    root: NodeId,
    index: HashMap<String, NodeId>,
}

impl SchemaTree {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_node(&self) -> &SchemaNode {
        self.node(self.root)
    }

    /// Node by id. Ids are only handed out by this tree, so they are always valid.
    pub fn node(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id.0]
    }

    /// Node id for a JSON Pointer, if that location was normalized.
    pub fn id_of(&self, pointer: &str) -> Option<NodeId> {
        self.index.get(pointer).copied()
    }

    /// Node for a JSON Pointer, if that location was normalized.
    pub fn get(&self, pointer: &str) -> Option<&SchemaNode> {
        self.id_of(pointer).map(|id| self.node(id))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SchemaNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Structural children in display order.
    pub fn children(&self, id: NodeId) -> Vec<(Edge, NodeId)> {
        let node = self.node(id);
        let mut out = Vec::new();
        for (name, child) in &node.properties {
            out.push((Edge::Property(name.clone()), *child));
        }
        for (pattern, child) in &node.pattern_properties {
            out.push((Edge::PatternProperty(pattern.clone()), *child));
        }
        if let Some(child) = node.additional_properties {
            out.push((Edge::AdditionalProperties, child));
        }
        if let Some(child) = node.items {
            out.push((Edge::Items, child));
        }
        for (i, child) in node.prefix_items.iter().enumerate() {
            out.push((Edge::PrefixItem(i), *child));
        }
        for group in &node.combinators {
            for (i, child) in group.children.iter().enumerate() {
                out.push((Edge::Combinator(group.combinator, i), *child));
            }
        }
        for (applicator, child) in &node.applicators {
            out.push((Edge::Applicator(*applicator), *child));
        }
        for (name, child) in &node.dependent_schemas {
            out.push((Edge::DependentSchema(name.clone()), *child));
        }
        for (name, child) in &node.definitions {
            out.push((Edge::Definition(name.clone()), *child));
        }
        out
    }

    /// Every `$ref` in the tree, in arena order.
    pub fn references(&self) -> impl Iterator<Item = (NodeId, &Reference)> {
        self.iter()
            .filter_map(|(id, node)| node.reference.as_ref().map(|r| (id, r)))
    }
}

/// Normalize a schema document with default options.
///
/// # Errors
///
/// Returns `ParseError` if the document (or a structural subschema) is not
/// schema-shaped.
pub fn normalize(document: &Value) -> Result<SchemaTree, ParseError> {
    normalize_with(document, &NormalizeOptions::default())
}

/// Normalize a schema document.
pub fn normalize_with(
    document: &Value,
    options: &NormalizeOptions,
) -> Result<SchemaTree, ParseError> {
    if !(document.is_object() || document.is_boolean() || document.is_array()) {
        return Err(ParseError::NotASchema {
            actual: json_type_name(document).to_string(),
        });
    }

    let mut normalizer = Normalizer {
        document,
        options,
        base_id: document.get("$id").and_then(Value::as_str),
        anchors: collect_anchors(document),
        nodes: Vec::new(),
        index: HashMap::new(),
        chain: HashSet::new(),
    };
    let root = normalizer.node_at(document, String::new(), 0)?;

    let tree = SchemaTree {
        nodes: normalizer.nodes,
        root,
        index: normalizer.index,
    };
    tracing::debug!(
        nodes = tree.len(),
        references = tree.references().count(),
        "normalized schema"
    );
    Ok(tree)
}

struct Normalizer<'a> {
    document: &'a Value,
    options: &'a NormalizeOptions,
    base_id: Option<&'a str>,
    anchors: HashMap<String, String>,
    nodes: Vec<SchemaNode>,
    index: HashMap<String, NodeId>,
    /// Pointers whose nodes are currently being built.
    chain: HashSet<String>,
}

impl<'a> Normalizer<'a> {
    fn node_at(&mut self, value: &'a Value, pointer: String, depth: usize) -> Result<NodeId, ParseError> {
        if let Some(&id) = self.index.get(&pointer) {
            return Ok(id);
        }
        if depth > self.options.max_depth {
            return Err(ParseError::TooDeep {
                pointer: pointer::display(&pointer).to_string(),
                limit: self.options.max_depth,
            });
        }

        // Reserve the slot first so back-references can name it.
        let id = NodeId(self.nodes.len());
        self.nodes.push(SchemaNode::empty(pointer.clone(), NodeKind::Any));
        self.index.insert(pointer.clone(), id);
        self.chain.insert(pointer.clone());

        let built = self.build(value, &pointer, depth);

        self.chain.remove(&pointer);
        self.nodes[id.0] = built?;
        Ok(id)
    }

    /// Normalize a value sitting in a subschema position.
    fn child(&mut self, value: &'a Value, pointer: String, depth: usize) -> Result<NodeId, ParseError> {
        if !(value.is_object() || value.is_boolean()) {
            return Err(ParseError::InvalidSubschema {
                pointer,
                actual: json_type_name(value).to_string(),
            });
        }
        self.node_at(value, pointer, depth + 1)
    }

    fn build(&mut self, value: &'a Value, pointer: &str, depth: usize) -> Result<SchemaNode, ParseError> {
        match value {
            Value::Bool(b) => {
                let mut node = SchemaNode::empty(pointer.to_string(), NodeKind::Boolean);
                node.boolean = Some(*b);
                Ok(node)
            }
            Value::Object(map) => self.build_object(map, pointer, depth),
            Value::Array(items) if pointer.is_empty() => {
                let mut node = SchemaNode::empty(String::new(), NodeKind::List);
                for (i, item) in items.iter().enumerate() {
                    let id = self.child(item, pointer::push_index(pointer, i), depth)?;
                    node.prefix_items.push(id);
                }
                Ok(node)
            }
            other => Err(ParseError::InvalidSubschema {
                pointer: pointer.to_string(),
                actual: json_type_name(other).to_string(),
            }),
        }
    }

    fn build_object(
        &mut self,
        map: &'a Map<String, Value>,
        pointer: &str,
        depth: usize,
    ) -> Result<SchemaNode, ParseError> {
        let mut node = SchemaNode::empty(pointer.to_string(), NodeKind::Any);

        for (key, value) in map {
            let key_pointer = pointer::push(pointer, key);

            match (key.as_str(), value) {
                ("type", _) => node.types = parse_types(value, pointer)?,
                ("title", Value::String(s)) => node.title = Some(s.clone()),
                ("description", Value::String(s)) => node.description = Some(s.clone()),
                ("properties", _) => {
                    node.properties = self.named_children(key, value, &key_pointer, depth)?;
                }
                ("patternProperties", _) => {
                    node.pattern_properties =
                        self.named_children(key, value, &key_pointer, depth)?;
                }
                ("$defs" | "definitions", _) => {
                    let defs = self.named_children(key, value, &key_pointer, depth)?;
                    node.definitions.extend(defs);
                }
                ("additionalProperties", _) => {
                    node.additional_properties = Some(self.child(value, key_pointer, depth)?);
                }
                // Draft-04 tuple form.
                ("items", Value::Array(_)) | ("prefixItems", _) => {
                    let ids = self.indexed_children(key, value, &key_pointer, depth)?;
                    node.prefix_items.extend(ids);
                }
                ("items", _) => node.items = Some(self.child(value, key_pointer, depth)?),
                ("required", Value::Array(names)) => {
                    node.required = names
                        .iter()
                        .filter_map(|n| n.as_str().map(String::from))
                        .collect();
                }
                ("allOf" | "anyOf" | "oneOf", _) => {
                    let children = self.indexed_children(key, value, &key_pointer, depth)?;
                    if let Some(combinator) = Combinator::parse(key) {
                        node.combinators.push(CombinatorGroup {
                            combinator,
                            children,
                        });
                    }
                }
                ("not", _) => {
                    let child = self.child(value, key_pointer, depth)?;
                    node.combinators.push(CombinatorGroup {
                        combinator: Combinator::Not,
                        children: vec![child],
                    });
                }
                ("dependentSchemas", _) => {
                    let deps = self.named_children(key, value, &key_pointer, depth)?;
                    node.dependent_schemas.extend(deps);
                }
                ("dependencies", _) => {
                    let property_lists = self.dependencies(value, &key_pointer, depth, &mut node)?;
                    if !property_lists.is_empty() {
                        node.annotations
                            .insert(key.clone(), Value::Object(property_lists));
                    }
                }
                ("$ref", Value::String(raw)) => {
                    let target = self.resolve_ref(raw, depth)?;
                    node.reference = Some(Reference {
                        raw: raw.clone(),
                        target,
                    });
                }
                _ => match Applicator::parse(key) {
                    Some(applicator) => {
                        let child = self.child(value, key_pointer, depth)?;
                        node.applicators.push((applicator, child));
                    }
                    None => {
                        node.annotations.insert(key.clone(), value.clone());
                    }
                },
            }
        }

        node.kind = infer_kind(&node);
        Ok(node)
    }

    fn named_children(
        &mut self,
        keyword: &str,
        value: &'a Value,
        pointer: &str,
        depth: usize,
    ) -> Result<Vec<(String, NodeId)>, ParseError> {
        let Some(map) = value.as_object() else {
            return Err(invalid_keyword(keyword, pointer, "object of schemas", value));
        };
        let mut out = Vec::with_capacity(map.len());
        for (name, sub) in map {
            let id = self.child(sub, pointer::push(pointer, name), depth)?;
            out.push((name.clone(), id));
        }
        Ok(out)
    }

    fn indexed_children(
        &mut self,
        keyword: &str,
        value: &'a Value,
        pointer: &str,
        depth: usize,
    ) -> Result<Vec<NodeId>, ParseError> {
        let Some(items) = value.as_array() else {
            return Err(invalid_keyword(keyword, pointer, "array of schemas", value));
        };
        let mut out = Vec::with_capacity(items.len());
        for (i, sub) in items.iter().enumerate() {
            out.push(self.child(sub, pointer::push_index(pointer, i), depth)?);
        }
        Ok(out)
    }

    /// Normalize the schema entries of draft-07 `dependencies` into
    /// `node.dependent_schemas`. Property-list entries are returned untouched.
    fn dependencies(
        &mut self,
        value: &'a Value,
        pointer: &str,
        depth: usize,
        node: &mut SchemaNode,
    ) -> Result<Map<String, Value>, ParseError> {
        let Some(map) = value.as_object() else {
            return Err(invalid_keyword(
                "dependencies",
                pointer,
                "object of schemas or property lists",
                value,
            ));
        };
        let mut property_lists = Map::new();
        for (name, entry) in map {
            if entry.is_array() {
                property_lists.insert(name.clone(), entry.clone());
            } else {
                let id = self.child(entry, pointer::push(pointer, name), depth)?;
                node.dependent_schemas.push((name.clone(), id));
            }
        }
        Ok(property_lists)
    }

    fn resolve_ref(&mut self, raw: &str, depth: usize) -> Result<RefTarget, ParseError> {
        let target = match pointer::classify_ref(raw, self.base_id) {
            RefLocation::Pointer(p) => p,
            RefLocation::Anchor(name) => match self.anchors.get(&name) {
                Some(p) => p.clone(),
                None => return Ok(RefTarget::Missing(format!("#{}", name))),
            },
            RefLocation::External(uri) => return Ok(RefTarget::External(uri)),
        };

        if self.chain.contains(&target) {
            return Ok(match self.index.get(&target) {
                Some(&id) => RefTarget::BackReference(id),
                None => RefTarget::Missing(target),
            });
        }

        let document = self.document;
        match document.pointer(&target) {
            Some(value) if value.is_object() || value.is_boolean() || target.is_empty() => {
                let id = self.node_at(value, target, depth + 1)?;
                Ok(RefTarget::Resolved(id))
            }
            _ => Ok(RefTarget::Missing(target)),
        }
    }
}

fn infer_kind(node: &SchemaNode) -> NodeKind {
    let has_type = |t: &str| node.types.iter().any(|x| x == t);
    let has_applicator = |f: fn(&Applicator) -> bool| node.applicators.iter().any(|(a, _)| f(a));

    if node.reference.is_some() {
        NodeKind::Reference
    } else if has_type("object")
        || !node.properties.is_empty()
        || !node.pattern_properties.is_empty()
        || node.additional_properties.is_some()
        || !node.dependent_schemas.is_empty()
        || has_applicator(Applicator::applies_to_objects)
    {
        NodeKind::Object
    } else if has_type("array")
        || node.items.is_some()
        || !node.prefix_items.is_empty()
        || has_applicator(Applicator::applies_to_arrays)
    {
        NodeKind::Array
    } else if !node.types.is_empty() {
        NodeKind::Primitive
    } else if !node.combinators.is_empty() {
        NodeKind::Combinator
    } else {
        NodeKind::Any
    }
}

fn parse_types(value: &Value, pointer: &str) -> Result<Vec<String>, ParseError> {
    let expected = "string or array of strings";
    match value {
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str().map(String::from).ok_or_else(|| {
                    invalid_keyword("type", &pointer::push(pointer, "type"), expected, value)
                })
            })
            .collect(),
        other => Err(invalid_keyword(
            "type",
            &pointer::push(pointer, "type"),
            expected,
            other,
        )),
    }
}

fn invalid_keyword(keyword: &str, pointer: &str, expected: &'static str, actual: &Value) -> ParseError {
    ParseError::InvalidKeyword {
        pointer: pointer.to_string(),
        keyword: keyword.to_string(),
        expected,
        actual: json_type_name(actual).to_string(),
    }
}

/// Map `$anchor` names (and draft-07 `$id: "#name"`) to their pointers.
fn collect_anchors(document: &Value) -> HashMap<String, String> {
    let mut anchors = HashMap::new();
    let mut stack = vec![(document, String::new())];

    while let Some((value, at)) = stack.pop() {
        match value {
            Value::Object(map) => {
                if let Some(name) = map.get("$anchor").and_then(Value::as_str) {
                    anchors.entry(name.to_string()).or_insert_with(|| at.clone());
                }
                if let Some(name) = map
                    .get("$id")
                    .and_then(Value::as_str)
                    .and_then(|id| id.strip_prefix('#'))
                {
                    anchors.entry(name.to_string()).or_insert_with(|| at.clone());
                }
                for (key, child) in map {
                    stack.push((child, pointer::push(&at, key)));
                }
            }
            Value::Array(items) => {
                for (i, child) in items.iter().enumerate() {
                    stack.push((child, pointer::push_index(&at, i)));
                }
            }
            _ => {}
        }
    }
    anchors
}
