//! Generic compiled configuration nodes.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a node inside one [`ConfigTree`].
///
/// Ids are dense indices assigned in document order and are stable for the
/// lifetime of a compile.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl NodeId {
    /// Returns the underlying index.
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One element of the labeling configuration.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConfigNode {
    pub id: NodeId,

    /// Tag name as written in the configuration (`RectangleLabels`).
    pub tag_name: String,

    /// Lower-cased tag name (`rectanglelabels`).
    #[serde(rename = "type")]
    pub node_type: String,

    /// Attributes with lower-cased keys.
    pub attributes: BTreeMap<String, String>,

    /// `None` only for the document root element.
    pub parent: Option<NodeId>,

    pub children: Vec<NodeId>,

    /// Inner text, or verbatim inner markup for raw-markup tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// The `name` attribute was generated by the compiler.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub name_synthesized: bool,

    /// The `toname` attribute was not declared.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub toname_synthesized: bool,

    /// Set on the wrapper emitted for one repeater index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat_index: Option<usize>,
}

impl ConfigNode {
    /// Looks up an attribute; keys are matched case-insensitively.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Interprets an attribute as a boolean flag (absent means false).
    pub fn flag(&self, key: &str) -> bool {
        self.attr(key)
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    /// The node name; always present after compilation.
    pub fn name(&self) -> &str {
        self.attr("name").unwrap_or_default()
    }

    /// Declared `toname` targets, split on commas.
    ///
    /// Returns an empty list when `toname` was synthesized.
    pub fn to_names(&self) -> Vec<&str> {
        if self.toname_synthesized {
            return Vec::new();
        }
        self.attr("toname")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// The compiled configuration: an arena of nodes in document order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ConfigTree {
    nodes: Vec<ConfigNode>,
}

impl ConfigTree {
    pub(crate) fn from_nodes(nodes: Vec<ConfigNode>) -> Self {
        Self { nodes }
    }

    /// The document root element.
    pub fn root(&self) -> Option<&ConfigNode> {
        self.nodes.first()
    }

    pub fn get(&self, id: NodeId) -> Option<&ConfigNode> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in document (pre-)order.
    pub fn nodes(&self) -> impl Iterator<Item = &ConfigNode> {
        self.nodes.iter()
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &ConfigNode> {
        self.get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|child| self.get(*child))
    }

    /// Finds the first node carrying `name`.
    pub fn find_by_name(&self, name: &str) -> Option<&ConfigNode> {
        self.nodes.iter().find(|node| node.name() == name)
    }

    /// Nodes of one type, e.g. every `view`.
    pub fn nodes_of_type<'a>(&'a self, node_type: &'a str) -> impl Iterator<Item = &'a ConfigNode> {
        self.nodes
            .iter()
            .filter(move |node| node.node_type.eq_ignore_ascii_case(node_type))
    }

    /// Depth-first walk of the subtree under `id`, including `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<&ConfigNode> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.get(current) else {
                continue;
            };
            out.push(node);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }
}
