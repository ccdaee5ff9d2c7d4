//! Labeling configuration compiler.
//!
//! Turns the XML-like configuration text into a [`ConfigTree`]:
//!
//! 1. Parse the document (a malformed document is fatal).
//! 2. Lower-case attribute names and capture text-only / raw-markup content.
//! 3. Expand `Repeater` blocks against the task data.
//! 4. Synthesize missing `name` attributes and placeholder `toname`s.
//!
//! The resulting tree is generic; typed element instances and name binding
//! are produced by [`crate::tree::ElementTree`].
//!
//! # Example
//!
//! ```
//! use labelcraft::config::{compile_config, ElementRegistry};
//!
//! let tree = compile_config(
//!     r#"<View><Image name="img" value="$image"/></View>"#,
//!     None,
//!     &ElementRegistry::standard(),
//! )
//! .unwrap();
//! assert_eq!(tree.len(), 2);
//! ```

pub mod data;
mod node;
pub mod registry;
pub mod repeater;

pub use node::{ConfigNode, ConfigTree, NodeId};
pub use registry::{AttrSpec, AttrType, ElementRegistry, TagKind, TagSpec};

use std::collections::{BTreeMap, BTreeSet};

use roxmltree::{Document, Node};
use serde_json::Value;

use crate::error::LabelcraftError;
use repeater::{apply_substitutions, Substitution, DEFAULT_INDEX_FLAG};

/// Options for a compile.
#[derive(Clone, Debug)]
pub struct CompileOptions {
    /// Index placeholder used by repeaters without an `indexFlag`.
    pub index_flag: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            index_flag: DEFAULT_INDEX_FLAG.to_string(),
        }
    }
}

/// Compile configuration text with default options.
pub fn compile_config(
    text: &str,
    task_data: Option<&Value>,
    registry: &ElementRegistry,
) -> Result<ConfigTree, LabelcraftError> {
    compile_config_with(text, task_data, registry, &CompileOptions::default())
}

/// Compile configuration text.
pub fn compile_config_with(
    text: &str,
    task_data: Option<&Value>,
    registry: &ElementRegistry,
    options: &CompileOptions,
) -> Result<ConfigTree, LabelcraftError> {
    let document = Document::parse(text).map_err(|source| LabelcraftError::ConfigParse {
        message: source.to_string(),
    })?;

    let mut builder = TreeBuilder {
        source: text,
        registry,
        data: task_data,
        options,
        nodes: Vec::new(),
    };
    builder.build_element(document.root_element(), None, &[]);

    let mut nodes = builder.nodes;
    synthesize_names(&mut nodes, registry);

    tracing::debug!(nodes = nodes.len(), "compiled labeling configuration");
    Ok(ConfigTree::from_nodes(nodes))
}

pub(crate) struct TreeBuilder<'a> {
    source: &'a str,
    registry: &'a ElementRegistry,
    data: Option<&'a Value>,
    options: &'a CompileOptions,
    nodes: Vec<ConfigNode>,
}

impl<'a> TreeBuilder<'a> {
    pub(crate) fn node(&self, id: NodeId) -> Option<&ConfigNode> {
        self.nodes.get(id.index())
    }

    pub(crate) fn task_data(&self) -> Option<&'a Value> {
        self.data
    }

    pub(crate) fn index_flag(&self) -> &str {
        &self.options.index_flag
    }

    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId) {
        if let Some(node) = self.nodes.get_mut(parent.index()) {
            node.children.push(child);
        }
    }

    fn push(&mut self, tag_name: &str, attributes: BTreeMap<String, String>, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(ConfigNode {
            id,
            tag_name: tag_name.to_string(),
            node_type: tag_name.to_ascii_lowercase(),
            attributes,
            parent,
            children: Vec::new(),
            value: None,
            name_synthesized: false,
            toname_synthesized: false,
            repeat_index: None,
        });
        id
    }

    /// Adds the wrapper element emitted for one repeater index.
    pub(crate) fn push_synthetic(&mut self, tag_name: &str, parent: NodeId, index: usize) -> NodeId {
        let id = self.push(tag_name, BTreeMap::new(), Some(parent));
        self.nodes[id.index()].repeat_index = Some(index);
        id
    }

    pub(crate) fn build_element(
        &mut self,
        xml: Node<'_, '_>,
        parent: Option<NodeId>,
        subs: &[Substitution],
    ) -> NodeId {
        let attributes: BTreeMap<String, String> = xml
            .attributes()
            .map(|attr| {
                (
                    attr.name().to_ascii_lowercase(),
                    apply_substitutions(attr.value(), subs),
                )
            })
            .collect();

        let id = self.push(xml.tag_name().name(), attributes, parent);
        let node_type = self.nodes[id.index()].node_type.clone();

        if node_type == "repeater" {
            repeater::expand(self, xml, id, subs);
            return id;
        }

        let raw_markup = self
            .registry
            .get(&node_type)
            .map(|spec| spec.raw_markup)
            .unwrap_or(false);

        if raw_markup {
            self.nodes[id.index()].value =
                inner_markup(self.source, xml).map(|v| apply_substitutions(&v, subs));
            return id;
        }

        let element_children: Vec<Node<'_, '_>> =
            xml.children().filter(|child| child.is_element()).collect();

        if element_children.is_empty() {
            self.nodes[id.index()].value = inner_text(xml).map(|v| apply_substitutions(&v, subs));
            return id;
        }

        for child in element_children {
            let child_id = self.build_element(child, Some(id), subs);
            self.attach(id, child_id);
        }
        id
    }
}

fn inner_text(xml: Node<'_, '_>) -> Option<String> {
    let text: String = xml
        .children()
        .filter(|child| child.is_text())
        .filter_map(|child| child.text())
        .collect();
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn inner_markup(source: &str, xml: Node<'_, '_>) -> Option<String> {
    let first = xml.first_child()?;
    let last = xml.last_child()?;
    let markup = source.get(first.range().start..last.range().end)?.trim();
    (!markup.is_empty()).then(|| markup.to_string())
}

/// Gives every node a unique name and every binding control a `toname`
/// placeholder.
fn synthesize_names(nodes: &mut [ConfigNode], registry: &ElementRegistry) {
    let mut taken: BTreeSet<String> = nodes
        .iter()
        .filter_map(|node| node.attr("name").map(str::to_string))
        .collect();

    for node in nodes.iter_mut() {
        if node.attr("name").is_none() {
            let base = format!("{}_{}", node.node_type, node.id.index());
            let mut candidate = base.clone();
            let mut suffix = 1;
            while taken.contains(&candidate) {
                candidate = format!("{base}_{suffix}");
                suffix += 1;
            }
            taken.insert(candidate.clone());
            node.attributes.insert("name".to_string(), candidate);
            node.name_synthesized = true;
        }

        let binds = registry
            .get(&node.node_type)
            .map(|spec| spec.kind == TagKind::Control && !spec.accepts.is_empty())
            .unwrap_or(false);

        if binds && node.attr("toname").is_none() {
            let placeholder = node.name().to_string();
            node.attributes.insert("toname".to_string(), placeholder);
            node.toname_synthesized = true;
        }
    }
}
