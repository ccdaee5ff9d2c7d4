//! Bound element tree and name binding.
//!
//! [`ElementTree`] instantiates typed [`Element`]s from a compiled
//! [`ConfigTree`], then walks them once to build the name index
//! (`name -> element`), the list of object elements, and the `toName` index
//! (`object name -> [control names]`). Controls without a `toName` bind to
//! the only object when the tree has exactly one.
//!
//! The tree is immutable after compilation and is shared by every
//! annotation created against it.

mod element;

pub use element::{Element, ElementId, LabelOption};

use std::collections::BTreeMap;

use serde_json::Value;

use crate::config::data::substitute_variables;
use crate::config::{
    compile_config_with, CompileOptions, ConfigTree, ElementRegistry, NodeId, TagKind,
};
use crate::error::LabelcraftError;
use crate::validation::{validate_config, ValidationReport};

/// A compiled, validated and bound configuration.
#[derive(Clone, Debug, Default)]
pub struct ElementTree {
    config: ConfigTree,
    elements: Vec<Element>,
    names: BTreeMap<String, ElementId>,
    to_names: BTreeMap<String, Vec<String>>,
    objects: Vec<ElementId>,
    report: ValidationReport,
}

impl ElementTree {
    /// Compile, validate and bind a configuration with default options.
    pub fn compile(
        text: &str,
        task_data: Option<&Value>,
        registry: &ElementRegistry,
    ) -> Result<Self, LabelcraftError> {
        Self::compile_with(text, task_data, registry, &CompileOptions::default())
    }

    /// Compile, validate and bind a configuration.
    ///
    /// Only a malformed document fails; validation problems are collected in
    /// [`ElementTree::report`].
    pub fn compile_with(
        text: &str,
        task_data: Option<&Value>,
        registry: &ElementRegistry,
        options: &CompileOptions,
    ) -> Result<Self, LabelcraftError> {
        let config = compile_config_with(text, task_data, registry, options)?;
        let report = validate_config(&config, registry);

        let mut tree = Self::instantiate(config, registry);
        tree.report = report;
        tree.bind();
        if let Some(data) = task_data {
            tree.resolve_data(data);
        }

        tracing::debug!(
            elements = tree.elements.len(),
            objects = tree.objects.len(),
            errors = tree.report.error_count(),
            "bound element tree"
        );
        Ok(tree)
    }

    fn instantiate(config: ConfigTree, registry: &ElementRegistry) -> Self {
        let mut elements = Vec::new();

        for node in config.nodes() {
            let Some(spec) = registry.get(&node.node_type) else {
                tracing::warn!(tag = %node.tag_name, name = %node.name(), "skipping unknown tag");
                continue;
            };

            let options = if spec.kind == TagKind::Control {
                collect_options(&config, node.id, registry)
            } else {
                Vec::new()
            };

            elements.push(Element {
                id: ElementId(elements.len()),
                node: node.id,
                tag: node.tag_name.clone(),
                element_type: node.node_type.clone(),
                kind: spec.kind,
                name: node.name().to_string(),
                to_name: Vec::new(),
                attributes: node.attributes.clone(),
                value: node
                    .attr("value")
                    .map(str::to_string)
                    .or_else(|| node.value.clone()),
                resolved_value: None,
                result_type: spec.result_type.clone(),
                payload_key: spec.payload_key().map(str::to_string),
                classification: spec.classification,
                options,
            });
        }

        Self {
            config,
            elements,
            ..Default::default()
        }
    }

    /// Builds the name, object and toName indices.
    fn bind(&mut self) {
        for element in &self.elements {
            self.names.entry(element.name.clone()).or_insert(element.id);
            if element.is_object() {
                self.objects.push(element.id);
            }
        }

        let single_object = match self.objects.as_slice() {
            [only] => Some(self.elements[only.0].name.clone()),
            _ => None,
        };

        for idx in 0..self.elements.len() {
            let element = &self.elements[idx];
            if !element.is_control() || element.result_type.is_none() {
                continue;
            }

            let declared: Vec<String> = self
                .config
                .get(element.node)
                .map(|node| node.to_names().into_iter().map(str::to_string).collect())
                .unwrap_or_default();

            let targets: Vec<String> = if declared.is_empty() {
                single_object.iter().cloned().collect()
            } else {
                declared
                    .into_iter()
                    .filter(|target| {
                        self.names
                            .get(target)
                            .map(|id| self.elements[id.0].is_object())
                            .unwrap_or(false)
                    })
                    .collect()
            };

            let name = element.name.clone();
            for target in &targets {
                self.to_names
                    .entry(target.clone())
                    .or_default()
                    .push(name.clone());
            }
            self.elements[idx].to_name = targets;
        }
    }

    /// Substitutes `$variable` references in element values.
    fn resolve_data(&mut self, data: &Value) {
        for element in &mut self.elements {
            if let Some(raw) = &element.value {
                element.resolved_value = Some(substitute_variables(raw, data));
            }
        }
    }

    /// The underlying compiled configuration.
    pub fn config(&self) -> &ConfigTree {
        &self.config
    }

    /// Issues found while validating the configuration.
    pub fn report(&self) -> &ValidationReport {
        &self.report
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.0)
    }

    /// Looks an element up by name.
    pub fn get(&self, name: &str) -> Option<&Element> {
        self.names.get(name).and_then(|id| self.element(*id))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// All element names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }

    /// `object name -> [control names]`.
    pub fn to_names(&self) -> &BTreeMap<String, Vec<String>> {
        &self.to_names
    }

    pub fn objects(&self) -> impl Iterator<Item = &Element> {
        self.objects.iter().filter_map(|id| self.element(*id))
    }

    pub fn controls(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(|e| e.is_control())
    }

    /// Controls bound to `object`, in configuration order.
    pub fn controls_for(&self, object: &str) -> Vec<&Element> {
        self.to_names
            .get(object)
            .map(|names| names.iter().filter_map(|n| self.get(n)).collect())
            .unwrap_or_default()
    }

    /// First control on `object` producing `result_type`.
    pub fn find_control(&self, object: &str, result_type: &str) -> Option<&Element> {
        self.controls_for(object)
            .into_iter()
            .find(|c| c.result_type.as_deref() == Some(result_type))
    }

    /// The `Relations` control, if configured.
    pub fn relations_control(&self) -> Option<&Element> {
        self.elements.iter().find(|e| e.element_type == "relations")
    }
}

/// Collects `Label`/`Choice`/`Relation` options under a control, flattening
/// layout wrappers and keeping `Choice` nesting.
fn collect_options(config: &ConfigTree, node: NodeId, registry: &ElementRegistry) -> Vec<LabelOption> {
    let mut out = Vec::new();
    for child in config.children(node) {
        let is_option = registry
            .get(&child.node_type)
            .map(|spec| spec.kind == TagKind::Child)
            .unwrap_or(false);

        if !is_option {
            out.extend(collect_options(config, child.id, registry));
            continue;
        }

        let Some(value) = child
            .attr("value")
            .map(str::to_string)
            .or_else(|| child.value.clone())
        else {
            continue;
        };

        out.push(LabelOption {
            value,
            alias: child.attr("alias").map(str::to_string),
            background: child.attr("background").map(str::to_string),
            hotkey: child.attr("hotkey").map(str::to_string),
            selected: child.flag("selected"),
            children: collect_options(config, child.id, registry),
        });
    }
    out
}
