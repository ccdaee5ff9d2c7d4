//! Typed element instances.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::config::{NodeId, TagKind};

/// Index of an element inside an [`super::ElementTree`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ElementId(pub usize);

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementId({})", self.0)
    }
}

/// A selectable option (`Label`, `Choice`, `Relation`) of a control.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LabelOption {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hotkey: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub selected: bool,
    /// Nested options (taxonomy levels).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<LabelOption>,
}

impl LabelOption {
    /// True if `label` names this option by value or alias.
    pub fn matches(&self, label: &str) -> bool {
        self.value == label || self.alias.as_deref() == Some(label)
    }
}

/// One bound element of the compiled configuration.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Element {
    pub id: ElementId,
    /// The configuration node this element was built from.
    pub node: NodeId,
    /// Tag name as written (`RectangleLabels`).
    pub tag: String,
    /// Lower-cased tag name.
    #[serde(rename = "type")]
    pub element_type: String,
    pub kind: TagKind,
    pub name: String,
    /// Resolved object names (controls only).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub to_name: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    /// Inner text or the raw `value` attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// `value` after `$variable` substitution against the task.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_key: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub classification: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<LabelOption>,
}

impl Element {
    pub fn is_object(&self) -> bool {
        self.kind == TagKind::Object
    }

    pub fn is_control(&self) -> bool {
        self.kind == TagKind::Control
    }

    /// Reads an attribute by lower-cased key.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Boolean attribute; absent means false.
    pub fn flag(&self, key: &str) -> bool {
        self.attr(key)
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    /// Classification control attaching its result to regions.
    pub fn per_region(&self) -> bool {
        self.flag("perregion")
    }

    /// Labels control that accepts an empty label list.
    pub fn allow_empty(&self) -> bool {
        self.flag("allowempty")
    }

    /// True for controls of the `*labels` family.
    pub fn is_labels(&self) -> bool {
        self.is_control()
            && self
                .result_type
                .as_deref()
                .map(crate::config::registry::is_labels_type)
                .unwrap_or(false)
    }

    /// True if this control targets `object`.
    pub fn targets(&self, object: &str) -> bool {
        self.to_name.iter().any(|name| name == object)
    }

    /// Key under which this control's payload lives in a result `value`.
    pub fn payload_key(&self) -> Option<&str> {
        self.payload_key.as_deref()
    }

    /// Finds an option by value or alias, searching nested levels too.
    pub fn find_label(&self, label: &str) -> Option<&LabelOption> {
        fn walk<'a>(options: &'a [LabelOption], label: &str) -> Option<&'a LabelOption> {
            for option in options {
                if option.matches(label) {
                    return Some(option);
                }
                if let Some(found) = walk(&option.children, label) {
                    return Some(found);
                }
            }
            None
        }
        walk(&self.options, label)
    }
}
