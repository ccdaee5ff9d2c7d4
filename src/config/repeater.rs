//! `Repeater` expansion.
//!
//! A repeater clones its children once per element of a task-data array,
//! substituting the index placeholder (default `{{idx}}`) in every attribute
//! value and text. Each clone is wrapped in a synthetic `View` so the
//! repeater ends up with exactly one child per array element.

use roxmltree::Node;
use serde_json::Value;

use super::data::resolve_reference;
use super::node::NodeId;
use super::TreeBuilder;

/// Placeholder replaced by the 0-based repeat index.
pub const DEFAULT_INDEX_FLAG: &str = "{{idx}}";

/// One active placeholder substitution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Substitution {
    pub flag: String,
    pub index: usize,
}

/// Applies every active substitution, innermost last.
pub(crate) fn apply_substitutions(raw: &str, subs: &[Substitution]) -> String {
    let mut out = raw.to_string();
    for sub in subs {
        if !sub.flag.is_empty() && out.contains(&sub.flag) {
            out = out.replace(&sub.flag, &sub.index.to_string());
        }
    }
    out
}

/// Number of copies a repeater with `on` produces.
///
/// A missing reference or a non-array value yields zero copies.
pub fn repeat_count(data: Option<&Value>, on: &str) -> usize {
    data.and_then(|data| resolve_reference(data, on))
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0)
}

pub(crate) fn expand(
    builder: &mut TreeBuilder<'_>,
    xml: Node<'_, '_>,
    repeater: NodeId,
    subs: &[Substitution],
) {
    let (on, flag) = match builder.node(repeater) {
        Some(node) => (
            node.attr("on").unwrap_or_default().to_string(),
            node.attr("indexflag")
                .map(str::to_string)
                .unwrap_or_else(|| builder.index_flag().to_string()),
        ),
        None => return,
    };

    let count = repeat_count(builder.task_data(), &on);
    if count == 0 {
        tracing::debug!(on = %on, "repeater source is empty or not an array");
    } else {
        tracing::debug!(on = %on, count, "expanding repeater");
    }

    for index in 0..count {
        let wrapper = builder.push_synthetic("View", repeater, index);

        let mut nested = subs.to_vec();
        nested.push(Substitution {
            flag: flag.clone(),
            index,
        });

        for child in xml.children().filter(|c| c.is_element()) {
            let child_id = builder.build_element(child, Some(wrapper), &nested);
            builder.attach(wrapper, child_id);
        }
        builder.attach(repeater, wrapper);
    }
}
