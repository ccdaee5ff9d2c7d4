//! Compatibility repair of stored result payloads.
//!
//! Results written by older clients or against older configurations are
//! normalized before they are indexed:
//!
//! - the legacy `htmllabels` type becomes `hypertextlabels`
//! - a top-level `normalization` string moves into `meta.text`
//! - labels results whose control is gone (or whose label list is empty
//!   while the control forbids it) are re-targeted to another labels control
//!   on the same object, or demoted to the matching geometry control
//! - results whose `from_name` or `to_name` no longer resolve are dropped
//!
//! Relation items pass through untouched. The pass is idempotent.

use serde_json::{Map, Value};

use super::result::is_empty_value;
use super::wire::{WireItem, WireResult};
use crate::config::registry::{geometry_type, is_labels_type};
use crate::tree::ElementTree;

const LEGACY_HTML_LABELS: &str = "htmllabels";
const HYPERTEXT_LABELS: &str = "hypertextlabels";
const GENERIC_LABELS: &str = "labels";

/// Repairs a parsed item list against the current element tree.
pub fn fix_broken_annotation(items: Vec<WireItem>, tree: &ElementTree) -> Vec<WireItem> {
    let before = items.len();
    let repaired: Vec<WireItem> = items
        .into_iter()
        .filter_map(|item| match item {
            WireItem::Relation(relation) => Some(WireItem::Relation(relation)),
            WireItem::Result(result) => repair_result(result, tree).map(WireItem::Result),
        })
        .collect();

    let dropped = before - repaired.len();
    if dropped > 0 {
        tracing::warn!(dropped, "dropped results that no longer match the configuration");
    }
    repaired
}

fn repair_result(mut item: WireResult, tree: &ElementTree) -> Option<WireResult> {
    rename_legacy_type(&mut item);
    migrate_normalization(&mut item);

    if is_labels_type(&item.result_type) && !fix_labels(&mut item, tree) {
        tracing::debug!(
            from_name = %item.from_name,
            to_name = %item.to_name,
            "dropping labels result without a usable control"
        );
        return None;
    }

    if !tree.contains(&item.from_name) || !tree.contains(&item.to_name) {
        tracing::debug!(
            from_name = %item.from_name,
            to_name = %item.to_name,
            "dropping result with unresolved names"
        );
        return None;
    }

    Some(item)
}

fn rename_legacy_type(item: &mut WireResult) {
    if item.result_type == LEGACY_HTML_LABELS {
        item.result_type = HYPERTEXT_LABELS.to_string();
    }
    if let Some(labels) = item.value.remove(LEGACY_HTML_LABELS) {
        item.value.entry(HYPERTEXT_LABELS.to_string()).or_insert(labels);
    }
}

fn migrate_normalization(item: &mut WireResult) {
    let Some(normalization) = item.extra.remove("normalization") else {
        return;
    };

    let text = match normalization {
        Value::Array(entries) => Value::Array(entries),
        Value::Null => return,
        other => Value::Array(vec![other]),
    };

    let mut meta = match item.meta.take() {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    meta.insert("text".to_string(), text);
    item.meta = Some(Value::Object(meta));
}

/// Fixes a `*labels` result in place. Returns false if it must be dropped.
fn fix_labels(item: &mut WireResult, tree: &ElementTree) -> bool {
    let original_type = item.result_type.clone();

    let control_ok = tree
        .get(&item.from_name)
        .map(|control| control.is_labels() && control.targets(&item.to_name))
        .unwrap_or(false);

    if !control_ok {
        // Same family on the same object first, then the generic control.
        let fallback = tree
            .find_control(&item.to_name, &original_type)
            .or_else(|| tree.find_control(&item.to_name, GENERIC_LABELS));
        if let Some(control) = fallback {
            item.from_name = control.name.clone();
            retype(item, control.result_type.as_deref().unwrap_or(GENERIC_LABELS));
        }
    } else if let Some(control_type) = tree
        .get(&item.from_name)
        .and_then(|c| c.result_type.clone())
        .filter(|t| *t != item.result_type)
    {
        retype(item, &control_type);
    }

    let control = tree
        .get(&item.from_name)
        .filter(|c| c.is_labels() && c.targets(&item.to_name));

    let keep = match control {
        Some(control) => {
            !is_empty_value(item.value.get(&item.result_type)) || control.allow_empty()
        }
        None => false,
    };
    if keep {
        return true;
    }

    item.value.remove(&item.result_type);
    demote_to_geometry(item, &original_type, tree)
}

/// Moves the labels payload to the key of `new_type` and retypes the item.
fn retype(item: &mut WireResult, new_type: &str) {
    if item.result_type == new_type {
        return;
    }
    if let Some(labels) = item.value.remove(&item.result_type) {
        item.value.insert(new_type.to_string(), labels);
    }
    item.result_type = new_type.to_string();
}

fn demote_to_geometry(item: &mut WireResult, labels_type: &str, tree: &ElementTree) -> bool {
    let Some(geometry) = geometry_type(labels_type) else {
        return false;
    };
    match tree.find_control(&item.to_name, geometry) {
        Some(control) => {
            item.from_name = control.name.clone();
            item.result_type = geometry.to_string();
            true
        }
        None => false,
    }
}

/// Promotes legacy numeric `start`/`end` text offsets to
/// `startOffset`/`endOffset`.
///
/// Returns true if the value was changed.
pub fn prepare_value(value: &mut Map<String, Value>, object_type: &str) -> bool {
    if !matches!(object_type, "text" | "hypertext" | "paragraphs") {
        return false;
    }
    if value.contains_key("startOffset") || value.contains_key("endOffset") {
        return false;
    }
    let (Some(start), Some(end)) = (
        value.get("start").filter(|v| v.is_u64()).cloned(),
        value.get("end").filter(|v| v.is_u64()).cloned(),
    ) else {
        return false;
    };
    value.insert("startOffset".to_string(), start);
    value.insert("endOffset".to_string(), end);
    true
}
