//! Results attached to areas.

use serde_json::{Map, Value};

use super::wire::WireResult;

/// One `(from_name, to_name, type, value)` tuple of an area.
///
/// `value` holds only the control payload (`{"labels": ["PER"]}`); the
/// geometry lives on the owning [`super::Area`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AreaResult {
    pub from_name: String,
    pub to_name: String,
    pub result_type: String,
    pub value: Map<String, Value>,
    pub origin: Option<String>,
    pub score: Option<f64>,
    pub readonly: Option<bool>,
    pub meta: Option<Value>,
    /// Top-level wire keys not interpreted by the model.
    pub extra: Map<String, Value>,
}

impl AreaResult {
    pub fn new(
        from_name: impl Into<String>,
        to_name: impl Into<String>,
        result_type: impl Into<String>,
        value: Map<String, Value>,
    ) -> Self {
        Self {
            from_name: from_name.into(),
            to_name: to_name.into(),
            result_type: result_type.into(),
            value,
            ..Default::default()
        }
    }

    /// Builds a result from a wire item whose payload was already split off.
    pub(crate) fn from_wire(item: &WireResult, payload: Map<String, Value>) -> Self {
        Self {
            from_name: item.from_name.clone(),
            to_name: item.to_name.clone(),
            result_type: item.result_type.clone(),
            value: payload,
            origin: item.origin.clone(),
            score: item.score,
            readonly: item.readonly,
            meta: item.meta.clone(),
            extra: item.extra.clone(),
        }
    }

    /// Payload stored under `key`.
    pub fn payload(&self, key: &str) -> Option<&Value> {
        self.value.get(key)
    }

    /// String entries of the payload under `key` (labels, choices, text).
    pub fn strings(&self, key: &str) -> Vec<&str> {
        match self.value.get(key) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            Some(Value::String(s)) => vec![s.as_str()],
            _ => Vec::new(),
        }
    }

    /// True if the payload under `key` carries nothing.
    pub fn is_empty_payload(&self, key: &str) -> bool {
        is_empty_value(self.value.get(key))
    }
}

pub(crate) fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(_) => false,
    }
}
