//! Wire format of annotation results.
//!
//! A serialized annotation is a JSON array mixing result items and relation
//! items:
//!
//! ```json
//! [
//!   {"id": "a1", "from_name": "tag", "to_name": "img", "type": "rectanglelabels",
//!    "value": {"x": 10, "y": 10, "width": 20, "height": 20, "rectanglelabels": ["Planet"]}},
//!   {"type": "relation", "from_id": "a1", "to_id": "a2", "direction": "right"}
//! ]
//! ```
//!
//! Keys the model does not interpret (`original_width`, `image_rotation`, ...)
//! are carried in [`WireResult::extra`].

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::LabelcraftError;

// ============================================================================
// Schema types
// ============================================================================

/// One result item.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WireResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub from_name: String,
    #[serde(default)]
    pub to_name: String,
    #[serde(rename = "type", default)]
    pub result_type: String,
    #[serde(default)]
    pub value: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readonly: Option<bool>,
    #[serde(rename = "parentID", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Direction of a relation between two areas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    #[default]
    Right,
    Bi,
}

impl Direction {
    /// Next direction in the `right -> left -> bi -> right` cycle.
    pub fn rotate(self) -> Self {
        match self {
            Direction::Right => Direction::Left,
            Direction::Left => Direction::Bi,
            Direction::Bi => Direction::Right,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Bi => "bi",
        }
    }
}

/// One relation item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WireRelation {
    pub from_id: String,
    pub to_id: String,
    #[serde(rename = "type", default = "relation_type")]
    pub kind: String,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
}

fn relation_type() -> String {
    RELATION_TYPE.to_string()
}

/// `type` of relation items.
pub const RELATION_TYPE: &str = "relation";

/// An item of a serialized annotation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WireItem {
    Result(WireResult),
    Relation(WireRelation),
}

impl WireItem {
    /// Parses one item, dispatching on its `type`.
    pub fn from_value(value: Value) -> Result<Self, LabelcraftError> {
        let is_relation = value.get("type").and_then(Value::as_str) == Some(RELATION_TYPE);
        let item = if is_relation {
            serde_json::from_value(value).map(WireItem::Relation)
        } else {
            serde_json::from_value(value).map(WireItem::Result)
        };
        item.map_err(|source| LabelcraftError::Deserialization {
            message: source.to_string(),
        })
    }

    pub fn as_result(&self) -> Option<&WireResult> {
        match self {
            WireItem::Result(result) => Some(result),
            WireItem::Relation(_) => None,
        }
    }

    pub fn as_relation(&self) -> Option<&WireRelation> {
        match self {
            WireItem::Relation(relation) => Some(relation),
            WireItem::Result(_) => None,
        }
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Extracts the raw item list from a results payload.
///
/// Accepts a bare array, an object with a `result` array (a stored
/// annotation), or a JSON string holding either.
pub fn raw_items(raw: &Value) -> Result<Vec<Value>, LabelcraftError> {
    match raw {
        Value::Array(items) => Ok(items.clone()),
        Value::Object(map) => match map.get("result") {
            Some(Value::Array(items)) => Ok(items.clone()),
            _ => Err(LabelcraftError::Deserialization {
                message: "expected an object with a 'result' array".to_string(),
            }),
        },
        Value::String(text) => {
            let parsed: Value =
                serde_json::from_str(text).map_err(|source| LabelcraftError::Deserialization {
                    message: source.to_string(),
                })?;
            match parsed {
                Value::String(_) => Err(LabelcraftError::Deserialization {
                    message: "results text must hold an array".to_string(),
                }),
                other => raw_items(&other),
            }
        }
        other => Err(LabelcraftError::Deserialization {
            message: format!("expected a result array, got {}", json_kind(other)),
        }),
    }
}

/// Parses every item of a results payload.
pub fn parse_items(raw: &Value) -> Result<Vec<WireItem>, LabelcraftError> {
    raw_items(raw)?.into_iter().map(WireItem::from_value).collect()
}

/// Read a results payload from a JSON file.
pub fn read_results_json(path: &Path) -> Result<Value, LabelcraftError> {
    let file = File::open(path).map_err(LabelcraftError::Io)?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).map_err(|source| LabelcraftError::ResultsJsonParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse a results payload from bytes.
pub fn from_results_slice(bytes: &[u8]) -> Result<Value, LabelcraftError> {
    serde_json::from_slice(bytes).map_err(|source| LabelcraftError::ResultsJsonParse {
        path: Path::new("<bytes>").to_path_buf(),
        source,
    })
}

/// Write serialized items as pretty JSON.
pub fn write_results_json(path: &Path, items: &[WireItem]) -> Result<(), LabelcraftError> {
    let file = File::create(path).map_err(LabelcraftError::Io)?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, items).map_err(|source| {
        LabelcraftError::ResultsJsonWrite {
            path: path.to_path_buf(),
            source,
        }
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
