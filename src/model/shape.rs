//! Typed region geometry.
//!
//! A result `value` mixes geometry (`x`, `points`, `start`, ...) with the
//! control payload (`rectanglelabels`, `choices`, ...). The payload is split
//! off by the annotation; the remaining keys are parsed here into a
//! [`ShapeKind`] chosen by the object type. Keys the geometry does not know
//! are kept in [`Shape::extra`] so nothing is lost on the way back out.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

/// Character offset or xpath-like position of a text span boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Offset {
    Number(serde_json::Number),
    Path(String),
}

impl Offset {
    /// Numeric offset, if this is a number.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Offset::Number(n) => n.as_u64(),
            Offset::Path(_) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub points: Vec<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyPoint {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    pub x: f64,
    pub y: f64,
    #[serde(rename = "radiusX")]
    pub radius_x: f64,
    #[serde(rename = "radiusY")]
    pub radius_y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
}

/// Run-length encoded brush mask.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Brush {
    pub format: String,
    pub rle: Vec<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    pub start: Offset,
    pub end: Offset,
    #[serde(rename = "startOffset", default, skip_serializing_if = "Option::is_none")]
    pub start_offset: Option<u64>,
    #[serde(rename = "endOffset", default, skip_serializing_if = "Option::is_none")]
    pub end_offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AudioSpan {
    pub start: f64,
    pub end: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<u64>,
}

/// Time-series range; bounds are timestamps or numeric indices.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Value,
    pub end: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instant: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum ShapeKind {
    Rectangle(Rect),
    Polygon(Polygon),
    KeyPoint(KeyPoint),
    Ellipse(Ellipse),
    Brush(Brush),
    TextSpan(TextSpan),
    AudioSpan(AudioSpan),
    TimeRange(TimeRange),
    /// No geometry: whole-task classification or an unknown object type.
    #[default]
    None,
}

impl ShapeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Rectangle(_) => "rectangle",
            ShapeKind::Polygon(_) => "polygon",
            ShapeKind::KeyPoint(_) => "keypoint",
            ShapeKind::Ellipse(_) => "ellipse",
            ShapeKind::Brush(_) => "brush",
            ShapeKind::TextSpan(_) => "text",
            ShapeKind::AudioSpan(_) => "audio",
            ShapeKind::TimeRange(_) => "timeseries",
            ShapeKind::None => "none",
        }
    }

    fn to_map(&self) -> Map<String, Value> {
        let value = match self {
            ShapeKind::Rectangle(s) => serde_json::to_value(s),
            ShapeKind::Polygon(s) => serde_json::to_value(s),
            ShapeKind::KeyPoint(s) => serde_json::to_value(s),
            ShapeKind::Ellipse(s) => serde_json::to_value(s),
            ShapeKind::Brush(s) => serde_json::to_value(s),
            ShapeKind::TextSpan(s) => serde_json::to_value(s),
            ShapeKind::AudioSpan(s) => serde_json::to_value(s),
            ShapeKind::TimeRange(s) => serde_json::to_value(s),
            ShapeKind::None => return Map::new(),
        };
        match value {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// Geometry of one area.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Shape {
    pub kind: ShapeKind,
    /// Value keys not covered by `kind`, emitted verbatim.
    pub extra: Map<String, Value>,
    /// Text offsets were filled in from legacy `start`/`end` and are not
    /// written back out.
    promoted_offsets: bool,
}

impl Shape {
    pub fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            extra: Map::new(),
            promoted_offsets: false,
        }
    }

    /// Parses the geometry part of a result value for an object of type
    /// `object_type`.
    pub fn from_map(value: &Map<String, Value>, object_type: &str) -> Self {
        let kind = match object_type {
            "image" => image_shape(value),
            "text" | "hypertext" | "paragraphs" => {
                parse_if(value, &["start", "end"]).map(ShapeKind::TextSpan)
            }
            "audio" | "audioplus" | "video" => {
                parse_if(value, &["start", "end"]).map(ShapeKind::AudioSpan)
            }
            "timeseries" => parse_if(value, &["start", "end"]).map(ShapeKind::TimeRange),
            _ => None,
        }
        .unwrap_or_default();

        let mut extra = value.clone();
        for key in kind.to_map().keys() {
            extra.remove(key);
        }

        Self {
            kind,
            extra,
            promoted_offsets: false,
        }
    }

    /// Marks text offsets as derived; see [`crate::model::repair::prepare_value`].
    pub fn mark_promoted(&mut self) {
        if matches!(self.kind, ShapeKind::TextSpan(_)) {
            self.promoted_offsets = true;
        }
    }

    /// Adds the geometry keys of another result `value` that this shape
    /// does not carry yet. Keys already present win.
    pub fn fill_missing(&mut self, value: &Map<String, Value>, object_type: &str) {
        let mut merged = self.kind.to_map();
        for (key, extra) in &self.extra {
            merged.entry(key.clone()).or_insert_with(|| extra.clone());
        }
        let before = merged.len();
        for (key, extra) in value {
            merged.entry(key.clone()).or_insert_with(|| extra.clone());
        }
        if merged.len() == before {
            return;
        }

        let promoted = self.promoted_offsets;
        *self = Shape::from_map(&merged, object_type);
        self.promoted_offsets = promoted && matches!(self.kind, ShapeKind::TextSpan(_));
    }

    pub fn is_none(&self) -> bool {
        self.kind == ShapeKind::None && self.extra.is_empty()
    }

    /// The geometry keys of a wire `value`.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = self.kind.to_map();
        if self.promoted_offsets {
            map.remove("startOffset");
            map.remove("endOffset");
        }
        for (key, value) in &self.extra {
            map.entry(key.clone()).or_insert_with(|| value.clone());
        }
        map
    }
}

fn image_shape(value: &Map<String, Value>) -> Option<ShapeKind> {
    if value.contains_key("points") {
        parse_if(value, &["points"]).map(ShapeKind::Polygon)
    } else if value.contains_key("radiusX") {
        parse_if(value, &["radiusX", "radiusY"]).map(ShapeKind::Ellipse)
    } else if value.contains_key("rle") {
        parse_if(value, &["rle", "format"]).map(ShapeKind::Brush)
    } else if value.contains_key("width") && value.contains_key("height") {
        parse_if(value, &["x", "y"]).map(ShapeKind::Rectangle)
    } else {
        parse_if(value, &["x", "y"]).map(ShapeKind::KeyPoint)
    }
}

fn parse_if<T: DeserializeOwned>(value: &Map<String, Value>, required: &[&str]) -> Option<T> {
    if !required.iter().all(|key| value.contains_key(*key)) {
        return None;
    }
    serde_json::from_value(Value::Object(value.clone())).ok()
}
