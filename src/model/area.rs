//! Areas: annotated regions and whole-task classifications.

use super::ids::AreaId;
use super::result::AreaResult;
use super::shape::Shape;
use super::wire::WireResult;
use crate::tree::ElementTree;

/// One annotated unit.
///
/// Every area has at least one result. `parent_id` is a soft reference to
/// another area's raw id and only drives display nesting.
#[derive(Clone, Debug, PartialEq)]
pub struct Area {
    pub id: AreaId,
    /// Name of the object element the area belongs to.
    pub object: String,
    /// Raw id of the parent area; empty for top-level areas.
    pub parent_id: String,
    pub shape: Shape,
    pub results: Vec<AreaResult>,
    /// Whole-task, non-geometric area.
    pub classification: bool,
    pub readonly: bool,
    pub hidden: bool,
    pub from_suggestion: bool,
    pub(crate) seq: u64,
}

impl Area {
    pub(crate) fn new(id: AreaId, object: impl Into<String>, shape: Shape, seq: u64) -> Self {
        Self {
            id,
            object: object.into(),
            parent_id: String::new(),
            shape,
            results: Vec::new(),
            classification: false,
            readonly: false,
            hidden: false,
            from_suggestion: false,
            seq,
        }
    }

    pub fn raw_id(&self) -> &str {
        self.id.raw()
    }

    /// Insertion order inside the owning annotation.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn result_for(&self, control: &str) -> Option<&AreaResult> {
        self.results.iter().find(|r| r.from_name == control)
    }

    pub fn result_for_mut(&mut self, control: &str) -> Option<&mut AreaResult> {
        self.results.iter_mut().find(|r| r.from_name == control)
    }

    /// Score of the first scored result.
    pub fn score(&self) -> Option<f64> {
        self.results.iter().find_map(|r| r.score)
    }

    /// Name of the control the area was created with.
    pub fn control(&self) -> Option<&str> {
        self.results.first().map(|r| r.from_name.as_str())
    }

    /// Selected labels as `(control, label)` pairs, across every labels
    /// control attached to the area.
    pub fn selected_labels<'a>(&'a self, tree: &ElementTree) -> Vec<(&'a str, &'a str)> {
        let mut out = Vec::new();
        for result in &self.results {
            let Some(control) = tree.get(&result.from_name) else {
                continue;
            };
            if !control.is_labels() {
                continue;
            }
            let key = control.payload_key().unwrap_or(result.result_type.as_str());
            for label in result.strings(key) {
                out.push((result.from_name.as_str(), label));
            }
        }
        out
    }

    /// Wire form of one of this area's results.
    pub fn to_wire(&self, result: &AreaResult) -> WireResult {
        let mut value = self.shape.to_map();
        for (key, payload) in &result.value {
            value.insert(key.clone(), payload.clone());
        }

        let readonly = match (self.readonly, result.readonly) {
            (true, _) => Some(true),
            (false, Some(true)) => Some(false),
            (false, other) => other,
        };

        WireResult {
            id: Some(self.raw_id().to_string()),
            from_name: result.from_name.clone(),
            to_name: result.to_name.clone(),
            result_type: result.result_type.clone(),
            value,
            origin: result.origin.clone(),
            readonly,
            parent_id: (!self.parent_id.is_empty()).then(|| self.parent_id.clone()),
            score: result.score,
            meta: result.meta.clone(),
            hidden: self.hidden.then_some(true),
            extra: result.extra.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::AnnotationId;
    use crate::model::shape::{Rect, ShapeKind};
    use serde_json::{json, Map, Value};

    fn rect_area() -> Area {
        let ann = AnnotationId::new("ann");
        let shape = Shape::new(ShapeKind::Rectangle(Rect {
            x: 1.0,
            y: 2.0,
            width: 3.0,
            height: 4.0,
            rotation: None,
        }));
        let mut area = Area::new(AreaId::new("r1", &ann), "img", shape, 0);
        let mut value = Map::new();
        value.insert("rectanglelabels".into(), json!(["Planet"]));
        area.results
            .push(AreaResult::new("tag", "img", "rectanglelabels", value));
        area
    }

    #[test]
    fn wire_value_merges_geometry_and_payload() {
        let area = rect_area();
        let wire = area.to_wire(&area.results[0]);
        assert_eq!(wire.id.as_deref(), Some("r1"));
        assert_eq!(wire.value.get("rectanglelabels"), Some(&json!(["Planet"])));
        assert_eq!(wire.value.get("width").and_then(Value::as_f64), Some(3.0));
        assert!(wire.parent_id.is_none());
        assert!(wire.hidden.is_none());
    }

    #[test]
    fn wire_flags_follow_area_state() {
        let mut area = rect_area();
        area.readonly = true;
        area.hidden = true;
        area.parent_id = "p1".into();
        let wire = area.to_wire(&area.results[0]);
        assert_eq!(wire.readonly, Some(true));
        assert_eq!(wire.hidden, Some(true));
        assert_eq!(wire.parent_id.as_deref(), Some("p1"));

        area.readonly = false;
        area.results[0].readonly = Some(true);
        assert_eq!(area.to_wire(&area.results[0]).readonly, Some(false));
    }
}
