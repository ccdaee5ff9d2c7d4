//! Tag catalogue used by the configuration compiler.
//!
//! The registry maps a lower-cased tag type (`rectanglelabels`, `image`, ...)
//! to a [`TagSpec`] describing how the element behaves: whether it is an
//! object, a control, a child option or a purely visual container, which
//! result type it produces, which object types it may point at, and which
//! attributes carry typed constraints.

use std::collections::BTreeMap;

use serde::Serialize;

/// Broad role of a tag in the element tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    /// Bound to source data (image, text, audio, ...).
    Object,
    /// Captures a user decision about an object.
    Control,
    /// Option inside a control (`Label`, `Choice`, ...).
    Child,
    /// Layout or decoration only.
    Visual,
}

/// Type constraint for a declared attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrType {
    Bool,
    Number,
    Enum(Vec<String>),
}

impl AttrType {
    fn one_of(values: &[&str]) -> Self {
        AttrType::Enum(values.iter().map(|v| v.to_string()).collect())
    }

    /// Returns true if `raw` satisfies the constraint.
    pub fn accepts(&self, raw: &str) -> bool {
        let raw = raw.trim();
        match self {
            AttrType::Bool => raw.eq_ignore_ascii_case("true") || raw.eq_ignore_ascii_case("false"),
            AttrType::Number => raw.parse::<f64>().map(f64::is_finite).unwrap_or(false),
            AttrType::Enum(values) => values.iter().any(|v| v.eq_ignore_ascii_case(raw)),
        }
    }

    /// Short description used in validation messages.
    pub fn describe(&self) -> String {
        match self {
            AttrType::Bool => "a boolean".to_string(),
            AttrType::Number => "a number".to_string(),
            AttrType::Enum(values) => format!("one of [{}]", values.join(", ")),
        }
    }
}

/// A typed attribute declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct AttrSpec {
    /// Lower-cased attribute name.
    pub name: String,
    pub ty: AttrType,
}

/// Everything the compiler needs to know about one tag.
#[derive(Clone, Debug, PartialEq)]
pub struct TagSpec {
    /// Canonical tag name, e.g. `RectangleLabels`.
    pub tag: String,
    pub kind: TagKind,
    /// Result type written to the wire (`type` key), for controls.
    pub result_type: Option<String>,
    /// Key inside `value` holding the control payload. Defaults to the
    /// result type.
    pub value_key: Option<String>,
    /// Object types (lower-cased) a control may point at.
    pub accepts: Vec<String>,
    /// Attributes that must be present.
    pub required: Vec<String>,
    /// Attributes with type constraints.
    pub attributes: Vec<AttrSpec>,
    /// Whole-task result with no geometry of its own.
    pub classification: bool,
    /// Inner content is kept verbatim as markup instead of being compiled.
    pub raw_markup: bool,
}

impl TagSpec {
    fn base(tag: &str, kind: TagKind) -> Self {
        Self {
            tag: tag.to_string(),
            kind,
            result_type: None,
            value_key: None,
            accepts: Vec::new(),
            required: Vec::new(),
            attributes: Vec::new(),
            classification: false,
            raw_markup: false,
        }
    }

    /// An object tag bound to task data through its `value` attribute.
    pub fn object(tag: &str) -> Self {
        let mut spec = Self::base(tag, TagKind::Object);
        spec.required = vec!["name".to_string(), "value".to_string()];
        spec
    }

    /// A control tag producing results of `result_type`.
    pub fn control(tag: &str, result_type: &str) -> Self {
        let mut spec = Self::base(tag, TagKind::Control);
        spec.result_type = Some(result_type.to_string());
        spec.required = vec!["name".to_string(), "toname".to_string()];
        spec
    }

    /// An option tag nested inside a control.
    pub fn child(tag: &str) -> Self {
        let mut spec = Self::base(tag, TagKind::Child);
        spec.required = vec!["value".to_string()];
        spec
    }

    /// A layout tag.
    pub fn visual(tag: &str) -> Self {
        Self::base(tag, TagKind::Visual)
    }

    pub fn accepting(mut self, types: &[&str]) -> Self {
        self.accepts = types.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn requiring(mut self, attrs: &[&str]) -> Self {
        for attr in attrs {
            if !self.required.iter().any(|r| r == attr) {
                self.required.push(attr.to_string());
            }
        }
        self
    }

    pub fn with_attr(mut self, name: &str, ty: AttrType) -> Self {
        self.attributes.push(AttrSpec {
            name: name.to_ascii_lowercase(),
            ty,
        });
        self
    }

    pub fn with_value_key(mut self, key: &str) -> Self {
        self.value_key = Some(key.to_string());
        self
    }

    pub fn classification(mut self) -> Self {
        self.classification = true;
        self
    }

    pub fn raw_markup(mut self) -> Self {
        self.raw_markup = true;
        self
    }

    /// Lower-cased type key of this tag.
    pub fn type_key(&self) -> String {
        self.tag.to_ascii_lowercase()
    }

    /// Key used inside a result `value` for this control's payload.
    pub fn payload_key(&self) -> Option<&str> {
        self.value_key.as_deref().or(self.result_type.as_deref())
    }
}

/// Returns true for result types of the `*labels` family.
pub fn is_labels_type(result_type: &str) -> bool {
    result_type.ends_with("labels")
}

/// Geometry-only type behind a labels type (`rectanglelabels` -> `rectangle`).
///
/// Returns `None` for the generic `labels` type, which has no geometry tag.
pub fn geometry_type(labels_type: &str) -> Option<&str> {
    labels_type
        .strip_suffix("labels")
        .filter(|base| !base.is_empty())
}

/// Maps tag types to their specs.
#[derive(Clone, Debug, Default)]
pub struct ElementRegistry {
    specs: BTreeMap<String, TagSpec>,
}

impl ElementRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a tag.
    pub fn register(&mut self, spec: TagSpec) {
        self.specs.insert(spec.type_key(), spec);
    }

    /// Looks up a tag by type; the lookup is case-insensitive.
    pub fn get(&self, tag_type: &str) -> Option<&TagSpec> {
        self.specs.get(&tag_type.to_ascii_lowercase())
    }

    pub fn contains(&self, tag_type: &str) -> bool {
        self.get(tag_type).is_some()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// The built-in tag catalogue.
    pub fn standard() -> Self {
        let mut registry = Self::new();

        let all_objects = [
            "image",
            "text",
            "hypertext",
            "paragraphs",
            "audio",
            "audioplus",
            "video",
            "timeseries",
            "table",
        ];

        // Objects
        registry.register(
            TagSpec::object("Image")
                .with_attr("zoom", AttrType::Bool)
                .with_attr("zoomcontrol", AttrType::Bool)
                .with_attr("rotatecontrol", AttrType::Bool)
                .with_attr("brightnesscontrol", AttrType::Bool)
                .with_attr("contrastcontrol", AttrType::Bool)
                .with_attr("maxwidth", AttrType::Number),
        );
        registry.register(
            TagSpec::object("Text")
                .with_attr(
                    "granularity",
                    AttrType::one_of(&["symbol", "word", "sentence", "paragraph"]),
                )
                .with_attr("selectionenabled", AttrType::Bool),
        );
        registry.register(
            TagSpec::object("HyperText")
                .with_attr("inline", AttrType::Bool)
                .with_attr(
                    "granularity",
                    AttrType::one_of(&["symbol", "word", "sentence", "paragraph"]),
                )
                .with_attr("selectionenabled", AttrType::Bool),
        );
        registry.register(
            TagSpec::object("Paragraphs")
                .with_attr("layout", AttrType::one_of(&["none", "dialogue"]))
                .with_attr("showplayer", AttrType::Bool),
        );
        registry.register(
            TagSpec::object("Audio")
                .with_attr("speed", AttrType::Bool)
                .with_attr("volume", AttrType::Bool),
        );
        registry.register(TagSpec::object("AudioPlus").with_attr("speed", AttrType::Bool));
        registry.register(TagSpec::object("Video").with_attr("framerate", AttrType::Number));
        registry.register(
            TagSpec::object("TimeSeries")
                .with_attr("valuetype", AttrType::one_of(&["url", "json"]))
                .with_attr("overviewwidth", AttrType::Number),
        );
        registry.register(TagSpec::object("Table"));

        // Region controls with labels
        let labels_attrs = |spec: TagSpec| {
            spec.with_attr("choice", AttrType::one_of(&["single", "multiple"]))
                .with_attr("maxusages", AttrType::Number)
                .with_attr("showinline", AttrType::Bool)
                .with_attr("allowempty", AttrType::Bool)
                .with_attr("opacity", AttrType::Number)
        };
        let shape_attrs = |spec: TagSpec| {
            spec.with_attr("strokewidth", AttrType::Number)
                .with_attr("opacity", AttrType::Number)
                .with_attr("canrotate", AttrType::Bool)
                .with_attr("snap", AttrType::one_of(&["none", "pixel"]))
        };

        registry.register(labels_attrs(
            TagSpec::control("Labels", "labels").accepting(&[
                "text",
                "hypertext",
                "paragraphs",
                "audio",
                "audioplus",
                "image",
            ]),
        ));
        registry.register(labels_attrs(shape_attrs(
            TagSpec::control("RectangleLabels", "rectanglelabels").accepting(&["image"]),
        )));
        registry.register(shape_attrs(
            TagSpec::control("Rectangle", "rectangle").accepting(&["image"]),
        ));
        registry.register(labels_attrs(shape_attrs(
            TagSpec::control("PolygonLabels", "polygonlabels").accepting(&["image"]),
        )));
        registry.register(shape_attrs(
            TagSpec::control("Polygon", "polygon").accepting(&["image"]),
        ));
        registry.register(labels_attrs(shape_attrs(
            TagSpec::control("KeyPointLabels", "keypointlabels").accepting(&["image"]),
        )));
        registry.register(shape_attrs(
            TagSpec::control("KeyPoint", "keypoint").accepting(&["image"]),
        ));
        registry.register(labels_attrs(shape_attrs(
            TagSpec::control("EllipseLabels", "ellipselabels").accepting(&["image"]),
        )));
        registry.register(shape_attrs(
            TagSpec::control("Ellipse", "ellipse").accepting(&["image"]),
        ));
        registry.register(labels_attrs(
            TagSpec::control("BrushLabels", "brushlabels").accepting(&["image"]),
        ));
        registry.register(TagSpec::control("Brush", "brush").accepting(&["image"]));
        registry.register(labels_attrs(
            TagSpec::control("HyperTextLabels", "hypertextlabels").accepting(&["hypertext"]),
        ));
        registry.register(labels_attrs(
            TagSpec::control("ParagraphLabels", "paragraphlabels").accepting(&["paragraphs"]),
        ));
        registry.register(labels_attrs(
            TagSpec::control("TimeSeriesLabels", "timeserieslabels").accepting(&["timeseries"]),
        ));

        // Classification controls
        let per_region = |spec: TagSpec| {
            spec.with_attr("perregion", AttrType::Bool)
                .with_attr("required", AttrType::Bool)
        };

        registry.register(per_region(
            TagSpec::control("Choices", "choices")
                .accepting(&all_objects)
                .classification()
                .with_attr(
                    "choice",
                    AttrType::one_of(&["single", "single-radio", "multiple"]),
                )
                .with_attr("showinline", AttrType::Bool)
                .with_attr("layout", AttrType::one_of(&["inline", "vertical", "select"])),
        ));
        registry.register(per_region(
            TagSpec::control("TextArea", "textarea")
                .accepting(&all_objects)
                .classification()
                .with_value_key("text")
                .with_attr("rows", AttrType::Number)
                .with_attr("maxsubmissions", AttrType::Number)
                .with_attr("editable", AttrType::Bool)
                .with_attr("transcription", AttrType::Bool),
        ));
        registry.register(per_region(
            TagSpec::control("Rating", "rating")
                .accepting(&all_objects)
                .classification()
                .with_attr("maxrating", AttrType::Number),
        ));
        registry.register(per_region(
            TagSpec::control("Taxonomy", "taxonomy")
                .accepting(&all_objects)
                .classification()
                .with_attr("maxusages", AttrType::Number)
                .with_attr("leafsonly", AttrType::Bool)
                .with_attr("showfullpath", AttrType::Bool),
        ));
        registry.register(per_region(
            TagSpec::control("Number", "number")
                .accepting(&all_objects)
                .classification()
                .with_attr("min", AttrType::Number)
                .with_attr("max", AttrType::Number)
                .with_attr("step", AttrType::Number),
        ));
        registry.register(per_region(
            TagSpec::control("DateTime", "datetime")
                .accepting(&all_objects)
                .classification(),
        ));

        // Relation labels live outside the name/toname wiring.
        let mut relations = TagSpec::base("Relations", TagKind::Control);
        relations.attributes.push(AttrSpec {
            name: "choice".to_string(),
            ty: AttrType::one_of(&["single", "multiple"]),
        });
        registry.register(relations);

        // Options
        registry.register(
            TagSpec::child("Label")
                .with_attr("selected", AttrType::Bool)
                .with_attr("granularity", AttrType::one_of(&["symbol", "word"])),
        );
        registry.register(TagSpec::child("Choice").with_attr("selected", AttrType::Bool));
        registry.register(TagSpec::child("Relation"));
        registry.register(TagSpec::base("Channel", TagKind::Child).requiring(&["column"]));

        // Layout
        registry.register(TagSpec::visual("View"));
        registry.register(TagSpec::visual("Header").raw_markup());
        registry.register(TagSpec::visual("Style").raw_markup());
        registry.register(
            TagSpec::visual("Repeater")
                .requiring(&["on"])
                .with_attr("mode", AttrType::one_of(&["pagination", "scroll"])),
        );
        registry.register(
            TagSpec::visual("Filter").with_attr("minlength", AttrType::Number),
        );

        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = ElementRegistry::standard();
        assert!(registry.get("RectangleLabels").is_some());
        assert!(registry.get("rectanglelabels").is_some());
        assert!(registry.get("Nonexistent").is_none());
    }

    #[test]
    fn test_payload_key_defaults_to_result_type() {
        let registry = ElementRegistry::standard();
        let labels = registry.get("rectanglelabels").unwrap();
        assert_eq!(labels.payload_key(), Some("rectanglelabels"));
        let textarea = registry.get("textarea").unwrap();
        assert_eq!(textarea.payload_key(), Some("text"));
    }

    #[test]
    fn test_attr_type_accepts() {
        assert!(AttrType::Bool.accepts("TRUE"));
        assert!(!AttrType::Bool.accepts("yes"));
        assert!(AttrType::Number.accepts(" 2.5 "));
        assert!(!AttrType::Number.accepts("NaN"));
        let choice = AttrType::one_of(&["single", "multiple"]);
        assert!(choice.accepts("Multiple"));
        assert!(!choice.accepts("many"));
    }

    #[test]
    fn test_geometry_type() {
        assert_eq!(geometry_type("rectanglelabels"), Some("rectangle"));
        assert_eq!(geometry_type("labels"), None);
        assert!(is_labels_type("hypertextlabels"));
        assert!(!is_labels_type("choices"));
    }

    #[test]
    fn test_register_custom_tag() {
        let mut registry = ElementRegistry::new();
        registry.register(TagSpec::control("Sentiment", "sentiment").accepting(&["text"]));
        let spec = registry.get("sentiment").unwrap();
        assert_eq!(spec.kind, TagKind::Control);
        assert_eq!(spec.result_type.as_deref(), Some("sentiment"));
    }
}
