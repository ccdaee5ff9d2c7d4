//! Configuration validation for labelcraft.
//!
//! This module checks a compiled [`ConfigTree`] against the
//! [`ElementRegistry`], collecting every problem instead of stopping at the
//! first one:
//! - Unknown tags
//! - Missing required attributes (`name`, `toname`, `value`, ...)
//! - `toname` references to missing or unsupported tags
//! - Attribute values failing their type constraint
//! - Duplicate element names
//!
//! Two conditions are reported as warnings only: repeaters that expand to
//! nothing, and controls listing the same label value twice.

mod report;

pub use report::{IssueCode, IssueContext, Severity, ValidationIssue, ValidationReport};

use std::collections::{HashMap, HashSet};

use crate::config::{ConfigNode, ConfigTree, ElementRegistry, TagKind, TagSpec};

/// Validates a compiled configuration and returns a report of all issues found.
pub fn validate_config(tree: &ConfigTree, registry: &ElementRegistry) -> ValidationReport {
    let mut report = ValidationReport::new();

    let object_count = tree
        .nodes()
        .filter(|node| {
            registry
                .get(&node.node_type)
                .map(|spec| spec.kind == TagKind::Object)
                .unwrap_or(false)
        })
        .count();

    let names = validate_names(tree, &mut report);

    for node in tree.nodes() {
        let Some(spec) = registry.get(&node.node_type) else {
            report.add(ValidationIssue::error(
                IssueCode::UnknownTag,
                format!("Tag <{}> is not supported", node.tag_name),
                element_context(node),
            ));
            continue;
        };

        validate_required(node, spec, object_count, &mut report);

        if spec.kind == TagKind::Control && !spec.accepts.is_empty() {
            validate_to_names(node, spec, &names, &mut report);
        }

        if spec.kind == TagKind::Control {
            validate_duplicate_labels(tree, node, &mut report);
        }

        if node.node_type == "repeater" && node.children.is_empty() {
            report.add(ValidationIssue::warning(
                IssueCode::EmptyRepeater,
                format!(
                    "Repeater source '{}' is missing, empty or not an array",
                    node.attr("on").unwrap_or_default()
                ),
                IssueContext::Attribute {
                    tag: node.tag_name.clone(),
                    name: node.name().to_string(),
                    attribute: "on".to_string(),
                },
            ));
        }

        validate_attribute_types(node, spec, &mut report);
    }

    report
}

/// Collects declared names, reporting duplicates.
fn validate_names<'a>(
    tree: &'a ConfigTree,
    report: &mut ValidationReport,
) -> HashMap<&'a str, &'a ConfigNode> {
    let mut names: HashMap<&str, &ConfigNode> = HashMap::new();

    for node in tree.nodes() {
        let name = node.name();
        if let Some(first) = names.get(name) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateName,
                format!(
                    "Name '{}' is already used by <{}>",
                    name, first.tag_name
                ),
                element_context(node),
            ));
        } else {
            names.insert(name, node);
        }
    }

    names
}

fn validate_required(
    node: &ConfigNode,
    spec: &TagSpec,
    object_count: usize,
    report: &mut ValidationReport,
) {
    for attr in &spec.required {
        let missing = match attr.as_str() {
            "name" => node.name_synthesized,
            // A single object in the tree lets the binder infer the target.
            "toname" => node.toname_synthesized && object_count != 1,
            "value" => node.attr("value").is_none() && node.value.is_none(),
            other => node.attr(other).is_none(),
        };

        if missing {
            report.add(ValidationIssue::error(
                IssueCode::Required,
                format!("Attribute '{}' is required for <{}>", attr, node.tag_name),
                IssueContext::Attribute {
                    tag: node.tag_name.clone(),
                    name: node.name().to_string(),
                    attribute: attr.clone(),
                },
            ));
        }
    }
}

fn validate_to_names(
    node: &ConfigNode,
    spec: &TagSpec,
    names: &HashMap<&str, &ConfigNode>,
    report: &mut ValidationReport,
) {
    for target in node.to_names() {
        match names.get(target) {
            None => report.add(ValidationIssue::error(
                IssueCode::TagNotFound,
                format!("toName '{}' does not match any tag", target),
                to_name_context(node),
            )),
            Some(found) if !spec.accepts.iter().any(|t| *t == found.node_type) => {
                report.add(ValidationIssue::error(
                    IssueCode::TagUnsupported,
                    format!(
                        "toName '{}' points at <{}>, but <{}> only works with: {}",
                        target,
                        found.tag_name,
                        node.tag_name,
                        spec.accepts.join(", ")
                    ),
                    to_name_context(node),
                ))
            }
            Some(_) => {}
        }
    }
}

fn validate_duplicate_labels(tree: &ConfigTree, node: &ConfigNode, report: &mut ValidationReport) {
    let mut seen = HashSet::new();
    for child in tree.children(node.id) {
        if !matches!(child.node_type.as_str(), "label" | "choice" | "relation") {
            continue;
        }
        let Some(value) = child.attr("value") else {
            continue;
        };
        if !seen.insert(value) {
            report.add(ValidationIssue::warning(
                IssueCode::DuplicateLabel,
                format!("Value '{}' is listed more than once", value),
                element_context(node),
            ));
        }
    }
}

fn validate_attribute_types(node: &ConfigNode, spec: &TagSpec, report: &mut ValidationReport) {
    for attr in &spec.attributes {
        let Some(raw) = node.attr(&attr.name) else {
            continue;
        };
        if !attr.ty.accepts(raw) {
            report.add(ValidationIssue::error(
                IssueCode::BadType,
                format!(
                    "Attribute '{}' has value '{}' but must be {}",
                    attr.name,
                    raw,
                    attr.ty.describe()
                ),
                IssueContext::Attribute {
                    tag: node.tag_name.clone(),
                    name: node.name().to_string(),
                    attribute: attr.name.clone(),
                },
            ));
        }
    }
}

fn element_context(node: &ConfigNode) -> IssueContext {
    IssueContext::Element {
        tag: node.tag_name.clone(),
        name: node.name().to_string(),
    }
}

fn to_name_context(node: &ConfigNode) -> IssueContext {
    IssueContext::Attribute {
        tag: node.tag_name.clone(),
        name: node.name().to_string(),
        attribute: "toname".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::compile_config;

    fn validate(text: &str) -> ValidationReport {
        let registry = ElementRegistry::standard();
        let tree = compile_config(text, None, &registry).expect("compile config");
        validate_config(&tree, &registry)
    }

    #[test]
    fn test_valid_config() {
        let report = validate(
            r#"<View>
                <Image name="img" value="$image"/>
                <RectangleLabels name="tag" toName="img">
                    <Label value="Planet"/>
                    <Label value="Moonwalker"/>
                </RectangleLabels>
            </View>"#,
        );
        assert!(report.is_clean(), "Expected no issues, got: {:?}", report.issues);
    }

    #[test]
    fn test_missing_name() {
        let report = validate(
            r#"<View><Image name="img" value="$image"/><RectangleLabels toName="img"><Label value="A"/></RectangleLabels></View>"#,
        );
        assert_eq!(report.error_count(), 1);
        assert!(report.has(IssueCode::Required));
    }

    #[test]
    fn test_missing_toname_with_single_object_is_fine() {
        let report = validate(
            r#"<View><Text name="txt" value="$text"/><Labels name="ner"><Label value="PER"/></Labels></View>"#,
        );
        assert!(report.is_clean(), "unexpected: {:?}", report.issues);
    }

    #[test]
    fn test_missing_toname_with_many_objects() {
        let report = validate(
            r#"<View><Text name="a" value="$a"/><Text name="b" value="$b"/><Labels name="ner"><Label value="PER"/></Labels></View>"#,
        );
        assert_eq!(report.error_count(), 1);
        assert!(report.has(IssueCode::Required));
    }

    #[test]
    fn test_toname_not_found() {
        let report = validate(
            r#"<View><Image name="img" value="$image"/><Choices name="c" toName="nope"><Choice value="A"/></Choices></View>"#,
        );
        assert!(report.has(IssueCode::TagNotFound));
    }

    #[test]
    fn test_toname_unsupported() {
        let report = validate(
            r#"<View><Text name="txt" value="$text"/><RectangleLabels name="r" toName="txt"><Label value="A"/></RectangleLabels></View>"#,
        );
        assert!(report.has(IssueCode::TagUnsupported));
    }

    #[test]
    fn test_bad_attribute_type() {
        let report = validate(
            r#"<View><Image name="img" value="$image" zoom="maybe"/><Choices name="c" toName="img" choice="many"><Choice value="A"/></Choices></View>"#,
        );
        assert_eq!(report.with_code(IssueCode::BadType).count(), 2);
    }

    #[test]
    fn test_errors_are_collected() {
        let report = validate(
            r#"<View>
                <Widget name="w"/>
                <Image value="$image"/>
                <Choices name="c" toName="ghost" choice="many"><Choice value="A"/></Choices>
            </View>"#,
        );
        assert!(report.has(IssueCode::UnknownTag));
        assert!(report.has(IssueCode::Required));
        assert!(report.has(IssueCode::TagNotFound));
        assert!(report.has(IssueCode::BadType));
        assert_eq!(report.error_count(), 4);
    }

    #[test]
    fn test_empty_repeater_is_a_warning() {
        let report = validate(
            r#"<View><Repeater on="$missing"><Text name="t_{{idx}}" value="$missing[{{idx}}]"/></Repeater></View>"#,
        );
        assert_eq!(report.error_count(), 0);
        assert_eq!(report.warning_count(), 1);
        assert!(report.has(IssueCode::EmptyRepeater));
    }

    #[test]
    fn test_duplicate_label_is_a_warning() {
        let report = validate(
            r#"<View>
                <Image name="img" value="$image"/>
                <RectangleLabels name="tag" toName="img">
                    <Label value="Planet"/><Label value="Star"/><Label value="Planet"/>
                </RectangleLabels>
            </View>"#,
        );
        assert!(report.is_ok());
        assert_eq!(report.with_code(IssueCode::DuplicateLabel).count(), 1);
    }

    #[test]
    fn test_duplicate_name() {
        let report = validate(
            r#"<View><Text name="x" value="$a"/><Text name="x" value="$b"/></View>"#,
        );
        assert!(report.has(IssueCode::DuplicateName));
    }
}
