//! Integration tests for the results wire format.

use std::path::Path;

use labelcraft::model::wire::{read_results_json, write_results_json};
use labelcraft::store::AnnotationStore;
use labelcraft::validation::IssueCode;
use serde_json::{json, Value};

mod proptest_helpers;

fn load(config: &str, results: &str) -> (AnnotationStore, labelcraft::model::AnnotationId) {
    let config = std::fs::read_to_string(config).expect("read config fixture");
    let raw = read_results_json(Path::new(results)).expect("read results fixture");
    let mut store = AnnotationStore::with_defaults(&config, None).expect("compile config");
    let id = store.add_annotation(&raw, None);
    (store, id)
}

#[test]
fn image_results_roundtrip_semantic() {
    let (store, id) = load(
        "tests/fixtures/image_config.xml",
        "tests/fixtures/image_results.json",
    );
    let ann = store.annotation(&id).unwrap();
    assert!(ann.issues().is_clean());

    let original = read_results_json(Path::new("tests/fixtures/image_results.json")).unwrap();
    let restored = Value::Array(ann.serialize_values().unwrap());

    let res = proptest_helpers::assert_json_equivalent(
        &original,
        &restored,
        proptest_helpers::EPS_GEOMETRY,
    );
    assert!(res.is_ok(), "{}", res.unwrap_err());
}

#[test]
fn unknown_top_level_keys_survive() {
    let (store, id) = load(
        "tests/fixtures/image_config.xml",
        "tests/fixtures/image_results.json",
    );
    let out = store.annotation(&id).unwrap().serialize_values().unwrap();
    assert_eq!(out[0]["original_width"], 800);
    assert_eq!(out[0]["image_rotation"], 0);
    assert_eq!(out[1]["parentID"], "planet1");
    assert_eq!(out[2]["origin"], "manual");
}

#[test]
fn write_then_read_roundtrip() {
    let (store, id) = load(
        "tests/fixtures/image_config.xml",
        "tests/fixtures/image_results.json",
    );
    let items = store.annotation(&id).unwrap().serialize();

    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("out.json");
    write_results_json(&path, &items).expect("write results");

    let reread = read_results_json(&path).expect("read written results");
    assert_eq!(reread, serde_json::to_value(&items).unwrap());
}

#[test]
fn stored_annotation_object_is_accepted_and_repaired() {
    let (store, id) = load(
        "tests/fixtures/hypertext_config.xml",
        "tests/fixtures/hypertext_legacy.json",
    );
    let ann = store.annotation(&id).unwrap();
    let out = ann.serialize_values().unwrap();

    assert_eq!(out.len(), 1, "the result with an unknown control is dropped");
    assert_eq!(out[0]["type"], "hypertextlabels");
    assert_eq!(out[0]["value"]["start"], "/p[1]/text()[1]");
    assert_eq!(out[0]["value"]["startOffset"], 0);
    assert_eq!(out[0]["meta"], json!({"text": ["person"]}));
    assert!(out[0].get("normalization").is_none());
}

#[test]
fn malformed_payload_is_reported_not_raised() {
    let mut store =
        AnnotationStore::with_defaults(&std::fs::read_to_string("tests/fixtures/image_config.xml").unwrap(), None)
            .unwrap();
    let id = store.add_annotation(&json!("not json at all"), None);
    let ann = store.annotation(&id).unwrap();
    assert!(ann.areas().is_empty());
    assert!(ann.issues().has(IssueCode::General));
}

#[test]
fn results_may_arrive_as_json_text() {
    let mut store =
        AnnotationStore::with_defaults(&std::fs::read_to_string("tests/fixtures/image_config.xml").unwrap(), None)
            .unwrap();
    let text = std::fs::read_to_string("tests/fixtures/image_results.json").unwrap();
    let id = store.add_annotation(&Value::String(text), None);
    let ann = store.annotation(&id).unwrap();
    assert_eq!(ann.areas().len(), 3);
    assert_eq!(ann.relations().len(), 1);
}
