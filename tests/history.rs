//! Undo/redo over whole annotations.

use std::rc::Rc;

use labelcraft::config::ElementRegistry;
use labelcraft::events::NoopEvents;
use labelcraft::model::{DeserializeOptions, Shape};
use labelcraft::settings::Settings;
use labelcraft::store::AnnotationStore;
use serde_json::{json, Map, Value};

fn store(settings: Settings) -> AnnotationStore {
    let config = std::fs::read_to_string("tests/fixtures/image_config.xml").unwrap();
    AnnotationStore::new(
        &config,
        None,
        &ElementRegistry::standard(),
        settings,
        Rc::new(NoopEvents),
    )
    .unwrap()
}

fn rect(x: f64) -> Shape {
    let value = json!({"x": x, "y": 1, "width": 2, "height": 2});
    Shape::from_map(value.as_object().unwrap(), "image")
}

fn labels(label: &str) -> Map<String, Value> {
    json!({"rectanglelabels": [label]}).as_object().cloned().unwrap()
}

#[test]
fn undo_restores_areas_and_relations_together() {
    let mut store = store(Settings::default());
    let id = store.create_annotation();
    let ann = store.annotation_mut(&id).unwrap();

    let a = ann.create_result(rect(1.0), labels("Planet"), "tag", "img").unwrap();
    let b = ann.create_result(rect(5.0), labels("Moonwalker"), "tag", "img").unwrap();
    ann.add_relation(&b, &a).unwrap();
    assert_eq!(ann.relations().len(), 1);

    assert!(ann.undo());
    assert!(ann.relations().is_empty());
    assert_eq!(ann.areas().len(), 2);

    assert!(ann.undo());
    assert_eq!(ann.areas().len(), 1);

    assert!(ann.redo());
    assert!(ann.redo());
    assert_eq!(ann.relations().len(), 1);
    assert!(!ann.can_redo());
}

#[test]
fn loading_results_is_one_step() {
    let mut store = store(Settings::default());
    let id = store.create_annotation();
    let ann = store.annotation_mut(&id).unwrap();

    let raw = std::fs::read_to_string("tests/fixtures/image_results.json").unwrap();
    let raw: Value = serde_json::from_str(&raw).unwrap();
    assert!(ann.deserialize_results(&raw, DeserializeOptions::default()));
    assert_eq!(ann.areas().len(), 3);

    assert!(ann.undo());
    assert!(ann.areas().is_empty());
    assert!(!ann.can_undo());
}

#[test]
fn undo_after_edit_drops_redo() {
    let mut store = store(Settings::default());
    let id = store.create_annotation();
    let ann = store.annotation_mut(&id).unwrap();

    let a = ann.create_result(rect(1.0), labels("Planet"), "tag", "img").unwrap();
    ann.update_shape(&a, rect(9.0)).unwrap();
    assert!(ann.undo());
    assert!(ann.can_redo());

    ann.set_readonly(&a, true).unwrap();
    assert!(!ann.can_redo());
}

#[test]
fn history_limit_keeps_reset_target() {
    let settings = Settings {
        history_limit: Some(3),
        ..Settings::default()
    };
    let mut store = store(settings);
    let id = store.create_annotation();
    let ann = store.annotation_mut(&id).unwrap();

    for x in 0..6 {
        ann.create_result(rect(x as f64), labels("Planet"), "tag", "img").unwrap();
    }
    assert_eq!(ann.history().len(), 3);

    let mut undone = 0;
    while ann.undo() {
        undone += 1;
    }
    assert_eq!(undone, 2);
    assert_eq!(ann.areas().len(), 4);

    assert!(ann.reset());
    assert!(ann.areas().is_empty());
}

#[test]
fn stored_annotations_start_with_a_clean_history() {
    let mut store = store(Settings::default());
    let raw: Value = serde_json::from_str(
        &std::fs::read_to_string("tests/fixtures/image_results.json").unwrap(),
    )
    .unwrap();
    let id = store.add_annotation(&raw, Some("12".to_string()));
    let ann = store.annotation_mut(&id).unwrap();
    assert_eq!(ann.pk(), Some("12"));
    assert!(!ann.can_undo());

    let moon = ann.find_area("moon1").unwrap().id.clone();
    ann.delete_area(&moon).unwrap();
    assert!(ann.relations().is_empty());

    assert!(ann.reset());
    assert_eq!(ann.areas().len(), 3);
    assert_eq!(ann.relations().len(), 1);
}
