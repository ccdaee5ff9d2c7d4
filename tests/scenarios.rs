//! End-to-end scenarios: compile a configuration, build annotations, and
//! check what they serialize to.

use std::rc::Rc;

use labelcraft::config::{compile_config, ElementRegistry};
use labelcraft::events::{Event, EventLog};
use labelcraft::model::shape::{Offset, TextSpan};
use labelcraft::model::{Shape, ShapeKind, SortBy, SortOrder};
use labelcraft::settings::Settings;
use labelcraft::store::AnnotationStore;
use labelcraft::validation::IssueCode;
use serde_json::{json, Map, Value};

fn payload(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("object payload")
}

#[test]
fn rectangle_result_serializes_its_label() {
    let config = r#"<View>
        <Image name="img" value="$image"/>
        <RectangleLabels name="tag" toName="img">
            <Label value="Planet"/><Label value="Moonwalker"/>
        </RectangleLabels>
    </View>"#;
    let mut store = AnnotationStore::with_defaults(config, Some(&json!({"image": "a.png"})))
        .expect("compile config");
    assert!(store.report().is_clean());

    let id = store.add_annotation(
        &json!([{
            "id": "a1", "from_name": "tag", "to_name": "img", "type": "rectanglelabels",
            "value": {"x": 1, "y": 2, "width": 3, "height": 4, "rectanglelabels": ["Moonwalker"]}
        }]),
        None,
    );

    let out = store.annotation(&id).unwrap().serialize_values().unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0]["value"]["rectanglelabels"], json!(["Moonwalker"]));
    assert_eq!(out[0]["id"], "a1");
}

#[test]
fn per_region_taxonomy_shares_the_area_id() {
    let config = r#"<View>
        <Text name="text" value="$text"/>
        <Labels name="ner" toName="text"><Label value="PER"/><Label value="ORG"/></Labels>
        <Taxonomy name="kind" toName="text" perRegion="true">
            <Choice value="Eukarya"><Choice value="Extraterrestial"/></Choice>
            <Choice value="Archaea"/>
        </Taxonomy>
    </View>"#;
    let mut store = AnnotationStore::with_defaults(config, None).unwrap();
    let ann_id = store.create_annotation();
    let ann = store.annotation_mut(&ann_id).unwrap();

    let span = Shape::new(ShapeKind::TextSpan(TextSpan {
        start: Offset::Number(0.into()),
        end: Offset::Number(5.into()),
        start_offset: None,
        end_offset: None,
        text: Some("Alice".to_string()),
    }));
    let area = ann
        .create_result(span, payload(json!({"labels": ["PER"]})), "ner", "text")
        .unwrap();
    ann.add_result(
        &area,
        "kind",
        payload(json!({"taxonomy": [["Eukarya", "Extraterrestial"]]})),
    )
    .unwrap();

    let out = ann.serialize_values().unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out[0]["id"], out[1]["id"]);
    assert_eq!(out[0]["type"], "labels");
    assert_eq!(out[1]["type"], "taxonomy");
    assert_eq!(out[1]["value"]["start"], 0);
    assert_eq!(
        out[1]["value"]["taxonomy"],
        json!([["Eukarya", "Extraterrestial"]])
    );
}

#[test]
fn legacy_htmllabels_are_renamed() {
    let config = r#"<View>
        <HyperText name="doc" value="$html"/>
        <HyperTextLabels name="ner" toName="doc"><Label value="PER"/></HyperTextLabels>
    </View>"#;
    let mut store = AnnotationStore::with_defaults(config, None).unwrap();
    let id = store.add_annotation(
        &json!([{
            "id": "h1", "from_name": "ner", "to_name": "doc", "type": "htmllabels",
            "value": {"start": "/p[1]", "end": "/p[1]", "startOffset": 0, "endOffset": 3,
                      "htmllabels": ["PER"]}
        }]),
        None,
    );

    let out = store.annotation(&id).unwrap().serialize_values().unwrap();
    assert_eq!(out[0]["type"], "hypertextlabels");
    assert_eq!(out[0]["value"]["hypertextlabels"], json!(["PER"]));
    assert!(out[0]["value"].get("htmllabels").is_none());
}

#[test]
fn repeater_expands_one_subtree_per_item() {
    let config = r#"<View>
        <Repeater on="$utterances" indexFlag="{{idx}}">
            <Text name="user_{{idx}}" value="$utterances[{{idx}}].text"/>
        </Repeater>
    </View>"#;
    let registry = ElementRegistry::standard();
    let task = json!({"utterances": [{"text": "hi"}, {"text": "bye"}]});

    let tree = compile_config(config, Some(&task), &registry).unwrap();
    let repeater = tree.nodes_of_type("repeater").next().unwrap();
    assert_eq!(repeater.children.len(), 2);
    assert!(tree.find_by_name("user_0").is_some());
    assert!(tree.find_by_name("user_1").is_some());

    let bad = compile_config(
        &config.replace("$utterances\"", "$missing\""),
        Some(&task),
        &registry,
    )
    .unwrap();
    let repeater = bad.nodes_of_type("repeater").next().unwrap();
    assert!(repeater.children.is_empty());
}

#[test]
fn repeater_controls_bind_to_their_own_object() {
    let config = std::fs::read_to_string("tests/fixtures/dialogue_config.xml").unwrap();
    let task: Value =
        serde_json::from_str(&std::fs::read_to_string("tests/fixtures/dialogue_task.json").unwrap())
            .unwrap();
    let store = AnnotationStore::with_defaults(&config, Some(&task)).unwrap();
    let tree = store.tree();

    assert!(store.report().is_clean(), "{}", store.report());
    assert_eq!(tree.objects().count(), 2);
    assert!(tree.get("intent_1").unwrap().targets("user_1"));
    assert_eq!(
        tree.get("user_1").unwrap().resolved_value,
        Some(json!("Where is the moon?"))
    );
}

#[test]
fn invalid_config_still_compiles_with_issues() {
    let config = std::fs::read_to_string("tests/fixtures/invalid_config.xml").unwrap();
    let store = AnnotationStore::with_defaults(&config, None).unwrap();
    let report = store.report();
    assert!(report.has(IssueCode::TagNotFound));
    assert!(report.has(IssueCode::BadType));
    assert!(store.tree().get("tag").unwrap().to_name.is_empty());
}

#[test]
fn session_settings_select_new_regions() {
    let config = std::fs::read_to_string("tests/fixtures/image_config.xml").unwrap();
    let settings = Settings::from_path(std::path::Path::new("tests/fixtures/settings.yaml")).unwrap();
    let events = Rc::new(EventLog::new());
    let mut store = AnnotationStore::new(
        &config,
        None,
        &ElementRegistry::standard(),
        settings,
        events.clone(),
    )
    .unwrap();

    let ann_id = store.create_annotation();
    let ann = store.annotation_mut(&ann_id).unwrap();
    let shape = Shape::from_map(
        &payload(json!({"x": 1, "y": 1, "width": 2, "height": 2})),
        "image",
    );
    let area = ann
        .create_result(shape, payload(json!({"rectanglelabels": ["Planet"]})), "tag", "img")
        .unwrap();

    assert!(ann.is_selected(&area));
    assert_eq!(
        events.events(),
        vec![
            Event::EntityCreated(area.clone()),
            Event::SelectionChanged(vec![area.clone()]),
        ]
    );
}

#[test]
fn regions_group_by_parent_and_label() {
    let config = std::fs::read_to_string("tests/fixtures/image_config.xml").unwrap();
    let results: Value =
        serde_json::from_str(&std::fs::read_to_string("tests/fixtures/image_results.json").unwrap())
            .unwrap();
    let mut store = AnnotationStore::with_defaults(&config, None).unwrap();
    let id = store.add_annotation(&results, Some("42".to_string()));
    let ann = store.annotation(&id).unwrap();

    let roots = ann.regions().as_tree(|area| area.raw_id().to_string());
    let planet = roots.iter().find(|n| n.item == "planet1").unwrap();
    assert_eq!(planet.children.len(), 1);
    assert_eq!(planet.children[0].item, "moon1");

    let groups = ann
        .regions()
        .sorted_by(SortBy::Date, SortOrder::Desc)
        .as_labels_tree(|area| area.raw_id().to_string());
    let labels: Vec<Option<&str>> = groups.iter().map(|g| g.label.as_deref()).collect();
    assert_eq!(labels.first(), Some(&Some("Planet")));
    assert_eq!(labels.get(1), Some(&Some("Moonwalker")));

    assert_eq!(ann.relations().len(), 1);
    assert_eq!(ann.relations()[0].label_values(), ["orbits".to_string()]);
}
