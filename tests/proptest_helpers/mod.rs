#![allow(dead_code)]

use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};
use serde_json::{json, Value};

/// Geometry survives a round trip through `f64` up to this tolerance.
pub const EPS_GEOMETRY: f64 = 1e-9;

pub const IMAGE_CONFIG: &str = r#"<View>
  <Image name="img" value="$image"/>
  <RectangleLabels name="tag" toName="img">
    <Label value="Planet"/><Label value="Moonwalker"/><Label value="Star"/>
  </RectangleLabels>
  <Rectangle name="box" toName="img"/>
  <Labels name="generic" toName="img"><Label value="Planet"/></Labels>
  <Choices name="quality" toName="img"><Choice value="Good"/><Choice value="Bad"/></Choices>
  <Relations><Relation value="orbits"/></Relations>
</View>"#;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Compares two JSON documents, treating numbers as `f64` within `eps`.
pub fn assert_json_equivalent(a: &Value, b: &Value, eps: f64) -> Result<(), String> {
    compare(a, b, eps, "$")
}

fn compare(a: &Value, b: &Value, eps: f64, path: &str) -> Result<(), String> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(f64::NAN), y.as_f64().unwrap_or(f64::NAN));
            if (x - y).abs() <= eps {
                Ok(())
            } else {
                Err(format!("{path}: {x} != {y}"))
            }
        }
        (Value::Array(x), Value::Array(y)) => {
            if x.len() != y.len() {
                return Err(format!("{path}: length {} != {}", x.len(), y.len()));
            }
            for (idx, (l, r)) in x.iter().zip(y).enumerate() {
                compare(l, r, eps, &format!("{path}[{idx}]"))?;
            }
            Ok(())
        }
        (Value::Object(x), Value::Object(y)) => {
            let left: Vec<&String> = x.keys().collect();
            let right: Vec<&String> = y.keys().collect();
            if left != right {
                return Err(format!("{path}: keys {left:?} != {right:?}"));
            }
            for (key, l) in x {
                compare(l, &y[key], eps, &format!("{path}.{key}"))?;
            }
            Ok(())
        }
        _ if a == b => Ok(()),
        _ => Err(format!("{path}: {a} != {b}")),
    }
}

pub fn arb_label() -> BoxedStrategy<String> {
    prop_oneof![
        Just("Planet".to_string()),
        Just("Moonwalker".to_string()),
        Just("Star".to_string()),
    ]
    .boxed()
}

pub fn arb_rect_value() -> BoxedStrategy<(f64, f64, f64, f64)> {
    (0.0f64..90.0, 0.0f64..90.0, 0.1f64..10.0, 0.1f64..10.0).boxed()
}

/// A well-formed rectangle result with a unique id.
pub fn arb_rect_result(idx: usize) -> BoxedStrategy<Value> {
    (arb_rect_value(), prop::collection::vec(arb_label(), 1..3))
        .prop_map(move |((x, y, width, height), labels)| {
            json!({
                "id": format!("r{idx}"),
                "from_name": "tag",
                "to_name": "img",
                "type": "rectanglelabels",
                "value": {"x": x, "y": y, "width": width, "height": height, "rectanglelabels": labels}
            })
        })
        .boxed()
}

/// A result the repair pass has to touch: wrong control, generic type,
/// empty labels, or an unknown control name.
pub fn arb_broken_result(idx: usize) -> BoxedStrategy<Value> {
    let id = format!("b{idx}");
    (arb_rect_value(), 0usize..4)
        .prop_map(move |((x, y, width, height), variant)| {
            let (from_name, kind, labels) = match variant {
                0 => ("missing_control", "rectanglelabels", json!(["Planet"])),
                1 => ("tag", "labels", json!(["Star"])),
                2 => ("tag", "rectanglelabels", json!([])),
                _ => ("gone", "textarea", json!(["x"])),
            };
            let mut value = json!({"x": x, "y": y, "width": width, "height": height});
            value[kind] = labels;
            json!({
                "id": id.clone(),
                "from_name": from_name,
                "to_name": "img",
                "type": kind,
                "value": value
            })
        })
        .boxed()
}

/// A payload of well-formed and broken results, plus relations between the
/// well-formed ones.
pub fn arb_payload(max_items: usize) -> BoxedStrategy<Vec<Value>> {
    (1..=max_items)
        .prop_flat_map(|count| {
            let items: Vec<BoxedStrategy<Value>> = (0..count)
                .map(|idx| prop_oneof![3 => arb_rect_result(idx), 1 => arb_broken_result(idx)].boxed())
                .collect();
            (items, prop::collection::vec((0..count, 0..count), 0..3))
        })
        .prop_map(|(mut items, links)| {
            for (from, to) in links {
                let from_id = items[from]["id"].clone();
                let to_id = items[to]["id"].clone();
                items.push(json!({"type": "relation", "from_id": from_id, "to_id": to_id, "direction": "right"}));
            }
            items
        })
        .boxed()
}
