//! Fuzz target for result deserialization.
//!
//! Arbitrary bytes are parsed as JSON and loaded into an annotation of a
//! fixed configuration, then serialized again.

#![no_main]

use std::rc::Rc;

use labelcraft::config::ElementRegistry;
use labelcraft::events::NoopEvents;
use labelcraft::model::wire::from_results_slice;
use labelcraft::model::{Annotation, AnnotationKind, DeserializeOptions};
use labelcraft::settings::Settings;
use labelcraft::tree::ElementTree;
use libfuzzer_sys::fuzz_target;

const CONFIG: &str = r#"<View>
  <Image name="img" value="$image"/>
  <RectangleLabels name="tag" toName="img"><Label value="A"/><Label value="B"/></RectangleLabels>
  <Rectangle name="box" toName="img"/>
  <Text name="txt" value="$text"/>
  <Labels name="ner" toName="txt"><Label value="PER"/></Labels>
  <Choices name="cls" toName="txt"><Choice value="yes"/></Choices>
  <Relations><Relation value="rel"/></Relations>
</View>"#;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }
    let Ok(raw) = from_results_slice(data) else {
        return;
    };
    let Ok(tree) = ElementTree::compile(CONFIG, None, &ElementRegistry::standard()) else {
        return;
    };

    let mut ann = Annotation::new(
        AnnotationKind::Annotation,
        Rc::new(tree),
        Rc::new(Settings::default()),
        Rc::new(NoopEvents),
    );
    ann.deserialize_results(&raw, DeserializeOptions::default());
    let _ = ann.serialize_values();
});
