//! Annotations, predictions and history items of one task.
//!
//! [`AnnotationStore`] owns the compiled [`ElementTree`] and hands it, with
//! the session [`Settings`] and event sink, to every annotation it creates.

use std::rc::Rc;

use serde_json::Value;

use crate::config::ElementRegistry;
use crate::error::LabelcraftError;
use crate::events::{AnnotationEvents, NoopEvents};
use crate::model::{Annotation, AnnotationId, AnnotationKind, DeserializeOptions};
use crate::settings::Settings;
use crate::tree::ElementTree;
use crate::validation::ValidationReport;

pub struct AnnotationStore {
    tree: Rc<ElementTree>,
    settings: Rc<Settings>,
    events: Rc<dyn AnnotationEvents>,
    annotations: Vec<Annotation>,
    predictions: Vec<Annotation>,
    history: Vec<Annotation>,
    selected: Option<AnnotationId>,
}

impl AnnotationStore {
    /// Compiles `config` against `task` and starts an empty store.
    pub fn new(
        config: &str,
        task: Option<&Value>,
        registry: &ElementRegistry,
        settings: Settings,
        events: Rc<dyn AnnotationEvents>,
    ) -> Result<Self, LabelcraftError> {
        let tree = ElementTree::compile_with(config, task, registry, &settings.compile_options())?;
        Ok(Self::from_tree(tree, settings, events))
    }

    /// [`AnnotationStore::new`] with the standard registry, default settings
    /// and no event sink.
    pub fn with_defaults(config: &str, task: Option<&Value>) -> Result<Self, LabelcraftError> {
        Self::new(
            config,
            task,
            &ElementRegistry::standard(),
            Settings::default(),
            Rc::new(NoopEvents),
        )
    }

    pub fn from_tree(tree: ElementTree, settings: Settings, events: Rc<dyn AnnotationEvents>) -> Self {
        Self {
            tree: Rc::new(tree),
            settings: Rc::new(settings),
            events,
            annotations: Vec::new(),
            predictions: Vec::new(),
            history: Vec::new(),
            selected: None,
        }
    }

    pub fn tree(&self) -> &ElementTree {
        &self.tree
    }

    /// Configuration problems found while compiling.
    pub fn report(&self) -> &ValidationReport {
        self.tree.report()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn build(&self, kind: AnnotationKind) -> Annotation {
        Annotation::new(
            kind,
            Rc::clone(&self.tree),
            Rc::clone(&self.settings),
            Rc::clone(&self.events),
        )
    }

    /// Creates an empty annotation and returns its id.
    pub fn create_annotation(&mut self) -> AnnotationId {
        let annotation = self.build(AnnotationKind::Annotation);
        let id = annotation.id().clone();
        self.annotations.push(annotation);
        id
    }

    /// Adds an annotation loaded from a stored `result` payload.
    ///
    /// Load problems are kept in the annotation's issues; the annotation is
    /// added either way.
    pub fn add_annotation(&mut self, results: &Value, pk: Option<String>) -> AnnotationId {
        let annotation = self.load(AnnotationKind::Annotation, results, pk);
        let id = annotation.id().clone();
        self.annotations.push(annotation);
        id
    }

    pub fn add_prediction(&mut self, results: &Value, pk: Option<String>) -> AnnotationId {
        let annotation = self.load(AnnotationKind::Prediction, results, pk);
        let id = annotation.id().clone();
        self.predictions.push(annotation);
        id
    }

    pub fn add_history_item(&mut self, results: &Value, pk: Option<String>) -> AnnotationId {
        let annotation = self.load(AnnotationKind::History, results, pk);
        let id = annotation.id().clone();
        self.history.push(annotation);
        id
    }

    fn load(&self, kind: AnnotationKind, results: &Value, pk: Option<String>) -> Annotation {
        let mut annotation = self.build(kind);
        annotation.set_pk(pk);
        annotation.deserialize_results(results, DeserializeOptions::default());
        annotation.reset_history();
        annotation
    }

    /// Copies a prediction into a new editable annotation.
    pub fn annotation_from_prediction(
        &mut self,
        prediction: &AnnotationId,
    ) -> Result<AnnotationId, LabelcraftError> {
        let source = self
            .predictions
            .iter()
            .find(|p| p.id() == prediction)
            .ok_or_else(|| LabelcraftError::UnknownAnnotation {
                id: prediction.to_string(),
            })?;
        let items = source.serialize();

        let mut annotation = self.build(AnnotationKind::Annotation);
        annotation.load_items(items, DeserializeOptions::default());
        annotation.reset_history();
        let id = annotation.id().clone();
        self.annotations.push(annotation);
        Ok(id)
    }

    /// Removes an annotation, prediction or history item.
    pub fn delete_annotation(&mut self, id: &AnnotationId) -> Result<Annotation, LabelcraftError> {
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        for list in [&mut self.annotations, &mut self.predictions, &mut self.history] {
            if let Some(pos) = list.iter().position(|a| a.id() == id) {
                return Ok(list.remove(pos));
            }
        }
        Err(LabelcraftError::UnknownAnnotation { id: id.to_string() })
    }

    /// Makes `id` the selected annotation, clearing the area selection of
    /// the previous one.
    pub fn select_annotation(&mut self, id: &AnnotationId) -> Result<(), LabelcraftError> {
        if self.annotation(id).is_none() {
            return Err(LabelcraftError::UnknownAnnotation { id: id.to_string() });
        }
        if let Some(previous) = self.selected.take() {
            if let Some(annotation) = self.annotation_mut(&previous) {
                annotation.unselect_all();
            }
        }
        self.selected = Some(id.clone());
        self.events.annotation_selected(id);
        tracing::debug!(annotation = %id, "selected annotation");
        Ok(())
    }

    pub fn selected(&self) -> Option<&Annotation> {
        self.selected.as_ref().and_then(|id| self.annotation(id))
    }

    pub fn selected_mut(&mut self) -> Option<&mut Annotation> {
        let id = self.selected.clone()?;
        self.annotation_mut(&id)
    }

    /// Looks an id up across annotations, predictions and history items.
    pub fn annotation(&self, id: &AnnotationId) -> Option<&Annotation> {
        self.annotations
            .iter()
            .chain(&self.predictions)
            .chain(&self.history)
            .find(|a| a.id() == id)
    }

    pub fn annotation_mut(&mut self, id: &AnnotationId) -> Option<&mut Annotation> {
        self.annotations
            .iter_mut()
            .chain(self.predictions.iter_mut())
            .chain(self.history.iter_mut())
            .find(|a| a.id() == id)
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn predictions(&self) -> &[Annotation] {
        &self.predictions
    }

    pub fn history(&self) -> &[Annotation] {
        &self.history
    }
}
