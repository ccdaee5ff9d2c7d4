//! Notification sink and persistence boundary.
//!
//! Annotations report lifecycle changes through [`AnnotationEvents`]. Every
//! method has a no-op default, so a host implements only what it needs.
//! [`EventLog`] records everything it receives.

use std::cell::{Cell, RefCell};

use serde_json::Value;

use crate::error::LabelcraftError;
use crate::model::{AnnotationId, AreaId};

/// A serialized draft handed to the host for persistence.
#[derive(Clone, Debug, PartialEq)]
pub struct DraftSubmission {
    pub annotation: AnnotationId,
    pub pk: Option<String>,
    pub result: Vec<Value>,
}

/// Callbacks fired by annotations. All are fire-and-forget except
/// [`AnnotationEvents::submit_draft`], whose failure is logged by the caller.
pub trait AnnotationEvents {
    fn entity_created(&self, _annotation: &AnnotationId, _area: &AreaId) {}

    fn entity_deleted(&self, _annotation: &AnnotationId, _area: &AreaId) {}

    fn selection_changed(&self, _annotation: &AnnotationId, _selected: &[AreaId]) {}

    fn annotation_selected(&self, _annotation: &AnnotationId) {}

    fn ground_truth(&self, _annotation: &AnnotationId, _value: bool) {}

    fn submit_draft(&self, _draft: &DraftSubmission) -> Result<(), LabelcraftError> {
        Ok(())
    }
}

/// Ignores every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopEvents;

impl AnnotationEvents for NoopEvents {}

/// A notification received by [`EventLog`].
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    EntityCreated(AreaId),
    EntityDeleted(AreaId),
    SelectionChanged(Vec<AreaId>),
    AnnotationSelected(AnnotationId),
    GroundTruth(AnnotationId, bool),
    DraftSubmitted(DraftSubmission),
}

/// Records notifications in order. Draft submissions can be set to fail.
#[derive(Debug, Default)]
pub struct EventLog {
    events: RefCell<Vec<Event>>,
    fail_drafts: Cell<bool>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent draft submissions fail.
    pub fn fail_drafts(&self, fail: bool) {
        self.fail_drafts.set(fail);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    /// Submitted drafts, oldest first.
    pub fn drafts(&self) -> Vec<DraftSubmission> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::DraftSubmitted(draft) => Some(draft.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    fn push(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }
}

impl AnnotationEvents for EventLog {
    fn entity_created(&self, _annotation: &AnnotationId, area: &AreaId) {
        self.push(Event::EntityCreated(area.clone()));
    }

    fn entity_deleted(&self, _annotation: &AnnotationId, area: &AreaId) {
        self.push(Event::EntityDeleted(area.clone()));
    }

    fn selection_changed(&self, _annotation: &AnnotationId, selected: &[AreaId]) {
        self.push(Event::SelectionChanged(selected.to_vec()));
    }

    fn annotation_selected(&self, annotation: &AnnotationId) {
        self.push(Event::AnnotationSelected(annotation.clone()));
    }

    fn ground_truth(&self, annotation: &AnnotationId, value: bool) {
        self.push(Event::GroundTruth(annotation.clone(), value));
    }

    fn submit_draft(&self, draft: &DraftSubmission) -> Result<(), LabelcraftError> {
        if self.fail_drafts.get() {
            return Err(LabelcraftError::DraftSubmit {
                message: "persistence unavailable".to_string(),
            });
        }
        self.push(Event::DraftSubmitted(draft.clone()));
        Ok(())
    }
}
