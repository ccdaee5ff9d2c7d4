//! One labeling pass over a task.
//!
//! An [`Annotation`] owns its areas, pending suggestions, relations,
//! selection and undo history. The element tree, settings and event sink are
//! shared with the other annotations of the same task.
//!
//! Every public mutation records one history snapshot. Loading results
//! freezes the history so a whole payload lands as a single step.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;
use std::time::Instant;

use serde::Serialize;
use serde_json::{Map, Value};

use super::area::Area;
use super::ids::{guid, AnnotationId, AreaId};
use super::regions::RegionStore;
use super::relation::{Relation, RelationStore};
use super::repair::{fix_broken_annotation, prepare_value};
use super::result::AreaResult;
use super::shape::Shape;
use super::wire::{self, Direction, WireItem, WireResult};
use crate::error::LabelcraftError;
use crate::events::{AnnotationEvents, DraftSubmission};
use crate::history::TimeTraveller;
use crate::settings::Settings;
use crate::tree::{Element, ElementTree};
use crate::validation::{IssueCode, IssueContext, ValidationIssue, ValidationReport};

/// Which list an annotation belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    #[default]
    Annotation,
    Prediction,
    History,
}

/// Last persisted and last auto-saved serialized forms.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Versions {
    pub result: Option<Vec<Value>>,
    pub draft: Option<Vec<Value>>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeserializeOptions {
    /// Load into the suggestion map instead of the live areas.
    pub suggestions: bool,
    /// Mark every loaded area hidden.
    pub hidden: bool,
}

/// The state covered by undo/redo.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnnotationState {
    pub areas: BTreeMap<AreaId, Area>,
    pub relations: RelationStore,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AutosaveOutcome {
    /// Nothing changed since the last save.
    Unchanged,
    /// A save already ran inside the current delay window.
    Throttled,
    Saved,
    /// The persistence boundary failed; the model is untouched.
    Failed,
}

#[derive(Clone, Debug, Default)]
struct AutosaveState {
    saved_revision: u64,
    last_attempt: Option<Instant>,
}

pub struct Annotation {
    id: AnnotationId,
    pk: Option<String>,
    kind: AnnotationKind,
    tree: Rc<ElementTree>,
    settings: Rc<Settings>,
    events: Rc<dyn AnnotationEvents>,
    areas: BTreeMap<AreaId, Area>,
    suggestions: BTreeMap<AreaId, Area>,
    relations: RelationStore,
    /// Relations that arrived with suggestions; promoted once both
    /// endpoints are accepted.
    suggestion_relations: RelationStore,
    history: TimeTraveller<AnnotationState>,
    versions: Versions,
    control_states: BTreeMap<String, Value>,
    selection: BTreeSet<AreaId>,
    editable: bool,
    ground_truth: bool,
    draft_selected: bool,
    issues: ValidationReport,
    next_seq: u64,
    revision: u64,
    autosave: AutosaveState,
}

impl fmt::Debug for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Annotation")
            .field("id", &self.id)
            .field("pk", &self.pk)
            .field("kind", &self.kind)
            .field("areas", &self.areas.len())
            .field("suggestions", &self.suggestions.len())
            .field("relations", &self.relations.len())
            .finish()
    }
}

impl Annotation {
    pub fn new(
        kind: AnnotationKind,
        tree: Rc<ElementTree>,
        settings: Rc<Settings>,
        events: Rc<dyn AnnotationEvents>,
    ) -> Self {
        Self::with_id(AnnotationId::generate(), kind, tree, settings, events)
    }

    pub fn with_id(
        id: AnnotationId,
        kind: AnnotationKind,
        tree: Rc<ElementTree>,
        settings: Rc<Settings>,
        events: Rc<dyn AnnotationEvents>,
    ) -> Self {
        let mut history = TimeTraveller::new(settings.history_limit);
        history.attach(AnnotationState::default());

        Self {
            id,
            pk: None,
            kind,
            tree,
            settings,
            events,
            areas: BTreeMap::new(),
            suggestions: BTreeMap::new(),
            relations: RelationStore::new(),
            suggestion_relations: RelationStore::new(),
            history,
            versions: Versions::default(),
            control_states: BTreeMap::new(),
            selection: BTreeSet::new(),
            editable: kind == AnnotationKind::Annotation,
            ground_truth: false,
            draft_selected: false,
            issues: ValidationReport::new(),
            next_seq: 0,
            revision: 0,
            autosave: AutosaveState::default(),
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn id(&self) -> &AnnotationId {
        &self.id
    }

    pub fn pk(&self) -> Option<&str> {
        self.pk.as_deref()
    }

    pub fn set_pk(&mut self, pk: Option<String>) {
        self.pk = pk;
    }

    pub fn kind(&self) -> AnnotationKind {
        self.kind
    }

    pub fn tree(&self) -> &ElementTree {
        &self.tree
    }

    pub fn editable(&self) -> bool {
        self.editable
    }

    pub fn set_editable(&mut self, editable: bool) {
        self.editable = editable;
    }

    pub fn ground_truth(&self) -> bool {
        self.ground_truth
    }

    pub fn areas(&self) -> &BTreeMap<AreaId, Area> {
        &self.areas
    }

    pub fn area(&self, id: &AreaId) -> Option<&Area> {
        self.areas.get(id)
    }

    /// Looks an area up by its wire id.
    pub fn find_area(&self, raw: &str) -> Option<&Area> {
        self.areas.get(&AreaId::new(raw, &self.id))
    }

    pub fn suggestions(&self) -> &BTreeMap<AreaId, Area> {
        &self.suggestions
    }

    /// Value held by a classification control, as restored from the live
    /// areas.
    pub fn control_state(&self, control: &str) -> Option<&Value> {
        self.control_states.get(control)
    }

    /// Problems hit while loading results.
    pub fn issues(&self) -> &ValidationReport {
        &self.issues
    }

    pub fn versions(&self) -> &Versions {
        &self.versions
    }

    /// True while the live areas show the draft baseline.
    pub fn draft_selected(&self) -> bool {
        self.draft_selected
    }

    /// Display views over the live areas.
    pub fn regions(&self) -> RegionStore<'_> {
        RegionStore::new(&self.areas, &self.tree)
    }

    /// Current undoable state.
    pub fn state(&self) -> AnnotationState {
        AnnotationState {
            areas: self.areas.clone(),
            relations: self.relations.clone(),
        }
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Records a mutation.
    fn changed(&mut self) {
        self.sync_control_states();
        self.revision += 1;
        let state = self.state();
        self.history.record_now(state);
    }

    /// Ends a frozen batch as a single history step.
    fn commit_batch(&mut self) {
        self.sync_control_states();
        self.revision += 1;
        let state = self.state();
        self.history.unfreeze(state);
    }

    // ------------------------------------------------------------------
    // Area and result lifecycle
    // ------------------------------------------------------------------

    /// Creates a new area holding one result of `control` on `object`.
    pub fn create_result(
        &mut self,
        shape: Shape,
        value: Map<String, Value>,
        control: &str,
        object: &str,
    ) -> Result<AreaId, LabelcraftError> {
        let tree = Rc::clone(&self.tree);
        let control_el = result_control(&tree, control)?;
        let object_el = object_element(&tree, object)?;
        if !control_el.targets(&object_el.name) {
            return Err(LabelcraftError::ElementKindMismatch {
                name: control.to_string(),
                expected: "bound to that object",
            });
        }
        let result_type = control_el.result_type.clone().unwrap_or_default();

        let id = AreaId::generate(&self.id);
        let seq = self.next_seq();
        let mut area = Area::new(id.clone(), object_el.name.clone(), shape, seq);
        area.classification = control_el.classification && area.shape.is_none();
        area.results
            .push(AreaResult::new(control, object, result_type, value));
        let classification = area.classification;
        self.areas.insert(id.clone(), area);

        if !classification {
            self.events.entity_created(&self.id, &id);
            if self.settings.select_after_create {
                self.selection.clear();
                self.selection.insert(id.clone());
                self.notify_selection();
            }
        }

        self.clean_classification_areas();
        self.changed();
        Ok(id)
    }

    /// Attaches a result of `control` to an existing area, replacing the
    /// value if the control already has one there.
    pub fn add_result(
        &mut self,
        area_id: &AreaId,
        control: &str,
        value: Map<String, Value>,
    ) -> Result<(), LabelcraftError> {
        let tree = Rc::clone(&self.tree);
        let control_el = result_control(&tree, control)?;
        let area = self
            .areas
            .get_mut(area_id)
            .ok_or_else(|| unknown_area(area_id))?;
        if !control_el.targets(&area.object) {
            return Err(LabelcraftError::ElementKindMismatch {
                name: control.to_string(),
                expected: "bound to the area's object",
            });
        }

        match area.result_for_mut(control) {
            Some(result) => result.value = value,
            None => area.results.push(AreaResult::new(
                control,
                area.object.clone(),
                control_el.result_type.clone().unwrap_or_default(),
                value,
            )),
        }
        self.changed();
        Ok(())
    }

    pub fn update_shape(&mut self, area_id: &AreaId, shape: Shape) -> Result<(), LabelcraftError> {
        self.area_mut(area_id)?.shape = shape;
        self.changed();
        Ok(())
    }

    pub fn update_result_value(
        &mut self,
        area_id: &AreaId,
        control: &str,
        value: Map<String, Value>,
    ) -> Result<(), LabelcraftError> {
        let area = self.area_mut(area_id)?;
        let result = area
            .result_for_mut(control)
            .ok_or_else(|| LabelcraftError::UnknownElement {
                name: control.to_string(),
            })?;
        result.value = value;
        self.changed();
        Ok(())
    }

    /// Nests the area under `parent` (a raw id); an empty string un-nests.
    pub fn set_parent(&mut self, area_id: &AreaId, parent: &str) -> Result<(), LabelcraftError> {
        self.area_mut(area_id)?.parent_id = parent.to_string();
        self.changed();
        Ok(())
    }

    pub fn set_readonly(&mut self, area_id: &AreaId, readonly: bool) -> Result<(), LabelcraftError> {
        self.area_mut(area_id)?.readonly = readonly;
        self.changed();
        Ok(())
    }

    pub fn set_hidden(&mut self, area_id: &AreaId, hidden: bool) -> Result<(), LabelcraftError> {
        self.area_mut(area_id)?.hidden = hidden;
        self.changed();
        Ok(())
    }

    fn area_mut(&mut self, area_id: &AreaId) -> Result<&mut Area, LabelcraftError> {
        self.areas
            .get_mut(area_id)
            .ok_or_else(|| unknown_area(area_id))
    }

    /// Removes an area. Relations pointing at it are left in place and
    /// disappear from reads.
    pub fn delete_area(&mut self, area_id: &AreaId) -> Result<Area, LabelcraftError> {
        let area = self
            .areas
            .remove(area_id)
            .ok_or_else(|| unknown_area(area_id))?;
        if self.selection.remove(area_id) {
            self.notify_selection();
        }
        self.events.entity_deleted(&self.id, area_id);
        self.changed();
        Ok(area)
    }

    pub fn delete_all_areas(&mut self) {
        let ids: Vec<AreaId> = self.areas.keys().cloned().collect();
        self.clear_areas();
        for id in &ids {
            self.events.entity_deleted(&self.id, id);
        }
        self.changed();
    }

    fn clear_areas(&mut self) {
        self.areas.clear();
        self.relations.clear();
        if !self.selection.is_empty() {
            self.selection.clear();
            self.notify_selection();
        }
    }

    /// Keeps only the newest classification area per control.
    ///
    /// Returns how many areas were removed.
    pub fn clean_classification_areas(&mut self) -> usize {
        let mut newest: BTreeMap<&str, (u64, &AreaId)> = BTreeMap::new();
        for area in self.areas.values().filter(|a| a.classification) {
            let Some(control) = area.control() else {
                continue;
            };
            let replace = newest
                .get(control)
                .map(|(seq, _)| area.seq() > *seq)
                .unwrap_or(true);
            if replace {
                newest.insert(control, (area.seq(), &area.id));
            }
        }

        let stale: Vec<AreaId> = self
            .areas
            .values()
            .filter(|a| a.classification)
            .filter(|a| {
                a.control()
                    .and_then(|c| newest.get(c))
                    .map(|(_, keep)| *keep != &a.id)
                    .unwrap_or(false)
            })
            .map(|a| a.id.clone())
            .collect();

        for id in &stale {
            self.areas.remove(id);
            self.selection.remove(id);
        }
        if !stale.is_empty() {
            self.sync_control_states();
            tracing::debug!(annotation = %self.id, removed = stale.len(), "removed duplicate classification areas");
        }
        stale.len()
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Wire items: results in area order, then valid relations.
    pub fn serialize(&self) -> Vec<WireItem> {
        let mut areas: Vec<&Area> = self.areas.values().collect();
        areas.sort_by_key(|a| a.seq());

        let mut items = Vec::new();
        for area in areas {
            for result in area.results.iter().filter(|r| self.keep_result(r)) {
                items.push(WireItem::Result(area.to_wire(result)));
            }
        }
        items.extend(
            self.relations
                .serialize(&self.areas)
                .into_iter()
                .map(WireItem::Relation),
        );
        items
    }

    /// [`Annotation::serialize`] as JSON values.
    pub fn serialize_values(&self) -> Result<Vec<Value>, LabelcraftError> {
        self.serialize()
            .iter()
            .map(|item| serde_json::to_value(item).map_err(LabelcraftError::from))
            .collect()
    }

    fn keep_result(&self, result: &AreaResult) -> bool {
        if self.settings.keep_empty_results {
            return true;
        }
        let Some(control) = self.tree.get(&result.from_name) else {
            return true;
        };
        if !(control.classification || control.is_labels()) || control.allow_empty() {
            return true;
        }
        let key = control.payload_key().unwrap_or(result.result_type.as_str());
        !result.is_empty_payload(key)
    }

    /// Loads a wire payload into the live areas or the suggestions.
    ///
    /// Failures are logged and recorded in [`Annotation::issues`]; whatever
    /// was applied before the failure stays. Returns false on failure.
    pub fn deserialize_results(&mut self, raw: &Value, options: DeserializeOptions) -> bool {
        self.history.freeze();
        let outcome = wire::parse_items(raw).and_then(|items| self.apply_items(items, options));
        self.finish_load(outcome)
    }

    /// Like [`Annotation::deserialize_results`] for already parsed items.
    pub fn load_items(&mut self, items: Vec<WireItem>, options: DeserializeOptions) -> bool {
        self.history.freeze();
        let outcome = self.apply_items(items, options);
        self.finish_load(outcome)
    }

    fn finish_load(&mut self, outcome: Result<usize, LabelcraftError>) -> bool {
        let ok = match outcome {
            Ok(count) => {
                tracing::debug!(annotation = %self.id, results = count, "loaded results");
                true
            }
            Err(err) => {
                tracing::error!(annotation = %self.id, error = %err, "failed to load results");
                self.issues.add(ValidationIssue::error(
                    IssueCode::General,
                    err.to_string(),
                    IssueContext::Annotation {
                        id: self.id.to_string(),
                    },
                ));
                false
            }
        };
        self.commit_batch();
        ok
    }

    fn apply_items(
        &mut self,
        items: Vec<WireItem>,
        options: DeserializeOptions,
    ) -> Result<usize, LabelcraftError> {
        let tree = Rc::clone(&self.tree);
        let items = fix_broken_annotation(items, &tree);

        let mut relations = Vec::new();
        let mut count = 0;
        for item in items {
            match item {
                WireItem::Result(result) => {
                    self.apply_result(&tree, result, options)?;
                    count += 1;
                }
                WireItem::Relation(relation) => relations.push(relation),
            }
        }

        if !options.suggestions {
            self.sync_control_states();
        }

        // Both endpoints exist by now.
        let store = if options.suggestions {
            &mut self.suggestion_relations
        } else {
            &mut self.relations
        };
        for relation in &relations {
            store.deserialize_relation(relation, &self.id);
        }
        Ok(count)
    }

    fn apply_result(
        &mut self,
        tree: &ElementTree,
        item: WireResult,
        options: DeserializeOptions,
    ) -> Result<(), LabelcraftError> {
        let object = object_element(tree, &item.to_name)?;
        let control = tree
            .get(&item.from_name)
            .filter(|e| e.is_control())
            .ok_or_else(|| LabelcraftError::ElementKindMismatch {
                name: item.from_name.clone(),
                expected: "a control",
            })?;

        let raw_id = item
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(guid);
        let area_id = AreaId::new(raw_id, &self.id);

        let mut value = item.value.clone();
        let payload_key = control
            .payload_key()
            .unwrap_or(item.result_type.as_str())
            .to_string();
        let mut payload = Map::new();
        if let Some(found) = value.remove(&payload_key) {
            payload.insert(payload_key, found);
        }
        let result = AreaResult::from_wire(&item, payload);

        let seq = self.next_seq();
        let target = if options.suggestions {
            &mut self.suggestions
        } else {
            &mut self.areas
        };

        if let Some(area) = target.get_mut(&area_id) {
            area.shape.fill_missing(&value, &object.element_type);
            area.classification &= area.shape.is_none();
            if area.parent_id.is_empty() {
                area.parent_id = item.parent_id.clone().unwrap_or_default();
            }
            area.readonly |= item.readonly.unwrap_or(false);
            area.hidden |= item.hidden.unwrap_or(false);
            area.results.push(result);
            return Ok(());
        }

        let promoted = prepare_value(&mut value, &object.element_type);
        let mut shape = Shape::from_map(&value, &object.element_type);
        if promoted {
            shape.mark_promoted();
        }

        let mut area = Area::new(area_id.clone(), object.name.clone(), shape, seq);
        area.classification = control.classification && area.shape.is_none();
        area.parent_id = item.parent_id.clone().unwrap_or_default();
        area.readonly = item.readonly.unwrap_or(false);
        area.hidden = options.hidden || item.hidden.unwrap_or(false);
        area.from_suggestion = options.suggestions;
        area.results.push(result);
        target.insert(area_id, area);
        Ok(())
    }

    /// Rebuilds the classification control values from the live areas.
    fn sync_control_states(&mut self) {
        self.control_states.clear();
        for area in self.areas.values().filter(|a| a.classification) {
            for result in &area.results {
                let Some(control) = self.tree.get(&result.from_name) else {
                    continue;
                };
                let key = control.payload_key().unwrap_or(result.result_type.as_str());
                if let Some(payload) = result.value.get(key) {
                    self.control_states
                        .insert(result.from_name.clone(), payload.clone());
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Suggestions
    // ------------------------------------------------------------------

    /// Copies a suggestion into the live areas and drops it from the
    /// suggestion map.
    pub fn accept_suggestion(&mut self, id: &AreaId) -> Result<AreaId, LabelcraftError> {
        let area = self
            .suggestions
            .remove(id)
            .ok_or_else(|| unknown_area(id))?;
        let accepted = self.accept_area(area);
        self.promote_suggestion_relations();
        self.clean_classification_areas();
        self.changed();
        Ok(accepted)
    }

    pub fn reject_suggestion(&mut self, id: &AreaId) -> Result<Area, LabelcraftError> {
        let area = self
            .suggestions
            .remove(id)
            .ok_or_else(|| unknown_area(id))?;
        self.suggestion_relations.delete_node_relation(id);
        Ok(area)
    }

    /// Accepts every pending suggestion as one history step.
    pub fn accept_all_suggestions(&mut self) -> usize {
        let mut pending: Vec<Area> = std::mem::take(&mut self.suggestions).into_values().collect();
        pending.sort_by_key(|a| a.seq());
        let count = pending.len();

        self.history.freeze();
        for area in pending {
            self.accept_area(area);
        }
        self.promote_suggestion_relations();
        self.clean_classification_areas();
        self.commit_batch();
        count
    }

    /// Moves a suggestion into the live areas. A suggestion whose id is
    /// already taken by a live area gets a fresh id.
    fn accept_area(&mut self, mut area: Area) -> AreaId {
        let original = area.id.clone();
        if self.areas.contains_key(&original) {
            area.id = AreaId::generate(&self.id);
            tracing::debug!(
                annotation = %self.id,
                suggestion = %original,
                accepted = %area.id,
                "suggestion id already in use"
            );
        }
        area.from_suggestion = true;
        area.hidden = false;
        area.seq = self.next_seq();

        let id = area.id.clone();
        self.areas.insert(id.clone(), area);
        self.suggestion_relations.retarget(&original, &id);
        id
    }

    /// Moves suggested relations whose endpoints are both accepted into the
    /// live relations.
    fn promote_suggestion_relations(&mut self) {
        let areas = &self.areas;
        let pending = &self.suggestions;
        let ready = self.suggestion_relations.extract(|r| {
            [&r.node1, &r.node2]
                .iter()
                .all(|node| areas.contains_key(node) && !pending.contains_key(node))
        });
        for relation in ready {
            self.relations.insert(relation);
        }
    }

    // ------------------------------------------------------------------
    // Drafts and versions
    // ------------------------------------------------------------------

    /// Records persisted baselines; `None` fields keep the current value.
    pub fn add_versions(&mut self, versions: Versions) {
        if versions.result.is_some() {
            self.versions.result = versions.result;
        }
        if versions.draft.is_some() {
            self.versions.draft = versions.draft;
        }
    }

    /// Switches the live areas between the draft and the result baselines by
    /// clearing and reloading. Returns false when there is no draft.
    pub fn toggle_draft(&mut self) -> bool {
        if self.versions.draft.is_none() {
            return false;
        }
        self.draft_selected = !self.draft_selected;
        let baseline = if self.draft_selected {
            self.versions.draft.clone()
        } else {
            self.versions.result.clone()
        }
        .unwrap_or_default();

        self.clear_areas();
        self.deserialize_results(&Value::Array(baseline), DeserializeOptions::default());
        self.reset_history();
        true
    }

    /// Serializes and submits a draft, at most once per autosave window and
    /// only after a change. Failures are logged and swallowed.
    pub fn autosave(&mut self, now: Instant) -> AutosaveOutcome {
        if self.autosave.saved_revision == self.revision {
            return AutosaveOutcome::Unchanged;
        }
        if let Some(last) = self.autosave.last_attempt {
            if now.saturating_duration_since(last) < self.settings.autosave_delay() {
                return AutosaveOutcome::Throttled;
            }
        }
        self.autosave.last_attempt = Some(now);

        let result = match self.serialize_values() {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(annotation = %self.id, error = %err, "autosave serialization failed");
                return AutosaveOutcome::Failed;
            }
        };
        let draft = DraftSubmission {
            annotation: self.id.clone(),
            pk: self.pk.clone(),
            result,
        };

        match self.events.submit_draft(&draft) {
            Ok(()) => {
                tracing::debug!(annotation = %self.id, results = draft.result.len(), "draft saved");
                self.versions.draft = Some(draft.result);
                self.autosave.saved_revision = self.revision;
                AutosaveOutcome::Saved
            }
            Err(err) => {
                tracing::warn!(annotation = %self.id, error = %err, "autosave failed");
                AutosaveOutcome::Failed
            }
        }
    }

    // ------------------------------------------------------------------
    // Selection and flags
    // ------------------------------------------------------------------

    /// Selects only `id`.
    pub fn select_area(&mut self, id: &AreaId) -> Result<(), LabelcraftError> {
        if !self.areas.contains_key(id) {
            return Err(unknown_area(id));
        }
        self.selection.clear();
        self.selection.insert(id.clone());
        self.notify_selection();
        Ok(())
    }

    /// Adds or removes `id` from the selection; returns whether it is now
    /// selected.
    pub fn toggle_selection(&mut self, id: &AreaId) -> Result<bool, LabelcraftError> {
        if !self.areas.contains_key(id) {
            return Err(unknown_area(id));
        }
        let selected = if self.selection.remove(id) {
            false
        } else {
            self.selection.insert(id.clone());
            true
        };
        self.notify_selection();
        Ok(selected)
    }

    pub fn unselect_all(&mut self) {
        if self.selection.is_empty() {
            return;
        }
        self.selection.clear();
        self.notify_selection();
    }

    pub fn selected(&self) -> impl Iterator<Item = &AreaId> {
        self.selection.iter()
    }

    pub fn is_selected(&self, id: &AreaId) -> bool {
        self.selection.contains(id)
    }

    fn notify_selection(&self) {
        let selected: Vec<AreaId> = self.selection.iter().cloned().collect();
        self.events.selection_changed(&self.id, &selected);
    }

    pub fn set_ground_truth(&mut self, value: bool) {
        self.ground_truth = value;
        self.events.ground_truth(&self.id, value);
    }

    // ------------------------------------------------------------------
    // Relations
    // ------------------------------------------------------------------

    /// Links two live areas. Returns the new relation id, or `None` if they
    /// are already linked.
    pub fn add_relation(
        &mut self,
        from: &AreaId,
        to: &AreaId,
    ) -> Result<Option<String>, LabelcraftError> {
        for id in [from, to] {
            if !self.areas.contains_key(id) {
                return Err(unknown_area(id));
            }
        }
        let created = self.relations.add_relation(from.clone(), to.clone());
        if created.is_some() {
            self.changed();
        }
        Ok(created)
    }

    pub fn delete_relation(&mut self, id: &str) -> bool {
        let deleted = self.relations.delete_relation(id);
        if deleted {
            self.changed();
        }
        deleted
    }

    pub fn delete_node_relation(&mut self, area: &AreaId) -> usize {
        let deleted = self.relations.delete_node_relation(area);
        if deleted > 0 {
            self.changed();
        }
        deleted
    }

    pub fn rotate_relation(&mut self, id: &str) -> Option<Direction> {
        let direction = self.relations.rotate_direction(id)?;
        self.changed();
        Some(direction)
    }

    /// Sets relation labels, keeping only those declared by the `Relations`
    /// control.
    pub fn set_relation_labels(&mut self, id: &str, labels: Vec<String>) -> bool {
        let allowed: Vec<String> = match self.tree.relations_control() {
            Some(control) => labels
                .into_iter()
                .filter(|label| control.find_label(label).is_some())
                .collect(),
            None => Vec::new(),
        };
        let updated = self.relations.set_labels(id, allowed);
        if updated {
            self.changed();
        }
        updated
    }

    /// Relations whose endpoints both exist.
    pub fn relations(&self) -> Vec<&Relation> {
        self.relations.relations(&self.areas).collect()
    }

    pub fn relation_store(&self) -> &RelationStore {
        &self.relations
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(state) => {
                self.apply_state(state);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(state) => {
                self.apply_state(state);
                true
            }
            None => false,
        }
    }

    /// Returns to the state captured when the history was attached.
    pub fn reset(&mut self) -> bool {
        match self.history.reset() {
            Some(state) => {
                self.apply_state(state);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history(&self) -> &TimeTraveller<AnnotationState> {
        &self.history
    }

    /// Restarts the history from the current state; it becomes the `reset`
    /// target and the autosave baseline.
    pub fn reset_history(&mut self) {
        self.history = TimeTraveller::new(self.settings.history_limit);
        self.history.attach(self.state());
        self.autosave.saved_revision = self.revision;
    }

    fn apply_state(&mut self, state: AnnotationState) {
        self.areas = state.areas;
        self.relations = state.relations;
        let before = self.selection.len();
        let areas = &self.areas;
        self.selection.retain(|id| areas.contains_key(id));
        if self.selection.len() != before {
            self.notify_selection();
        }
        self.changed();
    }
}

fn result_control<'t>(tree: &'t ElementTree, name: &str) -> Result<&'t Element, LabelcraftError> {
    let element = tree
        .get(name)
        .ok_or_else(|| LabelcraftError::UnknownElement {
            name: name.to_string(),
        })?;
    if !element.is_control() || element.result_type.is_none() {
        return Err(LabelcraftError::ElementKindMismatch {
            name: name.to_string(),
            expected: "a result-producing control",
        });
    }
    Ok(element)
}

fn object_element<'t>(tree: &'t ElementTree, name: &str) -> Result<&'t Element, LabelcraftError> {
    let element = tree
        .get(name)
        .ok_or_else(|| LabelcraftError::UnknownElement {
            name: name.to_string(),
        })?;
    if !element.is_object() {
        return Err(LabelcraftError::ElementKindMismatch {
            name: name.to_string(),
            expected: "an object",
        });
    }
    Ok(element)
}

fn unknown_area(id: &AreaId) -> LabelcraftError {
    LabelcraftError::UnknownArea { id: id.to_string() }
}
