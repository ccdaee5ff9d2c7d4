//! Relations between areas.
//!
//! Endpoints are plain area ids. Deleting an area never touches the store;
//! relations whose endpoints are gone are skipped by every read.

use std::collections::BTreeMap;

use super::area::Area;
use super::ids::{guid, AnnotationId, AreaId};
use super::wire::{Direction, WireRelation, RELATION_TYPE};

/// A link between two areas.
#[derive(Clone, Debug, PartialEq)]
pub struct Relation {
    pub id: String,
    pub node1: AreaId,
    pub node2: AreaId,
    pub direction: Direction,
    /// `None` when the wire item had no `labels` key.
    pub labels: Option<Vec<String>>,
}

impl Relation {
    /// True if the relation joins `a` and `b`, in either order.
    pub fn connects(&self, a: &AreaId, b: &AreaId) -> bool {
        (self.node1 == *a && self.node2 == *b) || (self.node1 == *b && self.node2 == *a)
    }

    pub fn touches(&self, node: &AreaId) -> bool {
        self.node1 == *node || self.node2 == *node
    }

    /// Labels as a slice; empty when unset.
    pub fn label_values(&self) -> &[String] {
        self.labels.as_deref().unwrap_or_default()
    }

    fn is_valid(&self, areas: &BTreeMap<AreaId, Area>) -> bool {
        areas.contains_key(&self.node1) && areas.contains_key(&self.node2)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RelationStore {
    relations: Vec<Relation>,
}

impl RelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a relation unless the pair is already linked.
    ///
    /// Returns the id of the new relation; `None` for duplicates and
    /// self-links.
    pub fn add_relation(&mut self, node1: AreaId, node2: AreaId) -> Option<String> {
        if node1 == node2 || self.find_relation(&node1, &node2).is_some() {
            return None;
        }
        let id = guid();
        self.relations.push(Relation {
            id: id.clone(),
            node1,
            node2,
            direction: Direction::default(),
            labels: None,
        });
        Some(id)
    }

    /// Adds an already built relation unless its pair is already linked.
    pub fn insert(&mut self, relation: Relation) -> bool {
        if relation.node1 == relation.node2
            || self.find_relation(&relation.node1, &relation.node2).is_some()
        {
            return false;
        }
        self.relations.push(relation);
        true
    }

    /// Points every endpoint equal to `from` at `to`.
    pub fn retarget(&mut self, from: &AreaId, to: &AreaId) {
        for relation in &mut self.relations {
            if relation.node1 == *from {
                relation.node1 = to.clone();
            }
            if relation.node2 == *from {
                relation.node2 = to.clone();
            }
        }
    }

    /// Removes and returns the relations matching `pred`.
    pub fn extract(&mut self, mut pred: impl FnMut(&Relation) -> bool) -> Vec<Relation> {
        let (taken, kept): (Vec<Relation>, Vec<Relation>) =
            std::mem::take(&mut self.relations)
                .into_iter()
                .partition(|r| pred(r));
        self.relations = kept;
        taken
    }

    pub fn find_relation(&self, a: &AreaId, b: &AreaId) -> Option<&Relation> {
        self.relations.iter().find(|r| r.connects(a, b))
    }

    pub fn get(&self, id: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.id == id)
    }

    pub fn delete_relation(&mut self, id: &str) -> bool {
        let before = self.relations.len();
        self.relations.retain(|r| r.id != id);
        self.relations.len() != before
    }

    /// Removes every relation touching `node`; returns how many went.
    pub fn delete_node_relation(&mut self, node: &AreaId) -> usize {
        let before = self.relations.len();
        self.relations.retain(|r| !r.touches(node));
        before - self.relations.len()
    }

    /// Relations whose endpoints both exist in `areas`.
    pub fn relations<'a>(
        &'a self,
        areas: &'a BTreeMap<AreaId, Area>,
    ) -> impl Iterator<Item = &'a Relation> + 'a {
        self.relations.iter().filter(move |r| r.is_valid(areas))
    }

    /// Every stored relation, valid or not.
    pub fn all(&self) -> &[Relation] {
        &self.relations
    }

    /// Cycles the direction `right -> left -> bi -> right`.
    pub fn rotate_direction(&mut self, id: &str) -> Option<Direction> {
        let relation = self.relations.iter_mut().find(|r| r.id == id)?;
        relation.direction = relation.direction.rotate();
        Some(relation.direction)
    }

    pub fn set_labels(&mut self, id: &str, labels: Vec<String>) -> bool {
        match self.relations.iter_mut().find(|r| r.id == id) {
            Some(relation) => {
                relation.labels = Some(labels);
                true
            }
            None => false,
        }
    }

    pub fn serialize(&self, areas: &BTreeMap<AreaId, Area>) -> Vec<WireRelation> {
        self.relations(areas)
            .map(|r| WireRelation {
                from_id: r.node1.raw().to_string(),
                to_id: r.node2.raw().to_string(),
                kind: RELATION_TYPE.to_string(),
                direction: r.direction,
                labels: r.labels.clone(),
            })
            .collect()
    }

    /// Restores a relation from its wire form, resolving raw ids inside
    /// `annotation`.
    ///
    /// Endpoints are not checked here; an unresolved endpoint only makes the
    /// relation invisible.
    pub fn deserialize_relation(&mut self, item: &WireRelation, annotation: &AnnotationId) -> bool {
        let node1 = AreaId::new(item.from_id.clone(), annotation);
        let node2 = AreaId::new(item.to_id.clone(), annotation);
        let Some(id) = self.add_relation(node1, node2) else {
            return false;
        };
        if let Some(relation) = self.relations.iter_mut().find(|r| r.id == id) {
            relation.direction = item.direction;
            relation.labels = item.labels.clone();
        }
        true
    }

    pub fn clear(&mut self) {
        self.relations.clear();
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}
