//! Display views over an annotation's areas.
//!
//! [`RegionStore`] borrows the area map and derives sorted lists, the
//! `parentID` forest and the label-grouped tree on demand. It holds no state
//! of its own.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use super::area::Area;
use super::ids::AreaId;
use crate::tree::ElementTree;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    /// Insertion order.
    #[default]
    Date,
    Score,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// A node of the region forest.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RegionNode<T> {
    pub id: AreaId,
    pub item: T,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RegionNode<T>>,
}

/// Areas carrying one label; `label` is `None` for the unlabeled bucket.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LabelGroup<T> {
    pub label: Option<String>,
    pub regions: Vec<T>,
}

/// Read-only projection of an area map.
pub struct RegionStore<'a> {
    areas: &'a BTreeMap<AreaId, Area>,
    tree: &'a ElementTree,
    sort: SortBy,
    order: SortOrder,
}

impl<'a> RegionStore<'a> {
    pub fn new(areas: &'a BTreeMap<AreaId, Area>, tree: &'a ElementTree) -> Self {
        Self {
            areas,
            tree,
            sort: SortBy::default(),
            order: SortOrder::default(),
        }
    }

    pub fn sorted_by(mut self, sort: SortBy, order: SortOrder) -> Self {
        self.sort = sort;
        self.order = order;
        self
    }

    /// Areas in display order. Ties keep insertion order.
    pub fn sorted_regions(&self) -> Vec<&'a Area> {
        let mut regions: Vec<&Area> = self.areas.values().collect();
        regions.sort_by_key(|a| a.seq());

        if self.sort == SortBy::Score {
            let score = |a: &Area| a.score().unwrap_or(f64::NEG_INFINITY);
            match self.order {
                SortOrder::Asc => regions.sort_by(|a, b| score(a).total_cmp(&score(b))),
                SortOrder::Desc => regions.sort_by(|a, b| score(b).total_cmp(&score(a))),
            }
        } else if self.order == SortOrder::Desc {
            regions.reverse();
        }
        regions
    }

    /// Sorted areas that are not hidden.
    pub fn visible_regions(&self) -> Vec<&'a Area> {
        self.sorted_regions()
            .into_iter()
            .filter(|a| !a.hidden)
            .collect()
    }

    /// Sorted areas of one object element.
    pub fn regions_for_object(&self, object: &str) -> Vec<&'a Area> {
        self.sorted_regions()
            .into_iter()
            .filter(|a| a.object == object)
            .collect()
    }

    /// Resolves `parent_id`, first as a full id, then as a raw id inside the
    /// area's own annotation.
    fn parent_of(&self, area: &Area) -> Option<AreaId> {
        if area.parent_id.is_empty() {
            return None;
        }
        AreaId::parse(&area.parent_id)
            .filter(|id| self.areas.contains_key(id))
            .or_else(|| {
                let id = area.id.sibling(area.parent_id.clone());
                self.areas.contains_key(&id).then_some(id)
            })
    }

    /// The `parentID` forest. Areas with no resolvable parent are roots;
    /// members of a parent cycle are emitted once, as roots.
    pub fn as_tree<T>(&self, mut enrich: impl FnMut(&Area) -> T) -> Vec<RegionNode<T>> {
        let sorted = self.sorted_regions();
        let position: HashMap<&AreaId, usize> =
            sorted.iter().enumerate().map(|(i, a)| (&a.id, i)).collect();

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); sorted.len()];
        let mut roots = Vec::new();
        for (idx, area) in sorted.iter().enumerate() {
            let parent = self
                .parent_of(area)
                .and_then(|id| position.get(&id).copied())
                .filter(|p| *p != idx);
            match parent {
                Some(p) => children[p].push(idx),
                None => roots.push(idx),
            }
        }

        let mut visited = vec![false; sorted.len()];
        let mut forest = Vec::new();
        for root in roots {
            forest.push(build_node(root, &sorted, &children, &mut visited, &mut enrich));
        }
        for idx in 0..sorted.len() {
            if !visited[idx] {
                forest.push(build_node(idx, &sorted, &children, &mut visited, &mut enrich));
            }
        }
        forest
    }

    /// Groups areas by selected label.
    ///
    /// Groups follow the label order of the configuration, then labels not
    /// declared there, then the unlabeled bucket.
    pub fn as_labels_tree<T>(&self, mut enrich: impl FnMut(&Area) -> T) -> Vec<LabelGroup<T>> {
        let mut groups: Vec<LabelGroup<T>> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for control in self.tree.controls().filter(|c| c.is_labels()) {
            for option in &control.options {
                if !index.contains_key(&option.value) {
                    index.insert(option.value.clone(), groups.len());
                    groups.push(LabelGroup {
                        label: Some(option.value.clone()),
                        regions: Vec::new(),
                    });
                }
            }
        }

        let mut unlabeled = Vec::new();
        for area in self.sorted_regions() {
            let labels: BTreeSet<&str> = area
                .selected_labels(self.tree)
                .into_iter()
                .map(|(_, label)| label)
                .collect();

            if labels.is_empty() {
                unlabeled.push(enrich(area));
                continue;
            }

            for label in labels {
                let slot = match index.get(label) {
                    Some(slot) => *slot,
                    None => {
                        index.insert(label.to_string(), groups.len());
                        groups.push(LabelGroup {
                            label: Some(label.to_string()),
                            regions: Vec::new(),
                        });
                        groups.len() - 1
                    }
                };
                groups[slot].regions.push(enrich(area));
            }
        }

        groups.retain(|g| !g.regions.is_empty());
        if !unlabeled.is_empty() {
            groups.push(LabelGroup {
                label: None,
                regions: unlabeled,
            });
        }
        groups
    }
}

fn build_node<T>(
    idx: usize,
    sorted: &[&Area],
    children: &[Vec<usize>],
    visited: &mut [bool],
    enrich: &mut impl FnMut(&Area) -> T,
) -> RegionNode<T> {
    visited[idx] = true;
    let item = enrich(sorted[idx]);
    let mut nodes = Vec::new();
    for &child in &children[idx] {
        if !visited[child] {
            nodes.push(build_node(child, sorted, children, visited, enrich));
        }
    }
    RegionNode {
        id: sorted[idx].id.clone(),
        item,
        children: nodes,
    }
}
