//! Annotation model.
//!
//! An annotation is a set of [`Area`]s, each carrying one or more
//! [`AreaResult`]s, plus a [`RelationStore`] linking areas. The wire format
//! lives in [`wire`]; [`repair`] upgrades legacy payloads before they are
//! loaded.

mod annotation;
mod area;
mod ids;
mod regions;
mod relation;
pub mod repair;
mod result;
pub mod shape;
pub mod wire;

pub use annotation::{
    Annotation, AnnotationKind, AnnotationState, AutosaveOutcome, DeserializeOptions, Versions,
};
pub use area::Area;
pub use ids::{guid, AnnotationId, AreaId};
pub use regions::{LabelGroup, RegionNode, RegionStore, SortBy, SortOrder};
pub use relation::{Relation, RelationStore};
pub use result::AreaResult;
pub use shape::{Shape, ShapeKind};
pub use wire::{Direction, WireItem, WireRelation, WireResult};
