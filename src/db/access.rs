//! Primitive operations every partial graph serves.
//!
//! High-level algorithms (sequence maintenance, cascading deletes, views)
//! run at the caller and are composed from these primitives only, each one
//! addressed by id to the partial graph that owns it. A host therefore never
//! calls back into its caller while serving a request.

use serde::{Deserialize, Serialize};

use super::graph_data::{GraphData, GraphDataUpdate, GraphKind};
use crate::storage::{AttrValue, ElementInfo, ElementKind, IncidenceInfo};
use crate::types::{GlobalId, LocalId, PartialGraphId, Result, Sigma, SubgraphId, TypeId};

/// Link fields of a vertex or edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementLink {
    /// Next element in the global sequence.
    Next,
    /// Previous element in the global sequence.
    Prev,
    /// Head of the lambda sequence.
    FirstIncidence,
    /// Tail of the lambda sequence.
    LastIncidence,
    /// Owned subordinate graph.
    SubordinateGraph,
}

/// Link fields of an incidence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidenceLink {
    /// Next incidence at the vertex.
    NextAtVertex,
    /// Previous incidence at the vertex.
    PrevAtVertex,
    /// Next incidence at the edge.
    NextAtEdge,
    /// Previous incidence at the edge.
    PrevAtEdge,
}

/// Primitive surface of one partial graph, served locally by
/// [`crate::db::LocalStore`] and remotely by [`crate::db::RemoteStore`].
pub trait PartialGraphAccess: Send + Sync {
    /// Id of the served partial graph.
    fn partial_graph_id(&self) -> PartialGraphId;

    /// Creates an unlinked vertex or edge and returns its global id.
    fn create_element(
        &self,
        kind: ElementKind,
        ty: TypeId,
        local: Option<LocalId>,
        sigma: Sigma,
        kappa: i32,
    ) -> Result<GlobalId>;

    /// Evicts an element and frees its id. Links are not touched.
    fn remove_element(&self, kind: ElementKind, id: GlobalId) -> Result<()>;

    /// Returns true when the element is live.
    fn contains_element(&self, kind: ElementKind, id: GlobalId) -> Result<bool>;

    /// Scalar snapshot of an element.
    fn element_info(&self, kind: ElementKind, id: GlobalId) -> Result<ElementInfo>;

    /// Rewrites one link field of an element.
    fn set_element_link(
        &self,
        kind: ElementKind,
        id: GlobalId,
        link: ElementLink,
        value: GlobalId,
    ) -> Result<()>;

    /// Bumps an element's lambda sequence version and returns the new value.
    fn bump_incidence_list_version(&self, kind: ElementKind, id: GlobalId) -> Result<i64>;

    /// Reads an attribute by name.
    fn get_attribute(&self, kind: ElementKind, id: GlobalId, name: &str) -> Result<AttrValue>;

    /// Writes an attribute by name.
    fn set_attribute(
        &self,
        kind: ElementKind,
        id: GlobalId,
        name: &str,
        value: AttrValue,
    ) -> Result<()>;

    /// Creates an unlinked incidence between `vertex` and `edge`.
    fn create_incidence(&self, ty: TypeId, vertex: GlobalId, edge: GlobalId) -> Result<GlobalId>;

    /// Evicts an incidence and frees its id. Links are not touched.
    fn remove_incidence(&self, id: GlobalId) -> Result<()>;

    /// Snapshot of an incidence.
    fn incidence_info(&self, id: GlobalId) -> Result<IncidenceInfo>;

    /// Rewrites one link field of an incidence.
    fn set_incidence_link(&self, id: GlobalId, link: IncidenceLink, value: GlobalId) -> Result<()>;

    /// Allocates a metadata entry on this partial graph.
    fn create_graph_data(&self, kind: GraphKind, ty: TypeId, sigma: Sigma) -> Result<SubgraphId>;

    /// Reads a metadata entry.
    fn graph_data(&self, id: SubgraphId) -> Result<GraphData>;

    /// Applies an update to a metadata entry and returns the result.
    fn update_graph_data(&self, id: SubgraphId, update: GraphDataUpdate) -> Result<GraphData>;

    /// Registers a new partial graph reachable at `address` (complete graph
    /// host only).
    fn register_partial_graph(&self, address: &str) -> Result<PartialGraphId>;

    /// Address of a registered partial graph (complete graph host only).
    fn lookup_partial_graph(&self, id: PartialGraphId) -> Result<String>;

    /// Returns a partial graph id to the pool (complete graph host only).
    fn release_partial_graph(&self, id: PartialGraphId) -> Result<()>;
}
