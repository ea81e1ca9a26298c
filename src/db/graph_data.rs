//! Per-graph metadata entries.
//!
//! Every host keeps a table of [`GraphData`] for the graphs it owns: its own
//! partial graph, the subordinate graphs of its elements and, on the first
//! partial graph only, the complete graph. The complete graph's entry also
//! anchors the global vertex and edge sequences.

use serde::{Deserialize, Serialize};

use crate::storage::ElementKind;
use crate::types::{GlobalId, LocalId, PartialGraphId, Sigma, SubgraphId, TypeId};

/// Local graph id of the complete graph on partial graph 1.
pub const COMPLETE_GRAPH_LOCAL: LocalId = LocalId(1);
/// Local graph id every host uses for its own partial graph.
pub const PARTIAL_GRAPH_LOCAL: LocalId = LocalId(2);
/// First local graph id handed to subordinate graphs.
pub const FIRST_SUBORDINATE_LOCAL: u32 = 3;

/// The complete graph's metadata id.
pub const COMPLETE_GRAPH: SubgraphId = SubgraphId::new(PartialGraphId(1), COMPLETE_GRAPH_LOCAL);

/// Metadata id of a partial graph's own entry.
pub const fn partial_graph_entry(partial_graph: PartialGraphId) -> SubgraphId {
    SubgraphId::new(partial_graph, PARTIAL_GRAPH_LOCAL)
}

/// What a metadata entry describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphKind {
    /// The whole distributed graph.
    Complete,
    /// The share of the graph hosted by one partial graph.
    Partial,
    /// The nested graph owned by a vertex or edge.
    Subordinate,
}

/// Metadata of one graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphData {
    /// Global id of the entry.
    pub id: SubgraphId,
    /// Schema type of the graph.
    pub ty: TypeId,
    /// Complete, partial or subordinate.
    pub kind: GraphKind,
    /// Live vertices.
    pub vertex_count: u64,
    /// Live edges.
    pub edge_count: u64,
    /// Live incidences.
    pub incidence_count: u64,
    /// Owning element of a subordinate graph.
    pub containing_element: Sigma,
    /// Partial graphs registered under this graph.
    pub partial_graphs: Vec<PartialGraphId>,
    /// Head of the vertex sequence.
    pub first_vertex: GlobalId,
    /// Tail of the vertex sequence.
    pub last_vertex: GlobalId,
    /// Head of the edge sequence.
    pub first_edge: GlobalId,
    /// Tail of the edge sequence.
    pub last_edge: GlobalId,
    /// Bumped on every change of the vertex sequence.
    pub vertex_list_version: i64,
    /// Bumped on every change of the edge sequence.
    pub edge_list_version: i64,
}

impl GraphData {
    /// Empty entry.
    pub fn new(id: SubgraphId, ty: TypeId, kind: GraphKind, containing_element: Sigma) -> Self {
        Self {
            id,
            ty,
            kind,
            vertex_count: 0,
            edge_count: 0,
            incidence_count: 0,
            containing_element,
            partial_graphs: Vec::new(),
            first_vertex: GlobalId::NONE,
            last_vertex: GlobalId::NONE,
            first_edge: GlobalId::NONE,
            last_edge: GlobalId::NONE,
            vertex_list_version: 0,
            edge_list_version: 0,
        }
    }

    /// Applies one update in place.
    pub fn apply(&mut self, update: &GraphDataUpdate) {
        match *update {
            GraphDataUpdate::First(ElementKind::Vertex, id) => self.first_vertex = id,
            GraphDataUpdate::First(ElementKind::Edge, id) => self.first_edge = id,
            GraphDataUpdate::Last(ElementKind::Vertex, id) => self.last_vertex = id,
            GraphDataUpdate::Last(ElementKind::Edge, id) => self.last_edge = id,
            GraphDataUpdate::BumpVersion(ElementKind::Vertex) => self.vertex_list_version += 1,
            GraphDataUpdate::BumpVersion(ElementKind::Edge) => self.edge_list_version += 1,
            GraphDataUpdate::Counts {
                vertices,
                edges,
                incidences,
            } => {
                self.vertex_count = shift(self.vertex_count, vertices);
                self.edge_count = shift(self.edge_count, edges);
                self.incidence_count = shift(self.incidence_count, incidences);
            }
            GraphDataUpdate::AddPartialGraph(pg) => {
                if !self.partial_graphs.contains(&pg) {
                    self.partial_graphs.push(pg);
                }
            }
            GraphDataUpdate::RemovePartialGraph(pg) => self.partial_graphs.retain(|p| *p != pg),
        }
    }

    /// Head of the sequence of `kind`.
    pub fn first(&self, kind: ElementKind) -> GlobalId {
        match kind {
            ElementKind::Vertex => self.first_vertex,
            ElementKind::Edge => self.first_edge,
        }
    }

    /// Tail of the sequence of `kind`.
    pub fn last(&self, kind: ElementKind) -> GlobalId {
        match kind {
            ElementKind::Vertex => self.last_vertex,
            ElementKind::Edge => self.last_edge,
        }
    }

    /// Version of the sequence of `kind`.
    pub fn list_version(&self, kind: ElementKind) -> i64 {
        match kind {
            ElementKind::Vertex => self.vertex_list_version,
            ElementKind::Edge => self.edge_list_version,
        }
    }

    /// Count of `kind`.
    pub fn count(&self, kind: ElementKind) -> u64 {
        match kind {
            ElementKind::Vertex => self.vertex_count,
            ElementKind::Edge => self.edge_count,
        }
    }
}

fn shift(count: u64, delta: i64) -> u64 {
    let shifted = count.checked_add_signed(delta);
    debug_assert!(shifted.is_some(), "graph count underflow");
    shifted.unwrap_or(0)
}

/// Single mutation of a [`GraphData`] entry, applied on its host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphDataUpdate {
    /// New sequence head.
    First(ElementKind, GlobalId),
    /// New sequence tail.
    Last(ElementKind, GlobalId),
    /// Bumps a sequence version.
    BumpVersion(ElementKind),
    /// Adjusts the live counts.
    Counts {
        /// Vertex delta.
        vertices: i64,
        /// Edge delta.
        edges: i64,
        /// Incidence delta.
        incidences: i64,
    },
    /// Records a newly registered partial graph.
    AddPartialGraph(PartialGraphId),
    /// Forgets a released partial graph.
    RemovePartialGraph(PartialGraphId),
}

impl GraphDataUpdate {
    /// Count delta of one element of `kind`.
    pub fn element_count(kind: ElementKind, delta: i64) -> Self {
        match kind {
            ElementKind::Vertex => GraphDataUpdate::Counts {
                vertices: delta,
                edges: 0,
                incidences: 0,
            },
            ElementKind::Edge => GraphDataUpdate::Counts {
                vertices: 0,
                edges: delta,
                incidences: 0,
            },
        }
    }

    /// Count delta of one incidence.
    pub fn incidence_count(delta: i64) -> Self {
        GraphDataUpdate::Counts {
            vertices: 0,
            edges: 0,
            incidences: delta,
        }
    }
}
