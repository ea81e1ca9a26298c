use std::collections::VecDeque;

use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use tracing::{debug, info};

use super::sequence::SequenceKind;
use super::GraphDatabase;
use crate::db::access::ElementLink;
use crate::db::graph_data::{partial_graph_entry, GraphDataUpdate, GraphKind, COMPLETE_GRAPH};
use crate::db::view::sigma_kind;
use crate::storage::{AggregationKind, AttrValue, ElementInfo, ElementKind, ElementSpec};
use crate::types::{
    EdgeId, GlobalId, GraphError, LocalId, PartialGraphId, Result, Sigma, SubgraphId, TypeId,
    VertexId,
};

/// Subordinate graphs enclosing an element, innermost first.
pub(crate) type Enclosing = SmallVec<[SubgraphId; 4]>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Pending {
    Vertex(VertexId),
    Edge(EdgeId),
}

impl Pending {
    fn parts(self) -> (ElementKind, GlobalId) {
        match self {
            Pending::Vertex(v) => (ElementKind::Vertex, v.global()),
            Pending::Edge(e) => (ElementKind::Edge, e.global()),
        }
    }
}

#[derive(Default)]
struct DeleteQueue {
    queue: VecDeque<Pending>,
    seen: FxHashSet<Pending>,
    deleted: usize,
}

impl DeleteQueue {
    fn push(&mut self, item: Pending) {
        if self.seen.insert(item) {
            self.queue.push_back(item);
        }
    }
}

impl GraphDatabase {
    /// Creates a vertex on this host and appends it to the global vertex
    /// sequence.
    pub fn create_vertex(&self, spec: ElementSpec) -> Result<VertexId> {
        self.create_element(ElementKind::Vertex, spec).map(VertexId)
    }

    /// Creates an edge on this host and appends it to the global edge
    /// sequence. The edge starts without incidences.
    pub fn create_edge(&self, spec: ElementSpec) -> Result<EdgeId> {
        self.create_element(ElementKind::Edge, spec).map(EdgeId)
    }

    fn create_element(&self, kind: ElementKind, spec: ElementSpec) -> Result<GlobalId> {
        let loading = self.is_loading();
        let local = match (spec.id, loading) {
            (Some(_), false) => {
                return Err(GraphError::IdSpace("explicit ids are only accepted while loading"))
            }
            (None, true) => return Err(GraphError::IdSpace("bulk loading requires explicit ids")),
            (Some(0), true) => return Err(GraphError::IdSpace("local id 0 is reserved")),
            (id, _) => id.map(LocalId),
        };
        let kappa = self.resolve_kappa(spec.sigma, spec.kappa)?;
        if spec.sigma.element().is_some() {
            self.create_subordinate_graph(spec.sigma)?;
        }

        let id = self
            .router()
            .local()
            .create_element(kind, spec.ty, local, spec.sigma, kappa)?;
        let seq = global_sequence(kind);
        self.seq_append(seq, id)?;
        self.shift_element_counts(kind, id.partial_graph(), spec.sigma, 1)?;
        if !loading {
            self.seq_bump(seq)?;
            match kind {
                ElementKind::Vertex => self.notify(|l| l.vertex_added(VertexId(id))),
                ElementKind::Edge => self.notify(|l| l.edge_added(EdgeId(id))),
            }
        }
        debug!(%kind, id = %id, ty = spec.ty.0, kappa, "graphdb.element.created");
        Ok(id)
    }

    fn resolve_kappa(&self, sigma: Sigma, explicit: Option<i32>) -> Result<i32> {
        let Some(container) = sigma.element() else {
            return Ok(explicit.unwrap_or(self.config().top_level_kappa));
        };
        let outer = self.element_info(sigma_kind(sigma), container)?.kappa;
        match explicit {
            None => Ok(outer - 1),
            Some(kappa) if kappa < outer => Ok(kappa),
            Some(_) => Err(GraphError::Invalid(
                "nested kappa must be below the container's kappa",
            )),
        }
    }

    /// Subordinate graphs `sigma` is nested in, innermost first.
    pub(crate) fn enclosing_graphs(&self, mut sigma: Sigma) -> Result<Enclosing> {
        let mut graphs = Enclosing::new();
        while let Some(container) = sigma.element() {
            let info = self.element_info(sigma_kind(sigma), container)?;
            if let Some(graph) = SubgraphId::from_stored(info.subordinate_graph) {
                graphs.push(graph);
            }
            sigma = info.sigma;
        }
        Ok(graphs)
    }

    fn shift_element_counts(
        &self,
        kind: ElementKind,
        host: PartialGraphId,
        sigma: Sigma,
        delta: i64,
    ) -> Result<()> {
        let update = GraphDataUpdate::element_count(kind, delta);
        self.router()
            .complete_graph()?
            .update_graph_data(COMPLETE_GRAPH, update)?;
        let entry = partial_graph_entry(host);
        self.router()
            .access(host)?
            .update_graph_data(entry, update)?;
        for graph in self.enclosing_graphs(sigma)? {
            self.router()
                .route(graph.global())?
                .update_graph_data(graph, update)?;
        }
        Ok(())
    }

    /// Deletes a vertex, its incidences and everything that depends on it.
    ///
    /// Vertices owned through composite binary edges go with it, as do the
    /// elements nested in its subordinate graph. Binary edges losing an end
    /// and edges left without incidences are deleted as well.
    pub fn delete_vertex(&self, vertex: VertexId) -> Result<()> {
        self.drain(Pending::Vertex(vertex))
    }

    /// Deletes an edge and its incidences. Incident vertices are kept.
    pub fn delete_edge(&self, edge: EdgeId) -> Result<()> {
        self.drain(Pending::Edge(edge))
    }

    fn drain(&self, first: Pending) -> Result<()> {
        let (kind, root) = first.parts();
        if !self.router().route(root)?.contains_element(kind, root)? {
            return Err(GraphError::not_found(kind.name(), root));
        }
        let mut pending = DeleteQueue::default();
        pending.push(first);
        while let Some(item) = pending.queue.pop_front() {
            let (kind, id) = item.parts();
            if !self.router().route(id)?.contains_element(kind, id)? {
                continue;
            }
            self.delete_one(kind, id, &mut pending)?;
        }
        if pending.deleted > 1 {
            info!(root = %root, deleted = pending.deleted, "graphdb.delete.cascaded");
        }
        Ok(())
    }

    fn delete_one(&self, kind: ElementKind, id: GlobalId, pending: &mut DeleteQueue) -> Result<()> {
        let info = self.element_info(kind, id)?;
        match kind {
            ElementKind::Vertex => self.notify(|l| l.vertex_deleted(VertexId(id))),
            ElementKind::Edge => self.notify(|l| l.edge_deleted(EdgeId(id))),
        }
        // Nested elements go first; their counts still roll up through this
        // element's subordinate graph.
        if let Some(graph) = SubgraphId::from_stored(info.subordinate_graph) {
            for nested in self.nested_elements(kind, id, graph)? {
                pending.seen.insert(nested);
                let (nested_kind, nested_id) = nested.parts();
                if self
                    .router()
                    .route(nested_id)?
                    .contains_element(nested_kind, nested_id)?
                {
                    self.delete_one(nested_kind, nested_id, pending)?;
                }
            }
        }

        let mut incidence = self.element_info(kind, id)?.first_incidence;
        while let Some(current) = incidence.non_null() {
            let inc = self.router().route(current)?.incidence_info(current)?;
            incidence = match kind {
                ElementKind::Vertex => inc.next_at_vertex,
                ElementKind::Edge => inc.next_at_edge,
            };
            if kind == ElementKind::Edge {
                self.detach_incidence(current)?;
                continue;
            }
            let opposite = self.opposite_vertex(inc.edge, current)?;
            if let Some(owned) = opposite.filter(|&owned| owned != id) {
                let class = self.profiles().incidence(inc.ty)?;
                if class.aggregation == AggregationKind::Composite {
                    pending.push(Pending::Vertex(VertexId(owned)));
                }
            }
            self.detach_incidence(current)?;
            // A binary edge never outlives one of its ends.
            let edge = self.element_info(ElementKind::Edge, inc.edge)?;
            if opposite.is_some() || edge.first_incidence.is_none() {
                pending.push(Pending::Edge(EdgeId(inc.edge)));
            }
        }

        let seq = global_sequence(kind);
        self.seq_unlink(seq, id)?;
        self.shift_element_counts(kind, id.partial_graph(), info.sigma, -1)?;
        self.router().route(id)?.remove_element(kind, id)?;
        self.seq_bump(seq)?;
        pending.deleted += 1;
        debug!(%kind, id = %id, "graphdb.element.deleted");
        Ok(())
    }

    /// Vertex at the other end of a binary edge.
    fn opposite_vertex(&self, edge: GlobalId, incidence: GlobalId) -> Result<Option<GlobalId>> {
        let info = self.element_info(ElementKind::Edge, edge)?;
        let first = info.first_incidence;
        let last = info.last_incidence;
        if first.is_none() || first == last {
            return Ok(None);
        }
        let second = self.router().route(first)?.incidence_info(first)?.next_at_edge;
        if second != last {
            return Ok(None);
        }
        let other = if first == incidence { last } else { first };
        Ok(Some(self.router().route(other)?.incidence_info(other)?.vertex))
    }

    /// Elements whose container is `id`, found by walking the global
    /// sequences.
    fn nested_elements(
        &self,
        kind: ElementKind,
        id: GlobalId,
        graph: SubgraphId,
    ) -> Result<Vec<Pending>> {
        let data = self.graph_data(graph)?;
        if data.vertex_count == 0 && data.edge_count == 0 {
            return Ok(Vec::new());
        }
        let container = match kind {
            ElementKind::Vertex => Sigma::Vertex(VertexId(id)),
            ElementKind::Edge => Sigma::Edge(EdgeId(id)),
        };
        let mut nested = Vec::new();
        for (seq, member) in [
            (SequenceKind::Vertices, ElementKind::Vertex),
            (SequenceKind::Edges, ElementKind::Edge),
        ] {
            let mut cursor = self.seq_head(seq)?;
            while let Some(current) = cursor.non_null() {
                let info = self.element_info(member, current)?;
                if info.sigma == container {
                    nested.push(match member {
                        ElementKind::Vertex => Pending::Vertex(VertexId(current)),
                        ElementKind::Edge => Pending::Edge(EdgeId(current)),
                    });
                }
                cursor = info.next;
            }
        }
        Ok(nested)
    }

    /// Scalar snapshot of a vertex or edge, wherever it is hosted.
    pub fn element_info(&self, kind: ElementKind, id: GlobalId) -> Result<ElementInfo> {
        self.router().route(id)?.element_info(kind, id)
    }

    /// Scalar snapshot of a vertex.
    pub fn vertex_info(&self, vertex: VertexId) -> Result<ElementInfo> {
        self.element_info(ElementKind::Vertex, vertex.global())
    }

    /// Scalar snapshot of an edge.
    pub fn edge_info(&self, edge: EdgeId) -> Result<ElementInfo> {
        self.element_info(ElementKind::Edge, edge.global())
    }

    /// Returns true when the vertex is live.
    pub fn contains_vertex(&self, vertex: VertexId) -> Result<bool> {
        let id = vertex.global();
        self.router().route(id)?.contains_element(ElementKind::Vertex, id)
    }

    /// Returns true when the edge is live.
    pub fn contains_edge(&self, edge: EdgeId) -> Result<bool> {
        let id = edge.global();
        self.router().route(id)?.contains_element(ElementKind::Edge, id)
    }

    /// Reads a vertex attribute by name.
    pub fn get_vertex_attribute(&self, vertex: VertexId, name: &str) -> Result<AttrValue> {
        let id = vertex.global();
        self.router().route(id)?.get_attribute(ElementKind::Vertex, id, name)
    }

    /// Writes a vertex attribute by name.
    pub fn set_vertex_attribute(&self, vertex: VertexId, name: &str, value: AttrValue) -> Result<()> {
        let id = vertex.global();
        self.router()
            .route(id)?
            .set_attribute(ElementKind::Vertex, id, name, value)
    }

    /// Reads an edge attribute by name.
    pub fn get_edge_attribute(&self, edge: EdgeId, name: &str) -> Result<AttrValue> {
        let id = edge.global();
        self.router().route(id)?.get_attribute(ElementKind::Edge, id, name)
    }

    /// Writes an edge attribute by name.
    pub fn set_edge_attribute(&self, edge: EdgeId, name: &str, value: AttrValue) -> Result<()> {
        let id = edge.global();
        self.router()
            .route(id)?
            .set_attribute(ElementKind::Edge, id, name, value)
    }

    /// Subordinate graph of `container`, created on the container's host on
    /// first use.
    pub fn create_subordinate_graph(&self, container: Sigma) -> Result<SubgraphId> {
        let id = container
            .element()
            .ok_or(GraphError::Invalid("top-level elements have no container"))?;
        let kind = sigma_kind(container);
        let host = self.router().route(id)?;
        let info = host.element_info(kind, id)?;
        if let Some(existing) = SubgraphId::from_stored(info.subordinate_graph) {
            return Ok(existing);
        }
        let graph = host.create_graph_data(
            GraphKind::Subordinate,
            TypeId(self.schema().graph_type),
            container,
        )?;
        host.set_element_link(kind, id, ElementLink::SubordinateGraph, graph.global())?;
        debug!(container = %id, graph = %graph, "graphdb.subordinate.created");
        Ok(graph)
    }

    /// Subordinate graph of `container`, if one was created.
    pub fn subordinate_graph(&self, container: Sigma) -> Result<Option<SubgraphId>> {
        let Some(id) = container.element() else {
            return Ok(None);
        };
        let info = self.element_info(sigma_kind(container), id)?;
        Ok(SubgraphId::from_stored(info.subordinate_graph))
    }
}

pub(crate) fn global_sequence(kind: ElementKind) -> SequenceKind {
    match kind {
        ElementKind::Vertex => SequenceKind::Vertices,
        ElementKind::Edge => SequenceKind::Edges,
    }
}

