use tracing::debug;

use super::sequence::SequenceKind;
use super::GraphDatabase;
use crate::db::graph_data::{partial_graph_entry, GraphDataUpdate, COMPLETE_GRAPH};
use crate::storage::{ElementKind, IncidenceInfo};
use crate::types::{EdgeId, GlobalId, IncidenceId, Result, Sigma, TypeId, VertexId};

impl GraphDatabase {
    /// Connects `vertex` and `edge` with a new incidence of type `ty`,
    /// appended to the tail of both lambda sequences.
    pub fn connect(&self, ty: TypeId, vertex: VertexId, edge: EdgeId) -> Result<IncidenceId> {
        self.profiles().incidence(ty)?;
        let v = self.vertex_info(vertex)?;
        let e = self.edge_info(edge)?;
        let id = self
            .router()
            .local()
            .create_incidence(ty, vertex.global(), edge.global())?;
        self.seq_append(SequenceKind::AtVertex(vertex), id)?;
        self.seq_append(SequenceKind::AtEdge(edge), id)?;
        self.seq_bump(SequenceKind::AtVertex(vertex))?;
        self.seq_bump(SequenceKind::AtEdge(edge))?;
        self.shift_incidence_counts(id, v.sigma, e.sigma, 1)?;
        let incidence = IncidenceId(id);
        self.notify(|l| l.incidence_added(incidence));
        debug!(incidence = %id, vertex = %vertex, edge = %edge, "graphdb.incidence.created");
        Ok(incidence)
    }

    /// Removes one incidence from both lambda sequences. The vertex and the
    /// edge stay, even when the edge is left without incidences.
    pub fn disconnect(&self, incidence: IncidenceId) -> Result<()> {
        self.detach_incidence(incidence.global())
    }

    pub(crate) fn detach_incidence(&self, id: GlobalId) -> Result<()> {
        let host = self.router().route(id)?;
        let info = host.incidence_info(id)?;
        self.notify(|l| l.incidence_deleted(IncidenceId(id)));
        let at_vertex = SequenceKind::AtVertex(VertexId(info.vertex));
        let at_edge = SequenceKind::AtEdge(EdgeId(info.edge));
        self.seq_unlink(at_vertex, id)?;
        self.seq_unlink(at_edge, id)?;
        self.seq_bump(at_vertex)?;
        self.seq_bump(at_edge)?;
        let v = self.element_info(ElementKind::Vertex, info.vertex)?;
        let e = self.element_info(ElementKind::Edge, info.edge)?;
        self.shift_incidence_counts(id, v.sigma, e.sigma, -1)?;
        host.remove_incidence(id)?;
        debug!(incidence = %id, "graphdb.incidence.removed");
        Ok(())
    }

    fn shift_incidence_counts(
        &self,
        id: GlobalId,
        vertex_sigma: Sigma,
        edge_sigma: Sigma,
        delta: i64,
    ) -> Result<()> {
        let update = GraphDataUpdate::incidence_count(delta);
        self.router()
            .complete_graph()?
            .update_graph_data(COMPLETE_GRAPH, update)?;
        let host = id.partial_graph();
        self.router()
            .access(host)?
            .update_graph_data(partial_graph_entry(host), update)?;
        let around_edge = self.enclosing_graphs(edge_sigma)?;
        for graph in self.enclosing_graphs(vertex_sigma)? {
            if around_edge.contains(&graph) {
                self.router()
                    .route(graph.global())?
                    .update_graph_data(graph, update)?;
            }
        }
        Ok(())
    }

    /// Snapshot of an incidence.
    pub fn incidence_info(&self, incidence: IncidenceId) -> Result<IncidenceInfo> {
        let id = incidence.global();
        self.router().route(id)?.incidence_info(id)
    }

    /// Returns true when the incidence is live.
    pub fn contains_incidence(&self, incidence: IncidenceId) -> Result<bool> {
        match self.incidence_info(incidence) {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }
}
