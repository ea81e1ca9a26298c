use tracing::info;

use super::GraphDatabase;
use crate::db::graph_data::{partial_graph_entry, GraphData, COMPLETE_GRAPH};
use crate::storage::GraphSize;
use crate::types::{PartialGraphId, Result, SubgraphId};

impl GraphDatabase {
    /// Metadata entry `id`, read from its host.
    pub fn graph_data(&self, id: SubgraphId) -> Result<GraphData> {
        self.router().route(id.global())?.graph_data(id)
    }

    /// Metadata of the complete graph.
    pub fn complete_graph(&self) -> Result<GraphData> {
        self.graph_data(COMPLETE_GRAPH)
    }

    /// Metadata of the partial graph `id`.
    pub fn partial_graph(&self, id: PartialGraphId) -> Result<GraphData> {
        self.graph_data(partial_graph_entry(id))
    }

    /// Live vertices of the complete graph.
    pub fn vertex_count(&self) -> Result<u64> {
        Ok(self.complete_graph()?.vertex_count)
    }

    /// Live edges of the complete graph.
    pub fn edge_count(&self) -> Result<u64> {
        Ok(self.complete_graph()?.edge_count)
    }

    /// Live incidences of the complete graph.
    pub fn incidence_count(&self) -> Result<u64> {
        Ok(self.complete_graph()?.incidence_count)
    }

    /// Version of the global vertex sequence.
    pub fn vertex_list_version(&self) -> Result<i64> {
        Ok(self.complete_graph()?.vertex_list_version)
    }

    /// Version of the global edge sequence.
    pub fn edge_list_version(&self) -> Result<i64> {
        Ok(self.complete_graph()?.edge_list_version)
    }

    /// Size summary for query-cost estimation.
    pub fn graph_size(&self) -> Result<GraphSize> {
        let complete = self.complete_graph()?;
        Ok(GraphSize {
            vertex_count: complete.vertex_count,
            edge_count: complete.edge_count,
            known_vertex_types: self.profiles().vertex_type_count(),
            known_edge_types: self.profiles().edge_type_count(),
        })
    }

    /// Partial graphs registered with the complete graph.
    pub fn partial_graphs(&self) -> Result<Vec<PartialGraphId>> {
        Ok(self.complete_graph()?.partial_graphs)
    }

    /// Address partial graph `id` is reachable at.
    pub fn partial_graph_address(&self, id: PartialGraphId) -> Result<String> {
        self.router().complete_graph()?.lookup_partial_graph(id)
    }

    /// Returns the id of a partial graph that left to the pool. Its elements
    /// become unreachable.
    pub fn release_partial_graph(&self, id: PartialGraphId) -> Result<()> {
        self.router().complete_graph()?.release_partial_graph(id)?;
        self.router().detach(id);
        info!(partial_graph = id.0, "graphdb.partial_graph.released");
        Ok(())
    }
}
