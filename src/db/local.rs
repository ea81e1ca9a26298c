//! Arena-backed store of one partial graph.
//!
//! The [`ObjectCache`] is the authoritative set of live local objects; every
//! mutation goes through an object setter so its tracker stays current, and
//! [`LocalStore::flush`] writes the trackers back through the record files.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::access::{ElementLink, IncidenceLink, PartialGraphAccess};
use super::graph_data::{
    GraphData, GraphDataUpdate, GraphKind, COMPLETE_GRAPH, COMPLETE_GRAPH_LOCAL,
    FIRST_SUBORDINATE_LOCAL, PARTIAL_GRAPH_LOCAL,
};
use super::router::{PartialGraphPool, COMPLETE_GRAPH_HOST};
use crate::primitives::io::FileRegistry;
use crate::storage::{
    AttrValue, ElementInfo, ElementKind, ElementObject, IdAllocator, IncidenceInfo,
    IncidenceObject, ObjectCache, ProfileRegistry, RecordKind, RecordStore,
};
use crate::types::{
    GlobalId, GraphError, LocalId, PartialGraphId, Result, Sigma, SubgraphId, TypeId,
};

const META_FILE: &str = "graph.json";

/// Allocator and metadata state persisted next to the record files.
#[derive(Debug, Serialize, Deserialize)]
struct StoreMeta {
    partial_graph: PartialGraphId,
    graph_type: TypeId,
    vertex_ids: IdAllocator,
    edge_ids: IdAllocator,
    incidence_ids: IdAllocator,
    graph_ids: IdAllocator,
    graphs: Vec<GraphData>,
    pool: Option<PartialGraphPool>,
}

/// Outcome of one [`LocalStore::flush`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlushStats {
    /// Trackers written back.
    pub records: usize,
    /// Deleted slots overwritten.
    pub tombstones: usize,
}

/// Resident object counts of one store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResidentCounts {
    /// Live local vertices.
    pub vertices: usize,
    /// Live local edges.
    pub edges: usize,
    /// Live local incidences.
    pub incidences: usize,
}

/// Objects, allocators and metadata of one partial graph.
pub struct LocalStore {
    partial_graph: PartialGraphId,
    graph_type: TypeId,
    profiles: Arc<ProfileRegistry>,
    cache: ObjectCache,
    vertex_ids: IdAllocator,
    edge_ids: IdAllocator,
    incidence_ids: IdAllocator,
    graph_ids: IdAllocator,
    graphs: FxHashMap<u32, GraphData>,
    pool: Option<PartialGraphPool>,
    tombstones: Vec<(RecordKind, LocalId)>,
    records: RecordStore,
}

impl LocalStore {
    /// Fresh store for `partial_graph`. Partial graph 1 also gets the
    /// complete graph's metadata entry.
    pub fn create(
        partial_graph: PartialGraphId,
        graph_type: TypeId,
        profiles: Arc<ProfileRegistry>,
        files: Arc<FileRegistry>,
        cache_capacity: usize,
    ) -> Result<Self> {
        if partial_graph.0 == 0 {
            return Err(GraphError::IdSpace("partial graph id 0 is reserved"));
        }
        let records = RecordStore::open(files)?;
        let mut graphs = FxHashMap::default();
        if partial_graph == COMPLETE_GRAPH_HOST {
            let mut complete =
                GraphData::new(COMPLETE_GRAPH, graph_type, GraphKind::Complete, Sigma::TopLevel);
            complete.partial_graphs.push(partial_graph);
            graphs.insert(COMPLETE_GRAPH_LOCAL.0, complete);
        }
        let own = SubgraphId::new(partial_graph, PARTIAL_GRAPH_LOCAL);
        graphs.insert(
            PARTIAL_GRAPH_LOCAL.0,
            GraphData::new(own, graph_type, GraphKind::Partial, Sigma::TopLevel),
        );
        debug!(partial_graph = partial_graph.0, "store.created");
        Ok(Self {
            partial_graph,
            graph_type,
            profiles,
            cache: ObjectCache::with_capacity(cache_capacity),
            vertex_ids: IdAllocator::new(),
            edge_ids: IdAllocator::new(),
            incidence_ids: IdAllocator::new(),
            graph_ids: IdAllocator::starting_at(FIRST_SUBORDINATE_LOCAL),
            graphs,
            pool: None,
            tombstones: Vec::new(),
            records,
        })
    }

    /// Reloads a store flushed into `files`.
    pub fn open(
        profiles: Arc<ProfileRegistry>,
        files: Arc<FileRegistry>,
        cache_capacity: usize,
    ) -> Result<Self> {
        let records = RecordStore::open(files)?;
        let meta: StoreMeta = records
            .load_json(META_FILE)?
            .ok_or_else(|| GraphError::Config("data directory holds no graph".into()))?;
        let mut cache = ObjectCache::with_capacity(cache_capacity);
        for (local, vertex) in records.load_elements(ElementKind::Vertex, &profiles)? {
            cache.store_vertex(local, vertex);
        }
        for (local, edge) in records.load_elements(ElementKind::Edge, &profiles)? {
            cache.store_edge(local, edge);
        }
        for (local, incidence) in records.load_incidences()? {
            cache.store_incidence(local, incidence);
        }
        info!(
            partial_graph = meta.partial_graph.0,
            vertices = cache.vertices().len(),
            edges = cache.edges().len(),
            incidences = cache.incidences().len(),
            "store.opened"
        );
        Ok(Self {
            partial_graph: meta.partial_graph,
            graph_type: meta.graph_type,
            profiles,
            cache,
            vertex_ids: meta.vertex_ids,
            edge_ids: meta.edge_ids,
            incidence_ids: meta.incidence_ids,
            graph_ids: meta.graph_ids,
            graphs: meta.graphs.into_iter().map(|g| (g.id.local().0, g)).collect(),
            pool: meta.pool,
            tombstones: Vec::new(),
            records,
        })
    }

    /// Makes this store the keeper of the partial graph pool.
    pub fn install_pool(&mut self, pool: PartialGraphPool) {
        self.pool = Some(pool);
    }

    /// Served partial graph.
    pub fn partial_graph(&self) -> PartialGraphId {
        self.partial_graph
    }

    /// Resident objects.
    pub fn cache(&self) -> &ObjectCache {
        &self.cache
    }

    /// Live local object counts.
    pub fn resident_counts(&self) -> ResidentCounts {
        ResidentCounts {
            vertices: self.cache.vertices().len(),
            edges: self.cache.edges().len(),
            incidences: self.cache.incidences().len(),
        }
    }

    /// Backing file registry.
    pub fn files(&self) -> &Arc<FileRegistry> {
        self.records.files()
    }

    fn local(&self, id: GlobalId) -> Result<LocalId> {
        if id.partial_graph() != self.partial_graph || id.local().0 == 0 {
            return Err(GraphError::Invalid("id routed to the wrong partial graph"));
        }
        Ok(id.local())
    }

    fn element(&self, kind: ElementKind, id: GlobalId) -> Result<&ElementObject> {
        let local = self.local(id)?;
        let found = match kind {
            ElementKind::Vertex => self.cache.get_vertex(local),
            ElementKind::Edge => self.cache.get_edge(local),
        };
        found.ok_or_else(|| GraphError::not_found(kind.name(), id))
    }

    fn element_mut(&mut self, kind: ElementKind, id: GlobalId) -> Result<&mut ElementObject> {
        let local = self.local(id)?;
        let found = match kind {
            ElementKind::Vertex => self.cache.get_vertex_mut(local),
            ElementKind::Edge => self.cache.get_edge_mut(local),
        };
        found.ok_or_else(|| GraphError::not_found(kind.name(), id))
    }

    fn incidence(&self, id: GlobalId) -> Result<&IncidenceObject> {
        let local = self.local(id)?;
        self.cache
            .get_incidence(local)
            .ok_or_else(|| GraphError::not_found("incidence", id))
    }

    fn incidence_mut(&mut self, id: GlobalId) -> Result<&mut IncidenceObject> {
        let local = self.local(id)?;
        self.cache
            .get_incidence_mut(local)
            .ok_or_else(|| GraphError::not_found("incidence", id))
    }

    fn graph_entry_mut(&mut self, id: SubgraphId) -> Result<&mut GraphData> {
        let local = self.local(id.global())?;
        self.graphs
            .get_mut(&local.0)
            .ok_or_else(|| GraphError::not_found("graph", id.global()))
    }

    fn pool_mut(&mut self) -> Result<&mut PartialGraphPool> {
        self.pool
            .as_mut()
            .ok_or(GraphError::Invalid("partial graph pool lives on the complete graph host"))
    }

    /// Creates an unlinked element.
    pub fn create_element(
        &mut self,
        kind: ElementKind,
        ty: TypeId,
        local: Option<LocalId>,
        sigma: Sigma,
        kappa: i32,
    ) -> Result<GlobalId> {
        let profile = Arc::clone(self.profiles.element_of_kind(ty, kind)?);
        let ids = match kind {
            ElementKind::Vertex => &mut self.vertex_ids,
            ElementKind::Edge => &mut self.edge_ids,
        };
        let local = match local {
            Some(explicit) => {
                ids.claim(explicit)?;
                explicit
            }
            None => ids.allocate()?,
        };
        let object = ElementObject::new(kind, &profile, sigma, kappa);
        let replaced = match kind {
            ElementKind::Vertex => self.cache.store_vertex(local, object),
            ElementKind::Edge => self.cache.store_edge(local, object),
        };
        debug_assert!(replaced.is_none(), "allocated id {} was resident", local.0);
        let id = GlobalId::new(self.partial_graph, local);
        debug!(%kind, id = %id, ty = ty.0, "store.element.created");
        Ok(id)
    }

    /// Evicts an element and frees its id.
    pub fn remove_element(&mut self, kind: ElementKind, id: GlobalId) -> Result<()> {
        let local = self.local(id)?;
        let removed = match kind {
            ElementKind::Vertex => self.cache.remove_vertex(local),
            ElementKind::Edge => self.cache.remove_edge(local),
        };
        if removed.is_none() {
            return Err(GraphError::not_found(kind.name(), id));
        }
        match kind {
            ElementKind::Vertex => self.vertex_ids.release(local),
            ElementKind::Edge => self.edge_ids.release(local),
        }
        self.tombstones.push((kind.into(), local));
        debug!(%kind, id = %id, "store.element.removed");
        Ok(())
    }

    /// Returns true when the element is live.
    pub fn contains_element(&self, kind: ElementKind, id: GlobalId) -> Result<bool> {
        let local = self.local(id)?;
        Ok(match kind {
            ElementKind::Vertex => self.cache.get_vertex(local).is_some(),
            ElementKind::Edge => self.cache.get_edge(local).is_some(),
        })
    }

    /// Scalar snapshot of an element.
    pub fn element_info(&self, kind: ElementKind, id: GlobalId) -> Result<ElementInfo> {
        Ok(self.element(kind, id)?.info())
    }

    /// Rewrites one link field of an element.
    pub fn set_element_link(
        &mut self,
        kind: ElementKind,
        id: GlobalId,
        link: ElementLink,
        value: GlobalId,
    ) -> Result<()> {
        let element = self.element_mut(kind, id)?;
        match link {
            ElementLink::Next => element.set_next(value),
            ElementLink::Prev => element.set_prev(value),
            ElementLink::FirstIncidence => element.set_first_incidence(value),
            ElementLink::LastIncidence => element.set_last_incidence(value),
            ElementLink::SubordinateGraph => element.set_subordinate_graph(value),
        }
        Ok(())
    }

    /// Bumps the lambda sequence version of an element.
    pub fn bump_incidence_list_version(&mut self, kind: ElementKind, id: GlobalId) -> Result<i64> {
        Ok(self.element_mut(kind, id)?.bump_incidence_list_version())
    }

    /// Reads an attribute by name.
    pub fn get_attribute(&self, kind: ElementKind, id: GlobalId, name: &str) -> Result<AttrValue> {
        let element = self.element(kind, id)?;
        let index = self.profiles.element(element.ty())?.slot_index(name)?;
        Ok(element.attributes()[index].clone())
    }

    /// Writes an attribute by name.
    pub fn set_attribute(
        &mut self,
        kind: ElementKind,
        id: GlobalId,
        name: &str,
        value: AttrValue,
    ) -> Result<()> {
        let profiles = Arc::clone(&self.profiles);
        let element = self.element_mut(kind, id)?;
        let profile = profiles.element(element.ty())?;
        let index = profile.slot_index(name)?;
        element.set_attribute(profile, index, value)
    }

    /// Creates an unlinked incidence.
    pub fn create_incidence(&mut self, ty: TypeId, vertex: GlobalId, edge: GlobalId) -> Result<GlobalId> {
        self.profiles.incidence(ty)?;
        let local = self.incidence_ids.allocate()?;
        self.cache
            .store_incidence(local, IncidenceObject::new(ty, vertex, edge));
        Ok(GlobalId::new(self.partial_graph, local))
    }

    /// Evicts an incidence and frees its id.
    pub fn remove_incidence(&mut self, id: GlobalId) -> Result<()> {
        let local = self.local(id)?;
        self.cache
            .remove_incidence(local)
            .ok_or_else(|| GraphError::not_found("incidence", id))?;
        self.incidence_ids.release(local);
        self.tombstones.push((RecordKind::Incidence, local));
        Ok(())
    }

    /// Snapshot of an incidence.
    pub fn incidence_info(&self, id: GlobalId) -> Result<IncidenceInfo> {
        Ok(self.incidence(id)?.info())
    }

    /// Rewrites one link field of an incidence.
    pub fn set_incidence_link(&mut self, id: GlobalId, link: IncidenceLink, value: GlobalId) -> Result<()> {
        let incidence = self.incidence_mut(id)?;
        match link {
            IncidenceLink::NextAtVertex => incidence.set_next_at_vertex(value),
            IncidenceLink::PrevAtVertex => incidence.set_prev_at_vertex(value),
            IncidenceLink::NextAtEdge => incidence.set_next_at_edge(value),
            IncidenceLink::PrevAtEdge => incidence.set_prev_at_edge(value),
        }
        Ok(())
    }

    /// Allocates a metadata entry. Entries are never reused.
    pub fn create_graph_data(&mut self, kind: GraphKind, ty: TypeId, sigma: Sigma) -> Result<SubgraphId> {
        let local = self.graph_ids.allocate()?;
        let id = SubgraphId::new(self.partial_graph, local);
        self.graphs.insert(local.0, GraphData::new(id, ty, kind, sigma));
        debug!(graph = %id, ?kind, "store.graph.created");
        Ok(id)
    }

    /// Reads a metadata entry.
    pub fn graph_data(&self, id: SubgraphId) -> Result<GraphData> {
        let local = self.local(id.global())?;
        self.graphs
            .get(&local.0)
            .cloned()
            .ok_or_else(|| GraphError::not_found("graph", id.global()))
    }

    /// Applies one update to a metadata entry.
    pub fn update_graph_data(&mut self, id: SubgraphId, update: GraphDataUpdate) -> Result<GraphData> {
        let entry = self.graph_entry_mut(id)?;
        entry.apply(&update);
        Ok(entry.clone())
    }

    /// Registers a partial graph in the pool.
    pub fn register_partial_graph(&mut self, address: &str) -> Result<PartialGraphId> {
        let id = self.pool_mut()?.allocate(address)?;
        self.graph_entry_mut(COMPLETE_GRAPH)?
            .apply(&GraphDataUpdate::AddPartialGraph(id));
        info!(partial_graph = id.0, %address, "pool.partial_graph.registered");
        Ok(id)
    }

    /// Looks up the address of a registered partial graph.
    pub fn lookup_partial_graph(&mut self, id: PartialGraphId) -> Result<String> {
        Ok(self.pool_mut()?.address_of(id)?.to_owned())
    }

    /// Releases a partial graph id back into the pool.
    pub fn release_partial_graph(&mut self, id: PartialGraphId) -> Result<()> {
        self.pool_mut()?.release(id)?;
        self.graph_entry_mut(COMPLETE_GRAPH)?
            .apply(&GraphDataUpdate::RemovePartialGraph(id));
        info!(partial_graph = id.0, "pool.partial_graph.released");
        Ok(())
    }

    /// Writes tombstones, every pending tracker and the metadata document.
    ///
    /// Trackers and tombstones are discarded only once everything was
    /// written; after a failed flush the next one writes them again.
    pub fn flush(&mut self) -> Result<FlushStats> {
        let mut stats = FlushStats::default();
        for &(kind, local) in &self.tombstones {
            self.records.write_tombstone(kind, local)?;
            stats.tombstones += 1;
        }

        let dirty = [
            (RecordKind::Vertex, self.cache.vertices()),
            (RecordKind::Edge, self.cache.edges()),
        ];
        for (kind, table) in dirty {
            for (key, element) in table.iter() {
                if let Some(tracker) = element.tracker() {
                    self.records.write_tracker(kind, LocalId(key), tracker)?;
                    stats.records += 1;
                }
            }
        }
        for (key, incidence) in self.cache.incidences().iter() {
            if let Some(tracker) = incidence.tracker() {
                self.records
                    .write_tracker(RecordKind::Incidence, LocalId(key), tracker)?;
                stats.records += 1;
            }
        }

        let mut graphs: Vec<GraphData> = self.graphs.values().cloned().collect();
        graphs.sort_by_key(|g| g.id);
        let meta = StoreMeta {
            partial_graph: self.partial_graph,
            graph_type: self.graph_type,
            vertex_ids: self.vertex_ids.clone(),
            edge_ids: self.edge_ids.clone(),
            incidence_ids: self.incidence_ids.clone(),
            graph_ids: self.graph_ids.clone(),
            graphs,
            pool: self.pool.clone(),
        };
        self.records.save_json(META_FILE, &meta)?;

        self.tombstones.clear();
        let (vertices, edges, incidences) = self.cache.tables_mut();
        vertices.for_each_mut(|_, vertex| drop(vertex.take_tracker()));
        edges.for_each_mut(|_, edge| drop(edge.take_tracker()));
        incidences.for_each_mut(|_, incidence| drop(incidence.take_tracker()));
        info!(
            partial_graph = self.partial_graph.0,
            records = stats.records,
            tombstones = stats.tombstones,
            "store.flushed"
        );
        Ok(stats)
    }
}

/// The lock serializes primitives per partial graph; each call holds it for
/// exactly one primitive.
impl PartialGraphAccess for Mutex<LocalStore> {
    fn partial_graph_id(&self) -> PartialGraphId {
        self.lock().partial_graph()
    }

    fn create_element(
        &self,
        kind: ElementKind,
        ty: TypeId,
        local: Option<LocalId>,
        sigma: Sigma,
        kappa: i32,
    ) -> Result<GlobalId> {
        self.lock().create_element(kind, ty, local, sigma, kappa)
    }

    fn remove_element(&self, kind: ElementKind, id: GlobalId) -> Result<()> {
        self.lock().remove_element(kind, id)
    }

    fn contains_element(&self, kind: ElementKind, id: GlobalId) -> Result<bool> {
        self.lock().contains_element(kind, id)
    }

    fn element_info(&self, kind: ElementKind, id: GlobalId) -> Result<ElementInfo> {
        self.lock().element_info(kind, id)
    }

    fn set_element_link(
        &self,
        kind: ElementKind,
        id: GlobalId,
        link: ElementLink,
        value: GlobalId,
    ) -> Result<()> {
        self.lock().set_element_link(kind, id, link, value)
    }

    fn bump_incidence_list_version(&self, kind: ElementKind, id: GlobalId) -> Result<i64> {
        self.lock().bump_incidence_list_version(kind, id)
    }

    fn get_attribute(&self, kind: ElementKind, id: GlobalId, name: &str) -> Result<AttrValue> {
        self.lock().get_attribute(kind, id, name)
    }

    fn set_attribute(
        &self,
        kind: ElementKind,
        id: GlobalId,
        name: &str,
        value: AttrValue,
    ) -> Result<()> {
        self.lock().set_attribute(kind, id, name, value)
    }

    fn create_incidence(&self, ty: TypeId, vertex: GlobalId, edge: GlobalId) -> Result<GlobalId> {
        self.lock().create_incidence(ty, vertex, edge)
    }

    fn remove_incidence(&self, id: GlobalId) -> Result<()> {
        self.lock().remove_incidence(id)
    }

    fn incidence_info(&self, id: GlobalId) -> Result<IncidenceInfo> {
        self.lock().incidence_info(id)
    }

    fn set_incidence_link(&self, id: GlobalId, link: IncidenceLink, value: GlobalId) -> Result<()> {
        self.lock().set_incidence_link(id, link, value)
    }

    fn create_graph_data(&self, kind: GraphKind, ty: TypeId, sigma: Sigma) -> Result<SubgraphId> {
        self.lock().create_graph_data(kind, ty, sigma)
    }

    fn graph_data(&self, id: SubgraphId) -> Result<GraphData> {
        self.lock().graph_data(id)
    }

    fn update_graph_data(&self, id: SubgraphId, update: GraphDataUpdate) -> Result<GraphData> {
        self.lock().update_graph_data(id, update)
    }

    fn register_partial_graph(&self, address: &str) -> Result<PartialGraphId> {
        self.lock().register_partial_graph(address)
    }

    fn lookup_partial_graph(&self, id: PartialGraphId) -> Result<String> {
        self.lock().lookup_partial_graph(id)
    }

    fn release_partial_graph(&self, id: PartialGraphId) -> Result<()> {
        self.lock().release_partial_graph(id)
    }
}
