//! Graph scopes and kappa-filtered views.
//!
//! A [`GraphScope`] names the graph an iteration is restricted to. A
//! [`ViewGraph`] wraps another scope and hides every element whose kappa is
//! below its threshold; it keeps its own element counts current by listening
//! to structural changes.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::core::{GraphDatabase, TraversalContext};
use super::listener::GraphListener;
use crate::storage::{AttrValue, ElementKind, ElementSpec, Schema};
use crate::types::{
    EdgeId, GlobalId, IncidenceId, PartialGraphId, Result, Sigma, SubgraphId, TypeId, VertexId,
};

/// Graph an iteration or containment test is evaluated against.
#[derive(Clone, Debug, Default)]
pub enum GraphScope {
    /// Every element of the distributed graph.
    #[default]
    Complete,
    /// Elements hosted by one partial graph.
    Partial(PartialGraphId),
    /// Elements nested, at any depth, in one subordinate graph.
    Subordinate(SubgraphId),
    /// A kappa-filtered view.
    View(Arc<ViewGraph>),
}

impl GraphScope {
    /// Returns true when the vertex or edge `id` belongs to this scope.
    pub fn contains_element(&self, db: &GraphDatabase, kind: ElementKind, id: GlobalId) -> Result<bool> {
        match self {
            GraphScope::Complete => Ok(true),
            GraphScope::Partial(pg) => Ok(id.partial_graph() == *pg),
            GraphScope::Subordinate(graph) => {
                let container = db.graph_data(*graph)?.containing_element;
                if container == Sigma::TopLevel {
                    return Ok(true);
                }
                // Vertex and edge ids overlap, so the container kind counts too.
                let mut sigma = db.element_info(kind, id)?.sigma;
                while let Some(outer) = sigma.element() {
                    if sigma == container {
                        return Ok(true);
                    }
                    sigma = db.element_info(sigma_kind(sigma), outer)?.sigma;
                }
                Ok(false)
            }
            GraphScope::View(view) => view.contains_element(kind, id),
        }
    }

    /// Returns true when the incidence belongs to this scope.
    pub fn contains_incidence(&self, db: &GraphDatabase, id: IncidenceId) -> Result<bool> {
        match self {
            GraphScope::Complete => Ok(true),
            GraphScope::Partial(pg) => Ok(id.partial_graph() == *pg),
            GraphScope::Subordinate(_) | GraphScope::View(_) => {
                let info = db.incidence_info(id)?;
                Ok(self.contains_element(db, ElementKind::Vertex, info.vertex)?
                    && self.contains_element(db, ElementKind::Edge, info.edge)?)
            }
        }
    }

    /// Orders two scopes.
    ///
    /// The complete graph is the greatest. Views order by threshold, a higher
    /// threshold being lower. A view compared with anything else defers to the
    /// scope it wraps. Remaining scopes compare by level: a partial graph sits
    /// at the top level kappa, a subordinate graph at its container's kappa.
    pub fn compare(&self, other: &GraphScope, db: &GraphDatabase) -> Result<Ordering> {
        match (self, other) {
            (GraphScope::Complete, GraphScope::Complete) => Ok(Ordering::Equal),
            (GraphScope::Complete, _) => Ok(Ordering::Greater),
            (_, GraphScope::Complete) => Ok(Ordering::Less),
            (GraphScope::View(a), GraphScope::View(b)) => Ok(b.threshold.cmp(&a.threshold)),
            (GraphScope::View(a), _) => a.wrapped.compare(other, db),
            (_, GraphScope::View(b)) => self.compare(&b.wrapped, db),
            _ => Ok(self.level(db)?.cmp(&other.level(db)?)),
        }
    }

    fn level(&self, db: &GraphDatabase) -> Result<i32> {
        let top = db.config().top_level_kappa;
        let GraphScope::Subordinate(graph) = self else {
            return Ok(top);
        };
        let sigma = db.graph_data(*graph)?.containing_element;
        match sigma.element() {
            Some(container) => Ok(db.element_info(sigma_kind(sigma), container)?.kappa),
            None => Ok(top),
        }
    }
}

pub(crate) fn sigma_kind(sigma: Sigma) -> ElementKind {
    match sigma {
        Sigma::Edge(_) => ElementKind::Edge,
        Sigma::TopLevel | Sigma::Vertex(_) => ElementKind::Vertex,
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct ViewCounts {
    vertices: u64,
    edges: u64,
    incidences: u64,
}

impl ViewCounts {
    fn shift(slot: &mut u64, up: bool) {
        *slot = if up { *slot + 1 } else { slot.saturating_sub(1) };
    }
}

/// Elements of a wrapped scope with `kappa >= threshold`.
///
/// Mutations, schema and attribute access pass through to the database;
/// only containment, counts and first/last navigation are derived here.
pub struct ViewGraph {
    db: GraphDatabase,
    wrapped: GraphScope,
    threshold: i32,
    counts: Mutex<ViewCounts>,
}

impl fmt::Debug for ViewGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewGraph")
            .field("wrapped", &self.wrapped)
            .field("threshold", &self.threshold)
            .field("counts", &*self.counts.lock())
            .finish()
    }
}

impl ViewGraph {
    /// View over `wrapped`. Counts are seeded from the current contents and
    /// then follow structural changes made through `db`.
    pub fn new(db: &GraphDatabase, wrapped: GraphScope, threshold: i32) -> Result<Arc<Self>> {
        let view = Arc::new(Self {
            db: db.clone(),
            wrapped,
            threshold,
            counts: Mutex::new(ViewCounts::default()),
        });
        let ctx = TraversalContext::with_scope(GraphScope::View(Arc::clone(&view)));
        let mut counts = ViewCounts::default();
        for vertex in db.vertices(&ctx) {
            let vertex = vertex?;
            counts.vertices += 1;
            for incidence in db.incidences_at_vertex(&ctx, vertex) {
                incidence?;
                counts.incidences += 1;
            }
        }
        for edge in db.edges(&ctx) {
            edge?;
            counts.edges += 1;
        }
        *view.counts.lock() = counts;
        let listener: Arc<dyn GraphListener> = view.clone();
        db.add_listener(Arc::downgrade(&listener));
        debug!(threshold, vertices = counts.vertices, edges = counts.edges, "view.created");
        Ok(view)
    }

    /// Lowest kappa still visible.
    pub fn threshold(&self) -> i32 {
        self.threshold
    }

    /// Scope this view filters.
    pub fn wrapped(&self) -> &GraphScope {
        &self.wrapped
    }

    /// Database the view reads from.
    pub fn database(&self) -> &GraphDatabase {
        &self.db
    }

    /// Scope handle for traversal contexts.
    pub fn scope(self: &Arc<Self>) -> GraphScope {
        GraphScope::View(Arc::clone(self))
    }

    /// Returns true when the element is visible.
    pub fn contains_element(&self, kind: ElementKind, id: GlobalId) -> Result<bool> {
        let info = self.db.element_info(kind, id)?;
        if info.kappa < self.threshold {
            return Ok(false);
        }
        self.wrapped.contains_element(&self.db, kind, id)
    }

    /// Returns true when the vertex is visible.
    pub fn contains_vertex(&self, vertex: VertexId) -> Result<bool> {
        self.contains_element(ElementKind::Vertex, vertex.global())
    }

    /// Returns true when the edge is visible.
    pub fn contains_edge(&self, edge: EdgeId) -> Result<bool> {
        self.contains_element(ElementKind::Edge, edge.global())
    }

    /// Returns true when both ends of the incidence are visible.
    pub fn contains_incidence(&self, incidence: IncidenceId) -> Result<bool> {
        let info = self.db.incidence_info(incidence)?;
        Ok(self.contains_element(ElementKind::Vertex, info.vertex)?
            && self.contains_element(ElementKind::Edge, info.edge)?)
    }

    /// Visible vertices.
    pub fn vertex_count(&self) -> u64 {
        self.counts.lock().vertices
    }

    /// Visible edges.
    pub fn edge_count(&self) -> u64 {
        self.counts.lock().edges
    }

    /// Visible incidences.
    pub fn incidence_count(&self) -> u64 {
        self.counts.lock().incidences
    }

    fn context(self: &Arc<Self>) -> TraversalContext {
        TraversalContext::with_scope(self.scope())
    }

    /// First visible vertex of the global sequence.
    pub fn first_vertex(self: &Arc<Self>) -> Result<Option<VertexId>> {
        self.db.first_vertex(&self.context())
    }

    /// Last visible vertex of the global sequence.
    pub fn last_vertex(self: &Arc<Self>) -> Result<Option<VertexId>> {
        self.db.last_vertex(&self.context())
    }

    /// First visible edge of the global sequence.
    pub fn first_edge(self: &Arc<Self>) -> Result<Option<EdgeId>> {
        self.db.first_edge(&self.context())
    }

    /// Last visible edge of the global sequence.
    pub fn last_edge(self: &Arc<Self>) -> Result<Option<EdgeId>> {
        self.db.last_edge(&self.context())
    }

    /// Schema of the underlying database.
    pub fn schema(&self) -> &Schema {
        self.db.schema()
    }

    /// Creates a vertex in the underlying database. It shows up in the view
    /// only when it passes the threshold and the wrapped scope.
    pub fn create_vertex(&self, spec: ElementSpec) -> Result<VertexId> {
        self.db.create_vertex(spec)
    }

    /// Creates an edge in the underlying database.
    pub fn create_edge(&self, spec: ElementSpec) -> Result<EdgeId> {
        self.db.create_edge(spec)
    }

    /// Links `vertex` and `edge` in the underlying database.
    pub fn connect(&self, ty: TypeId, vertex: VertexId, edge: EdgeId) -> Result<IncidenceId> {
        self.db.connect(ty, vertex, edge)
    }

    /// Deletes a vertex, cascading as [`GraphDatabase::delete_vertex`] does.
    pub fn delete_vertex(&self, vertex: VertexId) -> Result<()> {
        self.db.delete_vertex(vertex)
    }

    /// Deletes an edge.
    pub fn delete_edge(&self, edge: EdgeId) -> Result<()> {
        self.db.delete_edge(edge)
    }

    /// Reads a vertex attribute by name.
    pub fn get_vertex_attribute(&self, vertex: VertexId, name: &str) -> Result<AttrValue> {
        self.db.get_vertex_attribute(vertex, name)
    }

    /// Writes a vertex attribute by name.
    pub fn set_vertex_attribute(&self, vertex: VertexId, name: &str, value: AttrValue) -> Result<()> {
        self.db.set_vertex_attribute(vertex, name, value)
    }

    /// Reads an edge attribute by name.
    pub fn get_edge_attribute(&self, edge: EdgeId, name: &str) -> Result<AttrValue> {
        self.db.get_edge_attribute(edge, name)
    }

    /// Writes an edge attribute by name.
    pub fn set_edge_attribute(&self, edge: EdgeId, name: &str, value: AttrValue) -> Result<()> {
        self.db.set_edge_attribute(edge, name, value)
    }

    fn track(&self, outcome: Result<bool>, pick: fn(&mut ViewCounts) -> &mut u64, up: bool) {
        match outcome {
            Ok(true) => ViewCounts::shift(pick(&mut self.counts.lock()), up),
            Ok(false) => {}
            Err(err) => warn!(error = %err, "view.count.skipped"),
        }
    }
}

impl GraphListener for ViewGraph {
    fn vertex_added(&self, vertex: VertexId) {
        self.track(self.contains_vertex(vertex), |c| &mut c.vertices, true);
    }

    fn vertex_deleted(&self, vertex: VertexId) {
        self.track(self.contains_vertex(vertex), |c| &mut c.vertices, false);
    }

    fn edge_added(&self, edge: EdgeId) {
        self.track(self.contains_edge(edge), |c| &mut c.edges, true);
    }

    fn edge_deleted(&self, edge: EdgeId) {
        self.track(self.contains_edge(edge), |c| &mut c.edges, false);
    }

    fn incidence_added(&self, incidence: IncidenceId) {
        self.track(self.contains_incidence(incidence), |c| &mut c.incidences, true);
    }

    fn incidence_deleted(&self, incidence: IncidenceId) {
        self.track(self.contains_incidence(incidence), |c| &mut c.incidences, false);
    }
}
