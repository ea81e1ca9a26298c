use crate::types::{EdgeId, IncidenceId, VertexId};

/// Structural change notifications.
///
/// Listeners are called after the database released every lock, on the
/// thread that performed the change. Deletions are reported before the
/// element is unlinked, so it can still be inspected. Nothing is reported
/// while bulk loading.
pub trait GraphListener: Send + Sync {
    /// A vertex was created.
    fn vertex_added(&self, _vertex: VertexId) {}

    /// A vertex is about to be deleted.
    fn vertex_deleted(&self, _vertex: VertexId) {}

    /// An edge was created.
    fn edge_added(&self, _edge: EdgeId) {}

    /// An edge is about to be deleted.
    fn edge_deleted(&self, _edge: EdgeId) {}

    /// A vertex and an edge were connected.
    fn incidence_added(&self, _incidence: IncidenceId) {}

    /// An incidence is about to be removed.
    fn incidence_deleted(&self, _incidence: IncidenceId) {}
}
