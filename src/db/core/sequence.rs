//! Doubly linked sequences spread over partial graphs.
//!
//! The global vertex and edge sequences are anchored in the complete graph's
//! metadata entry; every vertex and edge anchors one lambda sequence of its
//! incidences. Members may live on any host, so every step below is one
//! routed primitive and the algorithms themselves run at the caller.

use tracing::trace;

use super::GraphDatabase;
use crate::db::access::{ElementLink, IncidenceLink};
use crate::db::graph_data::{GraphDataUpdate, COMPLETE_GRAPH};
use crate::storage::ElementKind;
use crate::types::{EdgeId, GlobalId, GraphError, IncidenceId, Result, VertexId};

/// One linked sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SequenceKind {
    /// Global vertex order.
    Vertices,
    /// Global edge order.
    Edges,
    /// Incidences of one vertex.
    AtVertex(VertexId),
    /// Incidences of one edge.
    AtEdge(EdgeId),
}

enum Anchor {
    /// Heads live in the complete graph's metadata.
    Graph(ElementKind),
    /// Heads live on an element.
    Element(ElementKind, GlobalId),
}

impl SequenceKind {
    fn anchor(self) -> Anchor {
        match self {
            SequenceKind::Vertices => Anchor::Graph(ElementKind::Vertex),
            SequenceKind::Edges => Anchor::Graph(ElementKind::Edge),
            SequenceKind::AtVertex(v) => Anchor::Element(ElementKind::Vertex, v.global()),
            SequenceKind::AtEdge(e) => Anchor::Element(ElementKind::Edge, e.global()),
        }
    }
}

fn member_kind(seq: SequenceKind) -> ElementKind {
    match seq {
        SequenceKind::Edges => ElementKind::Edge,
        _ => ElementKind::Vertex,
    }
}

#[derive(Clone, Copy)]
enum End {
    Head,
    Tail,
}

impl GraphDatabase {
    fn seq_end(&self, seq: SequenceKind, end: End) -> Result<GlobalId> {
        match seq.anchor() {
            Anchor::Graph(kind) => {
                let data = self.router().complete_graph()?.graph_data(COMPLETE_GRAPH)?;
                Ok(match end {
                    End::Head => data.first(kind),
                    End::Tail => data.last(kind),
                })
            }
            Anchor::Element(kind, owner) => {
                let info = self.router().route(owner)?.element_info(kind, owner)?;
                Ok(match end {
                    End::Head => info.first_incidence,
                    End::Tail => info.last_incidence,
                })
            }
        }
    }

    fn seq_set_end(&self, seq: SequenceKind, end: End, value: GlobalId) -> Result<()> {
        match seq.anchor() {
            Anchor::Graph(kind) => {
                let update = match end {
                    End::Head => GraphDataUpdate::First(kind, value),
                    End::Tail => GraphDataUpdate::Last(kind, value),
                };
                self.router()
                    .complete_graph()?
                    .update_graph_data(COMPLETE_GRAPH, update)?;
                Ok(())
            }
            Anchor::Element(kind, owner) => {
                let link = match end {
                    End::Head => ElementLink::FirstIncidence,
                    End::Tail => ElementLink::LastIncidence,
                };
                self.router()
                    .route(owner)?
                    .set_element_link(kind, owner, link, value)
            }
        }
    }

    pub(crate) fn seq_head(&self, seq: SequenceKind) -> Result<GlobalId> {
        self.seq_end(seq, End::Head)
    }

    pub(crate) fn seq_tail(&self, seq: SequenceKind) -> Result<GlobalId> {
        self.seq_end(seq, End::Tail)
    }

    /// Successor (`forward`) or predecessor of `member`.
    pub(crate) fn seq_step(&self, seq: SequenceKind, member: GlobalId, forward: bool) -> Result<GlobalId> {
        let host = self.router().route(member)?;
        match seq {
            SequenceKind::Vertices | SequenceKind::Edges => {
                let kind = member_kind(seq);
                let info = host.element_info(kind, member)?;
                Ok(if forward { info.next } else { info.prev })
            }
            SequenceKind::AtVertex(_) => {
                let info = host.incidence_info(member)?;
                Ok(if forward {
                    info.next_at_vertex
                } else {
                    info.prev_at_vertex
                })
            }
            SequenceKind::AtEdge(_) => {
                let info = host.incidence_info(member)?;
                Ok(if forward {
                    info.next_at_edge
                } else {
                    info.prev_at_edge
                })
            }
        }
    }

    fn seq_set_link(&self, seq: SequenceKind, member: GlobalId, forward: bool, value: GlobalId) -> Result<()> {
        let host = self.router().route(member)?;
        match seq {
            SequenceKind::Vertices | SequenceKind::Edges => {
                let kind = member_kind(seq);
                let link = if forward { ElementLink::Next } else { ElementLink::Prev };
                host.set_element_link(kind, member, link, value)
            }
            SequenceKind::AtVertex(_) => {
                let link = if forward {
                    IncidenceLink::NextAtVertex
                } else {
                    IncidenceLink::PrevAtVertex
                };
                host.set_incidence_link(member, link, value)
            }
            SequenceKind::AtEdge(_) => {
                let link = if forward {
                    IncidenceLink::NextAtEdge
                } else {
                    IncidenceLink::PrevAtEdge
                };
                host.set_incidence_link(member, link, value)
            }
        }
    }

    /// Bumps the version owning `seq`.
    pub(crate) fn seq_bump(&self, seq: SequenceKind) -> Result<()> {
        match seq.anchor() {
            Anchor::Graph(kind) => {
                self.router()
                    .complete_graph()?
                    .update_graph_data(COMPLETE_GRAPH, GraphDataUpdate::BumpVersion(kind))?;
            }
            Anchor::Element(kind, owner) => {
                self.router()
                    .route(owner)?
                    .bump_incidence_list_version(kind, owner)?;
            }
        }
        Ok(())
    }

    /// Links `member` at the tail of `seq`.
    pub(crate) fn seq_append(&self, seq: SequenceKind, member: GlobalId) -> Result<()> {
        let tail = self.seq_tail(seq)?;
        self.seq_set_link(seq, member, false, tail)?;
        self.seq_set_link(seq, member, true, GlobalId::NONE)?;
        if tail.is_none() {
            self.seq_set_end(seq, End::Head, member)?;
        } else {
            self.seq_set_link(seq, tail, true, member)?;
        }
        self.seq_set_end(seq, End::Tail, member)?;
        trace!(?seq, member = %member, "sequence.appended");
        Ok(())
    }

    /// Takes `member` out of `seq`, leaving its own links cleared.
    pub(crate) fn seq_unlink(&self, seq: SequenceKind, member: GlobalId) -> Result<()> {
        let prev = self.seq_step(seq, member, false)?;
        let next = self.seq_step(seq, member, true)?;
        if prev.is_none() {
            debug_assert_eq!(self.seq_head(seq)?, member, "{seq:?} head out of sync");
            self.seq_set_end(seq, End::Head, next)?;
        } else {
            self.seq_set_link(seq, prev, true, next)?;
        }
        if next.is_none() {
            debug_assert_eq!(self.seq_tail(seq)?, member, "{seq:?} tail out of sync");
            self.seq_set_end(seq, End::Tail, prev)?;
        } else {
            self.seq_set_link(seq, next, false, prev)?;
        }
        self.seq_set_link(seq, member, true, GlobalId::NONE)?;
        self.seq_set_link(seq, member, false, GlobalId::NONE)?;
        trace!(?seq, member = %member, "sequence.unlinked");
        Ok(())
    }

    fn seq_link_beside(&self, seq: SequenceKind, moved: GlobalId, target: GlobalId, before: bool) -> Result<()> {
        // Links `moved` on the `before` side of `target`; the neighbour on
        // that side (or the sequence end) is re-pointed at `moved`.
        let outer = self.seq_step(seq, target, !before)?;
        self.seq_set_link(seq, moved, !before, outer)?;
        self.seq_set_link(seq, moved, before, target)?;
        self.seq_set_link(seq, target, !before, moved)?;
        if outer.is_none() {
            let end = if before { End::Head } else { End::Tail };
            self.seq_set_end(seq, end, moved)
        } else {
            self.seq_set_link(seq, outer, before, moved)
        }
    }

    /// Moves `moved` directly before (`before`) or after `target`.
    pub(crate) fn seq_move(&self, seq: SequenceKind, moved: GlobalId, target: GlobalId, before: bool) -> Result<()> {
        if moved == target {
            return Ok(());
        }
        let neighbour = self.seq_step(seq, moved, before)?;
        if neighbour == target {
            return Ok(());
        }
        self.seq_unlink(seq, moved)?;
        self.seq_link_beside(seq, moved, target, before)?;
        self.seq_bump(seq)
    }

    /// Places `moved` directly before `target` in the global vertex sequence.
    pub fn put_vertex_before(&self, moved: VertexId, target: VertexId) -> Result<()> {
        self.seq_move(SequenceKind::Vertices, moved.global(), target.global(), true)
    }

    /// Places `moved` directly after `target` in the global vertex sequence.
    pub fn put_vertex_after(&self, moved: VertexId, target: VertexId) -> Result<()> {
        self.seq_move(SequenceKind::Vertices, moved.global(), target.global(), false)
    }

    /// Places `moved` directly before `target` in the global edge sequence.
    pub fn put_edge_before(&self, moved: EdgeId, target: EdgeId) -> Result<()> {
        self.seq_move(SequenceKind::Edges, moved.global(), target.global(), true)
    }

    /// Places `moved` directly after `target` in the global edge sequence.
    pub fn put_edge_after(&self, moved: EdgeId, target: EdgeId) -> Result<()> {
        self.seq_move(SequenceKind::Edges, moved.global(), target.global(), false)
    }

    fn shared_vertex(&self, moved: IncidenceId, target: IncidenceId) -> Result<VertexId> {
        let a = self.incidence_info(moved)?.vertex;
        let b = self.incidence_info(target)?.vertex;
        if a != b {
            return Err(GraphError::Invalid(
                "incidences belong to different vertices",
            ));
        }
        Ok(VertexId(a))
    }

    fn shared_edge(&self, moved: IncidenceId, target: IncidenceId) -> Result<EdgeId> {
        let a = self.incidence_info(moved)?.edge;
        let b = self.incidence_info(target)?.edge;
        if a != b {
            return Err(GraphError::Invalid(
                "incidences belong to different edges",
            ));
        }
        Ok(EdgeId(a))
    }

    /// Reorders the lambda sequence of the shared vertex.
    pub fn put_incidence_before_at_vertex(&self, moved: IncidenceId, target: IncidenceId) -> Result<()> {
        let vertex = self.shared_vertex(moved, target)?;
        self.seq_move(SequenceKind::AtVertex(vertex), moved.global(), target.global(), true)
    }

    /// Reorders the lambda sequence of the shared vertex.
    pub fn put_incidence_after_at_vertex(&self, moved: IncidenceId, target: IncidenceId) -> Result<()> {
        let vertex = self.shared_vertex(moved, target)?;
        self.seq_move(SequenceKind::AtVertex(vertex), moved.global(), target.global(), false)
    }

    /// Reorders the lambda sequence of the shared edge.
    pub fn put_incidence_before_at_edge(&self, moved: IncidenceId, target: IncidenceId) -> Result<()> {
        let edge = self.shared_edge(moved, target)?;
        self.seq_move(SequenceKind::AtEdge(edge), moved.global(), target.global(), true)
    }

    /// Reorders the lambda sequence of the shared edge.
    pub fn put_incidence_after_at_edge(&self, moved: IncidenceId, target: IncidenceId) -> Result<()> {
        let edge = self.shared_edge(moved, target)?;
        self.seq_move(SequenceKind::AtEdge(edge), moved.global(), target.global(), false)
    }
}
