use super::sequence::SequenceKind;
use super::GraphDatabase;
use crate::db::view::GraphScope;
use crate::storage::ElementKind;
use crate::types::{EdgeId, GlobalId, IncidenceId, Result, VertexId};

/// Per-caller stack of graph scopes.
///
/// Navigation only reports elements of the scope on top of the stack; an
/// empty stack means the complete graph.
#[derive(Clone, Debug, Default)]
pub struct TraversalContext {
    stack: Vec<GraphScope>,
}

impl TraversalContext {
    /// Context traversing the complete graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context with `scope` already pushed.
    pub fn with_scope(scope: GraphScope) -> Self {
        Self { stack: vec![scope] }
    }

    /// Scope navigation is currently restricted to.
    pub fn current(&self) -> GraphScope {
        self.stack.last().cloned().unwrap_or_default()
    }

    /// Enters `scope`.
    pub fn set(&mut self, scope: GraphScope) {
        self.stack.push(scope);
    }

    /// Leaves the current scope and returns it.
    pub fn release(&mut self) -> Option<GraphScope> {
        self.stack.pop()
    }

    /// Number of pushed scopes.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

impl GraphDatabase {
    fn member_in_scope(&self, scope: &GraphScope, seq: SequenceKind, id: GlobalId) -> Result<bool> {
        match seq {
            SequenceKind::Vertices => scope.contains_element(self, ElementKind::Vertex, id),
            SequenceKind::Edges => scope.contains_element(self, ElementKind::Edge, id),
            SequenceKind::AtVertex(_) | SequenceKind::AtEdge(_) => {
                scope.contains_incidence(self, IncidenceId(id))
            }
        }
    }

    /// First member of `seq` at or beyond `from` (in the given direction)
    /// that belongs to `scope`.
    fn seek(&self, scope: &GraphScope, seq: SequenceKind, from: GlobalId, forward: bool) -> Result<Option<GlobalId>> {
        let mut cursor = from;
        while let Some(current) = cursor.non_null() {
            if self.member_in_scope(scope, seq, current)? {
                return Ok(Some(current));
            }
            cursor = self.seq_step(seq, current, forward)?;
        }
        Ok(None)
    }

    fn seek_end(&self, ctx: &TraversalContext, seq: SequenceKind, forward: bool) -> Result<Option<GlobalId>> {
        let start = if forward {
            self.seq_head(seq)?
        } else {
            self.seq_tail(seq)?
        };
        self.seek(&ctx.current(), seq, start, forward)
    }

    fn seek_from(
        &self,
        ctx: &TraversalContext,
        seq: SequenceKind,
        member: GlobalId,
        forward: bool,
    ) -> Result<Option<GlobalId>> {
        let start = self.seq_step(seq, member, forward)?;
        self.seek(&ctx.current(), seq, start, forward)
    }

    /// First vertex of the global sequence in the current scope.
    pub fn first_vertex(&self, ctx: &TraversalContext) -> Result<Option<VertexId>> {
        Ok(self.seek_end(ctx, SequenceKind::Vertices, true)?.map(VertexId))
    }

    /// Last vertex of the global sequence in the current scope.
    pub fn last_vertex(&self, ctx: &TraversalContext) -> Result<Option<VertexId>> {
        Ok(self.seek_end(ctx, SequenceKind::Vertices, false)?.map(VertexId))
    }

    /// Vertex following `vertex` in the current scope.
    pub fn next_vertex(&self, ctx: &TraversalContext, vertex: VertexId) -> Result<Option<VertexId>> {
        Ok(self
            .seek_from(ctx, SequenceKind::Vertices, vertex.global(), true)?
            .map(VertexId))
    }

    /// Vertex preceding `vertex` in the current scope.
    pub fn prev_vertex(&self, ctx: &TraversalContext, vertex: VertexId) -> Result<Option<VertexId>> {
        Ok(self
            .seek_from(ctx, SequenceKind::Vertices, vertex.global(), false)?
            .map(VertexId))
    }

    /// First edge of the global sequence in the current scope.
    pub fn first_edge(&self, ctx: &TraversalContext) -> Result<Option<EdgeId>> {
        Ok(self.seek_end(ctx, SequenceKind::Edges, true)?.map(EdgeId))
    }

    /// Last edge of the global sequence in the current scope.
    pub fn last_edge(&self, ctx: &TraversalContext) -> Result<Option<EdgeId>> {
        Ok(self.seek_end(ctx, SequenceKind::Edges, false)?.map(EdgeId))
    }

    /// Edge following `edge` in the current scope.
    pub fn next_edge(&self, ctx: &TraversalContext, edge: EdgeId) -> Result<Option<EdgeId>> {
        Ok(self
            .seek_from(ctx, SequenceKind::Edges, edge.global(), true)?
            .map(EdgeId))
    }

    /// Edge preceding `edge` in the current scope.
    pub fn prev_edge(&self, ctx: &TraversalContext, edge: EdgeId) -> Result<Option<EdgeId>> {
        Ok(self
            .seek_from(ctx, SequenceKind::Edges, edge.global(), false)?
            .map(EdgeId))
    }

    /// First incidence of `vertex`.
    pub fn first_incidence_at_vertex(&self, ctx: &TraversalContext, vertex: VertexId) -> Result<Option<IncidenceId>> {
        Ok(self
            .seek_end(ctx, SequenceKind::AtVertex(vertex), true)?
            .map(IncidenceId))
    }

    /// Last incidence of `vertex`.
    pub fn last_incidence_at_vertex(&self, ctx: &TraversalContext, vertex: VertexId) -> Result<Option<IncidenceId>> {
        Ok(self
            .seek_end(ctx, SequenceKind::AtVertex(vertex), false)?
            .map(IncidenceId))
    }

    /// Incidence following `incidence` at its vertex.
    pub fn next_incidence_at_vertex(&self, ctx: &TraversalContext, incidence: IncidenceId) -> Result<Option<IncidenceId>> {
        let vertex = VertexId(self.incidence_info(incidence)?.vertex);
        Ok(self
            .seek_from(ctx, SequenceKind::AtVertex(vertex), incidence.global(), true)?
            .map(IncidenceId))
    }

    /// Incidence preceding `incidence` at its vertex.
    pub fn prev_incidence_at_vertex(&self, ctx: &TraversalContext, incidence: IncidenceId) -> Result<Option<IncidenceId>> {
        let vertex = VertexId(self.incidence_info(incidence)?.vertex);
        Ok(self
            .seek_from(ctx, SequenceKind::AtVertex(vertex), incidence.global(), false)?
            .map(IncidenceId))
    }

    /// First incidence of `edge`.
    pub fn first_incidence_at_edge(&self, ctx: &TraversalContext, edge: EdgeId) -> Result<Option<IncidenceId>> {
        Ok(self
            .seek_end(ctx, SequenceKind::AtEdge(edge), true)?
            .map(IncidenceId))
    }

    /// Last incidence of `edge`.
    pub fn last_incidence_at_edge(&self, ctx: &TraversalContext, edge: EdgeId) -> Result<Option<IncidenceId>> {
        Ok(self
            .seek_end(ctx, SequenceKind::AtEdge(edge), false)?
            .map(IncidenceId))
    }

    /// Incidence following `incidence` at its edge.
    pub fn next_incidence_at_edge(&self, ctx: &TraversalContext, incidence: IncidenceId) -> Result<Option<IncidenceId>> {
        let edge = EdgeId(self.incidence_info(incidence)?.edge);
        Ok(self
            .seek_from(ctx, SequenceKind::AtEdge(edge), incidence.global(), true)?
            .map(IncidenceId))
    }

    /// Incidence preceding `incidence` at its edge.
    pub fn prev_incidence_at_edge(&self, ctx: &TraversalContext, incidence: IncidenceId) -> Result<Option<IncidenceId>> {
        let edge = EdgeId(self.incidence_info(incidence)?.edge);
        Ok(self
            .seek_from(ctx, SequenceKind::AtEdge(edge), incidence.global(), false)?
            .map(IncidenceId))
    }

    /// Walks `seq` in the context's current scope.
    pub fn sequence<'a>(&'a self, ctx: &TraversalContext, seq: SequenceKind, forward: bool) -> SequenceIter<'a> {
        SequenceIter {
            db: self,
            scope: ctx.current(),
            seq,
            forward,
            state: IterState::Start,
        }
    }

    /// Vertices in global order.
    pub fn vertices<'a>(&'a self, ctx: &TraversalContext) -> impl Iterator<Item = Result<VertexId>> + 'a {
        self.sequence(ctx, SequenceKind::Vertices, true)
            .map(|id| id.map(VertexId))
    }

    /// Edges in global order.
    pub fn edges<'a>(&'a self, ctx: &TraversalContext) -> impl Iterator<Item = Result<EdgeId>> + 'a {
        self.sequence(ctx, SequenceKind::Edges, true)
            .map(|id| id.map(EdgeId))
    }

    /// Incidences of `vertex` in lambda order.
    pub fn incidences_at_vertex<'a>(
        &'a self,
        ctx: &TraversalContext,
        vertex: VertexId,
    ) -> impl Iterator<Item = Result<IncidenceId>> + 'a {
        self.sequence(ctx, SequenceKind::AtVertex(vertex), true)
            .map(|id| id.map(IncidenceId))
    }

    /// Incidences of `edge` in lambda order.
    pub fn incidences_at_edge<'a>(
        &'a self,
        ctx: &TraversalContext,
        edge: EdgeId,
    ) -> impl Iterator<Item = Result<IncidenceId>> + 'a {
        self.sequence(ctx, SequenceKind::AtEdge(edge), true)
            .map(|id| id.map(IncidenceId))
    }
}

enum IterState {
    Start,
    At(GlobalId),
    Done,
}

/// Lazy walk over one sequence, restricted to a scope.
///
/// Each step is one routed lookup; the first error ends the walk.
pub struct SequenceIter<'a> {
    db: &'a GraphDatabase,
    scope: GraphScope,
    seq: SequenceKind,
    forward: bool,
    state: IterState,
}

impl SequenceIter<'_> {
    fn advance(&mut self) -> Result<Option<GlobalId>> {
        let start = match self.state {
            IterState::Done => return Ok(None),
            IterState::Start if self.forward => self.db.seq_head(self.seq)?,
            IterState::Start => self.db.seq_tail(self.seq)?,
            IterState::At(current) => self.db.seq_step(self.seq, current, self.forward)?,
        };
        self.db.seek(&self.scope, self.seq, start, self.forward)
    }
}

impl Iterator for SequenceIter<'_> {
    type Item = Result<GlobalId>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.advance() {
            Ok(Some(id)) => {
                self.state = IterState::At(id);
                Some(Ok(id))
            }
            Ok(None) => {
                self.state = IterState::Done;
                None
            }
            Err(err) => {
                self.state = IterState::Done;
                Some(Err(err))
            }
        }
    }
}
