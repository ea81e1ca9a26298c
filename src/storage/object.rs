//! Live vertex, edge and incidence objects.
//!
//! Every setter updates the field and writes the same value through to the
//! object's [`Tracker`], creating the tracker from a full scalar snapshot the
//! first time the object is touched after a load or flush.

use super::profile::ElementProfile;
use super::tracker::{element as el, incidence as inc, Tracker};
use super::tracker::{ELEMENT_RECORD_LEN, INCIDENCE_RECORD_LEN};
use super::types::{AttrValue, ElementInfo, ElementKind, IncidenceInfo};
use crate::primitives::bytes::fixed;
use crate::types::{GlobalId, GraphError, Result, Sigma, TypeId};

/// Resident vertex or edge.
#[derive(Clone, Debug)]
pub struct ElementObject {
    kind: ElementKind,
    ty: TypeId,
    next: GlobalId,
    prev: GlobalId,
    first_incidence: GlobalId,
    last_incidence: GlobalId,
    incidence_list_version: i64,
    sigma: Sigma,
    subordinate_graph: GlobalId,
    kappa: i32,
    attributes: Vec<AttrValue>,
    tracker: Option<Tracker>,
}

impl ElementObject {
    /// Fresh element carrying its profile's default attributes. The new
    /// object is dirty from the start.
    pub fn new(kind: ElementKind, profile: &ElementProfile, sigma: Sigma, kappa: i32) -> Self {
        let mut object = Self {
            kind,
            ty: profile.type_id(),
            next: GlobalId::NONE,
            prev: GlobalId::NONE,
            first_incidence: GlobalId::NONE,
            last_incidence: GlobalId::NONE,
            incidence_list_version: 0,
            sigma,
            subordinate_graph: GlobalId::NONE,
            kappa,
            attributes: profile.defaults(),
            tracker: None,
        };
        object.tracker_mut();
        object
    }

    /// Rebuilds a clean object from a stored record and attribute values.
    pub fn from_record(kind: ElementKind, record: &[u8], attributes: Vec<AttrValue>) -> Result<Self> {
        if record.len() != ELEMENT_RECORD_LEN {
            return Err(GraphError::Corruption("element record has wrong length"));
        }
        let id = |off| GlobalId::from_raw(fixed::get_i64(record, off));
        Ok(Self {
            kind,
            ty: TypeId(fixed::get_u32(record, el::TYPE)),
            next: id(el::NEXT)?,
            prev: id(el::PREV)?,
            first_incidence: id(el::FIRST_INCIDENCE)?,
            last_incidence: id(el::LAST_INCIDENCE)?,
            incidence_list_version: fixed::get_i64(record, el::INCIDENCE_LIST_VERSION),
            sigma: Sigma::from_raw(fixed::get_i64(record, el::SIGMA)),
            subordinate_graph: id(el::SUBORDINATE_GRAPH)?,
            kappa: fixed::get_i32(record, el::KAPPA),
            attributes,
            tracker: None,
        })
    }

    fn tracker_mut(&mut self) -> &mut Tracker {
        if self.tracker.is_none() {
            let mut seeded = Tracker::element();
            seeded.put_i64(el::NEXT, self.next.to_raw());
            seeded.put_i64(el::PREV, self.prev.to_raw());
            seeded.put_i64(el::FIRST_INCIDENCE, self.first_incidence.to_raw());
            seeded.put_i64(el::LAST_INCIDENCE, self.last_incidence.to_raw());
            seeded.put_i64(el::INCIDENCE_LIST_VERSION, self.incidence_list_version);
            seeded.put_i64(el::SIGMA, self.sigma.to_raw());
            seeded.put_i64(el::SUBORDINATE_GRAPH, self.subordinate_graph.to_raw());
            seeded.put_i32(el::KAPPA, self.kappa);
            seeded.put_u32(el::TYPE, self.ty.0);
            self.tracker = Some(seeded);
        }
        self.tracker.get_or_insert_with(Tracker::element)
    }

    /// Vertex or edge.
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Schema type.
    pub fn ty(&self) -> TypeId {
        self.ty
    }

    /// Next element in the global sequence.
    pub fn next(&self) -> GlobalId {
        self.next
    }

    /// Previous element in the global sequence.
    pub fn prev(&self) -> GlobalId {
        self.prev
    }

    /// Head of the lambda sequence.
    pub fn first_incidence(&self) -> GlobalId {
        self.first_incidence
    }

    /// Tail of the lambda sequence.
    pub fn last_incidence(&self) -> GlobalId {
        self.last_incidence
    }

    /// Lambda sequence version.
    pub fn incidence_list_version(&self) -> i64 {
        self.incidence_list_version
    }

    /// Containing element.
    pub fn sigma(&self) -> Sigma {
        self.sigma
    }

    /// Subordinate graph id, 0 if none.
    pub fn subordinate_graph(&self) -> GlobalId {
        self.subordinate_graph
    }

    /// Visibility level.
    pub fn kappa(&self) -> i32 {
        self.kappa
    }

    /// Attribute values in profile order.
    pub fn attributes(&self) -> &[AttrValue] {
        &self.attributes
    }

    /// Sets the next element in the global sequence.
    pub fn set_next(&mut self, id: GlobalId) {
        self.next = id;
        self.tracker_mut().put_i64(el::NEXT, id.to_raw());
    }

    /// Sets the previous element in the global sequence.
    pub fn set_prev(&mut self, id: GlobalId) {
        self.prev = id;
        self.tracker_mut().put_i64(el::PREV, id.to_raw());
    }

    /// Sets the lambda sequence head.
    pub fn set_first_incidence(&mut self, id: GlobalId) {
        self.first_incidence = id;
        self.tracker_mut().put_i64(el::FIRST_INCIDENCE, id.to_raw());
    }

    /// Sets the lambda sequence tail.
    pub fn set_last_incidence(&mut self, id: GlobalId) {
        self.last_incidence = id;
        self.tracker_mut().put_i64(el::LAST_INCIDENCE, id.to_raw());
    }

    /// Sets the lambda sequence version.
    pub fn set_incidence_list_version(&mut self, version: i64) {
        self.incidence_list_version = version;
        self.tracker_mut()
            .put_i64(el::INCIDENCE_LIST_VERSION, version);
    }

    /// Bumps the lambda sequence version by one.
    pub fn bump_incidence_list_version(&mut self) -> i64 {
        let version = self.incidence_list_version + 1;
        self.set_incidence_list_version(version);
        version
    }

    /// Sets the containing element.
    pub fn set_sigma(&mut self, sigma: Sigma) {
        self.sigma = sigma;
        self.tracker_mut().put_i64(el::SIGMA, sigma.to_raw());
    }

    /// Sets the owned subordinate graph.
    pub fn set_subordinate_graph(&mut self, id: GlobalId) {
        self.subordinate_graph = id;
        self.tracker_mut().put_i64(el::SUBORDINATE_GRAPH, id.to_raw());
    }

    /// Sets the visibility level.
    pub fn set_kappa(&mut self, kappa: i32) {
        self.kappa = kappa;
        self.tracker_mut().put_i32(el::KAPPA, kappa);
    }

    /// Sets one attribute and refreshes the tracker's attribute snapshot.
    pub fn set_attribute(
        &mut self,
        profile: &ElementProfile,
        index: usize,
        value: AttrValue,
    ) -> Result<()> {
        profile.check(index, &value)?;
        self.attributes[index] = value;
        let blob = profile.snapshot(&self.attributes)?;
        self.tracker_mut().set_attributes(blob);
        Ok(())
    }

    /// Returns true when unflushed changes exist.
    pub fn is_dirty(&self) -> bool {
        self.tracker.is_some()
    }

    /// Pending changes, if any.
    pub fn tracker(&self) -> Option<&Tracker> {
        self.tracker.as_ref()
    }

    /// Detaches the pending changes for write-back.
    pub fn take_tracker(&mut self) -> Option<Tracker> {
        self.tracker.take()
    }

    /// Scalar snapshot.
    pub fn info(&self) -> ElementInfo {
        ElementInfo {
            kind: self.kind,
            ty: self.ty,
            next: self.next,
            prev: self.prev,
            first_incidence: self.first_incidence,
            last_incidence: self.last_incidence,
            incidence_list_version: self.incidence_list_version,
            sigma: self.sigma,
            kappa: self.kappa,
            subordinate_graph: self.subordinate_graph,
        }
    }
}

/// Resident incidence.
#[derive(Clone, Debug)]
pub struct IncidenceObject {
    ty: TypeId,
    vertex: GlobalId,
    edge: GlobalId,
    next_at_vertex: GlobalId,
    prev_at_vertex: GlobalId,
    next_at_edge: GlobalId,
    prev_at_edge: GlobalId,
    tracker: Option<Tracker>,
}

impl IncidenceObject {
    /// Fresh, unlinked incidence. Dirty from the start.
    pub fn new(ty: TypeId, vertex: GlobalId, edge: GlobalId) -> Self {
        let mut object = Self {
            ty,
            vertex,
            edge,
            next_at_vertex: GlobalId::NONE,
            prev_at_vertex: GlobalId::NONE,
            next_at_edge: GlobalId::NONE,
            prev_at_edge: GlobalId::NONE,
            tracker: None,
        };
        object.tracker_mut();
        object
    }

    /// Rebuilds a clean incidence from its stored record.
    pub fn from_record(record: &[u8]) -> Result<Self> {
        if record.len() != INCIDENCE_RECORD_LEN {
            return Err(GraphError::Corruption("incidence record has wrong length"));
        }
        let id = |off| GlobalId::from_raw(fixed::get_i64(record, off));
        Ok(Self {
            ty: TypeId(fixed::get_u32(record, inc::TYPE)),
            vertex: id(inc::VERTEX)?,
            edge: id(inc::EDGE)?,
            next_at_vertex: id(inc::NEXT_AT_VERTEX)?,
            prev_at_vertex: id(inc::PREV_AT_VERTEX)?,
            next_at_edge: id(inc::NEXT_AT_EDGE)?,
            prev_at_edge: id(inc::PREV_AT_EDGE)?,
            tracker: None,
        })
    }

    fn tracker_mut(&mut self) -> &mut Tracker {
        if self.tracker.is_none() {
            let mut seeded = Tracker::incidence();
            seeded.put_i64(inc::NEXT_AT_EDGE, self.next_at_edge.to_raw());
            seeded.put_i64(inc::PREV_AT_EDGE, self.prev_at_edge.to_raw());
            seeded.put_i64(inc::NEXT_AT_VERTEX, self.next_at_vertex.to_raw());
            seeded.put_i64(inc::PREV_AT_VERTEX, self.prev_at_vertex.to_raw());
            seeded.put_i64(inc::EDGE, self.edge.to_raw());
            seeded.put_i64(inc::VERTEX, self.vertex.to_raw());
            seeded.put_u32(inc::TYPE, self.ty.0);
            self.tracker = Some(seeded);
        }
        self.tracker.get_or_insert_with(Tracker::incidence)
    }

    /// Schema type.
    pub fn ty(&self) -> TypeId {
        self.ty
    }

    /// Incident vertex.
    pub fn vertex(&self) -> GlobalId {
        self.vertex
    }

    /// Incident edge.
    pub fn edge(&self) -> GlobalId {
        self.edge
    }

    /// Next incidence at the vertex.
    pub fn next_at_vertex(&self) -> GlobalId {
        self.next_at_vertex
    }

    /// Previous incidence at the vertex.
    pub fn prev_at_vertex(&self) -> GlobalId {
        self.prev_at_vertex
    }

    /// Next incidence at the edge.
    pub fn next_at_edge(&self) -> GlobalId {
        self.next_at_edge
    }

    /// Previous incidence at the edge.
    pub fn prev_at_edge(&self) -> GlobalId {
        self.prev_at_edge
    }

    /// Sets the next incidence at the vertex.
    pub fn set_next_at_vertex(&mut self, id: GlobalId) {
        self.next_at_vertex = id;
        self.tracker_mut().put_i64(inc::NEXT_AT_VERTEX, id.to_raw());
    }

    /// Sets the previous incidence at the vertex.
    pub fn set_prev_at_vertex(&mut self, id: GlobalId) {
        self.prev_at_vertex = id;
        self.tracker_mut().put_i64(inc::PREV_AT_VERTEX, id.to_raw());
    }

    /// Sets the next incidence at the edge.
    pub fn set_next_at_edge(&mut self, id: GlobalId) {
        self.next_at_edge = id;
        self.tracker_mut().put_i64(inc::NEXT_AT_EDGE, id.to_raw());
    }

    /// Sets the previous incidence at the edge.
    pub fn set_prev_at_edge(&mut self, id: GlobalId) {
        self.prev_at_edge = id;
        self.tracker_mut().put_i64(inc::PREV_AT_EDGE, id.to_raw());
    }

    /// Returns true when unflushed changes exist.
    pub fn is_dirty(&self) -> bool {
        self.tracker.is_some()
    }

    /// Pending changes, if any.
    pub fn tracker(&self) -> Option<&Tracker> {
        self.tracker.as_ref()
    }

    /// Detaches the pending changes for write-back.
    pub fn take_tracker(&mut self) -> Option<Tracker> {
        self.tracker.take()
    }

    /// Snapshot of every field.
    pub fn info(&self) -> IncidenceInfo {
        IncidenceInfo {
            ty: self.ty,
            vertex: self.vertex,
            edge: self.edge,
            next_at_vertex: self.next_at_vertex,
            prev_at_vertex: self.prev_at_vertex,
            next_at_edge: self.next_at_edge,
            prev_at_edge: self.prev_at_edge,
        }
    }
}
