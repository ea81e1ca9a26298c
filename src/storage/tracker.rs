//! Dirty buffers staged for write-back.
//!
//! A [`Tracker`] mirrors an object's on-disk scalar record byte for byte.
//! Setters on live objects write through at fixed offsets, so the region is
//! always a ready-to-write record. Element trackers may also carry the
//! attribute blob, which is replaced wholesale on every attribute change.

use bytes::Bytes;

use crate::primitives::bytes::fixed;

/// Length of a vertex or edge scalar record.
pub const ELEMENT_RECORD_LEN: usize = 64;
/// Length of an incidence scalar record.
pub const INCIDENCE_RECORD_LEN: usize = 52;

pub mod element {
    //! Byte offsets inside a vertex or edge record.

    /// Next element in the global sequence.
    pub const NEXT: usize = 0;
    /// Previous element in the global sequence.
    pub const PREV: usize = 8;
    /// Head of the lambda sequence.
    pub const FIRST_INCIDENCE: usize = 16;
    /// Tail of the lambda sequence.
    pub const LAST_INCIDENCE: usize = 24;
    /// Lambda sequence version.
    pub const INCIDENCE_LIST_VERSION: usize = 32;
    /// Signed containing element.
    pub const SIGMA: usize = 40;
    /// Subordinate graph id.
    pub const SUBORDINATE_GRAPH: usize = 48;
    /// Visibility level (4 bytes).
    pub const KAPPA: usize = 56;
    /// Type id (4 bytes).
    pub const TYPE: usize = 60;
}

pub mod incidence {
    //! Byte offsets inside an incidence record.

    /// Next incidence at the edge.
    pub const NEXT_AT_EDGE: usize = 0;
    /// Previous incidence at the edge.
    pub const PREV_AT_EDGE: usize = 8;
    /// Next incidence at the vertex.
    pub const NEXT_AT_VERTEX: usize = 16;
    /// Previous incidence at the vertex.
    pub const PREV_AT_VERTEX: usize = 24;
    /// Incident edge.
    pub const EDGE: usize = 32;
    /// Incident vertex.
    pub const VERTEX: usize = 40;
    /// Type id (4 bytes).
    pub const TYPE: usize = 48;
}

/// Per-object dirty buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tracker {
    scalars: Box<[u8]>,
    attributes: Option<Bytes>,
}

impl Tracker {
    /// Zeroed tracker for a vertex or edge.
    pub fn element() -> Self {
        Self {
            scalars: vec![0u8; ELEMENT_RECORD_LEN].into_boxed_slice(),
            attributes: None,
        }
    }

    /// Zeroed tracker for an incidence.
    pub fn incidence() -> Self {
        Self {
            scalars: vec![0u8; INCIDENCE_RECORD_LEN].into_boxed_slice(),
            attributes: None,
        }
    }

    /// Writes an 8-byte field.
    pub fn put_i64(&mut self, offset: usize, value: i64) {
        fixed::put_i64(&mut self.scalars, offset, value);
    }

    /// Reads an 8-byte field.
    pub fn get_i64(&self, offset: usize) -> i64 {
        fixed::get_i64(&self.scalars, offset)
    }

    /// Writes a 4-byte field.
    pub fn put_i32(&mut self, offset: usize, value: i32) {
        fixed::put_i32(&mut self.scalars, offset, value);
    }

    /// Reads a 4-byte field.
    pub fn get_i32(&self, offset: usize) -> i32 {
        fixed::get_i32(&self.scalars, offset)
    }

    /// Writes a 4-byte unsigned field.
    pub fn put_u32(&mut self, offset: usize, value: u32) {
        fixed::put_u32(&mut self.scalars, offset, value);
    }

    /// Reads a 4-byte unsigned field.
    pub fn get_u32(&self, offset: usize) -> u32 {
        fixed::get_u32(&self.scalars, offset)
    }

    /// The scalar record as it will be written.
    pub fn scalars(&self) -> &[u8] {
        &self.scalars
    }

    /// Replaces the attribute snapshot.
    pub fn set_attributes(&mut self, blob: Bytes) {
        self.attributes = Some(blob);
    }

    /// Attribute snapshot, if any attribute changed since the last flush.
    pub fn attributes(&self) -> Option<&Bytes> {
        self.attributes.as_ref()
    }
}
