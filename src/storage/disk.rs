//! Write-back of trackers into the per-kind record files.
//!
//! Layout inside a data directory:
//!
//! * `vertices.rec`, `edges.rec`: 64-byte element records at
//!   `local_id * 64`,
//! * `incidences.rec`: 52-byte incidence records at `local_id * 52`,
//! * `vertex_attrs.idx` / `edge_attrs.idx`: 16-byte slots at `local_id * 16`
//!   holding `(offset u64, len u32, crc32 u32)` into the matching `.dat`,
//! * `vertex_attrs.dat` / `edge_attrs.dat`: append-only attribute blobs.
//!
//! A record whose type field is 0 is a tombstone. A missing or zero-length
//! attribute slot means "all defaults".

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace};

use super::object::{ElementObject, IncidenceObject};
use super::profile::ProfileRegistry;
use super::tracker::{element as el, incidence as inc, Tracker};
use super::tracker::{ELEMENT_RECORD_LEN, INCIDENCE_RECORD_LEN};
use super::types::ElementKind;
use crate::primitives::bytes::fixed;
use crate::primitives::io::{FileAccess, FileRegistry};
use crate::types::{GraphError, LocalId, Result, TypeId};

const ATTR_SLOT_LEN: usize = 16;

/// The three record kinds with their own files.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum RecordKind {
    /// `vertices.rec`.
    Vertex,
    /// `edges.rec`.
    Edge,
    /// `incidences.rec`.
    Incidence,
}

impl RecordKind {
    /// Fixed record length.
    pub const fn record_len(self) -> usize {
        match self {
            RecordKind::Vertex | RecordKind::Edge => ELEMENT_RECORD_LEN,
            RecordKind::Incidence => INCIDENCE_RECORD_LEN,
        }
    }

    fn type_offset(self) -> usize {
        match self {
            RecordKind::Vertex | RecordKind::Edge => el::TYPE,
            RecordKind::Incidence => inc::TYPE,
        }
    }

    fn file_name(self) -> &'static str {
        match self {
            RecordKind::Vertex => "vertices.rec",
            RecordKind::Edge => "edges.rec",
            RecordKind::Incidence => "incidences.rec",
        }
    }
}

impl From<ElementKind> for RecordKind {
    fn from(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Vertex => RecordKind::Vertex,
            ElementKind::Edge => RecordKind::Edge,
        }
    }
}

struct AttributeFiles {
    index: Arc<FileAccess>,
    data: Arc<FileAccess>,
}

impl AttributeFiles {
    fn open(files: &FileRegistry, kind: ElementKind) -> Result<Self> {
        let (index, data) = match kind {
            ElementKind::Vertex => ("vertex_attrs.idx", "vertex_attrs.dat"),
            ElementKind::Edge => ("edge_attrs.idx", "edge_attrs.dat"),
        };
        Ok(Self {
            index: files.file_access(index)?,
            data: files.file_access(data)?,
        })
    }

    fn write(&self, local: LocalId, blob: &[u8]) -> Result<()> {
        let offset = self.data.len()?;
        self.data.write(blob, offset)?;
        let len = u32::try_from(blob.len())
            .map_err(|_| GraphError::Invalid("attribute blob exceeds 4 GiB"))?;
        let mut slot = [0u8; ATTR_SLOT_LEN];
        slot[..8].copy_from_slice(&offset.to_be_bytes());
        fixed::put_u32(&mut slot, 8, len);
        fixed::put_u32(&mut slot, 12, crc32fast::hash(blob));
        self.index.write(&slot, slot_offset(local, ATTR_SLOT_LEN))
    }

    fn clear(&self, local: LocalId) -> Result<()> {
        let at = slot_offset(local, ATTR_SLOT_LEN);
        if at >= self.index.len()? {
            return Ok(());
        }
        self.index.write(&[0u8; ATTR_SLOT_LEN], at)
    }

    fn read(&self, local: LocalId) -> Result<Option<Vec<u8>>> {
        let at = slot_offset(local, ATTR_SLOT_LEN);
        if at + ATTR_SLOT_LEN as u64 > self.index.len()? {
            return Ok(None);
        }
        let slot = self.index.read(ATTR_SLOT_LEN, at)?;
        let len = fixed::get_u32(&slot, 8) as usize;
        if len == 0 {
            return Ok(None);
        }
        let mut offset = [0u8; 8];
        offset.copy_from_slice(&slot[..8]);
        let blob = self.data.read(len, u64::from_be_bytes(offset))?;
        if crc32fast::hash(&blob) != fixed::get_u32(&slot, 12) {
            return Err(GraphError::Corruption("attribute blob checksum mismatch"));
        }
        Ok(Some(blob))
    }
}

fn slot_offset(local: LocalId, len: usize) -> u64 {
    u64::from(local.0) * len as u64
}

/// Record files of one partial graph.
pub struct RecordStore {
    files: Arc<FileRegistry>,
    vertices: Arc<FileAccess>,
    edges: Arc<FileAccess>,
    incidences: Arc<FileAccess>,
    vertex_attrs: AttributeFiles,
    edge_attrs: AttributeFiles,
}

impl RecordStore {
    /// Opens (creating on first use) every record file in `files`.
    pub fn open(files: Arc<FileRegistry>) -> Result<Self> {
        Ok(Self {
            vertices: files.file_access(RecordKind::Vertex.file_name())?,
            edges: files.file_access(RecordKind::Edge.file_name())?,
            incidences: files.file_access(RecordKind::Incidence.file_name())?,
            vertex_attrs: AttributeFiles::open(&files, ElementKind::Vertex)?,
            edge_attrs: AttributeFiles::open(&files, ElementKind::Edge)?,
            files,
        })
    }

    /// Backing file registry.
    pub fn files(&self) -> &Arc<FileRegistry> {
        &self.files
    }

    fn records(&self, kind: RecordKind) -> &Arc<FileAccess> {
        match kind {
            RecordKind::Vertex => &self.vertices,
            RecordKind::Edge => &self.edges,
            RecordKind::Incidence => &self.incidences,
        }
    }

    fn attrs(&self, kind: ElementKind) -> &AttributeFiles {
        match kind {
            ElementKind::Vertex => &self.vertex_attrs,
            ElementKind::Edge => &self.edge_attrs,
        }
    }

    /// Writes one tracker: the scalar record, then the attribute blob if any.
    pub fn write_tracker(&self, kind: RecordKind, local: LocalId, tracker: &Tracker) -> Result<()> {
        debug_assert_eq!(tracker.scalars().len(), kind.record_len());
        self.records(kind)
            .write(tracker.scalars(), slot_offset(local, kind.record_len()))?;
        let element = match kind {
            RecordKind::Vertex => Some(ElementKind::Vertex),
            RecordKind::Edge => Some(ElementKind::Edge),
            RecordKind::Incidence => None,
        };
        if let (Some(blob), Some(element)) = (tracker.attributes(), element) {
            self.attrs(element).write(local, blob)?;
        }
        trace!(?kind, local = local.0, "storage.record.written");
        Ok(())
    }

    /// Overwrites a record with zeros so it loads as absent.
    pub fn write_tombstone(&self, kind: RecordKind, local: LocalId) -> Result<()> {
        let zeros = vec![0u8; kind.record_len()];
        self.records(kind)
            .write(&zeros, slot_offset(local, kind.record_len()))?;
        match kind {
            RecordKind::Vertex => self.vertex_attrs.clear(local),
            RecordKind::Edge => self.edge_attrs.clear(local),
            RecordKind::Incidence => Ok(()),
        }
    }

    fn live_records(&self, kind: RecordKind) -> Result<Vec<(LocalId, Vec<u8>)>> {
        let file = self.records(kind);
        let len = kind.record_len();
        let total = file.len()? as usize / len;
        if total == 0 {
            return Ok(Vec::new());
        }
        let bytes = file.read(total * len, 0)?;
        let mut live = Vec::new();
        for (slot, record) in bytes.chunks_exact(len).enumerate().skip(1) {
            if fixed::get_u32(record, kind.type_offset()) == 0 {
                continue;
            }
            let local = u32::try_from(slot)
                .map_err(|_| GraphError::Corruption("record slot beyond id space"))?;
            live.push((LocalId(local), record.to_vec()));
        }
        debug!(?kind, live = live.len(), slots = total, "storage.records.scanned");
        Ok(live)
    }

    /// Loads every live vertex or edge, restoring attributes through its profile.
    pub fn load_elements(
        &self,
        kind: ElementKind,
        profiles: &ProfileRegistry,
    ) -> Result<Vec<(LocalId, ElementObject)>> {
        let mut out = Vec::new();
        for (local, record) in self.live_records(kind.into())? {
            let profile =
                profiles.element_of_kind(TypeId(fixed::get_u32(&record, el::TYPE)), kind)?;
            let attributes = match self.attrs(kind).read(local)? {
                Some(blob) => profile.restore(&blob)?,
                None => profile.defaults(),
            };
            out.push((local, ElementObject::from_record(kind, &record, attributes)?));
        }
        Ok(out)
    }

    /// Loads every live incidence.
    pub fn load_incidences(&self) -> Result<Vec<(LocalId, IncidenceObject)>> {
        self.live_records(RecordKind::Incidence)?
            .into_iter()
            .map(|(local, record)| Ok((local, IncidenceObject::from_record(&record)?)))
            .collect()
    }

    /// Rewrites a JSON document. A shorter document is padded with spaces so
    /// stale bytes of the previous version never trail it.
    pub fn save_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let file = self.files.file_access(name)?;
        let mut doc = serde_json::to_vec_pretty(value)?;
        let old_len = file.len()? as usize;
        if doc.len() < old_len {
            doc.resize(old_len, b' ');
        }
        file.write(&doc, 0)
    }

    /// Reads a JSON document written by [`RecordStore::save_json`].
    pub fn load_json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        if !self.files.exists(name) {
            return Ok(None);
        }
        let file = self.files.file_access(name)?;
        let len = file.len()? as usize;
        if len == 0 {
            return Ok(None);
        }
        let bytes = file.read(len, 0)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}
