//! Per-type attribute tables.
//!
//! An [`ElementProfile`] is built once per vertex or edge class and answers
//! every attribute question on the hot path: slot index by name, kind checks
//! on mutation, and the blob codec used for write-back. Profiles are looked
//! up by type id through the [`ProfileRegistry`], never by name.

use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use rustc_hash::FxHashMap;

use super::schema::{AggregationKind, Direction, ElementTypeDef, IncidenceTypeDef, Schema};
use super::types::{AttrKind, AttrValue, ElementKind};
use crate::primitives::bytes::buf::Cursor;
use crate::types::{GraphError, Result, TypeId};

const TAG_NULL: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_INT: u8 = 2;
const TAG_LONG: u8 = 3;
const TAG_DOUBLE: u8 = 4;
const TAG_STRING: u8 = 5;
const TAG_LIST: u8 = 6;

/// One resolved attribute slot.
#[derive(Clone, Debug)]
pub struct AttributeSlot {
    name: String,
    kind: AttrKind,
    default: AttrValue,
}

impl AttributeSlot {
    /// Attribute name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared kind.
    pub fn kind(&self) -> &AttrKind {
        &self.kind
    }

    /// Value of fresh elements.
    pub fn default_value(&self) -> &AttrValue {
        &self.default
    }
}

/// Attribute table of one vertex or edge class.
#[derive(Debug)]
pub struct ElementProfile {
    type_id: TypeId,
    name: String,
    kind: ElementKind,
    slots: Vec<AttributeSlot>,
    by_name: FxHashMap<String, usize>,
}

impl ElementProfile {
    /// Builds a profile, failing on any declaration the codec cannot serve.
    pub fn build(kind: ElementKind, def: &ElementTypeDef) -> Result<Self> {
        let type_id = TypeId(def.id);
        let fail = |reason: String| GraphError::Profile { type_id, reason };
        let mut slots = Vec::with_capacity(def.attributes.len());
        let mut by_name = FxHashMap::default();
        for attr in &def.attributes {
            if attr.name.is_empty() {
                return Err(fail("attribute with empty name".into()));
            }
            if let AttrKind::List(inner) = &attr.kind {
                if matches!(**inner, AttrKind::List(_)) {
                    return Err(fail(format!("attribute {} nests lists", attr.name)));
                }
            }
            let default = match &attr.default {
                Some(value) if value.matches(&attr.kind) => value.clone(),
                Some(value) => {
                    return Err(fail(format!(
                        "default {value} of attribute {} is not a {:?}",
                        attr.name, attr.kind
                    )))
                }
                None => attr.kind.zero(),
            };
            if by_name.insert(attr.name.clone(), slots.len()).is_some() {
                return Err(fail(format!("attribute {} declared twice", attr.name)));
            }
            slots.push(AttributeSlot {
                name: attr.name.clone(),
                kind: attr.kind.clone(),
                default,
            });
        }
        Ok(Self {
            type_id,
            name: def.name.clone(),
            kind,
            slots,
            by_name,
        })
    }

    /// Type id the profile was built for.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Vertex or edge.
    pub fn element_kind(&self) -> ElementKind {
        self.kind
    }

    /// Declared slots in storage order.
    pub fn slots(&self) -> &[AttributeSlot] {
        &self.slots
    }

    /// Slot index for `name`.
    pub fn slot_index(&self, name: &str) -> Result<usize> {
        self.by_name.get(name).copied().ok_or_else(|| {
            GraphError::Attribute(format!("{} has no attribute {name}", self.name))
        })
    }

    /// Values of a fresh element.
    pub fn defaults(&self) -> Vec<AttrValue> {
        self.slots.iter().map(|slot| slot.default.clone()).collect()
    }

    /// Rejects values that do not fit slot `index`.
    pub fn check(&self, index: usize, value: &AttrValue) -> Result<()> {
        let slot = self
            .slots
            .get(index)
            .ok_or_else(|| GraphError::Attribute(format!("slot {index} out of range")))?;
        if value.matches(&slot.kind) {
            Ok(())
        } else {
            Err(GraphError::Attribute(format!(
                "{}.{} expects {:?}, got {value}",
                self.name, slot.name, slot.kind
            )))
        }
    }

    /// Encodes every declared attribute of `values` into one blob.
    pub fn snapshot(&self, values: &[AttrValue]) -> Result<Bytes> {
        if values.len() != self.slots.len() {
            return Err(GraphError::Attribute(format!(
                "{} declares {} attributes, element holds {}",
                self.name,
                self.slots.len(),
                values.len()
            )));
        }
        let mut buf = BytesMut::with_capacity(16 * values.len() + 2);
        buf.put_u16(values.len() as u16);
        for (slot, value) in self.slots.iter().zip(values) {
            if !value.matches(&slot.kind) {
                return Err(GraphError::Attribute(format!(
                    "{}.{} holds a mismatched value",
                    self.name, slot.name
                )));
            }
            encode_value(value, &mut buf);
        }
        Ok(buf.freeze())
    }

    /// Decodes a blob produced by [`ElementProfile::snapshot`].
    pub fn restore(&self, blob: &[u8]) -> Result<Vec<AttrValue>> {
        let mut cursor = Cursor::new(blob);
        let mut count_bytes = [0u8; 2];
        count_bytes.copy_from_slice(cursor.take(2)?);
        let count = u16::from_be_bytes(count_bytes) as usize;
        if count != self.slots.len() {
            return Err(GraphError::Corruption("attribute blob count mismatch"));
        }
        let mut values = Vec::with_capacity(count);
        for slot in &self.slots {
            let value = decode_value(&mut cursor)?;
            if !value.matches(&slot.kind) {
                return Err(GraphError::Corruption("attribute blob kind mismatch"));
            }
            values.push(value);
        }
        if cursor.remaining() != 0 {
            return Err(GraphError::Corruption("trailing bytes in attribute blob"));
        }
        Ok(values)
    }
}

fn encode_value(value: &AttrValue, buf: &mut BytesMut) {
    match value {
        AttrValue::Null => buf.put_u8(TAG_NULL),
        AttrValue::Bool(v) => {
            buf.put_u8(TAG_BOOL);
            buf.put_u8(u8::from(*v));
        }
        AttrValue::Int(v) => {
            buf.put_u8(TAG_INT);
            buf.put_i32(*v);
        }
        AttrValue::Long(v) => {
            buf.put_u8(TAG_LONG);
            buf.put_i64(*v);
        }
        AttrValue::Double(v) => {
            buf.put_u8(TAG_DOUBLE);
            buf.put_f64(*v);
        }
        AttrValue::Str(v) => {
            buf.put_u8(TAG_STRING);
            buf.put_u32(v.len() as u32);
            buf.put_slice(v.as_bytes());
        }
        AttrValue::List(items) => {
            buf.put_u8(TAG_LIST);
            buf.put_u32(items.len() as u32);
            for item in items {
                encode_value(item, buf);
            }
        }
    }
}

fn decode_value(cursor: &mut Cursor<'_>) -> Result<AttrValue> {
    Ok(match cursor.u8()? {
        TAG_NULL => AttrValue::Null,
        TAG_BOOL => AttrValue::Bool(cursor.u8()? != 0),
        TAG_INT => AttrValue::Int(cursor.i32()?),
        TAG_LONG => AttrValue::Long(cursor.i64()?),
        TAG_DOUBLE => AttrValue::Double(cursor.f64()?),
        TAG_STRING => AttrValue::Str(cursor.str()?.to_owned()),
        TAG_LIST => {
            let len = cursor.u32()? as usize;
            let mut items = Vec::with_capacity(len.min(cursor.remaining()));
            for _ in 0..len {
                items.push(decode_value(cursor)?);
            }
            AttrValue::List(items)
        }
        _ => return Err(GraphError::Corruption("unknown attribute tag")),
    })
}

/// Resolved incidence class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IncidenceClass {
    /// Type id.
    pub type_id: TypeId,
    /// Direction relative to the edge.
    pub direction: Direction,
    /// Aggregation of the vertex at this end.
    pub aggregation: AggregationKind,
}

impl From<&IncidenceTypeDef> for IncidenceClass {
    fn from(def: &IncidenceTypeDef) -> Self {
        Self {
            type_id: TypeId(def.id),
            direction: def.direction,
            aggregation: def.aggregation,
        }
    }
}

/// All per-type tables of a schema, indexed by type id.
#[derive(Debug, Default)]
pub struct ProfileRegistry {
    elements: Vec<Option<Arc<ElementProfile>>>,
    incidences: FxHashMap<TypeId, IncidenceClass>,
    vertex_types: usize,
    edge_types: usize,
}

impl ProfileRegistry {
    /// Builds every profile of `schema`. Any bad declaration aborts the build.
    pub fn build(schema: &Schema) -> Result<Self> {
        schema.validate()?;
        let mut registry = Self {
            vertex_types: schema.vertex_types.len(),
            edge_types: schema.edge_types.len(),
            ..Self::default()
        };
        for def in &schema.vertex_types {
            registry.insert(ElementProfile::build(ElementKind::Vertex, def)?);
        }
        for def in &schema.edge_types {
            registry.insert(ElementProfile::build(ElementKind::Edge, def)?);
        }
        for def in &schema.incidence_types {
            registry
                .incidences
                .insert(TypeId(def.id), IncidenceClass::from(def));
        }
        Ok(registry)
    }

    fn insert(&mut self, profile: ElementProfile) {
        let idx = profile.type_id().0 as usize;
        if self.elements.len() <= idx {
            self.elements.resize(idx + 1, None);
        }
        self.elements[idx] = Some(Arc::new(profile));
    }

    /// Profile of a vertex or edge type.
    pub fn element(&self, type_id: TypeId) -> Result<&Arc<ElementProfile>> {
        self.elements
            .get(type_id.0 as usize)
            .and_then(Option::as_ref)
            .ok_or(GraphError::Invalid("unknown element type"))
    }

    /// Profile of a type that must be of `kind`.
    pub fn element_of_kind(&self, type_id: TypeId, kind: ElementKind) -> Result<&Arc<ElementProfile>> {
        let profile = self.element(type_id)?;
        if profile.element_kind() != kind {
            return Err(GraphError::Invalid("element type used for the wrong kind"));
        }
        Ok(profile)
    }

    /// Incidence class by id.
    pub fn incidence(&self, type_id: TypeId) -> Result<IncidenceClass> {
        self.incidences
            .get(&type_id)
            .copied()
            .ok_or(GraphError::Invalid("unknown incidence type"))
    }

    /// Number of declared vertex classes.
    pub fn vertex_type_count(&self) -> usize {
        self.vertex_types
    }

    /// Number of declared edge classes.
    pub fn edge_type_count(&self) -> usize {
        self.edge_types
    }
}
