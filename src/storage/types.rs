use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{GlobalId, Sigma, TypeId};

/// Declared type of one element attribute.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrKind {
    /// Boolean.
    Bool,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// 64-bit floating point number.
    Double,
    /// UTF-8 string, nullable.
    String,
    /// Homogeneous list of a scalar kind, nullable.
    List(Box<AttrKind>),
}

/// Attribute value with owned data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrValue {
    /// Unset string or list.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 32-bit signed integer.
    Int(i32),
    /// 64-bit signed integer.
    Long(i64),
    /// 64-bit floating point number.
    Double(f64),
    /// Owned string.
    #[serde(rename = "string")]
    Str(String),
    /// Owned list.
    List(Vec<AttrValue>),
}

impl AttrKind {
    /// Zero value a freshly created element carries when no default is declared.
    pub fn zero(&self) -> AttrValue {
        match self {
            AttrKind::Bool => AttrValue::Bool(false),
            AttrKind::Int => AttrValue::Int(0),
            AttrKind::Long => AttrValue::Long(0),
            AttrKind::Double => AttrValue::Double(0.0),
            AttrKind::String | AttrKind::List(_) => AttrValue::Null,
        }
    }
}

impl AttrValue {
    /// Returns true if the value may be stored in a slot of `kind`.
    pub fn matches(&self, kind: &AttrKind) -> bool {
        match (self, kind) {
            (AttrValue::Null, AttrKind::String | AttrKind::List(_)) => true,
            (AttrValue::Bool(_), AttrKind::Bool)
            | (AttrValue::Int(_), AttrKind::Int)
            | (AttrValue::Long(_), AttrKind::Long)
            | (AttrValue::Double(_), AttrKind::Double)
            | (AttrValue::Str(_), AttrKind::String) => true,
            (AttrValue::List(items), AttrKind::List(inner)) => {
                items.iter().all(|item| !matches!(item, AttrValue::Null) && item.matches(inner))
            }
            _ => false,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Null => write!(f, "null"),
            AttrValue::Bool(v) => write!(f, "{v}"),
            AttrValue::Int(v) => write!(f, "{v}"),
            AttrValue::Long(v) => write!(f, "{v}"),
            AttrValue::Double(v) => write!(f, "{v}"),
            AttrValue::Str(v) => write!(f, "{v}"),
            AttrValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Whether an element record describes a vertex or an edge.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// Vertex.
    Vertex,
    /// Edge.
    Edge,
}

impl ElementKind {
    /// Lower-case name used in messages and logs.
    pub const fn name(self) -> &'static str {
        match self {
            ElementKind::Vertex => "vertex",
            ElementKind::Edge => "edge",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Specification for creating a vertex or edge.
#[derive(Clone, Debug)]
pub struct ElementSpec {
    /// Schema type of the new element.
    pub ty: TypeId,
    /// Local id to use; required while bulk loading, rejected otherwise.
    pub id: Option<u32>,
    /// Element whose subordinate graph receives the new element.
    pub sigma: Sigma,
    /// Visibility level; derived from the container when absent.
    pub kappa: Option<i32>,
}

impl ElementSpec {
    /// Top-level element of type `ty` with an allocated id.
    pub fn new(ty: TypeId) -> Self {
        Self {
            ty,
            id: None,
            sigma: Sigma::TopLevel,
            kappa: None,
        }
    }

    /// Uses an explicit local id (bulk loading only).
    pub fn with_id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }

    /// Places the element in the subordinate graph of `sigma`.
    pub fn nested_in(mut self, sigma: Sigma) -> Self {
        self.sigma = sigma;
        self
    }

    /// Sets an explicit kappa.
    pub fn kappa(mut self, kappa: i32) -> Self {
        self.kappa = Some(kappa);
        self
    }
}

/// Read-only snapshot of an element's scalar fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementInfo {
    /// Vertex or edge.
    pub kind: ElementKind,
    /// Schema type.
    pub ty: TypeId,
    /// Next element in the global sequence.
    pub next: GlobalId,
    /// Previous element in the global sequence.
    pub prev: GlobalId,
    /// Head of the lambda sequence.
    pub first_incidence: GlobalId,
    /// Tail of the lambda sequence.
    pub last_incidence: GlobalId,
    /// Bumped on every lambda sequence change.
    pub incidence_list_version: i64,
    /// Containing element.
    pub sigma: Sigma,
    /// Visibility level.
    pub kappa: i32,
    /// Subordinate graph owned by the element, 0 if none.
    pub subordinate_graph: GlobalId,
}

/// Read-only snapshot of an incidence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidenceInfo {
    /// Schema type.
    pub ty: TypeId,
    /// Incident vertex.
    pub vertex: GlobalId,
    /// Incident edge.
    pub edge: GlobalId,
    /// Next incidence in the vertex's lambda sequence.
    pub next_at_vertex: GlobalId,
    /// Previous incidence in the vertex's lambda sequence.
    pub prev_at_vertex: GlobalId,
    /// Next incidence in the edge's lambda sequence.
    pub next_at_edge: GlobalId,
    /// Previous incidence in the edge's lambda sequence.
    pub prev_at_edge: GlobalId,
}

/// Size summary consumed by query-cost estimation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSize {
    /// Live vertices in the graph.
    pub vertex_count: u64,
    /// Live edges in the graph.
    pub edge_count: u64,
    /// Vertex types declared by the schema.
    pub known_vertex_types: usize,
    /// Edge types declared by the schema.
    pub known_edge_types: usize,
}
