//! Identifier newtypes and the crate-wide error type.
//!
//! A [`GlobalId`] packs the owning partial graph into its upper 32 bits and
//! the partial-graph-relative local id into the lower 32 bits. Both halves
//! start at 1, so the raw value `0` is free to mean "none".

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of one partial graph (one hosted shard of a complete graph).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct PartialGraphId(pub u32);

/// Dense, partial-graph-relative id used as the cache key and record index.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct LocalId(pub u32);

/// Id unique across all partial graphs of a distributed graph.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Serialize, Deserialize,
)]
pub struct GlobalId(pub u64);

/// Schema type id of a vertex, edge, incidence or graph class.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct TypeId(pub u32);

/// Global id of a vertex.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct VertexId(pub GlobalId);

/// Global id of an edge.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct EdgeId(pub GlobalId);

/// Global id of an incidence (the link between one vertex and one edge).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct IncidenceId(pub GlobalId);

/// Global id of a graph's metadata entry ([`crate::db::GraphData`]).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct SubgraphId(pub GlobalId);

impl GlobalId {
    /// The reserved "no element" id.
    pub const NONE: GlobalId = GlobalId(0);

    /// Packs a partial graph id and a local id.
    pub const fn new(partial_graph: PartialGraphId, local: LocalId) -> Self {
        GlobalId(((partial_graph.0 as u64) << 32) | local.0 as u64)
    }

    /// Owning partial graph.
    pub const fn partial_graph(self) -> PartialGraphId {
        PartialGraphId((self.0 >> 32) as u32)
    }

    /// Partial-graph-relative part.
    pub const fn local(self) -> LocalId {
        LocalId(self.0 as u32)
    }

    /// Returns true for the reserved id 0.
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Converts to `None` for the reserved id.
    pub fn non_null(self) -> Option<Self> {
        (!self.is_none()).then_some(self)
    }

    /// Signed on-disk representation.
    pub const fn to_raw(self) -> i64 {
        self.0 as i64
    }

    /// Reads the on-disk representation back. Negative values are rejected.
    pub fn from_raw(raw: i64) -> Result<Self> {
        if raw < 0 {
            return Err(GraphError::Corruption("negative global id in record"));
        }
        Ok(GlobalId(raw as u64))
    }
}

macro_rules! typed_id {
    ($name:ident) => {
        impl $name {
            /// Wraps an already packed global id.
            pub const fn new(partial_graph: PartialGraphId, local: LocalId) -> Self {
                $name(GlobalId::new(partial_graph, local))
            }

            /// Underlying untyped id.
            pub const fn global(self) -> GlobalId {
                self.0
            }

            /// Owning partial graph.
            pub const fn partial_graph(self) -> PartialGraphId {
                self.0.partial_graph()
            }

            /// Partial-graph-relative part.
            pub const fn local(self) -> LocalId {
                self.0.local()
            }

            /// Interprets a stored raw id, mapping 0 to `None`.
            pub fn from_stored(id: GlobalId) -> Option<Self> {
                id.non_null().map($name)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

typed_id!(VertexId);
typed_id!(EdgeId);
typed_id!(IncidenceId);
typed_id!(SubgraphId);

impl fmt::Display for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.partial_graph().0, self.local().0)
    }
}

impl fmt::Display for PartialGraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TypeId {
    fn from(value: u32) -> Self {
        TypeId(value)
    }
}

impl From<TypeId> for u32 {
    fn from(value: TypeId) -> Self {
        value.0
    }
}

/// Containing element of a nested element.
///
/// Stored as a signed id: positive for a vertex container, negative for an
/// edge container, `0` for top-level elements.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum Sigma {
    /// Element of the complete graph itself.
    #[default]
    TopLevel,
    /// Nested in the subordinate graph of a vertex.
    Vertex(VertexId),
    /// Nested in the subordinate graph of an edge.
    Edge(EdgeId),
}

impl Sigma {
    /// Signed encoding used in records and on the wire.
    pub fn to_raw(self) -> i64 {
        match self {
            Sigma::TopLevel => 0,
            Sigma::Vertex(v) => v.global().to_raw(),
            Sigma::Edge(e) => -e.global().to_raw(),
        }
    }

    /// Decodes the signed encoding.
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            0 => Sigma::TopLevel,
            r if r > 0 => Sigma::Vertex(VertexId(GlobalId(r as u64))),
            r => Sigma::Edge(EdgeId(GlobalId(r.unsigned_abs()))),
        }
    }

    /// Global id of the container, if any.
    pub fn element(self) -> Option<GlobalId> {
        match self {
            Sigma::TopLevel => None,
            Sigma::Vertex(v) => Some(v.global()),
            Sigma::Edge(e) => Some(e.global()),
        }
    }
}

/// Errors produced by the storage engine.
#[derive(thiserror::Error, Debug)]
pub enum GraphError {
    /// Underlying file or socket failure.
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    /// Persisted data does not decode.
    #[error("corruption: {0}")]
    Corruption(&'static str),
    /// Caller supplied an argument the operation cannot accept.
    #[error("invalid argument: {0}")]
    Invalid(&'static str),
    /// No element, graph or partial graph exists for the id.
    #[error("{kind} {id} not found")]
    NotFound {
        /// What was looked up.
        kind: &'static str,
        /// The raw id that missed.
        id: GlobalId,
    },
    /// Explicit/implicit id supplied in the wrong mode, or an id already in use.
    #[error("id space: {0}")]
    IdSpace(&'static str),
    /// A bounded pool ran out of ids.
    #[error("capacity exhausted: {0}")]
    Capacity(&'static str),
    /// An element profile could not be built from its type declaration.
    #[error("profile for type {type_id}: {reason}")]
    Profile {
        /// Offending type.
        type_id: TypeId,
        /// What was wrong with the declaration.
        reason: String,
    },
    /// An attribute name or value does not fit the element's profile.
    #[error("attribute: {0}")]
    Attribute(String),
    /// A call forwarded to another partial graph failed.
    #[error("remote call to partial graph {partial_graph} failed")]
    Remote {
        /// Partial graph the call was forwarded to.
        partial_graph: PartialGraphId,
        /// What went wrong on the way or on the remote host.
        #[source]
        source: Box<GraphError>,
    },
    /// Connection or framing problem on a remote transport.
    #[error("transport: {0}")]
    Transport(String),
    /// Error raised by a remote host, reconstructed from its response.
    #[error("remote fault ({kind}): {message}")]
    RemoteFault {
        /// Variant name of the remote error.
        kind: String,
        /// Rendered remote error.
        message: String,
    },
    /// JSON encoding or decoding failed.
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Configuration or schema file could not be used.
    #[error("config: {0}")]
    Config(String),
}

impl GraphError {
    /// Short variant name, carried across the wire in remote faults.
    pub fn kind(&self) -> &'static str {
        match self {
            GraphError::Io(_) => "io",
            GraphError::Corruption(_) => "corruption",
            GraphError::Invalid(_) => "invalid",
            GraphError::NotFound { .. } => "not_found",
            GraphError::IdSpace(_) => "id_space",
            GraphError::Capacity(_) => "capacity",
            GraphError::Profile { .. } => "profile",
            GraphError::Attribute(_) => "attribute",
            GraphError::Remote { .. } => "remote",
            GraphError::Transport(_) => "transport",
            GraphError::RemoteFault { .. } => "remote_fault",
            GraphError::Serialization(_) => "serialization",
            GraphError::Config(_) => "config",
        }
    }

    /// Returns true when the error reports a missing object, locally or on
    /// a remote host.
    pub fn is_not_found(&self) -> bool {
        match self {
            GraphError::NotFound { .. } => true,
            GraphError::RemoteFault { kind, .. } => kind == "not_found",
            GraphError::Remote { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    pub(crate) fn not_found(kind: &'static str, id: GlobalId) -> Self {
        GraphError::NotFound { kind, id }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GraphError>;
