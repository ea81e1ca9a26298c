//! Wire format between partial graphs.
//!
//! Every message is a big-endian `u32` length followed by that many bytes of
//! JSON. A request is answered by exactly one response; there is no
//! streaming and no pipelining.

use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};

use crate::db::access::{ElementLink, IncidenceLink};
use crate::db::graph_data::{GraphData, GraphDataUpdate, GraphKind};
use crate::storage::{AttrValue, ElementInfo, ElementKind, IncidenceInfo};
use crate::types::{GlobalId, GraphError, LocalId, PartialGraphId, Sigma, SubgraphId, TypeId};

/// Frames above this size are rejected on read.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// One primitive call. Variants mirror the methods of
/// [`crate::db::PartialGraphAccess`].
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Asks for the served partial graph id.
    Hello,
    CreateElement {
        kind: ElementKind,
        ty: TypeId,
        #[serde(default)]
        local: Option<LocalId>,
        sigma: Sigma,
        kappa: i32,
    },
    RemoveElement {
        kind: ElementKind,
        id: GlobalId,
    },
    ContainsElement {
        kind: ElementKind,
        id: GlobalId,
    },
    ElementInfo {
        kind: ElementKind,
        id: GlobalId,
    },
    SetElementLink {
        kind: ElementKind,
        id: GlobalId,
        link: ElementLink,
        value: GlobalId,
    },
    BumpIncidenceListVersion {
        kind: ElementKind,
        id: GlobalId,
    },
    GetAttribute {
        kind: ElementKind,
        id: GlobalId,
        name: String,
    },
    SetAttribute {
        kind: ElementKind,
        id: GlobalId,
        name: String,
        value: AttrValue,
    },
    CreateIncidence {
        ty: TypeId,
        vertex: GlobalId,
        edge: GlobalId,
    },
    RemoveIncidence {
        id: GlobalId,
    },
    IncidenceInfo {
        id: GlobalId,
    },
    SetIncidenceLink {
        id: GlobalId,
        link: IncidenceLink,
        value: GlobalId,
    },
    CreateGraphData {
        kind: GraphKind,
        ty: TypeId,
        sigma: Sigma,
    },
    GraphData {
        id: SubgraphId,
    },
    UpdateGraphData {
        id: SubgraphId,
        update: GraphDataUpdate,
    },
    RegisterPartialGraph {
        address: String,
    },
    LookupPartialGraph {
        id: PartialGraphId,
    },
    ReleasePartialGraph {
        id: PartialGraphId,
    },
}

/// Successful result of a request.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Reply {
    Unit,
    Id(GlobalId),
    Flag(bool),
    Version(i64),
    Element(ElementInfo),
    Incidence(IncidenceInfo),
    Value(AttrValue),
    Subgraph(SubgraphId),
    GraphData(GraphData),
    PartialGraph(PartialGraphId),
    Address(String),
}

/// Outcome of a request. Errors travel as their kind and rendered message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    /// The call succeeded.
    Ok(Reply),
    /// The call failed on the serving host.
    Error {
        /// Variant name of the error.
        kind: String,
        /// Rendered error.
        message: String,
    },
}

impl Response {
    /// Wraps a handler result.
    pub fn from_result(result: crate::types::Result<Reply>) -> Self {
        match result {
            Ok(reply) => Response::Ok(reply),
            Err(err) => Response::Error {
                kind: err.kind().to_owned(),
                message: err.to_string(),
            },
        }
    }

    /// Unwraps into a result, rebuilding server errors as [`GraphError::RemoteFault`].
    pub fn into_result(self) -> crate::types::Result<Reply> {
        match self {
            Response::Ok(reply) => Ok(reply),
            Response::Error { kind, message } => Err(GraphError::RemoteFault { kind, message }),
        }
    }
}

/// Reads one frame; `None` on a clean end of stream.
pub fn read_frame(stream: &mut impl Read) -> io::Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match stream.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err),
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame too large: {len} bytes"),
        ));
    }
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf)?;
    Ok(Some(buf))
}

/// Writes one frame and flushes.
pub fn write_frame(stream: &mut impl Write, payload: &[u8]) -> io::Result<()> {
    let len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "frame exceeds u32 length"))?;
    stream.write_all(&len.to_be_bytes())?;
    stream.write_all(payload)?;
    stream.flush()
}
