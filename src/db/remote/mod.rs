//! Client side of cross-partial-graph calls.

mod loopback;
pub mod protocol;
mod tcp;

use std::sync::Arc;

use tracing::trace;

pub use loopback::{LoopbackNetwork, LoopbackTransport};
pub use tcp::{TcpConnector, TcpTransport};

use self::protocol::{Reply, Request, Response};
use super::access::{ElementLink, IncidenceLink, PartialGraphAccess};
use super::graph_data::{GraphData, GraphDataUpdate, GraphKind};
use crate::storage::{AttrValue, ElementInfo, ElementKind, IncidenceInfo};
use crate::types::{GlobalId, GraphError, LocalId, PartialGraphId, Result, Sigma, SubgraphId, TypeId};

/// Moves one encoded request to a host and returns its encoded response.
pub trait Transport: Send + Sync {
    /// Blocking request/response exchange.
    fn roundtrip(&self, frame: &[u8]) -> Result<Vec<u8>>;
}

/// Opens transports by address.
pub trait Connector: Send + Sync {
    /// Connects to the host reachable at `address`.
    fn connect(&self, address: &str) -> Result<Arc<dyn Transport>>;
}

/// [`PartialGraphAccess`] forwarding every call to a remote host.
pub struct RemoteStore {
    partial_graph: PartialGraphId,
    transport: Arc<dyn Transport>,
}

impl RemoteStore {
    /// Store for partial graph `partial_graph` reached through `transport`.
    pub fn new(partial_graph: PartialGraphId, transport: Arc<dyn Transport>) -> Self {
        Self {
            partial_graph,
            transport,
        }
    }

    fn call(&self, request: &Request) -> Result<Reply> {
        self.exchange(request).map_err(|err| GraphError::Remote {
            partial_graph: self.partial_graph,
            source: Box::new(err),
        })
    }

    fn exchange(&self, request: &Request) -> Result<Reply> {
        let frame = serde_json::to_vec(request)?;
        trace!(partial_graph = self.partial_graph.0, len = frame.len(), "remote.request");
        let raw = self.transport.roundtrip(&frame)?;
        let response: Response = serde_json::from_slice(&raw)?;
        response.into_result()
    }

    fn unexpected(&self, reply: Reply) -> GraphError {
        GraphError::Remote {
            partial_graph: self.partial_graph,
            source: Box::new(GraphError::Transport(format!("unexpected reply {reply:?}"))),
        }
    }

    fn unit(&self, request: Request) -> Result<()> {
        match self.call(&request)? {
            Reply::Unit => Ok(()),
            other => Err(self.unexpected(other)),
        }
    }

    fn id(&self, request: Request) -> Result<GlobalId> {
        match self.call(&request)? {
            Reply::Id(id) => Ok(id),
            other => Err(self.unexpected(other)),
        }
    }

    fn graph_data_reply(&self, request: Request) -> Result<GraphData> {
        match self.call(&request)? {
            Reply::GraphData(data) => Ok(data),
            other => Err(self.unexpected(other)),
        }
    }
}

impl PartialGraphAccess for RemoteStore {
    fn partial_graph_id(&self) -> PartialGraphId {
        self.partial_graph
    }

    fn create_element(
        &self,
        kind: ElementKind,
        ty: TypeId,
        local: Option<LocalId>,
        sigma: Sigma,
        kappa: i32,
    ) -> Result<GlobalId> {
        self.id(Request::CreateElement {
            kind,
            ty,
            local,
            sigma,
            kappa,
        })
    }

    fn remove_element(&self, kind: ElementKind, id: GlobalId) -> Result<()> {
        self.unit(Request::RemoveElement { kind, id })
    }

    fn contains_element(&self, kind: ElementKind, id: GlobalId) -> Result<bool> {
        match self.call(&Request::ContainsElement { kind, id })? {
            Reply::Flag(flag) => Ok(flag),
            other => Err(self.unexpected(other)),
        }
    }

    fn element_info(&self, kind: ElementKind, id: GlobalId) -> Result<ElementInfo> {
        match self.call(&Request::ElementInfo { kind, id })? {
            Reply::Element(info) => Ok(info),
            other => Err(self.unexpected(other)),
        }
    }

    fn set_element_link(
        &self,
        kind: ElementKind,
        id: GlobalId,
        link: ElementLink,
        value: GlobalId,
    ) -> Result<()> {
        self.unit(Request::SetElementLink {
            kind,
            id,
            link,
            value,
        })
    }

    fn bump_incidence_list_version(&self, kind: ElementKind, id: GlobalId) -> Result<i64> {
        match self.call(&Request::BumpIncidenceListVersion { kind, id })? {
            Reply::Version(version) => Ok(version),
            other => Err(self.unexpected(other)),
        }
    }

    fn get_attribute(&self, kind: ElementKind, id: GlobalId, name: &str) -> Result<AttrValue> {
        let request = Request::GetAttribute {
            kind,
            id,
            name: name.to_owned(),
        };
        match self.call(&request)? {
            Reply::Value(value) => Ok(value),
            other => Err(self.unexpected(other)),
        }
    }

    fn set_attribute(
        &self,
        kind: ElementKind,
        id: GlobalId,
        name: &str,
        value: AttrValue,
    ) -> Result<()> {
        self.unit(Request::SetAttribute {
            kind,
            id,
            name: name.to_owned(),
            value,
        })
    }

    fn create_incidence(&self, ty: TypeId, vertex: GlobalId, edge: GlobalId) -> Result<GlobalId> {
        self.id(Request::CreateIncidence { ty, vertex, edge })
    }

    fn remove_incidence(&self, id: GlobalId) -> Result<()> {
        self.unit(Request::RemoveIncidence { id })
    }

    fn incidence_info(&self, id: GlobalId) -> Result<IncidenceInfo> {
        match self.call(&Request::IncidenceInfo { id })? {
            Reply::Incidence(info) => Ok(info),
            other => Err(self.unexpected(other)),
        }
    }

    fn set_incidence_link(&self, id: GlobalId, link: IncidenceLink, value: GlobalId) -> Result<()> {
        self.unit(Request::SetIncidenceLink { id, link, value })
    }

    fn create_graph_data(&self, kind: GraphKind, ty: TypeId, sigma: Sigma) -> Result<SubgraphId> {
        match self.call(&Request::CreateGraphData { kind, ty, sigma })? {
            Reply::Subgraph(id) => Ok(id),
            other => Err(self.unexpected(other)),
        }
    }

    fn graph_data(&self, id: SubgraphId) -> Result<GraphData> {
        self.graph_data_reply(Request::GraphData { id })
    }

    fn update_graph_data(&self, id: SubgraphId, update: GraphDataUpdate) -> Result<GraphData> {
        self.graph_data_reply(Request::UpdateGraphData { id, update })
    }

    fn register_partial_graph(&self, address: &str) -> Result<PartialGraphId> {
        let request = Request::RegisterPartialGraph {
            address: address.to_owned(),
        };
        match self.call(&request)? {
            Reply::PartialGraph(id) => Ok(id),
            other => Err(self.unexpected(other)),
        }
    }

    fn lookup_partial_graph(&self, id: PartialGraphId) -> Result<String> {
        match self.call(&Request::LookupPartialGraph { id })? {
            Reply::Address(address) => Ok(address),
            other => Err(self.unexpected(other)),
        }
    }

    fn release_partial_graph(&self, id: PartialGraphId) -> Result<()> {
        self.unit(Request::ReleasePartialGraph { id })
    }
}

/// Asks a freshly connected host which partial graph it serves.
pub fn handshake(transport: &dyn Transport) -> Result<PartialGraphId> {
    let raw = transport.roundtrip(&serde_json::to_vec(&Request::Hello)?)?;
    let response: Response = serde_json::from_slice(&raw)?;
    match response.into_result()? {
        Reply::PartialGraph(id) => Ok(id),
        other => Err(GraphError::Transport(format!("unexpected hello reply {other:?}"))),
    }
}
