//! Host side of cross-partial-graph calls.

use std::io::{BufReader, BufWriter};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use tracing::{debug, info, warn};

use super::access::PartialGraphAccess;
use super::remote::protocol::{read_frame, write_frame, Reply, Request, Response};
use crate::types::{GraphError, Result};

/// Dispatches decoded requests to the local store of one partial graph.
pub struct PartialGraphServer {
    store: Arc<dyn PartialGraphAccess>,
}

impl PartialGraphServer {
    /// Server for `store`.
    pub fn new(store: Arc<dyn PartialGraphAccess>) -> Self {
        Self { store }
    }

    /// Executes one request.
    pub fn handle(&self, request: Request) -> Response {
        Response::from_result(self.dispatch(request))
    }

    fn dispatch(&self, request: Request) -> Result<Reply> {
        let store = &self.store;
        Ok(match request {
            Request::Hello => Reply::PartialGraph(store.partial_graph_id()),
            Request::CreateElement {
                kind,
                ty,
                local,
                sigma,
                kappa,
            } => Reply::Id(store.create_element(kind, ty, local, sigma, kappa)?),
            Request::RemoveElement { kind, id } => {
                store.remove_element(kind, id)?;
                Reply::Unit
            }
            Request::ContainsElement { kind, id } => Reply::Flag(store.contains_element(kind, id)?),
            Request::ElementInfo { kind, id } => Reply::Element(store.element_info(kind, id)?),
            Request::SetElementLink {
                kind,
                id,
                link,
                value,
            } => {
                store.set_element_link(kind, id, link, value)?;
                Reply::Unit
            }
            Request::BumpIncidenceListVersion { kind, id } => {
                Reply::Version(store.bump_incidence_list_version(kind, id)?)
            }
            Request::GetAttribute { kind, id, name } => {
                Reply::Value(store.get_attribute(kind, id, &name)?)
            }
            Request::SetAttribute {
                kind,
                id,
                name,
                value,
            } => {
                store.set_attribute(kind, id, &name, value)?;
                Reply::Unit
            }
            Request::CreateIncidence { ty, vertex, edge } => {
                Reply::Id(store.create_incidence(ty, vertex, edge)?)
            }
            Request::RemoveIncidence { id } => {
                store.remove_incidence(id)?;
                Reply::Unit
            }
            Request::IncidenceInfo { id } => Reply::Incidence(store.incidence_info(id)?),
            Request::SetIncidenceLink { id, link, value } => {
                store.set_incidence_link(id, link, value)?;
                Reply::Unit
            }
            Request::CreateGraphData { kind, ty, sigma } => {
                Reply::Subgraph(store.create_graph_data(kind, ty, sigma)?)
            }
            Request::GraphData { id } => Reply::GraphData(store.graph_data(id)?),
            Request::UpdateGraphData { id, update } => {
                Reply::GraphData(store.update_graph_data(id, update)?)
            }
            Request::RegisterPartialGraph { address } => {
                Reply::PartialGraph(store.register_partial_graph(&address)?)
            }
            Request::LookupPartialGraph { id } => Reply::Address(store.lookup_partial_graph(id)?),
            Request::ReleasePartialGraph { id } => {
                store.release_partial_graph(id)?;
                Reply::Unit
            }
        })
    }

    /// Decodes a request frame, executes it and encodes the response.
    pub fn handle_frame(&self, frame: &[u8]) -> Vec<u8> {
        let response = match serde_json::from_slice::<Request>(frame) {
            Ok(request) => self.handle(request),
            Err(err) => Response::from_result(Err(GraphError::from(err))),
        };
        serde_json::to_vec(&response).unwrap_or_else(|err| {
            warn!(error = %err, "server.response.encode_failed");
            Vec::new()
        })
    }

    /// Accepts connections until the listener fails, serving each on its
    /// own thread.
    pub fn serve(self: Arc<Self>, listener: TcpListener) -> Result<()> {
        info!(
            partial_graph = self.store.partial_graph_id().0,
            address = %listener.local_addr()?,
            "server.listening"
        );
        for stream in listener.incoming() {
            let stream = stream?;
            let server = Arc::clone(&self);
            thread::spawn(move || {
                let peer = stream.peer_addr().map(|addr| addr.to_string()).unwrap_or_default();
                if let Err(err) = server.serve_connection(stream) {
                    warn!(%peer, error = %err, "server.connection.failed");
                }
            });
        }
        Ok(())
    }

    /// Serves one connection until the peer hangs up.
    pub fn serve_connection(&self, stream: TcpStream) -> Result<()> {
        stream.set_nodelay(true)?;
        let mut reader = BufReader::new(stream.try_clone()?);
        let mut writer = BufWriter::new(stream);
        let mut served = 0u64;
        while let Some(frame) = read_frame(&mut reader)? {
            let response = self.handle_frame(&frame);
            write_frame(&mut writer, &response)?;
            served += 1;
        }
        debug!(served, "server.connection.closed");
        Ok(())
    }
}
