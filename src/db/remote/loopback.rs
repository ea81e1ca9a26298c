use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::{Connector, Transport};
use crate::db::server::PartialGraphServer;
use crate::types::{GraphError, Result};

type HostTable = Arc<Mutex<FxHashMap<String, Arc<PartialGraphServer>>>>;

/// In-process network of partial graph hosts addressed by name.
///
/// Frames still go through the JSON codec, so loopback calls exercise the
/// same protocol as TCP ones.
#[derive(Clone, Default)]
pub struct LoopbackNetwork {
    hosts: HostTable,
}

impl LoopbackNetwork {
    /// Empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `server` reachable at `address`.
    pub fn register(&self, address: impl Into<String>, server: Arc<PartialGraphServer>) {
        self.hosts.lock().insert(address.into(), server);
    }

    /// Takes a host off the network; transports to it start failing.
    pub fn unregister(&self, address: &str) -> bool {
        self.hosts.lock().remove(address).is_some()
    }
}

impl Connector for LoopbackNetwork {
    fn connect(&self, address: &str) -> Result<Arc<dyn Transport>> {
        if !self.hosts.lock().contains_key(address) {
            return Err(GraphError::Transport(format!("no host at {address}")));
        }
        Ok(Arc::new(LoopbackTransport {
            address: address.to_owned(),
            hosts: Arc::clone(&self.hosts),
        }))
    }
}

/// Transport to one host of a [`LoopbackNetwork`].
pub struct LoopbackTransport {
    address: String,
    hosts: HostTable,
}

impl Transport for LoopbackTransport {
    fn roundtrip(&self, frame: &[u8]) -> Result<Vec<u8>> {
        let server = self
            .hosts
            .lock()
            .get(&self.address)
            .cloned()
            .ok_or_else(|| GraphError::Transport(format!("host {} unreachable", self.address)))?;
        Ok(server.handle_frame(frame))
    }
}
