//! Id-based routing between partial graphs.
//!
//! The upper half of every [`GlobalId`] names the partial graph that owns the
//! object. [`IdRouter`] turns that into a [`PartialGraphAccess`] handle: the
//! local store for our own ids, a lazily connected [`RemoteStore`] for
//! everything else.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::access::PartialGraphAccess;
use super::remote::{Connector, RemoteStore};
use crate::storage::IdAllocator;
use crate::types::{GlobalId, GraphError, LocalId, PartialGraphId, Result};

/// Partial graph that hosts the complete graph and the pool.
pub const COMPLETE_GRAPH_HOST: PartialGraphId = PartialGraphId(1);

/// Bounded pool of partial graph ids, kept by the complete graph host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialGraphPool {
    ids: IdAllocator,
    addresses: Vec<Option<String>>,
}

impl PartialGraphPool {
    /// Pool of `capacity` ids; id 1 is registered to the complete graph host.
    pub fn new(capacity: u32, host_address: &str) -> Result<Self> {
        let mut pool = Self {
            ids: IdAllocator::bounded(capacity),
            addresses: vec![None; capacity as usize + 1],
        };
        let first = pool.allocate(host_address)?;
        debug_assert_eq!(first, COMPLETE_GRAPH_HOST);
        Ok(pool)
    }

    /// Allocates an id for the partial graph reachable at `address`.
    pub fn allocate(&mut self, address: &str) -> Result<PartialGraphId> {
        let id = self.ids.allocate().map_err(|err| match err {
            GraphError::Capacity(_) => GraphError::Capacity("no free partial graph id"),
            other => other,
        })?;
        self.addresses[id.0 as usize] = Some(address.to_owned());
        Ok(PartialGraphId(id.0))
    }

    /// Returns an id to the pool.
    pub fn release(&mut self, id: PartialGraphId) -> Result<()> {
        if id == COMPLETE_GRAPH_HOST {
            return Err(GraphError::Invalid("the complete graph host cannot be released"));
        }
        self.addresses
            .get_mut(id.0 as usize)
            .and_then(Option::take)
            .ok_or_else(|| not_registered(id))?;
        self.ids.release(LocalId(id.0));
        Ok(())
    }

    /// Address a registered partial graph is reachable at.
    pub fn address_of(&self, id: PartialGraphId) -> Result<&str> {
        self.addresses
            .get(id.0 as usize)
            .and_then(Option::as_deref)
            .ok_or_else(|| not_registered(id))
    }

    /// Registered partial graphs.
    pub fn registered(&self) -> impl Iterator<Item = PartialGraphId> + '_ {
        self.addresses
            .iter()
            .enumerate()
            .filter(|(_, addr)| addr.is_some())
            .map(|(id, _)| PartialGraphId(id as u32))
    }
}

fn not_registered(id: PartialGraphId) -> GraphError {
    GraphError::not_found("partial graph", GlobalId::new(id, LocalId(0)))
}

/// Resolves ids to the partial graph that serves them.
pub struct IdRouter {
    local_id: PartialGraphId,
    local: Arc<dyn PartialGraphAccess>,
    connector: Option<Arc<dyn Connector>>,
    complete_address: Option<String>,
    remotes: RwLock<FxHashMap<PartialGraphId, Arc<dyn PartialGraphAccess>>>,
}

impl IdRouter {
    /// Router that can only reach the local partial graph until a connector
    /// is attached.
    pub fn new(local: Arc<dyn PartialGraphAccess>) -> Self {
        Self {
            local_id: local.partial_graph_id(),
            local,
            connector: None,
            complete_address: None,
            remotes: RwLock::new(FxHashMap::default()),
        }
    }

    /// Connects to other partial graphs through `connector`. Addresses are
    /// looked up on the complete graph host, itself reached at
    /// `complete_address` unless this is that host.
    pub fn with_connector(
        mut self,
        connector: Arc<dyn Connector>,
        complete_address: Option<String>,
    ) -> Self {
        self.connector = Some(connector);
        self.complete_address = complete_address;
        self
    }

    /// Id of the local partial graph.
    pub fn local_id(&self) -> PartialGraphId {
        self.local_id
    }

    /// Global id of a local object.
    pub fn global(&self, local: LocalId) -> GlobalId {
        GlobalId::new(self.local_id, local)
    }

    /// Local part of `id` if this partial graph owns it.
    pub fn local_of(&self, id: GlobalId) -> Option<LocalId> {
        self.is_local(id).then(|| id.local())
    }

    /// Owning partial graph of `id`.
    pub fn partial_graph_of(&self, id: GlobalId) -> PartialGraphId {
        id.partial_graph()
    }

    /// Returns true when this partial graph owns `id`.
    pub fn is_local(&self, id: GlobalId) -> bool {
        id.partial_graph() == self.local_id
    }

    /// Local store handle.
    pub fn local(&self) -> &Arc<dyn PartialGraphAccess> {
        &self.local
    }

    /// Handle serving the object `id`.
    pub fn route(&self, id: GlobalId) -> Result<Arc<dyn PartialGraphAccess>> {
        if id.is_none() {
            return Err(GraphError::Invalid("id 0 does not name an object"));
        }
        self.access(id.partial_graph())
    }

    /// Handle of the complete graph host.
    pub fn complete_graph(&self) -> Result<Arc<dyn PartialGraphAccess>> {
        self.access(COMPLETE_GRAPH_HOST)
    }

    /// Handle of partial graph `id`, connecting on first use.
    pub fn access(&self, id: PartialGraphId) -> Result<Arc<dyn PartialGraphAccess>> {
        if id == self.local_id {
            return Ok(Arc::clone(&self.local));
        }
        if let Some(remote) = self.remotes.read().get(&id) {
            return Ok(Arc::clone(remote));
        }
        let remote = self.connect(id).map_err(|err| {
            warn!(partial_graph = id.0, error = %err, "router.remote.failed");
            match err {
                GraphError::Remote { .. } => err,
                other => GraphError::Remote {
                    partial_graph: id,
                    source: Box::new(other),
                },
            }
        })?;
        let mut remotes = self.remotes.write();
        let handle = remotes.entry(id).or_insert(remote);
        Ok(Arc::clone(handle))
    }

    fn connect(&self, id: PartialGraphId) -> Result<Arc<dyn PartialGraphAccess>> {
        let connector = self
            .connector
            .as_ref()
            .ok_or_else(|| GraphError::Transport("no connector for remote partial graphs".into()))?;
        let address = if id == COMPLETE_GRAPH_HOST {
            self.complete_address
                .clone()
                .ok_or_else(|| GraphError::Transport("complete graph address unknown".into()))?
        } else {
            self.complete_graph()?.lookup_partial_graph(id)?
        };
        let transport = connector.connect(&address)?;
        debug!(partial_graph = id.0, %address, "router.remote.connected");
        Ok(Arc::new(RemoteStore::new(id, transport)))
    }

    /// Installs a handle for `id`, replacing any connected one.
    pub fn attach(&self, id: PartialGraphId, access: Arc<dyn PartialGraphAccess>) {
        self.remotes.write().insert(id, access);
    }

    /// Drops the cached handle for `id`; the next call reconnects.
    pub fn detach(&self, id: PartialGraphId) {
        self.remotes.write().remove(&id);
    }
}
