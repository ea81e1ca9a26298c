use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::db::access::PartialGraphAccess;
use crate::db::config::Config;
use crate::db::listener::GraphListener;
use crate::db::local::{FlushStats, LocalStore, ResidentCounts};
use crate::db::remote::{handshake, Connector, RemoteStore};
use crate::db::router::{IdRouter, PartialGraphPool, COMPLETE_GRAPH_HOST};
use crate::db::server::PartialGraphServer;
use crate::primitives::io::FileRegistry;
use crate::storage::{ProfileRegistry, Schema};
use crate::types::{GraphError, PartialGraphId, Result, TypeId};

const META_FILE: &str = "graph.json";

pub(crate) struct Inner {
    pub(crate) config: Config,
    pub(crate) schema: Schema,
    pub(crate) profiles: Arc<ProfileRegistry>,
    pub(crate) store: Arc<Mutex<LocalStore>>,
    pub(crate) router: IdRouter,
    pub(crate) server: Arc<PartialGraphServer>,
    pub(crate) files: Arc<FileRegistry>,
    loading: AtomicBool,
    listeners: RwLock<Vec<Weak<dyn GraphListener>>>,
}

/// Handle on one partial graph host and, through it, the whole distributed
/// graph.
///
/// Cloning is cheap; clones share the local store, router and listeners.
#[derive(Clone)]
pub struct GraphDatabase {
    pub(crate) inner: Arc<Inner>,
}

impl fmt::Debug for GraphDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphDatabase")
            .field("partial_graph", &self.partial_graph_id())
            .field("schema", &self.inner.schema.name)
            .field("data_dir", &self.inner.config.data_dir)
            .field("loading", &self.is_loading())
            .finish()
    }
}

fn open_files(config: &Config) -> Result<Arc<FileRegistry>> {
    Ok(Arc::new(match &config.data_dir {
        Some(dir) => FileRegistry::on_disk(dir)?,
        None => FileRegistry::in_memory(),
    }))
}

fn build_profiles(config: &Config, schema: &Schema) -> Result<Arc<ProfileRegistry>> {
    config.validate()?;
    schema.validate()?;
    Ok(Arc::new(ProfileRegistry::build(schema)?))
}

impl GraphDatabase {
    /// Creates a new distributed graph whose complete graph and partial
    /// graph pool live on this host, as partial graph 1.
    pub fn create_complete(config: Config, schema: Schema) -> Result<Self> {
        Self::create_complete_with(config, schema, None)
    }

    /// Like [`GraphDatabase::create_complete`], reaching joined partial
    /// graphs through `connector`.
    pub fn create_complete_with(
        config: Config,
        schema: Schema,
        connector: Option<Arc<dyn Connector>>,
    ) -> Result<Self> {
        let profiles = build_profiles(&config, &schema)?;
        let files = open_files(&config)?;
        if files.exists(META_FILE) {
            return Err(GraphError::Config(
                "data directory already holds a graph, open it instead".into(),
            ));
        }
        let mut store = LocalStore::create(
            COMPLETE_GRAPH_HOST,
            TypeId(schema.graph_type),
            Arc::clone(&profiles),
            Arc::clone(&files),
            config.initial_cache_capacity,
        )?;
        let address = config.listen_address.as_deref().unwrap_or("local");
        store.install_pool(PartialGraphPool::new(config.max_partial_graphs, address)?);
        info!(schema = %schema.name, %address, "graphdb.complete.created");
        Ok(Self::assemble(config, schema, profiles, files, store, connector, None))
    }

    /// Joins the distributed graph whose complete graph host is reachable
    /// at `complete_address`, registering this host under
    /// `config.listen_address`.
    pub fn join(
        config: Config,
        schema: Schema,
        connector: Arc<dyn Connector>,
        complete_address: &str,
    ) -> Result<Self> {
        let profiles = build_profiles(&config, &schema)?;
        let address = config
            .listen_address
            .clone()
            .ok_or_else(|| GraphError::Config("joining requires a listen address".into()))?;
        let transport = connector.connect(complete_address)?;
        let host = handshake(transport.as_ref())?;
        if host != COMPLETE_GRAPH_HOST {
            return Err(GraphError::Invalid("address does not serve the complete graph"));
        }
        let complete: Arc<dyn PartialGraphAccess> =
            Arc::new(RemoteStore::new(COMPLETE_GRAPH_HOST, transport));
        let partial_graph = complete.register_partial_graph(&address)?;
        let files = open_files(&config)?;
        let store = LocalStore::create(
            partial_graph,
            TypeId(schema.graph_type),
            Arc::clone(&profiles),
            Arc::clone(&files),
            config.initial_cache_capacity,
        )?;
        info!(partial_graph = partial_graph.0, %address, complete = complete_address, "graphdb.joined");
        let db = Self::assemble(
            config,
            schema,
            profiles,
            files,
            store,
            Some(connector),
            Some(complete_address.to_owned()),
        );
        db.inner.router.attach(COMPLETE_GRAPH_HOST, complete);
        Ok(db)
    }

    /// Reopens a host flushed into `config.data_dir`.
    pub fn open(config: Config, schema: Schema) -> Result<Self> {
        Self::open_with(config, schema, None, None)
    }

    /// Like [`GraphDatabase::open`], reconnecting to the other partial
    /// graphs through `connector`.
    pub fn open_with(
        config: Config,
        schema: Schema,
        connector: Option<Arc<dyn Connector>>,
        complete_address: Option<String>,
    ) -> Result<Self> {
        if config.data_dir.is_none() {
            return Err(GraphError::Config("opening requires a data directory".into()));
        }
        let profiles = build_profiles(&config, &schema)?;
        let files = open_files(&config)?;
        let store = LocalStore::open(
            Arc::clone(&profiles),
            Arc::clone(&files),
            config.initial_cache_capacity,
        )?;
        Ok(Self::assemble(config, schema, profiles, files, store, connector, complete_address))
    }

    fn assemble(
        config: Config,
        schema: Schema,
        profiles: Arc<ProfileRegistry>,
        files: Arc<FileRegistry>,
        store: LocalStore,
        connector: Option<Arc<dyn Connector>>,
        complete_address: Option<String>,
    ) -> Self {
        let store = Arc::new(Mutex::new(store));
        let access: Arc<dyn PartialGraphAccess> = store.clone();
        let mut router = IdRouter::new(Arc::clone(&access));
        if let Some(connector) = connector {
            router = router.with_connector(connector, complete_address);
        }
        Self {
            inner: Arc::new(Inner {
                config,
                schema,
                profiles,
                store,
                router,
                server: Arc::new(PartialGraphServer::new(access)),
                files,
                loading: AtomicBool::new(false),
                listeners: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Id of the partial graph this handle hosts.
    pub fn partial_graph_id(&self) -> PartialGraphId {
        self.inner.router.local_id()
    }

    /// Host options.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Graph schema.
    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    /// Element profiles built from the schema.
    pub fn profiles(&self) -> &Arc<ProfileRegistry> {
        &self.inner.profiles
    }

    /// Server that answers other hosts' calls against the local store.
    pub fn server(&self) -> Arc<PartialGraphServer> {
        Arc::clone(&self.inner.server)
    }

    /// Objects resident in the local store.
    pub fn resident_counts(&self) -> ResidentCounts {
        self.inner.store.lock().resident_counts()
    }

    pub(crate) fn router(&self) -> &IdRouter {
        &self.inner.router
    }

    /// Enters or leaves bulk-load mode. While loading, element ids must be
    /// given explicitly and listeners are not notified.
    pub fn set_loading(&self, loading: bool) {
        self.inner.loading.store(loading, Ordering::Release);
        debug!(loading, "graphdb.loading");
    }

    /// Returns true in bulk-load mode.
    pub fn is_loading(&self) -> bool {
        self.inner.loading.load(Ordering::Acquire)
    }

    /// Registers a structural listener. The database keeps only a weak
    /// reference; dropped listeners are pruned on the next notification.
    pub fn add_listener(&self, listener: Weak<dyn GraphListener>) {
        self.inner.listeners.write().push(listener);
    }

    pub(crate) fn notify(&self, event: impl Fn(&dyn GraphListener)) {
        if self.is_loading() {
            return;
        }
        let live: Vec<Arc<dyn GraphListener>> = {
            let mut listeners = self.inner.listeners.write();
            listeners.retain(|l| l.strong_count() > 0);
            listeners.iter().filter_map(Weak::upgrade).collect()
        };
        for listener in live {
            event(listener.as_ref());
        }
    }

    /// Writes every pending change of the local store.
    pub fn flush(&self) -> Result<FlushStats> {
        self.inner.store.lock().flush()
    }

    /// Flushes and syncs every backing file. The handle must not be used for
    /// writes afterwards.
    pub fn shutdown(&self) -> Result<()> {
        self.flush()?;
        self.inner.files.shutdown()?;
        info!(partial_graph = self.partial_graph_id().0, "graphdb.shutdown");
        Ok(())
    }
}
