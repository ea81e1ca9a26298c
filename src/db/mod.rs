//! Distributed graph database: local stores, routing between partial
//! graphs and the operations composed on top of them.

mod access;
mod config;
mod core;
mod graph_data;
mod listener;
mod local;
pub mod remote;
mod router;
mod server;
mod view;

pub use access::{ElementLink, IncidenceLink, PartialGraphAccess};
pub use config::{Config, MAX_PARTIAL_GRAPHS};
pub use self::core::{GraphDatabase, SequenceIter, SequenceKind, TraversalContext};
pub use graph_data::{
    partial_graph_entry, GraphData, GraphDataUpdate, GraphKind, COMPLETE_GRAPH,
    COMPLETE_GRAPH_LOCAL, FIRST_SUBORDINATE_LOCAL, PARTIAL_GRAPH_LOCAL,
};
pub use listener::GraphListener;
pub use local::{FlushStats, LocalStore, ResidentCounts};
pub use remote::{
    Connector, LoopbackNetwork, LoopbackTransport, RemoteStore, TcpConnector, TcpTransport,
    Transport,
};
pub use router::{IdRouter, PartialGraphPool, COMPLETE_GRAPH_HOST};
pub use server::PartialGraphServer;
pub use view::{GraphScope, ViewGraph};
