//! Shardgraph: a disk-oriented graph store partitioned into partial graphs.
//!
//! Every vertex, edge and incidence is addressed by a [`types::GlobalId`]
//! naming the partial graph that hosts it. A [`db::GraphDatabase`] serves
//! one partial graph from an arena-backed object cache and forwards
//! operations on foreign ids to the owning host.

#![warn(missing_docs)]

pub mod db;
pub mod logging;
pub mod primitives;
pub mod storage;
pub mod types;

pub use db::{Config, GraphDatabase, GraphListener, GraphScope, TraversalContext, ViewGraph};
pub use logging::init_logging;
pub use storage::{AttrKind, AttrValue, ElementSpec, Schema};
pub use types::{
    EdgeId, GlobalId, GraphError, IncidenceId, LocalId, PartialGraphId, Result, Sigma, SubgraphId,
    TypeId, VertexId,
};
