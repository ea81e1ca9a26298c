mod elements;
mod graphdb;
mod graphs;
mod incidences;
mod sequence;
mod traversal;

pub use graphdb::GraphDatabase;
pub use sequence::SequenceKind;
pub use traversal::{SequenceIter, TraversalContext};
