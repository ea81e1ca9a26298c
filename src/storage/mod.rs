//! Per-partial-graph object storage: schema-driven profiles, the resident
//! object cache, dirty trackers and their write-back into record files.

pub mod cache;
pub mod disk;
pub mod freelist;
pub mod object;
pub mod profile;
pub mod schema;
pub mod tracker;
pub mod types;

pub use cache::{IdTable, ObjectCache};
pub use disk::{RecordKind, RecordStore};
pub use freelist::IdAllocator;
pub use object::{ElementObject, IncidenceObject};
pub use profile::{AttributeSlot, ElementProfile, IncidenceClass, ProfileRegistry};
pub use schema::{
    AggregationKind, AttributeDef, Direction, ElementTypeDef, IncidenceTypeDef, Schema,
    MAX_TYPE_ID,
};
pub use tracker::Tracker;
pub use types::{
    AttrKind, AttrValue, ElementInfo, ElementKind, ElementSpec, GraphSize, IncidenceInfo,
};
