#![allow(dead_code)]

use shardgraph::db::SequenceKind;
use shardgraph::storage::{AggregationKind, AttributeDef, Direction};
use shardgraph::{
    AttrKind, Config, EdgeId, ElementSpec, GlobalId, GraphDatabase, Result, Schema, TraversalContext,
    TypeId, VertexId,
};

pub const PERSON: TypeId = TypeId(2);
pub const KNOWS: TypeId = TypeId(3);
pub const HAS_PART: TypeId = TypeId(4);
pub const FROM: TypeId = TypeId(5);
pub const TO: TypeId = TypeId(6);
pub const WHOLE: TypeId = TypeId(7);
pub const PART: TypeId = TypeId(8);

pub fn schema() -> Schema {
    Schema::new("people")
        .vertex_type(
            PERSON.0,
            "Person",
            vec![
                AttributeDef::new("name", AttrKind::String),
                AttributeDef::new("age", AttrKind::Int),
                AttributeDef::new("tags", AttrKind::List(Box::new(AttrKind::String))),
            ],
        )
        .edge_type(KNOWS.0, "Knows", vec![AttributeDef::new("since", AttrKind::Long)])
        .edge_type(HAS_PART.0, "HasPart", Vec::new())
        .incidence_type(FROM.0, "from", Direction::Out, AggregationKind::None)
        .incidence_type(TO.0, "to", Direction::In, AggregationKind::None)
        .incidence_type(WHOLE.0, "whole", Direction::Out, AggregationKind::Composite)
        .incidence_type(PART.0, "part", Direction::In, AggregationKind::None)
}

pub fn memory_db() -> Result<GraphDatabase> {
    GraphDatabase::create_complete(Config::in_memory(), schema())
}

pub fn person(db: &GraphDatabase) -> Result<VertexId> {
    db.create_vertex(ElementSpec::new(PERSON))
}

/// Walks `seq` in both directions, checks that the two walks mirror each
/// other and returns the forward order.
pub fn walk(db: &GraphDatabase, seq: SequenceKind) -> Result<Vec<GlobalId>> {
    let ctx = TraversalContext::new();
    let forward = db.sequence(&ctx, seq, true).collect::<Result<Vec<_>>>()?;
    let mut backward = db.sequence(&ctx, seq, false).collect::<Result<Vec<_>>>()?;
    backward.reverse();
    assert_eq!(forward, backward, "{seq:?} differs between directions");
    Ok(forward)
}

/// Checks every sequence against the complete graph's counts.
pub fn check_global_sequences(db: &GraphDatabase) -> Result<()> {
    let vertices = walk(db, SequenceKind::Vertices)?;
    let edges = walk(db, SequenceKind::Edges)?;
    assert_eq!(vertices.len() as u64, db.vertex_count()?);
    assert_eq!(edges.len() as u64, db.edge_count()?);

    let mut at_vertices = 0;
    for vertex in &vertices {
        at_vertices += walk(db, SequenceKind::AtVertex(VertexId(*vertex)))?.len();
    }
    let mut at_edges = 0;
    for edge in &edges {
        at_edges += walk(db, SequenceKind::AtEdge(EdgeId(*edge)))?.len();
    }
    assert_eq!(at_vertices, at_edges);
    assert_eq!(at_vertices as u64, db.incidence_count()?);
    Ok(())
}
