#![allow(missing_docs)]

mod common;

use common::{check_global_sequences, memory_db, person, FROM, HAS_PART, KNOWS, PART, PERSON, TO, WHOLE};
use shardgraph::{
    EdgeId, ElementSpec, GraphDatabase, Result, Sigma, TraversalContext, VertexId,
};

fn own(db: &GraphDatabase, whole: VertexId, part: VertexId) -> Result<EdgeId> {
    let edge = db.create_edge(ElementSpec::new(HAS_PART))?;
    db.connect(WHOLE, whole, edge)?;
    db.connect(PART, part, edge)?;
    Ok(edge)
}

#[test]
fn deleting_owner_deletes_owned_part() -> Result<()> {
    let db = memory_db()?;
    let a = person(&db)?;
    let b = person(&db)?;
    let bystander = person(&db)?;
    let link = own(&db, a, b)?;
    let knows = db.create_edge(ElementSpec::new(KNOWS))?;
    db.connect(FROM, b, knows)?;
    db.connect(TO, bystander, knows)?;

    db.delete_vertex(a)?;
    assert!(!db.contains_vertex(a)?);
    assert!(!db.contains_vertex(b)?);
    assert!(!db.contains_edge(link)?);
    assert!(!db.contains_edge(knows)?);
    assert!(db.contains_vertex(bystander)?);
    assert_eq!(db.vertex_count()?, 1);
    assert_eq!(db.edge_count()?, 0);
    assert_eq!(db.incidence_count()?, 0);
    let ctx = TraversalContext::new();
    assert_eq!(db.incidences_at_vertex(&ctx, bystander).count(), 0);
    check_global_sequences(&db)?;
    Ok(())
}

#[test]
fn ownership_cascades_transitively() -> Result<()> {
    let db = memory_db()?;
    let chain = (0..4).map(|_| person(&db)).collect::<Result<Vec<_>>>()?;
    for pair in chain.windows(2) {
        own(&db, pair[0], pair[1])?;
    }

    db.delete_vertex(chain[0])?;
    assert_eq!(db.vertex_count()?, 0);
    assert_eq!(db.edge_count()?, 0);
    check_global_sequences(&db)?;
    Ok(())
}

#[test]
fn deleting_part_keeps_owner() -> Result<()> {
    let db = memory_db()?;
    let a = person(&db)?;
    let b = person(&db)?;
    let link = own(&db, a, b)?;

    db.delete_vertex(b)?;
    assert!(db.contains_vertex(a)?);
    assert!(!db.contains_edge(link)?);
    assert_eq!(db.vertex_count()?, 1);
    let ctx = TraversalContext::new();
    assert_eq!(db.first_incidence_at_vertex(&ctx, a)?, None);
    check_global_sequences(&db)?;
    Ok(())
}

#[test]
fn mutual_ownership_terminates() -> Result<()> {
    let db = memory_db()?;
    let a = person(&db)?;
    let b = person(&db)?;
    own(&db, a, b)?;
    own(&db, b, a)?;

    db.delete_vertex(a)?;
    assert_eq!(db.vertex_count()?, 0);
    assert_eq!(db.edge_count()?, 0);
    assert_eq!(db.incidence_count()?, 0);
    Ok(())
}

#[test]
fn composite_edge_with_more_ends_does_not_cascade() -> Result<()> {
    let db = memory_db()?;
    let owner = person(&db)?;
    let left = person(&db)?;
    let right = person(&db)?;
    let edge = db.create_edge(ElementSpec::new(HAS_PART))?;
    db.connect(WHOLE, owner, edge)?;
    db.connect(PART, left, edge)?;
    db.connect(PART, right, edge)?;

    db.delete_vertex(owner)?;
    assert!(db.contains_vertex(left)?);
    assert!(db.contains_vertex(right)?);
    assert!(db.contains_edge(edge)?);
    let ctx = TraversalContext::new();
    assert_eq!(db.incidences_at_edge(&ctx, edge).count(), 2);
    assert_eq!(db.incidence_count()?, 2);
    check_global_sequences(&db)?;
    Ok(())
}

#[test]
fn nested_elements_go_with_their_container() -> Result<()> {
    let db = memory_db()?;
    let outer = person(&db)?;
    let keep = person(&db)?;
    let inner = db.create_vertex(ElementSpec::new(PERSON).nested_in(Sigma::Vertex(outer)))?;
    let deeper = db.create_vertex(ElementSpec::new(PERSON).nested_in(Sigma::Vertex(inner)))?;
    let nested_edge = db.create_edge(ElementSpec::new(KNOWS).nested_in(Sigma::Vertex(outer)))?;
    db.connect(FROM, inner, nested_edge)?;
    db.connect(TO, keep, nested_edge)?;
    let in_edge = db.create_vertex(ElementSpec::new(PERSON).nested_in(Sigma::Edge(nested_edge)))?;

    db.delete_vertex(outer)?;
    for vertex in [outer, inner, deeper, in_edge] {
        assert!(!db.contains_vertex(vertex)?, "{vertex} survived");
    }
    assert!(!db.contains_edge(nested_edge)?);
    assert!(db.contains_vertex(keep)?);
    assert_eq!(db.vertex_count()?, 1);
    assert_eq!(db.edge_count()?, 0);
    assert_eq!(db.incidence_count()?, 0);
    check_global_sequences(&db)?;
    Ok(())
}

#[test]
fn deleting_edge_never_cascades_to_vertices() -> Result<()> {
    let db = memory_db()?;
    let a = person(&db)?;
    let b = person(&db)?;
    let link = own(&db, a, b)?;

    db.delete_edge(link)?;
    assert!(db.contains_vertex(a)?);
    assert!(db.contains_vertex(b)?);
    assert_eq!(db.incidence_count()?, 0);
    check_global_sequences(&db)?;
    Ok(())
}

#[test]
fn self_loop_is_removed_with_its_vertex() -> Result<()> {
    let db = memory_db()?;
    let a = person(&db)?;
    let other = person(&db)?;
    let edge = db.create_edge(ElementSpec::new(KNOWS))?;
    db.connect(FROM, a, edge)?;
    db.connect(TO, a, edge)?;

    db.delete_vertex(a)?;
    assert!(!db.contains_edge(edge)?);
    assert!(db.contains_vertex(other)?);
    assert_eq!(db.incidence_count()?, 0);
    check_global_sequences(&db)?;
    Ok(())
}
