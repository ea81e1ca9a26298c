#![allow(missing_docs)]

mod common;

use common::{check_global_sequences, person, schema, walk, FROM, KNOWS, PERSON, TO};
use shardgraph::db::SequenceKind;
use shardgraph::{
    AttrValue, Config, ElementSpec, GraphDatabase, GraphError, Result, Sigma, TraversalContext,
};
use tempfile::tempdir;

#[test]
fn reopen_restores_sequences_counts_and_attributes() -> Result<()> {
    let dir = tempdir()?;
    let (vertices, edges, a, e) = {
        let db = GraphDatabase::create_complete(Config::persistent(dir.path()), schema())?;
        let a = person(&db)?;
        let b = person(&db)?;
        let c = person(&db)?;
        let nested = db.create_vertex(ElementSpec::new(PERSON).nested_in(Sigma::Vertex(c)))?;
        let e = db.create_edge(ElementSpec::new(KNOWS))?;
        db.connect(FROM, a, e)?;
        db.connect(TO, c, e)?;
        db.set_vertex_attribute(a, "name", AttrValue::Str("alpha".into()))?;
        db.set_vertex_attribute(a, "tags", AttrValue::List(vec![AttrValue::Str("x".into())]))?;
        db.set_edge_attribute(e, "since", AttrValue::Long(99))?;
        db.put_vertex_before(c, a)?;
        db.delete_vertex(b)?;
        assert_eq!(db.vertex_info(nested)?.sigma, Sigma::Vertex(c));

        let stats = db.flush()?;
        assert!(stats.records > 0);
        assert_eq!(stats.tombstones, 1);
        let vertices = walk(&db, SequenceKind::Vertices)?;
        let edges = walk(&db, SequenceKind::Edges)?;
        db.shutdown()?;
        (vertices, edges, a, e)
    };

    let db = GraphDatabase::open(Config::persistent(dir.path()), schema())?;
    assert_eq!(walk(&db, SequenceKind::Vertices)?, vertices);
    assert_eq!(walk(&db, SequenceKind::Edges)?, edges);
    assert_eq!(db.vertex_count()?, 3);
    assert_eq!(db.edge_count()?, 1);
    assert_eq!(db.incidence_count()?, 2);
    assert_eq!(db.get_vertex_attribute(a, "name")?, AttrValue::Str("alpha".into()));
    assert_eq!(
        db.get_vertex_attribute(a, "tags")?,
        AttrValue::List(vec![AttrValue::Str("x".into())])
    );
    assert_eq!(db.get_edge_attribute(e, "since")?, AttrValue::Long(99));
    let resident = db.resident_counts();
    assert_eq!(resident.vertices, 3);
    assert_eq!(resident.edges, 1);
    assert_eq!(resident.incidences, 2);
    check_global_sequences(&db)?;
    Ok(())
}

#[test]
fn clean_objects_are_not_rewritten() -> Result<()> {
    let dir = tempdir()?;
    let db = GraphDatabase::create_complete(Config::persistent(dir.path()), schema())?;
    let v = person(&db)?;
    person(&db)?;
    assert_eq!(db.flush()?.records, 2);
    assert_eq!(db.flush()?.records, 0);

    db.set_vertex_attribute(v, "age", AttrValue::Int(4))?;
    assert_eq!(db.flush()?.records, 1);
    Ok(())
}

#[test]
fn changes_after_reopen_survive_another_round() -> Result<()> {
    let dir = tempdir()?;
    let first = {
        let db = GraphDatabase::create_complete(Config::persistent(dir.path()), schema())?;
        let v = person(&db)?;
        db.shutdown()?;
        v
    };
    let (second, version) = {
        let db = GraphDatabase::open(Config::persistent(dir.path()), schema())?;
        db.set_vertex_attribute(first, "age", AttrValue::Int(30))?;
        let second = person(&db)?;
        db.delete_vertex(first)?;
        let version = db.vertex_list_version()?;
        db.shutdown()?;
        (second, version)
    };

    let db = GraphDatabase::open(Config::persistent(dir.path()), schema())?;
    let ctx = TraversalContext::new();
    assert!(!db.contains_vertex(first)?);
    assert_eq!(db.first_vertex(&ctx)?, Some(second));
    assert_eq!(db.vertex_count()?, 1);
    assert_eq!(db.vertex_list_version()?, version);
    let third = person(&db)?;
    assert_ne!(third, second);
    check_global_sequences(&db)?;
    Ok(())
}

#[test]
fn creating_over_an_existing_graph_is_refused() -> Result<()> {
    let dir = tempdir()?;
    let db = GraphDatabase::create_complete(Config::persistent(dir.path()), schema())?;
    db.shutdown()?;
    drop(db);

    let err = GraphDatabase::create_complete(Config::persistent(dir.path()), schema()).unwrap_err();
    assert!(matches!(err, GraphError::Config(_)));
    Ok(())
}

#[test]
fn opening_needs_a_flushed_directory() -> Result<()> {
    let dir = tempdir()?;
    let err = GraphDatabase::open(Config::persistent(dir.path()), schema()).unwrap_err();
    assert!(matches!(err, GraphError::Config(_)));
    let err = GraphDatabase::open(Config::in_memory(), schema()).unwrap_err();
    assert!(matches!(err, GraphError::Config(_)));
    Ok(())
}

#[test]
fn partial_graph_pool_is_persisted() -> Result<()> {
    let dir = tempdir()?;
    {
        let db = GraphDatabase::create_complete(
            Config::persistent(dir.path()).with_listen_address("10.0.0.1:7000"),
            schema(),
        )?;
        db.shutdown()?;
    }
    let db = GraphDatabase::open(Config::persistent(dir.path()), schema())?;
    assert_eq!(db.partial_graph_address(db.partial_graph_id())?, "10.0.0.1:7000");
    assert_eq!(db.partial_graphs()?, vec![db.partial_graph_id()]);
    Ok(())
}
