#![allow(missing_docs)]

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{check_global_sequences, memory_db, person, FROM, KNOWS, PERSON, TO};
use shardgraph::{
    AttrValue, EdgeId, ElementSpec, GlobalId, GraphError, GraphListener, GraphScope, IncidenceId,
    Result, Sigma, TraversalContext, VertexId, ViewGraph,
};

#[test]
fn two_vertices_one_edge_then_delete() -> Result<()> {
    let db = memory_db()?;
    let ctx = TraversalContext::new();
    let v1 = person(&db)?;
    let v2 = person(&db)?;
    let e1 = db.create_edge(ElementSpec::new(KNOWS))?;
    db.connect(FROM, v1, e1)?;
    db.connect(TO, v2, e1)?;

    assert_eq!(db.first_vertex(&ctx)?, Some(v1));
    assert_eq!(db.vertex_count()?, 2);
    assert_eq!(db.edge_count()?, 1);
    assert_eq!(db.incidence_count()?, 2);
    check_global_sequences(&db)?;

    db.delete_vertex(v1)?;
    assert_eq!(db.vertex_count()?, 1);
    assert_eq!(db.edge_count()?, 0);
    assert_eq!(db.incidence_count()?, 0);
    assert!(db.contains_vertex(v2)?);
    assert!(!db.contains_edge(e1)?);
    assert_eq!(db.vertex_info(v2)?.first_incidence, GlobalId::NONE);
    assert_eq!(db.first_vertex(&ctx)?, Some(v2));
    check_global_sequences(&db)?;
    Ok(())
}

#[test]
fn deleting_missing_vertex_reports_not_found() -> Result<()> {
    let db = memory_db()?;
    let v = person(&db)?;
    db.delete_vertex(v)?;
    let err = db.delete_vertex(v).unwrap_err();
    assert!(err.is_not_found(), "unexpected error: {err}");
    assert!(matches!(err, GraphError::NotFound { kind: "vertex", .. }));
    Ok(())
}

#[test]
fn edge_deletion_keeps_vertices() -> Result<()> {
    let db = memory_db()?;
    let a = person(&db)?;
    let b = person(&db)?;
    let e = db.create_edge(ElementSpec::new(KNOWS))?;
    db.connect(FROM, a, e)?;
    db.connect(TO, b, e)?;

    db.delete_edge(e)?;
    assert_eq!(db.vertex_count()?, 2);
    assert_eq!(db.edge_count()?, 0);
    assert_eq!(db.incidence_count()?, 0);
    let ctx = TraversalContext::new();
    assert_eq!(db.incidences_at_vertex(&ctx, a).count(), 0);
    assert_eq!(db.incidences_at_vertex(&ctx, b).count(), 0);
    check_global_sequences(&db)?;
    Ok(())
}

#[test]
fn disconnect_leaves_edge_in_place() -> Result<()> {
    let db = memory_db()?;
    let a = person(&db)?;
    let e = db.create_edge(ElementSpec::new(KNOWS))?;
    let inc = db.connect(FROM, a, e)?;
    let version = db.vertex_info(a)?.incidence_list_version;

    db.disconnect(inc)?;
    assert!(db.contains_edge(e)?);
    assert!(!db.contains_incidence(inc)?);
    assert!(db.vertex_info(a)?.incidence_list_version > version);
    assert_eq!(db.incidence_count()?, 0);
    Ok(())
}

#[test]
fn connect_appends_to_both_lambda_sequences() -> Result<()> {
    let db = memory_db()?;
    let ctx = TraversalContext::new();
    let hub = person(&db)?;
    let mut incidences = Vec::new();
    for _ in 0..3 {
        let other = person(&db)?;
        let e = db.create_edge(ElementSpec::new(KNOWS))?;
        let out = db.connect(FROM, hub, e)?;
        let inc = db.connect(TO, other, e)?;
        incidences.push(out);
        assert_eq!(db.first_incidence_at_edge(&ctx, e)?, Some(out));
        assert_eq!(db.last_incidence_at_edge(&ctx, e)?, Some(inc));
        assert_eq!(db.next_incidence_at_edge(&ctx, out)?, Some(inc));
        assert_eq!(db.prev_incidence_at_edge(&ctx, out)?, None);
    }

    let at_hub = db
        .incidences_at_vertex(&ctx, hub)
        .collect::<Result<Vec<IncidenceId>>>()?;
    assert_eq!(at_hub, incidences);
    assert_eq!(db.last_incidence_at_vertex(&ctx, hub)?, incidences.last().copied());
    assert_eq!(db.prev_incidence_at_vertex(&ctx, incidences[1])?, Some(incidences[0]));
    let info = db.incidence_info(incidences[0])?;
    assert_eq!(info.vertex, hub.global());
    assert_eq!(info.ty, FROM);
    check_global_sequences(&db)?;
    Ok(())
}

#[test]
fn attributes_round_trip_by_name() -> Result<()> {
    let db = memory_db()?;
    let v = person(&db)?;
    assert_eq!(db.get_vertex_attribute(v, "name")?, AttrValue::Null);
    assert_eq!(db.get_vertex_attribute(v, "age")?, AttrValue::Int(0));

    db.set_vertex_attribute(v, "name", AttrValue::Str("ada".into()))?;
    db.set_vertex_attribute(v, "age", AttrValue::Int(36))?;
    let tags = AttrValue::List(vec![AttrValue::Str("math".into()), AttrValue::Str("poetry".into())]);
    db.set_vertex_attribute(v, "tags", tags.clone())?;
    assert_eq!(db.get_vertex_attribute(v, "name")?, AttrValue::Str("ada".into()));
    assert_eq!(db.get_vertex_attribute(v, "age")?, AttrValue::Int(36));
    assert_eq!(db.get_vertex_attribute(v, "tags")?, tags);

    let e = db.create_edge(ElementSpec::new(KNOWS))?;
    db.set_edge_attribute(e, "since", AttrValue::Long(1843))?;
    assert_eq!(db.get_edge_attribute(e, "since")?, AttrValue::Long(1843));

    assert!(matches!(
        db.set_vertex_attribute(v, "age", AttrValue::Str("old".into())),
        Err(GraphError::Attribute(_))
    ));
    assert!(matches!(
        db.get_vertex_attribute(v, "missing"),
        Err(GraphError::Attribute(_))
    ));
    Ok(())
}

#[test]
fn explicit_ids_only_while_loading() -> Result<()> {
    let db = memory_db()?;
    assert!(matches!(
        db.create_vertex(ElementSpec::new(PERSON).with_id(7)),
        Err(GraphError::IdSpace(_))
    ));

    db.set_loading(true);
    assert!(db.is_loading());
    assert!(matches!(
        db.create_vertex(ElementSpec::new(PERSON)),
        Err(GraphError::IdSpace(_))
    ));
    assert!(matches!(
        db.create_vertex(ElementSpec::new(PERSON).with_id(0)),
        Err(GraphError::IdSpace(_))
    ));
    let version = db.vertex_list_version()?;
    let loaded = db.create_vertex(ElementSpec::new(PERSON).with_id(7))?;
    assert_eq!(loaded.local().0, 7);
    assert_eq!(loaded.partial_graph(), db.partial_graph_id());
    assert_eq!(db.vertex_list_version()?, version);
    assert!(db.create_vertex(ElementSpec::new(PERSON).with_id(7)).is_err());
    db.set_loading(false);

    let fresh = person(&db)?;
    assert_ne!(fresh, loaded);
    assert!(db.vertex_list_version()? > version);
    check_global_sequences(&db)?;
    Ok(())
}

#[test]
fn nested_elements_inherit_kappa_and_counts() -> Result<()> {
    let db = memory_db()?;
    let outer = person(&db)?;
    assert_eq!(db.vertex_info(outer)?.kappa, db.config().top_level_kappa);
    assert_eq!(db.subordinate_graph(Sigma::Vertex(outer))?, None);

    let inner = db.create_vertex(ElementSpec::new(PERSON).nested_in(Sigma::Vertex(outer)))?;
    let info = db.vertex_info(inner)?;
    assert_eq!(info.kappa, db.config().top_level_kappa - 1);
    assert_eq!(info.sigma, Sigma::Vertex(outer));

    let deep = db.create_vertex(
        ElementSpec::new(PERSON)
            .nested_in(Sigma::Vertex(inner))
            .kappa(3),
    )?;
    assert_eq!(db.vertex_info(deep)?.kappa, 3);
    assert!(matches!(
        db.create_vertex(
            ElementSpec::new(PERSON)
                .nested_in(Sigma::Vertex(inner))
                .kappa(40)
        ),
        Err(GraphError::Invalid(_))
    ));

    let graph = db
        .subordinate_graph(Sigma::Vertex(outer))?
        .expect("outer owns a subordinate graph");
    assert_eq!(db.create_subordinate_graph(Sigma::Vertex(outer))?, graph);
    let data = db.graph_data(graph)?;
    assert_eq!(data.vertex_count, 2);
    assert_eq!(data.containing_element, Sigma::Vertex(outer));
    assert_eq!(db.vertex_count()?, 3);
    assert_eq!(db.partial_graph(db.partial_graph_id())?.vertex_count, 3);
    Ok(())
}

#[test]
fn reordering_bumps_version_once() -> Result<()> {
    let db = memory_db()?;
    let ctx = TraversalContext::new();
    let a = person(&db)?;
    let b = person(&db)?;
    let c = person(&db)?;

    let version = db.vertex_list_version()?;
    db.put_vertex_before(c, a)?;
    assert_eq!(db.vertex_list_version()?, version + 1);
    let order = db.vertices(&ctx).collect::<Result<Vec<VertexId>>>()?;
    assert_eq!(order, vec![c, a, b]);
    assert_eq!(db.next_vertex(&ctx, c)?, Some(a));
    assert_eq!(db.prev_vertex(&ctx, b)?, Some(a));
    assert_eq!(db.last_vertex(&ctx)?, Some(b));

    db.put_vertex_after(c, b)?;
    assert_eq!(db.vertex_list_version()?, version + 2);
    db.put_vertex_after(c, b)?;
    db.put_vertex_before(a, b)?;
    assert_eq!(db.vertex_list_version()?, version + 2);
    let order = db.vertices(&ctx).collect::<Result<Vec<VertexId>>>()?;
    assert_eq!(order, vec![a, b, c]);
    check_global_sequences(&db)?;
    Ok(())
}

#[test]
fn incidence_moves_need_a_shared_element() -> Result<()> {
    let db = memory_db()?;
    let ctx = TraversalContext::new();
    let hub = person(&db)?;
    let other = person(&db)?;
    let e1 = db.create_edge(ElementSpec::new(KNOWS))?;
    let e2 = db.create_edge(ElementSpec::new(KNOWS))?;
    let i1 = db.connect(FROM, hub, e1)?;
    let i2 = db.connect(FROM, hub, e2)?;
    let foreign = db.connect(TO, other, e2)?;

    let version = db.vertex_info(hub)?.incidence_list_version;
    db.put_incidence_before_at_vertex(i2, i1)?;
    assert_eq!(db.vertex_info(hub)?.incidence_list_version, version + 1);
    assert_eq!(db.first_incidence_at_vertex(&ctx, hub)?, Some(i2));

    db.put_incidence_after_at_edge(i2, foreign)?;
    assert_eq!(db.first_incidence_at_edge(&ctx, e2)?, Some(foreign));
    assert!(matches!(
        db.put_incidence_before_at_vertex(foreign, i1),
        Err(GraphError::Invalid(_))
    ));
    check_global_sequences(&db)?;
    Ok(())
}

#[derive(Default)]
struct Counter {
    vertices_added: AtomicUsize,
    vertices_deleted: AtomicUsize,
    edges_deleted: AtomicUsize,
    incidences_added: AtomicUsize,
    incidences_deleted: AtomicUsize,
}

impl GraphListener for Counter {
    fn vertex_added(&self, _vertex: VertexId) {
        self.vertices_added.fetch_add(1, Ordering::SeqCst);
    }

    fn vertex_deleted(&self, _vertex: VertexId) {
        self.vertices_deleted.fetch_add(1, Ordering::SeqCst);
    }

    fn edge_deleted(&self, _edge: EdgeId) {
        self.edges_deleted.fetch_add(1, Ordering::SeqCst);
    }

    fn incidence_added(&self, _incidence: IncidenceId) {
        self.incidences_added.fetch_add(1, Ordering::SeqCst);
    }

    fn incidence_deleted(&self, _incidence: IncidenceId) {
        self.incidences_deleted.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn listeners_follow_structural_changes() -> Result<()> {
    let db = memory_db()?;
    let counter = Arc::new(Counter::default());
    let listener: Arc<dyn GraphListener> = counter.clone();
    db.add_listener(Arc::downgrade(&listener));

    let a = person(&db)?;
    let b = person(&db)?;
    let e = db.create_edge(ElementSpec::new(KNOWS))?;
    db.connect(FROM, a, e)?;
    db.connect(TO, b, e)?;
    db.delete_vertex(a)?;

    assert_eq!(counter.vertices_added.load(Ordering::SeqCst), 2);
    assert_eq!(counter.vertices_deleted.load(Ordering::SeqCst), 1);
    assert_eq!(counter.edges_deleted.load(Ordering::SeqCst), 1);
    assert_eq!(counter.incidences_added.load(Ordering::SeqCst), 2);
    assert_eq!(counter.incidences_deleted.load(Ordering::SeqCst), 2);

    db.set_loading(true);
    db.create_vertex(ElementSpec::new(PERSON).with_id(100))?;
    db.set_loading(false);
    assert_eq!(counter.vertices_added.load(Ordering::SeqCst), 2);

    drop(listener);
    drop(counter);
    person(&db)?;
    Ok(())
}

#[test]
fn graph_size_reflects_schema_and_counts() -> Result<()> {
    let db = memory_db()?;
    person(&db)?;
    db.create_edge(ElementSpec::new(KNOWS))?;
    let size = db.graph_size()?;
    assert_eq!(size.vertex_count, 1);
    assert_eq!(size.edge_count, 1);
    assert_eq!(size.known_vertex_types, 1);
    assert_eq!(size.known_edge_types, 2);
    assert_eq!(db.partial_graphs()?, vec![db.partial_graph_id()]);
    Ok(())
}

#[test]
fn scoped_iteration_of_a_subordinate_graph() -> Result<()> {
    let db = memory_db()?;
    let outer = person(&db)?;
    let loose = person(&db)?;
    let inner = db.create_vertex(ElementSpec::new(PERSON).nested_in(Sigma::Vertex(outer)))?;
    let graph = db.create_subordinate_graph(Sigma::Vertex(outer))?;

    let mut ctx = TraversalContext::new();
    ctx.set(GraphScope::Subordinate(graph));
    assert_eq!(ctx.depth(), 1);
    let nested = db.vertices(&ctx).collect::<Result<Vec<VertexId>>>()?;
    assert_eq!(nested, vec![inner]);

    ctx.release();
    let all = db.vertices(&ctx).collect::<Result<Vec<VertexId>>>()?;
    assert_eq!(all, vec![outer, loose, inner]);
    check_global_sequences(&db)?;
    Ok(())
}

#[test]
fn vertex_and_edge_containers_with_equal_ids_stay_apart() -> Result<()> {
    let db = memory_db()?;
    let outer = person(&db)?;
    let edge = db.create_edge(ElementSpec::new(KNOWS))?;
    assert_eq!(outer.global(), edge.global());

    let in_vertex = db.create_vertex(ElementSpec::new(PERSON).nested_in(Sigma::Vertex(outer)))?;
    let in_edge = db.create_vertex(ElementSpec::new(PERSON).nested_in(Sigma::Edge(edge)))?;
    let vertex_graph = db.create_subordinate_graph(Sigma::Vertex(outer))?;
    let edge_graph = db.create_subordinate_graph(Sigma::Edge(edge))?;

    let ctx = TraversalContext::with_scope(GraphScope::Subordinate(vertex_graph));
    assert_eq!(db.vertices(&ctx).collect::<Result<Vec<_>>>()?, vec![in_vertex]);
    let ctx = TraversalContext::with_scope(GraphScope::Subordinate(edge_graph));
    assert_eq!(db.vertices(&ctx).collect::<Result<Vec<_>>>()?, vec![in_edge]);

    let view = ViewGraph::new(&db, GraphScope::Subordinate(vertex_graph), 0)?;
    assert_eq!(view.vertex_count(), 1);
    assert!(!view.contains_vertex(in_edge)?);
    Ok(())
}
