#![allow(missing_docs)]

mod common;

use std::cmp::Ordering;

use common::{memory_db, person, FROM, KNOWS, PERSON, TO};
use shardgraph::{
    AttrValue, ElementSpec, GraphDatabase, GraphScope, Result, Sigma, TraversalContext, VertexId,
    ViewGraph,
};

struct Layers {
    top: VertexId,
    middle: VertexId,
    bottom: VertexId,
}

/// Top-level vertex at kappa 16, one nested at 15 and one at 5.
fn layers(db: &GraphDatabase) -> Result<Layers> {
    let top = person(db)?;
    let middle = db.create_vertex(ElementSpec::new(PERSON).nested_in(Sigma::Vertex(top)))?;
    let bottom = db.create_vertex(
        ElementSpec::new(PERSON)
            .nested_in(Sigma::Vertex(middle))
            .kappa(5),
    )?;
    Ok(Layers {
        top,
        middle,
        bottom,
    })
}

#[test]
fn threshold_hides_deeper_elements() -> Result<()> {
    let db = memory_db()?;
    let Layers {
        top,
        middle,
        bottom,
    } = layers(&db)?;

    let view = ViewGraph::new(&db, GraphScope::Complete, 10)?;
    assert!(view.contains_vertex(top)?);
    assert!(view.contains_vertex(middle)?);
    assert!(!view.contains_vertex(bottom)?);
    assert_eq!(view.vertex_count(), 2);
    assert_eq!(view.first_vertex()?, Some(top));
    assert_eq!(view.last_vertex()?, Some(middle));

    let strict = ViewGraph::new(&db, GraphScope::Complete, 16)?;
    assert_eq!(strict.vertex_count(), 1);
    assert_eq!(strict.last_vertex()?, Some(top));

    let ctx = TraversalContext::with_scope(view.scope());
    let visible = db.vertices(&ctx).collect::<Result<Vec<_>>>()?;
    assert_eq!(visible, vec![top, middle]);
    assert_eq!(db.vertex_count()?, 3);
    Ok(())
}

#[test]
fn counts_follow_changes_without_recount() -> Result<()> {
    let db = memory_db()?;
    let Layers { top, bottom, .. } = layers(&db)?;
    let view = ViewGraph::new(&db, GraphScope::Complete, 10)?;
    assert_eq!((view.vertex_count(), view.edge_count()), (2, 0));

    let other = person(&db)?;
    let hidden = db.create_vertex(
        ElementSpec::new(PERSON)
            .nested_in(Sigma::Vertex(other))
            .kappa(2),
    )?;
    assert_eq!(view.vertex_count(), 3);

    let edge = db.create_edge(ElementSpec::new(KNOWS))?;
    db.connect(FROM, top, edge)?;
    db.connect(TO, other, edge)?;
    let hidden_edge = db.create_edge(ElementSpec::new(KNOWS).nested_in(Sigma::Vertex(bottom)))?;
    db.connect(FROM, bottom, hidden_edge)?;
    db.connect(TO, hidden, hidden_edge)?;
    assert_eq!(view.edge_count(), 1);
    assert_eq!(view.incidence_count(), 2);
    assert_eq!(view.first_edge()?, Some(edge));
    assert_eq!(view.last_edge()?, Some(edge));

    db.delete_vertex(other)?;
    assert_eq!(view.vertex_count(), 2);
    assert_eq!(view.edge_count(), 0);
    assert_eq!(view.incidence_count(), 0);
    assert!(!db.contains_vertex(hidden)?);
    Ok(())
}

#[test]
fn views_nest() -> Result<()> {
    let db = memory_db()?;
    let Layers { top, middle, .. } = layers(&db)?;
    let outer = ViewGraph::new(&db, GraphScope::Complete, 10)?;
    let inner = ViewGraph::new(&db, outer.scope(), 16)?;
    assert!(inner.contains_vertex(top)?);
    assert!(!inner.contains_vertex(middle)?);
    assert_eq!(inner.vertex_count(), 1);

    let loose = ViewGraph::new(&db, outer.scope(), 0)?;
    assert_eq!(loose.vertex_count(), 2);
    assert_eq!(loose.wrapped().compare(&outer.scope(), &db)?, Ordering::Equal);
    Ok(())
}

#[test]
fn scopes_order_complete_graph_first() -> Result<()> {
    let db = memory_db()?;
    let top = person(&db)?;
    let graph = db.create_subordinate_graph(Sigma::Vertex(top))?;
    let lenient = ViewGraph::new(&db, GraphScope::Complete, 2)?;
    let strict = ViewGraph::new(&db, GraphScope::Complete, 12)?;
    let partial = GraphScope::Partial(db.partial_graph_id());
    let subordinate = GraphScope::Subordinate(graph);

    assert_eq!(GraphScope::Complete.compare(&lenient.scope(), &db)?, Ordering::Greater);
    assert_eq!(lenient.scope().compare(&GraphScope::Complete, &db)?, Ordering::Less);
    assert_eq!(strict.scope().compare(&lenient.scope(), &db)?, Ordering::Less);
    assert_eq!(lenient.scope().compare(&strict.scope(), &db)?, Ordering::Greater);
    assert_eq!(partial.compare(&GraphScope::Complete, &db)?, Ordering::Less);

    let over_partial = ViewGraph::new(&db, partial.clone(), 2)?;
    assert_eq!(over_partial.scope().compare(&subordinate, &db)?, partial.compare(&subordinate, &db)?);
    assert_eq!(partial.compare(&subordinate, &db)?, Ordering::Equal);
    Ok(())
}

#[test]
fn partial_scope_limits_iteration_to_its_host() -> Result<()> {
    let db = memory_db()?;
    let a = person(&db)?;
    let b = person(&db)?;
    let ctx = TraversalContext::with_scope(GraphScope::Partial(db.partial_graph_id()));
    assert_eq!(db.vertices(&ctx).collect::<Result<Vec<_>>>()?, vec![a, b]);

    let view = ViewGraph::new(&db, GraphScope::Partial(db.partial_graph_id()), 0)?;
    assert_eq!(view.vertex_count(), 2);
    assert_eq!(view.threshold(), 0);
    assert!(matches!(view.wrapped(), GraphScope::Partial(_)));
    Ok(())
}

#[test]
fn mutations_and_attributes_pass_through_the_view() -> Result<()> {
    let db = memory_db()?;
    let Layers { top, bottom, .. } = layers(&db)?;
    let view = ViewGraph::new(&db, GraphScope::Complete, 10)?;
    assert_eq!(view.schema().name, db.schema().name);

    let added = view.create_vertex(ElementSpec::new(PERSON))?;
    let edge = view.create_edge(ElementSpec::new(KNOWS))?;
    view.connect(FROM, top, edge)?;
    view.connect(TO, added, edge)?;
    assert_eq!((view.vertex_count(), view.edge_count(), view.incidence_count()), (3, 1, 2));

    view.set_vertex_attribute(bottom, "name", AttrValue::Str("deep".into()))?;
    assert_eq!(db.get_vertex_attribute(bottom, "name")?, AttrValue::Str("deep".into()));
    assert_eq!(view.get_vertex_attribute(bottom, "name")?, AttrValue::Str("deep".into()));
    view.set_edge_attribute(edge, "since", AttrValue::Long(3))?;
    assert_eq!(view.get_edge_attribute(edge, "since")?, AttrValue::Long(3));

    view.delete_edge(edge)?;
    view.delete_vertex(added)?;
    assert_eq!((view.vertex_count(), view.edge_count(), view.incidence_count()), (2, 0, 0));
    assert_eq!(db.vertex_count()?, 3);
    Ok(())
}
