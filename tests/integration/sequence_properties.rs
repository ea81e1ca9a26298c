#![allow(missing_docs)]

mod common;

use common::{check_global_sequences, memory_db, person, walk, FROM, KNOWS, TO};
use proptest::prelude::*;
use shardgraph::db::SequenceKind;
use shardgraph::{EdgeId, ElementSpec, GlobalId, GraphDatabase, Result, TraversalContext, VertexId};

#[derive(Debug, Clone)]
enum Op {
    AddVertex,
    AddEdge { from: usize, to: usize },
    DeleteVertex(usize),
    DeleteEdge(usize),
    MoveVertex { moved: usize, target: usize, before: bool },
    MoveEdge { moved: usize, target: usize, before: bool },
    MoveIncidence { vertex: usize, moved: usize, target: usize, before: bool },
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::AddVertex),
        3 => (0usize..64, 0usize..64).prop_map(|(from, to)| Op::AddEdge { from, to }),
        1 => (0usize..64).prop_map(Op::DeleteVertex),
        1 => (0usize..64).prop_map(Op::DeleteEdge),
        2 => (0usize..64, 0usize..64, any::<bool>())
            .prop_map(|(moved, target, before)| Op::MoveVertex { moved, target, before }),
        2 => (0usize..64, 0usize..64, any::<bool>())
            .prop_map(|(moved, target, before)| Op::MoveEdge { moved, target, before }),
        2 => (0usize..64, 0usize..8, 0usize..8, any::<bool>()).prop_map(
            |(vertex, moved, target, before)| Op::MoveIncidence { vertex, moved, target, before }
        ),
    ]
}

/// Expected global order, tracked alongside the database.
#[derive(Default)]
struct Model {
    vertices: Vec<VertexId>,
    edges: Vec<(EdgeId, VertexId, VertexId)>,
}

fn reorder<T: PartialEq + Copy>(order: &mut Vec<T>, moved: T, target: T, before: bool) {
    if moved == target {
        return;
    }
    order.retain(|item| *item != moved);
    let at = order.iter().position(|item| *item == target).unwrap_or(order.len());
    order.insert(if before { at } else { at + 1 }, moved);
}

fn apply(db: &GraphDatabase, model: &mut Model, op: Op) -> Result<()> {
    match op {
        Op::AddVertex => model.vertices.push(person(db)?),
        Op::AddEdge { from, to } => {
            if model.vertices.is_empty() {
                return Ok(());
            }
            let from = model.vertices[from % model.vertices.len()];
            let to = model.vertices[to % model.vertices.len()];
            let edge = db.create_edge(ElementSpec::new(KNOWS))?;
            db.connect(FROM, from, edge)?;
            db.connect(TO, to, edge)?;
            model.edges.push((edge, from, to));
        }
        Op::DeleteVertex(i) => {
            if model.vertices.is_empty() {
                return Ok(());
            }
            let victim = model.vertices.remove(i % model.vertices.len());
            db.delete_vertex(victim)?;
            model.edges.retain(|(_, from, to)| *from != victim && *to != victim);
        }
        Op::DeleteEdge(i) => {
            if model.edges.is_empty() {
                return Ok(());
            }
            let (edge, _, _) = model.edges.remove(i % model.edges.len());
            db.delete_edge(edge)?;
        }
        Op::MoveVertex { moved, target, before } => {
            if model.vertices.is_empty() {
                return Ok(());
            }
            let moved = model.vertices[moved % model.vertices.len()];
            let target = model.vertices[target % model.vertices.len()];
            if before {
                db.put_vertex_before(moved, target)?;
            } else {
                db.put_vertex_after(moved, target)?;
            }
            reorder(&mut model.vertices, moved, target, before);
        }
        Op::MoveEdge { moved, target, before } => {
            if model.edges.is_empty() {
                return Ok(());
            }
            let moved = model.edges[moved % model.edges.len()];
            let target = model.edges[target % model.edges.len()];
            if before {
                db.put_edge_before(moved.0, target.0)?;
            } else {
                db.put_edge_after(moved.0, target.0)?;
            }
            reorder(&mut model.edges, moved, target, before);
        }
        Op::MoveIncidence { vertex, moved, target, before } => {
            if model.vertices.is_empty() {
                return Ok(());
            }
            let vertex = model.vertices[vertex % model.vertices.len()];
            let ctx = TraversalContext::new();
            let incidences = db.incidences_at_vertex(&ctx, vertex).collect::<Result<Vec<_>>>()?;
            if incidences.is_empty() {
                return Ok(());
            }
            let moved = incidences[moved % incidences.len()];
            let target = incidences[target % incidences.len()];
            if before {
                db.put_incidence_before_at_vertex(moved, target)?;
            } else {
                db.put_incidence_after_at_vertex(moved, target)?;
            }
            let mut expected = incidences;
            reorder(&mut expected, moved, target, before);
            let actual = db.incidences_at_vertex(&ctx, vertex).collect::<Result<Vec<_>>>()?;
            assert_eq!(actual, expected);
        }
    }
    Ok(())
}

fn globals<T: Copy>(items: &[T], id: impl Fn(T) -> GlobalId) -> Vec<GlobalId> {
    items.iter().map(|item| id(*item)).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn sequences_stay_mirrored(ops in prop::collection::vec(arb_op(), 1..80)) {
        let db = memory_db().unwrap();
        let mut model = Model::default();
        for op in ops {
            apply(&db, &mut model, op).unwrap();
            check_global_sequences(&db).unwrap();
        }
        let vertices = walk(&db, SequenceKind::Vertices).unwrap();
        prop_assert_eq!(vertices, globals(&model.vertices, VertexId::global));
        let edges = walk(&db, SequenceKind::Edges).unwrap();
        prop_assert_eq!(edges, globals(&model.edges, |(edge, _, _)| edge.global()));
    }
}

#[test]
fn versions_only_move_on_real_changes() -> Result<()> {
    let db = memory_db()?;
    let a = person(&db)?;
    let b = person(&db)?;
    let version = db.vertex_list_version()?;

    db.put_vertex_before(a, b)?;
    db.put_vertex_after(b, a)?;
    db.put_vertex_before(a, a)?;
    assert_eq!(db.vertex_list_version()?, version);

    db.put_vertex_before(b, a)?;
    assert_eq!(db.vertex_list_version()?, version + 1);
    Ok(())
}
