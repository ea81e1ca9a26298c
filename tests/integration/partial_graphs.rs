#![allow(missing_docs)]

mod common;

use std::error::Error as _;
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;

use common::{check_global_sequences, person, schema, FROM, HAS_PART, KNOWS, PART, TO, WHOLE};
use shardgraph::db::{
    partial_graph_entry, Connector, LoopbackNetwork, SequenceKind, TcpConnector,
    COMPLETE_GRAPH_HOST,
};
use shardgraph::{
    AttrValue, Config, ElementSpec, GraphDatabase, GraphError, PartialGraphId, Result,
    TraversalContext,
};

struct Cluster {
    network: LoopbackNetwork,
    complete: GraphDatabase,
    joined: GraphDatabase,
}

fn cluster() -> Result<Cluster> {
    let network = LoopbackNetwork::new();
    let connector: Arc<dyn Connector> = Arc::new(network.clone());
    let complete = GraphDatabase::create_complete_with(
        Config::in_memory().with_listen_address("host-a"),
        schema(),
        Some(Arc::clone(&connector)),
    )?;
    network.register("host-a", complete.server());
    let joined = GraphDatabase::join(
        Config::in_memory().with_listen_address("host-b"),
        schema(),
        connector,
        "host-a",
    )?;
    network.register("host-b", joined.server());
    Ok(Cluster {
        network,
        complete,
        joined,
    })
}

#[test]
fn joining_registers_a_new_partial_graph() -> Result<()> {
    let Cluster {
        complete, joined, ..
    } = cluster()?;
    assert_eq!(complete.partial_graph_id(), COMPLETE_GRAPH_HOST);
    assert_eq!(joined.partial_graph_id(), PartialGraphId(2));
    assert_eq!(complete.partial_graphs()?, vec![PartialGraphId(1), PartialGraphId(2)]);
    assert_eq!(joined.partial_graphs()?, complete.partial_graphs()?);
    assert_eq!(complete.partial_graph_address(PartialGraphId(2))?, "host-b");
    assert_eq!(joined.partial_graph_address(PartialGraphId(1))?, "host-a");
    Ok(())
}

#[test]
fn elements_link_across_hosts() -> Result<()> {
    let Cluster {
        complete, joined, ..
    } = cluster()?;
    let ctx = TraversalContext::new();
    let local = person(&complete)?;
    let remote = person(&joined)?;
    assert_eq!(remote.partial_graph(), PartialGraphId(2));

    let edge = joined.create_edge(ElementSpec::new(KNOWS))?;
    complete.connect(FROM, local, edge)?;
    joined.connect(TO, remote, edge)?;
    joined.set_vertex_attribute(remote, "name", AttrValue::Str("bee".into()))?;

    for db in [&complete, &joined] {
        assert_eq!(db.vertex_count()?, 2);
        assert_eq!(db.edge_count()?, 1);
        assert_eq!(db.incidence_count()?, 2);
        assert_eq!(db.first_vertex(&ctx)?, Some(local));
        assert_eq!(db.next_vertex(&ctx, local)?, Some(remote));
        assert_eq!(
            db.get_vertex_attribute(remote, "name")?,
            AttrValue::Str("bee".into())
        );
        check_global_sequences(db)?;
    }
    assert_eq!(complete.partial_graph(PartialGraphId(1))?.vertex_count, 1);
    assert_eq!(complete.graph_data(partial_graph_entry(PartialGraphId(2)))?.vertex_count, 1);
    assert_eq!(complete.partial_graph(PartialGraphId(2))?.edge_count, 1);

    let from_complete = complete
        .incidences_at_edge(&ctx, edge)
        .collect::<Result<Vec<_>>>()?;
    assert_eq!(from_complete.len(), 2);
    assert_eq!(from_complete[0].partial_graph(), PartialGraphId(1));
    assert_eq!(from_complete[1].partial_graph(), PartialGraphId(2));
    Ok(())
}

#[test]
fn cascade_crosses_hosts() -> Result<()> {
    let Cluster {
        complete, joined, ..
    } = cluster()?;
    let owner = person(&complete)?;
    let part = person(&joined)?;
    let edge = complete.create_edge(ElementSpec::new(HAS_PART))?;
    complete.connect(WHOLE, owner, edge)?;
    complete.connect(PART, part, edge)?;

    complete.delete_vertex(owner)?;
    assert!(!joined.contains_vertex(part)?);
    assert_eq!(joined.vertex_count()?, 0);
    assert_eq!(joined.partial_graph(PartialGraphId(2))?.vertex_count, 0);
    check_global_sequences(&complete)?;
    Ok(())
}

#[test]
fn sequences_walk_the_same_from_every_host() -> Result<()> {
    let Cluster {
        complete, joined, ..
    } = cluster()?;
    let mut created = Vec::new();
    for round in 0..4 {
        let db = if round % 2 == 0 { &complete } else { &joined };
        created.push(person(db)?);
    }
    joined.put_vertex_before(created[3], created[0])?;
    complete.delete_vertex(created[1])?;

    let a = common::walk(&complete, SequenceKind::Vertices)?;
    let b = common::walk(&joined, SequenceKind::Vertices)?;
    assert_eq!(a, b);
    assert_eq!(
        a,
        vec![created[3].global(), created[0].global(), created[2].global()]
    );
    Ok(())
}

#[test]
fn unreachable_host_surfaces_remote_error_with_cause() -> Result<()> {
    let Cluster {
        network,
        complete,
        joined,
    } = cluster()?;
    let remote = person(&joined)?;
    assert!(complete.contains_vertex(remote)?);

    assert!(network.unregister("host-b"));
    let err = complete.vertex_info(remote).unwrap_err();
    match &err {
        GraphError::Remote { partial_graph, .. } => assert_eq!(*partial_graph, PartialGraphId(2)),
        other => panic!("expected a remote error, got {other}"),
    }
    let cause = err.source().expect("remote errors keep their cause");
    assert!(cause.to_string().contains("host-b"), "cause: {cause}");
    Ok(())
}

#[test]
fn remote_faults_keep_their_kind() -> Result<()> {
    let Cluster {
        complete, joined, ..
    } = cluster()?;
    let remote = person(&joined)?;
    joined.delete_vertex(remote)?;

    let err = complete.vertex_info(remote).unwrap_err();
    assert!(err.is_not_found(), "unexpected error: {err}");
    assert!(!complete.contains_vertex(remote)?);
    Ok(())
}

#[test]
fn released_partial_graph_becomes_unreachable() -> Result<()> {
    let Cluster {
        complete, joined, ..
    } = cluster()?;
    let remote = person(&joined)?;

    complete.release_partial_graph(PartialGraphId(2))?;
    assert_eq!(complete.partial_graphs()?, vec![PartialGraphId(1)]);
    assert!(matches!(
        complete.vertex_info(remote),
        Err(GraphError::Remote { .. })
    ));
    assert!(complete.release_partial_graph(PartialGraphId(2)).is_err());
    Ok(())
}

#[test]
fn joining_requires_a_listen_address() -> Result<()> {
    let network = LoopbackNetwork::new();
    let complete = GraphDatabase::create_complete(Config::in_memory(), schema())?;
    network.register("host-a", complete.server());
    let err = GraphDatabase::join(Config::in_memory(), schema(), Arc::new(network), "host-a")
        .unwrap_err();
    assert!(matches!(err, GraphError::Config(_)));
    Ok(())
}

#[test]
fn pool_capacity_is_enforced() -> Result<()> {
    let network = LoopbackNetwork::new();
    let connector: Arc<dyn Connector> = Arc::new(network.clone());
    let complete = GraphDatabase::create_complete_with(
        Config::in_memory().with_max_partial_graphs(2),
        schema(),
        Some(Arc::clone(&connector)),
    )?;
    network.register("host-a", complete.server());
    GraphDatabase::join(
        Config::in_memory().with_listen_address("host-b"),
        schema(),
        Arc::clone(&connector),
        "host-a",
    )?;
    let err = GraphDatabase::join(
        Config::in_memory().with_listen_address("host-c"),
        schema(),
        connector,
        "host-a",
    )
    .unwrap_err();
    assert!(matches!(err, GraphError::Remote { .. }), "unexpected error: {err}");
    Ok(())
}

#[test]
fn hosts_talk_over_tcp() -> Result<()> {
    let complete_listener = TcpListener::bind("127.0.0.1:0")?;
    let complete_address = complete_listener.local_addr()?.to_string();
    let joined_listener = TcpListener::bind("127.0.0.1:0")?;
    let joined_address = joined_listener.local_addr()?.to_string();
    let connector: Arc<dyn Connector> = Arc::new(TcpConnector);

    let complete = GraphDatabase::create_complete_with(
        Config::in_memory().with_listen_address(complete_address.clone()),
        schema(),
        Some(Arc::clone(&connector)),
    )?;
    let server = complete.server();
    thread::spawn(move || server.serve(complete_listener));

    let joined = GraphDatabase::join(
        Config::in_memory().with_listen_address(joined_address),
        schema(),
        connector,
        &complete_address,
    )?;
    let server = joined.server();
    thread::spawn(move || server.serve(joined_listener));

    let a = person(&complete)?;
    let b = person(&joined)?;
    let edge = joined.create_edge(ElementSpec::new(KNOWS))?;
    joined.connect(FROM, a, edge)?;
    joined.connect(TO, b, edge)?;
    joined.set_vertex_attribute(b, "age", AttrValue::Int(7))?;

    assert_eq!(complete.vertex_count()?, 2);
    assert_eq!(complete.get_vertex_attribute(b, "age")?, AttrValue::Int(7));
    check_global_sequences(&complete)?;
    check_global_sequences(&joined)?;
    Ok(())
}
