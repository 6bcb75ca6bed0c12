mod common;

use common::{addr, Cluster};
use murmur::error::MurmurError;
use murmur::gossip::Message;
use murmur::node::{NodeEvent, NodeId};

#[tokio::test]
async fn test_direct_is_delivered_to_the_neighbor_only() {
    let mut cluster = Cluster::new(&["p", "q", "r"]);
    cluster.meet(0, 1).await;
    cluster.meet(0, 2).await;

    let target = cluster.peer(1).addr();
    let seq = cluster.node(0).direct(target, "psst".to_string()).await.unwrap();
    assert_eq!(seq, 0);
    cluster.settle().await;

    assert_eq!(cluster.peer(1).directs(), vec!["psst"]);
    assert!(cluster.peer(1).events.contains(&NodeEvent::Direct {
        origin: NodeId::from("p"),
        content: "psst".to_string(),
    }));
    assert!(cluster.peer(2).directs().is_empty());
    // Direct messages never touch the vector clock
    assert_eq!(cluster.peer(0).node.clock().get_timestamp(&NodeId::from("p")), 0);
}

#[tokio::test]
async fn test_out_of_order_direct_is_dropped() {
    let mut cluster = Cluster::new(&["p", "q"]);
    cluster.meet(0, 1).await;
    let q = cluster.peer(1).addr();

    cluster.node(0).direct(q, "m0".to_string()).await.unwrap();
    cluster.settle().await;
    assert_eq!(cluster.peer(1).directs(), vec!["m0"]);

    cluster.node(0).direct(q, "m1".to_string()).await.unwrap();
    cluster.node(0).direct(q, "m2".to_string()).await.unwrap();
    let mut in_flight = cluster.intercept(1);
    in_flight.reverse();

    // m2 shows up while m1 is expected and is lost; m1 still gets through
    for (data, from) in in_flight {
        cluster.inject(1, &data, from).await;
    }
    let q_peer = cluster.peer(1);
    assert_eq!(q_peer.directs(), vec!["m0", "m1"]);
    assert_eq!(q_peer.node.stats().dropped_directs, 1);
    assert_eq!(q_peer.node.sequencer().expected(&NodeId::from("p")), Some(2));
}

#[tokio::test]
async fn test_forged_sequence_numbers() {
    let mut cluster = Cluster::new(&["p", "q"]);
    cluster.meet(0, 1).await;
    let from = cluster.peer(0).addr();

    let seq = |n: u64, content: &str| {
        Message::direct(NodeId::from("p"), content.to_string(), n)
            .encode()
            .unwrap()
    };
    cluster.inject(1, &seq(0, "zero"), from).await;
    cluster.inject(1, &seq(2, "two"), from).await;
    cluster.inject(1, &seq(1, "one"), from).await;
    cluster.inject(1, &seq(1, "one again"), from).await;

    assert_eq!(cluster.peer(1).directs(), vec!["zero", "one"]);
    assert_eq!(cluster.peer(1).node.stats().dropped_directs, 2);
}

#[tokio::test]
async fn test_links_are_sequenced_independently() {
    let mut cluster = Cluster::new(&["p", "q", "r"]);
    cluster.meet(0, 1).await;
    cluster.meet(2, 1).await;
    let q = cluster.peer(1).addr();

    cluster.node(0).direct(q, "from p".to_string()).await.unwrap();
    cluster.intercept(1);
    cluster.node(0).direct(q, "from p again".to_string()).await.unwrap();
    cluster.node(2).direct(q, "from r".to_string()).await.unwrap();
    cluster.settle().await;

    // p's link has a gap, r's does not
    assert_eq!(cluster.peer(1).directs(), vec!["from r"]);
    let sequencer = cluster.peer(1).node.sequencer();
    assert_eq!(sequencer.expected(&NodeId::from("p")), Some(0));
    assert_eq!(sequencer.expected(&NodeId::from("r")), Some(1));
    assert_eq!(cluster.peer(0).node.sequencer().sent(&NodeId::from("q")), Some(2));
}

#[tokio::test]
async fn test_direct_to_unknown_address_is_refused() {
    let mut cluster = Cluster::new(&["p", "q"]);

    let err = cluster
        .node(0)
        .direct(addr(9999), "hello?".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, MurmurError::UnknownNeighbor(a) if a == addr(9999)));
    assert!(cluster.peer(0).node.sequencer().sent(&NodeId::from("q")).is_none());
    assert_eq!(cluster.settle().await, 0);
}

#[tokio::test]
async fn test_direct_without_sequence_is_rejected() {
    let mut cluster = Cluster::new(&["p", "q"]);
    cluster.meet(0, 1).await;
    let from = cluster.peer(0).addr();

    let data = br#"{"type":"direct","content":"hi","origin":"p"}"#;
    let err = cluster
        .node(1)
        .handle_datagram(data, from)
        .await
        .unwrap_err();
    assert!(matches!(err, MurmurError::Message(_)));
    assert!(cluster.peer(1).directs().is_empty());
}

#[tokio::test]
async fn test_failed_direct_does_not_open_a_gap() {
    let mut cluster = Cluster::new(&["p", "q"]);
    cluster.meet(0, 1).await;
    let q = cluster.peer(1).addr();

    cluster.network.disconnect(q);
    let err = cluster
        .node(0)
        .direct(q, "while away".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, MurmurError::NeighborUnreachable { .. }));

    // q comes back on the same address
    let (_transport, inbox) = cluster.network.bind(q).unwrap();
    cluster.peers[1].inbox = inbox;
    let seq = cluster.node(0).direct(q, "back".to_string()).await.unwrap();
    assert_eq!(seq, 0);
    cluster.settle().await;

    assert_eq!(cluster.peer(1).directs(), vec!["back"]);
    assert_eq!(cluster.peer(1).node.stats().dropped_directs, 0);
}
