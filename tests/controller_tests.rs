mod common;

use std::net::SocketAddr;

use bytes::Bytes;
use common::addr;
use tokio::sync::mpsc;

use murmur::console::Console;
use murmur::error::{MurmurError, Result};
use murmur::gossip::{Message, MessageKind};
use murmur::node::{ChatNode, NodeController, NodeId, UserCommand};
use murmur::settings::NodeOptions;
use murmur::transport::{ChannelTransport, MemoryNetwork};

type Inbox = mpsc::Receiver<(Bytes, SocketAddr)>;

fn bind(network: &MemoryNetwork, name: &str, port: u16) -> (ChatNode<ChannelTransport>, Inbox) {
    let (transport, inbox) = network.bind(addr(port)).unwrap();
    let node = ChatNode::new(NodeId::from(name), transport, NodeOptions::default());
    (node, inbox)
}

async fn queue_commands(commands: Vec<Result<UserCommand>>) -> mpsc::Receiver<Result<UserCommand>> {
    let (tx, rx) = mpsc::channel(commands.len().max(1));
    for command in commands {
        tx.send(command).await.unwrap();
    }
    rx
}

fn received_kinds(inbox: &mut Inbox) -> Vec<MessageKind> {
    let mut kinds = Vec::new();
    while let Ok((data, _)) = inbox.try_recv() {
        kinds.push(Message::decode(&data).unwrap().kind);
    }
    kinds
}

fn output<T: murmur::transport::Sender>(controller: &NodeController<T, Vec<u8>>) -> String {
    String::from_utf8(controller.console().get_ref().clone()).unwrap()
}

#[tokio::test]
async fn test_session_prints_events_and_feedback() {
    let network = MemoryNetwork::new();
    let (node, inbox) = bind(&network, "a", 9100);
    let (mut b, mut b_inbox) = bind(&network, "b", 9101);
    b.meet(addr(9100)).await.unwrap();

    let (mut controller, neighbors) = NodeController::new(node, Console::new(Vec::new()), true);
    let commands = queue_commands(vec![
        Ok(UserCommand::Broadcast("hello".to_string())),
        Err(MurmurError::Input("Unknown command: shout".to_string())),
        Ok(UserCommand::Neighbors),
        Ok(UserCommand::Quit),
    ])
    .await;

    controller.run(inbox, commands).await.unwrap();

    let output = output(&controller);
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(
        lines,
        vec![
            "New neighbor: b (127.0.0.1:9101)",
            "You sent: hello",
            "Invalid input: Unknown command: shout",
            "b, 127.0.0.1:9101",
        ]
    );
    assert_eq!(*neighbors.borrow(), vec![(NodeId::from("b"), addr(9101))]);
    assert_eq!(
        received_kinds(&mut b_inbox),
        vec![MessageKind::Meet, MessageKind::Broadcast, MessageKind::Quit]
    );
}

#[tokio::test]
async fn test_closed_input_quits() {
    let network = MemoryNetwork::new();
    let (node, inbox) = bind(&network, "a", 9110);
    let (mut b, mut b_inbox) = bind(&network, "b", 9111);
    b.meet(addr(9110)).await.unwrap();

    let (mut controller, _neighbors) = NodeController::new(node, Console::new(Vec::new()), true);
    let commands = queue_commands(Vec::new()).await;

    controller.run(inbox, commands).await.unwrap();
    assert_eq!(
        received_kinds(&mut b_inbox),
        vec![MessageKind::Meet, MessageKind::Quit]
    );
}

#[tokio::test]
async fn test_bootstrap_meets_every_peer() {
    let network = MemoryNetwork::new();
    let (node, _inbox) = bind(&network, "a", 9120);
    let (_b, mut b_inbox) = bind(&network, "b", 9121);
    let (_c, mut c_inbox) = bind(&network, "c", 9122);

    let (mut controller, _neighbors) = NodeController::new(node, Console::new(Vec::new()), true);
    controller.bootstrap(&[addr(9121), addr(9122)]).await.unwrap();

    assert_eq!(received_kinds(&mut b_inbox), vec![MessageKind::Meet]);
    assert_eq!(received_kinds(&mut c_inbox), vec![MessageKind::Meet]);
}

#[tokio::test]
async fn test_unreachable_neighbor_stops_the_loop() {
    let network = MemoryNetwork::new();
    let (node, inbox) = bind(&network, "a", 9130);
    let (mut b, _b_inbox) = bind(&network, "b", 9131);
    b.meet(addr(9130)).await.unwrap();
    network.disconnect(addr(9131));

    let (mut controller, _neighbors) = NodeController::new(node, Console::new(Vec::new()), true);
    let commands = queue_commands(vec![Ok(UserCommand::Quit)]).await;

    let err = controller.run(inbox, commands).await.unwrap_err();
    assert!(matches!(err, MurmurError::NeighborUnreachable { address, .. } if address == addr(9131)));
}

#[tokio::test]
async fn test_unreachable_neighbor_is_tolerated_without_fail_fast() {
    let network = MemoryNetwork::new();
    let (node, inbox) = bind(&network, "a", 9140);
    let (mut b, _b_inbox) = bind(&network, "b", 9141);
    b.meet(addr(9140)).await.unwrap();
    network.disconnect(addr(9141));

    let (mut controller, neighbors) = NodeController::new(node, Console::new(Vec::new()), false);
    let commands = queue_commands(vec![
        Ok(UserCommand::Broadcast("still here".to_string())),
        Ok(UserCommand::Quit),
    ])
    .await;

    controller.run(inbox, commands).await.unwrap();
    assert!(controller.node().membership().contains(&NodeId::from("b")));
    assert_eq!(neighbors.borrow().len(), 1);
    assert_eq!(
        controller
            .node()
            .clock()
            .get_timestamp(&NodeId::from("a")),
        1
    );
}

#[tokio::test]
async fn test_unknown_dm_target_is_reported_not_fatal() {
    let network = MemoryNetwork::new();
    let (node, inbox) = bind(&network, "a", 9150);

    let (mut controller, _neighbors) = NodeController::new(node, Console::new(Vec::new()), true);
    let commands = queue_commands(vec![
        Ok(UserCommand::Direct {
            target: addr(9999),
            content: "hi".to_string(),
        }),
        Ok(UserCommand::Quit),
    ])
    .await;

    controller.run(inbox, commands).await.unwrap();
    assert_eq!(output(&controller), "Not a neighbor: 127.0.0.1:9999\n");
}

#[tokio::test]
async fn test_malformed_datagram_is_reported_and_dropped() {
    let network = MemoryNetwork::new();
    let (node, inbox) = bind(&network, "a", 9160);
    let (b, _b_inbox) = bind(&network, "b", 9161);
    murmur::transport::Sender::send_to(b.transport(), addr(9160), b"not json")
        .await
        .unwrap();

    let (mut controller, _neighbors) = NodeController::new(node, Console::new(Vec::new()), true);
    let commands = queue_commands(vec![Ok(UserCommand::Quit)]).await;

    controller.run(inbox, commands).await.unwrap();
    assert!(output(&controller).starts_with("Malformed message: "));
    assert!(controller.node().membership().is_empty());
}

/// `a` knows `d`, then `d` goes away and `b` broadcasts to `a`
async fn deliver_with_failed_relay(fail_fast: bool) -> (Result<()>, String) {
    let network = MemoryNetwork::new();
    let (mut node, inbox) = bind(&network, "a", 9170);
    let (b, _b_inbox) = bind(&network, "b", 9171);
    let (_d, _d_inbox) = bind(&network, "d", 9172);
    node.handle_message(Message::meet(NodeId::from("d")), addr(9172))
        .await
        .unwrap();
    network.disconnect(addr(9172));

    let clock = [(NodeId::from("b"), 1)].into_iter().collect();
    let data = Message::broadcast(NodeId::from("b"), "hi".to_string(), clock)
        .encode()
        .unwrap();
    murmur::transport::Sender::send_to(b.transport(), addr(9170), &data)
        .await
        .unwrap();

    let (mut controller, _neighbors) =
        NodeController::new(node, Console::new(Vec::new()), fail_fast);
    let commands = queue_commands(vec![Ok(UserCommand::Quit)]).await;
    let result = controller.run(inbox, commands).await;
    (result, output(&controller))
}

#[tokio::test]
async fn test_delivery_is_shown_before_relay_failure_ends_the_loop() {
    let (result, output) = deliver_with_failed_relay(true).await;

    assert!(matches!(result, Err(MurmurError::NeighborUnreachable { address, .. }) if address == addr(9172)));
    assert_eq!(output, "Broadcast > b: hi\n");
}

#[tokio::test]
async fn test_delivery_is_shown_when_relay_failure_is_tolerated() {
    let (result, output) = deliver_with_failed_relay(false).await;

    assert!(result.is_ok());
    assert_eq!(output, "Broadcast > b: hi\n");
}
