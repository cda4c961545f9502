//! Tests for the simulated cluster and key-value store.

use std::time::Duration;

use gossamer_node::{KvPayload, ManualClock, Node};
use gossamer_wire::{Body, Envelope, ErrorCode, MsgId, RuntimePayload};
use proptest::prelude::*;
use serde_json::{Value, json};
use test_case::test_case;

use crate::{Cluster, KvStore, SimConfig, SimError};

// ============================================================================
// Helpers
// ============================================================================

/// Counts `hello` messages; `fanout` requests make it greet every peer.
fn greeter(_: &gossamer_wire::NodeId) -> Node<u64, ManualClock> {
    let mut node = Node::with_clock(0u64, ManualClock::new());
    node.register_handler("fanout", |ctx, request| {
        let peers: Vec<_> = ctx.peers().cloned().collect();
        for peer in peers {
            ctx.send(peer, Body::new("hello"));
        }
        ctx.reply_to(&request, Body::new("fanout_ok"))
    })
    .unwrap();
    node.register_handler("hello", |ctx, _| {
        *ctx.state_mut() += 1;
        Ok(())
    })
    .unwrap();
    node
}

fn hellos(cluster: &Cluster<u64>) -> u64 {
    cluster.nodes().map(|(_, node)| *node.state()).sum()
}

fn fanout(cluster: &mut Cluster<u64>, dest: &str) -> MsgId {
    cluster.request(dest, &json!({"type": "fanout"})).unwrap()
}

fn kv_request(payload: &KvPayload, msg_id: u64) -> Envelope {
    Envelope::new(
        "n0",
        "seq-kv",
        Body::from_payload(payload).unwrap().with_msg_id(MsgId::new(msg_id)),
    )
}

fn error_code(reply: &Envelope) -> Option<ErrorCode> {
    match reply.body.decode::<RuntimePayload>().ok()? {
        RuntimePayload::Error(error) => Some(error.code),
        _ => None,
    }
}

// ============================================================================
// Cluster
// ============================================================================

#[test]
fn every_node_is_initialized_and_acknowledged() {
    let cluster = Cluster::new(SimConfig::reliable(1), &["n0", "n1", "n2"], greeter).unwrap();

    for (_, node) in cluster.nodes() {
        assert!(node.is_initialized());
    }
    let acks = cluster
        .client_inbox()
        .iter()
        .filter(|e| e.body.kind == RuntimePayload::INIT_OK)
        .count();
    assert_eq!(acks, 3);
}

#[test]
fn client_replies_are_correlated() {
    let mut cluster = Cluster::new(SimConfig::reliable(1), &["n0", "n1"], greeter).unwrap();

    let msg_id = fanout(&mut cluster, "n0");

    let reply = cluster.reply(msg_id).unwrap();
    assert_eq!(reply.body.kind, "fanout_ok");
    assert_eq!(reply.src.as_str(), "n0");
}

#[test]
fn reliable_network_delivers_everything() {
    let mut cluster = Cluster::new(SimConfig::reliable(3), &["n0", "n1", "n2", "n3"], greeter).unwrap();

    fanout(&mut cluster, "n0");
    fanout(&mut cluster, "n2");
    cluster.run_until_quiet(100).unwrap();

    assert_eq!(hellos(&cluster), 6);
    assert_eq!(cluster.stats().dropped, 0);
    assert_eq!(cluster.in_flight(), 0);
}

#[test]
fn dropping_everything_delivers_nothing() {
    let mut cluster = Cluster::new(SimConfig::lossy(3, 1.0), &["n0", "n1", "n2"], greeter).unwrap();

    fanout(&mut cluster, "n0");
    cluster.run_until_quiet(100).unwrap();

    assert_eq!(hellos(&cluster), 0);
    assert_eq!(cluster.stats().dropped, 2);
}

#[test]
fn duplicates_are_delivered_again() {
    let config = SimConfig::reliable(5).with_duplicates(0.5);
    let mut cluster = Cluster::new(config, &["n0", "n1", "n2", "n3", "n4"], greeter).unwrap();

    for _ in 0..10 {
        fanout(&mut cluster, "n0");
    }
    cluster.run_until_quiet(10_000).unwrap();

    let stats = cluster.stats();
    assert!(stats.duplicated > 0);
    assert_eq!(hellos(&cluster), 40 + stats.duplicated);
}

#[test]
fn busy_network_reports_not_quiet() {
    let mut cluster = Cluster::new(SimConfig::reliable(1), &["n0", "n1", "n2"], greeter).unwrap();

    fanout(&mut cluster, "n0");

    assert!(matches!(cluster.run_until_quiet(1), Err(SimError::NotQuiet(1))));
}

#[test]
fn unknown_node_is_an_error() {
    let mut cluster = Cluster::new(SimConfig::reliable(1), &["n0"], greeter).unwrap();

    assert!(matches!(cluster.node("n9"), Err(SimError::UnknownNode(_))));
    assert!(matches!(
        cluster.request("n9", &json!({"type": "fanout"})),
        Err(SimError::UnknownNode(_))
    ));
}

#[test]
fn advance_moves_every_clock() {
    let mut cluster = Cluster::new(SimConfig::reliable(1), &["n0", "n1"], greeter).unwrap();

    cluster.advance(Duration::from_millis(250)).unwrap();
    cluster.advance(Duration::from_millis(250)).unwrap();

    assert_eq!(cluster.now(), Duration::from_millis(500));
    for (_, node) in cluster.nodes() {
        assert_eq!(node.context().unwrap().now(), Duration::from_millis(500));
    }
}

#[test]
fn in_order_delivery_preserves_send_order() {
    let order = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let seen = order.clone();
    let mut cluster = Cluster::new(SimConfig::reliable(9).in_order(), &["n0", "n1"], move |id| {
        let mut node = Node::with_clock((), ManualClock::new());
        if id.as_str() == "n0" {
            node.register_handler("burst", |ctx, _| {
                for i in 0..5 {
                    ctx.send("n1", Body::new("seq").with_field("i", i));
                }
                Ok(())
            })
            .unwrap();
        } else {
            let seen = seen.clone();
            node.register_handler("seq", move |_, msg| {
                seen.borrow_mut().push(msg.body.fields["i"].as_u64().unwrap());
                Ok(())
            })
            .unwrap();
        }
        node
    })
    .unwrap();

    cluster.request("n0", &json!({"type": "burst"})).unwrap();
    cluster.run_until_quiet(100).unwrap();

    assert_eq!(*order.borrow(), vec![0, 1, 2, 3, 4]);
}

proptest! {
    #[test]
    fn same_seed_same_run(seed in any::<u64>(), drop in 0.0f64..0.5) {
        let run = || {
            let mut cluster = Cluster::new(SimConfig::lossy(seed, drop), &["n0", "n1", "n2", "n3"], greeter).unwrap();
            for dest in ["n0", "n1", "n2", "n3"] {
                fanout(&mut cluster, dest);
            }
            cluster.run_until_quiet(1_000).unwrap();
            let counts: Vec<u64> = cluster.nodes().map(|(_, n)| *n.state()).collect();
            (cluster.stats(), counts)
        };

        prop_assert_eq!(run(), run());
    }

    #[test]
    fn drops_and_deliveries_account_for_every_message(seed in any::<u64>(), drop in 0.0f64..=1.0) {
        let mut cluster = Cluster::new(SimConfig::lossy(seed, drop), &["n0", "n1", "n2"], greeter).unwrap();
        fanout(&mut cluster, "n0");
        fanout(&mut cluster, "n1");
        cluster.run_until_quiet(1_000).unwrap();

        let stats = cluster.stats();
        prop_assert_eq!(stats.dropped + hellos(&cluster), 4);
    }
}

// ============================================================================
// Key-value store
// ============================================================================

#[test]
fn read_of_missing_key_is_key_does_not_exist() {
    let mut kv = KvStore::new();

    let reply = kv
        .handle(&kv_request(&KvPayload::Read { key: "x".into() }, 1))
        .unwrap()
        .unwrap();

    assert_eq!(reply.dest.as_str(), "n0");
    assert_eq!(reply.src.as_str(), "seq-kv");
    assert_eq!(reply.body.in_reply_to, Some(MsgId::new(1)));
    assert_eq!(error_code(&reply), Some(ErrorCode::KeyDoesNotExist));
}

#[test]
fn write_then_read() {
    let mut kv = KvStore::new();
    let write = KvPayload::Write {
        key: "x".into(),
        value: json!(3),
    };

    let ack = kv.handle(&kv_request(&write, 1)).unwrap().unwrap();
    let read = kv
        .handle(&kv_request(&KvPayload::Read { key: "x".into() }, 2))
        .unwrap()
        .unwrap();

    assert_eq!(ack.body.kind, "write_ok");
    assert_eq!(
        read.body.decode::<KvPayload>().unwrap(),
        KvPayload::ReadOk { value: json!(3) }
    );
    assert_eq!(kv.get("seq-kv", "x"), Some(&json!(3)));
}

#[test_case(Some(json!(1)), json!(1), false, None; "matching value swaps")]
#[test_case(Some(json!(1)), json!(2), false, Some(ErrorCode::PreconditionFailed); "stale value fails")]
#[test_case(None, json!(0), false, Some(ErrorCode::KeyDoesNotExist); "missing key fails")]
#[test_case(None, json!(0), true, None; "missing key created")]
fn compare_and_set(initial: Option<Value>, from: Value, create: bool, expected: Option<ErrorCode>) {
    let mut kv = KvStore::new();
    if let Some(value) = initial {
        kv.put("seq-kv", "x", value);
    }
    let cas = KvPayload::Cas {
        key: "x".into(),
        from,
        to: json!(9),
        create_if_not_exists: create,
    };

    let reply = kv.handle(&kv_request(&cas, 1)).unwrap().unwrap();

    assert_eq!(error_code(&reply), expected);
    if expected.is_none() {
        assert_eq!(reply.body.kind, "cas_ok");
        assert_eq!(kv.get("seq-kv", "x"), Some(&json!(9)));
    }
}

#[test]
fn services_have_separate_keyspaces() {
    let mut kv = KvStore::new();
    kv.put("seq-kv", "x", 1);
    kv.put("lin-kv", "x", 2);

    assert_eq!(kv.get("seq-kv", "x"), Some(&json!(1)));
    assert_eq!(kv.get("lin-kv", "x"), Some(&json!(2)));
    assert_eq!(kv.get("lww-kv", "x"), None);
}

#[test]
fn uncorrelated_kv_message_gets_no_reply() {
    let mut kv = KvStore::new();
    let body = Body::from_payload(&KvPayload::Read { key: "x".into() }).unwrap();

    let reply = kv.handle(&Envelope::new("n0", "seq-kv", body)).unwrap();

    assert!(reply.is_none());
}

#[test]
fn malformed_kv_request_is_rejected() {
    let mut kv = KvStore::new();
    let body = Body::new("read").with_msg_id(MsgId::new(4));

    let reply = kv.handle(&Envelope::new("n0", "seq-kv", body)).unwrap().unwrap();

    assert_eq!(error_code(&reply), Some(ErrorCode::MalformedRequest));
}
