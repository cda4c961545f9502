//! Unit tests for the counter handlers, driven by hand-written kv replies.

use std::time::Duration;

use gossamer_node::{KvPayload, ManualClock, Node};
use gossamer_wire::{Body, Envelope, ErrorBody, ErrorCode, MsgId, RuntimePayload};
use serde_json::json;
use test_case::test_case;

use crate::{CounterConfig, CounterPayload, CounterState, install};

// ============================================================================
// Helpers
// ============================================================================

type CounterNode = Node<CounterState, ManualClock>;

fn node_in(ids: &[&str]) -> CounterNode {
    let mut node = Node::with_clock(CounterState::default(), ManualClock::new());
    install(&mut node).unwrap();
    let ids: Vec<String> = ids.iter().map(|id| format!("\"{id}\"")).collect();
    node.handle_line(&format!(
        r#"{{"src":"c0","dest":"n0","body":{{"type":"init","msg_id":1,"node_id":"n0","node_ids":[{}]}}}}"#,
        ids.join(",")
    ))
    .unwrap();
    node
}

fn client(payload: &CounterPayload, msg_id: u64) -> Envelope {
    Envelope::new(
        "c1",
        "n0",
        Body::from_payload(payload).unwrap().with_msg_id(MsgId::new(msg_id)),
    )
}

fn to_kv(out: &[Envelope]) -> Vec<(MsgId, KvPayload)> {
    out.iter()
        .filter(|e| e.dest.as_str() == "seq-kv")
        .map(|e| (e.body.msg_id.unwrap(), e.body.decode().unwrap()))
        .collect()
}

fn to_client(out: &[Envelope]) -> Vec<CounterPayload> {
    out.iter()
        .filter(|e| e.dest.as_str() == "c1")
        .map(|e| e.body.decode().unwrap())
        .collect()
}

fn kv_reply(in_reply_to: MsgId, payload: &KvPayload) -> Envelope {
    Envelope::new(
        "seq-kv",
        "n0",
        Body::from_payload(payload).unwrap().with_in_reply_to(in_reply_to),
    )
}

fn kv_error(in_reply_to: MsgId, code: ErrorCode) -> Envelope {
    let body = Body::from_payload(&RuntimePayload::Error(ErrorBody { code, text: None }))
        .unwrap()
        .with_in_reply_to(in_reply_to);
    Envelope::new("seq-kv", "n0", body)
}

fn read_ok(in_reply_to: MsgId, value: u64) -> Envelope {
    kv_reply(in_reply_to, &KvPayload::ReadOk { value: json!(value) })
}

// ============================================================================
// Add
// ============================================================================

#[test]
fn add_is_acknowledged_and_written() {
    let mut node = node_in(&["n0", "n1"]);

    let out = node.handle(client(&CounterPayload::Add { delta: 5 }, 2)).unwrap();

    assert_eq!(to_client(&out), vec![CounterPayload::AddOk]);
    let writes = to_kv(&out);
    assert_eq!(writes.len(), 1);
    assert_eq!(
        writes[0].1,
        KvPayload::Cas {
            key: "n0".into(),
            from: json!(0),
            to: json!(5),
            create_if_not_exists: true,
        }
    );
    assert_eq!(node.state().total(), 5);
}

#[test]
fn only_one_write_is_in_flight() {
    let mut node = node_in(&["n0", "n1"]);
    let first = node.handle(client(&CounterPayload::Add { delta: 1 }, 2)).unwrap();
    let (write_id, _) = to_kv(&first)[0].clone();

    let second = node.handle(client(&CounterPayload::Add { delta: 2 }, 3)).unwrap();
    assert!(to_kv(&second).is_empty());

    let after_ack = node
        .handle(kv_reply(write_id, &KvPayload::CasOk))
        .unwrap();

    assert_eq!(node.state().persisted(), 1);
    assert_eq!(
        to_kv(&after_ack)[0].1,
        KvPayload::Cas {
            key: "n0".into(),
            from: json!(1),
            to: json!(3),
            create_if_not_exists: true,
        }
    );
}

#[test]
fn precondition_failure_reads_the_stored_total_back() {
    let mut node = node_in(&["n0", "n1"]);
    let out = node.handle(client(&CounterPayload::Add { delta: 4 }, 2)).unwrap();
    let (write_id, _) = to_kv(&out)[0].clone();

    let out = node
        .handle(kv_error(write_id, ErrorCode::PreconditionFailed))
        .unwrap();
    let (read_id, read) = to_kv(&out)[0].clone();
    assert_eq!(read, KvPayload::Read { key: "n0".into() });

    node.handle(read_ok(read_id, 4)).unwrap();

    assert_eq!(node.state().persisted(), 4);
    assert!(node.state().write_in_flight().is_none());
}

#[test]
fn stalled_write_is_retried_after_the_timeout() {
    let mut node = node_in(&["n0", "n1"]);
    node.handle(client(&CounterPayload::Add { delta: 2 }, 2)).unwrap();

    node.clock_mut().advance(Duration::from_millis(500));
    assert!(to_kv(&node.tick().unwrap()).is_empty());

    node.clock_mut().advance(Duration::from_millis(600));
    let retry = to_kv(&node.tick().unwrap());

    assert_eq!(retry.len(), 1);
    assert!(matches!(retry[0].1, KvPayload::Cas { .. }));
    assert_eq!(node.state().write_in_flight().unwrap().generation, 2);
}

#[test]
fn malformed_add_is_rejected() {
    let mut node = node_in(&["n0"]);
    let body = Body::new("add")
        .with_msg_id(MsgId::new(2))
        .with_field("delta", -3);

    let out = node.handle(Envelope::new("c1", "n0", body)).unwrap();

    match out[0].body.decode::<RuntimePayload>().unwrap() {
        RuntimePayload::Error(error) => assert_eq!(error.code, ErrorCode::MalformedRequest),
        other => panic!("expected error, got {other:?}"),
    }
    assert_eq!(node.state().total(), 0);
}

// ============================================================================
// Read
// ============================================================================

#[test]
fn read_without_peers_answers_immediately() {
    let mut node = node_in(&["n0"]);
    node.handle(client(&CounterPayload::Add { delta: 7 }, 2)).unwrap();

    let out = node.handle(client(&CounterPayload::Read, 3)).unwrap();

    assert_eq!(to_client(&out), vec![CounterPayload::ReadOk { value: 7 }]);
}

#[test]
fn read_waits_for_every_peer() {
    let mut node = node_in(&["n0", "n1", "n2"]);
    node.handle(client(&CounterPayload::Add { delta: 1 }, 2)).unwrap();

    let out = node.handle(client(&CounterPayload::Read, 3)).unwrap();
    let reads: Vec<_> = to_kv(&out)
        .into_iter()
        .filter(|(_, p)| matches!(p, KvPayload::Read { .. }))
        .collect();
    assert_eq!(reads.len(), 2);

    // Replies arrive in the opposite order to the requests.
    let first = node.handle(read_ok(reads[1].0, 10)).unwrap();
    assert!(to_client(&first).is_empty());
    let last = node.handle(read_ok(reads[0].0, 20)).unwrap();

    assert_eq!(to_client(&last), vec![CounterPayload::ReadOk { value: 31 }]);
    assert_eq!(node.state().pending_reads(), 0);
}

#[test_case(ErrorCode::KeyDoesNotExist; "unwritten key")]
#[test_case(ErrorCode::TemporarilyUnavailable; "service error")]
fn failed_peer_read_counts_as_zero(code: ErrorCode) {
    let mut node = node_in(&["n0", "n1"]);
    node.handle(client(&CounterPayload::Add { delta: 3 }, 2)).unwrap();

    let out = node.handle(client(&CounterPayload::Read, 3)).unwrap();
    let (read_id, _) = to_kv(&out)
        .into_iter()
        .find(|(_, p)| matches!(p, KvPayload::Read { .. }))
        .unwrap();
    let out = node.handle(kv_error(read_id, code)).unwrap();

    assert_eq!(to_client(&out), vec![CounterPayload::ReadOk { value: 3 }]);
}

#[test]
fn stalled_read_answers_with_partial_sum() {
    let config = CounterConfig {
        request_timeout: Duration::from_millis(200),
        ..CounterConfig::default()
    };
    let mut node = Node::with_clock(CounterState::new(config), ManualClock::new());
    install(&mut node).unwrap();
    node.handle_line(
        r#"{"src":"c0","dest":"n0","body":{"type":"init","msg_id":1,"node_id":"n0","node_ids":["n0","n1","n2"]}}"#,
    )
    .unwrap();

    let out = node.handle(client(&CounterPayload::Read, 2)).unwrap();
    let reads = to_kv(&out);
    node.handle(read_ok(reads[0].0, 6)).unwrap();

    node.clock_mut().advance(Duration::from_millis(250));
    let out = node.tick().unwrap();

    assert_eq!(to_client(&out), vec![CounterPayload::ReadOk { value: 6 }]);
    assert_eq!(node.state().pending_reads(), 0);
}

#[test]
fn counter_service_is_configurable() {
    let config = CounterConfig {
        service: "lin-kv".into(),
        ..CounterConfig::default()
    };
    let mut node = Node::with_clock(CounterState::new(config), ManualClock::new());
    install(&mut node).unwrap();
    node.handle_line(
        r#"{"src":"c0","dest":"n0","body":{"type":"init","msg_id":1,"node_id":"n0","node_ids":["n0"]}}"#,
    )
    .unwrap();

    let out = node.handle(client(&CounterPayload::Add { delta: 1 }, 2)).unwrap();

    assert!(out.iter().any(|e| e.dest.as_str() == "lin-kv"));
}
