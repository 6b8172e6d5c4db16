//! Behavior of the synchronous client against a scripted broker.

use std::cell::RefCell;
use std::rc::Rc;

use rand::rngs::mock::StepRng;
use serde_json::{Value, json};

use libpubsub::network::application::pubsub::{
    Client, ClientError, ConnectionState, MAX_PENDING_CALLS, Options, Payload,
};
use libpubsub::network::error::Error;

use crate::mock::{
    MockClock, MockConnection, Tail, connect_ok, connect_ok_with_rng, default_rng, event_log,
    handshake_ok, line, push_read, recorder, written_lines,
};

#[test]
fn test_connect_resolves_handle_and_replays_subscriptions() {
    let harness = connect_ok("Dev_##", MockClock::stepping(1));
    let handle = harness.client.handle().to_string();

    assert!(handle.starts_with("Dev_"));
    assert_eq!(handle.len(), 6);
    assert!(handle[4..].chars().all(|c| c.is_ascii_digit()));
    assert_eq!(harness.client.state(), ConnectionState::Connected);
    assert!(harness.client.is_connected());

    // Greeting first, then the replay of the pre-seeded handle channel.
    let lines = written_lines(&harness.writes);
    assert_eq!(lines[0], format!("{handle}(JSON)"));
    assert!(lines.contains(&format!("subscribe {handle}")));
}

#[test]
fn test_handshake_refusal_is_permanent() {
    let connection = MockConnection::new(Tail::WouldBlock);
    let reads = connection.reads_handle();
    push_read(&reads, b"error handle already in use\n".to_vec());
    let options = Options {
        handle: "taken",
        handshake_timeout_ms: 1_000,
    };

    let result = Client::connect(connection, options, default_rng(), MockClock::stepping(1));
    assert_eq!(result.err(), Some(ClientError::HandshakeRefused));
}

#[test]
fn test_handshake_deadline_bounds_the_wait() {
    let connection = MockConnection::new(Tail::WouldBlock);
    let options = Options {
        handle: "slow",
        handshake_timeout_ms: 3_000,
    };

    let result = Client::connect(connection, options, default_rng(), MockClock::stepping(500));
    assert_eq!(result.err(), Some(ClientError::Network(Error::Timeout)));
}

#[test]
fn test_broadcast_invokes_callbacks_in_registration_order() {
    let mut harness = connect_ok("sub", MockClock::stepping(1));
    let order: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
    let first = Rc::clone(&order);
    harness
        .client
        .subscribe("garden", move |_: &str, _: &str, _: &Payload| {
            first.borrow_mut().push("first");
        })
        .unwrap();
    let second = Rc::clone(&order);
    harness
        .client
        .subscribe("garden", move |_: &str, _: &str, _: &Payload| {
            second.borrow_mut().push("second");
        })
        .unwrap();

    push_read(
        &harness.reads,
        line(json!({"sender": "s", "recipient": "garden", "timestamp": 0, "soil": 7})),
    );
    harness.client.poll().unwrap();

    assert_eq!(*order.borrow(), ["first", "second"]);
}

#[test]
fn test_subscribing_twice_invokes_twice() {
    // Duplicate registrations are intended multiplicity, not deduplicated.
    let mut harness = connect_ok("twice", MockClock::stepping(1));
    let log = event_log();
    harness.client.subscribe("beat", recorder(&log)).unwrap();
    harness.client.subscribe("beat", recorder(&log)).unwrap();

    push_read(
        &harness.reads,
        line(json!({"sender": "s", "recipient": "beat", "timestamp": 0})),
    );
    harness.client.poll().unwrap();

    assert_eq!(log.borrow().len(), 2);
}

#[test]
fn test_keepalives_are_answered_and_never_dispatched() {
    let mut harness = connect_ok("ka", MockClock::stepping(1));
    let log = event_log();
    harness.client.subscribe("ka-data", recorder(&log)).unwrap();

    push_read(&harness.reads, b"ping\n".to_vec());
    push_read(&harness.reads, b".\n".to_vec());
    harness.client.poll().unwrap();
    harness.client.poll().unwrap();

    let lines = written_lines(&harness.writes);
    assert_eq!(&lines[lines.len() - 2..], &[".", "."][..]);
    assert!(log.borrow().is_empty());
}

#[test]
fn test_publish_and_inbound_round_trip() {
    let mut harness = connect_ok("rt", MockClock::stepping(1));
    let log = event_log();
    harness.client.subscribe("channel", recorder(&log)).unwrap();

    let mut outgoing = Payload::new();
    outgoing.insert("x".to_string(), json!(1));
    harness.client.publish("channel", &outgoing).unwrap();
    assert!(
        written_lines(&harness.writes).contains(&r#"sendraw channel {"x":1}"#.to_string())
    );

    push_read(
        &harness.reads,
        line(json!({
            "sender": "s", "recipient": "channel", "timestamp": 0,
            "data": "ignored", "x": 1
        })),
    );
    harness.client.poll().unwrap();

    let delivered = log.borrow();
    assert_eq!(delivered.len(), 1);
    let (sender, recipient, event) = &delivered[0];
    assert_eq!(sender, "s");
    assert_eq!(recipient, "channel");
    let expected = json!({"x": 1});
    assert_eq!(event, expected.as_object().unwrap());
}

#[test]
fn test_noise_lines_are_discarded() {
    let mut harness = connect_ok("quiet", MockClock::stepping(1));
    let log = event_log();
    harness.client.subscribe("known", recorder(&log)).unwrap();
    let written_before = written_lines(&harness.writes).len();

    push_read(&harness.reads, b"hello broker\n".to_vec());
    push_read(&harness.reads, b"{not json}\n".to_vec());
    // Event for a channel nobody subscribed.
    push_read(
        &harness.reads,
        line(json!({"sender": "s", "recipient": "elsewhere", "timestamp": 0})),
    );
    // Event missing its envelope.
    push_read(&harness.reads, line(json!({"recipient": "known"})));
    for _ in 0..4 {
        harness.client.poll().unwrap();
    }

    assert!(log.borrow().is_empty());
    assert_eq!(written_lines(&harness.writes).len(), written_before);
}

#[test]
fn test_peer_close_is_terminal() {
    let connection = MockConnection::new(Tail::Closed);
    let reads = connection.reads_handle();
    push_read(&reads, handshake_ok());
    let options = Options {
        handle: "closing",
        handshake_timeout_ms: 1_000,
    };
    let mut client =
        Client::connect(connection, options, default_rng(), MockClock::stepping(1)).unwrap();

    let err = client.poll().unwrap_err();
    assert_eq!(err, ClientError::Network(Error::ConnectionClosed));
    assert_eq!(client.state(), ConnectionState::Disconnected);
    // The instance is done; further pumping cannot revive it.
    assert_eq!(
        client.poll().unwrap_err(),
        ClientError::Network(Error::NotOpen)
    );
}

#[test]
fn test_write_failure_disconnects() {
    let mut harness = connect_ok("pubfail", MockClock::stepping(1));
    *harness.fail_writes.borrow_mut() = true;

    let err = harness.client.publish("any", &Payload::new()).unwrap_err();
    assert_eq!(err, ClientError::Network(Error::WriteError));
    assert_eq!(harness.client.state(), ConnectionState::Disconnected);
}

#[test]
fn test_call_response_before_deadline_is_delivered() {
    let (clock, now) = MockClock::frozen();
    let mut harness = connect_ok("caller", clock);
    let id = harness
        .client
        .call("service", "sum", &Payload::new(), 1_000)
        .unwrap();

    let request = written_lines(&harness.writes).last().unwrap().clone();
    assert!(request.starts_with("sendraw service "));
    assert!(request.contains(r#""_MESSAGE_HANDLE":"sum""#));
    assert!(request.contains(id.as_str()));

    *now.borrow_mut() = 500;
    push_read(
        &harness.reads,
        line(json!({
            "sender": "responder", "recipient": "caller", "timestamp": 0,
            "_MESSAGE_ID": id.as_str(), "result": 42
        })),
    );
    harness.client.poll().unwrap();

    let response = harness.client.take_response(&id).expect("call fulfilled");
    assert_eq!(response.get("result"), Some(&json!(42)));
    assert!(!response.contains_key("_MESSAGE_ID"));
    // One-shot correlation: the record was consumed.
    assert!(harness.client.take_response(&id).is_none());
}

#[test]
fn test_response_at_deadline_never_fulfills() {
    let (clock, now) = MockClock::frozen();
    let mut harness = connect_ok("caller", clock);
    let id = harness
        .client
        .call("service", "sum", &Payload::new(), 1_000)
        .unwrap();

    *now.borrow_mut() = 1_000;
    push_read(
        &harness.reads,
        line(json!({
            "sender": "responder", "recipient": "caller", "timestamp": 0,
            "_MESSAGE_ID": id.as_str(), "result": 42
        })),
    );
    harness.client.poll().unwrap();

    assert!(harness.client.take_response(&id).is_none());
}

#[test]
fn test_response_for_unknown_id_is_dropped() {
    let mut harness = connect_ok("caller", MockClock::stepping(1));
    push_read(
        &harness.reads,
        line(json!({
            "sender": "responder", "recipient": "caller", "timestamp": 0,
            "_MESSAGE_ID": "never-issued", "result": 1
        })),
    );
    harness.client.poll().unwrap();
    assert!(harness.client.take_response("never-issued").is_none());
}

#[test]
fn test_call_and_wait_times_out_unfulfilled() {
    let mut harness = connect_ok("waiter", MockClock::stepping(100));
    let call = harness
        .client
        .call_and_wait("service", "noop", &Payload::new(), 1_000)
        .unwrap();

    assert!(!call.is_fulfilled());
    assert!(call.response.is_none());
    assert_eq!(call.name.as_str(), "noop");
}

#[test]
fn test_call_and_wait_returns_response() {
    // Dry run with the same deterministic RNG to learn the id the real run
    // will generate.
    let expected_id = {
        let mut harness =
            connect_ok_with_rng("caller", StepRng::new(42, 13), MockClock::stepping(1));
        harness
            .client
            .call("service", "sum", &Payload::new(), 1_000)
            .unwrap()
    };

    let mut harness = connect_ok_with_rng("caller", StepRng::new(42, 13), MockClock::stepping(1));
    push_read(
        &harness.reads,
        line(json!({
            "sender": "responder", "recipient": "caller", "timestamp": 0,
            "_MESSAGE_ID": expected_id.as_str(), "result": "ok"
        })),
    );
    let call = harness
        .client
        .call_and_wait("service", "sum", &Payload::new(), 1_000)
        .unwrap();

    assert!(call.is_fulfilled());
    assert_eq!(call.id, expected_id);
    let response = call.response.unwrap();
    assert_eq!(response.get("result"), Some(&json!("ok")));
}

#[test]
fn test_pending_call_capacity_is_bounded() {
    let (clock, _now) = MockClock::frozen();
    let mut harness = connect_ok("bounded", clock);

    let mut issued = 0;
    let err = loop {
        match harness.client.call("svc", "op", &Payload::new(), 60_000) {
            Ok(_) => issued += 1,
            Err(err) => break err,
        }
        assert!(issued <= MAX_PENDING_CALLS, "capacity never enforced");
    };
    assert_eq!(err, ClientError::BufferOverflow);
    assert!(issued >= MAX_PENDING_CALLS - 1);
}

#[test]
fn test_service_invocation_replies_and_broadcasts() {
    let mut harness = connect_ok("node", MockClock::stepping(1));
    let log = event_log();
    harness.client.subscribe("tools", recorder(&log)).unwrap();

    let invocations = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&invocations);
    harness
        .client
        .register("tools", "double", move |event: &mut Payload| {
            *counter.borrow_mut() += 1;
            let input = event.get("n").and_then(Value::as_i64).unwrap_or(0);
            event.insert("result".to_string(), json!(input * 2));
        })
        .unwrap();
    assert!(written_lines(&harness.writes).contains(&"subscribe tools".to_string()));

    push_read(
        &harness.reads,
        line(json!({
            "sender": "alice", "recipient": "tools", "timestamp": 0,
            "_MESSAGE_HANDLE": "double", "_MESSAGE_ID": "abc-123", "n": 21
        })),
    );
    harness.client.poll().unwrap();

    assert_eq!(*invocations.borrow(), 1);

    // Exactly one reply went back to the caller, with the correlation id
    // preserved and the call marker stripped.
    let lines = written_lines(&harness.writes);
    let replies: Vec<_> = lines
        .iter()
        .filter(|line| line.starts_with("sendraw alice "))
        .collect();
    assert_eq!(replies.len(), 1);
    assert!(replies[0].contains(r#""result":42"#));
    assert!(replies[0].contains(r#""_MESSAGE_ID":"abc-123""#));
    assert!(!replies[0].contains("_MESSAGE_HANDLE"));

    // The invocation doubles as a broadcast to the recipient channel.
    let delivered = log.borrow();
    assert_eq!(delivered.len(), 1);
    let (sender, recipient, event) = &delivered[0];
    assert_eq!(sender, "alice");
    assert_eq!(recipient, "tools");
    assert_eq!(event.get("result"), Some(&json!(42)));
    assert!(event.contains_key("_MESSAGE_ID"));
}

#[test]
fn test_unregistered_call_name_with_id_is_not_broadcast() {
    // A call invocation for a service this client never registered carries
    // a correlation id, so it falls into (and misses) call correlation
    // rather than reaching subscribers.
    let mut harness = connect_ok("bystander", MockClock::stepping(1));
    let log = event_log();
    harness.client.subscribe("tools", recorder(&log)).unwrap();

    push_read(
        &harness.reads,
        line(json!({
            "sender": "alice", "recipient": "tools", "timestamp": 0,
            "_MESSAGE_HANDLE": "unknown", "_MESSAGE_ID": "abc-123", "n": 1
        })),
    );
    harness.client.poll().unwrap();

    assert!(log.borrow().is_empty());
    assert!(
        !written_lines(&harness.writes)
            .iter()
            .any(|line| line.starts_with("sendraw alice "))
    );
}

#[test]
fn test_unsubscribe_requires_prior_subscription() {
    let mut harness = connect_ok("unsub", MockClock::stepping(1));
    assert_eq!(
        harness.client.unsubscribe("ghost"),
        Err(ClientError::NotSubscribed)
    );
}

#[test]
fn test_unsubscribe_stops_delivery() {
    let mut harness = connect_ok("unsub", MockClock::stepping(1));
    let log = event_log();
    harness.client.subscribe("fleeting", recorder(&log)).unwrap();
    harness.client.unsubscribe("fleeting").unwrap();
    assert!(written_lines(&harness.writes).contains(&"unsubscribe fleeting".to_string()));

    push_read(
        &harness.reads,
        line(json!({"sender": "s", "recipient": "fleeting", "timestamp": 0})),
    );
    harness.client.poll().unwrap();
    assert!(log.borrow().is_empty());
}

#[test]
fn test_line_split_across_reads_is_reassembled() {
    let mut harness = connect_ok("frag", MockClock::stepping(1));
    let log = event_log();
    harness.client.subscribe("frag-data", recorder(&log)).unwrap();

    let full = line(json!({"sender": "s", "recipient": "frag-data", "timestamp": 0, "v": 9}));
    let (head, tail) = full.split_at(10);
    push_read(&harness.reads, head.to_vec());
    push_read(&harness.reads, tail.to_vec());

    harness.client.poll().unwrap();
    assert!(log.borrow().is_empty());
    harness.client.poll().unwrap();

    let delivered = log.borrow();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].2.get("v"), Some(&json!(9)));
}

#[test]
fn test_events_are_dispatched_in_wire_order_within_a_chunk() {
    let mut harness = connect_ok("order", MockClock::stepping(1));
    let log = event_log();
    harness.client.subscribe("seq", recorder(&log)).unwrap();

    let mut chunk = Vec::new();
    for index in 0..3 {
        chunk.extend(line(
            json!({"sender": "s", "recipient": "seq", "timestamp": 0, "index": index}),
        ));
    }
    push_read(&harness.reads, chunk);
    harness.client.poll().unwrap();

    let delivered = log.borrow();
    let indexes: Vec<_> = delivered
        .iter()
        .map(|(_, _, event)| event.get("index").cloned().unwrap())
        .collect();
    assert_eq!(indexes, [json!(0), json!(1), json!(2)]);
}

#[test]
fn test_stop_sends_quit() {
    let harness = connect_ok("stopper", MockClock::stepping(1));
    let writes = Rc::clone(&harness.writes);

    harness.client.stop().unwrap();
    assert_eq!(
        written_lines(&writes).last().map(String::as_str),
        Some("quit")
    );
}
