//! Runtime bridge end to end against a scripted gateway

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{tx_json, tx_search_json, FakeGateway};
use surge_explorer::app::{App, DetailState};
use surge_explorer::domain::Detail;
use surge_explorer::infrastructure::runtime::{
    FeedId, RuntimeBridge, RuntimeCommand, RuntimeEvent, WorkerSettings,
};
use surge_explorer::infrastructure::stream::StreamEvent;
use surge_explorer::infrastructure::tendermint::Gateway;

fn settings() -> WorkerSettings {
    WorkerSettings {
        poll_interval: Duration::from_millis(20),
        inscription_poll: Duration::from_secs(60),
        backlog: 20,
    }
}

/// Drain events until `done` returns true or the deadline passes
fn wait_for(
    bridge: &RuntimeBridge,
    timeout: Duration,
    mut done: impl FnMut(&RuntimeEvent) -> bool,
) -> Vec<RuntimeEvent> {
    let deadline = Instant::now() + timeout;
    let mut seen = Vec::new();
    while Instant::now() < deadline {
        for event in bridge.poll_events() {
            let finished = done(&event);
            seen.push(event);
            if finished {
                return seen;
            }
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    panic!("timed out; events so far: {seen:?}");
}

#[test]
fn test_connect_then_load_and_stream() {
    let fake = Arc::new(FakeGateway::new());
    fake.set_head(40);
    fake.respond(
        "tx_search",
        tx_search_json(vec![tx_json("AA01", 40, 0)], 1),
    );
    fake.add_block(40, &[]);

    let gateway: Arc<dyn Gateway> = fake.clone();
    let bridge = RuntimeBridge::new(gateway, settings()).unwrap();
    let mut app = App::new("Fake", 20);
    // superseded by the reload on connect
    app.take_commands();

    let events = wait_for(&bridge, Duration::from_secs(5), |e| {
        matches!(e, RuntimeEvent::Connected { .. })
    });
    let Some(RuntimeEvent::Connected { endpoint, status }) = events.into_iter().last() else {
        panic!("expected a connected event");
    };
    assert_eq!(status.latest_height, 40);
    app.apply_connected(endpoint, status);
    for command in app.take_commands() {
        bridge.send(command).unwrap();
    }

    let events = wait_for(&bridge, Duration::from_secs(5), |e| {
        matches!(
            e,
            RuntimeEvent::TxsPage {
                feed: FeedId::HomeTxs,
                ..
            }
        )
    });
    for event in events {
        if let RuntimeEvent::TxsPage {
            feed,
            ticket,
            result,
        } = event
        {
            app.apply_txs_page(feed, ticket, result);
        }
    }
    assert_eq!(app.home_txs.len(), 1);
    assert_eq!(app.home_txs.records()[0].hash, "AA01");

    fake.add_block(41, &[]);
    fake.set_head(41);
    wait_for(&bridge, Duration::from_secs(5), |e| {
        matches!(e, RuntimeEvent::Stream(StreamEvent::NewBlock(b)) if b.height == 41)
    });

    bridge.send(RuntimeCommand::Shutdown).unwrap();
}

#[test]
fn test_offline_endpoint_reports_errors() {
    let fake = Arc::new(FakeGateway::new());
    fake.fail("status", "connection refused");

    let gateway: Arc<dyn Gateway> = fake.clone();
    let bridge = RuntimeBridge::new(gateway, settings()).unwrap();
    let events = wait_for(&bridge, Duration::from_secs(5), |e| {
        matches!(e, RuntimeEvent::Error { .. })
    });
    let Some(RuntimeEvent::Error { message }) = events.last() else {
        panic!("expected an error event");
    };
    assert!(message.contains("Fake (fake://rpc)"));

    // the worker keeps retrying and connects once the node answers
    fake.set_head(7);
    wait_for(&bridge, Duration::from_secs(5), |e| {
        matches!(e, RuntimeEvent::Connected { status, .. } if status.latest_height == 7)
    });
}

#[test]
fn test_search_lookup_round_trip() {
    let fake = Arc::new(FakeGateway::new());
    fake.set_head(9);
    fake.add_block(9, &[]);

    let gateway: Arc<dyn Gateway> = fake.clone();
    let bridge = RuntimeBridge::new(gateway, settings()).unwrap();
    let mut app = App::new("Fake", 20);
    app.take_commands();

    app.open_search();
    app.search_push('9');
    app.submit_search();
    for command in app.take_commands() {
        bridge.send(command).unwrap();
    }

    let events = wait_for(&bridge, Duration::from_secs(5), |e| {
        matches!(e, RuntimeEvent::Detail { .. })
    });
    let Some(RuntimeEvent::Detail { ticket, result }) = events.into_iter().last() else {
        panic!("expected a detail event");
    };
    app.apply_detail(ticket, result);
    let pane = app.detail.as_ref().unwrap();
    assert!(matches!(
        &pane.state,
        DetailState::Ready(Detail::Block { block, txs }) if block.height == 9 && txs.is_empty()
    ));

    bridge.send(RuntimeCommand::Shutdown).unwrap();
}
