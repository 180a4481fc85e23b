//! WebSocket Streaming Integration Tests
//!
//! Runs the feed server on a loopback port with manual ticks and consumes it
//! with both a raw WebSocket and the reducing feed client.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use rust_decimal::Decimal;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use tradepulse_feed::infrastructure::clock::{ManualTickHandle, ManualTicks};
use tradepulse_feed::infrastructure::directory::InMemoryUserDirectory;
use tradepulse_feed::{
    BroadcastHub, ClientState, FeedClient, FeedClientConfig, FeedEvent, FeedServer, FeedServerError,
    FeedServerState, PriceGenerator, SharedBroadcastHub, SubscriptionService, TickScheduler,
    Universe,
};

struct TestFeed {
    url: String,
    hub: SharedBroadcastHub,
    ticks: ManualTickHandle,
    cancel: CancellationToken,
}

async fn start_feed() -> TestFeed {
    let universe = Arc::new(Universe::standard());
    let hub = Arc::new(BroadcastHub::with_defaults());
    let cancel = CancellationToken::new();

    let scheduler = TickScheduler::new(
        PriceGenerator::seeded(Arc::clone(&universe), 42),
        Arc::clone(&hub),
    );
    let (source, ticks) = ManualTicks::new();
    let scheduler_cancel = cancel.clone();
    tokio::spawn(async move { scheduler.run(source, scheduler_cancel).await });

    let subscriptions = Arc::new(SubscriptionService::new(
        universe,
        Arc::new(InMemoryUserDirectory::new()),
    ));
    let state = Arc::new(FeedServerState::new(
        Arc::clone(&hub),
        subscriptions,
        cancel.clone(),
    ));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = FeedServer::new(addr.port(), state, cancel.clone());
    tokio::spawn(async move {
        tokio_test::assert_ok!(server.serve(listener).await);
    });

    TestFeed {
        url: format!("ws://{addr}/ws"),
        hub,
        ticks,
        cancel,
    }
}

async fn wait_for_connections(hub: &SharedBroadcastHub, expected: usize) {
    timeout(Duration::from_secs(2), async {
        while hub.connection_count() != expected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("connections did not register");
}

async fn next_state(events: &mut mpsc::Receiver<FeedEvent>) -> ClientState {
    loop {
        let event = timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("no feed event in time")
            .expect("feed client stopped");
        if let FeedEvent::Snapshot { state, skipped } = event {
            assert!(skipped.is_empty());
            return state;
        }
    }
}

// =============================================================================
// Wire format
// =============================================================================

#[tokio::test]
async fn frame_is_symbol_to_two_decimal_price() {
    let feed = start_feed().await;
    let (mut socket, _) = tokio_tungstenite::connect_async(&feed.url).await.unwrap();
    wait_for_connections(&feed.hub, 1).await;

    assert!(feed.ticks.fire());

    let frame = timeout(Duration::from_secs(2), socket.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let Message::Text(text) = frame else {
        panic!("expected text frame, got {frame:?}");
    };
    let payload: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(text.as_str()).unwrap();

    assert_eq!(payload.len(), 5);
    for (symbol, value) in &payload {
        assert!(Universe::standard().contains(symbol), "unexpected {symbol}");
        let price = value.as_str().expect("price is a string");
        let (_, decimals) = price.split_once('.').expect("price has a decimal point");
        assert_eq!(decimals.len(), 2, "{symbol} = {price}");
        let price: Decimal = price.parse().unwrap();
        assert!(price >= Decimal::ZERO && price <= Decimal::ONE_THOUSAND);
    }

    feed.cancel.cancel();
}

#[tokio::test]
async fn disconnecting_socket_leaves_the_hub() {
    let feed = start_feed().await;
    let (mut socket, _) = tokio_tungstenite::connect_async(&feed.url).await.unwrap();
    wait_for_connections(&feed.hub, 1).await;

    socket.close(None).await.unwrap();

    wait_for_connections(&feed.hub, 0).await;
    feed.cancel.cancel();
}

// =============================================================================
// Client reduction
// =============================================================================

#[tokio::test]
async fn client_reduces_stream_into_price_delta_and_history() {
    let feed = start_feed().await;
    let client_cancel = CancellationToken::new();
    let (tx, mut events) = mpsc::channel(16);
    let client = FeedClient::new(
        FeedClientConfig::new(feed.url.clone()),
        tx,
        client_cancel.clone(),
    );
    let client_handle = tokio::spawn(client.run());

    let first_event = timeout(Duration::from_secs(2), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(first_event, FeedEvent::Connected));
    wait_for_connections(&feed.hub, 1).await;

    assert!(feed.ticks.fire());
    let first = next_state(&mut events).await;
    assert_eq!(first.snapshots_applied(), 1);
    for symbol in Universe::standard().symbols() {
        let price = first.price_state(symbol).unwrap();
        assert_eq!(price.delta, Decimal::ZERO, "{symbol}");
        assert_eq!(first.history(symbol).unwrap().to_vec(), vec![price.price]);
    }

    assert!(feed.ticks.fire());
    let second = next_state(&mut events).await;
    assert_eq!(second.snapshots_applied(), 2);
    for symbol in Universe::standard().symbols() {
        let before = first.price_state(symbol).unwrap().price;
        let after = second.price_state(symbol).unwrap();
        assert_eq!(after.delta, after.price - before, "{symbol}");
        assert_eq!(
            second.history(symbol).unwrap().to_vec(),
            vec![before, after.price]
        );
    }

    client_cancel.cancel();
    tokio_test::assert_ok!(client_handle.await.unwrap());
    feed.cancel.cancel();
}

#[tokio::test]
async fn server_shutdown_disconnects_client() {
    let feed = start_feed().await;
    let client_cancel = CancellationToken::new();
    let (tx, mut events) = mpsc::channel(16);
    let client = FeedClient::new(
        FeedClientConfig::new(feed.url.clone()),
        tx,
        client_cancel.clone(),
    );
    let client_handle = tokio::spawn(client.run());

    assert!(matches!(
        timeout(Duration::from_secs(2), events.recv()).await.unwrap(),
        Some(FeedEvent::Connected)
    ));
    wait_for_connections(&feed.hub, 1).await;

    feed.cancel.cancel();

    let event = timeout(Duration::from_secs(2), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(event, FeedEvent::Disconnected));

    client_cancel.cancel();
    tokio_test::assert_ok!(client_handle.await.unwrap());
}

#[tokio::test]
async fn occupied_port_fails_to_bind() {
    let occupied = TcpListener::bind("0.0.0.0:0").await.unwrap();
    let port = occupied.local_addr().unwrap().port();
    let state = Arc::new(FeedServerState::new(
        Arc::new(BroadcastHub::with_defaults()),
        Arc::new(SubscriptionService::new(
            Arc::new(Universe::standard()),
            Arc::new(InMemoryUserDirectory::new()),
        )),
        CancellationToken::new(),
    ));

    let result = FeedServer::new(port, state, CancellationToken::new()).run().await;

    assert!(matches!(result, Err(FeedServerError::BindFailed(p, _)) if p == port));
}
