//! Relay client against loopback feed and relay servers

use adapter_service::{
    shutdown_channel, AdapterError, ConnectionConfig, Shutdown, WsMempoolFeed, WsRelayConnector,
};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Transaction, H160, U256};
use ethers::utils::rlp::Rlp;
use mev::{
    BlockBuilder, BundleRouting, ClientState, DecisionGate, FollowUpIntent, MevError,
    ReceiptEvent, RelayClient, RoutingOptions, SigningService, SubmissionPolicy,
};
use mev_relay_e2e::{
    pending_transaction, test_signer, MockMempoolServer, MockRelayServer, StaticLedger,
    TEST_ADDRESS,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use types::{decode_hex, encode_hex, Address, SigningRequest};

const API_KEY: &str = "e2e-relay-key";
const GWEI: u128 = 1_000_000_000;

fn follow_up(account: Address, nonce: u64, value: u128) -> SigningRequest {
    SigningRequest::transfer(account, value)
        .with_nonce(nonce)
        .with_gas_limit(21_000)
        .with_gas_price(30 * GWEI)
}

fn feed_for(server: &MockMempoolServer, shutdown: &Shutdown) -> WsMempoolFeed {
    let config = ConnectionConfig::new(server.url.clone())
        .with_api_key(API_KEY)
        .with_connect_timeout(Duration::from_secs(2));
    WsMempoolFeed::new(config).with_shutdown(shutdown.clone())
}

fn connector_for(server: &MockRelayServer, api_key: &str) -> WsRelayConnector {
    WsRelayConnector::new(
        ConnectionConfig::new(server.url.clone())
            .with_api_key(api_key)
            .with_connect_timeout(Duration::from_secs(2)),
    )
}

async fn next_event(events: &mut broadcast::Receiver<ReceiptEvent>) -> ReceiptEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("receipt event within 5s")
        .expect("receipt channel open")
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition reached within 5s");
}

fn raw_of(seed: u8) -> String {
    let tx: Transaction = serde_json::from_value(pending_transaction(seed)).unwrap();
    encode_hex(&tx.rlp())
}

#[tokio::test]
async fn test_bundle_backruns_first_trigger_only() {
    let relay = MockRelayServer::start(API_KEY).await;
    let mempool = MockMempoolServer::start().await;

    let signer = test_signer(1);
    let account = signer.address();
    let policy = SubmissionPolicy::bundle(
        BundleRouting {
            await_receipt: true,
            receipt_timeout: Duration::from_secs(60),
            mev_builders: Some(vec![BlockBuilder::Titan, BlockBuilder::Beaverbuild]),
            refund: None,
        },
        vec![FollowUpIntent::new(
            "backrun",
            follow_up(account, 7, 42),
            RoutingOptions::private(Duration::from_secs(60), Vec::new()),
        )],
    );

    let (handle, shutdown) = shutdown_channel();
    let client = Arc::new(
        RelayClient::new(
            Arc::new(feed_for(&mempool, &shutdown)),
            Arc::new(connector_for(&relay, API_KEY)),
            Arc::new(signer),
            Arc::new(StaticLedger::new(19_000_000, 7)),
            policy,
            DecisionGate::single_fire(),
        )
        .unwrap(),
    );
    let mut events = client.subscribe_receipts();

    let runner = client.clone();
    let run = tokio::spawn(async move { runner.run(shutdown).await });

    mempool.push(pending_transaction(0x11));
    mempool.push(pending_transaction(0x22));

    assert!(matches!(
        next_event(&mut events).await,
        ReceiptEvent::Acknowledged { id: 1, .. }
    ));
    match next_event(&mut events).await {
        ReceiptEvent::Receipt { id, receipt } => {
            assert_eq!(id, Some(1));
            assert_eq!(receipt["status"], "included");
        }
        other => panic!("unexpected event {:?}", other),
    }

    wait_until(|| client.stats().observed() == 2).await;
    assert_eq!(client.state(), ClientState::Streaming);
    assert_eq!(mempool.subscriptions(), 1);

    let received = relay.received();
    assert_eq!(received.len(), 1, "second trigger must not fire");
    let request = &received[0];
    assert_eq!(request["jsonrpc"], "2.0");
    assert_eq!(request["id"], 1);
    assert_eq!(request["method"], "eth_sendBundle");

    let bundle = &request["params"][0];
    assert_eq!(bundle["blockNumber"], 19_000_001);
    assert_eq!(bundle["usePublicMempool"], false);
    assert_eq!(bundle["awaitReceipt"], true);
    assert_eq!(bundle["awaitReceiptTimeoutMs"], 60_000);
    assert_eq!(bundle["mevBuilders"][0], "titan");
    assert_eq!(bundle["mevBuilders"][1], "beaverbuild");

    let txs = bundle["txs"].as_array().unwrap();
    assert_eq!(txs.len(), 2);
    assert_eq!(txs[0].as_str().unwrap(), raw_of(0x11));

    let raw = decode_hex(txs[1].as_str().unwrap()).unwrap();
    let (backrun, signature) = TypedTransaction::decode_signed(&Rlp::new(&raw)).unwrap();
    assert_eq!(backrun.nonce(), Some(&U256::from(7)));
    assert_eq!(backrun.value(), Some(&U256::from(42)));
    let signer_address: H160 = TEST_ADDRESS.parse().unwrap();
    assert_eq!(signature.recover(backrun.sighash()).unwrap(), signer_address);

    handle.trigger();
    run.await.unwrap().unwrap();
    assert_eq!(client.state(), ClientState::Closed);
}

#[tokio::test]
async fn test_private_legs_are_correlated_separately() {
    let relay = MockRelayServer::start(API_KEY).await;
    let mempool = MockMempoolServer::start().await;

    let signer = test_signer(1);
    let account = signer.address();
    let approval = FollowUpIntent::new(
        "approval",
        follow_up(account, 7, 42),
        RoutingOptions::public(Duration::from_secs(20)),
    )
    .single_form();
    let swap = FollowUpIntent::new(
        "swap",
        follow_up(account, 8, 69),
        RoutingOptions::private(Duration::from_secs(60), vec![BlockBuilder::Rsync]),
    );

    let (handle, shutdown) = shutdown_channel();
    let ledger = Arc::new(StaticLedger::new(19_000_000, 0));
    let client = Arc::new(
        RelayClient::new(
            Arc::new(feed_for(&mempool, &shutdown)),
            Arc::new(connector_for(&relay, API_KEY)),
            Arc::new(signer),
            ledger.clone(),
            SubmissionPolicy::private_transactions(vec![approval, swap]),
            DecisionGate::single_fire(),
        )
        .unwrap(),
    );
    let mut events = client.subscribe_receipts();

    let runner = client.clone();
    let run = tokio::spawn(async move { runner.run(shutdown).await });

    mempool.push(pending_transaction(0x33));

    let mut acknowledged = Vec::new();
    let mut receipts = Vec::new();
    for _ in 0..4 {
        match next_event(&mut events).await {
            ReceiptEvent::Acknowledged { id, .. } => acknowledged.push(id),
            ReceiptEvent::Receipt { id, .. } => receipts.push(id),
            other => panic!("unexpected event {:?}", other),
        }
    }
    acknowledged.sort_unstable();
    receipts.sort_unstable();
    assert_eq!(acknowledged, vec![1, 2]);
    assert_eq!(receipts, vec![Some(1), Some(2)]);

    let received = relay.received();
    assert_eq!(received.len(), 2);
    assert!(received
        .iter()
        .all(|r| r["method"] == "eth_sendPrivateRawTransaction"));

    let first = &received[0]["params"][0];
    assert_eq!(first["usePublicMempool"], true);
    assert_eq!(first["awaitReceiptTimeoutMs"], 20_000);
    assert!(first["tx"].is_string());
    assert!(first.get("blockNumber").is_none());

    let second = &received[1]["params"][0];
    assert_eq!(second["usePublicMempool"], false);
    assert_eq!(second["txs"].as_array().unwrap().len(), 1);
    assert_eq!(second["mevBuilders"][0], "rsync");

    // Explicit nonces, unpinned legs: no chain reads
    assert_eq!(ledger.queries(), 0);

    handle.trigger();
    run.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_wrong_api_key_fails_startup() {
    let relay = MockRelayServer::start(API_KEY).await;
    let mempool = MockMempoolServer::start().await;

    let signer = test_signer(1);
    let account = signer.address();
    let client = RelayClient::new(
        Arc::new(feed_for(&mempool, &Shutdown::never())),
        Arc::new(connector_for(&relay, "not-the-key")),
        Arc::new(signer),
        Arc::new(StaticLedger::new(1, 0)),
        SubmissionPolicy::private_transactions(vec![FollowUpIntent::new(
            "swap",
            follow_up(account, 0, 1),
            RoutingOptions::private(Duration::from_secs(60), Vec::new()),
        )]),
        DecisionGate::single_fire(),
    )
    .unwrap();

    mempool.push(pending_transaction(0x44));

    let err = tokio::time::timeout(Duration::from_secs(5), client.run(Shutdown::never()))
        .await
        .expect("startup failure within 5s")
        .unwrap_err();

    assert!(matches!(
        err,
        MevError::Adapter(AdapterError::AuthenticationFailed { status: 401, .. })
    ));
    assert_eq!(client.state(), ClientState::Closed);
    assert_eq!(client.stats().observed(), 0);
    assert_eq!(relay.rejected(), 1);
    assert!(relay.received().is_empty());
}

#[tokio::test]
async fn test_feed_disconnect_ends_run() {
    let relay = MockRelayServer::start(API_KEY).await;
    let mempool = MockMempoolServer::start().await;

    let signer = test_signer(1);
    let account = signer.address();
    let client = RelayClient::new(
        Arc::new(feed_for(&mempool, &Shutdown::never())),
        Arc::new(connector_for(&relay, API_KEY)),
        Arc::new(signer),
        Arc::new(StaticLedger::new(1, 0)),
        SubmissionPolicy::private_transactions(vec![FollowUpIntent::new(
            "swap",
            follow_up(account, 0, 1),
            RoutingOptions::private(Duration::from_secs(60), Vec::new()),
        )]),
        DecisionGate::single_fire().with_predicate(|_| false),
    )
    .unwrap();

    mempool.push(pending_transaction(0x55));
    mempool.disconnect();

    let err = tokio::time::timeout(Duration::from_secs(5), client.run(Shutdown::never()))
        .await
        .expect("feed loss within 5s")
        .unwrap_err();

    assert!(matches!(
        err,
        MevError::Adapter(AdapterError::ConnectionLost { .. })
    ));
    assert_eq!(client.state(), ClientState::Closed);
    assert_eq!(client.stats().observed(), 1);
    assert_eq!(client.stats().triggered(), 0);
    assert!(relay.received().is_empty());
}
