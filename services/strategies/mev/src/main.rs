use adapter_service::{shutdown_channel, ConnectionConfig, WsMempoolFeed, WsRelayConnector};
use anyhow::{Context, Result};
use config::RelayClientConfig;
use ethers::providers::{Provider, Ws};
use mev::{
    DecisionGate, ProviderLedger, ReceiptEvent, RelayClient, SigningService, SubmissionPolicy,
    WalletSigner,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = RelayClientConfig::load(config_path.as_deref())
        .context("Failed to load relay client configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("Invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    config.validate().context("Invalid relay client configuration")?;

    info!("🚀 Starting mempool relay client...");

    let provider = Provider::<Ws>::connect(config.ledger.rpc_url.as_str())
        .await
        .with_context(|| format!("Failed to connect to ledger node {}", config.ledger.rpc_url))?;
    let provider = Arc::new(provider);

    let signer = WalletSigner::new(&config.signer.private_key, config.ledger.chain_id, provider.clone())
        .context("Failed to load signing key")?;
    let account = signer.address();
    info!("✅ Signing as {} on chain {}", account, signer.chain_id());

    let ledger = ProviderLedger::new(provider);
    let policy = SubmissionPolicy::from_settings(&config.submission, account)
        .context("Invalid submission settings")?;

    let (shutdown_handle, shutdown) = shutdown_channel();
    let ready_timeout = Duration::from_millis(config.relay.ready_timeout_ms);

    let feed_config = ConnectionConfig::new(config.mempool.url.clone())
        .with_api_key(config.mempool_api_key())
        .with_api_key_header(config.relay.api_key_header.clone())
        .with_connect_timeout(ready_timeout);
    let relay_config = ConnectionConfig::new(config.relay.url.clone())
        .with_api_key(config.relay.api_key.clone())
        .with_api_key_header(config.relay.api_key_header.clone())
        .with_connect_timeout(ready_timeout);

    let feed = WsMempoolFeed::new(feed_config).with_shutdown(shutdown.clone());
    let connector = WsRelayConnector::new(relay_config);
    let gate = DecisionGate::n_shot(config.submission.trigger_budget);

    let client = RelayClient::new(
        Arc::new(feed),
        Arc::new(connector),
        Arc::new(signer),
        Arc::new(ledger),
        policy,
        gate,
    )
    .context("Failed to create relay client")?;

    let mut receipts = client.subscribe_receipts();
    tokio::spawn(async move {
        loop {
            match receipts.recv().await {
                Ok(ReceiptEvent::Receipt { id, receipt }) => {
                    info!("🧾 Receipt for request {:?}: {}", id, receipt)
                }
                Ok(ReceiptEvent::TimedOut { id, after }) => {
                    warn!("⏱️ Request {} got no receipt within {:?}", id, after)
                }
                Ok(ReceiptEvent::SubmissionFailed { trigger, reason }) => {
                    error!("❌ Submission after {} failed: {}", trigger, reason)
                }
                Ok(event) => info!("📨 {:?}", event),
                Err(RecvError::Lagged(skipped)) => warn!("Receipt listener lagged by {}", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("🛑 Ctrl-C received, shutting down");
                shutdown_handle.trigger();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    info!("📡 Mempool {} → relay {}", config.mempool.url, config.relay.url);

    client
        .run(shutdown)
        .await
        .context("Relay client stopped with an error")?;

    info!("✅ Relay client shut down cleanly");
    Ok(())
}
