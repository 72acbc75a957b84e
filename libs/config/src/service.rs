//! Default values for the relay client
//!
//! Every default here can be overridden from the TOML file or the
//! `MEV_RELAY__*` environment variables.

/// Relay (bundle submission / receipt) channel defaults
pub mod relay {
    /// Submission endpoint
    pub const URL: &str = "wss://echo-rpc.chainbound.io/ws";

    /// Header carrying the API key on the websocket handshake
    pub const API_KEY_HEADER: &str = "x-api-key";

    /// Bound on the websocket handshake (milliseconds)
    pub const READY_TIMEOUT_MS: u64 = 10_000;
}

/// Mempool feed defaults
pub mod mempool {
    pub const URL: &str = "wss://eth.merkle.io";
}

/// Chain state reader defaults
pub mod ledger {
    pub const RPC_URL: &str = "wss://eth.merkle.io";

    /// Ethereum mainnet
    pub const CHAIN_ID: u64 = 1;
}

/// Submission defaults
pub mod submission {
    /// Receipt wait for private legs and bundles (milliseconds)
    pub const RECEIPT_TIMEOUT_MS: u64 = 60_000;

    /// Receipt wait for legs routed to the public mempool (milliseconds)
    pub const PUBLIC_LEG_TIMEOUT_MS: u64 = 20_000;

    /// Number of transactions allowed to trigger a submission
    pub const TRIGGER_BUDGET: u32 = 1;

    /// Value carried by the self-addressed follow-up transactions (wei)
    pub const FOLLOW_UP_VALUE_WEI: u64 = 42;

    pub const MEV_BUILDERS: [&str; 3] = ["titan", "rsync", "beaverbuild"];
}

/// Environment variable names kept from the original tooling
pub mod env {
    /// API key shared by the feed and the relay
    pub const API_KEY: &str = "FIBER_TEST_KEY";

    /// Hex private key used by the signing service
    pub const PRIVATE_KEY: &str = "ETHEREUM_TEST_PK";

    /// Prefix for structured overrides, e.g. `MEV_RELAY__RELAY__URL`
    pub const PREFIX: &str = "MEV_RELAY";
}
