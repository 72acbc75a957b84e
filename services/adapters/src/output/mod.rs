//! Output adapters for delivering submissions to the relay
//!
//! The relay speaks JSON-RPC 2.0 over a websocket. Submissions go out through a
//! [`RelayTransport`]; responses and receipt notifications come back on the same
//! socket and are handed to the registered handler.

pub mod jsonrpc;
pub mod relay_channel;

pub use jsonrpc::{InboundFrame, RelayRequest, RequestIdGenerator, JSONRPC_VERSION};
pub use relay_channel::{
    MessageHandler, RelayConnector, RelayTransport, WsRelayChannel, WsRelayConnector,
};
