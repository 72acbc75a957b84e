//! # Mempool Relay Types
//!
//! Value types shared by every crate in the workspace:
//!
//! - **Encoding**: `0x` hex helpers and the [`HexBytes`] wire buffer
//! - **Transactions**: [`ObservedTransaction`], [`TxHash`], [`Address`]
//! - **Signing**: [`SigningRequest`] in, [`SignedTransactionBytes`] out
//!
//! ```rust
//! use types::{encode_hex, decode_hex};
//!
//! assert_eq!(encode_hex(&[0x00, 0x2a, 0xff]), "0x002aff");
//! assert_eq!(decode_hex("0x002aff").unwrap(), vec![0x00, 0x2a, 0xff]);
//! ```

pub mod common;
pub mod transaction;

pub use common::{decode_hex, decode_hex_array, encode_hex, HexBytes, HexError};
pub use transaction::{Address, ObservedTransaction, SignedTransactionBytes, SigningRequest, TxHash};
