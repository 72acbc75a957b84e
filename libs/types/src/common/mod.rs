//! Common encoding helpers

pub mod encoding;

pub use encoding::{decode_hex, decode_hex_array, encode_hex, HexBytes, HexError};
