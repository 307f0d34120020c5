//! Torrent content identifiers.

use std::str::FromStr;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of a v1 infohash in bytes.
pub const INFO_HASH_LEN: usize = 20;

/// Length of the hex text form of an infohash.
const HEX_LEN: usize = INFO_HASH_LEN * 2;

/// Failure to decode the textual form of an infohash.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("expected 40 hex characters, got {len}")]
    InvalidLength { len: usize },

    #[error("invalid hex character {ch:?} at index {index}")]
    InvalidCharacter { index: usize, ch: char },
}

/// SHA-1 infohash identifying a torrent.
///
/// The key into the client's torrent registry. Serialises as the raw
/// 20 bytes, and as 40 lower-case hex characters in text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Encode, Decode)]
pub struct InfoHash([u8; INFO_HASH_LEN]);

impl InfoHash {
    /// Wrap raw infohash bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; INFO_HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Decode a 40-character hex infohash (either case).
    pub fn from_hex(s: &str) -> Result<Self, DecodeError> {
        if s.len() != HEX_LEN {
            return Err(DecodeError::InvalidLength { len: s.len() });
        }
        let mut bytes = [0u8; INFO_HASH_LEN];
        hex::decode_to_slice(s, &mut bytes).map_err(|e| match e {
            hex::FromHexError::InvalidHexCharacter { c, index } => {
                DecodeError::InvalidCharacter { index, ch: c }
            }
            hex::FromHexError::OddLength | hex::FromHexError::InvalidStringLength => {
                DecodeError::InvalidLength { len: s.len() }
            }
        })?;
        Ok(Self(bytes))
    }

    /// Lower-case hex encoding, as sent in announcements.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Get the raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; INFO_HASH_LEN] {
        &self.0
    }
}

impl FromStr for InfoHash {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl std::fmt::Display for InfoHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}
