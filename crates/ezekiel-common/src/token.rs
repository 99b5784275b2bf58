use std::fmt;

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Bearer capability minted at lock acquisition. 128 bits of cryptographic
/// randomness, rendered on the wire as 32 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token(u128);

impl Token {
    /// Mint a fresh, unguessable token.
    pub fn generate() -> Self {
        Self(rand::rng().random::<u128>())
    }

    /// Decode a hex string off the wire. Malformed input yields `None` —
    /// callers must treat this the same as "no such lock" rather than
    /// surfacing a parse error, per the opaque-release policy.
    pub fn parse(hex_str: &str) -> Option<Self> {
        if hex_str.len() != 32 {
            return None;
        }
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(hex_str, &mut bytes).ok()?;
        Some(Self(u128::from_be_bytes(bytes)))
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0.to_be_bytes())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Token {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Token {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Token::parse(&s).ok_or_else(|| serde::de::Error::custom("malformed lock token"))
    }
}
