//! 12-byte document identifier
//!
//! Text form is exactly 24 lowercase hex characters. Freshly minted ids carry
//! a big-endian seconds timestamp in the first four bytes so they sort by
//! creation time.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use rand::RngCore;
use thiserror::Error;

/// Length of the binary form in bytes
pub const OBJECT_ID_LEN: usize = 12;

/// Error returned when a string is not a valid identifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid object id '{0}': expected 24 lowercase hex characters")]
pub struct ObjectIdError(pub String);

/// Primary document identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

impl ObjectId {
    /// Mints a new identifier from the current time and random bytes.
    pub fn new() -> Self {
        let mut bytes = [0u8; OBJECT_ID_LEN];
        let secs = Utc::now().timestamp() as u32;
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        rand::thread_rng().fill_bytes(&mut bytes[4..]);
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> [u8; OBJECT_ID_LEN] {
        self.0
    }

    /// Parses the 24-character lowercase hex form.
    pub fn parse_str(s: &str) -> Result<Self, ObjectIdError> {
        if !Self::is_valid(s) {
            return Err(ObjectIdError(s.to_string()));
        }

        let mut bytes = [0u8; OBJECT_ID_LEN];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            bytes[i] = (hex_digit(chunk[0]) << 4) | hex_digit(chunk[1]);
        }
        Ok(Self(bytes))
    }

    /// Returns true if `s` is a well-formed identifier string.
    pub fn is_valid(s: &str) -> bool {
        s.len() == OBJECT_ID_LEN * 2
            && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = ObjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

fn hex_digit(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        _ => b - b'a' + 10,
    }
}
