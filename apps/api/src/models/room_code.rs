//! Room code identifier
//!
//! Room codes are exactly six characters drawn from `[A-Z0-9]`. Client input
//! is trimmed and upper-cased before validation so `abc123` and `ABC123`
//! resolve to the same session.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::RoomError;

/// Number of characters in a room code
pub const ROOM_CODE_LENGTH: usize = 6;

/// Alphabet room codes are generated from
pub const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Validated, upper-case room code
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Normalize and validate client-supplied input
    pub fn parse(input: &str) -> Result<Self, RoomError> {
        let normalized = input.trim().to_ascii_uppercase();

        if normalized.is_empty() {
            return Err(RoomError::InvalidRoomCode("room code is required".into()));
        }
        if normalized.len() != ROOM_CODE_LENGTH {
            return Err(RoomError::InvalidRoomCode(format!(
                "room code must be exactly {} characters",
                ROOM_CODE_LENGTH
            )));
        }
        if !normalized.bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b)) {
            return Err(RoomError::InvalidRoomCode(
                "room code may only contain A-Z and 0-9".into(),
            ));
        }

        Ok(Self(normalized))
    }

    /// Draw a random candidate code; uniqueness is the registry's concern
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let code = (0..ROOM_CODE_LENGTH)
            .map(|_| ROOM_CODE_ALPHABET[rng.gen_range(0..ROOM_CODE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for RoomCode {
    type Err = RoomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
