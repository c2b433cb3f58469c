//! Type-safe pairing code.
//!
//! [`PairingCode`] is a six-digit numeric credential. Possession of the code
//! is the only thing a client needs to join a session, so it is drawn from a
//! cryptographically secure generator and never widened beyond 10⁶ values.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Number of digits in a pairing code.
pub const CODE_LENGTH: usize = 6;

/// Size of the code space (`10^CODE_LENGTH`).
pub const CODE_SPACE: u32 = 1_000_000;

/// Error returned when a string is not exactly six ASCII digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("pairing code must be exactly {CODE_LENGTH} digits")]
pub struct InvalidPairingCode;

/// Six-digit pairing code identifying an active session.
///
/// Stored as an integer and always rendered zero-padded, so `"004217"` and
/// `PairingCode::from_number(4217)` are the same code. Serialized as a JSON
/// string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairingCode(u32);

impl PairingCode {
    /// Draws a fresh code from the thread-local CSPRNG.
    #[must_use]
    pub fn random() -> Self {
        Self::generate(&mut rand::rng())
    }

    /// Draws a code from the given generator.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(rng.random_range(0..CODE_SPACE))
    }

    /// Builds a code from its numeric value, if it fits in six digits.
    #[must_use]
    pub const fn from_number(value: u32) -> Option<Self> {
        if value < CODE_SPACE {
            Some(Self(value))
        } else {
            None
        }
    }
}

impl fmt::Display for PairingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06}", self.0)
    }
}

impl FromStr for PairingCode {
    type Err = InvalidPairingCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != CODE_LENGTH || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidPairingCode);
        }
        s.parse::<u32>().map(Self).map_err(|_| InvalidPairingCode)
    }
}

impl Serialize for PairingCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PairingCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn random_codes_are_six_digits() {
        for _ in 0..1_000 {
            let code = PairingCode::random().to_string();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[test]
    fn display_zero_pads() {
        let Some(code) = PairingCode::from_number(42) else {
            panic!("42 fits in six digits");
        };
        assert_eq!(code.to_string(), "000042");
    }

    #[test]
    fn parse_accepts_leading_zeros() {
        let Ok(code) = "004217".parse::<PairingCode>() else {
            panic!("valid code");
        };
        assert_eq!(Some(code), PairingCode::from_number(4217));
    }

    #[test]
    fn parse_rejects_bad_input() {
        for raw in ["", "12345", "1234567", "12a456", "+12345", " 12345", "１２３４５６"] {
            assert_eq!(raw.parse::<PairingCode>(), Err(InvalidPairingCode), "{raw}");
        }
    }

    #[test]
    fn from_number_rejects_seven_digits() {
        assert!(PairingCode::from_number(CODE_SPACE).is_none());
        assert!(PairingCode::from_number(CODE_SPACE - 1).is_some());
    }

    #[test]
    fn serializes_as_string() {
        let Some(code) = PairingCode::from_number(7) else {
            panic!("valid code");
        };
        let json = serde_json::to_string(&code).ok();
        assert_eq!(json.as_deref(), Some("\"000007\""));
        let back: Result<PairingCode, _> = serde_json::from_str("\"000007\"");
        assert_eq!(back.ok(), Some(code));
        assert!(serde_json::from_str::<PairingCode>("7").is_err());
    }
}
