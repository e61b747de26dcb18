//! Content digests identifying a schema's structure.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Length of a schema digest in bytes.
pub const DIGEST_LENGTH: usize = 20;

/// A 20-byte content hash of a canonical schema structure.
///
/// The canonical string form is exactly 40 lowercase hexadecimal characters,
/// two per byte, most-significant byte first, with no separators. Parsing is
/// the exact inverse of [`Display`](fmt::Display) and rejects any other
/// length or character set.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; DIGEST_LENGTH]);

impl Digest {
    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; DIGEST_LENGTH] {
        &self.0
    }
}

impl From<[u8; DIGEST_LENGTH]> for Digest {
    fn from(bytes: [u8; DIGEST_LENGTH]) -> Self {
        Digest(bytes)
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self)
    }
}

/// A digest string was not 40 lowercase hex characters.
#[derive(Debug, Error)]
pub enum ParseDigestError {
    /// The string was not exactly 40 characters long.
    #[error("digest must be {expected} hex characters, got {0}", expected = DIGEST_LENGTH * 2)]
    Length(usize),

    /// The string contained a non-hexadecimal character.
    #[error(transparent)]
    Hex(#[from] hex::FromHexError),
}

impl FromStr for Digest {
    type Err = ParseDigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != DIGEST_LENGTH * 2 {
            return Err(ParseDigestError::Length(s.len()));
        }
        let mut bytes = [0u8; DIGEST_LENGTH];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Digest(bytes))
    }
}

impl serde::Serialize for Digest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for Digest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let bytes: [u8; DIGEST_LENGTH] = [
            0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0xfa, 0xfb, 0xfc, 0xfd,
            0xfe, 0xff, 0x10, 0x20, 0x30, 0x40,
        ];
        let digest = Digest::from(bytes);
        let s = digest.to_string();
        assert_eq!(s.len(), 40);
        assert_eq!(s, "00010203040506070809fafbfcfdfeff10203040");
        assert_eq!(s.parse::<Digest>().unwrap(), digest);
    }

    #[test]
    fn display_is_lowercase() {
        let digest = Digest::from([0xABu8; DIGEST_LENGTH]);
        assert_eq!(digest.to_string(), "ab".repeat(DIGEST_LENGTH));
    }

    #[test]
    fn wrong_length_fails() {
        assert!(matches!(
            "abcd".parse::<Digest>(),
            Err(ParseDigestError::Length(4))
        ));
        assert!(matches!(
            "ab".repeat(DIGEST_LENGTH + 1).parse::<Digest>(),
            Err(ParseDigestError::Length(42))
        ));
        assert!("".parse::<Digest>().is_err());
    }

    #[test]
    fn invalid_characters_fail() {
        let s = "zz".repeat(DIGEST_LENGTH);
        assert!(matches!(
            s.parse::<Digest>(),
            Err(ParseDigestError::Hex(_))
        ));
    }
}
