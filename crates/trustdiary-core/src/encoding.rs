//! Base64 encoding for keys, nonces and signatures.
//!
//! Every fixed-size binary value that crosses the wire is carried as a
//! standard (padded) base64 string. The [`base64_serde!`](crate::base64_serde)
//! macro wires a `[u8; N]` newtype into serde with that representation.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::{CoreError, Result};

/// Encode bytes as standard base64.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a standard base64 string.
pub fn decode(s: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(s)
        .map_err(|e| CoreError::DecodingError(e.to_string()))
}

/// Decode a standard base64 string into a fixed-size array.
pub fn decode_array<const N: usize>(s: &str) -> Result<[u8; N]> {
    let bytes = decode(s)?;
    let got = bytes.len();
    bytes
        .try_into()
        .map_err(|_| CoreError::InvalidLength { expected: N, got })
}

/// Serde adapter for variable-length byte strings.
///
/// Use as `#[serde(with = "trustdiary_core::encoding::base64_bytes")]`.
pub mod base64_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::decode(&s).map_err(serde::de::Error::custom)
    }
}

/// Implement `Serialize`/`Deserialize` as a base64 string for a tuple
/// newtype over `[u8; $len]`.
#[macro_export]
macro_rules! base64_serde {
    ($ty:ty, $len:expr) => {
        impl ::serde::Serialize for $ty {
            fn serialize<S: ::serde::Serializer>(
                &self,
                serializer: S,
            ) -> ::std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(&$crate::encoding::encode(&self.0))
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $ty {
            fn deserialize<D: ::serde::Deserializer<'de>>(
                deserializer: D,
            ) -> ::std::result::Result<Self, D::Error> {
                let s = <::std::string::String as ::serde::Deserialize>::deserialize(deserializer)?;
                $crate::encoding::decode_array::<{ $len }>(&s)
                    .map(Self)
                    .map_err(<D::Error as ::serde::de::Error>::custom)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_array_rejects_wrong_length() {
        let encoded = encode(&[7u8; 31]);
        let err = decode_array::<32>(&encoded).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidLength {
                expected: 32,
                got: 31
            }
        ));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode("not base64!!").is_err());
    }
}
