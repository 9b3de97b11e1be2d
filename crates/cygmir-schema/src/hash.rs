//! Digest algorithms and validated hex digests.
//!
//! Upstream catalogues identify archive checksums only by their hex string;
//! the algorithm is inferred from the string length. An unrecognised length
//! is a configuration error, never a silent verification failure.

use serde::{Deserialize, Deserializer, Serialize};

/// A digest algorithm recognised by the catalogue format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlg {
    /// MD5 (16-byte digest, 32 hex characters). Legacy catalogues only.
    Md5,
    /// SHA-1 (20-byte digest, 40 hex characters).
    Sha1,
    /// SHA-256 (32-byte digest, 64 hex characters).
    Sha256,
    /// SHA-512 (64-byte digest, 128 hex characters). Current catalogues.
    Sha512,
}

/// Error raised when a hex digest has a length matching no known algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized hash length {0}: expected 32, 40, 64 or 128 hex characters")]
pub struct UnknownHashLength(pub usize);

impl HashAlg {
    /// Infer the algorithm from the length of a hex digest string.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownHashLength`] for any length other than 32/40/64/128.
    pub fn from_hex_len(len: usize) -> Result<Self, UnknownHashLength> {
        match len {
            32 => Ok(Self::Md5),
            40 => Ok(Self::Sha1),
            64 => Ok(Self::Sha256),
            128 => Ok(Self::Sha512),
            other => Err(UnknownHashLength(other)),
        }
    }

    /// Digest size in bytes.
    pub fn digest_len(self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha512 => 64,
        }
    }

    /// Lowercase algorithm name, as used in checksum-manifest filenames.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }
}

impl std::fmt::Display for HashAlg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur when validating a [`HexDigest`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DigestError {
    /// The string contains characters outside `[0-9a-fA-F]`.
    #[error("digest contains non-hex characters in '{0}'")]
    NonHex(String),
    /// The string length matches no known digest algorithm.
    #[error(transparent)]
    UnknownLength(#[from] UnknownHashLength),
}

/// A validated, lowercased hex digest whose algorithm is known.
///
/// Validation happens at construction so that invalid strings cannot
/// propagate into the download pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct HexDigest(String);

impl HexDigest {
    /// Create a validated digest, lowercasing the input.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError::NonHex`] for non-hex input, or
    /// [`DigestError::UnknownLength`] when the length matches no algorithm.
    pub fn new(s: impl Into<String>) -> Result<Self, DigestError> {
        let s = s.into();
        if !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DigestError::NonHex(s));
        }
        HashAlg::from_hex_len(s.len())?;
        Ok(Self(s.to_lowercase()))
    }

    /// The algorithm implied by this digest's length.
    pub fn alg(&self) -> HashAlg {
        // Length was validated at construction; 128 is the only case left.
        match self.0.len() {
            32 => HashAlg::Md5,
            40 => HashAlg::Sha1,
            64 => HashAlg::Sha256,
            _ => HashAlg::Sha512,
        }
    }

    /// The digest as a lowercase hex string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for HexDigest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for HexDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for HexDigest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_algorithm_from_length() {
        assert_eq!(HashAlg::from_hex_len(32).unwrap(), HashAlg::Md5);
        assert_eq!(HashAlg::from_hex_len(40).unwrap(), HashAlg::Sha1);
        assert_eq!(HashAlg::from_hex_len(64).unwrap(), HashAlg::Sha256);
        assert_eq!(HashAlg::from_hex_len(128).unwrap(), HashAlg::Sha512);
    }

    #[test]
    fn rejects_unknown_lengths() {
        for len in [0, 16, 31, 33, 63, 65, 127, 129] {
            assert_eq!(HashAlg::from_hex_len(len), Err(UnknownHashLength(len)));
        }
    }

    #[test]
    fn digest_lowercases() {
        let digest = HexDigest::new("ABCDEF0123456789ABCDEF0123456789").unwrap();
        assert_eq!(digest.as_str(), "abcdef0123456789abcdef0123456789");
        assert_eq!(digest.alg(), HashAlg::Md5);
    }

    #[test]
    fn digest_rejects_non_hex() {
        let err = HexDigest::new("zz").unwrap_err();
        assert!(matches!(err, DigestError::NonHex(_)));
    }

    #[test]
    fn digest_rejects_bad_length() {
        let err = HexDigest::new("abcd").unwrap_err();
        assert_eq!(err, DigestError::UnknownLength(UnknownHashLength(4)));
    }
}
