//! Streaming file-integrity verification.
//!
//! The digest algorithm is implied entirely by the expected hash's length
//! (see [`HashAlg::from_hex_len`]); files are streamed in fixed-size chunks
//! so archives never need to fit in memory. Any I/O failure during the read
//! is treated as a verification failure rather than an error, so callers
//! handle it uniformly with a hash mismatch.

use std::io::Read;
use std::path::Path;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

use cygmir_schema::hash::{HashAlg, HexDigest, UnknownHashLength};

/// Chunk size for streaming reads.
const CHUNK_SIZE: usize = 1 << 14;

enum Hasher {
    Md5(Md5),
    Sha1(Sha1),
    Sha256(Sha256),
    Sha512(Sha512),
}

impl Hasher {
    fn new(alg: HashAlg) -> Self {
        match alg {
            HashAlg::Md5 => Self::Md5(Md5::new()),
            HashAlg::Sha1 => Self::Sha1(Sha1::new()),
            HashAlg::Sha256 => Self::Sha256(Sha256::new()),
            HashAlg::Sha512 => Self::Sha512(Sha512::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Md5(h) => h.update(data),
            Self::Sha1(h) => h.update(data),
            Self::Sha256(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Self::Md5(h) => hex::encode(h.finalize()),
            Self::Sha1(h) => hex::encode(h.finalize()),
            Self::Sha256(h) => hex::encode(h.finalize()),
            Self::Sha512(h) => hex::encode(h.finalize()),
        }
    }
}

/// Hash an in-memory buffer with the given algorithm.
pub fn hash_bytes(data: &[u8], alg: HashAlg) -> String {
    let mut hasher = Hasher::new(alg);
    hasher.update(data);
    hasher.finalize_hex()
}

/// Hash a file with the given algorithm, streaming in 16 KiB chunks.
///
/// # Errors
///
/// Returns the underlying I/O error if the file cannot be read.
pub fn hash_file(path: &Path, alg: HashAlg) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Hasher::new(alg);
    let mut buffer = [0u8; CHUNK_SIZE];
    loop {
        let count = file.read(&mut buffer)?;
        if count == 0 {
            break;
        }
        hasher.update(&buffer[..count]);
    }
    Ok(hasher.finalize_hex())
}

/// Check a file against a validated expected digest.
///
/// Returns `false` on a digest mismatch *or* when the file cannot be read,
/// so a vanished or truncated file looks the same as a corrupted one.
pub fn verify_file(path: &Path, expected: &HexDigest) -> bool {
    match hash_file(path, expected.alg()) {
        Ok(actual) => actual == expected.as_str(),
        Err(_) => false,
    }
}

/// Check a file against a raw hex string, inferring the algorithm from the
/// string's length.
///
/// # Errors
///
/// Fails with [`UnknownHashLength`] before any I/O when the length matches
/// no known algorithm; this is a configuration error, never a silent
/// `false`.
pub fn verify_file_hex(path: &Path, expected: &str) -> Result<bool, UnknownHashLength> {
    let alg = HashAlg::from_hex_len(expected.len())?;
    Ok(match hash_file(path, alg) {
        Ok(actual) => actual == expected.to_lowercase(),
        Err(_) => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Digests of the ASCII string "cygmir test payload".
    const PAYLOAD: &[u8] = b"cygmir test payload";

    fn payload_file(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("payload.bin");
        std::fs::write(&path, PAYLOAD).unwrap();
        path
    }

    #[test]
    fn verifies_every_algorithm() {
        let dir = tempfile::tempdir().unwrap();
        let path = payload_file(&dir);

        for alg in [HashAlg::Md5, HashAlg::Sha1, HashAlg::Sha256, HashAlg::Sha512] {
            let expected = HexDigest::new(hash_bytes(PAYLOAD, alg)).unwrap();
            assert_eq!(expected.alg(), alg);
            assert!(verify_file(&path, &expected));
        }
    }

    #[test]
    fn mismatch_is_false_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = payload_file(&dir);
        let wrong = HexDigest::new("0".repeat(64)).unwrap();
        assert!(!verify_file(&path, &wrong));
    }

    #[test]
    fn unreadable_file_is_false() {
        let digest = HexDigest::new(hash_bytes(PAYLOAD, HashAlg::Md5)).unwrap();
        assert!(!verify_file(Path::new("/nonexistent/file.bin"), &digest));
    }

    #[test]
    fn bad_length_is_config_error_before_io() {
        let err = verify_file_hex(Path::new("/nonexistent/file.bin"), "abc123").unwrap_err();
        assert_eq!(err, UnknownHashLength(6));
    }

    #[test]
    fn hex_comparison_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let path = payload_file(&dir);
        let upper = hash_bytes(PAYLOAD, HashAlg::Md5).to_uppercase();
        assert!(verify_file_hex(&path, &upper).unwrap());
    }

    #[test]
    fn streaming_matches_oneshot_on_large_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        let data: Vec<u8> = (0u32..100_000).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        assert_eq!(
            hash_file(&path, HashAlg::Sha256).unwrap(),
            hash_bytes(&data, HashAlg::Sha256)
        );
    }
}
