//! crates/sa_io/src/hasher.rs
//!
//! Deterministic hashing and the run id.
//!
//! - Hex digests are **lowercase** 64-hex.
//! - Use `sha256_canonical(..)` for JSON values/structs (goes through canonical_json).
//! - Use `sha256_hex(..)`, `sha256_stream(..)` or `sha256_file(..)` for raw bytes/files.
//! - `RUN:<hex>` ids hash the canonical run-record body, so identical inputs and
//!   parameters always produce the same id.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::canonical_json::to_canonical_bytes;
use crate::{IoError, IoResult};

/// True for a lowercase 64-hex SHA-256 digest.
#[inline]
pub fn is_lower_hex_64(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// SHA-256 over raw bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// SHA-256 over a reader stream (raw, not canonicalized).
pub fn sha256_stream<R: Read>(reader: &mut R) -> IoResult<String> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// SHA-256 over a file's raw bytes.
pub fn sha256_file(path: &Path) -> IoResult<String> {
    let f = File::open(path).map_err(|e| IoError::Path(format!("{}: {e}", path.display())))?;
    sha256_stream(&mut BufReader::new(f))
}

/// SHA-256 over the canonical JSON bytes of any serializable value.
pub fn sha256_canonical<T: Serialize>(value: &T) -> IoResult<String> {
    Ok(sha256_hex(&to_canonical_bytes(value)?))
}

/// `RUN:<hex>` id for a run-record body.
pub fn run_id_from_canonical<T: Serialize>(body: &T) -> IoResult<String> {
    Ok(format!("RUN:{}", sha256_canonical(body)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical_json::to_canonical_json_bytes;
    use serde_json::json;

    #[test]
    fn hex_encoding_is_lowercase() {
        let h = sha256_hex(b"abc");
        assert_eq!(h, "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
        assert!(is_lower_hex_64(&h));
        assert!(!is_lower_hex_64(&h.to_uppercase()));
    }

    #[test]
    fn canonical_hashing_ignores_field_order() {
        #[derive(Serialize)]
        struct T {
            b: u32,
            a: u32,
        }
        let h1 = sha256_canonical(&T { b: 2, a: 1 }).unwrap();
        let h2 = sha256_hex(&to_canonical_json_bytes(&json!({"a": 1, "b": 2})).unwrap());
        assert_eq!(h1, h2);
    }

    #[test]
    fn file_digest_matches_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("priors.csv");
        std::fs::write(&p, b"unit_id,area\nA,1\n").unwrap();
        assert_eq!(sha256_file(&p).unwrap(), sha256_hex(b"unit_id,area\nA,1\n"));
        assert!(sha256_file(&dir.path().join("missing.csv")).is_err());
    }

    #[test]
    fn run_id_is_prefixed_and_stable() {
        let body = json!({"params": {"total_effort": 10.0}});
        let a = run_id_from_canonical(&body).unwrap();
        assert!(a.starts_with("RUN:"));
        assert_eq!(a.len(), 4 + 64);
        assert_eq!(a, run_id_from_canonical(&body).unwrap());
    }
}
