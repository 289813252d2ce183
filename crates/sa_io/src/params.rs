//! Parameter-set loading: `{ "total_effort": <L>, "max_iters": <n> }`.

use std::fs;
use std::path::Path;

use sa_core::variables::{validate_domains, Params};

use crate::{IoError, IoResult};

/// Parse and domain-check a parameter set from JSON bytes.
pub fn parse_params(bytes: &[u8]) -> IoResult<Params> {
    let p: Params = serde_json::from_slice(bytes)?;
    validate_domains(&p)?;
    Ok(p)
}

/// Load a parameter-set JSON file.
pub fn load_params(path: &Path) -> IoResult<Params> {
    let bytes = fs::read(path).map_err(|e| IoError::Path(format!("{}: {e}", path.display())))?;
    parse_params(&bytes)
}
