// crates/sa_io/src/manifest.rs
//
// Run manifest: which input tables and parameters a run uses.
//
// • Inputs are local paths only; any "<scheme>://" or http(s): path is rejected.
// • Relative paths resolve against the manifest's directory.
// • `priors_path` is required; observations and parameters are optional.
// • Parameters come from `params_path` or inline `params`, never both.
// • Digests (if given) are lowercase 64-hex over the raw file bytes and only
//   for inputs that are present.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use sa_core::variables::{validate_domains, Params};

use crate::hasher::{is_lower_hex_64, sha256_file};
use crate::looks_like_url_strict;
use crate::params::load_params;

/// External manifest accepted by the loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Optional user label, echoed into the run record as `manifest_id`.
    #[serde(default)]
    pub id: Option<String>,

    pub priors_path: String,
    #[serde(default)]
    pub observations_path: Option<String>,
    #[serde(default)]
    pub params_path: Option<String>,
    #[serde(default)]
    pub params: Option<Params>,

    #[serde(default)]
    pub inputs_sha256: Option<InputDigests>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputDigests {
    #[serde(default)]
    pub priors_path: Option<String>,
    #[serde(default)]
    pub observations_path: Option<String>,
    #[serde(default)]
    pub params_path: Option<String>,
}

/// Manifest with paths resolved against its directory and parameters loaded.
#[derive(Debug, Clone)]
pub struct ResolvedManifest {
    pub id: Option<String>,
    pub priors_path: PathBuf,
    pub observations_path: Option<PathBuf>,
    pub params_path: Option<PathBuf>,
    pub params: Option<Params>,
    pub digests: Option<InputDigests>,
}

#[derive(Debug)]
pub enum ManifestError {
    Empty(&'static str),
    UrlPath(&'static str, String),
    Io(&'static str, String),
    /// Manifest bytes are not a valid manifest document.
    Parse(String),
    NotAFile(&'static str, String),
    /// Both `params_path` and inline `params` were given.
    ParamsConflict,
    /// Inline or referenced parameters failed domain checks.
    Params(String),
    /// Bad hex format / shape.
    DigestShape(&'static str, String),
    /// Provided digest doesn't match the file.
    DigestMismatch(&'static str, String),
    /// Digest provided for an input that is not present in the manifest.
    DigestForMissing(&'static str),
}

impl std::fmt::Display for ManifestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ManifestError::*;
        match self {
            Empty(k) => write!(f, "field must not be empty: {k}"),
            UrlPath(k, v) => write!(f, "path must be offline (no scheme) for {k}: {v}"),
            Io(k, v) => write!(f, "cannot access {k}: {v}"),
            Parse(v) => write!(f, "malformed manifest: {v}"),
            NotAFile(k, v) => write!(f, "path is not a file for {k}: {v}"),
            ParamsConflict => write!(f, "give either params_path or inline params, not both"),
            Params(v) => write!(f, "invalid params: {v}"),
            DigestShape(k, v) => write!(f, "invalid sha256 format for {k}: {v}"),
            DigestMismatch(k, v) => write!(f, "sha256 mismatch for {k}: {v}"),
            DigestForMissing(k) => write!(f, "digest supplied for missing input: {k}"),
        }
    }
}

impl std::error::Error for ManifestError {}

// ---------- helpers ----------

#[inline]
fn join_under(base: &Path, rel: &str) -> PathBuf {
    let p = Path::new(rel);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}

fn offline_check(label: &'static str, path: &str) -> Result<(), ManifestError> {
    if path.trim().is_empty() {
        return Err(ManifestError::Empty(label));
    }
    if looks_like_url_strict(path) {
        return Err(ManifestError::UrlPath(label, path.to_string()));
    }
    Ok(())
}

fn digest_shape(label: &'static str, h: &Option<String>) -> Result<(), ManifestError> {
    match h {
        Some(h) if !is_lower_hex_64(h) => Err(ManifestError::DigestShape(label, h.clone())),
        _ => Ok(()),
    }
}

fn must_exist_file(label: &'static str, p: &Path) -> Result<(), ManifestError> {
    let md = fs::metadata(p).map_err(|e| ManifestError::Io(label, format!("{} ({e})", p.display())))?;
    if !md.is_file() {
        return Err(ManifestError::NotAFile(label, p.display().to_string()));
    }
    Ok(())
}

// ---------- validation (no I/O) ----------

/// Validate shape, offline policy and digest format.
pub fn validate_manifest(man: &Manifest) -> Result<(), ManifestError> {
    offline_check("priors_path", &man.priors_path)?;
    if let Some(s) = &man.observations_path {
        offline_check("observations_path", s)?;
    }
    if let Some(s) = &man.params_path {
        offline_check("params_path", s)?;
    }
    if man.params_path.is_some() && man.params.is_some() {
        return Err(ManifestError::ParamsConflict);
    }
    if let Some(p) = &man.params {
        validate_domains(p).map_err(|e| ManifestError::Params(e.to_string()))?;
    }

    if let Some(d) = &man.inputs_sha256 {
        digest_shape("priors_path", &d.priors_path)?;
        digest_shape("observations_path", &d.observations_path)?;
        digest_shape("params_path", &d.params_path)?;
        if d.observations_path.is_some() && man.observations_path.is_none() {
            return Err(ManifestError::DigestForMissing("observations_path"));
        }
        if d.params_path.is_some() && man.params_path.is_none() {
            return Err(ManifestError::DigestForMissing("params_path"));
        }
    }
    Ok(())
}

// ---------- resolution ----------

/// Resolve paths under `base_dir`, check that inputs are files, and load
/// referenced parameters.
pub fn resolve_paths(base_dir: &Path, man: &Manifest) -> Result<ResolvedManifest, ManifestError> {
    let priors = join_under(base_dir, &man.priors_path);
    let observations = man.observations_path.as_deref().map(|s| join_under(base_dir, s));
    let params_path = man.params_path.as_deref().map(|s| join_under(base_dir, s));

    must_exist_file("priors_path", &priors)?;
    if let Some(p) = &observations {
        must_exist_file("observations_path", p)?;
    }
    let params = match &params_path {
        Some(p) => {
            must_exist_file("params_path", p)?;
            Some(load_params(p).map_err(|e| ManifestError::Params(e.to_string()))?)
        }
        None => man.params.clone(),
    };

    Ok(ResolvedManifest {
        id: man.id.clone(),
        priors_path: priors,
        observations_path: observations,
        params_path,
        params,
        digests: man.inputs_sha256.clone(),
    })
}

/// Verify provided digests over raw file bytes. `Ok(())` when none were given.
pub fn verify_digests(resolved: &ResolvedManifest) -> Result<(), ManifestError> {
    let Some(d) = &resolved.digests else { return Ok(()) };

    fn check_one(path: &Path, expect_hex: &str, label: &'static str) -> Result<(), ManifestError> {
        let got = sha256_file(path).map_err(|e| ManifestError::Io(label, e.to_string()))?;
        if got != expect_hex {
            return Err(ManifestError::DigestMismatch(label, format!("expected={expect_hex} got={got}")));
        }
        Ok(())
    }

    if let Some(hex) = &d.priors_path {
        check_one(&resolved.priors_path, hex, "priors_path")?;
    }
    match (&resolved.observations_path, &d.observations_path) {
        (Some(p), Some(hex)) => check_one(p, hex, "observations_path")?,
        (None, Some(_)) => return Err(ManifestError::DigestForMissing("observations_path")),
        _ => {}
    }
    match (&resolved.params_path, &d.params_path) {
        (Some(p), Some(hex)) => check_one(p, hex, "params_path")?,
        (None, Some(_)) => return Err(ManifestError::DigestForMissing("params_path")),
        _ => {}
    }
    Ok(())
}

// ---------- top-level load/verify ----------

const MAX_MANIFEST_BYTES: u64 = 4 * 1024 * 1024;

/// Load, validate and resolve a manifest. Does not verify digests.
pub fn load_and_resolve_manifest(manifest_path: &Path) -> Result<ResolvedManifest, ManifestError> {
    let f = fs::File::open(manifest_path)
        .map_err(|e| ManifestError::Io("read", format!("{} ({e})", manifest_path.display())))?;
    let mut buf = Vec::new();
    f.take(MAX_MANIFEST_BYTES)
        .read_to_end(&mut buf)
        .map_err(|e| ManifestError::Io("read", format!("{} ({e})", manifest_path.display())))?;

    let man: Manifest = serde_json::from_slice(&buf)
        .map_err(|e| ManifestError::Parse(format!("{} ({e})", manifest_path.display())))?;

    validate_manifest(&man)?;

    let base = manifest_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    resolve_paths(&base, &man)
}

/// Load + resolve + verify digests.
pub fn load_verify_manifest(manifest_path: &Path) -> Result<ResolvedManifest, ManifestError> {
    let resolved = load_and_resolve_manifest(manifest_path)?;
    verify_digests(&resolved)?;
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::sha256_hex;

    fn manifest(priors: &str) -> Manifest {
        Manifest {
            id: None,
            priors_path: priors.into(),
            observations_path: None,
            params_path: None,
            params: None,
            inputs_sha256: None,
        }
    }

    #[test]
    fn rejects_urls_and_empty_paths() {
        assert!(matches!(
            validate_manifest(&manifest("https://example.org/p.csv")),
            Err(ManifestError::UrlPath("priors_path", _))
        ));
        assert!(matches!(validate_manifest(&manifest(" ")), Err(ManifestError::Empty(_))));
    }

    #[test]
    fn params_path_and_inline_params_conflict() {
        let mut m = manifest("p.csv");
        m.params_path = Some("params.json".into());
        m.params = Some(Params::new(1.0));
        assert!(matches!(validate_manifest(&m), Err(ManifestError::ParamsConflict)));
    }

    #[test]
    fn digest_for_absent_input_is_rejected() {
        let mut m = manifest("p.csv");
        m.inputs_sha256 = Some(InputDigests {
            observations_path: Some(sha256_hex(b"x")),
            ..InputDigests::default()
        });
        assert!(matches!(validate_manifest(&m), Err(ManifestError::DigestForMissing(_))));
    }

    #[test]
    fn resolves_relative_to_manifest_dir_and_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let priors = b"unit_id,area,probability,sweep_width\nA,100,0.5,10\n";
        fs::write(dir.path().join("priors.csv"), priors).unwrap();
        fs::write(dir.path().join("params.json"), r#"{"total_effort": 50}"#).unwrap();
        let man = serde_json::json!({
            "id": "cycle-3",
            "priors_path": "priors.csv",
            "params_path": "params.json",
            "inputs_sha256": { "priors_path": sha256_hex(priors) }
        });
        let mpath = dir.path().join("manifest.json");
        fs::write(&mpath, man.to_string()).unwrap();

        let r = load_verify_manifest(&mpath).unwrap();
        assert_eq!(r.priors_path, dir.path().join("priors.csv"));
        assert_eq!(r.params, Some(Params::new(50.0)));
        assert_eq!(r.id.as_deref(), Some("cycle-3"));
    }

    #[test]
    fn digest_mismatch_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("priors.csv"), "unit_id\nA\n").unwrap();
        let man = serde_json::json!({
            "priors_path": "priors.csv",
            "params": { "total_effort": 5 },
            "inputs_sha256": { "priors_path": sha256_hex(b"other") }
        });
        let mpath = dir.path().join("manifest.json");
        fs::write(&mpath, man.to_string()).unwrap();
        assert!(matches!(
            load_verify_manifest(&mpath),
            Err(ManifestError::DigestMismatch("priors_path", _))
        ));
    }

    #[test]
    fn missing_input_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let m = manifest("nope.csv");
        assert!(matches!(resolve_paths(dir.path(), &m), Err(ManifestError::Io("priors_path", _))));
    }
}
