// crates/sa_cli/src/args.rs
//
// Offline CLI surface for the `sa` binary.
// - No networked paths (any scheme:// is rejected, `--out` included)
// - `allocate`: --manifest XOR (--priors + (--effort | --params))
// - `update`: --manifest (with observations_path) XOR (--priors + --observations)
// - Flags given alongside a manifest override its parameters

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

/// Parsed CLI arguments (raw).
#[derive(Debug, Parser, Clone)]
#[command(
    name = "sa",
    version,
    disable_help_subcommand = true,
    about = "Offline, deterministic survey effort allocation"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Only log warnings and errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Log level when RUST_LOG is unset (error, warn, info, debug, trace).
    #[arg(long, global = true, value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: Option<String>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Allocate total transect length across survey units.
    Allocate(AllocateArgs),
    /// Join observations onto priors, compute posteriors and next-cycle priors.
    Update(UpdateArgs),
    /// Compute posteriors from an already-merged update table.
    Posterior(PosteriorArgs),
    /// Load and check inputs without computing anything.
    Validate(ValidateArgs),
}

#[derive(Debug, ClapArgs, Clone)]
pub struct AllocateArgs {
    /// Run manifest JSON (priors and parameters).
    #[arg(long, conflicts_with_all = ["priors", "params"])]
    pub manifest: Option<PathBuf>,
    /// Prior table (.csv or .json).
    #[arg(long)]
    pub priors: Option<PathBuf>,
    /// Parameter-set JSON.
    #[arg(long)]
    pub params: Option<PathBuf>,
    /// Total transect length L for this cycle.
    #[arg(long, allow_negative_numbers = true)]
    pub effort: Option<f64>,
    /// Iteration cap for the drop-and-rerun loop.
    #[arg(long)]
    pub max_iters: Option<u32>,
    /// Output directory.
    #[arg(long, default_value = ".")]
    pub out: PathBuf,
}

#[derive(Debug, ClapArgs, Clone)]
pub struct UpdateArgs {
    /// Run manifest JSON (priors and observations).
    #[arg(long, conflicts_with_all = ["priors", "observations"])]
    pub manifest: Option<PathBuf>,
    #[arg(long)]
    pub priors: Option<PathBuf>,
    /// Field observation table for this cycle.
    #[arg(long)]
    pub observations: Option<PathBuf>,
    #[arg(long, default_value = ".")]
    pub out: PathBuf,
}

#[derive(Debug, ClapArgs, Clone)]
pub struct PosteriorArgs {
    /// Merged update table (priors joined with observations).
    #[arg(long)]
    pub table: PathBuf,
    #[arg(long, default_value = ".")]
    pub out: PathBuf,
}

#[derive(Debug, ClapArgs, Clone)]
pub struct ValidateArgs {
    #[arg(long, conflicts_with_all = ["priors", "observations"])]
    pub manifest: Option<PathBuf>,
    #[arg(long)]
    pub priors: Option<PathBuf>,
    #[arg(long)]
    pub observations: Option<PathBuf>,
}

/// Errors surfaced by argument validation. Messages are short and stable.
#[derive(Debug)]
pub enum CliError {
    Missing(&'static str),
    NonLocalPath(String),
    NotFound(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use CliError::*;
        match self {
            Missing(s) => write!(f, "missing required flag: {s}"),
            NonLocalPath(p) => write!(f, "path must be local file (no scheme): {p}"),
            NotFound(p) => write!(f, "file not found: {p}"),
        }
    }
}
impl std::error::Error for CliError {}

/// Entry point used by main.rs
pub fn parse_and_validate() -> Result<Args, CliError> {
    let args = Args::parse();
    validate_args(args)
}

/// Mode and filesystem checks, then path normalization.
pub fn validate_args(mut args: Args) -> Result<Args, CliError> {
    for p in iter_all_paths(&args.command) {
        ensure_local_path(p)?;
    }

    match &mut args.command {
        Command::Allocate(a) => {
            if let Some(m) = &a.manifest {
                ensure_local_exists(m, "--manifest")?;
            } else {
                let priors = a.priors.as_ref().ok_or(CliError::Missing("--priors"))?;
                ensure_local_exists(priors, "--priors")?;
                match &a.params {
                    Some(p) => ensure_local_exists(p, "--params")?,
                    None if a.effort.is_none() => return Err(CliError::Missing("--effort")),
                    None => {}
                }
            }
            normalize_all(&mut [&mut a.manifest, &mut a.priors, &mut a.params]);
            a.out = normalize_path(&a.out);
        }
        Command::Update(u) => {
            if let Some(m) = &u.manifest {
                ensure_local_exists(m, "--manifest")?;
            } else {
                let priors = u.priors.as_ref().ok_or(CliError::Missing("--priors"))?;
                let obs = u.observations.as_ref().ok_or(CliError::Missing("--observations"))?;
                ensure_local_exists(priors, "--priors")?;
                ensure_local_exists(obs, "--observations")?;
            }
            normalize_all(&mut [&mut u.manifest, &mut u.priors, &mut u.observations]);
            u.out = normalize_path(&u.out);
        }
        Command::Posterior(p) => {
            ensure_local_exists(&p.table, "--table")?;
            p.table = normalize_path(&p.table);
            p.out = normalize_path(&p.out);
        }
        Command::Validate(v) => {
            if let Some(m) = &v.manifest {
                ensure_local_exists(m, "--manifest")?;
            } else {
                let priors = v.priors.as_ref().ok_or(CliError::Missing("--priors"))?;
                ensure_local_exists(priors, "--priors")?;
                if let Some(o) = &v.observations {
                    ensure_local_exists(o, "--observations")?;
                }
            }
            normalize_all(&mut [&mut v.manifest, &mut v.priors, &mut v.observations]);
        }
    }

    Ok(args)
}

/// Reject any explicit URI scheme (e.g., http://, https://, file://).
#[inline]
fn has_scheme(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    lower.contains("://") || lower.starts_with("http:") || lower.starts_with("https:") || lower.starts_with("file:")
}

#[inline]
fn ensure_local_path(p: &Path) -> Result<(), CliError> {
    if let Some(s) = p.to_str() {
        if has_scheme(s) {
            return Err(CliError::NonLocalPath(s.to_string()));
        }
    }
    Ok(())
}

/// Every path-like flag of a subcommand, `--out` included.
fn iter_all_paths(cmd: &Command) -> impl Iterator<Item = &Path> {
    let paths: Vec<Option<&Path>> = match cmd {
        Command::Allocate(a) => vec![
            a.manifest.as_deref(),
            a.priors.as_deref(),
            a.params.as_deref(),
            Some(a.out.as_path()),
        ],
        Command::Update(u) => vec![
            u.manifest.as_deref(),
            u.priors.as_deref(),
            u.observations.as_deref(),
            Some(u.out.as_path()),
        ],
        Command::Posterior(p) => vec![Some(p.table.as_path()), Some(p.out.as_path())],
        Command::Validate(v) => vec![v.manifest.as_deref(), v.priors.as_deref(), v.observations.as_deref()],
    };
    paths.into_iter().flatten()
}

/// Ensure a path is local and exists as a regular file.
fn ensure_local_exists(p: &Path, label: &'static str) -> Result<(), CliError> {
    ensure_local_path(p)?;
    let meta = fs::metadata(p).map_err(|_| CliError::NotFound(format!("{label} {}", p.display())))?;
    if !meta.is_file() {
        return Err(CliError::NotFound(format!("{label} {}", p.display())));
    }
    Ok(())
}

fn normalize_all(paths: &mut [&mut Option<PathBuf>]) {
    for p in paths.iter_mut() {
        **p = p.take().map(|x| normalize_path(&x));
    }
}

/// Best-effort absolute path; falls back to CWD-relative when the path does not exist yet.
fn normalize_path(p: &Path) -> PathBuf {
    fs::canonicalize(p).unwrap_or_else(|_| {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join(p)
        }
    })
}
