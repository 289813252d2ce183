// crates/sa_cli/src/main.rs
//
// `sa` binary: exit codes, typed error mapping, and the four subcommands.
// Every command reads local files only and writes its artifacts atomically
// under `--out`, finishing with a canonical `run_record.json`.

mod args;
mod logging;

mod exitcodes {
    pub const OK: i32 = 0;
    pub const VALIDATION: i32 = 2;
    pub const ALL_DROPPED: i32 = 3;
    pub const IO: i32 = 4;
}

use std::collections::BTreeMap;
use std::path::Path;
use std::process::ExitCode;

use args::{parse_and_validate as parse_cli, AllocateArgs, Args, Command, PosteriorArgs, UpdateArgs, ValidateArgs};

use sa_algo::effort::AllocateError;
use sa_core::{CoreError, Params, RecordTable};
use sa_io::canonical_json::write_canonical_file;
use sa_io::hasher::sha256_file;
use sa_io::manifest::{load_verify_manifest, ManifestError, ResolvedManifest};
use sa_io::params::load_params;
use sa_io::table_io::{read_table, write_table_csv};
use sa_io::IoError;
use sa_pipeline::export::{allocation_table, dropped_table, posterior_table, priors_table};
use sa_pipeline::load::units_from_table;
use sa_pipeline::validate::validate_priors;
use sa_pipeline::{
    build_run_record, build_update_table, compute_posteriors_from_table, run_allocate, run_update,
    PipelineError, RunRecordBody,
};

/// Central error type for CLI → exit-code mapping.
#[derive(Debug)]
enum MainError {
    /// Schema, column, parse, manifest and domain failures.
    Validation(String),
    /// Every unit was dropped during allocation.
    AllDropped(String),
    /// Read/write/path failures.
    Io(String),
}

impl std::fmt::Display for MainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MainError::Validation(m) | MainError::AllDropped(m) | MainError::Io(m) => f.write_str(m),
        }
    }
}

fn main() -> ExitCode {
    let args = match parse_cli() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("sa: error: {e}");
            return ExitCode::from(exitcodes::VALIDATION as u8);
        }
    };
    logging::init_tracing(args.quiet, args.log_level.as_deref());

    let res = match &args.command {
        Command::Allocate(a) => cmd_allocate(&args, a),
        Command::Update(u) => cmd_update(&args, u),
        Command::Posterior(p) => cmd_posterior(&args, p),
        Command::Validate(v) => cmd_validate(&args, v),
    };

    let rc = match res {
        Ok(()) => exitcodes::OK,
        Err(e) => {
            eprintln!("sa: error: {e}");
            map_error(&e)
        }
    };
    ExitCode::from(rc as u8)
}

fn map_error(e: &MainError) -> i32 {
    use exitcodes::*;
    match e {
        MainError::Validation(_) => VALIDATION,
        MainError::AllDropped(_) => ALL_DROPPED,
        MainError::Io(_) => IO,
    }
}

fn map_io_err(e: IoError) -> MainError {
    match e {
        IoError::Path(m) => MainError::Io(format!("path: {m}")),
        IoError::Manifest(m) => map_manifest_err(m),
        IoError::Json { .. }
        | IoError::Csv(_)
        | IoError::UnsupportedFormat(_)
        | IoError::Schema(_)
        | IoError::Invalid(_) => MainError::Validation(e.to_string()),
    }
}

fn map_manifest_err(e: ManifestError) -> MainError {
    match e {
        ManifestError::Io(..) => MainError::Io(format!("manifest: {e}")),
        other => MainError::Validation(format!("manifest: {other}")),
    }
}

fn map_pipeline_err(e: PipelineError) -> MainError {
    match e {
        PipelineError::Io(io) => map_io_err(io),
        PipelineError::Allocate(AllocateError::AllDropped { .. }) => MainError::AllDropped(e.to_string()),
        PipelineError::MissingColumns(_)
        | PipelineError::Load(_)
        | PipelineError::Validation(_)
        | PipelineError::Allocate(AllocateError::Validation(_)) => MainError::Validation(e.to_string()),
        PipelineError::Build(m) => MainError::Io(format!("run record: {m}")),
    }
}

fn map_export_err(e: CoreError) -> MainError {
    MainError::Io(format!("export: {e}"))
}

// ---- inputs ----

/// A table read from disk plus the digest of its raw bytes.
struct Input {
    table: RecordTable,
    sha256: String,
}

fn read_input(path: &Path) -> Result<Input, MainError> {
    let sha256 = sha256_file(path).map_err(map_io_err)?;
    let table = read_table(path).map_err(map_io_err)?;
    tracing::debug!(path = %path.display(), rows = table.len(), "table loaded");
    Ok(Input { table, sha256 })
}

fn manifest(path: &Path) -> Result<ResolvedManifest, MainError> {
    load_verify_manifest(path).map_err(map_manifest_err)
}

/// Parameter file (or manifest parameters), then flag overrides.
fn resolve_params(base: Option<Params>, effort: Option<f64>, max_iters: Option<u32>) -> Result<Params, MainError> {
    let mut params = match (base, effort) {
        (Some(p), _) => p,
        (None, Some(l)) => Params::new(l),
        (None, None) => {
            return Err(MainError::Validation("total effort required (--effort or parameter set)".into()))
        }
    };
    if let Some(l) = effort {
        params.total_effort = l;
    }
    if let Some(n) = max_iters {
        params.max_iters = n;
    }
    Ok(params)
}

// ---- outputs ----

/// Write one CSV artifact under `out` and record its digest.
fn write_output(
    out: &Path,
    name: &str,
    table: &RecordTable,
    outputs: &mut BTreeMap<String, String>,
) -> Result<(), MainError> {
    let path = out.join(name);
    let sha = write_table_csv(&path, table).map_err(map_io_err)?;
    tracing::info!(file = %path.display(), rows = table.len(), "wrote");
    outputs.insert(name.to_string(), sha);
    Ok(())
}

fn write_run_record(out: &Path, body: RunRecordBody) -> Result<String, MainError> {
    let doc = build_run_record(body).map_err(map_pipeline_err)?;
    let value = doc.to_value().map_err(map_pipeline_err)?;
    write_canonical_file(&out.join("run_record.json"), &value).map_err(map_io_err)?;
    Ok(doc.id)
}

// ---- commands ----

fn cmd_allocate(args: &Args, a: &AllocateArgs) -> Result<(), MainError> {
    let mut body = RunRecordBody::new("allocate");

    let (priors_path, base) = if let Some(m) = &a.manifest {
        let r = manifest(m)?;
        body.manifest_id = r.id;
        body.inputs_sha256.insert("manifest".into(), sha256_file(m).map_err(map_io_err)?);
        if let Some(p) = &r.params_path {
            body.inputs_sha256.insert("params".into(), sha256_file(p).map_err(map_io_err)?);
        }
        (r.priors_path, r.params)
    } else {
        let priors = a.priors.clone().ok_or_else(|| MainError::Validation("--priors required".into()))?;
        let base = match &a.params {
            Some(p) => {
                body.inputs_sha256.insert("params".into(), sha256_file(p).map_err(map_io_err)?);
                Some(load_params(p).map_err(map_io_err)?)
            }
            None => None,
        };
        (priors, base)
    };
    let params = resolve_params(base, a.effort, a.max_iters)?;

    let priors = read_input(&priors_path)?;
    body.inputs_sha256.insert("priors".into(), priors.sha256.clone());

    let run = run_allocate(&priors.table, &params).map_err(map_pipeline_err)?;
    let outcome = &run.outcome;

    let mut outputs = BTreeMap::new();
    let alloc = allocation_table(&outcome.final_allocation).map_err(map_export_err)?;
    let dropped = dropped_table(&outcome.dropped_log).map_err(map_export_err)?;
    write_output(&a.out, "allocation.csv", &alloc, &mut outputs)?;
    write_output(&a.out, "dropped_units.csv", &dropped, &mut outputs)?;

    body.params = Some(params);
    body.counts.units_in = Some(run.units.len());
    body.counts.units_kept = Some(outcome.final_allocation.len());
    body.counts.units_dropped = Some(outcome.dropped_log.len());
    body.counts.passes = Some(outcome.passes());
    body.warning = outcome.warning.as_ref().map(ToString::to_string);
    body.outputs_sha256 = outputs;
    let run_id = write_run_record(&a.out, body)?;

    if !args.quiet {
        println!(
            "allocate: {} kept, {} dropped, {} pass(es), total length {:.3} ({run_id})",
            outcome.final_allocation.len(),
            outcome.dropped_log.len(),
            outcome.passes(),
            outcome.final_allocation.total_recommended_length(),
        );
    }
    Ok(())
}

fn cmd_update(args: &Args, u: &UpdateArgs) -> Result<(), MainError> {
    let mut body = RunRecordBody::new("update");
    let (priors_path, obs_path) = if let Some(m) = &u.manifest {
        let r = manifest(m)?;
        body.manifest_id = r.id;
        body.inputs_sha256.insert("manifest".into(), sha256_file(m).map_err(map_io_err)?);
        let obs = r
            .observations_path
            .ok_or_else(|| MainError::Validation("manifest: observations_path required for update".into()))?;
        (r.priors_path, obs)
    } else {
        match (&u.priors, &u.observations) {
            (Some(p), Some(o)) => (p.clone(), o.clone()),
            _ => return Err(MainError::Validation("--priors and --observations required".into())),
        }
    };

    let priors = read_input(&priors_path)?;
    let obs = read_input(&obs_path)?;
    let run = run_update(&priors.table, &obs.table).map_err(map_pipeline_err)?;

    let mut outputs = BTreeMap::new();
    let post = posterior_table(&run.posteriors).map_err(map_export_err)?;
    let next = priors_table(&run.next_priors).map_err(map_export_err)?;
    write_output(&u.out, "posterior.csv", &post, &mut outputs)?;
    write_output(&u.out, "next_priors.csv", &next, &mut outputs)?;

    let updated = run.posteriors.iter().filter(|p| p.updated).count();
    body.inputs_sha256.insert("priors".into(), priors.sha256);
    body.inputs_sha256.insert("observations".into(), obs.sha256);
    body.counts.units_in = Some(run.records.len());
    body.counts.observations = Some(obs.table.len());
    body.counts.units_updated = Some(updated);
    body.outputs_sha256 = outputs;
    let run_id = write_run_record(&u.out, body)?;

    if !args.quiet {
        println!("update: {} unit(s), {updated} updated ({run_id})", run.records.len());
    }
    Ok(())
}

fn cmd_posterior(args: &Args, p: &PosteriorArgs) -> Result<(), MainError> {
    let input = read_input(&p.table)?;
    let posteriors = compute_posteriors_from_table(&input.table).map_err(map_pipeline_err)?;

    let mut outputs = BTreeMap::new();
    let post = posterior_table(&posteriors).map_err(map_export_err)?;
    write_output(&p.out, "posterior.csv", &post, &mut outputs)?;

    let updated = posteriors.iter().filter(|r| r.updated).count();
    let mut body = RunRecordBody::new("posterior");
    body.inputs_sha256.insert("table".into(), input.sha256);
    body.counts.units_in = Some(posteriors.len());
    body.counts.units_updated = Some(updated);
    body.outputs_sha256 = outputs;
    let run_id = write_run_record(&p.out, body)?;

    if !args.quiet {
        println!("posterior: {} unit(s), {updated} updated ({run_id})", posteriors.len());
    }
    Ok(())
}

/// Load + check only; nothing is written.
fn cmd_validate(args: &Args, v: &ValidateArgs) -> Result<(), MainError> {
    let (priors_path, obs_path, params) = if let Some(m) = &v.manifest {
        let r = manifest(m)?;
        (r.priors_path, r.observations_path, r.params)
    } else {
        let priors = v.priors.clone().ok_or_else(|| MainError::Validation("--priors required".into()))?;
        (priors, v.observations.clone(), None)
    };

    let priors = read_input(&priors_path)?;
    match obs_path {
        Some(o) => {
            let obs = read_input(&o)?;
            build_update_table(&priors.table, &obs.table).map_err(map_pipeline_err)?;
        }
        None => {
            let units = units_from_table(&priors.table).map_err(map_pipeline_err)?;
            validate_priors(&units, params.as_ref()).into_result().map_err(map_pipeline_err)?;
        }
    }

    if !args.quiet {
        eprintln!("validate: inputs OK");
    }
    Ok(())
}
