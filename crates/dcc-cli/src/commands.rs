use anyhow::{Context, Result};
use tracing::info_span;

use dcc_cli::pipeline::{self, OrderEntry, ProjectResult, ValidateOptions};
use dcc_core::SchedulerConfig;
use dcc_ingest::LineNumbering;
use dcc_model::TieBreak;
use dcc_validate::PreviousReleaseOracle;

use crate::cli::{OrderArgs, ReleaseArgs, TieBreakArg, ValidateArgs};
use crate::types::ValidateResult;

pub fn run_validate(args: &ValidateArgs) -> Result<ValidateResult> {
    let span = info_span!("validate", submission = %args.submission_dir.display());
    let _guard = span.enter();

    let dictionary = pipeline::load_dictionary(&args.dictionary)?;
    let oracle = args
        .previous
        .as_deref()
        .map(|dir| pipeline::load_previous(&dictionary, dir))
        .transpose()?;
    let options = ValidateOptions {
        tie_break: match args.tie_break {
            TieBreakArg::UniquenessFirst => TieBreak::UniquenessFirst,
            TieBreakArg::RelationFirst => TieBreak::RelationFirst,
        },
        numbering: if args.physical_lines {
            LineNumbering::Physical
        } else {
            LineNumbering::DataRow
        },
    };
    let report = pipeline::validate_submission(
        &dictionary,
        &args.submission_dir,
        options,
        oracle.as_ref().map(|oracle| oracle as &dyn PreviousReleaseOracle),
    )?;
    let output_dir = args.output.as_deref().unwrap_or(&args.submission_dir);
    let report_path = pipeline::write_report(&report, output_dir)?;
    let fingerprint = report.fingerprint().context("failed to fingerprint report")?;
    Ok(ValidateResult {
        report,
        report_path,
        fingerprint,
    })
}

pub fn run_order(args: &OrderArgs) -> Result<Vec<OrderEntry>> {
    let dictionary = pipeline::load_dictionary(&args.dictionary)?;
    Ok(pipeline::dependency_order(&dictionary))
}

pub fn run_release(args: &ReleaseArgs) -> Result<Vec<ProjectResult>> {
    let span = info_span!("release", release = %args.release_dir.display());
    let _guard = span.enter();

    let mut config = match &args.config {
        Some(path) => SchedulerConfig::load(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        None => SchedulerConfig::default(),
    };
    if let Some(slots) = args.slots {
        config = config.with_max_concurrent_validations(slots);
    }
    let dictionary = pipeline::load_dictionary(&args.dictionary)?;
    let oracle = args
        .previous
        .as_deref()
        .map(|dir| pipeline::load_previous(&dictionary, dir))
        .transpose()?;
    pipeline::run_release(dictionary, &args.release_dir, config, oracle)
}
