//! Pipelines behind the `dcc-keys` subcommands.
//!
//! These functions are plain library calls so they can be driven from
//! integration tests without spawning the binary.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use dcc_core::{
    SchedulerConfig, TaskId, TaskOutcome, ValidationScheduler, ValidationTask,
};
use dcc_dictionary::{CompiledDictionary, load_compiled_dictionary};
use dcc_ingest::{DirectoryRowSource, LineNumbering};
use dcc_model::{SubmissionState, TieBreak};
use dcc_validate::{
    InMemoryOracle, KeyValidationReport, PreviousReleaseOracle, REPORT_FILE_NAME,
    ReferentialValidator,
};

/// Options for validating a single submission directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateOptions {
    pub tie_break: TieBreak,
    pub numbering: LineNumbering,
}

/// One line of `dcc-keys order`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderEntry {
    pub position: usize,
    pub name: String,
    pub primary_key: Vec<String>,
    pub parents: Vec<String>,
    /// Child types that must reference every tuple of this type.
    pub surjective_children: Vec<String>,
}

/// Outcome of one project of a release.
#[derive(Debug, Clone)]
pub struct ProjectResult {
    pub project: String,
    pub state: SubmissionState,
    pub errors: usize,
    pub message: Option<String>,
    pub report_path: Option<PathBuf>,
}

impl ProjectResult {
    fn from_outcome(outcome: &TaskOutcome, report_path: Option<PathBuf>) -> Self {
        Self {
            project: outcome.id.project.clone(),
            state: outcome.state,
            errors: outcome
                .key_report
                .as_ref()
                .map_or(0, KeyValidationReport::error_count),
            message: outcome.error.clone(),
            report_path,
        }
    }

    fn failed(project: &str, message: String) -> Self {
        Self {
            project: project.to_string(),
            state: SubmissionState::Error,
            errors: 0,
            message: Some(message),
            report_path: None,
        }
    }
}

pub fn load_dictionary(path: &Path) -> Result<CompiledDictionary> {
    load_compiled_dictionary(path)
        .with_context(|| format!("failed to load dictionary {}", path.display()))
}

/// Collect the primary keys of a previously accepted release.
pub fn load_previous(dictionary: &CompiledDictionary, dir: &Path) -> Result<InMemoryOracle> {
    let source = DirectoryRowSource::discover(dir, dictionary)
        .with_context(|| format!("failed to scan previous release {}", dir.display()))?;
    InMemoryOracle::collect(dictionary, &source)
        .with_context(|| format!("failed to read previous release {}", dir.display()))
}

pub fn validate_submission(
    dictionary: &CompiledDictionary,
    submission_dir: &Path,
    options: ValidateOptions,
    oracle: Option<&dyn PreviousReleaseOracle>,
) -> Result<KeyValidationReport> {
    let source = DirectoryRowSource::discover(submission_dir, dictionary)
        .with_context(|| format!("failed to scan submission {}", submission_dir.display()))?
        .with_line_numbering(options.numbering);
    let mut validator = ReferentialValidator::new(dictionary).with_tie_break(options.tie_break);
    if let Some(oracle) = oracle {
        validator = validator.with_oracle(oracle);
    }
    validator
        .validate(&source)
        .with_context(|| format!("key validation of {} failed", submission_dir.display()))
}

/// Write the report as JSON into `output_dir`, returning the file path.
pub fn write_report(report: &KeyValidationReport, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;
    let path = output_dir.join(REPORT_FILE_NAME);
    let json = report.to_json().context("failed to serialize key report")?;
    std::fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), errors = report.error_count(), "wrote key report");
    Ok(path)
}

/// Compiled processing order with each type's keys and relations.
pub fn dependency_order(dictionary: &CompiledDictionary) -> Vec<OrderEntry> {
    let graph = dictionary.graph();
    dictionary
        .topological_order()
        .iter()
        .enumerate()
        .map(|(position, &file_type)| OrderEntry {
            position: position + 1,
            name: dictionary.name(file_type).to_string(),
            primary_key: dictionary.primary_key_names(file_type),
            parents: dictionary
                .parents(file_type)
                .into_iter()
                .map(|parent| dictionary.name(parent).to_string())
                .collect(),
            surjective_children: graph
                .surjective_children(file_type)
                .into_iter()
                .map(|child| dictionary.name(child).to_string())
                .collect(),
        })
        .collect()
}

/// Project sub-directories of a release, sorted by name. Hidden entries are
/// skipped.
pub fn project_dirs(release_dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(release_dir)
        .with_context(|| format!("failed to read release {}", release_dir.display()))?;
    let mut projects = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("failed to read release {}", release_dir.display()))?
            .path();
        let hidden = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with('.'));
        if path.is_dir() && !hidden {
            projects.push(path);
        }
    }
    projects.sort();
    Ok(projects)
}

/// Validate every project of a release through the scheduler.
///
/// Projects whose files cannot be discovered are reported as errors without
/// being scheduled. Reports of projects that completed key validation are
/// written into their own directory.
pub fn run_release(
    dictionary: CompiledDictionary,
    release_dir: &Path,
    config: SchedulerConfig,
    oracle: Option<InMemoryOracle>,
) -> Result<Vec<ProjectResult>> {
    let release = release_dir
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("release")
        .to_string();
    let dictionary = Arc::new(dictionary);
    let mut builder = ValidationScheduler::builder(config, Arc::clone(&dictionary));
    if let Some(oracle) = oracle {
        builder = builder.with_oracle(Arc::new(oracle));
    }
    let scheduler = builder.start().context("failed to start validation scheduler")?;

    let mut results = Vec::new();
    let mut handles = Vec::new();
    for project_dir in project_dirs(release_dir)? {
        let project = project_dir
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();
        match DirectoryRowSource::discover(&project_dir, &dictionary) {
            Ok(source) => {
                let files = source.file_count();
                info!(%project, files, "queueing project");
                let task = ValidationTask::new(TaskId::new(&release, &project), source);
                let handle = scheduler
                    .submit(task)
                    .with_context(|| format!("failed to submit project {project}"))?;
                handles.push((project_dir, handle));
            }
            Err(error) => {
                warn!(%project, %error, "cannot discover project files");
                results.push(ProjectResult::failed(&project, error.to_string()));
            }
        }
    }

    for (project_dir, handle) in handles {
        let outcome = handle.wait().context("validation worker stopped unexpectedly")?;
        let report_path = match &outcome.key_report {
            Some(report) => Some(write_report(report, &project_dir)?),
            None => None,
        };
        results.push(ProjectResult::from_outcome(&outcome, report_path));
    }
    scheduler.shutdown();

    results.sort_by(|a, b| a.project.cmp(&b.project));
    Ok(results)
}
