//! Command-line arguments of `dcc-keys`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "dcc-keys",
    version,
    about = "Key validation for genomic data submissions",
    long_about = "Check primary-key uniqueness, foreign-key relations and surjective\n\
                  coverage across the files of a genomic data submission."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate the keys of one submission directory.
    Validate(ValidateArgs),

    /// Print the order in which file types are validated.
    Order(OrderArgs),

    /// Validate every project directory of a release.
    Release(ReleaseArgs),
}

#[derive(Parser)]
pub struct ValidateArgs {
    /// JSON dictionary describing the file schemas.
    #[arg(long = "dictionary", short = 'd', value_name = "PATH")]
    pub dictionary: PathBuf,

    /// Directory holding the submission's files.
    #[arg(value_name = "SUBMISSION_DIR")]
    pub submission_dir: PathBuf,

    /// Files of the previous release, checked for re-submitted keys.
    #[arg(long = "previous", value_name = "DIR")]
    pub previous: Option<PathBuf>,

    /// Where to write the JSON report (default: the submission directory).
    #[arg(long = "output", value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Which violation to keep when a row breaks several constraints.
    #[arg(long = "tie-break", value_enum, default_value = "uniqueness-first")]
    pub tie_break: TieBreakArg,

    /// Report physical file lines instead of data-row numbers.
    #[arg(long = "physical-lines")]
    pub physical_lines: bool,

    /// Maximum number of errors printed (all are written to the report).
    #[arg(long = "max-errors", value_name = "N", default_value_t = 50)]
    pub max_errors: usize,
}

#[derive(Parser)]
pub struct OrderArgs {
    #[arg(long = "dictionary", short = 'd', value_name = "PATH")]
    pub dictionary: PathBuf,
}

#[derive(Parser)]
pub struct ReleaseArgs {
    #[arg(long = "dictionary", short = 'd', value_name = "PATH")]
    pub dictionary: PathBuf,

    /// Release directory with one sub-directory per project.
    #[arg(value_name = "RELEASE_DIR")]
    pub release_dir: PathBuf,

    /// Scheduler configuration (TOML).
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[arg(long = "previous", value_name = "DIR")]
    pub previous: Option<PathBuf>,

    /// Concurrent validations (overrides the configuration file).
    #[arg(long = "slots", value_name = "N")]
    pub slots: Option<usize>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum TieBreakArg {
    UniquenessFirst,
    RelationFirst,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
