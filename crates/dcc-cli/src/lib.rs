//! Library side of the `dcc-keys` binary: logging setup and the pipelines
//! behind each subcommand.

pub mod logging;
pub mod pipeline;
