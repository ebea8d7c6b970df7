pub mod discovery;
pub mod error;
pub mod source;
pub mod tsv;

pub use discovery::{DirectoryRowSource, default_pattern, list_data_files};
pub use error::{IngestError, Result};
pub use source::{DataRow, MemoryRowSource, RowSource, RowStream};
pub use tsv::{LineNumbering, TsvRowStream};
