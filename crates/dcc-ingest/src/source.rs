//! Row-source abstraction.
//!
//! The key validator never touches the filesystem. It asks a [`RowSource`]
//! which physical files (shards) exist for a file type and pulls tokenized
//! data rows from each through a [`RowStream`]. Header lines are consumed by
//! the stream before the first data row is returned.

use std::collections::BTreeMap;

use dcc_model::FileType;

use crate::error::{IngestError, Result};
use crate::tsv::{LineNumbering, TsvRowStream};

/// One tokenized data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRow {
    /// Line number reported in errors, as assigned by the stream's
    /// [`LineNumbering`].
    pub line: i64,
    pub values: Vec<String>,
}

/// A stream of data rows from one physical file.
pub trait RowStream {
    /// Name attached to errors reported against this file.
    fn file_name(&self) -> &str;

    /// Next data row, `None` once the file is exhausted.
    fn next_row(&mut self) -> Option<Result<DataRow>>;
}

/// Provider of row streams for every file type of one submission.
pub trait RowSource {
    /// Names of the physical files holding `file_type`, in processing order.
    /// Empty when the submission contains no such file.
    fn files(&self, file_type: FileType) -> Vec<String>;

    /// Open one of the files listed by [`RowSource::files`].
    fn open(&self, file_type: FileType, file_name: &str) -> Result<Box<dyn RowStream + '_>>;
}

/// In-memory rows, for embedding callers that tokenize on their own.
#[derive(Debug, Clone, Default)]
pub struct MemoryRowSource {
    files: BTreeMap<FileType, Vec<MemoryFile>>,
}

#[derive(Debug, Clone)]
struct MemoryFile {
    name: String,
    rows: Vec<DataRow>,
}

impl MemoryRowSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file of data rows (header already removed). Rows are numbered
    /// from 1.
    pub fn add_rows<I, R, S>(&mut self, file_type: FileType, file_name: impl Into<String>, rows: I)
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(index, values)| DataRow {
                line: index as i64 + 1,
                values: values.into_iter().map(Into::into).collect(),
            })
            .collect();
        self.push(file_type, file_name.into(), rows);
    }

    #[must_use]
    pub fn with_rows<I, R, S>(mut self, file_type: FileType, file_name: impl Into<String>, rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_rows(file_type, file_name, rows);
        self
    }

    /// Add a file from tab-separated text whose first line is a header.
    pub fn add_tsv(&mut self, file_type: FileType, file_name: impl Into<String>, text: &str) -> Result<()> {
        let file_name = file_name.into();
        let mut stream =
            TsvRowStream::from_reader(file_name.clone(), text.as_bytes(), LineNumbering::DataRow)?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next_row() {
            rows.push(row?);
        }
        self.push(file_type, file_name, rows);
        Ok(())
    }

    fn push(&mut self, file_type: FileType, name: String, rows: Vec<DataRow>) {
        self.files
            .entry(file_type)
            .or_default()
            .push(MemoryFile { name, rows });
    }
}

impl RowSource for MemoryRowSource {
    fn files(&self, file_type: FileType) -> Vec<String> {
        self.files
            .get(&file_type)
            .map(|files| files.iter().map(|file| file.name.clone()).collect())
            .unwrap_or_default()
    }

    fn open(&self, file_type: FileType, file_name: &str) -> Result<Box<dyn RowStream + '_>> {
        let file = self
            .files
            .get(&file_type)
            .and_then(|files| files.iter().find(|file| file.name == file_name))
            .ok_or_else(|| IngestError::UnknownFile {
                file_type: file_type.to_string(),
                file_name: file_name.to_string(),
            })?;
        Ok(Box::new(MemoryRowStream {
            name: &file.name,
            rows: file.rows.iter(),
        }))
    }
}

struct MemoryRowStream<'a> {
    name: &'a str,
    rows: std::slice::Iter<'a, DataRow>,
}

impl RowStream for MemoryRowStream<'_> {
    fn file_name(&self) -> &str {
        self.name
    }

    fn next_row(&mut self) -> Option<Result<DataRow>> {
        self.rows.next().cloned().map(Ok)
    }
}
