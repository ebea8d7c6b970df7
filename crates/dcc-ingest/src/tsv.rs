//! Tab-separated row streams.
//!
//! Submission files are plain tab-separated text with a header line. Rows
//! are returned as-is, including rows whose field count disagrees with the
//! header; judging the arity is left to the validator, which knows the
//! dictionary. A blank line between rows comes back as a row with no
//! values, so it is judged like any other short row.
//!
//! Lines end with `\n`; a trailing `\r` is dropped from the last field.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::ops::Range;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Terminator};
use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};
use crate::source::{DataRow, RowStream};

/// How data rows are numbered in reported errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineNumbering {
    /// 1-based line count after the header; blank lines are counted.
    #[default]
    DataRow,
    /// Physical line in the file as seen by the reader, header being line 1.
    Physical,
}

/// A [`RowStream`] over tab-separated text.
pub struct TsvRowStream<R> {
    file_name: String,
    reader: csv::Reader<LineEnds<R>>,
    header: Vec<String>,
    record: StringRecord,
    numbering: LineNumbering,
    /// Physical line of the header.
    header_line: u64,
    /// Physical line of the last record read.
    last_line: u64,
    /// Blank lines the reader skipped before the held record.
    blank_lines: Range<u64>,
    /// `record` was read but not yet returned.
    held: bool,
}

/// Remembers how the input ends, so the line of a record that runs into
/// end of input without a newline can be told apart from one ending in
/// `\n`.
struct LineEnds<R> {
    inner: R,
    bytes: u64,
    last: Option<u8>,
    exhausted: bool,
}

impl<R: Read> Read for LineEnds<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        if read == 0 {
            self.exhausted = !buf.is_empty();
        } else {
            self.bytes += read as u64;
            self.last = Some(buf[read - 1]);
        }
        Ok(read)
    }
}

impl TsvRowStream<BufReader<File>> {
    /// Open a file and consume its header line.
    pub fn open(path: &Path, numbering: LineNumbering) -> Result<Self> {
        let file = File::open(path).map_err(|source| IngestError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map_or_else(|| path.display().to_string(), str::to_string);
        Self::from_reader(file_name, BufReader::new(file), numbering)
    }
}

impl<R: Read> TsvRowStream<R> {
    /// Wrap a reader and consume its header line.
    pub fn from_reader(file_name: impl Into<String>, reader: R, numbering: LineNumbering) -> Result<Self> {
        let file_name = file_name.into();
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .terminator(Terminator::Any(b'\n'))
            .has_headers(true)
            .flexible(true)
            .quoting(false)
            .from_reader(LineEnds {
                inner: reader,
                bytes: 0,
                last: None,
                exhausted: false,
            });
        let header = fields(reader.headers().map_err(|source| IngestError::Csv {
            file: file_name.clone(),
            source,
        })?);
        let header_line = line_of_last_record(&reader).max(1);
        Ok(Self {
            file_name,
            reader,
            header,
            record: StringRecord::new(),
            numbering,
            header_line,
            last_line: header_line,
            blank_lines: 0..0,
            held: false,
        })
    }

    /// Field names from the header line.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    fn line_number(&self, line: u64) -> i64 {
        match self.numbering {
            LineNumbering::DataRow => (line - self.header_line) as i64,
            LineNumbering::Physical => line as i64,
        }
    }

    fn held_row(&mut self) -> DataRow {
        self.held = false;
        let values = fields(&self.record);
        DataRow {
            line: self.line_number(self.last_line),
            values: if values.len() == 1 && values[0].is_empty() {
                Vec::new()
            } else {
                values
            },
        }
    }
}

/// Physical line of the record the reader returned last.
fn line_of_last_record<R: Read>(reader: &csv::Reader<LineEnds<R>>) -> u64 {
    let position = reader.position();
    let input = reader.get_ref();
    let unterminated =
        input.exhausted && input.bytes == position.byte() && input.last != Some(b'\n');
    if unterminated {
        position.line()
    } else {
        position.line().saturating_sub(1)
    }
}

fn fields(record: &StringRecord) -> Vec<String> {
    let mut values: Vec<String> = record.iter().map(str::to_string).collect();
    if let Some(last) = values.last_mut()
        && last.ends_with('\r')
    {
        last.pop();
    }
    values
}

impl<R: Read> RowStream for TsvRowStream<R> {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn next_row(&mut self) -> Option<Result<DataRow>> {
        if let Some(line) = self.blank_lines.next() {
            return Some(Ok(DataRow {
                line: self.line_number(line),
                values: Vec::new(),
            }));
        }
        if self.held {
            return Some(Ok(self.held_row()));
        }
        match self.reader.read_record(&mut self.record) {
            Ok(true) => {
                let line = line_of_last_record(&self.reader).max(self.last_line + 1);
                self.blank_lines = self.last_line + 1..line;
                self.last_line = line;
                self.held = true;
                self.next_row()
            }
            Ok(false) => None,
            Err(source) => Some(Err(IngestError::Csv {
                file: self.file_name.clone(),
                source,
            })),
        }
    }
}
