//! Submission file discovery.
//!
//! Each file type claims the files whose names match its dictionary
//! pattern. Types without a pattern claim `<name>.txt`, `<name>.tsv` and
//! sharded variants such as `<name>.part1.txt`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, info};

use dcc_dictionary::CompiledDictionary;
use dcc_model::FileType;

use crate::error::{IngestError, Result};
use crate::source::{RowSource, RowStream};
use crate::tsv::{LineNumbering, TsvRowStream};

/// Lists all regular files in a directory, sorted by file name.
///
/// Hidden files (leading `.`) are skipped.
pub fn list_data_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(IngestError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| IngestError::DirectoryRead {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut files = Vec::new();
    for entry_result in entries {
        let entry = entry_result.map_err(|e| IngestError::DirectoryRead {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let hidden = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with('.'));
        if !hidden {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Pattern used for a file type without an explicit one.
pub fn default_pattern(file_type_name: &str) -> String {
    format!(
        r"^{}(\.[A-Za-z0-9_-]+)*\.(txt|tsv)$",
        regex::escape(file_type_name)
    )
}

/// Files of one submission directory, grouped by file type.
#[derive(Debug, Clone)]
pub struct DirectoryRowSource {
    root: PathBuf,
    files: BTreeMap<FileType, Vec<PathBuf>>,
    numbering: LineNumbering,
}

impl DirectoryRowSource {
    /// Match every file under `root` against the dictionary's patterns.
    ///
    /// Files matching no type are ignored; a file matching two types is an
    /// error.
    pub fn discover(root: &Path, dictionary: &CompiledDictionary) -> Result<Self> {
        let patterns = dictionary
            .file_types()
            .map(|file_type| {
                let name = dictionary.name(file_type);
                let pattern = dictionary
                    .pattern(file_type)
                    .map_or_else(|| default_pattern(name), str::to_string);
                Regex::new(&pattern)
                    .map(|regex| (file_type, regex))
                    .map_err(|source| IngestError::Pattern {
                        file_type: name.to_string(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut files: BTreeMap<FileType, Vec<PathBuf>> = BTreeMap::new();
        for path in list_data_files(root)? {
            let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            let mut matched: Option<FileType> = None;
            for (file_type, regex) in &patterns {
                if !regex.is_match(file_name) {
                    continue;
                }
                if let Some(first) = matched {
                    return Err(IngestError::AmbiguousFile {
                        file_name: file_name.to_string(),
                        first: dictionary.name(first).to_string(),
                        second: dictionary.name(*file_type).to_string(),
                    });
                }
                matched = Some(*file_type);
            }
            match matched {
                Some(file_type) => {
                    debug!(file = file_name, file_type = dictionary.name(file_type), "matched file");
                    files.entry(file_type).or_default().push(path.clone());
                }
                None => debug!(file = file_name, "ignoring file matching no file type"),
            }
        }

        info!(
            root = %root.display(),
            file_types = files.len(),
            files = files.values().map(Vec::len).sum::<usize>(),
            "discovered submission files"
        );
        Ok(Self {
            root: root.to_path_buf(),
            files,
            numbering: LineNumbering::default(),
        })
    }

    #[must_use]
    pub fn with_line_numbering(mut self, numbering: LineNumbering) -> Self {
        self.numbering = numbering;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn paths(&self, file_type: FileType) -> &[PathBuf] {
        self.files.get(&file_type).map_or(&[][..], Vec::as_slice)
    }

    /// File types with at least one file.
    pub fn file_types(&self) -> impl Iterator<Item = FileType> + '_ {
        self.files.keys().copied()
    }

    pub fn file_count(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }
}

impl RowSource for DirectoryRowSource {
    fn files(&self, file_type: FileType) -> Vec<String> {
        self.paths(file_type)
            .iter()
            .filter_map(|path| path.file_name().and_then(|name| name.to_str()))
            .map(str::to_string)
            .collect()
    }

    fn open(&self, file_type: FileType, file_name: &str) -> Result<Box<dyn RowStream + '_>> {
        let path = self
            .paths(file_type)
            .iter()
            .find(|path| path.file_name().and_then(|name| name.to_str()) == Some(file_name))
            .ok_or_else(|| IngestError::UnknownFile {
                file_type: file_type.to_string(),
                file_name: file_name.to_string(),
            })?;
        Ok(Box::new(TsvRowStream::open(path, self.numbering)?))
    }
}
