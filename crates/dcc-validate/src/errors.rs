//! Constraint-violation bookkeeping.
//!
//! Violations are recorded against a file type as `(kind, values)` pairs
//! keyed by shard and line, and only resolved to field names when the run
//! is described. Each file type carries a table of the error kinds it may
//! report, built from the compiled dictionary up front; reporting anything
//! else is a defect in the validator and fails the run.

use std::collections::BTreeMap;
use std::sync::Arc;

use dcc_dictionary::CompiledDictionary;
use dcc_model::{
    ErrorParams, ErrorRecord, FileType, KeyErrorKind, SURJECTION_LINE_NUMBER, TieBreak,
};

use crate::error::{KeyValidationError, Result};

/// One violation before name resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KVRowError {
    pub kind: KeyErrorKind,
    /// Referenced parent for relation kinds, referencing child for
    /// surjection, `None` for uniqueness.
    pub related: Option<FileType>,
    pub values: Vec<String>,
}

impl KVRowError {
    pub fn new(kind: KeyErrorKind, related: Option<FileType>, values: Vec<String>) -> Self {
        Self {
            kind,
            related,
            values,
        }
    }

    fn outranks(&self, existing: &Self, tie_break: TieBreak) -> bool {
        match tie_break {
            TieBreak::UniquenessFirst => self.kind.is_uniqueness() && !existing.kind.is_uniqueness(),
            TieBreak::RelationFirst => !self.kind.is_uniqueness() && existing.kind.is_uniqueness(),
        }
    }
}

type ErrorSlot = (KeyErrorKind, Option<FileType>);

/// Violations of one file type.
#[derive(Debug, Clone)]
pub struct KVFileErrors {
    file_type: FileType,
    /// Every file type name of the dictionary, by index.
    names: Arc<[String]>,
    tie_break: TieBreak,
    field_indices: BTreeMap<ErrorSlot, Vec<usize>>,
    files: Vec<String>,
    rows: BTreeMap<(usize, i64), KVRowError>,
    surjections: BTreeMap<usize, Vec<KVRowError>>,
}

impl KVFileErrors {
    pub fn new(
        dictionary: &CompiledDictionary,
        file_type: FileType,
        tie_break: TieBreak,
    ) -> Result<Self> {
        Self::with_names(dictionary, file_type, tie_break, type_names(dictionary))
    }

    fn with_names(
        dictionary: &CompiledDictionary,
        file_type: FileType,
        tie_break: TieBreak,
        names: Arc<[String]>,
    ) -> Result<Self> {
        let mut field_indices = BTreeMap::new();
        for (kind, related) in dictionary.registered_errors(file_type) {
            let indices = dictionary.error_field_indices(file_type, kind, related)?;
            field_indices.insert((kind, related), indices);
        }
        Ok(Self {
            file_type,
            names,
            tie_break,
            field_indices,
            files: Vec::new(),
            rows: BTreeMap::new(),
            surjections: BTreeMap::new(),
        })
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    /// Shard index for a physical file, registering it on first use.
    pub fn register_file(&mut self, file_name: &str) -> usize {
        if let Some(shard) = self.files.iter().position(|name| name == file_name) {
            return shard;
        }
        self.files.push(file_name.to_string());
        self.files.len() - 1
    }

    pub fn file_name(&self, shard: usize) -> Option<&str> {
        self.files.get(shard).map(String::as_str)
    }

    pub fn field_indices(&self, kind: KeyErrorKind, related: Option<FileType>) -> Option<&[usize]> {
        self.field_indices.get(&(kind, related)).map(Vec::as_slice)
    }

    pub fn is_registered(&self, kind: KeyErrorKind, related: Option<FileType>) -> bool {
        self.field_indices.contains_key(&(kind, related))
    }

    /// Record a violation at `line` of `shard`.
    ///
    /// A line keeps a single violation. When one is already recorded, the
    /// new one replaces it only if the tie-break ranks it higher; otherwise
    /// the first one stays. Surjection violations have no line and all
    /// accumulate under [`SURJECTION_LINE_NUMBER`].
    ///
    /// Returns whether the violation was kept.
    pub fn report(&mut self, shard: usize, line: i64, error: KVRowError) -> Result<bool> {
        if !self.is_registered(error.kind, error.related) {
            return Err(self.unregistered(&error));
        }
        if error.kind == KeyErrorKind::Surjection {
            self.surjections.entry(shard).or_default().push(error);
            return Ok(true);
        }
        match self.rows.get_mut(&(shard, line)) {
            None => {
                self.rows.insert((shard, line), error);
                Ok(true)
            }
            Some(existing) if error.outranks(existing, self.tie_break) => {
                *existing = error;
                Ok(true)
            }
            Some(_) => Ok(false),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len() + self.surjections.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Recorded violations of `kind`.
    pub fn count(&self, kind: KeyErrorKind) -> usize {
        if kind == KeyErrorKind::Surjection {
            return self.surjections.values().map(Vec::len).sum();
        }
        self.rows.values().filter(|error| error.kind == kind).count()
    }

    /// Resolve every violation to an [`ErrorRecord`], appending to `out`.
    ///
    /// Shards are described in registration order. Within a shard,
    /// surjection records come first, then row violations by line.
    /// Returns whether the file type is free of violations.
    pub fn describe(
        &self,
        dictionary: &CompiledDictionary,
        out: &mut Vec<ErrorRecord>,
    ) -> Result<bool> {
        let fallback = dictionary.name(self.file_type);
        for shard in 0..self.files.len().max(self.last_surjection_shard()) {
            let file_name = self.file_name(shard).unwrap_or(fallback);
            if let Some(errors) = self.surjections.get(&shard) {
                for error in errors {
                    out.push(self.resolve(dictionary, file_name, SURJECTION_LINE_NUMBER, error)?);
                }
            }
            for ((_, line), error) in self.rows.range((shard, i64::MIN)..=(shard, i64::MAX)) {
                out.push(self.resolve(dictionary, file_name, *line, error)?);
            }
        }
        Ok(self.is_empty())
    }

    fn last_surjection_shard(&self) -> usize {
        self.surjections
            .keys()
            .next_back()
            .map_or(0, |shard| shard + 1)
    }

    fn name(&self, file_type: FileType) -> &str {
        self.names
            .get(file_type.index())
            .map_or("?", String::as_str)
    }

    fn unregistered(&self, error: &KVRowError) -> KeyValidationError {
        KeyValidationError::UnregisteredError {
            file_type: self.name(self.file_type).to_string(),
            kind: error.kind,
            related: error
                .related
                .map_or_else(|| "-".to_string(), |related| self.name(related).to_string()),
        }
    }

    fn resolve(
        &self,
        dictionary: &CompiledDictionary,
        file_name: &str,
        line_number: i64,
        error: &KVRowError,
    ) -> Result<ErrorRecord> {
        let indices = self
            .field_indices(error.kind, error.related)
            .ok_or_else(|| self.unregistered(error))?;
        let names = dictionary.field_names(self.file_type);
        let field_names = indices.iter().map(|&index| names[index].clone()).collect();

        let params = match error.related {
            None => ErrorParams::default(),
            Some(child) if error.kind == KeyErrorKind::Surjection => {
                let child_fields = dictionary.field_names(child);
                ErrorParams {
                    other_schema: Some(dictionary.name(child).to_string()),
                    other_fields: dictionary
                        .key_spec(child)
                        .foreign_key(self.file_type)
                        .map(|key| {
                            key.indices
                                .iter()
                                .map(|&index| child_fields[index].clone())
                                .collect()
                        })
                        .unwrap_or_default(),
                }
            }
            Some(parent) => ErrorParams {
                other_schema: Some(dictionary.name(parent).to_string()),
                other_fields: dictionary.primary_key_names(parent),
            },
        };

        Ok(ErrorRecord {
            file_name: file_name.to_string(),
            line_number,
            error_type: error.kind.error_type(),
            kind: error.kind,
            field_names,
            value: error.values.clone(),
            params,
        })
    }
}

/// Violations of every file type of one submission.
#[derive(Debug, Clone)]
pub struct KVSubmissionErrors {
    files: Vec<KVFileErrors>,
}

impl KVSubmissionErrors {
    pub fn new(dictionary: &CompiledDictionary, tie_break: TieBreak) -> Result<Self> {
        let names = type_names(dictionary);
        let files = dictionary
            .file_types()
            .map(|file_type| {
                KVFileErrors::with_names(dictionary, file_type, tie_break, Arc::clone(&names))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { files })
    }

    pub fn file(&self, file_type: FileType) -> &KVFileErrors {
        &self.files[file_type.index()]
    }

    pub fn file_mut(&mut self, file_type: FileType) -> &mut KVFileErrors {
        &mut self.files[file_type.index()]
    }

    pub fn len(&self) -> usize {
        self.files.iter().map(KVFileErrors::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.files.iter().all(KVFileErrors::is_empty)
    }

    /// Describe every file type in dependency order.
    ///
    /// Returns the overall verdict and the ordered error records.
    pub fn describe(&self, dictionary: &CompiledDictionary) -> Result<(bool, Vec<ErrorRecord>)> {
        let mut records = Vec::with_capacity(self.len());
        let mut valid = true;
        for &file_type in dictionary.topological_order() {
            valid &= self.file(file_type).describe(dictionary, &mut records)?;
        }
        Ok((valid, records))
    }
}

fn type_names(dictionary: &CompiledDictionary) -> Arc<[String]> {
    dictionary
        .file_types()
        .map(|file_type| dictionary.name(file_type).to_string())
        .collect()
}
