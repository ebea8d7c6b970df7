//! Previous-release key lookups.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, info};

use dcc_dictionary::CompiledDictionary;
use dcc_ingest::RowSource;

use crate::error::{KeyValidationError, Result};

/// Read-only view of primary keys accepted in an earlier release.
///
/// Implementations are shared between concurrent validations and must not
/// change while any of them runs. File types are addressed by name, since
/// the earlier release may have been compiled from another dictionary
/// version.
pub trait PreviousReleaseOracle: Send + Sync {
    fn contains(&self, file_type: &str, key: &[String]) -> bool;
}

/// Primary keys held in memory, grouped by file type name.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOracle {
    keys: BTreeMap<String, HashSet<Vec<String>>>,
}

impl InMemoryOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file_type: &str, key: Vec<String>) -> bool {
        self.keys.entry(file_type.to_string()).or_default().insert(key)
    }

    #[must_use]
    pub fn with_key<I, S>(mut self, file_type: &str, key: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(file_type, key.into_iter().map(Into::into).collect());
        self
    }

    pub fn len(&self) -> usize {
        self.keys.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.values().all(HashSet::is_empty)
    }

    /// Collect the primary keys of every file type found in `source`.
    ///
    /// Rows of the wrong width are rejected like during validation.
    pub fn collect(dictionary: &CompiledDictionary, source: &dyn RowSource) -> Result<Self> {
        let mut oracle = Self::new();
        for file_type in dictionary.file_types() {
            let spec = dictionary.key_spec(file_type);
            if !spec.has_primary_key() {
                continue;
            }
            let name = dictionary.name(file_type);
            for file_name in source.files(file_type) {
                let mut stream = source
                    .open(file_type, &file_name)
                    .map_err(|source| KeyValidationError::io(name, source))?;
                while let Some(row) = stream.next_row() {
                    let row = row.map_err(|source| KeyValidationError::io(name, source))?;
                    if row.values.len() != spec.field_count() {
                        return Err(KeyValidationError::MalformedRow {
                            file: file_name.clone(),
                            line: row.line,
                            expected: spec.field_count(),
                            actual: row.values.len(),
                        });
                    }
                    let key = spec
                        .primary_key()
                        .iter()
                        .map(|&index| row.values[index].clone())
                        .collect();
                    oracle.insert(name, key);
                }
                debug!(file = %file_name, file_type = name, "collected previous keys");
            }
        }
        info!(keys = oracle.len(), "loaded previous release keys");
        Ok(oracle)
    }
}

impl PreviousReleaseOracle for InMemoryOracle {
    fn contains(&self, file_type: &str, key: &[String]) -> bool {
        self.keys
            .get(file_type)
            .is_some_and(|keys| keys.contains(key))
    }
}
