//! Row key extraction.
//!
//! [`RowKeyExtractor`] turns one tokenized row into a [`KVRow`]: the primary
//! key tuple plus one tuple per relation that applies to the row. It holds
//! no state besides the borrowed [`KeySpec`], so extraction is pure.

use dcc_dictionary::{InvalidRowError, KeySpec};
use dcc_model::{FileType, NOT_APPLICABLE_CODE};

/// A key tuple, in the referenced type's primary-key order.
pub type KeyTuple = Vec<String>;

/// Keys extracted from one data row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KVRow {
    /// `None` when the file type declares no primary key.
    pub primary_key: Option<KeyTuple>,
    /// Mandatory foreign keys in declaration order.
    pub foreign_keys: Vec<(FileType, KeyTuple)>,
    /// Optional foreign keys; present for every row.
    pub optional_keys: Vec<(FileType, KeyTuple)>,
    /// Conditional foreign keys whose condition held for this row.
    pub conditional_keys: Vec<(FileType, KeyTuple)>,
}

impl KVRow {
    pub fn foreign_key(&self, referenced: FileType) -> Option<&[String]> {
        find(&self.foreign_keys, referenced)
    }

    pub fn optional_key(&self, referenced: FileType) -> Option<&[String]> {
        find(&self.optional_keys, referenced)
    }

    pub fn conditional_key(&self, referenced: FileType) -> Option<&[String]> {
        find(&self.conditional_keys, referenced)
    }
}

fn find(keys: &[(FileType, KeyTuple)], referenced: FileType) -> Option<&[String]> {
    keys.iter()
        .find(|(file_type, _)| *file_type == referenced)
        .map(|(_, tuple)| tuple.as_slice())
}

/// An optional key is not checked when any of its values is blank or the
/// not-applicable code.
pub fn is_not_applicable(tuple: &[String]) -> bool {
    tuple
        .iter()
        .any(|value| value.is_empty() || value == NOT_APPLICABLE_CODE)
}

#[derive(Debug, Clone, Copy)]
pub struct RowKeyExtractor<'a> {
    spec: &'a KeySpec,
}

impl<'a> RowKeyExtractor<'a> {
    pub fn new(spec: &'a KeySpec) -> Self {
        Self { spec }
    }

    /// Extract the keys of `row`.
    ///
    /// The row must carry [`KeySpec::field_count`] values; conditions
    /// reject any other arity with [`InvalidRowError`].
    pub fn extract(&self, row: &[String]) -> Result<KVRow, InvalidRowError> {
        let spec = self.spec;
        let primary_key = spec
            .has_primary_key()
            .then(|| tuple(row, spec.primary_key()));
        let foreign_keys = spec
            .foreign_keys()
            .iter()
            .map(|key| (key.referenced, tuple(row, &key.indices)))
            .collect();
        let optional_keys = spec
            .optional_keys()
            .iter()
            .map(|key| (key.referenced, tuple(row, &key.indices)))
            .collect();

        let mut conditional_keys = Vec::new();
        for key in spec.conditional_keys() {
            if key.condition.evaluate(row)? {
                conditional_keys.push((key.referenced, tuple(row, &key.indices)));
            }
        }

        Ok(KVRow {
            primary_key,
            foreign_keys,
            optional_keys,
            conditional_keys,
        })
    }
}

// Indices come from the compiled spec and rows are arity-checked before
// extraction, so a short row yields blanks rather than a panic.
fn tuple(row: &[String], indices: &[usize]) -> KeyTuple {
    indices
        .iter()
        .map(|&index| row.get(index).cloned().unwrap_or_default())
        .collect()
}
