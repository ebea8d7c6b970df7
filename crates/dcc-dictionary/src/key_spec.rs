//! Per-file-type key specifications.

use std::sync::Arc;

use dcc_model::{FileType, KeyErrorKind};

use crate::condition::ConditionEvaluator;

/// Foreign-key column indices into the declaring file, aligned with the
/// referenced type's primary-key order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub referenced: FileType,
    pub indices: Vec<usize>,
}

/// A foreign key that only applies to rows satisfying `condition`.
#[derive(Debug, Clone)]
pub struct ConditionalKey {
    pub referenced: FileType,
    pub indices: Vec<usize>,
    pub condition: Arc<ConditionEvaluator>,
    /// Full field-name list the condition was compiled against.
    pub field_names: Arc<[String]>,
}

/// Key layout of one file type, derived from the dictionary.
///
/// Each relation list holds at most one entry per referenced type and keeps
/// dictionary declaration order.
#[derive(Debug, Clone, Default)]
pub struct KeySpec {
    pub(crate) field_count: usize,
    pub(crate) primary_key: Vec<usize>,
    pub(crate) foreign_keys: Vec<ForeignKey>,
    pub(crate) optional_keys: Vec<ForeignKey>,
    pub(crate) conditional_keys: Vec<ConditionalKey>,
}

impl KeySpec {
    /// Number of fields every row of this type carries.
    pub fn field_count(&self) -> usize {
        self.field_count
    }

    pub fn primary_key(&self) -> &[usize] {
        &self.primary_key
    }

    pub fn has_primary_key(&self) -> bool {
        !self.primary_key.is_empty()
    }

    /// Mandatory foreign keys in declaration order.
    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }

    pub fn optional_keys(&self) -> &[ForeignKey] {
        &self.optional_keys
    }

    pub fn conditional_keys(&self) -> &[ConditionalKey] {
        &self.conditional_keys
    }

    pub fn foreign_key(&self, referenced: FileType) -> Option<&ForeignKey> {
        self.foreign_keys
            .iter()
            .find(|key| key.referenced == referenced)
    }

    pub fn optional_key(&self, referenced: FileType) -> Option<&ForeignKey> {
        self.optional_keys
            .iter()
            .find(|key| key.referenced == referenced)
    }

    pub fn conditional_key(&self, referenced: FileType) -> Option<&ConditionalKey> {
        self.conditional_keys
            .iter()
            .find(|key| key.referenced == referenced)
    }

    /// Error kind reported when the mandatory key to `referenced` is missing:
    /// the first declared target yields `RELATION`, later ones
    /// `SECONDARY_RELATION`.
    pub fn mandatory_error_kind(&self, referenced: FileType) -> Option<KeyErrorKind> {
        let position = self
            .foreign_keys
            .iter()
            .position(|key| key.referenced == referenced)?;
        Some(if position == 0 {
            KeyErrorKind::Relation
        } else {
            KeyErrorKind::SecondaryRelation
        })
    }

    /// Every referenced type, across all relation kinds, without repeats.
    pub fn referenced_types(&self) -> Vec<FileType> {
        let mut referenced: Vec<FileType> = self
            .foreign_keys
            .iter()
            .chain(&self.optional_keys)
            .map(|key| key.referenced)
            .chain(self.conditional_keys.iter().map(|key| key.referenced))
            .collect();
        referenced.sort_unstable();
        referenced.dedup();
        referenced
    }
}
