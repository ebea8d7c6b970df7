//! Dictionary input types.
//!
//! A [`Dictionary`] is the read-only schema loaded once per release. It lists
//! every file schema with its ordered fields, its primary key and its
//! relations to other file schemas. Key specifications are derived from it
//! by the dictionary compiler; nothing here is pre-computed.

use serde::{Deserialize, Serialize};

/// A release dictionary: the set of file schemas a submission may contain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dictionary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub files: Vec<FileSchema>,
}

impl Dictionary {
    pub fn new(files: Vec<FileSchema>) -> Self {
        Self {
            version: None,
            files,
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn file(&self, name: &str) -> Option<&FileSchema> {
        self.files.iter().find(|schema| schema.name == name)
    }
}

/// Schema of one file type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSchema {
    pub name: String,
    /// Regex matched against file names during discovery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Field names in column order.
    pub fields: Vec<String>,
    /// Fields forming the primary key. Empty when the type declares none.
    #[serde(default, rename = "uniqueFields", alias = "unique_fields")]
    pub unique_fields: Vec<String>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl FileSchema {
    pub fn new<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            pattern: None,
            fields: fields.into_iter().map(Into::into).collect(),
            unique_fields: Vec::new(),
            relations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    #[must_use]
    pub fn with_unique_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field == name)
    }
}

/// A foreign-key declaration from this file type to another.
///
/// `fields[i]` in the declaring file refers to `other_fields[i]` in `other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub fields: Vec<String>,
    pub other: String,
    #[serde(alias = "other_fields")]
    pub other_fields: Vec<String>,
    /// Every parent tuple must be referenced by at least one row.
    #[serde(default)]
    pub bidirectional: bool,
    /// Rows may leave the relation unmatched; misses are informational.
    #[serde(default)]
    pub optional: bool,
    /// Predicate over the declaring file's fields; the relation applies to a
    /// row only when it holds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl Relation {
    pub fn new<I, S, J, T>(fields: I, other: impl Into<String>, other_fields: J) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        J: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            other: other.into(),
            other_fields: other_fields.into_iter().map(Into::into).collect(),
            bidirectional: false,
            optional: false,
            condition: None,
        }
    }

    #[must_use]
    pub fn bidirectional(mut self) -> Self {
        self.bidirectional = true;
        self
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    #[must_use]
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Classification used by the compiler: a condition wins over the
    /// optional flag.
    pub fn kind(&self) -> RelationKind {
        if self
            .condition
            .as_deref()
            .is_some_and(|condition| !condition.trim().is_empty())
        {
            RelationKind::Conditional
        } else if self.optional {
            RelationKind::Optional
        } else {
            RelationKind::Mandatory
        }
    }
}

/// How strictly a relation is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Mandatory,
    Optional,
    Conditional,
}
