//! Dictionary compilation.
//!
//! Turns a [`Dictionary`] into a [`CompiledDictionary`]:
//!
//! - one [`KeySpec`] per file type, with column indices derived from the
//!   declared field names
//! - the child → parent [`DependencyGraph`]
//! - a topological processing order in which every type follows its parents
//!
//! All relation problems (unknown targets or fields, key arity mismatches,
//! bad condition scripts, cycles) are reported here, before any row is read.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use dcc_model::{
    Dictionary, FileSchema, FileType, FileTypeName, KeyErrorKind, Relation, RelationKind,
};

use crate::condition::ConditionEvaluator;
use crate::error::{DictionaryError, Result};
use crate::graph::{DependencyGraph, Edge};
use crate::key_spec::{ConditionalKey, ForeignKey, KeySpec};

/// Compile a dictionary into key specifications and a processing order.
pub fn compile_dictionary(dictionary: &Dictionary) -> Result<CompiledDictionary> {
    DictionaryCompiler::new(dictionary)?.compile()
}

/// The compiled, read-only form of a dictionary.
#[derive(Debug, Clone)]
pub struct CompiledDictionary {
    version: Option<String>,
    names: Vec<FileTypeName>,
    fields: Vec<Arc<[String]>>,
    patterns: Vec<Option<String>>,
    key_specs: Vec<KeySpec>,
    graph: DependencyGraph,
    order: Vec<FileType>,
}

impl CompiledDictionary {
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All file types in declaration order.
    pub fn file_types(&self) -> impl Iterator<Item = FileType> + '_ {
        (0..self.names.len()).map(|index| FileType::from_index(index as u16))
    }

    pub fn file_type(&self, name: &str) -> Option<FileType> {
        self.names
            .iter()
            .position(|candidate| candidate.as_str() == name)
            .map(|index| FileType::from_index(index as u16))
    }

    pub fn name(&self, file_type: FileType) -> &str {
        self.names[file_type.index()].as_str()
    }

    pub fn field_names(&self, file_type: FileType) -> &[String] {
        &self.fields[file_type.index()]
    }

    pub fn pattern(&self, file_type: FileType) -> Option<&str> {
        self.patterns[file_type.index()].as_deref()
    }

    pub fn key_spec(&self, file_type: FileType) -> &KeySpec {
        &self.key_specs[file_type.index()]
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Every file type, each after all of its parents.
    pub fn topological_order(&self) -> &[FileType] {
        &self.order
    }

    pub fn parents(&self, file_type: FileType) -> Vec<FileType> {
        self.graph.parents(file_type)
    }

    pub fn has_children(&self, file_type: FileType) -> bool {
        self.graph.has_children(file_type)
    }

    /// Parents whose every tuple `file_type` rows must reference.
    pub fn surjective_parents(&self, file_type: FileType) -> Vec<FileType> {
        self.graph.surjective_parents(file_type)
    }

    /// Every `(kind, related type)` pair that may be reported for
    /// `file_type`. The related type is the referenced parent for relation
    /// kinds and the referencing child for surjection.
    pub fn registered_errors(&self, file_type: FileType) -> Vec<(KeyErrorKind, Option<FileType>)> {
        let spec = self.key_spec(file_type);
        let mut registered = Vec::new();
        if spec.has_primary_key() {
            registered.push((KeyErrorKind::ExistingUnique, None));
            registered.push((KeyErrorKind::IncrementalUnique, None));
        }
        for (position, key) in spec.foreign_keys().iter().enumerate() {
            let kind = if position == 0 {
                KeyErrorKind::Relation
            } else {
                KeyErrorKind::SecondaryRelation
            };
            registered.push((kind, Some(key.referenced)));
        }
        for key in spec.optional_keys() {
            registered.push((KeyErrorKind::OptionalRelation, Some(key.referenced)));
        }
        for key in spec.conditional_keys() {
            registered.push((KeyErrorKind::ConditionalRelation, Some(key.referenced)));
        }
        for child in self.graph.surjective_children(file_type) {
            registered.push((KeyErrorKind::Surjection, Some(child)));
        }
        registered
    }

    /// Column indices attached to a violation of `kind` on `file_type`.
    ///
    /// Uniqueness and surjection report the type's own primary key; relation
    /// kinds report the foreign-key columns of the relation to `related`.
    pub fn error_field_indices(
        &self,
        file_type: FileType,
        kind: KeyErrorKind,
        related: Option<FileType>,
    ) -> Result<Vec<usize>> {
        let spec = self.key_spec(file_type);
        let indices = match (kind, related) {
            (KeyErrorKind::ExistingUnique | KeyErrorKind::IncrementalUnique, _)
                if spec.has_primary_key() =>
            {
                Some(spec.primary_key().to_vec())
            }
            (KeyErrorKind::Relation | KeyErrorKind::SecondaryRelation, Some(parent))
                if spec.mandatory_error_kind(parent) == Some(kind) =>
            {
                spec.foreign_key(parent).map(|key| key.indices.clone())
            }
            (KeyErrorKind::OptionalRelation, Some(parent)) => {
                spec.optional_key(parent).map(|key| key.indices.clone())
            }
            (KeyErrorKind::ConditionalRelation, Some(parent)) => {
                spec.conditional_key(parent).map(|key| key.indices.clone())
            }
            (KeyErrorKind::Surjection, Some(child))
                if spec.has_primary_key()
                    && self.surjective_parents(child).contains(&file_type) =>
            {
                Some(spec.primary_key().to_vec())
            }
            _ => None,
        };
        indices.ok_or_else(|| DictionaryError::UnregisteredErrorFields {
            file_type: self.name(file_type).to_string(),
            kind,
            referenced: related.map_or_else(|| "-".to_string(), |other| self.name(other).to_string()),
        })
    }

    /// Field names attached to a violation of `kind` on `file_type`.
    pub fn error_field_names(
        &self,
        file_type: FileType,
        kind: KeyErrorKind,
        related: Option<FileType>,
    ) -> Result<Vec<String>> {
        let names = self.field_names(file_type);
        Ok(self
            .error_field_indices(file_type, kind, related)?
            .into_iter()
            .map(|index| names[index].clone())
            .collect())
    }

    /// Primary-key field names of `file_type`.
    pub fn primary_key_names(&self, file_type: FileType) -> Vec<String> {
        let names = self.field_names(file_type);
        self.key_spec(file_type)
            .primary_key()
            .iter()
            .map(|&index| names[index].clone())
            .collect()
    }
}

struct DictionaryCompiler<'a> {
    dictionary: &'a Dictionary,
    /// Trimmed file type names, by position.
    names: Vec<FileTypeName>,
    index: BTreeMap<&'a str, FileType>,
}

impl<'a> DictionaryCompiler<'a> {
    fn new(dictionary: &'a Dictionary) -> Result<Self> {
        if dictionary.files.len() > usize::from(u16::MAX) {
            return Err(DictionaryError::TooManyFileTypes {
                count: dictionary.files.len(),
            });
        }
        let mut names = Vec::with_capacity(dictionary.files.len());
        let mut index = BTreeMap::new();
        for (position, schema) in dictionary.files.iter().enumerate() {
            let name = FileTypeName::new(schema.name.as_str()).map_err(|_| {
                DictionaryError::InvalidName {
                    name: schema.name.clone(),
                }
            })?;
            if index
                .insert(schema.name.trim(), FileType::from_index(position as u16))
                .is_some()
            {
                return Err(DictionaryError::DuplicateFileType {
                    name: name.to_string(),
                });
            }
            names.push(name);
        }
        Ok(Self {
            dictionary,
            names,
            index,
        })
    }

    fn compile(self) -> Result<CompiledDictionary> {
        let count = self.dictionary.files.len();
        let mut names = Vec::with_capacity(count);
        let mut fields = Vec::with_capacity(count);
        let mut patterns = Vec::with_capacity(count);
        let mut key_specs = Vec::with_capacity(count);
        let mut graph = DependencyGraph::with_nodes(count);

        for (position, schema) in self.dictionary.files.iter().enumerate() {
            let file_type = FileType::from_index(position as u16);
            let name = self.names[position].clone();
            check_unique_fields(schema)?;
            let field_names: Arc<[String]> = schema.fields.clone().into();
            let (spec, edges) = self.compile_schema(schema, &field_names)?;
            for edge in edges {
                graph.add_edge(file_type, edge);
            }
            debug!(
                file_type = %name,
                fields = spec.field_count(),
                primary_key = ?spec.primary_key(),
                foreign_keys = spec.foreign_keys().len(),
                optional_keys = spec.optional_keys().len(),
                conditional_keys = spec.conditional_keys().len(),
                "compiled key specification"
            );
            names.push(name);
            fields.push(field_names);
            patterns.push(schema.pattern.clone());
            key_specs.push(spec);
        }

        let order = graph.topological_order().map_err(|cycle| {
            DictionaryError::CyclicDependency {
                cycle: cycle
                    .into_iter()
                    .map(|file_type| names[file_type.index()].to_string())
                    .collect(),
            }
        })?;
        info!(
            file_types = count,
            order = %order
                .iter()
                .map(|file_type| names[file_type.index()].as_str())
                .collect::<Vec<_>>()
                .join(", "),
            "compiled dictionary"
        );

        Ok(CompiledDictionary {
            version: self.dictionary.version.clone(),
            names,
            fields,
            patterns,
            key_specs,
            graph,
            order,
        })
    }

    fn compile_schema(
        &self,
        schema: &FileSchema,
        field_names: &Arc<[String]>,
    ) -> Result<(KeySpec, Vec<Edge>)> {
        let mut spec = KeySpec {
            field_count: schema.fields.len(),
            primary_key: schema
                .unique_fields
                .iter()
                .map(|field| field_position(schema, field))
                .collect::<Result<_>>()?,
            ..KeySpec::default()
        };
        let mut edges = Vec::with_capacity(schema.relations.len());

        for relation in &schema.relations {
            let referenced = self.resolve_target(schema, relation)?;
            let indices = self.aligned_indices(schema, relation)?;
            let kind = relation.kind();
            let duplicate = match kind {
                RelationKind::Mandatory => spec.foreign_key(referenced).is_some(),
                RelationKind::Optional => spec.optional_key(referenced).is_some(),
                RelationKind::Conditional => spec.conditional_key(referenced).is_some(),
            };
            if duplicate {
                return Err(DictionaryError::DuplicateRelation {
                    file_type: schema.name.clone(),
                    other: relation.other.clone(),
                    kind: relation_kind_label(kind),
                });
            }
            match kind {
                RelationKind::Mandatory => spec.foreign_keys.push(ForeignKey {
                    referenced,
                    indices,
                }),
                RelationKind::Optional => spec.optional_keys.push(ForeignKey {
                    referenced,
                    indices,
                }),
                RelationKind::Conditional => {
                    let script = relation.condition.as_deref().unwrap_or_default();
                    let condition = ConditionEvaluator::compile(script, &field_names[..]).map_err(
                        |source| DictionaryError::Condition {
                            file_type: schema.name.clone(),
                            other: relation.other.clone(),
                            source,
                        },
                    )?;
                    spec.conditional_keys.push(ConditionalKey {
                        referenced,
                        indices,
                        condition: Arc::new(condition),
                        field_names: Arc::clone(field_names),
                    });
                }
            }
            edges.push(Edge {
                parent: referenced,
                kind,
                bidirectional: relation.bidirectional,
            });
        }
        Ok((spec, edges))
    }

    fn resolve_target(&self, schema: &FileSchema, relation: &Relation) -> Result<FileType> {
        let invalid = |message: &str| DictionaryError::InvalidRelation {
            file_type: schema.name.clone(),
            other: relation.other.clone(),
            message: message.to_string(),
        };
        if relation.fields.is_empty() {
            return Err(invalid("no fields declared"));
        }
        if relation.fields.len() != relation.other_fields.len() {
            return Err(invalid("fields and other fields differ in length"));
        }
        if relation.optional && relation.bidirectional {
            return Err(invalid("a relation cannot be both optional and bidirectional"));
        }
        self.target(relation).ok_or_else(|| DictionaryError::UnknownFileType {
            file_type: schema.name.clone(),
            other: relation.other.clone(),
        })
    }

    fn target(&self, relation: &Relation) -> Option<FileType> {
        self.index.get(relation.other.trim()).copied()
    }

    /// Local column indices ordered to line up with the target's primary key.
    fn aligned_indices(&self, schema: &FileSchema, relation: &Relation) -> Result<Vec<usize>> {
        let Some(target) = self
            .target(relation)
            .map(|file_type| &self.dictionary.files[file_type.index()])
        else {
            return Err(DictionaryError::UnknownFileType {
                file_type: schema.name.clone(),
                other: relation.other.clone(),
            });
        };
        if target.unique_fields.is_empty() {
            return Err(DictionaryError::NoPrimaryKey {
                file_type: schema.name.clone(),
                other: relation.other.clone(),
            });
        }
        let mismatch = || DictionaryError::RelationMismatch {
            file_type: schema.name.clone(),
            other: relation.other.clone(),
            expected: target.unique_fields.join(", "),
            actual: relation.other_fields.join(", "),
        };
        if target.unique_fields.len() != relation.other_fields.len() {
            return Err(mismatch());
        }
        target
            .unique_fields
            .iter()
            .map(|pk_field| {
                let position = relation
                    .other_fields
                    .iter()
                    .position(|other| other == pk_field)
                    .ok_or_else(mismatch)?;
                field_position(schema, &relation.fields[position])
            })
            .collect()
    }
}

fn field_position(schema: &FileSchema, field: &str) -> Result<usize> {
    schema
        .field_index(field)
        .ok_or_else(|| DictionaryError::UnknownField {
            file_type: schema.name.clone(),
            field: field.to_string(),
        })
}

fn check_unique_fields(schema: &FileSchema) -> Result<()> {
    for (position, field) in schema.fields.iter().enumerate() {
        if schema.fields[..position].contains(field) {
            return Err(DictionaryError::DuplicateField {
                file_type: schema.name.clone(),
                field: field.clone(),
            });
        }
    }
    Ok(())
}

fn relation_kind_label(kind: RelationKind) -> &'static str {
    match kind {
        RelationKind::Mandatory => "mandatory",
        RelationKind::Optional => "optional",
        RelationKind::Conditional => "conditional",
    }
}
