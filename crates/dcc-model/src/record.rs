use serde::{Deserialize, Serialize};

use crate::enums::{ErrorType, KeyErrorKind};

/// Line number attached to surjection errors, which have no data row.
pub const SURJECTION_LINE_NUMBER: i64 = -1;

/// Value marking a field as not applicable to the row.
pub const NOT_APPLICABLE_CODE: &str = "-888";

/// A key violation resolved to names, ready for the reporting subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub file_name: String,
    /// 1-based data line, or [`SURJECTION_LINE_NUMBER`].
    pub line_number: i64,
    #[serde(rename = "type")]
    pub error_type: ErrorType,
    pub kind: KeyErrorKind,
    pub field_names: Vec<String>,
    pub value: Vec<String>,
    #[serde(default, skip_serializing_if = "ErrorParams::is_empty")]
    pub params: ErrorParams,
}

/// The other side of a relation error.
///
/// For relation kinds this is the referenced parent and its key fields; for
/// surjection it is the referencing child and its foreign-key fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_schema: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub other_fields: Vec<String>,
}

impl ErrorParams {
    pub fn is_empty(&self) -> bool {
        self.other_schema.is_none() && self.other_fields.is_empty()
    }
}

impl ErrorRecord {
    pub fn is_surjection(&self) -> bool {
        self.kind == KeyErrorKind::Surjection
    }

    /// Human-readable description of the violation.
    pub fn message(&self) -> String {
        let values = self.value.join(", ");
        let fields = bracketed(&self.field_names);
        let other = self.params.other_schema.as_deref().unwrap_or("?");
        let other_fields = bracketed(&self.params.other_fields);
        match self.kind {
            KeyErrorKind::ExistingUnique => format!(
                "Invalid set of values ({values}) for fields {fields}. Expected to be unique"
            ),
            KeyErrorKind::IncrementalUnique => format!(
                "Invalid set of values ({values}) for fields {fields}. \
                 Expected to be unique, already present in a previous release"
            ),
            KeyErrorKind::Relation
            | KeyErrorKind::SecondaryRelation
            | KeyErrorKind::OptionalRelation
            | KeyErrorKind::ConditionalRelation => format!(
                "Invalid value(s) ({values}) for field(s) {}.{fields}. \
                 Expected to match value(s) in: {other}.{other_fields}",
                self.file_name
            ),
            KeyErrorKind::Surjection => format!(
                "No corresponding values in {other}.{other_fields} for value(s) \
                 [{values}] in {}.{fields}",
                self.file_name
            ),
        }
    }
}

fn bracketed(values: &[String]) -> String {
    format!("[{}]", values.join(", "))
}
