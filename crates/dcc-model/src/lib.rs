pub mod cancel;
pub mod enums;
pub mod error;
pub mod ids;
pub mod record;
pub mod schema;

pub use cancel::CancelFlag;
pub use enums::{ErrorType, KeyErrorKind, SubmissionState, TieBreak, ValidatorKind};
pub use error::{ModelError, Result};
pub use ids::{FileType, FileTypeName};
pub use record::{ErrorParams, ErrorRecord, NOT_APPLICABLE_CODE, SURJECTION_LINE_NUMBER};
pub use schema::{Dictionary, FileSchema, Relation, RelationKind};
