#![deny(unsafe_code)]

pub mod compiler;
pub mod condition;
pub mod error;
pub mod graph;
pub mod hash;
pub mod key_spec;
pub mod loader;

pub use crate::compiler::{CompiledDictionary, compile_dictionary};
pub use crate::condition::{ConditionError, ConditionEvaluator, InvalidRowError};
pub use crate::error::{DictionaryError, Result};
pub use crate::graph::{DependencyGraph, Edge};
pub use crate::key_spec::{ConditionalKey, ForeignKey, KeySpec};
pub use crate::loader::{load_compiled_dictionary, load_dictionary, parse_dictionary};
