//! Dictionary loading.

use std::path::Path;

use tracing::info;

use dcc_model::Dictionary;

use crate::compiler::{CompiledDictionary, compile_dictionary};
use crate::error::{DictionaryError, Result};
use crate::hash::sha256_hex;

/// Read a JSON dictionary from disk.
pub fn load_dictionary(path: &Path) -> Result<Dictionary> {
    let bytes = std::fs::read(path).map_err(|source| DictionaryError::io(path, source))?;
    let dictionary: Dictionary =
        serde_json::from_slice(&bytes).map_err(|source| DictionaryError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    info!(
        path = %path.display(),
        version = dictionary.version.as_deref().unwrap_or("-"),
        files = dictionary.files.len(),
        sha256 = %sha256_hex(&bytes),
        "loaded dictionary"
    );
    Ok(dictionary)
}

/// Parse a JSON dictionary held in memory.
pub fn parse_dictionary(json: &str) -> std::result::Result<Dictionary, serde_json::Error> {
    serde_json::from_str(json)
}

/// Load and compile a dictionary in one step.
pub fn load_compiled_dictionary(path: &Path) -> Result<CompiledDictionary> {
    let dictionary = load_dictionary(path)?;
    compile_dictionary(&dictionary)
}
