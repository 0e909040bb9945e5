use std::path::Path;

use serde::de::DeserializeOwned;

use crate::EngineError;

/// Read and deserialize a JSON file into `T`.
///
/// Missing fields fall back to the type's serde defaults; the caller validates semantics.
pub fn load_typed_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, EngineError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| EngineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| EngineError::Json {
        path: path.to_path_buf(),
        source,
    })
}
