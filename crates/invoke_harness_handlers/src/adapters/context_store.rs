use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Name of the deployment context file, resolved against the working
/// directory of the invocation.
pub const CONTEXT_FILE_NAME: &str = ".context";

#[derive(Debug, Error)]
pub enum ContextStoreError {
    #[error("failed to read context file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("context file {path} is not a JSON object: {reason}")]
    Parse { path: PathBuf, reason: String },
}

pub trait ContextStore {
    fn load(&self) -> Result<serde_json::Map<String, serde_json::Value>, ContextStoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContextStore {
    path: PathBuf,
}

impl FileContextStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_working_dir() -> Self {
        Self::new(CONTEXT_FILE_NAME)
    }
}

impl ContextStore for FileContextStore {
    fn load(&self) -> Result<serde_json::Map<String, serde_json::Value>, ContextStoreError> {
        let contents = fs::read_to_string(&self.path).map_err(|source| ContextStoreError::Read {
            path: self.path.clone(),
            source,
        })?;

        match serde_json::from_str::<serde_json::Value>(&contents) {
            Ok(serde_json::Value::Object(values)) => Ok(values),
            Ok(_) => Err(ContextStoreError::Parse {
                path: self.path.clone(),
                reason: "top-level value must be an object".to_string(),
            }),
            Err(error) => Err(ContextStoreError::Parse {
                path: self.path.clone(),
                reason: error.to_string(),
            }),
        }
    }
}
