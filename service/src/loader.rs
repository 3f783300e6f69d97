use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::TableItem;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("dataset {path} is not a JSON array of table items: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Read a dataset fixture: a JSON file holding an array of table items.
pub fn load_dataset<P: AsRef<Path>>(path: P) -> Result<Vec<TableItem>, LoadError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Interpret an already parsed response body as a dataset.
pub fn dataset_from_value(body: &Value) -> Result<Vec<TableItem>, serde_json::Error> {
    Vec::<TableItem>::deserialize(body)
}
