use crate::store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("malformed path: '{path}'")]
    MalformedPath { path: String },

    #[error("failed to find structure bounds for '{path}'")]
    StructureNotFound { path: String },

    #[error("failed to find the target line '{key}'")]
    KeyNotFound { key: String },

    #[error("unsupported value shape: {message}")]
    UnsupportedValue { message: String },

    #[error("invalid regex pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("no file currently loaded")]
    NoDocumentLoaded,

    #[error("malformed action: {message}")]
    MalformedAction { message: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}
