// Licensed under the Apache-2.0 license

use fmp_payload_header::PayloadHeaderError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PackageError {
    #[error("{}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to serialize manifest: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),
    #[error("invalid inventory: {0}")]
    InvalidInventory(String),
    #[error("payload has no firmware image after its header")]
    EmptyImage,
    #[error("invalid payload header: {0}")]
    PayloadHeader(#[from] PayloadHeaderError),
    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),
}

impl PackageError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> PackageError {
        let path = path.into();
        move |source| PackageError::Io { path, source }
    }
}
