//! Reading and writing `.mlmodel` files

use crate::error::Result;
use super::coreml::Model;
use prost::Message;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Summary of a written model file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactInfo {
    pub path: PathBuf,
    pub size_bytes: usize,
    /// Hex SHA-256 of the file contents
    pub sha256: String,
}

/// Encode a model to its protobuf bytes
pub fn encode_model(model: &Model) -> Vec<u8> {
    model.encode_to_vec()
}

/// Write a model to `path`, replacing any existing file
pub fn save_model(model: &Model, path: impl AsRef<Path>) -> Result<ArtifactInfo> {
    let path = path.as_ref();
    let bytes = encode_model(model);
    fs::write(path, &bytes)?;

    let artifact = ArtifactInfo {
        path: path.to_path_buf(),
        size_bytes: bytes.len(),
        sha256: compute_sha256(&bytes),
    };
    info!(
        path = %path.display(),
        bytes = artifact.size_bytes,
        sha256 = %artifact.sha256,
        "wrote model"
    );
    Ok(artifact)
}

/// Read and decode a model file
pub fn load_model(path: impl AsRef<Path>) -> Result<Model> {
    let bytes = fs::read(path.as_ref())?;
    Ok(Model::decode(bytes.as_slice())?)
}

/// Compute SHA-256 hash of data
pub fn compute_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
