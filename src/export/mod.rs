//! Model export module
//!
//! Turns a fitted forest into a Core ML `.mlmodel` file:
//! - [`coreml`] declares the protobuf messages and evaluates decoded models
//! - [`CoreMlConverter`] maps forest trees onto a `TreeEnsembleRegressor`
//! - [`save_model`] / [`load_model`] write and read model files

pub mod coreml;
mod converter;
mod writer;

pub use converter::{CoreMlConverter, ModelInfo};
pub use writer::{ArtifactInfo, save_model, load_model, encode_model, compute_sha256};
