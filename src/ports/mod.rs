//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the relay and an external
//! system. Implementations live in `src/adapters/`.

pub mod generative_model;

pub use generative_model::{
    ContentRequest, FileUpload, GenerativeModel, Modality, ModelFuture, ModelResponse, Part,
    RemoteFile, RequestPart, Tool,
};
