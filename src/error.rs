use std::path::PathBuf;

use crate::format::DataType;
use serde_json::Error as JsonError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("creation attributes are missing required attribute `{name}`")]
    MissingAttribute { name: String },
    #[error("creation attributes contain unexpected attribute `{name}`")]
    UnexpectedAttribute { name: String },
    #[error("attribute `{name}` must be a scalar {expected}")]
    AttributeType { name: String, expected: &'static str },
    #[error("attribute `{name}` must appear {expected} time(s), found {actual}")]
    AttributeCount {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("axis {axis} is out of range for rank {rank}")]
    InvalidAxis { axis: i32, rank: usize },
    #[error("serialized plugin state must be exactly {expected} bytes, got {actual}")]
    CorruptState { expected: usize, actual: usize },
    #[error("plugin `{requested}` version `{version}` is not registered. Available: {available:?}")]
    UnknownPlugin {
        requested: String,
        version: String,
        available: Vec<String>,
    },
    #[error("`{call}` is not valid in lifecycle state `{state}`")]
    Lifecycle {
        call: &'static str,
        state: &'static str,
    },
    #[error("`{call}` expects {expected} tensor(s), got {actual}")]
    TensorCount {
        call: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("tensor index {index} is out of range ({count} tensor(s) in the combination)")]
    TensorIndex { index: usize, count: usize },
    #[error("dimension {index} is still dynamic at configuration time")]
    DynamicDimension { index: usize },
    #[error("reduction axis {axis} has zero elements")]
    EmptyAxis { axis: usize },
    #[error("tensor shape overflows element count")]
    ElementCountOverflow,
    #[error("input and output descriptors disagree: input is {input:?}, output is {output:?}")]
    DescriptorMismatch { input: DataType, output: DataType },
    #[error("tensor buffer holds {actual} elements but the configured shape needs {expected}")]
    BufferLength { expected: usize, actual: usize },
    #[error("input and output must be distinct buffers; the kernel does not run in place")]
    AliasedBuffers,
    #[error("tensor file {path} could not be read: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("tensor JSON could not be parsed: {source}")]
    Parse {
        #[from]
        source: JsonError,
    },
    #[error("tensor file declares shape for {expected} elements but carries {actual} values")]
    InputLengthMismatch { expected: usize, actual: usize },
    #[error("serialized blob could not be written to {path}: {source}")]
    ExportIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PluginError {
    pub fn export(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PluginError::ExportIo {
            path: path.into(),
            source,
        }
    }
}
