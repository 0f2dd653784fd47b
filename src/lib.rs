pub mod backend;
pub mod debug;
pub mod dims;
pub mod error;
pub mod factory;
pub mod format;
pub mod kernel;
pub mod plugin;

pub use backend::{BackendContext, DeviceBuffer, ExecutionStream, HostBackend, HostStream};
pub use dims::{AxisDecomposition, BoundAxis, RawAxis, SymbolicDim, SymbolicShape};
pub use error::PluginError;
pub use factory::{
    Attribute, AttributeDescriptor, AttributeKind, AttributeValue, HardmaxFactory, PluginFactory,
    PluginRegistry,
};
pub use format::{DataType, TensorDesc, TensorLayout};
pub use plugin::{
    HARDMAX_PLUGIN_NAME, HARDMAX_PLUGIN_VERSION, HardmaxPlugin, LifecycleState, OperatorPlugin,
    SERIALIZED_STATE_LEN,
};
