//! Operator plugin contract and the hardmax implementation
//!
//! The host engine drives a plugin through a fixed lifecycle:
//!
//! `Constructed -> ShapeBound -> FormatBound -> Initialized -> (enqueue...)
//! -> Terminated`
//!
//! Shape negotiation happens on symbolic dimensions, format negotiation on
//! candidate descriptor combinations, and only after `configure` commits a
//! combination does the instance learn its concrete reduction geometry.
//! Out-of-order calls fail fast with a lifecycle error instead of
//! misbehaving silently.

use std::sync::Arc;

use crate::backend::{BackendContext, DeviceBuffer, ExecutionStream};
use crate::debug_print;
use crate::dims::{AxisDecomposition, BoundAxis, RawAxis, SymbolicShape, hardmax_output_shape};
use crate::error::PluginError;
use crate::format::{DataType, TensorDesc, TensorLayout};

pub const HARDMAX_PLUGIN_NAME: &str = "Hardmax";
pub const HARDMAX_PLUGIN_VERSION: &str = "1";

/// Fixed size of the serialized plugin state: one little-endian i32 holding
/// the normalized axis.
pub const SERIALIZED_STATE_LEN: usize = size_of::<i32>();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Constructed,
    ShapeBound,
    FormatBound,
    Initialized,
    Terminated,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Constructed => "constructed",
            LifecycleState::ShapeBound => "shape_bound",
            LifecycleState::FormatBound => "format_bound",
            LifecycleState::Initialized => "initialized",
            LifecycleState::Terminated => "terminated",
        }
    }
}

/// Lifecycle and negotiation surface every operator plugin implements.
///
/// One method set, explicit over the capabilities the host exercises:
/// identity, symbolic shape inference, format negotiation, resource
/// lifecycle, execution and persistence.
pub trait OperatorPlugin: Send {
    fn type_name(&self) -> &'static str;
    fn version(&self) -> &'static str;
    fn namespace(&self) -> &str;
    fn set_namespace(&mut self, namespace: &str);

    fn num_outputs(&self) -> usize;

    /// Symbolic output shape for `index`, given the symbolic input shapes.
    /// Dynamic dimensions are echoed unchanged.
    fn output_dimensions(
        &mut self,
        index: usize,
        inputs: &[SymbolicShape],
    ) -> Result<SymbolicShape, PluginError>;

    /// Output element type for `index`, given the negotiated input types.
    fn output_data_type(
        &self,
        index: usize,
        input_types: &[DataType],
    ) -> Result<DataType, PluginError>;

    /// Whether the tensor at `pos` in `candidates` is acceptable.
    ///
    /// Deterministic and side-effect free: the host may probe positions in
    /// any order and must observe consistent answers within one negotiation
    /// round. Rejection is the "unsupported format" signal; it is not an
    /// error.
    fn supports_format_combination(
        &self,
        pos: usize,
        candidates: &[TensorDesc],
        num_inputs: usize,
    ) -> Result<bool, PluginError>;

    /// Commit a negotiated combination with concrete descriptors.
    /// Called exactly once per bind.
    fn configure(
        &mut self,
        inputs: &[TensorDesc],
        outputs: &[TensorDesc],
    ) -> Result<(), PluginError>;

    /// Scratch space needed per inference pass, in bytes.
    fn workspace_size(
        &self,
        inputs: &[TensorDesc],
        outputs: &[TensorDesc],
    ) -> Result<usize, PluginError>;

    /// Acquire backend compute resources. The context stays exclusively
    /// owned by this instance until `terminate`.
    fn initialize(&mut self, backend: Arc<dyn BackendContext>) -> Result<(), PluginError>;

    /// Release backend compute resources.
    fn terminate(&mut self) -> Result<(), PluginError>;

    /// Queue one inference pass on `stream` and return without waiting for
    /// completion. The host synchronizes the stream before reading outputs.
    fn enqueue(
        &self,
        inputs: &[Arc<DeviceBuffer>],
        outputs: &[Arc<DeviceBuffer>],
        stream: &dyn ExecutionStream,
    ) -> Result<(), PluginError>;

    /// Bit-exact serialized state, reconstructable by the factory's
    /// deserialize path. Only available once the axis has been bound.
    fn serialized_state(&self) -> Result<Vec<u8>, PluginError>;

    /// Fresh instance carrying the axis and namespace but none of the bound
    /// resources. The clone restarts the lifecycle from `Constructed`.
    fn clone_plugin(&self) -> Box<dyn OperatorPlugin>;
}

/// One-hot argmax along a configurable axis.
pub struct HardmaxPlugin {
    raw_axis: RawAxis,
    bound_axis: Option<BoundAxis>,
    decomposition: Option<AxisDecomposition>,
    namespace: String,
    backend: Option<Arc<dyn BackendContext>>,
    state: LifecycleState,
}

impl HardmaxPlugin {
    pub fn new(axis: RawAxis) -> Self {
        Self {
            raw_axis: axis,
            bound_axis: None,
            decomposition: None,
            namespace: String::new(),
            backend: None,
            state: LifecycleState::Constructed,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Raw axis as it would be persisted: normalized once bound, as supplied
    /// before that.
    pub fn raw_axis(&self) -> RawAxis {
        match self.bound_axis {
            Some(bound) => bound.raw(),
            None => self.raw_axis,
        }
    }

    pub fn decomposition(&self) -> Option<AxisDecomposition> {
        self.decomposition
    }

    fn require_state(
        &self,
        call: &'static str,
        allowed: &[LifecycleState],
    ) -> Result<(), PluginError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(PluginError::Lifecycle {
                call,
                state: self.state.as_str(),
            })
        }
    }

    fn kernel_supports(desc: &TensorDesc) -> bool {
        desc.data_type == DataType::Float32 && desc.layout == TensorLayout::Linear
    }
}

impl OperatorPlugin for HardmaxPlugin {
    fn type_name(&self) -> &'static str {
        HARDMAX_PLUGIN_NAME
    }

    fn version(&self) -> &'static str {
        HARDMAX_PLUGIN_VERSION
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn set_namespace(&mut self, namespace: &str) {
        self.namespace = namespace.to_string();
    }

    fn num_outputs(&self) -> usize {
        1
    }

    fn output_dimensions(
        &mut self,
        index: usize,
        inputs: &[SymbolicShape],
    ) -> Result<SymbolicShape, PluginError> {
        self.require_state(
            "output_dimensions",
            &[LifecycleState::Constructed, LifecycleState::ShapeBound],
        )?;
        let shape = hardmax_output_shape(index, inputs)?;
        self.state = LifecycleState::ShapeBound;
        Ok(shape)
    }

    fn output_data_type(
        &self,
        index: usize,
        input_types: &[DataType],
    ) -> Result<DataType, PluginError> {
        if input_types.len() != 1 {
            return Err(PluginError::TensorCount {
                call: "output_data_type",
                expected: 1,
                actual: input_types.len(),
            });
        }
        if index != 0 {
            return Err(PluginError::TensorIndex { index, count: 1 });
        }
        // Hardmax preserves the input element type.
        Ok(input_types[0])
    }

    fn supports_format_combination(
        &self,
        pos: usize,
        candidates: &[TensorDesc],
        num_inputs: usize,
    ) -> Result<bool, PluginError> {
        self.require_state(
            "supports_format_combination",
            &[LifecycleState::ShapeBound, LifecycleState::FormatBound],
        )?;
        if candidates.len() != num_inputs + self.num_outputs() {
            return Err(PluginError::TensorCount {
                call: "supports_format_combination",
                expected: num_inputs + self.num_outputs(),
                actual: candidates.len(),
            });
        }
        let Some(desc) = candidates.get(pos) else {
            return Err(PluginError::TensorIndex {
                index: pos,
                count: candidates.len(),
            });
        };

        if !Self::kernel_supports(desc) {
            return Ok(false);
        }
        if pos >= num_inputs {
            // Output positions must mirror input 0: hardmax preserves both
            // the element type and the memory layout.
            let input = &candidates[0];
            return Ok(desc.data_type == input.data_type && desc.layout == input.layout);
        }
        Ok(true)
    }

    fn configure(
        &mut self,
        inputs: &[TensorDesc],
        outputs: &[TensorDesc],
    ) -> Result<(), PluginError> {
        self.require_state("configure", &[LifecycleState::ShapeBound])?;
        if inputs.len() != 1 {
            return Err(PluginError::TensorCount {
                call: "configure",
                expected: 1,
                actual: inputs.len(),
            });
        }
        if outputs.len() != 1 {
            return Err(PluginError::TensorCount {
                call: "configure",
                expected: 1,
                actual: outputs.len(),
            });
        }
        let input = &inputs[0];
        let output = &outputs[0];
        if input.data_type != output.data_type {
            return Err(PluginError::DescriptorMismatch {
                input: input.data_type,
                output: output.data_type,
            });
        }

        let bound = self.raw_axis.bind(input.rank())?;
        let decomposition = AxisDecomposition::from_dims(&input.dims, bound)?;
        debug_print!(
            "hardmax: configured axis {} over dims {:?} -> outer {} x axis {} x inner {}",
            bound.index(),
            input.dims,
            decomposition.outer,
            decomposition.axis_size,
            decomposition.inner
        );
        self.bound_axis = Some(bound);
        self.decomposition = Some(decomposition);
        self.state = LifecycleState::FormatBound;
        Ok(())
    }

    fn workspace_size(
        &self,
        _inputs: &[TensorDesc],
        _outputs: &[TensorDesc],
    ) -> Result<usize, PluginError> {
        self.require_state(
            "workspace_size",
            &[LifecycleState::FormatBound, LifecycleState::Initialized],
        )?;
        // The kernel works in place over host-provided buffers.
        Ok(0)
    }

    fn initialize(&mut self, backend: Arc<dyn BackendContext>) -> Result<(), PluginError> {
        self.require_state("initialize", &[LifecycleState::FormatBound])?;
        debug_print!("hardmax: acquired backend context `{}`", backend.name());
        self.backend = Some(backend);
        self.state = LifecycleState::Initialized;
        Ok(())
    }

    fn terminate(&mut self) -> Result<(), PluginError> {
        self.require_state("terminate", &[LifecycleState::Initialized])?;
        self.backend = None;
        self.state = LifecycleState::Terminated;
        Ok(())
    }

    fn enqueue(
        &self,
        inputs: &[Arc<DeviceBuffer>],
        outputs: &[Arc<DeviceBuffer>],
        stream: &dyn ExecutionStream,
    ) -> Result<(), PluginError> {
        self.require_state("enqueue", &[LifecycleState::Initialized])?;
        if inputs.len() != 1 {
            return Err(PluginError::TensorCount {
                call: "enqueue",
                expected: 1,
                actual: inputs.len(),
            });
        }
        if outputs.len() != 1 {
            return Err(PluginError::TensorCount {
                call: "enqueue",
                expected: 1,
                actual: outputs.len(),
            });
        }
        if Arc::ptr_eq(&inputs[0], &outputs[0]) {
            return Err(PluginError::AliasedBuffers);
        }
        let Some(decomposition) = self.decomposition else {
            return Err(PluginError::Lifecycle {
                call: "enqueue",
                state: self.state.as_str(),
            });
        };
        let Some(backend) = self.backend.as_ref() else {
            return Err(PluginError::Lifecycle {
                call: "enqueue",
                state: self.state.as_str(),
            });
        };

        let expected = decomposition.element_count();
        for buffer in [&inputs[0], &outputs[0]] {
            let actual = buffer.len();
            if actual != expected {
                return Err(PluginError::BufferLength { expected, actual });
            }
        }

        let input = Arc::clone(&inputs[0]);
        let output = Arc::clone(&outputs[0]);
        let backend = Arc::clone(backend);
        stream.submit(Box::new(move || {
            let src = input.guard();
            let mut dst = output.guard();
            backend.launch_hardmax(&src, &mut dst, &decomposition);
        }));
        Ok(())
    }

    fn serialized_state(&self) -> Result<Vec<u8>, PluginError> {
        let Some(bound) = self.bound_axis else {
            return Err(PluginError::Lifecycle {
                call: "serialized_state",
                state: self.state.as_str(),
            });
        };
        Ok(bound.raw().0.to_le_bytes().to_vec())
    }

    fn clone_plugin(&self) -> Box<dyn OperatorPlugin> {
        let mut clone = HardmaxPlugin::new(self.raw_axis());
        clone.namespace = self.namespace.clone();
        Box::new(clone)
    }
}
