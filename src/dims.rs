/// Symbolic shape handling and axis decomposition for the hardmax operator
use std::fmt;

use crate::error::PluginError;

/// A single dimension as seen during shape negotiation.
///
/// Hosts query output shapes before concrete bindings exist, so a dimension
/// is either a known extent or a dynamic placeholder that must be echoed
/// unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolicDim {
    Known(i64),
    Dynamic,
}

impl SymbolicDim {
    /// Concrete-descriptor marker used by hosts for dynamic axes.
    pub const DYNAMIC_MARKER: i64 = -1;

    pub fn from_concrete(dim: i64) -> Self {
        if dim == Self::DYNAMIC_MARKER {
            SymbolicDim::Dynamic
        } else {
            SymbolicDim::Known(dim)
        }
    }
}

impl fmt::Display for SymbolicDim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolicDim::Known(dim) => write!(f, "{dim}"),
            SymbolicDim::Dynamic => f.write_str("?"),
        }
    }
}

pub type SymbolicShape = Vec<SymbolicDim>;

/// Infer the symbolic output shape for hardmax.
///
/// Hardmax writes a one-hot mask over the input, so the output shape equals
/// the input shape exactly, dynamic dimensions included.
pub fn hardmax_output_shape(
    index: usize,
    inputs: &[SymbolicShape],
) -> Result<SymbolicShape, PluginError> {
    if inputs.len() != 1 {
        return Err(PluginError::TensorCount {
            call: "output_dimensions",
            expected: 1,
            actual: inputs.len(),
        });
    }
    if index != 0 {
        return Err(PluginError::TensorIndex { index, count: 1 });
    }
    Ok(inputs[0].clone())
}

/// Reduction axis as supplied by the host at build time.
///
/// The raw value may be negative (counted from the last dimension) and is
/// only meaningful together with a rank. Binding it produces a [`BoundAxis`];
/// there is deliberately no other way to obtain one, so the normalization
/// runs exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawAxis(pub i32);

impl RawAxis {
    pub fn bind(self, rank: usize) -> Result<BoundAxis, PluginError> {
        let rank_i32 = rank as i32;
        let normalized = if self.0 < 0 { self.0 + rank_i32 } else { self.0 };
        if normalized < 0 || normalized >= rank_i32 {
            return Err(PluginError::InvalidAxis { axis: self.0, rank });
        }
        Ok(BoundAxis {
            index: normalized as usize,
        })
    }
}

/// Normalized, in-range reduction axis. Immutable once bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundAxis {
    index: usize,
}

impl BoundAxis {
    pub fn index(self) -> usize {
        self.index
    }

    /// Raw value to persist: the normalized axis, always non-negative.
    pub fn raw(self) -> RawAxis {
        RawAxis(self.index as i32)
    }
}

/// Flattened (outer, axis, inner) view of a rank-N tensor.
///
/// For input dimensions [3, 4, 5, 6, 7] and axis 2, `outer` is 12 (3 x 4),
/// `axis_size` is 5 and `inner` is 42 (6 x 7). The product of the three
/// always equals the total element count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisDecomposition {
    pub outer: usize,
    pub axis_size: usize,
    pub inner: usize,
}

impl AxisDecomposition {
    /// Decompose concrete dimensions around a bound axis.
    ///
    /// Every dimension must be concrete and positive at this point: dynamic
    /// markers are rejected, and a zero-sized reduction axis is rejected
    /// because the one-hot encoding is undefined over an empty slice.
    pub fn from_dims(dims: &[i64], axis: BoundAxis) -> Result<Self, PluginError> {
        for (index, &dim) in dims.iter().enumerate() {
            if dim == SymbolicDim::DYNAMIC_MARKER {
                return Err(PluginError::DynamicDimension { index });
            }
            if dim < 0 {
                return Err(PluginError::DynamicDimension { index });
            }
        }
        let axis_index = axis.index();
        let axis_size = dims[axis_index] as usize;
        if axis_size == 0 {
            return Err(PluginError::EmptyAxis { axis: axis_index });
        }

        let outer = product(&dims[..axis_index])?;
        let inner = product(&dims[axis_index + 1..])?;
        outer
            .checked_mul(axis_size)
            .and_then(|n| n.checked_mul(inner))
            .ok_or(PluginError::ElementCountOverflow)?;

        Ok(Self {
            outer,
            axis_size,
            inner,
        })
    }

    pub fn element_count(&self) -> usize {
        self.outer * self.axis_size * self.inner
    }
}

fn product(dims: &[i64]) -> Result<usize, PluginError> {
    let mut count = 1usize;
    for &dim in dims {
        count = count
            .checked_mul(dim as usize)
            .ok_or(PluginError::ElementCountOverflow)?;
    }
    Ok(count)
}
