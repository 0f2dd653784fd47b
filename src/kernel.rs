//! Reference hardmax kernel over a flattened (outer, axis, inner) shape
//!
//! The contract mirrors what an accelerator kernel would do on-device: for
//! every (outer, inner) pair, scan the axis once, find the first maximum and
//! write a one-hot mask. Ties break toward the lowest axis index because the
//! scan keeps the first value that is strictly greater than the running max.

use crate::dims::AxisDecomposition;

/// Write the one-hot argmax mask of `input` into `output`.
///
/// Both slices must hold exactly `dims.element_count()` row-major elements;
/// callers validate that before dispatch. The computation is total: it cannot
/// fail over well-formed buffers.
pub fn hardmax(input: &[f32], output: &mut [f32], dims: &AxisDecomposition) {
    debug_assert_eq!(input.len(), dims.element_count());
    debug_assert_eq!(output.len(), dims.element_count());

    let axis_stride = dims.inner;
    let outer_stride = dims.axis_size * dims.inner;

    output.fill(0.0);
    for outer in 0..dims.outer {
        let base = outer * outer_stride;
        for inner in 0..dims.inner {
            let mut best_index = 0usize;
            let mut best_value = input[base + inner];
            for i in 1..dims.axis_size {
                let value = input[base + i * axis_stride + inner];
                if value > best_value {
                    best_value = value;
                    best_index = i;
                }
            }
            output[base + best_index * axis_stride + inner] = 1.0;
        }
    }
}
