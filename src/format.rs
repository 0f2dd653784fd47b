use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Float32,
    Float16,
    Int32,
    Int8,
}

impl DataType {
    pub fn bytes_per_element(self) -> usize {
        match self {
            DataType::Float32 => 4,
            DataType::Float16 => 2,
            DataType::Int32 => 4,
            DataType::Int8 => 1,
        }
    }
}

/// Memory layout of a tensor as advertised during format negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TensorLayout {
    /// Row-major, no vectorization.
    Linear,
    /// Channels packed in pairs.
    Chw2,
    /// Channels packed 32-wide.
    Chw32,
}

/// One tensor position in a candidate format combination.
///
/// `dims` uses -1 for dimensions the host has not resolved yet; they become
/// concrete before `configure` commits the combination.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorDesc {
    pub data_type: DataType,
    pub layout: TensorLayout,
    pub dims: Vec<i64>,
}

impl TensorDesc {
    pub fn new(data_type: DataType, layout: TensorLayout, dims: Vec<i64>) -> Self {
        Self {
            data_type,
            layout,
            dims,
        }
    }

    /// Row-major float32 descriptor, the combination the hardmax kernel runs on.
    pub fn linear_f32(dims: Vec<i64>) -> Self {
        Self::new(DataType::Float32, TensorLayout::Linear, dims)
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }
}

#[cfg(test)]
mod tests {
    use super::{DataType, TensorDesc, TensorLayout};

    #[test]
    fn linear_f32_shorthand() {
        let desc = TensorDesc::linear_f32(vec![2, 3]);
        assert_eq!(desc.data_type, DataType::Float32);
        assert_eq!(desc.layout, TensorLayout::Linear);
        assert_eq!(desc.rank(), 2);
    }

    #[test]
    fn element_widths() {
        assert_eq!(DataType::Float32.bytes_per_element(), 4);
        assert_eq!(DataType::Float16.bytes_per_element(), 2);
        assert_eq!(DataType::Int8.bytes_per_element(), 1);
    }
}
