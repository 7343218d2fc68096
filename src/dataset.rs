//! The dataset descriptor: the unit the executor passes across the
//! input/output boundary between the host and a running UDF.

use std::ffi::CString;

/// Element data type tags exposed to UDFs via the runtime type-tag table.
///
/// The symbolic names here (`int32`, `float64`, ...) are exactly the strings
/// the UDF runtime template emits into its type-tag table (spec.md §3, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
}

impl DataType {
    /// Size in bytes of one element of this type.
    pub fn storage_size(self) -> usize {
        match self {
            DataType::Int8 | DataType::UInt8 => 1,
            DataType::Int16 | DataType::UInt16 => 2,
            DataType::Int32 | DataType::UInt32 | DataType::Float32 => 4,
            DataType::Int64 | DataType::UInt64 | DataType::Float64 => 8,
        }
    }

    /// The symbolic name the UDF template's type-tag table carries for this type.
    pub fn tag(self) -> &'static str {
        match self {
            DataType::Int8 => "int8",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::UInt8 => "uint8",
            DataType::UInt16 => "uint16",
            DataType::UInt32 => "uint32",
            DataType::UInt64 => "uint64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
        }
    }

    pub(crate) fn tag_cstring(self) -> CString {
        CString::new(self.tag()).expect("type tag is ASCII and has no interior NUL")
    }

    /// The inverse of [`Self::tag`]: parses one of the runtime template's
    /// symbolic type names back into a `DataType`. Used to reconstruct a
    /// dataset descriptor from the environment-variable metadata a worker
    /// process inherits across `execve` (`crate::worker`).
    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "int8" => DataType::Int8,
            "int16" => DataType::Int16,
            "int32" => DataType::Int32,
            "int64" => DataType::Int64,
            "uint8" => DataType::UInt8,
            "uint16" => DataType::UInt16,
            "uint32" => DataType::UInt32,
            "uint64" => DataType::UInt64,
            "float32" => DataType::Float32,
            "float64" => DataType::Float64,
            _ => return None,
        })
    }
}

/// One input or output dataset: a name, element type, dimension tuple, and a
/// mutable pointer to the row-major element buffer backing it.
///
/// Invariants (spec.md §3): `grid_size = product(dimensions)`, `buffer length
/// = grid_size * storage_size`. The output descriptor's `data` pointer must
/// be writable; input descriptors are read-only from the UDF's perspective,
/// though this type does not itself enforce that — the sandbox and the
/// shared-region copy discipline do.
pub struct DatasetDescriptor {
    pub name: String,
    pub dtype: DataType,
    pub dimensions: Vec<usize>,
    pub data: *mut u8,
}

impl DatasetDescriptor {
    pub fn new(name: impl Into<String>, dtype: DataType, dimensions: Vec<usize>, data: *mut u8) -> Self {
        Self {
            name: name.into(),
            dtype,
            dimensions,
            data,
        }
    }

    /// Number of elements: the product of the dimension tuple.
    pub fn grid_size(&self) -> usize {
        self.dimensions.iter().product()
    }

    /// Required buffer length in bytes: `grid_size * storage_size`.
    pub fn buffer_len(&self) -> usize {
        self.grid_size() * self.dtype.storage_size()
    }

    pub(crate) fn name_cstring(&self) -> CString {
        CString::new(self.name.as_bytes()).expect("dataset name has no interior NUL")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_size_is_product_of_dimensions() {
        let mut buf = vec![0u8; 24];
        let d = DatasetDescriptor::new("x", DataType::Int32, vec![2, 3], buf.as_mut_ptr());
        assert_eq!(d.grid_size(), 6);
        assert_eq!(d.buffer_len(), 24);
    }

    #[test]
    fn single_element_output_grid() {
        let mut buf = vec![0u8; 8];
        let d = DatasetDescriptor::new("scalar", DataType::Float64, vec![1], buf.as_mut_ptr());
        assert_eq!(d.grid_size(), 1);
        assert_eq!(d.buffer_len(), d.dtype.storage_size());
    }

    #[test]
    fn tag_round_trips_through_from_tag() {
        let all = [
            DataType::Int8,
            DataType::Int16,
            DataType::Int32,
            DataType::Int64,
            DataType::UInt8,
            DataType::UInt16,
            DataType::UInt32,
            DataType::UInt64,
            DataType::Float32,
            DataType::Float64,
        ];
        for dtype in all {
            assert_eq!(DataType::from_tag(dtype.tag()), Some(dtype));
        }
    }

    #[test]
    fn from_tag_rejects_unknown_names() {
        assert_eq!(DataType::from_tag("complex128"), None);
    }
}
