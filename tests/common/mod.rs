//! Shared fixtures for the end-to-end scenarios in spec.md §8. Each helper
//! writes a UDF source file, compiles it against the bundled template, and
//! hands back the compressed blob ready for [`hdf5_udf_core::run_udf`].

use std::io::Write;

use hdf5_udf_core::{compile_udf, default_template_path, DataType, DatasetDescriptor, SandboxPolicy};

pub fn compile_fixture(udf_body: &str) -> Vec<u8> {
    let mut source = tempfile::Builder::new()
        .prefix("udf-fixture-")
        .suffix(".cpp.in")
        .tempfile()
        .expect("create UDF source fixture");
    source
        .write_all(udf_body.as_bytes())
        .expect("write UDF source fixture");

    compile_udf(source.path(), &default_template_path()).expect("UDF fixture failed to compile")
}

pub fn output_descriptor(name: &str, dtype: DataType, dims: Vec<usize>) -> (Vec<u8>, DatasetDescriptor) {
    let storage = dtype.storage_size();
    let grid: usize = dims.iter().product();
    let mut buf = vec![0u8; grid * storage];
    let ptr = buf.as_mut_ptr();
    (buf, DatasetDescriptor::new(name, dtype, dims, ptr))
}

pub fn input_descriptor_i32(name: &str, values: &[i32]) -> (Vec<u8>, DatasetDescriptor) {
    let mut buf = Vec::with_capacity(values.len() * 4);
    for v in values {
        buf.extend_from_slice(&v.to_ne_bytes());
    }
    let ptr = buf.as_mut_ptr();
    (buf, DatasetDescriptor::new(name, DataType::Int32, vec![values.len()], ptr))
}

pub fn permissive_policy() -> SandboxPolicy {
    SandboxPolicy::new(vec!["/etc/resolv.conf".to_string()])
}
