#[path = "common/mod.rs"]
mod common;

use hdf5_udf_core::{run_udf, DataType};

/// spec.md §8 scenario 1: a UDF that writes 42 to every element of an
/// output dataset of shape (4,) typed int32.
#[test]
fn constant_udf_fills_output_with_literal() {
    let blob = common::compile_fixture(
        r#"
auto* out = lib.getOutput<std::int32_t>();
std::size_t n = lib.output_grid_size();
for (std::size_t i = 0; i < n; i++) {
    out[i] = 42;
}
"#,
    );

    let (out_buf, mut output) = common::output_descriptor("out", DataType::Int32, vec![4]);
    let policy = common::permissive_policy();

    let ok = run_udf(&policy, true, &[], &mut output, &blob);
    assert!(ok);

    let values: Vec<i32> = out_buf
        .chunks_exact(4)
        .map(|c| i32::from_ne_bytes(c.try_into().unwrap()))
        .collect();
    assert_eq!(values, vec![42, 42, 42, 42]);
}
