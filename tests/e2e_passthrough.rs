#[path = "common/mod.rs"]
mod common;

use hdf5_udf_core::{run_udf, DataType};

/// spec.md §8 scenario 2: one input dataset `src` of shape (3,) with values
/// [1,2,3]; the UDF copies it straight to the output.
#[test]
fn passthrough_udf_copies_input_to_output() {
    let blob = common::compile_fixture(
        r#"
auto* out = lib.getOutput<std::int32_t>();
auto* src = lib.getData<std::int32_t>("src");
std::size_t n = lib.output_grid_size();
for (std::size_t i = 0; i < n; i++) {
    out[i] = src[i];
}
"#,
    );

    let (_src_buf, src) = common::input_descriptor_i32("src", &[1, 2, 3]);
    let (out_buf, mut output) = common::output_descriptor("out", DataType::Int32, vec![3]);
    let policy = common::permissive_policy();

    let ok = run_udf(&policy, true, &[src], &mut output, &blob);
    assert!(ok);

    let values: Vec<i32> = out_buf
        .chunks_exact(4)
        .map(|c| i32::from_ne_bytes(c.try_into().unwrap()))
        .collect();
    assert_eq!(values, vec![1, 2, 3]);
}
