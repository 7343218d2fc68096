#[path = "common/mod.rs"]
mod common;

use hdf5_udf_core::{run_udf, DataType};

/// spec.md §8 scenario 3: inputs a=[1,2,3], b=[10,20,30]; the UDF writes
/// a[i]+b[i].
#[test]
fn multi_input_udf_sums_elementwise() {
    let blob = common::compile_fixture(
        r#"
auto* out = lib.getOutput<std::int32_t>();
auto* a = lib.getData<std::int32_t>("a");
auto* b = lib.getData<std::int32_t>("b");
std::size_t n = lib.output_grid_size();
for (std::size_t i = 0; i < n; i++) {
    out[i] = a[i] + b[i];
}
"#,
    );

    let (_a_buf, a) = common::input_descriptor_i32("a", &[1, 2, 3]);
    let (_b_buf, b) = common::input_descriptor_i32("b", &[10, 20, 30]);
    let (out_buf, mut output) = common::output_descriptor("out", DataType::Int32, vec![3]);
    let policy = common::permissive_policy();

    let ok = run_udf(&policy, true, &[a, b], &mut output, &blob);
    assert!(ok);

    let values: Vec<i32> = out_buf
        .chunks_exact(4)
        .map(|c| i32::from_ne_bytes(c.try_into().unwrap()))
        .collect();
    assert_eq!(values, vec![11, 22, 33]);
}
