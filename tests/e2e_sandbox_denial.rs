#[path = "common/mod.rs"]
mod common;

use hdf5_udf_core::{run_udf, DataType};

/// spec.md §8 scenario 4: a UDF attempts `open("/etc/passwd", O_RDONLY)`.
/// With the default policy (only `/etc/resolv.conf` allowed), the
/// interceptor returns `-EPERM` without reaching the kernel; the UDF bails
/// out without writing its output; `run` still returns `true` and the
/// output buffer stays zero-filled.
#[test]
fn disallowed_path_is_denied_and_output_stays_zero() {
    let blob = common::compile_fixture(
        r#"
extern "C" int open(const char*, int, ...);
int fd = open("/etc/passwd", 0);
if (fd < 0) {
    return;
}
auto* out = lib.getOutput<std::int32_t>();
out[0] = 99;
"#,
    );

    let (out_buf, mut output) = common::output_descriptor("out", DataType::Int32, vec![1]);
    let policy = common::permissive_policy();

    let ok = run_udf(&policy, true, &[], &mut output, &blob);
    assert!(ok);
    assert_eq!(out_buf, vec![0u8, 0, 0, 0]);
}
