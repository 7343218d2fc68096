#[path = "common/mod.rs"]
mod common;

use hdf5_udf_core::{run_udf, DataType};

/// spec.md §8 scenario 5: a UDF issues a disallowed syscall (`unlink`); the
/// seccomp-BPF allowlist kills the child before it ever writes its output.
/// The parent must still return `true` with a zero-filled output buffer.
#[test]
fn disallowed_syscall_kills_child_but_parent_still_succeeds() {
    let blob = common::compile_fixture(
        r#"
extern "C" int unlink(const char*);
unlink("/nonexistent-hdf5-udf-sandbox-kill-probe");
auto* out = lib.getOutput<std::int32_t>();
out[0] = 7;
"#,
    );

    let (out_buf, mut output) = common::output_descriptor("out", DataType::Int32, vec![1]);
    let policy = common::permissive_policy();

    let ok = run_udf(&policy, true, &[], &mut output, &blob);
    assert!(ok);
    assert_eq!(out_buf, vec![0u8, 0, 0, 0]);
}
