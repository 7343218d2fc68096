//! Compiles the Layer-B sandbox path interceptor (a small C shim — see
//! spec design note on pointer-aware syscall interception) into a
//! standalone shared object, so `src/sandbox/interceptor.rs` can embed its
//! bytes with `include_bytes!` and materialize it to disk for `LD_PRELOAD`
//! at run time. We use `cc` only for its compiler discovery
//! (`cc::Build::get_compiler`); the output is a `-shared` object meant to be
//! preloaded ahead of the worker process, not something linked into this
//! crate's own binary, so we invoke the discovered compiler directly rather
//! than going through `cc::Build::compile`.

use std::path::PathBuf;
use std::process::Command;

fn main() {
    let shim_src = "src/sandbox/interceptor_shim.c";
    println!("cargo:rerun-if-changed={shim_src}");

    let out_dir = PathBuf::from(std::env::var("OUT_DIR").unwrap());
    let out_so = out_dir.join("hdf5_udf_interceptor.so");

    let compiler = cc::Build::new().cargo_metadata(false).get_compiler();
    let mut cmd = Command::new(compiler.path());
    for (key, value) in compiler.env() {
        cmd.env(key, value);
    }
    cmd.arg(shim_src)
        .arg("-shared")
        .arg("-fPIC")
        .arg("-O2")
        .arg("-o")
        .arg(&out_so);

    let status = cmd
        .status()
        .expect("failed to spawn compiler for sandbox interceptor shim");
    if !status.success() {
        panic!("failed to compile sandbox interceptor shim: {status:?}");
    }

    println!(
        "cargo:rustc-env=HDF5_UDF_INTERCEPTOR_SO={}",
        out_so.display()
    );
}
