//! Compile, pack, and sandbox-execute user-defined functions embedded in a
//! hierarchical scientific data file.
//!
//! This crate implements the UDF execution subsystem described by the host
//! format's virtual-dataset feature: at pack time, [`compile::compile`]
//! assembles a UDF's source with a runtime template and compiles it to a
//! compressed, embeddable blob; at read time, [`executor::run`] unpacks that
//! blob, wires it to input/output datasets through an anonymous shared
//! memory region, and executes it inside a two-layer sandbox
//! ([`sandbox`]). The host file-format driver, the CLI front-end that
//! creates container files, and the compression primitive's internals are
//! out of scope — this crate consumes a decompressed blob and dataset
//! buffers and hands back a boolean success, nothing more.
//!
//! This crate only supports Linux; the sandbox's seccomp-BPF layer and its
//! path-interceptor shim have no non-Linux equivalent in this design.

#![cfg(any(target_os = "linux", target_os = "android"))]

pub mod assemble;
pub mod codec;
pub mod compile;
pub mod dataset;
pub mod error;
pub mod executor;
pub mod loader;
mod linux;
pub mod sandbox;
pub mod scanner;
pub mod shared_region;
mod worker;

pub use codec::{compress, decompress};
pub use compile::{compile as compile_udf, default_template_path};
pub use dataset::{DataType, DatasetDescriptor};
pub use error::{Result, UdfError};
pub use executor::run as run_udf;
pub use sandbox::SandboxPolicy;
pub use scanner::scan as scan_dataset_references;
