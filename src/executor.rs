//! The run-time orchestrator (spec.md §4.7): decompress the blob,
//! materialize the shared object on disk, create a shared region for every
//! dataset the UDF touches, fork, re-exec the child as a worker process (see
//! `crate::worker`), and copy the result out in the parent.
//!
//! State machine: `IDLE -> UNPACKED -> MATERIALIZED -> MAPPED -> FORKED ->
//! JOINED -> COPIED -> CLEANED -> IDLE`. A terminal error at any stage
//! unwinds the resources acquired so far in reverse order; this is modeled
//! directly by RAII (the temp file and the shared regions all clean up or
//! are abandoned in the right order as values go out of scope) rather than
//! by an explicit state enum.
//!
//! Every dataset, not just the output, is backed by a `memfd`-based
//! [`SharedRegion`] here rather than handed to the child as a raw pointer:
//! the worker process reaches its runtime tables only after re-exec'ing
//! itself (so the sandbox's `LD_PRELOAD`-resident path interceptor can take
//! effect — see `crate::sandbox::interceptor`), and a plain anonymous
//! mapping or a pointer into this process's heap would not survive that
//! `execve`.

use std::ffi::{c_char, c_void};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use nix::unistd::ForkResult;

use crate::codec::decompress;
use crate::dataset::DatasetDescriptor;
use crate::loader::LoadedObject;
use crate::sandbox::SandboxPolicy;
use crate::shared_region::SharedRegion;
use crate::worker::{self, WorkerDataset};

/// Runs one UDF invocation end to end.
///
/// Returns `true` on success (including the case where the child crashed or
/// was sandbox-killed: per spec.md §4.7/§7, the parent still copies whatever
/// landed in the shared region and reports success). Returns `false` only
/// for parent-side pre-run failures: a corrupt blob, or a failure to
/// allocate a shared region, fork, or re-exec.
///
/// `sandbox_enabled` controls whether the worker process installs the
/// sandbox before invoking the entry point (spec.md §4.7: "if sandboxing is
/// enabled at build"). Tests that don't need kernel seccomp support may
/// disable it.
pub fn run(
    policy: &SandboxPolicy,
    sandbox_enabled: bool,
    inputs: &[DatasetDescriptor],
    output: &mut DatasetDescriptor,
    artifact_blob: &[u8],
) -> bool {
    // IDLE -> UNPACKED
    let artifact_bytes = match decompress(artifact_blob) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::error!("failed to decompress UDF artifact: {e}");
            return false;
        }
    };

    // UNPACKED -> MATERIALIZED
    let so_path = match materialize(&artifact_bytes) {
        Ok(path) => path,
        Err(e) => {
            log::error!("failed to materialize UDF shared object: {e}");
            return false;
        }
    };
    let cleanup_so = ScopedUnlink(so_path.clone());

    // MATERIALIZED -> MAPPED. Index 0 is always the output dataset, matching
    // the ordering `crate::worker`'s environment-variable scheme and the
    // runtime tables both expect.
    let regions = match map_datasets(output, inputs) {
        Ok(r) => r,
        Err(e) => {
            log::error!("failed to map shared region: {e}");
            return false;
        }
    };

    // MAPPED -> FORKED
    match unsafe { nix::unistd::fork() } {
        Ok(ForkResult::Child) => {
            let err = worker::reexec_as_worker(&so_path, policy, sandbox_enabled, &regions);
            log::error!("worker re-exec failed: {err}");
            unsafe { libc::_exit(1) }
        }
        Ok(ForkResult::Parent { child }) => {
            // FORKED -> JOINED
            match nix::sys::wait::waitpid(child, None) {
                Ok(status) => log::debug!("UDF child {child} exited: {status:?}"),
                Err(e) => log::warn!("waitpid failed for UDF child {child}: {e}"),
            }

            // JOINED -> COPIED
            copy_out(&regions[0].region, output);

            // COPIED -> CLEANED (via `cleanup_so`/`regions`' Drop) -> IDLE
            drop(cleanup_so);
            drop(regions);
            true
        }
        Err(e) => {
            log::error!("fork failed: {e}");
            false
        }
    }
}

/// Copies each dataset's bytes into a fresh `memfd`-backed region, in
/// `[output, inputs...]` order. Every region (including the output's) is
/// seeded with the caller's current buffer contents so the worker process
/// can read it after re-exec'ing away from this address space.
fn map_datasets(
    output: &DatasetDescriptor,
    inputs: &[DatasetDescriptor],
) -> std::io::Result<Vec<WorkerDataset>> {
    let mut regions = Vec::with_capacity(inputs.len() + 1);
    for dataset in std::iter::once(output).chain(inputs.iter()) {
        let room = dataset.buffer_len();
        let mut region = SharedRegion::create(room).map_err(|e| std::io::Error::other(e.to_string()))?;
        unsafe {
            std::ptr::copy_nonoverlapping(dataset.data, region.as_mut_ptr(), room);
        }
        let descriptor = DatasetDescriptor::new(
            dataset.name.clone(),
            dataset.dtype,
            dataset.dimensions.clone(),
            region.as_mut_ptr(),
        );
        regions.push(WorkerDataset { descriptor, region });
    }
    Ok(regions)
}

struct ScopedUnlink(PathBuf);

impl Drop for ScopedUnlink {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.0);
    }
}

fn materialize(bytes: &[u8]) -> std::io::Result<PathBuf> {
    let mut tmp = tempfile::Builder::new()
        .prefix("hdf5-udf-")
        .suffix(".so")
        .tempfile()?;
    std::io::Write::write_all(&mut tmp, bytes)?;
    let (_, path) = tmp
        .keep()
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

/// Copies the full `room` bytes from the shared region into the caller's
/// output buffer. Runs regardless of how the child exited: a killed or
/// crashed child leaves the region in an undefined, possibly zero-filled
/// state, and spec.md's failure semantics call for copying it anyway.
fn copy_out(region: &SharedRegion, output: &mut DatasetDescriptor) {
    let room = output.buffer_len();
    debug_assert_eq!(room, region.len());
    unsafe {
        std::ptr::copy_nonoverlapping(region.as_ptr(), output.data, room);
    }
}

/// Raw pointers into the loaded object's runtime tables. Populated in the
/// order `[output, inputs...]`, in sync across all four tables (spec.md §3,
/// §4.7).
pub(crate) struct RuntimeTables {
    pointers: *mut *mut c_void,
    names: *mut *const c_char,
    type_tags: *mut *const c_char,
    dimensions: *mut *mut usize,
    dimension_counts: *mut usize,
    capacity: usize,
}

pub(crate) fn resolve_tables(library: &LoadedObject) -> Option<RuntimeTables> {
    unsafe {
        let pointers = library.symbol::<*mut *mut c_void>("udf_data_pointers")?;
        let names = library.symbol::<*mut *const c_char>("udf_dataset_names")?;
        let type_tags = library.symbol::<*mut *const c_char>("udf_type_tags")?;
        let dimensions = library.symbol::<*mut *mut usize>("udf_dimensions")?;
        let dimension_counts = library.symbol::<*mut usize>("udf_dimension_counts")?;
        let capacity = library.symbol::<*const usize>("udf_table_capacity")?;
        Some(RuntimeTables {
            pointers: *pointers,
            names: *names,
            type_tags: *type_tags,
            dimensions: *dimensions,
            dimension_counts: *dimension_counts,
            capacity: **capacity,
        })
    }
}

/// Leaks every `CString`/`Vec` backing the table entries for the remaining
/// lifetime of the worker process — the UDF reads through these pointers for
/// as long as it runs, which is the entire remaining lifetime of this
/// process.
pub(crate) fn populate_tables(
    tables: &RuntimeTables,
    output: &DatasetDescriptor,
    inputs: &[&DatasetDescriptor],
) {
    let all = std::iter::once(output).chain(inputs.iter().copied());
    for (index, dataset) in all.enumerate() {
        if index >= tables.capacity {
            log::warn!(
                "UDF runtime tables have capacity {} but {} datasets were supplied; truncating",
                tables.capacity,
                inputs.len() + 1
            );
            break;
        }

        let name = Box::leak(Box::new(dataset.name_cstring()));
        let tag = Box::leak(Box::new(dataset.dtype.tag_cstring()));
        let dims: &'static [usize] = Vec::leak(dataset.dimensions.clone());

        unsafe {
            *tables.pointers.add(index) = dataset.data as *mut c_void;
            *tables.names.add(index) = name.as_ptr();
            *tables.type_tags.add(index) = tag.as_ptr();
            *tables.dimensions.add(index) = dims.as_ptr() as *mut usize;
            *tables.dimension_counts.add(index) = dims.len();
        }
    }
}
