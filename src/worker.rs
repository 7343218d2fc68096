//! The worker process: the re-exec'd half of a UDF invocation (spec.md
//! §4.6, §4.7, §9 "Pointer-aware syscall interception").
//!
//! `crate::executor::run` forks, then has the child re-exec the current
//! binary with `LD_PRELOAD` set to the materialized interceptor shim (see
//! `crate::sandbox::interceptor`) and a marker environment variable set.
//! That marker is read by an ELF `.init_array` constructor ([`WORKER_ENTRY`])
//! that runs before the re-exec'd binary's own `main` — before the embedding
//! host or test harness gets a chance to run anything else — and, if the
//! marker is present, takes over the process entirely via [`worker_main`],
//! never returning to the normal `main`.
//!
//! Every dataset the UDF touches (not just the output) is backed by a
//! `memfd`-backed [`SharedRegion`] rather than a plain heap buffer, because
//! it must survive the `execve` that makes `LD_PRELOAD` effective
//! (`crate::shared_region`). Its fd number and the dataset's metadata (name,
//! type tag, dimensions) cross the `execve` boundary as environment
//! variables, following the same colon-separated convention
//! `SandboxPolicy::from_env` already uses for its own extra-paths list.

use std::ffi::c_int;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::Command;

use crate::dataset::{DataType, DatasetDescriptor};
use crate::loader::LoadedObject;
use crate::sandbox::{self, SandboxPolicy};
use crate::shared_region::SharedRegion;

/// Presence marks a re-exec'd process as a worker; the `.init_array`
/// constructor checks for this before anything else runs.
const WORKER_MARKER_ENV: &str = "HDF5_UDF_WORKER";
const WORKER_SO_PATH_ENV: &str = "HDF5_UDF_WORKER_SO_PATH";
const WORKER_SANDBOX_ENABLED_ENV: &str = "HDF5_UDF_WORKER_SANDBOX_ENABLED";
const WORKER_DATASET_COUNT_ENV: &str = "HDF5_UDF_WORKER_DATASET_COUNT";

/// Per-dataset environment variables are indexed: `HDF5_UDF_WORKER_DATASET_0_NAME`,
/// `_TAG`, `_FD`, `_DIMS` (colon-separated), and so on for index 1, 2, ...
/// Index 0 is always the output dataset; indices 1.. are the inputs, in order
/// (the same `[output, inputs...]` ordering the runtime tables use).
fn dataset_env_var(index: usize, suffix: &str) -> String {
    format!("HDF5_UDF_WORKER_DATASET_{index}_{suffix}")
}

/// One dataset's worth of metadata plus the already-open `SharedRegion` fd
/// backing it, as assembled by the parent before re-exec.
pub(crate) struct WorkerDataset {
    pub descriptor: DatasetDescriptor,
    pub region: SharedRegion,
}

/// Re-execs the current binary as a worker process and never returns on
/// success — `Command::exec` replaces this process image in place. On
/// failure (the binary could not be located, or the kernel refused the
/// `execve`) it returns the `io::Error` so the caller can log it and exit
/// non-zero; there is no other way to report the failure, since the parent
/// is gone the moment `fork` returned in the child.
///
/// `datasets[0]` must be the output dataset; the rest are inputs, matching
/// the runtime table ordering `populate_tables` expects.
pub(crate) fn reexec_as_worker(
    so_path: &std::path::Path,
    policy: &SandboxPolicy,
    sandbox_enabled: bool,
    datasets: &[WorkerDataset],
) -> std::io::Error {
    let exe = match std::env::current_exe() {
        Ok(p) => p,
        Err(e) => return e,
    };

    let mut cmd = Command::new(exe);
    cmd.env(WORKER_MARKER_ENV, "1");
    cmd.env(WORKER_SO_PATH_ENV, so_path);
    cmd.env(WORKER_SANDBOX_ENABLED_ENV, if sandbox_enabled { "1" } else { "0" });
    cmd.env(WORKER_DATASET_COUNT_ENV, datasets.len().to_string());

    for (index, ds) in datasets.iter().enumerate() {
        cmd.env(dataset_env_var(index, "NAME"), &ds.descriptor.name);
        cmd.env(dataset_env_var(index, "TAG"), ds.descriptor.dtype.tag());
        cmd.env(dataset_env_var(index, "FD"), ds.region.as_raw_fd().to_string());
        let dims = ds
            .descriptor
            .dimensions
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(":");
        cmd.env(dataset_env_var(index, "DIMS"), dims);
    }

    if sandbox_enabled {
        match sandbox::materialize_interceptor() {
            Ok(shim_path) => {
                cmd.env("LD_PRELOAD", &shim_path);
                cmd.env(sandbox::ALLOWED_PATHS_ENV, policy.env_value());
            }
            Err(e) => {
                return std::io::Error::other(e.to_string());
            }
        }
    }

    // Only returns on error; a successful `execve` never comes back here.
    cmd.exec()
}

/// Runs ahead of this binary's own `main`, since `.init_array` entries run
/// during dynamic linker startup, before the C runtime calls `main`. If the
/// worker marker is absent, this is a plain library load (the normal
/// embedding host, or a test binary) and control returns to fall through to
/// the real `main` untouched.
#[used]
#[link_section = ".init_array"]
static WORKER_ENTRY: extern "C" fn() = worker_reentry_ctor;

extern "C" fn worker_reentry_ctor() {
    if std::env::var_os(WORKER_MARKER_ENV).is_none() {
        return;
    }
    let code = worker_main();
    unsafe { libc::_exit(code) };
}

/// The worker process's entire body: reconstruct its inputs from the
/// environment, install the sandbox (layer A; layer B is already resident
/// via `LD_PRELOAD`), load the UDF object, populate its runtime tables, and
/// call its entry point. Returns the process exit code.
fn worker_main() -> c_int {
    let Some(so_path) = std::env::var_os(WORKER_SO_PATH_ENV) else {
        log::error!("worker missing {WORKER_SO_PATH_ENV}");
        return 1;
    };
    let so_path = PathBuf::from(so_path);

    let sandbox_enabled = std::env::var(WORKER_SANDBOX_ENABLED_ENV)
        .map(|v| v == "1")
        .unwrap_or(false);

    let Some(count) = std::env::var(WORKER_DATASET_COUNT_ENV)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
    else {
        log::error!("worker missing or malformed {WORKER_DATASET_COUNT_ENV}");
        return 1;
    };

    let mut datasets = Vec::with_capacity(count);
    for index in 0..count {
        match read_dataset_env(index) {
            Some(ds) => datasets.push(ds),
            None => {
                log::error!("worker could not reconstruct dataset {index} from the environment");
                return 1;
            }
        }
    }
    let Some((output, inputs)) = datasets.split_first_mut() else {
        log::error!("worker received no datasets (expected at least an output)");
        return 1;
    };

    let library = match LoadedObject::open(&so_path) {
        Ok(l) => l,
        Err(e) => {
            log::error!("worker failed to load UDF object: {e}");
            return 1;
        }
    };

    let Some(tables) = crate::executor::resolve_tables(&library) else {
        log::error!("UDF object is missing one or more runtime tables");
        return 1;
    };

    let retargeted_output = DatasetDescriptor::new(
        output.descriptor.name.clone(),
        output.descriptor.dtype,
        output.descriptor.dimensions.clone(),
        output.region.as_mut_ptr(),
    );
    let input_descriptors = inputs.iter().map(|ds| &ds.descriptor).collect::<Vec<_>>();

    crate::executor::populate_tables(&tables, &retargeted_output, &input_descriptors);

    if sandbox_enabled {
        if let Err(e) = sandbox::init() {
            log::error!("worker failed to install sandbox: {e}");
            return 1;
        }
    }

    let Some(entry) = (unsafe { library.symbol::<unsafe extern "C" fn()>("udf_entry") }) else {
        log::error!("UDF object is missing its entry symbol");
        return 1;
    };

    unsafe { entry() };
    0
}

/// Reconstructs one dataset descriptor and its backing shared region from
/// the indexed environment variables `reexec_as_worker` set.
fn read_dataset_env(index: usize) -> Option<WorkerDataset> {
    let name = std::env::var(dataset_env_var(index, "NAME")).ok()?;
    let tag = std::env::var(dataset_env_var(index, "TAG")).ok()?;
    let dtype = DataType::from_tag(&tag)?;
    let fd: c_int = std::env::var(dataset_env_var(index, "FD")).ok()?.parse().ok()?;
    let dims_raw = std::env::var(dataset_env_var(index, "DIMS")).ok()?;
    let dimensions: Vec<usize> = dims_raw
        .split(':')
        .filter(|s| !s.is_empty())
        .map(|s| s.parse())
        .collect::<Result<_, _>>()
        .ok()?;

    let size = dimensions.iter().product::<usize>() * dtype.storage_size();
    let mut region = SharedRegion::from_inherited_fd(fd, size).ok()?;
    let descriptor = DatasetDescriptor::new(name, dtype, dimensions, region.as_mut_ptr());
    Some(WorkerDataset { descriptor, region })
}
