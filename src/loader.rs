//! Shared-object loader: a thin wrapper over `dlopen`/`dlsym`/`dlclose` via
//! `libloading`.
//!
//! Symbols are resolved with the library opened in the mode the runtime
//! template relies on: `RTLD_NOW | RTLD_GLOBAL`, so that the template's
//! runtime tables (exported from the UDF's own translation unit) are visible
//! for the dynamic linking spec.md §4.3 describes, and so a sandbox
//! interceptor opened earlier in the process can still interpose libc calls
//! the UDF makes (the dynamic linker's global symbol scope is searched in
//! load order).

use std::path::{Path, PathBuf};

use libloading::os::unix::Library as UnixLibrary;
pub use libloading::os::unix::Symbol;
use libloading::os::unix::{RTLD_GLOBAL, RTLD_NOW};

use crate::error::{Result, UdfError};

pub struct LoadedObject {
    library: UnixLibrary,
    path: PathBuf,
}

impl LoadedObject {
    /// Opens a file-backed shared object with global, eager symbol
    /// resolution.
    pub fn open(path: &Path) -> Result<Self> {
        let library =
            unsafe { UnixLibrary::open(Some(path), RTLD_NOW | RTLD_GLOBAL) }.map_err(|e| {
                UdfError::Load {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }
            })?;
        Ok(Self {
            library,
            path: path.to_path_buf(),
        })
    }

    /// Resolves `name`, returning `None` if the symbol is absent rather than
    /// erroring — callers decide whether a missing symbol is fatal.
    ///
    /// # Safety
    /// The caller must ensure `T` matches the true signature/type of the
    /// exported symbol.
    pub unsafe fn symbol<T>(&self, name: &str) -> Option<Symbol<T>> {
        self.library.get::<T>(name.as_bytes()).ok()
    }

    pub fn close(self) -> Result<()> {
        self.library.close().map_err(|e| UdfError::Load {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }
}
