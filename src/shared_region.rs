//! A `memfd`-backed memory region: the sole channel the UDF worker process
//! uses to exchange dataset buffers with the executor (spec.md §4.2).
//!
//! A plain anonymous (`MAP_ANONYMOUS`) mapping only spans `fork` — it does
//! not survive `execve`, which tears down and replaces the entire address
//! space. Since the sandbox's path interceptor can only take effect across
//! a fresh `execve` (see `crate::sandbox`, `crate::worker`), every dataset
//! buffer a UDF touches is instead backed by `memfd_create`: the resulting
//! file descriptor, left without `MFD_CLOEXEC`, is inherited by a forked
//! child across `execve` and can be re-mapped there from the same fd number
//! (spec.md §9 "prefer an explicit shared-mapping primitive").

use std::ffi::CString;
use std::fs::File;
use std::os::fd::{AsRawFd, FromRawFd, RawFd};

use memmap2::MmapMut;

use crate::error::{Result, UdfError};

/// A flat, headerless mapping sized for one dataset's buffer.
pub struct SharedRegion {
    file: File,
    mmap: MmapMut,
}

impl SharedRegion {
    /// Allocates `size` bytes in a fresh anonymous, `memfd`-backed file and
    /// maps it `MAP_SHARED` read/write.
    pub fn create(size: usize) -> Result<Self> {
        let size = size.max(1);
        let name = CString::new("hdf5-udf-region").expect("literal has no interior NUL");
        let fd = unsafe { libc::memfd_create(name.as_ptr(), 0) };
        if fd < 0 {
            return Err(UdfError::Map {
                size,
                reason: std::io::Error::last_os_error().to_string(),
            });
        }
        let file = unsafe { File::from_raw_fd(fd) };
        file.set_len(size as u64).map_err(|e| UdfError::Map {
            size,
            reason: e.to_string(),
        })?;
        Self::from_file(file, size)
    }

    /// Re-maps a region created by [`Self::create`] in a previous process,
    /// given the `memfd`'s raw descriptor number as inherited across
    /// `execve` (the fd number is unchanged by `execve` as long as it was
    /// not opened with `MFD_CLOEXEC`, which `create` never sets).
    pub fn from_inherited_fd(fd: RawFd, size: usize) -> Result<Self> {
        let file = unsafe { File::from_raw_fd(fd) };
        Self::from_file(file, size)
    }

    fn from_file(file: File, size: usize) -> Result<Self> {
        let mmap = unsafe { MmapMut::map_mut(&file) }.map_err(|e| UdfError::Map {
            size,
            reason: e.to_string(),
        })?;
        Ok(Self { file, mmap })
    }

    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.mmap.as_ptr()
    }

    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.mmap.as_mut_ptr()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.mmap
    }

    /// The raw file descriptor backing this region. Valid for handing to a
    /// child about to `execve` (the fd must stay open, hence not closed,
    /// until after the child's `execve` succeeds).
    pub fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }

    /// Unmaps the region. Equivalent to dropping this value; kept as an
    /// explicit operation to mirror spec.md's `destroy()` naming.
    pub fn destroy(self) {
        drop(self);
    }
}
