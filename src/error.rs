use std::path::PathBuf;

/// Errors surfaced by the pack-time and load-time halves of the UDF pipeline.
///
/// Run-time child failures are deliberately *not* represented here: per the
/// failure semantics of the executor, a crashed or sandboxed-killed child
/// communicates only through its exit code and the (possibly zero-filled)
/// shared region, never through this enum.
#[derive(Debug, thiserror::Error)]
pub enum UdfError {
    #[error("codec error: {0}")]
    Codec(String),

    #[error("assembly error: {0}")]
    Assembly(String),

    #[error("compile error: {0}")]
    Compile(String),

    #[error("failed to load shared object {path:?}: {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("failed to map shared region of {size} bytes: {reason}")]
    Map { size: usize, reason: String },

    #[error("fork failed: {0}")]
    Fork(String),

    #[error("failed to install sandbox: {0}")]
    Sandbox(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, UdfError>;
