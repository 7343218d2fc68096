//! Compile driver: assembles UDF source with the runtime template, invokes
//! the system compiler, and packs the resulting shared object into a
//! compressed blob (spec.md §4.4).

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::assemble::assemble;
use crate::codec::compress;
use crate::error::{Result, UdfError};
use crate::linux::process::run_and_wait;

const PLACEHOLDER_TOKEN: &str = "%%USERCODE%%";
const SOURCE_EXTENSION: &str = "cpp";

pub(crate) fn resolve_compiler() -> OsString {
    std::env::var_os("CXX").unwrap_or_else(|| OsString::from("c++"))
}

/// Compiles `udf_source_path` against `template_path`, returning the
/// compressed shared object on success.
///
/// Returns an empty result only via the `Err` path — per spec.md §7, a pack
/// failure is surfaced as an error; callers embedding into a container file
/// must treat any `Err` as "do not embed".
pub fn compile(udf_source_path: &Path, template_path: &Path) -> Result<Vec<u8>> {
    let assembled_path = assemble(
        udf_source_path,
        template_path,
        PLACEHOLDER_TOKEN,
        SOURCE_EXTENSION,
    )?;

    // Deriving the output path from the (already per-call-unique) assembled
    // source path rather than from `udf_source_path` itself keeps the
    // collision-freedom spec.md §9 calls for: two concurrent packs of the
    // same UDF source never share a `.so` path.
    let output_path = assembled_path.with_extension("so");

    let result = run_compiler(&assembled_path, &output_path);

    // The compiler's exit status is advisory; presence of the output file on
    // disk is authoritative (spec.md §4.4).
    let outcome = match result {
        Ok(status) => {
            log::debug!("compiler exit status for {assembled_path:?}: {status:?}");
            finish(&assembled_path, &output_path)
        }
        Err(e) => {
            log::error!("failed to spawn compiler: {e}");
            Err(UdfError::Compile(format!("failed to spawn compiler: {e}")))
        }
    };

    if outcome.is_err() {
        let _ = fs::remove_file(&assembled_path);
        let _ = fs::remove_file(&output_path);
    }

    outcome
}

fn run_compiler(assembled_path: &Path, output_path: &Path) -> std::io::Result<std::process::ExitStatus> {
    let compiler = resolve_compiler();
    let args: Vec<OsString> = vec![
        assembled_path.as_os_str().to_owned(),
        OsString::from("-shared"),
        OsString::from("-fPIC"),
        OsString::from("-flto"),
        OsString::from("-Os"),
        OsString::from("-o"),
        output_path.as_os_str().to_owned(),
    ];
    run_and_wait(&compiler, &args)
}

fn finish(assembled_path: &Path, output_path: &Path) -> Result<Vec<u8>> {
    if !output_path.exists() {
        return Err(UdfError::Compile(format!(
            "compiler produced no output at {output_path:?}"
        )));
    }

    let bytes = fs::read(output_path)
        .map_err(|e| UdfError::Compile(format!("could not read compiled object: {e}")))?;

    let _ = fs::remove_file(output_path);
    let _ = fs::remove_file(assembled_path);

    compress(&bytes)
}

/// Path to the bundled default UDF runtime template.
pub fn default_template_path() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/udf_template.cpp"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_template_exists() {
        assert!(default_template_path().exists());
    }
}
