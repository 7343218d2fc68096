//! Assembly: splices UDF source text into a runtime template at a single
//! placeholder occurrence, producing one self-contained translation unit
//! (spec.md §3, §4.4).

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::Builder;

use crate::error::{Result, UdfError};

/// Reads `udf_source_path` and `template_path`, replaces the first (and only
/// permitted) occurrence of `placeholder_token` in the template with the UDF
/// text, and writes the result to a freshly named temporary file carrying
/// `extension`.
///
/// Fails with `UdfError::Assembly` if either file can't be read, if the
/// placeholder is absent, or if it appears more than once (spec.md requires
/// exactly one occurrence so that splicing is unambiguous).
pub fn assemble(
    udf_source_path: &Path,
    template_path: &Path,
    placeholder_token: &str,
    extension: &str,
) -> Result<PathBuf> {
    let udf_source = fs::read_to_string(udf_source_path).map_err(|e| {
        UdfError::Assembly(format!(
            "could not read UDF source {udf_source_path:?}: {e}"
        ))
    })?;
    let template = fs::read_to_string(template_path).map_err(|e| {
        UdfError::Assembly(format!("could not read template {template_path:?}: {e}"))
    })?;

    if udf_source.trim().is_empty() {
        return Err(UdfError::Assembly("UDF source is empty".to_string()));
    }

    let occurrences = template.matches(placeholder_token).count();
    if occurrences == 0 {
        return Err(UdfError::Assembly(format!(
            "placeholder {placeholder_token:?} not found in template {template_path:?}"
        )));
    }
    if occurrences > 1 {
        return Err(UdfError::Assembly(format!(
            "placeholder {placeholder_token:?} appears {occurrences} times in template {template_path:?}, expected exactly one"
        )));
    }

    let assembled = template.replacen(placeholder_token, &udf_source, 1);

    let named = Builder::new()
        .prefix("hdf5-udf-")
        .suffix(&format!(".{extension}"))
        .tempfile()
        .map_err(|e| UdfError::Assembly(format!("could not create temp file: {e}")))?;
    let (_, path) = named.keep().map_err(|e| {
        UdfError::Assembly(format!("could not persist assembled source: {e}"))
    })?;
    fs::write(&path, assembled).map_err(|e| {
        UdfError::Assembly(format!("could not write assembled source {path:?}: {e}"))
    })?;

    Ok(path)
}
