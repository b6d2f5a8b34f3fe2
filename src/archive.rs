// Persisting and unpacking the inference response.
//
// The response body is kept next to the result directory as
// `<result_dir>.zip` so a failed extraction still leaves the raw bytes on
// disk for inspection.

use crate::error::{FlorenceError, Result};
use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::debug;
use zip::ZipArchive;

/// `out/result` -> `out/result.zip`
pub fn archive_path(result_dir: &Path) -> PathBuf {
    let mut name = OsString::from(result_dir.as_os_str());
    name.push(".zip");
    PathBuf::from(name)
}

/// Writes `body` to `<result_dir>.zip`, extracts it into `result_dir` and
/// returns the sorted names found in `result_dir` afterwards.
pub fn save_and_extract(body: &[u8], result_dir: &Path) -> Result<Vec<String>> {
    let zip_path = archive_path(result_dir);
    fs::write(&zip_path, body).map_err(|e| FlorenceError::io("write", &zip_path, e))?;
    debug!(path = %zip_path.display(), bytes = body.len(), "saved response archive");

    extract(&zip_path, result_dir)?;
    list_dir(result_dir)
}

pub fn extract(zip_path: &Path, result_dir: &Path) -> Result<()> {
    let file = File::open(zip_path).map_err(|e| FlorenceError::io("open", zip_path, e))?;
    let mut archive = ZipArchive::new(file)?;
    debug!(entries = archive.len(), dir = %result_dir.display(), "extracting");
    archive.extract(result_dir)?;
    Ok(())
}

pub fn list_dir(dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir).map_err(|e| FlorenceError::io("list", dir, e))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| FlorenceError::io("list", dir, e))?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}
