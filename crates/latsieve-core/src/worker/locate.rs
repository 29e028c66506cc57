//! Locate external programs on `PATH` before a run starts.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::error::SieveError;

/// Resolve `program` to an executable path.
///
/// Names containing a path separator are checked as given; bare names are
/// searched in every `PATH` entry (with `.exe` appended on Windows).
pub fn resolve_program(program: &Path) -> Result<PathBuf, SieveError> {
    let not_found = || SieveError::SieverNotFound {
        name: program.display().to_string(),
    };
    if program.components().count() > 1 || program.is_absolute() {
        return if is_executable(program) {
            Ok(program.to_path_buf())
        } else {
            Err(not_found())
        };
    }
    let path_var = std::env::var_os("PATH").ok_or_else(not_found)?;
    std::env::split_paths(&path_var)
        .flat_map(|dir| candidates(&dir, program.as_os_str()))
        .find(|p| is_executable(p))
        .ok_or_else(not_found)
}

fn candidates(dir: &Path, name: &OsStr) -> Vec<PathBuf> {
    let plain = dir.join(name);
    if cfg!(windows) {
        vec![plain.with_extension("exe"), plain]
    } else {
        vec![plain]
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
