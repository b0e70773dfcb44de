//! Persistence of captured task output and creation of the output directory.

use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;

use crate::error::FilesystemError;

/// Create `path` and any missing parents.
///
/// # Errors
///
/// Returns a `FilesystemError` when the directory cannot be created.
pub fn ensure_directory(path: &Utf8Path) -> Result<(), FilesystemError> {
    Dir::create_ambient_dir_all(path, ambient_authority())
        .map_err(|error| FilesystemError::from_io(path.as_std_path(), &error))
}

/// Write `output` to `log_path`, replacing any previous contents.
///
/// Missing parent directories are created first.
///
/// # Errors
///
/// Returns a `FilesystemError` when the path does not name a file or the
/// directory or file cannot be written.
pub fn write_output_log(log_path: &Utf8Path, output: &[u8]) -> Result<(), FilesystemError> {
    let file_name = log_path
        .file_name()
        .ok_or_else(|| FilesystemError::IoError {
            path: log_path.as_std_path().to_path_buf(),
            message: String::from("log path does not name a file"),
        })?;
    let parent = log_path
        .parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));

    ensure_directory(parent)?;
    let dir = Dir::open_ambient_dir(parent, ambient_authority())
        .map_err(|error| FilesystemError::from_io(parent.as_std_path(), &error))?;
    dir.write(file_name, output)
        .map_err(|error| FilesystemError::from_io(log_path.as_std_path(), &error))
}
