use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

/// Read a file to string, replacing invalid UTF-8 sequences with the replacement character.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn read_to_string_lossy(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Atomically write bytes to a file by writing to a temp file then renaming.
///
/// A reader sees either the old manifest/lockfile or the new one, never a
/// truncated document.
///
/// # Errors
/// Returns an error if the write or rename fails.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));

    // Same directory keeps the rename on one filesystem
    let mut temp_path = parent.to_path_buf();
    temp_path.push(format!(
        ".{}.pak.{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("file"),
        std::process::id()
    ));

    let written = write_synced(&temp_path, bytes);
    discard_on_error(&temp_path, written)?;

    match fs::rename(&temp_path, path) {
        Ok(()) => Ok(()),
        // Windows refuses to rename over an existing file
        Err(_) if cfg!(windows) => {
            let copied = fs::copy(&temp_path, path).map(|_| ());
            let _ = fs::remove_file(&temp_path);
            copied
        }
        Err(e) => discard_on_error(&temp_path, Err(e)),
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Remove `temp` when `result` is an error, then pass the result through.
fn discard_on_error<T>(temp: &Path, result: io::Result<T>) -> io::Result<T> {
    if result.is_err() {
        let _ = fs::remove_file(temp);
    }
    result
}

/// Move a file, falling back to copy + remove when `rename` crosses devices.
///
/// The destination's parent directory must already exist.
///
/// # Errors
/// Returns an error if neither the rename nor the copy succeeds.
pub fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    if from == to {
        return Ok(());
    }
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}
