use std::path::{Path, PathBuf};

use crate::{Error, Result};

pub fn create_directory_for_file(p: &Path) -> Result {
    if let Some(parent_dir) = p.parent() {
        if parent_dir.as_os_str().is_empty() {
            return Ok(());
        }

        std::fs::create_dir_all(parent_dir).map_err(|e| {
            Error::Runtime(format!(
                "Failed to create output directory for file '{}' ({e})",
                p.to_string_lossy()
            ))
        })?;
    }

    Ok(())
}

/// Removes the file at `p`, a missing file is not an error.
pub fn remove_file_if_exists(p: &Path) -> Result {
    match std::fs::remove_file(p) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::IOError(e)),
    }
}

fn temporary_sibling(p: &Path) -> Result<PathBuf> {
    let file_name = p.file_name().ok_or_else(|| Error::InvalidPath(p.to_path_buf()))?;
    let mut tmp_name = std::ffi::OsString::from(".");
    tmp_name.push(file_name);
    tmp_name.push(".tmp");
    Ok(p.with_file_name(tmp_name))
}

/// Writes `contents` to a temporary file next to `p` and renames it into place.
/// Readers either see the previous file (or none) or the complete new contents.
pub fn write_atomically(p: &Path, contents: &[u8]) -> Result {
    create_directory_for_file(p)?;
    let tmp_path = temporary_sibling(p)?;

    if let Err(e) = std::fs::write(&tmp_path, contents) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(Error::IOError(e));
    }

    if let Err(e) = std::fs::rename(&tmp_path, p) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(Error::IOError(e));
    }

    log::debug!("Committed {}", p.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn atomic_write_replaces_contents() -> Result {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("nested").join("index.json");

        write_atomically(&path, b"first")?;
        write_atomically(&path, b"second")?;

        assert_eq!(std::fs::read(&path)?, b"second");
        assert!(!temporary_sibling(&path)?.exists());
        Ok(())
    }

    #[test]
    fn remove_missing_file() -> Result {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("index.json");
        remove_file_if_exists(&path)?;

        std::fs::write(&path, b"{}")?;
        remove_file_if_exists(&path)?;
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn directory_for_relative_file() -> Result {
        create_directory_for_file(Path::new("file.json"))
    }
}
