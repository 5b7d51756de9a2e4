//! Persisting generated units next to their source file

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("{} already exists (strict mode refuses to overwrite)", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// `<directory of source>/<unit name>.<extension>`
pub fn target_path(source: &Path, unit_name: &str, extension: &str) -> PathBuf {
    let directory = source.parent().unwrap_or_else(|| Path::new(""));
    directory.join(format!("{unit_name}.{extension}"))
}

/// Write `contents` to `path`, refusing to overwrite in strict mode
pub fn write_unit(path: &Path, contents: &str, strict: bool) -> Result<(), WriteError> {
    if strict && path.exists() {
        return Err(WriteError::AlreadyExists {
            path: path.to_path_buf(),
        });
    }
    atomic_write(path, contents).map_err(|source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), bytes = contents.len(), "wrote generated unit");
    Ok(())
}

/// Write through a sibling temp file and rename it into place
fn atomic_write(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("funclift.tmp");
    let result = write_synced(&temp_path, contents).and_then(|()| fs::rename(&temp_path, path));
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_synced(path: &Path, contents: &str) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()
}
