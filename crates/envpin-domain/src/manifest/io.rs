use std::fs;
use std::io::{self, Write};
use std::path::Path;

use super::{Manifest, ManifestError};

pub fn read_manifest(path: &Path) -> Result<Manifest, ManifestError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(ManifestError::Missing {
                path: path.to_path_buf(),
            })
        }
        Err(source) => {
            return Err(ManifestError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    Manifest::parse(&contents, path)
}

pub fn write_manifest(manifest: &Manifest, path: &Path) -> Result<(), ManifestError> {
    let rendered = manifest.to_yaml()?;
    write_atomic(path, rendered.as_bytes()).map_err(|source| ManifestError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), bytes = rendered.len(), "manifest written");
    Ok(())
}

/// Replace `path` with `bytes` through a sibling temp file and a rename.
///
/// Readers observe either the old file or the new one. An existing file's
/// permissions carry over to the replacement.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("manifest");
    let mut temp = tempfile::Builder::new()
        .prefix(&format!(".{file_name}."))
        .suffix(".tmp")
        .tempfile_in(parent)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    if let Ok(meta) = fs::metadata(path) {
        temp.as_file().set_permissions(meta.permissions())?;
    }
    temp.persist(path).map_err(|err| err.error)?;
    Ok(())
}
