//! All-or-nothing file writes and absence-tolerant reads.

use std::{
  fs,
  io::{self, Write as _},
  path::{Path, PathBuf},
};

use crate::{Error, Result};

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> Error + '_ {
  move |source| Error::Io {
    path: path.to_path_buf(),
    source,
  }
}

/// The directory `path` lives in; `.` for bare file names.
fn parent_dir(path: &Path) -> PathBuf {
  match path.parent() {
    Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
    _ => PathBuf::from("."),
  }
}

/// Replace `destination` with `bytes`.
///
/// Missing parent directories are created. The bytes go to a temporary file
/// beside `destination`, are synced, and the file is renamed into place, so a
/// failure at any step leaves `destination` as it was.
pub(crate) fn write_atomic(destination: &Path, bytes: &[u8]) -> Result<()> {
  let dir = parent_dir(destination);
  fs::create_dir_all(&dir).map_err(io_error(&dir))?;

  let mut tmp = tempfile::Builder::new()
    .prefix(".marquee-")
    .suffix(".tmp")
    .tempfile_in(&dir)
    .map_err(io_error(&dir))?;
  tmp.write_all(bytes).map_err(io_error(tmp.path()))?;
  tmp.as_file().sync_all().map_err(io_error(destination))?;

  tmp
    .persist(destination)
    .map_err(|e| io_error(destination)(e.error))?;
  Ok(())
}

/// Read `source`, or `None` if it does not exist or is empty.
pub(crate) fn read_if_present(source: &Path) -> Result<Option<Vec<u8>>> {
  match fs::read(source) {
    Ok(bytes) if bytes.is_empty() => Ok(None),
    Ok(bytes) => Ok(Some(bytes)),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
    Err(e) => Err(io_error(source)(e)),
  }
}
