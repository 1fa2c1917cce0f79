//! fsync helpers for the config document.
//!
//! A rename only survives power loss once the parent directory has been
//! synced as well, so both calls are needed after every save.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

/// Flushes a file's contents and metadata to disk.
pub fn fsync_file(file: &File) -> io::Result<()> {
    file.sync_all()
}

/// Flushes a directory's entries to disk.
///
/// Callers must pass a directory; the path is opened read-only.
pub fn fsync_dir(dir_path: &Path) -> io::Result<()> {
    OpenOptions::new().read(true).open(dir_path)?.sync_all()
}
