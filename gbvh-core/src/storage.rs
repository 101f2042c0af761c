use crate::container::decode_all;
use crate::error::{GbvhError, Result};
use crate::tree::AssembledTree;
use fs2::FileExt;
use memmap2::Mmap;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Read-only view of a container file on disk
#[derive(Debug)]
pub struct ContainerFile {
    /// File handle (owns the shared lock)
    #[allow(dead_code)]
    file: File,

    /// Mapped file contents; `None` for an empty file, which cannot be mapped
    mmap: Option<Mmap>,

    path: PathBuf,
}

impl ContainerFile {
    /// Opens a container file and maps it into memory
    ///
    /// A shared advisory lock is held for the lifetime of the value, so a
    /// concurrent `write_locked` on the same path fails instead of tearing
    /// the mapping.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be opened
    /// - The file is exclusively locked by another process
    /// - The file cannot be mapped
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let io_err = |e| GbvhError::io(path, e);

        let file = File::open(path).map_err(io_err)?;
        FileExt::try_lock_shared(&file).map_err(io_err)?;

        let len = file.metadata().map_err(io_err)?.len();
        let mmap = if len == 0 {
            None
        } else {
            // SAFETY: the mapping is read-only and the shared lock keeps
            // cooperating writers out while it is alive.
            Some(unsafe { Mmap::map(&file) }.map_err(io_err)?)
        };

        Ok(Self { file, mmap, path: path.to_owned() })
    }

    /// Raw container bytes
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }

    /// Path the container was opened from
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decodes every entry of the container
    ///
    /// # Errors
    ///
    /// Returns an error if the container is malformed; see
    /// [`decode_all`](crate::container::decode_all).
    pub fn decode(&self) -> Result<BTreeMap<u16, AssembledTree>> {
        decode_all(self.bytes())
    }
}

/// Writes `data` to `path`, replacing its contents, under an exclusive lock
///
/// The data is synced to disk before returning.
///
/// # Errors
///
/// Returns an error if the file cannot be created, locked, written or synced.
pub fn write_locked<P: AsRef<Path>>(path: P, data: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let io_err = |e| GbvhError::io(path, e);

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(io_err)?;

    // Lock before truncating so a reader never sees a half-written file
    FileExt::try_lock_exclusive(&file).map_err(io_err)?;
    file.set_len(0).map_err(io_err)?;
    file.write_all(data).map_err(io_err)?;
    file.sync_all().map_err(io_err)?;

    Ok(())
}
