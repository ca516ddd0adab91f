//! File system access used by the patcher.
//!
//! The walk and the read-modify-write cycle only need three capabilities,
//! captured by [`FileSystem`]. [`RealFs`] talks to the disk; [`MemoryFs`]
//! keeps a tree in memory so traversal and scope rules can be exercised
//! without touching the disk.

pub mod memory;

pub use memory::MemoryFs;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Full path of the entry (directory joined with its name).
    pub path: PathBuf,
    /// `true` for directories. Symlinks are never reported as directories.
    pub is_dir: bool,
}

/// Unix permission bits of a file.
///
/// On platforms without mode bits only the read-only flag survives the
/// round trip (`0o444` vs `0o644`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilePerms(pub u32);

impl FilePerms {
    #[cfg(unix)]
    fn from_std(perms: &fs::Permissions) -> Self {
        use std::os::unix::fs::PermissionsExt;
        Self(perms.mode() & 0o7777)
    }

    #[cfg(not(unix))]
    fn from_std(perms: &fs::Permissions) -> Self {
        if perms.readonly() {
            Self(0o444)
        } else {
            Self(0o644)
        }
    }

    /// Sets the bits on `path` unless they already match `current`.
    ///
    /// Changing the mode requires owning the file, which a writable
    /// shared manifest does not imply.
    fn apply(self, path: &Path, current: FilePerms) -> io::Result<()> {
        if self == current {
            return Ok(());
        }
        self.set(path)
    }

    #[cfg(unix)]
    fn set(self, path: &Path) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(self.0))
    }

    #[cfg(not(unix))]
    fn set(self, path: &Path) -> io::Result<()> {
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_readonly(self.0 & 0o222 == 0);
        fs::set_permissions(path, perms)
    }
}

/// Capabilities the patcher needs from a file system.
pub trait FileSystem {
    /// Lists the entries of `dir`. Order is unspecified.
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<DirEntry>>;

    /// Reads a whole file together with its permission bits.
    fn read(&self, path: &Path) -> io::Result<(Vec<u8>, FilePerms)>;

    /// Overwrites an existing file and leaves it with `perms`.
    fn write(&mut self, path: &Path, contents: &[u8], perms: FilePerms) -> io::Result<()>;
}

/// The real file system.
///
/// Writes truncate in place. There is no temp-file-plus-rename, so a crash
/// mid-write can leave a partially written file.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl FileSystem for RealFs {
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            entries.push(DirEntry {
                path: entry.path(),
                is_dir: file_type.is_dir(),
            });
        }
        Ok(entries)
    }

    fn read(&self, path: &Path) -> io::Result<(Vec<u8>, FilePerms)> {
        let contents = fs::read(path)?;
        let perms = FilePerms::from_std(&fs::metadata(path)?.permissions());
        Ok((contents, perms))
    }

    fn write(&mut self, path: &Path, contents: &[u8], perms: FilePerms) -> io::Result<()> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(path)?;
        file.write_all(contents)?;
        file.flush()?;
        let current = FilePerms::from_std(&file.metadata()?.permissions());
        drop(file);
        perms.apply(path, current)
    }
}
