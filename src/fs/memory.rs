use super::{DirEntry, FilePerms, FileSystem};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File { contents: Vec<u8>, perms: FilePerms },
}

/// In-memory directory tree.
///
/// Listings come back sorted by path, which makes traversal order
/// deterministic. Every successful write is recorded in [`MemoryFs::writes`].
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    nodes: BTreeMap<PathBuf, Node>,
    unreadable: BTreeSet<PathBuf>,
    writes: Vec<PathBuf>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates `dir` and all of its ancestors.
    pub fn add_dir(&mut self, dir: impl AsRef<Path>) {
        for ancestor in dir.as_ref().ancestors() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            self.nodes.entry(ancestor.to_path_buf()).or_insert(Node::Dir);
        }
    }

    /// Creates or replaces a file with mode `0o644`, creating parent
    /// directories as needed.
    pub fn add_file(&mut self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) {
        self.add_file_with_perms(path, contents, FilePerms(0o644));
    }

    pub fn add_file_with_perms(
        &mut self,
        path: impl AsRef<Path>,
        contents: impl Into<Vec<u8>>,
        perms: FilePerms,
    ) {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.add_dir(parent);
        }
        self.nodes.insert(
            path.to_path_buf(),
            Node::File {
                contents: contents.into(),
                perms,
            },
        );
    }

    /// Makes listing `dir` fail with `PermissionDenied`.
    pub fn deny_listing(&mut self, dir: impl AsRef<Path>) {
        self.unreadable.insert(dir.as_ref().to_path_buf());
    }

    /// Returns file contents, or `None` for directories and missing paths.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<&[u8]> {
        match self.nodes.get(path.as_ref()) {
            Some(Node::File { contents, .. }) => Some(contents.as_slice()),
            _ => None,
        }
    }

    pub fn perms(&self, path: impl AsRef<Path>) -> Option<FilePerms> {
        match self.nodes.get(path.as_ref()) {
            Some(Node::File { perms, .. }) => Some(*perms),
            _ => None,
        }
    }

    /// Paths written so far, in write order.
    pub fn writes(&self) -> &[PathBuf] {
        &self.writes
    }
}

impl FileSystem for MemoryFs {
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
        if self.unreadable.contains(dir) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("permission denied: {}", dir.display()),
            ));
        }
        match self.nodes.get(dir) {
            Some(Node::Dir) => {}
            Some(Node::File { .. }) => {
                return Err(io::Error::other(format!(
                    "not a directory: {}",
                    dir.display()
                )));
            }
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no such directory: {}", dir.display()),
                ));
            }
        }

        Ok(self
            .nodes
            .iter()
            .filter(|(path, _)| path.parent() == Some(dir))
            .map(|(path, node)| DirEntry {
                path: path.clone(),
                is_dir: matches!(node, Node::Dir),
            })
            .collect())
    }

    fn read(&self, path: &Path) -> io::Result<(Vec<u8>, FilePerms)> {
        match self.nodes.get(path) {
            Some(Node::File { contents, perms }) => Ok((contents.clone(), *perms)),
            Some(Node::Dir) => Err(io::Error::other(format!(
                "is a directory: {}",
                path.display()
            ))),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            )),
        }
    }

    fn write(&mut self, path: &Path, contents: &[u8], perms: FilePerms) -> io::Result<()> {
        match self.nodes.get_mut(path) {
            Some(Node::File {
                contents: existing,
                perms: existing_perms,
            }) => {
                if existing_perms.0 & 0o200 == 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::PermissionDenied,
                        format!("read-only file: {}", path.display()),
                    ));
                }
                *existing = contents.to_vec();
                *existing_perms = perms;
                self.writes.push(path.to_path_buf());
                Ok(())
            }
            Some(Node::Dir) => Err(io::Error::other(format!(
                "is a directory: {}",
                path.display()
            ))),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            )),
        }
    }
}
