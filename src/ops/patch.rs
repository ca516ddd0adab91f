//! Tree walk and per-manifest read-modify-write.
//!
//! The walk is depth-first and fail-fast: the first error aborts the run and
//! manifests already written stay written. A manifest is patched only when
//! its containing directory is exactly one of the configured targets.

use super::Manifest;
use crate::config::Config;
use crate::error::{ManifestError, Result, UselocalError};
use crate::fs::FileSystem;
use colored::Colorize;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};

/// Whether a run adds or drops the configured replace directives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Add,
    Drop,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Add => f.write_str("add"),
            Mode::Drop => f.write_str("drop"),
        }
    }
}

/// A manifest the patcher rewrote (or would have, in a dry run).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchedManifest {
    pub path: PathBuf,
    /// Formatted output differs from what was on disk.
    pub changed: bool,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    /// Manifests in traversal order.
    pub manifests: Vec<PatchedManifest>,
}

impl Summary {
    pub fn changed(&self) -> usize {
        self.manifests.iter().filter(|m| m.changed).count()
    }

    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }

    /// Prints one status line per manifest, paths relative to `root`.
    pub fn print(&self, root: &Path, mode: Mode, dry_run: bool) {
        if self.is_empty() {
            println!("\n{}", "No target manifests found".yellow());
            return;
        }

        for manifest in &self.manifests {
            let shown = pathdiff::diff_paths(&manifest.path, root)
                .unwrap_or_else(|| manifest.path.clone());
            let status = match (manifest.changed, dry_run) {
                (false, _) => "Unchanged".dimmed(),
                (true, true) => "Would update".blue().bold(),
                (true, false) => "Patched".green().bold(),
            };
            println!("{:>12} {}", status, shown.display());
        }

        let verb = if dry_run { "Checked" } else { "Finished" };
        println!(
            "{:>12} {} mode: {} manifest(s), {} changed",
            verb.green().bold(),
            mode,
            self.manifests.len(),
            self.changed()
        );
    }
}

/// Applies a [`Config`] to every in-scope manifest under a root directory.
pub struct Patcher<'a, F: FileSystem> {
    fs: &'a mut F,
    config: &'a Config,
    mode: Mode,
    dry_run: bool,
}

impl<'a, F: FileSystem> Patcher<'a, F> {
    pub fn new(fs: &'a mut F, config: &'a Config, mode: Mode) -> Self {
        Self {
            fs,
            config,
            mode,
            dry_run: false,
        }
    }

    /// Edit and format manifests but never write them.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Walks `root` depth-first and patches every manifest of type `M` whose
    /// directory is a target.
    pub fn run<M: Manifest>(&mut self, root: &Path) -> Result<Summary> {
        let mut summary = Summary::default();
        self.walk::<M>(root, &mut summary)?;
        log::debug!(
            "Walk of {} finished: {} manifest(s), {} changed",
            root.display(),
            summary.manifests.len(),
            summary.changed()
        );
        Ok(summary)
    }

    fn walk<M: Manifest>(&mut self, dir: &Path, summary: &mut Summary) -> Result<()> {
        let entries = self
            .fs
            .read_dir(dir)
            .map_err(|source| UselocalError::Traversal {
                path: dir.to_path_buf(),
                source,
            })?;

        for entry in entries {
            if entry.is_dir {
                self.walk::<M>(&entry.path, summary)?;
                continue;
            }
            if entry.path.file_name() != Some(OsStr::new(M::FILE_NAME)) {
                continue;
            }
            if !self.config.has_target(dir) {
                log::debug!("Skipping {} (not a target)", entry.path.display());
                continue;
            }

            let changed = self.patch_manifest::<M>(&entry.path)?;
            summary.manifests.push(PatchedManifest {
                path: entry.path,
                changed,
            });
        }

        Ok(())
    }

    /// Reads, edits, formats and rewrites one manifest. Returns whether the
    /// content changed.
    fn patch_manifest<M: Manifest>(&mut self, path: &Path) -> Result<bool> {
        let edit_error = |source: ManifestError| UselocalError::ManifestEdit {
            path: path.to_path_buf(),
            source,
        };

        let (original, perms) =
            self.fs
                .read(path)
                .map_err(|source| UselocalError::ManifestRead {
                    path: path.to_path_buf(),
                    source,
                })?;

        let mut manifest = M::parse(&original).map_err(|source| UselocalError::ManifestParse {
            path: path.to_path_buf(),
            source,
        })?;

        for rule in &self.config.replace {
            match self.mode {
                Mode::Add => {
                    let to = rule.to.to_str().ok_or_else(|| {
                        edit_error(ManifestError::Edit(format!(
                            "replacement path for {} is not valid UTF-8: {}",
                            rule.from,
                            rule.to.display()
                        )))
                    })?;
                    manifest.add_replace(&rule.from, to).map_err(edit_error)?;
                }
                Mode::Drop => {
                    if !manifest.drop_replace(&rule.from).map_err(edit_error)? {
                        log::debug!("No replace for {} in {}", rule.from, path.display());
                    }
                }
            }
        }

        manifest.cleanup();
        let formatted = manifest
            .format()
            .map_err(|source| UselocalError::ManifestFormat {
                path: path.to_path_buf(),
                source,
            })?;
        let changed = formatted != original;

        if self.dry_run {
            if changed {
                log::info!("Would update: {}", path.display());
            }
            return Ok(changed);
        }

        self.fs
            .write(path, &formatted, perms)
            .map_err(|source| UselocalError::Write {
                path: path.to_path_buf(),
                source,
            })?;

        if changed {
            log::info!("Patched ({}): {}", self.mode, path.display());
        } else {
            log::debug!("Rewrote unchanged: {}", path.display());
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FilePerms, MemoryFs};
    use crate::modfile::ModFile;

    /// Line-based stand-in: a header line followed by `from => to` lines.
    #[derive(Debug)]
    struct FakeManifest {
        header: String,
        replaces: Vec<(String, String)>,
    }

    impl Manifest for FakeManifest {
        const FILE_NAME: &'static str = "fake.mod";

        fn parse(data: &[u8]) -> std::result::Result<Self, ManifestError> {
            let text = String::from_utf8_lossy(data);
            if text.contains("!!") {
                return Err(ManifestError::Syntax {
                    line: 1,
                    message: "bang".to_string(),
                });
            }
            let mut lines = text.lines();
            let header = lines.next().unwrap_or_default().to_string();
            let replaces = lines
                .filter_map(|l| l.split_once(" => "))
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .collect();
            Ok(Self { header, replaces })
        }

        fn add_replace(&mut self, from: &str, to: &str) -> std::result::Result<(), ManifestError> {
            match self.replaces.iter_mut().find(|(f, _)| f == from) {
                Some(existing) => existing.1 = to.to_string(),
                None => self.replaces.push((from.to_string(), to.to_string())),
            }
            Ok(())
        }

        fn drop_replace(&mut self, from: &str) -> std::result::Result<bool, ManifestError> {
            let before = self.replaces.len();
            self.replaces.retain(|(f, _)| f != from);
            Ok(before != self.replaces.len())
        }

        fn cleanup(&mut self) {}

        fn format(&self) -> std::result::Result<Vec<u8>, ManifestError> {
            let mut out = format!("{}\n", self.header);
            for (from, to) in &self.replaces {
                out.push_str(&format!("{from} => {to}\n"));
            }
            Ok(out.into_bytes())
        }
    }

    fn config(yaml: &str) -> Config {
        Config::from_yaml(yaml, Path::new("/ws")).unwrap()
    }

    fn text(fs: &MemoryFs, path: &str) -> String {
        String::from_utf8(fs.contents(path).unwrap().to_vec()).unwrap()
    }

    const RULES: &str = "replace:\n  - from: lib\n    to: ../lib-local\n";

    #[test]
    fn test_only_exact_targets_are_patched() {
        let mut fs = MemoryFs::new();
        fs.add_file("/ws/fake.mod", "root\n");
        fs.add_file("/ws/a/fake.mod", "a\n");
        fs.add_file("/ws/a/sub/fake.mod", "a-sub\n");
        fs.add_file("/ws/b/fake.mod", "b\n");
        fs.add_file("/ws/a/notes.txt", "!!\n");

        let config = config(&format!("targets: [./a]\n{RULES}"));
        let summary = Patcher::new(&mut fs, &config, Mode::Add)
            .run::<FakeManifest>(Path::new("/ws"))
            .unwrap();

        assert_eq!(
            summary.manifests,
            vec![PatchedManifest {
                path: PathBuf::from("/ws/a/fake.mod"),
                changed: true,
            }]
        );
        assert_eq!(text(&fs, "/ws/a/fake.mod"), "a\nlib => /lib-local\n");
        assert_eq!(text(&fs, "/ws/fake.mod"), "root\n");
        assert_eq!(text(&fs, "/ws/a/sub/fake.mod"), "a-sub\n");
        assert_eq!(text(&fs, "/ws/b/fake.mod"), "b\n");
        assert_eq!(fs.writes(), [PathBuf::from("/ws/a/fake.mod")]);
    }

    #[test]
    fn test_nested_targets_are_found() {
        let mut fs = MemoryFs::new();
        fs.add_file("/ws/services/api/fake.mod", "api\n");
        fs.add_file("/ws/services/web/fake.mod", "web\n");

        let config = config(&format!(
            "targets: [services/api, ./services/web/]\n{RULES}"
        ));
        let summary = Patcher::new(&mut fs, &config, Mode::Add)
            .run::<FakeManifest>(Path::new("/ws"))
            .unwrap();

        assert_eq!(summary.manifests.len(), 2);
        assert_eq!(text(&fs, "/ws/services/api/fake.mod"), "api\nlib => /lib-local\n");
        assert_eq!(text(&fs, "/ws/services/web/fake.mod"), "web\nlib => /lib-local\n");
    }

    #[test]
    fn test_drop_mode_removes_rules() {
        let mut fs = MemoryFs::new();
        fs.add_file("/ws/a/fake.mod", "a\nlib => /lib-local\nother => /o\n");

        let config = config(&format!("targets: [a]\n{RULES}"));
        Patcher::new(&mut fs, &config, Mode::Drop)
            .run::<FakeManifest>(Path::new("/ws"))
            .unwrap();
        assert_eq!(text(&fs, "/ws/a/fake.mod"), "a\nother => /o\n");

        let summary = Patcher::new(&mut fs, &config, Mode::Drop)
            .run::<FakeManifest>(Path::new("/ws"))
            .unwrap();
        assert_eq!(text(&fs, "/ws/a/fake.mod"), "a\nother => /o\n");
        assert_eq!(summary.changed(), 0);
    }

    #[test]
    fn test_parse_error_stops_the_walk() {
        let mut fs = MemoryFs::new();
        fs.add_file("/ws/a/fake.mod", "a\n");
        fs.add_file("/ws/b/fake.mod", "!!\n");
        fs.add_file("/ws/c/fake.mod", "c\n");

        let config = config(&format!("targets: [a, b, c]\n{RULES}"));
        let err = Patcher::new(&mut fs, &config, Mode::Add)
            .run::<FakeManifest>(Path::new("/ws"))
            .unwrap_err();

        match err {
            UselocalError::ManifestParse { path, .. } => {
                assert_eq!(path, PathBuf::from("/ws/b/fake.mod"))
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fs.writes(), [PathBuf::from("/ws/a/fake.mod")]);
        assert_eq!(text(&fs, "/ws/a/fake.mod"), "a\nlib => /lib-local\n");
        assert_eq!(text(&fs, "/ws/c/fake.mod"), "c\n");
    }

    #[test]
    fn test_listing_error_stops_the_walk() {
        let mut fs = MemoryFs::new();
        fs.add_file("/ws/a/fake.mod", "a\n");
        fs.add_file("/ws/b/locked/fake.mod", "locked\n");
        fs.add_file("/ws/c/fake.mod", "c\n");
        fs.deny_listing("/ws/b/locked");

        let config = config(&format!("targets: [a, c]\n{RULES}"));
        let err = Patcher::new(&mut fs, &config, Mode::Add)
            .run::<FakeManifest>(Path::new("/ws"))
            .unwrap_err();

        assert!(matches!(err, UselocalError::Traversal { .. }), "{err}");
        assert_eq!(fs.writes(), [PathBuf::from("/ws/a/fake.mod")]);
    }

    #[test]
    fn test_missing_root_is_a_traversal_error() {
        let mut fs = MemoryFs::new();
        let config = config("targets: [a]\n");
        let err = Patcher::new(&mut fs, &config, Mode::Add)
            .run::<FakeManifest>(Path::new("/nowhere"))
            .unwrap_err();
        assert!(matches!(err, UselocalError::Traversal { .. }));
    }

    #[test]
    fn test_write_error_is_reported() {
        let mut fs = MemoryFs::new();
        fs.add_file_with_perms("/ws/a/fake.mod", "a\n", FilePerms(0o444));

        let config = config(&format!("targets: [a]\n{RULES}"));
        let err = Patcher::new(&mut fs, &config, Mode::Add)
            .run::<FakeManifest>(Path::new("/ws"))
            .unwrap_err();
        assert!(matches!(err, UselocalError::Write { .. }), "{err}");
    }

    #[test]
    fn test_permissions_are_kept() {
        let mut fs = MemoryFs::new();
        fs.add_file_with_perms("/ws/a/fake.mod", "a\n", FilePerms(0o600));

        let config = config(&format!("targets: [a]\n{RULES}"));
        Patcher::new(&mut fs, &config, Mode::Add)
            .run::<FakeManifest>(Path::new("/ws"))
            .unwrap();
        assert_eq!(fs.perms("/ws/a/fake.mod"), Some(FilePerms(0o600)));
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let mut fs = MemoryFs::new();
        fs.add_file("/ws/a/fake.mod", "a\n");

        let config = config(&format!("targets: [a]\n{RULES}"));
        let summary = Patcher::new(&mut fs, &config, Mode::Add)
            .dry_run(true)
            .run::<FakeManifest>(Path::new("/ws"))
            .unwrap();

        assert_eq!(summary.changed(), 1);
        assert!(fs.writes().is_empty());
        assert_eq!(text(&fs, "/ws/a/fake.mod"), "a\n");
    }

    #[test]
    fn test_go_mod_add_then_drop() {
        let original = "module example.com/serviceA\n";
        let mut fs = MemoryFs::new();
        fs.add_file("/ws/serviceA/go.mod", original);

        let config = config(
            "targets: [./serviceA]\nreplace:\n  - from: example.com/lib\n    to: ../lib-local\n",
        );
        let expected_to = crate::config::absolutize(Path::new("/ws"), Path::new("../lib-local"));
        let expected = format!(
            "module example.com/serviceA\n\nreplace example.com/lib => {}\n",
            expected_to.display()
        );

        Patcher::new(&mut fs, &config, Mode::Add)
            .run::<ModFile>(Path::new("/ws"))
            .unwrap();
        assert_eq!(text(&fs, "/ws/serviceA/go.mod"), expected);

        Patcher::new(&mut fs, &config, Mode::Add)
            .run::<ModFile>(Path::new("/ws"))
            .unwrap();
        assert_eq!(text(&fs, "/ws/serviceA/go.mod"), expected);

        Patcher::new(&mut fs, &config, Mode::Drop)
            .run::<ModFile>(Path::new("/ws"))
            .unwrap();
        assert_eq!(text(&fs, "/ws/serviceA/go.mod"), original);
    }

    #[test]
    fn test_relative_target_is_the_same_everywhere() {
        let mut fs = MemoryFs::new();
        fs.add_file("/ws/a/go.mod", "module a\n");
        fs.add_file("/ws/deep/er/b/go.mod", "module b\n");

        let config = config(
            "targets: [a, deep/er/b]\nreplace:\n  - from: example.com/lib\n    to: ./lib\n",
        );
        Patcher::new(&mut fs, &config, Mode::Add)
            .run::<ModFile>(Path::new("/ws"))
            .unwrap();

        let a = ModFile::parse(fs.contents("/ws/a/go.mod").unwrap()).unwrap();
        let b = ModFile::parse(fs.contents("/ws/deep/er/b/go.mod").unwrap()).unwrap();
        assert_eq!(a.replaces(), b.replaces());
        assert_eq!(
            a.replaces()[0].new.path,
            Path::new("/ws").join("lib").to_str().unwrap()
        );
    }

    #[test]
    fn test_go_mod_parse_error_names_file() {
        let mut fs = MemoryFs::new();
        fs.add_file("/ws/a/go.mod", "module a\nbogus line\n");

        let config = config("targets: [a]\n");
        let err = Patcher::new(&mut fs, &config, Mode::Add)
            .run::<ModFile>(Path::new("/ws"))
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("go.mod"), "{message}");
        assert!(message.contains("line 2: unknown directive: bogus"), "{message}");
        assert!(fs.writes().is_empty());
    }
}
