//! Loading and resolving `.uselocal.yaml`.
//!
//! ```yaml
//! targets:
//!   - ./serviceA
//! replace:
//!   - from: example.com/lib
//!     to: ../lib-local
//! ```
//!
//! Relative paths are made absolute against the working directory at load
//! time. Replacement paths must be absolute because go.mod resolves relative
//! ones against each manifest's own directory.

use crate::error::{Result, UselocalError};
use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Config file used when neither `--config` nor [`CONFIG_ENV`] is given.
pub const DEFAULT_CONFIG: &str = "./.uselocal.yaml";

/// Environment variable naming an alternate config file.
pub const CONFIG_ENV: &str = "USELOCAL";

/// Resolved configuration for one run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Directories whose `go.mod` is in scope, as written in the file.
    #[serde(default)]
    pub targets: Vec<PathBuf>,

    /// Replace directives to add or drop, in order.
    #[serde(default)]
    pub replace: Vec<ReplaceRule>,

    #[serde(skip)]
    target_set: HashSet<PathBuf>,
}

/// A single `from => to` redirection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReplaceRule {
    /// Module path to redirect.
    pub from: String,
    /// Local directory; absolute once the config is resolved.
    pub to: PathBuf,
}

impl Config {
    /// Reads the YAML file at `path` and resolves it against the current
    /// working directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| UselocalError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        let cwd = env::current_dir().map_err(|source| UselocalError::Path {
            path: PathBuf::from("."),
            source,
        })?;

        let config =
            Self::from_yaml(&text, &cwd).map_err(|source| UselocalError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;

        log::debug!(
            "Loaded {} target(s) and {} replace rule(s) from {}",
            config.targets.len(),
            config.replace.len(),
            path.display()
        );
        Ok(config)
    }

    /// Parses YAML text and resolves every path against `base`, which must be
    /// absolute.
    pub fn from_yaml(text: &str, base: &Path) -> std::result::Result<Self, serde_yaml::Error> {
        let mut config: Config = serde_yaml::from_str(text)?;
        config.resolve(base);
        Ok(config)
    }

    fn resolve(&mut self, base: &Path) {
        self.target_set = self
            .targets
            .iter()
            .map(|target| absolutize(base, target))
            .collect();

        for rule in &mut self.replace {
            rule.to = absolutize(base, &rule.to);
        }
    }

    /// Reports whether `dir` is exactly one of the configured targets.
    ///
    /// No prefix or ancestor matching: a target of `/ws/a` does not cover
    /// `/ws/a/b`.
    pub fn has_target(&self, dir: &Path) -> bool {
        self.target_set.contains(dir)
    }
}

/// Joins `path` onto `base` (unless already absolute) and cleans the result
/// lexically: `.` is dropped, `..` removes the previous component, and `..`
/// above the root stays at the root. Symlinks are not consulted.
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            Component::Normal(part) => out.push(part),
        }
    }
    out
}
