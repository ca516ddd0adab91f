use crate::config::{CONFIG_ENV, DEFAULT_CONFIG};
use crate::ops::Mode;
use clap::{ArgAction, Parser};
use std::env;
use std::path::PathBuf;

/// Point go.mod replace directives at local checkouts, and take them out again.
///
/// Reads the targets and replace rules from `.uselocal.yaml` (or the file
/// named by $USELOCAL), then rewrites the go.mod of every target directory
/// found below ROOT.
#[derive(Parser, Debug)]
#[command(name = "uselocal", version, verbatim_doc_comment)]
pub struct Cli {
    /// Remove the configured replace directives instead of adding them
    #[arg(long)]
    pub drop: bool,

    /// Config file (overrides $USELOCAL; default ./.uselocal.yaml)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Show which go.mod files would change without writing them
    #[arg(long, short = 'n')]
    pub dry_run: bool,

    /// More log output (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(long, short = 'v', action = ArgAction::Count)]
    pub verbose: u8,

    /// Directory to scan (defaults to the current directory)
    #[arg(value_name = "ROOT")]
    pub root: Option<PathBuf>,
}

impl Cli {
    pub fn mode(&self) -> Mode {
        if self.drop { Mode::Drop } else { Mode::Add }
    }

    /// `--config`, then `$USELOCAL`, then `./.uselocal.yaml`.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG))
    }

    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["uselocal"]).unwrap();
        assert_eq!(cli.mode(), Mode::Add);
        assert!(!cli.dry_run);
        assert!(cli.root.is_none());
        assert_eq!(cli.log_level(), "warn");
    }

    #[test]
    fn test_flags() {
        let cli = Cli::try_parse_from([
            "uselocal", "--drop", "-n", "-vv", "--config", "alt.yaml", "services",
        ])
        .unwrap();
        assert_eq!(cli.mode(), Mode::Drop);
        assert!(cli.dry_run);
        assert_eq!(cli.log_level(), "debug");
        assert_eq!(cli.config_path(), PathBuf::from("alt.yaml"));
        assert_eq!(cli.root, Some(PathBuf::from("services")));
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        assert!(Cli::try_parse_from(["uselocal", "--frobnicate"]).is_err());
    }
}
