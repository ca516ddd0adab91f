#![doc = include_str!("../README.md")]

pub mod cli;
pub mod config;
pub mod error;
pub mod fs;
pub mod modfile;
pub mod ops;

pub use error::*;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn run() -> Result<()> {
    use clap::Parser;
    use config::{Config, absolutize};
    use modfile::ModFile;
    use ops::Patcher;

    let cli = cli::Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level()))
        .format_timestamp(None)
        .init();

    let cwd = std::env::current_dir().map_err(|source| UselocalError::Path {
        path: ".".into(),
        source,
    })?;
    let config = Config::load(&cli.config_path())?;
    let root = match &cli.root {
        Some(root) => absolutize(&cwd, root),
        None => cwd,
    };
    let mode = cli.mode();

    log::debug!("Scanning {} in {} mode", root.display(), mode);
    let mut fs = fs::RealFs;
    let summary = Patcher::new(&mut fs, &config, mode)
        .dry_run(cli.dry_run)
        .run::<ModFile>(&root)?;

    summary.print(&root, mode, cli.dry_run);
    Ok(())
}
