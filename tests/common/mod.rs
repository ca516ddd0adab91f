use assert_cmd::cargo::cargo_bin_cmd;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const SERVICE_A: &str = "module example.com/serviceA\n\ngo 1.22\n";
pub const SERVICE_B: &str = "module example.com/serviceB\n\nrequire example.com/lib v1.0.0\n";

/// Workspace with two modules; only serviceA is listed as a target.
///
/// Returns the temp dir and its canonical path, which is what the child
/// process sees as its working directory.
#[allow(unused)]
pub fn create_test_workspace() -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    let root = temp.path().canonicalize().unwrap();

    write_file(&root.join("serviceA/go.mod"), SERVICE_A);
    write_file(&root.join("serviceB/go.mod"), SERVICE_B);
    write_config(
        &root,
        "targets:\n  - ./serviceA\nreplace:\n  - from: example.com/lib\n    to: ../lib-local\n",
    );

    (temp, root)
}

pub fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

#[allow(unused)]
pub fn write_config(root: &Path, yaml: &str) {
    write_file(&root.join(".uselocal.yaml"), yaml);
}

#[allow(unused)]
pub fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

/// Runs the binary in `root` with a clean environment.
pub fn run_uselocal(root: &Path, args: &[&str]) -> assert_cmd::assert::Assert {
    let mut cmd = cargo_bin_cmd!("uselocal");
    cmd.args(args)
        .current_dir(root)
        .env_remove("USELOCAL")
        .env_remove("RUST_LOG");

    cmd.assert()
}
