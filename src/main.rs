//! Binary entry point for `uselocal`.

use std::process;

fn main() {
    if let Err(e) = uselocal::run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
