//! Jersey CLI Binary
//!
//! Inspect and compare IP addresses, or print the effective configuration.

use jersey::cli::options::program_from_args;
use jersey::commands::builtin_plugins;
use jersey::{run_main, CommandRegistry, ConfigLoader, Options};
use std::process;
use std::sync::Arc;

fn main() {
    let program = program_from_args();

    let settings = match ConfigLoader::load(&program) {
        Ok(settings) => Arc::new(settings),
        Err(e) => {
            eprintln!("{}: {}", program, e);
            process::exit(e.exit_code());
        }
    };

    let registry = CommandRegistry::new(builtin_plugins(Arc::clone(&settings)));
    let options = Options::pluggable(Some(&program), registry)
        .about("Inspect IP addresses and the jersey configuration")
        .version(env!("CARGO_PKG_VERSION"));

    let code = run_main(&options, &settings, std::env::args_os().skip(1));
    process::exit(code);
}
