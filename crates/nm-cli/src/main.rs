//! Entry point of the `nmc` binary; delegates to [`nm_cli::run`].

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    nm_cli::run(std::env::args_os(), &mut stdin, &mut stdout, &mut stderr)
}
