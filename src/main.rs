use std::process::ExitCode;

use termplay_lib::Error;

fn main() -> ExitCode {
    match termplay_lib::run() {
        Ok(()) => ExitCode::SUCCESS,
        // clap prints its own usage/help text and picks the status
        Err(Error::Argument(e)) => e.exit(),
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}
