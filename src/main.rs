use std::process::ExitCode;

use git_octopus::ui::output;

fn main() -> ExitCode {
    match git_octopus::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::error(format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}
