use std::process::ExitCode;

fn main() -> ExitCode {
    costpilot_cli::run()
}
