use std::process::ExitCode;

fn main() -> ExitCode {
    guildhall_cli::run()
}
