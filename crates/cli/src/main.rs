use std::process::ExitCode;

fn main() -> ExitCode {
    cotiza_cli::run()
}
