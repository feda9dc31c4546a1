use std::process::ExitCode;

fn main() -> ExitCode {
    nunzio_cli::run()
}
