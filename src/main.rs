use std::process::ExitCode;

fn main() -> ExitCode {
    age_gender::run_cli()
}
