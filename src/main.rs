use std::process::ExitCode;

fn main() -> ExitCode {
    match elimination_race::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
