use std::env;
use std::io::{self, Write};
use std::process;

use log::error;

use crucible_core::config::JudgeConfig;
use crucible_core::judge;
use crucible_core::report::{self, SubmissionResult};

/// One judge process per submission. Whatever happens, exactly one JSON
/// record goes to stdout and the process exits 0; a nonzero exit means the
/// record itself could not be written.
fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let raw_code = env::var("CODE").ok();
    let raw_tests = env::var("TEST_CASES").ok();

    let result = match JudgeConfig::from_env() {
        Ok(config) => judge::judge_submission(raw_code.as_deref(), raw_tests.as_deref(), &config)
            .unwrap_or_else(|err| {
                error!("judge fault: {}", err);
                SubmissionResult::internal_error(err.to_string())
            }),
        Err(err) => {
            error!("invalid judging profile: {}", err);
            SubmissionResult::internal_error(err.to_string())
        }
    };

    let stdout = io::stdout();
    let mut lock = stdout.lock();
    if let Err(err) = report::write_report(&mut lock, &result) {
        eprintln!("crucible: failed to write report: {}", err);
        process::exit(1);
    }
    if let Err(err) = lock.flush() {
        eprintln!("crucible: failed to flush report: {}", err);
        process::exit(1);
    }
}
