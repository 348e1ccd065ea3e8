use log::{info, warn};

use crate::compare::CompareMode;
use crate::compile::{compiler_for, timed_compile, CompileResult};
use crate::config::JudgeConfig;
use crate::error::Result;
use crate::executor::{ExecutionOutcome, Executor, ResourceLimits, TerminatedBy};
use crate::payload::{self, TestCase};
use crate::report::{Aggregator, SubmissionResult};
use crate::{TestStatus, TestVerdict};

/// Judge one submission end to end. Never fails for anything the submission
/// did; an `Err` means the judge host itself is broken and the caller should
/// report an internal error.
pub fn judge_submission(
    raw_code: Option<&str>,
    raw_tests: Option<&str>,
    config: &JudgeConfig,
) -> Result<SubmissionResult> {
    let (submission, tests) = match payload::decode(raw_code, raw_tests, config) {
        Ok(decoded) => decoded,
        Err(err) if err.is_payload_rejection() => {
            info!("payload rejected: {}", err);
            return Ok(SubmissionResult::compilation_error(err.to_string(), 0));
        }
        Err(err) => return Err(err),
    };

    let compiler = compiler_for(&submission.language)?;
    let (compiled, compilation_time_ms) = timed_compile(compiler.as_ref(), &submission.source)?;

    let program = match compiled {
        CompileResult::OK(program) => program,
        CompileResult::CompileError(diagnostics) => {
            info!("compilation failed after {}ms", compilation_time_ms);
            return Ok(SubmissionResult::compilation_error(
                diagnostics,
                compilation_time_ms,
            ));
        }
    };

    let compare: Box<dyn CompareMode> = config.compare_mode.into();
    let mut aggregator = Aggregator::new();

    for test in &tests {
        let limits = ResourceLimits {
            time_limit_ms: test.time_limit_ms,
            memory_limit_kb: test.memory_limit_kb,
            output_limit_bytes: config.output_limit_bytes,
        };
        let verdict = match Executor::new(&program, limits).execute(&test.input) {
            Ok(outcome) => classify(test, &outcome, compare.as_ref()),
            Err(err) => {
                // the fault stays with this test; the rest still run
                warn!("executor fault on test {}: {}", test.id, err);
                TestVerdict {
                    test_id: test.id,
                    status: TestStatus::RuntimeError,
                    time_ms: 0,
                    memory_kb: 0,
                }
            }
        };

        let accepted = verdict.status == TestStatus::Accepted;
        aggregator.push(verdict);
        if !accepted && config.stop_on_failure {
            break;
        }
    }

    Ok(aggregator.finish(compilation_time_ms))
}

/// Resource and crash failures pre-empt content comparison: output from a
/// killed process is not a meaningful wrong answer.
pub fn classify(
    test: &TestCase,
    outcome: &ExecutionOutcome,
    compare: &dyn CompareMode,
) -> TestVerdict {
    let status = match outcome.terminated_by {
        TerminatedBy::Timeout => TestStatus::Timeout,
        TerminatedBy::MemoryLimit => TestStatus::MemoryLimitExceeded,
        TerminatedBy::Signal | TerminatedBy::Natural => {
            if outcome.stderr.contains("bad_alloc") {
                // a doubling container can jump past the address-space
                // rlimit while the sampled footprint is still under the
                // configured ceiling
                TestStatus::MemoryLimitExceeded
            } else if outcome.terminated_by == TerminatedBy::Signal
                || outcome.exit_code != Some(0)
            {
                TestStatus::RuntimeError
            } else {
                compare
                    .compare(&test.expected_output, &outcome.stdout)
                    .into()
            }
        }
    };

    TestVerdict {
        test_id: test.id,
        status,
        time_ms: outcome.wall_time_ms,
        memory_kb: outcome.peak_memory_kb,
    }
}
