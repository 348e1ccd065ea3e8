use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::{SubmissionStatus, TestStatus, TestVerdict};

/// The single record a judge run emits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub status: SubmissionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub compilation_time_ms: u64,
    /// Average over the executed tests.
    pub execution_time_ms: u64,
    pub total_execution_time_ms: u64,
    pub memory_used_kb: u64,
    pub tests_passed: usize,
    pub tests_total: usize,
    pub test_results: Vec<TestVerdict>,
}

impl SubmissionResult {
    pub fn compilation_error(diagnostics: String, compilation_time_ms: u64) -> Self {
        Self {
            status: SubmissionStatus::CompilationError,
            error_message: Some(diagnostics),
            compilation_time_ms,
            execution_time_ms: 0,
            total_execution_time_ms: 0,
            memory_used_kb: 0,
            tests_passed: 0,
            tests_total: 0,
            test_results: vec![],
        }
    }

    pub fn internal_error(message: String) -> Self {
        Self {
            status: SubmissionStatus::InternalError,
            error_message: Some(message),
            compilation_time_ms: 0,
            execution_time_ms: 0,
            total_execution_time_ms: 0,
            memory_used_kb: 0,
            tests_passed: 0,
            tests_total: 0,
            test_results: vec![],
        }
    }
}

/// Accumulates per-test verdicts in execution order and folds them into the
/// submission verdict.
#[derive(Debug, Default)]
pub struct Aggregator {
    verdicts: Vec<TestVerdict>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, verdict: TestVerdict) {
        self.verdicts.push(verdict);
    }

    pub fn finish(self, compilation_time_ms: u64) -> SubmissionResult {
        let tests_total = self.verdicts.len();
        let tests_passed = self
            .verdicts
            .iter()
            .filter(|v| v.status == TestStatus::Accepted)
            .count();
        let total_execution_time_ms: u64 = self.verdicts.iter().map(|v| v.time_ms).sum();
        let execution_time_ms = if tests_total > 0 {
            total_execution_time_ms / tests_total as u64
        } else {
            0
        };
        // tests run sequentially and do not share memory state, so the
        // submission footprint is the worst single test, not a sum
        let memory_used_kb = self.verdicts.iter().map(|v| v.memory_kb).max().unwrap_or(0);

        // first failure in sequence order decides the submission status
        let status = self
            .verdicts
            .iter()
            .find(|v| v.status != TestStatus::Accepted)
            .map(|v| SubmissionStatus::from(v.status))
            .unwrap_or(SubmissionStatus::Accepted);

        SubmissionResult {
            status,
            error_message: None,
            compilation_time_ms,
            execution_time_ms,
            total_execution_time_ms,
            memory_used_kb,
            tests_passed,
            tests_total,
            test_results: self.verdicts,
        }
    }
}

/// Write exactly one newline-terminated JSON record.
pub fn write_report<W: Write>(w: &mut W, result: &SubmissionResult) -> Result<()> {
    serde_json::to_writer(&mut *w, result)?;
    writeln!(w)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(id: usize, status: TestStatus, time_ms: u64, memory_kb: u64) -> TestVerdict {
        TestVerdict {
            test_id: id,
            status,
            time_ms,
            memory_kb,
        }
    }

    #[test]
    fn empty_run_is_accepted() {
        let result = Aggregator::new().finish(12);
        assert_eq!(result.status, SubmissionStatus::Accepted);
        assert_eq!(result.tests_total, 0);
        assert_eq!(result.tests_passed, 0);
        assert_eq!(result.compilation_time_ms, 12);
    }

    #[test]
    fn counts_and_sums() {
        let mut agg = Aggregator::new();
        agg.push(verdict(0, TestStatus::Accepted, 10, 100));
        agg.push(verdict(1, TestStatus::Accepted, 30, 400));
        let result = agg.finish(0);

        assert_eq!(result.status, SubmissionStatus::Accepted);
        assert_eq!(result.tests_passed, 2);
        assert_eq!(result.tests_total, 2);
        assert_eq!(result.total_execution_time_ms, 40);
        assert_eq!(result.execution_time_ms, 20);
        assert_eq!(result.memory_used_kb, 400);
    }

    #[test]
    fn first_failure_decides_status() {
        let mut agg = Aggregator::new();
        agg.push(verdict(0, TestStatus::Accepted, 1, 1));
        agg.push(verdict(1, TestStatus::Timeout, 1000, 1));
        agg.push(verdict(2, TestStatus::WrongAnswer, 1, 1));
        let result = agg.finish(0);

        assert_eq!(result.status, SubmissionStatus::Timeout);
        assert_eq!(result.tests_passed, 1);
        assert_eq!(result.tests_total, 3);
    }

    #[test]
    fn passed_always_counts_accepted() {
        let mut agg = Aggregator::new();
        agg.push(verdict(0, TestStatus::RuntimeError, 1, 1));
        agg.push(verdict(1, TestStatus::Accepted, 1, 1));
        let result = agg.finish(0);

        assert_eq!(
            result.tests_passed,
            result
                .test_results
                .iter()
                .filter(|v| v.status == TestStatus::Accepted)
                .count()
        );
        assert_eq!(result.tests_total, result.test_results.len());
    }

    #[test]
    fn report_is_one_json_line() {
        let result = SubmissionResult::compilation_error("expected ';'".into(), 80);
        let mut buf = Vec::new();
        write_report(&mut buf, &result).unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert!(text.ends_with('\n'));
        assert_eq!(text.trim_end().lines().count(), 1);

        let parsed: SubmissionResult = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(parsed.status, SubmissionStatus::CompilationError);
        assert_eq!(parsed.error_message.as_deref(), Some("expected ';'"));
    }

    #[test]
    fn error_message_absent_for_verdicts() {
        let result = Aggregator::new().finish(0);
        let text = serde_json::to_string(&result).unwrap();
        assert!(!text.contains("error_message"));
        assert!(text.contains("\"status\":\"accepted\""));
    }
}
