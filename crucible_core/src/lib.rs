pub mod cgroup;
pub mod compare;
pub mod compile;
pub mod config;
pub mod error;
pub mod executor;
pub mod judge;
pub mod payload;
pub mod probe;
pub mod report;

use serde::{Deserialize, Serialize};

/// Verdict of a single test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Accepted,
    WrongAnswer,
    RuntimeError,
    Timeout,
    MemoryLimitExceeded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestVerdict {
    pub test_id: usize,
    pub status: TestStatus,
    pub time_ms: u64,
    pub memory_kb: u64,
}

/// Verdict of the whole submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    CompilationError,
    Accepted,
    WrongAnswer,
    RuntimeError,
    Timeout,
    MemoryLimitExceeded,
    InternalError,
}

impl From<TestStatus> for SubmissionStatus {
    fn from(v: TestStatus) -> Self {
        match v {
            TestStatus::Accepted => SubmissionStatus::Accepted,
            TestStatus::WrongAnswer => SubmissionStatus::WrongAnswer,
            TestStatus::RuntimeError => SubmissionStatus::RuntimeError,
            TestStatus::Timeout => SubmissionStatus::Timeout,
            TestStatus::MemoryLimitExceeded => SubmissionStatus::MemoryLimitExceeded,
        }
    }
}
