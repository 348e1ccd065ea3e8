use std::string;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("payload error: {0}")]
    Decode(String),
    #[error("code payload is not valid base64")]
    Base64(#[from] base64::DecodeError),
    #[error("bytes is not in UTF8")]
    FromUtf8(#[from] string::FromUtf8Error),
    #[error("malformed test case payload")]
    TestData(#[from] serde_json::Error),
    #[error("failed in IO")]
    IO(#[from] std::io::Error),
    #[error("judging profile error")]
    Profile(#[from] serde_yaml::Error),
    #[error("environment error: {0}")]
    Environment(String),
    #[error("executor fault: {0}")]
    Executor(String),
    #[error("measurement fault: {0}")]
    Probe(String),
}

impl Error {
    /// Failures of the submission itself, as opposed to faults of the judge.
    pub fn is_payload_rejection(&self) -> bool {
        matches!(
            self,
            Error::Decode(_) | Error::Base64(_) | Error::FromUtf8(_) | Error::TestData(_)
        )
    }
}
