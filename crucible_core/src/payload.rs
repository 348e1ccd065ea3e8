use base64::engine::general_purpose;
use base64::Engine as _;
use serde::Deserialize;

use crate::config::JudgeConfig;
use crate::error::{Error, Result};

/// One unit of user-supplied source code, immutable once decoded.
#[derive(Debug, Clone)]
pub struct Submission {
    pub source: String,
    pub language: String,
}

#[derive(Debug, Clone)]
pub struct TestCase {
    pub id: usize,
    pub input: String,
    pub expected_output: String,
    pub time_limit_ms: u64,
    pub memory_limit_kb: u64,
}

#[derive(Debug, Deserialize)]
struct RawTestCase {
    #[serde(default)]
    input: String,
    #[serde(default)]
    expected_output: String,
    time_limit_ms: Option<u64>,
    memory_limit_kb: Option<u64>,
}

/// The orchestrator sends either an array or a bare object for a single case.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTestSet {
    Many(Vec<RawTestCase>),
    One(RawTestCase),
}

/// Decode the transport payload into in-memory structures. Touches no files;
/// every failure here means the submission is rejected before compilation.
pub fn decode(
    raw_code: Option<&str>,
    raw_tests: Option<&str>,
    config: &JudgeConfig,
) -> Result<(Submission, Vec<TestCase>)> {
    let raw_code = match raw_code {
        Some(c) if !c.trim().is_empty() => c.trim(),
        _ => return Err(Error::Decode("no code provided".into())),
    };

    let bytes = general_purpose::STANDARD.decode(raw_code)?;
    let source = String::from_utf8(bytes)?;
    if source.trim().is_empty() {
        return Err(Error::Decode("code payload decodes to nothing".into()));
    }

    let raw: Vec<RawTestCase> = match serde_json::from_str(raw_tests.unwrap_or("[]"))? {
        RawTestSet::Many(v) => v,
        RawTestSet::One(t) => vec![t],
    };

    let tests = raw
        .into_iter()
        .enumerate()
        .map(|(id, t)| TestCase {
            id,
            input: t.input,
            expected_output: t.expected_output,
            time_limit_ms: t.time_limit_ms.unwrap_or(config.time_limit_ms),
            memory_limit_kb: t.memory_limit_kb.unwrap_or(config.memory_limit_kb),
        })
        .collect();

    Ok((
        Submission {
            source,
            language: config.language.clone(),
        },
        tests,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(source: &str) -> String {
        general_purpose::STANDARD.encode(source)
    }

    #[test]
    fn decodes_code_and_tests() -> Result<()> {
        let config = JudgeConfig::default();
        let code = encode("int main() {}");
        let tests = r#"[{"input":"1\n","expected_output":"2\n","time_limit_ms":500}]"#;

        let (submission, cases) = decode(Some(&code), Some(tests), &config)?;
        assert_eq!(submission.source, "int main() {}");
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].id, 0);
        assert_eq!(cases[0].input, "1\n");
        assert_eq!(cases[0].time_limit_ms, 500);
        // absent per-test limit falls back to the profile
        assert_eq!(cases[0].memory_limit_kb, config.memory_limit_kb);
        Ok(())
    }

    #[test]
    fn bare_object_is_one_case() -> Result<()> {
        let config = JudgeConfig::default();
        let (_, cases) = decode(
            Some(&encode("x")),
            Some(r#"{"input":"a","expected_output":"b"}"#),
            &config,
        )?;
        assert_eq!(cases.len(), 1);
        Ok(())
    }

    #[test]
    fn missing_tests_means_empty_set() -> Result<()> {
        let config = JudgeConfig::default();
        let (_, cases) = decode(Some(&encode("x")), None, &config)?;
        assert!(cases.is_empty());
        Ok(())
    }

    #[test]
    fn rejects_absent_or_empty_code() {
        let config = JudgeConfig::default();
        assert!(matches!(
            decode(None, None, &config),
            Err(Error::Decode(_))
        ));
        assert!(matches!(
            decode(Some("   "), None, &config),
            Err(Error::Decode(_))
        ));
        // valid base64 of an empty payload is still no code
        assert!(matches!(
            decode(Some(&encode("  \n")), None, &config),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn rejects_invalid_encoding() {
        let config = JudgeConfig::default();
        assert!(matches!(
            decode(Some("@@not-base64@@"), None, &config),
            Err(Error::Base64(_))
        ));
        assert!(matches!(
            decode(Some(&general_purpose::STANDARD.encode(&[0xff, 0xfe])), None, &config),
            Err(Error::FromUtf8(_))
        ));
    }

    #[test]
    fn rejects_malformed_test_payload() {
        let config = JudgeConfig::default();
        let err = decode(Some(&encode("x")), Some("not json"), &config).unwrap_err();
        assert!(matches!(err, Error::TestData(_)));
        assert!(err.is_payload_rejection());
    }
}
