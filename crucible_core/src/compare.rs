use serde::{Deserialize, Serialize};

use crate::TestStatus;

pub enum Comparison {
    Same,
    Different,
}

impl From<Comparison> for TestStatus {
    fn from(v: Comparison) -> Self {
        match v {
            Comparison::Same => TestStatus::Accepted,
            Comparison::Different => TestStatus::WrongAnswer,
        }
    }
}

pub trait CompareMode {
    fn compare(&self, expected: &str, actual: &str) -> Comparison;
}

/// Byte-exact comparison.
pub struct FullCompare;

impl CompareMode for FullCompare {
    fn compare(&self, expected: &str, actual: &str) -> Comparison {
        if expected == actual {
            Comparison::Same
        } else {
            Comparison::Different
        }
    }
}

/// Ignores trailing whitespace on each line and trailing blank lines,
/// exact otherwise.
pub struct LineCompare;

impl CompareMode for LineCompare {
    fn compare(&self, expected: &str, actual: &str) -> Comparison {
        let lhs: Vec<&str> = expected.trim_end().lines().map(|l| l.trim_end()).collect();
        let rhs: Vec<&str> = actual.trim_end().lines().map(|l| l.trim_end()).collect();

        if lhs == rhs {
            Comparison::Same
        } else {
            Comparison::Different
        }
    }
}

/// Compares whitespace-separated tokens, ignoring layout entirely.
pub struct ValueCompare;

impl CompareMode for ValueCompare {
    fn compare(&self, expected: &str, actual: &str) -> Comparison {
        let lhs: Vec<&str> = expected.split_whitespace().collect();
        let rhs: Vec<&str> = actual.split_whitespace().collect();

        if lhs == rhs {
            Comparison::Same
        } else {
            Comparison::Different
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareModeConfig {
    Full,
    Line,
    Value,
}

impl From<CompareModeConfig> for Box<dyn CompareMode> {
    fn from(v: CompareModeConfig) -> Self {
        match v {
            CompareModeConfig::Full => Box::new(FullCompare {}),
            CompareModeConfig::Line => Box::new(LineCompare {}),
            CompareModeConfig::Value => Box::new(ValueCompare {}),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_is_byte_exact() {
        assert!(matches!(
            FullCompare {}.compare("1 2\n", "1 2\n"),
            Comparison::Same
        ));
        assert!(matches!(
            FullCompare {}.compare("1 2\n", "1 2"),
            Comparison::Different
        ));
    }

    #[test]
    fn line_ignores_trailing_whitespace() {
        let c = LineCompare {};
        assert!(matches!(c.compare("1 2\n3\n", "1 2  \n3"), Comparison::Same));
        assert!(matches!(c.compare("a\nb", "a\nb\n\n  \n"), Comparison::Same));
        assert!(matches!(c.compare("a\nb", "a\n b"), Comparison::Different));
        assert!(matches!(c.compare("a\nb", "a b"), Comparison::Different));
    }

    #[test]
    fn value_ignores_layout_but_not_tokens() {
        let c = ValueCompare {};
        assert!(matches!(c.compare("1 2 3", "1\n2\n3\n"), Comparison::Same));
        assert!(matches!(c.compare("1 2", "12"), Comparison::Different));
    }

    #[test]
    fn comparison_maps_to_verdict() {
        assert_eq!(TestStatus::from(Comparison::Same), TestStatus::Accepted);
        assert_eq!(
            TestStatus::from(Comparison::Different),
            TestStatus::WrongAnswer
        );
    }
}
