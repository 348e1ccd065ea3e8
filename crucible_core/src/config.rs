use std::env;
use std::fs;

use serde::{Deserialize, Serialize};

use crate::compare::CompareModeConfig;
use crate::error::Result;

/// Judging profile for one run. Loaded from an optional YAML profile file,
/// then overridden by environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JudgeConfig {
    pub language: String,
    pub time_limit_ms: u64,
    pub memory_limit_kb: u64,
    pub output_limit_bytes: usize,
    pub compare_mode: CompareModeConfig,
    pub stop_on_failure: bool,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            language: "cpp".into(),
            time_limit_ms: 2000,
            memory_limit_kb: 256 * 1024,
            output_limit_bytes: 8 * 1024 * 1024,
            compare_mode: CompareModeConfig::Line,
            stop_on_failure: false,
        }
    }
}

impl JudgeConfig {
    pub fn from_string(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_string(&content)
    }

    /// Resolve the profile for this invocation: `JUDGE_PROFILE` names a YAML
    /// file, `LANGUAGE` overrides the language id.
    pub fn from_env() -> Result<Self> {
        let mut config = match env::var("JUDGE_PROFILE") {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        if let Ok(language) = env::var("LANGUAGE") {
            if !language.trim().is_empty() {
                config.language = language.trim().to_string();
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = JudgeConfig::default();
        assert_eq!(config.language, "cpp");
        assert_eq!(config.time_limit_ms, 2000);
        assert!(!config.stop_on_failure);
    }

    #[test]
    fn profile_overrides_defaults() -> Result<()> {
        let config = JudgeConfig::from_string(
            "timeLimitMs: 500\nmemoryLimitKb: 1024\ncompareMode: full\nstopOnFailure: true\n",
        )?;
        assert_eq!(config.time_limit_ms, 500);
        assert_eq!(config.memory_limit_kb, 1024);
        assert!(matches!(config.compare_mode, CompareModeConfig::Full));
        assert!(config.stop_on_failure);
        // untouched fields keep their defaults
        assert_eq!(config.language, "cpp");
        Ok(())
    }

    #[test]
    fn serialize() {
        let config = JudgeConfig::default();
        let s = serde_yaml::to_string(&config).unwrap();
        assert!(s.contains("timeLimitMs"));
    }
}
