use std::time::Instant;

pub mod gpp;
pub mod python;

pub use gpp::CompilerGpp;
pub use python::CompilerPython;

use crate::error::{Error, Result};

/// Executable form of a submission. Lives in the owning compiler's scratch
/// directory and dies with the judge process; never reused across
/// submissions.
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    pub path: String,
    pub args: Vec<String>,
}

impl CompiledProgram {
    pub fn new(path: String) -> Self {
        Self { path, args: vec![] }
    }

    pub fn new_with_args(path: String, args: Vec<String>) -> Self {
        Self { path, args }
    }
}

pub enum CompileResult {
    OK(CompiledProgram),
    /// Combined compiler stdout+stderr.
    CompileError(String),
}

#[derive(Debug)]
pub enum CompilerEnvironmentStatus {
    OK { version: String, path: String },
    Missing,
}

pub trait Compiler {
    /// Turn source text into a runnable artifact, or diagnostics. `Err` is a
    /// fault of the judge host, not of the submission.
    fn compile(&self, src: &str) -> Result<CompileResult>;

    fn check_environment() -> CompilerEnvironmentStatus
    where
        Self: Sized;
}

/// Select the toolchain adapter for a language id.
pub fn compiler_for(language: &str) -> Result<Box<dyn Compiler>> {
    match language {
        "cpp" | "c++" | "cxx" => Ok(Box::new(CompilerGpp::new()?)),
        "python" | "py" => Ok(Box::new(CompilerPython::new()?)),
        other => Err(Error::Environment(format!(
            "unsupported language `{}`",
            other
        ))),
    }
}

/// Compile with wall-clock accounting for the report.
pub fn timed_compile(compiler: &dyn Compiler, src: &str) -> Result<(CompileResult, u64)> {
    let start = Instant::now();
    let result = compiler.compile(src)?;
    Ok((result, start.elapsed().as_millis() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_language_is_rejected() {
        assert!(matches!(
            compiler_for("cobol"),
            Err(Error::Environment(_))
        ));
    }
}
