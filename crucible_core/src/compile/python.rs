use std::fs::File;
use std::io::Write;
use std::process::{Command, Stdio};

use super::{CompileResult, CompiledProgram, Compiler, CompilerEnvironmentStatus};
use crate::error::{Error, Result};

/// Python has no compile step; the artifact is the interpreter plus the
/// script path.
pub struct CompilerPython {
    temp_dir: tempfile::TempDir,
    interpreter_path: String,
}

impl CompilerPython {
    pub fn new() -> Result<Self> {
        match Self::check_environment() {
            CompilerEnvironmentStatus::OK { version: _, path } => Ok(Self {
                temp_dir: tempfile::TempDir::new()?,
                interpreter_path: path,
            }),
            CompilerEnvironmentStatus::Missing => {
                Err(Error::Environment("missing python".into()))
            }
        }
    }
}

impl Compiler for CompilerPython {
    fn check_environment() -> CompilerEnvironmentStatus {
        let path = match which::which("python3").or_else(|_| which::which("python")) {
            Ok(path) => path,
            Err(_) => return CompilerEnvironmentStatus::Missing,
        };
        let output = match Command::new(&path)
            .arg("--version")
            .stdout(Stdio::piped())
            .output()
        {
            Ok(output) => output,
            Err(_) => return CompilerEnvironmentStatus::Missing,
        };
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let version = stdout
            .lines()
            .next()
            .and_then(|l| l.split(' ').last())
            .unwrap_or("unknown")
            .to_string();

        CompilerEnvironmentStatus::OK {
            version,
            path: path.to_string_lossy().to_string(),
        }
    }

    fn compile(&self, src: &str) -> Result<CompileResult> {
        let code_path = self.temp_dir.path().join("src.py");

        {
            let mut file = File::create(&code_path)?;
            file.write_all(src.as_bytes())?;
            file.sync_all()?;
        }

        Ok(CompileResult::OK(CompiledProgram::new_with_args(
            self.interpreter_path.clone(),
            vec![code_path.to_string_lossy().to_string()],
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_artifact_points_at_interpreter() -> Result<()> {
        if matches!(
            CompilerPython::check_environment(),
            CompilerEnvironmentStatus::Missing
        ) {
            return Ok(());
        }
        let compiler = CompilerPython::new()?;
        let result = compiler.compile("print(1 + 1)")?;
        let program = match result {
            CompileResult::OK(program) => program,
            CompileResult::CompileError(_) => unreachable!(),
        };
        assert_eq!(program.path, compiler.interpreter_path);
        assert_eq!(program.args.len(), 1);
        Ok(())
    }
}
