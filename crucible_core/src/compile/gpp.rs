use std::fs::File;
use std::io::Write;
use std::process::{Command, Stdio};

use log::debug;

use super::{CompileResult, CompiledProgram, Compiler, CompilerEnvironmentStatus};
use crate::error::{Error, Result};

/// Fixed scaffolding prepended to every submission, identical for all of
/// them, so short solutions can skip the include ceremony.
const PRELUDE: &str = "#include <iostream>\n\
#include <vector>\n\
#include <string>\n\
#include <algorithm>\n\
#include <cmath>\n\
#include <map>\n\
#include <set>\n\
#include <queue>\n\
#include <stack>\n\
using namespace std;\n\n";

pub struct CompilerGpp {
    temp_dir: tempfile::TempDir,
    standard: GppStandard,
    compiler_path: String,
}

#[derive(Debug, Clone)]
pub enum GppStandard {
    Cpp11,
    Cpp17,
}

impl From<GppStandard> for String {
    fn from(v: GppStandard) -> Self {
        match v {
            GppStandard::Cpp11 => "-std=c++11".into(),
            GppStandard::Cpp17 => "-std=c++17".into(),
        }
    }
}

impl Compiler for CompilerGpp {
    fn check_environment() -> CompilerEnvironmentStatus {
        let path = match which::which("g++") {
            Ok(path) => path,
            Err(_) => return CompilerEnvironmentStatus::Missing,
        };
        let output = match Command::new(&path).arg("--version").output() {
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
        let code_path = self.temp_dir.path().join("src.cpp");
        let exec_path = self.temp_dir.path().join("exec");

        {
            let mut file = File::create(&code_path)?;
            file.write_all(PRELUDE.as_bytes())?;
            file.write_all(src.as_bytes())?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }

        let output = Command::new(&self.compiler_path)
            .arg("-O2")
            .arg(String::from(self.standard.clone()))
            .arg("-o")
            .arg(&exec_path)
            .arg(&code_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;

        if !output.status.success() {
            let mut diagnostics = String::from_utf8_lossy(&output.stdout).to_string();
            diagnostics.push_str(&String::from_utf8_lossy(&output.stderr));
            debug!("g++ rejected submission, {} bytes of diagnostics", diagnostics.len());
            return Ok(CompileResult::CompileError(diagnostics));
        }

        Ok(CompileResult::OK(CompiledProgram::new(
            exec_path.to_string_lossy().to_string(),
        )))
    }
}

impl CompilerGpp {
    pub fn new() -> Result<Self> {
        match Self::check_environment() {
            CompilerEnvironmentStatus::OK { version: _, path } => Ok(Self {
                temp_dir: tempfile::TempDir::new()?,
                standard: GppStandard::Cpp17,
                compiler_path: path,
            }),
            CompilerEnvironmentStatus::Missing => Err(Error::Environment("missing g++".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpp_environment() {
        let result = CompilerGpp::check_environment();
        match result {
            CompilerEnvironmentStatus::OK { version: _, path: _ } => {
                assert!(matches!(which::which("g++"), Ok(_)));
            }
            CompilerEnvironmentStatus::Missing => {
                assert!(matches!(which::which("g++"), Err(_)));
            }
        }
    }

    #[test]
    fn gpp_compile_error() -> Result<()> {
        if matches!(CompilerGpp::check_environment(), CompilerEnvironmentStatus::Missing) {
            return Ok(());
        }
        let compiler = CompilerGpp::new()?;
        let result = compiler.compile("int main() { return 0 }")?;
        match result {
            CompileResult::CompileError(diagnostics) => assert!(!diagnostics.is_empty()),
            CompileResult::OK(_) => panic!("broken source compiled"),
        }
        Ok(())
    }

    #[test]
    fn gpp_compile_ok() -> Result<()> {
        if matches!(CompilerGpp::check_environment(), CompilerEnvironmentStatus::Missing) {
            return Ok(());
        }
        let compiler = CompilerGpp::new()?;
        // the prelude supplies the includes
        let result = compiler.compile("int main() { cout << 1 + 1 << endl; }")?;
        assert!(matches!(result, CompileResult::OK(_)));
        Ok(())
    }
}
