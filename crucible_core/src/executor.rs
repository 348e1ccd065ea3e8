use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, trace};
use once_cell::sync::Lazy;

use crate::cgroup::TestCgroup;
use crate::compile::CompiledProgram;
use crate::error::{Error, Result};
use crate::probe::{MemoryProbe, ProcessProbe};

/// Supervision tick; also the memory sampling cadence.
const SAMPLE_INTERVAL: Duration = Duration::from_millis(10);

/// Probe selection happens once per process and is never revisited, so all
/// tests of a run report from the same measurement source.
pub static MEMORY_PROBE: Lazy<MemoryProbe> = Lazy::new(MemoryProbe::detect);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminatedBy {
    Natural,
    Timeout,
    MemoryLimit,
    Signal,
}

/// Everything the classifier needs about one execution.
#[derive(Debug)]
pub struct ExecutionOutcome {
    pub stdout: String,
    pub stdout_truncated: bool,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub wall_time_ms: u64,
    pub cpu_time_ms: u64,
    pub peak_memory_kb: u64,
    pub terminated_by: TerminatedBy,
}

#[derive(Debug, Clone, Copy)]
pub struct ResourceLimits {
    pub time_limit_ms: u64,
    pub memory_limit_kb: u64,
    pub output_limit_bytes: usize,
}

pub struct Executor<'a> {
    program: &'a CompiledProgram,
    limits: ResourceLimits,
}

impl<'a> Executor<'a> {
    pub fn new(program: &'a CompiledProgram, limits: ResourceLimits) -> Self {
        Self { program, limits }
    }

    fn setup_cgroup(&self, pid: u32) -> Result<TestCgroup> {
        let cg = TestCgroup::create(pid)?;
        cg.add_pid(pid)?;
        cg.set_memory_limit_kb(self.limits.memory_limit_kb)?;
        Ok(cg)
    }

    /// Run the artifact against one input under the configured ceilings.
    /// `Err` here is an executor fault; the caller converts it into a
    /// verdict for this test only.
    pub fn execute(&self, input: &str) -> Result<ExecutionOutcome> {
        let memory_limit_mb = (self.limits.memory_limit_kb + 1023) / 1024;

        let mut command = Command::new(cell_path()?)
            .arg(&self.program.path)
            .arg("-m")
            .arg(memory_limit_mb.to_string())
            .arg("-t")
            .arg(self.limits.time_limit_ms.to_string())
            .arg("--")
            .args(&self.program.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Executor(format!("failed to spawn cell: {}", e)))?;

        let pid = command.id();
        let probe = ProcessProbe::new(pid)?;

        // a mid-run fallback would mix measurement sources, so a group that
        // cannot be set up fails this test instead
        let cgroup = match *MEMORY_PROBE {
            MemoryProbe::CgroupV2 => match self.setup_cgroup(pid) {
                Ok(cg) => Some(cg),
                Err(err) => {
                    probe.kill_group();
                    let _ = probe.try_reap();
                    return Err(err);
                }
            },
            MemoryProbe::ProcSampling => None,
        };

        // the child may exit without draining its input; that is its own
        // business, not an executor fault
        let stdin = command
            .stdin
            .take()
            .ok_or_else(|| Error::Executor("failed to open stdin".into()))?;
        let input = input.to_string();
        let writer = thread::spawn(move || {
            let mut stdin = stdin;
            let _ = stdin.write_all(input.as_bytes());
        });

        let stdout = command
            .stdout
            .take()
            .ok_or_else(|| Error::Executor("failed to open stdout".into()))?;
        let stderr = command
            .stderr
            .take()
            .ok_or_else(|| Error::Executor("failed to open stderr".into()))?;
        let out_reader = spawn_capped_reader(stdout, self.limits.output_limit_bytes);
        let err_reader = spawn_capped_reader(stderr, self.limits.output_limit_bytes);

        let started = Instant::now();
        let deadline = Duration::from_millis(self.limits.time_limit_ms);
        let mut sampled_peak_kb: u64 = 0;
        let mut killed: Option<TerminatedBy> = None;

        let bio = loop {
            if let Some(bio) = probe.try_reap()? {
                break bio;
            }
            if killed.is_none() {
                if started.elapsed() >= deadline {
                    trace!("pid {} hit the wall-clock deadline", pid);
                    probe.kill_group();
                    killed = Some(TerminatedBy::Timeout);
                } else {
                    let peak = match &cgroup {
                        Some(cg) => cg.peak_memory_kb(),
                        None => probe.sample_peak_kb(),
                    };
                    if let Some(peak) = peak {
                        sampled_peak_kb = sampled_peak_kb.max(peak);
                        if peak > self.limits.memory_limit_kb {
                            trace!("pid {} exceeded the memory ceiling", pid);
                            probe.kill_group();
                            killed = Some(TerminatedBy::MemoryLimit);
                        }
                    }
                }
            }
            thread::sleep(SAMPLE_INTERVAL);
        };

        let wall_time_ms = started.elapsed().as_millis() as u64;

        // descendants may have inherited the pipes; every writer has to be
        // gone before the readers can see EOF
        probe.kill_group();

        let _ = writer.join();
        let (stdout, stdout_truncated) = out_reader
            .join()
            .map_err(|_| Error::Executor("stdout reader panicked".into()))?;
        let (stderr, _) = err_reader
            .join()
            .map_err(|_| Error::Executor("stderr reader panicked".into()))?;

        let (peak_memory_kb, oom_killed) = match &cgroup {
            Some(cg) => (
                cg.peak_memory_kb().unwrap_or(sampled_peak_kb),
                cg.oom_killed(),
            ),
            None => (sampled_peak_kb.max(bio.peak_memory_kb()), false),
        };
        drop(cgroup);

        let terminated_by = if let Some(reason) = killed {
            reason
        } else if bio.cpu_time_ms() >= self.limits.time_limit_ms {
            // RLIMIT_CPU got there before the supervision tick did
            TerminatedBy::Timeout
        } else if oom_killed || peak_memory_kb > self.limits.memory_limit_kb {
            TerminatedBy::MemoryLimit
        } else if bio.term_signal().is_some() {
            TerminatedBy::Signal
        } else {
            TerminatedBy::Natural
        };

        debug!(
            "pid {} finished: {:?}, wall {}ms, cpu {}ms, peak {}kB",
            pid,
            terminated_by,
            wall_time_ms,
            bio.cpu_time_ms(),
            peak_memory_kb
        );

        Ok(ExecutionOutcome {
            stdout: String::from_utf8_lossy(&stdout).to_string(),
            stdout_truncated,
            stderr: String::from_utf8_lossy(&stderr).to_string(),
            exit_code: bio.exit_code(),
            signal: bio.term_signal(),
            wall_time_ms,
            cpu_time_ms: bio.cpu_time_ms(),
            peak_memory_kb,
            terminated_by,
        })
    }
}

/// Drain a stream fully but keep at most `cap` bytes; a child that floods
/// its pipe must not balloon the judge.
fn spawn_capped_reader<R: Read + Send + 'static>(
    mut stream: R,
    cap: usize,
) -> thread::JoinHandle<(Vec<u8>, bool)> {
    thread::spawn(move || {
        let mut captured = Vec::new();
        let mut truncated = false;
        let mut chunk = [0u8; 8192];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    if captured.len() < cap {
                        let take = n.min(cap - captured.len());
                        captured.extend_from_slice(&chunk[..take]);
                        if take < n {
                            truncated = true;
                        }
                    } else {
                        truncated = true;
                    }
                }
                Err(_) => break,
            }
        }
        (captured, truncated)
    })
}

/// The cell sits beside the judge binary; test executables run one level
/// deeper, in `deps/`.
pub fn cell_path() -> Result<PathBuf> {
    let exe = std::env::current_exe()?;
    let dir = exe
        .parent()
        .ok_or_else(|| Error::Executor("current executable has no parent".into()))?;

    let direct = dir.join("crucible_cell");
    if direct.exists() {
        return Ok(direct);
    }
    if let Some(parent) = dir.parent() {
        let up = parent.join("crucible_cell");
        if up.exists() {
            return Ok(up);
        }
    }
    Err(Error::Executor(
        "crucible_cell binary not found beside the judge".into(),
    ))
}
