use std::fs;
use std::path::Path;

use crate::cgroup;
use crate::error::{Error, Result};

/// How peak memory is measured. Detected once per process; the two sources
/// are not comparable, so a run never mixes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryProbe {
    /// Per-test cgroup v2 group with `memory.peak` accounting.
    CgroupV2,
    /// `/proc/<pid>/status` peak-RSS sampling merged with `wait4` rusage.
    ProcSampling,
}

impl MemoryProbe {
    pub fn detect() -> Self {
        if cgroup::available() {
            MemoryProbe::CgroupV2
        } else {
            MemoryProbe::ProcSampling
        }
    }
}

pub struct ProcessProbe {
    pid: u32,
}

impl ProcessProbe {
    pub fn new(pid: u32) -> Result<Self> {
        let proc_path = format!("/proc/{}", pid);
        if !Path::new(&proc_path).exists() {
            return Err(Error::Probe(format!("process {} does not exist", pid)));
        }
        Ok(Self { pid })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Peak resident set size so far, from `/proc/<pid>/status` (VmHWM).
    /// `None` once the process is gone or before the first fault-in.
    pub fn sample_peak_kb(&self) -> Option<u64> {
        let content = fs::read_to_string(format!("/proc/{}/status", self.pid)).ok()?;
        for line in content.lines() {
            if let Some(rest) = line.strip_prefix("VmHWM:") {
                return rest.trim().trim_end_matches("kB").trim().parse().ok();
            }
        }
        None
    }

    /// Non-blocking reap. `Ok(Some(..))` once the process exited, with its
    /// resource usage; `Ok(None)` while it is still running.
    pub fn try_reap(&self) -> Result<Option<ProcessBio>> {
        let mut status: libc::c_int = 0;
        let mut ru: libc::rusage = unsafe { std::mem::zeroed() };
        let ret = unsafe {
            libc::wait4(
                self.pid as libc::pid_t,
                &mut status,
                libc::WNOHANG,
                &mut ru,
            )
        };
        if ret < 0 {
            return Err(Error::Probe(format!(
                "wait4 failed: {}",
                std::io::Error::last_os_error()
            )));
        }
        if ret == 0 {
            return Ok(None);
        }
        Ok(Some(ProcessBio {
            status,
            utime: (ru.ru_utime.tv_sec * 1000 + ru.ru_utime.tv_usec / 1000) as u64,
            stime: (ru.ru_stime.tv_sec * 1000 + ru.ru_stime.tv_usec / 1000) as u64,
            maxrss: ru.ru_maxrss as u64,
        }))
    }

    /// SIGKILL the whole process group. The cell made the child a group
    /// leader, so descendants go down with it.
    pub fn kill_group(&self) {
        unsafe {
            libc::kill(-(self.pid as libc::pid_t), libc::SIGKILL);
            libc::kill(self.pid as libc::pid_t, libc::SIGKILL);
        }
    }
}

/// Final resource usage of one watched process.
#[derive(Debug)]
pub struct ProcessBio {
    status: i32,
    utime: u64,
    stime: u64,
    maxrss: u64,
}

impl ProcessBio {
    /// CPU time usage (ms), user plus system.
    pub fn cpu_time_ms(&self) -> u64 {
        self.utime + self.stime
    }

    pub fn exit_code(&self) -> Option<i32> {
        if libc::WIFEXITED(self.status) {
            Some(libc::WEXITSTATUS(self.status))
        } else {
            None
        }
    }

    pub fn term_signal(&self) -> Option<i32> {
        if libc::WIFSIGNALED(self.status) {
            Some(libc::WTERMSIG(self.status))
        } else {
            None
        }
    }

    /// Peak resident set size (kB) from rusage.
    pub fn peak_memory_kb(&self) -> u64 {
        self.maxrss
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process;

    #[test]
    fn probe_own_pid() {
        let probe = ProcessProbe::new(process::id()).unwrap();
        assert_eq!(probe.pid(), process::id());
    }

    #[test]
    fn probe_missing_pid() {
        // pid 0 has no /proc entry
        assert!(ProcessProbe::new(0).is_err());
    }

    #[test]
    fn sample_own_peak() {
        let probe = ProcessProbe::new(process::id()).unwrap();
        let peak = probe.sample_peak_kb().unwrap();
        assert!(peak > 0);
    }
}
