use std::fs;
use std::path::{Path, PathBuf};

use log::warn;

use crate::error::{Error, Result};

const CGROUP_ROOT: &str = "/sys/fs/cgroup";

/// Whether a writable cgroup v2 hierarchy with the memory controller is
/// available to this process.
pub fn available() -> bool {
    let root = Path::new(CGROUP_ROOT);
    let controllers = match fs::read_to_string(root.join("cgroup.controllers")) {
        Ok(c) => c,
        Err(_) => return false,
    };
    if !controllers.split_whitespace().any(|c| c == "memory") {
        return false;
    }
    let probe = root.join(format!("crucible_probe_{}", std::process::id()));
    match fs::create_dir(&probe) {
        Ok(_) => {
            let _ = fs::remove_dir(&probe);
            true
        }
        Err(_) => false,
    }
}

/// A cgroup created for a single test-case child. Removed on drop; any
/// process still inside is killed first.
pub struct TestCgroup {
    path: PathBuf,
}

impl TestCgroup {
    pub fn create(child_pid: u32) -> Result<Self> {
        let path = Path::new(CGROUP_ROOT).join(format!(
            "crucible_{}_{}",
            std::process::id(),
            child_pid
        ));
        fs::create_dir(&path)
            .map_err(|e| Error::Probe(format!("failed to create cgroup: {}", e)))?;
        Ok(Self { path })
    }

    pub fn add_pid(&self, pid: u32) -> Result<()> {
        fs::write(self.path.join("cgroup.procs"), pid.to_string())
            .map_err(|e| Error::Probe(format!("failed to enter cgroup: {}", e)))
    }

    pub fn set_memory_limit_kb(&self, limit_kb: u64) -> Result<()> {
        fs::write(
            self.path.join("memory.max"),
            (limit_kb * 1024).to_string(),
        )
        .map_err(|e| Error::Probe(format!("failed to set memory.max: {}", e)))
    }

    /// Peak memory charged to the group (kB). Falls back to `memory.current`
    /// on kernels without `memory.peak`.
    pub fn peak_memory_kb(&self) -> Option<u64> {
        for file in &["memory.peak", "memory.current"] {
            if let Ok(content) = fs::read_to_string(self.path.join(file)) {
                if let Ok(bytes) = content.trim().parse::<u64>() {
                    return Some(bytes / 1024);
                }
            }
        }
        None
    }

    /// Whether the kernel OOM killer fired inside this group.
    pub fn oom_killed(&self) -> bool {
        let content = match fs::read_to_string(self.path.join("memory.events")) {
            Ok(c) => c,
            Err(_) => return false,
        };
        for line in content.lines() {
            if let Some(count) = line.strip_prefix("oom_kill ") {
                return count.trim().parse::<u64>().map(|n| n > 0).unwrap_or(false);
            }
        }
        false
    }

    fn kill_stragglers(&self) {
        let content = match fs::read_to_string(self.path.join("cgroup.procs")) {
            Ok(c) => c,
            Err(_) => return,
        };
        for line in content.lines() {
            if let Ok(pid) = line.trim().parse::<i32>() {
                unsafe {
                    libc::kill(pid, libc::SIGKILL);
                }
            }
        }
    }
}

impl Drop for TestCgroup {
    fn drop(&mut self) {
        self.kill_stragglers();
        if let Err(err) = fs::remove_dir(&self.path) {
            warn!("failed to remove cgroup {}: {}", self.path.display(), err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_does_not_panic() {
        // result depends on the host; both answers are fine
        let _ = available();
    }

    #[test]
    fn group_lifecycle_when_available() {
        if !available() {
            return;
        }
        let cg = TestCgroup::create(std::process::id()).unwrap();
        assert!(cg.path.exists());
        assert!(!cg.oom_killed());
    }
}
