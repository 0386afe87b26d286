use std::path::PathBuf;
use std::sync::Arc;

use tokio::process::Command;

use crate::core::traits::probe::MemoryProbe;

const KIB_PER_MIB: f64 = 1024.0;

/// Picks the probe that works on the platform we were built for.
pub fn probe_for_platform() -> Arc<dyn MemoryProbe> {
    if cfg!(target_os = "linux") {
        Arc::new(ProcfsProbe::default())
    } else if cfg!(any(
        target_os = "macos",
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd"
    )) {
        Arc::new(PsProbe::default())
    } else {
        Arc::new(NullProbe)
    }
}

/// Reads `VmRSS` from `/proc/<pid>/status`.
#[derive(Clone, Debug)]
pub struct ProcfsProbe {
    proc_dir: PathBuf,
}

impl Default for ProcfsProbe {
    fn default() -> Self {
        Self {
            proc_dir: PathBuf::from("/proc"),
        }
    }
}

#[async_trait::async_trait]
impl MemoryProbe for ProcfsProbe {
    async fn sample(&self, pid: u32) -> Option<f64> {
        let status_path = self.proc_dir.join(pid.to_string()).join("status");
        let status = tokio::fs::read_to_string(status_path).await.ok()?;
        parse_vm_rss(&status)
    }
}

/// Asks `ps` for the resident set size.
#[derive(Clone, Debug)]
pub struct PsProbe {
    ps_path: PathBuf,
}

impl Default for PsProbe {
    fn default() -> Self {
        Self {
            ps_path: PathBuf::from("ps"),
        }
    }
}

#[async_trait::async_trait]
impl MemoryProbe for PsProbe {
    async fn sample(&self, pid: u32) -> Option<f64> {
        let out = Command::new(&self.ps_path)
            .args(["-o", "rss=", "-p"])
            .arg(pid.to_string())
            .kill_on_drop(true)
            .output()
            .await
            .ok()?;

        if !out.status.success() {
            return None;
        }
        parse_ps_rss(&String::from_utf8_lossy(&out.stdout))
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NullProbe;

#[async_trait::async_trait]
impl MemoryProbe for NullProbe {
    async fn sample(&self, _pid: u32) -> Option<f64> {
        None
    }
}

/// Zombies and kernel threads have no `VmRSS` line.
fn parse_vm_rss(status: &str) -> Option<f64> {
    let line = status.lines().find(|line| line.starts_with("VmRSS:"))?;
    let kib: u64 = line
        .trim_start_matches("VmRSS:")
        .split_whitespace()
        .next()?
        .parse()
        .ok()?;
    Some(kib as f64 / KIB_PER_MIB)
}

fn parse_ps_rss(stdout: &str) -> Option<f64> {
    let kib: u64 = stdout.trim().parse().ok()?;
    Some(kib as f64 / KIB_PER_MIB)
}
