//! System probe for the profiled process.
//!
//! Uses `sysinfo` for the resident set size, command line and core count.
//! The probe is best effort: a process that cannot be found (recorded input,
//! another host, already exited) simply yields `None`.

use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};

pub struct SystemProbe {
    sys: System,
    pid: Option<sysinfo::Pid>,
    cores: usize,
}

impl SystemProbe {
    #[must_use]
    pub fn new(pid: Option<u32>) -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_all();
        let cores = sys.cpus().len().max(1);
        Self { sys, pid: pid.map(sysinfo::Pid::from_u32), cores }
    }

    /// Logical CPUs available, at least one.
    #[must_use]
    pub fn cores(&self) -> usize {
        self.cores
    }

    #[must_use]
    pub fn target(&self) -> Option<u32> {
        self.pid.map(sysinfo::Pid::as_u32)
    }

    /// Probe `pid` from now on unless a target was already set.
    pub fn target_if_unset(&mut self, pid: u32) {
        if self.pid.is_none() {
            self.pid = Some(sysinfo::Pid::from_u32(pid));
        }
    }

    fn refresh(&mut self) -> Option<&sysinfo::Process> {
        let pid = self.pid?;
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );
        self.sys.process(pid)
    }

    /// Resident memory of the target in bytes.
    pub fn rss(&mut self) -> Option<u64> {
        self.refresh().map(sysinfo::Process::memory)
    }

    /// Command line of the target, space separated.
    pub fn command_line(&mut self) -> Option<String> {
        let pid = self.pid?;
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_cmd(sysinfo::UpdateKind::OnlyIfNotSet),
        );
        let cmd = self.sys.process(pid)?.cmd();
        if cmd.is_empty() {
            return None;
        }
        Some(cmd.iter().map(|arg| arg.to_string_lossy()).collect::<Vec<_>>().join(" "))
    }
}
