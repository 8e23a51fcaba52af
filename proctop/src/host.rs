//! sysinfo-backed provider: OS processes stand in for lightweight processes.
//!
//! Accumulated CPU time (ms) plays the role of the reduction counter, so
//! per-pass deltas are CPU milliseconds spent since the previous pass.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use proctop_core::{
    MemoryBreakdown, Mfa, MetricsProvider, Pid, ProcessStatus, ProviderError, RawMetrics, RuntimeCounters,
};
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};

pub struct HostProvider {
    sys: Mutex<System>,
    cpu: Mutex<CpuTotal>,
    hostname: String,
}

/// Monotonic runtime-wide CPU time. Exited processes keep their share, so the
/// total never drops when a process goes away.
#[derive(Debug, Default)]
struct CpuTotal {
    last: HashMap<u32, u64>,
    total: u64,
}

impl CpuTotal {
    /// Fold in the current per-pid CPU times and return the new total. A new
    /// pid, or one whose counter restarted, contributes its whole count.
    fn advance(&mut self, live: impl IntoIterator<Item = (u32, u64)>) -> u64 {
        let mut next = HashMap::with_capacity(self.last.len());
        for (pid, cur) in live {
            let spent = match self.last.get(&pid) {
                Some(&prev) if cur >= prev => cur - prev,
                _ => cur,
            };
            self.total = self.total.saturating_add(spent);
            next.insert(pid, cur);
        }
        self.last = next;
        self.total
    }
}

impl HostProvider {
    pub fn new() -> Self {
        let hostname = System::host_name().unwrap_or_else(|| "unknown".into());
        Self {
            sys: Mutex::new(System::new()),
            cpu: Mutex::new(CpuTotal::default()),
            hostname,
        }
    }

    fn sys(&self) -> MutexGuard<'_, System> {
        // a panic mid-refresh leaves the System usable; keep going
        self.sys.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for HostProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn map_status(s: sysinfo::ProcessStatus) -> ProcessStatus {
    use sysinfo::ProcessStatus as S;
    match s {
        S::Run => ProcessStatus::Running,
        S::Waking => ProcessStatus::Runnable,
        S::Sleep | S::Idle | S::UninterruptibleDiskSleep | S::LockBlocked | S::Parked => ProcessStatus::Waiting,
        S::Stop | S::Tracing => ProcessStatus::Suspended,
        S::Zombie | S::Dead | S::Wakekill => ProcessStatus::Exiting,
        _ => ProcessStatus::Unknown,
    }
}

impl MetricsProvider for HostProvider {
    fn processes(&self) -> Vec<Pid> {
        let mut sys = self.sys();
        sys.refresh_cpu_usage();
        sys.refresh_memory();
        sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing()
                .with_cpu()
                .with_memory()
                .with_exe(UpdateKind::OnlyIfNotSet)
                .with_cmd(UpdateKind::OnlyIfNotSet),
        );
        let mut pids: Vec<Pid> = sys.processes().keys().map(|p| Pid::local(p.as_u32())).collect();
        pids.sort();
        pids
    }

    fn metrics(&self, pid: Pid) -> Result<RawMetrics, ProviderError> {
        let sys = self.sys();
        let p = sys
            .process(sysinfo::Pid::from_u32(pid.id))
            .ok_or(ProviderError::ProcessGone(pid))?;

        let mut m = RawMetrics::new(pid);
        let name = p.name().to_string_lossy().into_owned();
        if !name.is_empty() {
            m.registered_name = Some(name);
        }
        m.initial_call = p
            .exe()
            .map(|exe| Mfa::new(exe.display().to_string(), "main", p.cmd().len().min(u8::MAX as usize) as u8));
        m.reductions = p.accumulated_cpu_time();
        m.memory = p.memory();
        m.status = map_status(p.status());
        Ok(m)
    }

    fn counters(&self) -> RuntimeCounters {
        let sys = self.sys();
        let procs = sys.processes();
        let process_rss: u64 = procs.values().map(|p| p.memory()).sum();
        let total_reductions = self
            .cpu
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .advance(procs.iter().map(|(pid, p)| (pid.as_u32(), p.accumulated_cpu_time())));
        RuntimeCounters {
            node: self.hostname.clone(),
            cpu_load: Some(f64::from(sys.global_cpu_usage())),
            process_count: procs.len() as u64,
            run_queue: procs
                .values()
                .filter(|p| p.status() == sysinfo::ProcessStatus::Run)
                .count() as u64,
            total_reductions,
            memory: MemoryBreakdown {
                total: sys.total_memory(),
                processes: process_rss,
                processes_used: process_rss,
                system: sys.used_memory(),
                ..MemoryBreakdown::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(map_status(sysinfo::ProcessStatus::Run), ProcessStatus::Running);
        assert_eq!(map_status(sysinfo::ProcessStatus::Sleep), ProcessStatus::Waiting);
        assert_eq!(map_status(sysinfo::ProcessStatus::Zombie), ProcessStatus::Exiting);
        assert_eq!(map_status(sysinfo::ProcessStatus::Unknown(99)), ProcessStatus::Unknown);
    }

    #[test]
    fn cpu_total_keeps_history_of_exited_processes() {
        let mut cpu = CpuTotal::default();
        assert_eq!(cpu.advance([(1, 900), (2, 1000)]), 1900);
        // pid 1 exits, pid 2 spends another 1000ms
        assert_eq!(cpu.advance([(2, 2000)]), 2900);
        // pid 1 reappears with a fresh counter
        assert_eq!(cpu.advance([(1, 50), (2, 2000)]), 2950);
        // pid 2's counter restarts under reuse
        assert_eq!(cpu.advance([(1, 50), (2, 10)]), 2960);
    }

    #[test]
    fn sees_its_own_process() {
        let host = HostProvider::new();
        let me = Pid::local(std::process::id());
        assert!(host.processes().contains(&me));
        let m = host.metrics(me).expect("own metrics");
        assert!(m.memory > 0);
        if let Some(call) = &m.initial_call {
            assert!(call.arity >= 1, "argv includes the program name: {call}");
        }
        assert!(host.counters().process_count > 0);
    }
}
