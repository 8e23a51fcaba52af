//! Scriptable in-memory provider shared by the integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use proctop_core::{MetricsProvider, Pid, ProviderError, RawMetrics, RuntimeCounters};

#[derive(Default)]
pub struct FakeRuntime {
    procs: Mutex<BTreeMap<Pid, RawMetrics>>,
    total: Mutex<u64>,
    // sleep inside every processes() call
    delay: Mutex<Duration>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set reductions for `<0.id.0>`, adding the process if needed.
    pub fn set(&self, id: u32, reductions: u64) {
        let mut procs = self.procs.lock().unwrap();
        procs
            .entry(Pid::local(id))
            .or_insert_with(|| RawMetrics::new(Pid::local(id)))
            .reductions = reductions;
    }

    pub fn kill(&self, id: u32) {
        self.procs.lock().unwrap().remove(&Pid::local(id));
    }

    pub fn set_total(&self, total: u64) {
        *self.total.lock().unwrap() = total;
    }

    pub fn slow_down(&self, d: Duration) {
        *self.delay.lock().unwrap() = d;
    }
}

impl MetricsProvider for FakeRuntime {
    fn processes(&self) -> Vec<Pid> {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        self.procs.lock().unwrap().keys().copied().collect()
    }

    fn metrics(&self, pid: Pid) -> Result<RawMetrics, ProviderError> {
        self.procs
            .lock()
            .unwrap()
            .get(&pid)
            .cloned()
            .ok_or(ProviderError::ProcessGone(pid))
    }

    fn counters(&self) -> RuntimeCounters {
        RuntimeCounters {
            node: "fake@localhost".into(),
            cpu_load: Some(12.5),
            process_count: self.procs.lock().unwrap().len() as u64,
            total_reductions: *self.total.lock().unwrap(),
            ..RuntimeCounters::default()
        }
    }
}
