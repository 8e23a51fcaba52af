//! Building reports from collections, and picking among stored ones.

use std::cmp::Ordering;

use crate::delta::{enrich, PreviousSample};
use crate::sampler::Collection;
use crate::types::{Report, SystemSnapshot};

impl Report {
    /// Apply deltas against `previous` and return the report together with
    /// the cache the next pass should diff against.
    pub fn build(collection: Collection, previous: &PreviousSample) -> (Report, PreviousSample) {
        let Collection {
            timestamp,
            counters,
            processes,
            ..
        } = collection;
        let total_delta = previous.total_delta(counters.total_reductions);
        let next = PreviousSample::from_pass(counters.total_reductions, &processes);
        let samples = enrich(processes, &previous.by_pid, total_delta);
        let report = Report {
            system: SystemSnapshot {
                node: counters.node,
                timestamp,
                cpu_load: counters.cpu_load,
                process_count: counters.process_count,
                run_queue: counters.run_queue,
                reductions_delta: total_delta,
                memory: counters.memory,
            },
            samples,
        };
        (report, next)
    }
}

/// The `n` reports with the highest CPU load, highest first. Reports without
/// a load figure sort last; equal loads keep their original order.
pub fn top(reports: &[Report], n: usize) -> Vec<Report> {
    let mut v: Vec<&Report> = reports.iter().collect();
    v.sort_by(|a, b| match (a.system.cpu_load, b.system.cpu_load) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    v.into_iter().take(n).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::RuntimeCounters;
    use crate::types::{Pid, RawMetrics};
    use chrono::Local;

    fn collection(total: u64, procs: &[(u32, u64)]) -> Collection {
        Collection {
            timestamp: Local::now(),
            counters: RuntimeCounters {
                node: "n@h".into(),
                total_reductions: total,
                ..RuntimeCounters::default()
            },
            processes: procs
                .iter()
                .map(|&(id, reds)| {
                    let mut m = RawMetrics::new(Pid::local(id));
                    m.reductions = reds;
                    m
                })
                .collect(),
            dropped: 0,
        }
    }

    #[test]
    fn consecutive_builds_chain_the_cache() {
        let (first, cache) = Report::build(collection(1500, &[(1, 1000), (2, 500)]), &PreviousSample::default());
        assert_eq!(first.system.reductions_delta, 1500);
        assert_eq!(first.samples[0].percent, 66.67);
        assert_eq!(first.samples[1].percent, 33.33);
        assert_eq!(cache.len(), 2);

        let (second, _) = Report::build(collection(1600, &[(7, 250), (1, 1100)]), &cache);
        assert_eq!(second.system.reductions_delta, 100);
        assert_eq!(second.samples[0].reduction_delta, 250);
        assert_eq!(second.samples[1].reduction_delta, 100);
        assert_eq!(second.samples[1].percent, 100.0);
    }

    fn with_load(load: Option<f64>) -> Report {
        let (mut r, _) = Report::build(collection(0, &[]), &PreviousSample::default());
        r.system.cpu_load = load;
        r
    }

    #[test]
    fn top_orders_by_load_and_ignores_missing() {
        let reports = vec![
            with_load(Some(10.0)),
            with_load(None),
            with_load(Some(80.0)),
            with_load(Some(35.5)),
        ];
        let loads: Vec<Option<f64>> = top(&reports, 3).iter().map(|r| r.system.cpu_load).collect();
        assert_eq!(loads, vec![Some(80.0), Some(35.5), Some(10.0)]);
        assert_eq!(top(&reports, 10).len(), 4);
        assert!(top(&reports, 0).is_empty());
    }
}
