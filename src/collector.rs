//! Host statistics sampling for the push agent
//!
//! Each poll refreshes the gauge set from the host and bumps the
//! `PollCount` counter; `RandomValue` changes on every poll. A report
//! drains the accumulated counter, so the hub's merge semantics reconstruct
//! the total across reports.

use rand::Rng;
use sysinfo::System;

use crate::MetricPoint;

pub const POLL_COUNT: &str = "PollCount";
pub const RANDOM_VALUE: &str = "RandomValue";

/// Samples host statistics into metric points.
pub struct Collector {
    system: System,
    poll_count: i64,
    random_value: f64,
}

impl Collector {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            poll_count: 0,
            random_value: 0.0,
        }
    }

    /// Refresh host statistics and bump the poll counter.
    pub fn poll(&mut self) {
        self.system.refresh_memory();
        self.system.refresh_cpu_usage();
        self.poll_count += 1;
        self.random_value = rand::thread_rng().r#gen();
    }

    /// Build the report batch.
    ///
    /// The counter carries the delta accumulated since the last
    /// acknowledged report; the hub merges it into the running total. Call
    /// `mark_reported` once the push succeeded so a failed push keeps the
    /// accumulated polls for the next attempt.
    pub fn report(&self) -> Vec<MetricPoint> {
        let cpu_avg = {
            let cpus = self.system.cpus();
            if cpus.is_empty() {
                0.0
            } else {
                cpus.iter().map(|cpu| cpu.cpu_usage() as f64).sum::<f64>() / cpus.len() as f64
            }
        };

        vec![
            MetricPoint::gauge("TotalMemory", self.system.total_memory() as f64),
            MetricPoint::gauge("FreeMemory", self.system.free_memory() as f64),
            MetricPoint::gauge("CPUutilization", cpu_avg),
            MetricPoint::gauge(RANDOM_VALUE, self.random_value),
            MetricPoint::counter(POLL_COUNT, self.poll_count),
        ]
    }

    /// Acknowledge a successful report, resetting the poll counter.
    pub fn mark_reported(&mut self) {
        self.poll_count = 0;
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}
