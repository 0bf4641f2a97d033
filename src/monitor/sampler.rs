use chrono::Utc;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};

use super::types::{ActivitySample, ProcessUsage, SystemLoad};

const MAX_TOP_PROCESSES: usize = 5;
const MIN_CPU_PERCENT: f64 = 0.1;

/// Sentinel used when no process qualifies as the foreground candidate.
pub const UNKNOWN_WINDOW: &str = "Unknown";

/// Captures one `ActivitySample` per tick from the host's process table.
///
/// There is no true foreground-window API here; the highest-CPU process name
/// stands in for the active window. Partial telemetry degrades to sentinels
/// instead of failing the tick.
pub struct Sampler {
    system: System,
    machine_id: String,
}

impl Sampler {
    pub fn new(machine_id: String) -> Self {
        Self {
            system: System::new(),
            machine_id,
        }
    }

    pub fn capture(&mut self) -> ActivitySample {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            ProcessRefreshKind::new().with_cpu().with_memory(),
        );
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();

        let total_memory = self.system.total_memory();
        let processes = self
            .system
            .processes()
            .values()
            .map(|process| ProcessUsage {
                name: process.name().to_string_lossy().into_owned(),
                cpu_percent: process.cpu_usage() as f64,
                mem_percent: if total_memory > 0 {
                    process.memory() as f64 / total_memory as f64 * 100.0
                } else {
                    0.0
                },
            })
            .collect();

        let load = SystemLoad {
            cpu_percent: self.system.global_cpu_usage() as f64,
            cpu_core_count: self.system.cpus().len(),
        };

        build_sample(&self.machine_id, processes, load)
    }
}

/// Assemble a sample from raw process rows. Separate from `Sampler` so the
/// filter/sort/truncate rules are testable without a live process table.
fn build_sample(
    machine_id: &str,
    mut processes: Vec<ProcessUsage>,
    load: SystemLoad,
) -> ActivitySample {
    processes.retain(|p| p.cpu_percent > MIN_CPU_PERCENT);
    processes.sort_by(|a, b| {
        b.cpu_percent
            .partial_cmp(&a.cpu_percent)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    processes.truncate(MAX_TOP_PROCESSES);

    for process in &mut processes {
        process.cpu_percent = round2(process.cpu_percent);
        process.mem_percent = round2(process.mem_percent);
    }

    let active_window = processes
        .first()
        .map(|p| p.name.clone())
        .unwrap_or_else(|| UNKNOWN_WINDOW.to_string());

    ActivitySample {
        timestamp: Utc::now(),
        machine_id: machine_id.to_string(),
        active_window,
        top_processes: processes,
        system_load: SystemLoad {
            cpu_percent: round2(load.cpu_percent),
            cpu_core_count: load.cpu_core_count,
        },
        productivity: Default::default(),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::types::Productivity;

    fn usage(name: &str, cpu: f64) -> ProcessUsage {
        ProcessUsage {
            name: name.to_string(),
            cpu_percent: cpu,
            mem_percent: 1.0,
        }
    }

    fn load() -> SystemLoad {
        SystemLoad {
            cpu_percent: 12.3456,
            cpu_core_count: 8,
        }
    }

    #[test]
    fn keeps_at_most_five_processes_sorted_by_cpu() {
        let processes = vec![
            usage("a", 1.0),
            usage("b", 9.0),
            usage("c", 3.0),
            usage("d", 7.0),
            usage("e", 5.0),
            usage("f", 2.0),
            usage("g", 4.0),
        ];

        let sample = build_sample("machine", processes, load());

        assert_eq!(sample.top_processes.len(), 5);
        for pair in sample.top_processes.windows(2) {
            assert!(pair[0].cpu_percent >= pair[1].cpu_percent);
        }
        assert_eq!(sample.active_window, "b");
    }

    #[test]
    fn filters_idle_processes() {
        let processes = vec![usage("busy", 2.5), usage("idle", 0.05), usage("zero", 0.0)];

        let sample = build_sample("machine", processes, load());

        assert_eq!(sample.top_processes.len(), 1);
        assert_eq!(sample.top_processes[0].name, "busy");
    }

    #[test]
    fn rounds_percentages_to_two_decimals() {
        let processes = vec![ProcessUsage {
            name: "proc".into(),
            cpu_percent: 3.14159,
            mem_percent: 2.71828,
        }];

        let sample = build_sample("machine", processes, load());

        assert_eq!(sample.top_processes[0].cpu_percent, 3.14);
        assert_eq!(sample.top_processes[0].mem_percent, 2.72);
        assert_eq!(sample.system_load.cpu_percent, 12.35);
    }

    #[test]
    fn empty_process_table_degrades_to_sentinel() {
        let sample = build_sample("machine", Vec::new(), load());

        assert_eq!(sample.active_window, UNKNOWN_WINDOW);
        assert!(sample.top_processes.is_empty());
        assert_eq!(sample.productivity, Productivity::Neutral);
    }

    #[test]
    fn live_capture_respects_limits() {
        let mut sampler = Sampler::new("machine".into());
        let sample = sampler.capture();

        assert!(sample.top_processes.len() <= 5);
        for pair in sample.top_processes.windows(2) {
            assert!(pair[0].cpu_percent >= pair[1].cpu_percent);
        }
        assert!(!sample.active_window.is_empty());
    }
}
