//! Aggregate statistics derived from the process table.
//!
//! Counts and totals are tallied directly from processes; load, thermal and
//! battery figures are smoothed walks seeded by the previous snapshot so they
//! stay correlated with CPU load instead of jumping independently.

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::config::SimulationConfig;
use crate::sim::catalog::{self, DiskDirectory};
use crate::sim::model::{
    BatteryStats, ConnectionState, DiskNode, DiskStats, NetworkConnection, NetworkStats,
    Process, ProcessState, StressMode, SystemStats, ThermalStats,
};

const LOAD_WINDOWS_SECS: [f64; 3] = [60.0, 300.0, 900.0];
const SAFE_TEMP_FLOOR: f64 = 40.0;
const SAFE_TEMP_CEILING: f64 = 95.0;
const CHARGE_RATE_PER_MIN: f64 = 1.5;
const LOW_BATTERY: f64 = 20.0;

/// Direct counts over a process table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tally {
    pub total_cpu: f64,
    pub total_memory: f64,
    pub total: usize,
    pub running: usize,
    pub sleeping: usize,
    pub threads: u64,
}

pub fn tally(processes: &[Process], config: &SimulationConfig) -> Tally {
    let cpu_sum: f64 = processes.iter().map(|p| p.cpu_usage.max(0.0)).sum();
    let mem_sum: f64 = processes.iter().map(|p| p.memory_usage.max(0.0)).sum();

    Tally {
        total_cpu: (cpu_sum / catalog::LOGICAL_CORES).clamp(0.0, 100.0),
        total_memory: mem_sum.min(config.total_memory_mb),
        total: processes.len(),
        running: processes
            .iter()
            .filter(|p| p.state == ProcessState::Running)
            .count(),
        sleeping: processes
            .iter()
            .filter(|p| p.state == ProcessState::Sleeping)
            .count(),
        threads: processes.iter().map(|p| u64::from(p.threads)).sum(),
    }
}

/// Refresh the process-derived fields after a command edited the table.
pub fn retally(stats: &mut SystemStats, processes: &[Process], config: &SimulationConfig) {
    let tally = tally(processes, config);
    stats.total_cpu_usage = tally.total_cpu;
    stats.total_memory_usage = tally.total_memory;
    stats.total_processes = tally.total;
    stats.running_processes = tally.running;
    stats.sleeping_processes = tally.sleeping;
    stats.active_threads = tally.threads;
    stats.health_score = health_score(stats);
}

/// Health in [0, 100]; lower is worse. Pure function of the stats.
pub fn health_score(stats: &SystemStats) -> u8 {
    let cpu = stats.total_cpu_usage.clamp(0.0, 100.0);
    let memory_pressure = (stats.memory_percent() / 100.0).clamp(0.0, 1.0);
    let disk_pressure = (stats.disk_percent() / 100.0).clamp(0.0, 1.0);
    let thermal_pressure = ((stats.thermal.cpu_temp - SAFE_TEMP_FLOOR)
        / (SAFE_TEMP_CEILING - SAFE_TEMP_FLOOR))
        .clamp(0.0, 1.0);

    let penalty =
        0.35 * cpu + 30.0 * memory_pressure + 20.0 * thermal_pressure + 15.0 * disk_pressure;
    let score = (100.0 - penalty).round();
    if score.is_finite() {
        score.clamp(0.0, 100.0) as u8
    } else {
        0
    }
}

/// Stats for a freshly booted machine.
pub fn initial_stats(
    processes: &[Process],
    disk_nodes: &[DiskNode],
    started_at: DateTime<Utc>,
    config: &SimulationConfig,
) -> SystemStats {
    let tally = tally(processes, config);
    let node_mb: f64 = disk_nodes.iter().map(|n| n.size).sum();
    let used_space = catalog::INITIAL_USED_DISK_GB
        .max(node_mb / 1024.0)
        .min(config.disk_size_gb);
    let runnable = tally.total_cpu / 100.0 * catalog::LOGICAL_CORES;

    let mut stats = SystemStats {
        total_cpu_usage: tally.total_cpu,
        load_average: [runnable; 3],
        total_memory_usage: tally.total_memory,
        total_memory_available: config.total_memory_mb,
        total_processes: tally.total,
        running_processes: tally.running,
        sleeping_processes: tally.sleeping,
        active_threads: tally.threads,
        uptime: 0.0,
        timestamp: started_at,
        network: NetworkStats::default(),
        disk: DiskStats {
            read_speed: 0.0,
            write_speed: 0.0,
            total_space: config.disk_size_gb,
            used_space,
        },
        battery: BatteryStats {
            level: 100.0,
            is_charging: false,
            time_left: 100.0 / discharge_rate(tally.total_cpu),
        },
        thermal: ThermalStats {
            cpu_temp: 40.0,
            gpu_temp: 38.0,
            fan_speed: 1000.0,
            voltage: 1.1,
        },
        health_score: 0,
    };
    stats.health_score = health_score(&stats);
    stats
}

/// Grow directory sizes and report the total growth in MB.
///
/// Growth is limited to the free space left on the volume.
pub fn grow_disk_nodes<R: Rng + ?Sized>(
    nodes: &[DiskNode],
    elapsed_secs: f64,
    previous_used_gb: f64,
    config: &SimulationConfig,
    rng: &mut R,
) -> (Vec<DiskNode>, f64) {
    let capacity_mb = config.disk_size_gb * 1024.0;
    let headroom_mb = (capacity_mb - previous_used_gb * 1024.0).max(0.0);

    let growth: Vec<f64> = nodes
        .iter()
        .map(|node| {
            let rate = template_for(&node.name)
                .map(|d| d.growth_per_sec)
                .unwrap_or(0.1);
            if rate > 0.0 {
                rng.gen_range(0.0..=rate) * elapsed_secs
            } else {
                0.0
            }
        })
        .collect();

    let wanted: f64 = growth.iter().sum();
    let scale = if wanted > headroom_mb && wanted > 0.0 {
        headroom_mb / wanted
    } else {
        1.0
    };

    let grown = nodes
        .iter()
        .zip(&growth)
        .map(|(node, delta)| {
            let size = node.size.max(0.0) + delta * scale;
            DiskNode {
                name: node.name.clone(),
                size,
                color: node.color.clone(),
                percentage: percentage_of(size, capacity_mb),
            }
        })
        .collect();

    (grown, wanted * scale)
}

pub fn percentage_of(size_mb: f64, capacity_mb: f64) -> f64 {
    if capacity_mb > 0.0 {
        size_mb / capacity_mb * 100.0
    } else {
        0.0
    }
}

fn template_for(name: &str) -> Option<&'static DiskDirectory> {
    catalog::DISK_DIRECTORIES.iter().find(|d| d.name == name)
}

/// Inputs to [`next_stats`] besides the previous snapshot.
pub struct StatsInput<'a> {
    pub processes: &'a [Process],
    pub connections: &'a [NetworkConnection],
    pub disk_growth_mb: f64,
    pub elapsed_secs: f64,
    pub stress: StressMode,
}

/// Compute the next aggregate snapshot.
pub fn next_stats<R: Rng + ?Sized>(
    previous: &SystemStats,
    input: StatsInput<'_>,
    config: &SimulationConfig,
    rng: &mut R,
) -> SystemStats {
    let elapsed = input.elapsed_secs.max(0.0);
    let tally = tally(input.processes, config);

    let mut stats = SystemStats {
        total_cpu_usage: tally.total_cpu,
        load_average: load_average(previous.load_average, tally.total_cpu, elapsed),
        total_memory_usage: tally.total_memory,
        total_memory_available: config.total_memory_mb,
        total_processes: tally.total,
        running_processes: tally.running,
        sleeping_processes: tally.sleeping,
        active_threads: tally.threads,
        uptime: previous.uptime + elapsed,
        timestamp: previous.timestamp + chrono::Duration::milliseconds((elapsed * 1000.0) as i64),
        network: network_stats(input.connections, input.stress, rng),
        disk: disk_stats(previous, &tally, input.disk_growth_mb, elapsed, config, rng),
        battery: battery_step(previous.battery, tally.total_cpu, elapsed),
        thermal: thermal_step(previous.thermal, tally.total_cpu, rng),
        health_score: 0,
    };
    stats.health_score = health_score(&stats);
    stats
}

fn load_average(previous: [f64; 3], total_cpu: f64, elapsed: f64) -> [f64; 3] {
    let runnable = total_cpu / 100.0 * catalog::LOGICAL_CORES;
    let mut next = previous;
    for (load, window) in next.iter_mut().zip(LOAD_WINDOWS_SECS) {
        let decay = (-elapsed / window).exp();
        *load = (*load * decay + runnable * (1.0 - decay)).max(0.0);
    }
    next
}

fn network_stats<R: Rng + ?Sized>(
    connections: &[NetworkConnection],
    stress: StressMode,
    rng: &mut R,
) -> NetworkStats {
    let established = connections
        .iter()
        .filter(|c| c.state == ConnectionState::Established)
        .count() as f64;

    let mut download = established * rng.gen_range(20.0..120.0) + rng.gen_range(5.0..50.0);
    let mut upload = established * rng.gen_range(5.0..40.0) + rng.gen_range(1.0..20.0);

    if stress == StressMode::Network {
        download = download * 8.0 + rng.gen_range(5_000.0..20_000.0);
        upload = upload * 6.0 + rng.gen_range(2_000.0..8_000.0);
    }

    NetworkStats {
        upload_speed: upload,
        download_speed: download,
    }
}

fn disk_stats<R: Rng + ?Sized>(
    previous: &SystemStats,
    tally: &Tally,
    growth_mb: f64,
    elapsed: f64,
    config: &SimulationConfig,
    rng: &mut R,
) -> DiskStats {
    let capacity = config.disk_size_gb;
    let drift_gb = rng.gen_range(0.0..0.002) * elapsed;
    let used_space = (previous.disk.used_space + growth_mb / 1024.0 + drift_gb).min(capacity);

    // Swapping shows up as write pressure once memory is nearly full.
    let memory_pressure = tally.total_memory / config.total_memory_mb.max(1.0);
    let swap = if memory_pressure > 0.9 {
        rng.gen_range(20.0..80.0)
    } else {
        0.0
    };

    DiskStats {
        read_speed: rng.gen_range(0.0..40.0),
        write_speed: rng.gen_range(0.0..25.0) + swap,
        total_space: capacity,
        used_space: used_space.max(previous.disk.used_space.min(capacity)),
    }
}

fn discharge_rate(total_cpu: f64) -> f64 {
    0.4 + total_cpu.clamp(0.0, 100.0) / 100.0 * 1.2
}

fn battery_step(previous: BatteryStats, total_cpu: f64, elapsed: f64) -> BatteryStats {
    let minutes = elapsed / 60.0;
    let drain = discharge_rate(total_cpu);
    let mut level = previous.level;
    let mut is_charging = previous.is_charging;

    if is_charging {
        level += CHARGE_RATE_PER_MIN * minutes;
        if level >= 100.0 {
            level = 100.0;
            is_charging = false;
        }
    } else {
        level -= drain * minutes;
        if level <= LOW_BATTERY {
            is_charging = true;
        }
    }
    let level = level.clamp(0.0, 100.0);

    let time_left = if is_charging {
        (100.0 - level) / CHARGE_RATE_PER_MIN
    } else {
        level / drain
    };

    BatteryStats {
        level,
        is_charging,
        time_left,
    }
}

fn thermal_step<R: Rng + ?Sized>(
    previous: ThermalStats,
    total_cpu: f64,
    rng: &mut R,
) -> ThermalStats {
    let cpu_target = 35.0 + total_cpu * 0.5;
    let gpu_target = 33.0 + total_cpu * 0.3;

    let cpu_temp = (previous.cpu_temp
        + (cpu_target - previous.cpu_temp) * 0.3
        + rng.gen_range(-1.5..=1.5))
    .clamp(30.0, 105.0);
    let gpu_temp = (previous.gpu_temp
        + (gpu_target - previous.gpu_temp) * 0.3
        + rng.gen_range(-1.0..=1.0))
    .clamp(30.0, 100.0);
    let fan_speed =
        (1000.0 + (cpu_temp - 40.0) * 90.0 + rng.gen_range(-50.0..=50.0)).clamp(800.0, 6000.0);
    let voltage = 1.0 + total_cpu / 100.0 * 0.35 + rng.gen_range(-0.02..=0.02);

    ThermalStats {
        cpu_temp,
        gpu_temp,
        fan_speed,
        voltage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::model::{Priority, ProcessState};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn process(pid: u32, cpu: f64, mem: f64, state: ProcessState) -> Process {
        Process {
            pid,
            name: "node".to_string(),
            user: "admin".to_string(),
            state,
            cpu_usage: cpu,
            memory_usage: mem,
            priority: Priority::Normal,
            uptime: 0.0,
            command: "node".to_string(),
            is_system: false,
            threads: 4,
            state_ticks: 0,
        }
    }

    fn baseline(processes: &[Process]) -> SystemStats {
        initial_stats(processes, &[], Utc::now(), &SimulationConfig::default())
    }

    #[test]
    fn tally_counts_states_and_caps_totals() {
        let config = SimulationConfig {
            total_memory_mb: 1000.0,
            ..SimulationConfig::default()
        };
        let processes = vec![
            process(1, 100.0, 600.0, ProcessState::Running),
            process(2, 100.0, 600.0, ProcessState::Sleeping),
            process(3, 0.0, 10.0, ProcessState::Stopped),
        ];

        let t = tally(&processes, &config);
        assert_eq!(t.total, 3);
        assert_eq!(t.running, 1);
        assert_eq!(t.sleeping, 1);
        assert_eq!(t.threads, 12);
        assert_eq!(t.total_memory, 1000.0);
        assert_eq!(t.total_cpu, 200.0 / catalog::LOGICAL_CORES);
    }

    #[test]
    fn health_score_is_pure_and_bounded() {
        let processes = vec![process(1, 10.0, 100.0, ProcessState::Running)];
        let mut stats = baseline(&processes);
        assert_eq!(health_score(&stats), health_score(&stats.clone()));

        stats.total_cpu_usage = 100.0;
        stats.total_memory_usage = stats.total_memory_available;
        stats.thermal.cpu_temp = 120.0;
        stats.disk.used_space = stats.disk.total_space;
        assert_eq!(health_score(&stats), 0);

        stats.total_cpu_usage = 0.0;
        stats.total_memory_usage = 0.0;
        stats.thermal.cpu_temp = 30.0;
        stats.disk.used_space = 0.0;
        assert_eq!(health_score(&stats), 100);
    }

    #[test]
    fn health_drops_as_cpu_rises() {
        let mut stats = baseline(&[process(1, 10.0, 100.0, ProcessState::Running)]);
        stats.total_cpu_usage = 10.0;
        let calm = health_score(&stats);
        stats.total_cpu_usage = 90.0;
        assert!(health_score(&stats) < calm);
    }

    #[test]
    fn load_average_converges_towards_cpu() {
        let mut load = [0.0; 3];
        for _ in 0..400 {
            load = load_average(load, 50.0, 1.5);
        }
        assert!((load[0] - 4.0).abs() < 0.01, "1m load was {}", load[0]);
        assert!(load[2] < load[0]);
    }

    #[test]
    fn temperature_follows_cpu_load() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut hot = baseline(&[]).thermal;
        let mut cool = hot;
        for _ in 0..30 {
            hot = thermal_step(hot, 100.0, &mut rng);
            cool = thermal_step(cool, 5.0, &mut rng);
        }
        assert!(hot.cpu_temp > cool.cpu_temp + 20.0);
        assert!(hot.fan_speed > cool.fan_speed);
    }

    #[test]
    fn battery_switches_to_charging_when_low() {
        let low = BatteryStats {
            level: 20.5,
            is_charging: false,
            time_left: 10.0,
        };
        let next = battery_step(low, 100.0, 60.0);
        assert!(next.is_charging);
        assert!(next.level >= 0.0);

        let nearly_full = BatteryStats {
            level: 99.9,
            is_charging: true,
            time_left: 0.1,
        };
        let next = battery_step(nearly_full, 0.0, 60.0);
        assert!(!next.is_charging);
        assert_eq!(next.level, 100.0);
    }

    #[test]
    fn disk_growth_respects_capacity() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let config = SimulationConfig::default();
        let nodes = vec![DiskNode {
            name: "/tmp".to_string(),
            size: 500.0,
            color: "#64748b".to_string(),
            percentage: 0.0,
        }];

        let (grown, growth) =
            grow_disk_nodes(&nodes, 10_000.0, config.disk_size_gb - 0.001, &config, &mut rng);
        assert!(growth <= 0.001 * 1024.0 + 1e-9);
        assert!(grown[0].size >= 500.0);
        assert!(
            (grown[0].percentage - percentage_of(grown[0].size, config.disk_size_gb * 1024.0))
                .abs()
                < 1e-9
        );
    }
}
