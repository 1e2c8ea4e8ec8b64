//! Tick engine: turns one world snapshot into the next.
//!
//! The input world is never mutated. Every random draw goes through the
//! caller's RNG, so a seeded generator reproduces a run exactly.

use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;

use crate::config::Config;
use crate::sim::alerts;
use crate::sim::catalog;
use crate::sim::model::{
    AlertSeverity, LogEntry, LogLevel, NetworkConnection, Process, ProcessState, StressMode,
    SystemAlert, World,
};
use crate::sim::network;
use crate::sim::telemetry::{self, StatsInput};

const SLEEP_CHANCE: f64 = 0.05;
const ZOMBIE_CHANCE: f64 = 0.005;
const WAKE_CHANCE: f64 = 0.4;
const MAX_SLEEP_TICKS: u32 = 4;
const ZOMBIE_REAP_TICKS: u32 = 3;
const SPAWN_CHANCE_BELOW_TARGET: f64 = 0.3;
const SPAWN_CHANCE_AT_TARGET: f64 = 0.05;
const CHATTER_CHANCE: f64 = 0.15;

const KERNEL_CHATTER: &[(&str, &str)] = &[
    ("kernel", "IOThunderboltSwitch: link training complete"),
    ("kernel", "AppleKeyStore: operation completed"),
    ("mDNSResponder", "mDNS: probe succeeded for local hostname"),
    ("kernel", "ARPT: wl0: leaky AP stats refreshed"),
    ("configd", "network changed: v4(en0+:192.168.1.42)"),
    ("kernel", "memorystatus: compressor pages reclaimed"),
    ("powerd", "Sleep assertions released by coreaudiod"),
];

/// Output of one engine step.
#[derive(Debug, Clone)]
pub struct TickResult {
    pub world: World,
    pub new_alerts: Vec<SystemAlert>,
    pub new_logs: Vec<LogEntry>,
    pub connections: Vec<NetworkConnection>,
}

/// Advance the world by `elapsed` under the given stress mode.
pub fn advance<R: Rng + ?Sized>(
    world: &World,
    elapsed: Duration,
    stress: StressMode,
    config: &Config,
    rng: &mut R,
) -> TickResult {
    let elapsed_secs = elapsed.as_secs_f64();
    let mut next = world.clone();
    next.tick += 1;
    next.stats.timestamp =
        world.stats.timestamp + chrono::Duration::milliseconds(elapsed.as_millis() as i64);

    let mut logs = Vec::new();

    // 1. Per-process dynamics, then population control.
    let mut processes = step_processes(&world.processes, elapsed_secs, stress, config, rng);
    for process in processes
        .iter()
        .filter(|p| p.state == ProcessState::Zombie && p.state_ticks == 0)
    {
        let entry = next.log(
            LogLevel::Warn,
            "kernel",
            format!("Process {} (PID {}) became a zombie", process.name, process.pid),
        );
        logs.push(entry);
    }
    reap_zombies(&mut processes, &mut next, &mut logs);
    maybe_spawn(&mut processes, &mut next, &mut logs, config, rng);

    // 2. Disk growth and sockets feed the aggregate stats.
    let (disk_nodes, disk_growth_mb) = telemetry::grow_disk_nodes(
        &world.disk_nodes,
        elapsed_secs,
        world.stats.disk.used_space,
        &config.simulation,
        rng,
    );
    let connections = network::synthesize(&processes, stress, rng);

    // 2-3. Aggregates and health.
    let stats = telemetry::next_stats(
        &world.stats,
        StatsInput {
            processes: &processes,
            connections: &connections,
            disk_growth_mb,
            elapsed_secs,
            stress,
        },
        &config.simulation,
        rng,
    );
    next.stats = stats;

    // 4. Alerts on rising edges only.
    let (levels, events) = alerts::evaluate(world.alert_levels, &next.stats, &config.thresholds);
    next.alert_levels = levels;
    let mut new_alerts = Vec::with_capacity(events.len());
    for event in events {
        let level = match event.severity {
            AlertSeverity::Critical => LogLevel::Error,
            AlertSeverity::Warning => LogLevel::Warn,
            AlertSeverity::Info => LogLevel::Info,
        };
        let entry = next.log(level, "monitor", event.message.clone());
        logs.push(entry);
        new_alerts.push(SystemAlert {
            id: next.next_id(),
            severity: event.severity,
            message: event.message,
            timestamp: next.stats.timestamp,
            component: event.component,
        });
    }

    // 5. Cosmetic log lines.
    if next.stats.memory_percent() > 95.0 {
        if let Some(victim) = processes
            .iter()
            .filter(|p| !p.is_system)
            .max_by(|a, b| a.memory_usage.total_cmp(&b.memory_usage))
        {
            let message = format!(
                "memorystatus: low swap, top consumer {} (PID {}) at {:.0}MB",
                victim.name, victim.pid, victim.memory_usage
            );
            let entry = next.log(LogLevel::Error, "kernel", message);
            logs.push(entry);
        }
    }
    if rng.gen_bool(CHATTER_CHANCE) {
        if let Some((source, message)) = KERNEL_CHATTER.choose(rng) {
            let level = if rng.gen_bool(0.5) {
                LogLevel::Kernel
            } else {
                LogLevel::Debug
            };
            let entry = next.log(level, source, message.to_string());
            logs.push(entry);
        }
    }

    // 7. Services only age.
    next.services = world
        .services
        .iter()
        .map(|service| {
            let mut service = service.clone();
            if service.is_active() {
                service.uptime += elapsed_secs;
            }
            service
        })
        .collect();

    next.processes = processes;
    next.disk_nodes = disk_nodes;

    TickResult {
        world: next,
        new_alerts,
        new_logs: logs,
        connections,
    }
}

fn step_processes<R: Rng + ?Sized>(
    processes: &[Process],
    elapsed_secs: f64,
    stress: StressMode,
    config: &Config,
    rng: &mut R,
) -> Vec<Process> {
    let mut stepped: Vec<Process> = processes
        .iter()
        .map(|p| step_process(p, elapsed_secs, stress, rng))
        .collect();

    fit_memory(processes, &mut stepped, stress, config.simulation.total_memory_mb);
    stepped
}

fn step_process<R: Rng + ?Sized>(
    process: &Process,
    elapsed_secs: f64,
    stress: StressMode,
    rng: &mut R,
) -> Process {
    let preset = catalog::preset(&process.name);
    let mut next = process.clone();
    next.uptime += elapsed_secs;

    transition(&mut next, rng);

    let stressed = process.is_stress_target();

    // CPU: mean-reverting walk around the baseline.
    let base_cpu = preset.base_cpu;
    next.cpu_usage = match next.state {
        ProcessState::Stopped | ProcessState::Zombie => 0.0,
        ProcessState::Sleeping => base_cpu * rng.gen_range(0.0..0.1),
        ProcessState::Running => {
            let spread = base_cpu * 0.5 + 1.0;
            let (target, spread) = if stress == StressMode::Cpu && stressed {
                (90.0, spread * 2.0)
            } else {
                (base_cpu, spread)
            };
            let current = process.cpu_usage.max(0.0);
            let bias = if stress == StressMode::Cpu && stressed {
                rng.gen_range(2.0..8.0)
            } else {
                0.0
            };
            current + (target - current) * 0.3 + bias + rng.gen_range(-spread..=spread)
        }
    }
    .clamp(0.0, 100.0);

    // Memory: leak for marked processes, otherwise revert to baseline.
    let base_mem = preset.base_mem;
    next.memory_usage = if stress == StressMode::Memory && stressed {
        process.memory_usage.max(0.0) + rng.gen_range(20.0..80.0)
    } else {
        let current = process.memory_usage.max(0.0);
        let jitter = base_mem * 0.05;
        (current + (base_mem - current) * 0.2 + rng.gen_range(-jitter..=jitter)).max(1.0)
    };

    // Threads wander a little around the baseline.
    let base_threads = preset.base_threads.max(1);
    let delta: i64 = rng.gen_range(-2..=2);
    let extra = if stress == StressMode::Cpu && stressed { 4 } else { 0 };
    let threads = i64::from(process.threads) + delta + extra;
    next.threads = threads.clamp(1, i64::from(base_threads) * 2 + 8) as u32;

    next
}

fn transition<R: Rng + ?Sized>(process: &mut Process, rng: &mut R) {
    let before = process.state;
    let after = match before {
        ProcessState::Running => {
            if !process.is_system && rng.gen_bool(ZOMBIE_CHANCE) {
                ProcessState::Zombie
            } else if rng.gen_bool(SLEEP_CHANCE) {
                ProcessState::Sleeping
            } else {
                ProcessState::Running
            }
        }
        ProcessState::Sleeping => {
            if process.state_ticks + 1 >= MAX_SLEEP_TICKS || rng.gen_bool(WAKE_CHANCE) {
                ProcessState::Running
            } else {
                ProcessState::Sleeping
            }
        }
        ProcessState::Zombie if process.is_system => ProcessState::Running,
        ProcessState::Stopped | ProcessState::Zombie => before,
    };

    if after == before {
        process.state_ticks = process.state_ticks.saturating_add(1);
    } else {
        process.state = after;
        process.state_ticks = 0;
    }
}

/// Keep the table inside physical memory.
///
/// Leaking processes keep their previous footprint; only their increments
/// shrink when space runs out. Everyone else is scaled down first.
fn fit_memory(previous: &[Process], stepped: &mut [Process], stress: StressMode, total: f64) {
    let leaking = |p: &Process| stress == StressMode::Memory && p.is_stress_target();

    let leak_floor: f64 = previous
        .iter()
        .filter(|p| leaking(p))
        .map(|p| p.memory_usage.max(0.0))
        .sum();
    let others: f64 = stepped
        .iter()
        .filter(|p| !leaking(p))
        .map(|p| p.memory_usage)
        .sum();

    if others + leak_floor > total && others > 0.0 {
        let factor = ((total - leak_floor) / others).clamp(0.0, 1.0);
        for process in stepped.iter_mut().filter(|p| !leaking(p)) {
            process.memory_usage *= factor;
        }
    }

    let others: f64 = stepped
        .iter()
        .filter(|p| !leaking(p))
        .map(|p| p.memory_usage)
        .sum();
    let headroom = (total - leak_floor - others).max(0.0);

    let increments: Vec<(usize, f64)> = stepped
        .iter()
        .enumerate()
        .filter(|(_, p)| leaking(p))
        .map(|(i, p)| {
            let before = previous
                .iter()
                .find(|old| old.pid == p.pid)
                .map(|old| old.memory_usage.max(0.0))
                .unwrap_or(0.0);
            (i, (p.memory_usage - before).max(0.0))
        })
        .collect();

    let wanted: f64 = increments.iter().map(|(_, inc)| inc).sum();
    if wanted > headroom && wanted > 0.0 {
        let scale = headroom / wanted;
        for (i, inc) in increments {
            let process = &mut stepped[i];
            process.memory_usage = process.memory_usage - inc + inc * scale;
        }
    }
}

fn reap_zombies(processes: &mut Vec<Process>, world: &mut World, logs: &mut Vec<LogEntry>) {
    let mut reaped = Vec::new();
    let mut remaining = processes.len();
    processes.retain(|p| {
        let expired = p.state == ProcessState::Zombie
            && !p.is_system
            && p.state_ticks >= ZOMBIE_REAP_TICKS;
        if expired && remaining > 1 {
            remaining -= 1;
            reaped.push((p.pid, p.name.clone()));
            false
        } else {
            true
        }
    });

    for (pid, name) in reaped {
        tracing::debug!(pid, name = %name, "reaped zombie");
        let entry = world.log(
            LogLevel::Kernel,
            "kernel",
            format!("Reaped zombie process {} (PID {})", name, pid),
        );
        logs.push(entry);
    }
}

fn maybe_spawn<R: Rng + ?Sized>(
    processes: &mut Vec<Process>,
    world: &mut World,
    logs: &mut Vec<LogEntry>,
    config: &Config,
    rng: &mut R,
) {
    let limits = &config.simulation;
    let max = limits.max_processes.min(catalog::MAX_PROCESSES);
    if processes.len() >= max {
        return;
    }
    let chance = if processes.len() < limits.target_processes {
        SPAWN_CHANCE_BELOW_TARGET
    } else {
        SPAWN_CHANCE_AT_TARGET
    };
    if !rng.gen_bool(chance) {
        return;
    }

    let candidates: Vec<&str> = catalog::all_process_names()
        .filter(|name| {
            processes.iter().filter(|p| p.name == *name).count() < catalog::instance_cap(name)
        })
        .collect();
    let Some(name) = candidates.choose(rng).copied() else {
        return;
    };

    // A newcomer only gets whatever memory is still free.
    let used: f64 = processes.iter().map(|p| p.memory_usage).sum();
    let free = limits.total_memory_mb - used;
    if free < 1.0 {
        return;
    }

    let pid = next_pid(processes, rng);
    let mut process = new_process(pid, name, rng);
    process.memory_usage = process.memory_usage.min(free);
    tracing::debug!(pid, name, "spawned process");
    let entry = world.log(
        LogLevel::Info,
        "kernel",
        format!("Spawned process {} (PID {})", name, pid),
    );
    logs.push(entry);
    processes.push(process);
}

fn next_pid<R: Rng + ?Sized>(processes: &[Process], rng: &mut R) -> u32 {
    let highest = processes.iter().map(|p| p.pid).max().unwrap_or(100);
    highest.saturating_add(rng.gen_range(1..=32))
}

/// Fresh process at its catalog baseline with a little jitter.
pub fn new_process<R: Rng + ?Sized>(pid: u32, name: &str, rng: &mut R) -> Process {
    let preset = catalog::preset(name);
    Process {
        pid,
        name: name.to_string(),
        user: catalog::user_for(name).to_string(),
        state: ProcessState::Running,
        cpu_usage: (preset.base_cpu * rng.gen_range(0.8..1.2)).clamp(0.0, 100.0),
        memory_usage: preset.base_mem * rng.gen_range(0.9..1.1),
        priority: preset.priority,
        uptime: 0.0,
        command: catalog::command_for(name),
        is_system: preset.is_system,
        threads: preset.base_threads,
        state_ticks: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::init::initialize;
    use crate::sim::model::{AlertLevel, Component};
    use chrono::{DateTime, TimeZone, Utc};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const TICK: Duration = Duration::from_millis(1500);

    // Fixed boot time so two worlds built from one seed compare equal.
    fn boot_time() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn seeded_world(seed: u64) -> (World, ChaCha8Rng) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let world = initialize(&Config::default(), boot_time(), &mut rng);
        (world, rng)
    }

    fn run(world: World, ticks: usize, stress: StressMode, rng: &mut ChaCha8Rng) -> Vec<TickResult> {
        run_with(&Config::default(), world, ticks, stress, rng)
    }

    fn run_with(
        config: &Config,
        mut world: World,
        ticks: usize,
        stress: StressMode,
        rng: &mut ChaCha8Rng,
    ) -> Vec<TickResult> {
        let mut results = Vec::with_capacity(ticks);
        for _ in 0..ticks {
            let result = advance(&world, TICK, stress, config, rng);
            world = result.world.clone();
            results.push(result);
        }
        results
    }

    fn assert_invariants(result: &TickResult, config: &Config) {
        let world = &result.world;
        let stats = &world.stats;
        let running = world
            .processes
            .iter()
            .filter(|p| p.state == ProcessState::Running)
            .count();
        let sleeping = world
            .processes
            .iter()
            .filter(|p| p.state == ProcessState::Sleeping)
            .count();

        assert_eq!(stats.total_processes, world.processes.len());
        assert_eq!(stats.running_processes, running);
        assert_eq!(stats.sleeping_processes, sleeping);
        assert!(stats.running_processes + stats.sleeping_processes <= stats.total_processes);
        assert!(!world.processes.is_empty());
        assert!(world.processes.len() <= config.simulation.max_processes);

        let memory: f64 = world.processes.iter().map(|p| p.memory_usage).sum();
        assert!(memory <= stats.total_memory_available + 1e-6, "memory {}", memory);
        assert!(stats.total_cpu_usage >= 0.0 && stats.total_cpu_usage <= 100.0);
        assert!(stats.health_score <= 100);
        assert_eq!(stats.health_score, telemetry::health_score(stats));
        for p in &world.processes {
            assert!(p.cpu_usage >= 0.0 && p.cpu_usage <= 100.0);
            assert!(p.memory_usage >= 0.0);
            assert!(p.threads >= 1);
            if catalog::is_protected(&p.name) {
                assert!(p.is_system);
            }
        }

        let node_mb: f64 = world.disk_nodes.iter().map(|n| n.size).sum();
        assert!(node_mb <= stats.disk.used_space * 1024.0 + 1e-6);
        assert!(stats.disk.used_space <= stats.disk.total_space);

        let mut pids: Vec<u32> = world.processes.iter().map(|p| p.pid).collect();
        pids.sort_unstable();
        pids.dedup();
        assert_eq!(pids.len(), world.processes.len(), "duplicate pids");
    }

    #[test]
    fn first_tick_moves_the_clock_and_stays_calm() {
        let (world, mut rng) = seeded_world(11);
        let result = advance(&world, TICK, StressMode::None, &Config::default(), &mut rng);

        assert!(result.world.stats.timestamp > world.stats.timestamp);
        assert!(result.world.stats.uptime > world.stats.uptime);
        assert!(result.world.stats.total_processes >= 1);
        assert!(result.world.stats.total_processes <= catalog::MAX_PROCESSES);
        assert!(result.new_alerts.is_empty(), "{:?}", result.new_alerts);
        assert_invariants(&result, &Config::default());
    }

    #[test]
    fn same_seed_same_run() {
        let (world_a, mut rng_a) = seeded_world(5);
        let (world_b, mut rng_b) = seeded_world(5);
        let a = run(world_a, 10, StressMode::Cpu, &mut rng_a);
        let b = run(world_b, 10, StressMode::Cpu, &mut rng_b);

        let last_a = &a.last().unwrap().world;
        let last_b = &b.last().unwrap().world;
        assert_eq!(last_a.processes, last_b.processes);
        assert_eq!(last_a.stats, last_b.stats);
    }

    #[test]
    fn invariants_hold_under_every_stress_mode() {
        let config = Config::default();
        for stress in [
            StressMode::None,
            StressMode::Cpu,
            StressMode::Memory,
            StressMode::Network,
        ] {
            let (world, mut rng) = seeded_world(21);
            for result in run(world, 200, stress, &mut rng) {
                assert_invariants(&result, &config);
            }
        }
    }

    #[test]
    fn cpu_stress_raises_average_load() {
        let (world, mut rng) = seeded_world(99);
        let calm = run(world.clone(), 10, StressMode::None, &mut rng.clone());
        let stressed = run(world, 10, StressMode::Cpu, &mut rng);

        let mean = |results: &[TickResult]| {
            results
                .iter()
                .map(|r| r.world.stats.total_cpu_usage)
                .sum::<f64>()
                / results.len() as f64
        };
        assert!(
            mean(&stressed) > mean(&calm),
            "stressed {} vs calm {}",
            mean(&stressed),
            mean(&calm)
        );
    }

    #[test]
    fn memory_leak_never_shrinks_marked_processes() {
        let (mut world, mut rng) = seeded_world(4);
        let config = Config::default();
        for _ in 0..60 {
            let result = advance(&world, TICK, StressMode::Memory, &config, &mut rng);
            for after in result.world.processes.iter().filter(|p| p.is_stress_target()) {
                if let Some(before) = world.process(after.pid) {
                    assert!(
                        after.memory_usage + 1e-9 >= before.memory_usage,
                        "pid {} shrank from {} to {}",
                        after.pid,
                        before.memory_usage,
                        after.memory_usage
                    );
                }
            }
            world = result.world;
        }
    }

    #[test]
    fn sustained_cpu_breach_alerts_once() {
        // Any load at all counts as critical, so the breach never ends.
        let mut config = Config::default();
        config.thresholds.cpu.warning = 0.0;
        config.thresholds.cpu.critical = 0.0;

        let (world, mut rng) = seeded_world(8);
        let results = run_with(&config, world, 40, StressMode::Cpu, &mut rng);
        let cpu_alerts: Vec<&SystemAlert> = results
            .iter()
            .flat_map(|r| r.new_alerts.iter())
            .filter(|a| a.component == Component::Cpu)
            .collect();

        assert_eq!(cpu_alerts.len(), 1, "{:?}", cpu_alerts);
        assert_eq!(cpu_alerts[0].severity, AlertSeverity::Critical);
        assert_eq!(cpu_alerts[0].id, results[0].new_alerts[0].id);
        assert!(results
            .iter()
            .all(|r| r.world.alert_levels.cpu == AlertLevel::Critical));
    }

    #[test]
    fn stopped_processes_stay_stopped() {
        let (mut world, mut rng) = seeded_world(12);
        let pid = world.processes[0].pid;
        world.processes[0].state = ProcessState::Stopped;
        let results = run(world, 20, StressMode::None, &mut rng);
        let last = &results.last().unwrap().world;
        let process = last.process(pid).expect("stopped process is never reaped");
        assert_eq!(process.state, ProcessState::Stopped);
        assert_eq!(process.cpu_usage, 0.0);
    }

    #[test]
    fn zombies_are_reaped() {
        let (mut world, mut rng) = seeded_world(13);
        let victim = world
            .processes
            .iter_mut()
            .find(|p| !p.is_system)
            .expect("user process");
        victim.state = ProcessState::Zombie;
        let pid = victim.pid;

        let results = run(world, ZOMBIE_REAP_TICKS as usize + 1, StressMode::None, &mut rng);
        assert!(results.last().unwrap().world.process(pid).is_none());
        assert!(results
            .iter()
            .flat_map(|r| r.new_logs.iter())
            .any(|l| l.message.contains(&format!("PID {}", pid))));
    }

    #[test]
    fn last_process_survives() {
        let (mut world, mut rng) = seeded_world(14);
        world.processes.retain(|p| !p.is_system);
        world.processes.truncate(1);
        world.processes[0].state = ProcessState::Zombie;
        world.processes[0].state_ticks = ZOMBIE_REAP_TICKS;

        let config = Config {
            simulation: crate::config::SimulationConfig {
                max_processes: 1,
                ..Default::default()
            },
            ..Default::default()
        };
        let result = advance(&world, TICK, StressMode::None, &config, &mut rng);
        assert_eq!(result.world.processes.len(), 1);
    }

    #[test]
    fn active_services_age_and_others_do_not() {
        let (mut world, mut rng) = seeded_world(15);
        world.services[0].status = crate::sim::model::ServiceStatus::Inactive;
        world.services[0].sub_state = crate::sim::model::SubState::Dead;
        world.services[0].uptime = 0.0;
        let before = world.services[1].uptime;

        let result = advance(&world, TICK, StressMode::None, &Config::default(), &mut rng);
        assert_eq!(result.world.services[0].uptime, 0.0);
        assert!((result.world.services[1].uptime - before - 1.5).abs() < 1e-9);
        assert_eq!(result.world.services[1].status, world.services[1].status);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn invariants_hold_for_any_seed(seed in any::<u64>(), mode in 0u8..4, ticks in 1usize..40) {
            let stress = match mode {
                0 => StressMode::None,
                1 => StressMode::Cpu,
                2 => StressMode::Memory,
                _ => StressMode::Network,
            };
            let (world, mut rng) = seeded_world(seed);
            for result in run(world, ticks, stress, &mut rng) {
                assert_invariants(&result, &Config::default());
            }
        }
    }
}
