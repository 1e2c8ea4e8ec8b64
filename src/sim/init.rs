//! Boot-time world construction.

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::config::Config;
use crate::sim::catalog;
use crate::sim::engine::new_process;
use crate::sim::model::{AlertLevels, DiskNode, Process, Service, ServiceStatus, SubState, World};
use crate::sim::telemetry;

const FIRST_PID: u32 = 1;

/// Build the initial world: one process per catalog name, every service
/// running and one disk node per directory template.
pub fn initialize<R: Rng + ?Sized>(
    config: &Config,
    started_at: DateTime<Utc>,
    rng: &mut R,
) -> World {
    let limits = &config.simulation;
    let max = limits.max_processes.clamp(1, catalog::MAX_PROCESSES);

    let mut processes: Vec<Process> = Vec::with_capacity(max);
    let mut pid = FIRST_PID;
    let mut used_memory = 0.0;
    for name in catalog::all_process_names().take(max) {
        let mut process = new_process(pid, name, rng);
        let free = (limits.total_memory_mb - used_memory).max(0.0);
        process.memory_usage = process.memory_usage.min(free);
        used_memory += process.memory_usage;

        // Long-lived daemons have been up for a while already.
        process.uptime = if process.is_system {
            rng.gen_range(3_600.0..86_400.0)
        } else {
            rng.gen_range(10.0..7_200.0)
        };
        processes.push(process);
        pid += rng.gen_range(1..=40);
    }

    let services = catalog::SERVICE_DEFINITIONS
        .iter()
        .enumerate()
        .map(|(i, def)| Service {
            id: format!("svc-{}", i + 1),
            name: def.name.to_string(),
            description: def.description.to_string(),
            status: ServiceStatus::Active,
            sub_state: SubState::Running,
            uptime: rng.gen_range(600.0..604_800.0),
            pid: Some(rng.gen_range(200..2_000)),
        })
        .collect();

    let capacity_mb = limits.disk_size_gb * 1024.0;
    let disk_nodes: Vec<DiskNode> = catalog::DISK_DIRECTORIES
        .iter()
        .map(|dir| {
            let size = dir.base_size * rng.gen_range(0.95..1.05);
            DiskNode {
                name: dir.name.to_string(),
                size,
                color: dir.color.to_string(),
                percentage: telemetry::percentage_of(size, capacity_mb),
            }
        })
        .collect();

    let stats = telemetry::initial_stats(&processes, &disk_nodes, started_at, limits);
    tracing::info!(
        processes = processes.len(),
        services = catalog::SERVICE_DEFINITIONS.len(),
        "world initialized"
    );

    World {
        processes,
        services,
        disk_nodes,
        stats,
        alert_levels: AlertLevels::default(),
        tick: 0,
        next_event_id: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::model::ProcessState;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn world(seed: u64) -> World {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        initialize(&Config::default(), Utc::now(), &mut rng)
    }

    #[test]
    fn one_process_per_catalog_name() {
        let world = world(1);
        let names: Vec<&str> = world.processes.iter().map(|p| p.name.as_str()).collect();
        let expected: Vec<&str> = catalog::all_process_names().collect();
        assert_eq!(names, expected);
        assert!(world.processes.iter().all(|p| p.state == ProcessState::Running));
    }

    #[test]
    fn pids_are_unique_and_ascending() {
        let world = world(2);
        assert!(world.processes.windows(2).all(|w| w[0].pid < w[1].pid));
    }

    #[test]
    fn protected_names_are_system_processes() {
        let world = world(3);
        for process in &world.processes {
            assert_eq!(process.is_system, catalog::is_protected(&process.name));
        }
        let ws = world
            .processes
            .iter()
            .find(|p| p.name == "windowserver")
            .unwrap();
        assert!(ws.is_system);
    }

    #[test]
    fn stats_match_the_initial_table() {
        let world = world(4);
        assert_eq!(world.stats.total_processes, world.processes.len());
        assert_eq!(world.stats.running_processes, world.processes.len());
        assert_eq!(world.stats.health_score, telemetry::health_score(&world.stats));
        assert!(world.stats.total_memory_usage <= world.stats.total_memory_available);

        let node_mb: f64 = world.disk_nodes.iter().map(|n| n.size).sum();
        assert!(node_mb <= world.stats.disk.used_space * 1024.0);
        assert_eq!(world.alert_levels, AlertLevels::default());
    }

    #[test]
    fn every_service_starts_running() {
        let world = world(5);
        assert_eq!(world.services.len(), catalog::SERVICE_DEFINITIONS.len());
        for service in &world.services {
            assert_eq!(service.status, ServiceStatus::Active);
            assert_eq!(service.sub_state, SubState::Running);
            assert!(service.pid.is_some());
        }
    }

    #[test]
    fn small_machines_are_respected() {
        let mut config = Config::default();
        config.simulation.max_processes = 5;
        config.simulation.total_memory_mb = 1000.0;
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let world = initialize(&config, Utc::now(), &mut rng);

        assert_eq!(world.processes.len(), 5);
        let memory: f64 = world.processes.iter().map(|p| p.memory_usage).sum();
        assert!(memory <= 1000.0 + 1e-9);
    }
}
