//! Synthesized socket table.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::sim::catalog;
use crate::sim::model::{ConnectionState, NetworkConnection, Process, ProcessState, Protocol, StressMode};

const LOCAL_IP: &str = "192.168.1.42";

const STATES: [ConnectionState; 5] = [
    ConnectionState::Established,
    ConnectionState::Listen,
    ConnectionState::TimeWait,
    ConnectionState::CloseWait,
    ConnectionState::SynSent,
];
const NORMAL_WEIGHTS: [u32; 5] = [55, 15, 15, 10, 5];
const SURGE_WEIGHTS: [u32; 5] = [50, 5, 15, 5, 25];

const REMOTE_PORTS: [u16; 6] = [443, 443, 80, 8443, 5228, 3478];

fn remote_address<R: Rng + ?Sized>(rng: &mut R) -> String {
    let port = REMOTE_PORTS[rng.gen_range(0..REMOTE_PORTS.len())];
    format!(
        "{}.{}.{}.{}:{}",
        rng.gen_range(13..=223),
        rng.gen_range(0..=255),
        rng.gen_range(0..=255),
        rng.gen_range(1..=254),
        port
    )
}

fn prefers_udp(name: &str) -> bool {
    matches!(name, "zoom" | "teams" | "spotify" | "music")
}

/// Build this tick's connection table from running networking processes.
pub fn synthesize<R: Rng + ?Sized>(
    processes: &[Process],
    stress: StressMode,
    rng: &mut R,
) -> Vec<NetworkConnection> {
    let weights = if stress == StressMode::Network {
        SURGE_WEIGHTS
    } else {
        NORMAL_WEIGHTS
    };
    let Ok(state_dist) = WeightedIndex::new(weights) else {
        return Vec::new();
    };

    let mut connections = Vec::new();

    for process in processes.iter().filter(|p| {
        p.state == ProcessState::Running && !p.is_system && catalog::is_networking(&p.name)
    }) {
        if let Some(port) = catalog::listen_port(&process.name) {
            connections.push(NetworkConnection {
                id: format!("{}-listen", process.pid),
                protocol: Protocol::Tcp,
                local_address: format!("0.0.0.0:{}", port),
                remote_address: "*:*".to_string(),
                state: ConnectionState::Listen,
                pid: process.pid,
                process_name: process.name.clone(),
            });
        }

        let count = if stress == StressMode::Network {
            rng.gen_range(3..=8)
        } else {
            rng.gen_range(1..=3)
        };

        for n in 0..count {
            let udp = if prefers_udp(&process.name) {
                rng.gen_bool(0.6)
            } else {
                rng.gen_bool(0.1)
            };
            let mut state = STATES[state_dist.sample(rng)];
            if udp && state != ConnectionState::Listen {
                state = ConnectionState::Established;
            }
            let (local_address, remote_address) = if state == ConnectionState::Listen {
                (
                    format!("{}:{}", LOCAL_IP, rng.gen_range(49152..=65535)),
                    "*:*".to_string(),
                )
            } else {
                (
                    format!("{}:{}", LOCAL_IP, rng.gen_range(49152..=65535)),
                    remote_address(rng),
                )
            };

            connections.push(NetworkConnection {
                id: format!("{}-{}", process.pid, n),
                protocol: if udp { Protocol::Udp } else { Protocol::Tcp },
                local_address,
                remote_address,
                state,
                pid: process.pid,
                process_name: process.name.clone(),
            });
        }
    }

    connections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::model::Priority;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn proc(pid: u32, name: &str, state: ProcessState, is_system: bool) -> Process {
        Process {
            pid,
            name: name.to_string(),
            user: "admin".to_string(),
            state,
            cpu_usage: 1.0,
            memory_usage: 100.0,
            priority: Priority::Normal,
            uptime: 0.0,
            command: name.to_string(),
            is_system,
            threads: 1,
            state_ticks: 0,
        }
    }

    #[test]
    fn only_running_networking_user_processes_connect() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let processes = vec![
            proc(10, "chrome", ProcessState::Running, false),
            proc(11, "chrome", ProcessState::Stopped, false),
            proc(12, "finder", ProcessState::Running, false),
            proc(13, "kernel_task", ProcessState::Running, true),
        ];

        let connections = synthesize(&processes, StressMode::None, &mut rng);
        assert!(!connections.is_empty());
        assert!(connections.iter().all(|c| c.pid == 10));
    }

    #[test]
    fn servers_listen_on_their_port() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let processes = vec![proc(20, "postgres", ProcessState::Running, false)];
        let connections = synthesize(&processes, StressMode::None, &mut rng);
        assert!(connections
            .iter()
            .any(|c| c.state == ConnectionState::Listen && c.local_address == "0.0.0.0:5432"));
    }

    #[test]
    fn network_surge_increases_volume_and_churn() {
        let processes: Vec<Process> = (0..10)
            .map(|i| proc(100 + i, "chrome", ProcessState::Running, false))
            .collect();

        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let calm = synthesize(&processes, StressMode::None, &mut rng);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let surge = synthesize(&processes, StressMode::Network, &mut rng);

        let syn = |set: &[NetworkConnection]| {
            set.iter()
                .filter(|c| c.state == ConnectionState::SynSent)
                .count()
        };
        assert!(surge.len() > calm.len());
        assert!(syn(&surge) > syn(&calm));
    }
}
