//! Deterministic OS simulation.
//!
//! [`Simulation`] is the single writer: it owns the current world, the
//! seeded RNG, the active stress mode and the bounded history, alert and log
//! buffers. Ticks and commands are funnelled through it one at a time.

pub mod alerts;
pub mod catalog;
pub mod commands;
pub mod engine;
pub mod init;
pub mod model;
pub mod network;
pub mod ring;
pub mod telemetry;

use chrono::Utc;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

use crate::config::Config;
pub use commands::SimError;
use model::{
    HistoryPoint, LogEntry, LogLevel, NetworkConnection, Priority, Process, StressMode,
    SystemAlert, World,
};
use ring::RingBuffer;

/// A user request against the simulation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Kill(u32),
    Renice { pid: u32, priority: Priority },
    ToggleProcess(u32),
    Stop(u32),
    Resume(u32),
    ToggleService(String),
    StartService(String),
    StopService(String),
    SetStressMode(StressMode),
}

/// What the last tick added.
#[derive(Debug, Clone, Default)]
pub struct TickOutcome {
    pub tick: u64,
    pub new_alerts: Vec<SystemAlert>,
}

pub struct Simulation {
    config: Config,
    seed: u64,
    rng: ChaCha8Rng,
    world: World,
    stress: StressMode,
    connections: Vec<NetworkConnection>,
    history: RingBuffer<HistoryPoint>,
    alerts: RingBuffer<SystemAlert>,
    logs: RingBuffer<LogEntry>,
    last_outcome: TickOutcome,
}

impl Simulation {
    /// Boot a new world. An explicit seed wins over the configured one.
    pub fn new(config: Config, seed: Option<u64>) -> Self {
        let seed = seed
            .or(config.general.seed)
            .unwrap_or_else(rand::random::<u64>);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut world = init::initialize(&config, Utc::now(), &mut rng);

        let mut history = RingBuffer::new(config.buffers.history);
        history.push(HistoryPoint::from_stats(&world.stats));
        let mut logs = RingBuffer::new(config.buffers.logs);
        logs.push(world.log(
            LogLevel::Info,
            "systemd",
            format!(
                "Startup finished: {} processes, {} units",
                world.processes.len(),
                world.services.len()
            ),
        ));

        tracing::info!(seed, "simulation started");

        Self {
            alerts: RingBuffer::new(config.buffers.alerts),
            history,
            logs,
            config,
            seed,
            rng,
            world,
            stress: StressMode::None,
            connections: Vec::new(),
            last_outcome: TickOutcome::default(),
        }
    }

    /// Advance by `elapsed` and record what happened.
    pub fn tick(&mut self, elapsed: Duration) -> &TickOutcome {
        let result = engine::advance(
            &self.world,
            elapsed,
            self.stress,
            &self.config,
            &mut self.rng,
        );

        self.world = result.world;
        self.connections = result.connections;
        self.history.push(HistoryPoint::from_stats(&self.world.stats));
        self.alerts.extend(result.new_alerts.iter().cloned());
        self.logs.extend(result.new_logs);

        if !result.new_alerts.is_empty() {
            tracing::debug!(
                tick = self.world.tick,
                alerts = result.new_alerts.len(),
                "alerts raised"
            );
        }

        self.last_outcome = TickOutcome {
            tick: self.world.tick,
            new_alerts: result.new_alerts,
        };
        &self.last_outcome
    }

    /// Run a command between ticks. Returns a human-readable confirmation.
    pub fn apply(&mut self, command: Command) -> Result<String, SimError> {
        let world = &mut self.world;
        let outcome = match command {
            Command::Kill(pid) => world.kill(pid),
            Command::Renice { pid, priority } => world.renice(pid, priority),
            Command::ToggleProcess(pid) => world.toggle_process_state(pid),
            Command::Stop(pid) => world.set_process_stopped(pid, true),
            Command::Resume(pid) => world.set_process_stopped(pid, false),
            Command::ToggleService(id) => world.toggle_service(&id, &mut self.rng),
            Command::StartService(id) => world.set_service_active(&id, true, &mut self.rng),
            Command::StopService(id) => world.set_service_active(&id, false, &mut self.rng),
            Command::SetStressMode(mode) => {
                self.stress = mode;
                tracing::info!(%mode, "stress mode changed");
                Ok(world.log(
                    LogLevel::Warn,
                    "stress",
                    format!("Stress mode set to {}", mode),
                ))
            }
        };

        match outcome {
            Ok(entry) => {
                // Keep the header counts in step with the table until the next tick.
                telemetry::retally(
                    &mut self.world.stats,
                    &self.world.processes,
                    &self.config.simulation,
                );
                let message = entry.message.clone();
                self.logs.push(entry);
                Ok(message)
            }
            Err(err) => {
                tracing::debug!(error = %err, "command rejected");
                Err(err)
            }
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Configured tick period, floored at [`catalog::MIN_TICK_MS`].
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.config.general.tick_ms.max(catalog::MIN_TICK_MS))
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn stress_mode(&self) -> StressMode {
        self.stress
    }

    pub fn connections(&self) -> &[NetworkConnection] {
        &self.connections
    }

    pub fn history(&self) -> &RingBuffer<HistoryPoint> {
        &self.history
    }

    /// Alerts, newest first.
    pub fn alerts(&self) -> impl Iterator<Item = &SystemAlert> + '_ {
        self.alerts.iter().rev()
    }

    /// Log lines, oldest first.
    pub fn logs(&self) -> impl DoubleEndedIterator<Item = &LogEntry> + '_ {
        self.logs.iter()
    }

    pub fn clear_alerts(&mut self) {
        self.alerts.clear();
    }

    pub fn clear_logs(&mut self) {
        self.logs.clear();
    }

    /// Processes sorted by CPU usage, highest first.
    pub fn top_processes(&self, limit: usize) -> Vec<Process> {
        let mut processes = self.world.processes.clone();
        processes.sort_by(|a, b| b.cpu_usage.total_cmp(&a.cpu_usage));
        processes.truncate(limit);
        processes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::model::{AlertSeverity, Component, ProcessState};
    use pretty_assertions::assert_eq;

    const TICK: Duration = Duration::from_millis(catalog::TICK_MS);

    fn sim(seed: u64) -> Simulation {
        Simulation::new(Config::default(), Some(seed))
    }

    #[test]
    fn explicit_seed_wins_over_config() {
        let mut config = Config::default();
        config.general.seed = Some(1);
        assert_eq!(Simulation::new(config.clone(), Some(2)).seed(), 2);
        assert_eq!(Simulation::new(config, None).seed(), 1);
    }

    #[test]
    fn tick_period_has_a_floor() {
        let mut config = Config::default();
        config.general.tick_ms = 1;
        let floored = Simulation::new(config, Some(1));
        assert_eq!(floored.tick_period(), Duration::from_millis(catalog::MIN_TICK_MS));
        assert_eq!(sim(1).tick_period(), TICK);
    }

    #[test]
    fn history_is_bounded() {
        let mut sim = sim(3);
        for _ in 0..100 {
            sim.tick(TICK);
        }
        assert_eq!(sim.history().len(), 40);
        assert_eq!(sim.world().tick, 100);
        let last = sim.history().latest().unwrap();
        assert_eq!(last, &HistoryPoint::from_stats(&sim.world().stats));
    }

    #[test]
    fn logs_are_bounded() {
        let mut sim = sim(4);
        for _ in 0..400 {
            sim.tick(TICK);
            let _ = sim.apply(Command::SetStressMode(StressMode::None));
        }
        assert_eq!(sim.logs().count(), 100);
    }

    #[test]
    fn commands_land_in_the_log() {
        let mut sim = sim(5);
        let pid = sim
            .world()
            .processes
            .iter()
            .find(|p| !p.is_system)
            .unwrap()
            .pid;

        let message = sim.apply(Command::Kill(pid)).unwrap();
        assert!(message.contains(&pid.to_string()));
        assert_eq!(sim.logs().last().unwrap().message, message);
        assert_eq!(sim.apply(Command::Kill(pid)), Err(SimError::ProcessNotFound(pid)));
    }

    #[test]
    fn commands_refresh_process_counts() {
        let mut sim = sim(10);
        sim.tick(TICK);
        let pid = sim
            .world()
            .processes
            .iter()
            .find(|p| !p.is_system && p.state == ProcessState::Running)
            .map(|p| p.pid)
            .unwrap();

        sim.apply(Command::Kill(pid)).unwrap();
        let world = sim.world();
        assert_eq!(world.stats.total_processes, world.processes.len());
        assert_eq!(
            world.stats.running_processes,
            world
                .processes
                .iter()
                .filter(|p| p.state == ProcessState::Running)
                .count()
        );
        assert_eq!(world.stats.health_score, telemetry::health_score(&world.stats));

        let survivor = sim
            .world()
            .processes
            .iter()
            .find(|p| p.state == ProcessState::Running)
            .map(|p| p.pid)
            .unwrap();
        let running = sim.world().stats.running_processes;
        sim.apply(Command::ToggleProcess(survivor)).unwrap();
        assert_eq!(sim.world().stats.running_processes, running - 1);
    }

    #[test]
    fn stress_mode_applies_on_next_tick() {
        let mut sim = sim(6);
        sim.apply(Command::SetStressMode(StressMode::Cpu)).unwrap();
        assert_eq!(sim.stress_mode(), StressMode::Cpu);

        let mut peak: f64 = 0.0;
        for _ in 0..20 {
            sim.tick(TICK);
            peak = peak.max(sim.world().stats.total_cpu_usage);
        }
        assert!(peak > 35.0, "peak cpu {}", peak);
    }

    #[test]
    fn alerts_are_newest_first_and_clearable() {
        let mut config = Config::default();
        config.thresholds.cpu.warning = 25.0;
        config.thresholds.cpu.critical = 30.0;
        let mut sim = Simulation::new(config, Some(7));
        sim.apply(Command::SetStressMode(StressMode::Cpu)).unwrap();
        for _ in 0..30 {
            sim.tick(TICK);
        }
        let alerts: Vec<&SystemAlert> = sim.alerts().collect();
        assert!(alerts.windows(2).all(|w| w[0].id > w[1].id));
        assert!(alerts
            .iter()
            .any(|a| a.component == Component::Cpu && a.severity != AlertSeverity::Info));

        sim.clear_alerts();
        assert_eq!(sim.alerts().count(), 0);
    }

    #[test]
    fn top_processes_sorted_by_cpu() {
        let mut sim = sim(8);
        sim.tick(TICK);
        let top = sim.top_processes(5);
        assert_eq!(top.len(), 5);
        assert!(top.windows(2).all(|w| w[0].cpu_usage >= w[1].cpu_usage));
    }
}
