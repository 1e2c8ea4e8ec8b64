//! User commands against the current world.
//!
//! Every successful command returns the log entry describing it; the caller
//! decides where that entry goes.

use rand::Rng;
use thiserror::Error;

use crate::sim::model::{LogEntry, LogLevel, Priority, ProcessState, ServiceStatus, SubState, World};

/// Errors produced by command handlers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimError {
    /// System processes cannot be signalled by the user.
    #[error("kill: ({pid}) - Operation not permitted: {name} is a protected system process")]
    PermissionDenied { pid: u32, name: String },
    #[error("no such process: {0}")]
    ProcessNotFound(u32),
    #[error("unit {0} not found")]
    ServiceNotFound(String),
    /// Only Running and Stopped processes can be toggled.
    #[error("cannot {action} process {pid}: it is {state}")]
    InvalidTransition {
        pid: u32,
        state: ProcessState,
        action: &'static str,
    },
}

impl World {
    /// Terminate a user process.
    pub fn kill(&mut self, pid: u32) -> Result<LogEntry, SimError> {
        let index = self
            .processes
            .iter()
            .position(|p| p.pid == pid)
            .ok_or(SimError::ProcessNotFound(pid))?;

        let process = &self.processes[index];
        if process.is_system {
            return Err(SimError::PermissionDenied {
                pid,
                name: process.name.clone(),
            });
        }

        let removed = self.processes.remove(index);
        tracing::info!(pid, name = %removed.name, "process killed");
        Ok(self.log(
            LogLevel::Warn,
            "user",
            format!("Sent SIGKILL to {} (PID {})", removed.name, pid),
        ))
    }

    pub fn renice(&mut self, pid: u32, priority: Priority) -> Result<LogEntry, SimError> {
        let process = self
            .processes
            .iter_mut()
            .find(|p| p.pid == pid)
            .ok_or(SimError::ProcessNotFound(pid))?;
        let previous = process.priority;
        process.priority = priority;
        let message = format!(
            "{} (PID {}) priority {} -> {}",
            process.name, pid, previous, priority
        );
        tracing::debug!(pid, %priority, "process reniced");
        Ok(self.log(LogLevel::Info, "scheduler", message))
    }

    /// Flip a process between Running and Stopped.
    pub fn toggle_process_state(&mut self, pid: u32) -> Result<LogEntry, SimError> {
        let state = self
            .process(pid)
            .map(|p| p.state)
            .ok_or(SimError::ProcessNotFound(pid))?;
        match state {
            ProcessState::Running => self.set_process_stopped(pid, true),
            ProcessState::Stopped => self.set_process_stopped(pid, false),
            other => Err(SimError::InvalidTransition {
                pid,
                state: other,
                action: "toggle",
            }),
        }
    }

    /// SIGSTOP (`stopped = true`) or SIGCONT a process.
    pub fn set_process_stopped(&mut self, pid: u32, stopped: bool) -> Result<LogEntry, SimError> {
        let (from, to, action, signal) = if stopped {
            (ProcessState::Running, ProcessState::Stopped, "stop", "SIGSTOP")
        } else {
            (ProcessState::Stopped, ProcessState::Running, "continue", "SIGCONT")
        };

        let process = self
            .processes
            .iter_mut()
            .find(|p| p.pid == pid)
            .ok_or(SimError::ProcessNotFound(pid))?;
        if process.state != from {
            return Err(SimError::InvalidTransition {
                pid,
                state: process.state,
                action,
            });
        }

        process.state = to;
        process.state_ticks = 0;
        if stopped {
            process.cpu_usage = 0.0;
        }
        let message = format!("Sent {} to {} (PID {})", signal, process.name, pid);
        Ok(self.log(LogLevel::Info, "user", message))
    }

    /// Start an inactive or failed service, stop an active one.
    pub fn toggle_service<R: Rng + ?Sized>(
        &mut self,
        id: &str,
        rng: &mut R,
    ) -> Result<LogEntry, SimError> {
        let active = self
            .service(id)
            .map(|s| s.is_active())
            .ok_or_else(|| SimError::ServiceNotFound(id.to_string()))?;
        self.set_service_active(id, !active, rng)
    }

    /// Move a service to Active/Running or Inactive/Dead.
    ///
    /// Uptime resets on every call, even when the status is unchanged, the
    /// way a restart would.
    pub fn set_service_active<R: Rng + ?Sized>(
        &mut self,
        id: &str,
        active: bool,
        rng: &mut R,
    ) -> Result<LogEntry, SimError> {
        let service = self
            .services
            .iter_mut()
            .find(|s| s.id == id || s.name == id)
            .ok_or_else(|| SimError::ServiceNotFound(id.to_string()))?;

        if active {
            service.status = ServiceStatus::Active;
            service.sub_state = SubState::Running;
            service.pid = Some(rng.gen_range(1_000..30_000));
        } else {
            service.status = ServiceStatus::Inactive;
            service.sub_state = SubState::Dead;
            service.pid = None;
        }
        service.uptime = 0.0;

        let verb = if active { "Started" } else { "Stopped" };
        let message = format!("{} {}.", verb, service.description);
        tracing::info!(service = %service.name, active, "service toggled");
        Ok(self.log(LogLevel::Info, "systemd", message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::sim::init::initialize;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn world() -> (World, ChaCha8Rng) {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let world = initialize(&Config::default(), Utc::now(), &mut rng);
        (world, rng)
    }

    fn user_pid(world: &World) -> u32 {
        world
            .processes
            .iter()
            .find(|p| !p.is_system)
            .map(|p| p.pid)
            .unwrap()
    }

    #[test]
    fn kill_removes_exactly_one_user_process() {
        let (mut world, _) = world();
        let pid = user_pid(&world);
        let before = world.processes.len();

        let entry = world.kill(pid).unwrap();
        assert_eq!(entry.level, LogLevel::Warn);
        assert_eq!(world.processes.len(), before - 1);
        assert!(world.process(pid).is_none());
    }

    #[test]
    fn kill_refuses_system_processes() {
        let (mut world, _) = world();
        let system = world.processes.iter().find(|p| p.is_system).unwrap().pid;
        let before = world.processes.clone();

        let err = world.kill(system).unwrap_err();
        assert!(matches!(err, SimError::PermissionDenied { pid, .. } if pid == system));
        assert_eq!(world.processes, before);
    }

    #[test]
    fn kill_unknown_pid() {
        let (mut world, _) = world();
        assert_eq!(world.kill(999_999), Err(SimError::ProcessNotFound(999_999)));
    }

    #[test]
    fn renice_replaces_priority() {
        let (mut world, _) = world();
        let pid = user_pid(&world);
        world.renice(pid, Priority::RealTime).unwrap();
        assert_eq!(world.process(pid).unwrap().priority, Priority::RealTime);
    }

    #[test]
    fn toggle_process_round_trips() {
        let (mut world, _) = world();
        let pid = user_pid(&world);

        world.toggle_process_state(pid).unwrap();
        assert_eq!(world.process(pid).unwrap().state, ProcessState::Stopped);
        assert_eq!(world.process(pid).unwrap().cpu_usage, 0.0);

        world.toggle_process_state(pid).unwrap();
        assert_eq!(world.process(pid).unwrap().state, ProcessState::Running);
    }

    #[test]
    fn toggle_rejects_sleeping_and_zombie() {
        let (mut world, _) = world();
        let pid = user_pid(&world);
        world.processes.iter_mut().find(|p| p.pid == pid).unwrap().state = ProcessState::Zombie;

        let err = world.toggle_process_state(pid).unwrap_err();
        assert!(matches!(
            err,
            SimError::InvalidTransition {
                state: ProcessState::Zombie,
                ..
            }
        ));
    }

    #[test]
    fn continuing_a_running_process_is_invalid() {
        let (mut world, _) = world();
        let pid = user_pid(&world);
        assert!(world.set_process_stopped(pid, false).is_err());
    }

    #[test]
    fn toggle_service_twice_round_trips() {
        let (mut world, mut rng) = world();
        let id = world.services[2].id.clone();
        world.services[2].uptime = 5_000.0;

        world.toggle_service(&id, &mut rng).unwrap();
        let stopped = world.service(&id).unwrap().clone();
        assert_eq!(stopped.status, ServiceStatus::Inactive);
        assert_eq!(stopped.sub_state, SubState::Dead);
        assert_eq!(stopped.pid, None);
        assert_eq!(stopped.uptime, 0.0);

        world.services[2].uptime = 42.0;
        world.toggle_service(&id, &mut rng).unwrap();
        let started = world.service(&id).unwrap();
        assert_eq!(started.status, ServiceStatus::Active);
        assert_eq!(started.sub_state, SubState::Running);
        assert!(started.pid.is_some());
        assert_eq!(started.uptime, 0.0);
    }

    #[test]
    fn failed_services_start_on_toggle() {
        let (mut world, mut rng) = world();
        world.services[0].status = ServiceStatus::Failed;
        world.services[0].sub_state = SubState::Exited;
        let name = world.services[0].name.clone();

        world.toggle_service(&name, &mut rng).unwrap();
        assert!(world.services[0].is_active());
    }

    #[test]
    fn unknown_service() {
        let (mut world, mut rng) = world();
        assert_eq!(
            world.toggle_service("nope.service", &mut rng),
            Err(SimError::ServiceNotFound("nope.service".to_string()))
        );
    }
}
