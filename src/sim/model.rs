//! Value types that make up a simulated world snapshot.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ProcessState {
    Running,
    Sleeping,
    Stopped,
    Zombie,
}

impl std::fmt::Display for ProcessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "Running"),
            Self::Sleeping => write!(f, "Sleeping"),
            Self::Stopped => write!(f, "Stopped"),
            Self::Zombie => write!(f, "Zombie"),
        }
    }
}

/// Scheduling priority as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Priority {
    Low,
    Normal,
    High,
    RealTime,
}

impl Priority {
    pub fn next(self) -> Self {
        match self {
            Self::Low => Self::Normal,
            Self::Normal => Self::High,
            Self::High => Self::RealTime,
            Self::RealTime => Self::Low,
        }
    }

    /// Unix-style nice value for display.
    pub fn nice(self) -> i8 {
        match self {
            Self::Low => 10,
            Self::Normal => 0,
            Self::High => -10,
            Self::RealTime => -20,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Normal => write!(f, "Normal"),
            Self::High => write!(f, "High"),
            Self::RealTime => write!(f, "RealTime"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            "realtime" | "real-time" | "rt" => Ok(Self::RealTime),
            other => Err(format!("unknown priority '{}'", other)),
        }
    }
}

/// A simulated OS process.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Process {
    pub pid: u32,
    pub name: String,
    pub user: String,
    pub state: ProcessState,
    /// Percent of one core, 0-100.
    pub cpu_usage: f64,
    /// Resident memory in MB.
    pub memory_usage: f64,
    pub priority: Priority,
    /// Seconds since launch.
    pub uptime: f64,
    pub command: String,
    pub is_system: bool,
    pub threads: u32,
    /// Ticks spent in the current state.
    #[serde(skip)]
    pub state_ticks: u32,
}

impl Process {
    /// Member of the subset that stress modes act on.
    pub fn is_stress_target(&self) -> bool {
        !self.is_system && self.pid % 3 == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ServiceStatus {
    Active,
    Inactive,
    Failed,
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Inactive => write!(f, "inactive"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubState {
    Running,
    Dead,
    Exited,
}

impl std::fmt::Display for SubState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Dead => write!(f, "dead"),
            Self::Exited => write!(f, "exited"),
        }
    }
}

/// A simulated daemon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: ServiceStatus,
    pub sub_state: SubState,
    pub uptime: f64,
    pub pid: Option<u32>,
}

impl Service {
    pub fn is_active(&self) -> bool {
        self.status == ServiceStatus::Active
    }
}

/// One directory's share of the volume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiskNode {
    pub name: String,
    /// Size in MB.
    pub size: f64,
    pub color: String,
    /// Share of total disk capacity, 0-100.
    pub percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tcp => write!(f, "TCP"),
            Self::Udp => write!(f, "UDP"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConnectionState {
    Listen,
    Established,
    TimeWait,
    CloseWait,
    SynSent,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Listen => write!(f, "LISTEN"),
            Self::Established => write!(f, "ESTABLISHED"),
            Self::TimeWait => write!(f, "TIME_WAIT"),
            Self::CloseWait => write!(f, "CLOSE_WAIT"),
            Self::SynSent => write!(f, "SYN_SENT"),
        }
    }
}

/// A synthesized socket; regenerated every tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkConnection {
    pub id: String,
    pub protocol: Protocol,
    pub local_address: String,
    pub remote_address: String,
    pub state: ConnectionState,
    pub pid: u32,
    pub process_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct NetworkStats {
    /// KB/s
    pub upload_speed: f64,
    /// KB/s
    pub download_speed: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DiskStats {
    /// MB/s
    pub read_speed: f64,
    /// MB/s
    pub write_speed: f64,
    /// GB
    pub total_space: f64,
    /// GB
    pub used_space: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BatteryStats {
    pub level: f64,
    pub is_charging: bool,
    /// Minutes until empty (discharging) or full (charging).
    pub time_left: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThermalStats {
    pub cpu_temp: f64,
    pub gpu_temp: f64,
    pub fan_speed: f64,
    pub voltage: f64,
}

/// Aggregate snapshot of the machine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemStats {
    pub total_cpu_usage: f64,
    /// 1m, 5m, 15m
    pub load_average: [f64; 3],
    pub total_memory_usage: f64,
    pub total_memory_available: f64,
    pub total_processes: usize,
    pub running_processes: usize,
    pub sleeping_processes: usize,
    pub active_threads: u64,
    /// System uptime in seconds.
    pub uptime: f64,
    pub timestamp: DateTime<Utc>,
    pub network: NetworkStats,
    pub disk: DiskStats,
    pub battery: BatteryStats,
    pub thermal: ThermalStats,
    pub health_score: u8,
}

impl SystemStats {
    pub fn memory_percent(&self) -> f64 {
        if self.total_memory_available > 0.0 {
            self.total_memory_usage / self.total_memory_available * 100.0
        } else {
            0.0
        }
    }

    pub fn disk_percent(&self) -> f64 {
        if self.disk.total_space > 0.0 {
            self.disk.used_space / self.disk.total_space * 100.0
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "Info"),
            Self::Warning => write!(f, "Warning"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Component {
    Cpu,
    Memory,
    Disk,
    System,
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cpu => write!(f, "CPU"),
            Self::Memory => write!(f, "Memory"),
            Self::Disk => write!(f, "Disk"),
            Self::System => write!(f, "System"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemAlert {
    pub id: u64,
    pub severity: AlertSeverity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub component: Component,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Debug,
    Kernel,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Debug => write!(f, "DEBUG"),
            Self::Kernel => write!(f, "KERNEL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub source: String,
    pub message: String,
}

/// One sample of the rolling metric history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryPoint {
    pub time: String,
    pub cpu: f64,
    /// GB
    pub memory: f64,
    /// MB/s
    pub net_in: f64,
    /// MB/s
    pub net_out: f64,
    pub disk_read: f64,
    pub disk_write: f64,
    pub temp: f64,
}

impl HistoryPoint {
    pub fn from_stats(stats: &SystemStats) -> Self {
        Self {
            time: stats.timestamp.format("%H:%M:%S").to_string(),
            cpu: stats.total_cpu_usage.round(),
            memory: (stats.total_memory_usage / 1024.0 * 10.0).round() / 10.0,
            net_in: stats.network.download_speed / 1024.0,
            net_out: stats.network.upload_speed / 1024.0,
            disk_read: stats.disk.read_speed,
            disk_write: stats.disk.write_speed,
            temp: stats.thermal.cpu_temp,
        }
    }
}

/// Selector biasing the random-walk model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum StressMode {
    #[default]
    None,
    Cpu,
    Memory,
    Network,
}

impl StressMode {
    pub fn next(self) -> Self {
        match self {
            Self::None => Self::Cpu,
            Self::Cpu => Self::Memory,
            Self::Memory => Self::Network,
            Self::Network => Self::None,
        }
    }
}

impl std::fmt::Display for StressMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::Cpu => write!(f, "CPU"),
            Self::Memory => write!(f, "MEMORY"),
            Self::Network => write!(f, "NETWORK"),
        }
    }
}

impl std::str::FromStr for StressMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "off" | "normal" => Ok(Self::None),
            "cpu" => Ok(Self::Cpu),
            "memory" | "mem" => Ok(Self::Memory),
            "network" | "net" => Ok(Self::Network),
            other => Err(format!("unknown stress mode '{}'", other)),
        }
    }
}

/// Latched alert level per monitored dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
pub enum AlertLevel {
    #[default]
    Normal,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AlertLevels {
    pub cpu: AlertLevel,
    pub memory: AlertLevel,
    pub disk: AlertLevel,
    pub system: AlertLevel,
}

impl AlertLevels {
    pub fn get(&self, component: Component) -> AlertLevel {
        match component {
            Component::Cpu => self.cpu,
            Component::Memory => self.memory,
            Component::Disk => self.disk,
            Component::System => self.system,
        }
    }

    pub fn set(&mut self, component: Component, level: AlertLevel) {
        match component {
            Component::Cpu => self.cpu = level,
            Component::Memory => self.memory = level,
            Component::Disk => self.disk = level,
            Component::System => self.system = level,
        }
    }
}

/// Complete simulated world. Ticks consume one and return the next.
#[derive(Debug, Clone, Serialize)]
pub struct World {
    pub processes: Vec<Process>,
    pub services: Vec<Service>,
    pub disk_nodes: Vec<DiskNode>,
    pub stats: SystemStats,
    pub alert_levels: AlertLevels,
    pub tick: u64,
    pub next_event_id: u64,
}

impl World {
    pub fn process(&self, pid: u32) -> Option<&Process> {
        self.processes.iter().find(|p| p.pid == pid)
    }

    pub fn service(&self, id: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.id == id || s.name == id)
    }

    /// Allocate an id for an alert or log entry.
    pub fn next_id(&mut self) -> u64 {
        let id = self.next_event_id;
        self.next_event_id += 1;
        id
    }

    pub fn log(&mut self, level: LogLevel, source: &str, message: String) -> LogEntry {
        LogEntry {
            id: self.next_id(),
            timestamp: self.stats.timestamp,
            level,
            source: source.to_string(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_parses_and_cycles() {
        assert_eq!("high".parse::<Priority>(), Ok(Priority::High));
        assert_eq!("RT".parse::<Priority>(), Ok(Priority::RealTime));
        assert!("urgent".parse::<Priority>().is_err());
        assert_eq!(Priority::RealTime.next(), Priority::Low);
    }

    #[test]
    fn stress_mode_parses_aliases() {
        assert_eq!("mem".parse::<StressMode>(), Ok(StressMode::Memory));
        assert_eq!("OFF".parse::<StressMode>(), Ok(StressMode::None));
        assert_eq!(StressMode::Network.next(), StressMode::None);
        assert_eq!(StressMode::Cpu.to_string(), "CPU");
    }

    #[test]
    fn alert_levels_are_ordered() {
        assert!(AlertLevel::Critical > AlertLevel::Warning);
        assert!(AlertLevel::Warning > AlertLevel::Normal);

        let mut levels = AlertLevels::default();
        levels.set(Component::Disk, AlertLevel::Warning);
        assert_eq!(levels.get(Component::Disk), AlertLevel::Warning);
        assert_eq!(levels.get(Component::Cpu), AlertLevel::Normal);
    }

    #[test]
    fn connection_states_render_like_netstat() {
        assert_eq!(ConnectionState::TimeWait.to_string(), "TIME_WAIT");
        assert_eq!(Protocol::Udp.to_string(), "UDP");
    }
}
