//! Application state machine with fine-grained reactive updates

#![allow(dead_code)]

use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::advisory::AnalysisResult;
use crate::sim::model::{Process, World};
use crate::ui::theme::Theme;

/// Top-level application mode
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AppMode {
    /// Normal dashboard view
    #[default]
    Dashboard,
    /// Help overlay showing
    Help,
    /// Embedded shell is open
    Shell,
    /// Kill confirmation
    Confirm { message: String, pid: u32 },
}

/// Dashboard tabs, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Overview,
    Processes,
    Hardware,
    Network,
    Services,
    Disk,
    Alerts,
}

impl Tab {
    pub const ALL: [Tab; 7] = [
        Tab::Overview,
        Tab::Processes,
        Tab::Hardware,
        Tab::Network,
        Tab::Services,
        Tab::Disk,
        Tab::Alerts,
    ];

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Overview => "Overview",
            Self::Processes => "Processes",
            Self::Hardware => "Hardware",
            Self::Network => "Network",
            Self::Services => "Services",
            Self::Disk => "Disk",
            Self::Alerts => "Alerts & Logs",
        }
    }
}

/// Process table ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessSort {
    #[default]
    Cpu,
    Memory,
    Pid,
    Name,
}

impl ProcessSort {
    pub fn next(self) -> Self {
        match self {
            Self::Cpu => Self::Memory,
            Self::Memory => Self::Pid,
            Self::Pid => Self::Name,
            Self::Name => Self::Cpu,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Cpu => "CPU",
            Self::Memory => "MEM",
            Self::Pid => "PID",
            Self::Name => "NAME",
        }
    }

    /// Processes in display order.
    pub fn sorted(self, processes: &[Process]) -> Vec<&Process> {
        let mut sorted: Vec<&Process> = processes.iter().collect();
        match self {
            Self::Cpu => sorted.sort_by(|a, b| b.cpu_usage.total_cmp(&a.cpu_usage)),
            Self::Memory => sorted.sort_by(|a, b| b.memory_usage.total_cmp(&a.memory_usage)),
            Self::Pid => sorted.sort_by_key(|p| p.pid),
            Self::Name => sorted.sort_by(|a, b| a.name.cmp(&b.name).then(a.pid.cmp(&b.pid))),
        }
        sorted
    }
}

/// Cursor positions for the list views
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub process: usize,
    pub service: usize,
    pub connection_scroll: usize,
    pub log_scroll: usize,
}

/// Advisory panel content
#[derive(Debug, Clone, Default, PartialEq)]
pub enum AdvisoryView {
    #[default]
    Idle,
    Loading,
    Ready(AnalysisResult),
    Unavailable(String),
}

/// Notification
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: uuid::Uuid,
    pub message: String,
    pub level: NotificationLevel,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Main application state
#[derive(Debug, Clone)]
pub struct AppState {
    pub mode: AppMode,
    pub tab: Tab,
    pub sort: ProcessSort,
    pub selection: Selection,
    pub advisory: AdvisoryView,
    pub theme: Theme,
    pub notifications: Vec<Notification>,
    pub paused: bool,
    pub terminal_size: (u16, u16),
}

impl AppState {
    pub fn new(theme: Theme) -> Self {
        Self {
            mode: AppMode::Dashboard,
            tab: Tab::Overview,
            sort: ProcessSort::Cpu,
            selection: Selection::default(),
            advisory: AdvisoryView::Idle,
            theme,
            notifications: Vec::new(),
            paused: false,
            terminal_size: (80, 24),
        }
    }

    pub fn add_notification(&mut self, message: String, level: NotificationLevel) -> uuid::Uuid {
        let notification = Notification {
            id: uuid::Uuid::new_v4(),
            message,
            level,
            created_at: chrono::Utc::now(),
            duration_ms: 4000,
        };
        let id = notification.id;
        self.notifications.push(notification);
        id
    }

    /// Drop expired notifications; returns whether any were removed.
    pub fn remove_expired_notifications(&mut self) -> bool {
        let now = chrono::Utc::now();
        let before = self.notifications.len();
        self.notifications.retain(|n| {
            let elapsed = now.signed_duration_since(n.created_at).num_milliseconds();
            elapsed < n.duration_ms as i64
        });
        self.notifications.len() != before
    }

    /// Keep cursors inside the current tables after the world changed.
    pub fn clamp_selection(&mut self, world: &World, connections: usize) {
        let last = |len: usize| len.saturating_sub(1);
        self.selection.process = self.selection.process.min(last(world.processes.len()));
        self.selection.service = self.selection.service.min(last(world.services.len()));
        self.selection.connection_scroll = self.selection.connection_scroll.min(last(connections));
    }

    pub fn selected_process<'w>(&self, world: &'w World) -> Option<&'w Process> {
        self.sort
            .sorted(&world.processes)
            .get(self.selection.process)
            .copied()
    }
}

/// Reactive state changes via broadcast channel
#[derive(Debug, Clone)]
pub enum StateChange {
    ModeChanged(AppMode),
    TabChanged(Tab),
    SelectionChanged,
    SimulationTicked(u64),
    CommandApplied,
    NotificationAdded(uuid::Uuid),
    NotificationsExpired,
    AdvisoryUpdated,
    PauseToggled(bool),
    Resized,
}

/// Thread-safe state store
pub struct StateStore {
    state: Arc<RwLock<AppState>>,
    change_tx: broadcast::Sender<StateChange>,
}

impl StateStore {
    pub fn new(initial: AppState) -> Self {
        let (change_tx, _) = broadcast::channel(256);
        Self {
            state: Arc::new(RwLock::new(initial)),
            change_tx,
        }
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.change_tx.subscribe()
    }

    /// Atomic state mutation with change notification
    pub fn update<F, R>(&self, mutator: F) -> R
    where
        F: FnOnce(&mut AppState) -> (R, Option<StateChange>),
    {
        let mut state = self.state.write();
        let (result, change) = mutator(&mut state);
        if let Some(change) = change {
            let _ = self.change_tx.send(change);
        }
        result
    }

    /// Notify of a state change
    pub fn notify(&self, change: StateChange) {
        let _ = self.change_tx.send(change);
    }

    /// Read current state
    pub fn read(&self) -> parking_lot::RwLockReadGuard<'_, AppState> {
        self.state.read()
    }

    /// Get a clone of the current state
    pub fn snapshot(&self) -> AppState {
        self.state.read().clone()
    }
}

impl Clone for StateStore {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            change_tx: self.change_tx.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::model::{Priority, ProcessState};
    use pretty_assertions::assert_eq;

    fn process(pid: u32, name: &str, cpu: f64, mem: f64) -> Process {
        Process {
            pid,
            name: name.to_string(),
            user: "admin".to_string(),
            state: ProcessState::Running,
            cpu_usage: cpu,
            memory_usage: mem,
            priority: Priority::Normal,
            uptime: 0.0,
            command: name.to_string(),
            is_system: false,
            threads: 1,
            state_ticks: 0,
        }
    }

    #[test]
    fn tabs_wrap_both_ways() {
        assert_eq!(Tab::Overview.prev(), Tab::Alerts);
        assert_eq!(Tab::Alerts.next(), Tab::Overview);
        assert_eq!(Tab::from_index(4), Some(Tab::Services));
        assert_eq!(Tab::from_index(7), None);
        assert_eq!(Tab::Disk.index(), 5);
    }

    #[test]
    fn sort_orders() {
        let processes = vec![
            process(30, "b", 5.0, 100.0),
            process(10, "c", 50.0, 10.0),
            process(20, "a", 1.0, 900.0),
        ];
        let pids = |sort: ProcessSort| -> Vec<u32> {
            sort.sorted(&processes).iter().map(|p| p.pid).collect()
        };
        assert_eq!(pids(ProcessSort::Cpu), vec![10, 30, 20]);
        assert_eq!(pids(ProcessSort::Memory), vec![20, 30, 10]);
        assert_eq!(pids(ProcessSort::Pid), vec![10, 20, 30]);
        assert_eq!(pids(ProcessSort::Name), vec![20, 30, 10]);
        assert_eq!(ProcessSort::Name.next(), ProcessSort::Cpu);
    }

    #[test]
    fn notifications_expire() {
        let mut state = AppState::new(Theme::default());
        let id = state.add_notification("hello".to_string(), NotificationLevel::Info);
        assert_eq!(state.notifications[0].id, id);
        assert!(!state.remove_expired_notifications());

        state.notifications[0].created_at -= chrono::Duration::seconds(10);
        assert!(state.remove_expired_notifications());
        assert!(state.notifications.is_empty());
    }

    #[test]
    fn store_broadcasts_changes() {
        let store = StateStore::new(AppState::new(Theme::default()));
        let mut rx = store.subscribe();

        store.update(|s| {
            s.tab = Tab::Network;
            ((), Some(StateChange::TabChanged(s.tab)))
        });
        store.update(|s| {
            s.paused = true;
            ((), None)
        });

        assert!(matches!(rx.try_recv(), Ok(StateChange::TabChanged(Tab::Network))));
        assert!(rx.try_recv().is_err());
        assert!(store.read().paused);
    }
}
