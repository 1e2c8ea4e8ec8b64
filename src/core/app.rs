//! Main application orchestrator

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::Stdout;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

use crate::advisory::{AdvisoryError, AdvisoryRequests, Advisor, HttpAdvisor, Snapshot};
use crate::config::Config;
use crate::core::events::{Event, EventHandler, EventResult, KeyBindings};
use crate::core::state::{
    AdvisoryView, AppMode, AppState, NotificationLevel, StateChange, StateStore, Tab,
};
use crate::shell::Shell;
use crate::sim::model::{AlertSeverity, World};
use crate::sim::{Command, Simulation};
use crate::ui::renderer::{Renderer, View};
use crate::ui::theme::Theme;

pub struct App {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    state: StateStore,
    changes: broadcast::Receiver<StateChange>,
    event_tx: mpsc::UnboundedSender<Event>,
    sim: Simulation,
    shell: Shell,
    advisor: Option<Arc<dyn Advisor>>,
    requests: AdvisoryRequests,
    tick_period: Duration,
}

impl App {
    pub fn new(config: Config, seed: Option<u64>) -> Result<Self> {
        let backend = CrosstermBackend::new(std::io::stdout());
        let terminal = Terminal::new(backend)?;

        let theme = Theme::from_name(&config.display.theme);
        let state = StateStore::new(AppState::new(theme));
        let changes = state.subscribe();

        // Placeholder sender, replaced in run()
        let (event_tx, _) = mpsc::unbounded_channel::<Event>();

        let advisor: Option<Arc<dyn Advisor>> = match HttpAdvisor::from_config(&config.advisory) {
            Ok(advisor) => Some(Arc::new(advisor)),
            Err(AdvisoryError::Disabled) => {
                tracing::info!("advisory service disabled");
                None
            }
            Err(e) => {
                tracing::warn!("advisory service unavailable: {}", e);
                None
            }
        };

        let sim = Simulation::new(config, seed);
        let tick_period = sim.tick_period();

        Ok(Self {
            terminal,
            state,
            changes,
            event_tx,
            sim,
            shell: Shell::new(),
            advisor,
            requests: AdvisoryRequests::default(),
            tick_period,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        self.setup_terminal()?;

        let (mut event_handler, event_tx) = EventHandler::new();
        self.event_tx = event_tx.clone();
        EventHandler::spawn_sources(event_tx, self.tick_period);

        self.render()?;

        let result = self.event_loop(&mut event_handler).await;

        self.requests.cancel();
        self.shutdown()?;
        result
    }

    fn setup_terminal(&mut self) -> Result<()> {
        crossterm::terminal::enable_raw_mode()?;
        crossterm::execute!(
            std::io::stdout(),
            crossterm::terminal::EnterAlternateScreen,
            crossterm::cursor::Hide,
        )?;
        let size = self.terminal.size()?;
        self.state.update(|s| {
            s.terminal_size = (size.width, size.height);
            ((), None)
        });
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        crossterm::terminal::disable_raw_mode()?;
        crossterm::execute!(
            std::io::stdout(),
            crossterm::terminal::LeaveAlternateScreen,
            crossterm::cursor::Show,
        )?;
        Ok(())
    }

    async fn event_loop(&mut self, event_handler: &mut EventHandler) -> Result<()> {
        loop {
            let Some(event) = event_handler.next().await else {
                break;
            };

            match self.handle_event(event)? {
                EventResult::Continue => {}
                EventResult::Quit => break,
            }

            if self.drain_changes() {
                self.render()?;
            }
        }
        Ok(())
    }

    /// Whether anything was published since the last frame.
    fn drain_changes(&mut self) -> bool {
        let mut dirty = false;
        loop {
            match self.changes.try_recv() {
                Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => dirty = true,
                Err(_) => break,
            }
        }
        dirty
    }

    fn handle_event(&mut self, event: Event) -> Result<EventResult> {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Resize(w, h) => {
                self.state.update(|s| {
                    s.terminal_size = (w, h);
                    ((), Some(StateChange::Resized))
                });
                Ok(EventResult::Continue)
            }
            Event::Tick => {
                self.state.update(|s| {
                    let expired = s.remove_expired_notifications();
                    ((), expired.then_some(StateChange::NotificationsExpired))
                });
                Ok(EventResult::Continue)
            }
            Event::SimTick => {
                self.advance_simulation();
                Ok(EventResult::Continue)
            }
            Event::AdvisoryDone { generation, result } => {
                if !self.requests.is_current(generation) {
                    tracing::debug!(generation, "dropping stale analysis");
                    return Ok(EventResult::Continue);
                }
                self.state.update(|s| {
                    s.advisory = match result {
                        Ok(analysis) => AdvisoryView::Ready(analysis),
                        Err(message) => AdvisoryView::Unavailable(message),
                    };
                    ((), Some(StateChange::AdvisoryUpdated))
                });
                Ok(EventResult::Continue)
            }
        }
    }

    fn advance_simulation(&mut self) {
        if self.state.read().paused {
            return;
        }

        let outcome = self.sim.tick(self.tick_period);
        let tick = outcome.tick;
        let raised: Vec<(AlertSeverity, String)> = outcome
            .new_alerts
            .iter()
            .filter(|a| a.severity != AlertSeverity::Info)
            .map(|a| (a.severity, a.message.clone()))
            .collect();

        let world = self.sim.world();
        let connections = self.sim.connections().len();
        self.state.update(|s| {
            for (severity, message) in raised {
                let level = match severity {
                    AlertSeverity::Critical => NotificationLevel::Error,
                    _ => NotificationLevel::Warning,
                };
                s.add_notification(message, level);
            }
            s.clamp_selection(world, connections);
            ((), Some(StateChange::SimulationTicked(tick)))
        });
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<EventResult> {
        let mode = self.state.read().mode.clone();

        match mode {
            AppMode::Dashboard => self.handle_dashboard_key(key),
            AppMode::Help => self.handle_help_key(key),
            AppMode::Shell => self.handle_shell_key(key),
            AppMode::Confirm { pid, .. } => self.handle_confirm_key(key, pid),
        }
    }

    fn set_mode(&self, mode: AppMode) {
        self.state.update(|s| {
            s.mode = mode.clone();
            ((), Some(StateChange::ModeChanged(mode)))
        });
    }

    fn handle_dashboard_key(&mut self, key: KeyEvent) -> Result<EventResult> {
        if KeyBindings::quit().matches(&key) || KeyBindings::quit_alt().matches(&key) {
            return Ok(EventResult::Quit);
        }

        if KeyBindings::help().matches(&key) {
            self.set_mode(AppMode::Help);
            return Ok(EventResult::Continue);
        }

        if KeyBindings::shell().matches(&key) {
            self.set_mode(AppMode::Shell);
            return Ok(EventResult::Continue);
        }

        if KeyBindings::tab().matches(&key) {
            let tab = self.state.read().tab.next();
            self.switch_tab(tab);
            return Ok(EventResult::Continue);
        }

        if KeyBindings::backtab().matches(&key) {
            let tab = self.state.read().tab.prev();
            self.switch_tab(tab);
            return Ok(EventResult::Continue);
        }

        if let KeyCode::Char(c @ '1'..='7') = key.code {
            if let Some(tab) = Tab::from_index(c as usize - '1' as usize) {
                self.switch_tab(tab);
            }
            return Ok(EventResult::Continue);
        }

        if KeyBindings::up().matches(&key) || KeyBindings::vim_up().matches(&key) {
            self.navigate(-1);
            return Ok(EventResult::Continue);
        }

        if KeyBindings::down().matches(&key) || KeyBindings::vim_down().matches(&key) {
            self.navigate(1);
            return Ok(EventResult::Continue);
        }

        if KeyBindings::kill().matches(&key) {
            self.confirm_kill();
            return Ok(EventResult::Continue);
        }

        if KeyBindings::renice().matches(&key) {
            if let Some((pid, priority)) = self.selected_process(|p| (p.pid, p.priority.next())) {
                self.run_command(Command::Renice { pid, priority });
            }
            return Ok(EventResult::Continue);
        }

        if KeyBindings::toggle().matches(&key) || KeyBindings::enter().matches(&key) {
            self.toggle_selected();
            return Ok(EventResult::Continue);
        }

        if KeyBindings::stress().matches(&key) {
            let mode = self.sim.stress_mode().next();
            self.run_command(Command::SetStressMode(mode));
            return Ok(EventResult::Continue);
        }

        if KeyBindings::advisory().matches(&key) {
            self.request_analysis();
            return Ok(EventResult::Continue);
        }

        if KeyBindings::pause().matches(&key) {
            self.state.update(|s| {
                s.paused = !s.paused;
                ((), Some(StateChange::PauseToggled(s.paused)))
            });
            return Ok(EventResult::Continue);
        }

        if KeyBindings::sort().matches(&key) {
            self.state.update(|s| {
                s.sort = s.sort.next();
                s.selection.process = 0;
                ((), Some(StateChange::SelectionChanged))
            });
            return Ok(EventResult::Continue);
        }

        if KeyBindings::clear_alerts().matches(&key) {
            self.sim.clear_alerts();
            self.state.notify(StateChange::CommandApplied);
            return Ok(EventResult::Continue);
        }

        if KeyBindings::clear_logs().matches(&key) {
            self.sim.clear_logs();
            self.state.update(|s| {
                s.selection.log_scroll = 0;
                ((), Some(StateChange::CommandApplied))
            });
            return Ok(EventResult::Continue);
        }

        Ok(EventResult::Continue)
    }

    fn handle_help_key(&mut self, key: KeyEvent) -> Result<EventResult> {
        if KeyBindings::escape().matches(&key)
            || KeyBindings::help().matches(&key)
            || KeyBindings::quit().matches(&key)
        {
            self.set_mode(AppMode::Dashboard);
        }
        Ok(EventResult::Continue)
    }

    fn handle_shell_key(&mut self, key: KeyEvent) -> Result<EventResult> {
        if KeyBindings::quit_alt().matches(&key) {
            return Ok(EventResult::Quit);
        }

        if KeyBindings::escape().matches(&key) || KeyBindings::shell().matches(&key) {
            self.set_mode(AppMode::Dashboard);
            return Ok(EventResult::Continue);
        }

        match key.code {
            KeyCode::Enter => {
                self.shell.submit(&mut self.sim);
                let world = self.sim.world();
                let connections = self.sim.connections().len();
                self.state.update(|s| {
                    s.clamp_selection(world, connections);
                    ((), Some(StateChange::CommandApplied))
                });
            }
            KeyCode::Up => {
                self.shell.history_prev();
                self.state.notify(StateChange::CommandApplied);
            }
            KeyCode::Down => {
                self.shell.history_next();
                self.state.notify(StateChange::CommandApplied);
            }
            KeyCode::Backspace => {
                self.shell.input.pop();
                self.state.notify(StateChange::CommandApplied);
            }
            KeyCode::Char(c) => {
                self.shell.input.push(c);
                self.state.notify(StateChange::CommandApplied);
            }
            _ => {}
        }
        Ok(EventResult::Continue)
    }

    fn handle_confirm_key(&mut self, key: KeyEvent, pid: u32) -> Result<EventResult> {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                self.set_mode(AppMode::Dashboard);
                self.run_command(Command::Kill(pid));
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.set_mode(AppMode::Dashboard);
            }
            _ => {}
        }
        Ok(EventResult::Continue)
    }

    fn switch_tab(&self, tab: Tab) {
        self.state.update(|s| {
            s.tab = tab;
            ((), Some(StateChange::TabChanged(tab)))
        });
    }

    fn navigate(&self, delta: isize) {
        let world = self.sim.world();
        let connections = self.sim.connections().len();
        let logs = self.sim.logs().count();
        self.state.update(|s| {
            let step = |value: usize, len: usize| -> usize {
                value
                    .saturating_add_signed(delta)
                    .min(len.saturating_sub(1))
            };
            match s.tab {
                Tab::Overview | Tab::Processes => {
                    s.selection.process = step(s.selection.process, world.processes.len());
                }
                Tab::Services => {
                    s.selection.service = step(s.selection.service, world.services.len());
                }
                Tab::Network => {
                    s.selection.connection_scroll = step(s.selection.connection_scroll, connections);
                }
                Tab::Alerts => {
                    s.selection.log_scroll = step(s.selection.log_scroll, logs);
                }
                Tab::Hardware | Tab::Disk => return ((), None),
            }
            ((), Some(StateChange::SelectionChanged))
        });
    }

    fn selected_process<T>(&self, f: impl FnOnce(&crate::sim::model::Process) -> T) -> Option<T> {
        let state = self.state.read();
        if !matches!(state.tab, Tab::Overview | Tab::Processes) {
            return None;
        }
        state.selected_process(self.sim.world()).map(f)
    }

    fn confirm_kill(&mut self) {
        let Some((pid, name)) = self.selected_process(|p| (p.pid, p.name.clone())) else {
            return;
        };
        self.set_mode(AppMode::Confirm {
            message: format!("Send SIGKILL to {} (PID {})?", name, pid),
            pid,
        });
    }

    fn toggle_selected(&mut self) {
        let command = toggle_command(&self.state.read(), self.sim.world());
        if let Some(command) = command {
            self.run_command(command);
        }
    }

    /// Apply a command and surface its outcome as a notification.
    fn run_command(&mut self, command: Command) {
        let (message, level) = match self.sim.apply(command) {
            Ok(message) => (message, NotificationLevel::Success),
            Err(e) => (e.to_string(), NotificationLevel::Error),
        };

        let world = self.sim.world();
        let connections = self.sim.connections().len();
        self.state.update(|s| {
            let id = s.add_notification(message, level);
            s.clamp_selection(world, connections);
            ((), Some(StateChange::NotificationAdded(id)))
        });
    }

    fn request_analysis(&mut self) {
        let Some(advisor) = self.advisor.clone() else {
            self.state.update(|s| {
                s.advisory = AdvisoryView::Unavailable(AdvisoryError::Disabled.to_string());
                ((), Some(StateChange::AdvisoryUpdated))
            });
            return;
        };

        let snapshot = Snapshot::capture(&self.sim);
        let event_tx = self.event_tx.clone();
        let generation = self.requests.start(advisor, snapshot, move |generation, result| {
            let _ = event_tx.send(Event::AdvisoryDone {
                generation,
                result: result.map_err(|e| e.to_string()),
            });
        });
        tracing::debug!(generation, "analysis requested");

        self.state.update(|s| {
            s.advisory = AdvisoryView::Loading;
            ((), Some(StateChange::AdvisoryUpdated))
        });
    }

    fn render(&mut self) -> Result<()> {
        let state = self.state.snapshot();
        let view = View {
            ui: &state,
            sim: &self.sim,
            shell: &self.shell,
        };
        self.terminal.draw(|frame| {
            Renderer::render(frame, &view);
        })?;
        Ok(())
    }
}

/// What the toggle key does for the current selection: a unit on the
/// Services tab, otherwise a Running/Stopped flip of the selected process.
fn toggle_command(ui: &AppState, world: &World) -> Option<Command> {
    match ui.tab {
        Tab::Services => world
            .services
            .get(ui.selection.service)
            .map(|s| Command::ToggleService(s.id.clone())),
        Tab::Overview | Tab::Processes => ui
            .selected_process(world)
            .map(|p| Command::ToggleProcess(p.pid)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ui(tab: Tab) -> AppState {
        let mut state = AppState::new(Theme::from_name("tokyo-night"));
        state.tab = tab;
        state
    }

    #[test]
    fn toggle_flips_the_selected_process() {
        let sim = Simulation::new(Config::default(), Some(3));
        let state = ui(Tab::Processes);
        let pid = state.selected_process(sim.world()).map(|p| p.pid).unwrap();
        assert_eq!(
            toggle_command(&state, sim.world()),
            Some(Command::ToggleProcess(pid))
        );
    }

    #[test]
    fn toggle_on_services_targets_the_selected_unit() {
        let sim = Simulation::new(Config::default(), Some(3));
        let mut state = ui(Tab::Services);
        state.selection.service = 1;
        let id = sim.world().services[1].id.clone();
        assert_eq!(
            toggle_command(&state, sim.world()),
            Some(Command::ToggleService(id))
        );
    }

    #[test]
    fn toggle_does_nothing_on_hardware() {
        let sim = Simulation::new(Config::default(), Some(3));
        assert_eq!(toggle_command(&ui(Tab::Hardware), sim.world()), None);
    }
}
