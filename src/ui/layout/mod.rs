//! Layout management system

use ratatui::layout::{Constraint, Direction, Layout, Rect};

use crate::core::state::{AppMode, AppState};

/// Below this width the overview stacks its columns.
const COMPACT_WIDTH: u16 = 100;

/// Computed frame regions
#[derive(Debug, Clone, Default)]
pub struct ComputedLayout {
    pub header: Rect,
    pub tabs: Rect,
    pub body: Rect,
    pub footer: Rect,
    pub overlay_area: Option<Rect>,
}

/// Overview tab panes
#[derive(Debug, Clone, Default)]
pub struct OverviewLayout {
    pub gauges: [Rect; 4],
    pub cpu_chart: Rect,
    pub memory_chart: Rect,
    pub processes: Rect,
    pub logs: Rect,
    pub advisory: Rect,
}

pub struct LayoutManager;

impl LayoutManager {
    /// Split the frame into chrome, body and the overlay for the current mode.
    pub fn compute(area: Rect, state: &AppState) -> ComputedLayout {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Header
                Constraint::Length(1), // Tabs
                Constraint::Min(8),    // Body
                Constraint::Length(1), // Footer
            ])
            .split(area);

        let overlay_area = match state.mode {
            AppMode::Dashboard => None,
            AppMode::Help => Some(centered_rect(60, 80, area)),
            AppMode::Shell => Some(centered_rect(80, 75, area)),
            AppMode::Confirm { .. } => Some(centered_rect(50, 25, area)),
        };

        ComputedLayout {
            header: chunks[0],
            tabs: chunks[1],
            body: chunks[2],
            footer: chunks[3],
            overlay_area,
        }
    }

    pub fn overview(body: Rect, state: &AppState) -> OverviewLayout {
        let compact = state.terminal_size.0 < COMPACT_WIDTH;

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),      // Gauges
                Constraint::Percentage(35), // Charts
                Constraint::Min(6),         // Lists
            ])
            .split(body);

        let gauge_row = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 4); 4])
            .split(rows[0]);

        let charts = Self::columns(rows[1], 50);

        let (processes, logs, advisory) = if compact {
            let stacked = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                .split(rows[2]);
            let lower = Self::columns(stacked[1], 50);
            (stacked[0], lower[0], lower[1])
        } else {
            let cols = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Percentage(45),
                    Constraint::Percentage(30),
                    Constraint::Percentage(25),
                ])
                .split(rows[2]);
            (cols[0], cols[1], cols[2])
        };

        OverviewLayout {
            gauges: [gauge_row[0], gauge_row[1], gauge_row[2], gauge_row[3]],
            cpu_chart: charts[0],
            memory_chart: charts[1],
            processes,
            logs,
            advisory,
        }
    }

    /// Two columns, the left taking `left_percent` of the width.
    pub fn columns(area: Rect, left_percent: u16) -> [Rect; 2] {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(left_percent),
                Constraint::Percentage(100 - left_percent.min(100)),
            ])
            .split(area);
        [chunks[0], chunks[1]]
    }

    /// A fixed-height strip on top and the remainder below.
    pub fn top_strip(area: Rect, height: u16) -> [Rect; 2] {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(height), Constraint::Min(0)])
            .split(area);
        [chunks[0], chunks[1]]
    }
}

/// Create a centered rect with given percentage width/height
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::theme::Theme;

    #[test]
    fn chrome_takes_one_row_each() {
        let state = AppState::new(Theme::default());
        let layout = LayoutManager::compute(Rect::new(0, 0, 120, 40), &state);
        assert_eq!(layout.header.height, 1);
        assert_eq!(layout.tabs.y, 1);
        assert_eq!(layout.body.height, 37);
        assert_eq!(layout.footer.y, 39);
        assert!(layout.overlay_area.is_none());
    }

    #[test]
    fn overlays_follow_mode() {
        let mut state = AppState::new(Theme::default());
        state.mode = AppMode::Shell;
        let area = Rect::new(0, 0, 100, 50);
        let overlay = LayoutManager::compute(area, &state).overlay_area.unwrap();
        assert!(overlay.width <= area.width && overlay.height <= area.height);
        assert!(overlay.x > 0);
    }

    #[test]
    fn compact_overview_stacks_processes() {
        let mut state = AppState::new(Theme::default());
        let body = Rect::new(0, 2, 80, 40);

        state.terminal_size = (80, 42);
        let compact = LayoutManager::overview(body, &state);
        assert_eq!(compact.processes.width, 80);

        state.terminal_size = (160, 42);
        let wide = LayoutManager::overview(Rect::new(0, 2, 160, 40), &state);
        assert!(wide.processes.width < 160);
        assert_eq!(wide.processes.y, wide.advisory.y);
    }
}
