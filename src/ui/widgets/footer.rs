//! Footer widget with keybindings

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::Widget,
};

use crate::core::state::{AppMode, AppState, Tab};
use crate::ui::theme::Theme;

pub struct Footer<'a> {
    state: &'a AppState,
    theme: &'a Theme,
}

impl<'a> Footer<'a> {
    pub fn new(state: &'a AppState, theme: &'a Theme) -> Self {
        Self { state, theme }
    }

    fn bindings(&self) -> Vec<(&'static str, &'static str)> {
        match &self.state.mode {
            AppMode::Dashboard => {
                let mut bindings = vec![("Tab", "Switch")];
                match self.state.tab {
                    Tab::Overview | Tab::Processes => bindings.extend([
                        ("↑/↓", "Select"),
                        ("x", "Kill"),
                        ("n", "Renice"),
                        ("s", "Stop/Cont"),
                        ("o", "Sort"),
                    ]),
                    Tab::Services => bindings.extend([("↑/↓", "Select"), ("s", "Start/Stop")]),
                    Tab::Network => bindings.push(("↑/↓", "Scroll")),
                    Tab::Alerts => bindings.extend([
                        ("↑/↓", "Scroll"),
                        ("c", "Clear alerts"),
                        ("l", "Clear logs"),
                    ]),
                    Tab::Hardware | Tab::Disk => {}
                }
                bindings.extend([
                    ("m", "Stress"),
                    ("a", "Analyze"),
                    ("`", "Shell"),
                    ("p", "Pause"),
                    ("?", "Help"),
                    ("q", "Quit"),
                ]);
                bindings
            }
            AppMode::Help => vec![("Esc", "Close"), ("q", "Close")],
            AppMode::Shell => vec![
                ("Enter", "Run"),
                ("↑/↓", "History"),
                ("Esc", "Close"),
            ],
            AppMode::Confirm { .. } => vec![("y", "Confirm"), ("n", "Cancel"), ("Esc", "Cancel")],
        }
    }
}

impl<'a> Widget for Footer<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        buf.set_style(area, self.theme.styles.footer);

        let mut spans = Vec::new();
        for (i, (key, action)) in self.bindings().iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled("  ", self.theme.styles.keybind));
            }
            spans.push(Span::styled(
                format!("[{}]", key),
                self.theme.styles.keybind_key,
            ));
            spans.push(Span::styled(
                format!(" {}", action),
                self.theme.styles.keybind,
            ));
        }

        let line = Line::from(spans);
        buf.set_line(area.x + 1, area.y, &line, area.width.saturating_sub(2));
    }
}
