//! Alert history and the system journal

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

use crate::ui::layout::LayoutManager;
use crate::ui::renderer::View;
use crate::ui::theme::Theme;

use super::panel;

pub struct AlertsPanel<'a> {
    view: &'a View<'a>,
    theme: &'a Theme,
}

impl<'a> AlertsPanel<'a> {
    pub fn new(view: &'a View<'a>, theme: &'a Theme) -> Self {
        Self { view, theme }
    }

    fn render_alerts(&self, area: Rect, buf: &mut Buffer) {
        let sim = self.view.sim;
        let block = panel(format!(" ALERTS {} ", sim.alerts().count()), self.theme);
        let inner = block.inner(area);
        block.render(area, buf);

        let lines: Vec<Line> = sim
            .alerts()
            .take(inner.height as usize)
            .map(|alert| {
                Line::from(vec![
                    Span::styled(
                        format!("{} ", alert.timestamp.format("%H:%M:%S")),
                        self.theme.styles.muted,
                    ),
                    Span::styled(
                        format!("{:<8} ", alert.severity.to_string()),
                        self.theme.severity_style(alert.severity),
                    ),
                    Span::styled(format!("{:<7}", alert.component.to_string()), self.theme.styles.keybind),
                    Span::styled(alert.message.as_str(), self.theme.styles.list_item),
                ])
            })
            .collect();

        if lines.is_empty() {
            Paragraph::new(Line::styled("No alerts", self.theme.styles.muted)).render(inner, buf);
        } else {
            Paragraph::new(lines).render(inner, buf);
        }
    }

    fn render_logs(&self, area: Rect, buf: &mut Buffer) {
        let sim = self.view.sim;
        let total = sim.logs().count();
        let block = panel(format!(" JOURNAL {} ", total), self.theme);
        let inner = block.inner(area);
        block.render(area, buf);

        // Scroll counts back from the newest line.
        let rows = inner.height as usize;
        let scroll = self.view.ui.selection.log_scroll.min(total.saturating_sub(rows));
        let mut entries: Vec<_> = sim.logs().rev().skip(scroll).take(rows).collect();
        entries.reverse();

        let lines: Vec<Line> = entries
            .into_iter()
            .map(|entry| {
                Line::from(vec![
                    Span::styled(
                        format!("{} ", entry.timestamp.format("%b %d %H:%M:%S")),
                        self.theme.styles.muted,
                    ),
                    Span::styled(
                        format!("{:<6} ", entry.level.to_string()),
                        self.theme.log_style(entry.level),
                    ),
                    Span::styled(format!("{}: ", entry.source), self.theme.styles.keybind),
                    Span::styled(entry.message.as_str(), self.theme.styles.list_item),
                ])
            })
            .collect();
        Paragraph::new(lines).render(inner, buf);
    }
}

impl<'a> Widget for AlertsPanel<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let [alerts, logs] = LayoutManager::columns(area, 45);
        self.render_alerts(alerts, buf);
        self.render_logs(logs, buf);
    }
}
