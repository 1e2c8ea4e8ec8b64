//! Header and tab bar widgets

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Tabs, Widget},
};

use crate::core::state::{AppState, Tab};
use crate::sim::model::StressMode;
use crate::ui::format;
use crate::ui::renderer::View;
use crate::ui::theme::Theme;

pub struct Header<'a> {
    view: &'a View<'a>,
    theme: &'a Theme,
}

impl<'a> Header<'a> {
    pub fn new(view: &'a View<'a>, theme: &'a Theme) -> Self {
        Self { view, theme }
    }
}

impl<'a> Widget for Header<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        buf.set_style(area, self.theme.styles.header);

        let sim = self.view.sim;
        let stats = &sim.world().stats;
        let separator = || Span::styled(" │ ", Style::default().fg(self.theme.colors.fg_muted));

        let health_color = match stats.health_score {
            80..=100 => self.theme.colors.success,
            50..=79 => self.theme.colors.warning,
            _ => self.theme.colors.error,
        };

        let mut spans = vec![
            Span::styled(
                " ◉ SIMTOP ",
                Style::default()
                    .fg(self.theme.colors.accent_primary)
                    .add_modifier(Modifier::BOLD),
            ),
            separator(),
            Span::styled(
                sim.config().display.hostname.as_str(),
                Style::default().fg(self.theme.colors.fg_primary),
            ),
            separator(),
            Span::styled(
                format!("up {}", format::uptime(stats.uptime)),
                Style::default().fg(self.theme.colors.fg_secondary),
            ),
            separator(),
            Span::styled(
                format!("health {}", stats.health_score),
                Style::default().fg(health_color).add_modifier(Modifier::BOLD),
            ),
        ];

        if sim.stress_mode() != StressMode::None {
            spans.push(separator());
            spans.push(Span::styled(
                format!("⚠ STRESS {}", sim.stress_mode()),
                Style::default()
                    .fg(self.theme.colors.error)
                    .add_modifier(Modifier::BOLD),
            ));
        }

        if self.view.ui.paused {
            spans.push(separator());
            spans.push(Span::styled(
                "⏸ PAUSED",
                Style::default().fg(self.theme.colors.warning),
            ));
        }

        buf.set_line(area.x, area.y, &Line::from(spans), area.width);

        // Simulated clock on the right
        let time = stats.timestamp.format("%H:%M:%S").to_string();
        let time_span = Span::styled(&time, Style::default().fg(self.theme.colors.fg_muted));
        let time_x = area.x + area.width.saturating_sub(time.len() as u16 + 1);
        buf.set_span(time_x, area.y, &time_span, time.len() as u16);
    }
}

pub struct TabBar<'a> {
    state: &'a AppState,
    theme: &'a Theme,
}

impl<'a> TabBar<'a> {
    pub fn new(state: &'a AppState, theme: &'a Theme) -> Self {
        Self { state, theme }
    }
}

impl<'a> Widget for TabBar<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let titles: Vec<Line> = Tab::ALL
            .iter()
            .enumerate()
            .map(|(i, tab)| Line::from(format!("{} {}", i + 1, tab.title())))
            .collect();

        Tabs::new(titles)
            .select(self.state.tab.index())
            .style(
                Style::default()
                    .fg(self.theme.colors.fg_muted)
                    .bg(self.theme.colors.bg_primary),
            )
            .highlight_style(
                Style::default()
                    .fg(self.theme.colors.accent_primary)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            )
            .divider(Span::styled("│", self.theme.styles.muted))
            .render(area, buf);
    }
}
