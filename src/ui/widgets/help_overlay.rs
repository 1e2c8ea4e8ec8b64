//! Help overlay widget

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Widget},
};

use crate::ui::theme::Theme;

const SECTIONS: &[(&str, &[(&str, &str)])] = &[
    (
        "General",
        &[
            ("q", "Quit simtop"),
            ("?", "Toggle help"),
            ("Tab/1-7", "Switch tab"),
            ("p", "Pause the simulation"),
        ],
    ),
    (
        "Processes",
        &[
            ("↑/k ↓/j", "Move selection"),
            ("x", "Kill selected process"),
            ("n", "Cycle priority"),
            ("s", "Stop or continue"),
            ("o", "Cycle sort column"),
        ],
    ),
    (
        "System",
        &[
            ("s/Enter", "Start or stop selected service"),
            ("m", "Cycle stress mode"),
            ("a", "Request health analysis"),
            ("c / l", "Clear alerts / logs"),
        ],
    ),
    (
        "Shell",
        &[
            ("`", "Open the command shell"),
            ("Esc", "Close overlay"),
        ],
    ),
];

pub struct HelpOverlay<'a> {
    theme: &'a Theme,
}

impl<'a> HelpOverlay<'a> {
    pub fn new(theme: &'a Theme) -> Self {
        Self { theme }
    }
}

impl<'a> Widget for HelpOverlay<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Clear.render(area, buf);

        let block = Block::default()
            .title(Span::styled(" ◉ simtop help ", self.theme.styles.panel_title))
            .borders(Borders::ALL)
            .border_style(self.theme.styles.panel_border_focused)
            .style(Style::default().bg(self.theme.colors.bg_secondary));

        let inner = block.inner(area);
        block.render(area, buf);

        let mut y = inner.y;

        for (section, bindings) in SECTIONS {
            if y >= inner.y + inner.height {
                break;
            }

            let header = Line::from(vec![Span::styled(
                format!("─── {} ", section),
                Style::default()
                    .fg(self.theme.colors.accent_primary)
                    .add_modifier(Modifier::BOLD),
            )]);
            buf.set_line(inner.x + 1, y, &header, inner.width.saturating_sub(2));
            y += 1;

            for (key, desc) in bindings.iter() {
                if y >= inner.y + inner.height {
                    break;
                }

                let line = Line::from(vec![
                    Span::styled(format!("  {:>9}  ", key), self.theme.styles.keybind_key),
                    Span::styled(*desc, self.theme.styles.keybind),
                ]);
                buf.set_line(inner.x + 1, y, &line, inner.width.saturating_sub(2));
                y += 1;
            }

            y += 1;
        }

        let footer = " Press Esc or ? to close ";
        if area.height > 0 && area.width as usize > footer.len() {
            let span = Span::styled(footer, self.theme.styles.muted);
            buf.set_span(
                area.x + (area.width - footer.len() as u16) / 2,
                area.y + area.height - 1,
                &span,
                footer.len() as u16,
            );
        }
    }
}
