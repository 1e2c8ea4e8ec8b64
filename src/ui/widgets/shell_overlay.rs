//! Embedded shell overlay

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};

use crate::shell::{LineKind, Shell};
use crate::ui::renderer::View;
use crate::ui::theme::Theme;

pub struct ShellOverlay<'a> {
    view: &'a View<'a>,
    theme: &'a Theme,
}

impl<'a> ShellOverlay<'a> {
    pub fn new(view: &'a View<'a>, theme: &'a Theme) -> Self {
        Self { view, theme }
    }

    fn kind_style(&self, kind: LineKind) -> Style {
        match kind {
            LineKind::Input => Style::default()
                .fg(self.theme.colors.fg_primary)
                .add_modifier(Modifier::BOLD),
            LineKind::Output => self.theme.styles.list_item,
            LineKind::Error => self.theme.styles.notification_error,
            LineKind::Success => self.theme.styles.notification_success,
            LineKind::Info => self.theme.styles.notification_info,
        }
    }
}

impl<'a> Widget for ShellOverlay<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Clear.render(area, buf);

        let block = Block::default()
            .title(Span::styled(" >_ shell ", self.theme.styles.panel_title))
            .borders(Borders::ALL)
            .border_style(self.theme.styles.panel_border_focused)
            .style(Style::default().bg(self.theme.colors.bg_secondary));
        let inner = block.inner(area);
        block.render(area, buf);
        if inner.height == 0 {
            return;
        }

        // Scrollback fills everything above the prompt, newest at the bottom.
        let rows = inner.height.saturating_sub(1) as usize;
        let shell = self.view.shell;
        let skip = shell.line_count().saturating_sub(rows);
        let lines: Vec<Line> = shell
            .lines()
            .skip(skip)
            .map(|line| Line::styled(line.text.as_str(), self.kind_style(line.kind)))
            .collect();
        Paragraph::new(lines).render(
            Rect {
                height: rows as u16,
                ..inner
            },
            buf,
        );

        let prompt = Line::from(vec![
            Span::styled(
                Shell::prompt(self.view.sim),
                Style::default()
                    .fg(self.theme.colors.success)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" "),
            Span::styled(shell.input.as_str(), self.theme.styles.list_item),
            Span::styled(
                "█",
                Style::default()
                    .fg(self.theme.colors.cursor)
                    .add_modifier(Modifier::SLOW_BLINK),
            ),
        ]);
        buf.set_line(inner.x, inner.y + inner.height - 1, &prompt, inner.width);
    }
}
