//! Health analysis panel

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

use crate::advisory::{AdvisoryStatus, AnalysisResult};
use crate::core::state::AdvisoryView;
use crate::ui::renderer::View;
use crate::ui::theme::Theme;

use super::panel;

pub struct AdvisoryPanel<'a> {
    view: &'a View<'a>,
    theme: &'a Theme,
}

impl<'a> AdvisoryPanel<'a> {
    pub fn new(view: &'a View<'a>, theme: &'a Theme) -> Self {
        Self { view, theme }
    }

    fn status_style(&self, status: AdvisoryStatus) -> Style {
        let color = match status {
            AdvisoryStatus::Healthy => self.theme.colors.success,
            AdvisoryStatus::Warning => self.theme.colors.warning,
            AdvisoryStatus::Critical => self.theme.colors.error,
        };
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }

    fn result_lines(&self, result: &AnalysisResult, width: usize) -> Vec<Line<'static>> {
        let mut lines = vec![Line::from(vec![
            Span::styled(format!("● {}", result.status), self.status_style(result.status)),
            Span::styled(
                format!("  {}", result.analyzed_at.format("%H:%M:%S")),
                self.theme.styles.muted,
            ),
        ])];

        lines.extend(
            textwrap::wrap(&result.summary, width)
                .into_iter()
                .map(|l| Line::styled(l.into_owned(), self.theme.styles.list_item)),
        );

        if !result.recommendations.is_empty() {
            lines.push(Line::default());
            let options = textwrap::Options::new(width)
                .initial_indent("• ")
                .subsequent_indent("  ");
            for recommendation in &result.recommendations {
                lines.extend(
                    textwrap::wrap(recommendation, &options)
                        .into_iter()
                        .map(|l| Line::styled(l.into_owned(), self.theme.styles.keybind)),
                );
            }
        }
        lines
    }
}

impl<'a> Widget for AdvisoryPanel<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = panel(" HEALTH ANALYSIS ", self.theme);
        let inner = block.inner(area);
        block.render(area, buf);

        let width = (inner.width as usize).max(8);
        let lines = match &self.view.ui.advisory {
            AdvisoryView::Idle => vec![Line::from(vec![
                Span::styled("Press ", self.theme.styles.muted),
                Span::styled("[a]", self.theme.styles.keybind_key),
                Span::styled(" to analyze", self.theme.styles.muted),
            ])],
            AdvisoryView::Loading => vec![Line::styled(
                "Analyzing system state…",
                Style::default().fg(self.theme.colors.info),
            )],
            AdvisoryView::Ready(result) => self.result_lines(result, width),
            AdvisoryView::Unavailable(reason) => {
                let mut lines = vec![Line::styled(
                    "No analysis available",
                    Style::default().fg(self.theme.colors.warning),
                )];
                lines.extend(
                    textwrap::wrap(reason, width)
                        .into_iter()
                        .map(|l| Line::styled(l.into_owned(), self.theme.styles.muted)),
                );
                lines
            }
        };

        Paragraph::new(lines).render(inner, buf);
    }
}
