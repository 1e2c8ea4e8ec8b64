//! systemd-style unit list

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Cell, Paragraph, Row, Table, Widget},
};

use crate::sim::model::{Service, ServiceStatus};
use crate::ui::format;
use crate::ui::layout::LayoutManager;
use crate::ui::renderer::View;
use crate::ui::theme::Theme;

use super::panel;
use super::process_table::scroll_offset;

pub struct ServicesPanel<'a> {
    view: &'a View<'a>,
    theme: &'a Theme,
}

impl<'a> ServicesPanel<'a> {
    pub fn new(view: &'a View<'a>, theme: &'a Theme) -> Self {
        Self { view, theme }
    }

    fn status_style(&self, status: ServiceStatus) -> Style {
        match status {
            ServiceStatus::Active => self.theme.styles.status_running,
            ServiceStatus::Inactive => self.theme.styles.muted,
            ServiceStatus::Failed => self.theme.styles.status_stopped,
        }
    }

    fn render_detail(&self, service: &Service, area: Rect, buf: &mut Buffer) {
        let block = panel(" STATUS ", self.theme);
        let inner = block.inner(area);
        block.render(area, buf);

        let since = if service.is_active() {
            format!(" for {}", format::uptime(service.uptime))
        } else {
            String::new()
        };
        let lines = vec![
            Line::from(vec![
                Span::styled("● ", self.status_style(service.status)),
                Span::styled(
                    service.name.as_str(),
                    Style::default()
                        .fg(self.theme.colors.fg_primary)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(format!(" - {}", service.description), self.theme.styles.muted),
            ]),
            Line::from(vec![
                Span::styled("   Active: ", self.theme.styles.muted),
                Span::styled(
                    format!("{} ({})", service.status, service.sub_state),
                    self.status_style(service.status),
                ),
                Span::styled(since, self.theme.styles.list_item),
            ]),
            Line::from(vec![
                Span::styled(" Main PID: ", self.theme.styles.muted),
                Span::styled(
                    service
                        .pid
                        .map(|pid| format!("{} ({})", pid, service.name.trim_end_matches(".service")))
                        .unwrap_or_else(|| "-".to_string()),
                    self.theme.styles.list_item,
                ),
            ]),
        ];
        Paragraph::new(lines).render(inner, buf);
    }
}

impl<'a> Widget for ServicesPanel<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let services = &self.view.sim.world().services;
        let selected = self
            .view
            .ui
            .selection
            .service
            .min(services.len().saturating_sub(1));

        let detail_height = 5.min(area.height / 2);
        let [table_area, detail_area] =
            LayoutManager::top_strip(area, area.height.saturating_sub(detail_height));

        let active = services.iter().filter(|s| s.is_active()).count();
        let block = panel(
            format!(" UNITS {} active / {} ", active, services.len()),
            self.theme,
        );
        let visible = block.inner(table_area).height.saturating_sub(1) as usize;
        let offset = scroll_offset(selected, visible);

        let rows: Vec<Row> = services
            .iter()
            .enumerate()
            .skip(offset)
            .take(visible)
            .map(|(i, s)| {
                let row = Row::new(vec![
                    Cell::from(s.name.as_str()),
                    Cell::from("loaded"),
                    Cell::from(Span::styled(s.status.to_string(), self.status_style(s.status))),
                    Cell::from(s.sub_state.to_string()),
                    Cell::from(s.pid.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string())),
                    Cell::from(if s.is_active() {
                        format::uptime(s.uptime)
                    } else {
                        "-".to_string()
                    }),
                    Cell::from(s.description.as_str()),
                ]);
                if i == selected {
                    row.style(self.theme.styles.list_item_selected)
                } else {
                    row.style(self.theme.styles.list_item)
                }
            })
            .collect();

        Table::new(
            rows,
            [
                Constraint::Length(22),
                Constraint::Length(7),
                Constraint::Length(9),
                Constraint::Length(8),
                Constraint::Length(6),
                Constraint::Length(12),
                Constraint::Min(20),
            ],
        )
        .header(
            Row::new(vec!["UNIT", "LOAD", "ACTIVE", "SUB", "PID", "UPTIME", "DESCRIPTION"])
                .style(self.theme.styles.table_header),
        )
        .column_spacing(1)
        .block(block)
        .render(table_area, buf);

        if let Some(service) = services.get(selected) {
            self.render_detail(service, detail_area, buf);
        }
    }
}
