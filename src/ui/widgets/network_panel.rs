//! Throughput charts and the socket table

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Rect},
    style::Style,
    text::Span,
    widgets::{Cell, Row, Sparkline, Table, Widget},
};

use crate::sim::model::ConnectionState;
use crate::ui::format;
use crate::ui::layout::LayoutManager;
use crate::ui::renderer::View;
use crate::ui::theme::Theme;

use super::panel;

pub struct NetworkPanel<'a> {
    view: &'a View<'a>,
    theme: &'a Theme,
}

impl<'a> NetworkPanel<'a> {
    pub fn new(view: &'a View<'a>, theme: &'a Theme) -> Self {
        Self { view, theme }
    }

    fn state_style(&self, state: ConnectionState) -> Style {
        match state {
            ConnectionState::Established => self.theme.styles.status_running,
            ConnectionState::Listen => Style::default().fg(self.theme.colors.info),
            ConnectionState::SynSent => self.theme.styles.status_warning,
            ConnectionState::TimeWait | ConnectionState::CloseWait => self.theme.styles.muted,
        }
    }
}

impl<'a> Widget for NetworkPanel<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let sim = self.view.sim;
        let network = &sim.world().stats.network;

        let [charts, table_area] = LayoutManager::top_strip(area, (area.height / 3).max(5));
        let [down_area, up_area] = LayoutManager::columns(charts, 50);

        // KB/s resolution keeps small rates visible
        let history = sim.history();
        let download: Vec<u64> = history
            .iter()
            .map(|p| (p.net_in * 1024.0).max(0.0) as u64)
            .collect();
        let upload: Vec<u64> = history
            .iter()
            .map(|p| (p.net_out * 1024.0).max(0.0) as u64)
            .collect();

        Sparkline::default()
            .block(panel(
                format!(" ↓ DOWNLOAD {} ", format::throughput(network.download_speed)),
                self.theme,
            ))
            .data(&download)
            .style(self.theme.styles.status_running)
            .render(down_area, buf);

        Sparkline::default()
            .block(panel(
                format!(" ↑ UPLOAD {} ", format::throughput(network.upload_speed)),
                self.theme,
            ))
            .data(&upload)
            .style(Style::default().fg(self.theme.colors.accent_secondary))
            .render(up_area, buf);

        let connections = sim.connections();
        let block = panel(format!(" CONNECTIONS {} ", connections.len()), self.theme);
        let visible = block.inner(table_area).height.saturating_sub(1) as usize;
        let max_offset = connections.len().saturating_sub(visible);
        let offset = self.view.ui.selection.connection_scroll.min(max_offset);

        let rows: Vec<Row> = connections
            .iter()
            .skip(offset)
            .take(visible)
            .map(|c| {
                Row::new(vec![
                    Cell::from(c.protocol.to_string()),
                    Cell::from(c.local_address.as_str()),
                    Cell::from(c.remote_address.as_str()),
                    Cell::from(Span::styled(c.state.to_string(), self.state_style(c.state))),
                    Cell::from(format!("{}/{}", c.pid, c.process_name)),
                ])
                .style(self.theme.styles.list_item)
            })
            .collect();

        Table::new(
            rows,
            [
                Constraint::Length(5),
                Constraint::Length(22),
                Constraint::Length(22),
                Constraint::Length(12),
                Constraint::Min(14),
            ],
        )
        .header(
            Row::new(vec!["PROTO", "LOCAL", "REMOTE", "STATE", "PID/PROGRAM"])
                .style(self.theme.styles.table_header),
        )
        .column_spacing(1)
        .block(block)
        .render(table_area, buf);
    }
}
