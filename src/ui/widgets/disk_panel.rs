//! Volume usage and per-directory breakdown

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Gauge, Paragraph, Sparkline, Widget},
};

use crate::ui::format;
use crate::ui::layout::LayoutManager;
use crate::ui::renderer::View;
use crate::ui::theme::Theme;

use super::panel;

pub struct DiskPanel<'a> {
    view: &'a View<'a>,
    theme: &'a Theme,
}

impl<'a> DiskPanel<'a> {
    pub fn new(view: &'a View<'a>, theme: &'a Theme) -> Self {
        Self { view, theme }
    }
}

/// A `width`-cell bar filled to `percent`.
fn bar(percent: f64, width: usize) -> (String, String) {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    let filled = filled.min(width);
    ("█".repeat(filled), "░".repeat(width - filled))
}

impl<'a> Widget for DiskPanel<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let sim = self.view.sim;
        let world = sim.world();
        let disk = &world.stats.disk;
        let percent = world.stats.disk_percent();

        let [usage_area, rest] = LayoutManager::top_strip(area, 3);
        Gauge::default()
            .block(panel(" /dev/sda1 ", self.theme))
            .gauge_style(
                Style::default()
                    .fg(self.theme.level_color(percent, &sim.config().thresholds.disk))
                    .bg(self.theme.colors.bg_tertiary),
            )
            .ratio((percent / 100.0).clamp(0.0, 1.0))
            .label(format!(
                "{:.1} GB used of {:.0} GB ({:.1}%)",
                disk.used_space, disk.total_space, percent
            ))
            .render(usage_area, buf);

        let [nodes_area, io_area] = LayoutManager::columns(rest, 60);

        // Directory breakdown
        let block = panel(" USAGE BY DIRECTORY ", self.theme);
        let inner = block.inner(nodes_area);
        block.render(nodes_area, buf);

        let bar_width = (inner.width as usize).saturating_sub(34).clamp(4, 40);
        let mut nodes: Vec<_> = world.disk_nodes.iter().collect();
        nodes.sort_by(|a, b| b.size.total_cmp(&a.size));
        let lines: Vec<Line> = nodes
            .into_iter()
            .map(|node| {
                let color = self.theme.hex(&node.color);
                let (filled, empty) = bar(node.percentage, bar_width);
                Line::from(vec![
                    Span::styled(format!("{:<8}", node.name), Style::default().fg(color)),
                    Span::styled(filled, Style::default().fg(color)),
                    Span::styled(empty, self.theme.styles.muted),
                    Span::styled(
                        format!(" {:>10} {:>5.1}%", format::megabytes(node.size), node.percentage),
                        self.theme.styles.list_item,
                    ),
                ])
            })
            .collect();
        Paragraph::new(lines).render(inner, buf);

        // I/O history
        let [read_area, write_area] = {
            let half = io_area.height / 2;
            LayoutManager::top_strip(io_area, half)
        };
        let history = sim.history();
        let reads: Vec<u64> = history
            .iter()
            .map(|p| (p.disk_read * 10.0).max(0.0) as u64)
            .collect();
        let writes: Vec<u64> = history
            .iter()
            .map(|p| (p.disk_write * 10.0).max(0.0) as u64)
            .collect();

        Sparkline::default()
            .block(panel(format!(" READ {:.1} MB/s ", disk.read_speed), self.theme))
            .data(&reads)
            .style(Style::default().fg(self.theme.colors.info))
            .render(read_area, buf);
        Sparkline::default()
            .block(panel(format!(" WRITE {:.1} MB/s ", disk.write_speed), self.theme))
            .data(&writes)
            .style(Style::default().fg(self.theme.colors.accent_secondary))
            .render(write_area, buf);
    }
}
