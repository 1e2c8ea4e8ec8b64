//! Overview tab: headline gauges, history charts, top processes, recent logs

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Gauge, Paragraph, Sparkline, Widget},
};

use crate::config::Threshold;
use crate::ui::format;
use crate::ui::layout::LayoutManager;
use crate::ui::renderer::View;
use crate::ui::theme::Theme;

use super::{panel, AdvisoryPanel, ProcessTable};

pub struct Overview<'a> {
    view: &'a View<'a>,
    theme: &'a Theme,
}

impl<'a> Overview<'a> {
    pub fn new(view: &'a View<'a>, theme: &'a Theme) -> Self {
        Self { view, theme }
    }

    fn gauge(&self, title: &str, percent: f64, label: String, threshold: &Threshold) -> Gauge<'_> {
        let title = format!(" {} ", title);
        Gauge::default()
            .block(panel(title, self.theme))
            .gauge_style(
                Style::default()
                    .fg(self.theme.level_color(percent, threshold))
                    .bg(self.theme.colors.bg_tertiary),
            )
            .ratio((percent / 100.0).clamp(0.0, 1.0))
            .label(label)
    }

    fn render_logs(&self, area: Rect, buf: &mut Buffer) {
        let block = panel(" RECENT LOGS ", self.theme);
        let inner = block.inner(area);
        block.render(area, buf);

        let mut entries: Vec<_> = self.view.sim.logs().rev().take(inner.height as usize).collect();
        entries.reverse();

        let lines: Vec<Line> = entries
            .into_iter()
            .map(|entry| {
                Line::from(vec![
                    Span::styled(
                        format!("{:<6}", entry.level.to_string()),
                        self.theme.log_style(entry.level),
                    ),
                    Span::styled(format!("{} ", entry.source), self.theme.styles.muted),
                    Span::styled(entry.message.as_str(), self.theme.styles.list_item),
                ])
            })
            .collect();

        Paragraph::new(lines).render(inner, buf);
    }
}

impl<'a> Widget for Overview<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let layout = LayoutManager::overview(area, self.view.ui);
        let sim = self.view.sim;
        let stats = &sim.world().stats;
        let thresholds = &sim.config().thresholds;

        let memory = stats.memory_percent();
        let disk = stats.disk_percent();
        let temp = stats.thermal.cpu_temp;
        let gauges = [
            self.gauge(
                "CPU",
                stats.total_cpu_usage,
                format!("{:.1}%", stats.total_cpu_usage),
                &thresholds.cpu,
            ),
            self.gauge(
                "MEMORY",
                memory,
                format!(
                    "{} / {}",
                    format::megabytes(stats.total_memory_usage),
                    format::megabytes(stats.total_memory_available)
                ),
                &thresholds.memory,
            ),
            self.gauge(
                "DISK",
                disk,
                format!("{:.0} / {:.0} GB", stats.disk.used_space, stats.disk.total_space),
                &thresholds.disk,
            ),
            self.gauge("CPU TEMP", temp, format!("{:.0}°C", temp), &thresholds.thermal),
        ];
        for (gauge, rect) in gauges.into_iter().zip(layout.gauges) {
            gauge.render(rect, buf);
        }

        // History charts
        let history = sim.history();
        let cpu_data: Vec<u64> = history.iter().map(|p| p.cpu.max(0.0) as u64).collect();
        let memory_data: Vec<u64> = history
            .iter()
            .map(|p| (p.memory * 10.0).max(0.0) as u64)
            .collect();
        let memory_max = (stats.total_memory_available / 1024.0 * 10.0).max(1.0) as u64;

        let cpu_title = format!(
            " CPU HISTORY · load {:.2} {:.2} {:.2} ",
            stats.load_average[0], stats.load_average[1], stats.load_average[2]
        );
        Sparkline::default()
            .block(panel(cpu_title, self.theme))
            .data(&cpu_data)
            .max(100)
            .style(self.theme.styles.sparkline)
            .render(layout.cpu_chart, buf);

        let memory_title = format!(
            " MEMORY HISTORY · {} procs, {} running ",
            stats.total_processes, stats.running_processes
        );
        Sparkline::default()
            .block(panel(memory_title, self.theme))
            .data(&memory_data)
            .max(memory_max)
            .style(
                Style::default()
                    .fg(self.theme.colors.accent_secondary)
                    .add_modifier(Modifier::BOLD),
            )
            .render(layout.memory_chart, buf);

        ProcessTable::new(self.view, self.theme)
            .compact()
            .render(layout.processes, buf);
        self.render_logs(layout.logs, buf);
        AdvisoryPanel::new(self.view, self.theme).render(layout.advisory, buf);
    }
}
