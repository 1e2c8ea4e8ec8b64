//! Thermal, power and load readings

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Gauge, Paragraph, Sparkline, Widget},
};

use crate::config::Threshold;
use crate::ui::layout::LayoutManager;
use crate::ui::renderer::View;
use crate::ui::theme::Theme;

use super::panel;

/// Fan ceiling used to scale the gauge.
const MAX_FAN_RPM: f64 = 6000.0;

pub struct HardwarePanel<'a> {
    view: &'a View<'a>,
    theme: &'a Theme,
}

impl<'a> HardwarePanel<'a> {
    pub fn new(view: &'a View<'a>, theme: &'a Theme) -> Self {
        Self { view, theme }
    }

    fn gauge(&self, title: String, ratio: f64, label: String, color: ratatui::style::Color) -> Gauge<'_> {
        Gauge::default()
            .block(panel(title, self.theme))
            .gauge_style(Style::default().fg(color).bg(self.theme.colors.bg_tertiary))
            .ratio(ratio.clamp(0.0, 1.0))
            .label(label)
    }
}

impl<'a> Widget for HardwarePanel<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let sim = self.view.sim;
        let stats = &sim.world().stats;
        let thermal = &stats.thermal;
        let battery = &stats.battery;
        let thermal_threshold = &sim.config().thresholds.thermal;

        let [left, right] = LayoutManager::columns(area, 50);
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3); 4])
            .split(left);

        self.gauge(
            " CPU PACKAGE ".to_string(),
            thermal.cpu_temp / 100.0,
            format!("{:.1}°C", thermal.cpu_temp),
            self.theme.level_color(thermal.cpu_temp, thermal_threshold),
        )
        .render(rows[0], buf);

        self.gauge(
            " GPU ".to_string(),
            thermal.gpu_temp / 100.0,
            format!("{:.1}°C", thermal.gpu_temp),
            self.theme.level_color(thermal.gpu_temp, thermal_threshold),
        )
        .render(rows[1], buf);

        self.gauge(
            " FAN ".to_string(),
            thermal.fan_speed / MAX_FAN_RPM,
            format!("{:.0} RPM", thermal.fan_speed),
            self.theme.colors.info,
        )
        .render(rows[2], buf);

        let battery_threshold = Threshold {
            warning: 60.0,
            critical: 80.0,
        };
        let charging = if battery.is_charging {
            format!("charging, full in {:.0} min", battery.time_left)
        } else {
            format!("{:.0} min left", battery.time_left)
        };
        self.gauge(
            " BATTERY ".to_string(),
            battery.level / 100.0,
            format!("{:.0}% · {}", battery.level, charging),
            // Low charge is the bad end.
            self.theme
                .level_color(100.0 - battery.level, &battery_threshold),
        )
        .render(rows[3], buf);

        // Right column: temperature history and readings
        let [chart, readings] = LayoutManager::top_strip(right, right.height.saturating_sub(8));

        let temps: Vec<u64> = sim
            .history()
            .iter()
            .map(|p| p.temp.max(0.0) as u64)
            .collect();
        Sparkline::default()
            .block(panel(" TEMPERATURE HISTORY ", self.theme))
            .data(&temps)
            .max(100)
            .style(Style::default().fg(self.theme.colors.warning))
            .render(chart, buf);

        let label = |text: &'static str| Span::styled(format!("{:<14}", text), self.theme.styles.muted);
        let value = |text: String| Span::styled(text, self.theme.styles.list_item);
        let lines = vec![
            Line::from(vec![
                label("Load average"),
                value(format!(
                    "{:.2}  {:.2}  {:.2}",
                    stats.load_average[0], stats.load_average[1], stats.load_average[2]
                )),
            ]),
            Line::from(vec![label("Core voltage"), value(format!("{:.3} V", thermal.voltage))]),
            Line::from(vec![
                label("Processes"),
                value(format!(
                    "{} total, {} running, {} sleeping",
                    stats.total_processes, stats.running_processes, stats.sleeping_processes
                )),
            ]),
            Line::from(vec![label("Threads"), value(stats.active_threads.to_string())]),
            Line::from(vec![
                label("Disk I/O"),
                value(format!(
                    "{:.1} MB/s read, {:.1} MB/s write",
                    stats.disk.read_speed, stats.disk.write_speed
                )),
            ]),
        ];

        let block = panel(" SENSORS ", self.theme);
        let inner = block.inner(readings);
        block.render(readings, buf);
        Paragraph::new(lines).render(inner, buf);
    }
}
