//! Process table

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Rect},
    style::Style,
    text::Span,
    widgets::{Cell, Row, Table, Widget},
};

use crate::sim::model::{Process, ProcessState};
use crate::ui::format;
use crate::ui::renderer::View;
use crate::ui::theme::Theme;

use super::panel;

pub struct ProcessTable<'a> {
    view: &'a View<'a>,
    theme: &'a Theme,
    compact: bool,
}

impl<'a> ProcessTable<'a> {
    pub fn new(view: &'a View<'a>, theme: &'a Theme) -> Self {
        Self {
            view,
            theme,
            compact: false,
        }
    }

    /// Narrow variant for the overview.
    pub fn compact(mut self) -> Self {
        self.compact = true;
        self
    }
}

/// First row to draw so that `selected` stays visible in `rows` lines.
pub(crate) fn scroll_offset(selected: usize, rows: usize) -> usize {
    if rows == 0 {
        0
    } else {
        selected.saturating_sub(rows - 1)
    }
}

fn state_letter(state: ProcessState) -> &'static str {
    match state {
        ProcessState::Running => "R",
        ProcessState::Sleeping => "S",
        ProcessState::Stopped => "T",
        ProcessState::Zombie => "Z",
    }
}

impl<'a> ProcessTable<'a> {
    fn row(&self, process: &'a Process, selected: bool) -> Row<'a> {
        let thresholds = &self.view.sim.config().thresholds;
        let cpu = Span::styled(
            format!("{:5.1}", process.cpu_usage),
            Style::default().fg(self.theme.level_color(process.cpu_usage, &thresholds.cpu)),
        );
        let name_style = if process.is_system {
            self.theme.styles.muted
        } else {
            self.theme.styles.list_item
        };

        let cells = if self.compact {
            vec![
                Cell::from(process.pid.to_string()),
                Cell::from(Span::styled(process.name.as_str(), name_style)),
                Cell::from(cpu),
                Cell::from(format::megabytes(process.memory_usage)),
            ]
        } else {
            vec![
                Cell::from(process.pid.to_string()),
                Cell::from(process.user.as_str()),
                Cell::from(process.priority.nice().to_string()),
                Cell::from(Span::styled(
                    state_letter(process.state),
                    self.theme.process_state_style(process.state),
                )),
                Cell::from(cpu),
                Cell::from(format::megabytes(process.memory_usage)),
                Cell::from(process.threads.to_string()),
                Cell::from(format::uptime(process.uptime)),
                Cell::from(Span::styled(process.command.as_str(), name_style)),
            ]
        };

        let row = Row::new(cells);
        if selected {
            row.style(self.theme.styles.list_item_selected)
        } else {
            row.style(self.theme.styles.list_item)
        }
    }
}

impl<'a> Widget for ProcessTable<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let ui = self.view.ui;
        let world = self.view.sim.world();
        let sorted = ui.sort.sorted(&world.processes);

        let title = format!(
            " PROCESSES {} · sort {} ",
            world.processes.len(),
            ui.sort.label()
        );
        let block = panel(title, self.theme);
        let visible = block.inner(area).height.saturating_sub(1) as usize;

        let selected = ui.selection.process;
        let offset = scroll_offset(selected, visible);

        let rows: Vec<Row> = sorted
            .iter()
            .enumerate()
            .skip(offset)
            .take(visible)
            .map(|(i, p)| self.row(p, i == selected))
            .collect();

        let (header, widths): (Vec<&str>, Vec<Constraint>) = if self.compact {
            (
                vec!["PID", "NAME", "CPU%", "MEM"],
                vec![
                    Constraint::Length(6),
                    Constraint::Min(12),
                    Constraint::Length(6),
                    Constraint::Length(10),
                ],
            )
        } else {
            (
                vec!["PID", "USER", "NI", "S", "CPU%", "MEM", "THR", "TIME", "COMMAND"],
                vec![
                    Constraint::Length(6),
                    Constraint::Length(9),
                    Constraint::Length(4),
                    Constraint::Length(2),
                    Constraint::Length(6),
                    Constraint::Length(10),
                    Constraint::Length(4),
                    Constraint::Length(12),
                    Constraint::Min(16),
                ],
            )
        };

        Table::new(rows, widths)
            .header(Row::new(header).style(self.theme.styles.table_header))
            .column_spacing(1)
            .block(block)
            .render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_stays_in_view() {
        assert_eq!(scroll_offset(0, 10), 0);
        assert_eq!(scroll_offset(9, 10), 0);
        assert_eq!(scroll_offset(10, 10), 1);
        assert_eq!(scroll_offset(25, 10), 16);
        assert_eq!(scroll_offset(5, 0), 0);
    }

    #[test]
    fn state_letters_match_ps() {
        assert_eq!(state_letter(ProcessState::Stopped), "T");
        assert_eq!(state_letter(ProcessState::Zombie), "Z");
    }
}
