//! UI Widgets

pub mod advisory_panel;
pub mod alerts_panel;
pub mod disk_panel;
pub mod footer;
pub mod hardware_panel;
pub mod header;
pub mod help_overlay;
pub mod network_panel;
pub mod overview;
pub mod process_table;
pub mod services_panel;
pub mod shell_overlay;

pub use advisory_panel::AdvisoryPanel;
pub use alerts_panel::AlertsPanel;
pub use disk_panel::DiskPanel;
pub use footer::Footer;
pub use hardware_panel::HardwarePanel;
pub use header::{Header, TabBar};
pub use help_overlay::HelpOverlay;
pub use network_panel::NetworkPanel;
pub use overview::Overview;
pub use process_table::ProcessTable;
pub use services_panel::ServicesPanel;
pub use shell_overlay::ShellOverlay;

use std::borrow::Cow;

use ratatui::{
    style::Style,
    text::Span,
    widgets::{Block, Borders},
};

use crate::ui::theme::Theme;

/// Bordered panel block with a styled title.
pub(crate) fn panel<'a>(title: impl Into<Cow<'a, str>>, theme: &Theme) -> Block<'a> {
    Block::default()
        .title(Span::styled(title, theme.styles.panel_title))
        .borders(Borders::ALL)
        .border_style(theme.styles.panel_border)
        .style(Style::default().bg(theme.colors.bg_primary))
}
