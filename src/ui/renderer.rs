//! Main UI renderer

use ratatui::{layout::Rect, Frame};

use crate::core::state::{AppMode, AppState, NotificationLevel, Tab};
use crate::shell::Shell;
use crate::sim::Simulation;
use crate::ui::layout::LayoutManager;
use crate::ui::widgets::*;

/// Everything a frame is drawn from.
pub struct View<'a> {
    pub ui: &'a AppState,
    pub sim: &'a Simulation,
    pub shell: &'a Shell,
}

pub struct Renderer;

impl Renderer {
    pub fn render(frame: &mut Frame, view: &View) {
        let area = frame.area();
        let theme = &view.ui.theme;

        // Clear background
        frame.render_widget(
            ratatui::widgets::Block::default()
                .style(ratatui::style::Style::default().bg(theme.colors.bg_primary)),
            area,
        );

        let layout = LayoutManager::compute(area, view.ui);

        frame.render_widget(Header::new(view, theme), layout.header);
        frame.render_widget(TabBar::new(view.ui, theme), layout.tabs);
        frame.render_widget(Footer::new(view.ui, theme), layout.footer);

        match view.ui.tab {
            Tab::Overview => frame.render_widget(Overview::new(view, theme), layout.body),
            Tab::Processes => {
                frame.render_widget(ProcessTable::new(view, theme), layout.body)
            }
            Tab::Hardware => frame.render_widget(HardwarePanel::new(view, theme), layout.body),
            Tab::Network => frame.render_widget(NetworkPanel::new(view, theme), layout.body),
            Tab::Services => frame.render_widget(ServicesPanel::new(view, theme), layout.body),
            Tab::Disk => frame.render_widget(DiskPanel::new(view, theme), layout.body),
            Tab::Alerts => frame.render_widget(AlertsPanel::new(view, theme), layout.body),
        }

        // Overlays
        if let Some(overlay_area) = layout.overlay_area {
            match &view.ui.mode {
                AppMode::Help => frame.render_widget(HelpOverlay::new(theme), overlay_area),
                AppMode::Shell => {
                    frame.render_widget(ShellOverlay::new(view, theme), overlay_area)
                }
                AppMode::Confirm { message, .. } => {
                    Self::render_confirm_dialog(frame, view.ui, message, overlay_area)
                }
                AppMode::Dashboard => {}
            }
        }

        Self::render_notifications(frame, view.ui);
    }

    fn render_confirm_dialog(frame: &mut Frame, state: &AppState, message: &str, area: Rect) {
        use ratatui::style::Style;
        use ratatui::text::{Line, Span};
        use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

        let theme = &state.theme;

        frame.render_widget(Clear, area);

        let block = Block::default()
            .title(Span::styled(" Confirm ", theme.styles.panel_title))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.colors.error))
            .style(Style::default().bg(theme.colors.bg_secondary));

        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.height < 3 {
            return;
        }

        frame.render_widget(
            Paragraph::new(message)
                .style(Style::default().fg(theme.colors.fg_primary))
                .alignment(ratatui::layout::Alignment::Center)
                .wrap(Wrap { trim: true }),
            Rect {
                y: inner.y + 1,
                height: inner.height.saturating_sub(3).max(1),
                ..inner
            },
        );

        let buttons = Line::from(vec![
            Span::styled("[Y]es", theme.styles.keybind_key),
            Span::styled("  ", theme.styles.keybind),
            Span::styled("[N]o", theme.styles.keybind_key),
        ]);

        frame.render_widget(
            Paragraph::new(buttons).alignment(ratatui::layout::Alignment::Center),
            Rect {
                y: inner.y + inner.height - 1,
                height: 1,
                ..inner
            },
        );
    }

    fn render_notifications(frame: &mut Frame, state: &AppState) {
        use ratatui::style::Style;
        use ratatui::text::Span;
        use ratatui::widgets::Paragraph;
        use unicode_width::UnicodeWidthStr;

        let theme = &state.theme;
        let area = frame.area();

        // Newest three, stacked under the tab bar on the right
        let mut y = 3;
        for notification in state.notifications.iter().rev().take(3) {
            let (style, icon) = match notification.level {
                NotificationLevel::Info => (theme.styles.notification_info, "ℹ"),
                NotificationLevel::Success => (theme.styles.notification_success, "✓"),
                NotificationLevel::Warning => (theme.styles.status_warning, "⚠"),
                NotificationLevel::Error => (theme.styles.notification_error, "✗"),
            };

            let msg = crate::ui::format::truncate(
                &format!(" {} {} ", icon, notification.message),
                48,
            );
            let width = (msg.width() as u16).min(area.width);
            if y >= area.height {
                break;
            }

            let notification_area = Rect {
                x: area.width.saturating_sub(width + 2),
                y,
                width,
                height: 1,
            };

            frame.render_widget(
                Paragraph::new(Span::styled(msg, style))
                    .style(Style::default().bg(theme.colors.bg_tertiary)),
                notification_area,
            );

            y += 2;
        }
    }
}
