//! UI module - Rendering and layout for the TUI

pub mod format;
pub mod layout;
pub mod renderer;
pub mod theme;
pub mod widgets;
