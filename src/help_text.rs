use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;

/// Help content for the console TUI
pub struct HelpText;

fn heading(text: &'static str) -> Line<'static> {
    Line::from(text).style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )
}

impl HelpText {
    pub fn left_column() -> Vec<Line<'static>> {
        vec![
            Line::from("Cluster Console Help").style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Line::from(""),
            heading("FUNCTIONS"),
            Line::from("  ↑↓ / j k - Select function"),
            Line::from("  Enter    - Open function"),
            Line::from("  /        - Fuzzy search"),
            Line::from("  a        - Show all / compact"),
            Line::from("  f        - Toggle favorite"),
            Line::from("  J / K    - Move function down / up"),
            Line::from("  [ / ]    - Move category up / down"),
            Line::from("  < / >    - Move function to previous / next category"),
            Line::from("  D        - Delete custom function or category"),
            Line::from("  r        - Reload functions"),
            Line::from("  q        - Quit"),
        ]
    }

    pub fn right_column() -> Vec<Line<'static>> {
        vec![
            heading("LEVELS"),
            Line::from("  ↑↓ / j k - Select row"),
            Line::from("  ←→ / h l - Select column"),
            Line::from("  Enter    - Drill into the linked cell"),
            Line::from("  Backspace / Esc - Back one level"),
            Line::from("  r        - Refresh level"),
            Line::from("  e        - Export level to CSV"),
            Line::from(""),
            heading("GLOBAL"),
            Line::from("  c        - Switch to next cluster"),
            Line::from("  F5       - Toggle log view"),
            Line::from("  F1       - Toggle this help"),
            Line::from("  Ctrl+C   - Quit"),
        ]
    }
}
