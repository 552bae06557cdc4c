//! UI rendering functions.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::{App, FocusPanel};
use crate::modal_ui::{draw_message, draw_modal, render_input};

/// Lines used by each instance in the sequence panel (header + parameters).
const LINES_PER_INSTANCE: usize = 2;

/// Contract a path by replacing the home directory with `~` for display.
pub fn contract_path(path: &std::path::Path) -> String {
    if let Some(home) = dirs::home_dir()
        && let Ok(suffix) = path.strip_prefix(&home)
    {
        return format!("~/{}", suffix.display());
    }
    path.display().to_string()
}

/// Truncates a string to the given display width, appending "..." if truncated.
pub fn truncate_str(s: &str, max_width: usize) -> String {
    // Replace newlines with spaces for single-line display
    let single_line: String = s.chars().map(|c| if c == '\n' { ' ' } else { c }).collect();

    if single_line.width() <= max_width {
        return single_line;
    }

    let budget = max_width.saturating_sub(3);
    let mut out = String::new();
    let mut used = 0;
    for c in single_line.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push_str("...");
    out
}

/// Centers a fixed-size rectangle within `area`, shrinking it if needed.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

fn panel_block(title: &str, focused: bool) -> Block<'_> {
    let (border_type, color) = if focused {
        (BorderType::Double, Color::Cyan)
    } else {
        (BorderType::Rounded, Color::DarkGray)
    };
    Block::default()
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(Style::default().fg(color))
        .title(format!(" {} ", title))
}

/// Draw the whole screen.
pub fn draw_ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Status panel
            Constraint::Min(1),    // Panels
            Constraint::Length(1), // Footer
        ])
        .split(f.area());

    draw_status(f, app, chunks[0]);

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(28),
            Constraint::Percentage(37),
            Constraint::Percentage(35),
        ])
        .split(chunks[1]);

    draw_definitions_panel(f, app, panels[0]);
    draw_sequence_panel(f, app, panels[1]);
    draw_preview_panel(f, app, panels[2]);
    draw_footer(f, app, chunks[2]);

    if app.modal.is_some() {
        draw_modal(f, app);
    }
    if let Some(message) = &app.message {
        draw_message(f, message);
    }
}

fn draw_status(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled("Blocks: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            app.registry.len().to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled("    Sequence: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            app.sequence.len().to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
    ];

    if app.sequence.has_clipboard() {
        spans.push(Span::styled("    [clipboard]", Style::default().fg(Color::Yellow)));
    }

    spans.push(Span::raw("    Session: "));
    spans.push(Span::styled(
        app.session_id.as_deref().unwrap_or("---").to_string(),
        Style::default().add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::raw("    Logs: "));
    spans.push(Span::styled(
        app.log_directory
            .as_deref()
            .map(contract_path)
            .unwrap_or_else(|| "---".to_string()),
        Style::default().add_modifier(Modifier::DIM),
    ));

    let status = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(status, area);
}

fn draw_definitions_panel(f: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == FocusPanel::Definitions;
    let inner_width = area.width.saturating_sub(2) as usize;

    let mut lines: Vec<Line> = Vec::new();
    if app.registry.is_empty() {
        lines.push(Line::from(Span::styled(
            "No block definitions. Press n to create one or I to import.",
            Style::default().fg(Color::DarkGray),
        )));
    }

    for (idx, definition) in app.registry.iter().enumerate() {
        let selected = idx == app.selected_definition;
        let marker_style = if selected && focused {
            Style::default().fg(Color::Black).bg(Color::Green)
        } else {
            Style::default().fg(Color::Green)
        };
        let name_style = if selected {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let params = format!("<{}>", definition.params.join(" | "));
        let name_width = inner_width.saturating_sub(params.width() + 5).max(4);
        lines.push(Line::from(vec![
            Span::styled(" + ", marker_style),
            Span::raw(" "),
            Span::styled(truncate_str(&definition.name, name_width), name_style),
            Span::raw(" "),
            Span::styled(params, Style::default().fg(Color::DarkGray)),
        ]));
    }

    // Keep the selected definition on screen
    let visible = area.height.saturating_sub(2) as usize;
    let scroll = app
        .selected_definition
        .saturating_sub(visible.saturating_sub(1));

    let panel = Paragraph::new(lines)
        .block(panel_block("Definitions", focused))
        .scroll((u16::try_from(scroll).unwrap_or(u16::MAX), 0));
    f.render_widget(panel, area);
}

fn draw_sequence_panel(f: &mut Frame, app: &mut App, area: Rect) {
    let focused = app.focus == FocusPanel::Sequence;
    let visible = area.height.saturating_sub(2) as usize / LINES_PER_INSTANCE;
    app.ensure_instance_visible(visible);

    let label_style = Style::default().fg(Color::DarkGray);
    let mut lines: Vec<Line> = Vec::new();
    if app.sequence.is_empty() {
        lines.push(Line::from(Span::styled(
            "Empty. Add a definition with Enter in the Definitions panel.",
            label_style,
        )));
    }

    for (idx, instance) in app
        .sequence
        .iter()
        .enumerate()
        .skip(app.sequence_scroll)
        .take(visible.max(1))
    {
        let instance = instance.borrow();
        let selected = idx == app.selected_instance;
        let header_style = if selected && focused {
            Style::default().fg(Color::Black).bg(Color::Cyan)
        } else if selected {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::styled(format!(" \u{2630} {:>2}. ", idx + 1), header_style),
            Span::styled(
                instance.definition.name.clone(),
                header_style.add_modifier(Modifier::BOLD),
            ),
        ]));

        let editing = app
            .param_edit
            .as_ref()
            .filter(|edit| edit.instance_index == idx);
        let mut params = vec![Span::raw("      ")];
        if instance.definition.params.is_empty() {
            params.push(Span::styled("(no parameters)", label_style));
        }
        for (pidx, param) in instance.definition.params.iter().enumerate() {
            let field_focused = editing.is_some_and(|edit| edit.param_index == pidx);
            let label = if field_focused {
                Style::default().fg(Color::Cyan)
            } else {
                label_style
            };
            params.push(Span::styled(format!("{}: ", param), label));
            match editing {
                Some(edit) if field_focused => {
                    params.extend(render_input(&edit.input, true, 20));
                }
                _ => {
                    let value = instance.value(param);
                    if value.is_empty() {
                        // Placeholder hint, like a greyed-out form field
                        params.push(Span::styled(
                            param.clone(),
                            Style::default()
                                .fg(Color::DarkGray)
                                .add_modifier(Modifier::ITALIC),
                        ));
                    } else {
                        params.push(Span::raw(truncate_str(value, 20)));
                    }
                }
            }
            params.push(Span::raw("  "));
        }
        lines.push(Line::from(params));
    }

    let title = if app.param_edit.is_some() {
        "Sequence (editing)"
    } else {
        "Sequence"
    };
    let panel = Paragraph::new(lines).block(panel_block(title, focused));
    f.render_widget(panel, area);
}

fn draw_preview_panel(f: &mut Frame, app: &mut App, area: Rect) {
    let focused = app.focus == FocusPanel::Preview;
    app.preview_height = area.height.saturating_sub(2);
    app.preview_scroll = app.preview_scroll.min(app.max_preview_scroll());

    let content: Vec<Line> = app.preview.lines().map(Line::raw).collect();
    let panel = Paragraph::new(content)
        .block(panel_block("Preview", focused))
        .scroll((app.preview_scroll, 0));
    f.render_widget(panel, area);
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let footer_text = if app.param_edit.is_some() {
        "[Tab] Next field  [Shift-Tab] Previous  [Enter/Esc] Done"
    } else {
        match app.focus {
            FocusPanel::Definitions => {
                "[Enter/+] Add  [d] Delete  [n] New  [I/E] Import/Export  [S/L] Save/Load  [Tab] Panel  [q] Quit"
            }
            FocusPanel::Sequence => {
                "[Enter] Edit  [O/o] Insert above/below  [d] Delete  [y] Copy  [x] Cut  [p] Paste  [Tab] Panel  [q] Quit"
            }
            FocusPanel::Preview => "[j/k] Scroll  [n] New  [S/L] Save/Load  [Tab] Panel  [q] Quit",
        }
    };
    let footer = Paragraph::new(Line::from(Span::styled(
        footer_text,
        Style::default().fg(Color::DarkGray),
    )));
    f.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str_short_unchanged() {
        assert_eq!(truncate_str("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_str_long() {
        assert_eq!(truncate_str("abcdefghij", 8), "abcde...");
    }

    #[test]
    fn test_truncate_str_newlines_flattened() {
        assert_eq!(truncate_str("a\nb", 10), "a b");
    }

    #[test]
    fn test_truncate_str_wide_chars() {
        // Each CJK character is two columns wide
        assert_eq!(truncate_str("代码块名称", 7), "代码...");
    }

    #[test]
    fn test_centered_rect() {
        let area = Rect::new(0, 0, 100, 40);
        assert_eq!(centered_rect(40, 10, area), Rect::new(30, 15, 40, 10));
        assert_eq!(centered_rect(200, 50, area), Rect::new(0, 0, 100, 40));
    }
}
