//! Modal UI rendering functions.

use ratatui::Frame;
use ratatui::layout::Alignment;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::app::{App, Message, MessageKind};
use crate::modals::{
    FilePromptState, InsertPickerState, Modal, NewDefinitionField, NewDefinitionState, TextInput,
};
use crate::registry::DefinitionRegistry;
use crate::ui::{centered_rect, truncate_str};

/// Render a text input as spans, scrolling horizontally to keep the cursor in view.
pub fn render_input(input: &TextInput, focused: bool, field_width: usize) -> Vec<Span<'static>> {
    let chars: Vec<char> = input.value.chars().collect();
    let start = if chars.len() > field_width {
        let start = input.cursor.saturating_sub(field_width / 2);
        let end = (start + field_width).min(chars.len());
        end.saturating_sub(field_width)
    } else {
        0
    };
    let end = (start + field_width).min(chars.len());
    let window = &chars[start..end];

    if !focused {
        return vec![Span::styled(
            window.iter().collect::<String>(),
            Style::default().fg(Color::White),
        )];
    }

    let visible_cursor = input.cursor.saturating_sub(start).min(window.len());
    let before: String = window[..visible_cursor].iter().collect();
    let (cursor_char, rest) = match window.get(visible_cursor) {
        Some(c) => (
            c.to_string(),
            window[visible_cursor + 1..].iter().collect::<String>(),
        ),
        None => (" ".to_string(), String::new()),
    };

    vec![
        Span::styled(before, Style::default().fg(Color::White)),
        Span::styled(
            cursor_char,
            Style::default().fg(Color::Black).bg(Color::White),
        ),
        Span::styled(rest, Style::default().fg(Color::White)),
    ]
}

fn button_span(label: &'static str, focused: bool) -> Span<'static> {
    let style = if focused {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Cyan)
    };
    Span::styled(label, style)
}

/// Draw whichever modal is open.
pub fn draw_modal(f: &mut Frame, app: &App) {
    match &app.modal {
        Some(Modal::NewDefinition(state)) => draw_new_definition_modal(f, state),
        Some(Modal::InsertPicker(state)) => draw_insert_picker(f, state, &app.registry),
        Some(Modal::FilePrompt(state)) => draw_file_prompt(f, state),
        None => {}
    }
}

/// Draw the new definition form.
pub fn draw_new_definition_modal(f: &mut Frame, state: &NewDefinitionState) {
    let modal_width = 70;
    let modal_height = 14;
    let modal_area = centered_rect(modal_width, modal_height, f.area());
    f.render_widget(Clear, modal_area);

    let field_width = 44;
    let label_style = Style::default().fg(Color::DarkGray);
    let focused_label_style = Style::default().fg(Color::Cyan);

    let field_line = |label: &'static str, input: &TextInput, field: NewDefinitionField| {
        let focused = state.focus == field;
        let style = if focused {
            focused_label_style
        } else {
            label_style
        };
        let mut spans = vec![Span::styled(label, style)];
        spans.extend(render_input(input, focused, field_width));
        Line::from(spans)
    };

    let mut content: Vec<Line> = vec![
        Line::from(""),
        field_line("  Name:       ", &state.name, NewDefinitionField::Name),
        field_line("  Parameters: ", &state.params, NewDefinitionField::Params),
        Line::from(Span::styled(
            "              separate names with |, e.g. path|mode",
            label_style,
        )),
        field_line("  Template:   ", &state.template, NewDefinitionField::Template),
        Line::from(Span::styled(
            "              use {name} as the placeholder for a parameter",
            label_style,
        )),
        Line::from(""),
    ];

    match &state.error {
        Some(error) => content.push(Line::from(Span::styled(
            format!("  \u{26a0} {}", truncate_str(error, 62)),
            Style::default().fg(Color::Red),
        ))),
        None => content.push(Line::from("")),
    }
    content.push(Line::from(""));
    content.push(Line::from(vec![
        Span::raw("              "),
        button_span("[ Save ]", state.focus == NewDefinitionField::SaveButton),
        Span::raw("    "),
        button_span("[ Cancel ]", state.focus == NewDefinitionField::CancelButton),
    ]));

    let modal = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" New Code Block ")
            .title_alignment(Alignment::Center)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(modal, modal_area);
}

/// Height of the insert picker: one row per definition plus borders and hint.
fn picker_height(definitions: usize) -> u16 {
    u16::try_from(definitions)
        .unwrap_or(u16::MAX)
        .saturating_add(4)
        .clamp(6, 20)
}

/// Draw the list of definitions to insert.
pub fn draw_insert_picker(f: &mut Frame, state: &InsertPickerState, registry: &DefinitionRegistry) {
    let modal_width = 50;
    let modal_height = picker_height(registry.len());
    let modal_area = centered_rect(modal_width, modal_height, f.area());
    f.render_widget(Clear, modal_area);

    let visible = modal_height.saturating_sub(4) as usize;
    let scroll = state.selected.saturating_sub(visible.saturating_sub(1));

    let mut content: Vec<Line> = registry
        .iter()
        .enumerate()
        .skip(scroll)
        .take(visible)
        .map(|(idx, definition)| {
            let label = truncate_str(&definition.picker_label(), modal_width as usize - 6);
            if idx == state.selected {
                Line::from(Span::styled(
                    format!(" \u{25b6} {}", label),
                    Style::default().fg(Color::Black).bg(Color::Cyan),
                ))
            } else {
                Line::from(format!("   {}", label))
            }
        })
        .collect();
    content.push(Line::from(""));
    content.push(Line::from(Span::styled(
        " [Enter] Insert  [Esc] Cancel",
        Style::default().fg(Color::DarkGray),
    )));

    let modal = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Insert at position {} ", state.position + 1))
            .title_alignment(Alignment::Center)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(modal, modal_area);
}

/// Draw the file path prompt.
pub fn draw_file_prompt(f: &mut Frame, state: &FilePromptState) {
    let modal_width = 64;
    let modal_height = 7;
    let modal_area = centered_rect(modal_width, modal_height, f.area());
    f.render_widget(Clear, modal_area);

    let mut path_line = vec![Span::styled("  File: ", Style::default().fg(Color::Cyan))];
    path_line.extend(render_input(&state.path, true, 50));

    let status = match &state.error {
        Some(error) => Line::from(Span::styled(
            format!("  \u{26a0} {}", error),
            Style::default().fg(Color::Red),
        )),
        None => Line::from(Span::styled(
            "  JSON file. [Enter] Confirm  [Esc] Cancel",
            Style::default().fg(Color::DarkGray),
        )),
    };

    let content = vec![Line::from(""), Line::from(path_line), Line::from(""), status];
    let modal = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", state.action.title()))
            .title_alignment(Alignment::Center)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(modal, modal_area);
}

/// Draw an info or error popup.
pub fn draw_message(f: &mut Frame, message: &Message) {
    let color = match message.kind {
        MessageKind::Info => Color::Green,
        MessageKind::Error => Color::Red,
    };
    let text_lines = u16::try_from(message.text.chars().count() / 52 + 1).unwrap_or(u16::MAX);
    let popup_area = centered_rect(60, text_lines.saturating_add(5), f.area());
    f.render_widget(Clear, popup_area);

    let content = vec![
        Line::from(""),
        Line::from(message.text.as_str()),
        Line::from(""),
        Line::from(Span::styled(
            "[Enter] OK",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let popup = Paragraph::new(content)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", message.title))
                .title_alignment(Alignment::Center)
                .border_style(Style::default().fg(color)),
        );
    f.render_widget(popup, popup_area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(spans: &[Span]) -> String {
        spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_picker_height_is_bounded() {
        assert_eq!(picker_height(0), 6);
        assert_eq!(picker_height(10), 14);
        assert_eq!(picker_height(70_000), 20);
    }

    #[test]
    fn test_render_input_unfocused_shows_value() {
        let input = TextInput::with_value("abc");
        let spans = render_input(&input, false, 10);
        assert_eq!(text(&spans), "abc");
    }

    #[test]
    fn test_render_input_cursor_at_end_adds_block() {
        let input = TextInput::with_value("abc");
        let spans = render_input(&input, true, 10);
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[0].content, "abc");
        assert_eq!(spans[1].content, " ");
    }

    #[test]
    fn test_render_input_scrolls_long_values() {
        let mut input = TextInput::with_value("0123456789abcdefghij");
        input.cursor = 0;
        let spans = render_input(&input, true, 8);
        assert_eq!(text(&spans), "01234567");
        assert_eq!(spans[1].content, "0");

        input.cursor = 20;
        let spans = render_input(&input, true, 8);
        assert_eq!(spans[0].content, "cdefghij");
    }
}
