//! UI layout and rendering logic for the watch TUI.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::app::{App, Focus, RunStatus};
use crate::execution::LogKind;

/// Render the main UI
pub fn render_ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Panes
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(main_layout[0]);

    render_editor(frame, app, panes[0]);
    render_console(frame, app, panes[1]);
    render_status_bar(frame, app, main_layout[1]);

    if app.show_help {
        render_help_overlay(frame);
    }
}

fn pane_block(title: String, focused: bool) -> Block<'static> {
    let style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(style)
        .title(title)
}

/// Source with line numbers; the annotated line gets a gutter marker.
fn render_editor(frame: &mut Frame, app: &App, area: Rect) {
    let gutter = app.lines.len().to_string().len();
    let mut content_lines = Vec::with_capacity(app.lines.len());

    for (index, text) in app.lines.iter().enumerate() {
        let number = index as u32 + 1;
        let annotation = app.annotations.on_line(number);
        let (marker, number_style) = match annotation {
            Some(_) => (
                "●",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            None => (" ", Style::default().fg(Color::DarkGray)),
        };
        let mut spans = vec![
            Span::styled(marker, Style::default().fg(Color::Red)),
            Span::styled(format!("{number:>gutter$} "), number_style),
            Span::raw(text.clone()),
        ];
        if let Some(annotation) = annotation {
            spans.push(Span::styled(
                format!("  ← {}", annotation.message),
                Style::default().fg(Color::Red),
            ));
        }
        content_lines.push(Line::from(spans));
    }

    let paragraph = Paragraph::new(Text::from(content_lines))
        .block(pane_block(app.title.clone(), app.focus == Focus::Editor))
        .scroll((app.editor_top as u16, 0));

    frame.render_widget(paragraph, area);
}

/// Console entries colored by kind, followed by the run's error.
fn render_console(frame: &mut Frame, app: &App, area: Rect) {
    let mut content_lines = Vec::new();

    for entry in &app.entries {
        let style = match entry.kind {
            LogKind::Log => Style::default(),
            LogKind::Warn => Style::default().fg(Color::Yellow),
            LogKind::Error => Style::default().fg(Color::Red),
            LogKind::Table => Style::default().fg(Color::Cyan),
        };
        let text = entry.text();
        if text.is_empty() {
            content_lines.push(Line::from(""));
        }
        for line in text.lines() {
            content_lines.push(Line::from(Span::styled(line.to_string(), style)));
        }
    }

    if let Some(error) = &app.error {
        content_lines.push(Line::from(Span::styled(
            format!("Uncaught {}", error.message),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
    }

    let available_height = area.height.saturating_sub(2) as usize;
    let total_lines = content_lines.len();

    let mut paragraph = Paragraph::new(Text::from(content_lines))
        .block(pane_block("Console".to_string(), app.focus == Focus::Console))
        .wrap(Wrap { trim: false });

    if total_lines > available_height {
        // Offset 0 shows the newest output.
        let max_scroll = total_lines.saturating_sub(available_height);
        let actual_offset = app.console_scroll_offset.min(max_scroll);
        paragraph = paragraph.scroll(((max_scroll - actual_offset) as u16, 0));
    }

    frame.render_widget(paragraph, area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let bg = match app.status {
        RunStatus::Failed(_) => Color::Red,
        RunStatus::Running(_) => Color::Blue,
        _ => Color::DarkGray,
    };
    let mut status_text = app.status_text();
    if let Some(notice) = &app.notice {
        status_text.push_str(" | ");
        status_text.push_str(notice);
    }
    status_text.push_str(" | r rerun, tab switch pane, q quit, F1 help");

    let status_paragraph =
        Paragraph::new(status_text).style(Style::default().bg(bg).fg(Color::White));

    frame.render_widget(status_paragraph, area);
}

fn render_help_overlay(frame: &mut Frame) {
    let popup_area = centered_rect(60, 50, frame.area());

    frame.render_widget(Clear, popup_area);

    let help_lines = vec![
        Line::from("Watch Mode Help"),
        Line::from(""),
        Line::from("The file is re-run shortly after each saved change."),
        Line::from(""),
        Line::from("  ↑/↓        - Scroll focused pane"),
        Line::from("  PgUp/PgDn  - Scroll by a page"),
        Line::from("  Tab        - Switch between editor and console"),
        Line::from("  r          - Re-run now"),
        Line::from("  q/Esc      - Quit"),
        Line::from("  Ctrl+C     - Quit"),
        Line::from("  F1         - Toggle this help"),
    ];

    let help_paragraph = Paragraph::new(Text::from(help_lines))
        .block(Block::default().borders(Borders::ALL).title("Help"))
        .wrap(Wrap { trim: false });

    frame.render_widget(help_paragraph, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
