use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::Widget,
};

use crate::message::Message;

use super::text::{truncate_str, wrap};

/// What the right pane shows.
pub enum ThreadPane<'a> {
    /// Nothing selected.
    Empty,
    /// Selected, first history fetch still outstanding.
    Loading { title: &'a str },
    Loaded {
        title: &'a str,
        messages: &'a [Message],
    },
}

pub struct ThreadView<'a> {
    pub pane: ThreadPane<'a>,
    /// Rows scrolled up from the bottom; 0 follows new messages.
    pub scroll_from_bottom: usize,
    pub focused: bool,
}

impl<'a> ThreadView<'a> {
    /// Number of rows `messages` occupy at `width` columns, excluding the
    /// title row.
    pub fn line_count(messages: &[Message], width: u16) -> usize {
        build_lines(messages, width).len()
    }
}

impl<'a> Widget for ThreadView<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width < 4 {
            return;
        }
        let dim = Style::default().fg(Color::DarkGray);

        let (title, messages) = match self.pane {
            ThreadPane::Empty => {
                buf.set_string(
                    area.x + 2,
                    area.y + area.height / 2,
                    "Select a conversation (Enter)",
                    dim,
                );
                return;
            }
            ThreadPane::Loading { title } => {
                render_title(title, self.focused, area, buf);
                buf.set_string(area.x + 2, area.y + area.height / 2, "Loading\u{2026}", dim);
                return;
            }
            ThreadPane::Loaded { title, messages } => (title, messages),
        };

        render_title(title, self.focused, area, buf);
        let body = Rect::new(area.x, area.y + 1, area.width, area.height - 1);
        if messages.is_empty() {
            buf.set_string(body.x + 2, body.y + body.height / 2, "No messages", dim);
            return;
        }

        let lines = build_lines(messages, area.width);
        let height = body.height as usize;
        let max_scroll = lines.len().saturating_sub(height);
        let from_bottom = self.scroll_from_bottom.min(max_scroll);
        let start = lines.len().saturating_sub(height + from_bottom);

        for (row, line) in lines.iter().skip(start).take(height).enumerate() {
            let y = body.y + row as u16;
            let mut x = body.x + 1;
            for (text, style) in &line.content {
                let max_cols = (body.x + body.width).saturating_sub(x) as usize;
                let truncated = truncate_str(text, max_cols);
                let (next_x, _) = buf.set_stringn(x, y, &truncated, max_cols, *style);
                x = next_x;
            }
        }

        if from_bottom > 0 {
            let hint = format!(" \u{2193} {} more ", from_bottom);
            let hx = (body.x + body.width).saturating_sub(hint.chars().count() as u16);
            buf.set_string(
                hx,
                body.y + body.height - 1,
                &hint,
                Style::default().bg(Color::Blue).fg(Color::White),
            );
        }
    }
}

fn render_title(title: &str, focused: bool, area: Rect, buf: &mut Buffer) {
    let style = if focused {
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    let text = truncate_str(title, area.width.saturating_sub(2) as usize);
    buf.set_string(area.x + 1, area.y, &text, style);
}

/// Internal type for pre-computed rendered lines.
struct RenderedLine {
    /// Spans to render: (text, style) pairs
    content: Vec<(String, Style)>,
}

fn build_lines(messages: &[Message], width: u16) -> Vec<RenderedLine> {
    let text_width = width.saturating_sub(4).max(1) as usize;
    let mut lines = Vec::new();

    for (idx, msg) in messages.iter().enumerate() {
        if idx > 0 {
            lines.push(RenderedLine {
                content: Vec::new(),
            });
        }

        if msg.is_system_event {
            let style = Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC);
            for (i, part) in wrap(&msg.body, text_width).into_iter().enumerate() {
                let prefix = if i == 0 { "* " } else { "  " };
                lines.push(RenderedLine {
                    content: vec![(format!("{}{}", prefix, part), style)],
                });
            }
            continue;
        }

        let sender_style = if msg.is_self {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        };
        lines.push(RenderedLine {
            content: vec![
                (msg.sender_display(), sender_style),
                ("  ".to_string(), Style::default()),
                (msg.date_display(), Style::default().fg(Color::DarkGray)),
            ],
        });

        let body_style = Style::default().fg(Color::White);
        for part in wrap(&msg.body, text_width) {
            lines.push(RenderedLine {
                content: vec![(format!("  {}", part), body_style)],
            });
        }
    }
    lines
}
