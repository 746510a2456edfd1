use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};
use unicode_width::UnicodeWidthStr;

use crate::keymap::InputMode;

use super::text::truncate_str;

pub struct TopBar<'a> {
    pub server: &'a str,
    pub unread_total: u32,
    /// Conversations with at least one unread message.
    pub unread_conversations: usize,
    pub contact_count: usize,
}

impl<'a> Widget for TopBar<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let style = Style::default().bg(Color::DarkGray).fg(Color::White);
        buf.set_style(area, style);

        let left = format!(" {} ", self.server);
        let right = if self.unread_total > 0 {
            format!(
                " {} unread in {} | {} contacts ",
                self.unread_total, self.unread_conversations, self.contact_count
            )
        } else {
            format!(" {} contacts ", self.contact_count)
        };

        let left_spans = Line::from(vec![Span::styled(
            &left,
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )]);
        buf.set_line(area.x, area.y, &left_spans, area.width);

        let right_len = right.width() as u16;
        if area.width > right_len + left.width() as u16 {
            let rx = area.x + area.width - right_len;
            let right_style = if self.unread_total > 0 {
                style.fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                style
            };
            buf.set_string(rx, area.y, &right, right_style);
        }
    }
}

pub struct BottomBar<'a> {
    pub mode: InputMode,
    pub pending_key: Option<&'a str>,
    pub status_message: Option<&'a str>,
    /// Compose buffer, shown while composing.
    pub input: Option<&'a str>,
}

impl<'a> BottomBar<'a> {
    fn hints(&self) -> &'static str {
        match self.mode {
            InputMode::Normal => "j/k:move  Enter:open  Esc:close  i:write  R:refresh  ?:help  q:quit",
            InputMode::Thread => "j/k:scroll  ^d/^u:page  G:bottom  Tab:list  i:write  Esc:close",
            InputMode::Compose => "Enter:send  Esc:cancel",
            InputMode::Help => "j/k:scroll  any key:close",
        }
    }
}

impl<'a> Widget for BottomBar<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let style = Style::default().bg(Color::DarkGray).fg(Color::White);
        buf.set_style(area, style);

        if let Some(input) = self.input {
            let prompt = "> ";
            let avail = (area.width as usize).saturating_sub(prompt.len() + 1);
            // Keep the tail visible while typing.
            let shown = tail_to_width(input, avail);
            let line = Line::from(vec![
                Span::styled(prompt, style.fg(Color::Yellow).add_modifier(Modifier::BOLD)),
                Span::styled(shown, style),
                Span::styled("_", style.add_modifier(Modifier::SLOW_BLINK)),
            ]);
            buf.set_line(area.x, area.y, &line, area.width);
            return;
        }

        let text = match (self.pending_key, self.status_message) {
            (Some(pending), _) => format!(" {}\u{2026} | {}", pending, self.hints()),
            (None, Some(status)) => format!(" {}", status),
            (None, None) => format!(" {}", self.hints()),
        };
        let text = truncate_str(&text, area.width as usize);
        buf.set_string(area.x, area.y, &text, style);
    }
}

fn tail_to_width(s: &str, width: usize) -> String {
    if s.width() <= width {
        return s.to_string();
    }
    let mut out: Vec<char> = Vec::new();
    let mut used = 0;
    for c in s.chars().rev() {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.into_iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(buf: &Buffer) -> String {
        (0..buf.area.width)
            .map(|x| buf[(x, 0)].symbol().to_string())
            .collect()
    }

    #[test]
    fn top_bar_shows_unread_total() {
        let area = Rect::new(0, 0, 60, 1);
        let mut buf = Buffer::empty(area);
        TopBar {
            server: "http://localhost:8000",
            unread_total: 4,
            unread_conversations: 2,
            contact_count: 12,
        }
        .render(area, &mut buf);
        let text = row(&buf);
        assert!(text.contains("localhost:8000"));
        assert!(text.contains("4 unread in 2 | 12 contacts"));
    }

    #[test]
    fn bottom_bar_status_replaces_hints() {
        let area = Rect::new(0, 0, 80, 1);
        let mut buf = Buffer::empty(area);
        BottomBar {
            mode: InputMode::Normal,
            pending_key: None,
            status_message: Some("Sent"),
            input: None,
        }
        .render(area, &mut buf);
        assert!(row(&buf).starts_with(" Sent"));
    }

    #[test]
    fn bottom_bar_shows_input_tail() {
        let area = Rect::new(0, 0, 10, 1);
        let mut buf = Buffer::empty(area);
        BottomBar {
            mode: InputMode::Compose,
            pending_key: None,
            status_message: None,
            input: Some("abcdefghijkl"),
        }
        .render(area, &mut buf);
        assert_eq!(row(&buf), "> fghijkl_");
    }
}
