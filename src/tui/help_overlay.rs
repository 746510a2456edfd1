use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Clear, Widget},
};

struct HelpSection {
    title: &'static str,
    keys: &'static [(&'static str, &'static str)],
}

const SECTIONS: &[HelpSection] = &[
    HelpSection {
        title: "Contacts",
        keys: &[
            ("j / Down", "Move down"),
            ("k / Up", "Move up"),
            ("gg", "Jump to top"),
            ("G", "Jump to bottom"),
            ("Ctrl+d / u", "Half page down / up"),
            ("Enter", "Open conversation"),
            ("Esc", "Close conversation"),
            ("R", "Refresh contact directory"),
            ("Ctrl+l", "Forget read state"),
        ],
    },
    HelpSection {
        title: "Conversation",
        keys: &[
            ("Tab / l", "Focus thread"),
            ("Tab / h", "Back to contacts"),
            ("j / k", "Scroll"),
            ("Ctrl+d / u", "Half page down / up"),
            ("G", "Jump to newest"),
        ],
    },
    HelpSection {
        title: "Compose",
        keys: &[
            ("i", "Write a message"),
            ("Enter", "Send"),
            ("Esc", "Cancel"),
        ],
    },
    HelpSection {
        title: "Other",
        keys: &[("?", "This help"), ("q / Ctrl+c", "Quit")],
    },
];

/// Create a centered rectangle of the given size within `area`.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect::new(x, y, w, h)
}

pub struct HelpOverlay {
    pub scroll: u16,
}

impl Widget for HelpOverlay {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let popup_width: u16 = 50;
        let popup_height: u16 = area.height.min(30).max(10);
        let popup = centered_rect(popup_width, popup_height, area);

        Clear.render(popup, buf);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Keyboard Shortcuts ")
            .title_style(
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            );
        block.render(popup, buf);

        let inner = Rect::new(
            popup.x + 1,
            popup.y + 1,
            popup.width.saturating_sub(2),
            popup.height.saturating_sub(2),
        );

        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let section_style = Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD);
        let key_style = Style::default().fg(Color::Cyan);
        let desc_style = Style::default().fg(Color::White);
        let key_col_width: u16 = 14;

        // (key, description) pairs; a None key marks a heading or spacer.
        let mut lines: Vec<(Option<&str>, String, Style)> = Vec::new();
        for (si, section) in SECTIONS.iter().enumerate() {
            if si > 0 {
                lines.push((None, String::new(), Style::default()));
            }
            lines.push((None, format!(" {}", section.title), section_style));
            for (key, desc) in section.keys {
                lines.push((Some(key), desc.to_string(), desc_style));
            }
        }
        lines.push((None, String::new(), Style::default()));
        lines.push((
            None,
            " j/k:scroll  any other key:close".to_string(),
            Style::default().fg(Color::DarkGray),
        ));

        let max_scroll = lines.len().saturating_sub(inner.height as usize);
        let scroll = (self.scroll as usize).min(max_scroll);

        for (i, (key, text, style)) in lines.iter().skip(scroll).enumerate() {
            if i as u16 >= inner.height {
                break;
            }
            let y = inner.y + i as u16;
            match key {
                Some(key) => {
                    buf.set_string(inner.x + 2, y, key, key_style);
                    let dx = (key_col_width + 2).min(inner.width);
                    buf.set_stringn(
                        inner.x + dx,
                        y,
                        text,
                        (inner.width - dx) as usize,
                        *style,
                    );
                }
                None => {
                    buf.set_stringn(inner.x, y, text, inner.width as usize, *style);
                }
            }
        }
    }
}
