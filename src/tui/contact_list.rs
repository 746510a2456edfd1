use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::Widget,
};
use unicode_width::UnicodeWidthStr;

use crate::message::{ChatKind, Contact, ConversationKey};

use super::text::truncate_str;

const NAME_WIDTH: usize = 18;

pub struct ContactList<'a> {
    pub contacts: &'a [Contact],
    pub selected: usize,
    pub offset: usize,
    /// The conversation currently open, if any.
    pub active: Option<&'a ConversationKey>,
    pub focused: bool,
}

impl<'a> ContactList<'a> {
    /// Calculate the visible range for scrolling.
    pub fn visible_range(
        selected: usize,
        offset: usize,
        height: usize,
        total: usize,
    ) -> (usize, usize) {
        let mut off = offset.min(total.saturating_sub(1));
        if selected < off {
            off = selected;
        }
        if height > 0 && selected >= off + height {
            off = selected - height + 1;
        }
        let end = (off + height).min(total);
        (off, end)
    }
}

impl<'a> Widget for ContactList<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if self.contacts.is_empty() {
            let style = Style::default().fg(Color::DarkGray);
            buf.set_string(area.x + 2, area.y + area.height / 2, "No contacts", style);
            return;
        }

        let height = area.height as usize;
        let (start, end) =
            Self::visible_range(self.selected, self.offset, height, self.contacts.len());

        for (i, contact) in self.contacts[start..end].iter().enumerate() {
            let y = area.y + i as u16;
            let idx = start + i;
            let is_selected = idx == self.selected;
            let is_active = self.active == Some(&contact.key);
            let is_unread = contact.unread_count > 0;

            let base_style = if is_selected && self.focused {
                Style::default().bg(Color::Indexed(236)).fg(Color::White)
            } else if is_selected {
                Style::default().bg(Color::Indexed(234)).fg(Color::White)
            } else {
                Style::default()
            };
            buf.set_style(Rect::new(area.x, y, area.width, 1), base_style);

            let w = area.width as usize;

            // Open / kind marker (2 chars)
            let (marker, marker_style) = if is_active {
                ("> ", base_style.fg(Color::Green).add_modifier(Modifier::BOLD))
            } else {
                match contact.key.kind {
                    ChatKind::Group => ("# ", base_style.fg(Color::DarkGray)),
                    ChatKind::Private => ("@ ", base_style.fg(Color::DarkGray)),
                }
            };
            buf.set_string(area.x, y, marker, marker_style);

            let name_width = NAME_WIDTH.min(w.saturating_sub(2));
            let name = truncate_str(&contact.display_name, name_width);
            let name_style = if is_unread {
                base_style.add_modifier(Modifier::BOLD)
            } else {
                base_style
            };
            buf.set_string(area.x + 2, y, &name, name_style);

            // Right side: unread badge then date
            let badge = if is_unread {
                format!("({}) ", contact.unread_count)
            } else {
                String::new()
            };
            let date = contact.date_display();
            let right_width = badge.width() + date.width();
            let right_x = if w > right_width + 1 {
                area.x + area.width - right_width as u16 - 1
            } else {
                area.x + area.width.saturating_sub(1)
            };
            if !badge.is_empty() {
                buf.set_string(
                    right_x,
                    y,
                    &badge,
                    base_style.fg(Color::Cyan).add_modifier(Modifier::BOLD),
                );
            }
            buf.set_string(
                right_x + badge.width() as u16,
                y,
                &date,
                base_style.fg(Color::DarkGray),
            );

            // Preview fills the middle
            let preview_start = area.x + 2 + name_width as u16 + 1;
            let preview_end = right_x.saturating_sub(1);
            if preview_start < preview_end {
                let preview_width = (preview_end - preview_start) as usize;
                let text = contact
                    .last_message_preview
                    .clone()
                    .unwrap_or_else(|| contact.subtitle());
                let preview = truncate_str(&text, preview_width);
                let preview_style = if is_unread {
                    base_style
                } else {
                    base_style.fg(Color::Gray)
                };
                buf.set_string(preview_start, y, &preview, preview_style);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ContactMeta;

    fn contact(id: &str, name: &str, unread: u32) -> Contact {
        let mut c = Contact::new(
            ConversationKey::group(id),
            name,
            ContactMeta::Group {
                member_count: 2,
                max_member_count: 0,
            },
            0,
        );
        c.unread_count = unread;
        c
    }

    fn row(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf[(x, y)].symbol().to_string())
            .collect()
    }

    #[test]
    fn visible_range_follows_selection() {
        assert_eq!(ContactList::visible_range(0, 0, 5, 20), (0, 5));
        assert_eq!(ContactList::visible_range(7, 0, 5, 20), (3, 8));
        assert_eq!(ContactList::visible_range(2, 3, 5, 20), (2, 7));
        assert_eq!(ContactList::visible_range(0, 0, 5, 3), (0, 3));
    }

    #[test]
    fn renders_badge_and_marker() {
        let contacts = vec![contact("1", "Rustaceans", 3), contact("2", "Quiet", 0)];
        let active = ConversationKey::group("2");
        let area = Rect::new(0, 0, 50, 2);
        let mut buf = Buffer::empty(area);
        ContactList {
            contacts: &contacts,
            selected: 0,
            offset: 0,
            active: Some(&active),
            focused: true,
        }
        .render(area, &mut buf);

        let first = row(&buf, 0);
        assert!(first.starts_with("# Rustaceans"));
        assert!(first.contains("(3)"));
        assert!(first.contains("2 members"));
        let second = row(&buf, 1);
        assert!(second.starts_with("> Quiet"));
        assert!(!second.contains('('));
    }

    #[test]
    fn empty_list_message() {
        let area = Rect::new(0, 0, 30, 4);
        let mut buf = Buffer::empty(area);
        ContactList {
            contacts: &[],
            selected: 0,
            offset: 0,
            active: None,
            focused: true,
        }
        .render(area, &mut buf);
        assert!(row(&buf, 2).contains("No contacts"));
    }
}
