use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget, Wrap};

use crate::ui::Palette;
use typeladder::session::Session;

pub struct TypingArea<'a> {
    session: &'a Session,
    palette: &'a Palette,
    title: String,
}

impl<'a> TypingArea<'a> {
    pub fn new(session: &'a Session, palette: &'a Palette, title: impl Into<String>) -> Self {
        Self {
            session,
            palette,
            title: title.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CharMark {
    Correct,
    Incorrect,
    Cursor,
    Pending,
}

/// Classify each target position against what has been typed so far.
fn mark_chars(session: &Session) -> Vec<(char, CharMark)> {
    let cursor = session.cursor();
    session
        .target()
        .iter()
        .enumerate()
        .map(|(idx, &ch)| {
            let mark = match session.is_correct_at(idx) {
                Some(true) => CharMark::Correct,
                Some(false) => CharMark::Incorrect,
                None if idx == cursor && !session.is_finished() => CharMark::Cursor,
                None => CharMark::Pending,
            };
            (ch, mark)
        })
        .collect()
}

impl Widget for TypingArea<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let palette = self.palette;
        let spans: Vec<Span> = mark_chars(self.session)
            .into_iter()
            .map(|(ch, mark)| {
                let style = match mark {
                    CharMark::Correct => Style::default().fg(palette.correct),
                    CharMark::Incorrect => Style::default()
                        .fg(palette.incorrect)
                        .bg(palette.incorrect_bg)
                        .add_modifier(Modifier::UNDERLINED),
                    CharMark::Cursor => Style::default().fg(palette.cursor_fg).bg(palette.cursor_bg),
                    CharMark::Pending => Style::default().fg(palette.pending),
                };
                // A mistyped space would be invisible without a marker.
                let display = if mark == CharMark::Incorrect && ch == ' ' {
                    '\u{00b7}'
                } else {
                    ch
                };
                Span::styled(display.to_string(), style)
            })
            .collect();

        let block = Block::bordered()
            .title(format!(" {} ", self.title))
            .border_style(Style::default().fg(palette.border));

        Paragraph::new(Line::from(spans))
            .block(block)
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }
}
