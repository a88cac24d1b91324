use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};

use crate::ui::Palette;
use typeladder::app::AttemptOutcome;
use typeladder::engine::ChallengeLevel;
use typeladder::session::SessionMetrics;

pub struct ResultsPanel<'a> {
    metrics: Option<&'a SessionMetrics>,
    outcome: Option<&'a AttemptOutcome>,
    level: Option<&'a ChallengeLevel>,
    message: Option<&'a str>,
    palette: &'a Palette,
}

impl<'a> ResultsPanel<'a> {
    pub fn new(
        metrics: Option<&'a SessionMetrics>,
        outcome: Option<&'a AttemptOutcome>,
        level: Option<&'a ChallengeLevel>,
        message: Option<&'a str>,
        palette: &'a Palette,
    ) -> Self {
        Self {
            metrics,
            outcome,
            level,
            message,
            palette,
        }
    }

    fn label(&self, name: &str, value: String, style: Style) -> Line<'static> {
        Line::from(vec![
            Span::styled(format!("  {name:<10}"), Style::default().fg(self.palette.fg)),
            Span::styled(value, style),
        ])
    }

    fn lines(&self) -> Vec<Line<'static>> {
        let palette = self.palette;
        let bold = |color: Color| Style::default().fg(color).add_modifier(Modifier::BOLD);
        let mut lines = Vec::new();

        let Some(metrics) = self.metrics else {
            lines.push(Line::from("  Nothing was typed."));
            return lines;
        };

        let (wpm_color, acc_color) = match self.level {
            Some(level) => (
                palette.against_goal(metrics.wpm, level.wpm_goal),
                palette.against_goal(metrics.accuracy, level.accuracy_goal),
            ),
            None => (palette.accent, palette.accent),
        };
        let wpm = match self.level {
            Some(level) => format!("{} WPM  (goal {})", metrics.wpm, level.wpm_goal),
            None => format!("{} WPM", metrics.wpm),
        };
        let accuracy = match self.level {
            Some(level) => format!("{}%  (goal {}%)", metrics.accuracy, level.accuracy_goal),
            None => format!("{}%", metrics.accuracy),
        };
        lines.push(self.label("Speed:", wpm, bold(wpm_color)));
        lines.push(self.label("Accuracy:", accuracy, bold(acc_color)));
        lines.push(self.label(
            "Time:",
            format!("{:.1}s", metrics.time),
            Style::default().fg(palette.fg),
        ));
        lines.push(Line::from(""));

        let progress = match self.outcome {
            Some(AttemptOutcome::Practice(outcome)) => Some(&outcome.progress),
            Some(AttemptOutcome::Challenge(outcome)) => {
                let verdict = if outcome.first_pass {
                    Span::styled(
                        format!("  Level {} passed! +{} coins", outcome.level_id, outcome.coins_awarded),
                        bold(palette.success),
                    )
                } else if outcome.evaluation.passed {
                    Span::styled(
                        format!("  Level {} passed again", outcome.level_id),
                        Style::default().fg(palette.success),
                    )
                } else {
                    Span::styled(
                        format!("  Level {} not passed", outcome.level_id),
                        bold(palette.error),
                    )
                };
                lines.push(Line::from(verdict));
                if let Some(badge) = &outcome.badge_unlocked {
                    lines.push(Line::from(Span::styled(
                        format!("  Badge unlocked: {}", badge.name),
                        bold(palette.warning),
                    )));
                }
                Some(&outcome.progress)
            }
            None => None,
        };

        if let Some(progress) = progress {
            lines.push(self.label(
                "Streak:",
                format!("{} day(s)  (best {})", progress.streak, progress.best_streak),
                Style::default().fg(palette.fg),
            ));
            lines.push(self.label(
                "Best:",
                format!("{} WPM", progress.best_wpm),
                Style::default().fg(palette.fg),
            ));
            lines.push(self.label(
                "Coins:",
                progress.coins.to_string(),
                Style::default().fg(palette.warning),
            ));
        }

        if let Some(message) = self.message {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                format!("  {message}"),
                Style::default().fg(palette.warning),
            )));
        }
        lines
    }
}

impl Widget for ResultsPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = if self.level.is_some() {
            " Challenge Result "
        } else {
            " Practice Result "
        };
        let block = Block::bordered()
            .title(title)
            .title_alignment(Alignment::Center)
            .border_style(Style::default().fg(self.palette.accent));
        Paragraph::new(self.lines()).block(block).render(area, buf);
    }
}
