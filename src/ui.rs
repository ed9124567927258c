pub mod leaderboard;
pub mod passage;

use std::time::Duration;

use itertools::Itertools;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Clear, Gauge, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::achievements::{definition, ACHIEVEMENTS};
use crate::app::App;
use crate::session::{FinishReason, RaceState};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;
const TOAST_WIDTH: u16 = 44;
/// How long "GO!" stays up after the countdown.
const GO_BANNER: Duration = Duration::from_secs(1);

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.session.state() {
            RaceState::Waiting => render_waiting(self, area, buf),
            RaceState::Countdown { remaining } => render_countdown(remaining, area, buf),
            RaceState::Playing => render_playing(self, area, buf),
            RaceState::Finished => render_finished(self, area, buf),
        }
        render_toasts(self, area, buf);
    }
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

fn legend(keys: &[(&str, &str)]) -> Paragraph<'static> {
    let text = keys
        .iter()
        .map(|(key, action)| format!("{key} {action}"))
        .join(" · ");
    Paragraph::new(Span::styled(text, Style::default().add_modifier(Modifier::ITALIC)))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
}

fn settings_line(app: &App) -> Line<'static> {
    let cfg = app.session.config();
    let timer = if cfg.timer_mode {
        format!("{}s", cfg.timer_duration_secs)
    } else {
        "off".to_string()
    };
    let items = [
        ("category", cfg.category.to_string()),
        ("difficulty", cfg.difficulty.to_string()),
        ("timer", timer),
        ("sound", if cfg.sound_enabled { "on" } else { "off" }.to_string()),
        (
            "achievements",
            format!(
                "{}/{}",
                app.session.achievements().unlocked_count(),
                ACHIEVEMENTS.len()
            ),
        ),
    ];

    let pairs = items.into_iter().map(|(label, value)| {
        vec![
            Span::styled(format!("{label}: "), dim()),
            Span::styled(value, bold()),
        ]
    });
    let spans = Itertools::intersperse(pairs, vec![Span::raw("   ")])
        .flatten()
        .collect::<Vec<_>>();
    Line::from(spans)
}

fn render_waiting(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // title
            Constraint::Length(1),
            Constraint::Length(3), // name
            Constraint::Length(1), // settings
            Constraint::Length(1),
            Constraint::Min(3), // leaderboard
            Constraint::Length(2), // legend
        ])
        .split(area);

    Paragraph::new(Span::styled("TYPERACE", bold().fg(Color::Magenta)))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    let name = app.session.player_name();
    let name_style = if name.trim().is_empty() { dim() } else { bold() };
    Paragraph::new(Line::from(vec![
        Span::styled(name.to_string(), name_style),
        Span::styled("_", dim().add_modifier(Modifier::SLOW_BLINK)),
    ]))
    .block(Block::bordered().title(" Your name "))
    .render(chunks[2], buf);

    Paragraph::new(settings_line(app))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

    leaderboard::render_leaderboard(
        app.session.leaderboard(),
        app.session.leaderboard_query(),
        None,
        chunks[5],
        buf,
    );

    legend(&[
        ("(enter)", "start"),
        ("(F1)", "category"),
        ("(F2)", "difficulty"),
        ("(F3)", "timer"),
        ("(←/→)", "duration"),
        ("(F4)", "sound"),
        ("(F5)", "reset achievements"),
        ("(tab)", "filter"),
        ("(esc)", "quit"),
    ])
    .render(chunks[6], buf);
}

fn render_countdown(remaining: u8, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(area);

    Paragraph::new(Span::styled(
        remaining.to_string(),
        bold().fg(Color::Yellow),
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    Paragraph::new(Span::styled("get ready", dim()))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);
}

fn render_playing(app: &App, area: Rect, buf: &mut Buffer) {
    let session = &app.session;
    let now = app.last_event;
    let snapshot = session.snapshot();

    let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
    let text_width = session.reference_text().width() as u16;
    let passage_lines = text_width.div_ceil(max_chars_per_line).max(1) + 1;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // stats
            Constraint::Length(1), // clock
            Constraint::Min(1),
            Constraint::Length(passage_lines),
            Constraint::Min(1),
            Constraint::Length(1), // progress
        ])
        .split(area);

    let stats = [
        format!("{} wpm", snapshot.wpm),
        format!("{}% acc", snapshot.accuracy),
        format!("streak {}", session.current_streak()),
        format!("best {}", session.max_streak()),
    ]
    .join("   ");
    Paragraph::new(Span::styled(stats, bold()))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    let clock = if session.elapsed(now) < GO_BANNER {
        Span::styled("GO!", bold().fg(Color::Green))
    } else if let Some(left) = session.time_remaining(now) {
        Span::styled(format!("{:.1}", left.as_secs_f64()), dim())
    } else {
        Span::styled(format!("{:.1}s", session.elapsed(now).as_secs_f64()), dim())
    };
    Paragraph::new(clock)
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    Paragraph::new(passage::passage_line(session.reference(), session.typed()))
        .alignment(if passage_lines <= 2 {
            Alignment::Center
        } else {
            Alignment::Left
        })
        .wrap(Wrap { trim: true })
        .render(chunks[3], buf);

    let ratio = (snapshot.completion / 100.0).clamp(0.0, 1.0);
    Gauge::default()
        .gauge_style(Style::default().fg(Color::Magenta))
        .ratio(ratio)
        .label(format!("{:.0}%", snapshot.completion))
        .render(chunks[5], buf);
}

fn render_finished(app: &App, area: Rect, buf: &mut Buffer) {
    let session = &app.session;
    let s = session.snapshot();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // headline
            Constraint::Length(1),
            Constraint::Length(4), // summary
            Constraint::Length(8), // achievements
            Constraint::Min(3),    // leaderboard
            Constraint::Length(1), // legend
        ])
        .split(area);

    let headline = match session.finish_reason() {
        Some(FinishReason::TimeUp) => "TIME'S UP",
        _ => "FINISHED",
    };
    Paragraph::new(Span::styled(headline, bold().fg(Color::Magenta)))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    let summary = vec![
        Line::from(vec![
            Span::styled(format!("{} wpm", s.wpm), bold().fg(Color::Green)),
            Span::raw("   "),
            Span::styled(format!("{}% acc", s.accuracy), bold()),
            Span::raw("   "),
            Span::styled(format!("{:.1}s", s.elapsed_secs), bold()),
            Span::raw("   "),
            Span::styled(format!("{:.0}% done", s.completion), bold()),
        ]),
        Line::from(Span::styled(
            format!(
                "peak {} wpm · consistency {}% · longest run {} · best streak {}",
                s.max_wpm,
                s.consistency,
                s.longest_run,
                session.max_streak()
            ),
            dim(),
        )),
        Line::from(Span::styled(
            format!(
                "{} correct · {} incorrect · {} typed",
                s.correct_chars, s.incorrect_chars, s.total_chars
            ),
            dim(),
        )),
    ];
    Paragraph::new(summary)
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

    let achievements: Vec<Line> = session
        .achievements()
        .entries()
        .map(|(def, unlocked)| {
            if unlocked {
                Line::from(vec![
                    Span::styled("★ ", bold().fg(Color::Yellow)),
                    Span::styled(def.title, bold()),
                    Span::styled(format!("  {}", def.description), dim()),
                ])
            } else {
                Line::from(Span::styled(format!("· {}", def.title), dim()))
            }
        })
        .collect();
    Paragraph::new(achievements)
        .block(Block::bordered().title(" Achievements "))
        .render(chunks[3], buf);

    leaderboard::render_leaderboard(
        session.leaderboard(),
        session.leaderboard_query(),
        session.last_result(),
        chunks[4],
        buf,
    );

    legend(&[
        ("(r)", "new race"),
        ("(f)", "filter"),
        ("(q)", "quit"),
    ])
    .render(chunks[5], buf);
}

/// Stacks upwards from just above the bottom row, never reaching the two
/// header rows, so live stats and the clock stay visible.
fn render_toasts(app: &App, area: Rect, buf: &mut Buffer) {
    let width = TOAST_WIDTH.min(area.width);
    let floor = area.bottom().saturating_sub(VERTICAL_MARGIN + 1);
    let ceiling = area.y + VERTICAL_MARGIN + 2;
    for (i, toast) in app.toasts.active().enumerate() {
        let Some(y) = floor.checked_sub(3 * (i as u16 + 1)) else {
            break;
        };
        if y < ceiling {
            break;
        }
        let rect = Rect::new(area.right() - width, y, width, 3);
        let def = definition(toast.id);
        Clear.render(rect, buf);
        Paragraph::new(Span::styled(def.description, dim()))
            .block(
                Block::bordered()
                    .title(format!(" ★ {} ", def.title))
                    .border_style(Style::default().fg(Color::Yellow)),
            )
            .render(rect, buf);
    }
}
