use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Paragraph, Row, Table, Widget},
};

use crate::leaderboard::{LeaderboardQuery, RaceResult};

fn title(query: &LeaderboardQuery) -> String {
    let mut filters = Vec::new();
    if let Some(d) = query.difficulty {
        filters.push(d.to_string());
    }
    if let Some(c) = query.category {
        filters.push(c.to_string());
    }
    if filters.is_empty() {
        " Leaderboard ".to_string()
    } else {
        format!(" Leaderboard ({}) ", filters.join(", "))
    }
}

/// Top results table. `highlight` marks the row matching the player's last
/// result.
pub fn render_leaderboard(
    rows: &[RaceResult],
    query: &LeaderboardQuery,
    highlight: Option<&RaceResult>,
    area: Rect,
    buf: &mut Buffer,
) {
    let block = Block::bordered().title(title(query));

    if rows.is_empty() {
        Paragraph::new("no races yet")
            .alignment(Alignment::Center)
            .style(Style::default().add_modifier(Modifier::DIM))
            .block(block)
            .render(area, buf);
        return;
    }

    let header = Row::new(["#", "player", "wpm", "acc", "difficulty", "category", "date"])
        .style(Style::default().add_modifier(Modifier::BOLD));

    let body = rows.iter().enumerate().map(|(i, r)| {
        let row = Row::new([
            (i + 1).to_string(),
            r.player_name.clone(),
            r.wpm.to_string(),
            format!("{}%", r.accuracy),
            r.difficulty.to_string(),
            r.category.to_string(),
            r.completed_at.format("%Y-%m-%d").to_string(),
        ]);
        if highlight == Some(r) {
            row.style(Style::default().fg(Color::Yellow))
        } else {
            row
        }
    });

    let widths = [
        Constraint::Length(3),
        Constraint::Min(8),
        Constraint::Length(5),
        Constraint::Length(5),
        Constraint::Length(10),
        Constraint::Length(12),
        Constraint::Length(10),
    ];

    Table::new(body, widths)
        .header(header)
        .block(block)
        .render(area, buf);
}
