use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim_bold() -> Style {
    bold().add_modifier(Modifier::DIM)
}

/// Colours the passage against what has been typed: green for matches, red
/// for misses (showing the wrong key), an underlined cursor, dim for the rest.
pub fn passage_line(reference: &[char], typed: &[char]) -> Line<'static> {
    let green = bold().fg(Color::Green);
    let red = bold().fg(Color::Red);

    let mut spans: Vec<Span<'static>> = typed
        .iter()
        .zip(reference)
        .map(|(&got, &want)| {
            if got == want {
                Span::styled(want.to_string(), green)
            } else {
                let shown = match got {
                    ' ' => '·',
                    c => c,
                };
                Span::styled(shown.to_string(), red)
            }
        })
        .collect();

    if let Some(cursor) = reference.get(typed.len()) {
        spans.push(Span::styled(
            cursor.to_string(),
            dim_bold().add_modifier(Modifier::UNDERLINED),
        ));
        let rest: String = reference[typed.len() + 1..].iter().collect();
        if !rest.is_empty() {
            spans.push(Span::styled(rest, dim_bold()));
        }
    }

    Line::from(spans)
}
