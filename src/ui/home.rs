use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::app::TILE_COLS;
use crate::games::GameKind;
use crate::scores::{HighScores, NAME_LEN};

const BANNER: &str = r#"
 ╔═════════════════════════════════════════════════════════════════════════════╗
 ║   ██████╗ ██████╗  ███████╗ ██╗    ██╗  ██████╗  █████╗  ██████╗  ███████╗  ║
 ║  ██╔════╝ ██╔══██╗ ██╔════╝ ██║    ██║ ██╔════╝ ██╔══██╗ ██╔══██╗ ██╔════╝  ║
 ║  ██║      ██████╔╝ █████╗   ██║ █╗ ██║ ██║      ███████║ ██║  ██║ █████╗    ║
 ║  ██║      ██╔══██╗ ██╔══╝   ██║███╗██║ ██║      ██╔══██║ ██║  ██║ ██╔══╝    ║
 ║  ╚██████╗ ██║  ██║ ███████╗ ╚███╔███╔╝ ╚██████╗ ██║  ██║ ██████╔╝ ███████╗  ║
 ║   ╚═════╝ ╚═╝  ╚═╝ ╚══════╝  ╚══╝╚══╝   ╚═════╝ ╚═╝  ╚═╝ ╚═════╝  ╚══════╝  ║
 ╚═════════════════════════════════════════════════════════════════════════════╝"#;

const KEY_COLOR: Color = Color::Rgb(80, 200, 255);
const LABEL_COLOR: Color = Color::Rgb(140, 140, 140);
const ACCENT: Color = Color::Rgb(255, 220, 80);
const TITLE_COLOR: Color = Color::Rgb(200, 120, 255);
const FRAME_COLOR: Color = Color::Rgb(60, 150, 200);

/// Launch key shown on a tile: 1-9, then 0 for the tenth game.
pub fn launch_key(idx: usize) -> char {
    char::from_digit(((idx + 1) % 10) as u32, 10).unwrap_or('?')
}

/// Dimmed version of a game's colour for unselected tile borders.
fn dim(color: Color) -> Color {
    match color {
        Color::Rgb(r, g, b) => Color::Rgb(r / 2, g / 2, b / 2),
        other => other,
    }
}

fn render_game_tile(frame: &mut Frame, area: Rect, idx: usize, kind: GameKind, selected: bool) {
    let border_color = if selected { ACCENT } else { dim(kind.color()) };
    let border_type = if selected { BorderType::Double } else { BorderType::Rounded };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(Style::default().fg(border_color));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height == 0 || inner.width == 0 { return; }

    let mut lines: Vec<Line> = Vec::new();

    let name_color = if selected { Color::Rgb(255, 255, 255) } else { kind.color() };
    lines.push(Line::from(vec![
        Span::styled(format!("[{}] ", launch_key(idx)), Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)),
        Span::styled(format!("{} ", kind.icon()), Style::default()),
        Span::styled(kind.name(), Style::default().fg(name_color).add_modifier(Modifier::BOLD)),
    ]));

    let desc_color = if selected { Color::Rgb(180, 180, 200) } else { Color::Rgb(120, 120, 140) };
    for desc_line in kind.blurb().split('\n') {
        lines.push(Line::from(Span::styled(desc_line, Style::default().fg(desc_color))));
    }

    if selected {
        lines.push(Line::from(Span::styled(
            "▶ Enter to play",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )));
    }

    let p = Paragraph::new(lines).alignment(Alignment::Center);
    frame.render_widget(p, inner);
}

fn control_line(key: &str, action: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("    {:<17}", key), Style::default().fg(KEY_COLOR)),
        Span::styled(action.to_string(), Style::default().fg(LABEL_COLOR)),
    ])
}

fn section_heading(text: String, color: Color) -> Line<'static> {
    Line::from(Span::styled(text, Style::default().fg(color).add_modifier(Modifier::BOLD)))
}

fn game_controls(kind: GameKind) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(""),
        section_heading(format!("  {} {}", kind.icon(), kind.name()), kind.color()),
        Line::from(Span::styled(
            format!("  {}", kind.blurb().replace('\n', " ")),
            Style::default().fg(Color::Rgb(100, 100, 120)),
        )),
        Line::from(""),
    ];
    lines.extend(kind.controls().iter().map(|(key, action)| control_line(key, action)));
    lines.push(control_line("R", "Restart"));
    lines.push(control_line("P", "Pause"));
    lines
}

fn navigation_controls() -> Vec<Line<'static>> {
    vec![
        Line::from(""),
        section_heading("  🔧 Navigation".to_string(), ACCENT),
        control_line("Tab / Shift+Tab", "Switch tabs"),
        control_line("1-9, 0", "Launch game"),
        control_line("↑ ↓ ← →", "Select game"),
        control_line("Enter", "Play selected"),
        control_line("Esc", "Return to Home"),
        control_line("q / Ctrl+C", "Quit"),
        Line::from(""),
        section_heading("  🎮 Common".to_string(), ACCENT),
        control_line("R", "Restart game"),
        control_line("P", "Pause / Unpause"),
    ]
}

pub fn render_home(frame: &mut Frame, area: Rect, selected_game: usize, show_high_scores: bool, high_scores: &HighScores) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(10), // Banner
            Constraint::Length(2),  // Subtitle
            Constraint::Length(14), // Game tiles (2 rows)
            Constraint::Min(10),    // Controls area
            Constraint::Length(2),  // Footer
        ])
        .split(area);

    let banner = Paragraph::new(BANNER)
        .style(Style::default().fg(KEY_COLOR))
        .alignment(Alignment::Center);
    frame.render_widget(banner, chunks[0]);

    let subtitle = Paragraph::new(Line::from(Span::styled(
        "  ⚡ Ten games, one terminal ⚡  ",
        Style::default().fg(ACCENT).add_modifier(Modifier::BOLD | Modifier::ITALIC),
    )))
    .alignment(Alignment::Center);
    frame.render_widget(subtitle, chunks[1]);

    let games_block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(FRAME_COLOR))
        .title(" 🎮 Games: ↑↓←→ Select, Enter to Play ")
        .title_style(Style::default().fg(TITLE_COLOR).add_modifier(Modifier::BOLD));
    let games_inner = games_block.inner(chunks[2]);
    frame.render_widget(games_block, chunks[2]);

    let row_count = GameKind::ALL.len().div_ceil(TILE_COLS);
    let tile_rows = Layout::vertical(vec![Constraint::Ratio(1, row_count as u32); row_count]).split(games_inner);
    for (row, row_area) in tile_rows.iter().enumerate() {
        let cols = Layout::horizontal(vec![Constraint::Ratio(1, TILE_COLS as u32); TILE_COLS]).split(*row_area);
        for (col, tile_area) in cols.iter().enumerate() {
            let idx = row * TILE_COLS + col;
            if let Some(kind) = GameKind::from_index(idx) {
                render_game_tile(frame, *tile_area, idx, kind, selected_game == idx);
            }
        }
    }

    // Controls area: navigation left, selected game right
    let ctrl_cols = Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)]).split(chunks[3]);

    let controls = Paragraph::new(navigation_controls()).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(FRAME_COLOR))
            .title(" ⌨ Navigation Control ")
            .title_style(Style::default().fg(TITLE_COLOR).add_modifier(Modifier::BOLD)),
    );
    frame.render_widget(controls, ctrl_cols[0]);

    if let Some(kind) = GameKind::from_index(selected_game) {
        let game_ctrl = Paragraph::new(game_controls(kind)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(dim(kind.color())))
                .title(format!(" 🎮 {} Control ", kind.name()))
                .title_style(Style::default().fg(kind.color()).add_modifier(Modifier::BOLD)),
        );
        frame.render_widget(game_ctrl, ctrl_cols[1]);
    }

    let footer = Paragraph::new(Line::from(vec![
        Span::styled("  🦀 ", Style::default().fg(Color::Rgb(255, 100, 50))),
        Span::styled(concat!("v", env!("CARGO_PKG_VERSION")), Style::default().fg(Color::Rgb(80, 80, 100))),
        Span::styled("  │  ", Style::default().fg(Color::Rgb(40, 40, 60))),
        Span::styled("H", Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)),
        Span::styled(" High Scores", Style::default().fg(Color::Rgb(100, 100, 130))),
    ]))
    .alignment(Alignment::Center);
    frame.render_widget(footer, chunks[4]);

    if show_high_scores {
        render_high_scores_overlay(frame, area, high_scores);
    }
}

fn score_lines(kind: GameKind, high_scores: &HighScores) -> Vec<Line<'static>> {
    let medal_colors = [
        Color::Rgb(255, 215, 0),   // Gold
        Color::Rgb(192, 192, 192), // Silver
        Color::Rgb(205, 127, 50),  // Bronze
    ];
    let medals = ["🥇", "🥈", "🥉"];

    let mut lines = vec![Line::from(vec![
        Span::styled(format!("  {} ", kind.icon()), Style::default()),
        Span::styled(kind.name(), Style::default().fg(kind.color()).add_modifier(Modifier::BOLD)),
    ])];

    let scores = high_scores.top_scores(kind.index());
    if scores.iter().all(|e| e.score == 0) {
        lines.push(Line::from(Span::styled("    No scores yet", Style::default().fg(Color::Rgb(60, 60, 80)))));
        return lines;
    }
    for (rank, entry) in scores.iter().enumerate().filter(|(_, e)| e.score > 0) {
        let name = if entry.name.is_empty() { "???" } else { entry.name.as_str() };
        lines.push(Line::from(vec![
            Span::styled(format!("    {} ", medals[rank]), Style::default()),
            Span::styled(format!("{:<width$} ", name, width = NAME_LEN), Style::default().fg(Color::Rgb(200, 200, 220))),
            Span::styled(
                entry.score.to_string(),
                Style::default().fg(medal_colors[rank]).add_modifier(Modifier::BOLD),
            ),
        ]));
    }
    lines
}

fn render_high_scores_overlay(frame: &mut Frame, area: Rect, high_scores: &HighScores) {
    let overlay_w = 76u16.min(area.width.saturating_sub(4));
    let overlay_h = 26u16.min(area.height.saturating_sub(4));
    let x = area.x + (area.width.saturating_sub(overlay_w)) / 2;
    let y = area.y + (area.height.saturating_sub(overlay_h)) / 2;
    let overlay_area = Rect::new(x, y, overlay_w, overlay_h);

    frame.render_widget(Clear, overlay_area);

    let background = Style::default().bg(Color::Rgb(15, 15, 25));
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(Color::Rgb(255, 200, 80)))
        .title(" 🏆 High Scores ")
        .title_style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD))
        .style(background);
    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    let [body, footer] = Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(inner);
    let columns = Layout::horizontal([Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)]).split(body);

    // Five games per column
    let half = GameKind::ALL.len().div_ceil(2);
    for (column, kinds) in columns.iter().zip(GameKind::ALL.chunks(half)) {
        let mut lines = vec![Line::from("")];
        for kind in kinds {
            lines.extend(score_lines(*kind, high_scores));
        }
        frame.render_widget(Paragraph::new(lines).style(background), *column);
    }

    let close = Paragraph::new(Line::from(vec![
        Span::styled("  Press ", Style::default().fg(Color::Rgb(80, 80, 100))),
        Span::styled("H", Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)),
        Span::styled(" to close", Style::default().fg(Color::Rgb(80, 80, 100))),
    ]))
    .style(background);
    frame.render_widget(close, footer);
}
