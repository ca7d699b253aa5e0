use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::app::{App, Tab};

const IDLE: Color = Color::Rgb(120, 120, 140);
const HOME_ACCENT: Color = Color::Rgb(255, 220, 80);

/// Colour a tab is drawn in once selected.
fn accent(tab: Tab) -> Color {
    match tab {
        Tab::Home => HOME_ACCENT,
        Tab::Game(kind) => kind.color(),
    }
}

fn tab_label(tab: Tab, selected: bool) -> Line<'static> {
    let style = if selected {
        Style::default().fg(accent(tab)).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(IDLE)
    };
    match tab {
        Tab::Home => Line::from(Span::styled(tab.title(), style)),
        // Icons only on the active tab so ten games still fit one row
        Tab::Game(kind) if selected => Line::from(vec![
            Span::raw(kind.icon()),
            Span::styled(tab.title(), style),
        ]),
        Tab::Game(_) => Line::from(Span::styled(tab.title(), style)),
    }
}

pub fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = Tab::all()
        .iter()
        .map(|t| tab_label(*t, *t == app.current_tab))
        .collect();

    let border = match app.current_tab {
        Tab::Home => Color::Rgb(60, 150, 200),
        Tab::Game(kind) => kind.color(),
    };
    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .border_type(BorderType::Rounded)
                .title(" 🕹 crewcade ")
                .title_style(Style::default().fg(Color::Rgb(200, 120, 255)).add_modifier(Modifier::BOLD)),
        )
        .select(app.current_tab.index())
        .style(Style::default().fg(Color::White))
        .highlight_style(Style::default().fg(accent(app.current_tab)).add_modifier(Modifier::BOLD))
        .divider(Span::styled("│", Style::default().fg(Color::Rgb(60, 60, 80))));

    frame.render_widget(tabs, area);
}
