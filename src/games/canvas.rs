//! Cell-grid drawing shared by the games
//!
//! Games draw into a `Canvas` of styled characters, then hand the rows to a
//! `Paragraph`. World coordinates are mapped onto cells by a `Viewport`.

use glam::Vec2;
use ratatui::prelude::*;
use ratatui::widgets::*;

pub struct Canvas {
    width: usize,
    height: usize,
    bg: Color,
    cells: Vec<(char, Style)>,
}

impl Canvas {
    pub fn new(width: usize, height: usize, bg: Color) -> Self {
        Self {
            width,
            height,
            bg,
            cells: vec![(' ', Style::default().bg(bg)); width * height],
        }
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    /// Draw a character in `fg` over the canvas background.
    pub fn put(&mut self, x: i32, y: i32, ch: char, fg: Color) {
        let style = Style::default().fg(fg).bg(self.bg);
        self.put_styled(x, y, ch, style);
    }

    pub fn put_styled(&mut self, x: i32, y: i32, ch: char, style: Style) {
        if let Some(i) = self.index(x, y) {
            self.cells[i] = (ch, style);
        }
    }

    /// Only draw if the cell is still blank (used for shadows and trails).
    pub fn put_if_empty(&mut self, x: i32, y: i32, ch: char, fg: Color) {
        if self.get(x, y) == Some(' ') {
            self.put(x, y, ch, fg);
        }
    }

    pub fn get(&self, x: i32, y: i32) -> Option<char> {
        self.index(x, y).map(|i| self.cells[i].0)
    }

    pub fn text(&mut self, x: i32, y: i32, s: &str, style: Style) {
        for (i, ch) in s.chars().enumerate() {
            self.put_styled(x + i as i32, y, ch, style);
        }
    }

    /// Centre a string horizontally on row `y`.
    pub fn text_centered(&mut self, y: i32, s: &str, style: Style) {
        let len = s.chars().count() as i32;
        let x = (self.width as i32 - len) / 2;
        self.text(x, y, s, style);
    }

    pub fn fill(&mut self, x: i32, y: i32, w: i32, h: i32, ch: char, style: Style) {
        for yy in y..y + h {
            for xx in x..x + w {
                self.put_styled(xx, yy, ch, style);
            }
        }
    }

    /// Single-line box outline.
    pub fn frame(&mut self, x: i32, y: i32, w: i32, h: i32, fg: Color) {
        if w < 2 || h < 2 {
            return;
        }
        for xx in x + 1..x + w - 1 {
            self.put(xx, y, '─', fg);
            self.put(xx, y + h - 1, '─', fg);
        }
        for yy in y + 1..y + h - 1 {
            self.put(x, yy, '│', fg);
            self.put(x + w - 1, yy, '│', fg);
        }
        self.put(x, y, '╭', fg);
        self.put(x + w - 1, y, '╮', fg);
        self.put(x, y + h - 1, '╰', fg);
        self.put(x + w - 1, y + h - 1, '╯', fg);
    }

    pub fn into_lines(self) -> Vec<Line<'static>> {
        let width = self.width.max(1);
        self.cells
            .chunks(width)
            .map(|row| {
                let spans: Vec<Span<'static>> = row
                    .iter()
                    .map(|(ch, style)| Span::styled(String::from(*ch), *style))
                    .collect();
                Line::from(spans)
            })
            .collect()
    }
}

/// Maps a world rectangle starting at the origin onto a `cols` x `rows` cell area.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    sx: f32,
    sy: f32,
}

impl Viewport {
    pub fn new(world_w: f32, world_h: f32, cols: usize, rows: usize) -> Self {
        Self {
            sx: cols as f32 / world_w.max(f32::EPSILON),
            sy: rows as f32 / world_h.max(f32::EPSILON),
        }
    }

    pub fn cell(&self, p: Vec2) -> (i32, i32) {
        ((p.x * self.sx).floor() as i32, (p.y * self.sy).floor() as i32)
    }

    pub fn col(&self, x: f32) -> i32 {
        (x * self.sx).floor() as i32
    }

    pub fn row(&self, y: f32) -> i32 {
        (y * self.sy).floor() as i32
    }
}

/// Bordered game panel split into a status row, the playfield and a help row.
pub fn game_frame(frame: &mut Frame, area: Rect, title: &str, border: Color) -> (Rect, Rect, Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border))
        .title(format!(" {} ", title))
        .title_style(Style::default().fg(border).add_modifier(Modifier::BOLD));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .split(inner);
    (chunks[0], chunks[1], chunks[2])
}

/// Status row made of `label value` pairs.
pub fn status_line(items: Vec<(String, Color)>) -> Line<'static> {
    let mut spans = Vec::with_capacity(items.len() * 2 + 1);
    spans.push(Span::raw(" "));
    for (i, (text, color)) in items.into_iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" │ ", Style::default().fg(Color::DarkGray)));
        }
        spans.push(Span::styled(text, Style::default().fg(color).add_modifier(Modifier::BOLD)));
    }
    Line::from(spans)
}

/// Help row: `key action │ key action ...`
pub fn hint_line(items: &[(&str, &str)]) -> Line<'static> {
    let mut spans = Vec::with_capacity(items.len() * 3);
    spans.push(Span::raw(" "));
    for (i, (key, action)) in items.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled("│ ", Style::default().fg(Color::Rgb(60, 60, 60))));
        }
        spans.push(Span::styled(
            format!("{} ", key),
            Style::default().fg(Color::Rgb(80, 200, 255)).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(format!("{} ", action), Style::default().fg(Color::DarkGray)));
    }
    Line::from(spans)
}

/// Highlighted one-line message for the help row (game over, paused, ...).
pub fn banner_line(headline: &str, color: Color, rest: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!(" {} ", headline),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(rest.to_string(), Style::default().fg(Color::Gray)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_puts_are_ignored() {
        let mut c = Canvas::new(3, 2, Color::Black);
        c.put(-1, 0, 'x', Color::White);
        c.put(3, 1, 'x', Color::White);
        c.put(2, 1, 'y', Color::White);
        assert_eq!(c.get(2, 1), Some('y'));
        assert_eq!(c.get(3, 1), None);
        assert_eq!(c.into_lines().len(), 2);
    }

    #[test]
    fn viewport_scales_world_to_cells() {
        let v = Viewport::new(100.0, 40.0, 50, 20);
        assert_eq!(v.cell(Vec2::new(99.9, 39.9)), (49, 19));
        assert_eq!(v.cell(Vec2::new(10.0, 10.0)), (5, 5));
    }

    #[test]
    fn centred_text_lands_in_the_middle() {
        let mut c = Canvas::new(10, 1, Color::Black);
        c.text_centered(0, "ab", Style::default());
        assert_eq!(c.get(4, 0), Some('a'));
        assert_eq!(c.get(5, 0), Some('b'));
    }
}
