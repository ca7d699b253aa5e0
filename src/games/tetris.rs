use crossterm::event::{KeyCode, KeyEvent};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::games::canvas::{self, Canvas};
use crate::games::{Game, Phase};

const COLS: usize = 10;
const ROWS: usize = 20;
const START_INTERVAL_MS: f32 = 500.0;
const MIN_INTERVAL_MS: f32 = 100.0;
const INTERVAL_STEP_MS: f32 = 35.0;
const FLASH_MS: f32 = 200.0;
const LINE_POINTS: [u32; 5] = [0, 40, 100, 300, 1200];

const SHAPE_I: &[&[&str]] = &[
    &["....", "####", "....", "...."],
    &[".#..", ".#..", ".#..", ".#.."],
];
const SHAPE_J: &[&[&str]] = &[
    &["#..", "###", "..."],
    &[".##", ".#.", ".#."],
    &["...", "###", "..#"],
    &[".#.", ".#.", "##."],
];
const SHAPE_L: &[&[&str]] = &[
    &["..#", "###", "..."],
    &[".#.", ".#.", ".##"],
    &["...", "###", "#.."],
    &["##.", ".#.", ".#."],
];
const SHAPE_O: &[&[&str]] = &[&["##", "##"]];
const SHAPE_S: &[&[&str]] = &[
    &[".##", "##.", "..."],
    &[".#.", ".##", "..#"],
];
const SHAPE_T: &[&[&str]] = &[
    &[".#.", "###", "..."],
    &[".#.", ".##", ".#."],
    &["...", "###", ".#."],
    &[".#.", "##.", ".#."],
];
const SHAPE_Z: &[&[&str]] = &[
    &["##.", ".##", "..."],
    &["..#", ".##", ".#."],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    I,
    J,
    L,
    O,
    S,
    T,
    Z,
}

impl Kind {
    const ALL: [Kind; 7] = [Kind::I, Kind::J, Kind::L, Kind::O, Kind::S, Kind::T, Kind::Z];

    fn rotations(self) -> &'static [&'static [&'static str]] {
        match self {
            Kind::I => SHAPE_I,
            Kind::J => SHAPE_J,
            Kind::L => SHAPE_L,
            Kind::O => SHAPE_O,
            Kind::S => SHAPE_S,
            Kind::T => SHAPE_T,
            Kind::Z => SHAPE_Z,
        }
    }

    fn size(self) -> i32 {
        self.rotations()[0].len() as i32
    }

    fn color(self) -> Color {
        match self {
            Kind::I => Color::Rgb(0, 240, 240),
            Kind::J => Color::Rgb(0, 0, 240),
            Kind::L => Color::Rgb(240, 160, 0),
            Kind::O => Color::Rgb(240, 240, 0),
            Kind::S => Color::Rgb(0, 240, 0),
            Kind::T => Color::Rgb(160, 0, 240),
            Kind::Z => Color::Rgb(240, 0, 0),
        }
    }
}

/// Filled cells of one rotation, relative to the piece's top-left corner.
fn shape_cells(kind: Kind, rot: usize) -> impl Iterator<Item = (i32, i32)> {
    let rows = kind.rotations()[rot % kind.rotations().len()];
    rows.iter().enumerate().flat_map(|(dy, row)| {
        row.bytes()
            .enumerate()
            .filter(|(_, b)| *b == b'#')
            .map(move |(dx, _)| (dx as i32, dy as i32))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Piece {
    kind: Kind,
    rot: usize,
    x: i32,
    y: i32,
}

impl Piece {
    fn spawn(kind: Kind) -> Self {
        Self { kind, rot: 0, x: COLS as i32 / 2 - kind.size() / 2, y: 0 }
    }

    fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        shape_cells(self.kind, self.rot).map(|(dx, dy)| (self.x + dx, self.y + dy))
    }

    fn moved(&self, dx: i32, dy: i32) -> Self {
        Self { x: self.x + dx, y: self.y + dy, ..*self }
    }

    fn rotated(&self) -> Self {
        Self { rot: (self.rot + 1) % self.kind.rotations().len(), ..*self }
    }
}

type Board = [[Option<Kind>; COLS]; ROWS];

/// Gravity interval in milliseconds for a level.
fn drop_interval_ms(level: u32) -> f32 {
    (START_INTERVAL_MS - INTERVAL_STEP_MS * (level.max(1) - 1) as f32).max(MIN_INTERVAL_MS)
}

pub struct Tetris {
    board: Board,
    piece: Piece,
    next: Kind,
    hold: Option<Kind>,
    hold_used: bool,
    bag: Vec<Kind>,
    drop_ms: f32,
    /// Full rows flashing before they are removed, with elapsed ms.
    clearing: Option<(Vec<usize>, f32)>,
    score: u32,
    lines: u32,
    level: u32,
    phase: Phase,
    rng: StdRng,
}

impl Tetris {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    fn with_rng(rng: StdRng) -> Self {
        let mut t = Self {
            board: [[None; COLS]; ROWS],
            piece: Piece::spawn(Kind::O),
            next: Kind::O,
            hold: None,
            hold_used: false,
            bag: Vec::new(),
            drop_ms: 0.0,
            clearing: None,
            score: 0,
            lines: 0,
            level: 1,
            phase: Phase::Ready,
            rng,
        };
        t.next = t.draw_kind();
        t.piece = Piece::spawn(t.draw_kind());
        t
    }

    /// 7-bag: every kind once, in shuffled order, before any repeats.
    fn draw_kind(&mut self) -> Kind {
        if self.bag.is_empty() {
            self.bag = Kind::ALL.to_vec();
            self.bag.shuffle(&mut self.rng);
        }
        self.bag.pop().unwrap_or(Kind::T)
    }

    fn fits(&self, piece: &Piece) -> bool {
        piece.cells().all(|(x, y)| {
            x >= 0 && x < COLS as i32 && y >= 0 && y < ROWS as i32 && self.board[y as usize][x as usize].is_none()
        })
    }

    fn try_move(&mut self, dx: i32, dy: i32) -> bool {
        let moved = self.piece.moved(dx, dy);
        if self.fits(&moved) {
            self.piece = moved;
            true
        } else {
            false
        }
    }

    /// Rotate in place, or one column either side if that is blocked.
    fn rotate(&mut self) {
        let turned = self.piece.rotated();
        for kick in [0, -1, 1] {
            let candidate = turned.moved(kick, 0);
            if self.fits(&candidate) {
                self.piece = candidate;
                return;
            }
        }
    }

    fn soft_drop(&mut self) {
        if !self.try_move(0, 1) {
            self.lock();
        }
    }

    fn hard_drop(&mut self) {
        while self.try_move(0, 1) {}
        self.lock();
    }

    fn landing(&self) -> Piece {
        let mut ghost = self.piece;
        while self.fits(&ghost.moved(0, 1)) {
            ghost = ghost.moved(0, 1);
        }
        ghost
    }

    fn lock(&mut self) {
        for (x, y) in self.piece.cells().collect::<Vec<_>>() {
            if (0..ROWS as i32).contains(&y) && (0..COLS as i32).contains(&x) {
                self.board[y as usize][x as usize] = Some(self.piece.kind);
            }
        }
        self.drop_ms = 0.0;
        let full: Vec<usize> = (0..ROWS).filter(|&y| self.board[y].iter().all(Option::is_some)).collect();
        if full.is_empty() {
            self.spawn_next();
        } else {
            log::debug!("tetris clearing rows {:?}", full);
            self.clearing = Some((full, 0.0));
        }
    }

    fn clear_rows(&mut self, rows: &[usize]) {
        let kept: Vec<[Option<Kind>; COLS]> =
            (0..ROWS).filter(|y| !rows.contains(y)).map(|y| self.board[y]).collect();
        let mut board: Board = [[None; COLS]; ROWS];
        let offset = ROWS - kept.len();
        for (i, row) in kept.into_iter().enumerate() {
            board[offset + i] = row;
        }
        self.board = board;

        let count = rows.len().min(4);
        self.score += LINE_POINTS[count] * self.level;
        self.lines += rows.len() as u32;
        let level = self.lines / 10 + 1;
        if level != self.level {
            log::debug!("tetris level {}", level);
        }
        self.level = level;
    }

    fn spawn_next(&mut self) {
        let kind = self.next;
        self.next = self.draw_kind();
        self.place(kind);
        self.hold_used = false;
    }

    fn place(&mut self, kind: Kind) {
        self.piece = Piece::spawn(kind);
        self.drop_ms = 0.0;
        if !self.fits(&self.piece) {
            self.phase = Phase::Over;
            log::info!("tetris over, score={} lines={} level={}", self.score, self.lines, self.level);
        }
    }

    fn hold_piece(&mut self) {
        if self.hold_used {
            return;
        }
        let current = self.piece.kind;
        match self.hold.replace(current) {
            Some(held) => self.place(held),
            None => self.spawn_next(),
        }
        self.hold_used = true;
    }

    fn render_well(&self) -> Vec<Line<'static>> {
        let bg = Color::Rgb(10, 15, 22);
        let well_w = COLS as i32 * 2 + 2;
        let panel_x = well_w + 2;
        let mut c = Canvas::new(well_w as usize + 16, ROWS + 2, bg);
        c.frame(0, 0, well_w, ROWS as i32 + 2, Color::Rgb(90, 90, 120));

        let block = |c: &mut Canvas, x: i32, y: i32, ch: char, color: Color| {
            let style = Style::default().fg(color).bg(bg);
            c.put_styled(x, y, ch, style);
            c.put_styled(x + 1, y, ch, style);
        };

        for y in 0..ROWS {
            for x in 0..COLS {
                let (sx, sy) = (1 + x as i32 * 2, 1 + y as i32);
                match self.board[y][x] {
                    Some(kind) => block(&mut c, sx, sy, '█', kind.color()),
                    None => c.put(sx, sy, '·', Color::Rgb(35, 35, 45)),
                }
            }
        }

        match &self.clearing {
            Some((rows, elapsed)) => {
                let flash = if (*elapsed / 50.0) as u32 % 2 == 0 { Color::White } else { Color::Rgb(120, 120, 120) };
                for &y in rows {
                    for x in 0..COLS as i32 {
                        block(&mut c, 1 + x * 2, 1 + y as i32, '█', flash);
                    }
                }
            }
            None if self.phase != Phase::Over => {
                for (x, y) in self.landing().cells() {
                    block(&mut c, 1 + x * 2, 1 + y, '░', self.piece.kind.color());
                }
                for (x, y) in self.piece.cells() {
                    block(&mut c, 1 + x * 2, 1 + y, '█', self.piece.kind.color());
                }
            }
            None => {}
        }

        let label = Style::default().fg(Color::Rgb(200, 200, 220)).bg(bg).add_modifier(Modifier::BOLD);
        c.text(panel_x, 1, "NEXT", label);
        for (dx, dy) in shape_cells(self.next, 0) {
            block(&mut c, panel_x + dx * 2, 3 + dy, '█', self.next.color());
        }
        c.text(panel_x, 8, "HOLD", label);
        if let Some(held) = self.hold {
            let color = if self.hold_used { Color::DarkGray } else { held.color() };
            for (dx, dy) in shape_cells(held, 0) {
                block(&mut c, panel_x + dx * 2, 10 + dy, '█', color);
            }
        }
        c.into_lines()
    }
}

impl Game for Tetris {
    fn update(&mut self, dt: f32) {
        if self.phase != Phase::Playing {
            return;
        }
        if let Some((rows, elapsed)) = self.clearing.as_mut() {
            *elapsed += dt * 1000.0;
            if *elapsed >= FLASH_MS {
                let rows = std::mem::take(rows);
                self.clearing = None;
                self.clear_rows(&rows);
                self.spawn_next();
            }
            return;
        }
        self.drop_ms += dt * 1000.0;
        if self.drop_ms > drop_interval_ms(self.level) {
            self.drop_ms = 0.0;
            self.soft_drop();
        }
    }

    fn handle_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('r') | KeyCode::Char('R') => {
                self.reset();
                return;
            }
            KeyCode::Char('p') | KeyCode::Char('P') => {
                self.phase = self.phase.toggle_pause();
                return;
            }
            _ => {}
        }
        match self.phase {
            Phase::Over => {
                if matches!(key.code, KeyCode::Enter | KeyCode::Char(' ')) {
                    self.reset();
                }
                return;
            }
            Phase::Paused => return,
            Phase::Ready => self.phase = Phase::Playing,
            Phase::Playing => {}
        }
        if self.clearing.is_some() {
            return;
        }
        match key.code {
            KeyCode::Left => {
                self.try_move(-1, 0);
            }
            KeyCode::Right => {
                self.try_move(1, 0);
            }
            KeyCode::Up => self.rotate(),
            KeyCode::Down => self.soft_drop(),
            KeyCode::Char(' ') => self.hard_drop(),
            KeyCode::Char('c') | KeyCode::Char('C') => self.hold_piece(),
            _ => {}
        }
    }

    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let (status_area, field_area, help_area) =
            canvas::game_frame(frame, area, "🧱 Tetris", Color::Rgb(160, 0, 240));

        let status = canvas::status_line(vec![
            (format!("Score: {}", self.score), Color::Yellow),
            (format!("Lines: {}", self.lines), Color::Cyan),
            (format!("Level: {}", self.level), Color::Green),
            (format!("Drop: {:.0} ms", drop_interval_ms(self.level)), Color::Gray),
        ]);
        frame.render_widget(Paragraph::new(status), status_area);

        let w = (COLS * 2 + 2 + 16) as u16;
        let well_area = Rect {
            x: field_area.x + field_area.width.saturating_sub(w) / 2,
            y: field_area.y,
            width: w.min(field_area.width),
            height: ((ROWS + 2) as u16).min(field_area.height),
        };
        frame.render_widget(Paragraph::new(self.render_well()), well_area);

        let help = match self.phase {
            Phase::Over => canvas::banner_line(
                "💀 GAME OVER!",
                Color::Red,
                &format!("Score {}. Press ENTER to restart, Esc for menu", self.score),
            ),
            Phase::Paused => canvas::banner_line("⏸ PAUSED", Color::Yellow, "Press P to resume"),
            Phase::Ready => canvas::hint_line(&[("Any key", "Start"), ("Esc", "Menu")]),
            Phase::Playing => canvas::hint_line(&[
                ("←→", "Move"),
                ("↑", "Rotate"),
                ("↓", "Soft drop"),
                ("SPACE", "Hard drop"),
                ("C", "Hold"),
                ("P", "Pause"),
                ("Esc", "Menu"),
            ]),
        };
        frame.render_widget(Paragraph::new(help), help_area);
    }

    fn reset(&mut self) {
        let rng = StdRng::from_rng(&mut self.rng).unwrap_or_else(|_| StdRng::from_entropy());
        *self = Tetris::with_rng(rng);
    }

    fn score(&self) -> u32 {
        self.score
    }

    fn phase(&self) -> Phase {
        self.phase
    }
}
