use crossterm::event::{KeyCode, KeyEvent};
use glam::Vec2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::games::canvas::{self, Canvas};
use crate::games::{Game, Phase};
use crate::physics::Aabb;

const COLS: usize = 19;
const ROWS: usize = 21;

/// `#` wall, `.` dot, `P` player start, `G` ghost start.
const MAZE: [&str; ROWS] = [
    "###################",
    "#........#........#",
    "#.###.###.#.###.###",
    "#G###.###.#.###.G##",
    "#.................#",
    "#.###.#.#####.#.###",
    "#.....#...#...#...#",
    "#####.### # ###.###",
    "    #.#       #.#  ",
    "#####.# #   # #.###",
    "     .  #P#  .     ",
    "#####.# ##### #.###",
    "    #.#       #.#  ",
    "#####.# ##### #.###",
    "#........#........#",
    "#.###.###.#.###.###",
    "#G..#..... .....G.#",
    "###.#.#.#####.#.###",
    "#.....#...#...#...#",
    "#.######### #######",
    "###################",
];

/// Tiles per tick.
const PLAYER_SPEED: f32 = 1.0 / 8.0;
const GHOST_SPEED: f32 = 1.0 / 16.0;
const PLAYER_HALF: f32 = 14.0 / 32.0;
const GHOST_HALF: f32 = 13.0 / 32.0;
const DOT_HALF: f32 = 4.0 / 32.0;
const DOT_POINTS: u32 = 10;
const REPLAN_TICKS: u32 = 13;

const DIRS: [IVec; 4] = [IVec(1, 0), IVec(-1, 0), IVec(0, 1), IVec(0, -1)];
const GHOST_COLORS: [Color; 4] = [
    Color::Rgb(255, 0, 0),
    Color::Rgb(255, 184, 255),
    Color::Rgb(0, 255, 255),
    Color::Rgb(255, 184, 82),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct IVec(i32, i32);

impl IVec {
    const ZERO: IVec = IVec(0, 0);

    fn as_vec2(self) -> Vec2 {
        Vec2::new(self.0 as f32, self.1 as f32)
    }
}

struct Maze {
    walls: Vec<bool>,
    dots: Vec<bool>,
    player_start: Vec2,
    ghost_starts: Vec<Vec2>,
}

impl Maze {
    fn parse() -> Self {
        let mut walls = vec![false; COLS * ROWS];
        let mut dots = vec![false; COLS * ROWS];
        let mut player_start = Vec2::new(COLS as f32 / 2.0, ROWS as f32 / 2.0);
        let mut ghost_starts = Vec::new();
        for (row, line) in MAZE.iter().enumerate() {
            for (col, ch) in line.chars().enumerate().take(COLS) {
                let centre = Vec2::new(col as f32 + 0.5, row as f32 + 0.5);
                match ch {
                    '#' => walls[row * COLS + col] = true,
                    '.' => dots[row * COLS + col] = true,
                    'P' => player_start = centre,
                    'G' => ghost_starts.push(centre),
                    _ => {}
                }
            }
        }
        Self { walls, dots, player_start, ghost_starts }
    }

    fn is_wall(&self, col: i32, row: i32) -> bool {
        let c = col.rem_euclid(COLS as i32) as usize;
        let r = row.rem_euclid(ROWS as i32) as usize;
        self.walls[r * COLS + c]
    }

    /// True when a box of half-size `half` centred at `pos` touches no wall tile.
    fn is_open(&self, pos: Vec2, half: f32) -> bool {
        let bbox = Aabb::from_center(pos, Vec2::splat(half));
        let (c0, c1) = (bbox.min.x.floor() as i32, bbox.max.x.floor() as i32);
        let (r0, r1) = (bbox.min.y.floor() as i32, bbox.max.y.floor() as i32);
        for row in r0..=r1 {
            for col in c0..=c1 {
                if self.is_wall(col, row) && bbox.overlaps(&Aabb::new(col as f32, row as f32, 1.0, 1.0)) {
                    return false;
                }
            }
        }
        true
    }

    fn dots_left(&self) -> usize {
        self.dots.iter().filter(|d| **d).count()
    }
}

fn wrap(pos: Vec2) -> Vec2 {
    Vec2::new(pos.x.rem_euclid(COLS as f32), pos.y.rem_euclid(ROWS as f32))
}

struct Actor {
    pos: Vec2,
    dir: IVec,
    half: f32,
    speed: f32,
}

impl Actor {
    fn can_move(&self, maze: &Maze, dir: IVec) -> bool {
        maze.is_open(self.pos + dir.as_vec2() * self.speed, self.half)
    }

    fn advance(&mut self) {
        self.pos = wrap(self.pos + self.dir.as_vec2() * self.speed);
    }

    fn open_dirs(&self, maze: &Maze) -> Vec<IVec> {
        DIRS.iter().copied().filter(|d| self.can_move(maze, *d)).collect()
    }

    fn bbox(&self) -> Aabb {
        Aabb::from_center(self.pos, Vec2::splat(self.half))
    }
}

pub struct PacMan {
    maze: Maze,
    player: Actor,
    queued: IVec,
    ghosts: Vec<Actor>,
    ticks: u32,
    score: u32,
    high_score: u32,
    won: bool,
    phase: Phase,
    rng: StdRng,
}

impl PacMan {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    fn with_rng(mut rng: StdRng) -> Self {
        let maze = Maze::parse();
        let player = Actor { pos: maze.player_start, dir: IVec::ZERO, half: PLAYER_HALF, speed: PLAYER_SPEED };
        let ghosts = maze
            .ghost_starts
            .iter()
            .map(|&pos| Actor {
                pos,
                dir: *DIRS.choose(&mut rng).unwrap_or(&IVec(1, 0)),
                half: GHOST_HALF,
                speed: GHOST_SPEED,
            })
            .collect();
        Self {
            maze,
            player,
            queued: IVec::ZERO,
            ghosts,
            ticks: 0,
            score: 0,
            high_score: 0,
            won: false,
            phase: Phase::Ready,
            rng,
        }
    }

    fn step_player(&mut self) {
        if self.queued != IVec::ZERO && self.player.can_move(&self.maze, self.queued) {
            self.player.dir = self.queued;
        }
        if self.player.dir != IVec::ZERO && self.player.can_move(&self.maze, self.player.dir) {
            self.player.advance();
        }
    }

    fn step_ghosts(&mut self) {
        let target = self.player.pos;
        let replan = self.ticks % REPLAN_TICKS == 0;
        for ghost in self.ghosts.iter_mut() {
            if replan {
                let options = ghost.open_dirs(&self.maze);
                let delta = target - ghost.pos;
                let mut preferred = Vec::with_capacity(2);
                if delta.x.abs() > delta.y.abs() {
                    preferred.push(if delta.x > 0.0 { IVec(1, 0) } else { IVec(-1, 0) });
                }
                preferred.push(if delta.y > 0.0 { IVec(0, 1) } else { IVec(0, -1) });
                if let Some(dir) = preferred.into_iter().find(|d| options.contains(d)) {
                    ghost.dir = dir;
                } else if let Some(dir) = options.choose(&mut self.rng) {
                    ghost.dir = *dir;
                }
            }
            if ghost.can_move(&self.maze, ghost.dir) {
                ghost.advance();
            } else if let Some(dir) = ghost.open_dirs(&self.maze).choose(&mut self.rng) {
                ghost.dir = *dir;
            }
        }
    }

    fn eat_dots(&mut self) {
        let bbox = self.player.bbox();
        let (c0, c1) = (bbox.min.x.floor() as i32, bbox.max.x.floor() as i32);
        let (r0, r1) = (bbox.min.y.floor() as i32, bbox.max.y.floor() as i32);
        for row in r0..=r1 {
            for col in c0..=c1 {
                if col < 0 || row < 0 || col >= COLS as i32 || row >= ROWS as i32 {
                    continue;
                }
                let idx = row as usize * COLS + col as usize;
                let dot = Aabb::from_center(Vec2::new(col as f32 + 0.5, row as f32 + 0.5), Vec2::splat(DOT_HALF));
                if self.maze.dots[idx] && bbox.overlaps(&dot) {
                    self.maze.dots[idx] = false;
                    self.score += DOT_POINTS;
                }
            }
        }
    }

    fn finish(&mut self, won: bool) {
        self.won = won;
        self.phase = Phase::Over;
        self.high_score = self.high_score.max(self.score);
        log::info!("pac-man over, won={} score={}", won, self.score);
    }

    fn render_maze(&self) -> Vec<Line<'static>> {
        let bg = Color::Black;
        let mut c = Canvas::new(COLS * 2, ROWS, bg);
        let wall = Style::default().fg(Color::Rgb(33, 33, 255)).bg(Color::Rgb(0, 0, 128));
        for row in 0..ROWS {
            for col in 0..COLS {
                let (x, y) = (col as i32 * 2, row as i32);
                if self.maze.walls[row * COLS + col] {
                    c.put_styled(x, y, '▓', wall);
                    c.put_styled(x + 1, y, '▓', wall);
                } else if self.maze.dots[row * COLS + col] {
                    c.put(x, y, '·', Color::White);
                }
            }
        }
        for (i, g) in self.ghosts.iter().enumerate() {
            let x = (g.pos.x * 2.0).floor() as i32;
            let y = g.pos.y.floor() as i32;
            c.put_styled(x, y, 'ᗣ', Style::default().fg(GHOST_COLORS[i % GHOST_COLORS.len()]).bg(bg).add_modifier(Modifier::BOLD));
        }
        let glyph = match self.player.dir {
            IVec(-1, 0) => 'ᗤ',
            IVec(0, -1) => 'ᗢ',
            IVec(0, 1) => 'ᗜ',
            _ => 'ᗧ',
        };
        let (px, py) = ((self.player.pos.x * 2.0).floor() as i32, self.player.pos.y.floor() as i32);
        c.put_styled(px, py, glyph, Style::default().fg(Color::Yellow).bg(bg).add_modifier(Modifier::BOLD));
        c.into_lines()
    }
}

impl Game for PacMan {
    fn update(&mut self, _dt: f32) {
        if self.phase != Phase::Playing {
            return;
        }
        self.ticks = self.ticks.wrapping_add(1);
        self.step_player();
        self.step_ghosts();
        self.eat_dots();
        if self.maze.dots_left() == 0 {
            self.finish(true);
            return;
        }
        let me = self.player.bbox();
        if self.ghosts.iter().any(|g| g.bbox().overlaps(&me)) {
            self.finish(false);
        }
    }

    fn handle_input(&mut self, key: KeyEvent) {
        let dir = match key.code {
            KeyCode::Char('r') | KeyCode::Char('R') => {
                self.reset();
                return;
            }
            KeyCode::Char('p') | KeyCode::Char('P') => {
                self.phase = self.phase.toggle_pause();
                return;
            }
            KeyCode::Enter | KeyCode::Char(' ') if self.phase == Phase::Over => {
                self.reset();
                return;
            }
            KeyCode::Up => IVec(0, -1),
            KeyCode::Down => IVec(0, 1),
            KeyCode::Left => IVec(-1, 0),
            KeyCode::Right => IVec(1, 0),
            _ => return,
        };
        match self.phase {
            Phase::Ready => {
                self.queued = dir;
                self.phase = Phase::Playing;
            }
            Phase::Playing => self.queued = dir,
            Phase::Paused | Phase::Over => {}
        }
    }

    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let (status_area, field_area, help_area) =
            canvas::game_frame(frame, area, "ᗧ Pac-Man", Color::Rgb(255, 230, 60));

        let status = canvas::status_line(vec![
            (format!("Score: {}", self.score), Color::Yellow),
            (format!("Dots left: {}", self.maze.dots_left()), Color::White),
            (format!("🏆 High: {}", self.high_score), Color::Cyan),
        ]);
        frame.render_widget(Paragraph::new(status), status_area);

        let w = (COLS * 2) as u16;
        let maze_area = Rect {
            x: field_area.x + field_area.width.saturating_sub(w) / 2,
            y: field_area.y,
            width: w.min(field_area.width),
            height: (ROWS as u16).min(field_area.height),
        };
        frame.render_widget(Paragraph::new(self.render_maze()), maze_area);

        let help = match self.phase {
            Phase::Over if self.won => canvas::banner_line("🎉 YOU WIN!", Color::Yellow, "Press ENTER to play again, Esc for menu"),
            Phase::Over => canvas::banner_line("💀 GAME OVER!", Color::Red, "Press ENTER to restart, Esc for menu"),
            Phase::Paused => canvas::banner_line("⏸ PAUSED", Color::Yellow, "Press P to resume"),
            Phase::Ready => canvas::hint_line(&[("Arrows", "Start moving"), ("Esc", "Menu")]),
            Phase::Playing => canvas::hint_line(&[("Arrows", "Steer"), ("P", "Pause"), ("R", "Restart"), ("Esc", "Menu")]),
        };
        frame.render_widget(Paragraph::new(help), help_area);
    }

    fn reset(&mut self) {
        let hs = self.high_score;
        let rng = StdRng::from_rng(&mut self.rng).unwrap_or_else(|_| StdRng::from_entropy());
        *self = PacMan::with_rng(rng);
        self.high_score = hs;
    }

    fn score(&self) -> u32 {
        self.score
    }

    fn phase(&self) -> Phase {
        self.phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn game() -> PacMan {
        PacMan::with_rng(StdRng::seed_from_u64(9))
    }

    #[test]
    fn maze_rows_are_uniform() {
        for row in MAZE {
            assert_eq!(row.chars().count(), COLS, "row {row:?}");
        }
        let maze = Maze::parse();
        assert_eq!(maze.ghost_starts.len(), 4);
        assert!(maze.dots_left() > 100);
        assert_eq!(maze.player_start, Vec2::new(9.5, 10.5));
    }

    #[test]
    fn start_is_only_open_upwards() {
        let g = game();
        assert!(g.player.can_move(&g.maze, IVec(0, -1)));
        assert!(!g.player.can_move(&g.maze, IVec(-1, 0)));
        assert!(!g.player.can_move(&g.maze, IVec(1, 0)));
        assert!(!g.player.can_move(&g.maze, IVec(0, 1)));
    }

    #[test]
    fn queued_turn_waits_for_an_opening() {
        let mut g = game();
        g.ghosts.clear();
        g.handle_input(key(KeyCode::Left));
        g.update(0.016);
        assert_eq!(g.player.dir, IVec::ZERO);
        assert_eq!(g.player.pos, g.maze.player_start);
        g.handle_input(key(KeyCode::Up));
        g.update(0.016);
        assert_eq!(g.player.dir, IVec(0, -1));
        assert!(g.player.pos.y < 10.5);
    }

    #[test]
    fn player_never_enters_walls() {
        let mut g = game();
        g.ghosts.clear();
        g.phase = Phase::Playing;
        let turns = [KeyCode::Up, KeyCode::Left, KeyCode::Down, KeyCode::Right];
        for i in 0..2000 {
            if i % 37 == 0 {
                g.handle_input(key(turns[(i / 37) % 4]));
            }
            g.update(0.016);
            if g.phase != Phase::Playing {
                break;
            }
            assert!(g.maze.is_open(g.player.pos, PLAYER_HALF), "inside a wall at {:?}", g.player.pos);
        }
    }

    #[test]
    fn eating_a_dot_scores_ten() {
        let mut g = game();
        g.ghosts.clear();
        g.phase = Phase::Playing;
        g.player.pos = Vec2::new(1.5, 1.5);
        let before = g.maze.dots_left();
        g.update(0.016);
        assert_eq!(g.score(), DOT_POINTS);
        assert_eq!(g.maze.dots_left(), before - 1);
    }

    #[test]
    fn clearing_every_dot_wins() {
        let mut g = game();
        g.ghosts.clear();
        g.phase = Phase::Playing;
        g.maze.dots.iter_mut().for_each(|d| *d = false);
        g.maze.dots[COLS + 1] = true;
        g.player.pos = Vec2::new(1.5, 1.5);
        g.update(0.016);
        assert!(g.is_game_over());
        assert!(g.won);
    }

    #[test]
    fn ghost_contact_loses() {
        let mut g = game();
        g.phase = Phase::Playing;
        g.ghosts[0].pos = g.player.pos + Vec2::new(0.5, 0.0);
        g.ghosts[0].dir = IVec::ZERO;
        g.update(0.016);
        assert!(g.is_game_over());
        assert!(!g.won);
    }

    #[test]
    fn tunnel_wraps_around() {
        let mut g = game();
        g.ghosts.clear();
        g.phase = Phase::Playing;
        g.player.pos = Vec2::new(0.5, 8.5);
        g.player.dir = IVec(-1, 0);
        g.queued = IVec(-1, 0);
        for _ in 0..8 {
            g.update(0.016);
        }
        assert!(g.player.pos.x > 18.0, "x = {}", g.player.pos.x);
    }

    #[test]
    fn ghosts_stay_out_of_walls() {
        let mut g = game();
        g.phase = Phase::Playing;
        g.player.pos = Vec2::new(9.5, 10.5);
        for _ in 0..1500 {
            g.step_ghosts();
            g.ticks += 1;
            for ghost in &g.ghosts {
                assert!(g.maze.is_open(ghost.pos, GHOST_HALF));
            }
        }
    }
}
