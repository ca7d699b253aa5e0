use std::collections::VecDeque;

use crossterm::event::{KeyCode, KeyEvent};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::games::canvas::{self, Canvas};
use crate::games::{Game, Phase};

const GRID_W: i32 = 40;
const GRID_H: i32 = 24;
const START_LEN: usize = 5;
/// Cells per second before acceleration.
const BASE_SPEED: f32 = 7.0;
const MAX_LEVEL: u32 = 10;
const MAX_FOOD: usize = 2;
const SPAWN_TICKS: std::ops::Range<u32> = 40..80;
const BOOST: f32 = 0.2;
const BOOST_CAP: f32 = 1.9;
const BOOST_SECS: f32 = 3.0;
const FREEZE_SECS: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FoodKind {
    Normal,
    Bonus,
    Speed,
    Freeze,
}

impl FoodKind {
    const ALL: [FoodKind; 4] = [FoodKind::Normal, FoodKind::Bonus, FoodKind::Speed, FoodKind::Freeze];
    const WEIGHTS: [u32; 4] = [70, 15, 10, 5];

    fn glyph(self) -> (char, Color) {
        match self {
            FoodKind::Normal => ('●', Color::Rgb(255, 0, 190)),
            FoodKind::Bonus => ('★', Color::Rgb(255, 255, 0)),
            FoodKind::Speed => ('⚡', Color::Rgb(0, 255, 100)),
            FoodKind::Freeze => ('❄', Color::Rgb(0, 180, 255)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Food {
    pos: (i32, i32),
    kind: FoodKind,
}

pub struct Snake {
    body: VecDeque<(i32, i32)>,
    dir: (i32, i32),
    pending_dir: (i32, i32),
    grow: u32,
    move_acc: f32,
    boost_timer: f32,
    freeze_timer: f32,
    foods: Vec<Food>,
    spawn_in: u32,
    score: u32,
    level: u32,
    phase: Phase,
    rng: StdRng,
}

impl Snake {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    fn with_rng(rng: StdRng) -> Self {
        let (hx, hy) = (GRID_W / 2, GRID_H / 2);
        let body = (0..START_LEN as i32).map(|i| (hx - i, hy)).collect();
        let mut s = Self {
            body,
            dir: (1, 0),
            pending_dir: (1, 0),
            grow: 0,
            move_acc: 0.0,
            boost_timer: 0.0,
            freeze_timer: 0.0,
            foods: Vec::new(),
            spawn_in: 0,
            score: 0,
            level: 1,
            phase: Phase::Ready,
            rng,
        };
        s.spawn_food();
        s.spawn_in = s.rng.gen_range(SPAWN_TICKS);
        s
    }

    fn head(&self) -> (i32, i32) {
        self.body[0]
    }

    fn len(&self) -> usize {
        self.body.len() + self.grow as usize
    }

    fn occupied(&self, cell: (i32, i32)) -> bool {
        self.body.contains(&cell) || self.foods.iter().any(|f| f.pos == cell)
    }

    fn spawn_food(&mut self) {
        if self.foods.len() >= MAX_FOOD {
            return;
        }
        let free: Vec<(i32, i32)> = (0..GRID_H)
            .flat_map(|y| (0..GRID_W).map(move |x| (x, y)))
            .filter(|c| !self.occupied(*c))
            .collect();
        if free.is_empty() {
            return;
        }
        let pos = free[self.rng.gen_range(0..free.len())];
        let kind = match WeightedIndex::new(FoodKind::WEIGHTS) {
            Ok(dist) => FoodKind::ALL[dist.sample(&mut self.rng)],
            Err(_) => FoodKind::Normal,
        };
        self.foods.push(Food { pos, kind });
    }

    /// Speed multiplier from level, the speed-food boost and the freeze.
    fn speed_factor(&self) -> f32 {
        let mut accel = (1.0 + 0.06 * self.level as f32).min(1.7);
        if self.boost_timer > 0.0 {
            accel = (accel + BOOST).min(BOOST_CAP);
        }
        let freeze = if self.freeze_timer > 0.0 { 0.5 } else { 1.0 };
        accel * freeze
    }

    fn steer(&mut self, dir: (i32, i32)) {
        if dir != (-self.dir.0, -self.dir.1) {
            self.pending_dir = dir;
        }
    }

    fn advance(&mut self) {
        self.dir = self.pending_dir;
        let (hx, hy) = self.head();
        let next = (hx + self.dir.0, hy + self.dir.1);

        if next.0 < 0 || next.0 >= GRID_W || next.1 < 0 || next.1 >= GRID_H {
            self.die("wall");
            return;
        }

        self.body.push_front(next);
        if self.grow > 0 {
            self.grow -= 1;
        } else {
            self.body.pop_back();
        }

        if self.body.iter().skip(1).any(|c| *c == next) {
            self.die("self");
            return;
        }

        if let Some(i) = self.foods.iter().position(|f| f.pos == next) {
            let food = self.foods.remove(i);
            self.eat(food.kind);
        }
    }

    fn eat(&mut self, kind: FoodKind) {
        self.score += 1;
        match kind {
            FoodKind::Normal => self.grow += 1,
            FoodKind::Bonus => {
                self.grow += 2;
                self.score += 10;
            }
            FoodKind::Speed => self.boost_timer = BOOST_SECS,
            FoodKind::Freeze => self.freeze_timer = FREEZE_SECS,
        }
        let level = (1 + (self.len().saturating_sub(START_LEN) / 7) as u32).min(MAX_LEVEL);
        if level > self.level {
            log::debug!("snake reached level {}", level);
        }
        self.level = level;
        log::debug!("snake ate {:?}, len={} score={}", kind, self.len(), self.score);
        if self.foods.is_empty() {
            self.spawn_food();
        }
    }

    fn die(&mut self, cause: &str) {
        self.phase = Phase::Over;
        log::info!("snake over ({}), score={} len={}", cause, self.score, self.len());
    }

    fn render_grid(&self) -> Vec<Line<'static>> {
        let bg = Color::Rgb(20, 22, 30);
        let mut c = Canvas::new(GRID_W as usize * 2, GRID_H as usize, bg);
        for y in 0..GRID_H {
            for x in (0..GRID_W).step_by(4) {
                c.put(x * 2, y, '·', Color::Rgb(40, 44, 50));
            }
        }
        for food in &self.foods {
            let (ch, color) = food.kind.glyph();
            c.put_styled(food.pos.0 * 2, food.pos.1, ch, Style::default().fg(color).bg(bg).add_modifier(Modifier::BOLD));
        }
        let n = self.body.len().max(1) as f32;
        for (i, (x, y)) in self.body.iter().enumerate().rev() {
            let t = i as f32 / n;
            let color = if self.phase == Phase::Over {
                Color::Rgb(255, 0, 80)
            } else {
                Color::Rgb(0, (255.0 - 100.0 * t) as u8, (242.0 - 100.0 * t) as u8)
            };
            let style = Style::default().fg(color).bg(bg);
            let ch = if i == 0 { '█' } else { '▓' };
            c.put_styled(x * 2, *y, ch, style);
            c.put_styled(x * 2 + 1, *y, ch, style);
        }
        c.into_lines()
    }
}

impl Game for Snake {
    fn update(&mut self, dt: f32) {
        if self.phase != Phase::Playing {
            return;
        }
        self.move_acc += BASE_SPEED * self.speed_factor() * dt;
        self.boost_timer = (self.boost_timer - dt).max(0.0);
        self.freeze_timer = (self.freeze_timer - dt).max(0.0);

        // Long ticks may owe several moves
        while self.move_acc >= 1.0 {
            self.move_acc -= 1.0;
            self.advance();
            if self.phase == Phase::Over {
                return;
            }
        }

        if self.spawn_in == 0 {
            self.spawn_food();
            self.spawn_in = self.rng.gen_range(SPAWN_TICKS);
        } else {
            self.spawn_in -= 1;
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
        if self.phase == Phase::Over {
            if matches!(key.code, KeyCode::Enter | KeyCode::Char(' ')) {
                self.reset();
            }
            return;
        }
        if self.phase == Phase::Paused {
            return;
        }
        let dir = match key.code {
            KeyCode::Up | KeyCode::Char('w') => (0, -1),
            KeyCode::Down | KeyCode::Char('s') => (0, 1),
            KeyCode::Left | KeyCode::Char('a') => (-1, 0),
            KeyCode::Right | KeyCode::Char('d') => (1, 0),
            _ => return,
        };
        self.steer(dir);
        if self.phase == Phase::Ready {
            self.phase = Phase::Playing;
        }
    }

    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let (status_area, field_area, help_area) =
            canvas::game_frame(frame, area, "🐍 Snake", Color::Rgb(0, 255, 144));

        let mut items = vec![
            (format!("Score: {}", self.score), Color::Yellow),
            (format!("Length: {}", self.len()), Color::Green),
            (format!("Level: {}", self.level), Color::Cyan),
        ];
        if self.boost_timer > 0.0 {
            items.push((format!("⚡ {:.1}s", self.boost_timer), Color::Rgb(0, 255, 100)));
        }
        if self.freeze_timer > 0.0 {
            items.push((format!("❄ {:.1}s", self.freeze_timer), Color::Rgb(0, 180, 255)));
        }
        frame.render_widget(Paragraph::new(canvas::status_line(items)), status_area);

        let w = (GRID_W * 2) as u16;
        let grid_area = Rect {
            x: field_area.x + field_area.width.saturating_sub(w) / 2,
            y: field_area.y + field_area.height.saturating_sub(GRID_H as u16) / 2,
            width: w.min(field_area.width),
            height: (GRID_H as u16).min(field_area.height),
        };
        frame.render_widget(Paragraph::new(self.render_grid()), grid_area);

        let help = match self.phase {
            Phase::Over => canvas::banner_line(
                "💀 GAME OVER!",
                Color::Red,
                &format!("Score {}. Press ENTER to restart, Esc for menu", self.score),
            ),
            Phase::Paused => canvas::banner_line("⏸ PAUSED", Color::Yellow, "Press P to resume"),
            Phase::Ready => canvas::hint_line(&[("Arrows/WASD", "Start moving"), ("Esc", "Menu")]),
            Phase::Playing => canvas::hint_line(&[("Arrows/WASD", "Steer"), ("P", "Pause"), ("R", "Restart"), ("Esc", "Menu")]),
        };
        frame.render_widget(Paragraph::new(help), help_area);
    }

    fn reset(&mut self) {
        let rng = StdRng::from_rng(&mut self.rng).unwrap_or_else(|_| StdRng::from_entropy());
        *self = Snake::with_rng(rng);
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

    fn game() -> Snake {
        Snake::with_rng(StdRng::seed_from_u64(3))
    }

    fn playing() -> Snake {
        let mut s = game();
        s.foods.clear();
        s.spawn_in = u32::MAX;
        s.phase = Phase::Playing;
        s
    }

    #[test]
    fn starts_at_the_centre_heading_right() {
        let s = game();
        assert_eq!(s.head(), (GRID_W / 2, GRID_H / 2));
        assert_eq!(s.len(), START_LEN);
        assert_eq!(s.dir, (1, 0));
        assert_eq!(s.foods.len(), 1);
        assert!(!s.body.contains(&s.foods[0].pos));
    }

    #[test]
    fn first_arrow_starts_the_game() {
        let mut s = game();
        s.update(1.0);
        assert_eq!(s.head(), (GRID_W / 2, GRID_H / 2));
        s.handle_input(key(KeyCode::Up));
        assert_eq!(s.phase(), Phase::Playing);
        assert_eq!(s.pending_dir, (0, -1));
    }

    #[test]
    fn reversal_is_ignored() {
        let mut s = playing();
        s.handle_input(key(KeyCode::Left));
        assert_eq!(s.pending_dir, (1, 0));
        s.handle_input(key(KeyCode::Down));
        assert_eq!(s.pending_dir, (0, 1));
    }

    #[test]
    fn moves_seven_cells_per_second_at_level_one() {
        let mut s = playing();
        let start = s.head().0;
        for _ in 0..60 {
            s.update(1.0 / 60.0);
        }
        // accel 1.06 at level 1
        assert_eq!(s.head().0 - start, 7);
        assert_eq!(s.len(), START_LEN);
    }

    #[test]
    fn slow_ticks_keep_the_same_pace() {
        let mut s = playing();
        let start = s.head().0;
        for _ in 0..5 {
            s.update(0.2);
        }
        assert_eq!(s.head().0 - start, 7);
        assert!(s.move_acc < 1.0);
    }

    #[test]
    fn crash_mid_tick_stops_the_remaining_moves() {
        let mut s = playing();
        let hy = s.head().1;
        s.body = (0..START_LEN as i32).map(|i| (GRID_W - 2 - i, hy)).collect();
        s.update(1.0);
        assert!(s.is_game_over());
        assert_eq!(s.head(), (GRID_W - 1, hy));
    }

    #[test]
    fn normal_food_grows_by_one() {
        let mut s = playing();
        let (hx, hy) = s.head();
        s.foods.push(Food { pos: (hx + 1, hy), kind: FoodKind::Normal });
        s.advance();
        assert_eq!(s.score(), 1);
        assert_eq!(s.len(), START_LEN + 1);
        s.advance();
        assert_eq!(s.body.len(), START_LEN + 1);
    }

    #[test]
    fn bonus_food_grows_by_two_and_scores_eleven() {
        let mut s = playing();
        let (hx, hy) = s.head();
        s.foods.push(Food { pos: (hx + 1, hy), kind: FoodKind::Bonus });
        s.advance();
        assert_eq!(s.score(), 11);
        assert_eq!(s.len(), START_LEN + 2);
    }

    #[test]
    fn speed_and_freeze_change_the_pace() {
        let mut s = playing();
        let base = s.speed_factor();
        s.eat(FoodKind::Speed);
        assert!((s.speed_factor() - (base + BOOST)).abs() < 1e-5);
        s.boost_timer = 0.0;
        s.eat(FoodKind::Freeze);
        assert!((s.speed_factor() - base * 0.5).abs() < 1e-5);
        assert_eq!(s.score(), 2);
    }

    #[test]
    fn boost_wears_off() {
        let mut s = playing();
        s.level = MAX_LEVEL;
        let base = s.speed_factor();
        s.boost_timer = BOOST_SECS;
        assert!(s.speed_factor() > base);
        assert!(s.speed_factor() <= BOOST_CAP);
        s.body = VecDeque::from(vec![(0, 0)]);
        s.dir = (1, 0);
        s.pending_dir = (1, 0);
        for _ in 0..(BOOST_SECS * 60.0) as usize + 2 {
            s.update(1.0 / 60.0);
            s.body = VecDeque::from(vec![(0, 0)]);
        }
        assert_eq!(s.boost_timer, 0.0);
        assert!((s.speed_factor() - base).abs() < 1e-5);
    }

    #[test]
    fn level_follows_length() {
        let mut s = playing();
        s.grow = 7;
        s.eat(FoodKind::Speed);
        assert_eq!(s.level, 2);
        s.grow = 200;
        s.eat(FoodKind::Speed);
        assert_eq!(s.level, MAX_LEVEL);
    }

    #[test]
    fn wall_ends_the_game() {
        let mut s = playing();
        for _ in 0..GRID_W {
            s.advance();
            if s.is_game_over() {
                break;
            }
        }
        assert!(s.is_game_over());
        assert_eq!(s.head().0, GRID_W - 1);
    }

    #[test]
    fn biting_the_body_ends_the_game() {
        let mut s = playing();
        s.grow = 3;
        for dir in [(0, 1), (-1, 0), (0, -1)] {
            s.steer(dir);
            s.advance();
        }
        assert!(s.is_game_over());
    }

    #[test]
    fn chasing_the_tail_is_safe() {
        let mut s = playing();
        s.body = VecDeque::from(vec![(5, 5), (5, 6), (6, 6), (6, 5)]);
        s.dir = (0, -1);
        s.pending_dir = (1, 0);
        s.advance();
        assert!(!s.is_game_over());
        assert_eq!(s.head(), (6, 5));
    }

    #[test]
    fn food_caps_at_two_and_avoids_the_snake() {
        let mut s = game();
        for _ in 0..10 {
            s.spawn_food();
        }
        assert_eq!(s.foods.len(), MAX_FOOD);
        for f in &s.foods {
            assert!(!s.body.contains(&f.pos));
        }
        assert_ne!(s.foods[0].pos, s.foods[1].pos);
    }
}
