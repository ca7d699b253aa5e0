use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, FRAC_PI_8};

use crossterm::event::{KeyCode, KeyEvent};
use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::games::canvas::{self, Canvas, Viewport};
use crate::games::{Game, Phase};
use crate::physics::{self, Aabb, Body};

const BOARD: f32 = 64.0;
const FRAME: f32 = 2.4;
const POCKET_R: f32 = 3.6;
const POCKET_INSET: f32 = 3.2;
const COIN_R: f32 = 1.6;
const QUEEN_R: f32 = 1.8;
const STRIKER_R: f32 = 2.0;
const STRIKER_MASS: f32 = 1.6;
const COIN_MASS: f32 = 1.0;
const BASELINE_NEAR: f32 = 57.0;
const BASELINE_FAR: f32 = 7.0;
const SLIDE_MIN: f32 = 10.0;
const SLIDE_MAX: f32 = BOARD - 10.0;
const SLIDE_STEP: f32 = 1.0;
const AIM_STEP: f32 = 3.0 * std::f32::consts::PI / 180.0;
const MAX_POWER: u32 = 20;
const POWER_SCALE: f32 = 6.0;
const FRICTION: f32 = 0.99;
const REST_SPEED: f32 = 0.4;
const WALL_E: f32 = 0.8;
const PAIR_E: f32 = 0.9;
const COIN_POINTS: u32 = 10;
const QUEEN_POINTS: u32 = 50;
const SCRATCH_PENALTY: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CoinKind {
    White,
    Black,
    Queen,
}

impl CoinKind {
    fn for_seat(seat: usize) -> CoinKind {
        if seat % 2 == 0 {
            CoinKind::White
        } else {
            CoinKind::Black
        }
    }

    fn label(self) -> &'static str {
        match self {
            CoinKind::White => "white",
            CoinKind::Black => "black",
            CoinKind::Queen => "queen",
        }
    }
}

#[derive(Debug, Clone)]
struct Coin {
    body: Body,
    kind: CoinKind,
    pocketed: bool,
}

impl Coin {
    fn new(pos: Vec2, kind: CoinKind) -> Self {
        Self { body: Body::at_rest(pos), kind, pocketed: false }
    }

    fn radius(&self) -> f32 {
        if self.kind == CoinKind::Queen {
            QUEEN_R
        } else {
            COIN_R
        }
    }
}

pub struct Carrom {
    coins: Vec<Coin>,
    striker: Body,
    striker_pocketed: bool,
    scores: Vec<u32>,
    current: usize,
    aim: f32,
    power: u32,
    rolling: bool,
    shot_pockets: Vec<CoinKind>,
    /// Seat that pocketed the queen on its previous shot and still owes a cover.
    queen_pending: Option<usize>,
    message: String,
    phase: Phase,
    rng: StdRng,
}

fn board_center() -> Vec2 {
    Vec2::splat(BOARD / 2.0)
}

fn pockets() -> [Vec2; 4] {
    [
        Vec2::new(POCKET_INSET, POCKET_INSET),
        Vec2::new(BOARD - POCKET_INSET, POCKET_INSET),
        Vec2::new(BOARD - POCKET_INSET, BOARD - POCKET_INSET),
        Vec2::new(POCKET_INSET, BOARD - POCKET_INSET),
    ]
}

fn in_pocket(pos: Vec2) -> bool {
    pockets().iter().any(|p| p.distance(pos) < POCKET_R - 0.2)
}

fn play_area() -> Aabb {
    Aabb::new(FRAME, FRAME, BOARD - 2.0 * FRAME, BOARD - 2.0 * FRAME)
}

fn opening_layout() -> Vec<Coin> {
    let center = board_center();
    let mut coins = vec![Coin::new(center, CoinKind::Queen)];
    let mut i = 0;
    for ring in 0..3 {
        let r = 5.2 * (ring + 1) as f32 * 0.8;
        let twist = if ring % 2 == 1 { FRAC_PI_8 } else { 0.0 };
        for spoke in 0..4 {
            let angle = spoke as f32 * 2.0 * FRAC_PI_4 + twist;
            let kind = if i % 2 == 0 { CoinKind::White } else { CoinKind::Black };
            coins.push(Coin::new(center + Vec2::new(angle.cos(), angle.sin()) * r, kind));
            i += 1;
        }
    }
    coins
}

impl Carrom {
    pub fn new(players: usize) -> Self {
        Self::with_rng(players, StdRng::from_entropy())
    }

    fn with_rng(players: usize, rng: StdRng) -> Self {
        let players = players.clamp(2, 4);
        let mut c = Self {
            coins: opening_layout(),
            striker: Body::default(),
            striker_pocketed: false,
            scores: vec![0; players],
            current: 0,
            aim: 0.0,
            power: 8,
            rolling: false,
            shot_pockets: Vec::new(),
            queen_pending: None,
            message: String::from("Player 1 (white) to strike"),
            phase: Phase::Ready,
            rng,
        };
        c.place_striker();
        c
    }

    fn baseline(seat: usize) -> f32 {
        if seat % 2 == 0 {
            BASELINE_NEAR
        } else {
            BASELINE_FAR
        }
    }

    fn place_striker(&mut self) {
        let y = Self::baseline(self.current);
        self.striker = Body::at_rest(Vec2::new(BOARD / 2.0, y));
        self.striker_pocketed = false;
        self.aim = if y > BOARD / 2.0 { -FRAC_PI_2 } else { FRAC_PI_2 };
        self.rolling = false;
        self.phase = Phase::Ready;
    }

    fn shoot(&mut self) {
        let dir = Vec2::new(self.aim.cos(), self.aim.sin());
        self.striker.vel = dir * self.power as f32 * POWER_SCALE;
        self.shot_pockets.clear();
        self.rolling = true;
        self.phase = Phase::Playing;
    }

    fn next_seat(&self) -> usize {
        (self.current + 1) % self.scores.len()
    }

    fn simulate(&mut self, dt: f32) {
        let bounds = play_area();

        if !self.striker_pocketed {
            self.striker.step(dt);
            if physics::bounce_in_bounds(&mut self.striker, STRIKER_R, &bounds, WALL_E).any() {
                log::trace!("striker off the frame at {:?}", self.striker.pos);
            }
        }
        for coin in self.coins.iter_mut().filter(|c| !c.pocketed) {
            let r = coin.radius();
            coin.body.step(dt);
            physics::bounce_in_bounds(&mut coin.body, r, &bounds, WALL_E);
        }

        if !self.striker_pocketed {
            for coin in self.coins.iter_mut().filter(|c| !c.pocketed) {
                let r = coin.radius();
                physics::resolve_circle_pair(&mut self.striker, STRIKER_R, STRIKER_MASS, &mut coin.body, r, COIN_MASS, PAIR_E);
            }
        }
        for i in 0..self.coins.len() {
            for j in i + 1..self.coins.len() {
                if self.coins[i].pocketed || self.coins[j].pocketed {
                    continue;
                }
                let (head, tail) = self.coins.split_at_mut(j);
                let (a, b) = (&mut head[i], &mut tail[0]);
                let (ra, rb) = (a.radius(), b.radius());
                physics::resolve_circle_pair(&mut a.body, ra, COIN_MASS, &mut b.body, rb, COIN_MASS, PAIR_E);
            }
        }

        for coin in self.coins.iter_mut().filter(|c| !c.pocketed) {
            if in_pocket(coin.body.pos) {
                coin.pocketed = true;
                coin.body.vel = Vec2::ZERO;
                self.shot_pockets.push(coin.kind);
            }
        }
        if !self.striker_pocketed && in_pocket(self.striker.pos) {
            self.striker_pocketed = true;
            self.striker.vel = Vec2::ZERO;
        }

        let mut resting = self.striker.apply_friction(FRICTION, dt, REST_SPEED) || self.striker_pocketed;
        for coin in self.coins.iter_mut().filter(|c| !c.pocketed) {
            resting &= coin.body.apply_friction(FRICTION, dt, REST_SPEED);
        }
        if resting {
            self.finish_shot();
        }
    }

    /// Score the shot once everything has stopped, then hand over or keep the turn.
    fn finish_shot(&mut self) {
        let seat = self.current;
        let own = CoinKind::for_seat(seat);
        let scratch = self.striker_pocketed;
        let pocketed = std::mem::take(&mut self.shot_pockets);
        let mut covered = false;
        let mut notes = Vec::new();

        for kind in &pocketed {
            match kind {
                CoinKind::Queen => {}
                k if *k == own => {
                    self.scores[seat] += COIN_POINTS;
                    covered = true;
                }
                _ => {
                    let next = self.next_seat();
                    self.scores[next] += COIN_POINTS;
                }
            }
            notes.push(kind.label());
        }

        if let Some(owner) = self.queen_pending.take() {
            if covered {
                self.scores[owner] += QUEEN_POINTS;
                notes.push("queen covered");
            } else {
                self.return_queen();
                notes.push("queen returned");
            }
        }
        if pocketed.contains(&CoinKind::Queen) {
            if covered {
                self.scores[seat] += QUEEN_POINTS;
                notes.push("queen covered");
            } else if scratch {
                self.return_queen();
            } else {
                self.queen_pending = Some(seat);
                notes.push("cover the queen next shot");
            }
        }

        if scratch {
            self.scores[seat] = self.scores[seat].saturating_sub(SCRATCH_PENALTY);
            self.return_coin(own);
            notes.push("scratch");
        }

        let keep_turn = !pocketed.is_empty() && !scratch;
        if !keep_turn {
            // An uncovered queen cannot wait for another player's shot
            if self.queen_pending.take().is_some() {
                self.return_queen();
            }
            self.current = self.next_seat();
        }
        log::debug!("carrom shot by seat {}: {:?} scratch={}", seat, pocketed, scratch);

        if self.board_cleared() {
            self.phase = Phase::Over;
            self.rolling = false;
            self.message = format!("Board cleared, best score {}", self.score());
            log::info!("carrom over, scores={:?}", self.scores);
            return;
        }

        self.place_striker();
        let summary = if notes.is_empty() { String::from("no pocket") } else { notes.join(", ") };
        self.message = format!(
            "{} | Player {} ({}) to strike",
            summary,
            self.current + 1,
            CoinKind::for_seat(self.current).label()
        );
    }

    fn board_cleared(&self) -> bool {
        self.coins
            .iter()
            .filter(|c| c.kind != CoinKind::Queen)
            .all(|c| c.pocketed)
    }

    fn return_queen(&mut self) {
        let spot = self.free_spot(QUEEN_R);
        if let Some(q) = self.coins.iter_mut().find(|c| c.kind == CoinKind::Queen) {
            q.pocketed = false;
            q.body = Body::at_rest(spot);
        }
    }

    fn return_coin(&mut self, kind: CoinKind) {
        let spot = self.free_spot(COIN_R);
        if let Some(c) = self.coins.iter_mut().find(|c| c.kind == kind && c.pocketed) {
            c.pocketed = false;
            c.body = Body::at_rest(spot);
        }
    }

    /// First spot near the centre that does not overlap a coin on the board.
    fn free_spot(&mut self, radius: f32) -> Vec2 {
        let center = board_center();
        let clear = |p: Vec2, coins: &[Coin]| {
            coins
                .iter()
                .filter(|c| !c.pocketed)
                .all(|c| c.body.pos.distance(p) >= c.radius() + radius)
        };
        if clear(center, &self.coins) {
            return center;
        }
        for _ in 0..64 {
            let p = center + Vec2::new(self.rng.gen_range(-3.0..3.0), self.rng.gen_range(-3.0..3.0));
            if clear(p, &self.coins) {
                return p;
            }
        }
        for ring in 1..12 {
            for step in 0..12 {
                let a = step as f32 * std::f32::consts::TAU / 12.0;
                let p = center + Vec2::new(a.cos(), a.sin()) * ring as f32 * radius * 2.0;
                if clear(p, &self.coins) {
                    return p;
                }
            }
        }
        center
    }

    fn render_board(&self, width: usize, height: usize) -> Vec<Line<'static>> {
        let wood = Color::Rgb(210, 180, 140);
        let mut c = Canvas::new(width, height, wood);
        let vp = Viewport::new(BOARD, BOARD, width, height);
        let border = Color::Rgb(120, 90, 50);

        let (fx0, fy0) = vp.cell(Vec2::splat(FRAME));
        let (fx1, fy1) = vp.cell(Vec2::splat(BOARD - FRAME));
        c.fill(0, 0, width as i32, fy0.max(1), '▓', Style::default().fg(border).bg(border));
        c.fill(0, fy1, width as i32, height as i32 - fy1, '▓', Style::default().fg(border).bg(border));
        c.fill(0, 0, fx0.max(1), height as i32, '▓', Style::default().fg(border).bg(border));
        c.fill(fx1, 0, width as i32 - fx1, height as i32, '▓', Style::default().fg(border).bg(border));

        let line = Color::Rgb(150, 110, 70);
        for seat_line in [BASELINE_NEAR, BASELINE_FAR] {
            let y = vp.row(seat_line);
            for x in vp.col(SLIDE_MIN)..=vp.col(SLIDE_MAX) {
                c.put(x, y, '─', line);
            }
        }
        let (cx, cy) = vp.cell(board_center());
        c.put_if_empty(cx, cy, '✦', line);

        for p in pockets() {
            let (px, py) = vp.cell(p);
            c.put_styled(px, py, '●', Style::default().fg(Color::Black).bg(border));
        }

        for coin in self.coins.iter().filter(|c| !c.pocketed) {
            let (x, y) = vp.cell(coin.body.pos);
            let (ch, fg) = match coin.kind {
                CoinKind::White => ('●', Color::White),
                CoinKind::Black => ('●', Color::Rgb(40, 40, 40)),
                CoinKind::Queen => ('◉', Color::Rgb(200, 20, 20)),
            };
            c.put_styled(x, y, ch, Style::default().fg(fg).bg(wood).add_modifier(Modifier::BOLD));
        }

        if !self.striker_pocketed {
            if !self.rolling && self.phase != Phase::Over {
                let dir = Vec2::new(self.aim.cos(), self.aim.sin());
                for i in 1..=self.power {
                    let p = self.striker.pos + dir * (STRIKER_R + i as f32 * 0.8);
                    let (x, y) = vp.cell(p);
                    c.put_if_empty(x, y, '·', Color::Rgb(60, 120, 60));
                }
            }
            let (x, y) = vp.cell(self.striker.pos);
            c.put_styled(x, y, '◎', Style::default().fg(Color::Rgb(60, 180, 60)).bg(wood).add_modifier(Modifier::BOLD));
        }

        c.into_lines()
    }
}

impl Game for Carrom {
    fn update(&mut self, dt: f32) {
        if self.phase == Phase::Playing && self.rolling {
            self.simulate(dt);
        }
    }

    fn handle_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('r') | KeyCode::Char('R') => self.reset(),
            KeyCode::Char('p') | KeyCode::Char('P') => self.phase = self.phase.toggle_pause(),
            _ => match self.phase {
                Phase::Over => {
                    if matches!(key.code, KeyCode::Enter | KeyCode::Char(' ')) {
                        self.reset();
                    }
                }
                Phase::Ready => match key.code {
                    KeyCode::Char('a') | KeyCode::Char('A') => {
                        self.striker.pos.x = (self.striker.pos.x - SLIDE_STEP).max(SLIDE_MIN);
                    }
                    KeyCode::Char('d') | KeyCode::Char('D') => {
                        self.striker.pos.x = (self.striker.pos.x + SLIDE_STEP).min(SLIDE_MAX);
                    }
                    KeyCode::Left => self.aim -= AIM_STEP,
                    KeyCode::Right => self.aim += AIM_STEP,
                    KeyCode::Up => self.power = (self.power + 1).min(MAX_POWER),
                    KeyCode::Down => self.power = self.power.saturating_sub(1).max(1),
                    KeyCode::Char(' ') => self.shoot(),
                    _ => {}
                },
                Phase::Playing | Phase::Paused => {}
            },
        }
    }

    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let (status_area, field_area, help_area) =
            canvas::game_frame(frame, area, "🎯 Carrom", Color::Rgb(210, 170, 110));

        let mut items: Vec<(String, Color)> = self
            .scores
            .iter()
            .enumerate()
            .map(|(seat, s)| {
                let marker = if seat == self.current { "▶" } else { " " };
                let color = if seat == self.current { Color::Yellow } else { Color::Gray };
                (format!("{}P{} {}: {}", marker, seat + 1, CoinKind::for_seat(seat).label(), s), color)
            })
            .collect();
        items.push((format!("Power: {:>2}/{}", self.power, MAX_POWER), Color::Magenta));
        frame.render_widget(Paragraph::new(canvas::status_line(items)), status_area);

        // Keep the board roughly square on screen (cells are about twice as tall as wide)
        let rows = field_area.height;
        let cols = (rows * 2).min(field_area.width);
        let board_area = Rect {
            x: field_area.x + (field_area.width - cols) / 2,
            y: field_area.y,
            width: cols,
            height: rows,
        };
        let lines = self.render_board(board_area.width as usize, board_area.height as usize);
        frame.render_widget(Paragraph::new(lines), board_area);

        let help = match self.phase {
            Phase::Over => canvas::banner_line("🏁 GAME OVER!", Color::Yellow, "Press ENTER to play again, Esc for menu"),
            Phase::Paused => canvas::banner_line("⏸ PAUSED", Color::Yellow, "Press P to resume"),
            Phase::Playing => canvas::banner_line("…", Color::Gray, &self.message),
            Phase::Ready => Line::from(vec![
                Span::styled(format!(" {} ", self.message), Style::default().fg(Color::Gray)),
                Span::styled("│ A/D ←→ ↑↓ SPACE", Style::default().fg(Color::Rgb(80, 200, 255))),
            ]),
        };
        frame.render_widget(Paragraph::new(help), help_area);
    }

    fn reset(&mut self) {
        let players = self.scores.len();
        let rng = StdRng::from_rng(&mut self.rng).unwrap_or_else(|_| StdRng::from_entropy());
        *self = Carrom::with_rng(players, rng);
    }

    fn score(&self) -> u32 {
        self.scores.iter().copied().max().unwrap_or(0)
    }

    fn phase(&self) -> Phase {
        self.phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    const DT: f32 = 1.0 / 60.0;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn game(players: usize) -> Carrom {
        Carrom::with_rng(players, StdRng::seed_from_u64(3))
    }

    fn pocket(c: &mut Carrom, kind: CoinKind) {
        let coin = c
            .coins
            .iter_mut()
            .find(|coin| coin.kind == kind && !coin.pocketed)
            .expect("coin left on board");
        coin.pocketed = true;
        c.shot_pockets.push(kind);
    }

    #[test]
    fn opening_layout_has_queen_and_twelve_coins() {
        let c = game(2);
        assert_eq!(c.coins.len(), 13);
        assert_eq!(c.coins[0].kind, CoinKind::Queen);
        assert_eq!(c.coins[0].body.pos, board_center());
        let whites = c.coins.iter().filter(|c| c.kind == CoinKind::White).count();
        assert_eq!(whites, 6);
    }

    #[test]
    fn player_count_is_clamped() {
        assert_eq!(game(1).scores.len(), 2);
        assert_eq!(game(9).scores.len(), 4);
    }

    #[test]
    fn striker_sits_on_the_seat_baseline() {
        let mut c = game(2);
        assert_eq!(c.striker.pos.y, BASELINE_NEAR);
        c.current = 1;
        c.place_striker();
        assert_eq!(c.striker.pos.y, BASELINE_FAR);
        assert!(c.aim > 0.0, "far seat aims down the board");
    }

    #[test]
    fn power_and_slide_are_bounded() {
        let mut c = game(2);
        for _ in 0..40 {
            c.handle_input(key(KeyCode::Up));
            c.handle_input(key(KeyCode::Char('d')));
        }
        assert_eq!(c.power, MAX_POWER);
        assert_eq!(c.striker.pos.x, SLIDE_MAX);
        for _ in 0..40 {
            c.handle_input(key(KeyCode::Down));
        }
        assert_eq!(c.power, 1);
    }

    #[test]
    fn a_shot_eventually_comes_to_rest() {
        let mut c = game(2);
        c.handle_input(key(KeyCode::Char(' ')));
        assert_eq!(c.phase(), Phase::Playing);
        for _ in 0..60 * 60 {
            c.update(DT);
            if c.phase() != Phase::Playing {
                break;
            }
        }
        assert_eq!(c.phase(), Phase::Ready);
        for coin in c.coins.iter().filter(|c| !c.pocketed) {
            assert!(play_area().contains(coin.body.pos));
        }
    }

    #[test]
    fn coin_over_a_pocket_drops_in() {
        let mut c = game(2);
        c.coins[1].body = Body::new(Vec2::splat(POCKET_INSET + 0.5), Vec2::new(-1.0, -1.0));
        c.rolling = true;
        c.phase = Phase::Playing;
        c.update(DT);
        assert!(c.coins[1].pocketed);
    }

    #[test]
    fn own_coin_scores_and_keeps_the_turn() {
        let mut c = game(2);
        pocket(&mut c, CoinKind::White);
        c.finish_shot();
        assert_eq!(c.scores, vec![10, 0]);
        assert_eq!(c.current, 0);
    }

    #[test]
    fn opponent_coin_scores_for_the_next_seat() {
        let mut c = game(2);
        pocket(&mut c, CoinKind::Black);
        c.finish_shot();
        assert_eq!(c.scores, vec![0, 10]);
    }

    #[test]
    fn empty_shot_passes_the_turn() {
        let mut c = game(3);
        c.finish_shot();
        assert_eq!(c.current, 1);
        c.finish_shot();
        c.finish_shot();
        assert_eq!(c.current, 0);
    }

    #[test]
    fn queen_covered_in_the_same_shot() {
        let mut c = game(2);
        pocket(&mut c, CoinKind::Queen);
        pocket(&mut c, CoinKind::White);
        c.finish_shot();
        assert_eq!(c.scores[0], COIN_POINTS + QUEEN_POINTS);
        assert!(c.queen_pending.is_none());
    }

    #[test]
    fn queen_covered_on_the_following_shot() {
        let mut c = game(2);
        pocket(&mut c, CoinKind::Queen);
        c.finish_shot();
        assert_eq!(c.queen_pending, Some(0));
        assert_eq!(c.current, 0);
        pocket(&mut c, CoinKind::White);
        c.finish_shot();
        assert_eq!(c.scores[0], COIN_POINTS + QUEEN_POINTS);
    }

    #[test]
    fn uncovered_queen_returns_to_the_board() {
        let mut c = game(2);
        pocket(&mut c, CoinKind::Queen);
        c.finish_shot();
        c.finish_shot();
        let queen = c.coins.iter().find(|c| c.kind == CoinKind::Queen).unwrap();
        assert!(!queen.pocketed);
        assert_eq!(c.scores[0], 0);
        assert_eq!(c.current, 1);
    }

    #[test]
    fn scratch_costs_points_and_returns_a_coin() {
        let mut c = game(2);
        pocket(&mut c, CoinKind::White);
        c.finish_shot();
        c.striker_pocketed = true;
        c.finish_shot();
        assert_eq!(c.scores[0], 0);
        assert!(c.coins.iter().filter(|c| c.kind == CoinKind::White).all(|c| !c.pocketed));
        assert_eq!(c.current, 1);
        // Penalty never underflows
        c.striker_pocketed = true;
        c.finish_shot();
        assert_eq!(c.scores[1], 0);
    }

    #[test]
    fn clearing_the_board_ends_the_game() {
        let mut c = game(2);
        for coin in c.coins.iter_mut().filter(|c| c.kind != CoinKind::Queen) {
            coin.pocketed = true;
        }
        c.shot_pockets.push(CoinKind::White);
        c.finish_shot();
        assert!(c.is_game_over());
        assert_eq!(c.score(), 10);
    }
}
