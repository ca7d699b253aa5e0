use crossterm::event::{KeyCode, KeyEvent};
use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::games::canvas::{self, Canvas, Viewport};
use crate::games::{Game, Phase};
use crate::physics::{Aabb, Body, Circle};

const WORLD_W: f32 = 90.0;
const WORLD_H: f32 = 60.0;
const FLOOR_Y: f32 = WORLD_H;
const STACK_X: f32 = 45.0;
const STACK_BASE_Y: f32 = 42.0;
const STONES: usize = 7;
const STONE_W: f32 = 4.0;
const STONE_H: f32 = 1.2;
const STONE_GAP: f32 = 0.3;
const STONE_GRAVITY: f32 = 42.0;
const STONE_FLOOR_FRICTION: f32 = 0.85;
const PLAYER_R: f32 = 2.8;
const REACH: f32 = PLAYER_R + 1.8;
const PLAYER_STEP: f32 = 2.0;
const TEAMMATE_SPEED: f32 = 10.0;
const TEAMMATE_COOLDOWN: f32 = 0.6;
const THROWER_SPEED: f32 = 8.0;
const THROWER_ZONE_Y: f32 = 25.0;
const BALL_R: f32 = 1.6;
const BALL_GRAVITY: f32 = 28.8;
const BALL_BOUNCE: f32 = 0.58;
const BALL_FLOOR_FRICTION: f32 = 0.72;
const BALL_REST: f32 = 6.0;
const THROW_CHANCE: f64 = 0.03;
const ROUND_SECS: f32 = 10.0;
const STONE_POINTS: u32 = 10;
const REBUILD_POINTS: u32 = 100;

fn stack_center() -> Vec2 {
    Vec2::new(STACK_X, STACK_BASE_Y)
}

/// Centre of the stack slot `i` counted from the bottom.
fn slot(i: usize) -> Vec2 {
    Vec2::new(STACK_X, STACK_BASE_Y - STONE_H / 2.0 - i as f32 * (STONE_H + STONE_GAP))
}

#[derive(Debug, Clone)]
struct Stone {
    body: Body,
    placed: bool,
}

impl Stone {
    fn rect(&self) -> Aabb {
        Aabb::from_center(self.body.pos, Vec2::new(STONE_W / 2.0, STONE_H / 2.0))
    }
}

#[derive(Debug, Clone)]
struct Rebuilder {
    pos: Vec2,
    alive: bool,
    human: bool,
    cooldown: f32,
}

#[derive(Debug, Clone)]
struct Ball {
    body: Body,
    active: bool,
}

pub struct Pithu {
    stones: Vec<Stone>,
    rebuilders: Vec<Rebuilder>,
    throwers: Vec<Vec2>,
    ball: Ball,
    timer: f32,
    rounds: u32,
    round: u32,
    rebuilt: u32,
    thrower_wins: u32,
    points: u32,
    message: String,
    phase: Phase,
    rng: StdRng,
}

impl Pithu {
    pub fn new(rounds: u32) -> Self {
        Self::with_rng(rounds, StdRng::from_entropy())
    }

    fn with_rng(rounds: u32, rng: StdRng) -> Self {
        let mut p = Self {
            stones: Vec::new(),
            rebuilders: Vec::new(),
            throwers: Vec::new(),
            ball: Ball { body: Body::default(), active: false },
            timer: ROUND_SECS,
            rounds: rounds.max(1),
            round: 1,
            rebuilt: 0,
            thrower_wins: 0,
            points: 0,
            message: String::from("The stack is down! Press ENTER to start rebuilding"),
            phase: Phase::Ready,
            rng,
        };
        p.setup_round();
        p
    }

    fn setup_round(&mut self) {
        self.stones = (0..STONES)
            .map(|i| {
                let vel = Vec2::new(self.rng.gen_range(-20.0..20.0), self.rng.gen_range(-25.0..-5.0));
                Stone { body: Body::new(slot(i), vel), placed: false }
            })
            .collect();
        self.rebuilders = vec![
            Rebuilder { pos: Vec2::new(STACK_X - 8.0, 54.0), alive: true, human: true, cooldown: 0.0 },
            Rebuilder { pos: Vec2::new(STACK_X - 14.0, 54.0), alive: true, human: false, cooldown: 0.0 },
        ];
        self.throwers = vec![Vec2::new(STACK_X + 8.0, 17.0), Vec2::new(STACK_X + 14.0, 17.0)];
        self.ball = Ball { body: Body::default(), active: false };
        self.timer = ROUND_SECS;
    }

    fn stones_down(&self) -> usize {
        self.stones.iter().filter(|s| !s.placed).count()
    }

    fn in_reach(pos: Vec2) -> bool {
        pos.distance(stack_center()) < REACH
    }

    /// Put stones back on the stack for rebuilder `who`. Returns how many were placed.
    fn place(&mut self, who: usize) -> usize {
        let Some(r) = self.rebuilders.get(who) else {
            return 0;
        };
        if !r.alive || !Self::in_reach(r.pos) {
            return 0;
        }
        let down = self.stones_down();
        let count = (if down > 3 { 2 } else { 1 }).min(down);
        for _ in 0..count {
            let height = STONES - self.stones_down();
            if let Some(stone) = self.stones.iter_mut().find(|s| !s.placed) {
                stone.placed = true;
                stone.body = Body::at_rest(slot(height));
            }
        }
        self.points += count as u32 * STONE_POINTS;
        count
    }

    fn move_human(&mut self, delta: Vec2) {
        if let Some(r) = self.rebuilders.iter_mut().find(|r| r.human && r.alive) {
            r.pos += delta;
            r.pos.x = r.pos.x.clamp(PLAYER_R, WORLD_W - PLAYER_R);
            r.pos.y = r.pos.y.clamp(THROWER_ZONE_Y + PLAYER_R, FLOOR_Y - PLAYER_R);
        }
    }

    fn update_stones(&mut self, dt: f32) {
        for stone in self.stones.iter_mut().filter(|s| !s.placed) {
            stone.body.apply_gravity(STONE_GRAVITY, dt);
            stone.body.step(dt);
            if stone.body.pos.y + STONE_H / 2.0 >= FLOOR_Y {
                stone.body.pos.y = FLOOR_Y - STONE_H / 2.0;
                stone.body.vel.y = 0.0;
                stone.body.apply_friction(STONE_FLOOR_FRICTION, dt, 0.5);
            }
            stone.body.pos.x = stone.body.pos.x.clamp(STONE_W / 2.0, WORLD_W - STONE_W / 2.0);
        }
    }

    fn update_teammate(&mut self, dt: f32) {
        let mut wants_place = None;
        for (i, r) in self.rebuilders.iter_mut().enumerate() {
            if r.human || !r.alive {
                continue;
            }
            r.cooldown = (r.cooldown - dt).max(0.0);
            let to = stack_center() - r.pos;
            if to.length() > REACH * 0.5 {
                r.pos += to.normalize() * (TEAMMATE_SPEED * dt).min(to.length());
            }
            if Self::in_reach(r.pos) && r.cooldown <= 0.0 {
                r.cooldown = TEAMMATE_COOLDOWN;
                wants_place = Some(i);
            }
        }
        if let Some(i) = wants_place {
            self.place(i);
        }
    }

    fn nearest_target(&self, from: Vec2) -> Option<Vec2> {
        self.rebuilders
            .iter()
            .filter(|r| r.alive)
            .map(|r| r.pos)
            .min_by(|a, b| a.distance(from).total_cmp(&b.distance(from)))
    }

    fn update_throwers(&mut self, dt: f32) {
        for i in 0..self.throwers.len() {
            let me = self.throwers[i];
            let Some(target) = self.nearest_target(me) else {
                continue;
            };
            if !self.ball.active {
                let dx = (target.x - me.x).clamp(-THROWER_SPEED * dt, THROWER_SPEED * dt);
                self.throwers[i].x = (me.x + dx).clamp(PLAYER_R, WORLD_W - PLAYER_R);
            }
            if !self.ball.active && self.rng.gen_bool(THROW_CHANCE) {
                self.throw(self.throwers[i], target);
            }
        }
    }

    /// Aim at `target`, lifting the shot to make up for the drop.
    fn throw(&mut self, from: Vec2, target: Vec2) {
        let speed = self.rng.gen_range(30.0..42.0);
        let delta = target - from;
        let time = delta.length() / speed;
        let mut vel = delta.normalize_or_zero() * speed;
        vel.y -= 0.5 * BALL_GRAVITY * time;
        self.ball = Ball { body: Body::new(from, vel), active: true };
    }

    fn update_ball(&mut self, dt: f32) {
        if !self.ball.active {
            return;
        }
        let ball = &mut self.ball.body;
        ball.apply_gravity(BALL_GRAVITY, dt);
        ball.step(dt);
        if ball.pos.y + BALL_R > FLOOR_Y {
            ball.pos.y = FLOOR_Y - BALL_R;
            ball.vel.y = -ball.vel.y.abs() * BALL_BOUNCE;
            ball.vel.x *= BALL_FLOOR_FRICTION;
            if ball.vel.y.abs() < BALL_REST && ball.vel.x.abs() < BALL_REST {
                self.ball.active = false;
                return;
            }
        }
        if ball.pos.x < 0.0 || ball.pos.x > WORLD_W {
            self.ball.active = false;
            return;
        }

        let hit = Circle::new(ball.pos, BALL_R);
        for stone in self.stones.iter_mut().filter(|s| s.placed) {
            if hit.overlaps_aabb(&stone.rect()) {
                stone.placed = false;
                stone.body.vel = Vec2::new(
                    ball.vel.x * self.rng.gen_range(0.8..1.4) + self.rng.gen_range(-18.0..18.0),
                    ball.vel.y * self.rng.gen_range(0.5..1.2) - 10.0,
                );
                ball.vel.x *= 0.45;
                ball.vel.y *= 0.52;
                break;
            }
        }

        let reach = BALL_R + PLAYER_R - 0.8;
        if let Some(r) = self
            .rebuilders
            .iter_mut()
            .find(|r| r.alive && r.pos.distance(ball.pos) < reach)
        {
            r.alive = false;
            self.ball.active = false;
            log::debug!("pithu rebuilder knocked out (human={})", r.human);
        }
    }

    fn end_round(&mut self, rebuilt: bool) {
        if rebuilt {
            self.rebuilt += 1;
            self.points += REBUILD_POINTS;
            self.message = format!("Stack rebuilt! +{}", REBUILD_POINTS);
        } else {
            self.thrower_wins += 1;
            self.message = String::from("The throwers stopped the rebuild");
        }
        log::debug!("pithu round {} done, rebuilt={}", self.round, rebuilt);
        if self.round >= self.rounds {
            self.phase = Phase::Over;
            log::info!("pithu over, rebuilt={} lost={} points={}", self.rebuilt, self.thrower_wins, self.points);
            return;
        }
        self.round += 1;
        self.setup_round();
        self.phase = Phase::Ready;
        self.message.push_str(" | ENTER for the next round");
    }

    fn render_ground(&self, width: usize, height: usize) -> Vec<Line<'static>> {
        let bg = Color::Rgb(215, 215, 175);
        let mut c = Canvas::new(width, height, bg);
        let vp = Viewport::new(WORLD_W, WORLD_H, width, height);
        let zone = vp.row(THROWER_ZONE_Y);
        for x in (0..width as i32).step_by(2) {
            c.put(x, zone, '┄', Color::Rgb(170, 150, 110));
        }
        let (sx, sy) = vp.cell(stack_center());
        c.put(sx - 3, sy, '(', Color::Rgb(150, 130, 90));
        c.put(sx + 3, sy, ')', Color::Rgb(150, 130, 90));

        let stone_style = Style::default().fg(Color::Rgb(128, 99, 63)).bg(bg);
        for stone in &self.stones {
            let rect = stone.rect();
            let y = vp.row(stone.body.pos.y);
            let x0 = vp.col(rect.min.x);
            let x1 = vp.col(rect.max.x).max(x0 + 1);
            for x in x0..x1 {
                c.put_styled(x, y, if stone.placed { '▆' } else { '▂' }, stone_style);
            }
        }

        for r in &self.rebuilders {
            let (x, y) = vp.cell(r.pos);
            let (ch, color) = match (r.alive, r.human) {
                (false, _) => ('✗', Color::Gray),
                (true, true) => ('☻', Color::Rgb(200, 150, 20)),
                (true, false) => ('☺', Color::Rgb(200, 150, 20)),
            };
            c.put_styled(x, y, ch, Style::default().fg(color).bg(bg).add_modifier(Modifier::BOLD));
        }
        for t in &self.throwers {
            let (x, y) = vp.cell(*t);
            c.put_styled(x, y, '☺', Style::default().fg(Color::Rgb(40, 140, 180)).bg(bg).add_modifier(Modifier::BOLD));
        }
        if self.ball.active {
            let (x, y) = vp.cell(self.ball.body.pos);
            c.put_styled(x, y, '●', Style::default().fg(Color::Rgb(220, 80, 80)).bg(bg));
        }
        c.into_lines()
    }
}

impl Game for Pithu {
    fn update(&mut self, dt: f32) {
        if self.phase != Phase::Playing {
            return;
        }
        self.timer = (self.timer - dt).max(0.0);
        self.update_stones(dt);
        self.update_teammate(dt);
        self.update_throwers(dt);
        self.update_ball(dt);

        if self.stones_down() == 0 {
            self.end_round(true);
        } else if self.timer <= 0.0 || self.rebuilders.iter().all(|r| !r.alive) {
            self.end_round(false);
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
                Phase::Ready => {
                    if key.code == KeyCode::Enter {
                        self.phase = Phase::Playing;
                        self.message = format!("Round {}: rebuild the stack!", self.round);
                    }
                }
                Phase::Playing => match key.code {
                    KeyCode::Up => self.move_human(Vec2::new(0.0, -PLAYER_STEP)),
                    KeyCode::Down => self.move_human(Vec2::new(0.0, PLAYER_STEP)),
                    KeyCode::Left => self.move_human(Vec2::new(-PLAYER_STEP, 0.0)),
                    KeyCode::Right => self.move_human(Vec2::new(PLAYER_STEP, 0.0)),
                    KeyCode::Char(' ') | KeyCode::Char('e') | KeyCode::Char('E') => {
                        if let Some(i) = self.rebuilders.iter().position(|r| r.human) {
                            self.place(i);
                        }
                    }
                    _ => {}
                },
                Phase::Paused => {}
            },
        }
    }

    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let (status_area, field_area, help_area) =
            canvas::game_frame(frame, area, "🪨 Pithu", Color::Rgb(180, 140, 100));

        let status = canvas::status_line(vec![
            (format!("Round {}/{}", self.round, self.rounds), Color::Cyan),
            (format!("Stack {}/{}", STONES - self.stones_down(), STONES), Color::Rgb(200, 150, 20)),
            (format!("⏱ {:.1}s", self.timer), if self.timer < 3.0 { Color::Red } else { Color::Green }),
            (format!("Rebuilt {} │ Stopped {}", self.rebuilt, self.thrower_wins), Color::White),
            (format!("Score: {}", self.points), Color::Yellow),
        ]);
        frame.render_widget(Paragraph::new(status), status_area);

        let lines = self.render_ground(field_area.width as usize, field_area.height as usize);
        frame.render_widget(Paragraph::new(lines), field_area);

        let help = match self.phase {
            Phase::Over => canvas::banner_line("🏁 MATCH OVER!", Color::Yellow, "Press ENTER to play again, Esc for menu"),
            Phase::Paused => canvas::banner_line("⏸ PAUSED", Color::Yellow, "Press P to resume"),
            Phase::Ready => canvas::banner_line("▶", Color::Green, &self.message),
            Phase::Playing => canvas::hint_line(&[("Arrows", "Move"), ("SPACE/E", "Place stone"), ("P", "Pause"), ("Esc", "Menu")]),
        };
        frame.render_widget(Paragraph::new(help), help_area);
    }

    fn reset(&mut self) {
        let rounds = self.rounds;
        let rng = StdRng::from_rng(&mut self.rng).unwrap_or_else(|_| StdRng::from_entropy());
        *self = Pithu::with_rng(rounds, rng);
    }

    fn score(&self) -> u32 {
        self.points
    }

    fn phase(&self) -> Phase {
        self.phase
    }
}
