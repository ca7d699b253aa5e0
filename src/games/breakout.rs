use crossterm::event::{KeyCode, KeyEvent};
use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::games::canvas::{self, Canvas, Viewport};
use crate::games::{Game, Phase};
use crate::physics::{self, Aabb, Axis, Body, Circle};

const FIELD_W: f32 = 70.0;
const FIELD_H: f32 = 28.0;
const BRICK_ROWS: usize = 6;
const BRICK_COLS: usize = 10;
const BRICK_H: f32 = 1.0;
const BRICK_GAP: f32 = 0.4;
const BRICK_TOP: f32 = 2.0;
const SIDE_MARGIN: f32 = 1.0;
const PADDLE_W: f32 = 12.0;
const PADDLE_H: f32 = 1.0;
const PADDLE_Y: f32 = FIELD_H - 3.0;
const PADDLE_STEP: f32 = 2.0;
const EXPAND_STEP: f32 = 5.0;
const BALL_R: f32 = 0.5;
const BALL_SPEED: f32 = 21.0;
const MAX_SPEED_FACTOR: f32 = 1.6;
const SPEEDUP_PER_BRICK: f32 = 1.015;
const MAX_LIVES: u32 = 3;
const POWERUP_FALL: f32 = 10.0;

const ROW_COLORS: [Color; BRICK_ROWS] = [
    Color::Rgb(220, 50, 50),
    Color::Rgb(220, 130, 30),
    Color::Rgb(220, 200, 30),
    Color::Rgb(50, 200, 50),
    Color::Rgb(50, 130, 220),
    Color::Rgb(150, 50, 220),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PowerKind {
    Expand,
    Slow,
    Life,
}

impl PowerKind {
    fn glyph(self) -> char {
        match self {
            PowerKind::Expand => '⇔',
            PowerKind::Slow => 'S',
            PowerKind::Life => '+',
        }
    }

    fn color(self) -> Color {
        match self {
            PowerKind::Expand => Color::Rgb(250, 229, 53),
            PowerKind::Slow => Color::Rgb(185, 53, 220),
            PowerKind::Life => Color::Rgb(53, 220, 53),
        }
    }
}

#[derive(Clone)]
struct Brick {
    rect: Aabb,
    alive: bool,
    color: Color,
    points: u32,
    has_powerup: bool,
}

struct PowerUp {
    pos: Vec2,
    kind: PowerKind,
    active: bool,
}

pub struct Breakout {
    paddle_x: f32,
    paddle_w: f32,
    ball: Body,
    speed: f32,
    bricks: Vec<Brick>,
    powerups: Vec<PowerUp>,
    level: u32,
    score: u32,
    high_score: u32,
    lives: u32,
    phase: Phase,
    rng: StdRng,
}

impl Breakout {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    fn with_rng(rng: StdRng) -> Self {
        let mut b = Self {
            paddle_x: FIELD_W / 2.0 - PADDLE_W / 2.0,
            paddle_w: PADDLE_W,
            ball: Body::default(),
            speed: BALL_SPEED,
            bricks: Vec::new(),
            powerups: Vec::new(),
            level: 1,
            score: 0,
            high_score: 0,
            lives: MAX_LIVES,
            phase: Phase::Ready,
            rng,
        };
        b.build_level();
        b.dock_ball();
        b
    }

    fn build_level(&mut self) {
        self.bricks.clear();
        let brick_w = (FIELD_W - 2.0 * SIDE_MARGIN - BRICK_GAP * (BRICK_COLS - 1) as f32) / BRICK_COLS as f32;
        let density = (0.8 - 0.06 * self.level as f32).max(0.2);
        let powerup_rate = 0.14 + 0.025 * self.level as f32;

        for row in 0..BRICK_ROWS {
            for col in 0..BRICK_COLS {
                if self.rng.gen::<f32>() >= density {
                    continue;
                }
                let x = SIDE_MARGIN + col as f32 * (brick_w + BRICK_GAP);
                let y = BRICK_TOP + row as f32 * (BRICK_H + BRICK_GAP);
                self.bricks.push(Brick {
                    rect: Aabb::new(x, y, brick_w, BRICK_H),
                    alive: true,
                    color: ROW_COLORS[row],
                    points: 50 + row as u32 * 20,
                    has_powerup: self.rng.gen::<f32>() < powerup_rate,
                });
            }
        }
        // An empty wall would clear instantly
        if self.bricks.is_empty() {
            let col = self.rng.gen_range(0..BRICK_COLS);
            self.bricks.push(Brick {
                rect: Aabb::new(SIDE_MARGIN + col as f32 * (brick_w + BRICK_GAP), BRICK_TOP, brick_w, BRICK_H),
                alive: true,
                color: ROW_COLORS[0],
                points: 50,
                has_powerup: false,
            });
        }
    }

    fn dock_ball(&mut self) {
        self.ball = Body::at_rest(Vec2::new(self.paddle_x + self.paddle_w / 2.0, PADDLE_Y - BALL_R - 0.1));
    }

    fn launch(&mut self) {
        let dir = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        self.ball.vel = Vec2::new(dir * self.speed * 0.7, -self.speed);
        self.phase = Phase::Playing;
    }

    fn paddle_rect(&self) -> Aabb {
        Aabb::new(self.paddle_x, PADDLE_Y, self.paddle_w, PADDLE_H)
    }

    fn ball_rect(&self) -> Aabb {
        Circle::new(self.ball.pos, BALL_R).bounding_box()
    }

    fn move_paddle(&mut self, dx: f32) {
        self.paddle_x = (self.paddle_x + dx).clamp(0.0, FIELD_W - self.paddle_w);
        if self.phase == Phase::Ready {
            self.dock_ball();
        }
    }

    fn lose_life(&mut self) {
        self.lives = self.lives.saturating_sub(1);
        self.powerups.clear();
        if self.lives == 0 {
            self.phase = Phase::Over;
            self.high_score = self.high_score.max(self.score);
            log::info!("breakout over, score={} level={}", self.score, self.level);
        } else {
            self.phase = Phase::Ready;
            self.dock_ball();
        }
    }

    fn move_ball(&mut self, dt: f32) {
        self.ball.step(dt);

        // Floor is open: use a bounds box that extends far below the field
        let walls = Aabb::new(0.0, 0.0, FIELD_W, FIELD_H * 4.0);
        physics::bounce_in_bounds(&mut self.ball, BALL_R, &walls, 1.0);

        if self.ball.pos.y - BALL_R > FIELD_H {
            self.lose_life();
            return;
        }

        let ball_box = self.ball_rect();
        if self.ball.vel.y > 0.0 && ball_box.overlaps(&self.paddle_rect()) {
            let offset = (((self.ball.pos.x - self.paddle_x) / self.paddle_w - 0.5) * 2.0).clamp(-1.0, 1.0);
            self.ball.vel.x = offset * self.speed * 1.3;
            self.ball.vel.y = -self.ball.vel.y.abs().max(self.speed * 0.5);
            self.ball.pos.y = PADDLE_Y - BALL_R;
        }

        let hit = self
            .bricks
            .iter()
            .position(|b| b.alive && ball_box.overlaps(&b.rect));
        if let Some(idx) = hit {
            match physics::hit_axis(&ball_box, &self.bricks[idx].rect) {
                Axis::X => self.ball.vel.x = -self.ball.vel.x,
                Axis::Y => self.ball.vel.y = -self.ball.vel.y,
            }
            let brick = &mut self.bricks[idx];
            brick.alive = false;
            self.score += brick.points;
            if brick.has_powerup {
                let kind = match self.rng.gen_range(0..3) {
                    0 => PowerKind::Expand,
                    1 => PowerKind::Slow,
                    _ => PowerKind::Life,
                };
                self.powerups.push(PowerUp {
                    pos: brick.rect.center(),
                    kind,
                    active: true,
                });
            }
            if self.speed < BALL_SPEED * MAX_SPEED_FACTOR {
                self.speed = (self.speed * SPEEDUP_PER_BRICK).min(BALL_SPEED * MAX_SPEED_FACTOR);
                self.ball.vel *= SPEEDUP_PER_BRICK;
            }
        }
    }

    fn update_powerups(&mut self, dt: f32) {
        let paddle = self.paddle_rect();
        for i in 0..self.powerups.len() {
            let p = &mut self.powerups[i];
            p.pos.y += POWERUP_FALL * dt;
            if p.pos.y > FIELD_H {
                p.active = false;
                continue;
            }
            let caught = Aabb::from_center(p.pos, Vec2::new(1.5, 0.5)).overlaps(&paddle);
            if caught {
                p.active = false;
                let kind = p.kind;
                self.apply_powerup(kind);
            }
        }
        self.powerups.retain(|p| p.active);
    }

    fn apply_powerup(&mut self, kind: PowerKind) {
        match kind {
            PowerKind::Expand => {
                self.paddle_w = (self.paddle_w + EXPAND_STEP).min(FIELD_W / 2.0);
                self.paddle_x = self.paddle_x.min(FIELD_W - self.paddle_w);
            }
            PowerKind::Slow => self.ball.vel *= 0.7,
            PowerKind::Life => self.lives = (self.lives + 1).min(MAX_LIVES),
        }
    }

    fn check_level_cleared(&mut self) {
        if self.phase == Phase::Playing && self.bricks.iter().all(|b| !b.alive) {
            self.level += 1;
            log::debug!("breakout level {} reached", self.level);
            self.build_level();
            self.powerups.clear();
            self.phase = Phase::Ready;
            self.dock_ball();
        }
    }

    fn render_field(&self, width: usize, height: usize) -> Vec<Line<'static>> {
        let bg = Color::Rgb(10, 10, 20);
        let mut c = Canvas::new(width, height, bg);
        let vp = Viewport::new(FIELD_W, FIELD_H, width, height);
        let wall = Color::Rgb(60, 60, 80);
        for y in 0..height as i32 {
            c.put(0, y, '│', wall);
            c.put(width as i32 - 1, y, '│', wall);
        }
        for x in 0..width as i32 {
            c.put(x, 0, '─', wall);
        }
        c.put(0, 0, '╭', wall);
        c.put(width as i32 - 1, 0, '╮', wall);

        for brick in self.bricks.iter().filter(|b| b.alive) {
            let x0 = vp.col(brick.rect.min.x);
            let x1 = vp.col(brick.rect.max.x).max(x0 + 1);
            let y = vp.row(brick.rect.min.y);
            for x in x0..x1 {
                let ch = if x == x0 {
                    '▐'
                } else if x + 1 == x1 {
                    '▌'
                } else if brick.has_powerup && x == (x0 + x1) / 2 {
                    '◆'
                } else {
                    '█'
                };
                c.put(x, y, ch, brick.color);
                c.put_if_empty(x, y + 1, '░', Color::Rgb(30, 30, 40));
            }
        }

        for p in &self.powerups {
            let (x, y) = vp.cell(p.pos);
            c.put_styled(x, y, p.kind.glyph(), Style::default().fg(Color::Black).bg(p.kind.color()));
        }

        let px0 = vp.col(self.paddle_x);
        let px1 = vp.col(self.paddle_x + self.paddle_w).max(px0 + 2);
        let py = vp.row(PADDLE_Y);
        let paddle_style = Style::default()
            .fg(Color::Rgb(180, 200, 255))
            .bg(Color::Rgb(30, 50, 120))
            .add_modifier(Modifier::BOLD);
        for x in px0..px1 {
            let ch = if x == px0 {
                '╣'
            } else if x + 1 == px1 {
                '╠'
            } else {
                '═'
            };
            c.put_styled(x, py, ch, paddle_style);
        }

        let (bx, by) = vp.cell(self.ball.pos);
        if self.ball.is_moving() {
            let (tx, ty) = vp.cell(self.ball.pos - self.ball.vel * 0.1);
            if (tx, ty) != (bx, by) {
                c.put_if_empty(tx, ty, '·', Color::Rgb(100, 100, 120));
            }
        }
        c.put_styled(bx, by, '●', Style::default().fg(Color::White).bg(bg).add_modifier(Modifier::BOLD));

        c.into_lines()
    }
}

impl Game for Breakout {
    fn update(&mut self, dt: f32) {
        if self.phase != Phase::Playing {
            return;
        }
        self.move_ball(dt);
        if self.phase == Phase::Playing {
            self.update_powerups(dt);
            self.check_level_cleared();
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
                Phase::Paused => {}
                Phase::Ready | Phase::Playing => match key.code {
                    KeyCode::Left => self.move_paddle(-PADDLE_STEP),
                    KeyCode::Right => self.move_paddle(PADDLE_STEP),
                    KeyCode::Char(' ') | KeyCode::Up if self.phase == Phase::Ready => self.launch(),
                    _ => {}
                },
            },
        }
    }

    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let (status_area, field_area, help_area) = canvas::game_frame(frame, area, "🧱 Breakout", Color::Rgb(220, 80, 80));

        let bricks_left = self.bricks.iter().filter(|b| b.alive).count();
        let status = canvas::status_line(vec![
            (format!("Score: {}", self.score), Color::Yellow),
            (format!("Lives: {}", "♥ ".repeat(self.lives as usize)), Color::Red),
            (format!("Level: {}", self.level), Color::Magenta),
            (format!("🏆 High: {}", self.high_score), Color::Cyan),
            (format!("Bricks: {}/{}", bricks_left, self.bricks.len()), Color::Green),
        ]);
        frame.render_widget(Paragraph::new(status), status_area);

        let lines = self.render_field(field_area.width as usize, field_area.height as usize);
        frame.render_widget(Paragraph::new(lines), field_area);

        let help = match self.phase {
            Phase::Over => canvas::banner_line("💀 GAME OVER!", Color::Red, "Press ENTER to restart, Esc for menu"),
            Phase::Paused => canvas::banner_line("⏸ PAUSED", Color::Yellow, "Press P to resume"),
            Phase::Ready => canvas::hint_line(&[("←→", "Move Paddle"), ("SPACE", "Launch"), ("P", "Pause"), ("R", "Restart"), ("Esc", "Menu")]),
            Phase::Playing => canvas::hint_line(&[("←→", "Move Paddle"), ("P", "Pause"), ("R", "Restart"), ("Esc", "Menu")]),
        };
        frame.render_widget(Paragraph::new(help), help_area);
    }

    fn reset(&mut self) {
        let hs = self.high_score;
        let rng = StdRng::from_rng(&mut self.rng).unwrap_or_else(|_| StdRng::from_entropy());
        *self = Breakout::with_rng(rng);
        self.high_score = hs;
    }

    fn score(&self) -> u32 {
        self.score
    }

    fn phase(&self) -> Phase {
        self.phase
    }
}
