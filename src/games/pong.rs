use crossterm::event::{KeyCode, KeyEvent};
use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::games::canvas::{self, Canvas, Viewport};
use crate::games::{Game, Phase};
use crate::physics::{self, Aabb, Body, Circle};

const FIELD_W: f32 = 100.0;
const FIELD_H: f32 = 40.0;
const PADDLE_W: f32 = 2.0;
const PADDLE_H: f32 = 8.0;
const PADDLE_STEP: f32 = 3.0;
const LEFT_X: f32 = 3.0;
const RIGHT_X: f32 = FIELD_W - 3.0 - PADDLE_W;
const BALL_R: f32 = 1.0;
const BALL_SPEED: f32 = 42.0;
const BALL_ACCEL: f32 = 1.2;
const BALL_MAX: f32 = 96.0;
const HIT_OFFSET: f32 = 25.0;
const HIT_DAMP: f32 = 0.82;
const SPIN_BASE: f32 = 18.0;
const SPIN_EDGE: f32 = 10.0;
/// How long a key press still counts as paddle motion for spin.
const MOTION_HOLD: f32 = 0.2;
const HIT_COOLDOWN: f32 = 0.1;
const SERVE_TIME: f32 = 0.35;
const SERVE_GLIDE: f32 = 12.0;
const SERVE_ANGLE: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Classic,
    Pro,
    Spin,
}

impl Mode {
    fn next(self) -> Self {
        match self {
            Mode::Classic => Mode::Pro,
            Mode::Pro => Mode::Spin,
            Mode::Spin => Mode::Classic,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Mode::Classic => "Classic",
            Mode::Pro => "Pro",
            Mode::Spin => "Spin 2P",
        }
    }

    /// AI paddle speed as a fraction of the serve speed, `None` for two players.
    fn ai_factor(self) -> Option<f32> {
        match self {
            Mode::Classic => Some(0.78),
            Mode::Pro => Some(1.14),
            Mode::Spin => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Paddle {
    x: f32,
    y: f32,
    points: u32,
    motion: f32,
    motion_timer: f32,
}

impl Paddle {
    fn new(x: f32) -> Self {
        Self {
            x,
            y: (FIELD_H - PADDLE_H) / 2.0,
            points: 0,
            motion: 0.0,
            motion_timer: 0.0,
        }
    }

    fn rect(&self) -> Aabb {
        Aabb::new(self.x, self.y, PADDLE_W, PADDLE_H)
    }

    fn shift(&mut self, dy: f32) {
        self.y = (self.y + dy).clamp(0.0, FIELD_H - PADDLE_H);
        self.motion = dy.signum();
        self.motion_timer = MOTION_HOLD;
    }

    fn tick(&mut self, dt: f32) {
        if self.motion_timer > 0.0 {
            self.motion_timer -= dt;
            if self.motion_timer <= 0.0 {
                self.motion = 0.0;
            }
        }
    }

    fn center(&self) -> f32 {
        self.y + PADDLE_H / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BallState {
    /// Gliding out of the centre before launch, seconds elapsed.
    Serving(f32),
    Moving,
}

pub struct Pong {
    left: Paddle,
    right: Paddle,
    ball: Body,
    ball_state: BallState,
    serve_dir: f32,
    hit_cooldown: f32,
    rally: u32,
    win_score: u32,
    mode: Mode,
    phase: Phase,
    rng: StdRng,
}

impl Pong {
    pub fn new(win_score: u32) -> Self {
        Self::with_rng(win_score, StdRng::from_entropy())
    }

    fn with_rng(win_score: u32, mut rng: StdRng) -> Self {
        let serve_dir = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        Self {
            left: Paddle::new(LEFT_X),
            right: Paddle::new(RIGHT_X),
            ball: Body::at_rest(Vec2::new(FIELD_W / 2.0, FIELD_H / 2.0)),
            ball_state: BallState::Serving(0.0),
            serve_dir,
            hit_cooldown: 0.0,
            rally: 0,
            win_score: win_score.max(1),
            mode: Mode::Classic,
            phase: Phase::Ready,
            rng,
        }
    }

    fn serve(&mut self, dir: f32) {
        self.serve_dir = dir;
        self.ball = Body::at_rest(Vec2::new(FIELD_W / 2.0, FIELD_H / 2.0));
        self.ball_state = BallState::Serving(0.0);
        self.rally = 0;
    }

    fn update_serve(&mut self, elapsed: f32, dt: f32) {
        let t = elapsed + dt;
        let pct = (t / SERVE_TIME).min(1.0);
        let hop = 2.0 * (pct * std::f32::consts::PI).sin();
        self.ball.pos = Vec2::new(
            FIELD_W / 2.0 + self.serve_dir * SERVE_GLIDE * pct,
            FIELD_H / 2.0 - hop,
        );
        if t >= SERVE_TIME {
            let angle = self.rng.gen_range(-SERVE_ANGLE..=SERVE_ANGLE);
            self.ball.vel = Vec2::new(self.serve_dir * angle.cos(), angle.sin()) * BALL_SPEED;
            self.ball_state = BallState::Moving;
        } else {
            self.ball_state = BallState::Serving(t);
        }
    }

    fn drive_ai(&mut self, dt: f32) {
        let Some(factor) = self.mode.ai_factor() else {
            return;
        };
        let max_step = BALL_SPEED * factor * dt;
        let gap = self.ball.pos.y - self.right.center();
        if gap.abs() > max_step {
            self.right.y = (self.right.y + max_step * gap.signum()).clamp(0.0, FIELD_H - PADDLE_H);
        }
    }

    fn move_ball(&mut self, dt: f32) {
        self.ball.step(dt);

        // Only the top and bottom reflect; left and right are open goals
        let walls = Aabb::new(-FIELD_W, 0.0, FIELD_W * 3.0, FIELD_H);
        physics::bounce_in_bounds(&mut self.ball, BALL_R, &walls, 1.0);

        if self.hit_cooldown <= 0.0 {
            if self.ball.vel.x < 0.0 {
                self.try_hit(false);
            } else if self.ball.vel.x > 0.0 {
                self.try_hit(true);
            }
        }

        if self.ball.pos.x < 0.0 {
            self.point(true);
        } else if self.ball.pos.x > FIELD_W {
            self.point(false);
        }
    }

    fn try_hit(&mut self, right_side: bool) {
        let paddle = if right_side { self.right } else { self.left };
        let rect = paddle.rect();
        if !Circle::new(self.ball.pos, BALL_R).overlaps_aabb(&rect) {
            return;
        }
        let offset = (((self.ball.pos.y - paddle.y) / PADDLE_H - 0.5) * 2.0).clamp(-1.0, 1.0);
        let spin = if self.mode == Mode::Spin && paddle.motion != 0.0 {
            paddle.motion * (SPIN_BASE + offset.abs() * SPIN_EDGE)
        } else {
            0.0
        };
        let speed = (self.ball.vel.x.abs() + BALL_ACCEL).min(BALL_MAX);
        let dir = if right_side { -1.0 } else { 1.0 };
        self.ball.vel.x = speed * dir;
        self.ball.vel.y = (self.ball.vel.y + offset * HIT_OFFSET + spin) * HIT_DAMP;
        self.ball.pos.x = if right_side {
            rect.min.x - BALL_R
        } else {
            rect.max.x + BALL_R
        };
        self.hit_cooldown = HIT_COOLDOWN;
        self.rally += 1;
        log::debug!("pong hit by {} offset={:.2} spin={:.1} speed={:.1}", if right_side { "right" } else { "left" }, offset, spin, speed);
    }

    fn point(&mut self, to_right: bool) {
        let scorer = if to_right { &mut self.right } else { &mut self.left };
        scorer.points += 1;
        let won = scorer.points >= self.win_score;
        log::debug!("pong point, {}-{}", self.left.points, self.right.points);
        if won {
            self.phase = Phase::Over;
            self.ball.vel = Vec2::ZERO;
            log::info!("pong over, {}-{} in {} mode", self.left.points, self.right.points, self.mode.name());
            return;
        }
        // Next serve heads to whoever just conceded
        self.serve(if to_right { -1.0 } else { 1.0 });
    }

    fn right_name(&self) -> &'static str {
        match self.mode {
            Mode::Spin => "P2",
            _ => "AI",
        }
    }

    fn render_field(&self, width: usize, height: usize) -> Vec<Line<'static>> {
        let bg = Color::Rgb(10, 12, 32);
        let mut c = Canvas::new(width, height, bg);
        let vp = Viewport::new(FIELD_W, FIELD_H, width, height);

        let mid = vp.col(FIELD_W / 2.0);
        for y in (0..height as i32).step_by(2) {
            c.put(mid, y, '┊', Color::Rgb(60, 60, 110));
        }

        for (paddle, color) in [(&self.left, Color::Cyan), (&self.right, Color::Magenta)] {
            let x0 = vp.col(paddle.x);
            let x1 = vp.col(paddle.x + PADDLE_W).max(x0 + 1);
            let y0 = vp.row(paddle.y);
            let y1 = vp.row(paddle.y + PADDLE_H).max(y0 + 1);
            c.fill(x0, y0, x1 - x0, y1 - y0, '█', Style::default().fg(color).bg(bg));
        }

        let fast = self.ball.vel.x.abs() > BALL_SPEED + 18.0;
        let ball_color = match (fast, self.ball.vel.x > 0.0) {
            (true, true) => Color::Rgb(255, 60, 200),
            (true, false) => Color::Rgb(60, 160, 255),
            _ => Color::White,
        };
        let (bx, by) = vp.cell(self.ball.pos);
        c.put_styled(bx, by, '●', Style::default().fg(ball_color).bg(bg).add_modifier(Modifier::BOLD));

        if self.phase == Phase::Ready {
            let style = Style::default().fg(Color::Yellow).bg(bg).add_modifier(Modifier::BOLD);
            c.text_centered(height as i32 / 3, &format!("Mode: {}  (M to change)", self.mode.name()), style);
            c.text_centered(height as i32 / 3 + 2, "Press SPACE to serve", style);
        }

        c.into_lines()
    }
}

impl Game for Pong {
    fn update(&mut self, dt: f32) {
        if self.phase != Phase::Playing {
            return;
        }
        self.left.tick(dt);
        self.right.tick(dt);
        self.hit_cooldown = (self.hit_cooldown - dt).max(0.0);
        match self.ball_state {
            BallState::Serving(t) => self.update_serve(t, dt),
            BallState::Moving => self.move_ball(dt),
        }
        self.drive_ai(dt);
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
            }
            Phase::Ready => match key.code {
                KeyCode::Char('m') | KeyCode::Char('M') => {
                    self.mode = self.mode.next();
                    log::debug!("pong mode {}", self.mode.name());
                }
                KeyCode::Char(' ') | KeyCode::Enter => {
                    let dir = self.serve_dir;
                    self.serve(dir);
                    self.phase = Phase::Playing;
                }
                _ => {}
            },
            Phase::Paused => {}
            Phase::Playing => {
                let two_player = self.mode.ai_factor().is_none();
                match key.code {
                    KeyCode::Char('w') | KeyCode::Char('W') => self.left.shift(-PADDLE_STEP),
                    KeyCode::Char('s') | KeyCode::Char('S') => self.left.shift(PADDLE_STEP),
                    KeyCode::Up if two_player => self.right.shift(-PADDLE_STEP),
                    KeyCode::Down if two_player => self.right.shift(PADDLE_STEP),
                    KeyCode::Up => self.left.shift(-PADDLE_STEP),
                    KeyCode::Down => self.left.shift(PADDLE_STEP),
                    _ => {}
                }
            }
        }
    }

    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let (status_area, field_area, help_area) =
            canvas::game_frame(frame, area, "🏓 Pong", Color::Rgb(0, 220, 255));

        let status = canvas::status_line(vec![
            (format!("Mode: {}", self.mode.name()), Color::Yellow),
            (format!("You: {}", self.left.points), Color::Cyan),
            (format!("{}: {}", self.right_name(), self.right.points), Color::Magenta),
            (format!("Rally: {}", self.rally), Color::Green),
            (format!("Speed: {:.0}", self.ball.speed()), Color::White),
            (format!("First to {}", self.win_score), Color::Gray),
        ]);
        frame.render_widget(Paragraph::new(status), status_area);

        let lines = self.render_field(field_area.width as usize, field_area.height as usize);
        frame.render_widget(Paragraph::new(lines), field_area);

        let help = match self.phase {
            Phase::Over => {
                let winner = if self.left.points >= self.win_score { "YOU WIN" } else { "YOU LOSE" };
                let headline = match self.mode {
                    Mode::Spin if self.left.points >= self.win_score => "🏁 P1 WINS!".to_string(),
                    Mode::Spin => "🏁 P2 WINS!".to_string(),
                    _ => format!("🏁 {}!", winner),
                };
                canvas::banner_line(
                    &headline,
                    Color::Yellow,
                    &format!("{}-{}. Press ENTER to play again, Esc for menu", self.left.points, self.right.points),
                )
            }
            Phase::Paused => canvas::banner_line("⏸ PAUSED", Color::Yellow, "Press P to resume"),
            Phase::Ready => canvas::hint_line(&[("M", "Mode"), ("SPACE", "Serve"), ("Esc", "Menu")]),
            Phase::Playing if self.mode == Mode::Spin => {
                canvas::hint_line(&[("W/S", "P1"), ("↑↓", "P2"), ("P", "Pause"), ("R", "Restart"), ("Esc", "Menu")])
            }
            Phase::Playing => canvas::hint_line(&[("W/S ↑↓", "Move"), ("P", "Pause"), ("R", "Restart"), ("Esc", "Menu")]),
        };
        frame.render_widget(Paragraph::new(help), help_area);
    }

    fn reset(&mut self) {
        let win_score = self.win_score;
        let mode = self.mode;
        let rng = StdRng::from_rng(&mut self.rng).unwrap_or_else(|_| StdRng::from_entropy());
        *self = Pong::with_rng(win_score, rng);
        self.mode = mode;
    }

    fn score(&self) -> u32 {
        self.left.points
    }

    fn phase(&self) -> Phase {
        self.phase
    }
}
