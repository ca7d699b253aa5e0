use crossterm::event::{KeyCode, KeyEvent};
use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::games::canvas::{self, Canvas, Viewport};
use crate::games::{Game, Phase};
use crate::physics::Body;

/// Field length in metres.
const FIELD_M: f32 = 120.0;
/// Visible sky height in metres.
const SKY_M: f32 = 40.0;
const GRAVITY: f32 = 9.8;
const LAUNCH_X: f32 = 8.0;
const ANGLE_MIN: i32 = 15;
const ANGLE_MAX: i32 = 75;
const ANGLE_STEP: i32 = 2;
const METER_RATE: f32 = 120.0;
const STRIKE_TICKS: u32 = 10;
const BASE_WIND: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Stage {
    Aim,
    Power,
    Strike(u32),
    Flight,
    Landed,
}

pub struct GilliDanda {
    rounds: u32,
    round: u32,
    angle: i32,
    meter: f32,
    meter_rising: bool,
    power: f32,
    wind: f32,
    gilli: Body,
    trail: Vec<Vec2>,
    distances: Vec<f32>,
    total: u32,
    stage: Stage,
    phase: Phase,
    rng: StdRng,
}

impl GilliDanda {
    pub fn new(rounds: u32) -> Self {
        Self::with_rng(rounds, StdRng::from_entropy())
    }

    fn with_rng(rounds: u32, rng: StdRng) -> Self {
        let mut g = Self {
            rounds: rounds.max(1),
            round: 1,
            angle: 45,
            meter: 0.0,
            meter_rising: true,
            power: 0.0,
            wind: 0.0,
            gilli: Body::at_rest(Vec2::new(LAUNCH_X, 0.0)),
            trail: Vec::new(),
            distances: Vec::new(),
            total: 0,
            stage: Stage::Aim,
            phase: Phase::Ready,
            rng,
        };
        g.start_round();
        g
    }

    fn difficulty(&self) -> f32 {
        1.0 + 0.5 * (self.round as f32 - 1.0)
    }

    fn start_round(&mut self) {
        let spread = BASE_WIND * self.difficulty();
        self.wind = self.rng.gen_range(-spread..=spread);
        self.angle = 45;
        self.meter = 0.0;
        self.meter_rising = true;
        self.gilli = Body::at_rest(Vec2::new(LAUNCH_X, 0.0));
        self.trail.clear();
        self.stage = Stage::Aim;
        self.phase = Phase::Ready;
    }

    fn update_meter(&mut self, dt: f32) {
        let step = METER_RATE * dt;
        if self.meter_rising {
            self.meter += step;
            if self.meter >= 100.0 {
                self.meter = 100.0;
                self.meter_rising = false;
            }
        } else {
            self.meter -= step;
            if self.meter <= 0.0 {
                self.meter = 0.0;
                self.meter_rising = true;
            }
        }
    }

    fn launch(&mut self) {
        let v = 10.0 + self.power / 100.0 * 20.0;
        let rad = (self.angle as f32).to_radians();
        self.gilli.vel = Vec2::new(v * rad.cos() + self.wind, v * rad.sin());
        self.stage = Stage::Flight;
    }

    fn update_flight(&mut self, dt: f32) {
        // Height grows upwards here, so gravity pulls negative
        self.gilli.apply_gravity(-GRAVITY, dt);
        self.gilli.step(dt);
        if self.trail.last().map_or(true, |p| p.distance(self.gilli.pos) > 1.0) {
            self.trail.push(self.gilli.pos);
        }

        let out_of_field = self.gilli.pos.x >= FIELD_M || self.gilli.pos.x <= 0.0;
        if self.gilli.pos.y <= 0.0 || out_of_field {
            self.gilli.pos.y = 0.0;
            self.gilli.pos.x = self.gilli.pos.x.clamp(0.0, FIELD_M);
            self.gilli.vel = Vec2::ZERO;
            self.land();
        }
    }

    fn land(&mut self) {
        let distance = (self.gilli.pos.x - LAUNCH_X).max(0.0);
        self.distances.push(distance);
        self.total += distance.round() as u32;
        log::debug!("gilli round {} landed at {:.1} m (wind {:.1})", self.round, distance, self.wind);
        if self.round >= self.rounds {
            self.stage = Stage::Landed;
            self.phase = Phase::Over;
            log::info!("gilli danda over, total={}", self.total);
        } else {
            self.stage = Stage::Landed;
            self.phase = Phase::Ready;
        }
    }

    fn best(&self) -> f32 {
        self.distances.iter().copied().fold(0.0, f32::max)
    }

    fn render_field(&self, width: usize, height: usize) -> Vec<Line<'static>> {
        let sky = Color::Rgb(135, 206, 235);
        let mut c = Canvas::new(width, height, sky);
        let ground_rows = 2;
        let air_rows = height.saturating_sub(ground_rows).max(1);
        let vp = Viewport::new(FIELD_M, SKY_M, width, air_rows);
        let to_cell = |p: Vec2| -> (i32, i32) {
            let (x, y) = vp.cell(Vec2::new(p.x, SKY_M - p.y));
            (x, y.min(air_rows as i32 - 1))
        };

        let grass = Style::default().fg(Color::Rgb(40, 120, 70)).bg(Color::Rgb(60, 179, 113));
        c.fill(0, air_rows as i32, width as i32, ground_rows as i32, '▒', grass);
        for m in (10..(FIELD_M - LAUNCH_X) as i32).step_by(10) {
            let x = vp.col(LAUNCH_X + m as f32);
            let label = format!("{}m", m);
            c.put_styled(x, air_rows as i32, '┴', grass);
            c.text(x, air_rows as i32 + 1, &label, Style::default().fg(Color::Black).bg(Color::Rgb(60, 179, 113)));
        }

        for (i, d) in self.distances.iter().enumerate() {
            let x = vp.col(LAUNCH_X + d);
            let ch = if i + 1 == self.distances.len() { '⚑' } else { '|' };
            c.put(x, air_rows as i32 - 1, ch, Color::Rgb(220, 20, 60));
        }

        for p in &self.trail {
            let (x, y) = to_cell(*p);
            c.put_if_empty(x, y, '·', Color::Rgb(90, 90, 90));
        }

        // Danda: a stick leaning at the launch point, raised while swinging
        let (lx, ly) = to_cell(Vec2::new(LAUNCH_X, 0.0));
        let danda = match self.stage {
            Stage::Strike(t) if t < STRIKE_TICKS / 2 => '╲',
            Stage::Strike(_) => '╱',
            _ => '╲',
        };
        c.put(lx - 2, ly, danda, Color::Rgb(101, 67, 33));
        c.put(lx - 3, ly - 1, danda, Color::Rgb(101, 67, 33));
        c.put(lx - 1, ly, '☺', Color::Black);

        if matches!(self.stage, Stage::Aim | Stage::Power) {
            let rad = (self.angle as f32).to_radians();
            for i in 1..6 {
                let p = Vec2::new(LAUNCH_X, 0.0) + Vec2::new(rad.cos(), rad.sin()) * (i as f32 * 2.5);
                let (x, y) = to_cell(p);
                c.put_if_empty(x, y, '∙', Color::Rgb(255, 236, 139));
            }
        }

        let (gx, gy) = to_cell(self.gilli.pos);
        c.put_styled(gx, gy, '◆', Style::default().fg(Color::Rgb(101, 67, 33)).bg(sky).add_modifier(Modifier::BOLD));

        let arrow = if self.wind > 0.05 {
            "→"
        } else if self.wind < -0.05 {
            "←"
        } else {
            "-"
        };
        c.text(
            width as i32 - 20,
            0,
            &format!("Wind {} {:.1} m/s", arrow, self.wind.abs()),
            Style::default().fg(Color::Rgb(20, 20, 80)).bg(sky).add_modifier(Modifier::BOLD),
        );

        c.into_lines()
    }
}

impl Game for GilliDanda {
    fn update(&mut self, dt: f32) {
        if self.phase == Phase::Paused {
            return;
        }
        match self.stage {
            Stage::Power => self.update_meter(dt),
            Stage::Strike(t) => {
                if t + 1 >= STRIKE_TICKS {
                    self.launch();
                } else {
                    self.stage = Stage::Strike(t + 1);
                }
            }
            Stage::Flight => self.update_flight(dt),
            Stage::Aim | Stage::Landed => {}
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
        match (self.stage, key.code) {
            (Stage::Aim, KeyCode::Left) => self.angle = (self.angle - ANGLE_STEP).max(ANGLE_MIN),
            (Stage::Aim, KeyCode::Right) => self.angle = (self.angle + ANGLE_STEP).min(ANGLE_MAX),
            (Stage::Aim, KeyCode::Char(' ')) => {
                self.stage = Stage::Power;
                self.phase = Phase::Playing;
            }
            (Stage::Power, KeyCode::Char(' ')) => {
                self.power = self.meter;
                self.stage = Stage::Strike(0);
            }
            (Stage::Landed, KeyCode::Enter) => {
                self.round += 1;
                self.start_round();
            }
            _ => {}
        }
    }

    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let (status_area, field_area, help_area) =
            canvas::game_frame(frame, area, "🏏 Gilli Danda", Color::Rgb(120, 200, 110));

        let filled = (self.meter / 10.0).round() as usize;
        let meter = format!("{}{}", "█".repeat(filled), "░".repeat(10 - filled.min(10)));
        let status = canvas::status_line(vec![
            (format!("Round: {}/{}", self.round.min(self.rounds), self.rounds), Color::Cyan),
            (format!("Angle: {}°", self.angle), Color::Yellow),
            (format!("Power: {} {:>3.0}", meter, self.meter), Color::Magenta),
            (format!("Last: {:.1} m", self.distances.last().copied().unwrap_or(0.0)), Color::Green),
            (format!("Best: {:.1} m", self.best()), Color::Green),
            (format!("Score: {}", self.total), Color::Yellow),
        ]);
        frame.render_widget(Paragraph::new(status), status_area);

        let lines = self.render_field(field_area.width as usize, field_area.height as usize);
        frame.render_widget(Paragraph::new(lines), field_area);

        let help = match (self.phase, self.stage) {
            (Phase::Over, _) => canvas::banner_line(
                "🏁 MATCH OVER!",
                Color::Yellow,
                &format!("Total {} m. Press ENTER to play again, Esc for menu", self.total),
            ),
            (Phase::Paused, _) => canvas::banner_line("⏸ PAUSED", Color::Yellow, "Press P to resume"),
            (_, Stage::Aim) => canvas::hint_line(&[("←→", "Angle"), ("SPACE", "Start meter"), ("P", "Pause"), ("Esc", "Menu")]),
            (_, Stage::Power) => canvas::hint_line(&[("SPACE", "Strike!")]),
            (_, Stage::Landed) => canvas::hint_line(&[("ENTER", "Next round"), ("R", "Restart"), ("Esc", "Menu")]),
            _ => Line::from(""),
        };
        frame.render_widget(Paragraph::new(help), help_area);
    }

    fn reset(&mut self) {
        let rounds = self.rounds;
        let rng = StdRng::from_rng(&mut self.rng).unwrap_or_else(|_| StdRng::from_entropy());
        *self = GilliDanda::with_rng(rounds, rng);
    }

    fn score(&self) -> u32 {
        self.total
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

    fn game(rounds: u32) -> GilliDanda {
        GilliDanda::with_rng(rounds, StdRng::seed_from_u64(11))
    }

    fn fly(g: &mut GilliDanda) {
        for _ in 0..60 * 30 {
            g.update(DT);
            if g.stage == Stage::Landed {
                return;
            }
        }
        panic!("gilli never landed");
    }

    #[test]
    fn angle_stays_within_limits() {
        let mut g = game(1);
        for _ in 0..50 {
            g.handle_input(key(KeyCode::Right));
        }
        assert_eq!(g.angle, ANGLE_MAX);
        for _ in 0..50 {
            g.handle_input(key(KeyCode::Left));
        }
        assert_eq!(g.angle, ANGLE_MIN);
    }

    #[test]
    fn meter_bounces_between_zero_and_hundred() {
        let mut g = game(1);
        g.handle_input(key(KeyCode::Char(' ')));
        assert_eq!(g.stage, Stage::Power);
        let mut peak = 0.0f32;
        for _ in 0..120 {
            g.update(DT);
            peak = peak.max(g.meter);
            assert!((0.0..=100.0).contains(&g.meter));
        }
        assert_eq!(peak, 100.0);
        assert!(g.meter < 100.0, "meter turns around after the top");
    }

    #[test]
    fn calm_shot_matches_projectile_range() {
        let mut g = game(1);
        g.wind = 0.0;
        g.stage = Stage::Power;
        g.phase = Phase::Playing;
        g.meter = 50.0;
        g.handle_input(key(KeyCode::Char(' ')));
        for _ in 0..STRIKE_TICKS {
            g.update(DT);
        }
        assert_eq!(g.stage, Stage::Flight);
        fly(&mut g);
        // v = 20 m/s at 45 degrees: range v^2 / g
        let expected = 20.0 * 20.0 / GRAVITY;
        let got = g.distances[0];
        assert!((got - expected).abs() < 1.5, "got {got}, expected {expected}");
        assert_eq!(g.score(), got.round() as u32);
    }

    #[test]
    fn strong_headwind_never_scores_negative() {
        let mut g = game(1);
        g.wind = -15.0;
        g.angle = ANGLE_MAX;
        g.power = 0.0;
        g.launch();
        fly(&mut g);
        assert_eq!(g.distances[0], 0.0);
        assert_eq!(g.score(), 0);
    }

    #[test]
    fn wind_widens_with_each_round() {
        let mut g = game(10);
        for round in 1..=10 {
            g.round = round;
            g.start_round();
            assert!(g.wind.abs() <= BASE_WIND * g.difficulty() + 1e-4);
        }
        g.round = 5;
        assert_eq!(g.difficulty(), 3.0);
    }

    #[test]
    fn match_ends_after_the_last_round() {
        let mut g = game(2);
        for round in 1..=2 {
            assert_eq!(g.round, round);
            g.launch();
            fly(&mut g);
            if round < 2 {
                assert_eq!(g.phase(), Phase::Ready);
                g.handle_input(key(KeyCode::Enter));
                assert_eq!(g.stage, Stage::Aim);
            }
        }
        assert!(g.is_game_over());
        assert_eq!(g.distances.len(), 2);
    }
}
