use crossterm::event::{KeyCode, KeyEvent};
use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::games::canvas::{self, Canvas, Viewport};
use crate::games::{Game, Phase};
use crate::physics::{Aabb, Circle};

const COURT_W: f32 = 100.0;
const COURT_H: f32 = 50.0;
const MID_X: f32 = COURT_W / 2.0;
const PLAYER_R: f32 = 1.5;
/// Centre distance within which a raider's hand reaches a defender.
const TAG_REACH: f32 = PLAYER_R * 2.0;
const ON_COURT: usize = 5;
const SQUAD: usize = 7;
const HALF_SECS: f32 = 60.0;
const HALVES: u32 = 2;
const SUBS_PER_HALF: u32 = 2;
const BREATH_MAX: f32 = 100.0;
const BREATH_DRAIN: f32 = 5.0;
const RAIDER_SPEED: f32 = 24.0;
const BURST_SECS: f32 = 0.2;
const DEFENDER_SPEED: f32 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Red,
    Blue,
}

impl Side {
    fn name(self) -> &'static str {
        match self {
            Side::Red => "Red",
            Side::Blue => "Blue",
        }
    }

    fn color(self) -> Color {
        match self {
            Side::Red => Color::Rgb(216, 67, 21),
            Side::Blue => Color::Rgb(25, 118, 210),
        }
    }

    fn other(self) -> Side {
        match self {
            Side::Red => Side::Blue,
            Side::Blue => Side::Red,
        }
    }

    fn owns(self, x: f32) -> bool {
        match self {
            Side::Red => x < MID_X,
            Side::Blue => x > MID_X,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Active,
    Out,
    Bench,
}

#[derive(Debug, Clone)]
struct Player {
    pos: Vec2,
    home: Vec2,
    status: Status,
    tagged: bool,
    jersey: u8,
}

#[derive(Debug, Clone)]
struct Team {
    side: Side,
    players: Vec<Player>,
    score: u32,
    subs_left: u32,
}

impl Team {
    fn new(side: Side) -> Self {
        let home_x = match side {
            Side::Red => 12.0,
            Side::Blue => COURT_W - 12.0,
        };
        let players = (0..SQUAD)
            .map(|i| {
                let home = Vec2::new(home_x, 7.0 + (i % ON_COURT) as f32 * 9.0);
                Player {
                    pos: home,
                    home,
                    status: if i < ON_COURT { Status::Active } else { Status::Bench },
                    tagged: false,
                    jersey: i as u8 + 1,
                }
            })
            .collect();
        Self { side, players, score: 0, subs_left: SUBS_PER_HALF }
    }

    fn active(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.status == Status::Active)
    }

    fn active_count(&self) -> usize {
        self.active().count()
    }

    fn revive(&mut self) {
        for p in self.players.iter_mut().filter(|p| p.status == Status::Out) {
            p.status = Status::Active;
            p.pos = p.home;
        }
    }

    fn regroup(&mut self) {
        for p in self.players.iter_mut() {
            p.tagged = false;
            p.pos = p.home;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RaidEnd {
    Retreat,
    Tackled,
    Breathless,
    OutOfCourt,
    Whistle,
}

pub struct Kabaddi {
    red: Team,
    blue: Team,
    half: u32,
    clock: f32,
    raider: usize,
    breath: f32,
    burst: Option<(Vec2, f32)>,
    /// Per-defender reaction factor for the current raid.
    reactions: Vec<f32>,
    raid_points: u32,
    message: String,
    phase: Phase,
    rng: StdRng,
}

impl Kabaddi {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    fn with_rng(rng: StdRng) -> Self {
        let mut k = Self {
            red: Team::new(Side::Red),
            blue: Team::new(Side::Blue),
            half: 1,
            clock: HALF_SECS,
            raider: 0,
            breath: BREATH_MAX,
            burst: None,
            reactions: Vec::new(),
            raid_points: 0,
            message: String::from("Red raids first. Press ENTER to start the raid"),
            phase: Phase::Ready,
            rng,
        };
        k.line_up_raider();
        k
    }

    fn attacking_side(&self) -> Side {
        if self.half % 2 == 1 {
            Side::Red
        } else {
            Side::Blue
        }
    }

    fn teams_mut(&mut self) -> (&mut Team, &mut Team) {
        match self.attacking_side() {
            Side::Red => (&mut self.red, &mut self.blue),
            Side::Blue => (&mut self.blue, &mut self.red),
        }
    }

    fn attackers(&self) -> &Team {
        match self.attacking_side() {
            Side::Red => &self.red,
            Side::Blue => &self.blue,
        }
    }

    fn defenders(&self) -> &Team {
        match self.attacking_side() {
            Side::Red => &self.blue,
            Side::Blue => &self.red,
        }
    }

    fn raider_pos(&self) -> Vec2 {
        self.attackers().players[self.raider].pos
    }

    /// Pick the next active attacker as raider and put them at the mid line.
    fn line_up_raider(&mut self) {
        let side = self.attacking_side();
        let current = self.raider;
        let (att, _) = self.teams_mut();
        att.regroup();
        let n = att.players.len();
        let next = (1..=n)
            .map(|step| (current + step) % n)
            .find(|&i| att.players[i].status == Status::Active);
        let Some(next) = next else {
            return;
        };
        let start_x = match side {
            Side::Red => MID_X - 6.0,
            Side::Blue => MID_X + 6.0,
        };
        att.players[next].pos = Vec2::new(start_x, COURT_H / 2.0);
        self.raider = next;
        self.breath = BREATH_MAX;
        self.burst = None;
    }

    fn start_raid(&mut self) {
        let (_, def) = self.teams_mut();
        def.regroup();
        let count = self.defenders().players.len();
        self.reactions = (0..count).map(|_| self.rng.gen_range(0.6..1.0)).collect();
        self.phase = Phase::Playing;
        self.message = format!("Kabaddi, kabaddi... raider #{}", self.attackers().players[self.raider].jersey);
    }

    fn substitute(&mut self) {
        let raider = self.raider;
        let (att, _) = self.teams_mut();
        if att.subs_left == 0 {
            return;
        }
        let Some(bench) = att.players.iter().position(|p| p.status == Status::Bench) else {
            return;
        };
        att.subs_left -= 1;
        let pos = att.players[raider].pos;
        att.players[raider].status = Status::Bench;
        att.players[raider].pos = att.players[raider].home;
        att.players[bench].status = Status::Active;
        att.players[bench].pos = pos;
        let jersey = att.players[bench].jersey;
        let left = att.subs_left;
        self.raider = bench;
        self.message = format!("Substitute #{} comes in to raid ({} left)", jersey, left);
    }

    fn tag(&mut self) {
        let raider = Circle::new(self.raider_pos(), TAG_REACH);
        let (_, def) = self.teams_mut();
        let mut tagged = 0;
        for p in def.players.iter_mut().filter(|p| p.status == Status::Active && !p.tagged) {
            if raider.center.distance(p.pos) <= raider.radius {
                p.tagged = true;
                tagged += 1;
            }
        }
        if tagged > 0 {
            log::debug!("kabaddi raider tagged {} defender(s)", tagged);
        }
    }

    fn move_defenders(&mut self, dt: f32) {
        let raider = self.raider_pos();
        let def_side = self.attacking_side().other();
        let chase = def_side.owns(raider.x);
        let reactions = self.reactions.clone();
        let (_, def) = self.teams_mut();
        for (i, p) in def.players.iter_mut().enumerate() {
            if p.status != Status::Active {
                continue;
            }
            let target = if chase { raider } else { p.home };
            let to = target - p.pos;
            let reaction = reactions.get(i).copied().unwrap_or(1.0);
            let step = DEFENDER_SPEED * reaction * dt;
            if to.length() > step {
                p.pos += to.normalize() * step;
            } else {
                p.pos = target;
            }
            // Defenders never cross into the raiding half
            p.pos.x = match def_side {
                Side::Red => p.pos.x.clamp(PLAYER_R, MID_X - PLAYER_R),
                Side::Blue => p.pos.x.clamp(MID_X + PLAYER_R, COURT_W - PLAYER_R),
            };
        }
    }

    fn step_raid(&mut self, dt: f32) {
        self.clock = (self.clock - dt).max(0.0);
        self.breath = (self.breath - BREATH_DRAIN * dt).max(0.0);

        if let Some((dir, left)) = self.burst {
            let raider = self.raider;
            let (att, _) = self.teams_mut();
            att.players[raider].pos += dir * RAIDER_SPEED * dt.min(left);
            self.burst = if left > dt { Some((dir, left - dt)) } else { None };
        }

        let pos = self.raider_pos();
        let side = self.attacking_side();
        if !Aabb::new(0.0, 0.0, COURT_W, COURT_H).contains(pos) {
            self.end_raid(RaidEnd::OutOfCourt);
            return;
        }
        if self.breath <= 0.0 {
            self.end_raid(RaidEnd::Breathless);
            return;
        }

        self.move_defenders(dt);

        if !side.owns(pos.x) {
            let body = Circle::new(pos, PLAYER_R);
            let caught = self
                .defenders()
                .active()
                .any(|p| body.overlaps_circle(&Circle::new(p.pos, PLAYER_R)));
            if caught {
                self.end_raid(RaidEnd::Tackled);
                return;
            }
        }

        if self.clock <= 0.0 {
            self.end_raid(RaidEnd::Whistle);
        }
    }

    fn end_raid(&mut self, outcome: RaidEnd) {
        let raider = self.raider;
        let side = self.attacking_side();
        let mut earned = 0;
        let (att, def) = self.teams_mut();
        let mut text = match outcome {
            RaidEnd::Retreat => {
                let tags = def.players.iter().filter(|p| p.tagged && p.status == Status::Active).count() as u32;
                let points = 1 + tags;
                for p in def.players.iter_mut().filter(|p| p.tagged) {
                    p.status = Status::Out;
                }
                att.score += points;
                earned += points;
                format!("Raid successful! {} +{}", side.name(), points)
            }
            RaidEnd::Whistle => String::from("Whistle! Half time"),
            RaidEnd::Tackled | RaidEnd::Breathless | RaidEnd::OutOfCourt => {
                att.players[raider].status = Status::Out;
                def.score += 1;
                let why = match outcome {
                    RaidEnd::Tackled => "Tackled",
                    RaidEnd::Breathless => "Out of breath",
                    _ => "Stepped out of the court",
                };
                format!("{}! {} +1", why, side.other().name())
            }
        };

        if def.active_count() == 0 {
            att.score += 2;
            def.revive();
            earned += 2;
            text.push_str(" | ALL OUT +2");
        }
        if att.active_count() == 0 {
            def.score += 2;
            att.revive();
            text.push_str(" | attackers all out");
        }
        self.raid_points += earned;
        log::debug!("kabaddi raid ended: {:?}, red={} blue={}", outcome, self.red.score, self.blue.score);
        self.message = text;
        self.burst = None;

        if self.clock <= 0.0 {
            self.next_half();
        } else {
            self.phase = Phase::Ready;
            self.line_up_raider();
        }
    }

    fn next_half(&mut self) {
        if self.half >= HALVES {
            self.phase = Phase::Over;
            let winner = match self.red.score.cmp(&self.blue.score) {
                std::cmp::Ordering::Greater => "Red wins",
                std::cmp::Ordering::Less => "Blue wins",
                std::cmp::Ordering::Equal => "It's a tie",
            };
            self.message = format!("Full time: {}", winner);
            log::info!("kabaddi over, red={} blue={}", self.red.score, self.blue.score);
            return;
        }
        self.half += 1;
        self.clock = HALF_SECS;
        for team in [&mut self.red, &mut self.blue] {
            for (i, p) in team.players.iter_mut().enumerate() {
                p.status = if i < ON_COURT { Status::Active } else { Status::Bench };
            }
            team.regroup();
            team.subs_left = SUBS_PER_HALF;
        }
        self.raider = SQUAD - 1;
        self.phase = Phase::Ready;
        self.line_up_raider();
        self.message = format!("Second half: {} raids. Press ENTER", self.attacking_side().name());
    }

    fn render_court(&self, width: usize, height: usize) -> Vec<Line<'static>> {
        let sand = Color::Rgb(200, 170, 120);
        let mut c = Canvas::new(width, height, sand);
        let vp = Viewport::new(COURT_W, COURT_H, width, height);
        c.frame(0, 0, width as i32, height as i32, Color::White);
        let mid = vp.col(MID_X);
        for y in 1..height as i32 - 1 {
            c.put(mid, y, '┃', Color::White);
        }
        // Baulk lines
        for x in [MID_X - 15.0, MID_X + 15.0] {
            let col = vp.col(x);
            for y in (1..height as i32 - 1).step_by(2) {
                c.put(col, y, '┊', Color::Rgb(240, 230, 200));
            }
        }

        for team in [&self.red, &self.blue] {
            let raiding = team.side == self.attacking_side();
            for (i, p) in team.players.iter().enumerate() {
                if p.status != Status::Active {
                    continue;
                }
                let (x, y) = vp.cell(p.pos);
                let is_raider = raiding && i == self.raider;
                let bg = if is_raider {
                    if self.breath > 25.0 {
                        Color::Rgb(0, 188, 212)
                    } else {
                        Color::Rgb(255, 82, 82)
                    }
                } else if p.tagged {
                    Color::Rgb(255, 214, 0)
                } else {
                    team.side.color()
                };
                let label = std::char::from_digit(p.jersey as u32, 10).unwrap_or('?');
                c.put_styled(x, y, label, Style::default().fg(Color::White).bg(bg).add_modifier(Modifier::BOLD));
            }
        }

        c.into_lines()
    }
}

impl Game for Kabaddi {
    fn update(&mut self, dt: f32) {
        if self.phase == Phase::Playing {
            self.step_raid(dt);
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
                    KeyCode::Enter => self.start_raid(),
                    KeyCode::Char('s') | KeyCode::Char('S') => self.substitute(),
                    _ => {}
                },
                Phase::Playing => match key.code {
                    KeyCode::Up => self.burst = Some((Vec2::NEG_Y, BURST_SECS)),
                    KeyCode::Down => self.burst = Some((Vec2::Y, BURST_SECS)),
                    KeyCode::Left => self.burst = Some((Vec2::NEG_X, BURST_SECS)),
                    KeyCode::Right => self.burst = Some((Vec2::X, BURST_SECS)),
                    KeyCode::Char(' ') => self.tag(),
                    KeyCode::Enter if self.attacking_side().owns(self.raider_pos().x) => {
                        self.end_raid(RaidEnd::Retreat)
                    }
                    _ => {}
                },
                Phase::Paused => {}
            },
        }
    }

    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let (status_area, field_area, help_area) =
            canvas::game_frame(frame, area, "🤼 Kabaddi", Color::Rgb(255, 140, 60));

        let breath_cells = (self.breath / 10.0).ceil() as usize;
        let status = canvas::status_line(vec![
            (format!("Red {}", self.red.score), Side::Red.color()),
            (format!("Blue {}", self.blue.score), Side::Blue.color()),
            (format!("Half {}/{} ⏱ {:>2.0}s", self.half, HALVES, self.clock.ceil()), Color::Cyan),
            (format!("{} raids", self.attacking_side().name()), self.attacking_side().color()),
            (
                format!("Breath {}{}", "█".repeat(breath_cells), "░".repeat(10usize.saturating_sub(breath_cells))),
                if self.breath > 25.0 { Color::Cyan } else { Color::Red },
            ),
            (format!("Subs {}", self.attackers().subs_left), Color::Gray),
        ]);
        frame.render_widget(Paragraph::new(status), status_area);

        let lines = self.render_court(field_area.width as usize, field_area.height as usize);
        frame.render_widget(Paragraph::new(lines), field_area);

        let help = match self.phase {
            Phase::Over => canvas::banner_line("🏁 FULL TIME!", Color::Yellow, &format!("{}. ENTER to play again", self.message)),
            Phase::Paused => canvas::banner_line("⏸ PAUSED", Color::Yellow, "Press P to resume"),
            Phase::Ready => canvas::banner_line("▶", Color::Green, &format!("{} │ ENTER raid │ S substitute", self.message)),
            Phase::Playing => canvas::hint_line(&[("Arrows", "Move"), ("SPACE", "Tag"), ("ENTER", "Retreat (own half)"), ("P", "Pause")]),
        };
        frame.render_widget(Paragraph::new(help), help_area);
    }

    fn reset(&mut self) {
        let rng = StdRng::from_rng(&mut self.rng).unwrap_or_else(|_| StdRng::from_entropy());
        *self = Kabaddi::with_rng(rng);
    }

    fn score(&self) -> u32 {
        self.raid_points
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

    fn raiding() -> Kabaddi {
        let mut k = Kabaddi::with_rng(StdRng::seed_from_u64(5));
        k.handle_input(key(KeyCode::Enter));
        assert_eq!(k.phase(), Phase::Playing);
        k
    }

    fn set_raider(k: &mut Kabaddi, pos: Vec2) {
        let r = k.raider;
        let (att, _) = k.teams_mut();
        att.players[r].pos = pos;
    }

    #[test]
    fn red_raids_first_from_its_own_half() {
        let k = Kabaddi::with_rng(StdRng::seed_from_u64(1));
        assert_eq!(k.attacking_side(), Side::Red);
        assert!(k.raider_pos().x < MID_X);
        assert_eq!(k.red.active_count(), ON_COURT);
        assert_eq!(k.phase(), Phase::Ready);
    }

    #[test]
    fn breath_drains_while_raiding() {
        let mut k = raiding();
        for _ in 0..60 {
            k.update(DT);
        }
        assert!((k.breath - 95.0).abs() < 0.1);
    }

    #[test]
    fn running_out_of_breath_gives_defenders_a_point() {
        let mut k = raiding();
        k.breath = 0.01;
        k.update(DT);
        assert_eq!(k.blue.score, 1);
        assert_eq!(k.red.active_count(), ON_COURT - 1);
        assert_eq!(k.phase(), Phase::Ready);
    }

    #[test]
    fn arrow_press_moves_raider_in_a_burst() {
        let mut k = raiding();
        let start = k.raider_pos();
        k.handle_input(key(KeyCode::Right));
        for _ in 0..30 {
            k.update(DT);
        }
        let moved = k.raider_pos().x - start.x;
        assert!((moved - RAIDER_SPEED * BURST_SECS).abs() < 0.1, "moved {moved}");
    }

    #[test]
    fn tag_and_retreat_scores_and_puts_defenders_out() {
        let mut k = raiding();
        let target = k.blue.players[0].pos;
        set_raider(&mut k, target - Vec2::new(PLAYER_R * 1.8, 0.0));
        k.handle_input(key(KeyCode::Char(' ')));
        assert!(k.blue.players[0].tagged);
        set_raider(&mut k, Vec2::new(MID_X - 5.0, COURT_H / 2.0));
        k.handle_input(key(KeyCode::Enter));
        assert_eq!(k.red.score, 2);
        assert_eq!(k.score(), 2);
        assert_eq!(k.blue.players[0].status, Status::Out);
        assert_eq!(k.phase(), Phase::Ready);
    }

    #[test]
    fn retreat_is_refused_in_the_opponent_half() {
        let mut k = raiding();
        set_raider(&mut k, Vec2::new(MID_X + 10.0, 5.0));
        k.handle_input(key(KeyCode::Enter));
        assert_eq!(k.phase(), Phase::Playing);
    }

    #[test]
    fn immediate_retreat_still_scores_a_point() {
        let mut k = raiding();
        k.handle_input(key(KeyCode::Enter));
        assert_eq!(k.red.score, 1);
        assert_eq!(k.score(), 1);
        assert_eq!(k.phase(), Phase::Ready);
    }

    #[test]
    fn tag_only_reaches_two_radii() {
        let mut k = raiding();
        let target = k.blue.players[0].pos;
        set_raider(&mut k, target - Vec2::new(PLAYER_R * 2.5, 0.0));
        k.handle_input(key(KeyCode::Char(' ')));
        assert!(!k.blue.players[0].tagged);
        assert_eq!(k.phase(), Phase::Playing);

        set_raider(&mut k, target - Vec2::new(PLAYER_R * 3.5, 0.0));
        k.handle_input(key(KeyCode::Char(' ')));
        assert!(!k.blue.players[0].tagged);

        set_raider(&mut k, target - Vec2::new(PLAYER_R * 1.9, 0.0));
        k.handle_input(key(KeyCode::Char(' ')));
        assert!(k.blue.players[0].tagged);
    }

    #[test]
    fn defender_contact_tackles_the_raider() {
        let mut k = raiding();
        let pos = Vec2::new(MID_X + 20.0, COURT_H / 2.0);
        set_raider(&mut k, pos);
        k.blue.players[2].pos = pos + Vec2::new(0.5, 0.0);
        k.update(DT);
        assert_eq!(k.blue.score, 1);
        assert_eq!(k.phase(), Phase::Ready);
    }

    #[test]
    fn stepping_out_of_court_loses_the_raid() {
        let mut k = raiding();
        set_raider(&mut k, Vec2::new(MID_X - 5.0, -1.0));
        k.update(DT);
        assert_eq!(k.blue.score, 1);
    }

    #[test]
    fn all_out_bonus_revives_defenders() {
        let mut k = raiding();
        for p in k.blue.players.iter_mut().skip(1) {
            if p.status == Status::Active {
                p.status = Status::Out;
            }
        }
        k.blue.players[0].tagged = true;
        set_raider(&mut k, Vec2::new(MID_X - 5.0, COURT_H / 2.0));
        k.handle_input(key(KeyCode::Enter));
        assert_eq!(k.red.score, 1 + 1 + 2);
        assert_eq!(k.blue.active_count(), ON_COURT);
    }

    #[test]
    fn only_two_substitutions_per_half() {
        let mut k = Kabaddi::with_rng(StdRng::seed_from_u64(2));
        for _ in 0..4 {
            k.handle_input(key(KeyCode::Char('s')));
        }
        assert_eq!(k.red.subs_left, 0);
        assert_eq!(k.red.players.iter().filter(|p| p.status == Status::Bench).count(), 2);
        assert_eq!(k.red.active_count(), ON_COURT);
    }

    #[test]
    fn halves_swap_raiders_then_the_match_ends() {
        let mut k = raiding();
        k.clock = DT / 2.0;
        k.update(DT);
        assert_eq!(k.half, 2);
        assert_eq!(k.attacking_side(), Side::Blue);
        assert!(k.raider_pos().x > MID_X);
        k.handle_input(key(KeyCode::Enter));
        k.clock = DT / 2.0;
        k.update(DT);
        assert!(k.is_game_over());
    }
}
