use crossterm::event::{KeyCode, KeyEvent};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::games::canvas::{self, Canvas};
use crate::games::{Game, Phase};

const SIDE: u32 = 10;
const LAST: u32 = SIDE * SIDE;
const STEP_TICKS: u32 = 8;
const CELL_W: i32 = 6;
const CELL_H: i32 = 2;

/// Snake head to tail.
const SNAKES: [(u32, u32); 10] = [
    (99, 7),
    (95, 75),
    (92, 36),
    (89, 53),
    (74, 33),
    (64, 60),
    (62, 19),
    (49, 11),
    (46, 25),
    (16, 6),
];

/// Ladder foot to top.
const LADDERS: [(u32, u32); 11] = [
    (2, 38),
    (7, 14),
    (8, 31),
    (15, 26),
    (21, 42),
    (28, 84),
    (36, 44),
    (51, 67),
    (71, 91),
    (78, 98),
    (87, 94),
];

const SEATS: [(&str, Color); 4] = [
    ("Player 1", Color::Red),
    ("Player 2", Color::Blue),
    ("Player 3", Color::Green),
    ("Player 4", Color::Rgb(255, 165, 0)),
];

fn ladder_from(square: u32) -> Option<u32> {
    LADDERS.iter().find(|(foot, _)| *foot == square).map(|(_, top)| *top)
}

fn snake_from(square: u32) -> Option<u32> {
    SNAKES.iter().find(|(head, _)| *head == square).map(|(_, tail)| *tail)
}

/// Grid cell of a square, row 0 at the top. Square 1 sits bottom left and
/// the numbering snakes back and forth up the board.
fn board_cell(square: u32) -> (i32, i32) {
    let n = square.clamp(1, LAST) - 1;
    let from_bottom = n / SIDE;
    let along = n % SIDE;
    let col = if from_bottom % 2 == 0 { along } else { SIDE - 1 - along };
    (col as i32, (SIDE - 1 - from_bottom) as i32)
}

#[derive(Debug, Clone, Copy)]
struct Token {
    square: u32,
    rolls: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Turn {
    /// Waiting for the current seat to roll.
    Idle,
    /// Walking one square at a time towards `target`.
    Stepping { target: u32, ticks: u32 },
}

pub struct SnakesLadders {
    tokens: Vec<Token>,
    current: usize,
    last_roll: Option<u32>,
    turn: Turn,
    message: String,
    winner: Option<usize>,
    phase: Phase,
    rng: StdRng,
}

impl SnakesLadders {
    pub fn new(players: usize) -> Self {
        Self::with_rng(players, StdRng::from_entropy())
    }

    fn with_rng(players: usize, rng: StdRng) -> Self {
        let players = players.clamp(2, SEATS.len());
        Self {
            tokens: vec![Token { square: 0, rolls: 0 }; players],
            current: 0,
            last_roll: None,
            turn: Turn::Idle,
            message: format!("{} to roll", SEATS[0].0),
            winner: None,
            phase: Phase::Ready,
            rng,
        }
    }

    fn roll(&mut self) {
        let dice = self.rng.gen_range(1..=6);
        self.start_move(dice);
    }

    fn start_move(&mut self, dice: u32) {
        self.last_roll = Some(dice);
        self.phase = Phase::Playing;
        let token = &mut self.tokens[self.current];
        token.rolls += 1;
        let target = token.square + dice;
        log::debug!("{} rolled {} from {}", SEATS[self.current].0, dice, token.square);
        if target > LAST {
            // Tokens never rest on a snake or ladder, so there is nothing to resolve
            self.message = format!("{} rolled {}: needs an exact roll", SEATS[self.current].0, dice);
            self.turn = Turn::Idle;
            self.next_seat();
        } else {
            self.turn = Turn::Stepping { target, ticks: 0 };
        }
    }

    fn finish_move(&mut self) {
        self.turn = Turn::Idle;
        let name = SEATS[self.current].0;
        let token = &mut self.tokens[self.current];
        let from = token.square;
        let jump = ladder_from(from)
            .map(|top| (format!("Ladder! {} climbs from {} to {}", name, from, top), top))
            .or_else(|| snake_from(from).map(|tail| (format!("Snake! {} slides from {} to {}", name, from, tail), tail)));
        let jumped = jump.is_some();
        if let Some((message, square)) = jump {
            log::debug!("{}", message);
            token.square = square;
            self.message = message;
        }

        if token.square == LAST {
            self.winner = Some(self.current);
            self.phase = Phase::Over;
            self.message = format!("{} wins in {} rolls!", name, token.rolls);
            log::info!("snakes & ladders won by {} after {} rolls", name, token.rolls);
            return;
        }

        self.next_seat();
        if !jumped {
            self.message = format!("{} to roll", SEATS[self.current].0);
        }
    }

    fn next_seat(&mut self) {
        self.current = (self.current + 1) % self.tokens.len();
    }

    fn render_board(&self) -> Vec<Line<'static>> {
        let bg = Color::Rgb(250, 240, 215);
        let width = (SIDE as i32 * CELL_W) as usize;
        let height = (SIDE as i32 * CELL_H) as usize;
        let mut c = Canvas::new(width, height, bg);

        for square in 1..=LAST {
            let (col, row) = board_cell(square);
            let (x, y) = (col * CELL_W, row * CELL_H);
            let shade = if (col + row) % 2 == 0 { Color::Rgb(250, 240, 215) } else { Color::Rgb(235, 215, 175) };
            c.fill(x, y, CELL_W, CELL_H, ' ', Style::default().bg(shade));

            let (mark, mark_color) = if let Some(top) = ladder_from(square) {
                (format!("↑{}", top), Color::Rgb(0, 130, 0))
            } else if let Some(tail) = snake_from(square) {
                (format!("↓{}", tail), Color::Rgb(200, 0, 0))
            } else {
                (String::new(), Color::Black)
            };
            c.text(x, y, &format!("{:>3}", square), Style::default().fg(Color::Rgb(90, 90, 90)).bg(shade));
            if !mark.is_empty() {
                c.text(x + 3, y, &mark, Style::default().fg(mark_color).bg(shade).add_modifier(Modifier::BOLD));
            }

            for (i, token) in self.tokens.iter().enumerate() {
                if token.square == square {
                    c.put_styled(
                        x + 1 + i as i32,
                        y + 1,
                        '●',
                        Style::default().fg(SEATS[i].1).bg(shade).add_modifier(Modifier::BOLD),
                    );
                }
            }
        }
        c.into_lines()
    }
}

impl Game for SnakesLadders {
    fn update(&mut self, _dt: f32) {
        if self.phase != Phase::Playing {
            return;
        }
        if let Turn::Stepping { target, ticks } = self.turn {
            if ticks + 1 < STEP_TICKS {
                self.turn = Turn::Stepping { target, ticks: ticks + 1 };
                return;
            }
            let token = &mut self.tokens[self.current];
            token.square += 1;
            if token.square >= target {
                self.finish_move();
            } else {
                self.turn = Turn::Stepping { target, ticks: 0 };
            }
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
            }
            Phase::Ready | Phase::Playing => {
                if matches!(key.code, KeyCode::Char(' ') | KeyCode::Enter) && self.turn == Turn::Idle {
                    self.roll();
                }
            }
            Phase::Paused => {}
        }
    }

    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let (status_area, field_area, help_area) =
            canvas::game_frame(frame, area, "🎲 Snakes & Ladders", Color::Rgb(0, 180, 90));

        let dice = match self.last_roll {
            Some(n @ 1..=6) => ['⚀', '⚁', '⚂', '⚃', '⚄', '⚅'][n as usize - 1].to_string(),
            _ => "-".to_string(),
        };
        let mut items = vec![(format!("Turn: {}", SEATS[self.current].0), SEATS[self.current].1), (format!("Dice: {}", dice), Color::White)];
        for (i, token) in self.tokens.iter().enumerate() {
            items.push((format!("P{}: {}", i + 1, token.square), SEATS[i].1));
        }
        frame.render_widget(Paragraph::new(canvas::status_line(items)), status_area);

        let [board_area, info_area] =
            Layout::vertical([Constraint::Length((SIDE as i32 * CELL_H) as u16), Constraint::Min(1)]).areas(field_area);
        let w = (SIDE as i32 * CELL_W) as u16;
        let board_rect = Rect {
            x: board_area.x + board_area.width.saturating_sub(w) / 2,
            width: w.min(board_area.width),
            ..board_area
        };
        frame.render_widget(Paragraph::new(self.render_board()), board_rect);
        frame.render_widget(
            Paragraph::new(Line::from(self.message.clone()).style(Style::default().fg(Color::Yellow))).alignment(Alignment::Center),
            info_area,
        );

        let help = match self.phase {
            Phase::Over => canvas::banner_line(
                "🏁 GAME OVER!",
                Color::Yellow,
                &format!("{} Press ENTER to play again, Esc for menu", self.message),
            ),
            Phase::Paused => canvas::banner_line("⏸ PAUSED", Color::Yellow, "Press P to resume"),
            _ => canvas::hint_line(&[("SPACE", "Roll"), ("P", "Pause"), ("R", "Restart"), ("Esc", "Menu")]),
        };
        frame.render_widget(Paragraph::new(help), help_area);
    }

    fn reset(&mut self) {
        let players = self.tokens.len();
        let rng = StdRng::from_rng(&mut self.rng).unwrap_or_else(|_| StdRng::from_entropy());
        *self = SnakesLadders::with_rng(players, rng);
    }

    /// Only a win by the first seat counts towards the table, fewer rolls
    /// scoring higher.
    fn score(&self) -> u32 {
        match self.winner {
            Some(0) => 1000u32.saturating_sub(10 * self.tokens[0].rolls).max(10),
            _ => 0,
        }
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

    fn game(players: usize) -> SnakesLadders {
        SnakesLadders::with_rng(players, StdRng::seed_from_u64(21))
    }

    fn settle(g: &mut SnakesLadders) {
        for _ in 0..STEP_TICKS * 7 {
            g.update(1.0 / 60.0);
        }
        assert_eq!(g.turn, Turn::Idle);
    }

    #[test]
    fn board_snakes_back_and_forth() {
        assert_eq!(board_cell(1), (0, 9));
        assert_eq!(board_cell(10), (9, 9));
        assert_eq!(board_cell(11), (9, 8));
        assert_eq!(board_cell(20), (0, 8));
        assert_eq!(board_cell(100), (0, 0));
    }

    #[test]
    fn tables_never_overlap() {
        for (head, tail) in SNAKES {
            assert!(head > tail && head <= LAST);
            assert!(ladder_from(head).is_none());
        }
        for (foot, top) in LADDERS {
            assert!(top > foot && top <= LAST);
        }
    }

    #[test]
    fn seat_count_is_clamped() {
        assert_eq!(game(1).tokens.len(), 2);
        assert_eq!(game(9).tokens.len(), 4);
    }

    #[test]
    fn token_steps_one_square_every_eight_ticks() {
        let mut g = game(2);
        g.start_move(3);
        for _ in 0..STEP_TICKS - 1 {
            g.update(1.0 / 60.0);
        }
        assert_eq!(g.tokens[0].square, 0);
        g.update(1.0 / 60.0);
        assert_eq!(g.tokens[0].square, 1);
        settle(&mut g);
        assert_eq!(g.tokens[0].square, 3);
        assert_eq!(g.current, 1);
    }

    #[test]
    fn ladders_climb_and_snakes_slide() {
        let mut g = game(2);
        g.start_move(2);
        settle(&mut g);
        assert_eq!(g.tokens[0].square, 38);

        g.tokens[1].square = 10;
        g.start_move(6);
        settle(&mut g);
        assert_eq!(g.tokens[1].square, 6);
    }

    #[test]
    fn only_one_jump_per_move() {
        let mut g = game(2);
        // 99 slides to 7, which is itself a ladder foot
        g.tokens[0].square = 97;
        g.start_move(2);
        settle(&mut g);
        assert_eq!(g.tokens[0].square, 7);
    }

    #[test]
    fn overshooting_stays_put() {
        let mut g = game(2);
        g.tokens[0].square = 97;
        g.start_move(5);
        assert_eq!(g.turn, Turn::Idle);
        assert_eq!(g.tokens[0].square, 97);
        assert_eq!(g.current, 1);
    }

    #[test]
    fn rolling_waits_for_the_token() {
        let mut g = game(2);
        g.handle_input(key(KeyCode::Char(' ')));
        assert_eq!(g.phase(), Phase::Playing);
        assert!(matches!(g.turn, Turn::Stepping { .. }));
        let rolls = g.tokens[0].rolls;
        g.handle_input(key(KeyCode::Char(' ')));
        assert_eq!(g.tokens[0].rolls, rolls);
        assert!(g.last_roll.is_some_and(|d| (1..=6).contains(&d)));
    }

    #[test]
    fn first_seat_win_scores_by_rolls() {
        let mut g = game(3);
        g.tokens[0].square = 96;
        g.tokens[0].rolls = 20;
        g.start_move(4);
        settle(&mut g);
        assert!(g.is_game_over());
        assert_eq!(g.winner, Some(0));
        assert_eq!(g.score(), 1000 - 10 * 21);
    }

    #[test]
    fn slow_win_still_scores_ten() {
        let mut g = game(2);
        g.tokens[0].rolls = 500;
        g.tokens[0].square = 98;
        g.start_move(2);
        settle(&mut g);
        assert_eq!(g.score(), 10);
    }

    #[test]
    fn other_seat_win_scores_nothing() {
        let mut g = game(2);
        g.current = 1;
        g.tokens[1].square = 94;
        g.start_move(6);
        settle(&mut g);
        assert!(g.is_game_over());
        assert_eq!(g.winner, Some(1));
        assert_eq!(g.score(), 0);
    }

    #[test]
    fn turns_rotate_through_every_seat() {
        let mut g = game(4);
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(g.current);
            // 3 and 4 have no snake or ladder from 0
            g.start_move(if g.current % 2 == 0 { 3 } else { 4 });
            settle(&mut g);
        }
        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert_eq!(g.current, 0);
    }
}
