pub mod breakout;
pub mod canvas;
pub mod carrom;
pub mod gilli_danda;
pub mod kabaddi;
pub mod pacman;
pub mod pithu;
pub mod pong;
pub mod snake;
pub mod snakes_ladders;
pub mod tetris;

use crossterm::event::KeyEvent;
use ratatui::prelude::*;

use crate::config::Settings;

/// Coarse state every game moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the player to serve, launch, roll or aim.
    Ready,
    Playing,
    Paused,
    Over,
}

impl Phase {
    pub fn toggle_pause(self) -> Self {
        match self {
            Phase::Playing => Phase::Paused,
            Phase::Paused => Phase::Playing,
            other => other,
        }
    }
}

pub trait Game {
    /// Advance the simulation by one tick of `dt` seconds.
    fn update(&mut self, dt: f32);
    fn handle_input(&mut self, key: KeyEvent);
    fn render(&mut self, frame: &mut Frame, area: Rect);
    fn reset(&mut self);
    fn score(&self) -> u32;
    fn phase(&self) -> Phase;

    fn is_game_over(&self) -> bool {
        self.phase() == Phase::Over
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameKind {
    Breakout,
    Carrom,
    GilliDanda,
    Kabaddi,
    PacMan,
    Pithu,
    Pong,
    Snake,
    SnakesLadders,
    Tetris,
}

impl GameKind {
    pub const ALL: [GameKind; 10] = [
        GameKind::Breakout,
        GameKind::Carrom,
        GameKind::GilliDanda,
        GameKind::Kabaddi,
        GameKind::PacMan,
        GameKind::Pithu,
        GameKind::Pong,
        GameKind::Snake,
        GameKind::SnakesLadders,
        GameKind::Tetris,
    ];

    pub fn index(self) -> usize {
        match self {
            GameKind::Breakout => 0,
            GameKind::Carrom => 1,
            GameKind::GilliDanda => 2,
            GameKind::Kabaddi => 3,
            GameKind::PacMan => 4,
            GameKind::Pithu => 5,
            GameKind::Pong => 6,
            GameKind::Snake => 7,
            GameKind::SnakesLadders => 8,
            GameKind::Tetris => 9,
        }
    }

    pub fn from_index(idx: usize) -> Option<GameKind> {
        Self::ALL.get(idx).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            GameKind::Breakout => "Breakout",
            GameKind::Carrom => "Carrom",
            GameKind::GilliDanda => "Gilli Danda",
            GameKind::Kabaddi => "Kabaddi",
            GameKind::PacMan => "Pac-Man",
            GameKind::Pithu => "Pithu",
            GameKind::Pong => "Pong",
            GameKind::Snake => "Snake",
            GameKind::SnakesLadders => "Ladders",
            GameKind::Tetris => "Tetris",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            GameKind::Breakout => "🧱",
            GameKind::Carrom => "🎯",
            GameKind::GilliDanda => "🏏",
            GameKind::Kabaddi => "🤼",
            GameKind::PacMan => "ᗧ",
            GameKind::Pithu => "🪨",
            GameKind::Pong => "🏓",
            GameKind::Snake => "🐍",
            GameKind::SnakesLadders => "🎲",
            GameKind::Tetris => "🟪",
        }
    }

    pub fn blurb(self) -> &'static str {
        match self {
            GameKind::Breakout => "Smash bricks,\ncatch power-ups",
            GameKind::Carrom => "Flick the striker,\npocket your coins",
            GameKind::GilliDanda => "Strike the gilli\nas far as it goes",
            GameKind::Kabaddi => "Raid, tag and\nget back alive",
            GameKind::PacMan => "Eat every dot,\ndodge the ghosts",
            GameKind::Pithu => "Rebuild the seven\nstones under fire",
            GameKind::Pong => "First to eleven\nwins the rally",
            GameKind::Snake => "Eat, grow and\ndon't bite yourself",
            GameKind::SnakesLadders => "Roll, climb and\nslide to 100",
            GameKind::Tetris => "Stack and clear\nfull lines",
        }
    }

    pub fn color(self) -> Color {
        match self {
            GameKind::Breakout => Color::Rgb(220, 80, 80),
            GameKind::Carrom => Color::Rgb(210, 170, 110),
            GameKind::GilliDanda => Color::Rgb(120, 200, 110),
            GameKind::Kabaddi => Color::Rgb(255, 140, 60),
            GameKind::PacMan => Color::Rgb(255, 230, 60),
            GameKind::Pithu => Color::Rgb(180, 140, 100),
            GameKind::Pong => Color::Rgb(80, 220, 255),
            GameKind::Snake => Color::Rgb(90, 230, 120),
            GameKind::SnakesLadders => Color::Rgb(240, 180, 70),
            GameKind::Tetris => Color::Rgb(180, 110, 255),
        }
    }

    /// Key bindings shown on the home screen.
    pub fn controls(self) -> &'static [(&'static str, &'static str)] {
        match self {
            GameKind::Breakout => &[("← / →", "Move paddle"), ("Space / ↑", "Launch ball")],
            GameKind::Carrom => &[
                ("A / D", "Slide striker"),
                ("← / →", "Aim"),
                ("↑ / ↓", "Power"),
                ("Space", "Strike"),
            ],
            GameKind::GilliDanda => &[("← / →", "Launch angle"), ("Space", "Meter / strike"), ("Enter", "Next round")],
            GameKind::Kabaddi => &[
                ("Arrows", "Move raider"),
                ("Space", "Tag defenders"),
                ("Enter", "Start / retreat"),
                ("S", "Substitute raider"),
            ],
            GameKind::PacMan => &[("Arrows", "Steer")],
            GameKind::Pithu => &[("Arrows", "Move rebuilder"), ("Space / E", "Place stone"), ("Enter", "Start round")],
            GameKind::Pong => &[
                ("W / S", "Left paddle"),
                ("↑ / ↓", "Right paddle (2P)"),
                ("M", "Change mode"),
                ("Space", "Serve"),
            ],
            GameKind::Snake => &[("Arrows / WASD", "Turn")],
            GameKind::SnakesLadders => &[("Space / Enter", "Roll dice")],
            GameKind::Tetris => &[
                ("← / →", "Move"),
                ("↑", "Rotate"),
                ("↓ / Space", "Soft / hard drop"),
                ("C", "Hold piece"),
            ],
        }
    }

    pub fn build(self, settings: &Settings) -> Box<dyn Game> {
        match self {
            GameKind::Breakout => Box::new(breakout::Breakout::new()),
            GameKind::Carrom => Box::new(carrom::Carrom::new(settings.carrom_players)),
            GameKind::GilliDanda => Box::new(gilli_danda::GilliDanda::new(settings.gilli_rounds)),
            GameKind::Kabaddi => Box::new(kabaddi::Kabaddi::new()),
            GameKind::PacMan => Box::new(pacman::PacMan::new()),
            GameKind::Pithu => Box::new(pithu::Pithu::new(settings.pithu_rounds)),
            GameKind::Pong => Box::new(pong::Pong::new(settings.pong_win_score)),
            GameKind::Snake => Box::new(snake::Snake::new()),
            GameKind::SnakesLadders => Box::new(snakes_ladders::SnakesLadders::new(settings.ladders_players)),
            GameKind::Tetris => Box::new(tetris::Tetris::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_round_trips_through_all() {
        for (i, kind) in GameKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
            assert_eq!(GameKind::from_index(i), Some(*kind));
        }
        assert_eq!(GameKind::from_index(10), None);
    }

    #[test]
    fn every_game_builds_and_starts_fresh() {
        let settings = Settings::default();
        for kind in GameKind::ALL {
            let game = kind.build(&settings);
            assert_eq!(game.score(), 0, "{} starts with a score", kind.name());
            assert!(!game.is_game_over(), "{} starts over", kind.name());
        }
    }

    #[test]
    fn pause_toggle_only_affects_live_phases() {
        assert_eq!(Phase::Playing.toggle_pause(), Phase::Paused);
        assert_eq!(Phase::Paused.toggle_pause(), Phase::Playing);
        assert_eq!(Phase::Over.toggle_pause(), Phase::Over);
        assert_eq!(Phase::Ready.toggle_pause(), Phase::Ready);
    }
}
