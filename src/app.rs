use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::config::Settings;
use crate::games::{Game, GameKind};
use crate::scores::{HighScores, NAME_LEN};

/// Tiles per row on the home screen.
pub const TILE_COLS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Home,
    Game(GameKind),
}

const TABS: [Tab; 11] = [
    Tab::Home,
    Tab::Game(GameKind::Breakout),
    Tab::Game(GameKind::Carrom),
    Tab::Game(GameKind::GilliDanda),
    Tab::Game(GameKind::Kabaddi),
    Tab::Game(GameKind::PacMan),
    Tab::Game(GameKind::Pithu),
    Tab::Game(GameKind::Pong),
    Tab::Game(GameKind::Snake),
    Tab::Game(GameKind::SnakesLadders),
    Tab::Game(GameKind::Tetris),
];

impl Tab {
    pub fn all() -> &'static [Tab] {
        &TABS
    }

    pub fn title(&self) -> String {
        match self {
            Tab::Home => " Home ".to_string(),
            Tab::Game(kind) => format!(" {} ", kind.name()),
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Tab::Home => 0,
            Tab::Game(kind) => kind.index() + 1,
        }
    }
}

pub struct App {
    pub should_quit: bool,
    pub current_tab: Tab,
    pub selected_game: usize,
    pub games: Vec<Box<dyn Game>>,
    pub high_scores: HighScores,
    pub show_high_scores: bool,
    // Name entry state
    pub entering_name: bool,
    pub name_buffer: String,
    pub name_game_idx: usize,
    pub name_score: u32,
    dt: f32,
}

impl App {
    pub fn new(settings: &Settings) -> Self {
        Self {
            should_quit: false,
            current_tab: Tab::Home,
            selected_game: 0,
            games: GameKind::ALL.iter().map(|kind| kind.build(settings)).collect(),
            high_scores: HighScores::load(settings.scores_file()),
            show_high_scores: false,
            entering_name: false,
            name_buffer: String::new(),
            name_game_idx: 0,
            name_score: 0,
            dt: settings.tick_dt(),
        }
    }

    /// The game shown in the current tab, if any.
    pub fn active_game(&mut self) -> Option<&mut Box<dyn Game>> {
        match self.current_tab {
            Tab::Home => None,
            Tab::Game(kind) => self.games.get_mut(kind.index()),
        }
    }

    pub fn on_tick(&mut self) {
        // Don't update games while entering a name
        if self.entering_name {
            return;
        }
        let dt = self.dt;
        if let Some(game) = self.active_game() {
            game.update(dt);
        }
        self.check_submit_scores();
    }

    fn check_submit_scores(&mut self) {
        for (idx, game) in self.games.iter().enumerate() {
            let game_over = game.is_game_over();
            let score = game.score();
            if game_over && score > 0 && !self.high_scores.was_submitted(idx) {
                self.high_scores.mark_submitted(idx);
                if self.high_scores.qualifies(idx, score) {
                    // Prompt for name entry
                    self.entering_name = true;
                    self.name_buffer.clear();
                    self.name_game_idx = idx;
                    self.name_score = score;
                    return; // Only one at a time
                }
            }
            if !game_over && self.high_scores.was_submitted(idx) {
                self.high_scores.clear_submitted(idx);
            }
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        // Ctrl+C always quits
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        // If entering a name, intercept all input
        if self.entering_name {
            self.handle_name_input(key);
            return;
        }

        // Global keys
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') if self.current_tab == Tab::Home => {
                self.should_quit = true;
                return;
            }
            KeyCode::Tab => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    self.prev_tab();
                } else {
                    self.next_tab();
                }
                return;
            }
            KeyCode::BackTab => {
                self.prev_tab();
                return;
            }
            KeyCode::Esc if self.current_tab != Tab::Home => {
                self.open(Tab::Home);
                return;
            }
            _ => {}
        }

        if self.current_tab == Tab::Home {
            if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT {
                self.handle_home_key(key);
            }
            return;
        }

        if let Some(game) = self.active_game() {
            game.handle_input(key);
        }
    }

    fn handle_home_key(&mut self, key: KeyEvent) {
        let count = GameKind::ALL.len();
        let rows = count.div_ceil(TILE_COLS);
        match key.code {
            // 1-9 launch the first nine games, 0 the tenth
            KeyCode::Char(c @ '0'..='9') => {
                let idx = match c.to_digit(10) {
                    Some(0) => 9,
                    Some(d) => d as usize - 1,
                    None => return,
                };
                if let Some(kind) = GameKind::from_index(idx) {
                    self.selected_game = idx;
                    self.open(Tab::Game(kind));
                }
            }
            KeyCode::Char('h') | KeyCode::Char('H') => {
                self.show_high_scores = !self.show_high_scores;
            }
            // Arrow keys move around the tile grid and wrap at the edges
            KeyCode::Right => {
                let row = self.selected_game / TILE_COLS;
                let col = (self.selected_game % TILE_COLS + 1) % TILE_COLS;
                self.selected_game = row * TILE_COLS + col;
            }
            KeyCode::Left => {
                let row = self.selected_game / TILE_COLS;
                let col = (self.selected_game % TILE_COLS + TILE_COLS - 1) % TILE_COLS;
                self.selected_game = row * TILE_COLS + col;
            }
            KeyCode::Down => {
                let row = (self.selected_game / TILE_COLS + 1) % rows;
                self.selected_game = (row * TILE_COLS + self.selected_game % TILE_COLS).min(count - 1);
            }
            KeyCode::Up => {
                let row = (self.selected_game / TILE_COLS + rows - 1) % rows;
                self.selected_game = (row * TILE_COLS + self.selected_game % TILE_COLS).min(count - 1);
            }
            KeyCode::Enter => {
                if let Some(kind) = GameKind::from_index(self.selected_game) {
                    self.open(Tab::Game(kind));
                }
            }
            _ => {}
        }
    }

    fn handle_name_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                let name = if self.name_buffer.is_empty() {
                    "???".to_string()
                } else {
                    self.name_buffer.clone()
                };
                self.finish_name_entry(&name);
            }
            KeyCode::Backspace => {
                self.name_buffer.pop();
            }
            KeyCode::Esc => {
                // Cancel: keep the score under a placeholder name
                self.finish_name_entry("???");
            }
            KeyCode::Char(c) => {
                if self.name_buffer.chars().count() < NAME_LEN && c.is_ascii_graphic() {
                    self.name_buffer.push(c.to_ascii_uppercase());
                }
            }
            _ => {}
        }
    }

    fn finish_name_entry(&mut self, name: &str) {
        self.high_scores.submit(self.name_game_idx, name, self.name_score);
        self.entering_name = false;
        self.name_buffer.clear();
    }

    fn open(&mut self, tab: Tab) {
        if tab != self.current_tab {
            match tab {
                Tab::Home => log::info!("back to home"),
                Tab::Game(kind) => log::info!("switching to {}", kind.name()),
            }
        }
        self.current_tab = tab;
    }

    fn next_tab(&mut self) {
        let tabs = Tab::all();
        let idx = self.current_tab.index();
        self.open(tabs[(idx + 1) % tabs.len()]);
    }

    fn prev_tab(&mut self) {
        let tabs = Tab::all();
        let idx = self.current_tab.index();
        self.open(tabs[(idx + tabs.len() - 1) % tabs.len()]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::Phase;
    use ratatui::prelude::*;
    use std::cell::Cell;
    use std::path::PathBuf;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Stand-in game whose phase and score the tests control.
    struct Scripted {
        phase: Phase,
        score: u32,
        ticks: Rc<Cell<u32>>,
        keys: Rc<Cell<u32>>,
    }

    impl Scripted {
        fn boxed(phase: Phase, score: u32) -> Box<dyn Game> {
            Box::new(Self { phase, score, ticks: Rc::default(), keys: Rc::default() })
        }
    }

    impl Game for Scripted {
        fn update(&mut self, _dt: f32) {
            self.ticks.set(self.ticks.get() + 1);
        }
        fn handle_input(&mut self, _key: KeyEvent) {
            self.keys.set(self.keys.get() + 1);
        }
        fn render(&mut self, _frame: &mut Frame, _area: Rect) {}
        fn reset(&mut self) {
            self.phase = Phase::Ready;
            self.score = 0;
        }
        fn score(&self) -> u32 {
            self.score
        }
        fn phase(&self) -> Phase {
            self.phase
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    struct Harness {
        app: App,
        path: PathBuf,
    }

    impl Drop for Harness {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    fn harness() -> Harness {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!("crewcade-app-test-{}-{}.scores", std::process::id(), n));
        let _ = std::fs::remove_file(&path);
        let settings = Settings { scores_path: Some(path.clone()), ..Settings::default() };
        Harness { app: App::new(&settings), path }
    }

    #[test]
    fn tab_cycles_through_home_and_every_game() {
        let mut h = harness();
        let a = &mut h.app;
        for kind in GameKind::ALL {
            a.on_key(key(KeyCode::Tab));
            assert_eq!(a.current_tab, Tab::Game(kind));
        }
        a.on_key(key(KeyCode::Tab));
        assert_eq!(a.current_tab, Tab::Home);
        a.on_key(key(KeyCode::BackTab));
        assert_eq!(a.current_tab, Tab::Game(GameKind::Tetris));
    }

    #[test]
    fn tab_titles_follow_game_names() {
        assert_eq!(Tab::all().len(), GameKind::ALL.len() + 1);
        assert_eq!(Tab::Home.title(), " Home ");
        assert_eq!(Tab::Game(GameKind::Pong).title(), format!(" {} ", GameKind::Pong.name()));
        for (i, tab) in Tab::all().iter().enumerate() {
            assert_eq!(tab.index(), i);
        }
    }

    #[test]
    fn digits_launch_games() {
        let mut h = harness();
        let a = &mut h.app;
        a.on_key(key(KeyCode::Char('2')));
        assert_eq!(a.current_tab, Tab::Game(GameKind::Carrom));
        a.on_key(key(KeyCode::Esc));
        assert_eq!(a.current_tab, Tab::Home);
        a.on_key(key(KeyCode::Char('0')));
        assert_eq!(a.current_tab, Tab::Game(GameKind::Tetris));
    }

    #[test]
    fn arrows_wrap_around_the_tile_grid() {
        let mut h = harness();
        let a = &mut h.app;
        a.on_key(key(KeyCode::Left));
        assert_eq!(a.selected_game, 4);
        a.on_key(key(KeyCode::Right));
        assert_eq!(a.selected_game, 0);
        a.on_key(key(KeyCode::Up));
        assert_eq!(a.selected_game, 5);
        a.on_key(key(KeyCode::Down));
        assert_eq!(a.selected_game, 0);
        a.selected_game = 7;
        a.on_key(key(KeyCode::Right));
        a.on_key(key(KeyCode::Right));
        a.on_key(key(KeyCode::Right));
        assert_eq!(a.selected_game, 5);
        a.on_key(key(KeyCode::Enter));
        assert_eq!(a.current_tab, Tab::Game(GameKind::Pithu));
    }

    #[test]
    fn q_quits_only_from_home() {
        let mut h = harness();
        let a = &mut h.app;
        a.on_key(key(KeyCode::Char('1')));
        a.on_key(key(KeyCode::Char('q')));
        assert!(!a.should_quit);
        a.on_key(key(KeyCode::Esc));
        a.on_key(key(KeyCode::Char('q')));
        assert!(a.should_quit);
    }

    #[test]
    fn ctrl_c_always_quits() {
        let mut h = harness();
        let a = &mut h.app;
        a.on_key(key(KeyCode::Char('5')));
        a.on_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(a.should_quit);
    }

    #[test]
    fn h_toggles_the_score_overlay() {
        let mut h = harness();
        let a = &mut h.app;
        a.on_key(key(KeyCode::Char('h')));
        assert!(a.show_high_scores);
        a.on_key(key(KeyCode::Char('h')));
        assert!(!a.show_high_scores);
    }

    #[test]
    fn only_the_visible_game_ticks_and_gets_keys() {
        let mut h = harness();
        let a = &mut h.app;
        let ticks: Vec<Rc<Cell<u32>>> = (0..2).map(|_| Rc::default()).collect();
        let keys: Vec<Rc<Cell<u32>>> = (0..2).map(|_| Rc::default()).collect();
        for i in 0..2 {
            a.games[i] = Box::new(Scripted {
                phase: Phase::Playing,
                score: 0,
                ticks: ticks[i].clone(),
                keys: keys[i].clone(),
            });
        }

        a.on_tick();
        assert_eq!(ticks[0].get(), 0);

        a.on_key(key(KeyCode::Char('1')));
        a.on_tick();
        a.on_tick();
        a.on_key(key(KeyCode::Char(' ')));
        assert_eq!((ticks[0].get(), keys[0].get()), (2, 1));
        assert_eq!((ticks[1].get(), keys[1].get()), (0, 0));
    }

    #[test]
    fn qualifying_result_prompts_for_a_name() {
        let mut h = harness();
        let a = &mut h.app;
        a.games[6] = Scripted::boxed(Phase::Over, 7);
        a.on_tick();
        assert!(a.entering_name);
        assert_eq!(a.name_game_idx, 6);
        assert_eq!(a.name_score, 7);

        for c in "ace pilot!".chars() {
            a.on_key(key(KeyCode::Char(c)));
        }
        assert_eq!(a.name_buffer, "ACEPILOT!");
        a.on_key(key(KeyCode::Backspace));
        a.on_key(key(KeyCode::Enter));
        assert!(!a.entering_name);
        assert_eq!(a.high_scores.top_scores(6)[0].name, "ACEPILOT");
        assert_eq!(a.high_scores.top_scores(6)[0].score, 7);

        // The same finished game is not offered twice
        a.on_tick();
        assert!(!a.entering_name);
    }

    #[test]
    fn name_entry_blocks_ticks_and_navigation() {
        let mut h = harness();
        let a = &mut h.app;
        let ticks: Rc<Cell<u32>> = Rc::default();
        a.games[0] = Box::new(Scripted { phase: Phase::Over, score: 3, ticks: ticks.clone(), keys: Rc::default() });
        a.current_tab = Tab::Game(GameKind::Breakout);
        a.on_tick();
        assert!(a.entering_name);
        a.on_tick();
        a.on_key(key(KeyCode::Tab));
        assert_eq!(ticks.get(), 1);
        assert_eq!(a.current_tab, Tab::Game(GameKind::Breakout));
    }

    #[test]
    fn escape_submits_a_placeholder_name() {
        let mut h = harness();
        let a = &mut h.app;
        a.games[9] = Scripted::boxed(Phase::Over, 1200);
        a.on_tick();
        a.on_key(key(KeyCode::Esc));
        assert!(!a.entering_name);
        assert_eq!(a.high_scores.top_scores(9)[0].name, "???");
    }

    #[test]
    fn restarted_game_can_submit_again() {
        let mut h = harness();
        let a = &mut h.app;
        a.games[2] = Scripted::boxed(Phase::Over, 50);
        a.on_tick();
        a.on_key(key(KeyCode::Enter));
        assert!(a.high_scores.was_submitted(2));
        assert_eq!(a.high_scores.top_scores(2)[0].name, "???");

        a.games[2].reset();
        a.on_tick();
        assert!(!a.high_scores.was_submitted(2));

        a.games[2] = Scripted::boxed(Phase::Over, 80);
        a.on_tick();
        assert!(a.entering_name);
    }

    #[test]
    fn zero_scores_are_never_offered() {
        let mut h = harness();
        let a = &mut h.app;
        a.games[3] = Scripted::boxed(Phase::Over, 0);
        a.on_tick();
        assert!(!a.entering_name);
    }
}
