use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::ScoresError;
use crate::games::GameKind;

const MAGIC: &[u8; 4] = b"CCS1";
pub const NUM_GAMES: usize = GameKind::ALL.len();
pub const SCORES_PER_GAME: usize = 3;
pub const NAME_LEN: usize = 9;
// Each entry: 9 bytes name + 4 bytes score = 13 bytes
const ENTRY_SIZE: usize = NAME_LEN + 4;
// File size: 4 magic + 30 * 13 = 394 bytes
const FILE_SIZE: usize = 4 + NUM_GAMES * SCORES_PER_GAME * ENTRY_SIZE;

type Table = [[ScoreEntry; SCORES_PER_GAME]; NUM_GAMES];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreEntry {
    pub name: String,
    pub score: u32,
}

#[derive(Debug, Clone)]
pub struct HighScores {
    scores: Table,
    path: PathBuf,
    /// Games whose current result has already been offered to the table,
    /// so one finished game is not submitted twice.
    submitted: [bool; NUM_GAMES],
}

impl HighScores {
    /// Load the table at `path`. A missing file gives an empty table; an
    /// unreadable or malformed one is logged and also gives an empty table.
    pub fn load(path: PathBuf) -> Self {
        let scores = match read_file(&path) {
            Ok(scores) => scores,
            Err(ScoresError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                log::debug!("no score file at {}, starting empty", path.display());
                Table::default()
            }
            Err(e) => {
                log::warn!("ignoring score file {}: {}", path.display(), e);
                Table::default()
            }
        };
        Self { scores, path, submitted: [false; NUM_GAMES] }
    }

    /// Would `score` make the top three for this game?
    pub fn qualifies(&self, game_idx: usize, score: u32) -> bool {
        if score == 0 {
            return false;
        }
        self.scores
            .get(game_idx)
            .is_some_and(|slots| slots.iter().any(|e| score > e.score))
    }

    /// Insert a score, shifting lower entries down, and persist the table.
    /// Returns true if it made the top three. A failed write is logged and
    /// the in-memory table keeps the new entry.
    pub fn submit(&mut self, game_idx: usize, name: &str, score: u32) -> bool {
        if score == 0 {
            return false;
        }
        let Some(slots) = self.scores.get_mut(game_idx) else {
            return false;
        };
        let Some(pos) = slots.iter().position(|e| score > e.score) else {
            return false;
        };

        let name: String = name.chars().take(NAME_LEN).collect();
        for i in (pos + 1..SCORES_PER_GAME).rev() {
            slots[i] = slots[i - 1].clone();
        }
        slots[pos] = ScoreEntry { name, score };
        log::info!("new high score for game {}: {} in slot {}", game_idx, score, pos + 1);

        if let Err(e) = write_file(&self.path, &self.scores) {
            log::warn!("could not save scores to {}: {}", self.path.display(), e);
        }
        true
    }

    pub fn top_scores(&self, game_idx: usize) -> Vec<ScoreEntry> {
        match self.scores.get(game_idx) {
            Some(slots) => slots.to_vec(),
            None => vec![ScoreEntry::default(); SCORES_PER_GAME],
        }
    }

    pub fn was_submitted(&self, game_idx: usize) -> bool {
        self.submitted.get(game_idx).copied().unwrap_or(false)
    }

    pub fn mark_submitted(&mut self, game_idx: usize) {
        if let Some(flag) = self.submitted.get_mut(game_idx) {
            *flag = true;
        }
    }

    /// Called once the game has been restarted.
    pub fn clear_submitted(&mut self, game_idx: usize) {
        if let Some(flag) = self.submitted.get_mut(game_idx) {
            *flag = false;
        }
    }
}

fn read_file(path: &Path) -> Result<Table, ScoresError> {
    let data = fs::read(path)?;
    if data.len() < MAGIC.len() || &data[..MAGIC.len()] != MAGIC {
        return Err(ScoresError::BadMagic);
    }
    if data.len() < FILE_SIZE {
        return Err(ScoresError::Truncated { len: data.len(), expected: FILE_SIZE });
    }

    let mut table = Table::default();
    let entries = data[MAGIC.len()..FILE_SIZE].chunks_exact(ENTRY_SIZE);
    for (i, chunk) in entries.enumerate() {
        let (name_bytes, score_bytes) = chunk.split_at(NAME_LEN);
        let name = String::from_utf8_lossy(name_bytes)
            .trim_end_matches('\0')
            .trim_end()
            .to_string();
        let mut raw = [0u8; 4];
        raw.copy_from_slice(score_bytes);
        table[i / SCORES_PER_GAME][i % SCORES_PER_GAME] = ScoreEntry { name, score: u32::from_le_bytes(raw) };
    }
    Ok(table)
}

fn write_file(path: &Path, table: &Table) -> Result<(), ScoresError> {
    let mut buf = Vec::with_capacity(FILE_SIZE);
    buf.extend_from_slice(MAGIC);
    for entry in table.iter().flatten() {
        // 9-byte name, zero padded
        let name_bytes = entry.name.as_bytes();
        let len = name_bytes.len().min(NAME_LEN);
        buf.extend_from_slice(&name_bytes[..len]);
        buf.resize(buf.len() + NAME_LEN - len, 0);
        buf.extend_from_slice(&entry.score.to_le_bytes());
    }
    fs::write(path, &buf)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn temp_path(tag: &str) -> PathBuf {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!("crewcade-test-{}-{}-{}.scores", std::process::id(), tag, n))
    }

    #[test]
    fn missing_file_loads_empty() {
        let hs = HighScores::load(temp_path("missing"));
        for game in 0..NUM_GAMES {
            assert!(hs.top_scores(game).iter().all(|e| e.score == 0));
        }
    }

    #[test]
    fn submissions_stay_sorted_and_drop_the_lowest() {
        let path = temp_path("sorted");
        let mut hs = HighScores::load(path.clone());
        assert!(hs.submit(2, "AAA", 100));
        assert!(hs.submit(2, "BBB", 300));
        assert!(hs.submit(2, "CCC", 200));
        assert!(hs.submit(2, "DDD", 250));
        let top: Vec<u32> = hs.top_scores(2).iter().map(|e| e.score).collect();
        assert_eq!(top, vec![300, 250, 200]);
        assert!(!hs.submit(2, "EEE", 150));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn table_survives_a_reload() {
        let path = temp_path("reload");
        let mut hs = HighScores::load(path.clone());
        hs.submit(0, "LONGERNAME", 42);
        hs.submit(9, "TET", 1200);

        let again = HighScores::load(path.clone());
        assert_eq!(again.top_scores(0)[0], ScoreEntry { name: "LONGERNAM".into(), score: 42 });
        assert_eq!(again.top_scores(9)[0].score, 1200);
        assert_eq!(fs::metadata(&path).map(|m| m.len() as usize).unwrap_or(0), FILE_SIZE);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn zero_and_out_of_range_never_qualify() {
        let mut hs = HighScores::load(temp_path("zero"));
        assert!(!hs.qualifies(0, 0));
        assert!(!hs.submit(0, "X", 0));
        assert!(!hs.qualifies(NUM_GAMES, 10));
        assert!(!hs.submit(NUM_GAMES, "X", 10));
        assert!(hs.qualifies(0, 1));
        assert_eq!(hs.top_scores(NUM_GAMES).len(), SCORES_PER_GAME);
    }

    #[test]
    fn wrong_header_is_rejected() {
        let path = temp_path("magic");
        fs::write(&path, b"RCS2 and some more bytes").unwrap();
        assert!(matches!(read_file(&path), Err(ScoresError::BadMagic)));
        let hs = HighScores::load(path.clone());
        assert_eq!(hs.top_scores(0)[0].score, 0);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn short_file_is_truncated() {
        let path = temp_path("short");
        fs::write(&path, b"CCS1\0\0\0").unwrap();
        match read_file(&path) {
            Err(ScoresError::Truncated { len, expected }) => {
                assert_eq!(len, 7);
                assert_eq!(expected, FILE_SIZE);
            }
            other => panic!("expected Truncated, got {:?}", other.map(|_| ())),
        }
        let _ = fs::remove_file(path);
    }

    #[test]
    fn unwritable_path_keeps_the_entry_in_memory() {
        let path = std::env::temp_dir().join("crewcade-no-such-dir").join("nested").join("x.scores");
        let mut hs = HighScores::load(path);
        assert!(hs.submit(4, "PAC", 500));
        assert_eq!(hs.top_scores(4)[0].score, 500);
    }

    #[test]
    fn submitted_flags_toggle() {
        let mut hs = HighScores::load(temp_path("flags"));
        assert!(!hs.was_submitted(3));
        hs.mark_submitted(3);
        assert!(hs.was_submitted(3));
        hs.clear_submitted(3);
        assert!(!hs.was_submitted(3));
        hs.mark_submitted(NUM_GAMES);
        assert!(!hs.was_submitted(NUM_GAMES));
    }
}
