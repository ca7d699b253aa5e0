//! Runtime settings
//!
//! Settings come from an optional JSON file and are then overridden by
//! command line flags.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Parser)]
#[command(name = "crewcade", version, about = "A terminal arcade of ten classic and traditional games")]
pub struct Cli {
    /// JSON settings file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Milliseconds per simulation tick
    #[arg(long)]
    pub tick_ms: Option<u64>,

    /// High score file location
    #[arg(long)]
    pub scores: Option<PathBuf>,

    /// Log file location (the terminal is owned by the UI)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Log level: off, error, warn, info, debug, trace
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub tick_ms: u64,
    pub scores_path: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub log_level: String,
    pub carrom_players: usize,
    pub ladders_players: usize,
    pub gilli_rounds: u32,
    pub pithu_rounds: u32,
    pub pong_win_score: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tick_ms: 16,
            scores_path: None,
            log_file: None,
            log_level: "warn".to_string(),
            carrom_players: 2,
            ladders_players: 2,
            gilli_rounds: 5,
            pithu_rounds: 5,
            pong_win_score: 11,
        }
    }
}

impl Settings {
    /// Build settings from the parsed command line, reading the config file if one was given.
    pub fn from_cli(cli: &Cli) -> Result<Self, AppError> {
        let mut settings = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Some(tick_ms) = cli.tick_ms {
            settings.tick_ms = tick_ms;
        }
        if let Some(scores) = &cli.scores {
            settings.scores_path = Some(scores.clone());
        }
        if let Some(log_file) = &cli.log_file {
            settings.log_file = Some(log_file.clone());
        }
        if let Some(level) = &cli.log_level {
            settings.log_level = level.clone();
        }
        Ok(settings.sanitized())
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text).map_err(|source| AppError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Settings>(text).map(Settings::sanitized)
    }

    /// Clamp values into the ranges the games support.
    pub fn sanitized(mut self) -> Self {
        self.tick_ms = self.tick_ms.clamp(5, 200);
        self.carrom_players = self.carrom_players.clamp(2, 4);
        self.ladders_players = self.ladders_players.clamp(2, 4);
        self.gilli_rounds = self.gilli_rounds.clamp(1, 20);
        self.pithu_rounds = self.pithu_rounds.clamp(1, 20);
        self.pong_win_score = self.pong_win_score.clamp(1, 99);
        self
    }

    /// Seconds simulated per tick.
    pub fn tick_dt(&self) -> f32 {
        self.tick_ms as f32 / 1000.0
    }

    pub fn level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Warn)
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("crewcade.log"))
    }

    pub fn scores_file(&self) -> PathBuf {
        if let Some(path) = &self.scores_path {
            return path.clone();
        }
        // Store next to the executable
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                return dir.join("crewcade.scores");
            }
        }
        PathBuf::from("crewcade.scores")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let s = Settings::parse(r#"{ "carrom_players": 4 }"#).unwrap();
        assert_eq!(s.carrom_players, 4);
        assert_eq!(s.tick_ms, 16);
        assert_eq!(s.pong_win_score, 11);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(Settings::parse(r#"{ "fps": 30 }"#).is_err());
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let s = Settings::parse(r#"{ "carrom_players": 9, "ladders_players": 0, "tick_ms": 1 }"#).unwrap();
        assert_eq!(s.carrom_players, 4);
        assert_eq!(s.ladders_players, 2);
        assert_eq!(s.tick_ms, 5);
    }

    #[test]
    fn cli_overrides_defaults() {
        let cli = Cli::parse_from(["crewcade", "--tick-ms", "20", "--log-level", "debug"]);
        let s = Settings::from_cli(&cli).unwrap();
        assert_eq!(s.tick_ms, 20);
        assert_eq!(s.level_filter(), LevelFilter::Debug);
        assert!((s.tick_dt() - 0.02).abs() < 1e-6);
    }

    #[test]
    fn bad_level_falls_back_to_warn() {
        let s = Settings {
            log_level: "chatty".into(),
            ..Settings::default()
        };
        assert_eq!(s.level_filter(), LevelFilter::Warn);
    }

    #[test]
    fn missing_config_file_is_an_io_error() {
        let cli = Cli::parse_from(["crewcade", "--config", "/definitely/not/here.json"]);
        assert!(matches!(Settings::from_cli(&cli), Err(AppError::Io(_))));
    }
}
