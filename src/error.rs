use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("IoError, reason='{0}'")]
    Io(#[from] std::io::Error),

    #[error("Could not parse config file '{path}', reason='{source}'")]
    Config {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Could not install logger, reason='{0}'")]
    Logger(#[from] log::SetLoggerError),

    #[error("Event channel closed")]
    EventChannelClosed,
}

#[derive(Debug, thiserror::Error)]
pub enum ScoresError {
    #[error("IoError, reason='{0}'")]
    Io(#[from] std::io::Error),

    #[error("Score file has an unknown header")]
    BadMagic,

    #[error("Score file truncated, len={len} expected={expected}")]
    Truncated { len: usize, expected: usize },
}
