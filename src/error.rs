use thiserror::Error;

/// Failures talking to the leaderboard database.
#[derive(Debug, Error)]
pub enum LeaderboardError {
    #[error("leaderboard database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to prepare leaderboard directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("leaderboard worker is no longer running")]
    WorkerGone,
}

/// Failures loading or choosing a passage.
#[derive(Debug, Error)]
pub enum PassageError {
    #[error("no embedded passage file for category {0}")]
    Missing(String),
    #[error("passage file {file} is not valid json: {source}")]
    Malformed {
        file: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("category {0} has no passages")]
    Empty(String),
    #[error("custom category selected but no custom passage was provided")]
    NoCustomText,
}

/// Failures reading or writing the json side files (config, achievements).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
