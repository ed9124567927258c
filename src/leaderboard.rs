use std::path::Path;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::config::Difficulty;
use crate::error::LeaderboardError;
use crate::passages::Category;

/// Rows shown on the leaderboard.
pub const LEADERBOARD_LIMIT: usize = 10;

/// One finished race. Built once at the finished transition and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    pub player_name: String,
    pub wpm: u32,
    pub accuracy: u32,
    pub text_id: String,
    pub difficulty: Difficulty,
    pub category: Category,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderboardQuery {
    pub limit: usize,
    pub difficulty: Option<Difficulty>,
    pub category: Option<Category>,
}

impl Default for LeaderboardQuery {
    fn default() -> Self {
        Self {
            limit: LEADERBOARD_LIMIT,
            difficulty: None,
            category: None,
        }
    }
}

impl LeaderboardQuery {
    pub fn filtered(difficulty: Difficulty, category: Category) -> Self {
        Self {
            difficulty: Some(difficulty),
            category: Some(category),
            ..Self::default()
        }
    }

    pub fn is_filtered(&self) -> bool {
        self.difficulty.is_some() || self.category.is_some()
    }
}

/// Storage for race results.
pub trait LeaderboardStore {
    fn insert_race_result(&mut self, result: &RaceResult) -> Result<(), LeaderboardError>;

    /// Best results first (descending wpm), at most `query.limit` rows.
    fn query_top_results(&self, query: &LeaderboardQuery)
        -> Result<Vec<RaceResult>, LeaderboardError>;
}

#[derive(Debug)]
pub struct SqliteLeaderboard {
    conn: Connection,
}

impl SqliteLeaderboard {
    /// Opens (and creates if needed) the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LeaderboardError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, LeaderboardError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, LeaderboardError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS typing_races (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                player_name TEXT NOT NULL,
                wpm INTEGER NOT NULL,
                accuracy INTEGER NOT NULL,
                text_id TEXT NOT NULL,
                difficulty TEXT NOT NULL,
                text_category TEXT NOT NULL,
                completed_at TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_typing_races_wpm ON typing_races(wpm DESC)",
            [],
        )?;

        Ok(Self { conn })
    }

    pub fn count(&self) -> Result<usize, LeaderboardError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM typing_races", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

fn invalid_column(idx: usize, name: &str) -> rusqlite::Error {
    rusqlite::Error::InvalidColumnType(idx, name.to_string(), rusqlite::types::Type::Text)
}

fn result_from_row(row: &Row<'_>) -> rusqlite::Result<RaceResult> {
    let difficulty: String = row.get(4)?;
    let category: String = row.get(5)?;
    let completed_at: String = row.get(6)?;

    Ok(RaceResult {
        player_name: row.get(0)?,
        wpm: row.get(1)?,
        accuracy: row.get(2)?,
        text_id: row.get(3)?,
        difficulty: Difficulty::from_str(&difficulty, true)
            .map_err(|_| invalid_column(4, "difficulty"))?,
        category: Category::from_str(&category, true)
            .map_err(|_| invalid_column(5, "text_category"))?,
        completed_at: DateTime::parse_from_rfc3339(&completed_at)
            .map_err(|_| invalid_column(6, "completed_at"))?
            .with_timezone(&Utc),
    })
}

impl LeaderboardStore for SqliteLeaderboard {
    fn insert_race_result(&mut self, result: &RaceResult) -> Result<(), LeaderboardError> {
        self.conn.execute(
            r#"
            INSERT INTO typing_races
            (player_name, wpm, accuracy, text_id, difficulty, text_category, completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                result.player_name,
                result.wpm,
                result.accuracy,
                result.text_id,
                result.difficulty.to_string(),
                result.category.to_string(),
                result.completed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn query_top_results(
        &self,
        query: &LeaderboardQuery,
    ) -> Result<Vec<RaceResult>, LeaderboardError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT player_name, wpm, accuracy, text_id, difficulty, text_category, completed_at
            FROM typing_races
            WHERE (?1 IS NULL OR difficulty = ?1)
              AND (?2 IS NULL OR text_category = ?2)
            ORDER BY wpm DESC, completed_at ASC
            LIMIT ?3
            "#,
        )?;

        let rows = stmt.query_map(
            params![
                query.difficulty.map(|d| d.to_string()),
                query.category.map(|c| c.to_string()),
                query.limit as i64,
            ],
            result_from_row,
        )?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}
