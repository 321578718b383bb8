use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

pub mod models;
use models::*;

/// Local season store: parsed nflverse rows keyed by season, so each season is
/// downloaded once. Single connection behind a mutex.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).with_context(|| format!("Failed to open {}", path))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| anyhow!("database mutex poisoned"))
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    // ── Seasons ──────────────────────────────────────────────────────────────

    pub fn has_season(&self, season: u16) -> Result<bool> {
        let conn = self.conn()?;
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM seasons WHERE season = ?1",
            params![season],
            |r| r.get(0),
        )?;
        Ok(n > 0)
    }

    /// Replace a season's rows in one transaction.
    pub fn store_season(&self, season: u16, source: &str, rows: &[HistoricalPlay]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM pbp_rows WHERE season = ?1", params![season])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO pbp_rows (season, seq, game_id, row_json) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (seq, row) in rows.iter().enumerate() {
                let json = serde_json::to_string(row).context("Failed to encode play row")?;
                stmt.execute(params![season, seq as i64, row.game_id, json])?;
            }
        }
        tx.execute(
            "INSERT OR REPLACE INTO seasons (season, row_count, source, fetched_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![season, rows.len() as i64, source, Utc::now()],
        )?;
        tx.commit().context("Failed to commit season")?;
        Ok(())
    }

    /// Every stored row of a season, in file order.
    pub fn season_rows(&self, season: u16) -> Result<Vec<HistoricalPlay>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT row_json FROM pbp_rows WHERE season = ?1 ORDER BY seq")?;
        let raw = stmt
            .query_map(params![season], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        decode_rows(raw)
    }

    pub fn game_rows(&self, season: u16, game_id: &str) -> Result<Vec<HistoricalPlay>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT row_json FROM pbp_rows WHERE season = ?1 AND game_id = ?2 ORDER BY seq",
        )?;
        let raw = stmt
            .query_map(params![season, game_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        decode_rows(raw)
    }

    pub fn list_seasons(&self) -> Result<Vec<SeasonRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT season, row_count, source, fetched_at FROM seasons ORDER BY season DESC",
        )?;
        let seasons = stmt
            .query_map([], map_season)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(seasons)
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

fn decode_rows(raw: Vec<String>) -> Result<Vec<HistoricalPlay>> {
    raw.iter()
        .map(|json| serde_json::from_str(json).context("Corrupt stored play row"))
        .collect()
}

fn map_season(row: &rusqlite::Row) -> rusqlite::Result<SeasonRecord> {
    Ok(SeasonRecord {
        season: row.get(0)?,
        row_count: row.get(1)?,
        source: row.get(2)?,
        fetched_at: row.get(3)?,
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS seasons (
    season      INTEGER PRIMARY KEY,
    row_count   INTEGER NOT NULL,
    source      TEXT    NOT NULL,
    fetched_at  TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS pbp_rows (
    season      INTEGER NOT NULL,
    seq         INTEGER NOT NULL,
    game_id     TEXT    NOT NULL,
    row_json    TEXT    NOT NULL,
    PRIMARY KEY (season, seq)
);

CREATE INDEX IF NOT EXISTS idx_pbp_rows_game ON pbp_rows(season, game_id);
"#;
