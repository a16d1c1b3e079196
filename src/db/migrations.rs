// Database migrations
// Migrations are forward-only. Never edit or delete a migration after it ships.

use rusqlite::Connection;
use anyhow::Result;

/// All migrations in order. Each migration is a SQL string.
const MIGRATIONS: &[&str] = &[
    // Migration 1: Initial schema
    r#"
    -- Posts table: one row per ingested channel post.
    -- file_path is the post's folder relative to the incoming root
    -- (channel_name/timestamp), which is the curation lookup key.
    CREATE TABLE posts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        channel_name TEXT NOT NULL,
        post_id INTEGER NOT NULL,
        date TEXT NOT NULL,
        model_name TEXT NOT NULL DEFAULT 'Unknown',
        set_name TEXT,
        content_format TEXT NOT NULL DEFAULT 'photo',
        file_path TEXT NOT NULL,
        processed INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(channel_name, post_id)
    );

    CREATE INDEX idx_posts_file_path ON posts(file_path);

    -- Image scores: one row per scored image, first write wins.
    CREATE TABLE image_scores (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        file_path TEXT NOT NULL UNIQUE,
        wow_factor INTEGER NOT NULL,
        engagement INTEGER NOT NULL,
        platform_fit INTEGER NOT NULL,
        combined_score REAL NOT NULL,
        reasoning TEXT NOT NULL,
        model_name TEXT,
        watermark_offset_pct REAL,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<()> {
    // Track schema version with user_version pragma
    let current_version: i64 = conn.query_row(
        "PRAGMA user_version",
        [],
        |row| row.get(0),
    )?;

    let target_version = MIGRATIONS.len() as i64;

    if current_version >= target_version {
        return Ok(());
    }

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i64;
        if version <= current_version {
            continue;
        }

        conn.execute_batch(migration)?;
        conn.execute_batch(&format!("PRAGMA user_version = {}", version))?;
        log::info!("Applied migration {}", version);
    }

    Ok(())
}
