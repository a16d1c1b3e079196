// Post index schema types and query helpers

use rusqlite::{Connection, params, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::scoring::ImageScore;

// ----- Post -----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub channel_name: String,
    pub post_id: i64,
    pub date: String,
    pub model_name: String,
    pub set_name: Option<String>,
    pub content_format: String,
    pub file_path: String,
    pub processed: bool,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub channel_name: String,
    pub post_id: i64,
    pub date: String,
    pub model_name: String,
    pub set_name: Option<String>,
    pub content_format: String,
    pub file_path: String,
}

pub fn insert_post(conn: &Connection, post: &NewPost) -> Result<i64> {
    conn.execute(
        "INSERT INTO posts (channel_name, post_id, date, model_name, set_name, content_format, file_path)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            post.channel_name,
            post.post_id,
            post.date,
            post.model_name,
            post.set_name,
            post.content_format,
            post.file_path,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Duplicate detection for ingestion: has this channel post been imported?
pub fn post_exists(conn: &Connection, channel_name: &str, post_id: i64) -> Result<bool> {
    let found: Option<i64> = conn.query_row(
        "SELECT 1 FROM posts WHERE channel_name = ?1 AND post_id = ?2",
        params![channel_name, post_id],
        |row| row.get(0),
    ).optional()?;
    Ok(found.is_some())
}

/// Look up the owning model name for a post folder path (channel/timestamp)
pub fn get_model_by_path(conn: &Connection, file_path: &str) -> Result<Option<String>> {
    let result = conn.query_row(
        "SELECT model_name FROM posts WHERE file_path = ?1",
        params![file_path],
        |row| row.get(0),
    ).optional()?;
    Ok(result)
}

pub fn is_processed(conn: &Connection, file_path: &str) -> Result<bool> {
    let result: Option<i64> = conn.query_row(
        "SELECT processed FROM posts WHERE file_path = ?1",
        params![file_path],
        |row| row.get(0),
    ).optional()?;
    Ok(result.unwrap_or(0) != 0)
}

/// Mark a post's curation as complete. Idempotent; a missing row is a no-op.
pub fn mark_processed(conn: &Connection, file_path: &str) -> Result<()> {
    conn.execute(
        "UPDATE posts SET processed = 1 WHERE file_path = ?1",
        params![file_path],
    )?;
    Ok(())
}

// ----- Image scores -----

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreInsert {
    Inserted,
    Duplicate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredScore {
    pub id: i64,
    pub file_path: String,
    pub wow_factor: i64,
    pub engagement: i64,
    pub platform_fit: i64,
    pub combined_score: f64,
    pub reasoning: String,
    pub model_name: Option<String>,
    pub watermark_offset_pct: Option<f64>,
    pub created_at: String,
}

/// Persist a score keyed by incoming-relative file path.
/// First write wins: an existing row is left untouched and reported as Duplicate.
pub fn insert_score_if_absent(
    conn: &Connection,
    file_path: &str,
    score: &ImageScore,
    model_name: Option<&str>,
) -> Result<ScoreInsert> {
    let combined = (score.combined() * 10.0).round() / 10.0;
    let changed = conn.execute(
        "INSERT OR IGNORE INTO image_scores
         (file_path, wow_factor, engagement, platform_fit, combined_score, reasoning, model_name, watermark_offset_pct)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            file_path,
            score.wow_factor as i64,
            score.engagement as i64,
            score.platform_fit as i64,
            combined,
            score.reasoning,
            model_name,
            score.watermark_offset_pct,
        ],
    )?;
    if changed > 0 {
        Ok(ScoreInsert::Inserted)
    } else {
        Ok(ScoreInsert::Duplicate)
    }
}

pub fn get_score(conn: &Connection, file_path: &str) -> Result<Option<StoredScore>> {
    let result = conn.query_row(
        "SELECT id, file_path, wow_factor, engagement, platform_fit, combined_score,
                reasoning, model_name, watermark_offset_pct, created_at
         FROM image_scores WHERE file_path = ?1",
        params![file_path],
        |row| {
            Ok(StoredScore {
                id: row.get(0)?,
                file_path: row.get(1)?,
                wow_factor: row.get(2)?,
                engagement: row.get(3)?,
                platform_fit: row.get(4)?,
                combined_score: row.get(5)?,
                reasoning: row.get(6)?,
                model_name: row.get(7)?,
                watermark_offset_pct: row.get(8)?,
                created_at: row.get(9)?,
            })
        },
    ).optional()?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        crate::db::migrations::run_migrations(&conn).unwrap();
        conn
    }

    fn sample_post(channel: &str, post_id: i64, model: &str, file_path: &str) -> NewPost {
        NewPost {
            channel_name: channel.to_string(),
            post_id,
            date: "2026-01-22T07:01:58Z".to_string(),
            model_name: model.to_string(),
            set_name: None,
            content_format: "photo".to_string(),
            file_path: file_path.to_string(),
        }
    }

    fn sample_score(wow: u8, reasoning: &str) -> ImageScore {
        ImageScore {
            wow_factor: wow,
            engagement: 7,
            platform_fit: 8,
            is_explicit: false,
            reasoning: reasoning.to_string(),
            watermark_offset_pct: None,
        }
    }

    #[test]
    fn test_post_exists_by_channel_and_id() {
        let conn = setup_test_db();
        insert_post(&conn, &sample_post("CCumpot", 42, "Yuiwoo", "CCumpot/2026-01-22_07-01-58")).unwrap();

        assert!(post_exists(&conn, "CCumpot", 42).unwrap());
        assert!(!post_exists(&conn, "CCumpot", 43).unwrap());
        assert!(!post_exists(&conn, "Other", 42).unwrap());
    }

    #[test]
    fn test_get_model_by_path() {
        let conn = setup_test_db();
        insert_post(&conn, &sample_post("CCumpot", 1, "Yuiwoo", "CCumpot/2026-01-22_07-01-58")).unwrap();

        assert_eq!(
            get_model_by_path(&conn, "CCumpot/2026-01-22_07-01-58").unwrap(),
            Some("Yuiwoo".to_string())
        );
        assert_eq!(get_model_by_path(&conn, "CCumpot/missing").unwrap(), None);
    }

    #[test]
    fn test_mark_processed_is_idempotent() {
        let conn = setup_test_db();
        insert_post(&conn, &sample_post("Ch", 1, "Model", "Ch/ts")).unwrap();

        assert!(!is_processed(&conn, "Ch/ts").unwrap());
        mark_processed(&conn, "Ch/ts").unwrap();
        assert!(is_processed(&conn, "Ch/ts").unwrap());
        mark_processed(&conn, "Ch/ts").unwrap();
        assert!(is_processed(&conn, "Ch/ts").unwrap());

        // Missing row is a no-op, not an error
        mark_processed(&conn, "Ch/other").unwrap();
        assert!(!is_processed(&conn, "Ch/other").unwrap());
    }

    #[test]
    fn test_insert_score_first_write_wins() {
        let conn = setup_test_db();

        let first = sample_score(9, "Great lighting");
        let result = insert_score_if_absent(&conn, "Ch/ts/img1.jpg", &first, Some("Yuiwoo")).unwrap();
        assert_eq!(result, ScoreInsert::Inserted);

        let second = sample_score(2, "Overwritten reasoning");
        let result = insert_score_if_absent(&conn, "Ch/ts/img1.jpg", &second, None).unwrap();
        assert_eq!(result, ScoreInsert::Duplicate);

        let stored = get_score(&conn, "Ch/ts/img1.jpg").unwrap().unwrap();
        assert_eq!(stored.wow_factor, 9);
        assert_eq!(stored.reasoning, "Great lighting");
        assert_eq!(stored.model_name, Some("Yuiwoo".to_string()));
    }

    #[test]
    fn test_stored_combined_rounded_to_one_decimal() {
        let conn = setup_test_db();

        // (8 + 7 + 8) / 3 = 7.666... -> 7.7
        let score = sample_score(8, "x");
        insert_score_if_absent(&conn, "Ch/ts/img2.jpg", &score, None).unwrap();

        let stored = get_score(&conn, "Ch/ts/img2.jpg").unwrap().unwrap();
        assert!((stored.combined_score - 7.7).abs() < 1e-9);
    }
}
