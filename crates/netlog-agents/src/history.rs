//! Persisted run history: one row per processed question.
//!
//! Stored in a `runs` table in the logs database file. Uses spawn_blocking
//! and a connection per call.

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conversation::HistoryEntry;
use crate::error::{Error, Result};

/// One stored run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: String,
    pub question: String,
    pub final_answer: String,
    pub transcript: Vec<HistoryEntry>,
    pub created_at: DateTime<Utc>,
}

impl RunRecord {
    pub fn new(question: &str, final_answer: &str, transcript: Vec<HistoryEntry>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            question: question.to_string(),
            final_answer: final_answer.to_string(),
            transcript,
            created_at: Utc::now(),
        }
    }
}

/// SQLite-backed run history.
///
/// **Interaction**: Written by `MultiAgentSystem::process`; read by `netlog history`.
#[derive(Debug, Clone)]
pub struct RunStore {
    db_path: PathBuf,
}

impl RunStore {
    /// Opens the store and ensures the `runs` table exists.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let conn = Connection::open(&db_path)?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS runs (
                id TEXT PRIMARY KEY,
                question TEXT NOT NULL,
                final_answer TEXT NOT NULL,
                transcript TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
            [],
        )?;
        Ok(Self { db_path })
    }

    pub async fn save(&self, run: &RunRecord) -> Result<()> {
        let transcript = serde_json::to_string(&run.transcript)?;
        let run = run.clone();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            conn.execute(
                "INSERT OR REPLACE INTO runs (id, question, final_answer, transcript, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    run.id,
                    run.question,
                    run.final_answer,
                    transcript,
                    run.created_at.to_rfc3339_opts(SecondsFormat::Nanos, true)
                ],
            )?;
            Ok::<_, Error>(())
        })
        .await?
    }

    /// Most recent runs first.
    pub async fn list(&self, limit: usize) -> Result<Vec<RunRecord>> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            let mut stmt = conn.prepare(
                "SELECT id, question, final_answer, transcript, created_at FROM runs \
                 ORDER BY created_at DESC LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?;
            let mut runs = Vec::new();
            for row in rows {
                let (id, question, final_answer, transcript, created_at) = row?;
                runs.push(RunRecord {
                    id,
                    question,
                    final_answer,
                    transcript: serde_json::from_str(&transcript)?,
                    created_at: DateTime::parse_from_rfc3339(&created_at)
                        .map(|t| t.with_timezone(&Utc))
                        .unwrap_or_default(),
                });
            }
            Ok::<_, Error>(runs)
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[tokio::test]
    async fn save_and_list_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::new(dir.path().join("logs.db")).unwrap();

        let mut older = RunRecord::new("first", "answer 1", vec![]);
        older.created_at = Utc::now() - Duration::minutes(5);
        let newer = RunRecord::new(
            "second",
            "answer 2",
            vec![HistoryEntry {
                role: "user".into(),
                content: "second".into(),
            }],
        );
        store.save(&older).await.unwrap();
        store.save(&newer).await.unwrap();

        let runs = store.list(10).await.unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].question, "second");
        assert_eq!(runs[0].transcript.len(), 1);
        assert_eq!(runs[1].id, older.id);

        assert_eq!(store.list(1).await.unwrap().len(), 1);
    }
}
