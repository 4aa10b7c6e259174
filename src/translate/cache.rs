//! Translation cache using SQLite

use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Cache of backend responses keyed by masked source text. Shared by document
/// pipelines running in parallel, so the connection sits behind a mutex.
pub struct TranslationCache {
    conn: Mutex<Connection>,
}

#[derive(Debug, Default)]
pub struct CacheStats {
    pub total_entries: usize,
    pub providers: Vec<(String, usize)>,
}

impl TranslationCache {
    pub fn open() -> Result<Self> {
        Self::open_at(&Self::cache_path()?)
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).context("Failed to open translation cache")?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS translations (
                id INTEGER PRIMARY KEY,
                source_text TEXT NOT NULL,
                target_lang TEXT NOT NULL,
                provider TEXT NOT NULL,
                translated_text TEXT NOT NULL,
                created_at INTEGER DEFAULT (strftime('%s', 'now')),
                UNIQUE(source_text, target_lang, provider)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_lookup
             ON translations(source_text, target_lang, provider)",
            [],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, text: &str, lang: &str, provider: &str) -> Option<String> {
        self.conn()
            .query_row(
                "SELECT translated_text FROM translations
                 WHERE source_text = ?1 AND target_lang = ?2 AND provider = ?3",
                params![text, lang, provider],
                |row| row.get(0),
            )
            .ok()
    }

    pub fn set(&self, text: &str, lang: &str, provider: &str, translated: &str) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO translations (source_text, target_lang, provider, translated_text)
             VALUES (?1, ?2, ?3, ?4)",
            params![text, lang, provider, translated],
        )?;
        Ok(())
    }

    pub fn stats(&self) -> Result<CacheStats> {
        let conn = self.conn();
        let total: usize = conn.query_row("SELECT COUNT(*) FROM translations", [], |row| row.get(0))?;

        let mut stmt =
            conn.prepare("SELECT provider, COUNT(*) FROM translations GROUP BY provider")?;
        let providers: Vec<(String, usize)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(CacheStats {
            total_entries: total,
            providers,
        })
    }

    pub fn clear(&self) -> Result<()> {
        self.conn().execute("DELETE FROM translations", [])?;
        Ok(())
    }

    pub fn cache_path() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .context("Failed to find cache directory")?
            .join("docxlate");
        Ok(cache_dir.join("translations.db"))
    }
}
