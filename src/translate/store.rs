//! Persistent glossary store using SQLite

use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};

use super::glossary::{Glossary, GlossaryEntry, MatchPolicy};
use crate::error::GlossaryError;

pub const DEFAULT_CATEGORY: &str = "general";

pub struct GlossaryStore {
    conn: Connection,
}

#[derive(Debug, Default)]
pub struct StoreStats {
    pub total_entries: usize,
    pub categories: Vec<(String, usize)>,
}

impl GlossaryStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GlossaryError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, GlossaryError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, GlossaryError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS glossary (
                id INTEGER PRIMARY KEY,
                term TEXT NOT NULL,
                forced_translation TEXT,
                protect INTEGER NOT NULL DEFAULT 0,
                exact_case INTEGER NOT NULL DEFAULT 0,
                category TEXT NOT NULL DEFAULT 'general',
                updated_at INTEGER DEFAULT (strftime('%s', 'now')),
                UNIQUE(term, category)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_category ON glossary(category)",
            [],
        )?;

        Ok(Self { conn })
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("docxlate").join("glossary.db"))
    }

    pub fn upsert(&self, entry: &GlossaryEntry, category: &str) -> Result<(), GlossaryError> {
        if !entry.is_valid() {
            return Err(GlossaryError::InvalidEntry(entry.term.clone()));
        }
        self.conn.execute(
            "INSERT OR REPLACE INTO glossary (term, forced_translation, protect, exact_case, category)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.term,
                entry.forced_translation,
                entry.protect,
                entry.exact_case,
                category
            ],
        )?;
        Ok(())
    }

    /// Returns whether a row was deleted.
    pub fn remove(&self, term: &str, category: &str) -> Result<bool, GlossaryError> {
        let n = self.conn.execute(
            "DELETE FROM glossary WHERE term = ?1 AND category = ?2",
            params![term, category],
        )?;
        Ok(n > 0)
    }

    pub fn lookup(&self, term: &str, category: &str) -> Result<Option<GlossaryEntry>, GlossaryError> {
        let entry = self
            .conn
            .query_row(
                "SELECT term, forced_translation, protect, exact_case FROM glossary
                 WHERE category = ?2 AND (term = ?1 OR (exact_case = 0 AND lower(term) = lower(?1)))
                 ORDER BY exact_case DESC LIMIT 1",
                params![term, category],
                |row| {
                    Ok(GlossaryEntry {
                        term: row.get(0)?,
                        forced_translation: row.get(1)?,
                        protect: row.get(2)?,
                        exact_case: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    pub fn list(&self, category: Option<&str>) -> Result<Vec<(String, GlossaryEntry)>, GlossaryError> {
        let mut stmt = self.conn.prepare(
            "SELECT category, term, forced_translation, protect, exact_case FROM glossary
             WHERE ?1 IS NULL OR category = ?1
             ORDER BY category, term",
        )?;
        let rows = stmt
            .query_map(params![category], |row| {
                Ok((
                    row.get(0)?,
                    GlossaryEntry {
                        term: row.get(1)?,
                        forced_translation: row.get(2)?,
                        protect: row.get(3)?,
                        exact_case: row.get(4)?,
                    },
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Builds the in-memory matcher for one category. Malformed rows are skipped.
    pub fn load(&self, category: &str, policy: MatchPolicy) -> Result<Glossary, GlossaryError> {
        let mut glossary = Glossary::new().with_policy(policy);
        for (_, entry) in self.list(Some(category))? {
            glossary.add(entry);
        }
        Ok(glossary)
    }

    /// Imports every entry of `glossary`, returning how many were written.
    pub fn import(&self, glossary: &Glossary, category: &str) -> Result<usize, GlossaryError> {
        let tx = self.conn.unchecked_transaction()?;
        let mut count = 0;
        for entry in glossary.entries() {
            tx.execute(
                "INSERT OR REPLACE INTO glossary (term, forced_translation, protect, exact_case, category)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    entry.term,
                    entry.forced_translation,
                    entry.protect,
                    entry.exact_case,
                    category
                ],
            )?;
            count += 1;
        }
        tx.commit()?;
        Ok(count)
    }

    pub fn stats(&self) -> Result<StoreStats, GlossaryError> {
        let total: usize = self
            .conn
            .query_row("SELECT COUNT(*) FROM glossary", [], |row| row.get(0))?;

        let mut stmt = self
            .conn
            .prepare("SELECT category, COUNT(*) FROM glossary GROUP BY category ORDER BY category")?;
        let categories: Vec<(String, usize)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(StoreStats {
            total_entries: total,
            categories,
        })
    }
}

/// Loads a category for a pipeline run. A missing store file is an empty glossary,
/// and a store that cannot be read degrades to empty with a warning.
pub fn load_glossary(path: &Path, category: &str, policy: MatchPolicy) -> Glossary {
    if !path.exists() {
        tracing::debug!("No glossary store at {}", path.display());
        return Glossary::new().with_policy(policy);
    }
    match GlossaryStore::open(path).and_then(|s| s.load(category, policy)) {
        Ok(glossary) => glossary,
        Err(e) => {
            tracing::warn!("Glossary unavailable, continuing without it: {}", e);
            Glossary::new().with_policy(policy)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_and_lookup() {
        let store = GlossaryStore::open_in_memory().unwrap();
        store
            .upsert(&GlossaryEntry::protected("LinkedIn"), "Technology")
            .unwrap();
        store
            .upsert(&GlossaryEntry::forced("Orta", "Medium"), DEFAULT_CATEGORY)
            .unwrap();

        let hit = store.lookup("linkedin", "Technology").unwrap().unwrap();
        assert!(hit.protect);
        assert!(store.lookup("LinkedIn", DEFAULT_CATEGORY).unwrap().is_none());

        store
            .upsert(&GlossaryEntry::forced("Orta", "Middle"), DEFAULT_CATEGORY)
            .unwrap();
        let forced = store.lookup("Orta", DEFAULT_CATEGORY).unwrap().unwrap();
        assert_eq!(forced.forced_translation.as_deref(), Some("Middle"));
        assert_eq!(store.stats().unwrap().total_entries, 2);
    }

    #[test]
    fn test_invalid_entry_rejected() {
        let store = GlossaryStore::open_in_memory().unwrap();
        let entry = GlossaryEntry {
            term: "Orta".into(),
            forced_translation: None,
            protect: false,
            exact_case: false,
        };
        assert!(matches!(
            store.upsert(&entry, DEFAULT_CATEGORY),
            Err(GlossaryError::InvalidEntry(_))
        ));
    }

    #[test]
    fn test_load_category_and_remove() {
        let store = GlossaryStore::open_in_memory().unwrap();
        let imported = Glossary::parse("Acme\nEvet = Yes\n");
        assert_eq!(store.import(&imported, DEFAULT_CATEGORY).unwrap(), 2);
        store.upsert(&GlossaryEntry::protected("SAP"), "erp").unwrap();

        let glossary = store.load(DEFAULT_CATEGORY, MatchPolicy::WholeWord).unwrap();
        assert_eq!(glossary.len(), 2);
        assert!(glossary.lookup("SAP").is_none());

        assert!(store.remove("Acme", DEFAULT_CATEGORY).unwrap());
        assert!(!store.remove("Acme", DEFAULT_CATEGORY).unwrap());
        assert_eq!(store.list(None).unwrap().len(), 2);
    }

    #[test]
    fn test_missing_store_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let glossary = load_glossary(
            &dir.path().join("absent.db"),
            DEFAULT_CATEGORY,
            MatchPolicy::WholeWord,
        );
        assert!(glossary.is_empty());
        assert!(!dir.path().join("absent.db").exists());
    }
}
