use crate::Lang;
use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Errors raised by the SQLite layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A `UNIQUE` constraint rejected the write.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    fn classify(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref inner, ref message)
                if inner.code == ErrorCode::ConstraintViolation
                    && is_unique_failure(inner.extended_code) =>
            {
                StoreError::UniqueViolation(message.clone().unwrap_or_else(|| inner.to_string()))
            }
            other => StoreError::Sqlite(other),
        }
    }
}

fn is_unique_failure(extended_code: i32) -> bool {
    extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        || extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordPair {
    pub id: i64,
    pub tr: String,
    pub en: String,
}

/// A `(tr, en)` pair offered when a query has no exact match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub tr: String,
    pub en: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Read access the lookup resolver needs from the dictionary tables.
pub trait WordStore {
    /// First word pair (lowest id) whose lower-cased `tr` or `en` equals `normalized`.
    fn find_exact(&self, normalized: &str) -> Result<Option<WordPair>, StoreError>;

    /// Up to `limit` pairs where `tr` or `en` contains `needle`.
    fn find_containing(&self, needle: &str, limit: usize)
    -> Result<Vec<Suggestion>, StoreError>;

    /// All example sentences for a word, optionally restricted to one language.
    fn example_sentences(
        &self,
        word_id: i64,
        lang: Option<Lang>,
    ) -> Result<Vec<String>, StoreError>;
}

const MIGRATIONS: &[(&str, &str)] = &[(
    "0001_init",
    "CREATE TABLE users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL
    );
    CREATE TABLE words (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tr TEXT NOT NULL UNIQUE,
        en TEXT NOT NULL UNIQUE,
        UNIQUE (tr, en)
    );
    CREATE TABLE examples (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        word_id INTEGER NOT NULL REFERENCES words(id) ON DELETE CASCADE,
        lang TEXT NOT NULL CHECK (lang IN ('tr', 'en')),
        sentence TEXT NOT NULL
    );
    CREATE INDEX idx_examples_word_lang ON examples(word_id, lang);
    CREATE TABLE sessions (
        token TEXT PRIMARY KEY,
        user_id INTEGER NOT NULL REFERENCES users(id),
        username TEXT NOT NULL,
        email TEXT NOT NULL,
        expires_at INTEGER NOT NULL
    );
    CREATE INDEX idx_sessions_expiry ON sessions(expires_at);",
)];

/// Shared handle to the SQLite database.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Opens (or creates) the database file and applies pending migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", true)?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }

    /// Every word pair, newest first.
    pub fn list_words(&self) -> Result<Vec<WordPair>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id, tr, en FROM words ORDER BY id DESC")?;
        let rows = stmt
            .query_map([], word_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn get_word(&self, id: i64) -> Result<Option<WordPair>, StoreError> {
        let conn = self.conn();
        let word = conn
            .query_row(
                "SELECT id, tr, en FROM words WHERE id = ?1",
                [id],
                word_from_row,
            )
            .optional()?;
        Ok(word)
    }

    pub fn insert_word(&self, tr: &str, en: &str) -> Result<i64, StoreError> {
        let conn = self.conn();
        conn.execute("INSERT INTO words (tr, en) VALUES (?1, ?2)", params![tr, en])
            .map_err(StoreError::classify)?;
        Ok(conn.last_insert_rowid())
    }

    /// Returns the number of rows changed (0 when `id` does not exist).
    pub fn update_word(&self, id: i64, tr: &str, en: &str) -> Result<usize, StoreError> {
        let conn = self.conn();
        conn.execute(
            "UPDATE words SET tr = ?1, en = ?2 WHERE id = ?3",
            params![tr, en, id],
        )
        .map_err(StoreError::classify)
    }

    pub fn delete_word(&self, id: i64) -> Result<usize, StoreError> {
        let conn = self.conn();
        Ok(conn.execute("DELETE FROM words WHERE id = ?1", [id])?)
    }

    pub fn insert_example(
        &self,
        word_id: i64,
        lang: Lang,
        sentence: &str,
    ) -> Result<i64, StoreError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO examples (word_id, lang, sentence) VALUES (?1, ?2, ?3)",
            params![word_id, lang.as_str(), sentence],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let conn = self.conn();
        let user = conn
            .query_row(
                "SELECT id, username, email, password_hash FROM users WHERE email = ?1 LIMIT 1",
                [email],
                |row| {
                    Ok(UserRecord {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        email: row.get(2)?,
                        password_hash: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    pub fn insert_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<i64, StoreError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO users (username, email, password_hash) VALUES (?1, ?2, ?3)",
            params![username, email, password_hash],
        )
        .map_err(StoreError::classify)?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_session(
        &self,
        token: &str,
        user_id: i64,
        username: &str,
        email: &str,
        expires_at: i64,
    ) -> Result<(), StoreError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO sessions (token, user_id, username, email, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![token, user_id, username, email, expires_at],
        )?;
        Ok(())
    }

    /// Session owner for `token`, ignoring rows that expired at or before `now`.
    pub fn session_owner(
        &self,
        token: &str,
        now: i64,
    ) -> Result<Option<(i64, String, String)>, StoreError> {
        let conn = self.conn();
        let owner = conn
            .query_row(
                "SELECT user_id, username, email FROM sessions
                 WHERE token = ?1 AND expires_at > ?2",
                params![token, now],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        Ok(owner)
    }

    pub fn delete_session(&self, token: &str) -> Result<(), StoreError> {
        let conn = self.conn();
        conn.execute("DELETE FROM sessions WHERE token = ?1", [token])?;
        Ok(())
    }

    pub fn purge_expired_sessions(&self, now: i64) -> Result<usize, StoreError> {
        let conn = self.conn();
        Ok(conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", [now])?)
    }
}

#[cfg(test)]
impl Store {
    /// Runs raw SQL against the shared connection.
    pub(crate) fn execute_raw(&self, sql: &str) -> Result<(), StoreError> {
        Ok(self.conn().execute_batch(sql)?)
    }
}

impl WordStore for Store {
    fn find_exact(&self, normalized: &str) -> Result<Option<WordPair>, StoreError> {
        let conn = self.conn();
        let word = conn
            .query_row(
                "SELECT id, tr, en FROM words
                 WHERE lower(tr) = ?1 OR lower(en) = ?1
                 ORDER BY id LIMIT 1",
                [normalized],
                word_from_row,
            )
            .optional()?;
        Ok(word)
    }

    fn find_containing(
        &self,
        needle: &str,
        limit: usize,
    ) -> Result<Vec<Suggestion>, StoreError> {
        let pattern = format!("%{}%", escape_like(needle));
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT tr, en FROM words
             WHERE tr LIKE ?1 ESCAPE '\\' OR en LIKE ?1 ESCAPE '\\'
             ORDER BY id LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![pattern, limit as i64], |row| {
                Ok(Suggestion {
                    tr: row.get(0)?,
                    en: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn example_sentences(
        &self,
        word_id: i64,
        lang: Option<Lang>,
    ) -> Result<Vec<String>, StoreError> {
        let conn = self.conn();
        let rows = match lang {
            Some(lang) => {
                let mut stmt = conn.prepare(
                    "SELECT sentence FROM examples WHERE word_id = ?1 AND lang = ?2 ORDER BY id",
                )?;
                let sentences = stmt
                    .query_map(params![word_id, lang.as_str()], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                sentences
            }
            None => {
                let mut stmt =
                    conn.prepare("SELECT sentence FROM examples WHERE word_id = ?1 ORDER BY id")?;
                let sentences = stmt
                    .query_map([word_id], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                sentences
            }
        };
        Ok(rows)
    }
}

fn word_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<WordPair> {
    Ok(WordPair {
        id: row.get(0)?,
        tr: row.get(1)?,
        en: row.get(2)?,
    })
}

fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    for (name, sql) in MIGRATIONS {
        let applied: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?1",
            [name],
            |row| row.get(0),
        )?;
        if applied {
            continue;
        }
        conn.execute_batch(sql)?;
        conn.execute("INSERT INTO _migrations (name) VALUES (?1)", [name])?;
        info!(migration = name, "Applied migration");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        Store::open_in_memory().expect("in-memory store")
    }

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM _migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, MIGRATIONS.len() as i64);
    }

    #[test]
    fn duplicate_word_is_a_unique_violation() {
        let store = store();
        store.insert_word("kitap", "book").unwrap();
        let err = store.insert_word("kitap", "book").unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)), "{err:?}");
        let err = store.insert_word("kitap", "volume").unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)), "{err:?}");
    }

    #[test]
    fn exact_match_prefers_lowest_id() {
        let store = store();
        let first = store.insert_word("ev", "house").unwrap();
        store.insert_word("konut", "ev").unwrap();
        let found = store.find_exact("ev").unwrap().expect("match");
        assert_eq!(found.id, first);
    }

    #[test]
    fn like_wildcards_are_literal() {
        let store = store();
        store.insert_word("yüzde", "percent").unwrap();
        store.insert_word("a_b", "underscore").unwrap();
        assert!(store.find_containing("%", 6).unwrap().is_empty());
        let hits = store.find_containing("_", 6).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].tr, "a_b");
    }

    #[test]
    fn deleting_a_word_drops_its_examples() {
        let store = store();
        let id = store.insert_word("ev", "house").unwrap();
        store.insert_example(id, Lang::Tr, "Ev güzel.").unwrap();
        assert_eq!(store.delete_word(id).unwrap(), 1);
        assert!(store.example_sentences(id, None).unwrap().is_empty());
        assert_eq!(store.delete_word(id).unwrap(), 0);
    }

    #[test]
    fn expired_sessions_are_invisible_and_purged() {
        let store = store();
        let user = store.insert_user("ada", "ada@example.com", "hash").unwrap();
        store
            .insert_session("live", user, "ada", "ada@example.com", 200)
            .unwrap();
        store
            .insert_session("stale", user, "ada", "ada@example.com", 50)
            .unwrap();
        assert!(store.session_owner("live", 100).unwrap().is_some());
        assert!(store.session_owner("stale", 100).unwrap().is_none());
        assert_eq!(store.purge_expired_sessions(100).unwrap(), 1);
    }
}
