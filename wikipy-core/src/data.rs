use crate::model::{Article, StoredToken};
use rusqlite::{Connection, OptionalExtension, Result, params};
use std::fs;
use std::io;
use std::path::Path;

pub struct Database {
    conn: Connection,
}

pub fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

impl Database {
    pub fn drop(path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA foreign_keys = ON;
            ",
        )?;

        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            -- Articles keyed by title. fetched_at is NULL until the summary is known.
            CREATE TABLE IF NOT EXISTS articles (
                title TEXT PRIMARY KEY,
                page_id INTEGER,
                description TEXT,
                summary TEXT NOT NULL DEFAULT '',
                html TEXT,
                fetched_at INTEGER,
                links_fetched_at INTEGER,
                categories_fetched_at INTEGER
            );

            -- Outbound links in API response order
            CREATE TABLE IF NOT EXISTS links (
                source_title TEXT NOT NULL,
                target_title TEXT NOT NULL,
                position INTEGER NOT NULL,
                PRIMARY KEY(source_title, target_title),
                FOREIGN KEY(source_title) REFERENCES articles(title) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_links_source ON links(source_title, position);
            CREATE INDEX IF NOT EXISTS idx_links_target ON links(target_title);

            CREATE TABLE IF NOT EXISTS categories (
                article_title TEXT NOT NULL,
                name TEXT NOT NULL,
                position INTEGER NOT NULL,
                PRIMARY KEY(article_title, name),
                FOREIGN KEY(article_title) REFERENCES articles(title) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_categories_name ON categories(name);

            -- OAuth access tokens. expires_at is a unix timestamp.
            CREATE TABLE IF NOT EXISTS tokens (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                access_token TEXT NOT NULL,
                refresh_token TEXT NOT NULL DEFAULT '',
                expires_at INTEGER NOT NULL,
                created_at INTEGER NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    // Article operations

    /// Insert or overwrite the article row. Cached HTML survives a summary-only
    /// re-fetch; links and categories are replaced through their own calls.
    pub fn upsert_article(&self, article: &Article) -> Result<()> {
        let timestamp = current_timestamp();
        self.conn.execute(
            "INSERT INTO articles (title, page_id, description, summary, html, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(title) DO UPDATE SET
                page_id = excluded.page_id,
                description = excluded.description,
                summary = excluded.summary,
                html = COALESCE(excluded.html, articles.html),
                fetched_at = excluded.fetched_at",
            params![
                &article.title,
                article.page_id,
                &article.description,
                &article.summary,
                &article.html,
                timestamp,
            ],
        )?;
        Ok(())
    }

    /// Article with its cached links and categories, if the summary was ever fetched.
    pub fn get_article(&self, title: &str) -> Result<Option<Article>> {
        let row = self
            .conn
            .query_row(
                "SELECT title, page_id, description, summary, html FROM articles
                 WHERE title = ?1 AND fetched_at IS NOT NULL",
                params![title],
                |row| {
                    Ok(Article {
                        title: row.get(0)?,
                        page_id: row.get(1)?,
                        description: row.get(2)?,
                        summary: row.get(3)?,
                        html: row.get(4)?,
                        links: Vec::new(),
                        categories: Vec::new(),
                    })
                },
            )
            .optional()?;

        let Some(mut article) = row else {
            return Ok(None);
        };
        article.links = self.get_links(title)?.unwrap_or_default();
        article.categories = self.get_categories(title)?.unwrap_or_default();
        Ok(Some(article))
    }

    pub fn set_article_html(&self, title: &str, html: &str) -> Result<()> {
        self.ensure_article(title)?;
        self.conn.execute(
            "UPDATE articles SET html = ?1 WHERE title = ?2",
            params![html, title],
        )?;
        Ok(())
    }

    pub fn get_article_html(&self, title: &str) -> Result<Option<String>> {
        let html = self
            .conn
            .query_row(
                "SELECT html FROM articles WHERE title = ?1",
                params![title],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?;
        Ok(html.flatten())
    }

    fn ensure_article(&self, title: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO articles (title) VALUES (?1)",
            params![title],
        )?;
        Ok(())
    }

    pub fn article_count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))
    }

    // Link operations

    /// Replace the cached outbound links of `source`, keeping the given order.
    pub fn replace_links(&self, source: &str, targets: &[String]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT OR IGNORE INTO articles (title) VALUES (?1)",
            params![source],
        )?;
        tx.execute("DELETE FROM links WHERE source_title = ?1", params![source])?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO links (source_title, target_title, position) VALUES (?1, ?2, ?3)",
            )?;
            for (position, target) in targets.iter().enumerate() {
                stmt.execute(params![source, target, position as i64])?;
            }
        }
        tx.execute(
            "UPDATE articles SET links_fetched_at = ?1 WHERE title = ?2",
            params![current_timestamp(), source],
        )?;
        tx.commit()
    }

    /// `None` when the links of `source` were never fetched.
    pub fn get_links(&self, source: &str) -> Result<Option<Vec<String>>> {
        self.ordered_children(
            "SELECT links_fetched_at FROM articles WHERE title = ?1",
            "SELECT target_title FROM links WHERE source_title = ?1 ORDER BY position",
            source,
        )
    }

    /// Titles of cached articles that link to `target`.
    pub fn get_backlinks(&self, target: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT source_title FROM links WHERE target_title = ?1 ORDER BY source_title",
        )?;
        let sources = stmt
            .query_map(params![target], |row| row.get(0))?
            .collect::<Result<Vec<String>>>()?;
        Ok(sources)
    }

    // Category operations

    pub fn replace_categories(&self, title: &str, categories: &[String]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT OR IGNORE INTO articles (title) VALUES (?1)",
            params![title],
        )?;
        tx.execute(
            "DELETE FROM categories WHERE article_title = ?1",
            params![title],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO categories (article_title, name, position) VALUES (?1, ?2, ?3)",
            )?;
            for (position, name) in categories.iter().enumerate() {
                stmt.execute(params![title, name, position as i64])?;
            }
        }
        tx.execute(
            "UPDATE articles SET categories_fetched_at = ?1 WHERE title = ?2",
            params![current_timestamp(), title],
        )?;
        tx.commit()
    }

    pub fn get_categories(&self, title: &str) -> Result<Option<Vec<String>>> {
        self.ordered_children(
            "SELECT categories_fetched_at FROM articles WHERE title = ?1",
            "SELECT name FROM categories WHERE article_title = ?1 ORDER BY position",
            title,
        )
    }

    fn ordered_children(
        &self,
        marker_sql: &str,
        rows_sql: &str,
        key: &str,
    ) -> Result<Option<Vec<String>>> {
        let fetched_at: Option<Option<i64>> = self
            .conn
            .query_row(marker_sql, params![key], |row| row.get(0))
            .optional()?;
        if fetched_at.flatten().is_none() {
            return Ok(None);
        }

        let mut stmt = self.conn.prepare(rows_sql)?;
        let values = stmt
            .query_map(params![key], |row| row.get(0))?
            .collect::<Result<Vec<String>>>()?;
        Ok(Some(values))
    }

    // Token operations

    pub fn create_token(
        &self,
        access_token: &str,
        refresh_token: &str,
        expires_at: i64,
    ) -> Result<StoredToken> {
        self.conn.execute(
            "INSERT INTO tokens (access_token, refresh_token, expires_at, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![access_token, refresh_token, expires_at, current_timestamp()],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!("Created token {}", id);

        Ok(StoredToken {
            id,
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            expires_at,
        })
    }

    /// Newest token still valid at `now`.
    pub fn latest_valid_token(&self, now: i64) -> Result<Option<StoredToken>> {
        self.conn
            .query_row(
                "SELECT id, access_token, refresh_token, expires_at FROM tokens
                 WHERE expires_at > ?1 ORDER BY expires_at DESC, id DESC LIMIT 1",
                params![now],
                |row| {
                    Ok(StoredToken {
                        id: row.get(0)?,
                        access_token: row.get(1)?,
                        refresh_token: row.get(2)?,
                        expires_at: row.get(3)?,
                    })
                },
            )
            .optional()
    }

    pub fn delete_all_tokens(&self) -> Result<usize> {
        let count = self.conn.execute("DELETE FROM tokens", [])?;
        tracing::info!("Deleted {} tokens", count);
        Ok(count)
    }
}
