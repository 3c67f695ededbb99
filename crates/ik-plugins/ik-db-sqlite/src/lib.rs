//! # ik-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `ik-core` domain models. Committed inserts are announced on the
//! change feed, which makes this backend realtime-capable.

use std::collections::HashSet;

use async_trait::async_trait;
use ik_core::{
    AppCategory, AppError, ChangeEvent, ChangeFeed, ForumPost, Idea, IdeaCategory, RealtimeSource,
    Result, ShowcaseApp, StoreAdapter, Table,
};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tokio::sync::broadcast;
use tracing::{debug, info};

const SCHEMA: [&str; 4] = [
    "CREATE TABLE IF NOT EXISTS ideas (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        owner_id TEXT NOT NULL,
        problem TEXT NOT NULL,
        solution TEXT NOT NULL,
        category TEXT NOT NULL,
        market_size_score INTEGER NOT NULL,
        source TEXT,
        UNIQUE (owner_id, problem)
    )",
    "CREATE TABLE IF NOT EXISTS showcase_apps (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        description TEXT NOT NULL,
        image_url TEXT NOT NULL,
        app_url TEXT,
        category TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS forum_posts (
        id TEXT PRIMARY KEY,
        created_at TEXT NOT NULL,
        author TEXT NOT NULL,
        content TEXT NOT NULL,
        idea TEXT,
        parent_id TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_ideas_owner ON ideas (owner_id)",
];

pub struct SqliteStore {
    pool: SqlitePool,
    feed: ChangeFeed,
}

fn db_error(e: sqlx::Error) -> AppError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            AppError::Network(e.to_string())
        }
        sqlx::Error::RowNotFound => AppError::NotFound("row".to_string(), String::new()),
        other => AppError::Internal(other.to_string()),
    }
}

impl SqliteStore {
    /// Connects and creates the schema if needed. `sqlite::memory:` gets a
    /// single long-lived connection so every query sees the same database.
    pub async fn new(url: &str) -> Result<Self> {
        let in_memory = url.contains(":memory:");
        let options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = options.connect(url).await.map_err(db_error)?;

        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await.map_err(db_error)?;
        }
        info!(url, "SQLite store ready");

        Ok(Self {
            pool,
            feed: ChangeFeed::new(),
        })
    }
}

fn idea_from_row(row: &SqliteRow) -> Result<Idea> {
    let category: String = row.try_get("category").map_err(db_error)?;
    let score: i64 = row.try_get("market_size_score").map_err(db_error)?;
    let source: Option<String> = row.try_get("source").map_err(db_error)?;
    Ok(Idea {
        id: row.try_get("id").map_err(db_error)?,
        owner_id: Some(row.try_get("owner_id").map_err(db_error)?),
        problem: row.try_get("problem").map_err(db_error)?,
        solution: row.try_get("solution").map_err(db_error)?,
        category: IdeaCategory::from_label(&category),
        market_size_score: score.clamp(0, 100) as u8,
        source: source.map(|s| serde_json::from_str(&s)).transpose()?,
    })
}

fn app_from_row(row: &SqliteRow) -> Result<ShowcaseApp> {
    let category: String = row.try_get("category").map_err(db_error)?;
    Ok(ShowcaseApp {
        id: row.try_get("id").map_err(db_error)?,
        name: row.try_get("name").map_err(db_error)?,
        description: row.try_get("description").map_err(db_error)?,
        image_url: row.try_get("image_url").map_err(db_error)?,
        app_url: row.try_get("app_url").map_err(db_error)?,
        category: AppCategory::from_label(&category),
    })
}

fn post_from_row(row: &SqliteRow) -> Result<ForumPost> {
    let idea: Option<String> = row.try_get("idea").map_err(db_error)?;
    Ok(ForumPost {
        id: row.try_get("id").map_err(db_error)?,
        created_at: row.try_get("created_at").map_err(db_error)?,
        author: row.try_get("author").map_err(db_error)?,
        content: row.try_get("content").map_err(db_error)?,
        idea: idea.map(|s| serde_json::from_str(&s)).transpose()?,
        parent_id: row.try_get("parent_id").map_err(db_error)?,
    })
}

#[async_trait]
impl StoreAdapter for SqliteStore {
    async fn list_ideas(&self, owner_id: &str) -> Result<Vec<Idea>> {
        sqlx::query("SELECT * FROM ideas WHERE owner_id = ? ORDER BY seq DESC")
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?
            .iter()
            .map(idea_from_row)
            .collect()
    }

    /// Atomic batch insert. Rows breaking the (owner, problem) rule are skipped.
    async fn insert_ideas(&self, ideas: Vec<Idea>) -> Result<Vec<Idea>> {
        if ideas.iter().any(|i| i.owner_id.is_none()) {
            return Err(AppError::Validation("idea has no owner".to_string()));
        }
        let mut seen = HashSet::new();
        let batch: Vec<&Idea> = ideas
            .iter()
            .filter(|i| seen.insert((i.owner_id.as_deref(), i.problem.as_str())))
            .collect();

        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let mut stored_ids = HashSet::new();
        // Inserted last-to-first so `seq DESC` lists a batch in input order.
        for idea in batch.iter().rev() {
            let source = idea.source.as_ref().map(|s| serde_json::to_string(s)).transpose()?;
            let done = sqlx::query(
                "INSERT OR IGNORE INTO ideas (id, owner_id, problem, solution, category, market_size_score, source)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&idea.id)
            .bind(idea.owner_id.as_deref())
            .bind(&idea.problem)
            .bind(&idea.solution)
            .bind(idea.category.as_str())
            .bind(i64::from(idea.market_size_score))
            .bind(source)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
            if done.rows_affected() == 1 {
                stored_ids.insert(idea.id.clone());
            }
        }
        tx.commit().await.map_err(db_error)?;

        let stored: Vec<Idea> = ideas.into_iter().filter(|i| stored_ids.remove(&i.id)).collect();
        self.feed.publish(Table::Ideas, &stored)?;
        debug!(count = stored.len(), "Ideas committed");
        Ok(stored)
    }

    async fn insert_idea(&self, idea: Idea) -> Result<Idea> {
        self.insert_ideas(vec![idea])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Validation("an idea with this problem already exists".to_string()))
    }

    async fn clear_ideas(&self, owner_id: &str) -> Result<()> {
        let done = sqlx::query("DELETE FROM ideas WHERE owner_id = ?")
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        debug!(owner_id, removed = done.rows_affected(), "Ideas cleared");
        Ok(())
    }

    async fn list_showcase_apps(&self) -> Result<Vec<ShowcaseApp>> {
        sqlx::query("SELECT * FROM showcase_apps ORDER BY seq DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?
            .iter()
            .map(app_from_row)
            .collect()
    }

    async fn insert_showcase_apps(&self, apps: Vec<ShowcaseApp>) -> Result<Vec<ShowcaseApp>> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let mut stored_ids = HashSet::new();
        for app in apps.iter().rev() {
            let done = sqlx::query(
                "INSERT OR IGNORE INTO showcase_apps (id, name, description, image_url, app_url, category)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&app.id)
            .bind(&app.name)
            .bind(&app.description)
            .bind(&app.image_url)
            .bind(app.app_url.as_deref())
            .bind(app.category.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
            if done.rows_affected() == 1 {
                stored_ids.insert(app.id.clone());
            }
        }
        tx.commit().await.map_err(db_error)?;

        let stored: Vec<ShowcaseApp> = apps.into_iter().filter(|a| stored_ids.remove(&a.id)).collect();
        self.feed.publish(Table::ShowcaseApps, &stored)?;
        Ok(stored)
    }

    async fn insert_showcase_app(&self, app: ShowcaseApp) -> Result<ShowcaseApp> {
        let id = app.id.clone();
        self.insert_showcase_apps(vec![app])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Validation(format!("showcase app {id} already exists")))
    }

    async fn list_forum_posts(&self) -> Result<Vec<ForumPost>> {
        sqlx::query("SELECT * FROM forum_posts ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?
            .iter()
            .map(post_from_row)
            .collect()
    }

    async fn insert_forum_posts(&self, posts: Vec<ForumPost>) -> Result<Vec<ForumPost>> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let mut stored_ids = HashSet::new();
        for post in &posts {
            let idea = post.idea.as_ref().map(|i| serde_json::to_string(i)).transpose()?;
            let done = sqlx::query(
                "INSERT OR IGNORE INTO forum_posts (id, created_at, author, content, idea, parent_id)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&post.id)
            .bind(post.created_at)
            .bind(&post.author)
            .bind(&post.content)
            .bind(idea)
            .bind(post.parent_id.as_deref())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
            if done.rows_affected() == 1 {
                stored_ids.insert(post.id.clone());
            }
        }
        tx.commit().await.map_err(db_error)?;

        let stored: Vec<ForumPost> = posts.into_iter().filter(|p| stored_ids.remove(&p.id)).collect();
        self.feed.publish(Table::ForumPosts, &stored)?;
        Ok(stored)
    }

    async fn insert_forum_post(&self, post: ForumPost) -> Result<ForumPost> {
        let id = post.id.clone();
        self.insert_forum_posts(vec![post])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Validation(format!("forum post {id} already exists")))
    }
}

impl RealtimeSource for SqliteStore {
    fn subscribe(&self, table: Table) -> broadcast::Receiver<ChangeEvent> {
        self.feed.subscribe(table)
    }
}
