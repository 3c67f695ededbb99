//! # ik-store-local
//!
//! `StoreAdapter` over JSON documents on the local filesystem, for offline use
//! and single-user installs. Inserts are announced on an in-process change feed.

pub mod kv;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use ik_core::{
    AppCategory, AppError, ChangeEvent, ChangeFeed, ForumPost, Idea, RealtimeSource, Result,
    ShowcaseApp, StoreAdapter, Table,
};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

pub use kv::LocalKv;

const IDEAS_KEY_PREFIX: &str = "infoking.ideas.";
const SHOWCASE_KEY: &str = "infoking.showcase_apps";
const FORUM_KEY: &str = "infoking.forum_posts";

fn ideas_key(owner_id: &str) -> String {
    format!("{IDEAS_KEY_PREFIX}{owner_id}")
}

/// Gallery entries written the first time the showcase is read.
fn demo_apps() -> Vec<ShowcaseApp> {
    let demo = |id: &str, name: &str, description: &str, color: &str, category| ShowcaseApp {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        image_url: format!(
            "https://placehold.co/600x400/{color}/FFFFFF/png?text={}",
            name.replace(' ', "+")
        ),
        app_url: None,
        category,
    };
    vec![
        demo(
            "app-1",
            "Zenith Focus",
            "An AI-powered productivity app that minimizes distractions and suggests optimal break times.",
            "22d3ee",
            AppCategory::Productivity,
        ),
        demo(
            "app-2",
            "NutriMind",
            "A health app that tracks mood and food intake, providing AI-driven nutritional advice.",
            "f472b6",
            AppCategory::Health,
        ),
        demo(
            "app-3",
            "CoinWise",
            "A gamified finance tracker for young adults that makes budgeting and saving engaging.",
            "34d399",
            AppCategory::Finance,
        ),
    ]
}

pub struct LocalStore {
    kv: Arc<LocalKv>,
    feed: ChangeFeed,
    /// Serializes read-modify-write cycles on the documents.
    write_lock: Mutex<()>,
}

impl LocalStore {
    pub fn new(kv: Arc<LocalKv>) -> Self {
        Self {
            kv,
            feed: ChangeFeed::new(),
            write_lock: Mutex::new(()),
        }
    }

    async fn read_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        Ok(self.kv.get(key).await?.unwrap_or_default())
    }

    /// Prepends rows whose key is not stored yet; returns them in input order.
    async fn prepend_unique<T, K>(&self, key: &str, rows: Vec<T>, dedup: K) -> Result<Vec<T>>
    where
        T: Serialize + DeserializeOwned + Clone,
        K: Fn(&T) -> String,
    {
        let mut existing: Vec<T> = self.read_list(key).await?;
        let mut seen: HashSet<String> = existing.iter().map(&dedup).collect();
        let fresh: Vec<T> = rows.into_iter().filter(|r| seen.insert(dedup(r))).collect();
        if fresh.is_empty() {
            return Ok(fresh);
        }

        let mut merged = fresh.clone();
        merged.append(&mut existing);
        self.kv.put(key, &merged).await?;
        Ok(fresh)
    }

    async fn showcase(&self) -> Result<Vec<ShowcaseApp>> {
        if let Some(apps) = self.kv.get(SHOWCASE_KEY).await? {
            return Ok(apps);
        }
        let seeded = demo_apps();
        self.kv.put(SHOWCASE_KEY, &seeded).await?;
        info!(count = seeded.len(), "Seeded showcase with demo apps");
        Ok(seeded)
    }
}

#[async_trait]
impl StoreAdapter for LocalStore {
    async fn list_ideas(&self, owner_id: &str) -> Result<Vec<Idea>> {
        self.read_list(&ideas_key(owner_id)).await
    }

    async fn insert_ideas(&self, ideas: Vec<Idea>) -> Result<Vec<Idea>> {
        let mut owners: Vec<String> = Vec::new();
        for idea in &ideas {
            let owner = idea
                .owner_id
                .as_ref()
                .ok_or_else(|| AppError::Validation("idea has no owner".to_string()))?;
            if !owners.contains(owner) {
                owners.push(owner.clone());
            }
        }

        let _guard = self.write_lock.lock().await;
        let mut stored_ids = HashSet::new();
        for owner in owners {
            let batch: Vec<Idea> = ideas
                .iter()
                .filter(|i| i.owner_id.as_deref() == Some(owner.as_str()))
                .cloned()
                .collect();
            let fresh = self
                .prepend_unique(&ideas_key(&owner), batch, |i: &Idea| i.problem.clone())
                .await?;
            stored_ids.extend(fresh.into_iter().map(|i| i.id));
        }

        let stored: Vec<Idea> = ideas.into_iter().filter(|i| stored_ids.contains(&i.id)).collect();
        self.feed.publish(Table::Ideas, &stored)?;
        debug!(count = stored.len(), "Ideas stored");
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
        let _guard = self.write_lock.lock().await;
        self.kv.put(&ideas_key(owner_id), &Vec::<Idea>::new()).await
    }

    async fn list_showcase_apps(&self) -> Result<Vec<ShowcaseApp>> {
        let _guard = self.write_lock.lock().await;
        self.showcase().await
    }

    async fn insert_showcase_apps(&self, apps: Vec<ShowcaseApp>) -> Result<Vec<ShowcaseApp>> {
        let _guard = self.write_lock.lock().await;
        // Seed first so the demo entries stay behind the new ones.
        self.showcase().await?;
        let stored = self
            .prepend_unique(SHOWCASE_KEY, apps, |a: &ShowcaseApp| a.id.clone())
            .await?;
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
        let mut posts: Vec<ForumPost> = self.read_list(FORUM_KEY).await?;
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn insert_forum_posts(&self, posts: Vec<ForumPost>) -> Result<Vec<ForumPost>> {
        let _guard = self.write_lock.lock().await;
        let stored = self
            .prepend_unique(FORUM_KEY, posts, |p: &ForumPost| p.id.clone())
            .await?;
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

impl RealtimeSource for LocalStore {
    fn subscribe(&self, table: Table) -> broadcast::Receiver<ChangeEvent> {
        self.feed.subscribe(table)
    }
}
