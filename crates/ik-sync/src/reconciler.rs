//! # Entity Reconciler
//!
//! Sole owner of the in-memory idea, showcase and forum collections. Every
//! mutation clones the current collection, edits the copy and swaps the `Arc`,
//! so readers always see a whole collection and never a half-applied edit.
//!
//! Local inserts are two-phase: entries are added as `Pending`, then confirmed
//! from the store's response (or a realtime echo) or rolled back on failure.

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use ik_core::{
    build_threads, AppError, ChangeEvent, EntityId, ForumPost, Idea, Result, Scope, ShowcaseApp,
    StoreAdapter, Table, Thread,
};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Applied locally, not yet acknowledged by the store
    Pending,
    Confirmed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<T> {
    pub item: T,
    pub state: SyncState,
}

/// Entities addressable by identifier.
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Idea {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for ShowcaseApp {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for ForumPost {
    fn key(&self) -> &str {
        &self.id
    }
}

/// An insertion-ordered collection, newest first, indexed by identifier.
#[derive(Debug, Clone)]
pub struct Collection<T> {
    entries: Vec<Entry<T>>,
    ids: HashSet<EntityId>,
    scope: Option<Scope>,
    /// Bumped whenever the collection is reset; in-flight loads started under
    /// an older epoch are discarded.
    epoch: u64,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            ids: HashSet::new(),
            scope: None,
            epoch: 0,
        }
    }
}

impl<T: Keyed + Clone> Collection<T> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn scope(&self) -> Option<&Scope> {
        self.scope.as_ref()
    }

    pub fn entries(&self) -> &[Entry<T>] {
        &self.entries
    }

    pub fn items(&self) -> Vec<T> {
        self.entries.iter().map(|e| e.item.clone()).collect()
    }

    pub fn get(&self, id: &str) -> Option<&Entry<T>> {
        if !self.contains(id) {
            return None;
        }
        self.entries.iter().find(|e| e.item.key() == id)
    }

    fn reset(&mut self, scope: Option<Scope>) {
        self.entries.clear();
        self.ids.clear();
        self.scope = scope;
        self.epoch += 1;
    }

    /// Wholesale replacement with confirmed rows. Pending local entries the
    /// fetch did not return yet are kept on top.
    fn replace_confirmed(&mut self, rows: Vec<T>) {
        let fetched: HashSet<&str> = rows.iter().map(|r| r.key()).collect();
        let mut entries: Vec<Entry<T>> = self
            .entries
            .iter()
            .filter(|e| e.state == SyncState::Pending && !fetched.contains(e.item.key()))
            .cloned()
            .collect();
        entries.extend(rows.into_iter().map(|item| Entry {
            item,
            state: SyncState::Confirmed,
        }));
        self.ids = entries.iter().map(|e| e.item.key().to_string()).collect();
        self.entries = entries;
    }

    fn prepend(&mut self, items: Vec<T>, state: SyncState) {
        let mut entries = Vec::with_capacity(items.len() + self.entries.len());
        for item in items {
            if self.ids.insert(item.key().to_string()) {
                entries.push(Entry { item, state });
            }
        }
        entries.append(&mut self.entries);
        self.entries = entries;
    }

    fn remove_ids(&mut self, ids: &HashSet<EntityId>) {
        self.entries.retain(|e| !ids.contains(e.item.key()));
        for id in ids {
            self.ids.remove(id);
        }
    }

    /// Swaps the entry `id` for a confirmed `row` in the same position.
    fn supersede(&mut self, id: &str, row: T) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.item.key() == id) {
            self.ids.remove(id);
            self.ids.insert(row.key().to_string());
            entry.item = row;
            entry.state = SyncState::Confirmed;
        }
    }

    /// Marks an entry confirmed, taking the authoritative row. Returns false
    /// when the id is not present.
    fn confirm(&mut self, row: T) -> bool {
        match self.entries.iter_mut().find(|e| e.item.key() == row.key()) {
            Some(entry) => {
                entry.item = row;
                entry.state = SyncState::Confirmed;
                true
            }
            None => false,
        }
    }
}

/// Atomic-replacement cell around a collection.
struct Slot<T> {
    inner: RwLock<Arc<Collection<T>>>,
}

impl<T: Keyed + Clone> Slot<T> {
    fn new() -> Self {
        Self {
            inner: RwLock::new(Arc::new(Collection::default())),
        }
    }

    fn snapshot(&self) -> Arc<Collection<T>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update<R>(&self, edit: impl FnOnce(&mut Collection<T>) -> R) -> R {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = (**guard).clone();
        let result = edit(&mut next);
        *guard = Arc::new(next);
        result
    }
}

/// Failures collected while loading; the other collections still populate.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub failures: Vec<(Table, AppError)>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Outcome of folding one realtime notification into a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteApply {
    Inserted,
    /// Echo of a local pending insert, or a remote row replacing one
    Confirmed,
    Duplicate,
    /// Belongs to a scope not currently loaded
    Ignored,
    Malformed,
}

pub struct Reconciler {
    store: Arc<dyn StoreAdapter>,
    ideas: Slot<Idea>,
    showcase: Slot<ShowcaseApp>,
    forum: Slot<ForumPost>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn StoreAdapter>) -> Self {
        Self {
            store,
            ideas: Slot::new(),
            showcase: Slot::new(),
            forum: Slot::new(),
        }
    }

    // ── Reads ────────────────────────────────────────────────────────────────

    pub fn ideas(&self) -> Vec<Idea> {
        self.ideas.snapshot().items()
    }

    pub fn idea_collection(&self) -> Arc<Collection<Idea>> {
        self.ideas.snapshot()
    }

    pub fn find_idea(&self, id: &str) -> Option<Idea> {
        self.ideas.snapshot().get(id).map(|e| e.item.clone())
    }

    pub fn showcase_apps(&self) -> Vec<ShowcaseApp> {
        self.showcase.snapshot().items()
    }

    pub fn showcase_collection(&self) -> Arc<Collection<ShowcaseApp>> {
        self.showcase.snapshot()
    }

    pub fn forum_posts(&self) -> Vec<ForumPost> {
        self.forum.snapshot().items()
    }

    pub fn forum_collection(&self) -> Arc<Collection<ForumPost>> {
        self.forum.snapshot()
    }

    pub fn forum_threads(&self) -> Vec<Thread> {
        build_threads(&self.forum_posts())
    }

    // ── Loading ──────────────────────────────────────────────────────────────

    /// Fetches all three collections concurrently and replaces them.
    ///
    /// Ideas are fetched only for an owner; without one the idea collection is
    /// emptied. A failed fetch keeps the previous snapshot when it belongs to
    /// the same scope, and empties the collection otherwise.
    pub async fn load_all(&self, owner_id: Option<&str>) -> LoadReport {
        let idea_scope = owner_id.map(|o| Scope::Owner(o.to_string()));
        let idea_epoch = self.ideas.update(|c| {
            if c.scope != idea_scope {
                c.reset(idea_scope.clone());
            }
            c.epoch
        });
        let showcase_epoch = self.showcase.snapshot().epoch;
        let forum_epoch = self.forum.snapshot().epoch;

        let store = &self.store;
        let fetch_ideas = async {
            match owner_id {
                Some(owner) => Some(store.list_ideas(owner).await),
                None => None,
            }
        };
        let (ideas, apps, posts) = tokio::join!(
            fetch_ideas,
            store.list_showcase_apps(),
            store.list_forum_posts()
        );

        let mut report = LoadReport::default();
        if let Some(result) = ideas {
            self.apply_load(&self.ideas, Table::Ideas, idea_epoch, idea_scope, result, &mut report);
        }
        self.apply_load(&self.showcase, Table::ShowcaseApps, showcase_epoch, Some(Scope::Public), apps, &mut report);
        self.apply_load(&self.forum, Table::ForumPosts, forum_epoch, Some(Scope::Public), posts, &mut report);

        info!(
            owner_id = owner_id.unwrap_or("anonymous"),
            ideas = self.ideas.snapshot().len(),
            showcase_apps = self.showcase.snapshot().len(),
            forum_posts = self.forum.snapshot().len(),
            failures = report.failures.len(),
            "Collections loaded"
        );
        report
    }

    fn apply_load<T: Keyed + Clone>(
        &self,
        slot: &Slot<T>,
        table: Table,
        epoch: u64,
        scope: Option<Scope>,
        result: Result<Vec<T>>,
        report: &mut LoadReport,
    ) {
        match result {
            Ok(rows) => slot.update(|c| {
                if c.epoch != epoch {
                    debug!(%table, "Discarding stale load result");
                    return;
                }
                if c.scope != scope {
                    c.reset(scope);
                }
                c.replace_confirmed(rows);
            }),
            Err(e) => {
                warn!(%table, error = %e, "Fetch failed, keeping last known good snapshot");
                slot.update(|c| {
                    if c.epoch == epoch && c.scope != scope {
                        c.reset(scope);
                    }
                });
                report.failures.push((table, e));
            }
        }
    }

    // ── Ideas ────────────────────────────────────────────────────────────────

    /// Stores the candidates that are new for `owner_id` and returns the full
    /// idea collection.
    ///
    /// Candidates are deduplicated by problem text against the collection and
    /// against each other, first seen wins. On store failure the collection is
    /// left exactly as it was and the error is returned.
    pub async fn submit_new_ideas(&self, candidates: Vec<Idea>, owner_id: &str) -> Result<Vec<Idea>> {
        let scope = Scope::Owner(owner_id.to_string());
        let current = self.ideas.snapshot();
        match current.scope() {
            None => self.ideas.update(|c| {
                if c.scope.is_none() {
                    c.reset(Some(scope.clone()))
                }
            }),
            Some(s) if *s == scope => {}
            Some(_) => {
                return Err(AppError::Validation(
                    "ideas are loaded for a different owner".to_string(),
                ))
            }
        }

        let mut seen: HashSet<String> = current
            .entries()
            .iter()
            .filter(|e| e.item.owner_id.as_deref() == Some(owner_id))
            .map(|e| e.item.problem.clone())
            .collect();
        let unique: Vec<Idea> = candidates
            .into_iter()
            .map(|mut idea| {
                idea.owner_id = Some(owner_id.to_string());
                idea
            })
            .filter(|idea| seen.insert(idea.problem.clone()))
            .collect();

        if unique.is_empty() {
            debug!(owner_id, "No new ideas after deduplication");
            return Ok(self.ideas());
        }

        let store = self.store.clone();
        let count = unique.len();
        self.commit(&self.ideas, Table::Ideas, unique, move |rows| async move {
            store.insert_ideas(rows).await
        })
        .await?;
        info!(owner_id, count, "Ideas submitted");
        Ok(self.ideas())
    }

    /// Empties the idea collection at once, then persists the reset.
    pub async fn clear_ideas(&self, owner_id: &str) -> Result<()> {
        self.ideas.update(|c| c.reset(Some(Scope::Owner(owner_id.to_string()))));
        self.store.clear_ideas(owner_id).await?;
        info!(owner_id, "Ideas cleared");
        Ok(())
    }

    /// Drops the in-memory ideas without touching the store (sign-out).
    pub fn clear_local_ideas(&self) {
        self.ideas.update(|c| c.reset(None));
    }

    // ── Showcase & forum ─────────────────────────────────────────────────────

    pub async fn submit_showcase_app(&self, app: ShowcaseApp) -> Result<Vec<ShowcaseApp>> {
        let store = self.store.clone();
        self.commit(&self.showcase, Table::ShowcaseApps, vec![app], move |mut rows| async move {
            let app = rows.remove(0);
            store.insert_showcase_app(app).await.map(|stored| vec![stored])
        })
        .await?;
        Ok(self.showcase_apps())
    }

    /// Appends a post. A reply must reference a post already in the collection.
    pub async fn submit_forum_post(&self, post: ForumPost) -> Result<Vec<ForumPost>> {
        if let Some(parent) = post.parent_id.as_deref() {
            if !self.forum.snapshot().contains(parent) {
                return Err(AppError::NotFound("forum post".to_string(), parent.to_string()));
            }
        }
        let store = self.store.clone();
        self.commit(&self.forum, Table::ForumPosts, vec![post], move |mut rows| async move {
            let post = rows.remove(0);
            store.insert_forum_post(post).await.map(|stored| vec![stored])
        })
        .await?;
        Ok(self.forum_posts())
    }

    /// Two-phase insert: prepend as pending, persist, then confirm what the
    /// store kept and drop the rest, or roll everything back on failure.
    async fn commit<T, F, Fut>(&self, slot: &Slot<T>, table: Table, rows: Vec<T>, persist: F) -> Result<()>
    where
        T: Keyed + Clone,
        F: FnOnce(Vec<T>) -> Fut,
        Fut: Future<Output = Result<Vec<T>>>,
    {
        let pending: Vec<T> = {
            let current = slot.snapshot();
            rows.into_iter().filter(|r| !current.contains(r.key())).collect()
        };
        if pending.is_empty() {
            return Ok(());
        }
        let pending_ids: HashSet<EntityId> = pending.iter().map(|r| r.key().to_string()).collect();
        slot.update(|c| c.prepend(pending.clone(), SyncState::Pending));

        match persist(pending).await {
            Ok(stored) => {
                slot.update(|c| {
                    let mut unconfirmed = pending_ids.clone();
                    for row in stored {
                        unconfirmed.remove(row.key());
                        // A realtime echo may already have confirmed it.
                        c.confirm(row);
                    }
                    if !unconfirmed.is_empty() {
                        debug!(%table, dropped = unconfirmed.len(), "Store rejected duplicate rows");
                        c.remove_ids(&unconfirmed);
                    }
                });
                Ok(())
            }
            Err(e) => {
                warn!(%table, error = %e, "Insert failed, rolling back pending entries");
                slot.update(|c| c.remove_ids(&pending_ids));
                Err(e)
            }
        }
    }

    // ── Realtime ─────────────────────────────────────────────────────────────

    /// Folds a pushed insert into its collection, deduplicating by identifier.
    pub fn apply_remote_insert(&self, event: ChangeEvent) -> RemoteApply {
        match event.table {
            Table::Ideas => {
                let Some(idea) = decode::<Idea>(&event) else {
                    return RemoteApply::Malformed;
                };
                self.ideas.update(|c| {
                    let in_scope = match (&c.scope, idea.owner_id.as_deref()) {
                        (Some(Scope::Owner(owner)), Some(idea_owner)) => owner == idea_owner,
                        _ => false,
                    };
                    if !in_scope {
                        return RemoteApply::Ignored;
                    }
                    if !c.contains(&idea.id) {
                        let twin = c
                            .entries
                            .iter()
                            .find(|e| e.item.problem == idea.problem)
                            .map(|e| (e.item.id.clone(), e.state));
                        match twin {
                            // The store will reject the local row; the remote one takes its place.
                            Some((local_id, SyncState::Pending)) => {
                                c.supersede(&local_id, idea);
                                return RemoteApply::Confirmed;
                            }
                            Some(_) => return RemoteApply::Duplicate,
                            None => {}
                        }
                    }
                    fold(c, idea)
                })
            }
            Table::ShowcaseApps => match decode::<ShowcaseApp>(&event) {
                Some(app) => self.showcase.update(|c| fold(c, app)),
                None => RemoteApply::Malformed,
            },
            Table::ForumPosts => match decode::<ForumPost>(&event) {
                Some(post) => self.forum.update(|c| fold(c, post)),
                None => RemoteApply::Malformed,
            },
        }
    }
}

fn fold<T: Keyed + Clone>(c: &mut Collection<T>, row: T) -> RemoteApply {
    match c.get(row.key()).map(|e| e.state) {
        Some(SyncState::Pending) => {
            c.confirm(row);
            RemoteApply::Confirmed
        }
        Some(SyncState::Confirmed) => RemoteApply::Duplicate,
        None => {
            c.prepend(vec![row], SyncState::Confirmed);
            RemoteApply::Inserted
        }
    }
}

fn decode<T: DeserializeOwned>(event: &ChangeEvent) -> Option<T> {
    serde_json::from_value(event.record.clone())
        .inspect_err(|e| warn!(table = %event.table, error = %e, "Malformed realtime payload"))
        .ok()
}
