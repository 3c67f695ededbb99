use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use ik_core::{
    new_id, AppCategory, AppError, ChangeEvent, Credentials, ForumPost, Idea, IdeaCategory,
    MockAuthProvider, MockStoreAdapter, RealtimeSource, Result, ShowcaseApp, StoreAdapter, Table,
    User,
};
use tokio::sync::{broadcast, Notify};

use crate::{RealtimeBridge, Reconciler, RemoteApply, SessionEvent, SessionGate, SyncState};

/// In-memory store with the same uniqueness rule as the real backends and a
/// change feed published after every insert. With `hold` set, idea and forum
/// inserts signal `entered` and wait for `release`.
struct FakeStore {
    ideas: Mutex<Vec<Idea>>,
    apps: Mutex<Vec<ShowcaseApp>>,
    posts: Mutex<Vec<ForumPost>>,
    fail_inserts: AtomicBool,
    fail_forum_list: AtomicBool,
    hold: AtomicBool,
    entered: Notify,
    release: Notify,
    feed: broadcast::Sender<ChangeEvent>,
}

impl FakeStore {
    fn new() -> Arc<Self> {
        let (feed, _) = broadcast::channel(64);
        Arc::new(Self {
            ideas: Mutex::new(Vec::new()),
            apps: Mutex::new(vec![app("Seeded")]),
            posts: Mutex::new(Vec::new()),
            fail_inserts: AtomicBool::new(false),
            fail_forum_list: AtomicBool::new(false),
            hold: AtomicBool::new(false),
            entered: Notify::new(),
            release: Notify::new(),
            feed,
        })
    }

    fn check(&self) -> Result<()> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(AppError::Network("backend unreachable".into()));
        }
        Ok(())
    }

    async fn wait_for_release(&self) {
        if self.hold.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }

    fn publish<T: serde::Serialize>(&self, table: Table, row: &T) {
        let _ = self.feed.send(ChangeEvent::insert(table, row).unwrap());
    }
}

#[async_trait]
impl StoreAdapter for FakeStore {
    async fn list_ideas(&self, owner_id: &str) -> Result<Vec<Idea>> {
        Ok(self
            .ideas
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.owner_id.as_deref() == Some(owner_id))
            .cloned()
            .collect())
    }

    async fn insert_ideas(&self, ideas: Vec<Idea>) -> Result<Vec<Idea>> {
        self.wait_for_release().await;
        self.check()?;
        let mut stored = Vec::new();
        let mut all = self.ideas.lock().unwrap();
        for idea in ideas {
            if all.iter().any(|i| i.dedup_key() == idea.dedup_key()) {
                continue;
            }
            stored.push(idea);
        }
        for idea in stored.iter().rev() {
            all.insert(0, idea.clone());
        }
        drop(all);
        for idea in &stored {
            self.publish(Table::Ideas, idea);
        }
        Ok(stored)
    }

    async fn insert_idea(&self, idea: Idea) -> Result<Idea> {
        let mut stored = self.insert_ideas(vec![idea.clone()]).await?;
        stored.pop().ok_or(AppError::Validation("duplicate idea".into()))
    }

    async fn clear_ideas(&self, owner_id: &str) -> Result<()> {
        self.ideas
            .lock()
            .unwrap()
            .retain(|i| i.owner_id.as_deref() != Some(owner_id));
        Ok(())
    }

    async fn list_showcase_apps(&self) -> Result<Vec<ShowcaseApp>> {
        Ok(self.apps.lock().unwrap().clone())
    }

    async fn insert_showcase_apps(&self, apps: Vec<ShowcaseApp>) -> Result<Vec<ShowcaseApp>> {
        self.check()?;
        for app in apps.iter().rev() {
            self.apps.lock().unwrap().insert(0, app.clone());
            self.publish(Table::ShowcaseApps, app);
        }
        Ok(apps)
    }

    async fn insert_showcase_app(&self, app: ShowcaseApp) -> Result<ShowcaseApp> {
        self.insert_showcase_apps(vec![app.clone()]).await?;
        Ok(app)
    }

    async fn list_forum_posts(&self) -> Result<Vec<ForumPost>> {
        if self.fail_forum_list.load(Ordering::SeqCst) {
            return Err(AppError::Network("forum table unreachable".into()));
        }
        Ok(self.posts.lock().unwrap().clone())
    }

    async fn insert_forum_posts(&self, posts: Vec<ForumPost>) -> Result<Vec<ForumPost>> {
        self.wait_for_release().await;
        self.check()?;
        for post in posts.iter().rev() {
            self.posts.lock().unwrap().insert(0, post.clone());
            self.publish(Table::ForumPosts, post);
        }
        Ok(posts)
    }

    async fn insert_forum_post(&self, post: ForumPost) -> Result<ForumPost> {
        self.insert_forum_posts(vec![post.clone()]).await?;
        Ok(post)
    }
}

impl RealtimeSource for FakeStore {
    fn subscribe(&self, _table: Table) -> broadcast::Receiver<ChangeEvent> {
        self.feed.subscribe()
    }
}

fn idea(problem: &str) -> Idea {
    Idea {
        id: new_id(),
        owner_id: None,
        problem: problem.into(),
        solution: "Y".into(),
        category: IdeaCategory::Productivity,
        market_size_score: 80,
        source: None,
    }
}

fn app(name: &str) -> ShowcaseApp {
    ShowcaseApp {
        id: new_id(),
        name: name.into(),
        description: "an app".into(),
        image_url: "https://placehold.co/600x400".into(),
        app_url: None,
        category: AppCategory::Social,
    }
}

fn post(parent: Option<&str>) -> ForumPost {
    ForumPost {
        id: new_id(),
        created_at: Utc::now(),
        author: "a@example.com".into(),
        content: "hello".into(),
        idea: None,
        parent_id: parent.map(str::to_string),
    }
}

fn user(id: &str) -> User {
    User {
        id: id.into(),
        email: format!("{id}@example.com"),
    }
}

async fn wait_until(cond: impl Fn() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

// ── Reconciler ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_resubmitting_same_problem_adds_nothing() {
    let store = FakeStore::new();
    let reconciler = Reconciler::new(store.clone());
    reconciler.load_all(Some("owner-a")).await;

    let first = reconciler
        .submit_new_ideas(vec![idea("X"), idea("Z")], "owner-a")
        .await
        .unwrap();
    assert_eq!(first.len(), 2);

    let second = reconciler
        .submit_new_ideas(vec![idea("X"), idea("Z")], "owner-a")
        .await
        .unwrap();
    assert_eq!(second.len(), 2);
    assert_eq!(store.ideas.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_duplicates_within_one_batch_keep_first_seen() {
    let reconciler = Reconciler::new(FakeStore::new());
    reconciler.load_all(Some("owner-a")).await;

    let mut winner = idea("X");
    winner.solution = "first".into();
    let mut loser = idea("X");
    loser.solution = "second".into();

    let ideas = reconciler
        .submit_new_ideas(vec![winner, loser], "owner-a")
        .await
        .unwrap();
    assert_eq!(ideas.len(), 1);
    assert_eq!(ideas[0].solution, "first");
    assert_eq!(ideas[0].owner_id.as_deref(), Some("owner-a"));
}

#[tokio::test]
async fn test_owners_are_deduplicated_independently() {
    let store = FakeStore::new();
    let reconciler = Reconciler::new(store.clone());

    reconciler.load_all(Some("owner-a")).await;
    reconciler.submit_new_ideas(vec![idea("X")], "owner-a").await.unwrap();
    let a = reconciler.submit_new_ideas(vec![idea("X")], "owner-a").await.unwrap();
    assert_eq!(a.len(), 1);

    reconciler.clear_local_ideas();
    reconciler.load_all(Some("owner-b")).await;
    let b = reconciler.submit_new_ideas(vec![idea("X")], "owner-b").await.unwrap();
    assert_eq!(b.len(), 1);
    assert_eq!(b[0].owner_id.as_deref(), Some("owner-b"));

    assert_eq!(store.list_ideas("owner-a").await.unwrap().len(), 1);
    assert_eq!(store.ideas.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_submit_after_load_is_union_newest_first() {
    let store = FakeStore::new();
    let mut old = idea("old");
    old.owner_id = Some("owner-a".into());
    store.ideas.lock().unwrap().push(old.clone());

    let reconciler = Reconciler::new(store.clone());
    reconciler.load_all(Some("owner-a")).await;
    let ideas = reconciler
        .submit_new_ideas(vec![idea("new-1"), idea("old"), idea("new-2")], "owner-a")
        .await
        .unwrap();

    let problems: Vec<&str> = ideas.iter().map(|i| i.problem.as_str()).collect();
    assert_eq!(problems, vec!["new-1", "new-2", "old"]);
    assert!(reconciler
        .idea_collection()
        .entries()
        .iter()
        .all(|e| e.state == SyncState::Confirmed));
}

#[tokio::test]
async fn test_store_failure_leaves_ideas_untouched() {
    let mut mock = MockStoreAdapter::new();
    let mut existing = idea("kept");
    existing.owner_id = Some("owner-a".into());
    let loaded = existing.clone();
    mock.expect_list_ideas().returning(move |_| Ok(vec![loaded.clone()]));
    mock.expect_list_showcase_apps().returning(|| Ok(vec![]));
    mock.expect_list_forum_posts().returning(|| Ok(vec![]));
    mock.expect_insert_ideas()
        .times(1)
        .returning(|_| Err(AppError::Network("connection reset".into())));

    let reconciler = Reconciler::new(Arc::new(mock));
    reconciler.load_all(Some("owner-a")).await;
    let before = reconciler.idea_collection().entries().to_vec();

    let err = reconciler
        .submit_new_ideas(vec![idea("fresh")], "owner-a")
        .await
        .unwrap_err();
    assert_eq!(err, AppError::Network("connection reset".into()));
    assert_eq!(reconciler.idea_collection().entries(), before.as_slice());
}

#[tokio::test]
async fn test_fully_duplicate_batch_never_reaches_store() {
    let mut mock = MockStoreAdapter::new();
    let mut existing = idea("X");
    existing.owner_id = Some("owner-a".into());
    mock.expect_list_ideas().returning(move |_| Ok(vec![existing.clone()]));
    mock.expect_list_showcase_apps().returning(|| Ok(vec![]));
    mock.expect_list_forum_posts().returning(|| Ok(vec![]));
    mock.expect_insert_ideas().never();

    let reconciler = Reconciler::new(Arc::new(mock));
    reconciler.load_all(Some("owner-a")).await;
    let ideas = reconciler.submit_new_ideas(vec![idea("X")], "owner-a").await.unwrap();
    assert_eq!(ideas.len(), 1);
}

#[tokio::test]
async fn test_load_for_new_owner_yields_empty_ideas_and_showcase() {
    let reconciler = Reconciler::new(FakeStore::new());
    let report = reconciler.load_all(Some("fresh-owner")).await;

    assert!(report.is_complete());
    assert!(reconciler.ideas().is_empty());
    assert_eq!(reconciler.showcase_apps().len(), 1);
}

#[tokio::test]
async fn test_one_failed_fetch_does_not_abort_the_others() {
    let store = FakeStore::new();
    store.fail_forum_list.store(true, Ordering::SeqCst);
    let reconciler = Reconciler::new(store.clone());

    let report = reconciler.load_all(None).await;
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, Table::ForumPosts);
    assert_eq!(reconciler.showcase_apps().len(), 1);
    assert!(reconciler.forum_posts().is_empty());
}

#[tokio::test]
async fn test_failed_reload_keeps_last_known_good() {
    let store = FakeStore::new();
    store.posts.lock().unwrap().push(post(None));
    let reconciler = Reconciler::new(store.clone());
    reconciler.load_all(None).await;
    assert_eq!(reconciler.forum_posts().len(), 1);

    store.fail_forum_list.store(true, Ordering::SeqCst);
    let report = reconciler.load_all(None).await;
    assert!(!report.is_complete());
    assert_eq!(reconciler.forum_posts().len(), 1);
}

#[tokio::test]
async fn test_clear_ideas_is_immediate_and_persisted() {
    let store = FakeStore::new();
    let reconciler = Reconciler::new(store.clone());
    reconciler.load_all(Some("owner-a")).await;
    reconciler.submit_new_ideas(vec![idea("X")], "owner-a").await.unwrap();

    reconciler.clear_ideas("owner-a").await.unwrap();
    assert!(reconciler.ideas().is_empty());
    assert!(store.list_ideas("owner-a").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_showcase_failure_rolls_back() {
    let store = FakeStore::new();
    let reconciler = Reconciler::new(store.clone());
    reconciler.load_all(None).await;

    store.fail_inserts.store(true, Ordering::SeqCst);
    assert!(reconciler.submit_showcase_app(app("Broken")).await.is_err());
    assert_eq!(reconciler.showcase_apps().len(), 1);

    store.fail_inserts.store(false, Ordering::SeqCst);
    let apps = reconciler.submit_showcase_app(app("Works")).await.unwrap();
    assert_eq!(apps[0].name, "Works");
    assert_eq!(apps.len(), 2);
}

#[tokio::test]
async fn test_reply_lands_under_its_root() {
    let reconciler = Reconciler::new(FakeStore::new());
    reconciler.load_all(None).await;

    let root = post(None);
    reconciler.submit_forum_post(root.clone()).await.unwrap();
    let first = post(Some(&root.id));
    reconciler.submit_forum_post(first.clone()).await.unwrap();
    let mut second = post(Some(&root.id));
    second.created_at = first.created_at + chrono::Duration::seconds(5);
    reconciler.submit_forum_post(second.clone()).await.unwrap();
    let mut newer_root = post(None);
    newer_root.created_at = second.created_at + chrono::Duration::seconds(5);
    reconciler.submit_forum_post(newer_root.clone()).await.unwrap();

    let threads = reconciler.forum_threads();
    assert_eq!(threads.len(), 2);
    assert_eq!(threads[0].post.id, newer_root.id);
    let replies: Vec<&str> = threads[1].replies.iter().map(|t| t.post.id.as_str()).collect();
    assert_eq!(replies, vec![first.id.as_str(), second.id.as_str()]);
}

#[tokio::test]
async fn test_reply_to_unknown_post_is_rejected() {
    let reconciler = Reconciler::new(FakeStore::new());
    reconciler.load_all(None).await;
    let err = reconciler.submit_forum_post(post(Some("missing"))).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_, _)));
    assert!(reconciler.forum_posts().is_empty());
}

// ── Realtime ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_remote_insert_with_known_id_is_ignored() {
    let reconciler = Reconciler::new(FakeStore::new());
    reconciler.load_all(None).await;
    let existing = reconciler.showcase_apps()[0].clone();

    let outcome = reconciler
        .apply_remote_insert(ChangeEvent::insert(Table::ShowcaseApps, &existing).unwrap());
    assert_eq!(outcome, RemoteApply::Duplicate);
    assert_eq!(reconciler.showcase_apps().len(), 1);

    let outcome = reconciler
        .apply_remote_insert(ChangeEvent::insert(Table::ShowcaseApps, &app("Remote")).unwrap());
    assert_eq!(outcome, RemoteApply::Inserted);
    assert_eq!(reconciler.showcase_apps()[0].name, "Remote");
}

#[tokio::test]
async fn test_remote_idea_for_other_owner_is_ignored() {
    let reconciler = Reconciler::new(FakeStore::new());
    reconciler.load_all(Some("owner-a")).await;

    let mut foreign = idea("X");
    foreign.owner_id = Some("owner-b".into());
    let outcome = reconciler.apply_remote_insert(ChangeEvent::insert(Table::Ideas, &foreign).unwrap());
    assert_eq!(outcome, RemoteApply::Ignored);
    assert!(reconciler.ideas().is_empty());
}

#[tokio::test]
async fn test_malformed_payload_is_reported() {
    let reconciler = Reconciler::new(FakeStore::new());
    let event = ChangeEvent {
        table: Table::ForumPosts,
        record: serde_json::json!({ "content": "no id" }),
    };
    assert_eq!(reconciler.apply_remote_insert(event), RemoteApply::Malformed);
}

#[tokio::test]
async fn test_echo_of_own_post_is_not_duplicated() {
    let store = FakeStore::new();
    let reconciler = Arc::new(Reconciler::new(store.clone()));
    reconciler.load_all(None).await;
    let bridge = RealtimeBridge::new(reconciler.clone(), store.clone());
    let subscription = bridge.subscribe(Table::ForumPosts);
    assert!(subscription.is_active());

    reconciler.submit_forum_post(post(None)).await.unwrap();
    // Give the echo time to arrive.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(reconciler.forum_posts().len(), 1);

    // A post written by another client arrives through the bridge.
    store.insert_forum_post(post(None)).await.unwrap();
    let r = reconciler.clone();
    wait_until(move || r.forum_posts().len() == 2).await;

    subscription.close().await;
    store.insert_forum_post(post(None)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(reconciler.forum_posts().len(), 2);
}

#[tokio::test]
async fn test_echo_before_store_response_confirms_pending_post() {
    let store = FakeStore::new();
    let reconciler = Reconciler::new(store.clone());
    reconciler.load_all(None).await;
    store.hold.store(true, Ordering::SeqCst);

    let local = post(None);
    let (result, _) = tokio::join!(reconciler.submit_forum_post(local.clone()), async {
        store.entered.notified().await;
        assert_eq!(reconciler.forum_collection().entries()[0].state, SyncState::Pending);

        let echo = ChangeEvent::insert(Table::ForumPosts, &local).unwrap();
        assert_eq!(reconciler.apply_remote_insert(echo), RemoteApply::Confirmed);
        assert_eq!(reconciler.forum_posts().len(), 1);
        store.release.notify_one();
    });

    result.unwrap();
    let posts = reconciler.forum_collection();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts.entries()[0].state, SyncState::Confirmed);
    assert_eq!(posts.entries()[0].item.id, local.id);
}

#[tokio::test]
async fn test_remote_idea_replaces_pending_local_twin() {
    let store = FakeStore::new();
    let reconciler = Reconciler::new(store.clone());
    reconciler.load_all(Some("u1")).await;
    store.hold.store(true, Ordering::SeqCst);

    // Another client stores the same problem while ours is in flight.
    let mut remote = idea("X");
    remote.owner_id = Some("u1".into());
    let (result, _) = tokio::join!(reconciler.submit_new_ideas(vec![idea("X")], "u1"), async {
        store.entered.notified().await;
        store.hold.store(false, Ordering::SeqCst);
        store.insert_ideas(vec![remote.clone()]).await.unwrap();

        let echo = ChangeEvent::insert(Table::Ideas, &remote).unwrap();
        assert_eq!(reconciler.apply_remote_insert(echo), RemoteApply::Confirmed);
        store.release.notify_one();
    });

    assert_eq!(result.unwrap(), vec![remote.clone()]);
    let ideas = reconciler.idea_collection();
    assert_eq!(ideas.len(), 1);
    assert_eq!(ideas.entries()[0].state, SyncState::Confirmed);
    assert_eq!(store.list_ideas("u1").await.unwrap(), vec![remote]);
}

#[tokio::test]
async fn test_dropping_subscription_stops_listener() {
    let store = FakeStore::new();
    let reconciler = Arc::new(Reconciler::new(store.clone()));
    let bridge = RealtimeBridge::new(reconciler.clone(), store.clone());

    drop(bridge.subscribe(Table::ForumPosts));
    tokio::time::sleep(Duration::from_millis(20)).await;
    store.insert_forum_post(post(None)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(reconciler.forum_posts().is_empty());
}

// ── Session gate ────────────────────────────────────────────────────────────

fn gate_with(auth: MockAuthProvider, store: Arc<FakeStore>) -> (SessionGate, Arc<Reconciler>) {
    let reconciler = Arc::new(Reconciler::new(store));
    (SessionGate::new(Arc::new(auth), reconciler.clone()), reconciler)
}

#[tokio::test]
async fn test_with_auth_requires_a_session() {
    let (gate, _) = gate_with(MockAuthProvider::new(), FakeStore::new());
    let mut events = gate.events();

    let mut ran = false;
    assert!(gate.with_auth(|_| ran = true).is_none());
    assert!(!ran);
    assert_eq!(events.try_recv().unwrap(), SessionEvent::AuthRequired);
    assert_eq!(gate.require_user().unwrap_err(), AppError::AuthRequired);
}

#[tokio::test]
async fn test_sign_in_loads_owner_ideas() {
    let store = FakeStore::new();
    let mut persisted = idea("saved earlier");
    persisted.owner_id = Some("u1".into());
    store.ideas.lock().unwrap().push(persisted);

    let mut auth = MockAuthProvider::new();
    auth.expect_sign_in().returning(|_| Ok(user("u1")));
    let (gate, reconciler) = gate_with(auth, store);

    let signed_in = gate.sign_in(&Credentials::new("u1@example.com", "pw")).await.unwrap();
    assert_eq!(signed_in.user.id, "u1");
    assert!(signed_in.report.is_complete());
    assert_eq!(reconciler.ideas().len(), 1);
    assert_eq!(gate.with_auth(|u| u.id.clone()), Some("u1".to_string()));
}

#[tokio::test]
async fn test_failed_sign_in_stays_anonymous() {
    let mut auth = MockAuthProvider::new();
    auth.expect_sign_in()
        .returning(|_| Err(AppError::Auth("invalid login credentials".into())));
    let (gate, _) = gate_with(auth, FakeStore::new());

    let err = gate.sign_in(&Credentials::new("x@example.com", "bad")).await.unwrap_err();
    assert!(matches!(err, AppError::Auth(_)));
    assert!(!gate.is_authenticated());
}

#[tokio::test]
async fn test_sign_out_clears_only_ideas() {
    let mut auth = MockAuthProvider::new();
    auth.expect_sign_in().returning(|_| Ok(user("u1")));
    auth.expect_sign_out().times(1).returning(|| Ok(()));
    let store = FakeStore::new();
    let (gate, reconciler) = gate_with(auth, store);

    gate.sign_in(&Credentials::new("u1@example.com", "pw")).await.unwrap();
    reconciler.submit_new_ideas(vec![idea("X")], "u1").await.unwrap();
    reconciler.submit_forum_post(post(None)).await.unwrap();
    let apps = reconciler.showcase_apps();
    let posts = reconciler.forum_posts();

    gate.sign_out().await.unwrap();
    assert!(reconciler.ideas().is_empty());
    assert_eq!(reconciler.showcase_apps(), apps);
    assert_eq!(reconciler.forum_posts(), posts);
    assert!(!gate.is_authenticated());
}

#[tokio::test]
async fn test_switching_identity_discards_previous_ideas() {
    let store = FakeStore::new();
    let mut auth = MockAuthProvider::new();
    auth.expect_sign_in()
        .returning(|creds| Ok(user(creds.email.split('@').next().unwrap())));
    let (gate, reconciler) = gate_with(auth, store);

    gate.sign_in(&Credentials::new("alice@example.com", "pw")).await.unwrap();
    reconciler.submit_new_ideas(vec![idea("alice idea")], "alice").await.unwrap();

    gate.sign_in(&Credentials::new("bob@example.com", "pw")).await.unwrap();
    assert!(reconciler.ideas().is_empty());
    assert_eq!(gate.current_user().unwrap().id, "bob");
}

#[tokio::test]
async fn test_restore_without_session_loads_public_collections() {
    let mut auth = MockAuthProvider::new();
    auth.expect_current_user().returning(|| Ok(None));
    let (gate, reconciler) = gate_with(auth, FakeStore::new());

    let report = gate.restore().await.unwrap();
    assert!(report.is_complete());
    assert_eq!(reconciler.showcase_apps().len(), 1);
    assert!(!gate.is_authenticated());
}
