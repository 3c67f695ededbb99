//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be wired by the binary.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::Result;
use crate::models::{
    AspectRatio, ChangeEvent, Credentials, ForumPost, Idea, ImagePayload, ShowcaseApp, Table, User,
};

/// Durable persistence for ideas, showcase apps and forum posts.
///
/// Every `list_*` returns newest first. Failures must surface as `Err`, never as
/// an empty list, so callers can fall back to a cached snapshot.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait StoreAdapter: Send + Sync {
    // Ideas (owner scope)
    async fn list_ideas(&self, owner_id: &str) -> Result<Vec<Idea>>;
    /// Returns the rows actually stored, in input order. A backend may drop
    /// rows violating the (owner, problem) uniqueness rule.
    async fn insert_ideas(&self, ideas: Vec<Idea>) -> Result<Vec<Idea>>;
    async fn insert_idea(&self, idea: Idea) -> Result<Idea>;
    /// Persists an empty idea set for the owner.
    async fn clear_ideas(&self, owner_id: &str) -> Result<()>;

    // Showcase apps (public scope)
    async fn list_showcase_apps(&self) -> Result<Vec<ShowcaseApp>>;
    async fn insert_showcase_apps(&self, apps: Vec<ShowcaseApp>) -> Result<Vec<ShowcaseApp>>;
    async fn insert_showcase_app(&self, app: ShowcaseApp) -> Result<ShowcaseApp>;

    // Forum posts (public scope)
    async fn list_forum_posts(&self) -> Result<Vec<ForumPost>>;
    async fn insert_forum_posts(&self, posts: Vec<ForumPost>) -> Result<Vec<ForumPost>>;
    async fn insert_forum_post(&self, post: ForumPost) -> Result<ForumPost>;
}

/// Identity contract. `Err(AppError::Auth)` means rejection,
/// `Err(AppError::Network)` means the provider could not be reached.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The persisted session, if any.
    async fn current_user(&self) -> Result<Option<User>>;
    async fn sign_in(&self, credentials: &Credentials) -> Result<User>;
    async fn sign_up(&self, credentials: &Credentials) -> Result<User>;
    async fn sign_in_with_provider(&self, provider: &str) -> Result<User>;
    async fn sign_out(&self) -> Result<()>;
}

/// Backends that push insert notifications. Every successful insert is
/// delivered to all receivers, the writer's own included.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait RealtimeSource: Send + Sync {
    fn subscribe(&self, table: Table) -> broadcast::Receiver<ChangeEvent>;
}

/// Text and image generation service.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate_text(&self, prompt: &str) -> Result<String>;
    async fn generate_image(&self, prompt: &str, aspect_ratio: AspectRatio) -> Result<ImagePayload>;
}
