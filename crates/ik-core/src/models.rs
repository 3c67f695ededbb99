//! # Domain Models
//!
//! The entities shared by every InfoKing crate. Wire names are camelCase so the
//! same JSON travels through the key-value store, the realtime feed and the
//! generative-model responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque unique identifier for any stored entity.
pub type EntityId = String;

/// Fresh time-ordered identifier.
pub fn new_id() -> EntityId {
    Uuid::now_v7().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdeaCategory {
    Health,
    Productivity,
    Finance,
    Other,
}

impl IdeaCategory {
    /// Lenient label lookup; anything unrecognised lands in `Other`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "health" => Self::Health,
            "productivity" => Self::Productivity,
            "finance" => Self::Finance,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Health => "Health",
            Self::Productivity => "Productivity",
            Self::Finance => "Finance",
            Self::Other => "Other",
        }
    }
}

/// Where a generated problem was observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeaSource {
    pub platform: String,
    pub url: String,
}

/// A generated problem/solution pair.
///
/// Two ideas of the same owner with identical problem text are the same idea.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Idea {
    pub id: EntityId,
    /// `None` only for anonymous local data
    #[serde(default)]
    pub owner_id: Option<String>,
    pub problem: String,
    pub solution: String,
    pub category: IdeaCategory,
    /// 0..=100, 100 being a billion-user market
    pub market_size_score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<IdeaSource>,
}

impl Idea {
    /// The (owner, problem-text) uniqueness key.
    pub fn dedup_key(&self) -> (Option<&str>, &str) {
        (self.owner_id.as_deref(), self.problem.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppCategory {
    Health,
    Productivity,
    Finance,
    Social,
    Other,
}

impl AppCategory {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "health" => Self::Health,
            "productivity" => Self::Productivity,
            "finance" => Self::Finance,
            "social" => Self::Social,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Health => "Health",
            Self::Productivity => "Productivity",
            Self::Finance => "Finance",
            Self::Social => "Social",
            Self::Other => "Other",
        }
    }
}

/// A user-submitted app in the public gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowcaseApp {
    pub id: EntityId,
    pub name: String,
    pub description: String,
    /// Data URL for uploads, remote URL for seeded entries
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_url: Option<String>,
    pub category: AppCategory,
}

/// A community forum message. `parent_id == None` marks a thread root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForumPost {
    pub id: EntityId,
    pub created_at: DateTime<Utc>,
    pub author: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idea: Option<Idea>,
    #[serde(default)]
    pub parent_id: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
}

/// Email/password pair handed to an `AuthProvider`.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Visibility partition of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Showcase apps and forum posts
    Public,
    /// Ideas of one user
    Owner(String),
}

/// Collections that can emit change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Ideas,
    ShowcaseApps,
    ForumPosts,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ideas => "ideas",
            Self::ShowcaseApps => "showcase_apps",
            Self::ForumPosts => "forum_posts",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An insert notification pushed by a realtime-capable backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: Table,
    /// The inserted row, serialized like the entity itself
    pub record: serde_json::Value,
}

impl ChangeEvent {
    pub fn insert<T: Serialize>(table: Table, row: &T) -> crate::Result<Self> {
        Ok(Self {
            table,
            record: serde_json::to_value(row)?,
        })
    }
}

/// Read-time ordering of the idea list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOption {
    /// Collection order, newest first
    #[default]
    Default,
    MarketSizeDesc,
    MarketSizeAsc,
}

impl SortOption {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Default => "Default",
            Self::MarketSizeDesc => "Market Size (High to Low)",
            Self::MarketSizeAsc => "Market Size (Low to High)",
        }
    }
}

/// Returns a sorted copy; ties keep collection order.
pub fn sort_ideas(ideas: &[Idea], option: SortOption) -> Vec<Idea> {
    let mut sorted = ideas.to_vec();
    match option {
        SortOption::Default => {}
        SortOption::MarketSizeDesc => {
            sorted.sort_by(|a, b| b.market_size_score.cmp(&a.market_size_score))
        }
        SortOption::MarketSizeAsc => {
            sorted.sort_by(|a, b| a.market_size_score.cmp(&b.market_size_score))
        }
    }
    sorted
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectRatio {
    Square,
    Portrait,
    Landscape,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Portrait => "9:16",
            Self::Landscape => "16:9",
        }
    }
}

/// Base64 image returned by the image model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data_base64: String,
}

impl ImagePayload {
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data_base64)
    }
}

/// One slide of a generated pitch deck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PitchDeckSlide {
    pub slide: u32,
    pub title: String,
    pub content: String,
    pub image_prompt: String,
    /// Filled once the slide image has been generated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderOption {
    StarterCode,
    AiStudio,
    Replit,
}

impl BuilderOption {
    pub fn label(&self) -> &'static str {
        match self {
            Self::StarterCode => "React Starter Code",
            Self::AiStudio => "Google AI Studio Prompt",
            Self::Replit => "Replit Project Prompt",
        }
    }
}
