//! In-process change feed shared by the store plugins.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::{ChangeEvent, Table};
use crate::traits::RealtimeSource;

const FEED_CAPACITY: usize = 256;

/// One broadcast channel per table. Publishing with no listeners is not an error.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    ideas: broadcast::Sender<ChangeEvent>,
    showcase_apps: broadcast::Sender<ChangeEvent>,
    forum_posts: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self {
            ideas: broadcast::channel(FEED_CAPACITY).0,
            showcase_apps: broadcast::channel(FEED_CAPACITY).0,
            forum_posts: broadcast::channel(FEED_CAPACITY).0,
        }
    }

    fn sender(&self, table: Table) -> &broadcast::Sender<ChangeEvent> {
        match table {
            Table::Ideas => &self.ideas,
            Table::ShowcaseApps => &self.showcase_apps,
            Table::ForumPosts => &self.forum_posts,
        }
    }

    /// Receivers currently open on `table`.
    pub fn listener_count(&self, table: Table) -> usize {
        self.sender(table).receiver_count()
    }

    /// Announces committed rows, in order.
    pub fn publish<T: Serialize>(&self, table: Table, rows: &[T]) -> crate::Result<()> {
        let sender = self.sender(table);
        for row in rows {
            let _ = sender.send(ChangeEvent::insert(table, row)?);
        }
        Ok(())
    }
}

impl RealtimeSource for ChangeFeed {
    fn subscribe(&self, table: Table) -> broadcast::Receiver<ChangeEvent> {
        self.sender(table).subscribe()
    }
}
