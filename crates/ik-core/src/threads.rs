//! Read-time forum threading.
//!
//! Posts are stored flat; the tree is rebuilt on every read. Roots are sorted
//! newest first, replies oldest first at every depth.

use std::collections::{HashMap, HashSet};

use crate::models::ForumPost;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thread {
    pub post: ForumPost,
    pub replies: Vec<Thread>,
}

impl Thread {
    /// Number of posts in this subtree, root included.
    pub fn post_count(&self) -> usize {
        1 + self.replies.iter().map(Thread::post_count).sum::<usize>()
    }
}

/// Builds the thread forest from a flat post list.
///
/// A reply whose parent is missing is shown as its own root so that it stays
/// visible. Posts caught in a parent cycle are promoted the same way.
pub fn build_threads(posts: &[ForumPost]) -> Vec<Thread> {
    let ids: HashSet<&str> = posts.iter().map(|p| p.id.as_str()).collect();

    let mut children: HashMap<&str, Vec<&ForumPost>> = HashMap::new();
    let mut roots: Vec<&ForumPost> = Vec::new();
    for post in posts {
        match post.parent_id.as_deref() {
            Some(parent) if ids.contains(parent) && parent != post.id => {
                children.entry(parent).or_default().push(post)
            }
            _ => roots.push(post),
        }
    }

    let mut visited: HashSet<&str> = HashSet::new();
    let mut threads: Vec<Thread> = roots
        .into_iter()
        .map(|root| build_subtree(root, &children, &mut visited))
        .collect();

    // Anything unreachable from a root sits on a cycle.
    for post in posts {
        if !visited.contains(post.id.as_str()) {
            threads.push(build_subtree(post, &children, &mut visited));
        }
    }

    threads.sort_by(|a, b| b.post.created_at.cmp(&a.post.created_at));
    threads
}

fn build_subtree<'a>(
    post: &'a ForumPost,
    children: &HashMap<&str, Vec<&'a ForumPost>>,
    visited: &mut HashSet<&'a str>,
) -> Thread {
    visited.insert(post.id.as_str());
    let mut replies: Vec<Thread> = Vec::new();
    if let Some(kids) = children.get(post.id.as_str()) {
        for child in kids {
            if visited.contains(child.id.as_str()) {
                continue;
            }
            replies.push(build_subtree(child, children, visited));
        }
    }
    replies.sort_by(|a, b| a.post.created_at.cmp(&b.post.created_at));
    Thread {
        post: post.clone(),
        replies,
    }
}
