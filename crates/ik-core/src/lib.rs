//! ik-core/src/lib.rs
//!
//! Domain models, port traits and the error taxonomy shared by every InfoKing crate.

pub mod error;
pub mod feed;
pub mod models;
pub mod threads;
pub mod traits;

// Re-exporting for easier access in other crates
pub use error::*;
pub use feed::ChangeFeed;
pub use models::*;
pub use threads::*;
pub use traits::*;
