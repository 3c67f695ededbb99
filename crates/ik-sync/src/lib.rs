//! ik-sync/src/lib.rs
//!
//! Client-side synchronization layer: the reconciler owning the in-memory
//! collections, the realtime bridge feeding it, and the session gate scoping it.

pub mod realtime;
pub mod reconciler;
pub mod session;

pub use realtime::{RealtimeBridge, Subscription};
pub use reconciler::{Collection, Entry, Keyed, LoadReport, Reconciler, RemoteApply, SyncState};
pub use session::{SessionEvent, SessionGate, SignedIn};

#[cfg(test)]
mod tests;
