//! # ik-app
//!
//! The view-state orchestration layer for InfoKing.

pub mod orchestrator;
pub mod state;
pub mod upload;

pub use orchestrator::Orchestrator;
pub use state::{user_message, JobOutput, Modal, Notice, NoticeLevel, View, ViewState};
pub use upload::{ImageFile, ShowcaseUpload};
