//! View state rendered by the front end.

use ik_core::{AppError, EntityId, PitchDeckSlide, SortOption};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    Home,
    History,
    Apps,
    Forum,
}

impl View {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::History => "History",
            Self::Apps => "Apps",
            Self::Forum => "Forum",
        }
    }
}

/// At most one modal is open. Idea-bound modals carry the idea's id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modal {
    Upload,
    About,
    Brainstorm(EntityId),
    Mockup(EntityId),
    PitchDeck(EntityId),
    AppBuilder(EntityId),
    Auth,
    /// New thread when `reply_to` is `None`.
    Post { reply_to: Option<EntityId> },
    Donation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A banner that stays until the user dismisses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub message: String,
}

/// Output of the generation job bound to the open modal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobOutput {
    pub running: bool,
    pub brainstorm: Option<String>,
    pub mockup_url: Option<String>,
    pub deck: Option<Vec<PitchDeckSlide>>,
    pub deck_progress: Option<String>,
    pub builder_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub view: View,
    pub modal: Option<Modal>,
    pub sort: SortOption,
    pub online: bool,
    /// Idea generation in flight
    pub generating: bool,
    pub notices: Vec<Notice>,
    /// Inline error of the sign-in form
    pub auth_error: Option<String>,
    pub job: JobOutput,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            view: View::Home,
            modal: None,
            sort: SortOption::Default,
            online: true,
            generating: false,
            notices: Vec::new(),
            auth_error: None,
            job: JobOutput::default(),
        }
    }
}

/// Message shown to the user for a failure.
pub fn user_message(error: &AppError) -> String {
    match error {
        AppError::Network(_) => {
            "Could not reach the server. Check your connection and try again.".to_string()
        }
        AppError::Offline(_) => "You are offline. Reconnect to use the AI features.".to_string(),
        AppError::Auth(reason) => reason.clone(),
        AppError::AuthRequired => "Please sign in to continue.".to_string(),
        e if e.is_generation_failure() => {
            "The AI could not produce a usable answer. Please try again.".to_string()
        }
        AppError::NotConfigured(what) => format!("AI features are unavailable: {what}"),
        AppError::Validation(reason) => reason.clone(),
        AppError::NotFound(..) => error.to_string(),
        _ => "Something went wrong. Your data was left unchanged.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_failures_read_like_generation_failures() {
        assert_eq!(
            user_message(&AppError::Parse("missing field".into())),
            user_message(&AppError::Generation("http 500".into()))
        );
    }

    #[test]
    fn test_validation_reason_is_shown_verbatim() {
        assert_eq!(user_message(&AppError::Validation("Name is required".into())), "Name is required");
    }
}
