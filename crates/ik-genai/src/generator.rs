//! Service turning prompts into ideas, analyses, images and decks.

use std::sync::Arc;

use ik_core::{AppError, AspectRatio, BuilderOption, GenerativeModel, Idea, PitchDeckSlide, Result};
use tracing::info;

use crate::{parse, prompts};

/// Progress of a pitch-deck run, reported after each step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeckProgress {
    Outlining,
    Image { slide: usize, total: usize },
}

impl DeckProgress {
    pub fn message(&self) -> String {
        match self {
            Self::Outlining => "Writing the slide outline...".to_string(),
            Self::Image { slide, total } => format!("Generating image for slide {slide} of {total}..."),
        }
    }
}

#[derive(Clone)]
pub struct IdeaGenerator {
    model: Arc<dyn GenerativeModel>,
}

impl IdeaGenerator {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    /// A fresh round of ideas, each with a new identifier and no owner yet.
    pub async fn fetch_new_ideas(&self) -> Result<Vec<Idea>> {
        let text = self
            .model
            .generate_text(&prompts::new_ideas(prompts::IDEAS_PER_ROUND))
            .await?;
        let ideas = parse::parse_ideas(&text)?;
        info!(count = ideas.len(), "Ideas generated");
        Ok(ideas)
    }

    /// SWOT / MVP / verdict analysis in Markdown.
    pub async fn brainstorm(&self, idea: &Idea) -> Result<String> {
        non_empty(self.model.generate_text(&prompts::brainstorm(idea)).await?)
    }

    /// Portrait UI mockup as a data URL.
    pub async fn mockup(&self, idea: &Idea) -> Result<String> {
        let image = self
            .model
            .generate_image(&prompts::mockup(idea), AspectRatio::Portrait)
            .await?;
        Ok(image.to_data_url())
    }

    /// Outline first, then one landscape image per slide, in order.
    pub async fn pitch_deck(
        &self,
        idea: &Idea,
        progress: impl Fn(DeckProgress) + Send + Sync,
    ) -> Result<Vec<PitchDeckSlide>> {
        progress(DeckProgress::Outlining);
        let outline = self.model.generate_text(&prompts::pitch_deck(idea)).await?;
        let mut slides = parse::parse_slides(&outline)?;

        let total = slides.len();
        for (i, slide) in slides.iter_mut().enumerate() {
            progress(DeckProgress::Image { slide: i + 1, total });
            let image = self
                .model
                .generate_image(&prompts::slide_image(slide), AspectRatio::Landscape)
                .await?;
            slide.image_url = Some(image.to_data_url());
        }
        info!(slides = total, "Pitch deck generated");
        Ok(slides)
    }

    pub async fn builder_prompt(&self, idea: &Idea, option: BuilderOption) -> Result<String> {
        non_empty(self.model.generate_text(&prompts::builder(idea, option)).await?)
    }
}

fn non_empty(text: String) -> Result<String> {
    if text.trim().is_empty() {
        return Err(AppError::Generation("empty response from model".to_string()));
    }
    Ok(text)
}
