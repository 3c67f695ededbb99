//! Prompt templates.

use ik_core::{BuilderOption, Idea, PitchDeckSlide};

/// Number of ideas requested per generation round.
pub const IDEAS_PER_ROUND: usize = 3;

pub fn new_ideas(count: usize) -> String {
    format!(
        r#"You are a market researcher. Find real user complaints on public platforms such as Reddit, X, YouTube comments, TikTok and tech forums, and turn each one into an app idea.

Return {count} new ideas in the health, productivity or finance sectors.

Answer with a JSON array only, no prose and no markdown. Each element:
{{
  "problem": "the user problem, one or two sentences",
  "solution": "an app that solves exactly that problem",
  "category": "Health" | "Productivity" | "Finance",
  "marketSizeScore": integer 0-100 where 100 means a billion potential users,
  "source": {{ "platform": "where the problem was seen", "url": "link to the discussion" }}
}}"#
    )
}

fn describe(idea: &Idea) -> String {
    format!(
        "- Problem: \"{}\"\n- Proposed solution: \"{}\"\n- Category: {}",
        idea.problem,
        idea.solution,
        idea.category.as_str()
    )
}

pub fn brainstorm(idea: &Idea) -> String {
    format!(
        r#"You are a venture capitalist. Give a short, critical analysis of this app idea:

{}

Use Markdown with these sections:
1. **SWOT Analysis**: strengths, weaknesses, opportunities, threats (name likely competitors).
2. **MVP Features**: the 3-5 features a first version needs.
3. **Global Winner Verdict**: can this reach a billion users? Be realistic."#,
        describe(idea)
    )
}

pub fn mockup(idea: &Idea) -> String {
    format!(
        "A clean, modern mobile app home screen UI mockup for an app that does the following: {} \
         Flat design, realistic phone screen, readable labels, no device frame.",
        idea.solution
    )
}

pub fn pitch_deck(idea: &Idea) -> String {
    format!(
        r#"Write a 6-slide investor pitch deck for this app idea:

{}

Slides in order: Problem, Solution, Market Size, Product, Business Model, The Ask.
Answer with a JSON array only. Each element:
{{ "slide": number, "title": "short title", "content": "2-3 sentences", "imagePrompt": "a visual for the slide, no text in the image" }}"#,
        describe(idea)
    )
}

pub fn slide_image(slide: &PitchDeckSlide) -> String {
    format!(
        "Professional presentation illustration, minimal and bright: {}",
        slide.image_prompt
    )
}

pub fn builder(idea: &Idea, option: BuilderOption) -> String {
    let task = match option {
        BuilderOption::StarterCode => {
            "Write a single-file React + TypeScript starter component for this app with Tailwind classes, \
             mock data and the two most important screens. Return only the code."
        }
        BuilderOption::AiStudio => {
            "Write a detailed prompt to paste into Google AI Studio's app builder so it generates this app. \
             Cover features, screens, data model and visual style."
        }
        BuilderOption::Replit => {
            "Write a prompt for the Replit Agent to scaffold this app as a full-stack project. \
             Cover stack choice, features, data model and deployment."
        }
    };
    format!("{task}\n\nApp idea:\n{}", describe(idea))
}
