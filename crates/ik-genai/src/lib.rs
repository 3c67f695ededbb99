//! ik-genai/src/lib.rs
//!
//! The generative-AI collaborator: a Gemini REST client behind the
//! `GenerativeModel` port, prompt templates, and strict parsing of the
//! structured (JSON) answers.

pub mod gemini;
pub mod generator;
pub mod parse;
pub mod prompts;

pub use gemini::{GeminiClient, UnconfiguredModel};
pub use generator::{DeckProgress, IdeaGenerator};
