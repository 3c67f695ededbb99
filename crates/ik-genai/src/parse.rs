//! Strict parsing of structured model answers.
//!
//! Models wrap JSON in markdown fences, prepend chatter, or return numbers as
//! strings. Everything is validated field by field right after parsing; a
//! missing required field rejects the whole payload with `AppError::Parse`.

use ik_core::{new_id, AppError, Idea, IdeaCategory, IdeaSource, PitchDeckSlide, Result};
use serde_json::{Map, Value};
use tracing::{error, warn};

/// The JSON payload of a model answer: the body of the first fenced block,
/// or the outermost array when prose surrounds it.
pub fn extract_json(text: &str) -> &str {
    let text = text.trim();

    if let Some((_, rest)) = text.split_once("```") {
        if let Some((body, _)) = rest.split_once("```") {
            return strip_info_string(body).trim();
        }
    }

    if !text.starts_with(['[', '{']) {
        if let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) {
            if start < end {
                return &text[start..=end];
            }
        }
    }

    text
}

/// Drops a language tag such as `json` from the opening fence line. A body
/// that already starts with JSON is kept whole.
fn strip_info_string(body: &str) -> &str {
    let head = body.trim_start_matches([' ', '\t']);
    if head.starts_with(['[', '{']) {
        return head;
    }
    body.split_once('\n').map_or(body, |(_, rest)| rest)
}

fn parse_array(text: &str, wrapper_key: &str) -> Result<Vec<Value>> {
    let json = extract_json(text);
    if json.is_empty() {
        return Err(AppError::Generation("empty response from model".to_string()));
    }
    let value: Value = serde_json::from_str(json).map_err(|e| {
        error!(
            json_error = %e,
            preview = %json.chars().take(200).collect::<String>(),
            "Model answer is not valid JSON"
        );
        AppError::Parse(format!("not valid JSON: {e}"))
    })?;

    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut obj) => match obj.remove(wrapper_key) {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(AppError::Parse(format!("expected a JSON array or an object with `{wrapper_key}`"))),
        },
        _ => Err(AppError::Parse("expected a JSON array".to_string())),
    }
}

fn required_str(obj: &Map<String, Value>, field: &str, index: usize) -> Result<String> {
    match obj.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(AppError::Parse(format!("item {index}: missing or empty `{field}`"))),
    }
}

/// Numbers may arrive as strings; scores are clamped to 0..=100.
fn required_score(obj: &Map<String, Value>, field: &str, index: usize) -> Result<u8> {
    let raw = match obj.get(field) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').parse::<f64>().ok(),
        _ => None,
    };
    match raw {
        Some(score) if score.is_finite() => Ok(score.round().clamp(0.0, 100.0) as u8),
        _ => Err(AppError::Parse(format!("item {index}: `{field}` is not a number"))),
    }
}

fn optional_source(obj: &Map<String, Value>, index: usize) -> Option<IdeaSource> {
    let source = obj.get("source")?;
    let parsed = source.as_object().and_then(|s| {
        Some(IdeaSource {
            platform: s.get("platform")?.as_str()?.to_string(),
            url: s.get("url")?.as_str()?.to_string(),
        })
    });
    if parsed.is_none() && !source.is_null() {
        warn!(index, "Dropping malformed idea source");
    }
    parsed
}

/// Parses an idea-list answer. Each idea gets a fresh identifier and no owner.
pub fn parse_ideas(text: &str) -> Result<Vec<Idea>> {
    let items = parse_array(text, "ideas")?;
    if items.is_empty() {
        return Err(AppError::Generation("the model returned no ideas".to_string()));
    }

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let obj = item
                .as_object()
                .ok_or_else(|| AppError::Parse(format!("item {index}: not an object")))?;
            let category = required_str(obj, "category", index)?;
            Ok(Idea {
                id: new_id(),
                owner_id: None,
                problem: required_str(obj, "problem", index)?,
                solution: required_str(obj, "solution", index)?,
                category: IdeaCategory::from_label(&category),
                market_size_score: required_score(obj, "marketSizeScore", index)?,
                source: optional_source(obj, index),
            })
        })
        .collect()
}

/// Parses a pitch-deck outline; slides are renumbered in answer order.
pub fn parse_slides(text: &str) -> Result<Vec<PitchDeckSlide>> {
    let items = parse_array(text, "slides")?;
    if items.is_empty() {
        return Err(AppError::Generation("the model returned no slides".to_string()));
    }

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let obj = item
                .as_object()
                .ok_or_else(|| AppError::Parse(format!("slide {index}: not an object")))?;
            Ok(PitchDeckSlide {
                slide: index as u32 + 1,
                title: required_str(obj, "title", index)?,
                content: required_str(obj, "content", index)?,
                image_prompt: required_str(obj, "imagePrompt", index)?,
                image_url: None,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_plain() {
        let input = r#"[{"key": "value"}]"#;
        assert_eq!(extract_json(input), input);
    }

    #[test]
    fn test_extract_json_code_block() {
        let input = "Here you go:\n```json\n[{\"key\": \"value\"}]\n```";
        assert_eq!(extract_json(input), r#"[{"key": "value"}]"#);
    }

    #[test]
    fn test_extract_json_untagged_fences() {
        let same_line = "```[{\"key\": 1}]\n```";
        assert_eq!(extract_json(same_line), r#"[{"key": 1}]"#);
        let own_line = "```\n{\"slides\": []}\n```";
        assert_eq!(extract_json(own_line), r#"{"slides": []}"#);
        let deck = "```[{\"title\": \"t\", \"content\": \"c\", \"imagePrompt\": \"i\"}]\n```";
        assert_eq!(parse_slides(deck).unwrap().len(), 1);
    }

    #[test]
    fn test_extract_json_surrounded_by_prose() {
        let input = "Sure! [1, 2] Hope this helps.";
        assert_eq!(extract_json(input), "[1, 2]");
    }

    #[test]
    fn test_parse_ideas_coerces_scores_and_categories() {
        let text = r#"```json
[
  {"problem": "Meal planning is tedious", "solution": "Auto planner", "category": "Health", "marketSizeScore": "85"},
  {"problem": "Receipts get lost", "solution": "Scanner", "category": "Travel", "marketSizeScore": 140,
   "source": {"platform": "Reddit", "url": "https://reddit.com/r/x"}}
]
```"#;
        let ideas = parse_ideas(text).unwrap();
        assert_eq!(ideas.len(), 2);
        assert_eq!(ideas[0].market_size_score, 85);
        assert_eq!(ideas[0].category, IdeaCategory::Health);
        assert_eq!(ideas[1].market_size_score, 100);
        assert_eq!(ideas[1].category, IdeaCategory::Other);
        assert_eq!(ideas[1].source.as_ref().unwrap().platform, "Reddit");
        assert_ne!(ideas[0].id, ideas[1].id);
        assert!(ideas.iter().all(|i| i.owner_id.is_none()));
    }

    #[test]
    fn test_parse_ideas_rejects_missing_field() {
        let text = r#"[{"problem": "p", "category": "Health", "marketSizeScore": 5}]"#;
        let err = parse_ideas(text).unwrap_err();
        assert!(matches!(err, AppError::Parse(ref m) if m.contains("solution")));
        assert!(err.is_generation_failure());
    }

    #[test]
    fn test_parse_ideas_rejects_non_json() {
        assert!(matches!(parse_ideas("I could not find anything"), Err(AppError::Parse(_))));
        assert!(matches!(parse_ideas("   "), Err(AppError::Generation(_))));
        assert!(matches!(parse_ideas("[]"), Err(AppError::Generation(_))));
    }

    #[test]
    fn test_parse_ideas_accepts_wrapped_object() {
        let text = r#"{"ideas": [{"problem": "p", "solution": "s", "category": "Finance", "marketSizeScore": 42.4}]}"#;
        let ideas = parse_ideas(text).unwrap();
        assert_eq!(ideas[0].market_size_score, 42);
    }

    #[test]
    fn test_parse_slides() {
        let text = r#"[{"slide": 7, "title": "Problem", "content": "c", "imagePrompt": "i"},
                       {"title": "Solution", "content": "c2", "imagePrompt": "i2"}]"#;
        let slides = parse_slides(text).unwrap();
        assert_eq!(slides.len(), 2);
        assert_eq!(slides[0].slide, 1);
        assert_eq!(slides[1].title, "Solution");

        let bad = r#"[{"title": "Problem", "content": "c"}]"#;
        assert!(matches!(parse_slides(bad), Err(AppError::Parse(_))));
    }
}
