use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::entities::content_plan::ContentPlanIdea;

/// Pillar assigned to ideas recovered through the tag fallback. The model is
/// asked for a pillar on the strict path only, so recovered ideas land in the
/// catch-all "Bổ sung" (supplementary) pillar.
pub const FALLBACK_PILLAR: &str = "Bổ sung";

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\s*(.*?)\s*```\s*$").unwrap());
static IDEA_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<IDEA>(.*?)</IDEA>").unwrap());
static IDEA_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<IDEA_TITLE>(.*?)</IDEA_TITLE>").unwrap());
static IDEA_SCRIPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<IDEA_SCRIPT>(.*?)</IDEA_SCRIPT>").unwrap());

/// Extracts structured ideas from the raw model output.
///
/// The output format is not contractually guaranteed, so two parsers are tried
/// in priority order: a strict JSON array first, then `<IDEA>` tag scraping.
/// An empty result means both paths failed; the caller treats that as an error.
pub fn parse_video_ideas(raw: &str) -> Vec<ContentPlanIdea> {
    let text = strip_code_fence(raw.trim());

    if let Some(ideas) = parse_json_ideas(text) {
        return ideas;
    }

    parse_tagged_ideas(text)
}

/// Removes a surrounding ```json ... ``` fence, when present.
fn strip_code_fence(text: &str) -> &str {
    match CODE_FENCE.captures(text) {
        Some(captures) => captures.get(1).map_or(text, |inner| inner.as_str()),
        None => text,
    }
}

/// Strict path: the text is a JSON array of idea objects.
///
/// Only trusted when the array is non-empty and its first element carries both
/// a topic and a description; anything else falls through to tag scraping.
fn parse_json_ideas(text: &str) -> Option<Vec<ContentPlanIdea>> {
    let ideas: Vec<ContentPlanIdea> = serde_json::from_str(text).ok()?;

    match ideas.first() {
        Some(first) if first.is_complete() => Some(ideas),
        _ => None,
    }
}

/// Fallback path: scan for `<IDEA>` blocks and pick the title/script pairs.
/// Blocks missing either part are dropped, not defaulted.
fn parse_tagged_ideas(text: &str) -> Vec<ContentPlanIdea> {
    IDEA_BLOCK
        .captures_iter(text)
        .filter_map(|block| {
            let inner = block.get(1)?.as_str();
            let topic = IDEA_TITLE.captures(inner)?.get(1)?.as_str().trim();
            let description = IDEA_SCRIPT.captures(inner)?.get(1)?.as_str().trim();

            if topic.is_empty() || description.is_empty() {
                return None;
            }

            Some(ContentPlanIdea {
                pillar: FALLBACK_PILLAR.to_string(),
                topic: topic.to_string(),
                description: description.to_string(),
            })
        })
        .collect()
}
