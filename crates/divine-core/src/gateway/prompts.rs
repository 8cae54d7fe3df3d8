//! Prompt templates and per-operation model ids.
//!
//! Each AI operation owns one template. Placeholders are written `{name}` and
//! filled by [`fill`]. Both tables deserialize from the `[gateway.models]` and
//! `[prompts]` sections of the config file, so variants are selected by
//! configuration instead of maintaining parallel copies of the gateway.

use serde::{Deserialize, Serialize};

/// Replace every `{key}` in `template` with its value in a single pass, so
/// substituted text is never scanned again. Unknown placeholders stay as-is.
pub fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let known = after.find('}').and_then(|close| {
            let key = &after[..close];
            vars.iter().find(|(k, _)| *k == key).map(|(_, value)| (close, *value))
        });
        match known {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelTable {
    pub chat: String,
    pub decode: String,
    pub search: String,
    pub answer: String,
    pub live_feed: String,
    pub diagram: String,
    pub reformat: String,
    pub image: String,
    pub analyze_video: String,
    pub animate: String,
}

impl Default for ModelTable {
    fn default() -> Self {
        Self {
            chat: "gemini-3-pro-preview".into(),
            decode: "gemini-3-pro-preview".into(),
            search: "gemini-3-flash-preview".into(),
            answer: "gemini-3-flash-preview".into(),
            live_feed: "gemini-3-flash-preview".into(),
            diagram: "gemini-2.5-flash-image".into(),
            reformat: "gemini-3-flash-preview".into(),
            image: "gemini-3-pro-image-preview".into(),
            analyze_video: "gemini-3-pro-preview".into(),
            animate: "veo-3.1-fast-generate-preview".into(),
        }
    }
}

const DECODE_TEMPLATE: &str = r#"Acts as the "Spiritual Intelligence Suite" - a consciousness-level intelligence engine.
Analyze the following soul data:
Name: {name}
DOB: {dob}
Time: {time}
Location: {city}, {country}

Provide deep multi-dimensional insights through 6 specialized agent lenses.
Format your response STRICTLY as a JSON object with these keys:
1. soulBlueprint: Primary consciousness analysis and life purpose.
2. numerology: Life Path, Expression, and cycle analysis.
3. astrology: Sun/Moon/Rising and key transits.
4. shadowWork: Triggers, defense mechanisms, and integration practices.
5. pastLife: Karmic patterns and unexplained phobias/connections.
6. emotionalReflection: Real-time processing and consciousness-expanding prompts.

Keep each response deep, sophisticated, and formatting using Markdown where appropriate inside the strings."#;

const SEARCH_TEMPLATE: &str = r#"Search for the deep spiritual, archetypal, and mystical meaning of: "{query}".
Consult high-value archives, spiritual leaders, and metaphysical research.
Provide a sophisticated summary and list the exact web sources found."#;

const CHAT_SYSTEM: &str = "You are the Codex Assistant, an enlightened AI guide for the GemCodex OS. \
You specialize in spiritual decoding, ancestral wisdom, and consciousness expansion. \
You are wise, helpful, and sophisticated.";

const ANALYZE_TEMPLATE: &str = "As a spiritual intelligence analyst, analyze this video.\nUser prompt: {prompt}";

const LIVE_FEED_TEMPLATE: &str = r#"Acts as the "Live Quora Matrix Synchronizer".
Find current, trending spiritual questions from the Quora Space "The Spiritual World".
Return as JSON array with: id, author, content, timeAgo, category."#;

const ANSWER_TEMPLATE: &str =
    r#"Acts as "The Spiritual Engine". Answer this community question with depth and grounding: "{question}""#;

const DIAGRAM_TEMPLATE: &str = r#"A highly detailed spiritual diagram and sacred geometry representation explaining the essence of "{query}". 4k resolution, divine aesthetic."#;

const REFORMAT_TEMPLATE: &str = "Transform this into a {format}: {insight}";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptTemplates {
    /// Placeholders: name, dob, time, city, country.
    pub decode: String,
    /// Placeholder: query.
    pub search: String,
    pub chat_system: String,
    /// Placeholder: prompt.
    pub analyze_video: String,
    pub analyze_video_default: String,
    pub live_feed: String,
    /// Placeholder: question.
    pub answer: String,
    /// Placeholder: query.
    pub diagram: String,
    /// Placeholders: format, insight.
    pub reformat: String,
    pub animate_default: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            decode: DECODE_TEMPLATE.into(),
            search: SEARCH_TEMPLATE.into(),
            chat_system: CHAT_SYSTEM.into(),
            analyze_video: ANALYZE_TEMPLATE.into(),
            analyze_video_default: "What are the key spiritual messages and symbolic elements in this video?".into(),
            live_feed: LIVE_FEED_TEMPLATE.into(),
            answer: ANSWER_TEMPLATE.into(),
            diagram: DIAGRAM_TEMPLATE.into(),
            reformat: REFORMAT_TEMPLATE.into(),
            animate_default: "Spiritual energy flow".into(),
        }
    }
}

impl PromptTemplates {
    pub fn decode_prompt(&self, input: &crate::SoulDecoderInput) -> String {
        fill(
            &self.decode,
            &[
                ("name", &input.name),
                ("dob", &input.dob),
                ("time", &input.time),
                ("city", &input.city),
                ("country", &input.country),
            ],
        )
    }

    pub fn search_prompt(&self, query: &str) -> String {
        fill(&self.search, &[("query", query)])
    }

    pub fn answer_prompt(&self, question: &str) -> String {
        fill(&self.answer, &[("question", question)])
    }

    pub fn diagram_prompt(&self, query: &str) -> String {
        fill(&self.diagram, &[("query", query)])
    }

    pub fn reformat_prompt(&self, insight: &str, format: &str) -> String {
        fill(&self.reformat, &[("format", format), ("insight", insight)])
    }

    /// Blank user prompts fall back to the default analysis question.
    pub fn analyze_prompt(&self, prompt: &str) -> String {
        let prompt = if prompt.trim().is_empty() {
            self.analyze_video_default.as_str()
        } else {
            prompt
        };
        fill(&self.analyze_video, &[("prompt", prompt)])
    }

    pub fn animate_prompt<'a>(&'a self, prompt: &'a str) -> &'a str {
        if prompt.trim().is_empty() {
            &self.animate_default
        } else {
            prompt
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SoulDecoderInput;

    #[test]
    fn fill_replaces_all_occurrences_and_keeps_unknown() {
        let out = fill("{a}-{a}-{b}", &[("a", "x")]);
        assert_eq!(out, "x-x-{b}");
    }

    #[test]
    fn substituted_values_are_not_expanded_again() {
        let out = fill("{name} of {country}", &[("name", "{country}"), ("country", "Peru")]);
        assert_eq!(out, "{country} of Peru");

        let t = PromptTemplates::default();
        let p = t.reformat_prompt("light", "a {insight} haiku");
        assert!(p.contains("a {insight} haiku"));
    }

    #[test]
    fn decode_prompt_carries_every_field() {
        let input = SoulDecoderInput {
            name: "Leila".into(),
            dob: "1978-12-05".into(),
            time: "07:30".into(),
            city: "Lisbon".into(),
            country: "Portugal".into(),
        };
        let p = PromptTemplates::default().decode_prompt(&input);
        assert!(p.contains("Name: Leila"));
        assert!(p.contains("Location: Lisbon, Portugal"));
        assert!(p.contains("soulBlueprint"));
        assert!(!p.contains('{'));
    }

    #[test]
    fn blank_prompts_use_defaults() {
        let t = PromptTemplates::default();
        assert!(t.analyze_prompt("  ").contains("key spiritual messages"));
        assert_eq!(t.animate_prompt(""), "Spiritual energy flow");
        assert_eq!(t.animate_prompt("a lotus"), "a lotus");
    }

    #[test]
    fn overrides_deserialize_over_defaults() {
        let t: PromptTemplates = toml::from_str(r#"reformat = "Make a {format} of {insight}""#).unwrap();
        assert_eq!(t.reformat_prompt("light", "haiku"), "Make a haiku of light");
        assert_eq!(t.search, PromptTemplates::default().search);
    }
}
