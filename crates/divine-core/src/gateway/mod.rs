//! AI Gateway: one operation per capability over the external generative-AI service.
//!
//! Three call shapes:
//! - single-shot: `operation(input) -> Result<T, GatewayError>`
//! - streaming: [`AiGateway::stream_chat`] returns a [`FragmentStream`]
//! - long-running: [`AiGateway::animate_video`] submits a job, polls it, and
//!   reports progress through a [`ProgressSink`].
//!
//! Every call is a single attempt. Failures come back as [`GatewayError`];
//! nothing here retries.

pub mod gemini;
pub mod mock;
pub mod prompts;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::sync::mpsc;

use crate::chat::ChatMessage;
use crate::error::GatewayError;
use crate::media::{ImagePayload, MediaFile, MediaHandle};
use crate::stream::FragmentStream;

pub use gemini::GeminiGateway;
pub use mock::MockGateway;

pub const EMPTY_SEARCH_SUMMARY: &str = "The divine silence offers no immediate reply.";
pub const EMPTY_COMMUNITY_ANSWER: &str = "Recalibrating...";
pub const EMPTY_VIDEO_ANALYSIS: &str = "The Oracle was unable to interpret the visual stream.";
pub const EMPTY_REFORMAT: &str = "Failed.";

/// Human-readable status lines from a long-running call.
pub type ProgressSink = mpsc::UnboundedSender<String>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoulDecoderInput {
    pub name: String,
    pub dob: String,
    pub time: String,
    pub city: String,
    pub country: String,
}

/// Six lenses of the decoder. Missing keys in the model output become empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpiritualIntelligenceResponse {
    pub soul_blueprint: String,
    pub numerology: String,
    pub astrology: String,
    pub shadow_work: String,
    pub past_life: String,
    pub emotional_reflection: String,
}

impl SpiritualIntelligenceResponse {
    /// (lens title, text) pairs in display order.
    pub fn lenses(&self) -> [(&'static str, &str); 6] {
        [
            ("Soul Blueprint", &self.soul_blueprint),
            ("Numerology", &self.numerology),
            ("Astrology", &self.astrology),
            ("Shadow Work", &self.shadow_work),
            ("Past Life", &self.past_life),
            ("Emotional Reflection", &self.emotional_reflection),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingSource {
    pub title: String,
    pub uri: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundedAnswer {
    pub summary: String,
    pub sources: Vec<GroundingSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LiveQuestion {
    pub id: String,
    pub author: String,
    pub content: String,
    pub time_ago: String,
    pub category: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageSize {
    #[default]
    #[serde(rename = "1K")]
    K1,
    #[serde(rename = "2K")]
    K2,
    #[serde(rename = "4K")]
    K4,
}

impl ImageSize {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageSize::K1 => "1K",
            ImageSize::K2 => "2K",
            ImageSize::K4 => "4K",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    Wide,
    #[serde(rename = "9:16")]
    Tall,
    #[serde(rename = "3:4")]
    Portrait,
    #[serde(rename = "4:3")]
    Landscape,
}

impl AspectRatio {
    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Wide => "16:9",
            AspectRatio::Tall => "9:16",
            AspectRatio::Portrait => "3:4",
            AspectRatio::Landscape => "4:3",
        }
    }
}

/// Aspect ratios the video model accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VideoAspect {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
}

impl VideoAspect {
    pub fn as_str(self) -> &'static str {
        match self {
            VideoAspect::Landscape => "16:9",
            VideoAspect::Portrait => "9:16",
        }
    }
}

impl fmt::Display for VideoAspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoAspect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "16:9" | "" => Ok(VideoAspect::Landscape),
            "9:16" => Ok(VideoAspect::Portrait),
            other => Err(format!("unsupported video aspect ratio: {other}")),
        }
    }
}

#[async_trait]
pub trait AiGateway: Send + Sync {
    /// Short identifier for logs ("gemini", "mock").
    fn name(&self) -> &'static str;

    async fn decode_soul(
        &self,
        input: &SoulDecoderInput,
        model: &str,
    ) -> Result<SpiritualIntelligenceResponse, GatewayError>;

    /// Web-grounded meaning search.
    async fn search_meaning(&self, query: &str) -> Result<GroundedAnswer, GatewayError>;

    async fn generate_diagram(&self, query: &str) -> Result<ImagePayload, GatewayError>;

    async fn answer_question(&self, question: &str) -> Result<GroundedAnswer, GatewayError>;

    async fn fetch_live_feed(&self) -> Result<Vec<LiveQuestion>, GatewayError>;

    async fn reformat_content(&self, insight: &str, format: &str) -> Result<String, GatewayError>;

    async fn generate_image(
        &self,
        prompt: &str,
        size: ImageSize,
        aspect: AspectRatio,
    ) -> Result<ImagePayload, GatewayError>;

    async fn analyze_video(&self, file: &MediaFile, prompt: &str) -> Result<String, GatewayError>;

    /// Stream a chat reply. `history` excludes `message`.
    async fn stream_chat(
        &self,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<FragmentStream, GatewayError>;

    /// Submit a video job and poll until it finishes or the poll budget runs out.
    async fn animate_video(
        &self,
        prompt: &str,
        image: Option<&MediaFile>,
        aspect: VideoAspect,
        progress: ProgressSink,
    ) -> Result<MediaHandle, GatewayError>;
}

/// Strip an optional markdown code fence around a JSON payload.
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse structured model output. Blank output yields the default value.
pub(crate) fn parse_structured<T>(text: &str) -> Result<T, GatewayError>
where
    T: serde::de::DeserializeOwned,
{
    let body = strip_code_fence(text);
    let body = if body.is_empty() { "{}" } else { body };
    Ok(serde_json::from_str(body)?)
}

pub(crate) fn or_fallback(text: String, fallback: &str) -> String {
    if text.trim().is_empty() {
        fallback.to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_decoder_json_fills_defaults() {
        let r: SpiritualIntelligenceResponse =
            parse_structured(r#"{"soulBlueprint":"A","pastLife":"E"}"#).unwrap();
        assert_eq!(r.soul_blueprint, "A");
        assert_eq!(r.past_life, "E");
        assert!(r.numerology.is_empty());
    }

    #[test]
    fn fenced_and_blank_output_parse() {
        let r: SpiritualIntelligenceResponse =
            parse_structured("```json\n{\"astrology\":\"C\"}\n```").unwrap();
        assert_eq!(r.astrology, "C");
        let empty: SpiritualIntelligenceResponse = parse_structured("  ").unwrap();
        assert_eq!(empty, SpiritualIntelligenceResponse::default());
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = parse_structured::<SpiritualIntelligenceResponse>("the stars are silent").unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn video_aspect_parses_known_ratios() {
        assert_eq!("9:16".parse::<VideoAspect>().unwrap(), VideoAspect::Portrait);
        assert_eq!("".parse::<VideoAspect>().unwrap(), VideoAspect::Landscape);
        assert!("1:1".parse::<VideoAspect>().is_err());
    }

    #[test]
    fn fallback_only_replaces_blank() {
        assert_eq!(or_fallback("  ".into(), EMPTY_REFORMAT), "Failed.");
        assert_eq!(or_fallback("ok".into(), EMPTY_REFORMAT), "ok");
    }
}
