//! Mock gateway for tests and offline (`llm_mode = "mock"`) runs.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use super::{
    AiGateway, AspectRatio, GroundedAnswer, GroundingSource, ImageSize, LiveQuestion, ProgressSink,
    SoulDecoderInput, SpiritualIntelligenceResponse, VideoAspect,
};
use crate::chat::ChatMessage;
use crate::error::GatewayError;
use crate::media::{ImagePayload, MediaFile, MediaHandle, MediaVault};
use crate::stream::FragmentStream;

/// 1x1 transparent PNG.
const PIXEL_PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOp {
    Decode,
    Search,
    Diagram,
    Answer,
    LiveFeed,
    Reformat,
    Image,
    AnalyzeVideo,
    Chat,
    Animate,
}

impl MockOp {
    const COUNT: usize = 10;

    fn index(self) -> usize {
        self as usize
    }
}

pub struct MockGateway {
    decode: SpiritualIntelligenceResponse,
    answer: GroundedAnswer,
    reformat: String,
    analysis: String,
    feed: Vec<LiveQuestion>,
    chat_fragments: Vec<String>,
    fragment_delay: Duration,
    polls_until_done: u32,
    max_polls: u32,
    poll_interval: Duration,
    fail_all: AtomicBool,
    fail_ops: Vec<MockOp>,
    gate: Option<Arc<Notify>>,
    calls: [AtomicU32; MockOp::COUNT],
    vault: Arc<MediaVault>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            decode: SpiritualIntelligenceResponse {
                soul_blueprint: "A luminous soul oriented toward service.".into(),
                numerology: "Life Path 7: the seeker.".into(),
                astrology: "Sun in Sagittarius, Moon in Pisces.".into(),
                shadow_work: "Release the need for outside approval.".into(),
                past_life: "Echoes of a temple scribe.".into(),
                emotional_reflection: "What would you create if nothing could fail?".into(),
            },
            answer: GroundedAnswer {
                summary: "Mock wisdom: every symbol mirrors an inner state.".into(),
                sources: vec![GroundingSource {
                    title: "Mock Archive".into(),
                    uri: "https://example.com/archive".into(),
                }],
            },
            reformat: "Mock transformation.".into(),
            analysis: "Mock analysis: the stream speaks of renewal.".into(),
            feed: vec![LiveQuestion {
                id: "live-1".into(),
                author: "Mock Seeker".into(),
                content: "What does it mean to see 11:11?".into(),
                time_ago: "just now".into(),
                category: "Signs".into(),
            }],
            chat_fragments: ["The ", "codex ", "is ", "listening."]
                .into_iter()
                .map(String::from)
                .collect(),
            fragment_delay: Duration::ZERO,
            polls_until_done: 2,
            max_polls: 60,
            poll_interval: Duration::ZERO,
            fail_all: AtomicBool::new(false),
            fail_ops: Vec::new(),
            gate: None,
            calls: Default::default(),
            vault: Arc::new(MediaVault::new()),
        }
    }

    /// Every operation fails with an API error.
    pub fn failing() -> Self {
        let mock = Self::new();
        mock.fail_all.store(true, Ordering::SeqCst);
        mock
    }

    /// Only `op` fails.
    pub fn failing_on(mut self, op: MockOp) -> Self {
        self.fail_ops.push(op);
        self
    }

    pub fn with_decode(mut self, response: SpiritualIntelligenceResponse) -> Self {
        self.decode = response;
        self
    }

    pub fn with_answer(mut self, answer: GroundedAnswer) -> Self {
        self.answer = answer;
        self
    }

    pub fn with_chat_fragments<I, S>(mut self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chat_fragments = fragments.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_fragment_delay(mut self, delay: Duration) -> Self {
        self.fragment_delay = delay;
        self
    }

    /// Video jobs report `done` after `polls` polls; more than `max` polls times out.
    pub fn with_polling(mut self, polls: u32, max: u32, interval: Duration) -> Self {
        self.polls_until_done = polls;
        self.max_polls = max;
        self.poll_interval = interval;
        self
    }

    /// Hold every call until the gate is notified.
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn with_vault(mut self, vault: Arc<MediaVault>) -> Self {
        self.vault = vault;
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_all.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self, op: MockOp) -> u32 {
        self.calls[op.index()].load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> u32 {
        self.calls.iter().map(|c| c.load(Ordering::SeqCst)).sum()
    }

    async fn enter(&self, op: MockOp) -> Result<(), GatewayError> {
        self.calls[op.index()].fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail_all.load(Ordering::SeqCst) || self.fail_ops.contains(&op) {
            return Err(GatewayError::Api {
                status: 503,
                body: format!("mock failure in {op:?}"),
            });
        }
        Ok(())
    }

    fn pixel() -> ImagePayload {
        ImagePayload {
            mime_type: "image/png".into(),
            data_base64: PIXEL_PNG.into(),
        }
    }
}

#[async_trait]
impl AiGateway for MockGateway {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn decode_soul(
        &self,
        _input: &SoulDecoderInput,
        _model: &str,
    ) -> Result<SpiritualIntelligenceResponse, GatewayError> {
        self.enter(MockOp::Decode).await?;
        Ok(self.decode.clone())
    }

    async fn search_meaning(&self, _query: &str) -> Result<GroundedAnswer, GatewayError> {
        self.enter(MockOp::Search).await?;
        Ok(self.answer.clone())
    }

    async fn generate_diagram(&self, _query: &str) -> Result<ImagePayload, GatewayError> {
        self.enter(MockOp::Diagram).await?;
        Ok(Self::pixel())
    }

    async fn answer_question(&self, _question: &str) -> Result<GroundedAnswer, GatewayError> {
        self.enter(MockOp::Answer).await?;
        Ok(self.answer.clone())
    }

    async fn fetch_live_feed(&self) -> Result<Vec<LiveQuestion>, GatewayError> {
        self.enter(MockOp::LiveFeed).await?;
        Ok(self.feed.clone())
    }

    async fn reformat_content(&self, _insight: &str, _format: &str) -> Result<String, GatewayError> {
        self.enter(MockOp::Reformat).await?;
        Ok(self.reformat.clone())
    }

    async fn generate_image(
        &self,
        _prompt: &str,
        _size: ImageSize,
        _aspect: AspectRatio,
    ) -> Result<ImagePayload, GatewayError> {
        self.enter(MockOp::Image).await?;
        Ok(Self::pixel())
    }

    async fn analyze_video(&self, _file: &MediaFile, _prompt: &str) -> Result<String, GatewayError> {
        self.enter(MockOp::AnalyzeVideo).await?;
        Ok(self.analysis.clone())
    }

    async fn stream_chat(&self, _history: &[ChatMessage], _message: &str) -> Result<FragmentStream, GatewayError> {
        self.enter(MockOp::Chat).await?;
        if self.fragment_delay.is_zero() {
            return Ok(FragmentStream::from_fragments(self.chat_fragments.clone()));
        }
        let (tx, stream) = FragmentStream::channel();
        let fragments = self.chat_fragments.clone();
        let delay = self.fragment_delay;
        tokio::spawn(async move {
            for fragment in fragments {
                if !tx.send(fragment).await {
                    break;
                }
                tokio::time::sleep(delay).await;
            }
        });
        Ok(stream)
    }

    async fn animate_video(
        &self,
        _prompt: &str,
        _image: Option<&MediaFile>,
        _aspect: VideoAspect,
        progress: ProgressSink,
    ) -> Result<MediaHandle, GatewayError> {
        let _ = progress.send("Initiating Veo...".to_string());
        self.enter(MockOp::Animate).await?;
        let mut polls = 0u32;
        while polls < self.polls_until_done {
            if polls >= self.max_polls {
                return Err(GatewayError::Timeout { attempts: polls });
            }
            tokio::time::sleep(self.poll_interval).await;
            polls += 1;
            let _ = progress.send("Synthesizing...".to_string());
        }
        Ok(self.vault.store(b"mock video bytes".to_vec(), "video/mp4"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn counts_calls_per_operation() {
        let mock = MockGateway::new();
        mock.reformat_content("a", "b").await.unwrap();
        mock.reformat_content("a", "b").await.unwrap();
        mock.fetch_live_feed().await.unwrap();
        assert_eq!(mock.calls(MockOp::Reformat), 2);
        assert_eq!(mock.calls(MockOp::LiveFeed), 1);
        assert_eq!(mock.total_calls(), 3);
    }

    #[tokio::test]
    async fn failing_on_only_breaks_one_operation() {
        let mock = MockGateway::new().failing_on(MockOp::Diagram);
        assert!(mock.generate_diagram("x").await.is_err());
        assert!(mock.search_meaning("x").await.is_ok());
    }

    #[tokio::test]
    async fn polling_reports_progress_then_finishes() {
        let mock = MockGateway::new().with_polling(3, 10, Duration::ZERO);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = mock.animate_video("", None, VideoAspect::Landscape, tx).await.unwrap();
        assert!(handle.size > 0);
        let mut lines = Vec::new();
        while let Ok(line) = rx.try_recv() {
            lines.push(line);
        }
        assert_eq!(lines.first().map(String::as_str), Some("Initiating Veo..."));
        assert_eq!(lines.iter().filter(|l| *l == "Synthesizing...").count(), 3);
    }

    #[tokio::test]
    async fn polling_budget_times_out() {
        let mock = MockGateway::new().with_polling(5, 2, Duration::ZERO);
        let (tx, _rx) = mpsc::unbounded_channel();
        let err = mock.animate_video("", None, VideoAspect::Portrait, tx).await.unwrap_err();
        assert!(matches!(err, GatewayError::Timeout { attempts: 2 }));
    }
}
