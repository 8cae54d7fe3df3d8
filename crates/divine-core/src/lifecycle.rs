//! Request Lifecycle Manager.
//!
//! Each feature tracks `{ input, busy, result, last_error, progress }`. A
//! submission is rejected while the feature is busy or when the input fails its
//! presence check; otherwise exactly one of `result` / `last_error` is set when
//! the call settles and `busy` always returns to `false`, including when the
//! submitting future is dropped.

use std::future::Future;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::chat::{ChatSession, ChatState};
use crate::error::{GatewayError, ValidationError};
use crate::gateway::{
    AiGateway, AspectRatio, GroundedAnswer, ImageSize, LiveQuestion, ProgressSink, SoulDecoderInput,
    SpiritualIntelligenceResponse, VideoAspect,
};
use crate::media::{ImagePayload, MediaFile, MediaHandle};

pub const DECODE_FAILURE_NOTICE: &str = "Soul decoding failed.";
pub const MEANING_FAILURE_NOTICE: &str = "Knowledge traversal failed.";
pub const COMMUNITY_FAILURE_NOTICE: &str = "Traversal failed.";
pub const LIVE_FEED_FAILURE_NOTICE: &str = "Live synchronization failed.";
pub const VIDEO_ANALYSIS_FAILURE_NOTICE: &str = "Vision synthesis failed.";
pub const STUDIO_FAILURE_NOTICE: &str = "Video generation failed.";
pub const REFORMAT_FAILURE_NOTICE: &str = "Content transformation failed.";
pub const IMAGE_FAILURE_NOTICE: &str = "Image synthesis failed.";

/// A settled failure as the user sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureError {
    pub notice: String,
    pub detail: String,
}

impl FeatureError {
    pub fn new(notice: &str, err: &GatewayError) -> Self {
        Self {
            notice: notice.to_string(),
            detail: err.to_string(),
        }
    }
}

/// Outcome of one `submit` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The call succeeded and `result` was set.
    Settled,
    /// The call failed and `last_error` was set.
    Failed,
    /// Nothing was invoked.
    Rejected(ValidationError),
}

impl Submission {
    pub fn is_settled(&self) -> bool {
        matches!(self, Submission::Settled)
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Submission::Rejected(_))
    }
}

/// Minimal presence check run before any remote call.
pub trait Validate: Clone {
    fn validate(&self) -> Result<(), ValidationError>;

    /// The copy kept in [`FeatureState::input`] while and after the call runs.
    fn retained(&self) -> Self {
        self.clone()
    }
}

fn require(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::EmptyInput { field })
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureState<I, R> {
    pub input: Option<I>,
    pub busy: bool,
    pub result: Option<R>,
    pub last_error: Option<FeatureError>,
    pub progress: Option<String>,
}

impl<I, R> Default for FeatureState<I, R> {
    fn default() -> Self {
        Self {
            input: None,
            busy: false,
            result: None,
            last_error: None,
            progress: None,
        }
    }
}

/// A submission's outcome together with the feature state it settled into.
#[derive(Debug, Clone)]
pub struct Settlement<I, R> {
    pub submission: Submission,
    pub state: FeatureState<I, R>,
}

impl<I, R> Settlement<I, R> {
    pub fn is_settled(&self) -> bool {
        self.submission.is_settled()
    }

    pub fn is_rejected(&self) -> bool {
        self.submission.is_rejected()
    }
}

/// One independently tracked feature. Cloning shares the state.
pub struct Feature<I, R> {
    name: &'static str,
    notice: &'static str,
    state: Arc<Mutex<FeatureState<I, R>>>,
}

impl<I, R> Clone for Feature<I, R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            notice: self.notice,
            state: Arc::clone(&self.state),
        }
    }
}

/// Clears `busy` if the submission ends without settling.
struct BusyGuard<I, R> {
    state: Arc<Mutex<FeatureState<I, R>>>,
    armed: bool,
}

impl<I, R> Drop for BusyGuard<I, R> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Ok(mut s) = self.state.lock() {
            s.busy = false;
            s.progress = None;
        }
    }
}

impl<I, R> Feature<I, R>
where
    I: Validate + Clone + Send,
    R: Clone + Send,
{
    pub fn new(name: &'static str, notice: &'static str) -> Self {
        Self {
            name,
            notice,
            state: Arc::new(Mutex::new(FeatureState::default())),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn snapshot(&self) -> FeatureState<I, R> {
        self.state.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn is_busy(&self) -> bool {
        self.state.lock().map(|s| s.busy).unwrap_or(false)
    }

    fn begin(&self, input: &I) -> Result<BusyGuard<I, R>, ValidationError> {
        input.validate()?;
        let busy = ValidationError::Busy { feature: self.name };
        let mut s = self.state.lock().map_err(|_| busy.clone())?;
        if s.busy {
            return Err(busy);
        }
        s.busy = true;
        s.last_error = None;
        s.progress = None;
        s.input = Some(input.retained());
        Ok(BusyGuard {
            state: Arc::clone(&self.state),
            armed: true,
        })
    }

    fn rejected(&self, rejection: ValidationError) -> Settlement<I, R> {
        tracing::debug!(target: "divine::lifecycle", feature = self.name, reason = %rejection, "submission rejected");
        Settlement {
            submission: Submission::Rejected(rejection),
            state: self.snapshot(),
        }
    }

    /// Record the outcome, release `busy`, and capture the state under one lock.
    fn settle(&self, outcome: Result<R, GatewayError>, mut guard: BusyGuard<I, R>) -> Settlement<I, R> {
        let Ok(mut s) = self.state.lock() else {
            guard.armed = false;
            return Settlement {
                submission: Submission::Failed,
                state: FeatureState::default(),
            };
        };
        let submission = match outcome {
            Ok(result) => {
                s.result = Some(result);
                s.last_error = None;
                tracing::info!(target: "divine::lifecycle", feature = self.name, "submission settled");
                Submission::Settled
            }
            Err(e) => {
                tracing::warn!(target: "divine::lifecycle", feature = self.name, error = %e, "submission failed");
                s.result = None;
                s.last_error = Some(FeatureError::new(self.notice, &e));
                Submission::Failed
            }
        };
        s.busy = false;
        s.progress = None;
        let state = s.clone();
        guard.armed = false;
        Settlement { submission, state }
    }

    /// Validate, mark busy, run `call`, then record the outcome.
    pub async fn submit<F, Fut>(&self, input: I, call: F) -> Settlement<I, R>
    where
        F: FnOnce(I) -> Fut,
        Fut: Future<Output = Result<R, GatewayError>>,
    {
        let guard = match self.begin(&input) {
            Ok(guard) => guard,
            Err(rejection) => return self.rejected(rejection),
        };
        tracing::info!(target: "divine::lifecycle", feature = self.name, "submission started");
        let outcome = call(input).await;
        self.settle(outcome, guard)
    }

    /// Like [`submit`](Self::submit), mirroring progress lines into `progress` while the call runs.
    pub async fn submit_with_progress<F, Fut>(&self, input: I, call: F) -> Settlement<I, R>
    where
        F: FnOnce(I, ProgressSink) -> Fut,
        Fut: Future<Output = Result<R, GatewayError>>,
    {
        let guard = match self.begin(&input) {
            Ok(guard) => guard,
            Err(rejection) => return self.rejected(rejection),
        };
        tracing::info!(target: "divine::lifecycle", feature = self.name, "long-running submission started");

        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let fut = call(input, tx);
        tokio::pin!(fut);

        let outcome = loop {
            tokio::select! {
                outcome = &mut fut => break outcome,
                Some(line) = rx.recv() => {
                    if let Ok(mut s) = self.state.lock() {
                        s.progress = Some(line);
                    }
                }
            }
        };

        self.settle(outcome, guard)
    }
}

// ---------------------------------------------------------------------------
// Feature inputs
// ---------------------------------------------------------------------------

impl Validate for SoulDecoderInput {
    fn validate(&self) -> Result<(), ValidationError> {
        require(&self.name, "name")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeaningQuery {
    pub query: String,
}

impl Validate for MeaningQuery {
    fn validate(&self) -> Result<(), ValidationError> {
        require(&self.query, "query")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeaningResult {
    pub answer: GroundedAnswer,
    /// `None` when diagram synthesis failed; the search result still stands.
    pub diagram: Option<ImagePayload>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoAnalysisInput {
    pub file: Option<MediaFile>,
    pub prompt: String,
}

impl Validate for VideoAnalysisInput {
    fn validate(&self) -> Result<(), ValidationError> {
        match &self.file {
            Some(file) if !file.is_empty() => Ok(()),
            _ => Err(ValidationError::MissingFile),
        }
    }

    fn retained(&self) -> Self {
        Self {
            file: self.file.as_ref().map(MediaFile::metadata),
            prompt: self.prompt.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StudioInput {
    pub prompt: String,
    pub image: Option<MediaFile>,
    pub aspect: VideoAspect,
}

/// A blank prompt is allowed; the gateway substitutes its default animation prompt.
impl Validate for StudioInput {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn retained(&self) -> Self {
        Self {
            prompt: self.prompt.clone(),
            image: self.image.as_ref().map(MediaFile::metadata),
            aspect: self.aspect,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommunityQuestionInput {
    pub question: String,
}

impl Validate for CommunityQuestionInput {
    fn validate(&self) -> Result<(), ValidationError> {
        require(&self.question, "question")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LiveFeedRequest;

impl Validate for LiveFeedRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReformatInput {
    pub insight: String,
    pub format: String,
}

impl Validate for ReformatInput {
    fn validate(&self) -> Result<(), ValidationError> {
        require(&self.insight, "insight")?;
        require(&self.format, "format")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
    #[serde(default)]
    pub size: ImageSize,
    #[serde(default)]
    pub aspect: AspectRatio,
}

impl Validate for ImageRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        require(&self.prompt, "prompt")
    }
}

// ---------------------------------------------------------------------------
// Feature bundle
// ---------------------------------------------------------------------------

/// Every asynchronous feature of the dashboard, each with its own busy flag.
#[derive(Clone)]
pub struct Features {
    pub chat: ChatSession,
    pub decode: Feature<SoulDecoderInput, SpiritualIntelligenceResponse>,
    pub meaning: Feature<MeaningQuery, MeaningResult>,
    pub video_analysis: Feature<VideoAnalysisInput, String>,
    pub studio: Feature<StudioInput, MediaHandle>,
    pub community: Feature<CommunityQuestionInput, GroundedAnswer>,
    pub live_feed: Feature<LiveFeedRequest, Vec<LiveQuestion>>,
    pub reformat: Feature<ReformatInput, String>,
    pub image: Feature<ImageRequest, ImagePayload>,
}

/// Point-in-time copy of every feature, for rendering.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeaturesSnapshot {
    pub chat: ChatState,
    pub decode: FeatureState<SoulDecoderInput, SpiritualIntelligenceResponse>,
    pub meaning: FeatureState<MeaningQuery, MeaningResult>,
    pub video_analysis: FeatureState<VideoAnalysisInput, String>,
    pub studio: FeatureState<StudioInput, MediaHandle>,
    pub community: FeatureState<CommunityQuestionInput, GroundedAnswer>,
    pub live_feed: FeatureState<LiveFeedRequest, Vec<LiveQuestion>>,
    pub reformat: FeatureState<ReformatInput, String>,
    pub image: FeatureState<ImageRequest, ImagePayload>,
}

impl Default for Features {
    fn default() -> Self {
        Self::new()
    }
}

impl Features {
    pub fn new() -> Self {
        Self {
            chat: ChatSession::new(),
            decode: Feature::new("decoder", DECODE_FAILURE_NOTICE),
            meaning: Feature::new("meaning", MEANING_FAILURE_NOTICE),
            video_analysis: Feature::new("video_analysis", VIDEO_ANALYSIS_FAILURE_NOTICE),
            studio: Feature::new("studio", STUDIO_FAILURE_NOTICE),
            community: Feature::new("community", COMMUNITY_FAILURE_NOTICE),
            live_feed: Feature::new("live_feed", LIVE_FEED_FAILURE_NOTICE),
            reformat: Feature::new("reformat", REFORMAT_FAILURE_NOTICE),
            image: Feature::new("image", IMAGE_FAILURE_NOTICE),
        }
    }

    pub fn snapshot(&self) -> FeaturesSnapshot {
        FeaturesSnapshot {
            chat: self.chat.snapshot(),
            decode: self.decode.snapshot(),
            meaning: self.meaning.snapshot(),
            video_analysis: self.video_analysis.snapshot(),
            studio: self.studio.snapshot(),
            community: self.community.snapshot(),
            live_feed: self.live_feed.snapshot(),
            reformat: self.reformat.snapshot(),
            image: self.image.snapshot(),
        }
    }

    pub async fn decode_soul(
        &self,
        gateway: &dyn AiGateway,
        input: SoulDecoderInput,
        model: &str,
    ) -> Settlement<SoulDecoderInput, SpiritualIntelligenceResponse> {
        self.decode
            .submit(input, |input| async move { gateway.decode_soul(&input, model).await })
            .await
    }

    /// Grounded search, then a best-effort diagram.
    pub async fn search_meaning(
        &self,
        gateway: &dyn AiGateway,
        query: String,
    ) -> Settlement<MeaningQuery, MeaningResult> {
        self.meaning
            .submit(MeaningQuery { query }, |q| async move {
                let answer = gateway.search_meaning(&q.query).await?;
                let diagram = match gateway.generate_diagram(&q.query).await {
                    Ok(image) => Some(image),
                    Err(e) => {
                        tracing::warn!(target: "divine::lifecycle", feature = "meaning", error = %e, "diagram synthesis failed");
                        None
                    }
                };
                Ok(MeaningResult { answer, diagram })
            })
            .await
    }

    pub async fn analyze_video(
        &self,
        gateway: &dyn AiGateway,
        input: VideoAnalysisInput,
    ) -> Settlement<VideoAnalysisInput, String> {
        self.video_analysis
            .submit(input, |input| async move {
                let file = input.file.ok_or_else(|| GatewayError::NoMedia("no video supplied".into()))?;
                gateway.analyze_video(&file, &input.prompt).await
            })
            .await
    }

    pub async fn animate(&self, gateway: &dyn AiGateway, input: StudioInput) -> Settlement<StudioInput, MediaHandle> {
        self.studio
            .submit_with_progress(input, |input, progress| async move {
                gateway
                    .animate_video(&input.prompt, input.image.as_ref(), input.aspect, progress)
                    .await
            })
            .await
    }

    pub async fn answer_question(
        &self,
        gateway: &dyn AiGateway,
        question: String,
    ) -> Settlement<CommunityQuestionInput, GroundedAnswer> {
        self.community
            .submit(CommunityQuestionInput { question }, |q| async move {
                gateway.answer_question(&q.question).await
            })
            .await
    }

    pub async fn sync_live_feed(&self, gateway: &dyn AiGateway) -> Settlement<LiveFeedRequest, Vec<LiveQuestion>> {
        self.live_feed
            .submit(LiveFeedRequest, |_| async move { gateway.fetch_live_feed().await })
            .await
    }

    pub async fn reformat(&self, gateway: &dyn AiGateway, input: ReformatInput) -> Settlement<ReformatInput, String> {
        self.reformat
            .submit(input, |input| async move {
                gateway.reformat_content(&input.insight, &input.format).await
            })
            .await
    }

    pub async fn generate_image(
        &self,
        gateway: &dyn AiGateway,
        input: ImageRequest,
    ) -> Settlement<ImageRequest, ImagePayload> {
        self.image
            .submit(input, |req| async move {
                gateway.generate_image(&req.prompt, req.size, req.aspect).await
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize)]
    struct Text(String);

    impl Validate for Text {
        fn validate(&self) -> Result<(), ValidationError> {
            require(&self.0, "text")
        }
    }

    #[tokio::test]
    async fn empty_input_never_calls() {
        let feature: Feature<Text, String> = Feature::new("t", "failed");
        let mut called = false;
        let outcome = feature
            .submit(Text("  ".into()), |_| {
                called = true;
                async { Ok("x".to_string()) }
            })
            .await;
        assert_eq!(
            outcome.submission,
            Submission::Rejected(ValidationError::EmptyInput { field: "text" })
        );
        assert!(!called);
        assert!(feature.snapshot().input.is_none());
    }

    #[tokio::test]
    async fn failure_sets_error_and_clears_result() {
        let feature: Feature<Text, String> = Feature::new("t", "Traversal failed.");
        feature.submit(Text("a".into()), |_| async { Ok("first".to_string()) }).await;
        let outcome = feature
            .submit(Text("b".into()), |_| async { Err(GatewayError::Parse("bad".into())) })
            .await;
        assert_eq!(outcome.submission, Submission::Failed);
        assert!(outcome.state.result.is_none());
        let s = feature.snapshot();
        assert!(!s.busy);
        assert!(s.result.is_none());
        let err = s.last_error.unwrap();
        assert_eq!(err.notice, "Traversal failed.");
        assert!(err.detail.contains("bad"));
    }

    #[tokio::test]
    async fn dropped_submission_releases_busy() {
        let feature: Feature<Text, String> = Feature::new("t", "failed");
        let pending = feature.submit(Text("a".into()), |_| std::future::pending());
        let timed_out = tokio::time::timeout(std::time::Duration::from_millis(10), pending).await;
        assert!(timed_out.is_err());
        assert!(!feature.is_busy());
    }

    #[tokio::test]
    async fn settlement_carries_the_state_it_settled_into() {
        let feature: Feature<Text, String> = Feature::new("t", "failed");
        let first = feature.submit(Text("a".into()), |_| async { Ok("first".to_string()) }).await;
        feature.submit(Text("b".into()), |_| async { Ok("second".to_string()) }).await;

        assert_eq!(first.state.result.as_deref(), Some("first"));
        assert!(!first.state.busy);
        assert_eq!(feature.snapshot().result.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn uploaded_bytes_are_not_kept_in_state() {
        let feature: Feature<VideoAnalysisInput, String> = Feature::new("video_analysis", "failed");
        let input = VideoAnalysisInput {
            file: Some(MediaFile::new("rite.mp4", "video/mp4", vec![7; 4096])),
            prompt: String::new(),
        };
        let outcome = feature
            .submit(input, |input| async move {
                let size = input.file.map(|f| f.bytes.len()).unwrap_or(0);
                Ok(format!("{size} bytes seen"))
            })
            .await;

        assert_eq!(outcome.state.result.as_deref(), Some("4096 bytes seen"));
        let kept = feature.snapshot().input.and_then(|i| i.file).expect("file metadata");
        assert_eq!(kept.name, "rite.mp4");
        assert_eq!(kept.size, 4096);
        assert!(kept.bytes.is_empty());
    }

    #[test]
    fn studio_accepts_a_blank_prompt() {
        let input = StudioInput {
            prompt: "  ".into(),
            image: None,
            aspect: VideoAspect::Landscape,
        };
        assert_eq!(input.validate(), Ok(()));
    }

    #[test]
    fn reformat_needs_both_fields() {
        let input = ReformatInput {
            insight: "light".into(),
            format: " ".into(),
        };
        assert_eq!(input.validate(), Err(ValidationError::EmptyInput { field: "format" }));
    }

    #[test]
    fn video_analysis_needs_a_file() {
        let input = VideoAnalysisInput {
            file: None,
            prompt: String::new(),
        };
        assert_eq!(input.validate(), Err(ValidationError::MissingFile));
    }
}
