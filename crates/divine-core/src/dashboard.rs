//! The dashboard context object threaded through every front end.
//!
//! Owns the catalog, the view controller, settings, every feature's lifecycle
//! state and the gateway. Rendering takes snapshots, so a panel never holds a
//! lock while it is being built.

use std::future::Future;
use std::sync::{Arc, RwLock};

use crate::catalog::Catalog;
use crate::config::{DivineConfig, LlmMode};
use crate::error::GatewayError;
use crate::gateway::{
    AiGateway, GeminiGateway, GroundedAnswer, LiveQuestion, MockGateway, SoulDecoderInput,
    SpiritualIntelligenceResponse,
};
use crate::lifecycle::{
    CommunityQuestionInput, Feature, Features, ImageRequest, LiveFeedRequest, MeaningQuery, MeaningResult,
    ReformatInput, Settlement, StudioInput, Submission, Validate, VideoAnalysisInput,
};
use crate::media::{ImagePayload, MediaHandle, MediaVault};
use crate::settings::{SettingKey, Settings};
use crate::views::{self, Panel, RenderContext, ViewController, ViewId};

pub struct Dashboard {
    app_name: String,
    catalog: Catalog,
    controller: RwLock<ViewController>,
    settings: RwLock<Settings>,
    features: Features,
    gateway: Arc<dyn AiGateway>,
    vault: Arc<MediaVault>,
}

impl Dashboard {
    pub fn new(gateway: Arc<dyn AiGateway>, vault: Arc<MediaVault>) -> Self {
        Self {
            app_name: "Divine OS".to_string(),
            catalog: Catalog::builtin(),
            controller: RwLock::new(ViewController::new()),
            settings: RwLock::new(Settings::default()),
            features: Features::new(),
            gateway,
            vault,
        }
    }

    /// Build the gateway selected by `llm_mode` and wire it to a fresh vault.
    pub fn from_config(config: &DivineConfig) -> Result<Self, GatewayError> {
        let vault = Arc::new(MediaVault::new());
        if config.llm_mode == LlmMode::Live && config.gateway.resolve_api_key().is_none() {
            tracing::warn!(
                target: "divine::dashboard",
                "no API key configured; AI features will fail until GEMINI_API_KEY is set"
            );
        }
        let gateway: Arc<dyn AiGateway> = match config.llm_mode {
            LlmMode::Live => Arc::new(GeminiGateway::new(
                config.gateway.clone(),
                config.prompts.clone(),
                Arc::clone(&vault),
            )?),
            LlmMode::Mock => Arc::new(
                MockGateway::new()
                    .with_vault(Arc::clone(&vault))
                    .with_fragment_delay(std::time::Duration::from_millis(50))
                    .with_polling(2, config.gateway.max_poll_attempts, std::time::Duration::from_secs(1)),
            ),
        };
        tracing::info!(target: "divine::dashboard", gateway = gateway.name(), "dashboard initialized");
        let mut dashboard = Self::new(gateway, vault);
        dashboard.app_name = config.app_name.clone();
        Ok(dashboard)
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn features(&self) -> &Features {
        &self.features
    }

    pub fn gateway(&self) -> &dyn AiGateway {
        self.gateway.as_ref()
    }

    pub fn vault(&self) -> &Arc<MediaVault> {
        &self.vault
    }

    // -- views --------------------------------------------------------------

    pub fn active_view(&self) -> ViewId {
        self.controller.read().map(|c| c.active()).unwrap_or_default()
    }

    pub fn select_view(&self, id: ViewId) {
        if let Ok(mut c) = self.controller.write() {
            c.set_active(id);
        }
    }

    /// Select and render by slug; unknown slugs render the pending panel.
    pub fn open_slug(&self, slug: &str) -> Panel {
        let selected = self.controller.write().ok().and_then(|mut c| c.select_slug(slug));
        match selected {
            Some(id) => self.render(id),
            None => Panel::pending(),
        }
    }

    pub fn render(&self, id: ViewId) -> Panel {
        let settings = self.settings();
        let features = self.features.snapshot();
        let ctx = RenderContext {
            catalog: &self.catalog,
            settings: &settings,
            features: &features,
        };
        views::render(id, &ctx)
    }

    pub fn render_active(&self) -> Panel {
        self.render(self.active_view())
    }

    // -- settings -----------------------------------------------------------

    pub fn settings(&self) -> Settings {
        self.settings.read().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn toggle_setting(&self, key: SettingKey) -> bool {
        let value = self.settings.write().map(|mut s| s.toggle(key)).unwrap_or(false);
        tracing::info!(target: "divine::dashboard", setting = key.slug(), value, "setting toggled");
        value
    }

    pub fn set_model(&self, model: &str) -> bool {
        self.settings.write().map(|mut s| s.set_model(model)).unwrap_or(false)
    }

    // -- features -----------------------------------------------------------
    //
    // Every submission runs on its own task: a caller that goes away (a closed
    // HTTP request, a dropped future) never abandons a call before it settles.

    fn detach(&self) -> (Features, Arc<dyn AiGateway>) {
        (self.features.clone(), Arc::clone(&self.gateway))
    }

    pub async fn chat(&self, message: &str) -> Submission {
        self.chat_with(message, |_| {}).await
    }

    pub async fn chat_with<F>(&self, message: &str, on_fragment: F) -> Submission
    where
        F: FnMut(&str) + Send + 'static,
    {
        let (features, gateway) = self.detach();
        let message = message.to_string();
        let task = tokio::spawn(async move {
            features
                .chat
                .submit_with(gateway.as_ref(), &message, on_fragment)
                .await
        });
        match task.await {
            Ok(submission) => submission,
            Err(e) => {
                tracing::error!(target: "divine::lifecycle", feature = "chat", error = %e, "chat task ended abnormally");
                Submission::Failed
            }
        }
    }

    /// Decode with the model currently selected in settings.
    pub async fn decode_soul(
        &self,
        input: SoulDecoderInput,
    ) -> Settlement<SoulDecoderInput, SpiritualIntelligenceResponse> {
        let model = self.settings().ai_model;
        let (features, gateway) = self.detach();
        detached(&self.features.decode, async move {
            features.decode_soul(gateway.as_ref(), input, &model).await
        })
        .await
    }

    pub async fn search_meaning(&self, query: String) -> Settlement<MeaningQuery, MeaningResult> {
        let (features, gateway) = self.detach();
        detached(&self.features.meaning, async move {
            features.search_meaning(gateway.as_ref(), query).await
        })
        .await
    }

    pub async fn analyze_video(&self, input: VideoAnalysisInput) -> Settlement<VideoAnalysisInput, String> {
        let (features, gateway) = self.detach();
        detached(&self.features.video_analysis, async move {
            features.analyze_video(gateway.as_ref(), input).await
        })
        .await
    }

    pub async fn animate(&self, input: StudioInput) -> Settlement<StudioInput, MediaHandle> {
        let (features, gateway) = self.detach();
        detached(&self.features.studio, async move {
            features.animate(gateway.as_ref(), input).await
        })
        .await
    }

    pub async fn answer_question(&self, question: String) -> Settlement<CommunityQuestionInput, GroundedAnswer> {
        let (features, gateway) = self.detach();
        detached(&self.features.community, async move {
            features.answer_question(gateway.as_ref(), question).await
        })
        .await
    }

    pub async fn sync_live_feed(&self) -> Settlement<LiveFeedRequest, Vec<LiveQuestion>> {
        let (features, gateway) = self.detach();
        detached(&self.features.live_feed, async move {
            features.sync_live_feed(gateway.as_ref()).await
        })
        .await
    }

    pub async fn reformat(&self, input: ReformatInput) -> Settlement<ReformatInput, String> {
        let (features, gateway) = self.detach();
        detached(&self.features.reformat, async move {
            features.reformat(gateway.as_ref(), input).await
        })
        .await
    }

    pub async fn generate_image(&self, input: ImageRequest) -> Settlement<ImageRequest, ImagePayload> {
        let (features, gateway) = self.detach();
        detached(&self.features.image, async move {
            features.generate_image(gateway.as_ref(), input).await
        })
        .await
    }
}

/// Await a submission spawned on its own task.
async fn detached<I, R, Fut>(feature: &Feature<I, R>, submission: Fut) -> Settlement<I, R>
where
    I: Validate + Send + 'static,
    R: Clone + Send + 'static,
    Fut: Future<Output = Settlement<I, R>> + Send + 'static,
{
    match tokio::spawn(submission).await {
        Ok(settlement) => settlement,
        Err(e) => {
            tracing::error!(target: "divine::lifecycle", feature = feature.name(), error = %e, "submission task ended abnormally");
            Settlement {
                submission: Submission::Failed,
                state: feature.snapshot(),
            }
        }
    }
}
