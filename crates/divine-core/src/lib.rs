//! Divine OS core library.
//!
//! Catalog, view controller, AI gateway, request lifecycle and settings for the
//! Divine OS dashboard. Front ends (HTTP, terminal) live in `add-ons/`.

pub mod catalog;
pub mod chat;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod gateway;
pub mod lifecycle;
pub mod media;
pub mod settings;
pub mod stream;
pub mod views;

pub use catalog::Catalog;
pub use chat::{ChatMessage, ChatSession, Role};
pub use config::{DivineConfig, GatewayConfig, LlmMode};
pub use dashboard::Dashboard;
pub use error::{GatewayError, ValidationError};
pub use gateway::{
    AiGateway, AspectRatio, GeminiGateway, GroundedAnswer, GroundingSource, ImageSize, LiveQuestion, MockGateway,
    SoulDecoderInput, SpiritualIntelligenceResponse, VideoAspect,
};
pub use lifecycle::{Feature, FeatureError, FeatureState, Features, Settlement, Submission, Validate};
pub use media::{ImagePayload, MediaFile, MediaHandle, MediaVault};
pub use settings::{SettingKey, Settings};
pub use stream::FragmentStream;
pub use views::{Panel, ViewController, ViewId};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
