//! Live gateway: Gemini REST API over reqwest.
//!
//! Single-shot calls use `models/{model}:generateContent`, chat streams over
//! `:streamGenerateContent?alt=sse`, and video synthesis submits a
//! `:predictLongRunning` job that is polled until done and then downloaded into
//! the [`MediaVault`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::prompts::PromptTemplates;
use super::{
    or_fallback, parse_structured, AiGateway, AspectRatio, GroundedAnswer, GroundingSource, ImageSize,
    LiveQuestion, ProgressSink, SoulDecoderInput, SpiritualIntelligenceResponse, VideoAspect,
    EMPTY_COMMUNITY_ANSWER, EMPTY_REFORMAT, EMPTY_SEARCH_SUMMARY, EMPTY_VIDEO_ANALYSIS,
};
use crate::chat::{ChatMessage, Role};
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::media::{ImagePayload, MediaFile, MediaHandle, MediaVault};
use crate::stream::{FragmentSender, FragmentStream};

const API_KEY_HEADER: &str = "x-goog-api-key";
const VIDEO_RESOLUTION: &str = "720p";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    fn inline(file: &MediaFile) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: file.mime_type.clone(),
                data: file.to_base64(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

impl Content {
    fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Some("user".into()),
            parts,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: serde_json::Value,
}

impl Tool {
    fn google_search() -> Self {
        Self {
            google_search: json!({}),
        }
    }
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_size: Option<String>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<ImageConfig>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

impl GenerateRequest {
    fn prompt(text: impl Into<String>) -> Self {
        Self {
            contents: vec![Content::user(vec![Part::text(text)])],
            ..Default::default()
        }
    }

    fn with_search(mut self) -> Self {
        self.tools.push(Tool::google_search());
        self
    }

    fn with_config(mut self, config: GenerationConfig) -> Self {
        self.generation_config = Some(config);
        self
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct GroundingMetadata {
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GroundingChunk {
    web: Option<WebSource>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WebSource {
    uri: String,
    title: String,
}

impl GenerateResponse {
    fn parts(&self) -> impl Iterator<Item = &Part> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .into_iter()
            .flat_map(|c| c.parts.iter())
    }

    /// Concatenated text parts of the first candidate.
    fn text(&self) -> String {
        self.parts().filter_map(|p| p.text.as_deref()).collect()
    }

    fn first_image(&self) -> Option<ImagePayload> {
        self.parts().find_map(|p| {
            p.inline_data.as_ref().map(|d| ImagePayload {
                mime_type: if d.mime_type.is_empty() {
                    "image/png".to_string()
                } else {
                    d.mime_type.clone()
                },
                data_base64: d.data.clone(),
            })
        })
    }

    fn sources(&self) -> Vec<GroundingSource> {
        self.candidates
            .first()
            .and_then(|c| c.grounding_metadata.as_ref())
            .map(|m| {
                m.grounding_chunks
                    .iter()
                    .filter_map(|chunk| chunk.web.as_ref())
                    .map(|web| GroundingSource {
                        title: if web.title.is_empty() {
                            web.uri.clone()
                        } else {
                            web.title.clone()
                        },
                        uri: web.uri.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Operation {
    name: String,
    done: bool,
    error: Option<OperationError>,
    response: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OperationError {
    code: u16,
    message: String,
}

impl Operation {
    fn video_uri(&self) -> Option<String> {
        let response = self.response.as_ref()?;
        let samples = response
            .pointer("/generateVideoResponse/generatedSamples")
            .or_else(|| response.pointer("/generatedVideos"))?;
        samples
            .pointer("/0/video/uri")
            .and_then(|u| u.as_str())
            .map(str::to_string)
    }
}

fn live_feed_schema() -> serde_json::Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "id": { "type": "STRING" },
                "author": { "type": "STRING" },
                "content": { "type": "STRING" },
                "timeAgo": { "type": "STRING" },
                "category": { "type": "STRING" }
            },
            "required": ["id", "author", "content", "timeAgo", "category"]
        }
    })
}

/// Split complete lines off the front of `buffer`, returning the `data:` payloads.
///
/// Bytes are decoded only once a whole line has arrived, so a multi-byte
/// character split across network chunks survives intact.
fn drain_sse_data(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut out = Vec::new();
    while let Some(newline_pos) = buffer.iter().position(|b| *b == b'\n') {
        let line: Vec<u8> = buffer.drain(..=newline_pos).collect();
        let line = match std::str::from_utf8(&line) {
            Ok(line) => line.trim(),
            Err(e) => {
                tracing::debug!(target: "divine::gateway", error = %e, "skipping non-UTF-8 SSE line");
                continue;
            }
        };
        if let Some(data) = line.strip_prefix("data:") {
            let data = data.trim();
            if !data.is_empty() {
                out.push(data.to_string());
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

pub struct GeminiGateway {
    client: reqwest::Client,
    config: GatewayConfig,
    prompts: PromptTemplates,
    vault: Arc<MediaVault>,
}

impl GeminiGateway {
    pub fn new(config: GatewayConfig, prompts: PromptTemplates, vault: Arc<MediaVault>) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        if config.resolve_api_key().is_none() {
            tracing::warn!(
                target: "divine::gateway",
                "no API key configured; live AI calls will fail until GEMINI_API_KEY is set"
            );
        }
        Ok(Self {
            client,
            config,
            prompts,
            vault,
        })
    }

    fn api_key(&self) -> Result<String, GatewayError> {
        self.config.resolve_api_key().ok_or(GatewayError::MissingApiKey)
    }

    fn api_root(&self) -> String {
        format!("{}/v1beta", self.config.base_url.trim_end_matches('/'))
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.api_root(), model, method)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        tracing::error!(target: "divine::gateway", status = %status, "AI service returned an error");
        Err(GatewayError::Api {
            status: status.as_u16(),
            body,
        })
    }

    async fn generate(&self, model: &str, request: &GenerateRequest) -> Result<GenerateResponse, GatewayError> {
        let key = self.api_key()?;
        tracing::debug!(target: "divine::gateway", model = %model, "generateContent");
        let response = self
            .client
            .post(self.model_url(model, "generateContent"))
            .header(API_KEY_HEADER, key)
            .json(request)
            .send()
            .await?;
        let response = Self::check(response).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn grounded(&self, model: &str, prompt: String, fallback: &str) -> Result<GroundedAnswer, GatewayError> {
        let response = self
            .generate(model, &GenerateRequest::prompt(prompt).with_search())
            .await?;
        Ok(GroundedAnswer {
            summary: or_fallback(response.text(), fallback),
            sources: response.sources(),
        })
    }

    async fn image(&self, model: &str, prompt: String, config: ImageConfig) -> Result<ImagePayload, GatewayError> {
        let request = GenerateRequest::prompt(prompt).with_config(GenerationConfig {
            image_config: Some(config),
            ..Default::default()
        });
        self.generate(model, &request)
            .await?
            .first_image()
            .ok_or_else(|| GatewayError::NoMedia(format!("{model} returned no image")))
    }

    async fn get_operation(&self, name: &str, key: &str) -> Result<Operation, GatewayError> {
        let response = self
            .client
            .get(format!("{}/{}", self.api_root(), name.trim_start_matches('/')))
            .header(API_KEY_HEADER, key)
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(serde_json::from_str(&response.text().await?)?)
    }

    async fn pump_chat(response: reqwest::Response, tx: FragmentSender, model: String) {
        use futures_util::TryStreamExt;

        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut fragments = 0usize;

        loop {
            let bytes = match stream.try_next().await {
                Ok(Some(bytes)) => bytes,
                Ok(None) => break,
                Err(e) => {
                    tx.fail(GatewayError::Stream(e.to_string())).await;
                    return;
                }
            };
            buffer.extend_from_slice(&bytes);

            for data in drain_sse_data(&mut buffer) {
                match serde_json::from_str::<GenerateResponse>(&data) {
                    Ok(chunk) => {
                        let text = chunk.text();
                        if text.is_empty() {
                            continue;
                        }
                        fragments += 1;
                        if !tx.send(text).await {
                            // Receiver dropped, stop processing
                            tracing::debug!(target: "divine::gateway", model = %model, "chat consumer went away");
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::debug!(target: "divine::gateway", error = %e, "skipping unparsable SSE chunk");
                    }
                }
            }
        }

        buffer.push(b'\n');
        for data in drain_sse_data(&mut buffer) {
            if let Ok(chunk) = serde_json::from_str::<GenerateResponse>(&data) {
                let text = chunk.text();
                if !text.is_empty() && tx.send(text).await {
                    fragments += 1;
                }
            }
        }
        tracing::info!(target: "divine::gateway", model = %model, fragments, "chat stream completed");
    }
}

#[async_trait]
impl AiGateway for GeminiGateway {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn decode_soul(
        &self,
        input: &SoulDecoderInput,
        model: &str,
    ) -> Result<SpiritualIntelligenceResponse, GatewayError> {
        let model = if model.trim().is_empty() {
            self.config.models.decode.as_str()
        } else {
            model
        };
        let request = GenerateRequest::prompt(self.prompts.decode_prompt(input)).with_config(GenerationConfig {
            response_mime_type: Some("application/json".into()),
            ..Default::default()
        });
        let response = self.generate(model, &request).await?;
        parse_structured(&response.text())
    }

    async fn search_meaning(&self, query: &str) -> Result<GroundedAnswer, GatewayError> {
        self.grounded(&self.config.models.search, self.prompts.search_prompt(query), EMPTY_SEARCH_SUMMARY)
            .await
    }

    async fn generate_diagram(&self, query: &str) -> Result<ImagePayload, GatewayError> {
        self.image(
            &self.config.models.diagram,
            self.prompts.diagram_prompt(query),
            ImageConfig {
                aspect_ratio: Some(AspectRatio::Wide.as_str().into()),
                image_size: None,
            },
        )
        .await
    }

    async fn answer_question(&self, question: &str) -> Result<GroundedAnswer, GatewayError> {
        self.grounded(&self.config.models.answer, self.prompts.answer_prompt(question), EMPTY_COMMUNITY_ANSWER)
            .await
    }

    async fn fetch_live_feed(&self) -> Result<Vec<LiveQuestion>, GatewayError> {
        let request = GenerateRequest::prompt(self.prompts.live_feed.clone())
            .with_search()
            .with_config(GenerationConfig {
                response_mime_type: Some("application/json".into()),
                response_schema: Some(live_feed_schema()),
                image_config: None,
            });
        let response = self.generate(&self.config.models.live_feed, &request).await?;
        let text = response.text();
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        parse_structured(&text)
    }

    async fn reformat_content(&self, insight: &str, format: &str) -> Result<String, GatewayError> {
        let response = self
            .generate(
                &self.config.models.reformat,
                &GenerateRequest::prompt(self.prompts.reformat_prompt(insight, format)),
            )
            .await?;
        Ok(or_fallback(response.text(), EMPTY_REFORMAT))
    }

    async fn generate_image(
        &self,
        prompt: &str,
        size: ImageSize,
        aspect: AspectRatio,
    ) -> Result<ImagePayload, GatewayError> {
        self.image(
            &self.config.models.image,
            prompt.to_string(),
            ImageConfig {
                aspect_ratio: Some(aspect.as_str().into()),
                image_size: Some(size.as_str().into()),
            },
        )
        .await
    }

    async fn analyze_video(&self, file: &MediaFile, prompt: &str) -> Result<String, GatewayError> {
        let request = GenerateRequest {
            contents: vec![Content::user(vec![
                Part::inline(file),
                Part::text(self.prompts.analyze_prompt(prompt)),
            ])],
            ..Default::default()
        };
        tracing::info!(target: "divine::gateway", bytes = file.bytes.len(), mime = %file.mime_type, "analyzing video");
        let response = self.generate(&self.config.models.analyze_video, &request).await?;
        Ok(or_fallback(response.text(), EMPTY_VIDEO_ANALYSIS))
    }

    async fn stream_chat(&self, history: &[ChatMessage], message: &str) -> Result<FragmentStream, GatewayError> {
        let key = self.api_key()?;
        let model = self.config.models.chat.clone();

        let mut contents: Vec<Content> = history
            .iter()
            .filter(|m| !m.text.is_empty())
            .map(|m| Content {
                role: Some(
                    match m.role {
                        Role::User => "user",
                        Role::Model => "model",
                    }
                    .into(),
                ),
                parts: vec![Part::text(m.text.clone())],
            })
            .collect();
        contents.push(Content::user(vec![Part::text(message)]));

        let request = GenerateRequest {
            contents,
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part::text(self.prompts.chat_system.clone())],
            }),
            ..Default::default()
        };

        tracing::info!(target: "divine::gateway", model = %model, turns = history.len(), "chat stream started");

        let response = self
            .client
            .post(format!("{}?alt=sse", self.model_url(&model, "streamGenerateContent")))
            .header(API_KEY_HEADER, key)
            .json(&request)
            .send()
            .await?;
        let response = Self::check(response).await?;

        let (tx, stream) = FragmentStream::channel();
        tokio::spawn(Self::pump_chat(response, tx, model));
        Ok(stream)
    }

    async fn animate_video(
        &self,
        prompt: &str,
        image: Option<&MediaFile>,
        aspect: VideoAspect,
        progress: ProgressSink,
    ) -> Result<MediaHandle, GatewayError> {
        let key = self.api_key()?;
        let model = &self.config.models.animate;

        let mut instance = json!({ "prompt": self.prompts.animate_prompt(prompt) });
        if let Some(file) = image.filter(|f| !f.is_empty()) {
            instance["image"] = json!({
                "bytesBase64Encoded": file.to_base64(),
                "mimeType": file.mime_type,
            });
        }
        let body = json!({
            "instances": [instance],
            "parameters": {
                "aspectRatio": aspect.as_str(),
                "resolution": VIDEO_RESOLUTION,
                "sampleCount": 1
            }
        });

        let _ = progress.send("Initiating Veo...".to_string());
        let response = self
            .client
            .post(self.model_url(model, "predictLongRunning"))
            .header(API_KEY_HEADER, &key)
            .json(&body)
            .send()
            .await?;
        let response = Self::check(response).await?;
        let mut operation: Operation = serde_json::from_str(&response.text().await?)?;
        tracing::info!(target: "divine::gateway", model = %model, operation = %operation.name, "video job submitted");

        let mut attempts = 0u32;
        while !operation.done {
            if attempts >= self.config.max_poll_attempts {
                tracing::warn!(target: "divine::gateway", attempts, "video job exceeded poll budget");
                return Err(GatewayError::Timeout { attempts });
            }
            tokio::time::sleep(self.config.poll_interval()).await;
            operation = self.get_operation(&operation.name, &key).await?;
            attempts += 1;
            tracing::debug!(target: "divine::gateway", attempts, done = operation.done, "polled video job");
            let _ = progress.send("Synthesizing...".to_string());
        }

        if let Some(err) = operation.error.take() {
            return Err(GatewayError::Api {
                status: err.code,
                body: err.message,
            });
        }

        let uri = operation
            .video_uri()
            .ok_or_else(|| GatewayError::NoMedia("video job finished without a sample".into()))?;
        let download = self.client.get(&uri).header(API_KEY_HEADER, &key).send().await?;
        let download = Self::check(download).await?;
        let mime_type = download
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("video/mp4")
            .to_string();
        let bytes = download.bytes().await?;
        if bytes.is_empty() {
            return Err(GatewayError::NoMedia("downloaded video is empty".into()));
        }
        tracing::info!(target: "divine::gateway", attempts, size = bytes.len(), "video job completed");
        Ok(self.vault.store(bytes.to_vec(), mime_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_gemini_field_names() {
        let request = GenerateRequest::prompt("hello").with_search().with_config(GenerationConfig {
            response_mime_type: Some("application/json".into()),
            ..Default::default()
        });
        let v = serde_json::to_value(&request).unwrap();
        assert_eq!(v["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(v["tools"][0]["googleSearch"], json!({}));
        assert_eq!(v["generationConfig"]["responseMimeType"], "application/json");
        assert!(v.get("systemInstruction").is_none());
    }

    #[test]
    fn response_exposes_text_image_and_sources() {
        let raw = json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "Light " },
                    { "inlineData": { "mimeType": "image/png", "data": "QUJD" } },
                    { "text": "within" }
                ]},
                "groundingMetadata": { "groundingChunks": [
                    { "web": { "uri": "https://a.example", "title": "A" } },
                    { "retrievedContext": {} }
                ]}
            }]
        });
        let r: GenerateResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(r.text(), "Light within");
        assert_eq!(r.first_image().unwrap().data_uri(), "data:image/png;base64,QUJD");
        assert_eq!(
            r.sources(),
            vec![GroundingSource {
                title: "A".into(),
                uri: "https://a.example".into()
            }]
        );
    }

    #[test]
    fn sse_lines_drain_only_complete_events() {
        let mut buf = b"data: {\"a\":1}\r\n\r\ndata: {\"b\"".to_vec();
        assert_eq!(drain_sse_data(&mut buf), vec!["{\"a\":1}".to_string()]);
        assert_eq!(buf, b"data: {\"b\"".to_vec());
    }

    #[test]
    fn sse_line_split_inside_a_code_point_decodes_whole() {
        let line = "data: {\"t\":\"Namasté\"}\n".as_bytes();
        let split = line.iter().position(|b| *b == 0xC3).unwrap() + 1;

        let mut buf = line[..split].to_vec();
        assert!(drain_sse_data(&mut buf).is_empty());
        buf.extend_from_slice(&line[split..]);
        assert_eq!(drain_sse_data(&mut buf), vec!["{\"t\":\"Namasté\"}".to_string()]);
        assert!(buf.is_empty());
    }

    #[test]
    fn operation_finds_video_uri() {
        let op: Operation = serde_json::from_value(json!({
            "name": "models/veo/operations/1",
            "done": true,
            "response": { "generateVideoResponse": { "generatedSamples": [
                { "video": { "uri": "https://files.example/v.mp4" } }
            ]}}
        }))
        .unwrap();
        assert_eq!(op.video_uri().as_deref(), Some("https://files.example/v.mp4"));
    }
}
