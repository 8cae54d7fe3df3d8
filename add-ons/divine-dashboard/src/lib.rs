//! Divine OS dashboard surface: HTML panels, JSON feature endpoints, chat over SSE.
//!
//! Every route shares one [`Dashboard`]; feature endpoints return the feature's
//! state after settlement (`200` settled, `502` failed, `409` busy, `422` invalid).

pub mod html;
pub mod terminal;

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use divine_core::error::ValidationError;
use divine_core::lifecycle::{ImageRequest, ReformatInput, StudioInput, VideoAnalysisInput};
use divine_core::{
    Dashboard, MediaFile, SettingKey, Settlement, SoulDecoderInput, Submission, Validate, VideoAspect, ViewId,
};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

const SCRIPT: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/divine.js"));

/// Upload ceiling for video analysis and studio frames.
const UPLOAD_LIMIT_BYTES: usize = 64 * 1024 * 1024;

type AppState = Arc<Dashboard>;
type ApiError = (StatusCode, String);

pub fn router(dashboard: Arc<Dashboard>) -> Router {
    let uploads = Router::new()
        .route("/api/v1/video/analyze", post(analyze_video))
        .route("/api/v1/studio", post(start_studio).get(studio_status))
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES));

    Router::new()
        .route("/health", get(health))
        .route("/", get(active_page))
        .route("/views/:slug", get(view_page))
        .route("/static/divine.js", get(script))
        .route("/api/v1/views", get(list_views))
        .route("/api/v1/views/:slug", get(view_json))
        .route("/api/v1/chat", post(chat_stream).get(chat_transcript))
        .route("/api/v1/decode", post(decode))
        .route("/api/v1/meaning", post(meaning))
        .route("/api/v1/community/answer", post(community_answer))
        .route("/api/v1/content/reformat", post(reformat))
        .route("/api/v1/image", post(image))
        .route("/api/v1/feed/live", post(live_feed))
        .route("/api/v1/settings", get(get_settings).post(update_settings))
        .route("/media/:id", get(media))
        .merge(uploads)
        .with_state(dashboard)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "OK"
}

async fn script() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/javascript")], SCRIPT)
}

// ─────────────────────────────────────────────────────────────────────────────
// Views
// ─────────────────────────────────────────────────────────────────────────────

async fn active_page(State(state): State<AppState>) -> Html<String> {
    let panel = state.render_active();
    Html(html::page(state.app_name(), state.active_view(), &panel))
}

/// Unknown slugs render the pending panel and keep the current selection.
async fn view_page(State(state): State<AppState>, Path(slug): Path<String>) -> Html<String> {
    let panel = state.open_slug(&slug);
    Html(html::page(state.app_name(), state.active_view(), &panel))
}

async fn view_json(State(state): State<AppState>, Path(slug): Path<String>) -> Json<divine_core::Panel> {
    Json(state.open_slug(&slug))
}

#[derive(Serialize)]
struct ViewEntry {
    id: ViewId,
    label: &'static str,
    section: &'static str,
    href: String,
    active: bool,
}

async fn list_views(State(state): State<AppState>) -> Json<Vec<ViewEntry>> {
    let active = state.active_view();
    Json(
        ViewId::ALL
            .iter()
            .map(|v| ViewEntry {
                id: *v,
                label: v.label(),
                section: v.section().label(),
                href: v.href(),
                active: *v == active,
            })
            .collect(),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Feature endpoints
// ─────────────────────────────────────────────────────────────────────────────

fn rejection(err: ValidationError) -> ApiError {
    let status = match err {
        ValidationError::Busy { .. } => StatusCode::CONFLICT,
        ValidationError::EmptyInput { .. } | ValidationError::MissingFile => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (status, err.to_string())
}

/// Responds with the state captured when this submission settled.
fn settled<I: Serialize, R: Serialize>(settlement: Settlement<I, R>) -> Result<Response, ApiError> {
    match settlement.submission {
        Submission::Settled => Ok(Json(settlement.state).into_response()),
        Submission::Failed => Ok((StatusCode::BAD_GATEWAY, Json(settlement.state)).into_response()),
        Submission::Rejected(err) => Err(rejection(err)),
    }
}

#[derive(Deserialize)]
struct QueryBody {
    query: String,
}

#[derive(Deserialize)]
struct QuestionBody {
    question: String,
}

async fn decode(State(state): State<AppState>, Json(input): Json<SoulDecoderInput>) -> Result<Response, ApiError> {
    settled(state.decode_soul(input).await)
}

async fn meaning(State(state): State<AppState>, Json(body): Json<QueryBody>) -> Result<Response, ApiError> {
    settled(state.search_meaning(body.query).await)
}

async fn community_answer(
    State(state): State<AppState>,
    Json(body): Json<QuestionBody>,
) -> Result<Response, ApiError> {
    settled(state.answer_question(body.question).await)
}

async fn reformat(State(state): State<AppState>, Json(input): Json<ReformatInput>) -> Result<Response, ApiError> {
    settled(state.reformat(input).await)
}

async fn image(State(state): State<AppState>, Json(input): Json<ImageRequest>) -> Result<Response, ApiError> {
    settled(state.generate_image(input).await)
}

async fn live_feed(State(state): State<AppState>) -> Result<Response, ApiError> {
    settled(state.sync_live_feed().await)
}

/// Text fields and at most one file from a multipart body.
#[derive(Default)]
struct Upload {
    file: Option<MediaFile>,
    fields: std::collections::HashMap<String, String>,
}

impl Upload {
    async fn read(mut multipart: Multipart, file_field: &str) -> Result<Self, ApiError> {
        let bad_request = |e: axum::extract::multipart::MultipartError| (StatusCode::BAD_REQUEST, e.to_string());
        let mut upload = Upload::default();
        while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
            let name = field.name().unwrap_or_default().to_string();
            if name == file_field {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let mime = field.content_type().unwrap_or("application/octet-stream").to_string();
                let bytes = field.bytes().await.map_err(bad_request)?;
                if !bytes.is_empty() {
                    upload.file = Some(MediaFile::new(file_name, mime, bytes.to_vec()));
                }
            } else {
                let text = field.text().await.map_err(bad_request)?;
                upload.fields.insert(name, text);
            }
        }
        Ok(upload)
    }

    fn text(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }
}

async fn analyze_video(State(state): State<AppState>, multipart: Multipart) -> Result<Response, ApiError> {
    let upload = Upload::read(multipart, "file").await?;
    let input = VideoAnalysisInput {
        prompt: upload.text("prompt"),
        file: upload.file,
    };
    settled(state.analyze_video(input).await)
}

/// Validates, then runs the video job in the background. Poll `GET /api/v1/studio`.
async fn start_studio(State(state): State<AppState>, multipart: Multipart) -> Result<Response, ApiError> {
    let upload = Upload::read(multipart, "image").await?;
    let aspect = upload
        .text("aspect")
        .parse::<VideoAspect>()
        .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e))?;
    let input = StudioInput {
        prompt: upload.text("prompt"),
        image: upload.file,
        aspect,
    };
    input.validate().map_err(rejection)?;
    if state.features().studio.is_busy() {
        return Err(rejection(ValidationError::Busy { feature: "studio" }));
    }

    let dashboard = Arc::clone(&state);
    tokio::spawn(async move {
        let settlement = dashboard.animate(input).await;
        tracing::info!(target: "divine::studio", submission = ?settlement.submission, "video job settled");
    });
    Ok((StatusCode::ACCEPTED, Json(state.features().studio.snapshot())).into_response())
}

async fn studio_status(State(state): State<AppState>) -> Response {
    Json(state.features().studio.snapshot()).into_response()
}

// ─────────────────────────────────────────────────────────────────────────────
// Chat
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ChatBody {
    message: String,
}

/// SSE: `fragment` events carry the reply so far, then one `done` or `error`.
async fn chat_stream(State(state): State<AppState>, Json(body): Json<ChatBody>) -> Result<Response, ApiError> {
    if body.message.trim().is_empty() {
        return Err(rejection(ValidationError::EmptyInput { field: "message" }));
    }
    if state.features().chat.is_busy() {
        return Err(rejection(ValidationError::Busy { feature: "chat" }));
    }

    let (tx, rx) = mpsc::unbounded_channel::<Event>();
    let dashboard = Arc::clone(&state);
    tokio::spawn(async move {
        let fragments = tx.clone();
        let outcome = dashboard
            .chat_with(&body.message, move |text| {
                let _ = fragments.send(Event::default().event("fragment").data(text));
            })
            .await;
        let last = match outcome {
            Submission::Settled => Event::default().event("done").data(""),
            Submission::Failed => {
                let notice = dashboard
                    .features()
                    .chat
                    .snapshot()
                    .last_error
                    .map(|e| e.notice)
                    .unwrap_or_default();
                Event::default().event("error").data(notice)
            }
            Submission::Rejected(err) => Event::default().event("error").data(err.to_string()),
        };
        let _ = tx.send(last);
    });

    let stream = UnboundedReceiverStream::new(rx).map(Ok::<_, Infallible>);
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()).into_response())
}

async fn chat_transcript(State(state): State<AppState>) -> Response {
    Json(state.features().chat.snapshot()).into_response()
}

// ─────────────────────────────────────────────────────────────────────────────
// Settings and media
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SettingsUpdate {
    toggle: Option<SettingKey>,
    ai_model: Option<String>,
}

async fn get_settings(State(state): State<AppState>) -> Response {
    Json(state.settings()).into_response()
}

async fn update_settings(
    State(state): State<AppState>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Response, ApiError> {
    if let Some(model) = update.ai_model.as_deref() {
        if !state.set_model(model) {
            return Err((StatusCode::UNPROCESSABLE_ENTITY, format!("unknown model: {model}")));
        }
    }
    if let Some(key) = update.toggle {
        state.toggle_setting(key);
    }
    Ok(Json(state.settings()).into_response())
}

async fn media(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Response, ApiError> {
    let (mime, bytes) = state
        .vault()
        .get(&id)
        .ok_or((StatusCode::NOT_FOUND, format!("no media with id {id}")))?;
    Ok(([(header::CONTENT_TYPE, mime)], bytes).into_response())
}
