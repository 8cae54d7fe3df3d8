//! Gemini Contract Test: the live gateway against a local HTTP double.
//!
//! Verifies request shape (paths, key header, tools, config) and response
//! handling (JSON parsing, grounding sources, fallbacks, SSE streaming, bounded
//! long-running polling, media download into the vault).
//!
//! Run with: `cargo test --test gemini_contract_test`

use std::sync::Arc;

use divine_core::gateway::prompts::PromptTemplates;
use divine_core::{
    AiGateway, ChatMessage, GatewayConfig, GatewayError, GeminiGateway, MediaFile, MediaVault, SoulDecoderInput,
    VideoAspect,
};
use serde_json::json;
use tokio::sync::mpsc;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "test-key";

fn config(server: &MockServer) -> GatewayConfig {
    GatewayConfig {
        base_url: server.uri(),
        api_key: Some(KEY.to_string()),
        poll_interval_secs: 0,
        max_poll_attempts: 5,
        ..Default::default()
    }
}

fn gateway(server: &MockServer) -> (GeminiGateway, Arc<MediaVault>) {
    let vault = Arc::new(MediaVault::new());
    let gw = GeminiGateway::new(config(server), PromptTemplates::default(), Arc::clone(&vault))
        .expect("build gateway");
    (gw, vault)
}

fn text_response(text: &str) -> serde_json::Value {
    json!({ "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }] })
}

#[tokio::test]
async fn test_decode_sends_key_and_parses_json_lenses() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .and(header("x-goog-api-key", KEY))
        .and(body_partial_json(json!({
            "generationConfig": { "responseMimeType": "application/json" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response(
            r#"{"soulBlueprint":"A","numerology":"B","astrology":"C","shadowWork":"D","pastLife":"E","emotionalReflection":"F"}"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let (gw, _) = gateway(&server);
    let input = SoulDecoderInput {
        name: "Leila".into(),
        ..Default::default()
    };
    let result = gw.decode_soul(&input, "gemini-2.5-flash").await.expect("decode");

    assert_eq!(result.soul_blueprint, "A");
    assert_eq!(result.emotional_reflection, "F");
}

#[tokio::test]
async fn test_unparsable_decoder_output_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-3-pro-preview:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response("the stars are silent")))
        .mount(&server)
        .await;

    let (gw, _) = gateway(&server);
    let err = gw
        .decode_soul(&SoulDecoderInput::default(), "gemini-3-pro-preview")
        .await
        .unwrap_err();

    assert!(err.is_parse(), "expected parse error, got {err}");
}

#[tokio::test]
async fn test_search_uses_grounding_and_maps_sources() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-3-flash-preview:generateContent"))
        .and(body_partial_json(json!({ "tools": [{ "googleSearch": {} }] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "The raven carries messages between worlds." }] },
                "groundingMetadata": { "groundingChunks": [
                    { "web": { "uri": "https://archive.example/raven", "title": "Raven Lore" } }
                ]}
            }]
        })))
        .mount(&server)
        .await;

    let (gw, _) = gateway(&server);
    let answer = gw.search_meaning("raven").await.expect("search");

    assert!(answer.summary.contains("raven"));
    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].title, "Raven Lore");
}

#[tokio::test]
async fn test_empty_answers_fall_back_to_fixed_texts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let (gw, _) = gateway(&server);
    assert_eq!(
        gw.search_meaning("x").await.expect("search").summary,
        "The divine silence offers no immediate reply."
    );
    assert_eq!(gw.answer_question("x").await.expect("answer").summary, "Recalibrating...");
    assert_eq!(gw.reformat_content("x", "poem").await.expect("reformat"), "Failed.");
    let video = MediaFile::new("v.mp4", "video/mp4", vec![1, 2, 3]);
    assert_eq!(
        gw.analyze_video(&video, "").await.expect("analysis"),
        "The Oracle was unable to interpret the visual stream."
    );
    assert!(gw.fetch_live_feed().await.expect("feed").is_empty());
}

#[tokio::test]
async fn test_image_without_inline_data_is_no_media() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash-image:generateContent"))
        .and(body_partial_json(json!({ "generationConfig": { "imageConfig": { "aspectRatio": "16:9" } } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response("no picture today")))
        .mount(&server)
        .await;

    let (gw, _) = gateway(&server);
    let err = gw.generate_diagram("lotus").await.unwrap_err();
    assert!(matches!(err, GatewayError::NoMedia(_)));
}

#[tokio::test]
async fn test_http_errors_surface_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let (gw, _) = gateway(&server);
    match gw.reformat_content("light", "haiku").await {
        Err(GatewayError::Api { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "upstream exploded");
        }
        other => panic!("expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_chat_streams_sse_fragments_in_order() {
    let server = MockServer::start().await;
    let chunk = |t: &str| format!("data: {}\r\n\r\n", text_response(t));
    let body = format!("{}{}{}", chunk("Peace "), chunk("be "), chunk("with you."));
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-3-pro-preview:streamGenerateContent"))
        .and(query_param("alt", "sse"))
        .and(body_partial_json(json!({
            "contents": [
                { "role": "user", "parts": [{ "text": "hi" }] },
                { "role": "model", "parts": [{ "text": "hello" }] },
                { "role": "user", "parts": [{ "text": "bless me" }] }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let (gw, _) = gateway(&server);
    let history = vec![ChatMessage::user("hi"), ChatMessage::model("hello")];
    let stream = gw.stream_chat(&history, "bless me").await.expect("stream");

    assert_eq!(stream.collect_text().await.expect("collect"), "Peace be with you.");
}

/// One-shot HTTP server that answers with a chunked body, pausing between chunks.
async fn serve_chunked(chunks: Vec<Vec<u8>>) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.expect("read request");
            request.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&request);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|l| l.to_ascii_lowercase().strip_prefix("content-length:").map(|v| v.trim().to_string()))
                    .and_then(|v| v.parse::<usize>().ok())
                    .unwrap_or(0);
                if request.len() >= end + 4 + length || n == 0 {
                    break;
                }
            }
        }

        let head = "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ntransfer-encoding: chunked\r\n\r\n";
        socket.write_all(head.as_bytes()).await.expect("write head");
        for chunk in chunks {
            socket.write_all(format!("{:x}\r\n", chunk.len()).as_bytes()).await.expect("size");
            socket.write_all(&chunk).await.expect("chunk");
            socket.write_all(b"\r\n").await.expect("crlf");
            socket.flush().await.expect("flush");
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
        socket.write_all(b"0\r\n\r\n").await.expect("trailer");
        socket.flush().await.expect("flush");
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_chat_keeps_characters_split_across_chunks() {
    let event = format!("data: {}\r\n\r\n", text_response("Namasté"));
    let bytes = event.into_bytes();
    // cut between the two bytes of 'é' (0xC3 0xA9)
    let split = bytes.iter().position(|b| *b == 0xC3).expect("two-byte char") + 1;
    let base_url = serve_chunked(vec![bytes[..split].to_vec(), bytes[split..].to_vec()]).await;

    let vault = Arc::new(MediaVault::new());
    let config = GatewayConfig {
        base_url,
        api_key: Some(KEY.to_string()),
        ..Default::default()
    };
    let gw = GeminiGateway::new(config, PromptTemplates::default(), vault).expect("build gateway");

    let stream = gw.stream_chat(&[], "greet me").await.expect("stream");
    assert_eq!(stream.collect_text().await.expect("collect"), "Namasté");
}

#[tokio::test]
async fn test_video_job_polls_until_done_and_stores_media() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/veo-3.1-fast-generate-preview:predictLongRunning"))
        .and(body_partial_json(json!({
            "instances": [{ "prompt": "Spiritual energy flow" }],
            "parameters": { "aspectRatio": "9:16", "resolution": "720p" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "models/veo/operations/op1",
            "done": false
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models/veo/operations/op1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "models/veo/operations/op1",
            "done": false
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models/veo/operations/op1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "models/veo/operations/op1",
            "done": true,
            "response": { "generateVideoResponse": { "generatedSamples": [
                { "video": { "uri": format!("{}/files/clip.mp4", server.uri()) } }
            ]}}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/clip.mp4"))
        .and(header("x-goog-api-key", KEY))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"fake-mp4".to_vec(), "video/mp4"))
        .mount(&server)
        .await;

    let (gw, vault) = gateway(&server);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = gw
        .animate_video("", None, VideoAspect::Portrait, tx)
        .await
        .expect("video job");

    let mut progress = Vec::new();
    while let Ok(line) = rx.try_recv() {
        progress.push(line);
    }
    assert_eq!(progress, vec!["Initiating Veo...", "Synthesizing...", "Synthesizing..."]);

    assert_eq!(handle.mime_type, "video/mp4");
    let (mime, bytes) = vault.get(&handle.id).expect("stored media");
    assert_eq!(mime, "video/mp4");
    assert_eq!(bytes, b"fake-mp4".to_vec());
}

#[tokio::test]
async fn test_video_job_gives_up_after_poll_budget() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "operations/slow", "done": false })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1beta/operations/slow"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "operations/slow", "done": false })))
        .expect(5)
        .mount(&server)
        .await;

    let (gw, _) = gateway(&server);
    let (tx, _rx) = mpsc::unbounded_channel();
    let err = gw
        .animate_video("river of light", None, VideoAspect::Landscape, tx)
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Timeout { attempts: 5 }));
}

#[tokio::test]
async fn test_missing_key_fails_first_call_without_request() {
    if std::env::var("GEMINI_API_KEY").is_ok() || std::env::var("API_KEY").is_ok() {
        // the environment supplies a fallback key
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cfg = GatewayConfig {
        api_key: None,
        ..config(&server)
    };
    let gw = GeminiGateway::new(cfg, PromptTemplates::default(), Arc::new(MediaVault::new())).expect("build");
    let err = gw.reformat_content("a", "b").await.unwrap_err();
    assert!(matches!(err, GatewayError::MissingApiKey));
}
